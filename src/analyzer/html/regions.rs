//! 单文件组件（Vue / Svelte）的词法区块切分
//! 区块标记按文本匹配，不理解模板语法：嵌套或条件区块可能切错
//! Vue 的模板区块以最后一个 `</template>` 结束

use super::locator::{find_ci, parse_open_tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Template,
    Script,
    Style,
}

/// 一个区块：内容区间为外层文本中的字节偏移
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    /// `lang` 属性（小写）
    pub lang: Option<String>,
    /// `type` 属性（小写，仅脚本）
    pub script_type: Option<String>,
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }
}

/// Vue：一个模板区块 + 模板外的脚本 / 样式区块
pub fn split_vue(source: &str) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut template_span: Option<(usize, usize)> = None;

    if let Some(open) = find_open_tag(source, "template", 0) {
        let content_start = open.end;
        if let Some(close) = rfind_ci(source, "</template", content_start) {
            regions.push(Region {
                kind: RegionKind::Template,
                lang: open.lang,
                script_type: None,
                start: content_start,
                end: close,
            });
            let close_end = source[close..].find('>').map_or(source.len(), |i| close + i + 1);
            template_span = Some((open.start, close_end));
        }
    }

    regions.extend(blocks_outside(source, template_span));
    regions.sort_by_key(|r| r.start);
    regions
}

/// Svelte：脚本 / 样式区块；其余文本整体作为标记区块（区块内容置空）
pub fn split_svelte(source: &str) -> (Vec<Region>, String) {
    let regions = blocks_outside(source, None);
    let mut markup = source.as_bytes().to_vec();
    for region in &regions {
        for b in &mut markup[region.start..region.end] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    }
    let markup = String::from_utf8(markup).unwrap_or_else(|_| source.to_string());
    (regions, markup)
}

struct OpenTag {
    start: usize,
    end: usize,
    lang: Option<String>,
    script_type: Option<String>,
}

/// 查找 `<name` 开始标签（名称后须为空白、`/` 或 `>`）
fn find_open_tag(source: &str, name: &str, from: usize) -> Option<OpenTag> {
    let needle = format!("<{}", name);
    let mut cursor = from;
    while let Some(start) = find_ci(source, &needle, cursor) {
        let after = start + needle.len();
        let boundary = source[after..]
            .bytes()
            .next()
            .map_or(false, |b| b.is_ascii_whitespace() || b == b'>' || b == b'/');
        if boundary {
            let tag = parse_open_tag(source, start)?;
            let attr = |key: &str| {
                tag.attrs
                    .iter()
                    .find(|a| a.name == key)
                    .map(|a| a.value(source).to_lowercase())
            };
            return Some(OpenTag {
                start,
                end: tag.end,
                lang: attr("lang"),
                script_type: attr("type"),
            });
        }
        cursor = after;
    }
    None
}

/// 模板区块以外的 `<script>` / `<style>` 区块
fn blocks_outside(source: &str, skip: Option<(usize, usize)>) -> Vec<Region> {
    let mut regions = Vec::new();
    for (name, kind) in [("script", RegionKind::Script), ("style", RegionKind::Style)] {
        let mut cursor = 0;
        while let Some(open) = find_open_tag(source, name, cursor) {
            if let Some((skip_start, skip_end)) = skip {
                if open.start >= skip_start && open.start < skip_end {
                    cursor = skip_end;
                    continue;
                }
            }
            let close_needle = format!("</{}", name);
            let close = find_ci(source, &close_needle, open.end).unwrap_or(source.len());
            regions.push(Region {
                kind,
                lang: open.lang,
                script_type: if kind == RegionKind::Script {
                    open.script_type
                } else {
                    None
                },
                start: open.end,
                end: close,
            });
            cursor = close;
        }
    }
    regions.sort_by_key(|r| r.start);
    regions
}

fn rfind_ci(source: &str, needle: &str, from: usize) -> Option<usize> {
    let haystack = source.get(from..)?.to_ascii_lowercase();
    haystack
        .rfind(&needle.to_ascii_lowercase())
        .map(|i| from + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VUE: &str = r#"<template>
  <div>
    <template v-if="ok"><dialog open></dialog></template>
  </div>
</template>

<script setup lang="ts">
const a = b?.c
</script>

<style lang="scss" scoped>
.a { gap: 1px }
</style>
"#;

    #[test]
    fn test_vue_regions() {
        let regions = split_vue(VUE);
        let kinds: Vec<_> = regions.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RegionKind::Template, RegionKind::Script, RegionKind::Style]
        );

        let template = regions[0].text(VUE);
        // 模板以最后一个 </template> 结束，内层 template 保持完整
        assert!(template.contains("<dialog open></dialog></template>"));
        assert!(template.trim_end().ends_with("</div>"));

        assert_eq!(regions[1].lang.as_deref(), Some("ts"));
        assert_eq!(regions[1].text(VUE).trim(), "const a = b?.c");
        assert_eq!(regions[2].lang.as_deref(), Some("scss"));
        assert_eq!(regions[2].text(VUE).trim(), ".a { gap: 1px }");
    }

    #[test]
    fn test_svelte_markup_blanks_blocks() {
        let source = "<script>\nlet x = 1;\n</script>\n<dialog></dialog>\n<style>a{}</style>";
        let (regions, markup) = split_svelte(source);
        assert_eq!(regions.len(), 2);
        assert_eq!(markup.len(), source.len());
        assert!(!markup.contains("let x"));
        assert!(markup.contains("<dialog></dialog>"));
        assert_eq!(markup.lines().count(), source.lines().count());
    }

    #[test]
    fn test_missing_template_close() {
        let regions = split_vue("<template><div>");
        assert!(regions.is_empty());
    }
}
