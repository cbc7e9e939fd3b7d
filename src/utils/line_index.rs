//! 字节偏移 ↔ 行列坐标换算

use crate::model::{Position, Range};

/// 行起始偏移索引，列号按字符计
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = Vec::with_capacity(text.len() / 32 + 1);
        line_starts.push(0);
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    #[inline]
    pub fn text(&self) -> &'a str {
        self.text
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 字节偏移 → 坐标（越界截断到文末，非字符边界向前对齐）
    pub fn position(&self, offset: usize) -> Position {
        let offset = self.floor_boundary(offset);
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        let character = self.text[line_start..offset].chars().count();
        Position::new(line as u32, character as u32)
    }

    pub fn range(&self, start: usize, end: usize) -> Range {
        Range::new(self.position(start), self.position(end))
    }

    /// 坐标 → 字节偏移（列越界截断到行尾）
    pub fn offset(&self, pos: Position) -> usize {
        let Some(&line_start) = self.line_starts.get(pos.line as usize) else {
            return self.text.len();
        };
        let line_end = self
            .line_starts
            .get(pos.line as usize + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        self.text[line_start..line_end]
            .char_indices()
            .nth(pos.character as usize)
            .map(|(i, _)| line_start + i)
            .unwrap_or(line_end)
    }

    fn floor_boundary(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}

/// 片段内偏移 → 外层文档坐标
#[derive(Debug, Clone, Copy)]
pub enum SpanMapper<'a> {
    /// 片段位于外层文档 `base` 字节处
    Shifted { index: &'a LineIndex<'a>, base: usize },
    /// 片段不是外层文本的连续子串（如对象字面量样式），所有位置固定到该区间
    Pinned(Range),
}

impl<'a> SpanMapper<'a> {
    pub fn root(index: &'a LineIndex<'a>) -> Self {
        SpanMapper::Shifted { index, base: 0 }
    }

    pub fn range(&self, start: usize, end: usize) -> Range {
        match self {
            SpanMapper::Shifted { index, base } => index.range(base + start, base + end),
            SpanMapper::Pinned(range) => *range,
        }
    }

    /// 嵌套片段：在当前片段 `offset` 处再开一个子片段
    pub fn shift(&self, offset: usize) -> Self {
        match *self {
            SpanMapper::Shifted { index, base } => SpanMapper::Shifted {
                index,
                base: base + offset,
            },
            pinned @ SpanMapper::Pinned(_) => pinned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_and_offset() {
        let text = "ab\ncdé\nf";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 3);
        assert_eq!(index.position(0), Position::new(0, 0));
        assert_eq!(index.position(3), Position::new(1, 0));
        // `é` 占两字节，其后的换行为第 3 个字符
        assert_eq!(index.position(7), Position::new(1, 3));
        assert_eq!(index.position(100), Position::new(2, 1));
        assert_eq!(index.offset(Position::new(1, 2)), 5);
        assert_eq!(index.offset(Position::new(1, 99)), 7);
        assert_eq!(index.offset(Position::new(9, 0)), text.len());
    }

    #[test]
    fn test_mid_char_offset_is_floored() {
        let index = LineIndex::new("é");
        assert_eq!(index.position(1), Position::new(0, 0));
    }

    #[test]
    fn test_span_mapper_shift() {
        let outer = "<style>\n.a{}\n</style>";
        let index = LineIndex::new(outer);
        let mapper = SpanMapper::root(&index).shift(8);
        assert_eq!(mapper.range(0, 2), Range::single_line(1, 0, 2));

        let pinned = SpanMapper::Pinned(Range::single_line(4, 1, 9));
        assert_eq!(pinned.shift(3).range(0, 1), Range::single_line(4, 1, 9));
    }
}
