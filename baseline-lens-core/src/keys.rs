//! 规范特性键候选生成
//! 键格式：小写、点分层级（如 `css.properties.display.grid`），纯函数，无数据依赖
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

pub const CSS_PROPERTIES: &str = "css.properties";
pub const CSS_CUSTOM_PROPERTY: &str = "css.properties.custom-property";
pub const CSS_AT_RULES: &str = "css.at-rules";
pub const CSS_SELECTORS: &str = "css.selectors";
pub const CSS_TYPES: &str = "css.types";
pub const HTML_ELEMENTS: &str = "html.elements";
pub const HTML_GLOBAL_ATTRIBUTES: &str = "html.global_attributes";
pub const JS_BUILTINS: &str = "javascript.builtins";
pub const API: &str = "api";

/// 自定义属性前缀
pub const CUSTOM_PROPERTY_PREFIX: &str = "--";

#[inline]
pub fn is_custom_property(property: &str) -> bool {
    property.starts_with(CUSTOM_PROPERTY_PREFIX)
}

/// CSS 属性候选键（优先级从高到低）
/// 1. `css.properties.<p>.<v>`（有值时）
/// 2. `css.properties.<p>`
/// 自定义属性只有一个候选
pub fn css_property_candidates(property: &str, value: Option<&str>) -> Vec<String> {
    let property = property.trim().to_lowercase();
    if is_custom_property(&property) {
        return vec![CSS_CUSTOM_PROPERTY.to_string()];
    }

    let bare = format!("{}.{}", CSS_PROPERTIES, property);
    let mut candidates = Vec::with_capacity(2);
    if let Some(value) = value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
    {
        candidates.push(format!("{}.{}", bare, value));
    }
    candidates.push(bare);
    candidates
}

/// 兜底键：裸属性键
pub fn css_property_default(property: &str) -> String {
    let property = property.trim().to_lowercase();
    if is_custom_property(&property) {
        CSS_CUSTOM_PROPERTY.to_string()
    } else {
        format!("{}.{}", CSS_PROPERTIES, property)
    }
}

pub fn css_at_rule_key(name: &str) -> String {
    format!("{}.{}", CSS_AT_RULES, name.trim().trim_start_matches('@').to_lowercase())
}

pub fn css_selector_key(name: &str) -> String {
    format!("{}.{}", CSS_SELECTORS, name.trim().trim_start_matches(':').to_lowercase())
}

/// BCD 中函数并非都位于 `css.types.<name>`，部分嵌套在父类型下
static CSS_FUNCTION_ALIASES: Lazy<FxHashMap<&'static str, &'static [&'static str]>> =
    Lazy::new(|| {
        let mut map: FxHashMap<&'static str, &'static [&'static str]> = FxHashMap::default();
        for name in ["rgb", "rgba", "hsl", "hsla", "hwb", "lab", "lch", "oklab", "oklch", "color", "color-mix", "light-dark"] {
            map.insert(name, &["css.types.color"]);
        }
        for name in [
            "linear-gradient",
            "radial-gradient",
            "conic-gradient",
            "repeating-linear-gradient",
            "repeating-radial-gradient",
            "repeating-conic-gradient",
        ] {
            map.insert(name, &["css.types.gradient", "css.types.image.gradient"]);
        }
        for name in ["image-set", "cross-fade", "element", "image", "paint"] {
            map.insert(name, &["css.types.image"]);
        }
        for name in [
            "translate", "translatex", "translatey", "translatez", "translate3d",
            "rotate", "rotatex", "rotatey", "rotatez", "rotate3d",
            "scale", "scalex", "scaley", "scalez", "scale3d",
            "skew", "skewx", "skewy", "matrix", "matrix3d", "perspective",
        ] {
            map.insert(name, &["css.types.transform-function"]);
        }
        for name in [
            "blur", "brightness", "contrast", "drop-shadow", "grayscale", "hue-rotate",
            "invert", "opacity", "saturate", "sepia",
        ] {
            map.insert(name, &["css.types.filter-function"]);
        }
        for name in ["cubic-bezier", "steps", "linear"] {
            map.insert(name, &["css.types.easing-function"]);
        }
        for name in ["circle", "ellipse", "inset", "polygon", "path", "xywh", "rect"] {
            map.insert(name, &["css.types.basic-shape"]);
        }
        for name in ["sin", "cos", "tan", "asin", "acos", "atan", "atan2", "pow", "sqrt", "hypot", "log", "exp", "abs", "sign", "round", "mod", "rem"] {
            map.insert(name, &["css.types"]);
        }
        map.insert("minmax", &["css.properties.grid-template-columns"]);
        map.insert("fit-content", &["css.properties.grid-template-columns"]);
        map.insert("repeat", &["css.properties.grid-template-columns"]);
        map.insert("var", &["css.properties.custom-property"]);
        map.insert("anchor", &["css.properties.top"]);
        map
    });

/// CSS 函数候选键：`css.types.<name>` 优先，其后为别名表中的父类型路径
pub fn css_function_candidates(name: &str) -> Vec<String> {
    let name = name.trim().to_lowercase();
    let mut candidates = vec![format!("{}.{}", CSS_TYPES, name)];
    if let Some(parents) = CSS_FUNCTION_ALIASES.get(name.as_str()) {
        for parent in parents.iter() {
            let key = format!("{}.{}", parent, name);
            if !candidates.contains(&key) {
                candidates.push(key);
            }
        }
    }
    candidates
}

/// JS 符号候选键：全局 API → window 作用域 API → 内置对象
pub fn js_symbol_candidates(path: &str) -> Vec<String> {
    let path = path.trim().to_lowercase();
    vec![
        format!("{}.{}", API, path),
        format!("{}.window.{}", API, path),
        format!("{}.{}", JS_BUILTINS, path),
    ]
}

pub fn js_symbol_default(path: &str) -> String {
    format!("{}.{}", API, path.trim().to_lowercase())
}

/// HTML 候选键
/// - 无属性：`html.elements.<e>`
/// - 有属性：元素属性 → 全局属性 → 两者的下划线变体
pub fn html_candidates(element: &str, attribute: Option<&str>) -> Vec<String> {
    let element = element.trim().to_lowercase();
    let Some(attribute) = attribute.map(|a| a.trim().to_lowercase()) else {
        return vec![format!("{}.{}", HTML_ELEMENTS, element)];
    };

    let mut candidates = vec![
        format!("{}.{}.{}", HTML_ELEMENTS, element, attribute),
        format!("{}.{}", HTML_GLOBAL_ATTRIBUTES, attribute),
    ];
    if attribute.contains('-') {
        let underscored = attribute.replace('-', "_");
        candidates.push(format!("{}.{}.{}", HTML_ELEMENTS, element, underscored));
        candidates.push(format!("{}.{}", HTML_GLOBAL_ATTRIBUTES, underscored));
    }
    candidates
}

pub fn html_default(element: &str, attribute: Option<&str>) -> String {
    let element = element.trim().to_lowercase();
    match attribute {
        Some(attr) => format!("{}.{}.{}", HTML_ELEMENTS, element, attr.trim().to_lowercase()),
        None => format!("{}.{}", HTML_ELEMENTS, element),
    }
}

/// `input` 的 type 子键，如 `date` → `type_date`
pub fn input_type_attribute(value: &str) -> String {
    format!("type_{}", value.trim().to_lowercase().replace('-', "_"))
}
