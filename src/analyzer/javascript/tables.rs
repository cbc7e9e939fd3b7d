//! JS 检测表：平台 API 符号、内置对象、语法特性

use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};

/// 平台 API 符号路径（点分，大小写按源码书写）
pub const API_SYMBOLS: &[&str] = &[
    "navigator.clipboard",
    "navigator.share",
    "navigator.gpu",
    "navigator.usb",
    "navigator.serial",
    "navigator.hid",
    "navigator.bluetooth",
    "navigator.wakeLock",
    "navigator.storage",
    "navigator.serviceWorker",
    "document.startViewTransition",
    "crypto.randomUUID",
    "URL.canParse",
    "URL.parse",
    "AbortSignal.timeout",
    "AbortSignal.any",
    "scheduler.postTask",
    "scheduler.yield",
    "structuredClone",
    "queueMicrotask",
    "requestIdleCallback",
    "fetch",
    "showOpenFilePicker",
    "showDirectoryPicker",
    "documentPictureInPicture",
    "cookieStore",
    "navigation",
    "localStorage",
    "sessionStorage",
    "indexedDB",
    "ResizeObserver",
    "IntersectionObserver",
    "AbortController",
    "BroadcastChannel",
    "CompressionStream",
    "DecompressionStream",
    "EyeDropper",
    "OffscreenCanvas",
    "URLPattern",
    "WebTransport",
    "WebSocketStream",
];

/// 实例方法 → 所属接口路径
pub const API_METHODS: &[(&str, &str)] = &[
    ("showModal", "HTMLDialogElement.showModal"),
    ("showPopover", "HTMLElement.showPopover"),
    ("togglePopover", "HTMLElement.togglePopover"),
    ("checkVisibility", "Element.checkVisibility"),
];

/// 内置全局标识符
pub const BUILTIN_GLOBALS: &[&str] = &[
    "globalThis",
    "BigInt",
    "WeakRef",
    "FinalizationRegistry",
    "Iterator",
    "Temporal",
    "Float16Array",
];

/// 内置静态成员
pub const BUILTIN_STATICS: &[&str] = &[
    "Object.hasOwn",
    "Object.groupBy",
    "Object.fromEntries",
    "Map.groupBy",
    "Promise.allSettled",
    "Promise.any",
    "Promise.withResolvers",
    "Promise.try",
    "Array.fromAsync",
    "Atomics.waitAsync",
    "JSON.rawJSON",
    "Math.sumPrecise",
    "RegExp.escape",
    "Intl.Segmenter",
    "Intl.ListFormat",
    "Intl.DurationFormat",
];

/// 原型方法（仅在调用位置匹配）→ 所属内置路径
pub const BUILTIN_METHODS: &[(&str, &str)] = &[
    ("at", "Array.at"),
    ("findLast", "Array.findLast"),
    ("findLastIndex", "Array.findLastIndex"),
    ("flat", "Array.flat"),
    ("flatMap", "Array.flatMap"),
    ("toReversed", "Array.toReversed"),
    ("toSorted", "Array.toSorted"),
    ("toSpliced", "Array.toSpliced"),
    ("with", "Array.with"),
    ("replaceAll", "String.replaceAll"),
    ("isWellFormed", "String.isWellFormed"),
    ("toWellFormed", "String.toWellFormed"),
    ("transfer", "ArrayBuffer.transfer"),
    ("union", "Set.union"),
    ("intersection", "Set.intersection"),
    ("difference", "Set.difference"),
    ("symmetricDifference", "Set.symmetricDifference"),
    ("isSubsetOf", "Set.isSubsetOf"),
];

/// 访问全局对象的前缀，匹配前剥离
pub const GLOBAL_RECEIVERS: &[&str] = &["window.", "globalThis.", "self."];

pub static API_SYMBOL_SET: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| API_SYMBOLS.iter().copied().collect());

pub static API_METHOD_MAP: Lazy<FxHashMap<&'static str, &'static str>> =
    Lazy::new(|| API_METHODS.iter().copied().collect());

pub static BUILTIN_GLOBAL_SET: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| BUILTIN_GLOBALS.iter().copied().collect());

pub static BUILTIN_STATIC_SET: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| BUILTIN_STATICS.iter().copied().collect());

pub static BUILTIN_METHOD_MAP: Lazy<FxHashMap<&'static str, &'static str>> =
    Lazy::new(|| BUILTIN_METHODS.iter().copied().collect());

/// 语法特性：taxonomy 键 + 展示名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxFeature {
    pub key: &'static str,
    pub name: &'static str,
}

macro_rules! syntax {
    ($ident:ident, $key:literal, $name:literal) => {
        pub const $ident: SyntaxFeature = SyntaxFeature {
            key: $key,
            name: $name,
        };
    };
}

syntax!(OPTIONAL_CHAINING, "javascript.operators.optional_chaining", "Optional chaining (?.)");
syntax!(NULLISH_COALESCING, "javascript.operators.nullish_coalescing", "Nullish coalescing (??)");
syntax!(NULLISH_ASSIGNMENT, "javascript.operators.nullish_coalescing_assignment", "Nullish coalescing assignment (??=)");
syntax!(LOGICAL_OR_ASSIGNMENT, "javascript.operators.logical_or_assignment", "Logical OR assignment (||=)");
syntax!(LOGICAL_AND_ASSIGNMENT, "javascript.operators.logical_and_assignment", "Logical AND assignment (&&=)");
syntax!(EXPONENTIATION, "javascript.operators.exponentiation", "Exponentiation (**)");
syntax!(AWAIT, "javascript.operators.await", "await");
syntax!(TOP_LEVEL_AWAIT, "javascript.operators.await.top_level", "Top-level await");
syntax!(SPREAD, "javascript.operators.spread", "Spread syntax (...)");
syntax!(DYNAMIC_IMPORT, "javascript.operators.import", "Dynamic import()");
syntax!(IMPORT_META, "javascript.operators.import_meta", "import.meta");
syntax!(ASYNC_FUNCTION, "javascript.statements.async_function", "Async function");
syntax!(FOR_OF, "javascript.statements.for...of", "for...of");
syntax!(FOR_AWAIT_OF, "javascript.statements.for_await...of", "for await...of");
syntax!(GENERATOR, "javascript.statements.generator_function", "Generator function");
syntax!(IMPORT, "javascript.statements.import", "import declaration");
syntax!(ARROW_FUNCTION, "javascript.functions.arrow_functions", "Arrow function");
syntax!(CLASS, "javascript.classes", "class");
syntax!(STATIC_BLOCK, "javascript.classes.static_initialization_blocks", "Class static initialization block");
syntax!(PRIVATE_FIELD, "javascript.classes.private_class_fields", "Private class field");
syntax!(PUBLIC_FIELD, "javascript.classes.public_class_fields", "Public class field");
syntax!(TEMPLATE_LITERAL, "javascript.grammar.template_literals", "Template literal");
syntax!(HASHBANG, "javascript.grammar.hashbang_comments", "Hashbang comment");
syntax!(NUMERIC_SEPARATOR, "javascript.grammar.numeric_separators", "Numeric separators");
syntax!(BIGINT_LITERAL, "javascript.grammar.bigint_literals", "BigInt literal");
syntax!(NAMED_CAPTURE_GROUP, "javascript.regular_expressions.named_capturing_group", "Named capturing group");
syntax!(DECORATOR, "javascript.decorators", "Decorator");

/// 运算符变体
pub fn binary_operator_feature(operator: &str) -> Option<SyntaxFeature> {
    match operator {
        "??" => Some(NULLISH_COALESCING),
        "**" => Some(EXPONENTIATION),
        _ => None,
    }
}

pub fn assignment_operator_feature(operator: &str) -> Option<SyntaxFeature> {
    match operator {
        "??=" => Some(NULLISH_ASSIGNMENT),
        "||=" => Some(LOGICAL_OR_ASSIGNMENT),
        "&&=" => Some(LOGICAL_AND_ASSIGNMENT),
        "**=" => Some(EXPONENTIATION),
        _ => None,
    }
}

/// 只含类型信息的子树（TypeScript），遍历时整体跳过
pub const TYPE_ONLY_KINDS: &[&str] = &[
    "type_annotation",
    "opt_type_annotation",
    "asserts_annotation",
    "type_predicate_annotation",
    "omitting_type_annotation",
    "adding_type_annotation",
    "interface_declaration",
    "type_alias_declaration",
    "type_parameters",
    "type_arguments",
    "ambient_declaration",
    "implements_clause",
    "index_signature",
    "abstract_method_signature",
    "function_signature",
];

pub static TYPE_ONLY_SET: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| TYPE_ONLY_KINDS.iter().copied().collect());

/// 形成新函数作用域的节点（用于判定顶层 await）
pub const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "function",
    "arrow_function",
    "method_definition",
    "generator_function_declaration",
    "generator_function",
    "class_static_block",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_variants() {
        assert_eq!(binary_operator_feature("??"), Some(NULLISH_COALESCING));
        assert_eq!(binary_operator_feature("+"), None);
        assert_eq!(assignment_operator_feature("||="), Some(LOGICAL_OR_ASSIGNMENT));
        assert_eq!(assignment_operator_feature("+="), None);
    }

    #[test]
    fn test_tables_are_consistent() {
        for (method, path) in BUILTIN_METHODS {
            assert!(path.ends_with(method));
        }
        assert!(API_SYMBOL_SET.contains("navigator.clipboard"));
        assert!(!BUILTIN_STATIC_SET.contains("Array.at"));
        assert!(TYPE_ONLY_SET.contains("type_annotation"));
    }
}
