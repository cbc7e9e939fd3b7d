// BCD 原始数据解析
pub mod bcd;
// 扁平化快照格式
pub mod snapshot;

pub use bcd::BcdParser;
pub use snapshot::{TaxonomySnapshot, SNAPSHOT_FORMAT_VERSION};

use crate::core::TaxonomyLibrary;
use crate::error::CoreResult;
use serde_json::Value;

/// 自动识别数据格式：带 `formatVersion` 的为快照，其余按 BCD 解析
pub fn parse_library_bytes(bytes: &[u8]) -> CoreResult<TaxonomyLibrary> {
    let root: Value = serde_json::from_slice(bytes)?;
    if root.get("formatVersion").is_some() {
        let snapshot: TaxonomySnapshot = serde_json::from_value(root)?;
        return snapshot.into_library();
    }
    BcdParser::new().parse_value(&root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaxonomySource;

    #[test]
    fn test_format_detection() {
        let snapshot = br#"{"formatVersion": 1, "source": "fallback", "entries": [{"id": "html.elements.dialog", "name": "dialog"}]}"#;
        let lib = parse_library_bytes(snapshot).unwrap();
        assert_eq!(lib.source, TaxonomySource::Fallback);
        assert!(lib.contains("html.elements.dialog"));

        let bcd = br#"{"html": {"elements": {"dialog": {"__compat": {"support": {}}}}}}"#;
        let lib = parse_library_bytes(bcd).unwrap();
        assert_eq!(lib.source, TaxonomySource::Full);
        assert!(lib.contains("html.elements.dialog"));
    }
}
