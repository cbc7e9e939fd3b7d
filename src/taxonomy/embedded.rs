//! 内置精简兼容性表（编译期嵌入）

use crate::error::BlResult;
use baseline_lens_core::{TaxonomyLibrary, TaxonomySnapshot, TaxonomySource};
use log::debug;

static EMBEDDED_TAXONOMY_JSON: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/data/fallback_taxonomy.json"
));

/// 解析内置表，来源固定标记为 Fallback
pub fn load_embedded() -> BlResult<TaxonomyLibrary> {
    let snapshot = TaxonomySnapshot::from_json_str(EMBEDDED_TAXONOMY_JSON)?;
    let mut library = snapshot.into_library()?;
    library.source = TaxonomySource::Fallback;
    debug!("Embedded taxonomy parsed: {} entries", library.len());
    Ok(library)
}
