//! 快照缓存：扁平化数据库 → JSON → LZ4，落盘到缓存目录

use crate::error::{BaselineLensError, BlResult};
use baseline_lens_core::{parse_library_bytes, TaxonomyLibrary, TaxonomySnapshot};
use log::debug;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use std::fs;
use std::path::Path;

/// 快照缓存管理器
pub struct SnapshotCache;

impl SnapshotCache {
    pub fn save(path: &Path, library: &TaxonomyLibrary) -> BlResult<()> {
        let json = TaxonomySnapshot::from_library(library).to_json_bytes()?;
        let compressed = compress_prepend_size(&json);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &compressed)?;
        debug!(
            "Taxonomy snapshot cached: {} ({} -> {} bytes)",
            path.display(),
            json.len(),
            compressed.len()
        );
        Ok(())
    }

    pub fn load(path: &Path) -> BlResult<TaxonomyLibrary> {
        let bytes = fs::read(path)?;
        let json = lz4_decompress(&bytes)?;
        let library = TaxonomySnapshot::from_json_bytes(&json)?.into_library()?;
        Ok(library)
    }
}

/// LZ4解压缩封装，统一错误类型
pub fn lz4_decompress(bytes: &[u8]) -> BlResult<Vec<u8>> {
    decompress_size_prepended(bytes).map_err(|e| {
        BaselineLensError::DataLoadingError(format!(
            "LZ4 decompression failed: {:?}, compressed length: {}",
            e,
            bytes.len()
        ))
    })
}

/// 读取本地数据文件：`.lz4` 先解压，其余按 BCD / 快照自动识别
pub fn load_local_file(path: &Path) -> BlResult<TaxonomyLibrary> {
    let raw = fs::read(path)?;
    let is_lz4 = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("lz4"));
    let bytes = if is_lz4 { lz4_decompress(&raw)? } else { raw };
    Ok(parse_library_bytes(&bytes)?)
}
