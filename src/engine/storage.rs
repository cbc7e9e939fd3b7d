//! 文档存储协作方：按模式枚举文件 + 读取文本

use crate::error::{BaselineLensError, BlResult};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// 枚举 `root` 下匹配 include 且不匹配 exclude 的文件（模式相对 root）
    async fn find_files(
        &self,
        root: &Path,
        include: &[String],
        exclude: &[String],
    ) -> BlResult<Vec<PathBuf>>;

    async fn read_text(&self, path: &Path) -> BlResult<String>;
}

/// 本地文件系统实现
#[derive(Debug, Default, Clone)]
pub struct FsStorage;

impl FsStorage {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn build_globset(patterns: &[String]) -> BlResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            BaselineLensError::ConfigurationError(format!("invalid glob [{}]: {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| BaselineLensError::ConfigurationError(e.to_string()))
}

fn walk_matching(root: &Path, include: &GlobSet, exclude: &GlobSet) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?;
            if include.is_match(rel) && !exclude.is_match(rel) {
                Some(entry.into_path())
            } else {
                None
            }
        })
        .collect();
    files.sort();
    files
}

#[async_trait]
impl DocumentStorage for FsStorage {
    async fn find_files(
        &self,
        root: &Path,
        include: &[String],
        exclude: &[String],
    ) -> BlResult<Vec<PathBuf>> {
        let include = build_globset(include)?;
        let exclude = build_globset(exclude)?;
        let root = root.to_path_buf();

        let files = tokio::task::spawn_blocking(move || walk_matching(&root, &include, &exclude))
            .await
            .map_err(|e| BaselineLensError::UnknownError(format!("file walk failed: {}", e)))?;
        debug!("Storage enumerated {} candidate files", files.len());
        Ok(files)
    }

    async fn read_text(&self, path: &Path) -> BlResult<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}
