//! 分析引擎：按分类分派分析器，施加大小 / 时间限额，失败时降级检测，项目级分组批处理
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use tokio::task::JoinHandle;

use super::storage::{DocumentStorage, FsStorage};
use super::timeout::TimeoutManager;
use crate::analyzer::{
    CssAnalyzer, DocumentAnalyzer, FallbackAnalyzer, HtmlAnalyzer, JavaScriptAnalyzer,
};
use crate::config::AnalysisSettings;
use crate::error::{BaselineLensError, BlResult};
use crate::model::{
    AnalysisError, AnalysisResult, DetectedFeature, FeatureCategory, ProjectAnalysisResult,
    StatusSummary, TextDocument,
};
use crate::taxonomy::TaxonomyService;

/// 小文件上限：预算 ×1
pub const SMALL_FILE_LIMIT: usize = 50 * 1024;
/// 中等文件上限：预算 ×2，更大的文件 ×4
pub const MEDIUM_FILE_LIMIT: usize = 500 * 1024;

type AnalyzerMap = FxHashMap<FeatureCategory, Arc<dyn DocumentAnalyzer>>;

pub struct AnalysisEngine {
    settings: AnalysisSettings,
    taxonomy: Arc<TaxonomyService>,
    storage: Arc<dyn DocumentStorage>,
    analyzers: RwLock<AnalyzerMap>,
    fallback: FallbackAnalyzer,
    timeouts: Arc<TimeoutManager>,
}

impl std::fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("settings", &self.settings)
            .field("analyzers", &self.registered_categories())
            .finish()
    }
}

impl AnalysisEngine {
    /// 校验配置并为已启用分类注册默认分析器
    pub fn new(
        settings: AnalysisSettings,
        taxonomy: Arc<TaxonomyService>,
        storage: Arc<dyn DocumentStorage>,
    ) -> BlResult<Self> {
        settings.validate()?;

        let mut analyzers: AnalyzerMap = FxHashMap::default();
        for &category in &settings.enabled_categories {
            let analyzer: Arc<dyn DocumentAnalyzer> = match category {
                FeatureCategory::Css => Arc::new(CssAnalyzer::new(taxonomy.clone())),
                FeatureCategory::Javascript => {
                    Arc::new(JavaScriptAnalyzer::new(taxonomy.clone()))
                }
                FeatureCategory::Html => Arc::new(HtmlAnalyzer::new(taxonomy.clone())),
            };
            analyzers.insert(category, analyzer);
        }
        info!(
            "Analysis engine ready: categories={:?}, maxFileSize={}, batchSize={}",
            settings.enabled_categories, settings.max_file_size, settings.batch_size
        );

        Ok(Self {
            settings,
            taxonomy,
            storage,
            analyzers: RwLock::new(analyzers),
            fallback: FallbackAnalyzer::new(),
            timeouts: Arc::new(TimeoutManager::new()),
        })
    }

    /// 默认配置 + 本地文件系统
    pub fn with_defaults(taxonomy: Arc<TaxonomyService>) -> BlResult<Self> {
        Self::new(AnalysisSettings::default(), taxonomy, Arc::new(FsStorage::new()))
    }

    /// 注册 / 覆盖某分类的分析器
    pub fn register_analyzer(&self, analyzer: Arc<dyn DocumentAnalyzer>) {
        let category = analyzer.category();
        let replaced = self
            .analyzers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(category, analyzer)
            .is_some();
        debug!("Registered {} analyzer (replaced={})", category, replaced);
    }

    pub fn registered_categories(&self) -> Vec<FeatureCategory> {
        let mut categories: Vec<_> = self
            .analyzers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        categories.sort();
        categories
    }

    fn analyzer_for(&self, category: FeatureCategory) -> Option<Arc<dyn DocumentAnalyzer>> {
        self.analyzers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&category)
            .cloned()
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn taxonomy(&self) -> &Arc<TaxonomyService> {
        &self.taxonomy
    }

    pub fn timeouts(&self) -> &Arc<TimeoutManager> {
        &self.timeouts
    }

    /// 周期清理超时任务的登记
    pub fn start_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        self.timeouts.spawn_sweeper(interval)
    }

    /// 按文件大小分档的分析预算
    pub fn budget_for(&self, category: FeatureCategory, size: usize) -> Duration {
        let base = self.settings.timeout_for(category);
        let factor = if size <= SMALL_FILE_LIMIT {
            1
        } else if size <= MEDIUM_FILE_LIMIT {
            2
        } else {
            4
        };
        base * factor
    }

    /// 单文档分析
    /// - 超过大小上限：零特性 + FileSizeError
    /// - 无对应分析器：空结果
    /// - 解析失败 / 超时：降级检测结果 + 错误记录
    pub async fn analyze_document(&self, document: TextDocument) -> AnalysisResult {
        let size = document.size();
        let limit = self.settings.max_file_size;
        if size > limit {
            let err = BaselineLensError::FileSizeError { size, limit };
            warn!("Skipping [{}]: {}", document.path.display(), err);
            return AnalysisResult::failed(
                Vec::new(),
                AnalysisError::from_error(&document.path, &err),
            );
        }

        let category = document.category();
        let Some(analyzer) = self.analyzer_for(category) else {
            debug!("No analyzer registered for {}, skipping", category);
            return AnalysisResult::default();
        };

        let budget = self.budget_for(category, size);
        let label = document.path.display().to_string();
        let document = Arc::new(document);
        let worker_doc = document.clone();

        let outcome = self
            .timeouts
            .run_with_timeout(&label, budget, move |cancel| {
                analyzer.analyze(&worker_doc, cancel)
            })
            .await;

        match outcome {
            Ok(features) => {
                debug!("[{}] {} features", label, features.len());
                AnalysisResult::with_features(features)
            }
            Err(err) => {
                warn!("Analysis of [{}] failed, using fallback detection: {}", label, err);
                let features = self.fallback.analyze(&document.text, category);
                AnalysisResult::failed(features, AnalysisError::from_error(&document.path, &err))
            }
        }
    }

    async fn analyze_file(&self, path: PathBuf) -> BlResult<AnalysisResult> {
        let text = self.storage.read_text(&path).await?;
        match TextDocument::from_path(path.clone(), text) {
            Some(document) => Ok(self.analyze_document(document).await),
            None => {
                debug!("No language for [{}], skipping", path.display());
                Ok(AnalysisResult::default())
            }
        }
    }

    /// 项目扫描：枚举 → 分组批处理 → 汇总
    /// 单文件读取 / 分析失败只记录错误，不中断扫描
    pub async fn analyze_project(self: &Arc<Self>) -> BlResult<ProjectAnalysisResult> {
        let root = self.settings.project_root.clone();
        let include = self.settings.include_globs();
        let files = self
            .storage
            .find_files(&root, &include, &self.settings.exclude_patterns)
            .await?;
        info!("Project scan of [{}]: {} files", root.display(), files.len());

        let engine = self.clone();
        let outcomes = self
            .timeouts
            .run_batched(files.clone(), self.settings.batch_size, move |path| {
                let engine = engine.clone();
                async move { engine.analyze_file(path).await }
            })
            .await;

        let mut features: Vec<DetectedFeature> = Vec::new();
        let mut errors = Vec::new();
        let mut analyzed_files = 0;
        for (path, outcome) in files.iter().zip(outcomes) {
            match outcome {
                Ok(result) => {
                    if result.is_clean() {
                        analyzed_files += 1;
                    }
                    features.extend(result.features.into_iter().map(|f| f.with_file_path(path)));
                    errors.extend(result.errors);
                }
                Err(err) => {
                    warn!("Failed to read [{}]: {}", path.display(), err);
                    errors.push(AnalysisError::from_error(path, &err));
                }
            }
        }

        let summary = StatusSummary::from_features(&features);
        info!(
            "Project scan finished: {}/{} files analyzed, {} features, {} errors",
            analyzed_files,
            files.len(),
            summary.total,
            errors.len()
        );
        Ok(ProjectAnalysisResult {
            total_files: files.len(),
            analyzed_files,
            features,
            errors,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::fallback::FALLBACK_CONTEXT;
    use crate::engine::CancelFlag;
    use crate::error::ErrorKind;
    use crate::model::DocumentLanguage;
    use std::fs;

    fn engine_with(settings: AnalysisSettings) -> AnalysisEngine {
        AnalysisEngine::new(
            settings,
            Arc::new(TaxonomyService::embedded()),
            Arc::new(FsStorage::new()),
        )
        .unwrap()
    }

    fn css(text: &str) -> TextDocument {
        TextDocument::new("style.css", DocumentLanguage::Css, text)
    }

    /// 忽略取消信号之外一直占用线程的分析器
    struct SlowAnalyzer;

    impl DocumentAnalyzer for SlowAnalyzer {
        fn category(&self) -> FeatureCategory {
            FeatureCategory::Css
        }

        fn analyze(&self, _document: &TextDocument, cancel: &CancelFlag) -> BlResult<Vec<DetectedFeature>> {
            loop {
                cancel.check()?;
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }

    /// 不检查取消信号、固定耗时的分析器
    struct BlockingAnalyzer(Duration);

    impl DocumentAnalyzer for BlockingAnalyzer {
        fn category(&self) -> FeatureCategory {
            FeatureCategory::Css
        }

        fn analyze(&self, _document: &TextDocument, _cancel: &CancelFlag) -> BlResult<Vec<DetectedFeature>> {
            std::thread::sleep(self.0);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_clean_css_document() {
        let engine = engine_with(AnalysisSettings::default());
        let result = engine
            .analyze_document(css(".container { display: grid; gap: 1rem; }"))
            .await;
        assert!(result.is_clean());
        assert_eq!(result.features.len(), 2);
    }

    #[tokio::test]
    async fn test_parse_failure_falls_back() {
        let _ = env_logger::builder().is_test(true).try_init();
        let engine = engine_with(AnalysisSettings::default());
        let result = engine.analyze_document(css(".a { display: grid;")).await;

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::ParsingError);
        assert_eq!(result.errors[0].file, "style.css");
        assert_eq!(result.features.len(), 1);
        assert_eq!(result.features[0].id, "css.properties.display.grid");
        assert_eq!(result.features[0].context.as_deref(), Some(FALLBACK_CONTEXT));
    }

    #[tokio::test]
    async fn test_size_boundary() {
        let settings = AnalysisSettings::builder().max_file_size(10).build();
        let engine = engine_with(settings);

        let at_limit = engine.analyze_document(css("a{gap:1px}")).await;
        assert!(at_limit.is_clean());
        assert_eq!(at_limit.features.len(), 1);

        let over = engine.analyze_document(css("a{gap:1px;}")).await;
        assert!(over.features.is_empty());
        assert_eq!(over.errors.len(), 1);
        assert_eq!(over.errors[0].kind, ErrorKind::FileSizeError);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let settings = AnalysisSettings::builder()
            .timeout(FeatureCategory::Css, 30)
            .build();
        let engine = engine_with(settings);
        engine.register_analyzer(Arc::new(SlowAnalyzer));

        let result = engine.analyze_document(css("a { display: grid }")).await;
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::TimeoutError);
        assert_eq!(result.features.len(), 1);
        assert_eq!(result.features[0].context.as_deref(), Some(FALLBACK_CONTEXT));
    }

    #[tokio::test]
    async fn test_timed_out_tasks_are_released() {
        let settings = AnalysisSettings::builder()
            .timeout(FeatureCategory::Css, 5)
            .build();
        let engine = engine_with(settings);
        engine.register_analyzer(Arc::new(BlockingAnalyzer(Duration::from_millis(40))));

        for _ in 0..20 {
            let result = engine.analyze_document(css("a { gap: 1px }")).await;
            assert_eq!(result.errors[0].kind, ErrorKind::TimeoutError);
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(engine.timeouts().active_count(), 0);
    }

    #[tokio::test]
    async fn test_scss_protocol_relative_url() {
        let engine = engine_with(AnalysisSettings::default());
        let doc = TextDocument::new(
            "theme.scss",
            DocumentLanguage::Scss,
            ".a { background: url(//cdn.example.com/x.png); display: grid; }",
        );
        let result = engine.analyze_document(doc).await;
        assert!(result.is_clean());
        assert_eq!(result.features.len(), 1);
        assert_eq!(result.features[0].id, "css.properties.display.grid");
        assert_eq!(result.features[0].context, None);
    }

    #[tokio::test]
    async fn test_disabled_category_yields_empty_result() {
        let settings = AnalysisSettings::builder()
            .enabled_categories([FeatureCategory::Css])
            .build();
        let engine = engine_with(settings);
        let doc = TextDocument::new("index.html", DocumentLanguage::Html, "<dialog></dialog>");
        let result = engine.analyze_document(doc).await;
        assert!(result.is_clean());
        assert!(result.features.is_empty());
        assert_eq!(engine.registered_categories(), vec![FeatureCategory::Css]);
    }

    #[tokio::test]
    async fn test_repeated_analysis_is_identical() {
        let engine = engine_with(AnalysisSettings::default());
        let doc = TextDocument::new(
            "app.js",
            DocumentLanguage::Javascript,
            "const v = a?.b ?? c;\nnavigator.clipboard.writeText(v);",
        );
        let first = engine.analyze_document(doc.clone()).await;
        let second = engine.analyze_document(doc).await;
        assert_eq!(first, second);
        assert!(!first.features.is_empty());
    }

    #[test]
    fn test_budget_tiers() {
        let settings = AnalysisSettings::builder()
            .timeout(FeatureCategory::Javascript, 100)
            .build();
        let engine = engine_with(settings);
        let js = FeatureCategory::Javascript;
        assert_eq!(engine.budget_for(js, SMALL_FILE_LIMIT), Duration::from_millis(100));
        assert_eq!(engine.budget_for(js, SMALL_FILE_LIMIT + 1), Duration::from_millis(200));
        assert_eq!(engine.budget_for(js, MEDIUM_FILE_LIMIT), Duration::from_millis(200));
        assert_eq!(engine.budget_for(js, MEDIUM_FILE_LIMIT + 1), Duration::from_millis(400));
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let settings = AnalysisSettings::builder().batch_size(0).build();
        let err = AnalysisEngine::new(
            settings,
            Arc::new(TaxonomyService::embedded()),
            Arc::new(FsStorage::new()),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }

    #[tokio::test]
    async fn test_project_scan_collects_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.css"), ".a { display: grid; }").unwrap();
        fs::write(dir.path().join("b.js"), "const x = a?.b;").unwrap();
        fs::write(dir.path().join("c.css"), ".broken { color: red;").unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/x.css"), "a { gap: 1px }").unwrap();
        fs::write(dir.path().join("notes.txt"), "display: grid").unwrap();

        let settings = AnalysisSettings::builder()
            .project_root(dir.path())
            .batch_size(2)
            .build();
        let engine = Arc::new(engine_with(settings));
        let result = engine.analyze_project().await.unwrap();

        assert_eq!(result.total_files, 3);
        assert_eq!(result.analyzed_files, 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::ParsingError);
        assert!(result.errors[0].file.ends_with("c.css"));

        assert!(result.features.iter().all(|f| f.file_path.is_some()));
        let grid = result
            .features
            .iter()
            .find(|f| f.id == "css.properties.display.grid")
            .unwrap();
        assert!(grid.file_path.as_ref().unwrap().ends_with("a.css"));
        assert_eq!(result.summary.total, result.features.len());
    }
}
