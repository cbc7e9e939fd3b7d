//! 兼容性分类服务
//! 核心职责：
//! 1. 持有兼容性数据库（Arc 快照，升级时原子替换）
//! 2. 规范键映射（CSS / JS / HTML 符号 → 特性键）
//! 3. 状态查询与检索（带缓存，缓存随快照一起替换）
//! 4. 初始化失败降级到内置表，并在后台重试升级

use crate::config::{TaxonomyConfig, TaxonomyOrigin};
use crate::taxonomy::embedded::load_embedded;
use crate::taxonomy::loader::TaxonomyLoader;
use baseline_lens_core::{
    keys, BaselineStatus, StatusPolicy, TaxonomyEntry, TaxonomyLibrary, TaxonomySource,
    ThresholdPolicy,
};
use baseline_lens_core::utils::compress_key_list;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, RwLock, Weak};
use tokio::task::JoinHandle;

/// 一份数据库及其派生缓存，整体替换保证在途查询看到一致视图
#[derive(Debug)]
struct TaxonomyState {
    library: Arc<TaxonomyLibrary>,
    status_cache: RwLock<FxHashMap<String, Option<BaselineStatus>>>,
    search_cache: RwLock<FxHashMap<String, Arc<Vec<TaxonomyEntry>>>>,
}

impl TaxonomyState {
    fn new(library: TaxonomyLibrary) -> Self {
        Self {
            library: Arc::new(library),
            status_cache: RwLock::new(FxHashMap::default()),
            search_cache: RwLock::new(FxHashMap::default()),
        }
    }
}

#[derive(Debug)]
pub struct TaxonomyService {
    state: RwLock<Arc<TaxonomyState>>,
    policy: Arc<dyn StatusPolicy>,
    config: TaxonomyConfig,
    loader: TaxonomyLoader,
    upgrade_task: Mutex<Option<JoinHandle<()>>>,
}

impl TaxonomyService {
    /// 空数据库 + 默认阈值策略，需调用 `initialize` 加载数据
    pub fn new(config: TaxonomyConfig) -> Self {
        Self::with_policy(config, Arc::new(ThresholdPolicy::default()))
    }

    pub fn with_policy(config: TaxonomyConfig, policy: Arc<dyn StatusPolicy>) -> Self {
        Self {
            state: RwLock::new(Arc::new(TaxonomyState::new(TaxonomyLibrary::default()))),
            policy,
            config,
            loader: TaxonomyLoader::new(),
            upgrade_task: Mutex::new(None),
        }
    }

    /// 直接注入已加载的数据库（同步，无需初始化）
    pub fn from_library(library: TaxonomyLibrary) -> Self {
        let service = Self::new(TaxonomyConfig::embedded());
        service.replace_library(library);
        service
    }

    /// 仅使用内置表（同步）
    pub fn embedded() -> Self {
        let service = Self::new(TaxonomyConfig::embedded());
        service.install_fallback();
        service
    }

    /// 加载完整数据；超时或失败时降级到内置表并调度后台升级。不向调用方返回错误
    pub async fn initialize(self: &Arc<Self>) {
        let budget = self.config.options.load_timeout;
        let outcome = tokio::time::timeout(budget, self.loader.load(&self.config)).await;

        match outcome {
            Ok(Ok(library)) => {
                self.replace_library(library);
                return;
            }
            Ok(Err(e)) => warn!("Taxonomy load failed, using embedded fallback: {}", e),
            Err(_) => warn!(
                "Taxonomy load exceeded {}ms, using embedded fallback",
                budget.as_millis()
            ),
        }

        self.install_fallback();
        if !matches!(self.config.origin, TaxonomyOrigin::Embedded) {
            self.schedule_upgrade();
        }
    }

    fn install_fallback(&self) {
        match load_embedded() {
            Ok(library) => self.replace_library(library),
            Err(e) => warn!("Embedded taxonomy unavailable, lookups will miss: {}", e),
        }
    }

    /// 后台重试：按策略间隔重试加载，成功即替换；服务释放后自动退出
    fn schedule_upgrade(self: &Arc<Self>) {
        let max_attempts = self.config.options.upgrade_retry.max_retries();
        if max_attempts == 0 {
            return;
        }
        let interval = self.config.options.retry_interval;
        let weak: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            for attempt in 1..=max_attempts {
                tokio::time::sleep(interval).await;
                let Some(service) = weak.upgrade() else {
                    return;
                };
                match service.loader.load(&service.config).await {
                    Ok(library) => {
                        info!("Taxonomy upgraded on background attempt {}", attempt);
                        service.replace_library(library);
                        return;
                    }
                    Err(e) => warn!(
                        "Background taxonomy upgrade attempt {}/{} failed: {}",
                        attempt, max_attempts, e
                    ),
                }
            }
        });

        let mut slot = self.upgrade_task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// 等待后台升级任务结束（无任务时立即返回）
    pub async fn wait_for_upgrade(&self) {
        let handle = self
            .upgrade_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// 原子替换数据库，缓存随旧快照一起失效
    pub fn replace_library(&self, library: TaxonomyLibrary) {
        let (len, source) = (library.len(), library.source);
        let next = Arc::new(TaxonomyState::new(library));
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = next;
        info!("Taxonomy installed: {} entries (source: {})", len, source);
    }

    fn current(&self) -> Arc<TaxonomyState> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 当前数据库快照（只读）
    pub fn snapshot(&self) -> Arc<TaxonomyLibrary> {
        self.current().library.clone()
    }

    pub fn source(&self) -> TaxonomySource {
        self.current().library.source
    }

    pub fn len(&self) -> usize {
        self.current().library.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_entry(&self, key: &str) -> Option<TaxonomyEntry> {
        self.current().library.get(key).cloned()
    }

    fn first_known(state: &TaxonomyState, candidates: Vec<String>) -> Option<String> {
        candidates
            .into_iter()
            .find(|candidate| state.library.contains(candidate))
    }

    /// `css.properties.<p>.<v>` → `css.properties.<p>`，均无数据时返回裸属性键
    pub fn map_css_property_to_key(&self, property: &str, value: Option<&str>) -> String {
        let state = self.current();
        Self::first_known(&state, keys::css_property_candidates(property, value))
            .unwrap_or_else(|| keys::css_property_default(property))
    }

    /// `api.<path>` → `api.window.<path>` → `javascript.builtins.<path>`，默认 `api.<path>`
    pub fn map_js_symbol_to_key(&self, symbol_path: &str) -> String {
        let state = self.current();
        Self::first_known(&state, keys::js_symbol_candidates(symbol_path))
            .unwrap_or_else(|| keys::js_symbol_default(symbol_path))
    }

    /// 元素属性 → 全局属性 → 下划线变体，默认元素属性键
    pub fn map_html_symbol_to_key(&self, element: &str, attribute: Option<&str>) -> String {
        let state = self.current();
        Self::first_known(&state, keys::html_candidates(element, attribute))
            .unwrap_or_else(|| keys::html_default(element, attribute))
    }

    /// 候选键中第一个有数据的（CSS 函数等多路径场景）
    pub fn resolve_first(&self, candidates: Vec<String>) -> Option<String> {
        Self::first_known(&self.current(), candidates)
    }

    /// 状态查询（缓存）：显式状态优先，否则交给状态策略
    pub fn get_status(&self, key: &str) -> Option<BaselineStatus> {
        let state = self.current();
        if let Some(cached) = state
            .status_cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
        {
            return cached.clone();
        }

        let computed = state.library.get(key).map(|entry| self.compute_status(entry));
        state
            .status_cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), computed.clone());
        computed
    }

    fn compute_status(&self, entry: &TaxonomyEntry) -> BaselineStatus {
        let status = entry
            .status
            .unwrap_or_else(|| self.policy.evaluate(&entry.support));
        BaselineStatus {
            status,
            baseline_date: entry.baseline_low_date.clone(),
            low_date: entry.baseline_low_date.clone(),
            high_date: entry.baseline_high_date.clone(),
            support: entry.support.clone(),
        }
    }

    /// id / name / description 子串检索（大小写不敏感，缓存，按 id 排序）
    pub fn search(&self, query: &str) -> Vec<TaxonomyEntry> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let state = self.current();
        if let Some(hit) = state
            .search_cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&needle)
        {
            return hit.as_ref().clone();
        }

        let mut results: Vec<TaxonomyEntry> = state
            .library
            .entries
            .values()
            .filter(|entry| entry.matches_query(&needle))
            .cloned()
            .collect();
        results.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(
            "Taxonomy search [{}]: {}",
            needle,
            compress_key_list(results.iter().map(|e| e.id.as_str()))
        );

        let results = Arc::new(results);
        state
            .search_cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(needle, results.clone());
        results.as_ref().clone()
    }
}

impl Drop for TaxonomyService {
    fn drop(&mut self) {
        if let Some(handle) = self
            .upgrade_task
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}
