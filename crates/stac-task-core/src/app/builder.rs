//! AppBuilder - Executor の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - expect_tasks() で期待される task 名を登録
//! - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足があれば BuildError を返す

use std::sync::Arc;

use super::executor::Executor;
use crate::config::ExecutorConfig;
use crate::domain::errors::StacTaskError;
use crate::impls::{JsonPathMatcher, LocalAssetStore};
use crate::ports::{AssetStore, PathMatcher};
use crate::typed::{Task, TaskRegistry};

/// AppBuilder は Executor を構築
///
/// # 使用例
/// ```ignore
/// let executor = AppBuilder::new()
///     .register::<Passthrough>("passthrough")?
///     .expect_tasks(&["passthrough"])
///     .with_config(config)
///     .build()?;
/// ```
///
/// Without `with_assets` / `with_matcher` the executor reads and writes local
/// files and matches collection rules with [`JsonPathMatcher`].
pub struct AppBuilder {
    registry: TaskRegistry,
    expected_tasks: Option<Vec<String>>,
    assets: Option<Arc<dyn AssetStore>>,
    matcher: Option<Arc<dyn PathMatcher>>,
    config: ExecutorConfig,
}

/// BuildError は Executor 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing tasks: {0:?}. These tasks were expected but not registered.")]
    MissingTasks(Vec<String>),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: TaskRegistry::new(),
            expected_tasks: None,
            assets: None,
            matcher: None,
            config: ExecutorConfig::default(),
        }
    }

    /// Task を登録
    pub fn register<T: Task>(mut self, name: &str) -> Result<Self, StacTaskError> {
        self.registry.register::<T>(name)?;
        Ok(self)
    }

    /// 期待される task 名のリストを設定
    pub fn expect_tasks(mut self, names: &[&str]) -> Self {
        self.expected_tasks = Some(names.iter().map(|name| name.to_string()).collect());
        self
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetStore>) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn PathMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Executor, BuildError> {
        if let Some(expected_tasks) = &self.expected_tasks {
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|name| !self.registry.contains(name))
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTasks(missing_tasks));
            }
        }
        Ok(Executor::new(
            Arc::new(self.registry),
            self.assets.unwrap_or_else(|| Arc::new(LocalAssetStore::new())),
            self.matcher.unwrap_or_else(|| Arc::new(JsonPathMatcher::new())),
            self.config,
        ))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;
    use crate::typed::Passthrough;

    #[test]
    fn build_success() {
        let executor = AppBuilder::new()
            .register::<Passthrough>("passthrough")
            .unwrap()
            .expect_tasks(&["passthrough"])
            .build()
            .unwrap();
        assert_eq!(executor.registry().names(), vec!["passthrough".to_string()]);
    }

    #[test]
    fn build_missing_tasks() {
        let result = AppBuilder::new()
            .register::<Passthrough>("passthrough")
            .unwrap()
            .expect_tasks(&["passthrough", "href-to-item"])
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingTasks(missing)) if missing == vec!["href-to-item".to_string()]
        ));
    }

    #[test]
    fn build_without_expectations() {
        assert!(AppBuilder::new().build().is_ok());
    }

    #[test]
    fn duplicate_registration_fails_early() {
        let result = AppBuilder::new()
            .register::<Passthrough>("copy")
            .unwrap()
            .register::<Passthrough>("copy");
        assert_eq!(
            result.err().map(|e| e.kind()),
            Some(ErrorKind::DuplicateRegistration)
        );
    }

    #[test]
    fn config_is_passed_through() {
        let config = ExecutorConfig {
            concurrency: 2,
            ..ExecutorConfig::default()
        };
        let executor = AppBuilder::new().with_config(config.clone()).build().unwrap();
        assert_eq!(executor.config(), &config);
    }
}
