//! stac-task-core
//!
//! Executes named tasks over the items of a STAC payload.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（payload, process, item, errors, state, ids）
//! - **ports**: 抽象化レイヤー（AssetStore, PathMatcher）
//! - **impls**: 実装（LocalAssetStore, InMemoryAssetStore, JsonPathMatcher）
//! - **typed**: 型付き Task API（Task trait, strategies, TaskRegistry, TaskContext）
//! - **app**: 実行パイプライン（Executor, AppBuilder, provenance, collections）
//! - **config**: ExecutorConfig（TOML）
//! - **observability**: tracing の初期化と実行サマリ

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod typed;

pub use self::app::{AppBuilder, BuildError, Executor};
pub use self::config::{ConfigError, ExecutorConfig};
pub use self::domain::{ErrorKind, Item, Payload, StacTaskError};
