//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **LocalAssetStore**: ローカルファイルシステム（パスと `file://`）
//! - **InMemoryAssetStore**: 開発用・テスト用
//! - **JsonPathMatcher**: collection 再割り当て用のパス述語

pub mod inmem_store;
pub mod json_path;
pub mod local_store;

pub use self::inmem_store::InMemoryAssetStore;
pub use self::json_path::{Filter, JsonPathMatcher};
pub use self::local_store::LocalAssetStore;
