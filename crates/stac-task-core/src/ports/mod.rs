//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部システム（object storage、パス述語）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//! 実装は `impls` にあります。

pub mod asset_store;
pub mod path_matcher;

pub use self::asset_store::AssetStore;
pub use self::path_matcher::{ItemPredicate, PathMatcher};
