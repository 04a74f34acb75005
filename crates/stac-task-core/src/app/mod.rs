//! App - アプリケーション層
//!
//! このモジュールは、ports と typed Task を組み合わせて
//! payload の実行パイプラインを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: Executor の構築とワイヤリング
//! - **Executor**: payload の読み込み・実行・書き出し
//! - **provenance**: `processing:software` の記録
//! - **collections**: collection の再割り当て

pub mod builder;
pub mod collections;
pub mod executor;
pub mod provenance;

pub use self::builder::{AppBuilder, BuildError};
pub use self::collections::reassign_collections;
pub use self::executor::Executor;
pub use self::provenance::{PROCESSING_EXTENSION, PROCESSING_SOFTWARE, stamp_provenance};
