//! AssetStore port - payload と asset の読み書き
//!
//! Local paths, `file://` URLs or object storage: the pipeline only ever
//! talks to this trait. Payload indirection, asset download and asset upload
//! all go through it.

use async_trait::async_trait;

use crate::domain::errors::StacTaskError;

/// AssetStore は href で指定された bytes を読み書き
///
/// # 設計原則
/// - Both operations may block on I/O; callers wrap them in timeouts.
/// - Errors are reported as [`StacTaskError::Asset`] naming the href.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Retrieve the raw content at `href`.
    async fn fetch_bytes(&self, href: &str) -> Result<Vec<u8>, StacTaskError>;

    /// Persist `bytes` at `href`, creating parent locations as needed.
    async fn write_bytes(&self, href: &str, bytes: &[u8]) -> Result<(), StacTaskError>;
}
