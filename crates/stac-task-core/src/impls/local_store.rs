//! LocalAssetStore - ローカルファイルシステム上の AssetStore
//!
//! Accepts plain paths and `file://` URLs. Any other scheme is reported as
//! an asset error rather than silently treated as a path.

use std::path::PathBuf;

use async_trait::async_trait;
use url::Url;

use crate::domain::errors::StacTaskError;
use crate::ports::AssetStore;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAssetStore;

impl LocalAssetStore {
    pub fn new() -> Self {
        Self
    }

    fn to_path(href: &str) -> Result<PathBuf, StacTaskError> {
        match Url::parse(href) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| StacTaskError::asset(href, "not a local file URL")),
            Ok(url) if url.scheme().len() > 1 => Err(StacTaskError::asset(
                href,
                format!("unsupported scheme for local storage: {}", url.scheme()),
            )),
            _ => Ok(PathBuf::from(href)),
        }
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn fetch_bytes(&self, href: &str) -> Result<Vec<u8>, StacTaskError> {
        let path = Self::to_path(href)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| StacTaskError::asset(href, e))
    }

    async fn write_bytes(&self, href: &str, bytes: &[u8]) -> Result<(), StacTaskError> {
        let path = Self::to_path(href)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StacTaskError::asset(href, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StacTaskError::asset(href, e))
    }
}
