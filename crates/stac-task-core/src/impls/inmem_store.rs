//! InMemoryAssetStore - 開発用・テスト用の AssetStore
//!
//! Objects live in a map keyed by href; hrefs are never normalised, so a
//! test must fetch exactly the href it stored.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::errors::StacTaskError;
use crate::ports::AssetStore;

#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, href: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.objects.lock().await.insert(href.into(), bytes.into());
    }

    pub async fn get(&self, href: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(href).cloned()
    }

    /// Stored hrefs, sorted.
    pub async fn hrefs(&self) -> Vec<String> {
        let mut hrefs: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        hrefs.sort();
        hrefs
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn fetch_bytes(&self, href: &str) -> Result<Vec<u8>, StacTaskError> {
        self.get(href)
            .await
            .ok_or_else(|| StacTaskError::asset(href, "not found"))
    }

    async fn write_bytes(&self, href: &str, bytes: &[u8]) -> Result<(), StacTaskError> {
        self.put(href, bytes.to_vec()).await;
        Ok(())
    }
}
