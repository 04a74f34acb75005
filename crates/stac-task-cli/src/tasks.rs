//! Tasks shipped with the `stac-task` binary.

use async_trait::async_trait;
use serde::Deserialize;
use stac_task_core::AppBuilder;
use stac_task_core::domain::{Item, StacTaskError};
use stac_task_core::typed::{HrefLogic, HrefTask, ItemLogic, ItemTask, Passthrough, TaskContext};
use tracing::debug;

pub const BUILTIN_TASKS: &[&str] = &["passthrough", "href-to-item", "download-assets"];

/// Reads the catalog item JSON an href points at.
#[derive(Debug, Default, Deserialize)]
pub struct ReadItem {}

#[async_trait]
impl HrefLogic for ReadItem {
    const DESCRIPTION: &'static str = "Reads the STAC item each href points at.\n\
        Relative hrefs are resolved against the payload location.";

    async fn read_item(&self, ctx: &TaskContext, href: String) -> Result<Item, StacTaskError> {
        let bytes = ctx.assets().fetch_bytes(&href).await?;
        let item: Item = serde_json::from_slice(&bytes).map_err(StacTaskError::task)?;
        debug!(%href, id = %item.id, "read item");
        Ok(item)
    }
}

/// Downloads assets of every item into the working directory.
///
/// Output hrefs point at the downloaded files, so the working directory is
/// kept after the execution.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadAssets {
    /// Asset keys to download; all assets when absent.
    #[serde(default)]
    pub assets: Option<Vec<String>>,
}

#[async_trait]
impl ItemLogic for DownloadAssets {
    const DESCRIPTION: &'static str = "Downloads item assets into the working directory.\n\
        Config: {\"assets\": [\"key\", ...]} selects the assets to download.";
    const KEEPS_WORKING_DIRECTORY: bool = true;

    async fn process_item(&self, ctx: &TaskContext, item: Item) -> Result<Item, StacTaskError> {
        ctx.download_item_assets(item, self.assets.as_deref()).await
    }
}

pub fn register_builtins(builder: AppBuilder) -> Result<AppBuilder, StacTaskError> {
    builder
        .register::<Passthrough>("passthrough")?
        .register::<HrefTask<ReadItem>>("href-to-item")?
        .register::<ItemTask<DownloadAssets>>("download-assets")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use stac_task_core::ExecutorConfig;
    use stac_task_core::Payload;
    use stac_task_core::app::PROCESSING_SOFTWARE;
    use stac_task_core::domain::{Asset, Process};
    use stac_task_core::impls::InMemoryAssetStore;

    use super::*;

    fn builder(store: &InMemoryAssetStore) -> AppBuilder {
        register_builtins(AppBuilder::new().with_assets(Arc::new(store.clone())))
            .unwrap()
            .expect_tasks(BUILTIN_TASKS)
    }

    fn features(values: Vec<serde_json::Value>) -> Vec<serde_json::Map<String, serde_json::Value>> {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn href_to_item_reads_relative_hrefs() {
        let store = InMemoryAssetStore::new();
        let mut item = Item::new("20201211_223832_CS2");
        item.set_collection("raw");
        store
            .put("mem://bucket/items/item.json", serde_json::to_vec(&item).unwrap())
            .await;
        let payload = Payload::new(
            features(vec![json!({"href": "./items/item.json"})]),
            Process::default().with_task("href-to-item", json!({})),
        );
        store
            .put("mem://bucket/payload.json", payload.to_vec().unwrap())
            .await;

        let executor = builder(&store).build().unwrap();
        let output = executor
            .run("mem://bucket/payload.json", None, None)
            .await
            .unwrap();

        assert_eq!(output.features[0]["id"], "20201211_223832_CS2");
        assert_eq!(
            output.features[0]["properties"][PROCESSING_SOFTWARE]["href-to-item"],
            "0.1.0"
        );
    }

    #[tokio::test]
    async fn download_assets_writes_into_the_working_directory() {
        let store = InMemoryAssetStore::new();
        store.put("mem://data/scene/a.tif", b"pixels".to_vec()).await;
        let mut item = Item::new("scene");
        item.assets
            .insert("a".to_string(), Asset::new("mem://data/scene/a.tif"));
        item.assets
            .insert("b".to_string(), Asset::new("mem://data/scene/b.tif"));
        let payload = Payload::new(
            vec![serde_json::to_value(&item).unwrap().as_object().cloned().unwrap()],
            Process::default().with_task("download-assets", json!({"assets": ["a"]})),
        );

        let root = tempfile::tempdir().unwrap();
        let executor = builder(&store)
            .with_config(ExecutorConfig {
                workdir: Some(root.path().to_path_buf()),
                ..ExecutorConfig::default()
            })
            .build()
            .unwrap();
        let output = executor.execute(&payload, "download-assets").await.unwrap();

        let href = output.features[0]["assets"]["a"]["href"].as_str().unwrap();
        assert!(href.starts_with(&*root.path().to_string_lossy()));
        assert!(href.ends_with("scene/a.tif"));
        assert_eq!(std::fs::read(href).unwrap(), b"pixels");
        assert_eq!(
            output.features[0]["assets"]["b"]["href"],
            "mem://data/scene/b.tif"
        );
    }

    #[tokio::test]
    async fn downloaded_files_outlive_a_temporary_working_directory() {
        let store = InMemoryAssetStore::new();
        store.put("mem://data/scene/a.tif", b"pixels".to_vec()).await;
        let mut item = Item::new("scene");
        item.assets
            .insert("a".to_string(), Asset::new("mem://data/scene/a.tif"));
        let payload = Payload::new(
            vec![serde_json::to_value(&item).unwrap().as_object().cloned().unwrap()],
            Process::default().with_task("download-assets", json!({})),
        );

        let executor = builder(&store)
            .with_config(ExecutorConfig::default())
            .build()
            .unwrap();
        let output = executor.execute(&payload, "download-assets").await.unwrap();

        let href = output.features[0]["assets"]["a"]["href"].as_str().unwrap();
        assert_eq!(std::fs::read(href).unwrap(), b"pixels");
        let workdir = std::path::Path::new(href).ancestors().nth(2).unwrap();
        assert!(workdir.file_name().unwrap().to_string_lossy().starts_with("stac-task-"));
        std::fs::remove_dir_all(workdir).unwrap();
    }

    #[test]
    fn builtins_have_descriptions() {
        let store = InMemoryAssetStore::new();
        let executor = builder(&store).build().unwrap();
        for name in BUILTIN_TASKS {
            let description = executor.registry().description(name).unwrap();
            assert!(!description.is_empty(), "{name}");
        }
    }
}
