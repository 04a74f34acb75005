//! TaskContext - 1 回の実行に必要な環境
//!
//! The context is created together with the task and dropped with it. It
//! owns the working directory, so the directory is released on every exit
//! path, including task failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::domain::errors::StacTaskError;
use crate::domain::href::{file_name, join_href, resolve_href};
use crate::domain::item::Item;
use crate::domain::layout::expand_path_template;
use crate::domain::process::UploadOptions;
use crate::ports::AssetStore;

/// Directory where a task saves downloaded files.
#[derive(Debug)]
pub enum WorkingDirectory {
    /// Removed when dropped or closed, unless `keep` is set.
    Temporary { dir: TempDir, keep: bool },
    /// Left in place.
    Preserved(PathBuf),
}

impl WorkingDirectory {
    pub fn temporary(keep: bool) -> Result<Self, StacTaskError> {
        tempfile::Builder::new()
            .prefix("stac-task-")
            .disable_cleanup(keep)
            .tempdir()
            .map(|dir| Self::Temporary { dir, keep })
            .map_err(|e| StacTaskError::asset("<temporary directory>", e))
    }

    pub fn preserved(path: impl Into<PathBuf>) -> Result<Self, StacTaskError> {
        let path = path.into();
        std::fs::create_dir_all(&path)
            .map_err(|e| StacTaskError::asset(path.to_string_lossy(), e))?;
        Ok(Self::Preserved(path))
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Temporary { dir, .. } => dir.path(),
            Self::Preserved(path) => path,
        }
    }

    /// Release the directory now, reporting cleanup failures instead of
    /// swallowing them in `Drop`.
    pub fn close(self) -> Result<(), StacTaskError> {
        match self {
            Self::Temporary { dir, keep: true } => {
                debug!(path = %dir.path().display(), "working directory kept");
                Ok(())
            }
            Self::Temporary { dir, keep: false } => {
                let path = dir.path().to_string_lossy().into_owned();
                dir.close().map_err(|e| StacTaskError::asset(path, e))
            }
            Self::Preserved(path) => {
                debug!(path = %path.display(), "working directory preserved");
                Ok(())
            }
        }
    }
}

pub struct TaskContext {
    task_name: String,
    payload_href: Option<String>,
    working_directory: WorkingDirectory,
    assets: Arc<dyn AssetStore>,
    upload_options: UploadOptions,
    concurrency: usize,
}

impl TaskContext {
    pub fn new(
        task_name: impl Into<String>,
        payload_href: Option<String>,
        working_directory: WorkingDirectory,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        Self {
            task_name: task_name.into(),
            payload_href,
            working_directory,
            assets,
            upload_options: UploadOptions::default(),
            concurrency: 1,
        }
    }

    pub fn with_upload_options(mut self, upload_options: UploadOptions) -> Self {
        self.upload_options = upload_options;
        self
    }

    /// Maximum number of items processed at the same time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// The href of the payload this task was invoked from.
    pub fn payload_href(&self) -> Option<&str> {
        self.payload_href.as_deref()
    }

    pub fn working_directory(&self) -> &Path {
        self.working_directory.path()
    }

    pub fn assets(&self) -> &dyn AssetStore {
        self.assets.as_ref()
    }

    pub fn upload_options(&self) -> &UploadOptions {
        &self.upload_options
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Resolve `href` against the payload href. Without a payload href the
    /// reference is returned as is.
    pub fn resolve_href(&self, href: &str) -> Result<String, StacTaskError> {
        match self.payload_href.as_deref() {
            Some(base) => resolve_href(href, base),
            None => Ok(href.to_string()),
        }
    }

    /// Copy `href` into the working directory, keeping its file name and
    /// overwriting any existing file.
    pub async fn download_href(&self, href: &str) -> Result<PathBuf, StacTaskError> {
        let path = self.download_to(href, self.working_directory()).await?;
        Ok(path)
    }

    async fn download_to(&self, href: &str, dir: &Path) -> Result<PathBuf, StacTaskError> {
        let name = file_name(href).ok_or_else(|| StacTaskError::asset(href, "href has no file name"))?;
        let bytes = self.assets.fetch_bytes(href).await?;
        let path = dir.join(name);
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StacTaskError::asset(dir.to_string_lossy(), e))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StacTaskError::asset(path.to_string_lossy(), e))?;
        debug!(%href, path = %path.display(), "downloaded");
        Ok(path)
    }

    /// Download assets of `item` into `<working directory>/<item id>/` and
    /// point their hrefs at the local copies.
    ///
    /// `keys` selects assets; `None` downloads all of them. Relative asset
    /// hrefs are resolved against the payload href.
    pub async fn download_item_assets(
        &self,
        mut item: Item,
        keys: Option<&[String]>,
    ) -> Result<Item, StacTaskError> {
        let dir = self.working_directory().join(directory_name(&item.id)?);
        for (key, asset) in item.assets.iter_mut() {
            if !selected(key, keys) {
                continue;
            }
            let href = self.resolve_href(&asset.href)?;
            let path = self.download_to(&href, &dir).await?;
            asset.href = path.to_string_lossy().into_owned();
        }
        Ok(item)
    }

    /// Upload local assets of `item` to the location given by the upload
    /// options' path template and point their hrefs at the uploaded copies.
    pub async fn upload_item_assets(
        &self,
        mut item: Item,
        keys: Option<&[String]>,
    ) -> Result<Item, StacTaskError> {
        let destination = expand_path_template(&self.upload_options.path_template, &item)?;
        if self.upload_options.headers.is_some() {
            warn!("upload headers are not supported by this asset store; ignoring them");
        }
        for (key, asset) in item.assets.iter_mut() {
            if !selected(key, keys) {
                continue;
            }
            let name = file_name(&asset.href)
                .ok_or_else(|| StacTaskError::asset(&asset.href, "href has no file name"))?;
            let bytes = self.assets.fetch_bytes(&asset.href).await?;
            let target = join_href(&destination, &name);
            self.assets.write_bytes(&target, &bytes).await?;
            debug!(from = %asset.href, to = %target, "uploaded");
            asset.href = target;
        }
        Ok(item)
    }

    /// Release the working directory.
    pub fn close(self) -> Result<(), StacTaskError> {
        self.working_directory.close()
    }
}

/// `id` as a single path component below the working directory.
fn directory_name(id: &str) -> Result<&str, StacTaskError> {
    let escapes = id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']);
    if escapes {
        return Err(StacTaskError::asset(
            id,
            "item id cannot be used as a directory name",
        ));
    }
    Ok(id)
}

fn selected(key: &str, keys: Option<&[String]>) -> bool {
    keys.is_none_or(|keys| keys.iter().any(|k| k == key))
}
