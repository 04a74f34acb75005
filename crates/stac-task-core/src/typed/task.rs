//! Task trait - 型付き Task の定義
//!
//! A task is its own configuration: the value deserialized from
//! `process.tasks[name]` is the object whose `process` runs the batch.
//!
//! # Trait Bounds
//! - `DeserializeOwned`: built from the configuration mapping
//! - `Send + Sync`: the executing future holds `&self` across `.await` and
//!   may move between tokio workers; the items of one batch are polled
//!   together inside that single future
//! - `'static`: stored behind `Arc` in the registry
//! - `JsonSchema` on `Input` / `Output`: `stac-task jsonschema` prints them

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::context::TaskContext;
use crate::domain::errors::StacTaskError;

/// Version recorded in `processing:software` when a task does not set one.
pub const DEFAULT_TASK_VERSION: &str = "0.1.0";

/// Processes a batch of decoded items into a batch of outputs.
///
/// Most tasks do not implement this directly but pick one of the adapters
/// in [`strategy`](super::strategy).
#[async_trait]
pub trait Task: DeserializeOwned + Send + Sync + 'static {
    /// Shape every incoming feature is decoded into.
    type Input: DeserializeOwned + JsonSchema + Send + 'static;

    /// Shape of the produced features; must serialize to a JSON object.
    type Output: Serialize + JsonSchema + Send + 'static;

    const VERSION: &'static str = DEFAULT_TASK_VERSION;

    /// Human readable description; the first line is used in listings.
    const DESCRIPTION: &'static str = "";

    /// Outputs point into the working directory, so it must outlive the
    /// execution even when it is temporary.
    const KEEPS_WORKING_DIRECTORY: bool = false;

    async fn process(
        &self,
        ctx: &TaskContext,
        items: Vec<Self::Input>,
    ) -> Result<Vec<Self::Output>, StacTaskError>;
}
