//! Process definition: which tasks run, with what configuration, and how
//! their outputs are labelled and uploaded.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_PATH_TEMPLATE: &str = "${collection}";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Process {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Also accepted as `output_options`.
    #[serde(default, alias = "output_options")]
    pub upload_options: UploadOptions,

    /// Task name -> configuration. Values are opaque to the pipeline.
    #[serde(default)]
    pub tasks: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Process {
    pub fn with_task(mut self, name: impl Into<String>, config: Value) -> Self {
        self.tasks.insert(name.into(), config);
        self
    }
}

/// Options for uploading items and assets after execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Template for the location of uploaded assets, e.g.
    /// `s3://bucket/${collection}/${year}/${id}`.
    #[serde(default = "default_path_template")]
    pub path_template: String,

    /// Headers sent along with uploads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,

    /// Ordered collection rules: path expression -> collection name.
    /// The first expression matching an item decides its collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collections: Option<IndexMap<String, String>>,

    /// Publish `s3://` URLs instead of https ones.
    #[serde(default)]
    pub s3_urls: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_path_template() -> String {
    DEFAULT_PATH_TEMPLATE.to_string()
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            path_template: default_path_template(),
            headers: None,
            collections: None,
            s3_urls: false,
            extra: Map::new(),
        }
    }
}

impl UploadOptions {
    pub fn with_collection_rule(
        mut self,
        expression: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        self.collections
            .get_or_insert_with(IndexMap::new)
            .insert(expression.into(), collection.into());
        self
    }
}
