//! Payload: the document carrying items, the process definition and an
//! optional indirection href.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::errors::StacTaskError;
use super::href::resolve_href;
use super::process::Process;
use crate::ports::AssetStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadType {
    #[default]
    FeatureCollection,
}

/// A payload describing the items and the tasks to be executed.
///
/// Unknown top-level fields are kept in `extra` and written back out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(rename = "type", default)]
    pub kind: PayloadType,

    /// Items in the order consumers rely on.
    #[serde(default)]
    pub features: Vec<Map<String, Value>>,

    #[serde(default)]
    pub process: Process,

    /// Points at a larger payload stored elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    /// Where this payload was read from. Never serialized.
    #[serde(skip)]
    pub self_href: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload {
    pub fn new(features: Vec<Map<String, Value>>, process: Process) -> Self {
        Self {
            features,
            process,
            ..Self::default()
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, StacTaskError> {
        serde_json::from_slice(bytes).map_err(|e| StacTaskError::Format(e.to_string()))
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, StacTaskError> {
        serde_json::to_vec(self).map_err(|e| StacTaskError::Format(e.to_string()))
    }

    pub fn to_string_pretty(&self) -> Result<String, StacTaskError> {
        serde_json::to_string_pretty(self).map_err(|e| StacTaskError::Format(e.to_string()))
    }

    /// The indirection target, when this payload is indirect
    /// (non-empty `href` and no features).
    pub fn indirect_href(&self) -> Option<&str> {
        match self.href.as_deref() {
            Some(href) if !href.is_empty() && self.features.is_empty() => Some(href),
            _ => None,
        }
    }

    /// Configuration mapping of `name` in `process.tasks`.
    pub fn task_config(&self, name: &str) -> Result<&Map<String, Value>, StacTaskError> {
        match self.process.tasks.get(name) {
            None => Err(StacTaskError::Configuration(format!(
                "task is not configured in payload: {name}"
            ))),
            Some(Value::Object(config)) => Ok(config),
            Some(other) => Err(StacTaskError::Configuration(format!(
                "task config is not an object: {name} is {}",
                json_type(other)
            ))),
        }
    }

    /// A copy of this payload carrying `features` instead of the current ones.
    pub fn with_features(&self, features: Vec<Map<String, Value>>) -> Self {
        Self {
            kind: self.kind,
            features,
            process: self.process.clone(),
            href: self.href.clone(),
            self_href: self.self_href.clone(),
            extra: self.extra.clone(),
        }
    }

    /// Load a payload from `href`, following at most one indirection.
    ///
    /// The indirection target is resolved relative to the href that held it.
    /// `self_href` of the result is the location its features were actually
    /// read from.
    pub async fn load_from(
        store: &dyn AssetStore,
        href: &str,
        allow_indirection: bool,
    ) -> Result<Self, StacTaskError> {
        let mut href = href.to_string();
        let mut allow_indirection = allow_indirection;
        loop {
            let bytes = store.fetch_bytes(&href).await?;
            let mut payload = Self::from_slice(&bytes)?;
            match payload.indirect_href() {
                Some(target) if allow_indirection => {
                    let target = resolve_href(target, &href)?;
                    debug!(from = %href, to = %target, "following payload indirection");
                    href = target;
                    allow_indirection = false;
                }
                Some(_) => return Err(StacTaskError::Indirection { href }),
                None => {
                    payload.self_href = Some(href);
                    return Ok(payload);
                }
            }
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
