//! Provenance - 出力 item にソフトウェア情報を記録
//!
//! Every output item gets the processing extension in `stac_extensions`
//! (once) and a `processing:software` entry `{task name: version}`.
//! Entries recorded by earlier tasks in a chain are kept.

use serde_json::{Map, Value};

use crate::domain::errors::StacTaskError;

pub const PROCESSING_EXTENSION: &str =
    "https://stac-extensions.github.io/processing/v1.1.0/schema.json";

pub const PROCESSING_SOFTWARE: &str = "processing:software";

pub fn stamp_provenance(
    features: &mut [Map<String, Value>],
    task_name: &str,
    version: &str,
) -> Result<(), StacTaskError> {
    for (index, feature) in features.iter_mut().enumerate() {
        stamp_feature(feature, task_name, version).map_err(|message| {
            StacTaskError::Validation {
                index,
                message: message.to_string(),
            }
        })?;
    }
    Ok(())
}

fn stamp_feature(
    feature: &mut Map<String, Value>,
    task_name: &str,
    version: &str,
) -> Result<(), &'static str> {
    let extensions = feature
        .entry("stac_extensions")
        .or_insert_with(|| Value::Array(Vec::new()));
    if extensions.is_null() {
        *extensions = Value::Array(Vec::new());
    }
    let extensions = extensions
        .as_array_mut()
        .ok_or("stac_extensions is not an array")?;
    let mut seen = Vec::with_capacity(extensions.len() + 1);
    extensions.retain(|ext| {
        if seen.contains(ext) {
            false
        } else {
            seen.push(ext.clone());
            true
        }
    });
    let marker = Value::String(PROCESSING_EXTENSION.to_string());
    if !extensions.contains(&marker) {
        extensions.push(marker);
    }

    let properties = feature
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    let properties = properties
        .as_object_mut()
        .ok_or("properties is not an object")?;
    let software = properties
        .entry(PROCESSING_SOFTWARE)
        .or_insert_with(|| Value::Object(Map::new()));
    if !software.is_object() {
        *software = Value::Object(Map::new());
    }
    if let Value::Object(software) = software {
        software.insert(task_name.to_string(), Value::String(version.to_string()));
    }
    Ok(())
}
