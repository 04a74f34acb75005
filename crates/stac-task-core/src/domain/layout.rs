//! Path templates for uploaded assets (`${collection}/${year}/${id}`).
//!
//! Supported variables: `collection`, `id`, `year`, `month`, `day` (from
//! `properties.datetime`) and any top-level property of the item.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::{Captures, Regex};
use serde_json::Value;

use super::errors::StacTaskError;
use super::item::Item;

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_:\-]+)\}").expect("template variable pattern is valid")
});

pub fn expand_path_template(template: &str, item: &Item) -> Result<String, StacTaskError> {
    let mut missing = None;
    let expanded = VARIABLE.replace_all(template, |caps: &Captures<'_>| {
        let name = &caps[1];
        match lookup(name, item) {
            Some(value) => value,
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(name) => Err(StacTaskError::Configuration(format!(
            "path template variable ${{{name}}} is not available for item {}",
            item.id
        ))),
        None => Ok(expanded.into_owned()),
    }
}

fn lookup(name: &str, item: &Item) -> Option<String> {
    match name {
        "id" => Some(item.id.clone()),
        "collection" => item.collection().map(str::to_string),
        "year" => item.datetime().map(|dt| format!("{:04}", dt.year())),
        "month" => item.datetime().map(|dt| format!("{:02}", dt.month())),
        "day" => item.datetime().map(|dt| format!("{:02}", dt.day())),
        "datetime" => item.properties.datetime.clone(),
        other => match item.properties.extra.get(other)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            value => Some(value.to_string()),
        },
    }
}
