//! Collection reassignment
//!
//! `upload_options.collections` maps a path expression to a collection id.
//! Rules are compiled once per call, then tried in declaration order; the
//! first match wins. Items matching no rule keep their collection.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::errors::StacTaskError;
use crate::ports::PathMatcher;

pub fn reassign_collections(
    features: &mut [Map<String, Value>],
    rules: Option<&IndexMap<String, String>>,
    matcher: &dyn PathMatcher,
) -> Result<(), StacTaskError> {
    let Some(rules) = rules else {
        return Ok(());
    };
    let compiled = rules
        .iter()
        .map(|(expression, collection)| {
            let predicate = matcher.compile(expression)?;
            Ok::<_, StacTaskError>((expression, predicate, collection))
        })
        .collect::<Result<Vec<_>, _>>()?;

    for feature in features.iter_mut() {
        let matched = compiled
            .iter()
            .find(|(_, predicate, _)| predicate.matches(feature));
        if let Some((expression, _, collection)) = matched {
            debug!(%expression, %collection, "collection rule matched");
            feature.insert("collection".to_string(), Value::String((*collection).clone()));
        }
    }
    Ok(())
}
