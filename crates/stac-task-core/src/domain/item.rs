//! Item shapes that tasks declare as their input or output.
//!
//! - [`Item`]: a STAC item (our own model, extra fields preserved)
//! - [`Href`]: a bare reference to something that becomes an item
//! - [`Anything`]: any JSON object
//! - [`Nothing`]: accepts any object and keeps none of it

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Any JSON object, untouched.
pub type Anything = Map<String, Value>;

/// Accepts any object and ignores its content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Nothing {}

/// A model for a single href.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Href {
    pub href: String,
}

pub const STAC_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ItemType {
    #[default]
    Feature,
}

/// A STAC Item.
///
/// Unknown fields are kept in `extra` at every level so an item survives a
/// decode/encode cycle without losing data. `collection` and `bbox` also
/// remember whether they were absent or an explicit `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Item {
    #[serde(rename = "type", default)]
    pub kind: ItemType,

    #[serde(default = "default_stac_version")]
    pub stac_version: String,

    /// `null` is accepted and read as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stac_extensions: Option<Vec<String>>,

    pub id: String,

    /// GeoJSON geometry; `null` is allowed.
    #[serde(default)]
    pub geometry: Option<Value>,

    /// Outer `None`: absent. `Some(None)`: explicit `null`.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<Vec<f64>>")]
    pub bbox: Option<Option<Vec<f64>>>,

    #[serde(default)]
    pub properties: Properties,

    #[serde(default)]
    pub links: Vec<Link>,

    #[serde(default)]
    pub assets: IndexMap<String, Asset>,

    /// Same convention as `bbox`; see [`Item::collection`].
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub collection: Option<Option<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_stac_version() -> String {
    STAC_VERSION.to_string()
}

/// A field that is in the document, `null` or not.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Properties {
    /// RFC 3339 timestamp in UTC; `null` requires start/end datetimes.
    #[serde(default)]
    pub datetime: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Asset {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Asset {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: None,
            description: None,
            media_type: None,
            roles: None,
            extra: Map::new(),
        }
    }
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            kind: ItemType::Feature,
            stac_version: default_stac_version(),
            stac_extensions: None,
            id: id.into(),
            geometry: None,
            bbox: None,
            properties: Properties::default(),
            links: Vec::new(),
            assets: IndexMap::new(),
            collection: None,
            extra: Map::new(),
        }
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_ref().and_then(|c| c.as_deref())
    }

    pub fn set_collection(&mut self, collection: impl Into<String>) {
        self.collection = Some(Some(collection.into()));
    }

    /// The href of the single `self` link, if there is exactly one.
    pub fn self_href(&self) -> Option<&str> {
        let mut hrefs = self.links.iter().filter(|l| l.rel == "self");
        match (hrefs.next(), hrefs.next()) {
            (Some(link), None) => Some(link.href.as_str()),
            _ => None,
        }
    }

    /// `properties.datetime` parsed as RFC 3339.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.properties
            .datetime
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Copy this item as the starting point of a derived output.
    ///
    /// When the source has a `self` link, the copy gets a `derived_from`
    /// link back to it.
    pub fn derive(&self) -> Item {
        let mut derived = self.clone();
        if let Some(href) = self.self_href() {
            derived.links.push(Link {
                href: href.to_string(),
                rel: "derived_from".to_string(),
                media_type: Some("application/json".to_string()),
                title: Some("Source STAC Item".to_string()),
                extra: Map::new(),
            });
        }
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_survive() {
        let raw = json!({
            "type": "Feature",
            "stac_version": "1.0.0",
            "id": "an-id",
            "geometry": null,
            "properties": {"datetime": "2020-12-11T22:38:32Z", "eo:cloud_cover": 3},
            "links": [],
            "assets": {"data": {"href": "./data.tif", "file:size": 10}},
            "custom": [1, 2]
        });
        let item: Item = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(item.properties.extra["eo:cloud_cover"], 3);
        assert_eq!(item.assets["data"].extra["file:size"], 10);
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn id_is_required() {
        let result = serde_json::from_value::<Item>(json!({"type": "Feature"}));
        assert!(result.is_err());
    }

    #[test]
    fn wrong_type_is_rejected() {
        let result = serde_json::from_value::<Item>(json!({"type": "Catalog", "id": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn datetime_is_parsed() {
        let mut item = Item::new("x");
        item.properties.datetime = Some("2021-03-04T05:06:07Z".to_string());
        let dt = item.datetime().unwrap();
        assert_eq!(dt.to_rfc3339(), "2021-03-04T05:06:07+00:00");
    }

    #[test]
    fn derive_links_back_to_source() {
        let mut item = Item::new("x");
        item.links.push(Link {
            href: "s3://bucket/x.json".to_string(),
            rel: "self".to_string(),
            media_type: None,
            title: None,
            extra: Map::new(),
        });
        let derived = item.derive();
        assert_eq!(derived.links.len(), 2);
        assert_eq!(derived.links[1].rel, "derived_from");
        assert_eq!(derived.links[1].href, "s3://bucket/x.json");
    }

    #[test]
    fn null_extensions_are_accepted() {
        let item: Item = serde_json::from_value(json!({
            "type": "Feature",
            "id": "a",
            "stac_extensions": null,
            "geometry": null,
            "properties": {"datetime": null}
        }))
        .unwrap();
        assert_eq!(item.stac_extensions, None);
        assert!(serde_json::to_value(&item).unwrap().get("stac_extensions").is_none());
    }

    #[test]
    fn present_fields_come_back_as_received() {
        let raw = json!({
            "type": "Feature",
            "stac_version": "1.0.0",
            "stac_extensions": [],
            "id": "b",
            "geometry": null,
            "bbox": null,
            "properties": {"datetime": null},
            "links": [],
            "assets": {},
            "collection": null
        });
        let item: Item = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(item.stac_extensions, Some(Vec::new()));
        assert_eq!(item.collection, Some(None));
        assert_eq!(item.bbox, Some(None));
        assert_eq!(item.collection(), None);
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn absent_fields_stay_absent() {
        let value = serde_json::to_value(Item::new("c")).unwrap();
        assert!(value.get("collection").is_none());
        assert!(value.get("bbox").is_none());

        let mut item = Item::new("c");
        item.set_collection("raw");
        assert_eq!(item.collection(), Some("raw"));
        assert_eq!(serde_json::to_value(&item).unwrap()["collection"], "raw");
    }

    #[test]
    fn schema_describes_an_item() {
        let schema = serde_json::to_value(schemars::schema_for!(Item)).unwrap();
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("id")));
        assert!(schema["properties"]["assets"].is_object());
    }

    #[test]
    fn nothing_accepts_anything() {
        let nothing: Nothing = serde_json::from_value(json!({"a": 1, "b": [2]})).unwrap();
        assert_eq!(nothing, Nothing {});
    }
}
