//! FeatureCodec - raw feature と Task の型の相互変換

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::domain::errors::StacTaskError;

/// FeatureCodec は raw feature を T にデシリアライズ
///
/// Both directions stop at the first bad feature and report its index as a
/// `Validation` error.
pub struct FeatureCodec;

impl FeatureCodec {
    pub fn decode<T: DeserializeOwned>(
        features: &[Map<String, Value>],
    ) -> Result<Vec<T>, StacTaskError> {
        features
            .iter()
            .enumerate()
            .map(|(index, feature)| {
                serde_json::from_value(Value::Object(feature.clone())).map_err(|e| {
                    StacTaskError::Validation {
                        index,
                        message: e.to_string(),
                    }
                })
            })
            .collect()
    }

    pub fn encode<T: Serialize>(outputs: Vec<T>) -> Result<Vec<Map<String, Value>>, StacTaskError> {
        outputs
            .into_iter()
            .enumerate()
            .map(|(index, output)| match serde_json::to_value(output) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Err(StacTaskError::Validation {
                    index,
                    message: "output is not a JSON object".to_string(),
                }),
                Err(e) => Err(StacTaskError::Validation {
                    index,
                    message: e.to_string(),
                }),
            })
            .collect()
    }
}
