//! DynTask - 型消去された Task
//!
//! # Type erasure
//! - `TypedTask<T>` knows the concrete task type and builds instances of it
//!   from a configuration mapping.
//! - `DynTask` / `DynTaskInstance` are object-safe, so the registry can keep
//!   `HashMap<String, Arc<dyn DynTask>>`.

use std::marker::PhantomData;

use async_trait::async_trait;
use schemars::schema::RootSchema;
use serde_json::{Map, Value};

use super::codec::FeatureCodec;
use super::context::TaskContext;
use super::task::Task;
use crate::domain::errors::StacTaskError;
use crate::domain::state::{ExecutionState, ExecutionTracker};

/// A task type whose concrete input/output shapes are hidden.
pub trait DynTask: Send + Sync {
    fn version(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn keeps_working_directory(&self) -> bool;

    /// JSON schema of the features the task accepts.
    fn input_schema(&self) -> RootSchema;

    /// JSON schema of the features the task produces.
    fn output_schema(&self) -> RootSchema;

    /// Build a task from its configuration mapping.
    fn construct(
        &self,
        config: &Map<String, Value>,
    ) -> Result<Box<dyn DynTaskInstance>, StacTaskError>;
}

/// A constructed task, ready to process raw features once.
#[async_trait]
pub trait DynTaskInstance: Send + Sync {
    /// Decode, process and re-encode `features`, moving `tracker` through
    /// `Decoding`, `Processing` and `Encoding`.
    async fn process_features(
        &self,
        ctx: &TaskContext,
        features: &[Map<String, Value>],
        tracker: &mut ExecutionTracker,
    ) -> Result<Vec<Map<String, Value>>, StacTaskError>;
}

pub struct TypedTask<T: Task> {
    _marker: PhantomData<T>,
}

impl<T: Task> TypedTask<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Task> Default for TypedTask<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Task> DynTask for TypedTask<T> {
    fn version(&self) -> &'static str {
        T::VERSION
    }

    fn description(&self) -> &'static str {
        T::DESCRIPTION
    }

    fn keeps_working_directory(&self) -> bool {
        T::KEEPS_WORKING_DIRECTORY
    }

    fn input_schema(&self) -> RootSchema {
        schemars::schema_for!(T::Input)
    }

    fn output_schema(&self) -> RootSchema {
        schemars::schema_for!(T::Output)
    }

    fn construct(
        &self,
        config: &Map<String, Value>,
    ) -> Result<Box<dyn DynTaskInstance>, StacTaskError> {
        let task: T = serde_json::from_value(Value::Object(config.clone()))
            .map_err(|e| StacTaskError::Configuration(format!("invalid task config: {e}")))?;
        Ok(Box::new(task))
    }
}

#[async_trait]
impl<T: Task> DynTaskInstance for T {
    async fn process_features(
        &self,
        ctx: &TaskContext,
        features: &[Map<String, Value>],
        tracker: &mut ExecutionTracker,
    ) -> Result<Vec<Map<String, Value>>, StacTaskError> {
        tracker.advance(ExecutionState::Decoding)?;
        let inputs = FeatureCodec::decode::<T::Input>(features)?;

        tracker.advance(ExecutionState::Processing)?;
        let outputs = self.process(ctx, inputs).await?;

        tracker.advance(ExecutionState::Encoding)?;
        FeatureCodec::encode(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryAssetStore;
    use crate::typed::context::testing::context;
    use crate::domain::item::Item;
    use crate::typed::strategy::{
        HrefLogic, HrefTask, ItemLogic, ItemTask, OneToOne, OneToOneLogic, Passthrough,
    };
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Count {
        start: u64,
    }

    #[async_trait]
    impl OneToOneLogic for Count {
        type Input = Map<String, Value>;
        type Output = Value;

        async fn process_item(
            &self,
            _ctx: &TaskContext,
            item: Map<String, Value>,
        ) -> Result<Value, StacTaskError> {
            Ok(json!({"id": item["id"], "n": self.start}))
        }
    }

    fn features(ids: &[&str]) -> Vec<Map<String, Value>> {
        ids.iter()
            .map(|id| {
                let mut map = Map::new();
                map.insert("id".to_string(), json!(id));
                map
            })
            .collect()
    }

    #[test]
    fn invalid_config_is_a_configuration_error() {
        let task = TypedTask::<OneToOne<Count>>::new();
        let config = json!({"start": "zero"}).as_object().cloned().unwrap();
        let err = task.construct(&config).err().unwrap();
        assert!(matches!(err, StacTaskError::Configuration(_)));
    }

    #[tokio::test]
    async fn typed_task_runs_through_the_states() {
        let store = InMemoryAssetStore::new();
        let ctx = context(&store, None);
        let task = TypedTask::<OneToOne<Count>>::new();
        let config = json!({"start": 7}).as_object().cloned().unwrap();

        let instance = task.construct(&config).unwrap();
        let mut tracker = ExecutionTracker::new();
        let out = instance
            .process_features(&ctx, &features(&["a"]), &mut tracker)
            .await
            .unwrap();

        assert_eq!(out[0]["n"], 7);
        assert_eq!(tracker.state(), ExecutionState::Encoding);
    }

    #[tokio::test]
    async fn decode_failure_stops_in_decoding() {
        #[derive(Deserialize)]
        struct NeedsHref {}

        #[async_trait]
        impl OneToOneLogic for NeedsHref {
            type Input = crate::domain::item::Href;
            type Output = Value;

            async fn process_item(
                &self,
                _ctx: &TaskContext,
                item: crate::domain::item::Href,
            ) -> Result<Value, StacTaskError> {
                Ok(json!({"href": item.href}))
            }
        }

        let store = InMemoryAssetStore::new();
        let ctx = context(&store, None);
        let instance = TypedTask::<OneToOne<NeedsHref>>::new()
            .construct(&Map::new())
            .unwrap();
        let mut tracker = ExecutionTracker::new();
        let err = instance
            .process_features(&ctx, &features(&["a"]), &mut tracker)
            .await
            .unwrap_err();

        assert!(matches!(err, StacTaskError::Validation { index: 0, .. }));
        assert_eq!(tracker.state(), ExecutionState::Decoding);
    }

    #[derive(Deserialize)]
    struct ReadNothing {}

    #[async_trait]
    impl HrefLogic for ReadNothing {
        async fn read_item(&self, _ctx: &TaskContext, href: String) -> Result<Item, StacTaskError> {
            Ok(Item::new(href))
        }
    }

    #[derive(Deserialize)]
    struct Keep {}

    #[async_trait]
    impl ItemLogic for Keep {
        async fn process_item(&self, _ctx: &TaskContext, item: Item) -> Result<Item, StacTaskError> {
            Ok(item)
        }
    }

    #[tokio::test]
    async fn item_task_gives_back_what_it_received() {
        let store = InMemoryAssetStore::new();
        let ctx = context(&store, None);
        let instance = TypedTask::<ItemTask<Keep>>::new()
            .construct(&Map::new())
            .unwrap();
        let raw = json!({
            "type": "Feature",
            "stac_version": "1.0.0",
            "stac_extensions": [],
            "id": "b",
            "geometry": null,
            "properties": {"datetime": "2024-01-01T00:00:00Z"},
            "links": [],
            "assets": {},
            "collection": null
        });
        let input = vec![raw.as_object().cloned().unwrap()];

        let out = instance
            .process_features(&ctx, &input, &mut ExecutionTracker::new())
            .await
            .unwrap();
        assert_eq!(out, input);

        let mut nulls = input[0].clone();
        nulls.insert("stac_extensions".to_string(), Value::Null);
        let out = instance
            .process_features(&ctx, &[nulls], &mut ExecutionTracker::new())
            .await
            .unwrap();
        assert!(out[0].get("stac_extensions").is_none());
    }

    #[test]
    fn metadata_comes_from_the_task_type() {
        let task = TypedTask::<Passthrough>::new();
        assert_eq!(task.version(), "0.1.0");
        assert_eq!(task.description(), "Returns the input items unchanged.");
        assert!(!task.keeps_working_directory());
    }

    #[test]
    fn schemas_follow_the_item_shapes() {
        let task = TypedTask::<HrefTask<ReadNothing>>::new();
        let input = serde_json::to_value(task.input_schema()).unwrap();
        let output = serde_json::to_value(task.output_schema()).unwrap();

        assert_eq!(input["title"], "Href");
        assert_eq!(input["required"], json!(["href"]));
        assert_eq!(output["title"], "Item");
        assert!(output["properties"]["id"].is_object());
    }
}
