//! Processing strategies
//!
//! A task picks the shape of its batch processing by wrapping its per-item
//! logic in one of the adapters below:
//!
//! | adapter | logic trait | items |
//! |---|---|---|
//! | [`Passthrough`] | [`PassthroughLogic`] | output equals input |
//! | [`OneToOne`] | [`OneToOneLogic`] | one output per input |
//! | [`OneToMany`] | [`OneToManyLogic`] | zero or more outputs per input |
//! | [`ItemTask`] | [`ItemLogic`] | item in, item out |
//! | [`HrefTask`] | [`HrefLogic`] | href in, item out |
//!
//! Adapters are transparent for serde, so the task configuration is the
//! configuration of the wrapped logic.
//!
//! Per-item work runs on a bounded stream sized by
//! [`TaskContext::concurrency`]. The item futures are polled inside the
//! executing task, so they overlap while waiting on I/O but never run in
//! parallel on separate workers. Outputs keep the input order and the first
//! failing item aborts the batch with its index attached.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::context::TaskContext;
use super::task::{DEFAULT_TASK_VERSION, Task};
use crate::domain::errors::StacTaskError;
use crate::domain::item::{Anything, Href, Item};

// ───────────────────────────────────────────────────────────────────────────
// Passthrough
// ───────────────────────────────────────────────────────────────────────────

/// Side effects of a passthrough task. The batch itself is never changed.
#[async_trait]
pub trait PassthroughLogic: DeserializeOwned + Send + Sync + 'static {
    const VERSION: &'static str = DEFAULT_TASK_VERSION;
    const DESCRIPTION: &'static str = "";
    const KEEPS_WORKING_DIRECTORY: bool = false;

    async fn observe(&self, ctx: &TaskContext, items: &[Anything]) -> Result<(), StacTaskError>;
}

/// No side effects at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Identity {}

#[async_trait]
impl PassthroughLogic for Identity {
    const DESCRIPTION: &'static str = "Returns the input items unchanged.";

    async fn observe(&self, _ctx: &TaskContext, _items: &[Anything]) -> Result<(), StacTaskError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Passthrough<L = Identity>(pub L);

#[async_trait]
impl<L: PassthroughLogic> Task for Passthrough<L> {
    type Input = Anything;
    type Output = Anything;

    const VERSION: &'static str = L::VERSION;
    const DESCRIPTION: &'static str = L::DESCRIPTION;
    const KEEPS_WORKING_DIRECTORY: bool = L::KEEPS_WORKING_DIRECTORY;

    async fn process(
        &self,
        ctx: &TaskContext,
        items: Vec<Anything>,
    ) -> Result<Vec<Anything>, StacTaskError> {
        self.0.observe(ctx, &items).await?;
        Ok(items)
    }
}

// ───────────────────────────────────────────────────────────────────────────
// One to one
// ───────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait OneToOneLogic: DeserializeOwned + Send + Sync + 'static {
    type Input: DeserializeOwned + JsonSchema + Send + 'static;
    type Output: Serialize + JsonSchema + Send + 'static;

    const VERSION: &'static str = DEFAULT_TASK_VERSION;
    const DESCRIPTION: &'static str = "";
    const KEEPS_WORKING_DIRECTORY: bool = false;

    async fn process_item(
        &self,
        ctx: &TaskContext,
        item: Self::Input,
    ) -> Result<Self::Output, StacTaskError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct OneToOne<L>(pub L);

#[async_trait]
impl<L: OneToOneLogic> Task for OneToOne<L> {
    type Input = L::Input;
    type Output = L::Output;

    const VERSION: &'static str = L::VERSION;
    const DESCRIPTION: &'static str = L::DESCRIPTION;
    const KEEPS_WORKING_DIRECTORY: bool = L::KEEPS_WORKING_DIRECTORY;

    async fn process(
        &self,
        ctx: &TaskContext,
        items: Vec<L::Input>,
    ) -> Result<Vec<L::Output>, StacTaskError> {
        let logic = &self.0;
        stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| async move {
                logic
                    .process_item(ctx, item)
                    .await
                    .map_err(|e| e.at_item(index))
            })
            .buffered(ctx.concurrency())
            .try_collect()
            .await
    }
}

// ───────────────────────────────────────────────────────────────────────────
// One to many
// ───────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait OneToManyLogic: DeserializeOwned + Send + Sync + 'static {
    type Input: DeserializeOwned + JsonSchema + Send + 'static;
    type Output: Serialize + JsonSchema + Send + 'static;

    const VERSION: &'static str = DEFAULT_TASK_VERSION;
    const DESCRIPTION: &'static str = "";
    const KEEPS_WORKING_DIRECTORY: bool = false;

    async fn process_item(
        &self,
        ctx: &TaskContext,
        item: Self::Input,
    ) -> Result<Vec<Self::Output>, StacTaskError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct OneToMany<L>(pub L);

#[async_trait]
impl<L: OneToManyLogic> Task for OneToMany<L> {
    type Input = L::Input;
    type Output = L::Output;

    const VERSION: &'static str = L::VERSION;
    const DESCRIPTION: &'static str = L::DESCRIPTION;
    const KEEPS_WORKING_DIRECTORY: bool = L::KEEPS_WORKING_DIRECTORY;

    async fn process(
        &self,
        ctx: &TaskContext,
        items: Vec<L::Input>,
    ) -> Result<Vec<L::Output>, StacTaskError> {
        let logic = &self.0;
        let batches: Vec<Vec<L::Output>> = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| async move {
                logic
                    .process_item(ctx, item)
                    .await
                    .map_err(|e| e.at_item(index))
            })
            .buffered(ctx.concurrency())
            .try_collect()
            .await?;
        Ok(batches.into_iter().flatten().collect())
    }
}

// ───────────────────────────────────────────────────────────────────────────
// Item and href specialisations
// ───────────────────────────────────────────────────────────────────────────

/// Catalog item in, catalog item out.
#[async_trait]
pub trait ItemLogic: DeserializeOwned + Send + Sync + 'static {
    const VERSION: &'static str = DEFAULT_TASK_VERSION;
    const DESCRIPTION: &'static str = "";
    const KEEPS_WORKING_DIRECTORY: bool = false;

    async fn process_item(&self, ctx: &TaskContext, item: Item) -> Result<Item, StacTaskError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Items<L>(pub L);

#[async_trait]
impl<L: ItemLogic> OneToOneLogic for Items<L> {
    type Input = Item;
    type Output = Item;

    const VERSION: &'static str = L::VERSION;
    const DESCRIPTION: &'static str = L::DESCRIPTION;
    const KEEPS_WORKING_DIRECTORY: bool = L::KEEPS_WORKING_DIRECTORY;

    async fn process_item(&self, ctx: &TaskContext, item: Item) -> Result<Item, StacTaskError> {
        self.0.process_item(ctx, item).await
    }
}

/// Turns an href into a catalog item.
///
/// The href handed to [`HrefLogic::read_item`] is already absolute when
/// the payload was loaded from a known location.
#[async_trait]
pub trait HrefLogic: DeserializeOwned + Send + Sync + 'static {
    const VERSION: &'static str = DEFAULT_TASK_VERSION;
    const DESCRIPTION: &'static str = "";
    const KEEPS_WORKING_DIRECTORY: bool = false;

    async fn read_item(&self, ctx: &TaskContext, href: String) -> Result<Item, StacTaskError>;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Hrefs<L>(pub L);

#[async_trait]
impl<L: HrefLogic> OneToOneLogic for Hrefs<L> {
    type Input = Href;
    type Output = Item;

    const VERSION: &'static str = L::VERSION;
    const DESCRIPTION: &'static str = L::DESCRIPTION;
    const KEEPS_WORKING_DIRECTORY: bool = L::KEEPS_WORKING_DIRECTORY;

    async fn process_item(&self, ctx: &TaskContext, item: Href) -> Result<Item, StacTaskError> {
        let href = ctx.resolve_href(&item.href)?;
        self.0.read_item(ctx, href).await
    }
}

pub type ItemTask<L> = OneToOne<Items<L>>;
pub type HrefTask<L> = OneToOne<Hrefs<L>>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::errors::ErrorKind;
    use crate::impls::InMemoryAssetStore;
    use crate::typed::context::testing::context;
    use serde_json::{Value, json};

    fn object(value: Value) -> Anything {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[derive(Deserialize)]
    struct Tag {
        value: String,
        #[serde(default)]
        fail_on: Option<String>,
    }

    #[async_trait]
    impl OneToOneLogic for Tag {
        type Input = Anything;
        type Output = Anything;

        async fn process_item(
            &self,
            _ctx: &TaskContext,
            mut item: Anything,
        ) -> Result<Anything, StacTaskError> {
            let id = item["id"].as_str().unwrap_or_default().to_string();
            if self.fail_on.as_deref() == Some(id.as_str()) {
                return Err(StacTaskError::task(format!("cannot tag {id}")));
            }
            // later items finish first
            let delay = 30u64.saturating_sub(item["n"].as_u64().unwrap_or(0) * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            item.insert("tag".to_string(), json!(self.value));
            Ok(item)
        }
    }

    #[derive(Deserialize)]
    struct Repeat {
        #[serde(default)]
        fail_on: Option<String>,
    }

    #[async_trait]
    impl OneToManyLogic for Repeat {
        type Input = Anything;
        type Output = Anything;

        async fn process_item(
            &self,
            _ctx: &TaskContext,
            item: Anything,
        ) -> Result<Vec<Anything>, StacTaskError> {
            let id = item["id"].as_str().unwrap_or_default();
            if self.fail_on.as_deref() == Some(id) {
                return Err(StacTaskError::task(format!("cannot repeat {id}")));
            }
            let times = item["times"].as_u64().unwrap_or(0) as usize;
            Ok(vec![item; times])
        }
    }

    fn numbered(ids: &[&str]) -> Vec<Anything> {
        ids.iter()
            .enumerate()
            .map(|(n, id)| object(json!({"id": id, "n": n})))
            .collect()
    }

    #[tokio::test]
    async fn passthrough_returns_input() {
        let store = InMemoryAssetStore::new();
        let ctx = context(&store, None);
        let items = numbered(&["a", "b"]);

        let task: Passthrough = serde_json::from_value(json!({})).unwrap();
        let out = task.process(&ctx, items.clone()).await.unwrap();
        assert_eq!(out, items);
    }

    #[tokio::test]
    async fn one_to_one_keeps_order_under_concurrency() {
        let store = InMemoryAssetStore::new();
        let ctx = context(&store, None).with_concurrency(4);

        let task: OneToOne<Tag> = serde_json::from_value(json!({"value": "t"})).unwrap();
        let out = task.process(&ctx, numbered(&["a", "b", "c"])).await.unwrap();

        let ids: Vec<_> = out.iter().map(|i| i["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("b"), json!("c")]);
        assert!(out.iter().all(|i| i["tag"] == "t"));
    }

    #[tokio::test]
    async fn one_to_one_failure_names_the_item() {
        let store = InMemoryAssetStore::new();
        let ctx = context(&store, None).with_concurrency(2);

        let task: OneToOne<Tag> =
            serde_json::from_value(json!({"value": "t", "fail_on": "b"})).unwrap();
        let err = task
            .process(&ctx, numbered(&["a", "b", "c"]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Task);
        assert!(matches!(err, StacTaskError::Task { index: Some(1), .. }));
    }

    #[tokio::test]
    async fn one_to_many_concatenates_in_input_order() {
        let store = InMemoryAssetStore::new();
        let ctx = context(&store, None).with_concurrency(3);
        let items = vec![
            object(json!({"id": "a", "times": 2})),
            object(json!({"id": "b", "times": 0})),
            object(json!({"id": "c", "times": 1})),
        ];

        let task = OneToMany(Repeat { fail_on: None });
        let out = task.process(&ctx, items).await.unwrap();
        let ids: Vec<_> = out.iter().map(|i| i["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("a"), json!("c")]);
    }

    #[tokio::test]
    async fn one_to_many_failure_aborts_the_batch() {
        let store = InMemoryAssetStore::new();
        let ctx = context(&store, None).with_concurrency(3);
        let items = vec![
            object(json!({"id": "a", "times": 2})),
            object(json!({"id": "b", "times": 1})),
            object(json!({"id": "c", "times": 3})),
        ];

        let task: OneToMany<Repeat> = serde_json::from_value(json!({"fail_on": "c"})).unwrap();
        let err = task.process(&ctx, items).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Task);
        assert!(matches!(err, StacTaskError::Task { index: Some(2), .. }));
    }

    #[derive(Deserialize)]
    struct ReadJson {}

    #[async_trait]
    impl HrefLogic for ReadJson {
        async fn read_item(&self, ctx: &TaskContext, href: String) -> Result<Item, StacTaskError> {
            let bytes = ctx.assets().fetch_bytes(&href).await?;
            serde_json::from_slice(&bytes).map_err(StacTaskError::task)
        }
    }

    #[tokio::test]
    async fn href_task_resolves_relative_hrefs() {
        let store = InMemoryAssetStore::new();
        store
            .put("mem://data/items/x.json", serde_json::to_vec(&Item::new("x")).unwrap())
            .await;
        let ctx = context(&store, Some("mem://data/payload.json"));

        let task: HrefTask<ReadJson> = serde_json::from_value(json!({})).unwrap();
        let href = Href {
            href: "./items/x.json".to_string(),
        };
        let out = task.process(&ctx, vec![href]).await.unwrap();
        assert_eq!(out[0].id, "x");
    }

    #[derive(Deserialize)]
    struct Rename {
        suffix: String,
    }

    #[async_trait]
    impl ItemLogic for Rename {
        const VERSION: &'static str = "2.1.0";

        async fn process_item(&self, _ctx: &TaskContext, item: Item) -> Result<Item, StacTaskError> {
            let mut out = item.derive();
            out.id = format!("{}{}", item.id, self.suffix);
            Ok(out)
        }
    }

    #[tokio::test]
    async fn item_task_takes_config_of_its_logic() {
        let store = InMemoryAssetStore::new();
        let ctx = context(&store, None);

        let task: ItemTask<Rename> = serde_json::from_value(json!({"suffix": "-v2"})).unwrap();
        let out = task.process(&ctx, vec![Item::new("x")]).await.unwrap();
        assert_eq!(out[0].id, "x-v2");
        assert_eq!(<ItemTask<Rename> as Task>::VERSION, "2.1.0");
        assert_eq!(<OneToMany<Repeat> as Task>::VERSION, DEFAULT_TASK_VERSION);
    }
}
