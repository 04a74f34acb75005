//! Typed - 型付き Task API
//!
//! # 二層構造
//! - **表層（Typed）**: `Task` trait and the strategy adapters - 型安全
//! - **内部（Dyn）**: `DynTask` / `DynTaskInstance` - object-safe, type erasure

pub mod codec;
pub mod context;
pub mod handler;
pub mod registry;
pub mod strategy;
pub mod task;

pub use self::codec::FeatureCodec;
pub use self::context::{TaskContext, WorkingDirectory};
pub use self::handler::{DynTask, DynTaskInstance, TypedTask};
pub use self::registry::TaskRegistry;
pub use self::strategy::{
    HrefLogic, HrefTask, Hrefs, Identity, ItemLogic, ItemTask, Items, OneToMany, OneToManyLogic,
    OneToOne, OneToOneLogic, Passthrough, PassthroughLogic,
};
pub use self::task::{DEFAULT_TASK_VERSION, Task};
