//! TaskRegistry - Task の登録と管理
//!
//! Populated once at startup (see [`AppBuilder`](crate::app::AppBuilder))
//! and shared read-only through `Arc` afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{DynTask, TypedTask};
use super::task::Task;
use crate::domain::errors::StacTaskError;

/// TaskRegistry は task 名と Task 型を対応付ける
///
/// # 使用例
/// ```ignore
/// let mut registry = TaskRegistry::new();
/// registry.register::<Passthrough>("passthrough")?;
///
/// let task = registry.get("passthrough")?;
/// ```
#[derive(Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<dyn DynTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `T`. A name can only be bound once.
    pub fn register<T: Task>(&mut self, name: impl Into<String>) -> Result<(), StacTaskError> {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            return Err(StacTaskError::DuplicateRegistration(name));
        }
        self.tasks.insert(name, Arc::new(TypedTask::<T>::new()));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn DynTask>, StacTaskError> {
        self.tasks
            .get(name)
            .cloned()
            .ok_or_else(|| StacTaskError::UnknownTask {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn description(&self, name: &str) -> Option<&'static str> {
        self.tasks.get(name).map(|task| task.description())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
