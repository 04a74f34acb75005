//! Executor - payload に対して 1 つの task を実行する
//!
//! # 実行フロー
//! 1. `process.tasks[name]` を取得（無ければ Configuration）
//! 2. Task を解決（呼び出し側の型 → registry）
//! 3. 設定から Task を構築し、TaskContext を用意
//! 4. Decode → Process → Encode
//! 5. Provenance を記録
//! 6. Collection を再割り当て
//! 7. 新しい Payload を返す（入力は変更しない）
//!
//! Nothing is retried here. Errors keep their kind all the way to the
//! caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{Instrument, debug, info, info_span, warn};

use super::collections::reassign_collections;
use super::provenance::stamp_provenance;
use crate::config::ExecutorConfig;
use crate::domain::errors::StacTaskError;
use crate::domain::ids::ExecutionId;
use crate::domain::payload::Payload;
use crate::domain::state::{ExecutionState, ExecutionTracker};
use crate::observability::ExecutionSummary;
use crate::ports::{AssetStore, PathMatcher};
use crate::typed::{DynTask, DynTaskInstance, Task, TaskContext, TaskRegistry, TypedTask, WorkingDirectory};

pub struct Executor {
    registry: Arc<TaskRegistry>,
    assets: Arc<dyn AssetStore>,
    matcher: Arc<dyn PathMatcher>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(
        registry: Arc<TaskRegistry>,
        assets: Arc<dyn AssetStore>,
        matcher: Arc<dyn PathMatcher>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            registry,
            assets,
            matcher,
            config,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Load a payload, following at most one indirection.
    pub async fn load_payload(&self, href: &str) -> Result<Payload, StacTaskError> {
        Payload::load_from(self.assets.as_ref(), href, true).await
    }

    pub async fn write_payload(&self, payload: &Payload, href: &str) -> Result<(), StacTaskError> {
        let bytes = payload.to_vec()?;
        self.assets.write_bytes(href, &bytes).await?;
        info!(%href, features = payload.features.len(), "payload written");
        Ok(())
    }

    /// Run the registered task `name` on `payload`, bounded by the
    /// configured timeout.
    pub async fn execute(&self, payload: &Payload, name: &str) -> Result<Payload, StacTaskError> {
        self.execute_within(payload, name, self.config.timeout())
            .await
    }

    /// Run `T` under `name` on `payload`, without consulting the registry.
    /// The configured timeout applies as for [`Executor::execute`].
    pub async fn execute_with<T: Task>(
        &self,
        payload: &Payload,
        name: &str,
    ) -> Result<Payload, StacTaskError> {
        self.execute_with_within::<T>(payload, name, self.config.timeout())
            .await
    }

    /// [`Executor::execute`] with an explicit timeout.
    pub async fn execute_with_timeout(
        &self,
        payload: &Payload,
        name: &str,
        timeout: Duration,
    ) -> Result<Payload, StacTaskError> {
        self.execute_within(payload, name, Some(timeout)).await
    }

    /// [`Executor::execute_with`] with an explicit timeout.
    pub async fn execute_with_type_timeout<T: Task>(
        &self,
        payload: &Payload,
        name: &str,
        timeout: Duration,
    ) -> Result<Payload, StacTaskError> {
        self.execute_with_within::<T>(payload, name, Some(timeout))
            .await
    }

    async fn execute_within(
        &self,
        payload: &Payload,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<Payload, StacTaskError> {
        let config = payload.task_config(name)?;
        let task = self.registry.get(name)?;
        self.execute_task(payload, name, task.as_ref(), config, timeout)
            .await
    }

    async fn execute_with_within<T: Task>(
        &self,
        payload: &Payload,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<Payload, StacTaskError> {
        let config = payload.task_config(name)?;
        self.execute_task(payload, name, &TypedTask::<T>::new(), config, timeout)
            .await
    }

    /// The single registered task configured in `payload`.
    pub fn select_task(&self, payload: &Payload) -> Result<String, StacTaskError> {
        let mut matches: Vec<&String> = payload
            .process
            .tasks
            .keys()
            .filter(|name| self.registry.contains(name))
            .collect();
        matches.sort();
        match matches.as_slice() {
            [name] => Ok((*name).clone()),
            [] => Err(StacTaskError::Configuration(format!(
                "no registered task is configured in the payload (registered: {})",
                self.registry.names().join(", ")
            ))),
            many => Err(StacTaskError::Configuration(format!(
                "multiple task execution is not supported: {}",
                many.iter()
                    .map(|name| name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    /// Load `input`, run `task` (or the only configured registered task) and
    /// optionally write the result to `output`.
    pub async fn run(
        &self,
        input: &str,
        task: Option<&str>,
        output: Option<&str>,
    ) -> Result<Payload, StacTaskError> {
        let payload = self.load_payload(input).await?;
        let name = match task {
            Some(name) => name.to_string(),
            None => self.select_task(&payload)?,
        };
        let result = self.execute(&payload, &name).await?;
        if let Some(output) = output {
            self.write_payload(&result, output).await?;
        }
        Ok(result)
    }

    async fn execute_task(
        &self,
        payload: &Payload,
        name: &str,
        task: &dyn DynTask,
        config: &Map<String, Value>,
        timeout: Option<Duration>,
    ) -> Result<Payload, StacTaskError> {
        let execution_id = ExecutionId::generate();
        let span = info_span!("execution", task = %name, execution_id = %execution_id);
        let execution = self
            .execute_in_span(payload, name, task, config, execution_id)
            .instrument(span);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, execution)
                .await
                .map_err(|_| StacTaskError::Timeout {
                    task: name.to_string(),
                    secs: limit.as_secs(),
                })?,
            None => execution.await,
        }
    }

    async fn execute_in_span(
        &self,
        payload: &Payload,
        name: &str,
        task: &dyn DynTask,
        config: &Map<String, Value>,
        execution_id: ExecutionId,
    ) -> Result<Payload, StacTaskError> {
        let started = Instant::now();
        let instance = task.construct(config)?;
        let mut tracker = ExecutionTracker::new();
        let ctx = self.context(name, payload, execution_id, task.keeps_working_directory())?;
        info!(
            features = payload.features.len(),
            version = task.version(),
            "execution started"
        );

        let result = self
            .pipeline(instance.as_ref(), &ctx, payload, name, task.version(), &mut tracker)
            .await;

        if let Err(e) = ctx.close() {
            warn!(error = %e, "failed to release working directory");
        }

        let features = match result {
            Ok(features) => features,
            Err(e) => {
                let state = tracker.state();
                tracker.fail();
                warn!(?state, kind = ?e.kind(), error = %e, "execution failed");
                return Err(e);
            }
        };
        tracker.advance(ExecutionState::Done)?;

        let summary = ExecutionSummary::new(
            execution_id,
            name,
            task.version(),
            payload.features.len(),
            features.len(),
            started.elapsed(),
        );
        info!(
            items_in = summary.items_in,
            items_out = summary.items_out,
            elapsed_ms = summary.elapsed_ms,
            "execution finished"
        );
        Ok(payload.with_features(features))
    }

    async fn pipeline(
        &self,
        instance: &dyn DynTaskInstance,
        ctx: &TaskContext,
        payload: &Payload,
        name: &str,
        version: &str,
        tracker: &mut ExecutionTracker,
    ) -> Result<Vec<Map<String, Value>>, StacTaskError> {
        let mut features = instance
            .process_features(ctx, &payload.features, tracker)
            .await?;

        stamp_provenance(&mut features, name, version)?;
        tracker.advance(ExecutionState::ProvenanceStamped)?;

        reassign_collections(
            &mut features,
            payload.process.upload_options.collections.as_ref(),
            self.matcher.as_ref(),
        )?;
        tracker.advance(ExecutionState::CollectionAssigned)?;
        Ok(features)
    }

    fn context(
        &self,
        name: &str,
        payload: &Payload,
        execution_id: ExecutionId,
        task_keeps_workdir: bool,
    ) -> Result<TaskContext, StacTaskError> {
        let keep = self.config.keep_workdir || task_keeps_workdir;
        let working_directory = match &self.config.workdir {
            Some(root) => WorkingDirectory::preserved(root.join(execution_id.to_string()))?,
            None => WorkingDirectory::temporary(keep)?,
        };
        if self.config.workdir.is_some() || keep {
            warn!(path = %working_directory.path().display(), "working directory will be preserved");
        } else {
            debug!(path = %working_directory.path().display(), "working directory");
        }
        Ok(TaskContext::new(
            name,
            payload.self_href.clone(),
            working_directory,
            self.assets.clone(),
        )
        .with_upload_options(payload.process.upload_options.clone())
        .with_concurrency(self.config.concurrency))
    }
}
