//! High-level entry point tying planning, execution and persistence together.

use std::sync::Arc;

use tracing::info;

use super::executor::{execute_workflow, ExecuteRequest};
use super::hooks::{CheckpointHooks, HookChain, InstallationHooks};
use crate::config::{CheckpointPolicy, Settings};
use crate::error::{Result, SetupError};
use crate::plan::{RunId, StateBuilder};
use crate::state::{FileStateStore, InstallationState, InstallationStateStore};
use crate::steps::{InstallationContext, Step};

/// Runs one step tree, optionally checkpointing to a store.
///
/// ```
/// use setuptree::runner::Installer;
/// use setuptree::steps::{InstallationContext, Step, StepMeta};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let root = Step::branch("root", StepMeta::new("Root"))
///     .child(
///         Step::leaf("step1", StepMeta::new("Step 1"))
///             .run_blocking(|_config: &(), _ctx| Ok(json!({"key": "value"})))
///             .unwrap(),
///     )
///     .build()
///     .unwrap();
///
/// let state = Installer::new(root)
///     .install(Arc::new(()), InstallationContext::default())
///     .await;
/// assert!(state.succeeded());
/// assert_eq!(state.data["root"]["step1"]["key"], "value");
/// # }
/// ```
pub struct Installer<C> {
    root: Step<C>,
    builder: StateBuilder,
    store: Option<Arc<dyn InstallationStateStore>>,
    checkpoint: CheckpointPolicy,
    hooks: Vec<Arc<dyn InstallationHooks>>,
}

impl<C: Send + Sync + 'static> Installer<C> {
    pub fn new(root: Step<C>) -> Self {
        Self {
            root,
            builder: StateBuilder::new(),
            store: None,
            checkpoint: CheckpointPolicy::default(),
            hooks: Vec::new(),
        }
    }

    /// Checkpoint runs to `store`.
    pub fn with_store(mut self, store: Arc<dyn InstallationStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_checkpoint_policy(mut self, policy: CheckpointPolicy) -> Self {
        self.checkpoint = policy;
        self
    }

    /// Add an observer. Observers run in the order they were added, after
    /// checkpointing.
    pub fn with_hooks(mut self, hooks: Arc<dyn InstallationHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    /// Use a specific builder (for injected ids and clock).
    pub fn with_state_builder(mut self, builder: StateBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Apply engine settings: the checkpoint policy, and a file store when
    /// `state_dir` is set.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.checkpoint = settings.checkpoint;
        if let Some(dir) = &settings.state_dir {
            self.store = Some(Arc::new(FileStateStore::new(dir)));
        }
        self
    }

    pub fn root(&self) -> &Step<C> {
        &self.root
    }

    /// Plan a run without executing it.
    pub fn plan(&self, config: &C) -> InstallationState {
        self.builder.build(&self.root, config)
    }

    /// Plan and execute a fresh run.
    pub async fn install(
        &self,
        config: Arc<C>,
        installation_context: InstallationContext,
    ) -> InstallationState {
        let state = self.plan(&config);
        info!("Starting installation {}", state.id);
        self.execute(config, installation_context, state).await
    }

    /// Continue a stored run: leaves that succeeded before are not run again.
    ///
    /// # Errors
    ///
    /// Returns `StateNotFound` if no store is configured or it has no state
    /// for `id`.
    pub async fn resume(
        &self,
        id: &RunId,
        config: Arc<C>,
        installation_context: InstallationContext,
    ) -> Result<InstallationState> {
        let not_found = || SetupError::StateNotFound { id: id.to_string() };
        let store = self.store.as_ref().ok_or_else(not_found)?;
        let previous = store.get(id).await?.ok_or_else(not_found)?;

        let state = self.builder.resume(&previous, &self.root, &config);
        info!("Resuming installation {} as {}", previous.id, state.id);
        Ok(self.execute(config, installation_context, state).await)
    }

    async fn execute(
        &self,
        config: Arc<C>,
        installation_context: InstallationContext,
        state: InstallationState,
    ) -> InstallationState {
        let mut chain = HookChain::new();
        if let Some(store) = &self.store {
            chain.push(Arc::new(CheckpointHooks::new(
                Arc::clone(store),
                self.checkpoint,
            )));
        }
        for hooks in &self.hooks {
            chain.push(Arc::clone(hooks));
        }

        let request = ExecuteRequest::new(&self.root, installation_context, config, state)
            .with_hooks(&chain)
            .with_clock(self.builder.clock());
        execute_workflow(request).await
    }
}
