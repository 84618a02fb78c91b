//! Observer hooks invoked at run and step transitions.
//!
//! Every method of [`InstallationHooks`] has a no-op default, so an observer
//! implements only the transitions it cares about. Hooks are awaited before
//! the executor continues and receive a read-only view of the state as it is
//! at that moment. They cannot fail; an observer that can fail (such as
//! [`CheckpointHooks`]) handles its own errors.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::CheckpointPolicy;
use crate::state::{InstallationState, InstallationStateStore};

/// Payload of the step-level hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEvent {
    /// Name of the step.
    pub step_name: String,
    /// Whether the step is a leaf.
    pub is_leaf: bool,
    /// Step names from the root to this step.
    pub path: Vec<String>,
}

impl StepEvent {
    pub fn new(path: &[String], is_leaf: bool) -> Self {
        Self {
            step_name: path.last().cloned().unwrap_or_default(),
            is_leaf,
            path: path.to_vec(),
        }
    }
}

/// Observer of an installation run.
#[async_trait]
pub trait InstallationHooks: Send + Sync {
    /// Called once, before any step starts.
    async fn on_installation_start(&self, _state: &InstallationState) {}

    /// Called once when every applicable step succeeded.
    async fn on_installation_success(&self, _state: &InstallationState) {}

    /// Called once when the run failed.
    async fn on_installation_failure(&self, _state: &InstallationState) {}

    /// Called after a step was marked `in-progress`.
    async fn on_step_start(&self, _event: &StepEvent, _state: &InstallationState) {}

    /// Called after a step was marked `succeeded`.
    async fn on_step_success(&self, _event: &StepEvent, _state: &InstallationState) {}

    /// Called after a step was marked `failed`, for the failing step and
    /// every ancestor branch.
    async fn on_step_failure(&self, _event: &StepEvent, _state: &InstallationState) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl InstallationHooks for NoopHooks {}

/// Runs several observers in order.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn InstallationHooks>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer.
    pub fn with(mut self, hooks: Arc<dyn InstallationHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    pub fn push(&mut self, hooks: Arc<dyn InstallationHooks>) {
        self.hooks.push(hooks);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[async_trait]
impl InstallationHooks for HookChain {
    async fn on_installation_start(&self, state: &InstallationState) {
        for hooks in &self.hooks {
            hooks.on_installation_start(state).await;
        }
    }

    async fn on_installation_success(&self, state: &InstallationState) {
        for hooks in &self.hooks {
            hooks.on_installation_success(state).await;
        }
    }

    async fn on_installation_failure(&self, state: &InstallationState) {
        for hooks in &self.hooks {
            hooks.on_installation_failure(state).await;
        }
    }

    async fn on_step_start(&self, event: &StepEvent, state: &InstallationState) {
        for hooks in &self.hooks {
            hooks.on_step_start(event, state).await;
        }
    }

    async fn on_step_success(&self, event: &StepEvent, state: &InstallationState) {
        for hooks in &self.hooks {
            hooks.on_step_success(event, state).await;
        }
    }

    async fn on_step_failure(&self, event: &StepEvent, state: &InstallationState) {
        for hooks in &self.hooks {
            hooks.on_step_failure(event, state).await;
        }
    }
}

/// Logs every transition through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHooks;

#[async_trait]
impl InstallationHooks for TracingHooks {
    async fn on_installation_start(&self, state: &InstallationState) {
        info!(
            "Installation {} started ({} steps)",
            state.id,
            state.root.count()
        );
    }

    async fn on_installation_success(&self, state: &InstallationState) {
        info!("Installation {} succeeded", state.id);
    }

    async fn on_installation_failure(&self, state: &InstallationState) {
        match &state.error {
            Some(error) => warn!("Installation {} failed at {}", state.id, error),
            None => warn!("Installation {} failed", state.id),
        }
    }

    async fn on_step_start(&self, event: &StepEvent, _state: &InstallationState) {
        debug!("Step {} started", event.path.join("."));
    }

    async fn on_step_success(&self, event: &StepEvent, _state: &InstallationState) {
        debug!("Step {} succeeded", event.path.join("."));
    }

    async fn on_step_failure(&self, event: &StepEvent, _state: &InstallationState) {
        debug!("Step {} failed", event.path.join("."));
    }
}

/// Persists the state to a store at the transitions selected by a
/// [`CheckpointPolicy`].
///
/// Save failures are logged and otherwise ignored; the run continues with
/// its in-memory state.
#[derive(Clone)]
pub struct CheckpointHooks {
    store: Arc<dyn InstallationStateStore>,
    policy: CheckpointPolicy,
}

impl CheckpointHooks {
    pub fn new(store: Arc<dyn InstallationStateStore>, policy: CheckpointPolicy) -> Self {
        Self { store, policy }
    }

    async fn save(&self, state: &InstallationState) {
        if let Err(e) = self.store.save(state).await {
            warn!("Failed to checkpoint installation {}: {}", state.id, e);
        }
    }

    async fn save_run(&self, state: &InstallationState) {
        if self.policy != CheckpointPolicy::Disabled {
            self.save(state).await;
        }
    }

    async fn save_step(&self, state: &InstallationState) {
        if self.policy == CheckpointPolicy::EveryTransition {
            self.save(state).await;
        }
    }
}

#[async_trait]
impl InstallationHooks for CheckpointHooks {
    async fn on_installation_start(&self, state: &InstallationState) {
        self.save_run(state).await;
    }

    async fn on_installation_success(&self, state: &InstallationState) {
        self.save_run(state).await;
    }

    async fn on_installation_failure(&self, state: &InstallationState) {
        self.save_run(state).await;
    }

    async fn on_step_start(&self, _event: &StepEvent, state: &InstallationState) {
        self.save_step(state).await;
    }

    async fn on_step_success(&self, _event: &StepEvent, state: &InstallationState) {
        self.save_step(state).await;
    }

    async fn on_step_failure(&self, _event: &StepEvent, state: &InstallationState) {
        self.save_step(state).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SetupError};
    use crate::plan::{RunId, StateBuilder};
    use crate::state::MemoryStateStore;
    use crate::steps::{Step, StepMeta};
    use tokio::sync::Mutex;

    fn state() -> InstallationState {
        let root: Step<()> = Step::branch("root", StepMeta::new("Root")).build().unwrap();
        StateBuilder::new().build(&root, &())
    }

    fn event() -> StepEvent {
        StepEvent::new(&["root".to_string(), "a".to_string()], true)
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl InstallationHooks for Recorder {
        async fn on_installation_start(&self, _state: &InstallationState) {
            self.calls.lock().await.push("start".into());
        }

        async fn on_step_success(&self, event: &StepEvent, _state: &InstallationState) {
            self.calls
                .lock()
                .await
                .push(format!("success:{}", event.step_name));
        }
    }

    struct FailingStore;

    #[async_trait]
    impl InstallationStateStore for FailingStore {
        async fn get(&self, _id: &RunId) -> Result<Option<InstallationState>> {
            Ok(None)
        }

        async fn save(&self, _state: &InstallationState) -> Result<()> {
            Err(SetupError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn step_event_takes_name_from_path() {
        let event = event();
        assert_eq!(event.step_name, "a");
        assert!(event.is_leaf);
        assert_eq!(event.path, vec!["root", "a"]);
    }

    #[tokio::test]
    async fn noop_hooks_accept_every_call() {
        let hooks = NoopHooks;
        let state = state();
        hooks.on_installation_start(&state).await;
        hooks.on_step_start(&event(), &state).await;
        hooks.on_step_failure(&event(), &state).await;
        hooks.on_installation_failure(&state).await;
    }

    #[tokio::test]
    async fn hook_chain_calls_in_order() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let chain = HookChain::new()
            .with(first.clone())
            .with(Arc::new(NoopHooks))
            .with(second.clone());
        assert_eq!(chain.len(), 3);

        let state = state();
        chain.on_installation_start(&state).await;
        chain.on_step_success(&event(), &state).await;
        chain.on_step_failure(&event(), &state).await;

        assert_eq!(*first.calls.lock().await, vec!["start", "success:a"]);
        assert_eq!(*second.calls.lock().await, vec!["start", "success:a"]);
    }

    #[tokio::test]
    async fn checkpoint_every_transition_saves_steps() {
        let store = Arc::new(MemoryStateStore::new());
        let hooks = CheckpointHooks::new(store.clone(), CheckpointPolicy::EveryTransition);
        let state = state();

        hooks.on_installation_start(&state).await;
        hooks.on_step_start(&event(), &state).await;
        hooks.on_step_success(&event(), &state).await;

        assert_eq!(store.save_count(), 3);
        assert!(store.get(&state.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn checkpoint_terminal_only_skips_steps() {
        let store = Arc::new(MemoryStateStore::new());
        let hooks = CheckpointHooks::new(store.clone(), CheckpointPolicy::TerminalOnly);
        let state = state();

        hooks.on_installation_start(&state).await;
        hooks.on_step_start(&event(), &state).await;
        hooks.on_step_failure(&event(), &state).await;
        hooks.on_installation_failure(&state).await;

        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn checkpoint_disabled_never_saves() {
        let store = Arc::new(MemoryStateStore::new());
        let hooks = CheckpointHooks::new(store.clone(), CheckpointPolicy::Disabled);
        let state = state();

        hooks.on_installation_start(&state).await;
        hooks.on_step_start(&event(), &state).await;
        hooks.on_installation_success(&state).await;

        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn checkpoint_save_failure_does_not_panic() {
        let hooks = CheckpointHooks::new(Arc::new(FailingStore), CheckpointPolicy::EveryTransition);
        let state = state();
        hooks.on_installation_start(&state).await;
        hooks.on_step_start(&event(), &state).await;
    }
}
