//! Depth-first execution of a planned step tree.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use super::hooks::{InstallationHooks, NoopHooks, StepEvent};
use crate::plan::{Clock, SystemClock};
use crate::state::{
    InstallationError, InstallationState, InstallationStatus, StepStatus, CONTEXT_FAILED,
    PLAN_MISMATCH, STATE_NOT_FRESH, STEP_FAILED,
};
use crate::steps::{BranchStep, ExecutionContext, InstallationContext, LeafStep, Step, StepFailure};

/// Everything one call to [`execute_workflow`] needs.
pub struct ExecuteRequest<'a, C> {
    /// Root of the step tree the state was planned from.
    pub root: &'a Step<C>,
    /// Caller-supplied context shared by every step.
    pub installation_context: InstallationContext,
    /// Application configuration handed to every leaf.
    pub config: Arc<C>,
    /// State produced by the plan builder.
    pub initial_state: InstallationState,
    /// Observer; `None` behaves like [`NoopHooks`].
    pub hooks: Option<&'a dyn InstallationHooks>,
    /// Source of `finished_at`; `None` uses the system clock.
    pub clock: Option<&'a dyn Clock>,
}

impl<'a, C> ExecuteRequest<'a, C> {
    pub fn new(
        root: &'a Step<C>,
        installation_context: InstallationContext,
        config: Arc<C>,
        initial_state: InstallationState,
    ) -> Self {
        Self {
            root,
            installation_context,
            config,
            initial_state,
            hooks: None,
            clock: None,
        }
    }

    pub fn with_hooks(mut self, hooks: &'a dyn InstallationHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = Some(clock);
        self
    }
}

/// Run every planned step of `initial_state` and return the final state.
///
/// Children run strictly in declaration order, one at a time. Steps absent
/// from the plan are skipped, and so are leaves already marked succeeded
/// (a resumed run). The first failing leaf or context factory stops the
/// walk: its siblings that have not run stay `pending`, and the failure is
/// reported to every ancestor branch on the way up.
///
/// Step errors and panics never escape; they end up in the returned state's
/// `error` with `status` set to `failed`.
///
/// `initial_state` must come straight from the plan builder. A state that
/// has already been executed is returned `failed` with key
/// `state_not_fresh`, its status tree untouched, without running any step
/// or hook.
pub async fn execute_workflow<C>(request: ExecuteRequest<'_, C>) -> InstallationState
where
    C: Send + Sync + 'static,
{
    let ExecuteRequest {
        root,
        installation_context,
        config,
        initial_state,
        hooks,
        clock,
    } = request;
    let hooks = hooks.unwrap_or(&NoopHooks);
    let clock = clock.unwrap_or(&SystemClock);

    // A state that already ran is handed back untouched by hooks, so a
    // checkpointing observer never overwrites the record of that run.
    let stale = if initial_state.is_terminal() {
        Some(vec![initial_state.root.name.clone()])
    } else {
        stale_node(&initial_state)
    };
    if let Some(path) = stale {
        let mut state = initial_state;
        let error = InstallationError::new(
            path.clone(),
            STATE_NOT_FRESH,
            format!("state {} has already run (at '{}')", state.id, path.join(".")),
        );
        warn!("Refusing to execute run {}: {}", state.id, error);
        state.status = InstallationStatus::Failed;
        state.finished_at = Some(clock.now());
        state.error = Some(error);
        return state;
    }

    let installation = Arc::new(installation_context);
    let span = installation.span().clone();

    let mut walker = Walker {
        config,
        installation: Arc::clone(&installation),
        hooks,
        state: initial_state,
    };
    walker.state.status = InstallationStatus::InProgress;
    hooks.on_installation_start(&walker.state).await;

    let outcome = if walker.state.root.name != root.name() {
        Err(InstallationError::new(
            vec![root.name().to_string()],
            PLAN_MISMATCH,
            format!(
                "state was planned for '{}' but the root step is '{}'",
                walker.state.root.name,
                root.name()
            ),
        ))
    } else {
        let path = vec![root.name().to_string()];
        walker
            .visit(root, path, ExecutionContext::new(installation))
            .instrument(span)
            .await
    };

    let mut state = walker.state;
    state.finished_at = Some(clock.now());
    match outcome {
        Ok(()) => {
            state.status = InstallationStatus::Succeeded;
            state.error = None;
            info!("Installation {} succeeded", state.id);
            hooks.on_installation_success(&state).await;
        }
        Err(error) => {
            state.status = InstallationStatus::Failed;
            warn!("Installation {} failed: {}", state.id, error);
            state.error = Some(error);
            hooks.on_installation_failure(&state).await;
        }
    }
    state
}

struct Walker<'a, C> {
    config: Arc<C>,
    installation: Arc<InstallationContext>,
    hooks: &'a dyn InstallationHooks,
    state: InstallationState,
}

impl<'a, C: Send + Sync + 'static> Walker<'a, C> {
    fn visit<'w>(
        &'w mut self,
        step: &'w Step<C>,
        path: Vec<String>,
        context: ExecutionContext,
    ) -> BoxFuture<'w, Result<(), InstallationError>> {
        async move {
            let is_leaf = step.is_leaf();
            let done = self
                .state
                .node(&path)
                .is_some_and(|node| node.status == StepStatus::Succeeded);
            if is_leaf && done {
                debug!("Skipping {}, already succeeded", path.join("."));
                return Ok(());
            }

            let event = StepEvent::new(&path, is_leaf);
            self.set_status(&path, StepStatus::InProgress);
            self.hooks.on_step_start(&event, &self.state).await;

            let outcome = match step {
                Step::Leaf(leaf) => self.run_leaf(leaf, &path, context).await,
                Step::Branch(branch) => self.run_branch(branch, &path, context).await,
            };

            match outcome {
                Ok(()) => {
                    self.set_status(&path, StepStatus::Succeeded);
                    self.hooks.on_step_success(&event, &self.state).await;
                    Ok(())
                }
                Err(error) => {
                    self.set_status(&path, StepStatus::Failed);
                    self.hooks.on_step_failure(&event, &self.state).await;
                    Err(error)
                }
            }
        }
        .boxed()
    }

    async fn run_leaf(
        &mut self,
        leaf: &LeafStep<C>,
        path: &[String],
        context: ExecutionContext,
    ) -> Result<(), InstallationError> {
        let config = Arc::clone(&self.config);
        let pending = async move { leaf.run(config, context).await };

        match guarded(pending, self.step_span(path)).await {
            Ok(value) => {
                self.state.record_data(path, value);
                Ok(())
            }
            Err(err) => Err(self.fail_node(path, STEP_FAILED, err)),
        }
    }

    async fn run_branch(
        &mut self,
        branch: &BranchStep<C>,
        path: &[String],
        context: ExecutionContext,
    ) -> Result<(), InstallationError> {
        let context = if branch.has_context() {
            let installation = Arc::clone(&self.installation);
            let pending = async move {
                match branch.context(installation) {
                    Some(factory) => factory.await,
                    None => Ok(Default::default()),
                }
            };
            match guarded(pending, self.step_span(path)).await {
                Ok(fragment) => context.merged(fragment),
                Err(err) => return Err(self.fail_node(path, CONTEXT_FAILED, err)),
            }
        } else {
            context
        };

        for child in branch.children() {
            let mut child_path = path.to_vec();
            child_path.push(child.name().to_string());
            if self.state.node(&child_path).is_none() {
                continue;
            }
            self.visit(child, child_path, context.clone()).await?;
        }
        Ok(())
    }

    fn step_span(&self, path: &[String]) -> Span {
        info_span!(parent: self.installation.span(), "step", path = %path.join("."))
    }

    fn set_status(&mut self, path: &[String], status: StepStatus) {
        if let Some(node) = self.state.node_mut(path) {
            node.transition(status);
        }
    }

    fn fail_node(&mut self, path: &[String], key: &str, err: anyhow::Error) -> InstallationError {
        let error = capture(path, key, err);
        warn!("Step {} failed: {}", path.join("."), error);
        if let Some(node) = self.state.node_mut(path) {
            node.error = Some(error.clone());
        }
        error
    }
}

/// Path of the first node a fresh plan could not contain.
///
/// A planned state is all `pending`, except for leaves carried over as
/// `succeeded` by a resume. Anything else, or any node error, means the
/// state has been executed before.
fn stale_node(state: &InstallationState) -> Option<Vec<String>> {
    let mut stale = None;
    state.root.walk(&mut |path, node| {
        if stale.is_some() {
            return;
        }
        let carried = node.is_leaf() && node.status == StepStatus::Succeeded;
        if node.error.is_some() || (node.status != StepStatus::Pending && !carried) {
            stale = Some(path.to_vec());
        }
    });
    stale
}

/// Await a step future inside its span, turning a panic into an error.
async fn guarded<T, F>(pending: F, span: Span) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(pending.instrument(span))
        .catch_unwind()
        .await
    {
        Ok(result) => result,
        Err(panic) => Err(anyhow::anyhow!("panicked: {}", panic_message(&*panic))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn capture(path: &[String], default_key: &str, err: anyhow::Error) -> InstallationError {
    match err.downcast_ref::<StepFailure>() {
        Some(failure) => {
            let error = InstallationError::new(path.to_vec(), &failure.key, &failure.message);
            match &failure.payload {
                Some(payload) => error.with_payload(payload.clone()),
                None => error,
            }
        }
        None => InstallationError::new(path.to_vec(), default_key, format!("{:#}", err)),
    }
}
