//! The step tree data model.
//!
//! A [`Step`] is either a [`LeafStep`], which performs work and produces a
//! result, or a [`BranchStep`], which groups an ordered list of children and
//! may contribute context to them. Both are built through the two factories
//! [`Step::leaf`] and [`Step::branch`], which validate required fields when the
//! step is finished.
//!
//! Steps are immutable and cheap to clone; one tree is built at startup and
//! reused for every run.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::{ContextFragment, ExecutionContext, InstallationContext};
use crate::error::{Result, SetupError};

/// Future returned by step bodies and context factories.
pub type StepFuture<T> = BoxFuture<'static, anyhow::Result<T>>;

type Predicate<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;
type RunFn<C> = Arc<dyn Fn(Arc<C>, ExecutionContext) -> StepFuture<Value> + Send + Sync>;
type ContextFn =
    Arc<dyn Fn(Arc<InstallationContext>) -> StepFuture<ContextFragment> + Send + Sync>;

/// Display metadata shared by both step variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMeta {
    /// Short human-readable title.
    pub label: String,

    /// Longer explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StepMeta {
    /// Create metadata with a label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: None,
        }
    }

    /// Add a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A node of the static step tree.
pub enum Step<C> {
    Leaf(LeafStep<C>),
    Branch(BranchStep<C>),
}

/// A step that performs work and produces a result.
pub struct LeafStep<C> {
    name: String,
    meta: StepMeta,
    when: Option<Predicate<C>>,
    run: RunFn<C>,
}

/// A step that groups children and may contribute shared context.
pub struct BranchStep<C> {
    name: String,
    meta: StepMeta,
    when: Option<Predicate<C>>,
    children: Vec<Step<C>>,
    context: Option<ContextFn>,
}

impl<C> Step<C> {
    /// Start building a leaf step.
    pub fn leaf(name: impl Into<String>, meta: StepMeta) -> LeafBuilder<C> {
        LeafBuilder {
            name: name.into(),
            meta,
            when: None,
        }
    }

    /// Start building a branch step.
    pub fn branch(name: impl Into<String>, meta: StepMeta) -> BranchBuilder<C> {
        BranchBuilder {
            name: name.into(),
            meta,
            when: None,
            children: Vec::new(),
            context: None,
        }
    }

    /// Step name, unique among its siblings.
    pub fn name(&self) -> &str {
        match self {
            Step::Leaf(leaf) => &leaf.name,
            Step::Branch(branch) => &branch.name,
        }
    }

    /// Display metadata.
    pub fn meta(&self) -> &StepMeta {
        match self {
            Step::Leaf(leaf) => &leaf.meta,
            Step::Branch(branch) => &branch.meta,
        }
    }

    /// Whether this is a leaf step.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Step::Leaf(_))
    }

    /// Child steps in declaration order. Empty for leaves.
    pub fn children(&self) -> &[Step<C>] {
        match self {
            Step::Leaf(_) => &[],
            Step::Branch(branch) => &branch.children,
        }
    }

    /// Evaluate the applicability predicate. Steps without one always apply.
    pub fn applies_to(&self, config: &C) -> bool {
        let when = match self {
            Step::Leaf(leaf) => &leaf.when,
            Step::Branch(branch) => &branch.when,
        };
        when.as_ref().map_or(true, |predicate| predicate(config))
    }
}

impl<C> LeafStep<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> &StepMeta {
        &self.meta
    }

    /// Start the step body.
    pub fn run(&self, config: Arc<C>, context: ExecutionContext) -> StepFuture<Value> {
        (self.run)(config, context)
    }
}

impl<C> BranchStep<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meta(&self) -> &StepMeta {
        &self.meta
    }

    pub fn children(&self) -> &[Step<C>] {
        &self.children
    }

    /// Whether this branch contributes context to its descendants.
    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Start the context factory, if the branch has one.
    pub fn context(
        &self,
        installation: Arc<InstallationContext>,
    ) -> Option<StepFuture<ContextFragment>> {
        self.context.as_ref().map(|factory| factory(installation))
    }
}

impl<C> Clone for Step<C> {
    fn clone(&self) -> Self {
        match self {
            Step::Leaf(leaf) => Step::Leaf(LeafStep {
                name: leaf.name.clone(),
                meta: leaf.meta.clone(),
                when: leaf.when.clone(),
                run: Arc::clone(&leaf.run),
            }),
            Step::Branch(branch) => Step::Branch(BranchStep {
                name: branch.name.clone(),
                meta: branch.meta.clone(),
                when: branch.when.clone(),
                children: branch.children.clone(),
                context: branch.context.clone(),
            }),
        }
    }
}

impl<C> fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Leaf(leaf) => f
                .debug_struct("Leaf")
                .field("name", &leaf.name)
                .field("meta", &leaf.meta)
                .field("conditional", &leaf.when.is_some())
                .finish(),
            Step::Branch(branch) => f
                .debug_struct("Branch")
                .field("name", &branch.name)
                .field("meta", &branch.meta)
                .field("conditional", &branch.when.is_some())
                .field("has_context", &branch.context.is_some())
                .field("children", &branch.children)
                .finish(),
        }
    }
}

/// Builder returned by [`Step::leaf`].
pub struct LeafBuilder<C> {
    name: String,
    meta: StepMeta,
    when: Option<Predicate<C>>,
}

impl<C: Send + Sync + 'static> LeafBuilder<C> {
    /// Only include the step when `predicate` holds for the configuration.
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.when = Some(Arc::new(predicate));
        self
    }

    /// Finish the step with an async body.
    ///
    /// The returned value is stored in the run's data at the step's path.
    pub fn run<F, Fut, T>(self, run: F) -> Result<Step<C>>
    where
        F: Fn(Arc<C>, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let run: RunFn<C> = Arc::new(move |config: Arc<C>, context: ExecutionContext| {
            let pending = run(config, context);
            async move { to_json(pending.await?) }.boxed()
        });
        self.finish(run)
    }

    /// Finish the step with a synchronous body.
    pub fn run_blocking<F, T>(self, run: F) -> Result<Step<C>>
    where
        F: Fn(&C, &ExecutionContext) -> anyhow::Result<T> + Send + Sync + 'static,
        T: Serialize,
    {
        let run = Arc::new(run);
        let run: RunFn<C> = Arc::new(move |config: Arc<C>, context: ExecutionContext| {
            let run = Arc::clone(&run);
            async move { to_json((*run)(&config, &context)?) }.boxed()
        });
        self.finish(run)
    }

    fn finish(self, run: RunFn<C>) -> Result<Step<C>> {
        validate(&self.name, &self.meta)?;
        Ok(Step::Leaf(LeafStep {
            name: self.name,
            meta: self.meta,
            when: self.when,
            run,
        }))
    }
}

/// Builder returned by [`Step::branch`].
pub struct BranchBuilder<C> {
    name: String,
    meta: StepMeta,
    when: Option<Predicate<C>>,
    children: Vec<Step<C>>,
    context: Option<ContextFn>,
}

impl<C: Send + Sync + 'static> BranchBuilder<C> {
    /// Only include the branch (and its subtree) when `predicate` holds.
    pub fn when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.when = Some(Arc::new(predicate));
        self
    }

    /// Contribute context to every descendant, computed asynchronously.
    pub fn context<F, Fut>(mut self, factory: F) -> Self
    where
        F: Fn(Arc<InstallationContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ContextFragment>> + Send + 'static,
    {
        self.context = Some(Arc::new(move |installation: Arc<InstallationContext>| {
            factory(installation).boxed()
        }));
        self
    }

    /// Contribute context to every descendant, computed synchronously.
    pub fn context_blocking<F>(mut self, factory: F) -> Self
    where
        F: Fn(&InstallationContext) -> anyhow::Result<ContextFragment> + Send + Sync + 'static,
    {
        let factory = Arc::new(factory);
        self.context = Some(Arc::new(move |installation: Arc<InstallationContext>| {
            let factory = Arc::clone(&factory);
            async move { (*factory)(&installation) }.boxed()
        }));
        self
    }

    /// Append a child step.
    pub fn child(mut self, step: Step<C>) -> Self {
        self.children.push(step);
        self
    }

    /// Append several child steps, keeping their order.
    pub fn children(mut self, steps: impl IntoIterator<Item = Step<C>>) -> Self {
        self.children.extend(steps);
        self
    }

    /// Finish the branch, checking that sibling names are unique.
    pub fn build(self) -> Result<Step<C>> {
        validate(&self.name, &self.meta)?;

        let mut seen = HashSet::new();
        for child in &self.children {
            if !seen.insert(child.name()) {
                return Err(SetupError::DuplicateStepName {
                    parent: self.name.clone(),
                    name: child.name().to_string(),
                });
            }
        }

        Ok(Step::Branch(BranchStep {
            name: self.name,
            meta: self.meta,
            when: self.when,
            children: self.children,
            context: self.context,
        }))
    }
}

fn validate(name: &str, meta: &StepMeta) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SetupError::InvalidStep {
            name: name.to_string(),
            message: "name must not be empty".to_string(),
        });
    }
    if meta.label.trim().is_empty() {
        return Err(SetupError::InvalidStep {
            name: name.to_string(),
            message: "meta.label must not be empty".to_string(),
        });
    }
    Ok(())
}

fn to_json<T: Serialize>(value: T) -> anyhow::Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| anyhow::anyhow!("step result could not be serialized: {}", e))
}
