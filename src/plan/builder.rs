//! Plan building: filter a step tree against a configuration.

use std::sync::Arc;

use tracing::debug;

use super::id::{Clock, IdGenerator, RandomIdGenerator, SystemClock};
use crate::state::{InstallationState, NodeKind, StepStatus, StepStatusNode};
use crate::steps::Step;

/// Builds the initial [`InstallationState`] for a run.
///
/// Id generation and the clock are injected so plans are reproducible in
/// tests.
#[derive(Clone)]
pub struct StateBuilder {
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StateBuilder {
    /// Builder with random ids and the system clock.
    pub fn new() -> Self {
        Self {
            ids: Arc::new(RandomIdGenerator),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The clock used for run timestamps.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Plan a fresh run of `root` for `config`.
    ///
    /// The status tree keeps only steps whose predicate is absent or true; an
    /// excluded branch drops its whole subtree. Every node starts `pending`
    /// and the run itself starts `in-progress`.
    pub fn build<C>(&self, root: &Step<C>, config: &C) -> InstallationState {
        let started_at = self.clock.now();
        let id = self.ids.next_id(started_at);

        // The root is always planned; its own predicate is not consulted.
        let tree = plan_node(root, config);
        debug!("Planned run {} with {} applicable steps", id, tree.count());

        InstallationState::new(id, started_at, tree)
    }

    /// Plan a new run that continues `previous`.
    ///
    /// The plan is recomputed from `root` and `config`; every leaf that
    /// succeeded in `previous` is marked succeeded again and keeps its data,
    /// so the executor will not run it twice.
    pub fn resume<C>(
        &self,
        previous: &InstallationState,
        root: &Step<C>,
        config: &C,
    ) -> InstallationState {
        let mut state = self.build(root, config);
        state.resumed_from = Some(previous.id.clone());

        let mut carried = Vec::new();
        state.root.walk(&mut |path, node| {
            if node.kind != NodeKind::Leaf {
                return;
            }
            let done_before = previous
                .node(path)
                .is_some_and(|n| n.is_leaf() && n.status == StepStatus::Succeeded);
            if done_before {
                if let Some(value) = previous.data_at(path) {
                    carried.push((path.to_vec(), value.clone()));
                }
            }
        });

        for (path, value) in carried {
            if let Some(node) = state.node_mut(&path) {
                node.status = StepStatus::Succeeded;
            }
            state.record_data(&path, value);
        }

        debug!("Resuming run {} as {}", previous.id, state.id);
        state
    }
}

fn plan_node<C>(step: &Step<C>, config: &C) -> StepStatusNode {
    match step {
        Step::Leaf(leaf) => StepStatusNode::leaf(leaf.name(), leaf.meta().clone()),
        Step::Branch(branch) => {
            let children = branch
                .children()
                .iter()
                .filter(|child| child.applies_to(config))
                .map(|child| plan_node(child, config))
                .collect();
            StepStatusNode::branch(branch.name(), branch.meta().clone(), children)
        }
    }
}

/// Plan a fresh run with random ids and the system clock.
pub fn create_initial_state<C>(root: &Step<C>, config: &C) -> InstallationState {
    StateBuilder::new().build(root, config)
}

/// Plan a run continuing `previous` with random ids and the system clock.
pub fn resume_state<C>(
    previous: &InstallationState,
    root: &Step<C>,
    config: &C,
) -> InstallationState {
    StateBuilder::new().resume(previous, root, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{FixedClock, RunId};
    use crate::state::InstallationStatus;
    use crate::steps::StepMeta;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    #[derive(Default)]
    struct Config {
        webhooks: bool,
        eventing: bool,
    }

    struct FixedIds;

    impl IdGenerator for FixedIds {
        fn next_id(&self, at: DateTime<Utc>) -> RunId {
            RunId::from_parts(at, [9; 8])
        }
    }

    fn instant() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn builder() -> StateBuilder {
        StateBuilder::new()
            .with_id_generator(FixedIds)
            .with_clock(FixedClock(instant()))
    }

    fn leaf(name: &str) -> Step<Config> {
        Step::leaf(name, StepMeta::new(name.to_uppercase()))
            .run_blocking(|_, _| Ok(()))
            .unwrap()
    }

    fn tree() -> Step<Config> {
        Step::branch("installation", StepMeta::new("Installation"))
            .child(leaf("provider"))
            .child(
                Step::branch("eventing", StepMeta::new("Eventing"))
                    .when(|c: &Config| c.eventing)
                    .child(leaf("commerce"))
                    .child(leaf("external"))
                    .build()
                    .unwrap(),
            )
            .child(
                Step::branch("webhooks", StepMeta::new("Webhooks"))
                    .child(
                        Step::leaf("subscriptions", StepMeta::new("Subscriptions"))
                            .when(|c: &Config| c.webhooks)
                            .run_blocking(|_, _| Ok(()))
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .child(leaf("finish"))
            .build()
            .unwrap()
    }

    fn names(node: &StepStatusNode) -> Vec<String> {
        node.children.iter().map(|c| c.name.clone()).collect()
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn build_uses_injected_id_and_clock() {
        let state = builder().build(&tree(), &Config::default());
        assert_eq!(state.id, RunId::from_parts(instant(), [9; 8]));
        assert_eq!(state.started_at, instant());
        assert_eq!(state.status, InstallationStatus::InProgress);
        assert!(state.data.is_empty());
        assert!(state.error.is_none());
    }

    #[test]
    fn build_keeps_everything_when_all_predicates_hold() {
        let config = Config {
            webhooks: true,
            eventing: true,
        };
        let state = builder().build(&tree(), &config);

        assert_eq!(
            names(&state.root),
            vec!["provider", "eventing", "webhooks", "finish"]
        );
        let eventing = state.root.child("eventing").unwrap();
        assert_eq!(names(eventing), vec!["commerce", "external"]);
        assert_eq!(state.root.count(), 8);
        assert_eq!(state.root.count_with_status(StepStatus::Pending), 8);
    }

    #[test]
    fn excluded_branch_removes_subtree() {
        let config = Config {
            webhooks: true,
            eventing: false,
        };
        let state = builder().build(&tree(), &config);

        assert_eq!(names(&state.root), vec!["provider", "webhooks", "finish"]);
        assert!(state.node(&path(&["installation", "eventing", "commerce"])).is_none());
    }

    #[test]
    fn branch_with_all_children_excluded_stays_with_no_children() {
        let state = builder().build(&tree(), &Config::default());
        let webhooks = state.root.child("webhooks").unwrap();
        assert!(webhooks.children.is_empty());
        assert_eq!(webhooks.kind, NodeKind::Branch);
    }

    #[test]
    fn nodes_copy_meta_from_steps() {
        let state = builder().build(&tree(), &Config::default());
        assert_eq!(state.root.meta.label, "Installation");
        assert_eq!(state.root.child("provider").unwrap().meta.label, "PROVIDER");
    }

    #[test]
    fn create_initial_state_generates_fresh_ids() {
        let a = create_initial_state(&tree(), &Config::default());
        let b = create_initial_state(&tree(), &Config::default());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn resume_carries_succeeded_leaves() {
        let config = Config::default();
        let mut previous = builder().build(&tree(), &config);
        let provider = path(&["installation", "provider"]);
        {
            let node = previous.node_mut(&provider).unwrap();
            node.transition(StepStatus::InProgress);
            node.transition(StepStatus::Succeeded);
        }
        previous.record_data(&provider, json!({"id": "p-1"}));
        {
            let node = previous.node_mut(&path(&["installation", "finish"])).unwrap();
            node.transition(StepStatus::InProgress);
            node.transition(StepStatus::Failed);
        }
        previous.status = InstallationStatus::Failed;

        let resumed = StateBuilder::new()
            .with_clock(FixedClock(instant()))
            .resume(&previous, &tree(), &config);

        assert_ne!(resumed.id, previous.id);
        assert_eq!(resumed.resumed_from, Some(previous.id.clone()));
        assert_eq!(resumed.status, InstallationStatus::InProgress);
        assert_eq!(resumed.node(&provider).unwrap().status, StepStatus::Succeeded);
        assert_eq!(resumed.data_at(&provider), Some(&json!({"id": "p-1"})));
        assert_eq!(
            resumed
                .node(&path(&["installation", "finish"]))
                .unwrap()
                .status,
            StepStatus::Pending
        );
        assert_eq!(resumed.root.status, StepStatus::Pending);
    }

    #[test]
    fn resume_drops_leaves_no_longer_applicable() {
        let enabled = Config {
            webhooks: true,
            eventing: false,
        };
        let mut previous = builder().build(&tree(), &enabled);
        let subs = path(&["installation", "webhooks", "subscriptions"]);
        {
            let node = previous.node_mut(&subs).unwrap();
            node.transition(StepStatus::InProgress);
            node.transition(StepStatus::Succeeded);
        }
        previous.record_data(&subs, json!(1));

        let resumed = builder().resume(&previous, &tree(), &Config::default());
        assert!(resumed.node(&subs).is_none());
        assert!(resumed.data.is_empty());
    }
}
