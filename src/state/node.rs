//! The status tree mirroring the applicable steps of a run.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{InstallationError, NodeKind, StepStatus};
use crate::steps::StepMeta;

/// Mutable, run-scoped record mirroring one applicable step.
///
/// Built by the plan builder; only the executor changes `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStatusNode {
    /// Step name, unique among its siblings.
    pub name: String,

    /// Display metadata copied from the step.
    pub meta: StepMeta,

    /// Leaf or branch.
    pub kind: NodeKind,

    /// Current status.
    pub status: StepStatus,

    /// One node per applicable child, in declaration order. Empty for leaves.
    #[serde(default)]
    pub children: Vec<StepStatusNode>,

    /// Failure recorded on the node that failed first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<InstallationError>,
}

impl StepStatusNode {
    /// Create a pending leaf node.
    pub fn leaf(name: impl Into<String>, meta: StepMeta) -> Self {
        Self {
            name: name.into(),
            meta,
            kind: NodeKind::Leaf,
            status: StepStatus::Pending,
            children: Vec::new(),
            error: None,
        }
    }

    /// Create a pending branch node.
    pub fn branch(name: impl Into<String>, meta: StepMeta, children: Vec<StepStatusNode>) -> Self {
        Self {
            name: name.into(),
            meta,
            kind: NodeKind::Branch,
            status: StepStatus::Pending,
            children,
            error: None,
        }
    }

    /// Whether this node mirrors a leaf step.
    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    /// Direct child by name.
    pub fn child(&self, name: &str) -> Option<&StepStatusNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Find a node by its path from this node. The first segment must be
    /// this node's own name.
    pub fn find(&self, path: &[String]) -> Option<&StepStatusNode> {
        let (first, rest) = path.split_first()?;
        if *first != self.name {
            return None;
        }
        rest.iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Mutable variant of [`find`](Self::find).
    pub fn find_mut(&mut self, path: &[String]) -> Option<&mut StepStatusNode> {
        let (first, rest) = path.split_first()?;
        if *first != self.name {
            return None;
        }
        let mut node = self;
        for segment in rest {
            node = node.children.iter_mut().find(|c| c.name == *segment)?;
        }
        Some(node)
    }

    /// Move to `next` if the transition is legal.
    ///
    /// Returns `false` (and leaves the status untouched) otherwise.
    pub fn transition(&mut self, next: StepStatus) -> bool {
        if !self.status.can_transition_to(next) {
            warn!(
                "Refusing status change of '{}' from {} to {}",
                self.name, self.status, next
            );
            return false;
        }
        self.status = next;
        true
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(StepStatusNode::count).sum::<usize>()
    }

    /// Number of nodes in this subtree with the given status.
    pub fn count_with_status(&self, status: StepStatus) -> usize {
        let own = usize::from(self.status == status);
        own + self
            .children
            .iter()
            .map(|c| c.count_with_status(status))
            .sum::<usize>()
    }

    /// Visit every node depth-first with its path, in declaration order.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&[String], &'a StepStatusNode)) {
        let mut path = Vec::new();
        self.walk_inner(&mut path, visit);
    }

    fn walk_inner<'a>(
        &'a self,
        path: &mut Vec<String>,
        visit: &mut dyn FnMut(&[String], &'a StepStatusNode),
    ) {
        path.push(self.name.clone());
        visit(path, self);
        for child in &self.children {
            child.walk_inner(path, visit);
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> StepStatusNode {
        StepStatusNode::branch(
            "root",
            StepMeta::new("Root"),
            vec![
                StepStatusNode::leaf("a", StepMeta::new("A")),
                StepStatusNode::branch(
                    "group",
                    StepMeta::new("Group"),
                    vec![StepStatusNode::leaf("a", StepMeta::new("Nested A"))],
                ),
            ],
        )
    }

    #[test]
    fn find_addresses_by_path() {
        let tree = sample();
        assert_eq!(tree.find(&path(&["root"])).unwrap().name, "root");
        assert_eq!(
            tree.find(&path(&["root", "group", "a"])).unwrap().meta.label,
            "Nested A"
        );
        assert_eq!(tree.find(&path(&["root", "a"])).unwrap().meta.label, "A");
    }

    #[test]
    fn find_rejects_wrong_root_or_missing_segment() {
        let tree = sample();
        assert!(tree.find(&path(&["other", "a"])).is_none());
        assert!(tree.find(&path(&["root", "missing"])).is_none());
        assert!(tree.find(&[]).is_none());
    }

    #[test]
    fn find_mut_allows_updates() {
        let mut tree = sample();
        let node = tree.find_mut(&path(&["root", "group", "a"])).unwrap();
        assert!(node.transition(StepStatus::InProgress));
        assert_eq!(
            tree.find(&path(&["root", "group", "a"])).unwrap().status,
            StepStatus::InProgress
        );
    }

    #[test]
    fn transition_refuses_to_leave_terminal_state() {
        let mut node = StepStatusNode::leaf("a", StepMeta::new("A"));
        assert!(node.transition(StepStatus::InProgress));
        assert!(node.transition(StepStatus::Succeeded));
        assert!(!node.transition(StepStatus::Failed));
        assert_eq!(node.status, StepStatus::Succeeded);
    }

    #[test]
    fn counts_nodes() {
        let tree = sample();
        assert_eq!(tree.count(), 4);
        assert_eq!(tree.count_with_status(StepStatus::Pending), 4);
    }

    #[test]
    fn walk_visits_in_declaration_order() {
        let tree = sample();
        let mut seen = Vec::new();
        tree.walk(&mut |p, _| seen.push(p.join(".")));
        assert_eq!(seen, vec!["root", "root.a", "root.group", "root.group.a"]);
    }

    #[test]
    fn error_field_is_omitted_when_absent() {
        let node = StepStatusNode::leaf("a", StepMeta::new("A"));
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["kind"], "leaf");
    }
}
