use std::collections::BTreeSet;
use std::mem;

use tracing::trace;

use crate::strategy::{Strategy, TaskId};

/// Index of the root node. The root carries no task id; its children are the
/// candidates observed at the very first yield point.
const ROOT: usize = 0;

/// One decision point in the exploration tree.
///
/// Nodes live in a growable arena and refer to each other by index, so the
/// parent back-links walked at end of pass cannot form ownership cycles.
#[derive(Debug)]
struct Node<T> {
    value: Option<T>,
    /// Child order is pinned the first time the node is expanded (ascending
    /// task id) and must not change on later visits.
    children: Vec<usize>,
    parent: Option<usize>,
    /// Taken during the current pass.
    visited: bool,
    /// Every interleaving below this node has been enumerated.
    explored: bool,
}

impl<T> Node<T> {
    fn new(value: Option<T>, parent: Option<usize>) -> Node<T> {
        Node {
            value,
            children: Vec::new(),
            parent,
            visited: false,
            explored: false,
        }
    }
}

/// Enumerates every distinct interleaving exactly once.
///
/// The strategy lazily materializes a tree of scheduling decisions: each node
/// records the candidate set observed at one yield point, with one child per
/// candidate. A pass walks one root-to-leaf path; [`finish_sequence`] then
/// marks fully enumerated subtrees bottom-up so the next pass descends into
/// the leftmost branch that still has something new. Passes therefore come
/// out in left-to-right depth-first order, and the exploration is complete
/// once every child of the root is explored.
///
/// The tree requires the workload to be deterministic: re-visiting a node
/// with a candidate set that differs from the recorded one is a fatal error.
///
/// [`finish_sequence`]: Strategy::finish_sequence
#[derive(Debug)]
pub struct ExhaustiveStrategy<T> {
    nodes: Vec<Node<T>>,
    curr: usize,
    path: Vec<usize>,
}

impl<T: TaskId> ExhaustiveStrategy<T> {
    /// Creates a strategy with an empty decision tree.
    pub fn new() -> ExhaustiveStrategy<T> {
        ExhaustiveStrategy {
            nodes: vec![Node::new(None, None)],
            curr: ROOT,
            path: Vec::new(),
        }
    }

    fn add_child(&mut self, parent: usize, value: T) {
        let child = self.nodes.len();
        self.nodes.push(Node::new(Some(value), Some(parent)));
        self.nodes[parent].children.push(child);
    }
}

impl<T: TaskId> Default for ExhaustiveStrategy<T> {
    fn default() -> ExhaustiveStrategy<T> {
        ExhaustiveStrategy::new()
    }
}

impl<T: TaskId> Strategy<T> for ExhaustiveStrategy<T> {
    fn choose_next(&mut self, options: &BTreeSet<T>) -> T {
        assert!(!options.is_empty(), "empty candidate set");

        if self.nodes[self.curr].children.is_empty() {
            // First time at this decision point; pin the child order.
            for option in options {
                self.add_child(self.curr, option.clone());
            }
        } else {
            assert_eq!(
                self.nodes[self.curr].children.len(),
                options.len(),
                "candidate set diverged from an earlier pass at the same \
                 decision point. Is the workload deterministic?",
            );
        }

        let children = &self.nodes[self.curr].children;
        let selected = children
            .iter()
            .copied()
            .find(|&child| !self.nodes[child].visited && !self.nodes[child].explored)
            .or_else(|| {
                children
                    .iter()
                    .copied()
                    .find(|&child| !self.nodes[child].explored)
            })
            .expect("decision tree exhausted at this node");

        self.nodes[selected].visited = true;
        self.path.push(selected);
        self.curr = selected;

        let value = self.nodes[selected]
            .value
            .clone()
            .expect("[shuffler internal bug] selected the root");
        assert!(
            options.contains(&value),
            "candidate set diverged from an earlier pass at the same \
             decision point. Is the workload deterministic?",
        );

        trace!(task = ?value, "chose next task");
        value
    }

    fn finish_sequence(&mut self) -> Vec<T> {
        // Mark finished subtrees bottom-up, from the pass's leaf to the root.
        let mut node = self.curr;
        loop {
            let children = &self.nodes[node].children;
            if children.iter().all(|&child| self.nodes[child].explored) {
                self.nodes[node].explored = true;
            }

            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => break,
            }
        }

        let path = mem::take(&mut self.path);
        for &taken in &path {
            self.nodes[taken].visited = false;
        }
        self.curr = ROOT;

        path.iter()
            .map(|&taken| {
                self.nodes[taken]
                    .value
                    .clone()
                    .expect("[shuffler internal bug] pass recorded the root")
            })
            .collect()
    }

    fn is_completed(&self) -> bool {
        let root = &self.nodes[ROOT];
        !root.children.is_empty() && root.children.iter().all(|&child| self.nodes[child].explored)
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node::new(None, None));
        self.curr = ROOT;
        self.path.clear();
    }
}
