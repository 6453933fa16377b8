//! Abstract reachability structure.
//!
//! The graph the checker grows: nodes are (location vector, abstract
//! state) pairs, edges are the actions that produced them. A node whose
//! pair was seen before is merged into the existing node, which is what
//! makes exploration terminate on a finite abstraction. The structure
//! keeps each node's discovery parent so an abstract counterexample can be
//! read back as the path from a root.

use std::collections::HashMap;

use crate::domain::AbstractState;
use crate::system::{Action, LocId, System};

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Node {
    pub locs: Vec<LocId>,
    pub state: AbstractState,
}

/// An abstract error path: the visited nodes and the actions between them
/// (`actions.len() == nodes.len() - 1`).
#[derive(Debug, Clone)]
pub struct AbstractPath {
    pub nodes: Vec<NodeId>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Default)]
pub struct Ars {
    nodes: Vec<Node>,
    succs: Vec<Vec<(Action, NodeId)>>,
    parent: Vec<Option<(NodeId, Action)>>,
    index: HashMap<(Vec<LocId>, AbstractState), NodeId>,
    /// Breadth-first frontier: nodes below the cursor are expanded.
    cursor: usize,
}

impl Ars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn intern(&mut self, locs: Vec<LocId>, state: AbstractState) -> (NodeId, bool) {
        let key = (locs.clone(), state.clone());
        if let Some(&id) = self.index.get(&key) {
            return (id, false);
        }
        let id = self.nodes.len();
        self.nodes.push(Node { locs, state });
        self.succs.push(Vec::new());
        self.parent.push(None);
        self.index.insert(key, id);
        (id, true)
    }

    pub fn add_root(&mut self, locs: Vec<LocId>, state: AbstractState) -> NodeId {
        self.intern(locs, state).0
    }

    /// Record a successor of `from`. A previously seen pair is merged, not
    /// duplicated, and keeps its original discovery parent.
    pub fn add_succ(
        &mut self,
        from: NodeId,
        action: Action,
        locs: Vec<LocId>,
        state: AbstractState,
    ) -> NodeId {
        let (id, fresh) = self.intern(locs, state);
        self.succs[from].push((action, id));
        if fresh {
            self.parent[id] = Some((from, action));
        }
        id
    }

    /// Next node awaiting expansion, in breadth-first order.
    pub fn pop_unexpanded(&mut self) -> Option<NodeId> {
        if self.cursor < self.nodes.len() {
            let id = self.cursor;
            self.cursor += 1;
            Some(id)
        } else {
            None
        }
    }

    pub fn successors(&self, id: NodeId) -> &[(Action, NodeId)] {
        &self.succs[id]
    }

    /// The discovery path from a root to `id`.
    pub fn path_to(&self, id: NodeId) -> AbstractPath {
        let mut nodes = vec![id];
        let mut actions = Vec::new();
        let mut cur = id;
        while let Some((parent, action)) = self.parent[cur] {
            nodes.push(parent);
            actions.push(action);
            cur = parent;
        }
        nodes.reverse();
        actions.reverse();
        AbstractPath { nodes, actions }
    }

    /// Human-readable snapshot for debug observers.
    pub fn render(&self, sys: &System) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        for (id, node) in self.nodes.iter().enumerate() {
            let locs: Vec<&str> = node
                .locs
                .iter()
                .enumerate()
                .map(|(p, l)| sys.procs[p].locs[*l].name.as_str())
                .collect();
            let _ = writeln!(out, "n{id} [{}] {}", locs.join(","), node.state);
            for (action, succ) in &self.succs[id] {
                let _ = writeln!(out, "  -{}-> n{succ}", sys.describe_action(*action));
            }
        }
        out
    }
}
