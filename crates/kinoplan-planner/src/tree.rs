//! Pool-allocated tree storage.
//!
//! Both search trees share one fixed-capacity pool allocated at planner
//! init. Node identity is the pool index; parent and child links are
//! indices, so re-parenting a node is a field update with no ownership
//! implications. Nodes are never individually freed; `reset` clears the
//! pool while keeping its allocation.

use kinoplan_core::{Piece, StatePVA};

/// Index into the node pool.
pub type NodeId = usize;

/// Which of the two trees a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeId {
    /// Rooted at the start state; edges run parent → child.
    Forward,
    /// Rooted at the goal state; edges run child → parent in execution
    /// order, so a root-ward walk yields the executable tail.
    Backward,
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub state: StatePVA,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Segment connecting this node with its parent, oriented in execution
    /// order (parent→node in the forward tree, node→parent in the backward
    /// tree). `None` for roots.
    pub piece_from_parent: Option<Piece>,
    pub cost_from_start: f64,
    pub tau_from_start: f64,
    pub cost_from_parent: f64,
    pub tau_from_parent: f64,
    pub tree_id: TreeId,
}

#[derive(Debug)]
pub struct NodePool {
    nodes: Vec<TreeNode>,
    capacity: usize,
}

impl NodePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.nodes.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all nodes, keeping the allocation for the next `plan` call.
    pub fn reset(&mut self) {
        self.nodes.clear();
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes.iter().enumerate()
    }

    /// Root insertion; `None` when the pool is exhausted.
    pub fn add_root(&mut self, state: StatePVA, tree_id: TreeId) -> Option<NodeId> {
        if self.is_full() {
            return None;
        }
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            state,
            parent: None,
            children: Vec::new(),
            piece_from_parent: None,
            cost_from_start: 0.0,
            tau_from_start: 0.0,
            cost_from_parent: 0.0,
            tau_from_parent: 0.0,
            tree_id,
        });
        Some(id)
    }

    /// Attach a new node under `parent`; `None` when the pool is exhausted.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        state: StatePVA,
        piece: Piece,
        cost_from_parent: f64,
        tau_from_parent: f64,
    ) -> Option<NodeId> {
        if self.is_full() {
            return None;
        }
        let id = self.nodes.len();
        let (p_cost, p_tau, tree_id) = {
            let p = &self.nodes[parent];
            (p.cost_from_start, p.tau_from_start, p.tree_id)
        };
        self.nodes.push(TreeNode {
            state,
            parent: Some(parent),
            children: Vec::new(),
            piece_from_parent: Some(piece),
            cost_from_start: p_cost + cost_from_parent,
            tau_from_start: p_tau + tau_from_parent,
            cost_from_parent,
            tau_from_parent,
            tree_id,
        });
        self.nodes[parent].children.push(id);
        Some(id)
    }

    /// Re-parent `id` under `new_parent` and refresh the cumulative cost and
    /// duration of its whole subtree.
    pub fn change_parent(
        &mut self,
        id: NodeId,
        new_parent: NodeId,
        piece: Piece,
        cost_from_parent: f64,
        tau_from_parent: f64,
    ) {
        if let Some(old) = self.nodes[id].parent {
            let children = &mut self.nodes[old].children;
            if let Some(at) = children.iter().position(|&c| c == id) {
                children.swap_remove(at);
            }
        }
        self.nodes[new_parent].children.push(id);
        {
            let node = &mut self.nodes[id];
            node.parent = Some(new_parent);
            node.piece_from_parent = Some(piece);
            node.cost_from_parent = cost_from_parent;
            node.tau_from_parent = tau_from_parent;
        }

        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(parent) = self.nodes[cur].parent else {
                continue;
            };
            let (p_cost, p_tau) = {
                let p = &self.nodes[parent];
                (p.cost_from_start, p.tau_from_start)
            };
            let node = &mut self.nodes[cur];
            node.cost_from_start = p_cost + node.cost_from_parent;
            node.tau_from_start = p_tau + node.tau_from_parent;
            stack.extend(node.children.iter().copied());
        }
    }

    /// Node ids from the root down to `id`, inclusive.
    pub fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(c) = cur {
            chain.push(c);
            cur = self.nodes[c].parent;
        }
        chain.reverse();
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kinoplan_core::StatePVA;
    use nalgebra::{Matrix3xX, Vector3};

    fn dummy_piece(tau: f64) -> Piece {
        Piece::new(Matrix3xX::zeros(6), tau)
    }

    fn state(x: f64) -> StatePVA {
        StatePVA::at_rest(Vector3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_pool_capacity() {
        let mut pool = NodePool::new(2);
        let root = pool.add_root(state(0.0), TreeId::Forward).unwrap();
        assert!(pool
            .add_node(root, state(1.0), dummy_piece(1.0), 1.0, 1.0)
            .is_some());
        assert!(pool
            .add_node(root, state(2.0), dummy_piece(1.0), 1.0, 1.0)
            .is_none());
        assert!(pool.is_full());
    }

    #[test]
    fn test_reset_reuses_pool() {
        let mut pool = NodePool::new(4);
        pool.add_root(state(0.0), TreeId::Forward).unwrap();
        pool.reset();
        assert!(pool.is_empty());
        assert_eq!(pool.capacity(), 4);
        assert!(pool.add_root(state(0.0), TreeId::Backward).is_some());
    }

    #[test]
    fn test_cumulative_costs() {
        let mut pool = NodePool::new(8);
        let root = pool.add_root(state(0.0), TreeId::Forward).unwrap();
        let a = pool
            .add_node(root, state(1.0), dummy_piece(1.0), 2.0, 1.0)
            .unwrap();
        let b = pool
            .add_node(a, state(2.0), dummy_piece(1.5), 3.0, 1.5)
            .unwrap();
        assert_relative_eq!(pool.node(b).cost_from_start, 5.0);
        assert_relative_eq!(pool.node(b).tau_from_start, 2.5);
        assert_eq!(pool.path_from_root(b), vec![root, a, b]);
    }

    #[test]
    fn test_change_parent_propagates_to_subtree() {
        let mut pool = NodePool::new(8);
        let root = pool.add_root(state(0.0), TreeId::Forward).unwrap();
        let a = pool
            .add_node(root, state(1.0), dummy_piece(1.0), 10.0, 1.0)
            .unwrap();
        let b = pool
            .add_node(a, state(2.0), dummy_piece(1.0), 1.0, 1.0)
            .unwrap();
        let c = pool
            .add_node(b, state(3.0), dummy_piece(1.0), 1.0, 1.0)
            .unwrap();
        let shortcut = pool
            .add_node(root, state(1.5), dummy_piece(1.0), 2.0, 1.0)
            .unwrap();

        // b: 11 → 3 through the shortcut, c follows
        pool.change_parent(b, shortcut, dummy_piece(1.0), 1.0, 1.0);
        assert_relative_eq!(pool.node(b).cost_from_start, 3.0);
        assert_relative_eq!(pool.node(c).cost_from_start, 4.0);
        assert_eq!(pool.node(b).parent, Some(shortcut));
        assert!(!pool.node(a).children.contains(&b));
        assert!(pool.node(shortcut).children.contains(&b));
        // still reachable from the root
        assert_eq!(pool.path_from_root(c)[0], root);
    }

    #[test]
    fn test_invariant_cost_decomposition() {
        let mut pool = NodePool::new(16);
        let root = pool.add_root(state(0.0), TreeId::Forward).unwrap();
        let mut prev = root;
        for i in 0..5 {
            prev = pool
                .add_node(
                    prev,
                    state(i as f64),
                    dummy_piece(0.5),
                    1.0 + i as f64,
                    0.5,
                )
                .unwrap();
        }
        for (id, node) in pool.iter() {
            if let Some(p) = node.parent {
                assert_relative_eq!(
                    node.cost_from_start,
                    pool.node(p).cost_from_start + node.cost_from_parent,
                    epsilon = 1e-12
                );
                let _ = id;
            }
        }
    }
}
