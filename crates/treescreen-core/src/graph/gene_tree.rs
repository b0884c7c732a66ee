//! Rooted gene tree backed by petgraph::DiGraph, with midpoint rerooting.
//!
//! Edges point parent → child. A node's parent is its single incoming
//! neighbour, so walking towards the root never needs an owning reference.

use std::path::Path;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{Result, ScreenError};
use crate::graph::newick::{parse_newick, NewickError};

/// Support assigned when the Newick text carries none.
pub const DEFAULT_SUPPORT: f64 = 1.0;
/// Branch length assigned when the Newick text carries none.
pub const DEFAULT_DIST: f64 = 1.0;

/// Node payload: leaf name (empty for internal nodes), support and branch length to the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub name: String,
    pub support: f64,
    pub dist: f64,
}

/// A rooted tree. Immutable once built; rerooting returns a new tree.
#[derive(Debug, Clone)]
pub struct GeneTree {
    graph: DiGraph<TreeNode, ()>,
    root: NodeIndex,
    /// Leaves under each node, indexed by `NodeIndex::index()`.
    leaf_counts: Vec<usize>,
}

impl GeneTree {
    fn new(graph: DiGraph<TreeNode, ()>, root: NodeIndex) -> Self {
        let mut tree = Self {
            graph,
            root,
            leaf_counts: Vec::new(),
        };
        let mut counts = vec![0usize; tree.graph.node_count()];
        for node in tree.preorder().into_iter().rev() {
            let children = tree.children(node);
            counts[node.index()] = if children.is_empty() {
                1
            } else {
                children.iter().map(|c| counts[c.index()]).sum()
            };
        }
        tree.leaf_counts = counts;
        tree
    }

    /// Build a tree from Newick text, keeping the rooting as written.
    pub fn from_newick(text: &str) -> std::result::Result<Self, NewickError> {
        let (mut root, nodes) = parse_newick(text)?;
        // A root with a single child is not a real split; the child becomes the root.
        while let [only] = nodes[root].children.as_slice() {
            root = *only;
        }
        let mut graph = DiGraph::with_capacity(nodes.len(), nodes.len().saturating_sub(1));

        // Parents come after their children in the arena, so walk it top-down from the root.
        let mut stack: Vec<(usize, Option<NodeIndex>)> = vec![(root, None)];
        let mut new_root = None;
        while let Some((i, parent)) = stack.pop() {
            let parsed = &nodes[i];
            let is_leaf = parsed.children.is_empty();
            let (name, support) = if is_leaf {
                (parsed.label.clone().unwrap_or_default(), DEFAULT_SUPPORT)
            } else {
                let support = match &parsed.label {
                    Some(label) => label.parse::<f64>().map_err(|_| NewickError {
                        position: 0,
                        message: format!("Internal node label '{label}' is not a support value"),
                    })?,
                    None => DEFAULT_SUPPORT,
                };
                (String::new(), support)
            };
            let dist = if i == root {
                0.0
            } else {
                parsed.length.unwrap_or(DEFAULT_DIST)
            };
            let created = graph.add_node(TreeNode {
                name,
                support,
                dist,
            });
            match parent {
                Some(p) => {
                    graph.add_edge(p, created, ());
                }
                None => new_root = Some(created),
            }
            stack.extend(parsed.children.iter().rev().map(|&c| (c, Some(created))));
        }

        let root = new_root.ok_or_else(|| NewickError {
            position: 0,
            message: "Empty tree".to_string(),
        })?;
        Ok(Self::new(graph, root))
    }

    /// Read a Newick file. Malformed or empty files are fatal.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ScreenError::io(path, e))?;
        Self::from_newick(&text).map_err(|source| ScreenError::Newick {
            path: path.display().to_string(),
            source,
        })
    }

    /// Read a Newick file and reroot it at the midpoint of its longest path.
    pub fn load_rooted(path: &Path) -> Result<Self> {
        Ok(Self::from_file(path)?.midpoint_rooted())
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn node(&self, node: NodeIndex) -> &TreeNode {
        &self.graph[node]
    }

    pub fn name(&self, node: NodeIndex) -> &str {
        &self.graph[node].name
    }

    pub fn support(&self, node: NodeIndex) -> f64 {
        self.graph[node].support
    }

    pub fn parent(&self, node: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .next()
    }

    /// Children in the order they were written.
    pub fn children(&self, node: NodeIndex) -> Vec<NodeIndex> {
        // petgraph yields the most recently added edge first.
        let mut children: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        children.reverse();
        children
    }

    pub fn is_leaf(&self, node: NodeIndex) -> bool {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .next()
            .is_none()
    }

    pub fn is_root(&self, node: NodeIndex) -> bool {
        node == self.root
    }

    /// Number of leaves under `node` (1 for a leaf).
    pub fn leaf_count(&self, node: NodeIndex) -> usize {
        self.leaf_counts[node.index()]
    }

    /// Total number of leaves in the tree.
    pub fn len(&self) -> usize {
        self.leaf_count(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All nodes, parents before children.
    pub fn preorder(&self) -> Vec<NodeIndex> {
        self.preorder_from(self.root)
    }

    pub fn preorder_from(&self, start: NodeIndex) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            order.push(node);
            let mut children = self.children(node);
            children.reverse();
            stack.extend(children);
        }
        order
    }

    /// Leaves under `node` in pre-order.
    pub fn leaves(&self, node: NodeIndex) -> Vec<NodeIndex> {
        self.preorder_from(node)
            .into_iter()
            .filter(|&n| self.is_leaf(n))
            .collect()
    }

    /// Leaf names under `node` in pre-order.
    pub fn leaf_names(&self, node: NodeIndex) -> Vec<String> {
        self.leaves(node)
            .into_iter()
            .map(|n| self.graph[n].name.clone())
            .collect()
    }

    /// Ancestors of `node`, nearest first, ending at the root.
    pub fn ancestors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut chain = Vec::new();
        let mut current = self.parent(node);
        while let Some(n) = current {
            chain.push(n);
            current = self.parent(n);
        }
        chain
    }

    /// Neighbours ignoring direction, with the length of the connecting branch.
    fn undirected_neighbors(&self, node: NodeIndex) -> Vec<(NodeIndex, f64)> {
        let mut out: Vec<(NodeIndex, f64)> = self
            .children(node)
            .into_iter()
            .map(|c| (c, self.graph[c].dist))
            .collect();
        if let Some(p) = self.parent(node) {
            out.push((p, self.graph[node].dist));
        }
        out
    }

    /// Path distance from `from` to every node.
    fn distances_from(&self, from: NodeIndex) -> Vec<f64> {
        let mut dist = vec![f64::NAN; self.graph.node_count()];
        dist[from.index()] = 0.0;
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            let here = dist[node.index()];
            for (nb, len) in self.undirected_neighbors(node) {
                if dist[nb.index()].is_nan() {
                    dist[nb.index()] = here + len;
                    stack.push(nb);
                }
            }
        }
        dist
    }

    /// First leaf in pre-order with the greatest distance from `from`.
    fn farthest_leaf(&self, from: NodeIndex) -> (NodeIndex, f64) {
        let dist = self.distances_from(from);
        let mut best = (from, 0.0);
        for node in self.preorder() {
            if self.is_leaf(node) && dist[node.index()] > best.1 {
                best = (node, dist[node.index()]);
            }
        }
        best
    }

    /// Locate the branch holding the midpoint of the longest leaf-to-leaf path.
    ///
    /// Returns the node below that branch and the distance from it to the midpoint.
    pub fn midpoint_outgroup(&self) -> Option<(NodeIndex, f64)> {
        let (a, _) = self.farthest_leaf(self.root);
        let (_, span) = self.farthest_leaf(a);
        if span <= 0.0 {
            return None;
        }
        let half = span / 2.0;
        // The midpoint lies between `a` and its last common ancestor with the far
        // leaf, because `a` is the leaf farthest from the root.
        let mut covered = 0.0;
        let mut current = a;
        loop {
            let dist = self.graph[current].dist;
            if covered + dist > half {
                return Some((current, half - covered));
            }
            covered += dist;
            current = self.parent(current)?;
        }
    }

    /// Midpoint-rooted copy of this tree. Trees without a positive-length
    /// longest path keep their input rooting.
    pub fn midpoint_rooted(&self) -> GeneTree {
        match self.midpoint_outgroup() {
            Some((outgroup, offset)) => self.rerooted_on(outgroup, offset),
            None => {
                log::debug!("No positive-length longest path; keeping input rooting");
                self.clone()
            }
        }
    }

    /// Place a new root on the branch above `outgroup`, `offset` away from it.
    ///
    /// Support travels with its branch: when a branch is reversed the value
    /// moves to whichever end is now the child. A former root left with a
    /// single child is spliced out.
    pub fn rerooted_on(&self, outgroup: NodeIndex, offset: f64) -> GeneTree {
        let Some(above) = self.parent(outgroup) else {
            return self.clone();
        };
        let old_root = self.root;
        let branch_len = self.graph[outgroup].dist;
        let branch_support = self.graph[outgroup].support;

        // Support of the branch joining `a` and `b`, held by the lower end.
        let branch_support_of = |a: NodeIndex, b: NodeIndex| -> f64 {
            if self.parent(a) == Some(b) {
                self.graph[a].support
            } else {
                self.graph[b].support
            }
        };
        let onward = |node: NodeIndex, from: NodeIndex| -> Vec<(NodeIndex, f64)> {
            self.undirected_neighbors(node)
                .into_iter()
                .filter(|(nb, _)| *nb != from)
                .collect()
        };
        // Skip over the former root when it would become unary.
        let resolve = |node: NodeIndex, from: NodeIndex, dist: f64, support: f64| {
            if node == old_root {
                let rest = onward(node, from);
                if rest.len() == 1 {
                    let (next, len) = rest[0];
                    return (next, node, dist + len, branch_support_of(node, next));
                }
            }
            (node, from, dist, support)
        };

        let mut graph: DiGraph<TreeNode, ()> = DiGraph::with_capacity(
            self.graph.node_count() + 1,
            self.graph.node_count(),
        );
        let new_root = graph.add_node(TreeNode {
            name: String::new(),
            support: DEFAULT_SUPPORT,
            dist: 0.0,
        });

        // (old node, old neighbour it was reached from, new node)
        let mut stack: Vec<(NodeIndex, NodeIndex, NodeIndex)> = Vec::new();
        let seeds = [
            (outgroup, above, offset.max(0.0)),
            (above, outgroup, (branch_len - offset).max(0.0)),
        ];
        for (node, from, dist) in seeds {
            let (node, from, dist, support) = resolve(node, from, dist, branch_support);
            let created = graph.add_node(self.copy_node(node, dist, support));
            graph.add_edge(new_root, created, ());
            stack.push((node, from, created));
        }

        while let Some((node, from, created)) = stack.pop() {
            for (next, len) in onward(node, from) {
                let support = branch_support_of(node, next);
                let (next, via, dist, support) = resolve(next, node, len, support);
                let child = graph.add_node(self.copy_node(next, dist, support));
                graph.add_edge(created, child, ());
                stack.push((next, via, child));
            }
        }

        GeneTree::new(graph, new_root)
    }

    fn copy_node(&self, old: NodeIndex, dist: f64, support: f64) -> TreeNode {
        let data = &self.graph[old];
        let is_leaf = self.is_leaf(old) && !self.is_root(old);
        TreeNode {
            name: data.name.clone(),
            support: if is_leaf { data.support } else { support },
            dist,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn root_split(tree: &GeneTree) -> BTreeSet<BTreeSet<String>> {
        tree.children(tree.root())
            .into_iter()
            .map(|c| tree.leaf_names(c).into_iter().collect())
            .collect()
    }

    #[test]
    fn preorder_visits_parent_first() {
        let tree = GeneTree::from_newick("((A_1,B_1)90,(C_1,D_1)80);").unwrap();
        let order = tree.preorder();
        assert_eq!(order[0], tree.root());
        for node in &order {
            if let Some(parent) = tree.parent(*node) {
                let pos_parent = order.iter().position(|n| *n == parent).unwrap();
                let pos_child = order.iter().position(|n| n == node).unwrap();
                assert!(pos_parent < pos_child);
            }
        }
        assert_eq!(tree.leaf_names(tree.root()), vec!["A_1", "B_1", "C_1", "D_1"]);
    }

    #[test]
    fn leaf_counts_and_supports() {
        let tree = GeneTree::from_newick("((A_1,B_1)90,C_1);").unwrap();
        assert_eq!(tree.len(), 3);
        let inner = tree.children(tree.root())[0];
        assert_eq!(tree.leaf_count(inner), 2);
        assert_eq!(tree.support(inner), 90.0);
        assert!(!tree.is_leaf(inner));
        assert!(tree.is_root(tree.root()));
    }

    #[test]
    fn missing_values_use_defaults() {
        let tree = GeneTree::from_newick("((A,B),C);").unwrap();
        let inner = tree.children(tree.root())[0];
        assert_eq!(tree.support(inner), DEFAULT_SUPPORT);
        assert_eq!(tree.node(inner).dist, DEFAULT_DIST);
    }

    #[test]
    fn non_numeric_internal_label_rejected() {
        assert!(GeneTree::from_newick("((A,B)clade,C);").is_err());
    }

    #[test]
    fn midpoint_splits_longest_path() {
        // Longest path A..D = 1 + 1 + 10 = 12; midpoint sits 6 from D on D's branch.
        let tree =
            GeneTree::from_newick("(A_1:1,B_1:1,(C_1:1,D_1:10)90:1);").unwrap();
        let rooted = tree.midpoint_rooted();
        let split = root_split(&rooted);
        let expected: BTreeSet<BTreeSet<String>> = [
            BTreeSet::from(["D_1".to_string()]),
            BTreeSet::from(["A_1".to_string(), "B_1".to_string(), "C_1".to_string()]),
        ]
        .into_iter()
        .collect();
        assert_eq!(split, expected);
        assert_eq!(rooted.len(), 4);
        let d = rooted
            .children(rooted.root())
            .into_iter()
            .find(|c| rooted.is_leaf(*c))
            .unwrap();
        assert!((rooted.node(d).dist - 6.0).abs() < 1e-9);
    }

    #[test]
    fn midpoint_is_independent_of_input_rooting() {
        let a = GeneTree::from_newick("((A_1:1,B_1:2)80:1,(C_1:3,D_1:9)70:1);").unwrap();
        let b = GeneTree::from_newick("(C_1:3,D_1:9,(A_1:1,B_1:2)80:2);").unwrap();
        assert_eq!(root_split(&a.midpoint_rooted()), root_split(&b.midpoint_rooted()));
    }

    #[test]
    fn support_follows_reversed_branch() {
        // The branch that grouped (C,D) now hangs {A,B} below the new root side.
        let tree = GeneTree::from_newick("(A_1:1,B_1:1,(C_1:1,D_1:10)90:1)80;").unwrap();
        let rooted = tree.midpoint_rooted();
        let ab = rooted
            .preorder()
            .into_iter()
            .find(|n| {
                let names: BTreeSet<String> = rooted.leaf_names(*n).into_iter().collect();
                names == BTreeSet::from(["A_1".to_string(), "B_1".to_string()])
            })
            .unwrap();
        assert_eq!(rooted.support(ab), 90.0);
    }

    #[test]
    fn binary_root_is_spliced_out() {
        let tree = GeneTree::from_newick("((A_1:1,B_1:1)90:1,(C_1:1,D_1:8)90:1);").unwrap();
        let rooted = tree.midpoint_rooted();
        assert_eq!(rooted.len(), 4);
        for node in rooted.preorder() {
            if !rooted.is_leaf(node) {
                assert!(rooted.children(node).len() >= 2, "unary node left behind");
            }
        }
    }

    #[test]
    fn unary_root_keeps_leaf_set() {
        let tree = GeneTree::from_newick("((A_1:1,B_1:3,C_1:1)90:1);").unwrap();
        assert_eq!(tree.children(tree.root()).len(), 3);
        let rooted = tree.midpoint_rooted();
        let names: BTreeSet<String> = rooted.leaf_names(rooted.root()).into_iter().collect();
        assert_eq!(
            names,
            BTreeSet::from(["A_1".to_string(), "B_1".to_string(), "C_1".to_string()])
        );
        assert_eq!(rooted.len(), 3);
        assert!(rooted.preorder().iter().all(|n| !rooted.is_leaf(*n) || !rooted.name(*n).is_empty()));
    }

    #[test]
    fn single_leaf_tree() {
        let tree = GeneTree::from_newick("(A_1:2);").unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.leaf_names(tree.root()), vec!["A_1"]);
        assert_eq!(tree.midpoint_rooted().len(), 1);
    }

    #[test]
    fn deep_tree_loads_and_roots_on_small_stack() {
        let depth = 5000;
        let mut newick = "(".repeat(depth);
        newick.push_str("L_0:1");
        for i in 1..=depth {
            newick.push_str(&format!(",L_{i}:1)90:1"));
        }
        newick.push(';');
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || {
                let tree = GeneTree::from_newick(&newick).unwrap();
                tree.midpoint_rooted().len()
            })
            .unwrap();
        assert_eq!(handle.join().unwrap(), depth + 1);
    }

    #[test]
    fn zero_length_tree_keeps_rooting() {
        let tree = GeneTree::from_newick("((A_1:0,B_1:0):0,C_1:0);").unwrap();
        let rooted = tree.midpoint_rooted();
        assert_eq!(root_split(&rooted), root_split(&tree));
    }

    #[test]
    fn ancestors_end_at_root() {
        let tree = GeneTree::from_newick("(((A_1,B_1)90,C_1)80,D_1);").unwrap();
        let a = tree
            .preorder()
            .into_iter()
            .find(|n| tree.name(*n) == "A_1")
            .unwrap();
        let chain = tree.ancestors(a);
        assert_eq!(chain.len(), 3);
        assert_eq!(*chain.last().unwrap(), tree.root());
    }
}
