//! Statistics and introspection for the tree.
//!
//! Gathers per-capacity-class node counts, fill density and height. Useful for:
//! - Checking how well adaptive node sizing fits a workload
//! - Understanding memory usage patterns
//! - Debugging tree structure issues
//!
//! Statistics walk the live tree one node at a time, so figures gathered while writers are
//! active are approximate.

use std::collections::HashMap;

use crate::node::{Node, NodeKind, NodeRef};
use crate::tree::AdaptiveRadixTree;

pub trait TreeStatsTrait {
    fn get_tree_stats(&self) -> TreeStats;
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct NodeStats {
    pub width: usize,
    pub node_type: String,
    pub total_nodes: usize,
    pub total_children: usize,
    pub density: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TreeStats {
    pub node_stats: HashMap<String, NodeStats>,
    pub num_leaves: usize,
    pub num_values: usize,
    pub num_inner_nodes: usize,
    /// Leaves held in terminal slots rather than discriminated children.
    pub num_terminals: usize,
    pub total_density: f64,
    pub max_height: usize,
}

fn update_tree_stats<V>(tree_stats: &mut TreeStats, node: &Node<V>) {
    let kind = node.kind();
    let num_children = node.num_children();
    tree_stats
        .node_stats
        .entry(kind.to_string())
        .and_modify(|e| {
            e.total_nodes += 1;
            e.total_children += num_children;
        })
        .or_insert(NodeStats {
            width: kind.capacity(),
            node_type: kind.to_string(),
            total_nodes: 1,
            total_children: num_children,
            density: 0.0,
        });
}

fn get_tree_stats_walk<V>(root: NodeRef<V>, tree_stats: &mut TreeStats) {
    let mut stack = vec![(root, 1)];
    while let Some((node, height)) = stack.pop() {
        tree_stats.max_height = tree_stats.max_height.max(height);
        let node = node.read();
        if node.kind() == NodeKind::Leaf {
            tree_stats.num_leaves += 1;
            tree_stats.num_values += 1;
            continue;
        }
        update_tree_stats(tree_stats, &node);
        if let Some(terminal) = &node.terminal {
            tree_stats.num_terminals += 1;
            stack.push((terminal.clone(), height + 1));
        }
        stack.extend(node.iter().map(|(_, child)| (child.clone(), height + 1)));
    }
}

impl<V> TreeStatsTrait for AdaptiveRadixTree<V> {
    fn get_tree_stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        let Some(root) = self.root_node() else {
            return stats;
        };
        get_tree_stats_walk(root, &mut stats);

        let mut total_children = 0;
        let mut total_width = 0;
        for ns in stats.node_stats.values_mut() {
            total_children += ns.total_children;
            total_width += ns.width * ns.total_nodes;
            ns.density = ns.total_children as f64 / (ns.width * ns.total_nodes) as f64;
        }
        stats.num_inner_nodes = stats.node_stats.values().map(|ns| ns.total_nodes).sum();
        if total_width > 0 {
            stats.total_density = total_children as f64 / total_width as f64;
        }
        stats
    }
}
