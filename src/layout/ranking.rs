use crate::config::NodeAlignment;
use crate::ir::SankeyGraph;

use super::error::{LayoutError, Result};

/// Breadth-first longest-path levelling. Every node in the frontier gets the
/// current pass number, then its successors form the next frontier. A DAG
/// settles within `adjacency.len()` passes; anything longer means a cycle.
fn assign_levels(adjacency: &[Vec<usize>], phase: &'static str) -> Result<Vec<usize>> {
    let node_count = adjacency.len();
    let mut levels = vec![0usize; node_count];
    let mut current: Vec<usize> = (0..node_count).collect();
    let mut next_seen = vec![false; node_count];
    let mut pass = 0usize;

    while !current.is_empty() {
        let mut next = Vec::new();
        for &node_idx in &current {
            levels[node_idx] = pass;
            for &succ in &adjacency[node_idx] {
                if !next_seen[succ] {
                    next_seen[succ] = true;
                    next.push(succ);
                }
            }
        }
        pass += 1;
        if pass > node_count {
            return Err(LayoutError::CyclicGraph {
                phase,
                passes: node_count,
            });
        }
        next_seen.fill(false);
        current = next;
    }
    Ok(levels)
}

pub(super) fn compute_node_depths(graph: &mut SankeyGraph) -> Result<()> {
    let adjacency: Vec<Vec<usize>> = graph
        .nodes
        .iter()
        .map(|node| {
            node.source_links
                .iter()
                .map(|&li| graph.links[li].target)
                .collect()
        })
        .collect();
    let depths = assign_levels(&adjacency, "depth assignment")?;
    for (node, depth) in graph.nodes.iter_mut().zip(depths) {
        node.depth = depth;
    }
    Ok(())
}

pub(super) fn compute_node_heights(graph: &mut SankeyGraph) -> Result<()> {
    let adjacency: Vec<Vec<usize>> = graph
        .nodes
        .iter()
        .map(|node| {
            node.target_links
                .iter()
                .map(|&li| graph.links[li].source)
                .collect()
        })
        .collect();
    let heights = assign_levels(&adjacency, "height assignment")?;
    for (node, height) in graph.nodes.iter_mut().zip(heights) {
        node.height = height;
    }
    Ok(())
}

fn resolve_column(
    alignment: NodeAlignment,
    graph: &SankeyGraph,
    node_idx: usize,
    max_depth: usize,
) -> usize {
    let node = &graph.nodes[node_idx];
    let has_incoming = !node.target_links.is_empty();
    let has_outgoing = !node.source_links.is_empty();
    let column = match alignment {
        NodeAlignment::Left => node.depth,
        NodeAlignment::Right => max_depth.saturating_sub(node.height),
        NodeAlignment::Justify => match (has_incoming, has_outgoing) {
            (false, _) => 0,
            (true, false) => max_depth,
            (true, true) => {
                let span = (node.depth + node.height) as f64;
                let spread = (max_depth as f64 * node.depth as f64 / span).round() as usize;
                spread.clamp(node.depth, max_depth.saturating_sub(node.height))
            }
        },
        NodeAlignment::Center => {
            if has_incoming {
                node.depth
            } else if has_outgoing {
                node.source_links
                    .iter()
                    .map(|&li| graph.nodes[graph.links[li].target].depth)
                    .min()
                    .unwrap_or(1)
                    .saturating_sub(1)
            } else {
                0
            }
        }
    };
    column.min(max_depth)
}

/// Resolves every node's column and returns the column buckets, each in node
/// input order.
pub(super) fn assign_columns(graph: &mut SankeyGraph, alignment: NodeAlignment) -> Vec<Vec<usize>> {
    let max_depth = graph.nodes.iter().map(|n| n.depth).max().unwrap_or(0);
    let resolved: Vec<usize> = (0..graph.nodes.len())
        .map(|idx| resolve_column(alignment, graph, idx, max_depth))
        .collect();
    let column_count = resolved.iter().copied().max().map_or(0, |max| max + 1);
    let mut columns: Vec<Vec<usize>> = vec![Vec::new(); column_count];
    for (idx, column) in resolved.into_iter().enumerate() {
        graph.nodes[idx].column = column;
        columns[column].push(idx);
    }
    columns
}

/// Spreads columns evenly across the canvas width.
pub(super) fn position_columns(graph: &mut SankeyGraph, column_count: usize, width: f64, node_width: f64) {
    let step = if column_count > 1 {
        let gap = ((width - node_width * column_count as f64) / (column_count - 1) as f64).max(0.0);
        node_width + gap
    } else {
        0.0
    };
    for node in &mut graph.nodes {
        node.x0 = node.column as f64 * step;
        node.x1 = node.x0 + node_width;
    }
}
