use std::cmp::Ordering;

use crate::config::NodeSort;
use crate::ir::SankeyGraph;

use super::routing::{reorder_all_links, reorder_neighbor_links};

const EPSILON: f64 = 1e-9;

/// Padding actually used between stacked nodes. Shrinks for crowded columns
/// so the gaps of the fullest column never take more than half the canvas
/// height, leaving room for every node to keep a positive breadth.
pub(super) fn effective_padding(columns: &[Vec<usize>], height: f64, node_padding: f64) -> f64 {
    let max_len = columns.iter().map(Vec::len).max().unwrap_or(0);
    if max_len <= 1 {
        node_padding
    } else {
        node_padding.min(height / (2 * (max_len - 1)) as f64)
    }
}

/// The single value-to-pixel factor for the run: the largest scale at which
/// every column still fits the canvas height.
pub(super) fn compute_value_scale(graph: &SankeyGraph, columns: &[Vec<usize>], height: f64, py: f64) -> f64 {
    let mut ky = f64::INFINITY;
    for column in columns {
        let total: f64 = column.iter().map(|&ni| graph.nodes[ni].value).sum();
        if column.is_empty() || total <= 0.0 {
            continue;
        }
        let available = height - (column.len() - 1) as f64 * py;
        ky = ky.min(available / total);
    }
    if ky.is_finite() { ky.max(0.0) } else { 0.0 }
}

/// Orders each column before any node is placed. An explicit comparator wins;
/// otherwise later columns follow the weighted barycenter of their sources,
/// with input order breaking ties.
pub(super) fn order_columns(graph: &SankeyGraph, columns: &mut [Vec<usize>], node_sort: Option<&NodeSort>) {
    if let Some(sort) = node_sort {
        for column in columns.iter_mut() {
            column.sort_by(|&a, &b| sort.compare(&graph.nodes[a], &graph.nodes[b]).then(a.cmp(&b)));
        }
        return;
    }

    let mut position = vec![0usize; graph.nodes.len()];
    for column in columns.iter_mut() {
        let mut keys: Vec<(usize, f64)> = column
            .iter()
            .enumerate()
            .map(|(own_pos, &ni)| {
                let mut weighted = 0.0;
                let mut weight = 0.0;
                for &li in &graph.nodes[ni].target_links {
                    let link = &graph.links[li];
                    let w = link.value.max(EPSILON);
                    weighted += position[link.source] as f64 * w;
                    weight += w;
                }
                let key = if weight > 0.0 {
                    weighted / weight
                } else {
                    own_pos as f64
                };
                (ni, key)
            })
            .collect();
        keys.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        column.clear();
        column.extend(keys.iter().map(|&(ni, _)| ni));
        for (pos, &ni) in column.iter().enumerate() {
            position[ni] = pos;
        }
    }
}

/// Stacks every column from the top, spreads the leftover height evenly
/// around the nodes, and sizes every link.
pub(super) fn initialize_node_breadths(
    graph: &mut SankeyGraph,
    columns: &[Vec<usize>],
    ky: f64,
    py: f64,
    height: f64,
) {
    for link in &mut graph.links {
        link.width = link.value * ky;
    }
    for column in columns {
        let mut y = 0.0;
        for &ni in column {
            let node = &mut graph.nodes[ni];
            node.y0 = y;
            node.y1 = y + node.value * ky;
            y = node.y1 + py;
        }
        let free = (height - y + py).max(0.0);
        let offset = free / (column.len() as f64 + 1.0);
        for (pos, &ni) in column.iter().enumerate() {
            graph.nodes[ni].shift(offset * (pos as f64 + 1.0));
        }
    }
    reorder_all_links(graph);
}

/// Offset of `link_idx` from the top of a stacked link list.
fn stack_offset(graph: &SankeyGraph, stack: &[usize], link_idx: usize) -> f64 {
    stack
        .iter()
        .take_while(|&&li| li != link_idx)
        .map(|&li| graph.links[li].width)
        .sum()
}

/// Where `node_idx` would start if its outgoing bands ran level into their
/// targets, weighted by value and column distance.
fn target_aligned_y0(graph: &SankeyGraph, node_idx: usize) -> Option<f64> {
    let node = &graph.nodes[node_idx];
    let mut y = 0.0;
    let mut w = 0.0;
    for &li in &node.source_links {
        let link = &graph.links[li];
        let target = &graph.nodes[link.target];
        let v = link.value * target.column.saturating_sub(node.column) as f64;
        let leave = stack_offset(graph, &node.source_links, li);
        let enter = target.y0 + stack_offset(graph, &target.target_links, li);
        y += (enter - leave) * v;
        w += v;
    }
    (w > 0.0).then(|| y / w)
}

fn source_aligned_y0(graph: &SankeyGraph, node_idx: usize) -> Option<f64> {
    let node = &graph.nodes[node_idx];
    let mut y = 0.0;
    let mut w = 0.0;
    for &li in &node.target_links {
        let link = &graph.links[li];
        let source = &graph.nodes[link.source];
        let v = link.value * node.column.saturating_sub(source.column) as f64;
        let leave = source.y0 + stack_offset(graph, &source.source_links, li);
        let enter = stack_offset(graph, &node.target_links, li);
        y += (leave - enter) * v;
        w += v;
    }
    (w > 0.0).then(|| y / w)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sweep {
    TowardTargets,
    TowardSources,
}

struct Relaxation<'a> {
    graph: &'a mut SankeyGraph,
    py: f64,
    height: f64,
    fixed_order: bool,
}

impl Relaxation<'_> {
    fn relax_column(&mut self, column: &mut [usize], sweep: Sweep, alpha: f64) {
        for &ni in column.iter() {
            let aligned = match sweep {
                Sweep::TowardTargets => target_aligned_y0(self.graph, ni),
                Sweep::TowardSources => source_aligned_y0(self.graph, ni),
            };
            let Some(aligned) = aligned else {
                continue;
            };
            let dy = (aligned - self.graph.nodes[ni].y0) * alpha;
            self.graph.nodes[ni].shift(dy);
            reorder_neighbor_links(self.graph, ni);
        }
        if !self.fixed_order {
            sort_by_breadth(self.graph, column);
        }
        resolve_collisions(self.graph, column, self.py, self.height);
    }
}

fn sort_by_breadth(graph: &SankeyGraph, column: &mut [usize]) {
    column.sort_by(|&a, &b| ascending_breadth(graph, a, b));
}

fn ascending_breadth(graph: &SankeyGraph, a: usize, b: usize) -> Ordering {
    graph.nodes[a]
        .y0
        .total_cmp(&graph.nodes[b].y0)
        .then(a.cmp(&b))
}

/// Alternating relaxation: each iteration sweeps right-to-left pulling nodes
/// toward their targets, then left-to-right toward their sources. Movement is
/// damped by `0.99^i`.
pub(super) fn relax_node_breadths(
    graph: &mut SankeyGraph,
    columns: &mut [Vec<usize>],
    iterations: usize,
    py: f64,
    height: f64,
    fixed_order: bool,
) {
    let mut relaxation = Relaxation {
        graph,
        py,
        height,
        fixed_order,
    };
    let column_count = columns.len();
    for i in 0..iterations {
        let alpha = 0.99_f64.powi(i as i32);
        if column_count >= 2 {
            for c in (0..column_count - 1).rev() {
                relaxation.relax_column(&mut columns[c], Sweep::TowardTargets, alpha);
            }
        }
        for column in columns.iter_mut().skip(1) {
            relaxation.relax_column(column, Sweep::TowardSources, alpha);
        }
    }
}

fn push_down(graph: &mut SankeyGraph, column: &[usize], py: f64) {
    let mut y = 0.0;
    for &ni in column {
        let node = &mut graph.nodes[ni];
        let dy = y - node.y0;
        if dy > EPSILON {
            node.shift(dy);
        }
        y = node.y1 + py;
    }
}

fn pull_up(graph: &mut SankeyGraph, column: &[usize], py: f64, height: f64) {
    let mut y = height;
    for &ni in column.iter().rev() {
        let node = &mut graph.nodes[ni];
        let dy = node.y1 - y;
        if dy > EPSILON {
            node.shift(-dy);
        }
        y = node.y0 - py;
    }
}

/// Separates overlapping nodes in stacking order. Nodes are pushed down until
/// padded apart; if that runs off the bottom the column is pulled back up and
/// pushed down once more from the top edge. Whatever still hangs past the
/// bottom stays there.
pub(super) fn resolve_collisions(graph: &mut SankeyGraph, column: &[usize], py: f64, height: f64) {
    let Some(&last) = column.last() else {
        return;
    };
    push_down(graph, column, py);
    if graph.nodes[last].y1 > height + EPSILON {
        pull_up(graph, column, py, height);
        push_down(graph, column, py);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::SankeyNode;

    fn stacked(spans: &[(f64, f64)]) -> (SankeyGraph, Vec<usize>) {
        let mut graph = SankeyGraph::new();
        for (idx, (y0, y1)) in spans.iter().enumerate() {
            let at = graph.add_node(SankeyNode::new(format!("n{idx}")));
            graph.nodes[at.0].y0 = *y0;
            graph.nodes[at.0].y1 = *y1;
        }
        let column = (0..spans.len()).collect();
        (graph, column)
    }

    fn spans(graph: &SankeyGraph) -> Vec<(f64, f64)> {
        graph.nodes.iter().map(|n| (n.y0(), n.y1())).collect()
    }

    #[test]
    fn padding_shrinks_for_crowded_columns() {
        let columns = vec![vec![0, 1, 2], vec![3]];
        assert_eq!(effective_padding(&columns, 10.0, 8.0), 2.5);
        assert_eq!(effective_padding(&columns, 100.0, 8.0), 8.0);
        assert_eq!(effective_padding(&[vec![0]], 10.0, 8.0), 8.0);
    }

    #[test]
    fn overlapping_nodes_are_pushed_apart() {
        let (mut graph, column) = stacked(&[(0.0, 10.0), (5.0, 15.0), (40.0, 50.0)]);
        resolve_collisions(&mut graph, &column, 2.0, 100.0);
        assert_eq!(spans(&graph), vec![(0.0, 10.0), (12.0, 22.0), (40.0, 50.0)]);
    }

    #[test]
    fn nodes_above_canvas_are_pushed_in() {
        let (mut graph, column) = stacked(&[(-6.0, 4.0)]);
        resolve_collisions(&mut graph, &column, 2.0, 100.0);
        assert_eq!(spans(&graph), vec![(0.0, 10.0)]);
    }

    #[test]
    fn bottom_overflow_is_pulled_back_up() {
        let (mut graph, column) = stacked(&[(0.0, 10.0), (80.0, 95.0), (90.0, 100.0)]);
        resolve_collisions(&mut graph, &column, 5.0, 100.0);
        assert_eq!(spans(&graph), vec![(0.0, 10.0), (70.0, 85.0), (90.0, 100.0)]);
    }

    #[test]
    fn stack_taller_than_canvas_overflows_at_bottom() {
        let (mut graph, column) = stacked(&[(0.0, 60.0), (0.0, 60.0)]);
        resolve_collisions(&mut graph, &column, 10.0, 100.0);
        assert_eq!(spans(&graph), vec![(0.0, 60.0), (70.0, 130.0)]);
    }

    #[test]
    fn value_scale_fits_fullest_column() {
        let mut graph = SankeyGraph::new();
        for (id, value) in [("a", 5.0), ("b", 15.0), ("c", 20.0)] {
            let at = graph.add_node(SankeyNode::new(id));
            graph.nodes[at.0].value = value;
        }
        let columns = vec![vec![0, 1], vec![2]];
        let ky = compute_value_scale(&graph, &columns, 108.0, 8.0);
        assert!((ky - 5.0).abs() < 1e-12);
    }

    #[test]
    fn crowded_column_keeps_positive_scale() {
        let mut graph = SankeyGraph::new();
        let source = graph.add_node(SankeyNode::new("s"));
        graph.nodes[source.0].value = 40.0;
        let mut targets = Vec::new();
        for idx in 0..40 {
            let at = graph.add_node(SankeyNode::new(format!("t{idx}")));
            graph.nodes[at.0].value = 1.0;
            targets.push(at.0);
        }
        let columns = vec![vec![source.0], targets];
        let py = effective_padding(&columns, 300.0, 8.0);
        assert!((py - 300.0 / 78.0).abs() < 1e-12);
        let ky = compute_value_scale(&graph, &columns, 300.0, py);
        assert!((ky - 3.75).abs() < 1e-9);
    }

    #[test]
    fn value_scale_is_zero_without_flow() {
        let mut graph = SankeyGraph::new();
        graph.add_node(SankeyNode::new("a"));
        assert_eq!(compute_value_scale(&graph, &[vec![0]], 100.0, 8.0), 0.0);
    }

    #[test]
    fn explicit_sort_orders_columns() {
        let mut graph = SankeyGraph::new();
        for id in ["c", "a", "b"] {
            graph.add_node(SankeyNode::new(id));
        }
        let mut columns = vec![vec![0, 1, 2]];
        order_columns(&graph, &mut columns, Some(&NodeSort::by_id()));
        assert_eq!(columns[0], vec![1, 2, 0]);
    }

    #[test]
    fn barycenter_follows_sources() {
        let mut graph = SankeyGraph::new();
        for id in ["top", "bottom", "from_bottom", "from_top"] {
            graph.add_node(SankeyNode::new(id));
        }
        graph.add_link("top", "from_top", 1.0);
        graph.add_link("bottom", "from_bottom", 1.0);
        crate::layout::wiring::wire_graph(&mut graph).unwrap();
        let mut columns = vec![vec![0, 1], vec![2, 3]];
        order_columns(&graph, &mut columns, None);
        assert_eq!(columns[0], vec![0, 1]);
        assert_eq!(columns[1], vec![3, 2]);
    }
}
