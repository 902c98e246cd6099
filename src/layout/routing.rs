use std::cmp::Ordering;

use serde::Serialize;

use crate::ir::SankeyGraph;

// ── Link stacking order ─────────────────────────────────────────────

fn by_target_breadth(graph: &SankeyGraph, a: usize, b: usize) -> Ordering {
    let ta = graph.nodes[graph.links[a].target].y0;
    let tb = graph.nodes[graph.links[b].target].y0;
    ta.total_cmp(&tb).then(a.cmp(&b))
}

fn by_source_breadth(graph: &SankeyGraph, a: usize, b: usize) -> Ordering {
    let sa = graph.nodes[graph.links[a].source].y0;
    let sb = graph.nodes[graph.links[b].source].y0;
    sa.total_cmp(&sb).then(a.cmp(&b))
}

fn sort_source_links(graph: &mut SankeyGraph, node_idx: usize) {
    let mut links = std::mem::take(&mut graph.nodes[node_idx].source_links);
    links.sort_by(|&a, &b| by_target_breadth(graph, a, b));
    graph.nodes[node_idx].source_links = links;
}

fn sort_target_links(graph: &mut SankeyGraph, node_idx: usize) {
    let mut links = std::mem::take(&mut graph.nodes[node_idx].target_links);
    links.sort_by(|&a, &b| by_source_breadth(graph, a, b));
    graph.nodes[node_idx].target_links = links;
}

/// Re-sorts every node's link stacks by the current position of the node at
/// the other end, link input order breaking ties.
pub(super) fn reorder_all_links(graph: &mut SankeyGraph) {
    for node_idx in 0..graph.nodes.len() {
        sort_source_links(graph, node_idx);
        sort_target_links(graph, node_idx);
    }
}

/// Re-sorts the stacks that reference `node_idx` after it moved.
pub(super) fn reorder_neighbor_links(graph: &mut SankeyGraph, node_idx: usize) {
    for pos in 0..graph.nodes[node_idx].target_links.len() {
        let source = graph.links[graph.nodes[node_idx].target_links[pos]].source;
        sort_source_links(graph, source);
    }
    for pos in 0..graph.nodes[node_idx].source_links.len() {
        let target = graph.links[graph.nodes[node_idx].source_links[pos]].target;
        sort_target_links(graph, target);
    }
}

/// Stacks each node's links down its edges and records the band centerlines.
pub(super) fn compute_link_breadths(graph: &mut SankeyGraph) {
    reorder_all_links(graph);
    let SankeyGraph { nodes, links } = graph;
    for node in nodes.iter() {
        let mut y0 = node.y0;
        for &li in &node.source_links {
            let link = &mut links[li];
            link.y0 = y0 + link.width / 2.0;
            y0 += link.width;
        }
        let mut y1 = node.y0;
        for &li in &node.target_links {
            let link = &mut links[li];
            link.y1 = y1 + link.width / 2.0;
            y1 += link.width;
        }
    }
}

// ── Band path ───────────────────────────────────────────────────────

/// Horizontal cubic Bézier along a link's centerline. Stroke it with the link
/// width to draw the band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkPath {
    pub start: (f64, f64),
    pub control1: (f64, f64),
    pub control2: (f64, f64),
    pub end: (f64, f64),
}

impl LinkPath {
    pub fn horizontal(start: (f64, f64), end: (f64, f64)) -> Self {
        let mid_x = (start.0 + end.0) / 2.0;
        Self {
            start,
            control1: (mid_x, start.1),
            control2: (mid_x, end.1),
            end,
        }
    }

    /// Point on the curve at `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> (f64, f64) {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        (
            a * self.start.0 + b * self.control1.0 + c * self.control2.0 + d * self.end.0,
            a * self.start.1 + b * self.control1.1 + c * self.control2.1 + d * self.end.1,
        )
    }

    pub fn to_svg_path(&self) -> String {
        format!(
            "M{:.2},{:.2}C{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
            self.start.0,
            self.start.1,
            self.control1.0,
            self.control1.1,
            self.control2.0,
            self.control2.1,
            self.end.0,
            self.end.1
        )
    }
}
