pub mod error;
mod ranking;
mod relax;
mod routing;
pub(crate) mod types;
mod wiring;

pub use error::{LayoutError, Result};
pub use routing::LinkPath;
pub use types::*;

use ranking::*;
use relax::*;
use routing::*;
use wiring::*;

use crate::config::LayoutConfig;
use crate::ir::SankeyGraph;

/// Lays out `graph` in place and returns a snapshot of the result.
///
/// Every derived field on the graph is reset first, so calling this again
/// after editing values recomputes from scratch. On error the graph is left
/// with its derived fields cleared.
pub fn compute_layout(graph: &mut SankeyGraph, config: &LayoutConfig) -> Result<SankeyLayout> {
    config.validate()?;
    validate_values(graph)?;
    graph.reset_layout();

    match run_phases(graph, config) {
        Ok(layout) => Ok(layout),
        Err(err) => {
            graph.reset_layout();
            Err(err)
        }
    }
}

fn run_phases(graph: &mut SankeyGraph, config: &LayoutConfig) -> Result<SankeyLayout> {
    wire_graph(graph)?;
    compute_node_values(graph);
    compute_node_depths(graph)?;
    compute_node_heights(graph)?;

    let mut columns = assign_columns(graph, config.alignment);
    tracing::debug!(
        nodes = graph.nodes.len(),
        links = graph.links.len(),
        columns = columns.len(),
        alignment = ?config.alignment,
        "sankey columns assigned"
    );
    position_columns(graph, columns.len(), config.width, config.node_width);
    if columns.len() as f64 * config.node_width > config.width {
        tracing::warn!(
            columns = columns.len(),
            width = config.width,
            node_width = config.node_width,
            "sankey columns do not fit the canvas width"
        );
    }

    let py = effective_padding(&columns, config.height, config.node_padding);
    let ky = compute_value_scale(graph, &columns, config.height, py);
    tracing::debug!(value_scale = ky, node_padding = py, "sankey value scale fixed");
    if !graph.is_empty() && graph.nodes.iter().all(|node| node.value == 0.0) {
        tracing::warn!("sankey graph carries no flow; every node collapses to zero height");
    }

    order_columns(graph, &mut columns, config.node_sort.as_ref());
    initialize_node_breadths(graph, &columns, ky, py, config.height);
    relax_node_breadths(
        graph,
        &mut columns,
        config.iterations,
        py,
        config.height,
        config.node_sort.is_some(),
    );
    compute_link_breadths(graph);

    let layout = snapshot(graph, config, columns.len(), py, ky);
    if layout.overflows() {
        tracing::warn!(
            width = config.width,
            height = config.height,
            "sankey nodes extend past the canvas"
        );
    }
    Ok(layout)
}

fn snapshot(
    graph: &SankeyGraph,
    config: &LayoutConfig,
    column_count: usize,
    py: f64,
    ky: f64,
) -> SankeyLayout {
    let nodes = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| SankeyNodeLayout {
            id: node.id.clone(),
            label: node.display_label().to_string(),
            index,
            value: node.value,
            depth: node.depth,
            height: node.height,
            column: node.column,
            x0: node.x0,
            x1: node.x1,
            y0: node.y0,
            y1: node.y1,
        })
        .collect();

    let links = graph
        .links
        .iter()
        .enumerate()
        .map(|(index, link)| {
            let source = &graph.nodes[link.source];
            let target = &graph.nodes[link.target];
            SankeyLinkLayout {
                index,
                source: source.id.clone(),
                target: target.id.clone(),
                source_index: link.source,
                target_index: link.target,
                value: link.value,
                width: link.width,
                y0: link.y0,
                y1: link.y1,
                path: LinkPath::horizontal((source.x1, link.y0), (target.x0, link.y1)),
            }
        })
        .collect();

    SankeyLayout {
        width: config.width,
        height: config.height,
        node_width: config.node_width,
        node_padding: py,
        value_scale: ky,
        columns: column_count,
        nodes,
        links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeAlignment;
    use crate::ir::SankeyNode;

    fn chain() -> SankeyGraph {
        let mut graph = SankeyGraph::new();
        for id in ["A", "B", "C"] {
            graph.add_node(SankeyNode::new(id));
        }
        graph.add_link("A", "B", 10.0);
        graph.add_link("B", "C", 10.0);
        graph
    }

    #[test]
    fn chain_fills_the_canvas() {
        let mut graph = chain();
        let config = LayoutConfig::default().with_size(600.0, 300.0);
        let layout = compute_layout(&mut graph, &config).unwrap();
        assert_eq!(layout.value_scale, 30.0);
        for node in &layout.nodes {
            assert_eq!(node.value, 10.0);
            assert_eq!(node.breadth(), 300.0);
        }
        for link in &layout.links {
            assert_eq!(link.width, 300.0);
            assert_eq!(link.y0, 150.0);
            assert_eq!(link.y1, 150.0);
        }
        let depths: Vec<usize> = layout.nodes.iter().map(|n| n.depth).collect();
        assert_eq!(depths, vec![0, 1, 2]);
    }

    #[test]
    fn graph_exposes_results_after_layout() {
        let mut graph = chain();
        compute_layout(&mut graph, &LayoutConfig::default()).unwrap();
        let b = graph.node("B").unwrap();
        assert_eq!(b.depth(), 1);
        assert_eq!(b.x1() - b.x0(), 24.0);
        assert_eq!(graph.links[1].source(), 1);
    }

    #[test]
    fn failed_run_clears_previous_geometry() {
        let mut graph = chain();
        compute_layout(&mut graph, &LayoutConfig::default()).unwrap();
        graph.add_link("C", "A", 1.0);
        let err = compute_layout(&mut graph, &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, LayoutError::CyclicGraph { .. }));
        assert!(graph.nodes.iter().all(|n| n.y1() == 0.0 && n.source_links().is_empty()));
    }

    #[test]
    fn invalid_config_is_rejected_before_wiring() {
        let mut graph = chain();
        graph.add_link("A", "missing", 1.0);
        let config = LayoutConfig::default().with_size(-1.0, 100.0);
        assert!(matches!(
            compute_layout(&mut graph, &config),
            Err(LayoutError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn empty_graph_lays_out_to_nothing() {
        let mut graph = SankeyGraph::new();
        let layout = compute_layout(&mut graph, &LayoutConfig::default()).unwrap();
        assert_eq!(layout.columns, 0);
        assert!(layout.nodes.is_empty());
        assert!(!layout.overflows());
    }

    #[test]
    fn single_isolated_node_gets_zero_height() {
        let mut graph = SankeyGraph::new();
        graph.add_node(SankeyNode::new("solo"));
        let config = LayoutConfig::default().with_alignment(NodeAlignment::Justify);
        let layout = compute_layout(&mut graph, &config).unwrap();
        let solo = &layout.nodes[0];
        assert_eq!(solo.column, 0);
        assert_eq!(solo.x0, 0.0);
        assert_eq!(solo.breadth(), 0.0);
    }
}
