use std::collections::HashMap;

use crate::ir::{NodeRef, SankeyGraph};

use super::error::{LayoutError, Result};

/// Rejects negative or non-finite values before any phase runs.
pub(super) fn validate_values(graph: &SankeyGraph) -> Result<()> {
    for (idx, link) in graph.links.iter().enumerate() {
        if !(link.value.is_finite() && link.value >= 0.0) {
            return Err(LayoutError::invalid_config(format!(
                "link {idx} has invalid value {}",
                link.value
            )));
        }
    }
    for node in &graph.nodes {
        if let Some(value) = node.fixed_value {
            if !(value.is_finite() && value >= 0.0) {
                return Err(LayoutError::invalid_config(format!(
                    "node {} has invalid value {value}",
                    node.id
                )));
            }
        }
    }
    Ok(())
}

/// Resolves link endpoints and fills the per-node link lists in link order.
pub(super) fn wire_graph(graph: &mut SankeyGraph) -> Result<()> {
    let mut id_to_idx: HashMap<&str, usize> = HashMap::with_capacity(graph.nodes.len());
    for (idx, node) in graph.nodes.iter().enumerate() {
        if id_to_idx.insert(node.id.as_str(), idx).is_some() {
            return Err(LayoutError::integrity(format!(
                "duplicate node id {}",
                node.id
            )));
        }
    }

    let node_count = graph.nodes.len();
    let resolve = |node_ref: &NodeRef| -> Result<usize> {
        match node_ref {
            NodeRef::ById(id) => id_to_idx
                .get(id.as_str())
                .copied()
                .ok_or_else(|| LayoutError::integrity(format!("missing node id {id}"))),
            NodeRef::ByIndex(index) if index.0 < node_count => Ok(index.0),
            NodeRef::ByIndex(index) => Err(LayoutError::integrity(format!(
                "node index {} out of range ({node_count} nodes)",
                index.0
            ))),
        }
    };

    let mut endpoints = Vec::with_capacity(graph.links.len());
    for link in &graph.links {
        endpoints.push((resolve(&link.source_ref)?, resolve(&link.target_ref)?));
    }

    for (link_idx, (source, target)) in endpoints.into_iter().enumerate() {
        let link = &mut graph.links[link_idx];
        link.source = source;
        link.target = target;
        graph.nodes[source].source_links.push(link_idx);
        graph.nodes[target].target_links.push(link_idx);
    }
    Ok(())
}

pub(super) fn compute_node_values(graph: &mut SankeyGraph) {
    let links = &graph.links;
    for node in &mut graph.nodes {
        let out_sum: f64 = node.source_links.iter().map(|&li| links[li].value).sum();
        let in_sum: f64 = node.target_links.iter().map(|&li| links[li].value).sum();
        let flow = out_sum.max(in_sum);
        // An explicit value can enlarge a node but never shrink it below its bands.
        node.value = node.fixed_value.map_or(flow, |value| value.max(flow));
    }
}
