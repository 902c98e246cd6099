use serde::Deserialize;

/// Handle to a node in a [`SankeyGraph`], returned by [`SankeyGraph::add_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub usize);

/// Link endpoint as supplied by the caller. Resolved to a concrete node index
/// during wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    ById(String),
    ByIndex(NodeIndex),
}

impl From<&str> for NodeRef {
    fn from(id: &str) -> Self {
        Self::ById(id.to_string())
    }
}

impl From<String> for NodeRef {
    fn from(id: String) -> Self {
        Self::ById(id)
    }
}

impl From<NodeIndex> for NodeRef {
    fn from(index: NodeIndex) -> Self {
        Self::ByIndex(index)
    }
}

#[derive(Debug, Clone)]
pub struct SankeyNode {
    pub id: String,
    pub label: Option<String>,
    /// Explicit value. When `None` the value is derived from attached links;
    /// otherwise it is raised to the larger link total if it falls short.
    pub fixed_value: Option<f64>,

    pub(crate) value: f64,
    pub(crate) depth: usize,
    pub(crate) height: usize,
    pub(crate) column: usize,
    pub(crate) x0: f64,
    pub(crate) x1: f64,
    pub(crate) y0: f64,
    pub(crate) y1: f64,
    pub(crate) source_links: Vec<usize>,
    pub(crate) target_links: Vec<usize>,
}

impl SankeyNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            fixed_value: None,
            value: 0.0,
            depth: 0,
            height: 0,
            column: 0,
            x0: 0.0,
            x1: 0.0,
            y0: 0.0,
            y1: 0.0,
            source_links: Vec::new(),
            target_links: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.fixed_value = Some(value);
        self
    }

    /// Label to display, falling back to the id.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Distance in columns from the furthest reachable sink.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn x0(&self) -> f64 {
        self.x0
    }

    pub fn x1(&self) -> f64 {
        self.x1
    }

    pub fn y0(&self) -> f64 {
        self.y0
    }

    pub fn y1(&self) -> f64 {
        self.y1
    }

    /// Outgoing links, in the order they are stacked on the right edge.
    pub fn source_links(&self) -> &[usize] {
        &self.source_links
    }

    /// Incoming links, in the order they are stacked on the left edge.
    pub fn target_links(&self) -> &[usize] {
        &self.target_links
    }

    pub(crate) fn shift(&mut self, dy: f64) {
        self.y0 += dy;
        self.y1 += dy;
    }

    fn reset(&mut self) {
        self.value = 0.0;
        self.depth = 0;
        self.height = 0;
        self.column = 0;
        self.x0 = 0.0;
        self.x1 = 0.0;
        self.y0 = 0.0;
        self.y1 = 0.0;
        self.source_links.clear();
        self.target_links.clear();
    }
}

#[derive(Debug, Clone)]
pub struct SankeyLink {
    pub source_ref: NodeRef,
    pub target_ref: NodeRef,
    pub value: f64,

    pub(crate) source: usize,
    pub(crate) target: usize,
    pub(crate) width: f64,
    pub(crate) y0: f64,
    pub(crate) y1: f64,
}

impl SankeyLink {
    pub fn new(source: impl Into<NodeRef>, target: impl Into<NodeRef>, value: f64) -> Self {
        Self {
            source_ref: source.into(),
            target_ref: target.into(),
            value,
            source: 0,
            target: 0,
            width: 0.0,
            y0: 0.0,
            y1: 0.0,
        }
    }

    /// Resolved source node index. Only meaningful after a layout run.
    pub fn source(&self) -> usize {
        self.source
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Band centerline where the link leaves its source.
    pub fn y0(&self) -> f64 {
        self.y0
    }

    /// Band centerline where the link enters its target.
    pub fn y1(&self) -> f64 {
        self.y1
    }

    fn reset(&mut self) {
        self.source = 0;
        self.target = 0;
        self.width = 0.0;
        self.y0 = 0.0;
        self.y1 = 0.0;
    }
}

/// Flow graph stored as an arena: links and nodes refer to each other by index.
#[derive(Debug, Clone, Default)]
pub struct SankeyGraph {
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
}

impl SankeyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: SankeyNode) -> NodeIndex {
        self.nodes.push(node);
        NodeIndex(self.nodes.len() - 1)
    }

    pub fn add_link(
        &mut self,
        source: impl Into<NodeRef>,
        target: impl Into<NodeRef>,
        value: f64,
    ) -> usize {
        self.links.push(SankeyLink::new(source, target, value));
        self.links.len() - 1
    }

    /// Returns the node with `id`, creating it at the end of the node list when
    /// it does not exist yet.
    pub fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(index) = self.find_node(id) {
            return index;
        }
        self.add_node(SankeyNode::new(id))
    }

    pub fn find_node(&self, id: &str) -> Option<NodeIndex> {
        self.nodes
            .iter()
            .position(|node| node.id == id)
            .map(NodeIndex)
    }

    pub fn node(&self, id: &str) -> Option<&SankeyNode> {
        self.find_node(id).map(|index| &self.nodes[index.0])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut SankeyNode> {
        self.find_node(id).map(|index| &mut self.nodes[index.0])
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Clears every field the layout engine writes, leaving caller input intact.
    pub(crate) fn reset_layout(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
        for link in &mut self.links {
            link.reset();
        }
    }
}

/// Node descriptor accepted by JSON input.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Link descriptor accepted by JSON input.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkSpec {
    #[serde(alias = "sourceId")]
    pub source: String,
    #[serde(alias = "targetId")]
    pub target: String,
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphSpec {
    #[serde(default)]
    pub nodes: Option<Vec<NodeSpec>>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
}

impl From<GraphSpec> for SankeyGraph {
    fn from(spec: GraphSpec) -> Self {
        let mut graph = SankeyGraph::new();
        let strict = spec.nodes.is_some();
        for node in spec.nodes.unwrap_or_default() {
            let mut entry = SankeyNode::new(node.id);
            entry.label = node.label;
            entry.fixed_value = node.value;
            graph.add_node(entry);
        }
        for link in spec.links {
            if !strict {
                graph.ensure_node(&link.source);
                graph.ensure_node(&link.target);
            }
            graph.add_link(link.source, link.target, link.value);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_node_keeps_first_seen_order() {
        let mut graph = SankeyGraph::new();
        assert_eq!(graph.ensure_node("b"), NodeIndex(0));
        assert_eq!(graph.ensure_node("a"), NodeIndex(1));
        assert_eq!(graph.ensure_node("b"), NodeIndex(0));
        assert_eq!(graph.nodes.len(), 2);
    }

    #[test]
    fn reset_preserves_caller_fields() {
        let mut graph = SankeyGraph::new();
        let a = graph.add_node(SankeyNode::new("a").with_label("Alpha").with_value(3.0));
        graph.nodes[a.0].y1 = 40.0;
        graph.nodes[a.0].source_links.push(0);
        graph.reset_layout();
        let node = &graph.nodes[a.0];
        assert_eq!(node.display_label(), "Alpha");
        assert_eq!(node.fixed_value, Some(3.0));
        assert_eq!(node.y1(), 0.0);
        assert!(node.source_links().is_empty());
    }

    #[test]
    fn graph_spec_without_nodes_creates_them_from_links() {
        let spec: GraphSpec = serde_json::from_str(
            r#"{"links": [{"sourceId": "x", "targetId": "y", "value": 2}]}"#,
        )
        .unwrap();
        let graph = SankeyGraph::from(spec);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[0].id, "x");
        assert_eq!(graph.links[0].source_ref, NodeRef::from("x"));
    }

    #[test]
    fn graph_spec_with_nodes_is_strict() {
        let spec: GraphSpec = serde_json::from_str(
            r#"{"nodes": [{"id": "x"}], "links": [{"source": "x", "target": "y", "value": 2}]}"#,
        )
        .unwrap();
        let graph = SankeyGraph::from(spec);
        assert_eq!(graph.nodes.len(), 1);
    }
}
