use serde::Serialize;

use super::routing::LinkPath;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SankeyNodeLayout {
    pub id: String,
    pub label: String,
    pub index: usize,
    pub value: f64,
    pub depth: usize,
    pub height: usize,
    pub column: usize,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl SankeyNodeLayout {
    pub fn breadth(&self) -> f64 {
        self.y1 - self.y0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SankeyLinkLayout {
    pub index: usize,
    pub source: String,
    pub target: String,
    pub source_index: usize,
    pub target_index: usize,
    pub value: f64,
    pub width: f64,
    /// Band centerline at the source's right edge.
    pub y0: f64,
    /// Band centerline at the target's left edge.
    pub y1: f64,
    pub path: LinkPath,
}

impl SankeyLinkLayout {
    /// Vertical span the band occupies on the source edge.
    pub fn source_span(&self) -> (f64, f64) {
        (self.y0 - self.width / 2.0, self.y0 + self.width / 2.0)
    }

    pub fn target_span(&self) -> (f64, f64) {
        (self.y1 - self.width / 2.0, self.y1 + self.width / 2.0)
    }
}

/// Snapshot of a finished layout run. Everything a renderer needs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SankeyLayout {
    pub width: f64,
    pub height: f64,
    pub node_width: f64,
    /// Padding actually used, which may be smaller than configured.
    pub node_padding: f64,
    pub value_scale: f64,
    pub columns: usize,
    pub nodes: Vec<SankeyNodeLayout>,
    pub links: Vec<SankeyLinkLayout>,
}

impl SankeyLayout {
    /// True when some node extends past the canvas bottom or right edge.
    pub fn overflows(&self) -> bool {
        self.nodes
            .iter()
            .any(|node| node.y1 > self.height + 1e-6 || node.x1 > self.width + 1e-6)
    }

    pub fn node(&self, id: &str) -> Option<&SankeyNodeLayout> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn links_between<'a>(
        &'a self,
        source: &'a str,
        target: &'a str,
    ) -> impl Iterator<Item = &'a SankeyLinkLayout> + 'a {
        self.links
            .iter()
            .filter(move |link| link.source == source && link.target == target)
    }

    /// Node ids per column, top to bottom.
    pub fn column_ids(&self) -> Vec<Vec<&str>> {
        let mut columns: Vec<Vec<&SankeyNodeLayout>> = vec![Vec::new(); self.columns];
        for node in &self.nodes {
            columns[node.column].push(node);
        }
        columns
            .into_iter()
            .map(|mut column| {
                column.sort_by(|a, b| a.y0.total_cmp(&b.y0).then(a.index.cmp(&b.index)));
                column.into_iter().map(|node| node.id.as_str()).collect()
            })
            .collect()
    }
}
