use crate::ir::SankeyNode;
use crate::layout::error::{LayoutError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// How nodes are assigned to columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum NodeAlignment {
    Left,
    Right,
    Center,
    #[default]
    Justify,
}

impl FromStr for NodeAlignment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "center" => Ok(Self::Center),
            "justify" => Ok(Self::Justify),
            other => Err(anyhow::anyhow!("unknown node alignment: {other}")),
        }
    }
}

type NodeComparator = dyn Fn(&SankeyNode, &SankeyNode) -> Ordering + Send + Sync;

/// Explicit ordering of nodes within a column. When set, the order is applied
/// once and kept through relaxation.
#[derive(Clone)]
pub struct NodeSort(Arc<NodeComparator>);

impl NodeSort {
    /// Wraps a comparator. It must be a consistent total order (as required
    /// by [`slice::sort_by`]); an inconsistent comparator may panic during
    /// layout.
    pub fn new<F>(compare: F) -> Self
    where
        F: Fn(&SankeyNode, &SankeyNode) -> Ordering + Send + Sync + 'static,
    {
        Self(Arc::new(compare))
    }

    /// Largest value first.
    pub fn by_value_descending() -> Self {
        Self::new(|a, b| b.value().total_cmp(&a.value()))
    }

    pub fn by_id() -> Self {
        Self::new(|a, b| a.id.cmp(&b.id))
    }

    pub fn compare(&self, a: &SankeyNode, b: &SankeyNode) -> Ordering {
        (self.0)(a, b)
    }
}

impl fmt::Debug for NodeSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NodeSort(..)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub width: f64,
    pub height: f64,
    /// Horizontal thickness of every node.
    pub node_width: f64,
    /// Vertical gap between stacked nodes in a column.
    pub node_padding: f64,
    pub iterations: usize,
    #[serde(rename = "nodeAlignment")]
    pub alignment: NodeAlignment,
    #[serde(skip)]
    pub node_sort: Option<NodeSort>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 400.0,
            node_width: 24.0,
            node_padding: 8.0,
            iterations: 6,
            alignment: NodeAlignment::Justify,
            node_sort: None,
        }
    }
}

impl LayoutConfig {
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_alignment(mut self, alignment: NodeAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_node_sort(mut self, sort: NodeSort) -> Self {
        self.node_sort = Some(sort);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(LayoutError::invalid_config(format!(
                "canvas width must be positive, got {}",
                self.width
            )));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(LayoutError::invalid_config(format!(
                "canvas height must be positive, got {}",
                self.height
            )));
        }
        if !(self.node_width.is_finite() && self.node_width > 0.0) {
            return Err(LayoutError::invalid_config(format!(
                "node width must be positive, got {}",
                self.node_width
            )));
        }
        if self.node_width > self.width {
            return Err(LayoutError::invalid_config(format!(
                "node width {} exceeds canvas width {}",
                self.node_width, self.width
            )));
        }
        if !(self.node_padding.is_finite() && self.node_padding >= 0.0) {
            return Err(LayoutError::invalid_config(format!(
                "node padding must be non-negative, got {}",
                self.node_padding
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SankeyConfigFile {
    width: Option<f64>,
    height: Option<f64>,
    node_width: Option<f64>,
    node_padding: Option<f64>,
    iterations: Option<usize>,
    node_alignment: Option<NodeAlignment>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    sankey: Option<SankeyConfigFile>,
}

impl SankeyConfigFile {
    fn apply(self, config: &mut LayoutConfig) {
        if let Some(v) = self.width {
            config.width = v;
        }
        if let Some(v) = self.height {
            config.height = v;
        }
        if let Some(v) = self.node_width {
            config.node_width = v;
        }
        if let Some(v) = self.node_padding {
            config.node_padding = v;
        }
        if let Some(v) = self.iterations {
            config.iterations = v;
        }
        if let Some(v) = self.node_alignment {
            config.alignment = v;
        }
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let mut config = LayoutConfig::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("invalid config file {}: {err}", path.display()))?;
    if let Some(sankey) = parsed.sankey {
        sankey.apply(&mut config);
    }
    Ok(config)
}

/// Applies the `sankey` section of an init directive on top of `config`.
pub fn merge_init_config(
    mut config: LayoutConfig,
    init: serde_json::Value,
) -> anyhow::Result<LayoutConfig> {
    let parsed: ConfigFile = serde_json::from_value(init)
        .map_err(|err| anyhow::anyhow!("invalid init directive: {err}"))?;
    if let Some(sankey) = parsed.sankey {
        sankey.apply(&mut config);
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_valid() {
        let config = LayoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alignment, NodeAlignment::Justify);
        assert_eq!(config.iterations, 6);
    }

    #[test]
    fn rejects_non_positive_canvas() {
        let config = LayoutConfig::default().with_size(0.0, 100.0);
        assert!(matches!(
            config.validate(),
            Err(LayoutError::InvalidConfiguration { .. })
        ));
        let config = LayoutConfig::default().with_size(100.0, f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_padding() {
        let config = LayoutConfig {
            node_padding: -1.0,
            ..LayoutConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_alignment_names() {
        assert_eq!("Left".parse::<NodeAlignment>().unwrap(), NodeAlignment::Left);
        assert_eq!(
            " center ".parse::<NodeAlignment>().unwrap(),
            NodeAlignment::Center
        );
        assert!("middle".parse::<NodeAlignment>().is_err());
    }

    #[test]
    fn init_directive_overrides_fields() {
        let init = json!({"sankey": {"width": 800, "nodeAlignment": "left", "iterations": 2}});
        let config = merge_init_config(LayoutConfig::default(), init).unwrap();
        assert_eq!(config.width, 800.0);
        assert_eq!(config.height, 400.0);
        assert_eq!(config.alignment, NodeAlignment::Left);
        assert_eq!(config.iterations, 2);
    }

    #[test]
    fn init_directive_rejects_negative_iterations() {
        let init = json!({"sankey": {"iterations": -3}});
        assert!(merge_init_config(LayoutConfig::default(), init).is_err());
    }

    #[test]
    fn init_directive_without_sankey_section_is_noop() {
        let init = json!({"theme": "dark"});
        let config = merge_init_config(LayoutConfig::default(), init).unwrap();
        assert_eq!(config.width, 600.0);
    }

    #[test]
    fn loads_config_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("sankey-layout-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"sankey": {"height": 250, "nodePadding": 4}}"#).unwrap();
        let config = load_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.height, 250.0);
        assert_eq!(config.node_padding, 4.0);
        assert_eq!(config.node_width, 24.0);
    }
}
