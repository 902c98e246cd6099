#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;

pub use config::{LayoutConfig, NodeAlignment, NodeSort};
pub use ir::{NodeIndex, NodeRef, SankeyGraph, SankeyLink, SankeyNode};
pub use layout::{LayoutError, LinkPath, SankeyLayout, compute_layout};
pub use parser::{parse_input, parse_sankey};

#[cfg(feature = "cli")]
pub use cli::run;
