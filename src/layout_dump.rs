use crate::layout::SankeyLayout;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f64,
    pub height: f64,
    pub node_width: f64,
    pub node_padding: f64,
    pub value_scale: f64,
    pub columns: usize,
    pub overflow: bool,
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    pub value: f64,
    pub depth: usize,
    pub column: usize,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDump {
    pub source: String,
    pub target: String,
    pub value: f64,
    pub width: f64,
    pub y0: f64,
    pub y1: f64,
    pub path: String,
}

impl LayoutDump {
    pub fn from_layout(layout: &SankeyLayout) -> Self {
        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                label: node.label.clone(),
                value: node.value,
                depth: node.depth,
                column: node.column,
                x0: node.x0,
                x1: node.x1,
                y0: node.y0,
                y1: node.y1,
            })
            .collect();

        let links = layout
            .links
            .iter()
            .map(|link| LinkDump {
                source: link.source.clone(),
                target: link.target.clone(),
                value: link.value,
                width: link.width,
                y0: link.y0,
                y1: link.y1,
                path: link.path.to_svg_path(),
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            node_width: layout.node_width,
            node_padding: layout.node_padding,
            value_scale: layout.value_scale,
            columns: layout.columns,
            overflow: layout.overflows(),
            nodes,
            links,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &SankeyLayout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(&mut writer, &dump)?;
    writer.flush()?;
    Ok(())
}

pub fn layout_dump_string(layout: &SankeyLayout) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&LayoutDump::from_layout(layout))?)
}
