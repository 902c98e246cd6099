use crate::ir::{GraphSpec, NodeIndex, SankeyGraph, SankeyNode};
use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^sankey(-beta)?$").unwrap());
static INIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%%\{\s*init\s*:\s*(\{.*\})\s*\}%%").unwrap());

#[derive(Debug, Default)]
pub struct ParseOutput {
    pub graph: SankeyGraph,
    pub init_config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Json,
}

/// JSON documents start with an object; everything else is read as CSV.
pub fn detect_input_format(input: &str) -> InputFormat {
    if input.trim_start().starts_with('{') {
        InputFormat::Json
    } else {
        InputFormat::Csv
    }
}

pub fn parse_input(input: &str) -> Result<ParseOutput> {
    match detect_input_format(input) {
        InputFormat::Json => Ok(ParseOutput {
            graph: parse_graph_json(input)?,
            init_config: None,
        }),
        InputFormat::Csv => parse_sankey(input),
    }
}

pub fn parse_graph_json(input: &str) -> Result<SankeyGraph> {
    let spec: GraphSpec = match serde_json::from_str(input) {
        Ok(spec) => spec,
        Err(json_err) => json5::from_str(input)
            .map_err(|_| anyhow!("invalid graph JSON: {json_err}"))?,
    };
    Ok(SankeyGraph::from(spec))
}

fn parse_init_directive(line: &str) -> Option<serde_json::Value> {
    let caps = INIT_RE.captures(line)?;
    let json_str = caps.get(1)?.as_str();
    serde_json::from_str::<serde_json::Value>(json_str)
        .ok()
        .or_else(|| json5::from_str::<serde_json::Value>(json_str).ok())
}

/// Parses the `sankey` CSV dialect: an optional `sankey`/`sankey-beta` header
/// followed by `source,target,value` records. Nodes are created in first-seen
/// order.
pub fn parse_sankey(input: &str) -> Result<ParseOutput> {
    let mut graph = SankeyGraph::new();
    let mut init_config = None;
    let mut node_index: HashMap<String, NodeIndex> = HashMap::new();
    let mut seen_record = false;

    for (line_idx, raw_line) in input.lines().enumerate() {
        let line_no = line_idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(value) = parse_init_directive(line) {
            init_config = Some(value);
            continue;
        }
        if line.starts_with("%%") {
            continue;
        }
        if !seen_record && HEADER_RE.is_match(line) {
            continue;
        }

        let fields = split_csv_record(line).map_err(|msg| anyhow!("line {line_no}: {msg}"))?;
        let [source, target, value] = fields.as_slice() else {
            return Err(anyhow!(
                "line {line_no}: expected 3 fields (source,target,value), found {}",
                fields.len()
            ));
        };
        if source.is_empty() || target.is_empty() {
            return Err(anyhow!("line {line_no}: empty node name"));
        }
        let value: f64 = value
            .parse()
            .map_err(|_| anyhow!("line {line_no}: invalid value {value:?}"))?;

        let source = *node_index
            .entry(source.clone())
            .or_insert_with(|| graph.add_node(SankeyNode::new(source.as_str())));
        let target = *node_index
            .entry(target.clone())
            .or_insert_with(|| graph.add_node(SankeyNode::new(target.as_str())));
        graph.add_link(source, target, value);
        seen_record = true;
    }

    Ok(ParseOutput { graph, init_config })
}

/// Splits one CSV record. Quoted fields may contain commas, and `""` inside
/// quotes is a literal quote. Unquoted fields are trimmed.
fn split_csv_record(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.peek().is_some_and(|ch| *ch == ' ' || *ch == '\t') {
            chars.next();
        }

        let mut field = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut closed = false;
            while let Some(ch) = chars.next() {
                if ch == '"' {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        closed = true;
                        break;
                    }
                } else {
                    field.push(ch);
                }
            }
            if !closed {
                return Err("unterminated quoted field".to_string());
            }
            while chars.peek().is_some_and(|ch| *ch == ' ' || *ch == '\t') {
                chars.next();
            }
            match chars.peek() {
                None | Some(',') => {}
                Some(ch) => return Err(format!("unexpected {ch:?} after quoted field")),
            }
            fields.push(field);
        } else {
            while let Some(&ch) = chars.peek() {
                if ch == ',' {
                    break;
                }
                if ch == '"' {
                    return Err("stray quote in unquoted field".to_string());
                }
                field.push(ch);
                chars.next();
            }
            fields.push(field.trim().to_string());
        }

        match chars.next() {
            Some(',') => continue,
            None => break,
            Some(ch) => return Err(format!("unexpected {ch:?}")),
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::NodeRef;

    #[test]
    fn parse_sankey_basic() {
        let input = "sankey-beta\n  A, B, 10\n  B, C, 5";
        let parsed = parse_sankey(input).unwrap();
        let ids: Vec<&str> = parsed.graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(parsed.graph.links.len(), 2);
        assert_eq!(parsed.graph.links[1].value, 5.0);
        assert_eq!(parsed.graph.links[1].source_ref, NodeRef::ByIndex(NodeIndex(1)));
    }

    #[test]
    fn header_is_optional_and_comments_are_skipped() {
        let input = "%% energy flows\nCoal,Power,12.5\n\nGas,Power,3e1\n";
        let parsed = parse_sankey(input).unwrap();
        assert_eq!(parsed.graph.nodes.len(), 3);
        assert_eq!(parsed.graph.links[1].value, 30.0);
    }

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        let input = "sankey\n\"Bio-conversion, solid\",\"Heat \"\"low\"\"\",4";
        let parsed = parse_sankey(input).unwrap();
        assert_eq!(parsed.graph.nodes[0].id, "Bio-conversion, solid");
        assert_eq!(parsed.graph.nodes[1].id, "Heat \"low\"");
    }

    #[test]
    fn reads_init_directive() {
        let input = "%%{init: {\"sankey\": {\"width\": 900}}}%%\nsankey\nA,B,1";
        let parsed = parse_sankey(input).unwrap();
        let init = parsed.init_config.unwrap();
        assert_eq!(init["sankey"]["width"], 900);
    }

    #[test]
    fn reads_json5_init_directive() {
        let input = "%%{init: {sankey: {nodeAlignment: 'left'}}}%%\nA,B,1";
        let parsed = parse_sankey(input).unwrap();
        assert_eq!(parsed.init_config.unwrap()["sankey"]["nodeAlignment"], "left");
    }

    #[test]
    fn rejects_bad_values_with_line_number() {
        let err = parse_sankey("sankey\nA,B,1\nB,C,lots").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(parse_sankey("A,B").is_err());
        assert!(parse_sankey("A,B,1,2").is_err());
        assert!(parse_sankey("\"A,B,1").is_err());
    }

    #[test]
    fn header_after_records_is_an_error() {
        assert!(parse_sankey("A,B,1\nsankey").is_err());
    }

    #[test]
    fn parses_json_graph() {
        let input = r#"{
            "nodes": [{"id": "a", "label": "Alpha"}, {"id": "b", "value": 12}],
            "links": [{"source": "a", "target": "b", "value": 3}]
        }"#;
        let parsed = parse_input(input).unwrap();
        assert_eq!(parsed.graph.nodes[0].display_label(), "Alpha");
        assert_eq!(parsed.graph.nodes[1].fixed_value, Some(12.0));
        assert!(parsed.init_config.is_none());
    }

    #[test]
    fn detects_format() {
        assert_eq!(detect_input_format("  {\"links\": []}"), InputFormat::Json);
        assert_eq!(detect_input_format("sankey\nA,B,1"), InputFormat::Csv);
    }
}
