use crate::config::{LayoutConfig, NodeAlignment, load_config, merge_init_config};
use crate::layout::{SankeyLayout, compute_layout};
use crate::layout_dump::{layout_dump_string, write_layout_dump};
use crate::parser::parse_input;
use anyhow::Result;
use clap::Parser;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "sankey-layout", version, about = "Sankey diagram layout in Rust")]
pub struct Args {
    /// Input file (.csv, .json or .md) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout JSON. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file ({"sankey": {...}})
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Canvas width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Canvas height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,

    /// Node thickness
    #[arg(long = "node-width")]
    pub node_width: Option<f64>,

    /// Vertical gap between nodes in a column
    #[arg(long = "node-padding")]
    pub node_padding: Option<f64>,

    /// Relaxation iterations
    #[arg(long = "iterations")]
    pub iterations: Option<usize>,

    /// Node alignment
    #[arg(short = 'a', long = "align", value_enum)]
    pub align: Option<NodeAlignment>,

    /// Log layout phases
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut LayoutConfig) {
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
        if let Some(v) = self.align {
            config.alignment = v;
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let base_config = load_config(args.config.as_deref())?;
    let (input, is_markdown) = read_input(args.input.as_deref())?;
    let diagrams = if is_markdown {
        extract_sankey_blocks(&input)
    } else {
        vec![input]
    };

    if diagrams.is_empty() {
        return Err(anyhow::anyhow!("No sankey diagrams found in input"));
    }

    if diagrams.len() == 1 {
        let layout = layout_diagram(&diagrams[0], &base_config, &args)?;
        return write_output(&layout, args.output.as_deref());
    }

    // Multiple diagrams (Markdown input)
    let outputs = resolve_multi_outputs(args.output.as_deref(), diagrams.len())?;
    for (idx, diagram) in diagrams.iter().enumerate() {
        let layout = layout_diagram(diagram, &base_config, &args)
            .map_err(|err| anyhow::anyhow!("diagram {}: {err}", idx + 1))?;
        write_output(&layout, Some(&outputs[idx]))?;
    }

    Ok(())
}

/// Config precedence: defaults, config file, init directive, command line.
fn layout_diagram(source: &str, base_config: &LayoutConfig, args: &Args) -> Result<SankeyLayout> {
    let parsed = parse_input(source)?;
    let mut config = base_config.clone();
    if let Some(init_cfg) = parsed.init_config {
        config = merge_init_config(config, init_cfg)?;
    }
    args.apply_overrides(&mut config);

    let mut graph = parsed.graph;
    let layout = compute_layout(&mut graph, &config)?;
    tracing::info!(
        nodes = layout.nodes.len(),
        links = layout.links.len(),
        columns = layout.columns,
        "layout complete"
    );
    Ok(layout)
}

fn write_output(layout: &SankeyLayout, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => write_layout_dump(path, layout)?,
        None => {
            let dump = layout_dump_string(layout)?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(dump.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<(String, bool)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, false));
        }
        let content = std::fs::read_to_string(path)?;
        let is_md = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| matches!(ext, "md" | "markdown"))
            .unwrap_or(false);
        return Ok((content, is_md));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, false))
}

fn extract_sankey_blocks(input: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut in_block = false;
    let mut current = Vec::new();
    let mut fence = String::new();

    for line in input.lines() {
        let trimmed = line.trim();
        if !in_block {
            if let Some(start_fence) = detect_sankey_fence(trimmed) {
                in_block = true;
                fence = start_fence;
                continue;
            }
        } else if is_fence_end(trimmed, &fence) {
            in_block = false;
            blocks.push(current.join("\n"));
            current.clear();
            continue;
        }

        if in_block {
            current.push(line.to_string());
        }
    }

    blocks
}

/// Fences tagged `sankey` or `sankey-beta`.
fn detect_sankey_fence(line: &str) -> Option<String> {
    for fence in ["```", "~~~"] {
        if line.starts_with(fence) {
            let rest = line.trim_start_matches(&fence[..1]).trim();
            if rest.starts_with("sankey") {
                return Some(fence.to_string());
            }
        }
    }
    None
}

fn is_fence_end(line: &str, fence: &str) -> bool {
    if !line.starts_with(fence) {
        return false;
    }
    line[fence.len()..].trim().is_empty()
}

fn resolve_multi_outputs(output: Option<&Path>, count: usize) -> Result<Vec<PathBuf>> {
    let base = output.ok_or_else(|| anyhow::anyhow!("Output path required for markdown input"))?;
    if base.is_dir() {
        let mut outputs = Vec::new();
        for idx in 0..count {
            outputs.push(base.join(format!("sankey-{}.json", idx + 1)));
        }
        return Ok(outputs);
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("sankey");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    let mut outputs = Vec::new();
    for idx in 0..count {
        outputs.push(parent.join(format!("{}-{}.json", stem, idx + 1)));
    }
    Ok(outputs)
}
