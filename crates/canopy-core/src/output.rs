//! Graph encoders: graphviz DOT, JSON, and images rendered through `dot`.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;
use log::{info, warn};
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::config::{AnalysisConfig, OutputFormat};
use crate::error::{CanopyError, Result};
use crate::graph::{Edge, GroupId, NodeId, Program};
use crate::pipeline::AnalysisResult;

pub const TRUNK_COLOR: &str = "#966F33";
pub const LEAF_COLOR: &str = "#6db33f";
pub const EDGE_COLOR: &str = "#cf142b";
pub const NODE_COLOR: &str = "#cccccc";

/// Above this many edges orthogonal splines get too slow to lay out.
const ORTHO_EDGE_LIMIT: usize = 500;

/// Rendering switches taken from the run configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphOptions {
    pub no_grouping: bool,
    pub hide_legend: bool,
}

impl From<&AnalysisConfig> for GraphOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            no_grouping: config.no_grouping,
            hide_legend: config.hide_legend,
        }
    }
}

/// The live nodes and their call edges, each `(caller, callee)` pair once,
/// in first-seen order.
pub fn call_graph(program: &Program, edges: &[Edge]) -> DiGraphMap<NodeId, ()> {
    let mut graph = DiGraphMap::new();
    for node in program.nodes() {
        graph.add_node(node);
    }
    for edge in edges {
        graph.add_edge(edge.caller, edge.callee, ());
    }
    graph
}

fn unique_edges(graph: &DiGraphMap<NodeId, ()>) -> Vec<(NodeId, NodeId)> {
    graph.all_edges().map(|(a, b, _)| (a, b)).collect()
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// DOT
// ---------------------------------------------------------------------------

fn legend() -> String {
    format!(
        r#"subgraph legend{{
    rank = min;
    label = "legend";
    Legend [shape=none, margin=0, label = <
        <table cellspacing="0" cellpadding="0" border="1"><tr><td>Canopy Legend</td></tr><tr><td>
        <table cellspacing="0">
        <tr><td>Regular function</td><td width="50px" bgcolor='{NODE_COLOR}'></td></tr>
        <tr><td>Trunk function (nothing calls this)</td><td bgcolor='{TRUNK_COLOR}'></td></tr>
        <tr><td>Leaf function (this calls nothing else)</td><td bgcolor='{LEAF_COLOR}'></td></tr>
        <tr><td>Function call</td><td><font color='{EDGE_COLOR}'>&#8594;</font></td></tr>
        </table></td></tr></table>
        >];
}}
"#
    )
}

fn node_to_dot(program: &Program, id: NodeId) -> String {
    let node = program.node(id);
    let fill = if node.is_trunk {
        TRUNK_COLOR
    } else if node.is_leaf {
        LEAF_COLOR
    } else {
        NODE_COLOR
    };
    format!(
        r#"{} [label="{}" name="{}" shape="rect" style="rounded,filled" fillcolor="{}" ];"#,
        id.uid(),
        escape(&node.label()),
        escape(&program.node_name(id)),
        fill
    )
}

fn group_to_dot(program: &Program, id: GroupId) -> String {
    let group = program.group(id);
    let mut out = format!("subgraph {} {{\n", id.uid());
    if !group.nodes.is_empty() {
        let uids: Vec<String> = group.nodes.iter().map(|n| n.uid()).collect();
        let _ = writeln!(out, "    {};", uids.join(" "));
    }
    let _ = writeln!(out, "    label=\"{}\";", escape(&group.label()));
    let _ = writeln!(out, "    name=\"{}\";", escape(&group.token));
    out.push_str("    style=\"filled\";\n");
    out.push_str("    graph[style=dotted];\n");
    for &sub in &group.subgroups {
        for line in group_to_dot(program, sub).lines() {
            let _ = writeln!(out, "    {line}");
        }
    }
    out.push_str("};\n");
    out
}

/// Render the graph in graphviz DOT.
pub fn to_dot(result: &AnalysisResult, options: GraphOptions) -> String {
    let program = &result.program;
    let graph = call_graph(program, &result.edges);
    let edges = unique_edges(&graph);
    let splines = if edges.len() >= ORTHO_EDGE_LIMIT {
        "polyline"
    } else {
        "ortho"
    };

    let mut out = String::from("digraph G {\nconcentrate=true;\n");
    let _ = writeln!(out, "splines=\"{splines}\";");
    out.push_str("rankdir=\"LR\";\n");
    if !options.hide_legend {
        out.push_str(&legend());
    }
    for node in graph.nodes() {
        out.push_str(&node_to_dot(program, node));
        out.push('\n');
    }
    for (caller, callee) in &edges {
        let _ = writeln!(
            out,
            "{} -> {} [color=\"{EDGE_COLOR}\" penwidth=\"2\"];",
            caller.uid(),
            callee.uid()
        );
    }
    if !options.no_grouping {
        for &file in program.files() {
            out.push_str(&group_to_dot(program, file));
        }
    }
    out.push_str("}\n");
    out
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonNode {
    pub uid: String,
    pub label: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonEdge {
    pub source: String,
    pub target: String,
    pub directed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonMetadata {
    pub generator: String,
    pub version: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonGraph {
    pub directed: bool,
    pub nodes: BTreeMap<String, JsonNode>,
    pub edges: Vec<JsonEdge>,
    pub metadata: JsonMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonDocument {
    pub graph: JsonGraph,
}

pub fn to_json_document(result: &AnalysisResult) -> JsonDocument {
    let program = &result.program;
    let graph = call_graph(program, &result.edges);
    let nodes = graph
        .nodes()
        .map(|id| {
            let node = JsonNode {
                uid: id.uid(),
                label: program.node(id).label(),
                name: program.node_name(id),
            };
            (node.uid.clone(), node)
        })
        .collect();
    let edges = unique_edges(&graph)
        .into_iter()
        .map(|(caller, callee)| JsonEdge {
            source: caller.uid(),
            target: callee.uid(),
            directed: true,
        })
        .collect();
    JsonDocument {
        graph: JsonGraph {
            directed: true,
            nodes,
            edges,
            metadata: JsonMetadata {
                generator: "canopy".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                generated_at: Utc::now().to_rfc3339(),
            },
        },
    }
}

pub fn to_json(result: &AnalysisResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_json_document(result))?)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Location of graphviz `dot` on PATH, if installed.
pub fn find_graphviz() -> Option<PathBuf> {
    which::which("dot").ok()
}

/// Executable `dot` within the given search path, if any.
pub fn find_graphviz_in(paths: impl AsRef<OsStr>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    which::which_in("dot", Some(paths), cwd).ok()
}

/// Fail early when an image was requested but cannot be rendered.
pub fn ensure_renderer(format: OutputFormat) -> Result<()> {
    if format.is_image() && find_graphviz().is_none() {
        return Err(CanopyError::GraphvizMissing);
    }
    Ok(())
}

/// Write the result to `config.output_path` in the format its extension
/// names.
pub fn write_output(result: &AnalysisResult, config: &AnalysisConfig) -> Result<()> {
    let output_path = &config.output_path;
    let format = config.output_format()?;
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match format {
        OutputFormat::Json => std::fs::write(output_path, to_json(result)?)?,
        OutputFormat::Dot | OutputFormat::Gv => {
            std::fs::write(output_path, to_dot(result, GraphOptions::from(config)))?
        }
        OutputFormat::Png | OutputFormat::Svg => {
            let gv_path = output_path.with_extension("gv");
            std::fs::write(&gv_path, to_dot(result, GraphOptions::from(config)))?;
            render_image(&gv_path, output_path, format)?;
        }
    }

    let graph = call_graph(&result.program, &result.edges);
    info!(
        "wrote {} nodes and {} edges to {}",
        graph.node_count(),
        graph.edge_count(),
        output_path.display()
    );
    Ok(())
}

fn render_image(gv_path: &Path, output_path: &Path, format: OutputFormat) -> Result<()> {
    let dot = find_graphviz().ok_or(CanopyError::GraphvizMissing)?;
    let status = Command::new(dot)
        .arg(format!("-T{}", format.extension()))
        .arg("-o")
        .arg(output_path)
        .arg(gv_path)
        .status()?;
    if !status.success() {
        warn!(
            "graphviz exited with {status} while rendering {}; the DOT source is at {}",
            output_path.display(),
            gv_path.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::graph::{Group, GroupKind, Node};
    use crate::languages::Language;

    fn sample() -> AnalysisResult {
        let mut program = Program::new();
        let file = program.add_file_group(Group::new("app", GroupKind::File, 0));
        let main = program.add_node(Node::new("main", 1, vec![], vec![], file));
        let class = program.add_subgroup(file, Group::new("Store", GroupKind::Class, 5));
        let save = program.add_node(Node::new("save", 6, vec![], vec![], class));
        let first = program.link(main, save);
        let second = program.link(main, save);
        AnalysisResult {
            language: Language::Python,
            source_files: vec![PathBuf::from("app.py")],
            program,
            edges: vec![first, second],
            ambiguous_calls: Vec::new(),
            external_calls: 0,
            phase_timings: HashMap::new(),
            total_ms: 0.0,
        }
    }

    #[test]
    fn dot_contains_nodes_edges_and_clusters() {
        let dot = to_dot(&sample(), GraphOptions::default());
        assert!(dot.starts_with("digraph G {\nconcentrate=true;\nsplines=\"ortho\";"));
        assert!(dot.contains("Canopy Legend"));
        assert!(dot.contains(
            r##"node_00000000 [label="1: main()" name="app::main" shape="rect" style="rounded,filled" fillcolor="#966F33" ];"##
        ));
        assert!(dot.contains(r##"fillcolor="#6db33f""##));
        assert_eq!(dot.matches(" -> ").count(), 1);
        assert!(dot.contains("subgraph cluster_00000000 {"));
        assert!(dot.contains("    subgraph cluster_00000001 {"));
        assert!(dot.contains("label=\"Class: Store\";"));
    }

    #[test]
    fn dot_options() {
        let dot = to_dot(
            &sample(),
            GraphOptions {
                no_grouping: true,
                hide_legend: true,
            },
        );
        assert!(!dot.contains("legend"));
        assert!(!dot.contains("subgraph"));
    }

    #[test]
    fn json_document_shape() {
        let doc = to_json_document(&sample());
        assert!(doc.graph.directed);
        assert_eq!(doc.graph.nodes.len(), 2);
        assert_eq!(doc.graph.nodes["node_00000001"].name, "app::Store.save");
        assert_eq!(
            doc.graph.edges,
            vec![JsonEdge {
                source: "node_00000000".into(),
                target: "node_00000001".into(),
                directed: true,
            }]
        );
        assert_eq!(doc.graph.metadata.generator, "canopy");

        let value: serde_json::Value = serde_json::from_str(&to_json(&sample()).unwrap()).unwrap();
        assert_eq!(value["graph"]["edges"][0]["directed"], true);
    }

    #[test]
    fn writes_text_formats() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = AnalysisConfig::new(["app.py"]);
        config.output_path = tmp.path().join("nested/out.gv");
        write_output(&sample(), &config).unwrap();
        let written = std::fs::read_to_string(&config.output_path).unwrap();
        assert!(written.contains("digraph G"));

        config.output_path = tmp.path().join("out.json");
        write_output(&sample(), &config).unwrap();
        assert!(std::fs::read_to_string(&config.output_path)
            .unwrap()
            .contains("\"graph\""));
    }

    #[cfg(unix)]
    #[test]
    fn graphviz_lookup_requires_an_executable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let dot = tmp.path().join("dot");
        std::fs::write(&dot, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&dot, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert_eq!(find_graphviz_in(tmp.path()), None);

        std::fs::set_permissions(&dot, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_graphviz_in(tmp.path()), Some(dot));
    }
}
