//! Flowchart DOT Exporter
//!
//! Exports an analysed Flow as Graphviz DOT: one HTML table per activation
//! scope, one row per visible step, and an edge from every call site to the
//! table of the callee it stepped into.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::domain::flow::Flow;
use crate::domain::step::{Step, StepId};
use crate::ports::FlowExporter;

/// Styling knobs for the rendered diagram.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub graph_name: String,
    pub code_font: String,
    pub edge_color: String,
    /// Append each step's tracked set under its changes.
    pub show_tracking: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            graph_name: "Cyberbrain Output".to_string(),
            code_font: "Consolas".to_string(),
            edge_color: "#E975B0".to_string(),
            show_tracking: false,
        }
    }
}

/// Port names for table rows, handed out in first-use order.
///
/// Lives for one render only, so two renders of the same flow produce the
/// same labels.
#[derive(Debug, Default)]
pub struct PortNames {
    names: HashMap<StepId, String>,
}

impl PortNames {
    pub fn get(&mut self, step: StepId) -> &str {
        let next = self.names.len();
        self.names
            .entry(step)
            .or_insert_with(|| next.to_string())
    }
}

#[derive(Debug, Default)]
pub struct FlowchartExporter {
    pub config: RenderConfig,
}

impl FlowchartExporter {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Convert a Flow to a DOT string.
    pub fn to_dot(&self, flow: &Flow) -> String {
        let mut ports = PortNames::default();
        let mut tables = Vec::new();
        let mut edges = Vec::new();
        let mut rendered = HashSet::new();
        let mut pending = vec![flow.start()];

        while let Some(first) = pending.pop() {
            if !rendered.insert(first) {
                continue;
            }
            let trace = flow.trace();
            let scope = trace[first].scope();
            let name = Self::table_name(&trace[first]);
            let mut rows = vec![self.header_row(flow, first)];

            for step in trace.scope_steps(first) {
                if !step.shown_in_output() {
                    continue;
                }
                let port = ports.get(step.id()).to_string();
                rows.push(self.step_row(flow, step, &port));

                if let Some(entry) = step.step_into() {
                    edges.push(format!(
                        "    \"{}\":\"{}\" -> \"{}\" [label=\"{}\"];",
                        name,
                        port,
                        Self::table_name(&trace[entry]),
                        Self::escape_label(&Self::binding_label(flow, step, entry))
                    ));
                    pending.push(entry);
                }
            }

            tables.push(format!(
                concat!(
                    "    \"{}\" [shape=plaintext, ",
                    "label=<<table cellspacing='0' cellborder='0'>{}</table>>]; // scope {}"
                ),
                name,
                rows.join(""),
                scope
            ));
        }

        let mut lines = Vec::new();
        lines.push(format!("digraph \"{}\" {{", Self::escape_label(&self.config.graph_name)));
        lines.push(format!(
            "    edge [color=\"{}\", penwidth=\"2\"];",
            self.config.edge_color
        ));
        lines.push("".to_string());
        lines.extend(tables);
        lines.push("".to_string());
        lines.extend(edges);
        lines.push("}".to_string());
        lines.join("\n")
    }

    fn table_name(first: &Step) -> String {
        format!("{}_code", first.scope())
    }

    fn header_row(&self, flow: &Flow, first: StepId) -> String {
        let scope = flow.trace()[first].scope();
        let title = match flow.trace().scope_info(scope) {
            Some(info) => {
                let file = Path::new(&info.file_path)
                    .file_name()
                    .map(|f| f.to_string_lossy().to_string())
                    .unwrap_or_default();
                format!("{} : {}", file, info.qualified_name)
            }
            None => format!("scope {}", scope),
        };
        format!(
            concat!(
                "<tr><td sides='b' border='1' align='left' colspan='2' color='grey'>",
                "<font color='#0AB127'>{}</font></td></tr>"
            ),
            Self::escape_html(&title)
        )
    }

    fn step_row(&self, flow: &Flow, step: &Step, port: &str) -> String {
        let meta = step.metadata();
        let mut changes: Vec<String> = meta.changes().map(|c| c.to_string()).collect();
        if self.config.show_tracking && !meta.tracking().is_empty() {
            let tracked: Vec<String> =
                meta.tracking().iter().map(|id| id.name().to_string()).collect();
            changes.push(format!("tracking: {}", tracked.join(", ")));
        }
        if flow.is_target(step.id()) {
            changes.push("\u{25C0} target".to_string());
        }

        let changes = changes
            .iter()
            .map(|c| Self::escape_html(c))
            .collect::<Vec<_>>()
            .join("<br align='left'/>");
        format!(
            concat!(
                "<tr><td align='left' port='{}'><font face='{}'>{}</font></td>",
                "<td align='left' sides='b' border='1' color='grey' bgcolor='#F9FE80'>",
                "\u{25E4}&nbsp;{}</td></tr>"
            ),
            port,
            self.config.code_font,
            Self::escape_html(step.source_text()),
            changes
        )
    }

    /// `args → param, value` for every parameter of the call.
    fn binding_label(flow: &Flow, site: &Step, entry: StepId) -> String {
        let Some(binding) = site.metadata().param_to_arg() else {
            return String::new();
        };
        let entry_data = flow.trace()[entry].metadata().data();
        binding
            .iter()
            .map(|(param, args)| {
                let args: Vec<&str> = args.iter().map(|a| a.name()).collect();
                let value = entry_data
                    .get(param)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "?".to_string());
                format!(" {} \u{2192} {}, {}", args.join(","), param.name(), value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn escape_label(label: &str) -> String {
        label
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#x27;")
    }
}

impl FlowExporter for FlowchartExporter {
    fn render(&self, flow: &Flow) -> String {
        self.to_dot(flow)
    }
}
