// Plain-text rendering of a flow: each step in program order with its changes.

use crate::domain::flow::Flow;
use crate::ports::FlowExporter;

pub struct TextExporter;

impl FlowExporter for TextExporter {
    fn render(&self, flow: &Flow) -> String {
        let mut out = String::new();
        out.push_str(&format!("explaining {}\n", flow.target_id()));
        for step in flow.trace().steps() {
            if !step.shown_in_output() {
                continue;
            }
            let marker = if flow.is_target(step.id()) { " <- target" } else { "" };
            out.push_str(&format!(
                "{} [{}] {}{}\n",
                step.id(),
                step.scope(),
                step.source_text(),
                marker
            ));
            for change in step.metadata().changes() {
                out.push_str(&format!("    {}\n", change));
            }
        }
        out
    }
}
