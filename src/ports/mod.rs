use std::path::Path;

use crate::domain::ast::ParsedSource;
use crate::domain::flow::Flow;

pub mod flowchart_exporter;
pub mod text_exporter;

/// Turns one line of traced source into a parsed statement.
pub trait SourceParser {
    /// `None` when the line is not a standalone statement.
    fn parse(&self, source: &str) -> Option<ParsedSource>;
}

/// Renders an analysed flow for people to read.
pub trait FlowExporter {
    fn render(&self, flow: &Flow) -> String;

    fn export(&self, flow: &Flow, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render(flow))
    }
}
