use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::ast::MarkerConfig;
use crate::domain::flow::BacktraceSummary;
use crate::infrastructure::recording_loader::RecordingLoader;
use crate::ports::{FlowExporter, SourceParser};

/// Loads a recording, explains its target value, and writes the rendering.
pub struct ExplainUsecase<'a> {
    pub parser: &'a dyn SourceParser,
    pub exporter: &'a dyn FlowExporter,
    pub marker: &'a MarkerConfig,
}

impl<'a> ExplainUsecase<'a> {
    pub fn run(&self, recording: &Path, export_path: &Path) -> Result<BacktraceSummary> {
        let recording = RecordingLoader::load(recording)?;
        let mut flow = recording
            .into_flow(self.parser, self.marker)
            .context("Failed to build execution flow")?;
        let summary = flow.backtrace()?;
        info!(
            target_id = %flow.target_id(),
            appearances = summary.appearances,
            modifications = summary.modifications,
            switches = summary.switches,
            "backtrace complete"
        );
        self.exporter
            .export(&flow, export_path)
            .with_context(|| format!("Failed to write {}", export_path.display()))?;
        Ok(summary)
    }
}
