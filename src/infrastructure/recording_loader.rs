//! Recording Loader
//!
//! Reads the JSON recording a tracer writes for one run and replays it into a
//! [`Trace`]: scopes first, then steps in program order, then relations.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::domain::ast::MarkerConfig;
use crate::domain::flow::Flow;
use crate::domain::identifier::{Identifier, ScopeId};
use crate::domain::metadata::{ParamBinding, StepMetadata};
use crate::domain::snapshot::Snapshot;
use crate::domain::step::StepId;
use crate::domain::trace::{ScopeInfo, Trace};
use crate::domain::value::Value;
use crate::error::TraceError;
use crate::ports::SourceParser;

#[derive(Debug, Deserialize)]
pub struct Recording {
    #[serde(default)]
    pub scopes: Vec<RecordedScope>,
    pub steps: Vec<RecordedStep>,
    #[serde(default)]
    pub relations: Vec<RecordedRelation>,
    pub start: usize,
    pub target: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecordedScope {
    pub id: ScopeId,
    #[serde(flatten)]
    pub info: ScopeInfo,
}

#[derive(Debug, Deserialize)]
pub struct RecordedStep {
    pub scope: ScopeId,
    pub source: String,
    #[serde(default)]
    pub data: Vec<RecordedValue>,
    #[serde(default)]
    pub data_before_return: Option<Vec<RecordedValue>>,
    #[serde(default)]
    pub call: Option<RecordedCall>,
    #[serde(default = "default_shown")]
    pub shown_in_output: bool,
}

fn default_shown() -> bool {
    true
}

/// A variable known at a step; its scope is the step's scope.
#[derive(Debug, Deserialize)]
pub struct RecordedValue {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct RecordedCall {
    pub callee_scope: ScopeId,
    pub bindings: Vec<RecordedBinding>,
}

#[derive(Debug, Deserialize)]
pub struct RecordedBinding {
    pub param: String,
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecordedRelation {
    pub from: usize,
    pub relation: String,
    pub to: Option<usize>,
}

fn snapshot(scope: ScopeId, values: Vec<RecordedValue>) -> Snapshot {
    values
        .into_iter()
        .map(|v| (Identifier::new(v.name, scope), v.value))
        .collect()
}

impl RecordedStep {
    fn into_metadata(self, parser: &dyn SourceParser) -> Result<StepMetadata, TraceError> {
        let scope = self.scope;
        let mut builder =
            StepMetadata::builder(snapshot(scope, self.data)).source_text(self.source);
        if let Some(values) = self.data_before_return {
            builder = builder.data_before_return(snapshot(scope, values));
        }
        if let Some(call) = self.call {
            let binding: ParamBinding = call
                .bindings
                .into_iter()
                .map(|b| {
                    let args: BTreeSet<Identifier> =
                        b.args.into_iter().map(|a| Identifier::new(a, scope)).collect();
                    (Identifier::new(b.param, call.callee_scope), args)
                })
                .collect();
            builder = builder.param_to_arg(binding);
        }
        builder.build(parser)
    }
}

impl Recording {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Recording is not valid JSON")
    }

    /// Replays the recording into a trace and resolves the target.
    pub fn into_flow(
        self,
        parser: &dyn SourceParser,
        marker: &MarkerConfig,
    ) -> Result<Flow, TraceError> {
        let mut trace = Trace::new();
        for scope in self.scopes {
            trace.add_scope(scope.id, scope.info);
        }
        for step in self.steps {
            let scope = step.scope;
            let shown = step.shown_in_output;
            let id = trace.add_step(scope, step.into_metadata(parser)?);
            trace.get_mut(id)?.set_shown_in_output(shown);
        }
        for relation in &self.relations {
            trace.set_relations(
                StepId(relation.from),
                [(relation.relation.as_str(), relation.to.map(StepId))],
            )?;
        }
        debug!(steps = trace.len(), relations = self.relations.len(), "recording replayed");
        Flow::new(trace, StepId(self.start), StepId(self.target), marker)
    }
}

pub struct RecordingLoader;

impl RecordingLoader {
    pub fn load(path: &Path) -> Result<Recording> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recording {}", path.display()))?;
        Recording::from_json(&content)
            .with_context(|| format!("Invalid recording {}", path.display()))
    }
}
