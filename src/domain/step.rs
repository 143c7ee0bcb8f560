//! Steps and the relations linking them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::identifier::ScopeId;
use crate::domain::metadata::StepMetadata;
use crate::error::TraceError;

/// Stable identity of a step: its insertion order in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub usize);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The four ways one step can point at another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Previous step in the same scope.
    Prev,
    /// Next step in the same scope.
    Next,
    /// First step of the activation this step calls into.
    StepInto,
    /// Last step of the activation that just returned.
    ReturnedFrom,
}

impl Relation {
    pub fn name(&self) -> &'static str {
        match self {
            Relation::Prev => "prev",
            Relation::Next => "next",
            Relation::StepInto => "step_into",
            Relation::ReturnedFrom => "returned_from",
        }
    }
}

impl FromStr for Relation {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prev" => Ok(Relation::Prev),
            "next" => Ok(Relation::Next),
            "step_into" => Ok(Relation::StepInto),
            "returned_from" => Ok(Relation::ReturnedFrom),
            other => Err(TraceError::InvalidRelation(other.to_string())),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of the execution graph.
#[derive(Debug, Clone)]
pub struct Step {
    id: StepId,
    scope: ScopeId,
    metadata: StepMetadata,
    prev: Option<StepId>,
    next: Option<StepId>,
    step_into: Option<StepId>,
    returned_from: Option<StepId>,
    shown_in_output: bool,
}

impl Step {
    pub(crate) fn new(id: StepId, scope: ScopeId, metadata: StepMetadata) -> Self {
        Self {
            id,
            scope,
            metadata,
            prev: None,
            next: None,
            step_into: None,
            returned_from: None,
            shown_in_output: true,
        }
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn metadata(&self) -> &StepMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut StepMetadata {
        &mut self.metadata
    }

    pub fn source_text(&self) -> &str {
        self.metadata.source_text()
    }

    pub fn prev(&self) -> Option<StepId> {
        self.prev
    }

    pub fn next(&self) -> Option<StepId> {
        self.next
    }

    pub fn step_into(&self) -> Option<StepId> {
        self.step_into
    }

    pub fn returned_from(&self) -> Option<StepId> {
        self.returned_from
    }

    pub fn relation(&self, relation: Relation) -> Option<StepId> {
        match relation {
            Relation::Prev => self.prev,
            Relation::Next => self.next,
            Relation::StepInto => self.step_into,
            Relation::ReturnedFrom => self.returned_from,
        }
    }

    pub(crate) fn set_relation(&mut self, relation: Relation, target: Option<StepId>) {
        match relation {
            Relation::Prev => self.prev = target,
            Relation::Next => self.next = target,
            Relation::StepInto => self.step_into = target,
            Relation::ReturnedFrom => self.returned_from = target,
        }
    }

    pub fn is_call_site(&self) -> bool {
        self.step_into.is_some()
    }

    pub fn shown_in_output(&self) -> bool {
        self.shown_in_output
    }

    pub fn set_shown_in_output(&mut self, shown: bool) {
        self.shown_in_output = shown;
    }
}
