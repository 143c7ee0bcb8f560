//! Error types for trace-graph construction and flow resolution.

use std::fmt;

use thiserror::Error;

use crate::domain::step::StepId;

/// Structural errors raised while building a trace or a flow.
///
/// None of these are recoverable by retrying; they describe bad input from the
/// tracer or a programming error in whoever drives the builder API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TraceError {
    /// Step metadata was assembled from inconsistent or missing parts.
    #[error("invalid step metadata: {0}")]
    Configuration(String),

    /// A relation name outside `prev`, `next`, `step_into`, `returned_from`.
    #[error("wrong relation name: {0}")]
    InvalidRelation(String),

    /// The target step is not a single-identifier marker call.
    #[error("target step {step} is not a marker call: {reason}")]
    MalformedTarget {
        step: StepId,
        reason: MalformedTargetReason,
    },

    /// A relation or flow endpoint points at a step the trace does not own.
    #[error("unknown step {0}")]
    UnknownStep(StepId),
}

/// Why the target step failed to match `marker(identifier)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedTargetReason {
    /// The target's source could not be parsed into a statement.
    Unparsed,
    /// The statement is not a call expression.
    NotACall,
    /// The callee is something other than the configured marker.
    WrongCallee(String),
    /// The marker received this many arguments instead of one.
    ArgumentCount(usize),
    /// The single argument is an expression rather than a bare identifier.
    NotAnIdentifier,
}

impl fmt::Display for MalformedTargetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedTargetReason::Unparsed => write!(f, "source is not a statement"),
            MalformedTargetReason::NotACall => write!(f, "expected a call expression"),
            MalformedTargetReason::WrongCallee(callee) => {
                write!(f, "callee `{}` is not the marker", callee)
            }
            MalformedTargetReason::ArgumentCount(n) => {
                write!(f, "expected exactly one argument, found {}", n)
            }
            MalformedTargetReason::NotAnIdentifier => {
                write!(f, "argument must be a bare identifier")
            }
        }
    }
}

pub type Result<T, E = TraceError> = std::result::Result<T, E>;
