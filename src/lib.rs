// Main library entry point for Cyberbrain.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;

pub use domain::ast::{MarkerConfig, ParsedSource};
pub use domain::event::{ChangeEvent, VarAppearance, VarModification, VarSwitch};
pub use domain::flow::{BacktraceSummary, Flow};
pub use domain::identifier::{Identifier, ScopeId};
pub use domain::metadata::{ParamBinding, StepMetadata};
pub use domain::snapshot::Snapshot;
pub use domain::step::{Relation, Step, StepId};
pub use domain::trace::{ScopeInfo, Trace};
pub use domain::value::Value;
pub use error::{MalformedTargetReason, TraceError};
