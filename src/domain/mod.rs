// Trace-graph data model and diffing engine.

pub mod ast;
pub mod diff;
pub mod event;
pub mod flow;
pub mod identifier;
pub mod metadata;
pub mod snapshot;
pub mod step;
pub mod trace;
pub mod value;
