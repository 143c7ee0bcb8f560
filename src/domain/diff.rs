//! Snapshot Diffing
//!
//! Compares the snapshots of two linked steps and classifies every change of a
//! tracked identifier. The pure `diff_*` functions compute events; the
//! `record_*` functions run them against a [`Trace`] and store the events on
//! the later step, the one whose visible state they explain.

use tracing::trace;

use crate::domain::event::ChangeEvent;
use crate::domain::identifier::Identifier;
use crate::domain::metadata::StepMetadata;
use crate::domain::step::StepId;
use crate::domain::trace::Trace;
use crate::domain::value::Value;
use crate::error::{Result, TraceError};

fn classify(id: &Identifier, old: Option<&Value>, new: &Value) -> Option<ChangeEvent> {
    match old {
        None => Some(ChangeEvent::appearance(id.clone(), new.clone())),
        Some(old) if new.differs_from(old) => Some(ChangeEvent::modification(
            id.clone(),
            old.clone(),
            new.clone(),
        )),
        Some(_) => None,
    }
}

/// Changes between two consecutive steps of the same scope, for every id
/// `later` tracks.
pub fn diff_pair(earlier: &StepMetadata, later: &StepMetadata) -> Vec<ChangeEvent> {
    later
        .tracking()
        .iter()
        .filter_map(|id| {
            let new = later.data().get(id)?;
            classify(id, earlier.data().get(id), new)
        })
        .collect()
}

/// Changes on a scope's first step when no call site entered it: everything
/// it tracks is new.
pub fn diff_scope_start(first: &StepMetadata) -> Vec<ChangeEvent> {
    first
        .tracking()
        .iter()
        .filter_map(|id| classify(id, None, first.data().get(id)?))
        .collect()
}

/// Changes on the first step of a callee, relative to the call site.
///
/// A tracked parameter bound to tracked caller arguments is a continuation of
/// those arguments and yields one switch per argument rather than an
/// appearance.
pub fn diff_call_boundary(call_site: &StepMetadata, entry: &StepMetadata) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    for param in entry.tracking() {
        let Some(value) = entry.data().get(param) else {
            continue;
        };
        let tracked_args: Vec<&Identifier> = call_site
            .param_to_arg()
            .and_then(|binding| binding.get(param))
            .into_iter()
            .flatten()
            .filter(|arg| call_site.tracking().contains(*arg))
            .collect();

        if tracked_args.is_empty() {
            events.push(ChangeEvent::appearance(param.clone(), value.clone()));
        } else {
            for arg in tracked_args {
                events.push(ChangeEvent::switch(arg.clone(), param.clone(), value.clone()));
            }
        }
    }
    events
}

/// Changes made after a scope's last recorded step but before it returned.
pub fn diff_before_return(step: &StepMetadata) -> Vec<ChangeEvent> {
    let Some(before_return) = step.data_before_return() else {
        return Vec::new();
    };
    step.tracking()
        .iter()
        .filter_map(|id| {
            let new = before_return.get(id)?;
            classify(id, step.data().get(id), new)
        })
        .collect()
}

fn store(trace: &mut Trace, step: StepId, events: Vec<ChangeEvent>) -> Result<usize> {
    let count = events.len();
    let metadata = trace.get_mut(step)?.metadata_mut();
    for event in events {
        trace!(%step, id = %event.id(), "record change");
        metadata.record(event);
    }
    Ok(count)
}

/// Diffs two consecutive steps of one scope and stores the events on `later`.
pub fn record_pair(trace: &mut Trace, earlier: StepId, later: StepId) -> Result<usize> {
    let (e, l) = (trace.get(earlier)?, trace.get(later)?);
    if e.scope() != l.scope() {
        return Err(TraceError::Configuration(format!(
            "{} and {} belong to different scopes",
            earlier, later
        )));
    }
    let events = diff_pair(e.metadata(), l.metadata());
    store(trace, later, events)
}

/// Diffs a call site against the first step of its callee.
pub fn record_call_entry(trace: &mut Trace, call_site: StepId) -> Result<usize> {
    let site = trace.get(call_site)?;
    let Some(entry) = site.step_into() else {
        return Ok(0);
    };
    let events = diff_call_boundary(site.metadata(), trace.get(entry)?.metadata());
    store(trace, entry, events)
}

pub fn record_scope_start(trace: &mut Trace, first: StepId) -> Result<usize> {
    let events = diff_scope_start(trace.get(first)?.metadata());
    store(trace, first, events)
}

pub fn record_before_return(trace: &mut Trace, step: StepId) -> Result<usize> {
    let events = diff_before_return(trace.get(step)?.metadata());
    store(trace, step, events)
}
