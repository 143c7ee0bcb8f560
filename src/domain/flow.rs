//! Execution Flow
//!
//! A finished trace plus the two steps that matter: where execution started
//! and where the user asked for an explanation. Building a flow resolves the
//! identifier named by the marker call on the target step; [`Flow::backtrace`]
//! then spreads tracking from that identifier through the graph and records
//! every change event.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::domain::ast::MarkerConfig;
use crate::domain::diff;
use crate::domain::identifier::Identifier;
use crate::domain::step::{Relation, Step, StepId};
use crate::domain::trace::Trace;
use crate::error::{MalformedTargetReason, Result, TraceError};

/// Event totals after a backtrace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BacktraceSummary {
    pub tracked_steps: usize,
    pub appearances: usize,
    pub modifications: usize,
    pub switches: usize,
}

#[derive(Debug, Clone)]
pub struct Flow {
    trace: Trace,
    start: StepId,
    target: StepId,
    target_id: Identifier,
    summary: Option<BacktraceSummary>,
}

impl Flow {
    pub fn new(
        mut trace: Trace,
        start: StepId,
        target: StepId,
        marker: &MarkerConfig,
    ) -> Result<Self> {
        trace.set_relation(start, Relation::Prev, None)?;
        trace.check_acyclic()?;

        let target_step = trace.get_mut(target)?;
        let malformed = |reason| TraceError::MalformedTarget {
            step: target,
            reason,
        };
        let parsed = target_step
            .metadata()
            .parsed_form()
            .ok_or_else(|| malformed(MalformedTargetReason::Unparsed))?;
        let name = parsed.marker_argument(marker).map_err(malformed)?;

        let target_id = Identifier::new(name, target_step.scope());
        if target_step.metadata_mut().add_tracking([target_id.clone()]) == 0 {
            warn!(id = %target_id, "target identifier has no value at the target step");
        }
        debug!(%start, %target, id = %target_id, "flow created");

        Ok(Self {
            trace,
            start,
            target,
            target_id,
            summary: None,
        })
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn start(&self) -> StepId {
        self.start
    }

    pub fn target(&self) -> StepId {
        self.target
    }

    pub fn target_id(&self) -> &Identifier {
        &self.target_id
    }

    // Both endpoints were checked in `Flow::new` and a trace never drops steps.
    pub fn start_step(&self) -> &Step {
        &self.trace[self.start]
    }

    pub fn target_step(&self) -> &Step {
        &self.trace[self.target]
    }

    pub fn is_target(&self, step: StepId) -> bool {
        step == self.target
    }

    /// Propagates tracking from the target and records every change event.
    ///
    /// Runs once; later calls return the first summary.
    pub fn backtrace(&mut self) -> Result<BacktraceSummary> {
        if let Some(summary) = self.summary {
            return Ok(summary);
        }
        self.propagate_tracking()?;
        self.record_changes()?;

        let mut summary = BacktraceSummary::default();
        for step in self.trace.steps() {
            let meta = step.metadata();
            if !meta.tracking().is_empty() {
                summary.tracked_steps += 1;
            }
            summary.appearances += meta.var_appearances().len();
            summary.modifications += meta.var_modifications().len();
            summary.switches += meta.var_switches().len();
        }
        debug!(?summary, "backtrace finished");
        self.summary = Some(summary);
        Ok(summary)
    }

    fn propagate_tracking(&mut self) -> Result<()> {
        let call_sites: HashMap<StepId, StepId> = self
            .trace
            .steps()
            .filter_map(|s| s.step_into().map(|entry| (entry, s.id())))
            .collect();
        let mut entered: HashSet<StepId> = HashSet::new();
        let mut walked: HashSet<StepId> = HashSet::new();
        let mut current = self.target;

        loop {
            if !walked.insert(current) {
                return Err(revisited(current));
            }
            let step = self.trace.get(current)?;
            match step.prev() {
                Some(prev) => {
                    self.trace.sync_tracking(prev, current)?;
                    if self.trace.get(prev)?.is_call_site() {
                        self.enter_callees(prev, &mut entered)?;
                    }
                    current = prev;
                }
                None => {
                    // First step of its scope: hand the tracked parameters back
                    // to the arguments at the call site, if there is one.
                    let Some(&site) = call_sites.get(&current) else {
                        break;
                    };
                    entered.insert(current);
                    let tracked = step.metadata().tracking().clone();
                    let args = self.args_for_params(site, &tracked)?;
                    self.trace.get_mut(site)?.metadata_mut().add_tracking(args);
                    current = site;
                }
            }
        }
        Ok(())
    }

    fn args_for_params(
        &self,
        site: StepId,
        params: &BTreeSet<Identifier>,
    ) -> Result<Vec<Identifier>> {
        let meta = self.trace.get(site)?.metadata();
        Ok(meta
            .param_to_arg()
            .into_iter()
            .flat_map(|binding| binding.iter())
            .filter(|(param, _)| params.contains(*param))
            .flat_map(|(_, args)| args.iter().cloned())
            .collect())
    }

    /// Follows tracked arguments forward into the callee of `site`, and into
    /// any calls made from there.
    fn enter_callees(&mut self, site: StepId, entered: &mut HashSet<StepId>) -> Result<()> {
        let mut pending = vec![site];
        while let Some(site) = pending.pop() {
            let call = self.trace.get(site)?;
            let Some(entry) = call.step_into() else {
                continue;
            };
            if !entered.insert(entry) {
                continue;
            }
            let meta = call.metadata();
            let params: Vec<Identifier> = meta
                .param_to_arg()
                .into_iter()
                .flat_map(|binding| binding.iter())
                .filter(|(_, args)| args.iter().any(|a| meta.tracking().contains(a)))
                .map(|(param, _)| param.clone())
                .collect();
            if params.is_empty() {
                continue;
            }
            self.trace.get_mut(entry)?.metadata_mut().add_tracking(params);

            let mut walked: HashSet<StepId> = HashSet::new();
            let mut current = entry;
            loop {
                if !walked.insert(current) {
                    return Err(revisited(current));
                }
                let step = self.trace.get(current)?;
                if step.is_call_site() {
                    pending.push(current);
                }
                let Some(next) = step.next() else {
                    break;
                };
                self.trace.sync_tracking(next, current)?;
                current = next;
            }
        }
        Ok(())
    }

    fn record_changes(&mut self) -> Result<()> {
        let entries: HashSet<StepId> = self.trace.steps().filter_map(Step::step_into).collect();
        let ids: Vec<StepId> = self.trace.steps().map(Step::id).collect();
        for id in ids {
            let step = self.trace.get(id)?;
            let prev = step.prev();
            let is_call_site = step.is_call_site();
            let returns = step.metadata().data_before_return().is_some();

            match prev {
                Some(prev) => {
                    diff::record_pair(&mut self.trace, prev, id)?;
                }
                None if !entries.contains(&id) => {
                    diff::record_scope_start(&mut self.trace, id)?;
                }
                None => {}
            }
            if is_call_site {
                diff::record_call_entry(&mut self.trace, id)?;
            }
            if returns {
                diff::record_before_return(&mut self.trace, id)?;
            }
        }
        Ok(())
    }
}

fn revisited(step: StepId) -> TraceError {
    TraceError::Configuration(format!("{} reached twice while propagating tracking", step))
}
