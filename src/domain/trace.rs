//! Trace Arena
//!
//! Owns every step the tracer produced, in program order, together with the
//! descriptive information about each activation scope. Steps refer to each
//! other by [`StepId`], so the graph has a single owner and no reference
//! cycles.

use std::collections::{BTreeMap, HashSet};
use std::ops::Index;

use serde::Deserialize;
use tracing::{trace, warn};

use crate::domain::identifier::ScopeId;
use crate::domain::metadata::StepMetadata;
use crate::domain::step::{Relation, Step, StepId};
use crate::error::{Result, TraceError};

/// Where an activation's code lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScopeInfo {
    /// Qualified name of the callable, e.g. `app::compute`.
    pub qualified_name: String,
    /// Source file of the callable.
    pub file_path: String,
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Trace {
    steps: Vec<Step>,
    scopes: BTreeMap<ScopeId, ScopeInfo>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scope(&mut self, scope: ScopeId, info: ScopeInfo) {
        self.scopes.insert(scope, info);
    }

    pub fn scope_info(&self, scope: ScopeId) -> Option<&ScopeInfo> {
        self.scopes.get(&scope)
    }

    /// Appends a step; ids are handed out in program order.
    pub fn add_step(&mut self, scope: ScopeId, metadata: StepMetadata) -> StepId {
        let id = StepId(self.steps.len());
        self.steps.push(Step::new(id, scope, metadata));
        id
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.get(id.0)
    }

    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps.get_mut(id.0)
    }

    pub fn get(&self, id: StepId) -> Result<&Step> {
        self.step(id).ok_or(TraceError::UnknownStep(id))
    }

    pub fn get_mut(&mut self, id: StepId) -> Result<&mut Step> {
        self.step_mut(id).ok_or(TraceError::UnknownStep(id))
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sets several relations on `step` at once, by name.
    ///
    /// Every name and target is validated before anything is applied, so a
    /// failed call leaves the step untouched.
    pub fn set_relations<'a, I>(&mut self, step: StepId, relations: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, Option<StepId>)>,
    {
        self.get(step)?;
        let mut parsed = Vec::new();
        for (name, target) in relations {
            let relation: Relation = name.parse()?;
            if let Some(target) = target {
                self.check_relation(step, relation, target)?;
            }
            parsed.push((relation, target));
        }

        let node = self.get_mut(step)?;
        for (relation, target) in parsed {
            trace!(%step, %relation, ?target, "set relation");
            node.set_relation(relation, target);
        }
        Ok(())
    }

    pub fn set_relation(
        &mut self,
        step: StepId,
        relation: Relation,
        target: Option<StepId>,
    ) -> Result<()> {
        self.get(step)?;
        if let Some(target) = target {
            self.check_relation(step, relation, target)?;
        }
        self.get_mut(step)?.set_relation(relation, target);
        Ok(())
    }

    fn check_relation(&self, step: StepId, relation: Relation, target: StepId) -> Result<()> {
        let scope = self.get(step)?.scope();
        let target_scope = self.get(target)?.scope();
        if target == step {
            return Err(TraceError::Configuration(format!(
                "{} of {} points at itself",
                relation, step
            )));
        }
        let same_scope = target_scope == scope;
        match relation {
            Relation::Prev | Relation::Next if !same_scope => Err(TraceError::Configuration(format!(
                "{} must stay in scope {}, {} is in scope {}",
                relation, scope, target, target_scope
            ))),
            Relation::StepInto | Relation::ReturnedFrom if same_scope => {
                Err(TraceError::Configuration(format!(
                    "{} must cross into another scope, {} is in scope {}",
                    relation, target, scope
                )))
            }
            _ => Ok(()),
        }
    }

    /// Links two consecutive steps of one scope in both directions.
    pub fn link(&mut self, earlier: StepId, later: StepId) -> Result<()> {
        self.set_relation(earlier, Relation::Next, Some(later))?;
        self.set_relation(later, Relation::Prev, Some(earlier))
    }

    /// Makes `into` track everything `from` tracks that `into` has a value
    /// for. Returns how many ids were newly tracked.
    pub fn sync_tracking(&mut self, into: StepId, from: StepId) -> Result<usize> {
        self.get(into)?;
        self.get(from)?;
        if into == from {
            return Ok(0);
        }
        let split = into.0.max(from.0);
        let (low, high) = self.steps.split_at_mut(split);
        let (low, high) = (&mut low[into.0.min(from.0)], &mut high[0]);
        let (dst, src) = if into.0 < from.0 {
            (low, &*high)
        } else {
            (high, &*low)
        };
        Ok(dst.metadata_mut().sync_tracking_with(src.metadata()))
    }

    /// Fails when following `prev` or `next` from any step comes back around.
    pub fn check_acyclic(&self) -> Result<()> {
        for relation in [Relation::Prev, Relation::Next] {
            let mut done = vec![false; self.steps.len()];
            for first in 0..self.steps.len() {
                let mut path = HashSet::new();
                let mut current = Some(StepId(first));
                while let Some(id) = current {
                    if done[id.0] {
                        break;
                    }
                    if !path.insert(id) {
                        return Err(TraceError::Configuration(format!(
                            "{} links starting at {} form a cycle",
                            relation,
                            StepId(first)
                        )));
                    }
                    current = self.get(id)?.relation(relation);
                }
                for id in path {
                    done[id.0] = true;
                }
            }
        }
        Ok(())
    }

    /// Steps of one scope, following `next` from `first`.
    ///
    /// Stops early if the `next` chain loops back on itself.
    pub fn scope_steps(&self, first: StepId) -> ScopeSteps<'_> {
        ScopeSteps {
            trace: self,
            current: Some(first),
            seen: HashSet::new(),
        }
    }
}

impl Index<StepId> for Trace {
    type Output = Step;

    fn index(&self, id: StepId) -> &Step {
        &self.steps[id.0]
    }
}

pub struct ScopeSteps<'a> {
    trace: &'a Trace,
    current: Option<StepId>,
    seen: HashSet<StepId>,
}

impl<'a> Iterator for ScopeSteps<'a> {
    type Item = &'a Step;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current.take()?;
        if !self.seen.insert(id) {
            warn!(step = %id, "next chain loops, stopping");
            return None;
        }
        let step = self.trace.step(id)?;
        self.current = step.next();
        Some(step)
    }
}
