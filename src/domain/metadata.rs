//! Step Metadata
//!
//! Everything recorded about one executed step: its source line, the values it
//! observed, which identifiers are being followed through it, and the change
//! events explaining its visible state.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::domain::ast::ParsedSource;
use crate::domain::event::{ChangeEvent, VarAppearance, VarModification, VarSwitch};
use crate::domain::identifier::Identifier;
use crate::domain::snapshot::Snapshot;
use crate::error::{Result, TraceError};
use crate::ports::SourceParser;

/// Callee parameter -> caller arguments bound to it.
pub type ParamBinding = BTreeMap<Identifier, BTreeSet<Identifier>>;

#[derive(Debug, Clone)]
pub struct StepMetadata {
    source_text: String,
    parsed_form: Option<ParsedSource>,
    data: Snapshot,
    data_before_return: Option<Snapshot>,
    param_to_arg: Option<ParamBinding>,
    arg_to_param: BTreeMap<Identifier, Identifier>,
    tracking: BTreeSet<Identifier>,
    var_appearances: Vec<VarAppearance>,
    var_modifications: Vec<VarModification>,
    var_switches: Vec<VarSwitch>,
}

/// Assembles a [`StepMetadata`]; at least one of source text or parsed form
/// must be given.
#[derive(Debug, Default)]
pub struct StepMetadataBuilder {
    data: Snapshot,
    source_text: Option<String>,
    parsed_form: Option<ParsedSource>,
    param_to_arg: Option<ParamBinding>,
    data_before_return: Option<Snapshot>,
}

impl StepMetadataBuilder {
    pub fn source_text(mut self, text: impl Into<String>) -> Self {
        self.source_text = Some(text.into());
        self
    }

    pub fn parsed_form(mut self, parsed: ParsedSource) -> Self {
        self.parsed_form = Some(parsed);
        self
    }

    pub fn param_to_arg(mut self, binding: ParamBinding) -> Self {
        self.param_to_arg = Some(binding);
        self
    }

    pub fn data_before_return(mut self, snapshot: Snapshot) -> Self {
        self.data_before_return = Some(snapshot);
        self
    }

    pub fn build(self, parser: &dyn SourceParser) -> Result<StepMetadata> {
        let (source_text, parsed_form) = match (self.source_text, self.parsed_form) {
            (None, None) => {
                return Err(TraceError::Configuration(
                    "should provide source text or parsed form".to_string(),
                ))
            }
            (Some(text), Some(parsed)) => (text, Some(parsed)),
            (None, Some(parsed)) => (parsed.to_source_text(), Some(parsed)),
            (Some(text), None) => {
                let parsed = parser.parse(&text);
                if parsed.is_none() {
                    trace!(source = %text, "source line has no parsed form");
                }
                (text, parsed)
            }
        };

        let mut arg_to_param = BTreeMap::new();
        if let Some(binding) = &self.param_to_arg {
            for (param, args) in binding {
                for arg in args {
                    if let Some(previous) = arg_to_param.insert(arg.clone(), param.clone()) {
                        return Err(TraceError::Configuration(format!(
                            "argument {} is bound to both {} and {}",
                            arg, previous, param
                        )));
                    }
                }
            }
        }

        Ok(StepMetadata {
            source_text,
            parsed_form,
            data: self.data,
            data_before_return: self.data_before_return,
            param_to_arg: self.param_to_arg,
            arg_to_param,
            tracking: BTreeSet::new(),
            var_appearances: Vec::new(),
            var_modifications: Vec::new(),
            var_switches: Vec::new(),
        })
    }
}

impl StepMetadata {
    pub fn builder(data: Snapshot) -> StepMetadataBuilder {
        StepMetadataBuilder {
            data,
            ..Default::default()
        }
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn parsed_form(&self) -> Option<&ParsedSource> {
        self.parsed_form.as_ref()
    }

    pub fn data(&self) -> &Snapshot {
        &self.data
    }

    pub fn data_before_return(&self) -> Option<&Snapshot> {
        self.data_before_return.as_ref()
    }

    pub fn param_to_arg(&self) -> Option<&ParamBinding> {
        self.param_to_arg.as_ref()
    }

    /// The parameter an argument is bound to, if this step makes a call.
    pub fn param_for(&self, arg: &Identifier) -> Option<&Identifier> {
        self.arg_to_param.get(arg)
    }

    /// Union of every argument bound to any parameter.
    pub fn get_args(&self) -> BTreeSet<Identifier> {
        self.arg_to_param.keys().cloned().collect()
    }

    pub fn tracking(&self) -> &BTreeSet<Identifier> {
        &self.tracking
    }

    /// Starts tracking each id present in `data`; others are dropped because a
    /// step cannot follow a value it never observed. Returns how many ids were
    /// newly tracked.
    pub fn add_tracking<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = Identifier>,
    {
        let mut added = 0;
        for id in ids {
            if !self.data.contains(&id) {
                trace!(%id, "not in snapshot, not tracked");
                continue;
            }
            if self.tracking.insert(id) {
                added += 1;
            }
        }
        added
    }

    pub fn sync_tracking_with(&mut self, other: &StepMetadata) -> usize {
        self.add_tracking(other.tracking.iter().cloned())
    }

    /// Appends an event to the sequence matching its kind.
    pub fn record(&mut self, event: ChangeEvent) {
        debug_assert!(self.tracking.contains(event.id()));
        match event {
            ChangeEvent::Appearance(a) => self.var_appearances.push(a),
            ChangeEvent::Modification(m) => self.var_modifications.push(m),
            ChangeEvent::Switch(s) => self.var_switches.push(s),
        }
    }

    pub fn var_appearances(&self) -> &[VarAppearance] {
        &self.var_appearances
    }

    pub fn var_modifications(&self) -> &[VarModification] {
        &self.var_modifications
    }

    pub fn var_switches(&self) -> &[VarSwitch] {
        &self.var_switches
    }

    /// Appearances, then modifications, then switches.
    pub fn changes(&self) -> impl Iterator<Item = ChangeEvent> + '_ {
        self.var_appearances
            .iter()
            .cloned()
            .map(ChangeEvent::from)
            .chain(self.var_modifications.iter().cloned().map(ChangeEvent::from))
            .chain(self.var_switches.iter().cloned().map(ChangeEvent::from))
    }
}
