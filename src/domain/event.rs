// Change events produced by diffing consecutive snapshots.

use std::fmt;

use crate::domain::identifier::Identifier;
use crate::domain::value::Value;

/// Variable gains a value where none was known before.
#[derive(Debug, Clone)]
pub struct VarAppearance {
    pub id: Identifier,
    pub value: Value,
}

/// Tracked variable's value differs from its previous one.
#[derive(Debug, Clone)]
pub struct VarModification {
    pub id: Identifier,
    pub old_value: Value,
    pub new_value: Value,
}

/// Tracked caller argument continues as a callee parameter.
#[derive(Debug, Clone)]
pub struct VarSwitch {
    pub arg_id: Identifier,
    pub param_id: Identifier,
    pub value: Value,
}

/// One recorded change, owned by the step whose visible state it explains.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    Appearance(VarAppearance),
    Modification(VarModification),
    Switch(VarSwitch),
}

impl ChangeEvent {
    pub fn appearance(id: Identifier, value: Value) -> Self {
        ChangeEvent::Appearance(VarAppearance { id, value })
    }

    pub fn modification(id: Identifier, old_value: Value, new_value: Value) -> Self {
        ChangeEvent::Modification(VarModification {
            id,
            old_value,
            new_value,
        })
    }

    pub fn switch(arg_id: Identifier, param_id: Identifier, value: Value) -> Self {
        ChangeEvent::Switch(VarSwitch {
            arg_id,
            param_id,
            value,
        })
    }

    /// The identifier this event explains on its owning step.
    ///
    /// For a switch this is the callee parameter.
    pub fn id(&self) -> &Identifier {
        match self {
            ChangeEvent::Appearance(a) => &a.id,
            ChangeEvent::Modification(m) => &m.id,
            ChangeEvent::Switch(s) => &s.param_id,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeEvent::Appearance(a) => write!(f, "{} = {}", a.id.name(), a.value),
            ChangeEvent::Modification(m) => {
                write!(f, "{} {} \u{2192} {}", m.id.name(), m.old_value, m.new_value)
            }
            ChangeEvent::Switch(s) => {
                write!(f, "{} \u{2192} {}, {}", s.arg_id.name(), s.param_id.name(), s.value)
            }
        }
    }
}

impl PartialEq for ChangeEvent {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ChangeEvent::Appearance(a), ChangeEvent::Appearance(b)) => {
                a.id == b.id && a.value.deep_eq(&b.value)
            }
            (ChangeEvent::Modification(a), ChangeEvent::Modification(b)) => {
                a.id == b.id
                    && a.old_value.deep_eq(&b.old_value)
                    && a.new_value.deep_eq(&b.new_value)
            }
            (ChangeEvent::Switch(a), ChangeEvent::Switch(b)) => {
                a.arg_id == b.arg_id && a.param_id == b.param_id && a.value.deep_eq(&b.value)
            }
            _ => false,
        }
    }
}

impl From<VarAppearance> for ChangeEvent {
    fn from(a: VarAppearance) -> Self {
        ChangeEvent::Appearance(a)
    }
}

impl From<VarModification> for ChangeEvent {
    fn from(m: VarModification) -> Self {
        ChangeEvent::Modification(m)
    }
}

impl From<VarSwitch> for ChangeEvent {
    fn from(s: VarSwitch) -> Self {
        ChangeEvent::Switch(s)
    }
}
