// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Defender Action Contract

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::network::{Network, NetworkError};
use crate::types::SimRng;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("action '{action}' expects a {expected} target, got {got}")]
    WrongTarget {
        action: String,
        expected: TargetKind,
        got: TargetKind,
    },

    #[error("shared data '{name}' is not a {expected}")]
    WrongSharedData { name: String, expected: &'static str },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl ActionError {
    pub fn is_structural(&self) -> bool {
        match self {
            ActionError::Network(e) => e.is_structural(),
            ActionError::WrongTarget { .. } | ActionError::WrongSharedData { .. } => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// How an action affects the standing reward tied to its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Recurring {
    Stop,
    #[default]
    Keep,
    Start,
}

impl TryFrom<i8> for Recurring {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Recurring::Stop),
            0 => Ok(Recurring::Keep),
            1 => Ok(Recurring::Start),
            other => Err(format!("recurring must be -1, 0 or 1, got {other}")),
        }
    }
}

impl From<Recurring> for i8 {
    fn from(r: Recurring) -> Self {
        match r {
            Recurring::Stop => -1,
            Recurring::Keep => 0,
            Recurring::Start => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlueActionReturn {
    /// Non-empty only when the action starts or stops a standing effect.
    pub id: String,
    pub success: bool,
    pub recurring: Recurring,
}

impl BlueActionReturn {
    pub fn new(id: impl Into<String>, success: bool, recurring: Recurring) -> Self {
        Self {
            id: id.into(),
            success,
            recurring,
        }
    }

    pub fn succeeded() -> Self {
        Self::new("", true, Recurring::Keep)
    }

    pub fn failed() -> Self {
        Self::new("", false, Recurring::Keep)
    }
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Standalone,
    Host,
    Subnet,
    Range,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TargetKind::Standalone => "standalone",
            TargetKind::Host => "host",
            TargetKind::Subnet => "subnet",
            TargetKind::Range => "range",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTarget {
    None,
    Host(String),
    Subnet(String),
    Index(usize),
}

impl ActionTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            ActionTarget::None => TargetKind::Standalone,
            ActionTarget::Host(_) => TargetKind::Host,
            ActionTarget::Subnet(_) => TargetKind::Subnet,
            ActionTarget::Index(_) => TargetKind::Range,
        }
    }

    /// Host or subnet name, if the target has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            ActionTarget::Host(n) | ActionTarget::Subnet(n) => Some(n),
            ActionTarget::None | ActionTarget::Index(_) => None,
        }
    }
}

/// What an action may touch while it runs.
pub struct ActionContext<'a> {
    pub network: &'a mut Network,
    pub rng: &'a mut SimRng,
}

/// Random 32-digit hex id for decoys and no-op results.
pub fn generate_id(rng: &mut impl Rng) -> String {
    format!("{:032x}", rng.gen::<u128>())
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

pub trait BlueAction: fmt::Debug {
    /// Registry class this instance was built from.
    fn class(&self) -> &'static str;

    fn target_kind(&self) -> TargetKind;

    /// Run the action. Policy-level failures (already isolated, empty decoy
    /// slot) come back as `success: false`, not as errors.
    ///
    /// # Errors
    /// [`ActionError`] for a mismatched target or a network fault.
    fn execute(&mut self, ctx: &mut ActionContext<'_>, target: &ActionTarget) -> Result<BlueActionReturn, ActionError>;
}

pub(crate) fn expect_host<'t>(action: &dyn BlueAction, target: &'t ActionTarget) -> Result<&'t str, ActionError> {
    match target {
        ActionTarget::Host(name) => Ok(name),
        other => Err(wrong_target(action, other)),
    }
}

pub(crate) fn expect_subnet<'t>(action: &dyn BlueAction, target: &'t ActionTarget) -> Result<&'t str, ActionError> {
    match target {
        ActionTarget::Subnet(name) => Ok(name),
        other => Err(wrong_target(action, other)),
    }
}

pub(crate) fn expect_index(action: &dyn BlueAction, target: &ActionTarget) -> Result<usize, ActionError> {
    match target {
        ActionTarget::Index(i) => Ok(*i),
        other => Err(wrong_target(action, other)),
    }
}

fn wrong_target(action: &dyn BlueAction, got: &ActionTarget) -> ActionError {
    ActionError::WrongTarget {
        action: action.class().to_string(),
        expected: action.target_kind(),
        got: got.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::seeded_rng;

    #[test]
    fn recurring_accepts_only_unit_steps() {
        assert_eq!(Recurring::try_from(-1), Ok(Recurring::Stop));
        assert_eq!(Recurring::try_from(1), Ok(Recurring::Start));
        assert!(Recurring::try_from(2).is_err());
        assert_eq!(i8::from(Recurring::Keep), 0);
    }

    #[test]
    fn ids_are_hex_and_seeded() {
        let a = generate_id(&mut seeded_rng(1));
        let b = generate_id(&mut seeded_rng(1));
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn target_kinds() {
        assert_eq!(ActionTarget::Index(3).kind(), TargetKind::Range);
        assert_eq!(ActionTarget::Subnet("dmz".into()).name(), Some("dmz"));
        assert_eq!(ActionTarget::None.name(), None);
    }
}
