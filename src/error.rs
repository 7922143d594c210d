// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Errors

//! Crate-level error taxonomy.
//!
//! Component errors convert into [`SimError`]. Every variant is either
//! structural (a missing node, a malformed detector graph) or a validation
//! failure (bad port, bad privilege, action index out of range). Policy-level
//! failures never show up here; they travel as unsuccessful result objects.

use crate::blue::{ActionError, ActionSpaceError};
use crate::detectors::DetectorGraphError;
use crate::network::NetworkError;

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors raised while turning declarative configuration into live objects.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("action names must be unique: '{0}' is declared twice")]
    DuplicateAction(String),

    #[error("unknown action class '{0}'")]
    UnknownActionClass(String),

    #[error("action '{action}' depends on undeclared shared data '{name}'")]
    UnknownSharedData { action: String, name: String },

    #[error("unknown shared data kind '{0}'")]
    UnknownSharedDataKind(String),

    #[error("unknown detector class '{0}'")]
    UnknownDetectorClass(String),

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("unknown technique '{0}'")]
    UnknownTechnique(String),

    #[error("detection probability for '{technique}' must be within [0, 1], got {probability}")]
    InvalidProbability { technique: String, probability: f64 },

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("network has no workstation to use as the attacker entry host")]
    NoEntryHost,
}

// ---------------------------------------------------------------------------
// SimError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    ActionSpace(#[from] ActionSpaceError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    DetectorGraph(#[from] DetectorGraphError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SimError {
    /// Missing nodes or edges, malformed graphs, broken configuration.
    pub fn is_structural(&self) -> bool {
        match self {
            SimError::Network(e) => e.is_structural(),
            SimError::ActionSpace(_) => false,
            SimError::Action(e) => e.is_structural(),
            SimError::DetectorGraph(_) => true,
            SimError::Config(_) => true,
        }
    }

    /// Bad ports, protocols, privileges or action indices.
    pub fn is_validation(&self) -> bool {
        !self.is_structural()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_component() {
        let e: SimError = NetworkError::UnknownNode("h9".into()).into();
        assert!(e.is_structural());

        let e: SimError = NetworkError::InvalidPort("0".into()).into();
        assert!(e.is_validation());

        let e: SimError = ActionSpaceError::IndexOutOfRange { index: 12, size: 4 }.into();
        assert!(e.is_validation());

        let e: SimError = DetectorGraphError::MissingNode("end").into();
        assert!(e.is_structural());
    }

    #[test]
    fn messages_name_the_offender() {
        let e = ConfigError::DuplicateAction("deploy_decoy".into());
        assert!(e.to_string().contains("deploy_decoy"));
    }
}
