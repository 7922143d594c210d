// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core

//! Contested-network cyber simulation: an attacker walking a kill chain
//! across a routed network, a defender choosing from a declarative action
//! catalog, and a detector graph standing between ground truth and what the
//! defender observes.

pub mod types;
pub mod error;
pub mod adapter;

pub mod network;
pub mod red;
pub mod blue;
pub mod detectors;
pub mod reward;
pub mod observation;
pub mod simulation;

pub use error::{ConfigError, SimError};
pub use network::{Network, NetworkConfig, NetworkError};
pub use simulation::{Components, EnvConfig, Simulation, StepInfo, StepResult};
pub use types::{seeded_rng, SimRng};
