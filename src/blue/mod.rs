// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Action System

//! Defender actions, the catalog that wires them up, and the flat discrete
//! action space a trainer samples from.

pub mod action;
pub mod action_space;
pub mod actions;
pub mod agent;
pub mod registry;
pub mod shared;

pub use action::{ActionContext, ActionError, ActionTarget, BlueAction, BlueActionReturn, Recurring, TargetKind};
pub use action_space::{ActionSpaceArgs, ActionSpaceError, DiscreteActionSpace, Selection};
pub use actions::DecoyConfig;
pub use agent::{ActionEntry, BlueAgentConfig, BlueAgentResult, DynamicBlueAgent};
pub use shared::{IsolateData, SharedContainer, SharedData, SharedDataDecl};
