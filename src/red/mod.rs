// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Kill-Chain Engine

pub mod agent;
pub mod knowledge;
pub mod phase;
pub mod strategy;
pub mod technique;

pub use agent::ArtAgent;
pub use knowledge::{AgentHistory, HistoryRecord, HybridSetList, KnownHostInfo, KnownSubnetInfo};
pub use phase::{execute_phase, ActionMetadata, KillChainPhase, RedActionResults, TechniqueUse, MALWARE_PROCESS};
pub use strategy::{default_reward_map, DfsImpact, RedStrategy, ServerDowntime, StrategyKind, StrategyView};
pub use technique::{AtomicTest, Technique, TechniqueCatalog, PING_SWEEP_TECHNIQUE, PORT_SCAN_TECHNIQUE};
