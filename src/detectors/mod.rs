// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Detector Pipeline

pub mod alert;
pub mod detector;
pub mod handler;

pub use alert::{Alert, HostRef};
pub use detector::{
    CoinFlipDetector, DecoyDetector, Detector, DetectorInit, IsolateDetector, PerfectDetector, ProbabilityDetector,
};
pub use handler::{DetectorGraphConfig, DetectorGraphError, DetectorHandler};
