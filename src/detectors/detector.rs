// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Detectors

//! Alert transformers that sit on the nodes of the detector graph.
//!
//! A detector sees only alerts and the environment RNG. Host state it needs
//! (decoy, isolation) is already captured in each [`HostRef`].

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::alert::{Alert, HostRef};
use crate::error::ConfigError;
use crate::types::SimRng;

pub trait Detector: fmt::Debug {
    fn name(&self) -> &'static str;

    fn obs(&self, alerts: &[Alert], rng: &mut SimRng) -> Vec<Alert>;
}

/// Copy of `alert` narrowed to a single destination.
fn narrowed(alert: &Alert, dst: &HostRef) -> Alert {
    Alert {
        src_host: alert.src_host.clone(),
        dst_hosts: vec![dst.clone()],
        services: alert.services.clone(),
        techniques: alert.techniques.clone(),
    }
}

// ─── Reference detectors ─────────────────────────────────────────────────────

/// Passes everything through.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerfectDetector;

impl Detector for PerfectDetector {
    fn name(&self) -> &'static str {
        "PerfectDetector"
    }

    fn obs(&self, alerts: &[Alert], _rng: &mut SimRng) -> Vec<Alert> {
        alerts.to_vec()
    }
}

/// All or nothing, on a fair coin.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinFlipDetector;

impl Detector for CoinFlipDetector {
    fn name(&self) -> &'static str {
        "CoinFlipDetector"
    }

    fn obs(&self, alerts: &[Alert], rng: &mut SimRng) -> Vec<Alert> {
        if rng.gen_bool(0.5) {
            alerts.to_vec()
        } else {
            Vec::new()
        }
    }
}

/// One alert per decoy destination; everything else is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoyDetector;

impl Detector for DecoyDetector {
    fn name(&self) -> &'static str {
        "DecoyDetector"
    }

    fn obs(&self, alerts: &[Alert], _rng: &mut SimRng) -> Vec<Alert> {
        alerts
            .iter()
            .flat_map(|a| a.dst_hosts.iter().filter(|d| d.decoy).map(move |d| narrowed(a, d)))
            .collect()
    }
}

/// Only traffic from or to isolated hosts. An alert whose source is isolated
/// is kept whole; otherwise one alert per isolated destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsolateDetector;

impl Detector for IsolateDetector {
    fn name(&self) -> &'static str {
        "IsolateDetector"
    }

    fn obs(&self, alerts: &[Alert], _rng: &mut SimRng) -> Vec<Alert> {
        let mut out = Vec::new();
        for alert in alerts {
            if alert.src_host.as_ref().is_some_and(|s| s.isolated) {
                out.push(alert.clone());
                continue;
            }
            for dst in alert.dst_hosts.iter().filter(|d| d.isolated) {
                out.push(Alert::new(alert.src_host.clone(), vec![dst.clone()]));
            }
        }
        out
    }
}

/// Per-technique detection odds. Each destination is detected if any of the
/// alert's techniques with a configured probability passes its roll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityDetector {
    probabilities: BTreeMap<String, f64>,
}

impl ProbabilityDetector {
    /// # Errors
    /// [`ConfigError::InvalidProbability`] for a value outside [0, 1].
    pub fn new(probabilities: BTreeMap<String, f64>) -> Result<Self, ConfigError> {
        if let Some((technique, p)) = probabilities.iter().find(|(_, p)| !(0.0..=1.0).contains(*p)) {
            return Err(ConfigError::InvalidProbability {
                technique: technique.clone(),
                probability: *p,
            });
        }
        Ok(Self { probabilities })
    }

    pub fn probability(&self, technique: &str) -> Option<f64> {
        self.probabilities.get(technique).copied()
    }

    fn detects(&self, alert: &Alert, rng: &mut SimRng) -> bool {
        alert
            .techniques
            .iter()
            .filter_map(|t| self.probabilities.get(t))
            .any(|p| rng.gen::<f64>() <= *p)
    }
}

impl Detector for ProbabilityDetector {
    fn name(&self) -> &'static str {
        "ProbabilityDetector"
    }

    fn obs(&self, alerts: &[Alert], rng: &mut SimRng) -> Vec<Alert> {
        let mut out = Vec::new();
        if self.probabilities.is_empty() {
            return out;
        }
        for alert in alerts {
            for dst in &alert.dst_hosts {
                if self.detects(alert, rng) {
                    out.push(narrowed(alert, dst));
                }
            }
        }
        out
    }
}

// ─── Construction by class name ──────────────────────────────────────────────

/// `init_info` entry of one graph node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorInit {
    pub class: String,
    #[serde(default)]
    pub config: Option<serde_yaml::Value>,
}

impl DetectorInit {
    /// # Errors
    /// [`ConfigError::UnknownDetectorClass`], or a malformed probability table.
    pub fn build(&self) -> Result<Box<dyn Detector>, ConfigError> {
        let detector: Box<dyn Detector> = match self.class.as_str() {
            "PerfectDetector" => Box::new(PerfectDetector),
            "CoinFlipDetector" => Box::new(CoinFlipDetector),
            "DecoyDetector" => Box::new(DecoyDetector),
            "IsolateDetector" => Box::new(IsolateDetector),
            "ProbabilityDetector" => {
                let probabilities = match &self.config {
                    Some(value) => serde_yaml::from_value(value.clone())?,
                    None => BTreeMap::new(),
                };
                Box::new(ProbabilityDetector::new(probabilities)?)
            }
            other => return Err(ConfigError::UnknownDetectorClass(other.to_string())),
        };
        Ok(detector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::seeded_rng;

    fn host(name: &str, decoy: bool, isolated: bool) -> HostRef {
        HostRef {
            name: name.to_string(),
            decoy,
            isolated,
        }
    }

    fn alert(src: &str, dsts: Vec<HostRef>, technique: &str) -> Alert {
        let mut a = Alert::new(Some(HostRef::new(src)), dsts);
        a.add_technique(technique);
        a
    }

    #[test]
    fn perfect_is_identity() {
        let alerts = vec![alert("h0", vec![HostRef::new("s0")], "T1046")];
        assert_eq!(PerfectDetector.obs(&alerts, &mut seeded_rng(1)), alerts);
    }

    #[test]
    fn decoy_detector_keeps_only_decoy_destinations() {
        let alerts = vec![
            alert("h0", vec![HostRef::new("s0"), host("bait", true, false)], "T1046"),
            alert("h0", vec![HostRef::new("s1")], "T1046"),
        ];
        let out = DecoyDetector.obs(&alerts, &mut seeded_rng(1));
        assert_eq!(out.len(), 1);
        assert!(out.iter().all(|a| a.dst_hosts.iter().all(|d| d.decoy)));
    }

    #[test]
    fn isolate_detector_keeps_isolated_sources_whole() {
        let mut isolated_src = alert("h0", vec![HostRef::new("s0"), HostRef::new("s1")], "T1210");
        isolated_src.src_host = Some(host("h0", false, true));
        let to_isolated = alert("h1", vec![HostRef::new("s0"), host("s1", false, true)], "T1210");
        let quiet = alert("h1", vec![HostRef::new("s0")], "T1210");

        let out = IsolateDetector.obs(&[isolated_src.clone(), to_isolated, quiet], &mut seeded_rng(1));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], isolated_src);
        assert_eq!(out[1].dst_hosts, vec![host("s1", false, true)]);
    }

    #[test]
    fn probability_extremes_are_deterministic() {
        let alerts = vec![alert("h0", vec![HostRef::new("s0"), HostRef::new("s1")], "T1046")];
        let mut rng = seeded_rng(9);

        let always = ProbabilityDetector::new(BTreeMap::from([("T1046".to_string(), 1.0)])).expect("test: p");
        assert_eq!(always.obs(&alerts, &mut rng).len(), 2);

        let never = ProbabilityDetector::new(BTreeMap::from([("T1018".to_string(), 1.0)])).expect("test: p");
        assert!(never.obs(&alerts, &mut rng).is_empty());

        assert!(ProbabilityDetector::default().obs(&alerts, &mut rng).is_empty());
    }

    #[test]
    fn probabilities_are_range_checked() {
        let err = ProbabilityDetector::new(BTreeMap::from([("T1046".to_string(), 1.5)]));
        assert!(matches!(err, Err(ConfigError::InvalidProbability { .. })), "got {err:?}");
    }

    #[test]
    fn coin_flip_is_all_or_nothing() {
        let alerts = vec![alert("h0", vec![HostRef::new("s0")], "T1046"); 3];
        let mut rng = seeded_rng(4);
        for _ in 0..20 {
            let n = CoinFlipDetector.obs(&alerts, &mut rng).len();
            assert!(n == 0 || n == 3);
        }
    }

    #[test]
    fn build_by_class_name() {
        let init: DetectorInit =
            serde_yaml::from_str("class: ProbabilityDetector\nconfig:\n  T1046: 0.25\n").expect("test: yaml");
        assert_eq!(init.build().expect("test: build").name(), "ProbabilityDetector");

        let bad = DetectorInit {
            class: "OracleDetector".into(),
            config: None,
        };
        assert!(matches!(bad.build(), Err(ConfigError::UnknownDetectorClass(_))));
    }
}
