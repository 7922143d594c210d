// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Detector Graph

//! The detector DAG: a single `start` source, a single `end` sink and
//! detector nodes in between. Each node keeps a buffer of the alerts that
//! reached it this step.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::alert::Alert;
use super::detector::{Detector, DetectorInit};
use crate::error::ConfigError;
use crate::types::SimRng;

pub const START: &str = "start";
pub const END: &str = "end";

#[derive(Debug, thiserror::Error)]
pub enum DetectorGraphError {
    #[error("detector graph has no '{0}' node")]
    MissingNode(&'static str),

    #[error("node '{0}' is not defined in init_info")]
    UndefinedNode(String),

    #[error("'start' must have an in-degree of 0")]
    StartHasParents,

    #[error("'end' must have an out-degree of 0")]
    EndHasChildren,

    #[error("node '{0}' must have an in-degree > 0")]
    Unreachable(String),

    #[error("node '{0}' must have an out-degree > 0")]
    DeadEnd(String),

    #[error("detector graph contains a cycle through '{0}'")]
    Cycle(String),

    #[error("adjacency list entry {0} is empty")]
    EmptyEntry(usize),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorGraphConfig {
    /// Each entry is a node followed by its children.
    pub adjacency_list: Vec<Vec<String>>,
    #[serde(default)]
    pub init_info: BTreeMap<String, DetectorInit>,
}

const PERFECT: &str = include_str!("../resources/detectors/perfect.yaml");
const DECOY: &str = include_str!("../resources/detectors/decoy.yaml");
const ISOLATE: &str = include_str!("../resources/detectors/isolate.yaml");
const PROBABILITY: &str = include_str!("../resources/detectors/probability.yaml");
const COIN_FLIP: &str = include_str!("../resources/detectors/coin_flip.yaml");

impl DetectorGraphConfig {
    /// # Errors
    /// [`ConfigError::Yaml`] on malformed input.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// One of the shipped graphs: `perfect`, `decoy`, `isolate`,
    /// `probability` or `coin_flip`.
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] for any other name.
    pub fn builtin(name: &str) -> Result<Self, ConfigError> {
        let yaml = match name {
            "perfect" => PERFECT,
            "decoy" => DECOY,
            "isolate" => ISOLATE,
            "probability" => PROBABILITY,
            "coin_flip" => COIN_FLIP,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "detector".to_string(),
                    reason: format!("no built-in detector graph named '{other}'"),
                })
            }
        };
        Self::from_yaml_str(yaml)
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Node {
    name: String,
    detector: Option<Box<dyn Detector>>,
    children: Vec<usize>,
    buffer: Vec<Alert>,
}

#[derive(Debug)]
pub struct DetectorHandler {
    nodes: Vec<Node>,
    /// Node indices in topological order.
    order: Vec<usize>,
    end: usize,
}

impl DetectorHandler {
    /// Build and validate the graph. Any violation aborts construction.
    ///
    /// # Errors
    /// See [`DetectorGraphError`].
    pub fn from_config(config: &DetectorGraphConfig) -> Result<Self, DetectorGraphError> {
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        let mut nodes: Vec<Node> = Vec::new();
        let mut intern = |name: &str, nodes: &mut Vec<Node>| -> usize {
            *index.entry(name.to_string()).or_insert_with(|| {
                nodes.push(Node {
                    name: name.to_string(),
                    detector: None,
                    children: Vec::new(),
                    buffer: Vec::new(),
                });
                nodes.len() - 1
            })
        };

        for (i, entry) in config.adjacency_list.iter().enumerate() {
            let Some((parent, children)) = entry.split_first() else {
                return Err(DetectorGraphError::EmptyEntry(i));
            };
            let p = intern(parent, &mut nodes);
            for child in children {
                let c = intern(child, &mut nodes);
                if !nodes[p].children.contains(&c) {
                    nodes[p].children.push(c);
                }
            }
        }

        for node in &mut nodes {
            if node.name == START || node.name == END {
                continue;
            }
            let init = config
                .init_info
                .get(&node.name)
                .ok_or_else(|| DetectorGraphError::UndefinedNode(node.name.clone()))?;
            node.detector = Some(init.build()?);
        }

        let position = |name: &'static str| {
            nodes
                .iter()
                .position(|n| n.name == name)
                .ok_or(DetectorGraphError::MissingNode(name))
        };
        let start = position(START)?;
        let end = position(END)?;

        let mut in_degree = vec![0usize; nodes.len()];
        for node in &nodes {
            for &c in &node.children {
                in_degree[c] += 1;
            }
        }
        for (i, node) in nodes.iter().enumerate() {
            match (i == start, in_degree[i]) {
                (true, d) if d > 0 => return Err(DetectorGraphError::StartHasParents),
                (false, 0) => return Err(DetectorGraphError::Unreachable(node.name.clone())),
                _ => {}
            }
            match (i == end, node.children.len()) {
                (true, d) if d > 0 => return Err(DetectorGraphError::EndHasChildren),
                (false, 0) => return Err(DetectorGraphError::DeadEnd(node.name.clone())),
                _ => {}
            }
        }

        let order = topological_order(&nodes, &in_degree)?;
        debug!(nodes = nodes.len(), "detector graph built");
        Ok(Self { nodes, order, end })
    }

    /// # Errors
    /// As [`DetectorHandler::from_config`], plus YAML errors.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DetectorGraphError> {
        Self::from_config(&DetectorGraphConfig::from_yaml_str(yaml)?)
    }

    /// Push this step's ground-truth alerts through the graph and return
    /// what reaches `end`.
    pub fn obs(&mut self, perfect_alerts: &[Alert], rng: &mut SimRng) -> Vec<Alert> {
        for &i in &self.order {
            let children = self.nodes[i].children.clone();
            for c in children {
                let output = match &self.nodes[i].detector {
                    None => perfect_alerts.to_vec(),
                    Some(detector) => detector.obs(&self.nodes[i].buffer, rng),
                };
                let buffer = &mut self.nodes[c].buffer;
                for alert in output {
                    if !buffer.contains(&alert) {
                        buffer.push(alert);
                    }
                }
            }
        }
        self.nodes[self.end].buffer.clone()
    }

    /// Empty every node buffer.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.buffer.clear();
        }
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|&i| self.nodes[i].name.as_str())
    }
}

/// Kahn's algorithm, seeded in declaration order.
fn topological_order(nodes: &[Node], in_degree: &[usize]) -> Result<Vec<usize>, DetectorGraphError> {
    let mut remaining = in_degree.to_vec();
    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| remaining[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &c in &nodes[i].children {
            remaining[c] -= 1;
            if remaining[c] == 0 {
                queue.push_back(c);
            }
        }
    }
    if order.len() < nodes.len() {
        let stuck = (0..nodes.len()).find(|&i| remaining[i] > 0).unwrap_or(0);
        return Err(DetectorGraphError::Cycle(nodes[stuck].name.clone()));
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::alert::HostRef;
    use crate::types::seeded_rng;

    fn alerts() -> Vec<Alert> {
        let mut decoy = HostRef::new("bait");
        decoy.decoy = true;
        let mut a = Alert::new(Some(HostRef::new("h0")), vec![HostRef::new("s0")]);
        a.add_technique("T1046");
        let mut b = Alert::new(Some(HostRef::new("h1")), vec![decoy]);
        b.add_technique("T1021.004");
        vec![a, b]
    }

    #[test]
    fn perfect_graph_is_identity() {
        let mut handler =
            DetectorHandler::from_config(&DetectorGraphConfig::builtin("perfect").expect("test: cfg")).expect("test: graph");
        let input = alerts();
        assert_eq!(handler.obs(&input, &mut seeded_rng(1)), input);
    }

    #[test]
    fn decoy_graph_only_reports_decoys() {
        let mut handler =
            DetectorHandler::from_config(&DetectorGraphConfig::builtin("decoy").expect("test: cfg")).expect("test: graph");
        let out = handler.obs(&alerts(), &mut seeded_rng(1));
        assert_eq!(out.len(), 1);
        assert!(out.iter().all(|a| a.touches_decoy()));
    }

    #[test]
    fn buffers_are_deduplicated_and_reset() {
        let yaml = r#"
adjacency_list:
  - [start, a, b]
  - [a, end]
  - [b, end]
init_info:
  a: { class: PerfectDetector }
  b: { class: PerfectDetector }
"#;
        let mut handler = DetectorHandler::from_yaml_str(yaml).expect("test: graph");
        let input = alerts();
        assert_eq!(handler.obs(&input, &mut seeded_rng(1)).len(), input.len());
        handler.reset();
        assert_eq!(handler.obs(&input[..1], &mut seeded_rng(1)).len(), 1);
        assert_eq!(handler.node_names().next(), Some("start"));
    }

    #[test]
    fn every_builtin_graph_validates() {
        for name in ["perfect", "decoy", "isolate", "probability", "coin_flip"] {
            let config = DetectorGraphConfig::builtin(name).expect("test: cfg");
            assert!(DetectorHandler::from_config(&config).is_ok(), "{name} failed to build");
        }
    }

    #[test]
    fn malformed_graphs_fail_construction() {
        let cycle = "adjacency_list:\n  - [start, a]\n  - [a, b]\n  - [b, a, end]\ninit_info:\n  a: {class: PerfectDetector}\n  b: {class: PerfectDetector}\n";
        let err = DetectorHandler::from_yaml_str(cycle);
        assert!(matches!(err, Err(DetectorGraphError::Cycle(_))), "got {err:?}");

        let no_end = "adjacency_list:\n  - [start, a]\ninit_info:\n  a: {class: PerfectDetector}\n";
        let err = DetectorHandler::from_yaml_str(no_end);
        assert!(matches!(err, Err(DetectorGraphError::MissingNode("end"))), "got {err:?}");

        let undefined = "adjacency_list:\n  - [start, a]\n  - [a, end]\n";
        let err = DetectorHandler::from_yaml_str(undefined);
        assert!(matches!(err, Err(DetectorGraphError::UndefinedNode(_))), "got {err:?}");

        let dead_end = "adjacency_list:\n  - [start, a, b]\n  - [a, end]\ninit_info:\n  a: {class: PerfectDetector}\n  b: {class: PerfectDetector}\n";
        let err = DetectorHandler::from_yaml_str(dead_end);
        assert!(matches!(err, Err(DetectorGraphError::DeadEnd(ref n)) if n == "b"), "got {err:?}");

        let unknown = "adjacency_list:\n  - [start, a]\n  - [a, end]\ninit_info:\n  a: {class: Psychic}\n";
        let err = DetectorHandler::from_yaml_str(unknown);
        assert!(
            matches!(err, Err(DetectorGraphError::Config(ConfigError::UnknownDetectorClass(_)))),
            "got {err:?}"
        );

        let bad_p = "adjacency_list:\n  - [start, a]\n  - [a, end]\ninit_info:\n  a: {class: ProbabilityDetector, config: {T1046: -0.1}}\n";
        let err = DetectorHandler::from_yaml_str(bad_p);
        assert!(
            matches!(err, Err(DetectorGraphError::Config(ConfigError::InvalidProbability { .. }))),
            "got {err:?}"
        );
    }
}
