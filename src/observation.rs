// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Observation Vector

//! Defender observation: `2 × hosts` flags. The first half marks hosts that
//! raised an alert this step; the second half remembers every host that ever
//! did during the episode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::adapter::flags_to_f32;
use crate::detectors::Alert;
use crate::network::Network;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryObservation {
    mapping: BTreeMap<String, usize>,
    flags: Vec<bool>,
}

impl HistoryObservation {
    /// Fix the host → slot mapping from the network's non-decoy hosts. Later
    /// decoys never shift it.
    pub fn new(network: &Network) -> Self {
        let mapping: BTreeMap<String, usize> = network
            .nondecoy_hosts()
            .enumerate()
            .map(|(i, h)| (h.name.clone(), i))
            .collect();
        let flags = vec![false; 2 * mapping.len()];
        Self { mapping, flags }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn index_of(&self, host: &str) -> Option<usize> {
        self.mapping.get(host).copied()
    }

    /// Flag the source host of every alert. Sources outside the mapping
    /// (decoys, unknown names) are ignored.
    pub fn create_obs_vector(&mut self, alerts: &[Alert]) -> Vec<f32> {
        let barrier = self.mapping.len();
        self.flags[..barrier].fill(false);
        for alert in alerts {
            let Some(i) = alert.src_host.as_ref().and_then(|h| self.mapping.get(&h.name)).copied() else {
                continue;
            };
            self.flags[i] = true;
            self.flags[i + barrier] = true;
        }
        flags_to_f32(&self.flags)
    }

    pub fn reset_obs_vector(&mut self) -> Vec<f32> {
        self.flags.fill(false);
        flags_to_f32(&self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::HostRef;
    use crate::network::tests::three_subnet_network;

    fn alert_from(src: &str) -> Alert {
        Alert::new(Some(HostRef::new(src)), vec![HostRef::new("s0")])
    }

    #[test]
    fn history_half_is_sticky() {
        let net = three_subnet_network();
        let mut obs = HistoryObservation::new(&net);
        assert_eq!(obs.len(), 12);
        let h0 = obs.index_of("h0").expect("test: h0");

        let v = obs.create_obs_vector(&[alert_from("h0")]);
        assert_eq!(v[h0], 1.0);
        assert_eq!(v[h0 + 6], 1.0);

        let v = obs.create_obs_vector(&[]);
        assert_eq!(v[h0], 0.0);
        assert_eq!(v[h0 + 6], 1.0);

        let v = obs.reset_obs_vector();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn unmapped_sources_are_ignored() {
        let net = three_subnet_network();
        let mut obs = HistoryObservation::new(&net);
        let v = obs.create_obs_vector(&[alert_from("bait"), Alert::default()]);
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
