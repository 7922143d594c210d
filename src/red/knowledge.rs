// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Attacker Knowledge

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::phase::{KillChainPhase, RedActionResults, TechniqueUse};
use crate::network::{Host, Service};
use crate::types::KnownHostType;

// ─── KnownHostInfo ───────────────────────────────────────────────────────────

/// What the attacker believes about one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownHostInfo {
    /// Index of the last kill-chain step completed here; -1 before any.
    pub last_step: i32,
    pub ports_scanned: bool,
    pub ping_sweeped: bool,
    pub ip_address: Option<IpAddr>,
    pub host_type: KnownHostType,
    pub services: Vec<Service>,
    pub vulnerabilities: BTreeSet<String>,
    pub impacted: bool,
}

impl Default for KnownHostInfo {
    fn default() -> Self {
        Self {
            last_step: -1,
            ports_scanned: false,
            ping_sweeped: false,
            ip_address: None,
            host_type: KnownHostType::Unknown,
            services: Vec::new(),
            vulnerabilities: BTreeSet::new(),
            impacted: false,
        }
    }
}

impl KnownHostInfo {
    pub fn with_ip(ip: Option<IpAddr>) -> Self {
        Self {
            ip_address: ip,
            ..Self::default()
        }
    }

    pub fn sweeped() -> Self {
        Self {
            ping_sweeped: true,
            ..Self::default()
        }
    }

    pub fn next_step(&self) -> i32 {
        self.last_step + 1
    }

    /// Record one more completed step, never past `max_step`.
    pub fn advance(&mut self, max_step: i32) {
        self.last_step = (self.last_step + 1).min(max_step);
    }
}

// ─── KnownSubnetInfo ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnownSubnetInfo {
    pub scanned: bool,
    pub connected_hosts: Vec<String>,
    pub available_ips: u128,
}

// ─── AgentHistory ────────────────────────────────────────────────────────────

/// One attacker turn as it appears in the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub step: usize,
    pub action: Option<KillChainPhase>,
    pub src_host: String,
    pub target_host: Option<String>,
    pub technique: Option<TechniqueUse>,
    pub success: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentHistory {
    pub records: Vec<HistoryRecord>,
    pub results: Vec<RedActionResults>,
    pub hosts: BTreeMap<String, KnownHostInfo>,
    pub subnets: BTreeMap<String, KnownSubnetInfo>,
}

impl AgentHistory {
    /// Seeded with the entry host and its (unscanned) subnet.
    pub fn new(entry_host: &Host) -> Self {
        let mut history = Self::default();
        history
            .hosts
            .insert(entry_host.name.clone(), KnownHostInfo::with_ip(entry_host.ip_address));
        history
            .subnets
            .insert(entry_host.subnet.clone(), KnownSubnetInfo::default());
        history
    }

    pub fn update_step(&mut self, results: RedActionResults) {
        self.records.push(HistoryRecord {
            step: self.records.len(),
            action: results.phase,
            src_host: results.src_host.clone(),
            target_host: results.target_host.clone(),
            technique: results.technique.clone(),
            success: results.attack_success,
        });
        self.results.push(results);
    }

    pub fn recent(&self) -> Option<&RedActionResults> {
        self.results.last()
    }

    pub fn recent_record(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    pub fn host(&self, name: &str) -> Option<&KnownHostInfo> {
        self.hosts.get(name)
    }

    pub fn is_subnet_scanned(&self, subnet: &str) -> bool {
        self.subnets.get(subnet).is_some_and(|s| s.scanned)
    }
}

// ─── HybridSetList ───────────────────────────────────────────────────────────

/// Constant-time membership with uniform random choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridSetList<T: Ord + Clone> {
    set: BTreeSet<T>,
    list: Vec<T>,
}

impl<T: Ord + Clone> Default for HybridSetList<T> {
    fn default() -> Self {
        Self {
            set: BTreeSet::new(),
            list: Vec::new(),
        }
    }
}

impl<T: Ord + Clone> HybridSetList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: T) {
        if self.set.insert(value.clone()) {
            self.list.push(value);
        }
    }

    pub fn remove(&mut self, value: &T) {
        if self.set.remove(value) {
            if let Some(pos) = self.list.iter().position(|v| v == value) {
                self.list.swap_remove(pos);
            }
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.set.contains(value)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn choose(&self, rng: &mut impl Rng) -> Option<&T> {
        self.list.choose(rng)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.list.retain(|v| keep(v));
        self.set = self.list.iter().cloned().collect();
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.list.iter()
    }
}
