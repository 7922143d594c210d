// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Attacker Agent

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

use super::knowledge::{AgentHistory, HybridSetList, KnownHostInfo};
use super::phase::{execute_phase, ActionMetadata, KillChainPhase, RedActionResults};
use super::strategy::{RedStrategy, StrategyView};
use super::technique::TechniqueCatalog;
use crate::network::{Host, Network, NetworkError};
use crate::reward::RewardMap;
use crate::types::{KnownHostType, SimRng};

type ValidityMap = BTreeMap<KillChainPhase, Vec<String>>;

/// Attacker that sweeps, scans and moves onto a target before walking it
/// down the kill chain.
#[derive(Debug)]
pub struct ArtAgent {
    pub name: String,
    kill_chain: Vec<KillChainPhase>,
    current_host: String,
    entry_host: String,
    history: AgentHistory,
    unimpacted_servers: HybridSetList<String>,
    unknowns: HybridSetList<String>,
    strategy: Box<dyn RedStrategy>,
    catalog: TechniqueCatalog,
    /// Valid techniques per host per phase.
    services_map: BTreeMap<String, ValidityMap>,
    tracked_hosts: BTreeSet<String>,
}

impl ArtAgent {
    /// # Errors
    /// [`NetworkError`] if `entry_host` is not a host of `network`.
    pub fn new(
        entry_host: &str,
        network: &Network,
        kill_chain: Option<Vec<KillChainPhase>>,
        strategy: Box<dyn RedStrategy>,
        catalog: TechniqueCatalog,
    ) -> Result<Self, NetworkError> {
        let entry = network.require_host(entry_host)?;
        let mut agent = Self {
            name: "ArtAgent".to_string(),
            kill_chain: kill_chain
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| KillChainPhase::DEFAULT_KILL_CHAIN.to_vec()),
            current_host: entry_host.to_string(),
            entry_host: entry_host.to_string(),
            history: AgentHistory::new(entry),
            unimpacted_servers: HybridSetList::new(),
            unknowns: HybridSetList::new(),
            strategy,
            catalog,
            services_map: BTreeMap::new(),
            tracked_hosts: BTreeSet::new(),
        };
        for host in network.hosts() {
            agent.track(host);
        }
        Ok(agent)
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn kill_chain(&self) -> &[KillChainPhase] {
        &self.kill_chain
    }

    pub fn current_host(&self) -> &str {
        &self.current_host
    }

    pub fn history(&self) -> &AgentHistory {
        &self.history
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn unimpacted_servers(&self) -> &HybridSetList<String> {
        &self.unimpacted_servers
    }

    pub fn unknowns(&self) -> &HybridSetList<String> {
        &self.unknowns
    }

    pub fn valid_techniques(&self, host: &str, phase: KillChainPhase) -> &[String] {
        self.services_map
            .get(host)
            .and_then(|m| m.get(&phase))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reward_map(&self) -> RewardMap {
        self.strategy.reward_map()
    }

    fn last_index(&self) -> i32 {
        i32::try_from(self.kill_chain.len()).unwrap_or(i32::MAX) - 1
    }

    fn all_phases(&self) -> Vec<KillChainPhase> {
        let mut phases = self.kill_chain.clone();
        if !phases.contains(&KillChainPhase::LateralMovement) {
            phases.push(KillChainPhase::LateralMovement);
        }
        phases
    }

    fn track(&mut self, host: &Host) {
        let map = self.catalog.validity_map(host, &self.all_phases());
        self.services_map.insert(host.name.clone(), map);
        self.tracked_hosts.insert(host.name.clone());
    }

    // ─── Turn ────────────────────────────────────────────────────────────────

    /// Reconcile tracked hosts with the network: hosts that appeared get a
    /// validity map (and join the unknowns if their subnet was swept), hosts
    /// that vanished stop being targets.
    pub fn handle_topology_change(&mut self, network: &Network) {
        let current: BTreeSet<String> = network.host_names().into_iter().collect();

        for name in current.difference(&self.tracked_hosts).cloned().collect::<Vec<_>>() {
            let Some(host) = network.host(&name) else { continue };
            self.track(host);
            if self.history.is_subnet_scanned(&host.subnet) && !self.history.hosts.contains_key(&name) {
                self.history.hosts.insert(name.clone(), KnownHostInfo::default());
                self.unknowns.add(name.clone());
            }
            debug!(host = %name, "attacker tracking new host");
        }

        let gone: Vec<String> = self.tracked_hosts.difference(&current).cloned().collect();
        for name in &gone {
            self.tracked_hosts.remove(name);
            self.services_map.remove(name);
            self.unknowns.remove(name);
            self.unimpacted_servers.remove(name);
        }
        if !gone.is_empty() && !network.contains(&self.current_host) {
            warn!(lost = %self.current_host, fallback = %self.entry_host, "attacker foothold removed");
            self.current_host = self.entry_host.clone();
        }
    }

    pub fn select_next_target(&self, network: &Network, rng: &mut SimRng) -> Option<String> {
        let view = StrategyView {
            current_host: &self.current_host,
            history: &self.history,
            kill_chain_len: self.kill_chain.len(),
            unimpacted_servers: &self.unimpacted_servers,
            unknowns: &self.unknowns,
            network,
        };
        self.strategy.select_target(&view, rng)
    }

    /// Perform whatever `target` needs next: sweep, scan, move, or the next
    /// kill-chain phase.
    ///
    /// # Errors
    /// [`NetworkError`] if the target or the current host is missing.
    pub fn run_action(
        &mut self,
        network: &mut Network,
        target: &str,
        rng: &mut SimRng,
    ) -> Result<RedActionResults, NetworkError> {
        let info = self.history.hosts.entry(target.to_string()).or_default().clone();
        let phase = if !info.ping_sweeped {
            KillChainPhase::PingSweep
        } else if !info.ports_scanned {
            KillChainPhase::PortScan
        } else if self.current_host != target {
            KillChainPhase::LateralMovement
        } else {
            let step = usize::try_from(info.next_step().min(self.last_index())).unwrap_or(0);
            self.kill_chain[step.min(self.kill_chain.len() - 1)]
        };

        let valid = self.valid_techniques(target, phase).to_vec();
        let mut results = execute_phase(phase, network, &self.catalog, &self.current_host, target, &valid, rng)?;
        results.cost = self
            .strategy
            .reward_map()
            .get(phase.name())
            .and_then(|p| p.immediate.to_i64())
            .unwrap_or(0);

        if results.attack_success {
            match phase {
                KillChainPhase::PingSweep => self.record_sweep(&results.discovered_hosts),
                KillChainPhase::PortScan => {
                    if let Some(h) = self.history.hosts.get_mut(target) {
                        h.ports_scanned = true;
                    }
                }
                KillChainPhase::LateralMovement => self.current_host = target.to_string(),
                _ => {}
            }
        }
        Ok(results)
    }

    fn record_sweep(&mut self, hosts: &[String]) {
        for name in hosts {
            match self.history.hosts.get_mut(name) {
                Some(info) => info.ping_sweeped = true,
                None => {
                    self.history.hosts.insert(name.clone(), KnownHostInfo::sweeped());
                    self.unknowns.add(name.clone());
                }
            }
        }
    }

    /// One attacker turn. Returns the phase executed, or `None` when the
    /// strategy found nothing to attack.
    ///
    /// # Errors
    /// [`NetworkError`] when the network no longer holds a host the agent
    /// relies on.
    pub fn act(&mut self, network: &mut Network, rng: &mut SimRng) -> Result<Option<KillChainPhase>, NetworkError> {
        self.handle_topology_change(network);

        let Some(target) = self.select_next_target(network, rng) else {
            warn!(agent = %self.name, host = %self.current_host, "no target left, idling");
            self.history.update_step(RedActionResults::idle(&self.current_host));
            return Ok(None);
        };

        let results = self.run_action(network, &target, rng)?;
        let phase = results.phase;
        if results.attack_success {
            if let Some(p) = phase.filter(|p| !p.is_prerequisite()) {
                let last = self.last_index();
                if let Some(info) = self.history.hosts.get_mut(&target) {
                    info.advance(last);
                }
                if p == KillChainPhase::Impact {
                    if let Some(info) = self.history.hosts.get_mut(&target) {
                        info.impacted = true;
                    }
                    self.unimpacted_servers.remove(&target);
                }
            }
            for meta in &results.metadata {
                self.add_host_info(meta);
            }
        }

        debug!(
            phase = ?phase.map(|p| p.name()),
            src = %results.src_host,
            target = %target,
            success = results.attack_success,
            "attacker turn"
        );
        self.history.update_step(results);
        Ok(phase)
    }

    /// Fold a revealed fact into the agent's knowledge.
    pub fn add_host_info(&mut self, metadata: &ActionMetadata) {
        match metadata {
            ActionMetadata::HostType { host, type_name } => {
                let known = KnownHostType::classify(type_name);
                match known {
                    KnownHostType::Server => {
                        let impacted = self.history.host(host).is_some_and(|h| h.impacted);
                        if !impacted {
                            self.unimpacted_servers.add(host.clone());
                        }
                        self.unknowns.remove(host);
                    }
                    KnownHostType::User => self.unknowns.remove(host),
                    KnownHostType::Unknown => {}
                }
                self.history.hosts.entry(host.clone()).or_default().host_type = known;
            }
            ActionMetadata::SubnetScanned {
                subnet,
                connected_hosts,
                available_ips,
            } => {
                let info = self.history.subnets.entry(subnet.clone()).or_default();
                info.scanned = true;
                info.connected_hosts = connected_hosts.clone();
                info.available_ips = *available_ips;
                for name in connected_hosts {
                    if !self.history.hosts.contains_key(name) {
                        self.history.hosts.insert(name.clone(), KnownHostInfo::default());
                        self.unknowns.add(name.clone());
                    }
                }
            }
            ActionMetadata::IpAddress { host, ip } => match self.history.hosts.get_mut(host) {
                Some(info) => {
                    info.ip_address.get_or_insert(*ip);
                }
                None => {
                    self.history.hosts.insert(host.clone(), KnownHostInfo::with_ip(Some(*ip)));
                    self.unknowns.add(host.clone());
                }
            },
            ActionMetadata::Services {
                host,
                services,
                vulnerabilities,
            } => {
                let info = self.history.hosts.entry(host.clone()).or_default();
                info.services = services.clone();
                info.vulnerabilities = vulnerabilities.iter().cloned().collect();
            }
        }
    }

    /// Start a new episode from `entry_host`.
    ///
    /// # Errors
    /// [`NetworkError`] if `entry_host` is not a host of `network`.
    pub fn reset(&mut self, entry_host: &str, network: &Network) -> Result<(), NetworkError> {
        let entry = network.require_host(entry_host)?;
        self.history = AgentHistory::new(entry);
        self.current_host = entry_host.to_string();
        self.entry_host = entry_host.to_string();
        self.unimpacted_servers = HybridSetList::new();
        self.unknowns = HybridSetList::new();
        self.services_map.clear();
        self.tracked_hosts.clear();
        for host in network.hosts() {
            self.track(host);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::tests::three_subnet_network;
    use crate::network::HostType;
    use crate::red::strategy::{DfsImpact, ServerDowntime};
    use crate::types::seeded_rng;

    fn agent(network: &Network, strategy: Box<dyn RedStrategy>) -> ArtAgent {
        let catalog = TechniqueCatalog::builtin().expect("test: catalog");
        ArtAgent::new("h0", network, None, strategy, catalog).expect("test: agent")
    }

    #[test]
    fn dfs_walks_entry_host_to_impact() {
        let mut net = three_subnet_network();
        let mut rng = seeded_rng(21);
        let mut red = agent(&net, Box::new(DfsImpact));

        let expected = [
            KillChainPhase::PingSweep,
            KillChainPhase::PortScan,
            KillChainPhase::Discovery,
            KillChainPhase::PrivilegeEscalation,
            KillChainPhase::Impact,
        ];
        for want in expected {
            let got = red.act(&mut net, &mut rng).expect("test: act");
            assert_eq!(got, Some(want));
            assert!(red.history().recent().is_some_and(|r| r.attack_success), "{want} failed");
        }
        let h0 = red.history().host("h0").expect("test: h0 known");
        assert!(h0.impacted);
        assert_eq!(h0.last_step, 2);
        assert_eq!(net.is_compromised("h0"), Some(true));
    }

    #[test]
    fn last_step_never_decreases_or_overflows() {
        let mut net = three_subnet_network();
        let mut rng = seeded_rng(5);
        let mut red = agent(&net, Box::new(DfsImpact));
        let mut previous: BTreeMap<String, i32> = BTreeMap::new();
        for _ in 0..40 {
            red.act(&mut net, &mut rng).expect("test: act");
            for (name, info) in &red.history().hosts {
                let before = previous.get(name).copied().unwrap_or(-1);
                assert!(info.last_step >= before, "{name} went backwards");
                assert!(info.last_step <= 2);
                previous.insert(name.clone(), info.last_step);
            }
        }
    }

    #[test]
    fn discovery_classifies_hosts() {
        let mut net = three_subnet_network();
        let mut rng = seeded_rng(8);
        let mut red = agent(&net, Box::new(ServerDowntime));
        for _ in 0..3 {
            red.act(&mut net, &mut rng).expect("test: act");
        }
        // sweep, scan, discovery on h0
        assert_eq!(red.history().host("h0").map(|h| h.host_type), Some(KnownHostType::User));
        assert!(red.unknowns().contains(&"h1".to_string()));
        assert!(red.history().is_subnet_scanned("user_subnet"));
    }

    #[test]
    fn isolated_attacker_cannot_move() {
        let mut net = three_subnet_network();
        let mut rng = seeded_rng(13);
        let mut red = agent(&net, Box::new(ServerDowntime));
        // sweep h0's subnet, then scan h1 from h0
        red.run_action(&mut net, "h0", &mut rng).expect("test: sweep");
        red.run_action(&mut net, "h1", &mut rng).expect("test: scan");

        net.isolate("h0").expect("test: isolate");
        let r = red.run_action(&mut net, "h1", &mut rng).expect("test: move");
        assert_eq!(r.phase, Some(KillChainPhase::LateralMovement));
        assert!(!r.attack_success);
        assert_eq!(red.current_host(), "h0");
    }

    #[test]
    fn new_decoy_joins_unknowns_after_sweep() {
        let mut net = three_subnet_network();
        let mut rng = seeded_rng(3);
        let mut red = agent(&net, Box::new(ServerDowntime));
        red.act(&mut net, &mut rng).expect("test: sweep");

        net.create_decoy("bait", "user_subnet", HostType::new("decoy_server", "windows"), &mut rng)
            .expect("test: decoy");
        red.handle_topology_change(&net);
        assert!(red.unknowns().contains(&"bait".to_string()));

        net.remove_decoy("bait").expect("test: remove");
        red.handle_topology_change(&net);
        assert!(!red.unknowns().contains(&"bait".to_string()));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut net = three_subnet_network();
        let mut rng = seeded_rng(4);
        let mut red = agent(&net, Box::new(DfsImpact));
        for _ in 0..4 {
            red.act(&mut net, &mut rng).expect("test: act");
        }
        red.reset("h1", &net).expect("test: reset");
        assert_eq!(red.current_host(), "h1");
        assert!(red.history().records.is_empty());
        assert_eq!(red.history().hosts.len(), 1);
        assert!(red.unknowns().is_empty());
    }
}
