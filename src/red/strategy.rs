// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Target Selection Strategies

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::knowledge::{AgentHistory, HybridSetList};
use super::phase::KillChainPhase;
use crate::error::ConfigError;
use crate::network::Network;
use crate::reward::{RewardMap, RewardPair};
use crate::types::{KnownHostType, SimRng};

/// Read-only view of the attacker a strategy chooses from.
#[derive(Debug, Clone, Copy)]
pub struct StrategyView<'a> {
    pub current_host: &'a str,
    pub history: &'a AgentHistory,
    pub kill_chain_len: usize,
    pub unimpacted_servers: &'a HybridSetList<String>,
    pub unknowns: &'a HybridSetList<String>,
    pub network: &'a Network,
}

impl StrategyView<'_> {
    fn last_index(&self) -> i32 {
        i32::try_from(self.kill_chain_len).unwrap_or(i32::MAX) - 1
    }
}

pub trait RedStrategy: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Next host to act on, or `None` when nothing is left to attack.
    fn select_target(&self, view: &StrategyView<'_>, rng: &mut SimRng) -> Option<String>;

    /// (immediate, recurring) reward per attacker action name.
    fn reward_map(&self) -> RewardMap {
        default_reward_map()
    }
}

pub fn default_reward_map() -> RewardMap {
    [
        (KillChainPhase::PingSweep, dec!(-1), dec!(0)),
        (KillChainPhase::PortScan, dec!(-1), dec!(0)),
        (KillChainPhase::Discovery, dec!(-2), dec!(0)),
        (KillChainPhase::LateralMovement, dec!(-4), dec!(0)),
        (KillChainPhase::PrivilegeEscalation, dec!(-6), dec!(0)),
        (KillChainPhase::Impact, dec!(-8), dec!(-4)),
    ]
    .into_iter()
    .map(|(phase, immediate, recurring)| (phase.name().to_string(), RewardPair::new(immediate, recurring)))
    .collect()
}

// ─── ServerDowntime ──────────────────────────────────────────────────────────

/// Hunt servers: stay while the current host is unknown or an un-impacted
/// server, then jump to a known server, then to any unknown host.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerDowntime;

impl RedStrategy for ServerDowntime {
    fn name(&self) -> &'static str {
        "server_downtime"
    }

    fn select_target(&self, view: &StrategyView<'_>, rng: &mut SimRng) -> Option<String> {
        let current = view.current_host.to_string();
        let current_type = view
            .history
            .host(view.current_host)
            .map_or(KnownHostType::Unknown, |h| h.host_type);

        if current_type == KnownHostType::Unknown || view.unimpacted_servers.contains(&current) {
            return Some(current);
        }
        if let Some(server) = view.unimpacted_servers.choose(rng) {
            return Some(server.clone());
        }
        view.unknowns.choose(rng).cloned()
    }
}

// ─── DfsImpact ───────────────────────────────────────────────────────────────

/// Finish the current host, then move to a random host that is not finished.
#[derive(Debug, Clone, Copy, Default)]
pub struct DfsImpact;

impl RedStrategy for DfsImpact {
    fn name(&self) -> &'static str {
        "dfs_impact"
    }

    fn select_target(&self, view: &StrategyView<'_>, rng: &mut SimRng) -> Option<String> {
        let last = view.last_index();
        let finished = view
            .history
            .host(view.current_host)
            .is_some_and(|h| h.last_step == last);
        if !finished {
            return Some(view.current_host.to_string());
        }

        let open: Vec<&String> = view
            .history
            .hosts
            .iter()
            .filter(|(name, info)| info.last_step < last && view.network.contains(name))
            .map(|(name, _)| name)
            .collect();
        Some(
            open.choose(rng)
                .map_or_else(|| view.current_host.to_string(), |name| (*name).clone()),
        )
    }
}

// ─── Selection by name ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    ServerDowntime,
    DfsImpact,
}

impl StrategyKind {
    pub fn build(&self) -> Box<dyn RedStrategy> {
        match self {
            StrategyKind::ServerDowntime => Box::new(ServerDowntime),
            StrategyKind::DfsImpact => Box::new(DfsImpact),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "server_downtime" | "serverdowntime" => Ok(StrategyKind::ServerDowntime),
            "dfs_impact" | "dfsimpact" => Ok(StrategyKind::DfsImpact),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::tests::three_subnet_network;
    use crate::red::knowledge::KnownHostInfo;
    use crate::types::seeded_rng;

    struct Fixture {
        network: Network,
        history: AgentHistory,
        servers: HybridSetList<String>,
        unknowns: HybridSetList<String>,
    }

    impl Fixture {
        fn new() -> Self {
            let network = three_subnet_network();
            let history = AgentHistory::new(network.host("h0").expect("test: h0"));
            Self {
                network,
                history,
                servers: HybridSetList::new(),
                unknowns: HybridSetList::new(),
            }
        }

        fn view<'a>(&'a self, current: &'a str) -> StrategyView<'a> {
            StrategyView {
                current_host: current,
                history: &self.history,
                kill_chain_len: 3,
                unimpacted_servers: &self.servers,
                unknowns: &self.unknowns,
                network: &self.network,
            }
        }
    }

    #[test]
    fn server_downtime_stays_on_unknown_host() {
        let fx = Fixture::new();
        let mut rng = seeded_rng(1);
        assert_eq!(ServerDowntime.select_target(&fx.view("h0"), &mut rng).as_deref(), Some("h0"));
    }

    #[test]
    fn server_downtime_prefers_servers_then_unknowns() {
        let mut fx = Fixture::new();
        let mut rng = seeded_rng(1);
        if let Some(h0) = fx.history.hosts.get_mut("h0") {
            h0.host_type = KnownHostType::User;
        }
        assert_eq!(ServerDowntime.select_target(&fx.view("h0"), &mut rng), None);

        fx.unknowns.add("h1".to_string());
        assert_eq!(ServerDowntime.select_target(&fx.view("h0"), &mut rng).as_deref(), Some("h1"));

        fx.servers.add("s0".to_string());
        assert_eq!(ServerDowntime.select_target(&fx.view("h0"), &mut rng).as_deref(), Some("s0"));
    }

    #[test]
    fn dfs_impact_moves_only_when_finished() {
        let mut fx = Fixture::new();
        let mut rng = seeded_rng(2);
        fx.history.hosts.insert("h1".to_string(), KnownHostInfo::default());
        assert_eq!(DfsImpact.select_target(&fx.view("h0"), &mut rng).as_deref(), Some("h0"));

        if let Some(h0) = fx.history.hosts.get_mut("h0") {
            h0.last_step = 2;
        }
        assert_eq!(DfsImpact.select_target(&fx.view("h0"), &mut rng).as_deref(), Some("h1"));
    }

    #[test]
    fn default_map_matches_phase_names() {
        let map = default_reward_map();
        assert_eq!(map.len(), 6);
        let impact = map.get("impact").expect("test: impact");
        assert_eq!(impact.immediate, dec!(-8));
        assert_eq!(impact.recurring, dec!(-4));
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!("dfs_impact".parse::<StrategyKind>().expect("test: dfs"), StrategyKind::DfsImpact);
        assert_eq!("ServerDowntime".parse::<StrategyKind>().expect("test: sd"), StrategyKind::ServerDowntime);
        assert!(matches!("random".parse::<StrategyKind>(), Err(ConfigError::UnknownStrategy(_))));
    }
}
