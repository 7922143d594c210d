// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Kill-Chain Phases

//! Execution of one attacker action against the network.
//!
//! Sweep and scan always succeed. Every other phase succeeds when the target
//! has at least one valid technique for it; lateral movement additionally
//! needs a path from the attacker's host to the target.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::technique::{TechniqueCatalog, PING_SWEEP_TECHNIQUE, PORT_SCAN_TECHNIQUE};
use crate::detectors::{Alert, HostRef};
use crate::error::ConfigError;
use crate::network::{Command, Network, NetworkError, Process, Service};
use crate::types::{Privilege, SimRng};

/// Process planted by a successful privilege escalation.
pub const MALWARE_PROCESS: &str = "malware.exe";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KillChainPhase {
    #[serde(rename = "pingsweep")]
    PingSweep,
    #[serde(rename = "portscan")]
    PortScan,
    Discovery,
    LateralMovement,
    PrivilegeEscalation,
    Impact,
}

impl KillChainPhase {
    pub const DEFAULT_KILL_CHAIN: [KillChainPhase; 3] = [
        KillChainPhase::Discovery,
        KillChainPhase::PrivilegeEscalation,
        KillChainPhase::Impact,
    ];

    /// Action name as used in reward maps and catalogs.
    pub fn name(&self) -> &'static str {
        match self {
            KillChainPhase::PingSweep => "pingsweep",
            KillChainPhase::PortScan => "portscan",
            KillChainPhase::Discovery => "discovery",
            KillChainPhase::LateralMovement => "lateral-movement",
            KillChainPhase::PrivilegeEscalation => "privilege-escalation",
            KillChainPhase::Impact => "impact",
        }
    }

    /// Phases that gate entry into the kill chain and never advance it.
    pub fn is_prerequisite(&self) -> bool {
        matches!(
            self,
            KillChainPhase::PingSweep | KillChainPhase::PortScan | KillChainPhase::LateralMovement
        )
    }

    fn privilege(&self) -> Privilege {
        match self {
            KillChainPhase::PingSweep | KillChainPhase::PortScan => Privilege::User,
            _ => Privilege::Root,
        }
    }
}

impl fmt::Display for KillChainPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KillChainPhase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pingsweep" => Ok(KillChainPhase::PingSweep),
            "portscan" => Ok(KillChainPhase::PortScan),
            "discovery" => Ok(KillChainPhase::Discovery),
            "lateral-movement" => Ok(KillChainPhase::LateralMovement),
            "privilege-escalation" => Ok(KillChainPhase::PrivilegeEscalation),
            "impact" => Ok(KillChainPhase::Impact),
            other => Err(ConfigError::InvalidValue {
                key: "kill_chain".to_string(),
                reason: format!("unknown phase '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// The technique an action used and the commands it ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueUse {
    pub mitre_id: String,
    pub name: String,
    pub commands: Vec<String>,
}

/// Facts an action revealed to the attacker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionMetadata {
    HostType {
        host: String,
        type_name: String,
    },
    SubnetScanned {
        subnet: String,
        connected_hosts: Vec<String>,
        available_ips: u128,
    },
    IpAddress {
        host: String,
        ip: IpAddr,
    },
    Services {
        host: String,
        services: Vec<Service>,
        vulnerabilities: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedActionResults {
    /// `None` for an idle turn.
    pub phase: Option<KillChainPhase>,
    pub src_host: String,
    pub target_host: Option<String>,
    pub discovered_hosts: Vec<String>,
    pub alert: Alert,
    pub attack_success: bool,
    pub metadata: Vec<ActionMetadata>,
    pub technique: Option<TechniqueUse>,
    pub cost: i64,
}

impl RedActionResults {
    pub fn new(phase: KillChainPhase, src_host: &str, target_host: &str) -> Self {
        Self {
            phase: Some(phase),
            src_host: src_host.to_string(),
            target_host: Some(target_host.to_string()),
            discovered_hosts: Vec::new(),
            alert: Alert::default(),
            attack_success: false,
            metadata: Vec::new(),
            technique: None,
            cost: 0,
        }
    }

    /// An unsuccessful turn in which the attacker had nothing to target.
    pub fn idle(src_host: &str) -> Self {
        Self {
            phase: None,
            src_host: src_host.to_string(),
            target_host: None,
            discovered_hosts: Vec::new(),
            alert: Alert::default(),
            attack_success: false,
            metadata: Vec::new(),
            technique: None,
            cost: 0,
        }
    }

    pub fn action_name(&self) -> Option<&'static str> {
        self.phase.map(|p| p.name())
    }

    pub fn target_is_decoy(&self) -> bool {
        self.alert.touches_decoy()
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run `phase` from `src` against `target`. `valid_techniques` is ignored for
/// sweep and scan, which always use their fixed technique.
///
/// # Errors
/// [`NetworkError`] if either host is missing from the network.
pub fn execute_phase(
    phase: KillChainPhase,
    network: &mut Network,
    catalog: &TechniqueCatalog,
    src: &str,
    target: &str,
    valid_techniques: &[String],
    rng: &mut SimRng,
) -> Result<RedActionResults, NetworkError> {
    let mut results = RedActionResults::new(phase, src, target);
    let src_ref = HostRef::from(network.require_host(src)?);
    let target_ref = HostRef::from(network.require_host(target)?);
    results.alert.src_host = Some(src_ref);
    results.alert.add_dst_host(target_ref);

    let mitre_id = match phase {
        KillChainPhase::PingSweep => Some(PING_SWEEP_TECHNIQUE.to_string()),
        KillChainPhase::PortScan => Some(PORT_SCAN_TECHNIQUE.to_string()),
        KillChainPhase::LateralMovement if network.find_path(src, target).is_none() => None,
        _ => valid_techniques.choose(rng).cloned(),
    };
    let Some(mitre_id) = mitre_id else {
        debug!(phase = %phase, src, target, "no usable technique");
        return Ok(results);
    };

    results.attack_success = true;
    results.alert.add_technique(&mitre_id);
    results.technique = Some(run_technique(network, catalog, &mitre_id, target, phase.privilege(), rng)?);

    apply_side_effects(phase, network, target, &mut results)?;
    Ok(results)
}

/// Pick an atomic test for the target's OS and run its commands there.
fn run_technique(
    network: &mut Network,
    catalog: &TechniqueCatalog,
    mitre_id: &str,
    target: &str,
    privilege: Privilege,
    rng: &mut SimRng,
) -> Result<TechniqueUse, NetworkError> {
    let host = network
        .host_mut(target)
        .ok_or_else(|| NetworkError::UnknownNode(target.to_string()))?;
    let Some(technique) = catalog.get(mitre_id) else {
        return Ok(TechniqueUse {
            mitre_id: mitre_id.to_string(),
            name: String::new(),
            commands: Vec::new(),
        });
    };

    let mut commands = Vec::new();
    if let Some(test) = technique.choose_test(&host.os, rng) {
        for content in test.command_sequence() {
            host.run_command(Command {
                executor: test.executor.clone(),
                content: content.to_string(),
                privilege,
            });
            commands.push(content.to_string());
        }
    }
    Ok(TechniqueUse {
        mitre_id: technique.mitre_id.clone(),
        name: technique.name.clone(),
        commands,
    })
}

fn apply_side_effects(
    phase: KillChainPhase,
    network: &mut Network,
    target: &str,
    results: &mut RedActionResults,
) -> Result<(), NetworkError> {
    match phase {
        KillChainPhase::PingSweep => {
            let subnet_name = network.require_host(target)?.subnet.clone();
            let subnet = network.require_subnet(&subnet_name)?;
            let connected = subnet.connected_hosts.clone();
            let available_ips = subnet.available_ips();
            for name in &connected {
                if let Some(ip) = network.host(name).and_then(|h| h.ip_address) {
                    results.metadata.push(ActionMetadata::IpAddress { host: name.clone(), ip });
                }
            }
            results.discovered_hosts = connected.clone();
            results.metadata.push(ActionMetadata::SubnetScanned {
                subnet: subnet_name,
                connected_hosts: connected,
                available_ips,
            });
        }
        KillChainPhase::PortScan => {
            let host = network.require_host(target)?;
            for service in &host.services {
                results.alert.add_service(service.clone());
            }
            results.metadata.push(ActionMetadata::Services {
                host: target.to_string(),
                services: host.services.clone(),
                vulnerabilities: host.vulnerabilities().into_iter().collect(),
            });
        }
        KillChainPhase::Discovery => {
            let host = network.require_host(target)?;
            results.metadata.push(ActionMetadata::HostType {
                host: target.to_string(),
                type_name: host.host_type.name.clone(),
            });
        }
        KillChainPhase::PrivilegeEscalation => {
            if let Some(host) = network.host_mut(target) {
                host.add_process(Process::malicious(MALWARE_PROCESS, Privilege::Root));
            }
        }
        KillChainPhase::Impact => network.set_host_compromised(target, true)?,
        KillChainPhase::LateralMovement => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::tests::three_subnet_network;
    use crate::types::seeded_rng;

    fn catalog() -> TechniqueCatalog {
        TechniqueCatalog::builtin().expect("test: catalog")
    }

    #[test]
    fn phase_names_round_trip_through_str() {
        for phase in [
            KillChainPhase::PingSweep,
            KillChainPhase::PortScan,
            KillChainPhase::Discovery,
            KillChainPhase::LateralMovement,
            KillChainPhase::PrivilegeEscalation,
            KillChainPhase::Impact,
        ] {
            assert_eq!(phase.name().parse::<KillChainPhase>().expect("test: parse"), phase);
        }
        assert!("exfiltration".parse::<KillChainPhase>().is_err());
    }

    #[test]
    fn ping_sweep_reveals_subnet() {
        let mut net = three_subnet_network();
        let mut rng = seeded_rng(1);
        let r = execute_phase(KillChainPhase::PingSweep, &mut net, &catalog(), "h0", "h0", &[], &mut rng)
            .expect("test: sweep");
        assert!(r.attack_success);
        assert_eq!(r.discovered_hosts, vec!["h0".to_string(), "h1".to_string()]);
        assert!(r.alert.techniques.contains(PING_SWEEP_TECHNIQUE));
        let h0 = net.host("h0").expect("test: h0");
        assert!(h0.command_history.iter().all(|c| c.privilege == Privilege::User));
    }

    #[test]
    fn phase_without_techniques_fails() {
        let mut net = three_subnet_network();
        let mut rng = seeded_rng(1);
        let r = execute_phase(KillChainPhase::Impact, &mut net, &catalog(), "h0", "h0", &[], &mut rng)
            .expect("test: impact");
        assert!(!r.attack_success);
        assert_eq!(net.is_compromised("h0"), Some(false));
        assert!(r.alert.techniques.is_empty());
        assert_eq!(r.alert.dst_hosts.len(), 1);
    }

    #[test]
    fn escalation_plants_malware_and_impact_compromises() {
        let mut net = three_subnet_network();
        let mut rng = seeded_rng(2);
        let cat = catalog();
        let esc = cat.valid_techniques(KillChainPhase::PrivilegeEscalation, net.host("s0").expect("test: s0"));
        let r = execute_phase(KillChainPhase::PrivilegeEscalation, &mut net, &cat, "s0", "s0", &esc, &mut rng)
            .expect("test: esc");
        assert!(r.attack_success);
        let s0 = net.host("s0").expect("test: s0");
        assert!(s0.processes.iter().any(|p| p.name == MALWARE_PROCESS && p.malicious));
        assert!(s0.command_history.iter().all(|c| c.privilege == Privilege::Root));

        let imp = cat.valid_techniques(KillChainPhase::Impact, net.host("s0").expect("test: s0"));
        execute_phase(KillChainPhase::Impact, &mut net, &cat, "s0", "s0", &imp, &mut rng).expect("test: impact");
        assert_eq!(net.is_compromised("s0"), Some(true));
    }

    #[test]
    fn lateral_movement_needs_a_path() {
        let mut net = three_subnet_network();
        let mut rng = seeded_rng(3);
        let cat = catalog();
        let valid = vec!["T1210".to_string()];
        let ok = execute_phase(KillChainPhase::LateralMovement, &mut net, &cat, "h0", "h1", &valid, &mut rng)
            .expect("test: move");
        assert!(ok.attack_success);

        net.isolate("h0").expect("test: isolate");
        let blocked = execute_phase(KillChainPhase::LateralMovement, &mut net, &cat, "h0", "h1", &valid, &mut rng)
            .expect("test: move");
        assert!(!blocked.attack_success);
        assert!(blocked.alert.src_host.as_ref().is_some_and(|h| h.isolated));
    }
}
