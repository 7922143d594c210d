// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Hosts

use std::collections::BTreeSet;
use std::net::IpAddr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::firewall::FirewallRule;
use super::routing::RouteTable;
use super::service::{Service, ServiceConfig};
use super::NetworkError;
use crate::types::Privilege;

pub const MAC_PREFIX: &str = "46:6f:6f";
pub const DEFAULT_OS: &str = "windows";

// ---------------------------------------------------------------------------
// Process / Command
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Process {
    pub name: String,
    pub privilege: Privilege,
    /// Planted by an attacker; cleared by a restore.
    #[serde(default)]
    pub malicious: bool,
}

impl Process {
    /// # Errors
    /// [`NetworkError::InvalidPrivilege`] unless `privilege` is user or root.
    pub fn new(name: &str, privilege: &str) -> Result<Self, NetworkError> {
        Ok(Self {
            name: name.to_string(),
            privilege: privilege.parse()?,
            malicious: false,
        })
    }

    pub fn malicious(name: &str, privilege: Privilege) -> Self {
        Self {
            name: name.to_string(),
            privilege,
            malicious: true,
        }
    }

    pub fn escalate_privilege(&mut self) {
        self.privilege = Privilege::Root;
    }
}

/// A command executed on a host, kept in its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub executor: String,
    pub content: String,
    pub privilege: Privilege,
}

impl Command {
    /// # Errors
    /// [`NetworkError::InvalidPrivilege`] unless `privilege` is user or root.
    pub fn new(executor: &str, content: &str, privilege: &str) -> Result<Self, NetworkError> {
        Ok(Self {
            executor: executor.to_string(),
            content: content.to_string(),
            privilege: privilege.parse()?,
        })
    }
}

// ---------------------------------------------------------------------------
// HostType
// ---------------------------------------------------------------------------

/// Template a host is stamped from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostType {
    pub name: String,
    pub services: Vec<Service>,
    pub processes: Vec<Process>,
    pub cve_list: BTreeSet<String>,
    pub decoy: bool,
    pub os: String,
}

impl HostType {
    pub fn new(name: &str, os: &str) -> Self {
        Self {
            name: name.to_string(),
            os: os.to_string(),
            ..Self::default()
        }
    }

    /// Add a service; its vulnerabilities join the type's CVE set.
    pub fn with_service(mut self, service: Service) -> Self {
        self.cve_list.extend(service.vulns.iter().cloned());
        if !self.services.contains(&service) {
            self.services.push(service);
        }
        self
    }

    pub fn with_cves<I, S>(mut self, cves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cve_list.extend(cves.into_iter().map(Into::into));
        self
    }

    pub fn as_decoy(mut self) -> Self {
        self.decoy = true;
        self
    }

    pub fn is_server(&self) -> bool {
        self.name.to_ascii_lowercase().contains("server")
    }

    pub fn is_workstation(&self) -> bool {
        self.name.to_ascii_lowercase().contains("workstation")
    }
}

fn default_os() -> String {
    DEFAULT_OS.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub name: String,
    #[serde(default = "default_privilege")]
    pub privilege: String,
}

fn default_privilege() -> String {
    "user".to_string()
}

/// Declarative host type, keyed by name in the surrounding map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostTypeConfig {
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub processes: Vec<ProcessConfig>,
    #[serde(default)]
    pub cve_list: Vec<String>,
    #[serde(default)]
    pub decoy: bool,
    #[serde(default = "default_os")]
    pub os: String,
}

impl HostTypeConfig {
    /// # Errors
    /// Service or process validation errors.
    pub fn build(&self, name: &str) -> Result<HostType, NetworkError> {
        let mut host_type = HostType::new(name, &self.os).with_cves(self.cve_list.iter().cloned());
        for svc in &self.services {
            host_type = host_type.with_service(svc.build()?);
        }
        for proc_cfg in &self.processes {
            host_type.processes.push(Process::new(&proc_cfg.name, &proc_cfg.privilege)?);
        }
        host_type.decoy = self.decoy;
        Ok(host_type)
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    /// Owning subnet.
    pub subnet: String,
    pub host_type: HostType,
    pub services: Vec<Service>,
    pub processes: Vec<Process>,
    pub command_history: Vec<Command>,
    pub firewall_rules: Option<Vec<FirewallRule>>,
    pub routes: RouteTable,
    pub ip_address: Option<IpAddr>,
    pub dns_server: Option<IpAddr>,
    pub mac_address: String,
    /// Other hosts this one has a direct interface to.
    pub interfaces: Vec<String>,
    pub os: String,
    pub decoy: bool,
    pub is_compromised: bool,
    pub isolated: bool,
    pub restored: bool,
}

impl Host {
    pub fn new(name: &str, subnet: &str, host_type: HostType, rng: &mut impl Rng) -> Self {
        let os = if host_type.os.is_empty() {
            DEFAULT_OS.to_string()
        } else {
            host_type.os.clone()
        };
        Self {
            name: name.to_string(),
            subnet: subnet.to_string(),
            services: host_type.services.clone(),
            processes: host_type.processes.clone(),
            decoy: host_type.decoy,
            os,
            host_type,
            command_history: Vec::new(),
            firewall_rules: None,
            routes: RouteTable::default(),
            ip_address: None,
            dns_server: None,
            mac_address: generate_mac(rng),
            interfaces: Vec::new(),
            is_compromised: false,
            isolated: false,
            restored: false,
        }
    }

    /// Add a service, replacing an equal one (same port, protocol, version).
    pub fn add_service(&mut self, service: Service) {
        match self.services.iter_mut().find(|s| **s == service) {
            Some(existing) => *existing = service,
            None => self.services.push(service),
        }
    }

    /// Remove services by name, case-insensitively.
    pub fn remove_service(&mut self, name: &str) {
        self.services.retain(|s| !s.name.eq_ignore_ascii_case(name));
    }

    pub fn add_process(&mut self, process: Process) {
        self.processes.push(process);
    }

    /// Remove processes by name, case-insensitively.
    pub fn remove_process(&mut self, name: &str) {
        self.processes.retain(|p| !p.name.eq_ignore_ascii_case(name));
    }

    /// Returns how many processes were killed.
    pub fn kill_malicious_processes(&mut self) -> usize {
        let before = self.processes.len();
        self.processes.retain(|p| !p.malicious);
        before - self.processes.len()
    }

    pub fn run_command(&mut self, command: Command) {
        self.command_history.push(command);
    }

    /// CVEs exposed by this host: its type's list plus those of any services
    /// added since.
    pub fn vulnerabilities(&self) -> BTreeSet<String> {
        let mut cves = self.host_type.cve_list.clone();
        for service in &self.services {
            cves.extend(service.vulns.iter().cloned());
        }
        cves
    }

    /// Put the host back to its freshly-built state, keeping addressing.
    pub(crate) fn reset_state(&mut self) {
        self.command_history.clear();
        self.processes = self.host_type.processes.clone();
        self.is_compromised = false;
        self.isolated = false;
        self.restored = false;
    }
}

fn generate_mac(rng: &mut impl Rng) -> String {
    let bytes: [u8; 3] = rng.gen();
    format!("{MAC_PREFIX}:{:02x}:{:02x}:{:02x}", bytes[0], bytes[1], bytes[2])
}
