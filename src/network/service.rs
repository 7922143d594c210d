// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Services

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::firewall::MAX_PORT;
use super::NetworkError;
use crate::types::Protocol;

/// A network service running on a host.
///
/// Two services are equal when they share port, protocol and version; the
/// name and vulnerability content do not take part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub port: u16,
    pub protocol: Protocol,
    pub version: Option<String>,
    pub vulns: BTreeSet<String>,
    pub description: Option<String>,
    pub decoy: bool,
}

impl Service {
    /// # Errors
    /// [`NetworkError::InvalidPort`] outside `1..=65535`,
    /// [`NetworkError::InvalidProtocol`] for anything but tcp/udp/icmp.
    pub fn new(name: &str, port: u32, protocol: &str) -> Result<Self, NetworkError> {
        if !(1..=MAX_PORT).contains(&port) {
            return Err(NetworkError::InvalidPort(port.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            port: port as u16,
            protocol: protocol.parse()?,
            version: None,
            vulns: BTreeSet::new(),
            description: None,
            decoy: false,
        })
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn with_vulns<I, S>(mut self, vulns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vulns.extend(vulns.into_iter().map(Into::into));
        self
    }

    pub fn as_decoy(mut self) -> Self {
        self.decoy = true;
        self
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.port == other.port && self.protocol == other.protocol && self.version == other.version
    }
}

impl Eq for Service {}

impl Hash for Service {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.port.hash(state);
        self.protocol.hash(state);
        self.version.hash(state);
    }
}

fn default_port() -> u32 {
    1
}

fn default_protocol() -> String {
    "tcp".to_string()
}

/// Declarative form of a service, as written in YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    #[serde(default = "default_port")]
    pub port: u32,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub vulns: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub decoy: bool,
}

impl ServiceConfig {
    /// # Errors
    /// Port and protocol validation errors from [`Service::new`].
    pub fn build(&self) -> Result<Service, NetworkError> {
        let mut service = Service::new(&self.name, self.port, &self.protocol)?.with_vulns(self.vulns.iter().cloned());
        service.version = self.version.clone();
        service.description = self.description.clone();
        service.decoy = self.decoy;
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_name_and_vulns() {
        let a = Service::new("ssh", 22, "tcp").expect("test: ssh").with_version("8.9").with_vulns(["CVE-2023-38408"]);
        let b = Service::new("openssh", 22, "TCP").expect("test: ssh").with_version("8.9");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn version_participates_in_equality() {
        let a = Service::new("http", 80, "tcp").expect("test: http").with_version("2.4");
        let b = Service::new("http", 80, "tcp").expect("test: http").with_version("2.5");
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_bad_port_and_protocol() {
        assert!(matches!(Service::new("x", 0, "tcp"), Err(NetworkError::InvalidPort(_))));
        assert!(matches!(Service::new("x", 65_536, "tcp"), Err(NetworkError::InvalidPort(_))));
        assert!(matches!(Service::new("x", 80, "quic"), Err(NetworkError::InvalidProtocol(_))));
    }

    #[test]
    fn config_defaults_to_port_one_tcp() {
        let cfg: ServiceConfig = serde_yaml::from_str("name: smb\nvulns: [CVE-2017-0144]\n").expect("test: yaml");
        let svc = cfg.build().expect("test: build");
        assert_eq!(svc.port, 1);
        assert_eq!(svc.protocol, Protocol::Tcp);
        assert!(svc.vulns.contains("CVE-2017-0144"));
    }
}
