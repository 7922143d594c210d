// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Network Configuration

use std::collections::BTreeMap;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    FirewallRule, HostOptions, HostTypeConfig, Network, NetworkError, Route, Router, ServiceConfig, Subnet,
};
use crate::error::ConfigError;

const EXAMPLE_NETWORK: &str = include_str!("../resources/example_network.yaml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub name: String,
    #[serde(default)]
    pub firewall: Option<Vec<FirewallRule>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetConfig {
    pub name: String,
    pub router: String,
    pub ip_range: IpNetwork,
    #[serde(default)]
    pub firewall: Option<Vec<FirewallRule>>,
    #[serde(default)]
    pub dns_server: Option<IpAddr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub name: String,
    pub subnet: String,
    #[serde(rename = "type")]
    pub host_type: String,
    #[serde(default)]
    pub firewall_rules: Option<Vec<FirewallRule>>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub ip: Option<IpAddr>,
}

/// Declarative topology. Lists keep declaration order, which fixes host
/// order and therefore the observation layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_network_name")]
    pub name: String,
    pub routers: Vec<RouterConfig>,
    pub subnets: Vec<SubnetConfig>,
    #[serde(default)]
    pub host_types: BTreeMap<String, HostTypeConfig>,
    pub hosts: Vec<HostConfig>,
}

fn default_network_name() -> String {
    "network".to_string()
}

impl NetworkConfig {
    /// # Errors
    /// [`ConfigError::Yaml`] on malformed input.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Three subnets behind one router with two hosts each.
    ///
    /// # Errors
    /// Only if the embedded definition is malformed.
    pub fn example() -> Result<Self, ConfigError> {
        Self::from_yaml_str(EXAMPLE_NETWORK)
    }
}

impl Network {
    /// Wire a network from its declarative form: routers, then subnets,
    /// then hosts, all in declaration order.
    ///
    /// # Errors
    /// [`NetworkError::HostTypeNotFound`] for an undeclared type, otherwise
    /// whatever building the topology raises.
    pub fn from_config(config: &NetworkConfig, rng: &mut impl Rng) -> Result<Self, NetworkError> {
        let mut network = Network::new(&config.name);

        for r in &config.routers {
            network.add_router(Router::new(&r.name, r.firewall.clone()))?;
        }
        for s in &config.subnets {
            let subnet = Subnet::new(&s.name, s.ip_range, &s.router, s.firewall.clone(), s.dns_server);
            network.add_subnet(subnet)?;
        }
        for h in &config.hosts {
            let type_config = config
                .host_types
                .get(&h.host_type)
                .ok_or_else(|| NetworkError::HostTypeNotFound(h.host_type.clone()))?;
            let host_type = type_config.build(&h.host_type)?;
            let services = h.services.iter().map(ServiceConfig::build).collect::<Result<Vec<_>, _>>()?;
            let options = HostOptions {
                firewall_rules: h.firewall_rules.clone(),
                services,
                interfaces: h.interfaces.clone(),
                routes: h.routes.clone(),
                ip: h.ip,
                decoy: false,
            };
            network.add_host_to_subnet(&h.name, &h.subnet, host_type, options, rng)?;
        }

        info!(
            network = %network.name,
            routers = config.routers.len(),
            subnets = config.subnets.len(),
            hosts = config.hosts.len(),
            "network built"
        );
        Ok(network)
    }
}
