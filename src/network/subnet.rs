// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Subnets and Routers

use std::collections::BTreeMap;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use super::address::AddressPool;
use super::firewall::FirewallRule;
use super::routing::{Route, RouteTable};
use super::NetworkError;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Router {
    pub name: String,
    /// Subnet name -> address of the router's interface on that subnet.
    pub interfaces: BTreeMap<String, IpAddr>,
    pub firewall_rules: Option<Vec<FirewallRule>>,
    pub routes: RouteTable,
    pub is_compromised: bool,
}

impl Router {
    pub fn new(name: &str, firewall_rules: Option<Vec<FirewallRule>>) -> Self {
        Self {
            name: name.to_string(),
            interfaces: BTreeMap::new(),
            firewall_rules,
            routes: RouteTable::default(),
            is_compromised: false,
        }
    }

    pub fn interface_ip(&self, subnet: &str) -> Option<IpAddr> {
        self.interfaces.get(subnet).copied()
    }

    /// Attach an interface on `subnet`, taking the subnet's first free address.
    /// The subnet's default route and DNS server then point at it.
    ///
    /// # Errors
    /// [`NetworkError::AddressPoolExhausted`] if the subnet has no free address.
    pub fn add_subnet_interface(&mut self, subnet: &mut Subnet) -> Result<IpAddr, NetworkError> {
        let ip = subnet
            .pool
            .lease_first()
            .ok_or_else(|| NetworkError::AddressPoolExhausted(subnet.name.clone()))?;
        self.interfaces.insert(subnet.name.clone(), ip);
        self.routes.add_route(Route::new(subnet.ip_range, ip));
        subnet.routes.set_default_route(Some(Route::default_via(ip)));
        if subnet.dns_server.is_none() {
            subnet.dns_server = Some(ip);
        }
        Ok(ip)
    }
}

// ---------------------------------------------------------------------------
// Subnet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subnet {
    pub name: String,
    pub ip_range: IpNetwork,
    /// Router this subnet hangs off.
    pub router: String,
    pub pool: AddressPool,
    /// Hosts leased into this subnet, in join order.
    pub connected_hosts: Vec<String>,
    pub firewall_rules: Option<Vec<FirewallRule>>,
    pub routes: RouteTable,
    pub dns_server: Option<IpAddr>,
    pub is_compromised: bool,
}

impl Subnet {
    pub fn new(
        name: &str,
        ip_range: IpNetwork,
        router: &str,
        firewall_rules: Option<Vec<FirewallRule>>,
        dns_server: Option<IpAddr>,
    ) -> Self {
        Self {
            name: name.to_string(),
            ip_range,
            router: router.to_string(),
            pool: AddressPool::new(ip_range),
            connected_hosts: Vec::new(),
            firewall_rules,
            routes: RouteTable::default(),
            dns_server,
            is_compromised: false,
        }
    }

    pub fn default_route(&self) -> Option<Route> {
        self.routes.default_route()
    }

    pub fn prefix_length(&self) -> u8 {
        self.ip_range.prefix()
    }

    pub fn max_hosts(&self) -> u128 {
        self.pool.capacity()
    }

    pub fn available_ips(&self) -> u128 {
        self.pool.available()
    }

    pub(crate) fn remove_connected_host(&mut self, host: &str) {
        self.connected_hosts.retain(|h| h != host);
    }
}
