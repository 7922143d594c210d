// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Network Model

//! Topology, addressing, firewall evaluation and routing.
//!
//! [`Network`] owns every router, subnet and host by name and keeps an
//! undirected adjacency graph between them. Edges removed through
//! [`Network::disconnect`] or [`Network::isolate`] are recorded so
//! [`Network::reset`] can put the topology back.

pub mod address;
pub mod config;
pub mod firewall;
pub mod host;
pub mod routing;
pub mod service;
pub mod subnet;

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::net::IpAddr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use address::AddressPool;
pub use config::NetworkConfig;
pub use firewall::{FirewallRule, PortSelector, ProtoSelector, RuleAction, TrafficSource};
pub use host::{Command, Host, HostType, HostTypeConfig, Process};
pub use routing::{Route, RouteTable};
pub use service::{Service, ServiceConfig};
pub use subnet::{Router, Subnet};

use crate::types::Protocol;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("unknown network node '{0}'")]
    UnknownNode(String),

    #[error("network node '{0}' already exists")]
    DuplicateNode(String),

    #[error("'{0}' is not a host")]
    NotAHost(String),

    #[error("'{0}' is not a subnet")]
    NotASubnet(String),

    #[error("'{0}' is not a router")]
    NotARouter(String),

    #[error("host '{0}' is not a decoy")]
    NotADecoy(String),

    #[error("no edge between '{0}' and '{1}'")]
    MissingEdge(String, String),

    #[error("subnet '{0}' has no free addresses")]
    AddressPoolExhausted(String),

    #[error("address {ip} is not available in subnet '{subnet}'")]
    AddressUnavailable { subnet: String, ip: IpAddr },

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("{0} is not a valid port number")]
    InvalidPort(String),

    #[error("invalid protocol '{0}': expected tcp, udp or icmp")]
    InvalidProtocol(String),

    #[error("invalid privilege '{0}': expected user or root")]
    InvalidPrivilege(String),

    #[error("host type '{0}' not found")]
    HostTypeNotFound(String),
}

impl NetworkError {
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            NetworkError::InvalidAddress(_)
                | NetworkError::InvalidPort(_)
                | NetworkError::InvalidProtocol(_)
                | NetworkError::InvalidPrivilege(_)
                | NetworkError::HostTypeNotFound(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Host,
    Subnet,
    Router,
}

/// Optional extras when leasing a host into a subnet.
#[derive(Debug, Clone, Default)]
pub struct HostOptions {
    pub firewall_rules: Option<Vec<FirewallRule>>,
    pub services: Vec<Service>,
    pub interfaces: Vec<String>,
    pub routes: Vec<Route>,
    /// Static address instead of a random lease.
    pub ip: Option<IpAddr>,
    pub decoy: bool,
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    routers: BTreeMap<String, Router>,
    subnets: BTreeMap<String, Subnet>,
    hosts: BTreeMap<String, Host>,
    router_order: Vec<String>,
    subnet_order: Vec<String>,
    host_order: Vec<String>,
    adjacency: BTreeMap<String, BTreeSet<String>>,
    /// Edges removed since the last reset, in removal order.
    disconnected: Vec<(String, String)>,
    /// Neighbors each isolated host had when it was isolated.
    severed: BTreeMap<String, Vec<String>>,
    decoys: Vec<String>,
}

impl Network {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    // ─── Lookup ──────────────────────────────────────────────────────────────

    pub fn kind(&self, name: &str) -> Option<NodeKind> {
        if self.hosts.contains_key(name) {
            Some(NodeKind::Host)
        } else if self.subnets.contains_key(name) {
            Some(NodeKind::Subnet)
        } else if self.routers.contains_key(name) {
            Some(NodeKind::Router)
        } else {
            None
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adjacency.contains_key(name)
    }

    /// Number of nodes of any kind.
    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    pub fn host_mut(&mut self, name: &str) -> Option<&mut Host> {
        self.hosts.get_mut(name)
    }

    pub fn subnet(&self, name: &str) -> Option<&Subnet> {
        self.subnets.get(name)
    }

    pub fn router(&self, name: &str) -> Option<&Router> {
        self.routers.get(name)
    }

    /// # Errors
    /// [`NetworkError::UnknownNode`] / [`NetworkError::NotAHost`].
    pub fn require_host(&self, name: &str) -> Result<&Host, NetworkError> {
        self.hosts.get(name).ok_or_else(|| self.missing(name, NetworkError::NotAHost(name.to_string())))
    }

    fn require_host_mut(&mut self, name: &str) -> Result<&mut Host, NetworkError> {
        if !self.hosts.contains_key(name) {
            return Err(self.missing(name, NetworkError::NotAHost(name.to_string())));
        }
        self.hosts
            .get_mut(name)
            .ok_or_else(|| NetworkError::UnknownNode(name.to_string()))
    }

    /// # Errors
    /// [`NetworkError::UnknownNode`] / [`NetworkError::NotASubnet`].
    pub fn require_subnet(&self, name: &str) -> Result<&Subnet, NetworkError> {
        self.subnets
            .get(name)
            .ok_or_else(|| self.missing(name, NetworkError::NotASubnet(name.to_string())))
    }

    /// Wrong-kind error if the node exists, unknown-node otherwise.
    fn missing(&self, name: &str, wrong_kind: NetworkError) -> NetworkError {
        if self.contains(name) {
            wrong_kind
        } else {
            NetworkError::UnknownNode(name.to_string())
        }
    }

    /// Hosts in insertion order, decoys included.
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.host_order.iter().filter_map(|n| self.hosts.get(n))
    }

    pub fn host_names(&self) -> Vec<String> {
        self.host_order.clone()
    }

    pub fn nondecoy_hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts().filter(|h| !h.decoy)
    }

    pub fn subnets(&self) -> impl Iterator<Item = &Subnet> {
        self.subnet_order.iter().filter_map(|n| self.subnets.get(n))
    }

    pub fn subnet_names(&self) -> Vec<String> {
        self.subnet_order.clone()
    }

    pub fn routers(&self) -> impl Iterator<Item = &Router> {
        self.router_order.iter().filter_map(|n| self.routers.get(n))
    }

    pub fn hosts_on_subnet(&self, subnet: &str) -> Vec<&Host> {
        self.subnets
            .get(subnet)
            .map(|s| s.connected_hosts.iter().filter_map(|h| self.hosts.get(h)).collect())
            .unwrap_or_default()
    }

    pub fn decoys(&self) -> &[String] {
        &self.decoys
    }

    pub fn num_decoys(&self) -> usize {
        self.decoys.len()
    }

    pub fn isolated_hosts(&self) -> Vec<&str> {
        self.hosts().filter(|h| h.isolated).map(|h| h.name.as_str()).collect()
    }

    // ─── Construction ────────────────────────────────────────────────────────

    fn ensure_absent(&self, name: &str) -> Result<(), NetworkError> {
        if self.contains(name) {
            return Err(NetworkError::DuplicateNode(name.to_string()));
        }
        Ok(())
    }

    /// # Errors
    /// [`NetworkError::DuplicateNode`] if the name is taken.
    pub fn add_router(&mut self, router: Router) -> Result<(), NetworkError> {
        self.ensure_absent(&router.name)?;
        self.adjacency.insert(router.name.clone(), BTreeSet::new());
        self.router_order.push(router.name.clone());
        self.routers.insert(router.name.clone(), router);
        Ok(())
    }

    /// Attach a subnet to its router: the router takes an interface address
    /// and the two are connected.
    ///
    /// # Errors
    /// Duplicate name, unknown router, or an exhausted range.
    pub fn add_subnet(&mut self, mut subnet: Subnet) -> Result<(), NetworkError> {
        self.ensure_absent(&subnet.name)?;
        let router_name = subnet.router.clone();
        let router = match self.routers.get_mut(&router_name) {
            Some(r) => r,
            None => {
                return Err(if self.contains(&router_name) {
                    NetworkError::NotARouter(router_name)
                } else {
                    NetworkError::UnknownNode(router_name)
                })
            }
        };
        router.add_subnet_interface(&mut subnet)?;

        let name = subnet.name.clone();
        self.adjacency.insert(name.clone(), BTreeSet::new());
        self.subnet_order.push(name.clone());
        self.subnets.insert(name.clone(), subnet);
        self.connect(&name, &router_name)
    }

    /// Create a host, lease it an address from `subnet` and connect it.
    /// Returns the leased address.
    ///
    /// # Errors
    /// Duplicate name, unknown subnet, or no address to lease.
    pub fn add_host_to_subnet(
        &mut self,
        name: &str,
        subnet_name: &str,
        host_type: HostType,
        options: HostOptions,
        rng: &mut impl Rng,
    ) -> Result<IpAddr, NetworkError> {
        self.ensure_absent(name)?;
        if !self.subnets.contains_key(subnet_name) {
            return Err(self.missing(subnet_name, NetworkError::NotASubnet(subnet_name.to_string())));
        }

        let mut host = Host::new(name, subnet_name, host_type, rng);
        for service in options.services {
            host.add_service(service);
        }
        host.decoy |= options.decoy;
        host.firewall_rules = options.firewall_rules;
        host.interfaces = options.interfaces;

        let subnet = self
            .subnets
            .get_mut(subnet_name)
            .ok_or_else(|| NetworkError::UnknownNode(subnet_name.to_string()))?;
        let ip = match options.ip {
            Some(ip) => {
                if !subnet.pool.lease_specific(ip) {
                    return Err(NetworkError::AddressUnavailable {
                        subnet: subnet_name.to_string(),
                        ip,
                    });
                }
                ip
            }
            None => subnet
                .pool
                .lease_random(rng)
                .ok_or_else(|| NetworkError::AddressPoolExhausted(subnet_name.to_string()))?,
        };
        subnet.connected_hosts.push(name.to_string());

        host.ip_address = Some(ip);
        host.dns_server = subnet.dns_server;
        host.routes.add_route(Route::new(subnet.ip_range, ip));
        host.routes.set_default_route(subnet.default_route());
        for route in options.routes {
            host.routes.add_route(route);
        }

        self.adjacency.insert(name.to_string(), BTreeSet::new());
        self.host_order.push(name.to_string());
        self.hosts.insert(name.to_string(), host);
        self.connect(name, subnet_name)?;
        debug!(host = name, subnet = subnet_name, %ip, "host leased");
        Ok(ip)
    }

    /// Create a host flagged decoy and register it for teardown on reset.
    ///
    /// # Errors
    /// As [`Network::add_host_to_subnet`].
    pub fn create_decoy(
        &mut self,
        name: &str,
        subnet: &str,
        host_type: HostType,
        rng: &mut impl Rng,
    ) -> Result<IpAddr, NetworkError> {
        let options = HostOptions {
            decoy: true,
            ..HostOptions::default()
        };
        let ip = self.add_host_to_subnet(name, subnet, host_type.as_decoy(), options, rng)?;
        self.decoys.push(name.to_string());
        Ok(ip)
    }

    /// Detach a host from its subnet, return its address to the pool and
    /// drop its node and edges.
    ///
    /// # Errors
    /// [`NetworkError::UnknownNode`] / [`NetworkError::NotAHost`].
    pub fn remove_host(&mut self, name: &str) -> Result<Host, NetworkError> {
        if !self.hosts.contains_key(name) {
            return Err(self.missing(name, NetworkError::NotAHost(name.to_string())));
        }
        let host = self
            .hosts
            .remove(name)
            .ok_or_else(|| NetworkError::UnknownNode(name.to_string()))?;

        if let Some(subnet) = self.subnets.get_mut(&host.subnet) {
            if let Some(ip) = host.ip_address {
                subnet.pool.release(ip);
            }
            subnet.remove_connected_host(name);
        }

        if let Some(neighbors) = self.adjacency.remove(name) {
            for n in neighbors {
                if let Some(set) = self.adjacency.get_mut(&n) {
                    set.remove(name);
                }
            }
        }
        self.disconnected.retain(|(a, b)| a != name && b != name);
        self.severed.remove(name);
        self.host_order.retain(|h| h != name);
        self.decoys.retain(|h| h != name);
        debug!(host = name, "host removed");
        Ok(host)
    }

    /// # Errors
    /// [`NetworkError::NotADecoy`] if the host exists but is not a decoy.
    pub fn remove_decoy(&mut self, name: &str) -> Result<Host, NetworkError> {
        if !self.decoys.iter().any(|d| d == name) {
            return Err(self.missing(name, NetworkError::NotADecoy(name.to_string())));
        }
        self.remove_host(name)
    }

    // ─── Edges ───────────────────────────────────────────────────────────────

    /// # Errors
    /// [`NetworkError::UnknownNode`] if either end is missing.
    pub fn connect(&mut self, a: &str, b: &str) -> Result<(), NetworkError> {
        for n in [a, b] {
            if !self.contains(n) {
                return Err(NetworkError::UnknownNode(n.to_string()));
            }
        }
        if let Some(set) = self.adjacency.get_mut(a) {
            set.insert(b.to_string());
        }
        if let Some(set) = self.adjacency.get_mut(b) {
            set.insert(a.to_string());
        }
        Ok(())
    }

    /// Remove an edge and remember it for [`Network::reset`].
    ///
    /// # Errors
    /// [`NetworkError::MissingEdge`] if the two are not connected.
    pub fn disconnect(&mut self, a: &str, b: &str) -> Result<(), NetworkError> {
        if !self.has_edge(a, b) {
            return Err(NetworkError::MissingEdge(a.to_string(), b.to_string()));
        }
        if let Some(set) = self.adjacency.get_mut(a) {
            set.remove(b);
        }
        if let Some(set) = self.adjacency.get_mut(b) {
            set.remove(a);
        }
        self.disconnected.push((a.to_string(), b.to_string()));
        Ok(())
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.adjacency.get(a).is_some_and(|set| set.contains(b))
    }

    pub fn neighbors(&self, name: &str) -> impl Iterator<Item = &str> {
        self.adjacency.get(name).into_iter().flatten().map(String::as_str)
    }

    /// Every edge once, as an ordered pair.
    pub fn edges(&self) -> BTreeSet<(String, String)> {
        let mut out = BTreeSet::new();
        for (a, set) in &self.adjacency {
            for b in set {
                let pair = if a <= b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
                out.insert(pair);
            }
        }
        out
    }

    /// Mark a host isolated and sever every edge it currently has. Firewall
    /// rules are left alone. Isolating an isolated host is a no-op.
    ///
    /// # Errors
    /// [`NetworkError::UnknownNode`] / [`NetworkError::NotAHost`].
    pub fn isolate(&mut self, name: &str) -> Result<(), NetworkError> {
        let host = self.require_host_mut(name)?;
        if host.isolated {
            return Ok(());
        }
        host.isolated = true;

        let neighbors: Vec<String> = self.neighbors(name).map(str::to_string).collect();
        for n in &neighbors {
            self.disconnect(name, n)?;
        }
        debug!(host = name, severed = neighbors.len(), "host isolated");
        self.severed.insert(name.to_string(), neighbors);
        Ok(())
    }

    /// Clear isolation and restore the edges severed by [`Network::isolate`],
    /// skipping neighbors that are gone or isolated themselves.
    ///
    /// # Errors
    /// [`NetworkError::UnknownNode`] / [`NetworkError::NotAHost`].
    pub fn reconnect(&mut self, name: &str) -> Result<(), NetworkError> {
        let host = self.require_host_mut(name)?;
        host.isolated = false;

        let neighbors = self.severed.remove(name).unwrap_or_default();
        for n in neighbors {
            let neighbor_isolated = self.hosts.get(&n).is_some_and(|h| h.isolated);
            if !self.contains(&n) || neighbor_isolated {
                continue;
            }
            self.connect(name, &n)?;
            self.disconnected
                .retain(|(a, b)| !((a == name && *b == n) || (*a == n && b == name)));
        }
        debug!(host = name, "host reconnected");
        Ok(())
    }

    // ─── Traffic ─────────────────────────────────────────────────────────────

    fn traffic_source(&self, name: &str) -> Result<TrafficSource<'_>, NetworkError> {
        if let Some(host) = self.hosts.get(name) {
            let router = self.subnets.get(&host.subnet).map(|s| s.router.as_str());
            return Ok(TrafficSource {
                name: host.name.as_str(),
                subnet: Some(host.subnet.as_str()),
                router,
            });
        }
        if let Some(subnet) = self.subnets.get(name) {
            return Ok(TrafficSource {
                name: subnet.name.as_str(),
                subnet: None,
                router: Some(subnet.router.as_str()),
            });
        }
        if let Some(router) = self.routers.get(name) {
            return Ok(TrafficSource {
                name: router.name.as_str(),
                subnet: None,
                router: None,
            });
        }
        Err(NetworkError::UnknownNode(name.to_string()))
    }

    /// Evaluate inbound firewall rules for `src -> dst`.
    ///
    /// A host destination must pass its router's, its subnet's and its own
    /// rules; a subnet destination its router's and its own; a router only
    /// its own. `port = None` means "all ports". ICMP ignores the port.
    ///
    /// # Errors
    /// [`NetworkError::InvalidProtocol`], [`NetworkError::InvalidPort`] or
    /// [`NetworkError::UnknownNode`].
    pub fn is_traffic_allowed(
        &self,
        src: &str,
        dst: &str,
        port: Option<u32>,
        proto: &str,
    ) -> Result<bool, NetworkError> {
        let proto: Protocol = proto.parse()?;
        let port = match (proto, port) {
            (Protocol::Icmp, _) | (_, None) => PortSelector::All,
            (_, Some(p)) => PortSelector::number(p)?,
        };
        let source = self.traffic_source(src)?;
        let allowed = |rules: &Option<Vec<FirewallRule>>| firewall::evaluate(rules.as_deref(), &source, port, proto);

        if let Some(host) = self.hosts.get(dst) {
            let subnet = self.require_subnet(&host.subnet)?;
            let router_ok = self.routers.get(&subnet.router).map_or(true, |r| allowed(&r.firewall_rules));
            return Ok(router_ok && allowed(&subnet.firewall_rules) && allowed(&host.firewall_rules));
        }
        if let Some(subnet) = self.subnets.get(dst) {
            let router_ok = self.routers.get(&subnet.router).map_or(true, |r| allowed(&r.firewall_rules));
            return Ok(router_ok && allowed(&subnet.firewall_rules));
        }
        if let Some(router) = self.routers.get(dst) {
            return Ok(allowed(&router.firewall_rules));
        }
        Err(NetworkError::UnknownNode(dst.to_string()))
    }

    /// Addresses of the hosts on `subnet` that answer ICMP from `src`.
    ///
    /// # Errors
    /// Unknown source or subnet.
    pub fn ping_sweep_subnet(&self, src: &str, subnet: &str) -> Result<Vec<IpAddr>, NetworkError> {
        let subnet = self.require_subnet(subnet)?;
        let mut found = Vec::new();
        for host_name in &subnet.connected_hosts {
            if self.is_traffic_allowed(src, host_name, None, "icmp")? {
                if let Some(ip) = self.hosts.get(host_name).and_then(|h| h.ip_address) {
                    found.push(ip);
                }
            }
        }
        Ok(found)
    }

    // ─── Paths ───────────────────────────────────────────────────────────────

    fn shortest_path(&self, src: &str, dst: &str) -> Option<Vec<String>> {
        if !self.contains(src) || !self.contains(dst) {
            return None;
        }
        let mut parent: BTreeMap<&str, &str> = BTreeMap::new();
        let mut queue = VecDeque::from([src]);
        let mut seen = BTreeSet::from([src]);

        while let Some(node) = queue.pop_front() {
            if node == dst {
                let mut path = vec![dst.to_string()];
                let mut cur = dst;
                while let Some(&p) = parent.get(cur) {
                    path.push(p.to_string());
                    cur = p;
                }
                path.reverse();
                return Some(path);
            }
            for next in self.neighbors(node) {
                if seen.insert(next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Shortest host-to-host chain between two hosts. Subnets along the way
    /// are replaced by a connected host other than the endpoints when one
    /// exists, otherwise by an endpoint (or kept if they have no host).
    /// Consecutive repeats are collapsed, so no hop appears twice in a row.
    /// `None` if either end is unknown or unreachable.
    pub fn find_path(&self, src: &str, dst: &str) -> Option<Vec<String>> {
        let path = self.shortest_path(src, dst)?;
        let mut chain: Vec<String> = path
            .into_iter()
            .map(|node| {
                if !self.subnets.contains_key(&node) {
                    return node;
                }
                let mut hosts = self.neighbors(&node).filter(|n| self.hosts.contains_key(*n));
                let first = hosts.next().map(str::to_string);
                let outside = first
                    .iter()
                    .cloned()
                    .chain(hosts.map(str::to_string))
                    .find(|n| n != src && n != dst);
                outside.or(first).unwrap_or(node)
            })
            .collect();
        chain.dedup();
        Some(chain)
    }

    pub fn is_subnet_reachable(&self, a: &str, b: &str) -> bool {
        self.shortest_path(a, b).is_some()
    }

    /// Host with the longest path from `src`, if any other host is reachable.
    pub fn farthest_host(&self, src: &str) -> Option<&str> {
        let mut best: Option<&str> = None;
        let mut best_len = 0usize;
        for host in self.hosts() {
            if host.name == src {
                continue;
            }
            if let Some(path) = self.find_path(src, &host.name) {
                if path.len() > best_len {
                    best_len = path.len();
                    best = Some(host.name.as_str());
                }
            }
        }
        best
    }

    // ─── Compromise ──────────────────────────────────────────────────────────

    /// A random non-decoy workstation.
    pub fn random_user_host(&self, rng: &mut impl Rng) -> Option<&Host> {
        let users: Vec<&Host> = self
            .nondecoy_hosts()
            .filter(|h| h.host_type.is_workstation())
            .collect();
        users.choose(rng).copied()
    }

    /// # Errors
    /// [`NetworkError::UnknownNode`] / [`NetworkError::NotAHost`].
    pub fn set_host_compromised(&mut self, name: &str, compromised: bool) -> Result<(), NetworkError> {
        self.require_host_mut(name)?.is_compromised = compromised;
        Ok(())
    }

    pub fn is_compromised(&self, name: &str) -> Option<bool> {
        self.hosts.get(name).map(|h| h.is_compromised)
    }

    /// True when some subnet with at least one host has all of them compromised.
    pub fn is_any_subnet_fully_compromised(&self) -> bool {
        self.subnets().any(|s| {
            let hosts = self.hosts_on_subnet(&s.name);
            !hosts.is_empty() && hosts.iter().all(|h| h.is_compromised)
        })
    }

    // ─── Reset ───────────────────────────────────────────────────────────────

    /// Remove decoys, restore severed edges, clear per-host state and
    /// re-derive default routes. Idempotent.
    pub fn reset(&mut self) {
        for decoy in std::mem::take(&mut self.decoys) {
            if let Err(e) = self.remove_host(&decoy) {
                warn!(host = %decoy, error = %e, "decoy already gone at reset");
            }
        }

        for (a, b) in std::mem::take(&mut self.disconnected) {
            if self.contains(&a) && self.contains(&b) {
                if let Some(set) = self.adjacency.get_mut(&a) {
                    set.insert(b.clone());
                }
                if let Some(set) = self.adjacency.get_mut(&b) {
                    set.insert(a);
                }
            }
        }
        self.severed.clear();

        for host in self.hosts.values_mut() {
            host.reset_state();
            let default = self.subnets.get(&host.subnet).and_then(Subnet::default_route);
            host.routes.set_default_route(default);
        }
        for subnet in self.subnets.values_mut() {
            subnet.is_compromised = false;
        }
        for router in self.routers.values_mut() {
            router.is_compromised = false;
        }
    }
}
