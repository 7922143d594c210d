// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Routing

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use serde::{Deserialize, Serialize};

use super::NetworkError;

/// A static route: traffic for `dest` goes via `via`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    pub dest: IpNetwork,
    pub via: IpAddr,
}

impl Route {
    pub fn new(dest: IpNetwork, via: IpAddr) -> Self {
        Self { dest, via }
    }

    /// # Errors
    /// [`NetworkError::InvalidAddress`] if either side fails to parse.
    pub fn parse(dest: &str, via: &str) -> Result<Self, NetworkError> {
        let dest: IpNetwork = dest
            .parse()
            .map_err(|_| NetworkError::InvalidAddress(dest.to_string()))?;
        let via: IpAddr = via
            .parse()
            .map_err(|_| NetworkError::InvalidAddress(via.to_string()))?;
        Ok(Self { dest, via })
    }

    /// `0.0.0.0/0` or `::/0` via the given gateway, matching its family.
    pub fn default_via(via: IpAddr) -> Self {
        // a zero-length prefix is always accepted; the host-route fallback is unreachable
        let dest = match via {
            IpAddr::V4(_) => Ipv4Network::new(Ipv4Addr::UNSPECIFIED, 0)
                .map(IpNetwork::V4)
                .unwrap_or_else(|_| IpNetwork::V4(Ipv4Network::from(Ipv4Addr::UNSPECIFIED))),
            IpAddr::V6(_) => Ipv6Network::new(Ipv6Addr::UNSPECIFIED, 0)
                .map(IpNetwork::V6)
                .unwrap_or_else(|_| IpNetwork::V6(Ipv6Network::from(Ipv6Addr::UNSPECIFIED))),
        };
        Self { dest, via }
    }

    pub fn is_default(&self) -> bool {
        self.dest.prefix() == 0
    }
}

/// Routes owned by a network object, plus its default route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteTable {
    routes: Vec<Route>,
    default_route: Option<Route>,
}

impl RouteTable {
    pub fn add_route(&mut self, route: Route) {
        if !self.routes.contains(&route) {
            self.routes.push(route);
        }
    }

    pub fn remove_routes_via(&mut self, via: IpAddr) {
        self.routes.retain(|r| r.via != via);
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn default_route(&self) -> Option<Route> {
        self.default_route
    }

    pub fn set_default_route(&mut self, route: Option<Route>) {
        self.default_route = route;
    }

    /// Next hop for `dest_ip`: the most specific matching route, falling
    /// back to the default route. Ties keep the route added first.
    pub fn next_hop(&self, dest_ip: IpAddr) -> Option<IpAddr> {
        let mut best: Option<&Route> = None;
        let mut best_prefix: i16 = -1;

        for route in &self.routes {
            if !route.dest.contains(dest_ip) {
                continue;
            }
            let prefix = i16::from(route.dest.prefix());
            if prefix > best_prefix {
                best_prefix = prefix;
                best = Some(route);
            }
        }

        best.or(self.default_route.as_ref()).map(|r| r.via)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().expect("test: ip")
    }

    #[test]
    fn longest_prefix_wins() {
        let mut table = RouteTable::default();
        table.add_route(Route::parse("10.0.0.0/8", "192.168.0.1").expect("test: route"));
        table.add_route(Route::parse("10.1.0.0/16", "192.168.0.2").expect("test: route"));
        table.add_route(Route::parse("10.1.2.0/24", "192.168.0.3").expect("test: route"));

        assert_eq!(table.next_hop(ip("10.1.2.9")), Some(ip("192.168.0.3")));
        assert_eq!(table.next_hop(ip("10.1.9.9")), Some(ip("192.168.0.2")));
        assert_eq!(table.next_hop(ip("10.200.0.1")), Some(ip("192.168.0.1")));
    }

    #[test]
    fn falls_back_to_default_route() {
        let mut table = RouteTable::default();
        table.add_route(Route::parse("10.0.0.0/24", "10.0.0.5").expect("test: route"));
        assert_eq!(table.next_hop(ip("8.8.8.8")), None);

        table.set_default_route(Some(Route::default_via(ip("10.0.0.1"))));
        assert_eq!(table.next_hop(ip("8.8.8.8")), Some(ip("10.0.0.1")));
    }

    #[test]
    fn default_route_matches_family() {
        let v4 = Route::default_via(ip("10.0.0.1"));
        assert!(v4.is_default());
        assert!(v4.dest.contains(ip("203.0.113.7")));

        let v6 = Route::default_via(ip("fd00::1"));
        assert!(v6.is_default());
        assert!(v6.dest.contains(ip("2001:db8::9")));
    }

    #[test]
    fn bad_route_strings_are_rejected() {
        assert!(matches!(Route::parse("10.0.0.0/33", "10.0.0.1"), Err(NetworkError::InvalidAddress(_))));
        assert!(matches!(Route::parse("10.0.0.0/24", "nope"), Err(NetworkError::InvalidAddress(_))));
    }

    #[test]
    fn duplicate_routes_are_ignored() {
        let mut table = RouteTable::default();
        let r = Route::parse("10.0.0.0/24", "10.0.0.5").expect("test: route");
        table.add_route(r);
        table.add_route(r);
        assert_eq!(table.routes().len(), 1);
    }
}
