// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Address Pools

//! Per-subnet address pool.
//!
//! The pool is the subnet's usable host range minus the addresses currently
//! leased. Leases are tracked explicitly so large IPv6 ranges never have to be
//! materialized.

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressPool {
    network: IpNetwork,
    leased: BTreeSet<IpAddr>,
}

impl AddressPool {
    pub fn new(network: IpNetwork) -> Self {
        Self {
            network,
            leased: BTreeSet::new(),
        }
    }

    pub fn network(&self) -> IpNetwork {
        self.network
    }

    /// First usable address (as an integer) and the number of usable addresses.
    fn bounds(&self) -> (u128, u128) {
        match self.network {
            IpNetwork::V4(n) => {
                let base = u32::from(n.network()) as u128;
                let size = 1u128 << (32 - u32::from(n.prefix()));
                if n.prefix() >= 31 {
                    (base, size)
                } else {
                    (base + 1, size - 2)
                }
            }
            IpNetwork::V6(n) => {
                let base = u128::from(n.network());
                let bits = 128 - u32::from(n.prefix());
                let size = 1u128.checked_shl(bits).unwrap_or(u128::MAX);
                if n.prefix() >= 127 {
                    (base, size)
                } else {
                    (base + 1, size - 1)
                }
            }
        }
    }

    fn addr_at(&self, offset: u128) -> IpAddr {
        let (start, _) = self.bounds();
        match self.network {
            IpNetwork::V4(_) => IpAddr::V4(Ipv4Addr::from((start + offset) as u32)),
            IpNetwork::V6(_) => IpAddr::V6(Ipv6Addr::from(start.wrapping_add(offset))),
        }
    }

    fn offset_of(&self, ip: IpAddr) -> Option<u128> {
        let (start, count) = self.bounds();
        let value = match (self.network, ip) {
            (IpNetwork::V4(_), IpAddr::V4(v4)) => u32::from(v4) as u128,
            (IpNetwork::V6(_), IpAddr::V6(v6)) => u128::from(v6),
            _ => return None,
        };
        let offset = value.checked_sub(start)?;
        (offset < count).then_some(offset)
    }

    /// Number of usable host addresses in the range.
    pub fn capacity(&self) -> u128 {
        self.bounds().1
    }

    pub fn available(&self) -> u128 {
        self.capacity() - self.leased.len() as u128
    }

    pub fn leased_count(&self) -> usize {
        self.leased.len()
    }

    pub fn is_leased(&self, ip: IpAddr) -> bool {
        self.leased.contains(&ip)
    }

    /// Whether `ip` falls in the usable range (leased or not).
    pub fn is_usable(&self, ip: IpAddr) -> bool {
        self.offset_of(ip).is_some()
    }

    /// Lease the lowest free address.
    pub fn lease_first(&mut self) -> Option<IpAddr> {
        let ip = self.first_free_from(0)?;
        self.leased.insert(ip);
        Some(ip)
    }

    /// Lease a uniformly chosen free address.
    pub fn lease_random(&mut self, rng: &mut impl Rng) -> Option<IpAddr> {
        if self.available() == 0 {
            return None;
        }
        let mut offset = rng.gen_range(0..self.available());
        // leased offsets in ascending order; each one at or below the
        // candidate pushes it one slot further
        for taken in self.leased.iter().filter_map(|ip| self.offset_of(*ip)) {
            if taken > offset {
                break;
            }
            offset += 1;
        }
        let ip = self.addr_at(offset);
        self.leased.insert(ip);
        Some(ip)
    }

    /// Lease a specific address. Fails if it is outside the range or taken.
    pub fn lease_specific(&mut self, ip: IpAddr) -> bool {
        if !self.is_usable(ip) {
            return false;
        }
        self.leased.insert(ip)
    }

    /// Return an address to the pool.
    pub fn release(&mut self, ip: IpAddr) -> bool {
        self.leased.remove(&ip)
    }

    /// Up to `limit` free addresses in ascending order.
    pub fn free_addresses(&self, limit: usize) -> Vec<IpAddr> {
        let (_, count) = self.bounds();
        let mut out = Vec::new();
        let mut offset = 0u128;
        while out.len() < limit && offset < count {
            let ip = self.addr_at(offset);
            if !self.leased.contains(&ip) {
                out.push(ip);
            }
            offset += 1;
        }
        out
    }

    fn first_free_from(&self, start: u128) -> Option<IpAddr> {
        if self.available() == 0 {
            return None;
        }
        let (_, count) = self.bounds();
        (start..count)
            .map(|offset| self.addr_at(offset))
            .find(|ip| !self.leased.contains(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::types::seeded_rng;

    fn pool(cidr: &str) -> AddressPool {
        AddressPool::new(cidr.parse().expect("test: cidr"))
    }

    #[test]
    fn ipv4_excludes_network_and_broadcast() {
        let p = pool("192.168.1.0/30");
        assert_eq!(p.capacity(), 2);
        assert!(!p.is_usable("192.168.1.0".parse().expect("test: ip")));
        assert!(p.is_usable("192.168.1.1".parse().expect("test: ip")));
        assert!(!p.is_usable("192.168.1.3".parse().expect("test: ip")));
    }

    #[test]
    fn point_to_point_ranges_use_every_address() {
        assert_eq!(pool("10.0.0.0/31").capacity(), 2);
        assert_eq!(pool("10.0.0.7/32").capacity(), 1);
        assert_eq!(pool("fd00::/127").capacity(), 2);
    }

    #[test]
    fn ipv6_skips_subnet_router_anycast() {
        let mut p = pool("fd00::/120");
        assert_eq!(p.capacity(), 255);
        let first = p.lease_first().expect("test: lease");
        assert_eq!(first, "fd00::1".parse::<IpAddr>().expect("test: ip"));
    }

    #[test]
    fn lease_first_is_lowest_free() {
        let mut p = pool("10.1.0.0/24");
        assert_eq!(p.lease_first(), Some("10.1.0.1".parse().expect("test: ip")));
        assert_eq!(p.lease_first(), Some("10.1.0.2".parse().expect("test: ip")));
        assert!(p.release("10.1.0.1".parse().expect("test: ip")));
        assert_eq!(p.lease_first(), Some("10.1.0.1".parse().expect("test: ip")));
    }

    #[test]
    fn random_leases_exhaust_small_pool_without_duplicates() {
        let mut rng = seeded_rng(11);
        let mut p = pool("10.2.0.0/29");
        let mut seen = BTreeSet::new();
        while let Some(ip) = p.lease_random(&mut rng) {
            assert!(seen.insert(ip), "duplicate lease {ip}");
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(p.available(), 0);
    }

    #[test]
    fn random_lease_is_uniform_over_free_addresses() {
        let mut rng = seeded_rng(17);
        let mut p = pool("10.0.0.0/29");
        for _ in 0..3 {
            p.lease_first().expect("test: lease");
        }
        let mut counts: BTreeMap<IpAddr, u32> = BTreeMap::new();
        for _ in 0..6000 {
            let ip = p.lease_random(&mut rng).expect("test: lease");
            *counts.entry(ip).or_default() += 1;
            assert!(p.release(ip));
        }
        // .4, .5 and .6 are free; each should land near 2000
        assert_eq!(counts.len(), 3);
        for (ip, n) in &counts {
            assert!((1700..=2300).contains(n), "{ip} drawn {n} times");
        }
        assert_eq!(p.leased_count(), 3);
    }

    #[test]
    fn random_lease_skips_scattered_leases() {
        let mut rng = seeded_rng(23);
        let mut p = pool("10.3.0.0/29");
        for last in [2u8, 4, 6] {
            assert!(p.lease_specific(IpAddr::V4(Ipv4Addr::new(10, 3, 0, last))));
        }
        let mut seen = BTreeSet::new();
        while let Some(ip) = p.lease_random(&mut rng) {
            seen.insert(ip);
        }
        let odd: BTreeSet<IpAddr> = [1u8, 3, 5].iter().map(|l| IpAddr::V4(Ipv4Addr::new(10, 3, 0, *l))).collect();
        assert_eq!(seen, odd);
    }

    #[test]
    fn available_plus_leased_is_capacity() {
        let mut rng = seeded_rng(3);
        let mut p = pool("172.16.0.0/26");
        let cap = p.capacity();
        let a = p.lease_random(&mut rng).expect("test: lease");
        let _b = p.lease_random(&mut rng).expect("test: lease");
        assert_eq!(p.available() + p.leased_count() as u128, cap);
        p.release(a);
        assert_eq!(p.available() + p.leased_count() as u128, cap);
    }

    #[test]
    fn lease_specific_rejects_out_of_range_and_taken() {
        let mut p = pool("10.9.0.0/24");
        let inside: IpAddr = "10.9.0.40".parse().expect("test: ip");
        assert!(p.lease_specific(inside));
        assert!(!p.lease_specific(inside));
        assert!(!p.lease_specific("10.8.0.40".parse().expect("test: ip")));
        assert_eq!(p.free_addresses(2).len(), 2);
    }
}
