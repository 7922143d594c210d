// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Alerts

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::network::{Host, Service};

/// What an alert knows about a host, captured when the alert is raised.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostRef {
    pub name: String,
    pub decoy: bool,
    pub isolated: bool,
}

impl HostRef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            decoy: false,
            isolated: false,
        }
    }
}

impl From<&Host> for HostRef {
    fn from(host: &Host) -> Self {
        Self {
            name: host.name.clone(),
            decoy: host.decoy,
            isolated: host.isolated,
        }
    }
}

/// A ground-truth attack event, or a detector's view of one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub src_host: Option<HostRef>,
    pub dst_hosts: Vec<HostRef>,
    pub services: Vec<Service>,
    pub techniques: BTreeSet<String>,
}

impl Alert {
    pub fn new(src_host: Option<HostRef>, dst_hosts: Vec<HostRef>) -> Self {
        Self {
            src_host,
            dst_hosts,
            ..Self::default()
        }
    }

    pub fn add_dst_host(&mut self, host: HostRef) {
        if !self.dst_hosts.contains(&host) {
            self.dst_hosts.push(host);
        }
    }

    pub fn add_service(&mut self, service: Service) {
        if !self.services.contains(&service) {
            self.services.push(service);
        }
    }

    pub fn add_technique(&mut self, mitre_id: &str) {
        self.techniques.insert(mitre_id.to_string());
    }

    /// Alert without a source or destination, as raised by an idle turn.
    pub fn is_empty(&self) -> bool {
        self.src_host.is_none() && self.dst_hosts.is_empty()
    }

    pub fn touches_decoy(&self) -> bool {
        self.dst_hosts.iter().any(|h| h.decoy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destinations_are_deduplicated() {
        let mut alert = Alert::new(Some(HostRef::new("h0")), vec![]);
        alert.add_dst_host(HostRef::new("s0"));
        alert.add_dst_host(HostRef::new("s0"));
        assert_eq!(alert.dst_hosts.len(), 1);
        assert!(!alert.is_empty());
        assert!(Alert::default().is_empty());
    }

    #[test]
    fn decoy_destination_is_visible() {
        let mut decoy = HostRef::new("bait");
        decoy.decoy = true;
        let alert = Alert::new(Some(HostRef::new("h0")), vec![HostRef::new("s0"), decoy]);
        assert!(alert.touches_decoy());
    }
}
