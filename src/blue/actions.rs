// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Reference Defender Actions

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::action::{
    expect_host, expect_index, expect_subnet, generate_id, ActionContext, ActionError, ActionTarget, BlueAction,
    BlueActionReturn, Recurring, TargetKind,
};
use super::shared::{IsolateData, SharedContainer, SharedData, DEFAULT_ISOLATE_SIZE};
use crate::network::{HostType, Network, NetworkError, ServiceConfig};

// ---------------------------------------------------------------------------
// Decoy host definition
// ---------------------------------------------------------------------------

/// `configs` block of the decoy-deploying actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoyConfig {
    #[serde(default = "default_decoy_type")]
    pub decoy_type: String,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub cve_list: Vec<String>,
}

fn default_decoy_type() -> String {
    "workstation".to_string()
}

impl Default for DecoyConfig {
    fn default() -> Self {
        Self {
            decoy_type: default_decoy_type(),
            os: None,
            services: Vec::new(),
            cve_list: Vec::new(),
        }
    }
}

impl DecoyConfig {
    /// `Server` or `Workstation`, carrying the configured services.
    ///
    /// # Errors
    /// Service validation errors.
    pub fn host_type(&self) -> Result<HostType, NetworkError> {
        let is_server = self.decoy_type.to_ascii_lowercase().contains("server");
        let name = if is_server { "Server" } else { "Workstation" };
        let os = self.os.as_deref().unwrap_or(if is_server { "linux" } else { "windows" });
        let mut host_type = HostType::new(name, os).with_cves(self.cve_list.iter().cloned());
        for svc in &self.services {
            host_type = host_type.with_service(svc.build()?);
        }
        Ok(host_type.as_decoy())
    }
}

fn private_list() -> SharedData {
    Rc::new(RefCell::new(SharedContainer::List(Vec::new())))
}

/// A subnet with no free address cannot take another decoy.
fn subnet_full(network: &Network, subnet: &str) -> Result<bool, ActionError> {
    Ok(network.require_subnet(subnet)?.available_ips() == 0)
}

// ---------------------------------------------------------------------------
// Decoys
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DeployDecoyHost {
    host_type: HostType,
    decoy_list: SharedData,
}

impl DeployDecoyHost {
    pub fn new(host_type: HostType, decoy_list: Option<SharedData>) -> Self {
        Self {
            host_type,
            decoy_list: decoy_list.unwrap_or_else(private_list),
        }
    }
}

impl BlueAction for DeployDecoyHost {
    fn class(&self) -> &'static str {
        "DeployDecoyHost"
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Subnet
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>, target: &ActionTarget) -> Result<BlueActionReturn, ActionError> {
        let subnet = expect_subnet(self, target)?;
        if subnet_full(ctx.network, subnet)? {
            debug!(subnet, "no address left for a decoy");
            return Ok(BlueActionReturn::failed());
        }
        let name = generate_id(ctx.rng);
        ctx.network.create_decoy(&name, subnet, self.host_type.clone(), ctx.rng)?;
        self.decoy_list.borrow_mut().insert(&name);
        debug!(decoy = %name, subnet, "decoy deployed");
        Ok(BlueActionReturn::new(name, true, Recurring::Start))
    }
}

#[derive(Debug, Default)]
pub struct RemoveDecoyHost {
    decoy_list: Option<SharedData>,
}

impl RemoveDecoyHost {
    pub fn new(decoy_list: Option<SharedData>) -> Self {
        Self { decoy_list }
    }
}

impl BlueAction for RemoveDecoyHost {
    fn class(&self) -> &'static str {
        "RemoveDecoyHost"
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Subnet
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>, target: &ActionTarget) -> Result<BlueActionReturn, ActionError> {
        let subnet = expect_subnet(self, target)?;
        ctx.network.require_subnet(subnet)?;
        let first_decoy = ctx
            .network
            .hosts_on_subnet(subnet)
            .into_iter()
            .find(|h| h.decoy)
            .map(|h| h.name.clone());
        let Some(name) = first_decoy else {
            return Ok(BlueActionReturn::new("", false, Recurring::Stop));
        };
        ctx.network.remove_decoy(&name)?;
        if let Some(list) = &self.decoy_list {
            list.borrow_mut().remove(&name);
        }
        debug!(decoy = %name, subnet, "decoy removed");
        Ok(BlueActionReturn::new(name, true, Recurring::Stop))
    }
}

/// Deploys a decoy and queues it for a later [`IsolateDecoy`].
#[derive(Debug)]
pub struct IsolateDecoyHost {
    host_type: HostType,
    isolate_data: SharedData,
}

impl IsolateDecoyHost {
    pub fn new(host_type: HostType, isolate_data: Option<SharedData>) -> Self {
        Self {
            host_type,
            isolate_data: isolate_data
                .unwrap_or_else(|| Rc::new(RefCell::new(SharedContainer::Isolate(IsolateData::new(DEFAULT_ISOLATE_SIZE))))),
        }
    }
}

impl BlueAction for IsolateDecoyHost {
    fn class(&self) -> &'static str {
        "IsolateDecoyHost"
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Subnet
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>, target: &ActionTarget) -> Result<BlueActionReturn, ActionError> {
        let subnet = expect_subnet(self, target)?;
        let mut shared = self.isolate_data.borrow_mut();
        let data = shared.as_isolate_mut().ok_or_else(|| ActionError::WrongSharedData {
            name: "isolate_data".to_string(),
            expected: "IsolateData",
        })?;
        if data.len() >= data.size || subnet_full(ctx.network, subnet)? {
            return Ok(BlueActionReturn::failed());
        }
        let name = generate_id(ctx.rng);
        ctx.network.create_decoy(&name, subnet, self.host_type.clone(), ctx.rng)?;
        data.append_decoy(&name, subnet);
        Ok(BlueActionReturn::new(name, true, Recurring::Start))
    }
}

#[derive(Debug)]
pub struct IsolateDecoy {
    isolate_data: SharedData,
}

impl IsolateDecoy {
    pub fn new(isolate_data: SharedData) -> Self {
        Self { isolate_data }
    }
}

impl BlueAction for IsolateDecoy {
    fn class(&self) -> &'static str {
        "IsolateDecoy"
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Range
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>, target: &ActionTarget) -> Result<BlueActionReturn, ActionError> {
        let i = expect_index(self, target)?;
        let shared = self.isolate_data.borrow();
        let data = shared.as_isolate().ok_or_else(|| ActionError::WrongSharedData {
            name: "isolate_data".to_string(),
            expected: "IsolateData",
        })?;
        let Some((decoy, _)) = data.get(i) else {
            return Ok(BlueActionReturn::failed());
        };
        // The decoy may have been torn down since it was queued.
        let isolatable = ctx.network.host(decoy).is_some_and(|h| !h.isolated);
        if !isolatable {
            return Ok(BlueActionReturn::failed());
        }
        ctx.network.isolate(decoy)?;
        Ok(BlueActionReturn::succeeded())
    }
}

// ---------------------------------------------------------------------------
// Isolation
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct IsolateHost;

impl BlueAction for IsolateHost {
    fn class(&self) -> &'static str {
        "IsolateHost"
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Host
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>, target: &ActionTarget) -> Result<BlueActionReturn, ActionError> {
        let host = expect_host(self, target)?;
        if ctx.network.require_host(host)?.isolated {
            return Ok(BlueActionReturn::failed());
        }
        ctx.network.isolate(host)?;
        Ok(BlueActionReturn::succeeded())
    }
}

#[derive(Debug, Default)]
pub struct ReconnectHost;

impl BlueAction for ReconnectHost {
    fn class(&self) -> &'static str {
        "ReconnectHost"
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Host
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>, target: &ActionTarget) -> Result<BlueActionReturn, ActionError> {
        let host = expect_host(self, target)?;
        if !ctx.network.require_host(host)?.isolated {
            return Ok(BlueActionReturn::failed());
        }
        ctx.network.reconnect(host)?;
        Ok(BlueActionReturn::succeeded())
    }
}

#[derive(Debug)]
pub struct QuarantineHost {
    quarantine_list: SharedData,
}

impl QuarantineHost {
    pub fn new(quarantine_list: Option<SharedData>) -> Self {
        Self {
            quarantine_list: quarantine_list.unwrap_or_else(private_list),
        }
    }
}

impl BlueAction for QuarantineHost {
    fn class(&self) -> &'static str {
        "QuarantineHost"
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Host
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>, target: &ActionTarget) -> Result<BlueActionReturn, ActionError> {
        let host = expect_host(self, target)?;
        let isolated = ctx.network.require_host(host)?.isolated;
        if isolated || self.quarantine_list.borrow().contains(host) {
            return Ok(BlueActionReturn::failed());
        }
        ctx.network.isolate(host)?;
        self.quarantine_list.borrow_mut().insert(host);
        Ok(BlueActionReturn::succeeded())
    }
}

#[derive(Debug)]
pub struct RemoveQuarantineHost {
    quarantine_list: SharedData,
}

impl RemoveQuarantineHost {
    pub fn new(quarantine_list: Option<SharedData>) -> Self {
        Self {
            quarantine_list: quarantine_list.unwrap_or_else(private_list),
        }
    }
}

impl BlueAction for RemoveQuarantineHost {
    fn class(&self) -> &'static str {
        "RemoveQuarantineHost"
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Host
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>, target: &ActionTarget) -> Result<BlueActionReturn, ActionError> {
        let host = expect_host(self, target)?;
        ctx.network.require_host(host)?;
        if !self.quarantine_list.borrow().contains(host) {
            return Ok(BlueActionReturn::failed());
        }
        ctx.network.reconnect(host)?;
        self.quarantine_list.borrow_mut().remove(host);
        Ok(BlueActionReturn::succeeded())
    }
}

// ---------------------------------------------------------------------------
// Restore / Nothing
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Restore;

impl BlueAction for Restore {
    fn class(&self) -> &'static str {
        "Restore"
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Host
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>, target: &ActionTarget) -> Result<BlueActionReturn, ActionError> {
        let name = expect_host(self, target)?;
        let host = ctx
            .network
            .host_mut(name)
            .ok_or_else(|| NetworkError::UnknownNode(name.to_string()))?;
        if host.restored {
            return Ok(BlueActionReturn::failed());
        }
        let killed = host.kill_malicious_processes();
        host.restored = true;
        debug!(host = name, killed, "host restored");
        Ok(BlueActionReturn::succeeded())
    }
}

#[derive(Debug, Default)]
pub struct Nothing;

impl BlueAction for Nothing {
    fn class(&self) -> &'static str {
        "Nothing"
    }

    fn target_kind(&self) -> TargetKind {
        TargetKind::Standalone
    }

    fn execute(&mut self, ctx: &mut ActionContext<'_>, _target: &ActionTarget) -> Result<BlueActionReturn, ActionError> {
        Ok(BlueActionReturn::new(generate_id(ctx.rng), true, Recurring::Keep))
    }
}
