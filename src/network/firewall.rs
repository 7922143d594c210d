// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Firewall Rules

//! Inbound firewall rules and their evaluation.
//!
//! A rule list guards traffic *into* the object that owns it. The most
//! specific applicable rule decides; an object with no rule list at all lets
//! everything through, while a defined list with no applicable rule denies.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::NetworkError;
use crate::types::Protocol;

pub const MAX_PORT: u32 = 65_535;

// Source specificity ranks. Port and protocol each add one bit below these.
const SRC_EXACT: u8 = 3;
const SRC_SUBNET: u8 = 2;
const SRC_ROUTER: u8 = 1;
const SRC_ANY: u8 = 0;

// ─── Selectors ───────────────────────────────────────────────────────────────

/// `all` or a single validated port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSelector", into = "String")]
pub enum PortSelector {
    #[default]
    All,
    Port(u16),
}

impl PortSelector {
    /// # Errors
    /// [`NetworkError::InvalidPort`] outside `1..=65535`.
    pub fn number(port: u32) -> Result<Self, NetworkError> {
        if (1..=MAX_PORT).contains(&port) {
            Ok(PortSelector::Port(port as u16))
        } else {
            Err(NetworkError::InvalidPort(port.to_string()))
        }
    }

    /// Accepts `all` (any case) or a decimal port number.
    ///
    /// # Errors
    /// [`NetworkError::InvalidPort`] for anything else.
    pub fn parse(s: &str) -> Result<Self, NetworkError> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(PortSelector::All);
        }
        let port: u32 = trimmed
            .parse()
            .map_err(|_| NetworkError::InvalidPort(s.to_string()))?;
        Self::number(port)
    }
}

impl fmt::Display for PortSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSelector::All => f.write_str("all"),
            PortSelector::Port(p) => write!(f, "{p}"),
        }
    }
}

impl From<PortSelector> for String {
    fn from(p: PortSelector) -> Self {
        p.to_string()
    }
}

/// `all` or a single protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSelector", into = "String")]
pub enum ProtoSelector {
    #[default]
    All,
    Proto(Protocol),
}

impl ProtoSelector {
    /// # Errors
    /// [`NetworkError::InvalidProtocol`] for anything but `all`/tcp/udp/icmp.
    pub fn parse(s: &str) -> Result<Self, NetworkError> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(ProtoSelector::All)
        } else {
            Ok(ProtoSelector::Proto(s.parse()?))
        }
    }
}

impl fmt::Display for ProtoSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtoSelector::All => f.write_str("all"),
            ProtoSelector::Proto(p) => write!(f, "{p}"),
        }
    }
}

impl From<ProtoSelector> for String {
    fn from(p: ProtoSelector) -> Self {
        p.to_string()
    }
}

/// YAML lets ports be written bare (`22`) or quoted (`"all"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelector {
    Number(u32),
    Text(String),
}

impl TryFrom<RawSelector> for PortSelector {
    type Error = NetworkError;

    fn try_from(raw: RawSelector) -> Result<Self, Self::Error> {
        match raw {
            RawSelector::Number(n) => PortSelector::number(n),
            RawSelector::Text(s) => PortSelector::parse(&s),
        }
    }
}

impl TryFrom<RawSelector> for ProtoSelector {
    type Error = NetworkError;

    fn try_from(raw: RawSelector) -> Result<Self, Self::Error> {
        match raw {
            RawSelector::Number(n) => Err(NetworkError::InvalidProtocol(n.to_string())),
            RawSelector::Text(s) => ProtoSelector::parse(&s),
        }
    }
}

// ─── FirewallRule ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    #[default]
    Allow,
    Deny,
}

fn default_rule_name() -> String {
    "allow all".to_string()
}

fn default_src() -> String {
    "all".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRule {
    #[serde(default = "default_rule_name")]
    pub name: String,
    /// Node name, subnet name, router name or `all`.
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default)]
    pub port: PortSelector,
    #[serde(default)]
    pub proto: ProtoSelector,
    #[serde(default)]
    pub action: RuleAction,
    #[serde(default)]
    pub desc: Option<String>,
}

impl Default for FirewallRule {
    fn default() -> Self {
        Self {
            name: default_rule_name(),
            src: default_src(),
            port: PortSelector::All,
            proto: ProtoSelector::All,
            action: RuleAction::Allow,
            desc: None,
        }
    }
}

impl FirewallRule {
    pub fn allow(name: &str, src: &str, port: PortSelector, proto: ProtoSelector) -> Self {
        Self {
            name: name.to_string(),
            src: src.to_string(),
            port,
            proto,
            action: RuleAction::Allow,
            desc: None,
        }
    }

    pub fn deny(name: &str, src: &str, port: PortSelector, proto: ProtoSelector) -> Self {
        Self {
            action: RuleAction::Deny,
            ..Self::allow(name, src, port, proto)
        }
    }

    /// Specificity of this rule for the given traffic, or `None` if the rule
    /// does not apply.
    fn specificity(&self, src: &TrafficSource<'_>, port: PortSelector, proto: Protocol) -> Option<u8> {
        let src_rank = if self.src == src.name {
            SRC_EXACT
        } else if src.subnet == Some(self.src.as_str()) {
            SRC_SUBNET
        } else if src.router == Some(self.src.as_str()) {
            SRC_ROUTER
        } else if self.src.eq_ignore_ascii_case("all") {
            SRC_ANY
        } else {
            return None;
        };

        // ICMP is layer 3: the port selector never excludes it
        let port_rank = match (proto, self.port) {
            (Protocol::Icmp, _) => 0,
            (_, PortSelector::All) => 0,
            (_, rule_port) if rule_port == port => 1,
            _ => return None,
        };

        let proto_rank = match self.proto {
            ProtoSelector::All => 0,
            ProtoSelector::Proto(p) if p == proto => 1,
            ProtoSelector::Proto(_) => return None,
        };

        Some(src_rank * 4 + port_rank * 2 + proto_rank)
    }
}

/// Who the traffic comes from, with the names a rule's `src` can match.
#[derive(Debug, Clone, Copy)]
pub struct TrafficSource<'a> {
    pub name: &'a str,
    pub subnet: Option<&'a str>,
    pub router: Option<&'a str>,
}

/// Decide one object's verdict. Deterministic: no randomness, ties resolved
/// by rule order.
pub fn evaluate(
    rules: Option<&[FirewallRule]>,
    src: &TrafficSource<'_>,
    port: PortSelector,
    proto: Protocol,
) -> bool {
    let Some(rules) = rules else {
        return true;
    };

    let mut best: Option<&FirewallRule> = None;
    let mut best_score: i16 = -1;

    for rule in rules {
        if let Some(score) = rule.specificity(src, port, proto) {
            if i16::from(score) > best_score {
                best_score = i16::from(score);
                best = Some(rule);
            }
        }
    }

    matches!(best, Some(rule) if rule.action == RuleAction::Allow)
}
