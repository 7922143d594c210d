// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Discrete Action Space

//! Flattens the action catalog into one integer range. Each entry reserves a
//! contiguous block of indices; an index decodes to (entry, target).

use serde::{Deserialize, Serialize};

use super::action::{ActionTarget, TargetKind};
use crate::error::ConfigError;
use crate::network::Network;

#[derive(Debug, thiserror::Error)]
pub enum ActionSpaceError {
    #[error("action index {index} is outside the action space of size {size}")]
    IndexOutOfRange { index: i64, size: usize },

    #[error("malformed action index '{0}'")]
    InvalidIndex(String),
}

/// `action_space_args` of one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpaceArgs {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    #[serde(default)]
    pub range: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RangeChecker {
    name: String,
    kind: TargetKind,
    lower: usize,
    upper: usize,
}

impl RangeChecker {
    fn contains(&self, index: usize) -> bool {
        self.lower <= index && index < self.upper
    }
}

/// A decoded index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Position of the entry in declaration order.
    pub slot: usize,
    pub name: String,
    pub target: ActionTarget,
}

#[derive(Debug, Clone, Default)]
pub struct DiscreteActionSpace {
    size: usize,
    checkers: Vec<RangeChecker>,
    hosts: Vec<String>,
    subnets: Vec<String>,
}

impl DiscreteActionSpace {
    /// Snapshot the host and subnet lists that host/subnet entries index into.
    pub fn new(network: &Network) -> Self {
        Self {
            size: 0,
            checkers: Vec::new(),
            hosts: network.host_names(),
            subnets: network.subnet_names(),
        }
    }

    pub fn num_hosts(&self) -> usize {
        self.hosts.len()
    }

    pub fn num_subnets(&self) -> usize {
        self.subnets.len()
    }

    /// Reserve the next block of indices for `name`.
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] for a non-positive range, or a
    /// host/subnet block over an empty list.
    pub fn add_action(&mut self, name: &str, args: ActionSpaceArgs) -> Result<(), ConfigError> {
        let width = match args.kind {
            TargetKind::Standalone => 1,
            TargetKind::Host => self.num_hosts(),
            TargetKind::Subnet => self.num_subnets(),
            TargetKind::Range => {
                let range = args.range.unwrap_or(0);
                usize::try_from(range).ok().filter(|r| *r > 0).ok_or_else(|| ConfigError::InvalidValue {
                    key: format!("{name}.action_space_args.range"),
                    reason: format!("must be > 0, got {range}"),
                })?
            }
        };
        if width == 0 {
            return Err(ConfigError::InvalidValue {
                key: format!("{name}.action_space_args.type"),
                reason: format!("no {} targets in the network", args.kind),
            });
        }
        let lower = self.size;
        self.size += width;
        self.checkers.push(RangeChecker {
            name: name.to_string(),
            kind: args.kind,
            lower,
            upper: self.size,
        });
        Ok(())
    }

    /// # Errors
    /// [`ActionSpaceError::IndexOutOfRange`] for an index outside every block.
    pub fn select_action(&self, index: i64) -> Result<Selection, ActionSpaceError> {
        let out_of_range = ActionSpaceError::IndexOutOfRange { index, size: self.size };
        let Ok(i) = usize::try_from(index) else {
            return Err(out_of_range);
        };
        let Some((slot, checker)) = self.checkers.iter().enumerate().find(|(_, c)| c.contains(i)) else {
            return Err(out_of_range);
        };
        let offset = i - checker.lower;
        let target = match checker.kind {
            TargetKind::Standalone => ActionTarget::None,
            TargetKind::Host => ActionTarget::Host(self.hosts[offset % self.hosts.len()].clone()),
            TargetKind::Subnet => ActionTarget::Subnet(self.subnets[offset % self.subnets.len()].clone()),
            TargetKind::Range => ActionTarget::Index(offset % (checker.upper - checker.lower)),
        };
        Ok(Selection {
            slot,
            name: checker.name.clone(),
            target,
        })
    }

    /// Parse a trainer-supplied index first.
    ///
    /// # Errors
    /// [`ActionSpaceError::InvalidIndex`] if `raw` is not an integer.
    pub fn select_action_str(&self, raw: &str) -> Result<Selection, ActionSpaceError> {
        let index = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ActionSpaceError::InvalidIndex(raw.to_string()))?;
        self.select_action(index)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn shape(&self) -> (usize,) {
        (self.size,)
    }
}
