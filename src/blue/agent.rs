// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Dynamic Defender Agent

//! Defender built entirely from a declarative action catalog.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::action::{ActionContext, BlueAction, Recurring};
use super::action_space::{ActionSpaceArgs, DiscreteActionSpace};
use super::registry::{self, ActionDecl};
use super::shared::{SharedData, SharedDataDecl};
use crate::error::{ConfigError, SimError};
use crate::network::Network;
use crate::reward::{RewardMap, RewardPair};
use crate::types::SimRng;

const BUILTIN_CATALOG: &str = include_str!("../resources/blue_agent.yaml");

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEntry {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub configs: serde_yaml::Value,
    pub reward: RewardPair,
    pub action_space_args: ActionSpaceArgs,
    #[serde(default)]
    pub shared_data: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueAgentConfig {
    #[serde(default)]
    pub shared_data: Option<BTreeMap<String, SharedDataDecl>>,
    pub actions: Vec<ActionEntry>,
}

impl BlueAgentConfig {
    /// # Errors
    /// [`ConfigError::Yaml`] on malformed input.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// The catalog shipped with the crate.
    ///
    /// # Errors
    /// Only if the embedded YAML is broken.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlueAgentResult {
    pub name: String,
    pub id: String,
    pub success: bool,
    pub recurring: Recurring,
    pub target: Option<String>,
}

#[derive(Debug)]
pub struct DynamicBlueAgent {
    actions: Vec<Box<dyn BlueAction>>,
    space: DiscreteActionSpace,
    shared: BTreeMap<String, SharedData>,
    reward_map: RewardMap,
}

impl DynamicBlueAgent {
    /// Compile the catalog against `network`'s current hosts and subnets.
    ///
    /// # Errors
    /// Duplicate names, unknown classes, undeclared or mistyped shared data,
    /// target kinds that disagree with the class, bad ranges.
    pub fn from_config(config: &BlueAgentConfig, network: &Network) -> Result<Self, ConfigError> {
        let mut shared = BTreeMap::new();
        for (name, decl) in config.shared_data.iter().flatten() {
            shared.insert(name.clone(), decl.build()?);
        }

        let mut space = DiscreteActionSpace::new(network);
        let mut actions = Vec::with_capacity(config.actions.len());
        let mut reward_map = RewardMap::new();
        let mut seen = BTreeSet::new();

        for entry in &config.actions {
            if !seen.insert(entry.name.as_str()) {
                return Err(ConfigError::DuplicateAction(entry.name.clone()));
            }
            let class = registry::lookup(&entry.class)?;
            if class.target != entry.action_space_args.kind {
                return Err(ConfigError::InvalidValue {
                    key: format!("{}.action_space_args.type", entry.name),
                    reason: format!("{} targets a {}, not a {}", entry.class, class.target, entry.action_space_args.kind),
                });
            }

            let mut deps = BTreeMap::new();
            for dep in &entry.shared_data {
                let data = shared.get(dep).ok_or_else(|| ConfigError::UnknownSharedData {
                    action: entry.name.clone(),
                    name: dep.clone(),
                })?;
                deps.insert(dep.clone(), data.clone());
            }
            let decl = ActionDecl {
                name: &entry.name,
                configs: &entry.configs,
                shared: &deps,
            };
            actions.push(class.build(&decl)?);
            space.add_action(&entry.name, entry.action_space_args)?;
            reward_map.insert(entry.name.clone(), entry.reward);
        }

        info!(actions = actions.len(), size = space.size(), "defender action space built");
        Ok(Self {
            actions,
            space,
            shared,
            reward_map,
        })
    }

    /// # Errors
    /// As [`DynamicBlueAgent::from_config`].
    pub fn builtin(network: &Network) -> Result<Self, ConfigError> {
        Self::from_config(&BlueAgentConfig::builtin()?, network)
    }

    /// Decode `index` and run the selected action.
    ///
    /// # Errors
    /// [`SimError::ActionSpace`] for a bad index, [`SimError::Action`] when
    /// the action itself faults.
    pub fn act(&mut self, index: i64, network: &mut Network, rng: &mut SimRng) -> Result<BlueAgentResult, SimError> {
        let selection = self.space.select_action(index)?;
        let target_name = selection.target.name().map(str::to_string);
        let Some(action) = self.actions.get_mut(selection.slot) else {
            return Err(SimError::ActionSpace(super::ActionSpaceError::IndexOutOfRange {
                index,
                size: self.space.size(),
            }));
        };
        let mut ctx = ActionContext { network, rng };
        let out = action.execute(&mut ctx, &selection.target)?;
        debug!(action = %selection.name, target = ?target_name, success = out.success, "defender acted");
        Ok(BlueAgentResult {
            name: selection.name,
            id: out.id,
            success: out.success,
            recurring: out.recurring,
            target: target_name,
        })
    }

    /// Name of the action an index decodes to, if any.
    pub fn action_name(&self, index: i64) -> Option<String> {
        self.space.select_action(index).ok().map(|s| s.name)
    }

    pub fn reward_map(&self) -> &RewardMap {
        &self.reward_map
    }

    pub fn action_space(&self) -> &DiscreteActionSpace {
        &self.space
    }

    pub fn action_space_size(&self) -> usize {
        self.space.size()
    }

    pub fn shared_data(&self, name: &str) -> Option<&SharedData> {
        self.shared.get(name)
    }

    /// Empty every shared container.
    pub fn reset(&mut self) {
        for data in self.shared.values() {
            data.borrow_mut().clear();
        }
    }
}
