// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Reward Accounting

//! Immediate plus recurring rewards, kept in `Decimal`.
//!
//! A recurring entry is a standing contribution tied to an id (a decoy, an
//! impacted host). It is added to every step's reward from the step it
//! starts in until it is stopped.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::steps_to_decimal;
use crate::blue::Recurring;
use crate::error::ConfigError;
use crate::red::KillChainPhase;

// ---------------------------------------------------------------------------
// Reward tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RewardPair {
    pub immediate: Decimal,
    #[serde(default)]
    pub recurring: Decimal,
}

impl RewardPair {
    pub fn new(immediate: Decimal, recurring: Decimal) -> Self {
        Self { immediate, recurring }
    }
}

/// (immediate, recurring) per action name.
pub type RewardMap = BTreeMap<String, RewardPair>;

/// Reward tables as configuration. Entries override the strategy's and the
/// action catalog's defaults key by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default)]
    pub red: RewardMap,
    #[serde(default)]
    pub blue: RewardMap,
    /// Applied to the red immediate value when the target was a decoy.
    #[serde(default = "default_decoy_multiplier")]
    pub decoy_multiplier: Decimal,
    /// Blue immediate value for an unsuccessful defender action.
    #[serde(default)]
    pub failure_penalty: Decimal,
}

fn default_decoy_multiplier() -> Decimal {
    dec!(-1)
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            red: RewardMap::new(),
            blue: RewardMap::new(),
            decoy_multiplier: default_decoy_multiplier(),
            failure_penalty: Decimal::ZERO,
        }
    }
}

impl RewardConfig {
    /// # Errors
    /// [`ConfigError::Yaml`] on malformed input.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    fn merged(defaults: RewardMap, overrides: &RewardMap) -> RewardMap {
        let mut map = defaults;
        map.extend(overrides.iter().map(|(k, v)| (k.clone(), *v)));
        map
    }
}

// ---------------------------------------------------------------------------
// Turn outcome
// ---------------------------------------------------------------------------

/// Both actors' results for one step, as reward accounting sees them.
#[derive(Debug, Clone, Copy)]
pub struct TurnOutcome<'a> {
    pub red_action: Option<&'a str>,
    pub red_target: Option<&'a str>,
    pub red_success: bool,
    pub red_hit_decoy: bool,
    pub blue_action: &'a str,
    pub blue_id: &'a str,
    pub blue_success: bool,
    pub blue_recurring: Recurring,
    pub current_step: u64,
}

pub trait RewardCalculator: std::fmt::Debug {
    /// Book the turn and return its scalar reward.
    fn calculate_reward(&mut self, outcome: &TurnOutcome<'_>) -> Decimal;

    fn reset(&mut self);
}

fn blue_immediate(blue: &RewardMap, failure_penalty: Decimal, outcome: &TurnOutcome<'_>) -> Decimal {
    if outcome.blue_success {
        blue.get(outcome.blue_action).map_or(Decimal::ZERO, |p| p.immediate)
    } else {
        failure_penalty
    }
}

// ---------------------------------------------------------------------------
// RecurringReward
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecurringReward {
    red_rewards: RewardMap,
    blue_rewards: RewardMap,
    decoy_multiplier: Decimal,
    failure_penalty: Decimal,
    red_recurring: BTreeMap<String, Decimal>,
    blue_recurring: BTreeMap<String, Decimal>,
}

impl RecurringReward {
    pub fn new(red_rewards: RewardMap, blue_rewards: RewardMap, config: &RewardConfig) -> Self {
        Self {
            red_rewards: RewardConfig::merged(red_rewards, &config.red),
            blue_rewards: RewardConfig::merged(blue_rewards, &config.blue),
            decoy_multiplier: config.decoy_multiplier,
            failure_penalty: config.failure_penalty,
            red_recurring: BTreeMap::new(),
            blue_recurring: BTreeMap::new(),
        }
    }

    /// Start, stop or keep the standing reward tied to `id`.
    pub fn handle_blue_action_output(&mut self, name: &str, id: &str, success: bool, recurring: Recurring) {
        if !success {
            return;
        }
        match recurring {
            Recurring::Start => {
                let value = self.blue_rewards.get(name).map_or(Decimal::ZERO, |p| p.recurring);
                self.blue_recurring.insert(id.to_string(), value);
            }
            Recurring::Stop => {
                self.blue_recurring.remove(id);
            }
            Recurring::Keep => {}
        }
    }

    /// A successful impact on a real host starts a standing red penalty.
    pub fn handle_red_action_output(&mut self, name: Option<&str>, target: Option<&str>, success: bool, decoy: bool) {
        let (Some(name), Some(target)) = (name, target) else {
            return;
        };
        if success && !decoy && name == KillChainPhase::Impact.name() {
            let value = self.red_rewards.get(name).map_or(Decimal::ZERO, |p| p.recurring);
            self.red_recurring.insert(target.to_string(), value);
        }
    }

    fn red_immediate(&self, outcome: &TurnOutcome<'_>) -> Decimal {
        let Some(name) = outcome.red_action.filter(|_| outcome.red_success) else {
            return Decimal::ZERO;
        };
        let base = self.red_rewards.get(name).map_or(Decimal::ZERO, |p| p.immediate);
        if outcome.red_hit_decoy {
            base * self.decoy_multiplier
        } else {
            base
        }
    }

    pub fn recurring_total(&self) -> Decimal {
        self.red_recurring.values().chain(self.blue_recurring.values()).copied().sum()
    }

    pub fn active_blue_ids(&self) -> impl Iterator<Item = &str> {
        self.blue_recurring.keys().map(String::as_str)
    }

    pub fn blue_rewards(&self) -> &RewardMap {
        &self.blue_rewards
    }
}

impl RewardCalculator for RecurringReward {
    fn calculate_reward(&mut self, outcome: &TurnOutcome<'_>) -> Decimal {
        self.handle_blue_action_output(
            outcome.blue_action,
            outcome.blue_id,
            outcome.blue_success,
            outcome.blue_recurring,
        );
        self.handle_red_action_output(
            outcome.red_action,
            outcome.red_target,
            outcome.red_success,
            outcome.red_hit_decoy,
        );
        let red = self.red_immediate(outcome);
        let blue = blue_immediate(&self.blue_rewards, self.failure_penalty, outcome);
        let recurring = self.recurring_total();
        debug!(%red, %blue, %recurring, "reward booked");
        red + blue + recurring
    }

    fn reset(&mut self) {
        self.red_recurring.clear();
        self.blue_recurring.clear();
    }
}

// ---------------------------------------------------------------------------
// StepDetectedReward
// ---------------------------------------------------------------------------

/// Rewards catching the attacker on a decoy early: the sooner, the larger.
#[derive(Debug, Clone)]
pub struct StepDetectedReward {
    blue_rewards: RewardMap,
    max_steps: u64,
    failure_penalty: Decimal,
}

impl StepDetectedReward {
    pub fn new(blue_rewards: RewardMap, max_steps: u64, config: &RewardConfig) -> Self {
        Self {
            blue_rewards: RewardConfig::merged(blue_rewards, &config.blue),
            max_steps,
            failure_penalty: config.failure_penalty,
        }
    }
}

impl RewardCalculator for StepDetectedReward {
    fn calculate_reward(&mut self, outcome: &TurnOutcome<'_>) -> Decimal {
        if outcome.red_hit_decoy {
            steps_to_decimal(self.max_steps) - steps_to_decimal(outcome.current_step)
        } else {
            blue_immediate(&self.blue_rewards, self.failure_penalty, outcome)
        }
    }

    fn reset(&mut self) {}
}

// ---------------------------------------------------------------------------
// Selection by name
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardFunction {
    #[default]
    Recurring,
    StepDetected,
}

impl std::str::FromStr for RewardFunction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recurring" | "default" => Ok(RewardFunction::Recurring),
            "step_detected" => Ok(RewardFunction::StepDetected),
            other => Err(ConfigError::InvalidValue {
                key: "reward_function".to_string(),
                reason: format!("unknown reward function '{other}'"),
            }),
        }
    }
}
