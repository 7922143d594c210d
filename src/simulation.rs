// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cyberwheel Simulation Core - Environment

//! Turn-based environment driven by an external trainer. Each `step` runs
//! one defender action, then one attacker action, then pushes the attacker's
//! alert through the detector graph and books the reward.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::adapter::reward_to_f64;
use crate::blue::{BlueAgentConfig, BlueAgentResult, DynamicBlueAgent, Recurring};
use crate::detectors::{DetectorGraphConfig, DetectorHandler};
use crate::error::{ConfigError, SimError};
use crate::network::Network;
use crate::observation::HistoryObservation;
use crate::red::{AgentHistory, ArtAgent, KillChainPhase, StrategyKind, TechniqueCatalog, PING_SWEEP_TECHNIQUE, PORT_SCAN_TECHNIQUE};
use crate::reward::{RecurringReward, RewardCalculator, RewardConfig, RewardFunction, StepDetectedReward, TurnOutcome};
use crate::types::{seeded_rng, SimRng, DEFAULT_SEED};

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_max_steps() -> u64 {
    100
}

fn default_detector() -> String {
    "perfect".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
    #[serde(default)]
    pub reward_function: RewardFunction,
    #[serde(default)]
    pub strategy: StrategyKind,
    /// Attach a [`StepInfo`] to every step.
    #[serde(default)]
    pub evaluation: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Kill chain proper. Empty or absent means the default three phases.
    #[serde(default)]
    pub kill_chain: Option<Vec<KillChainPhase>>,
    /// Name of a built-in detector graph.
    #[serde(default = "default_detector")]
    pub detector: String,
    #[serde(default)]
    pub rewards: RewardConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            reward_function: RewardFunction::default(),
            strategy: StrategyKind::default(),
            evaluation: false,
            seed: None,
            kill_chain: None,
            detector: default_detector(),
            rewards: RewardConfig::default(),
        }
    }
}

impl EnvConfig {
    /// # Errors
    /// [`ConfigError::Yaml`] on malformed input.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

/// Optional overrides for the built-in catalogs.
#[derive(Debug, Clone, Default)]
pub struct Components {
    pub blue: Option<BlueAgentConfig>,
    pub detector: Option<DetectorGraphConfig>,
    pub techniques: Option<TechniqueCatalog>,
}

// ─── Step output ─────────────────────────────────────────────────────────────

/// Evaluation record of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub step: u64,
    pub red_action: Option<String>,
    pub red_action_src: String,
    pub red_action_dst: Option<String>,
    pub red_action_success: bool,
    pub blue_action: String,
    pub blue_target: Option<String>,
    pub blue_action_success: bool,
    pub kill_chain: Vec<KillChainPhase>,
}

impl StepInfo {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub observation: Vec<f32>,
    pub reward: f64,
    pub done: bool,
    pub truncated: bool,
    pub info: Option<StepInfo>,
}

// ─── Simulation ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Simulation {
    config: EnvConfig,
    network: Network,
    red: ArtAgent,
    blue: DynamicBlueAgent,
    detector: DetectorHandler,
    observation: HistoryObservation,
    reward: Box<dyn RewardCalculator>,
    rng: SimRng,
    current_step: u64,
    total_reward: Decimal,
}

impl Simulation {
    /// Environment over `network` with the built-in catalogs.
    ///
    /// # Errors
    /// See [`Simulation::with_components`].
    pub fn new(network: Network, config: EnvConfig) -> Result<Self, SimError> {
        Self::with_components(network, config, Components::default())
    }

    /// # Errors
    /// Configuration errors from any catalog, a malformed detector graph, or
    /// [`ConfigError::NoEntryHost`] if the network has no workstation.
    pub fn with_components(network: Network, config: EnvConfig, components: Components) -> Result<Self, SimError> {
        let mut rng = seeded_rng(config.seed.unwrap_or(DEFAULT_SEED));

        let catalog = match components.techniques {
            Some(c) => c,
            None => TechniqueCatalog::builtin()?,
        };
        catalog.require(PING_SWEEP_TECHNIQUE)?;
        catalog.require(PORT_SCAN_TECHNIQUE)?;

        let entry = network
            .random_user_host(&mut rng)
            .map(|h| h.name.clone())
            .ok_or(ConfigError::NoEntryHost)?;
        let red = ArtAgent::new(&entry, &network, config.kill_chain.clone(), config.strategy.build(), catalog)?;

        let blue_config = match components.blue {
            Some(c) => c,
            None => BlueAgentConfig::builtin()?,
        };
        let blue = DynamicBlueAgent::from_config(&blue_config, &network)?;

        let detector_config = match components.detector {
            Some(c) => c,
            None => DetectorGraphConfig::builtin(&config.detector)?,
        };
        let detector = DetectorHandler::from_config(&detector_config)?;

        let reward: Box<dyn RewardCalculator> = match config.reward_function {
            RewardFunction::Recurring => Box::new(RecurringReward::new(
                red.reward_map(),
                blue.reward_map().clone(),
                &config.rewards,
            )),
            RewardFunction::StepDetected => Box::new(StepDetectedReward::new(
                blue.reward_map().clone(),
                config.max_steps,
                &config.rewards,
            )),
        };

        let observation = HistoryObservation::new(&network);
        info!(
            hosts = network.hosts().count(),
            actions = blue.action_space_size(),
            entry = %entry,
            strategy = red.strategy_name(),
            "simulation built"
        );

        Ok(Self {
            config,
            network,
            red,
            blue,
            detector,
            observation,
            reward,
            rng,
            current_step: 0,
            total_reward: Decimal::ZERO,
        })
    }

    /// Start a new episode. Reseeds first when `seed` is given.
    ///
    /// # Errors
    /// [`ConfigError::NoEntryHost`] if no workstation is left to enter from.
    pub fn reset(&mut self, seed: Option<u64>) -> Result<Vec<f32>, SimError> {
        if let Some(seed) = seed {
            self.rng = seeded_rng(seed);
        }
        self.current_step = 0;
        self.total_reward = Decimal::ZERO;

        self.network.reset();
        let entry = self
            .network
            .random_user_host(&mut self.rng)
            .map(|h| h.name.clone())
            .ok_or(ConfigError::NoEntryHost)?;
        self.red.reset(&entry, &self.network)?;
        self.blue.reset();
        let obs = self.observation.reset_obs_vector();
        self.detector.reset();
        self.reward.reset();

        info!(entry = %entry, seed = ?seed, "episode reset");
        Ok(obs)
    }

    /// One defender action, then one attacker action.
    ///
    /// # Errors
    /// Structural faults from either side: a missing node, a defender action
    /// wired to the wrong target kind or shared data. A rejected defender
    /// action (bad index, policy failure) is an unsuccessful turn, not an
    /// error.
    pub fn step(&mut self, action: i64) -> Result<StepResult, SimError> {
        let blue = self.run_blue(action)?;
        self.red.act(&mut self.network, &mut self.rng)?;

        let Some(red) = self.red.history().recent() else {
            return Err(SimError::Config(ConfigError::InvalidValue {
                key: "history".to_string(),
                reason: "attacker turn left no record".to_string(),
            }));
        };
        let red_hit_decoy = red.target_is_decoy();
        let perfect_alerts = if red.alert.is_empty() {
            Vec::new()
        } else {
            vec![red.alert.clone()]
        };

        let outcome = TurnOutcome {
            red_action: red.action_name(),
            red_target: red.target_host.as_deref(),
            red_success: red.attack_success,
            red_hit_decoy,
            blue_action: &blue.name,
            blue_id: &blue.id,
            blue_success: blue.success,
            blue_recurring: blue.recurring,
            current_step: self.current_step,
        };
        let reward = self.reward.calculate_reward(&outcome);
        self.total_reward += reward;

        let alerts = self.detector.obs(&perfect_alerts, &mut self.rng);
        let observation = self.observation.create_obs_vector(&alerts);

        let info = self.config.evaluation.then(|| StepInfo {
            step: self.current_step,
            red_action: red.action_name().map(str::to_string),
            red_action_src: red.src_host.clone(),
            red_action_dst: red.target_host.clone(),
            red_action_success: red.attack_success,
            blue_action: blue.name.clone(),
            blue_target: blue.target.clone(),
            blue_action_success: blue.success,
            kill_chain: self.red.kill_chain().to_vec(),
        });

        debug!(
            step = self.current_step,
            blue = %blue.name,
            red = ?red.action_name(),
            alerts = alerts.len(),
            %reward,
            "step complete"
        );

        self.detector.reset();
        self.current_step += 1;
        let done = self.current_step >= self.config.max_steps;
        if done {
            info!(steps = self.current_step, total = %self.total_reward, "episode finished");
        }

        Ok(StepResult {
            observation,
            reward: reward_to_f64(reward),
            done,
            truncated: false,
            info,
        })
    }

    /// Validation failures become an unsuccessful defender turn. Structural
    /// faults are returned.
    fn run_blue(&mut self, action: i64) -> Result<BlueAgentResult, SimError> {
        match self.blue.act(action, &mut self.network, &mut self.rng) {
            Ok(result) => Ok(result),
            Err(e) if e.is_structural() => {
                error!(action, error = %e, "defender action hit a structural fault");
                Err(e)
            }
            Err(e) => {
                warn!(action, error = %e, "defender action rejected");
                Ok(BlueAgentResult {
                    name: self.blue.action_name(action).unwrap_or_else(|| "invalid".to_string()),
                    id: String::new(),
                    success: false,
                    recurring: Recurring::Keep,
                    target: None,
                })
            }
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn red_history(&self) -> &AgentHistory {
        self.red.history()
    }

    pub fn red_agent(&self) -> &ArtAgent {
        &self.red
    }

    pub fn blue_agent(&self) -> &DynamicBlueAgent {
        &self.blue
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    pub fn total_reward(&self) -> f64 {
        reward_to_f64(self.total_reward)
    }

    pub fn action_space_size(&self) -> usize {
        self.blue.action_space_size()
    }

    pub fn observation_size(&self) -> usize {
        self.observation.len()
    }
}
