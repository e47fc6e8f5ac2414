use {
    crate::errors::config_error,
    anyhow::Result,
    serde::{
        Deserialize,
        Serialize,
    },
    std::path::Path,
};

/// Which process generates the exploration noise.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum NoiseKind {
    /// Independent Gaussian noise per step.
    Gaussian,
    /// Ornstein-Uhlenbeck process noise with the given mean reversion rate.
    OrnsteinUhlenbeck { theta: f64 },
}

/// The hidden layer widths of the approximators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub actor_hidden_sizes: Vec<usize>,
    pub critic_hidden_sizes: Vec<usize>,
}

#[allow(non_camel_case_types)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TD3_Config {
    // The impact of the q value of the next state on the current state's q value.
    pub gamma: f64,
    // The weight for updating the target networks.
    pub tau: f64,
    // The capacity of the replay buffer used for sampling training data.
    pub buffer_size: usize,
    // The training batch size for each update.
    pub batch_size: usize,
    // The learning rates for the Actor and Critic networks.
    pub lr_actor: f64,
    pub lr_critic: f64,
    // Decoupled weight decay of the AdamW optimizers, applied to the weights
    // directly rather than added to the gradients as an L2 penalty.
    pub weight_decay: f64,
    // Standard deviation of the exploration noise, decayed linearly towards
    // `exploration_noise_min` over `noise_decay_period` environment steps.
    pub exploration_noise: f64,
    pub exploration_noise_min: f64,
    pub noise_decay_period: usize,
    pub exploration_noise_kind: NoiseKind,
    // Target policy smoothing: standard deviation and bound of the noise.
    pub target_policy_noise: f64,
    pub target_policy_noise_clip: f64,
    // Number of updates between two actor / target network updates.
    pub policy_update_freq: usize,
    // Number of random actions to take at very beginning of training.
    pub initial_random_actions: usize,
    pub network: NetworkConfig,
    // Seed for the replay buffer, the noise and the warm-up actions.
    pub seed: u64,
}
impl Default for TD3_Config {
    fn default() -> Self {
        Self::lunarlander()
    }
}
impl TD3_Config {
    /// The hyperparameters of the LunarLanderContinuous-v2 reference run.
    pub fn lunarlander() -> Self {
        Self {
            gamma: 0.99,
            tau: 5e-3,
            buffer_size: 1_000_000,
            batch_size: 100,
            lr_actor: 1e-3,
            lr_critic: 1e-3,
            weight_decay: 0.0,
            exploration_noise: 0.1,
            exploration_noise_min: 0.1,
            noise_decay_period: 1_000_000,
            exploration_noise_kind: NoiseKind::Gaussian,
            target_policy_noise: 0.2,
            target_policy_noise_clip: 0.5,
            policy_update_freq: 2,
            initial_random_actions: 10_000,
            network: NetworkConfig {
                actor_hidden_sizes: vec![400, 300],
                critic_hidden_sizes: vec![400, 300],
            },
            seed: 42,
        }
    }

    /// Noise is in action units, scaled to the pendulum's torque range of 2.
    pub fn pendulum() -> Self {
        Self {
            buffer_size: 100_000,
            exploration_noise: 0.2,
            exploration_noise_min: 0.2,
            target_policy_noise: 0.4,
            target_policy_noise_clip: 1.0,
            initial_random_actions: 1_000,
            network: NetworkConfig {
                actor_hidden_sizes: vec![256, 256],
                critic_hidden_sizes: vec![256, 256],
            },
            ..Self::lunarlander()
        }
    }

    /// Noise is in action units, scaled to the default step size of 0.1.
    pub fn reacher() -> Self {
        Self {
            buffer_size: 100_000,
            batch_size: 64,
            exploration_noise: 0.01,
            exploration_noise_min: 0.01,
            target_policy_noise: 0.02,
            target_policy_noise_clip: 0.05,
            lr_actor: 3e-4,
            lr_critic: 3e-4,
            initial_random_actions: 1_000,
            network: NetworkConfig {
                actor_hidden_sizes: vec![256, 256],
                critic_hidden_sizes: vec![256, 256],
            },
            ..Self::lunarlander()
        }
    }

    /// Read a config from a RON file and validate it.
    pub fn from_ron_file(path: &dyn AsRef<Path>) -> Result<Self> {
        let config: Self = ron::from_str(&std::fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every hyperparameter, failing with a
    /// [`TD3Error::Configuration`](crate::errors::TD3Error::Configuration)
    /// on the first invalid one. Nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.gamma) {
            Err(config_error(format!("gamma must lie in [0, 1], got {}", self.gamma)))?
        }
        if !unit.contains(&self.tau) {
            Err(config_error(format!("tau must lie in [0, 1], got {}", self.tau)))?
        }
        if self.batch_size == 0 {
            Err(config_error("batch_size must be at least 1"))?
        }
        if self.batch_size > self.buffer_size {
            Err(config_error(format!(
                "batch_size ({}) exceeds buffer_size ({})",
                self.batch_size,
                self.buffer_size,
            )))?
        }
        for (name, lr) in [("lr_actor", self.lr_actor), ("lr_critic", self.lr_critic)] {
            if !(lr > 0.0 && lr.is_finite()) {
                Err(config_error(format!("{name} must be positive, got {lr}")))?
            }
        }
        if !(self.weight_decay >= 0.0) {
            Err(config_error(format!("weight_decay must be non-negative, got {}", self.weight_decay)))?
        }
        for (name, sigma) in [
            ("exploration_noise", self.exploration_noise),
            ("exploration_noise_min", self.exploration_noise_min),
            ("target_policy_noise", self.target_policy_noise),
            ("target_policy_noise_clip", self.target_policy_noise_clip),
        ] {
            if !(sigma >= 0.0 && sigma.is_finite()) {
                Err(config_error(format!("{name} must be non-negative, got {sigma}")))?
            }
        }
        if self.exploration_noise_min > self.exploration_noise {
            Err(config_error(format!(
                "exploration_noise_min ({}) exceeds exploration_noise ({})",
                self.exploration_noise_min,
                self.exploration_noise,
            )))?
        }
        if let NoiseKind::OrnsteinUhlenbeck { theta } = self.exploration_noise_kind {
            if !(theta >= 0.0) {
                Err(config_error(format!("ornstein-uhlenbeck theta must be non-negative, got {theta}")))?
            }
        }
        if self.policy_update_freq < 1 {
            Err(config_error("policy_update_freq must be at least 1"))?
        }
        for (name, sizes) in [
            ("actor_hidden_sizes", &self.network.actor_hidden_sizes),
            ("critic_hidden_sizes", &self.network.critic_hidden_sizes),
        ] {
            if sizes.is_empty() || sizes.contains(&0) {
                Err(config_error(format!("{name} must be non-empty and positive, got {sizes:?}")))?
            }
        }
        Ok(())
    }
}
