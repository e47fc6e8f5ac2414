use {
    crate::errors::config_error,
    anyhow::Result,
    serde::{
        Deserialize,
        Serialize,
    },
};


#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    // The total number of episodes.
    max_episodes: usize,
    // Episodes are cut off after this many steps, on top of the environment's
    // own time limit.
    max_episode_steps: Option<usize>,
    // Seed for the environment resets.
    seed: u64,
}
impl TrainConfig {
    pub fn new(
        max_episodes: usize,
        max_episode_steps: Option<usize>,
        seed: u64,
    ) -> Result<Self> {
        let config = Self {
            max_episodes,
            max_episode_steps,
            seed,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_episode_steps == Some(0) {
            Err(config_error("max_episode_steps must be at least 1"))?
        }
        Ok(())
    }

    pub fn pendulum() -> Self {
        Self {
            max_episodes: 100,
            max_episode_steps: None,
            seed: 0,
        }
    }

    pub fn reacher() -> Self {
        Self {
            max_episodes: 300,
            max_episode_steps: None,
            seed: 0,
        }
    }
}

impl TrainConfig {
    pub fn max_episodes(&self) -> usize {
        self.max_episodes
    }
    pub fn max_episode_steps(&self) -> Option<usize> {
        self.max_episode_steps
    }
    pub fn seed(&self) -> u64 {
        self.seed
    }
    pub fn set_max_episodes(&mut self, max_episodes: usize) {
        self.max_episodes = max_episodes;
    }
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::errors::TD3Error,
    };

    #[test]
    fn zero_step_episodes_are_rejected() {
        let err = TrainConfig::new(10, Some(0), 0).unwrap_err();
        assert!(matches!(err.downcast_ref::<TD3Error>(), Some(TD3Error::Configuration(_))));
        assert!(TrainConfig::new(10, None, 0).is_ok());
    }
}
