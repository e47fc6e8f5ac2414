mod pendulum;
mod reacher;

use {
    crate::errors::config_error,
    anyhow::Result,
    serde::{
        Deserialize,
        Serialize,
    },
};

pub use crate::envs::{
    pendulum::{
        PendulumConfig,
        PendulumEnv,
    },
    reacher::{
        ReacherConfig,
        ReacherEnv,
        ReacherReward,
    },
};

/// A bounded box of real vectors, one `[low, high]` interval per component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxSpace {
    low: Vec<f64>,
    high: Vec<f64>,
}
impl BoxSpace {
    pub fn new(
        low: Vec<f64>,
        high: Vec<f64>,
    ) -> Result<Self> {
        let space = Self { low, high };
        space.validate()?;
        Ok(space)
    }

    /// The same interval for each of `dim` components.
    pub fn uniform(
        dim: usize,
        low: f64,
        high: f64,
    ) -> Result<Self> {
        Self::new(vec![low; dim], vec![high; dim])
    }

    pub fn validate(&self) -> Result<()> {
        if self.low.len() != self.high.len() {
            Err(config_error(format!(
                "space bounds have different lengths ({} and {})",
                self.low.len(),
                self.high.len(),
            )))?
        }
        for (i, (l, h)) in self.low.iter().zip(&self.high).enumerate() {
            if !(l.is_finite() && h.is_finite() && l <= h) {
                Err(config_error(format!("invalid bounds [{l}, {h}] for component {i}")))?
            }
        }
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.low.len()
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn contains(
        &self,
        value: &[f64],
    ) -> bool {
        value.len() == self.dim()
            && value
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (l, h))| (l..=h).contains(&v))
    }
}

/// The outcome of a single environment step.
///
/// `terminated` means the episode reached a terminal state (success or
/// failure) and no future value should be bootstrapped. `truncated` means the
/// environment cut the episode short for reasons outside the MDP.
#[derive(Debug, Clone)]
pub struct Step {
    pub observation: Vec<f64>,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}

/// The environment contract the training loop relies on.
///
/// Environments do no episode bookkeeping of their own: the training loop
/// counts steps and enforces [`Environment::timelimit`].
pub trait Environment {
    type Config;

    fn config(&self) -> &Self::Config;
    fn new(config: Self::Config) -> Result<Box<Self>>;
    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Vec<f64>>;
    fn step(
        &mut self,
        action: &[f64],
    ) -> Result<Step>;
    fn timelimit(&self) -> usize;
    fn action_space(&self) -> BoxSpace;
    fn observation_space(&self) -> BoxSpace;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_bounds_are_rejected() {
        assert!(BoxSpace::new(vec![1.0], vec![-1.0]).is_err());
        assert!(BoxSpace::new(vec![0.0, 0.0], vec![1.0]).is_err());
        assert!(BoxSpace::new(vec![f64::NAN], vec![1.0]).is_err());
    }

    #[test]
    fn contains_checks_every_component() {
        let space = BoxSpace::uniform(2, -1.0, 1.0).unwrap();
        assert!(space.contains(&[0.0, 1.0]));
        assert!(!space.contains(&[0.0, 1.5]));
        assert!(!space.contains(&[0.0]));
    }
}
