mod td3;

pub use td3::{
    Networks,
    TD3,
};


use {
    crate::{
        components::{
            ReplayBuffer,
            Transition,
        },
        envs::BoxSpace,
    },
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    strum::Display,
};


/// The execution mode of an agent is either training or testing.
///
/// Training selects exploratory actions, testing acts greedily.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum RunMode {
    Train,
    Test,
}

/// The losses of a single update step.
///
/// `actor_loss` is only present on steps where the delayed actor update ran.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateInfo {
    pub critic_loss: f64,
    pub actor_loss: Option<f64>,
}

pub trait Algorithm {
    type Config;

    fn config(&self) -> &Self::Config;
    fn from_config(
        device: &Device,
        config: &Self::Config,
        observation_space: &BoxSpace,
        action_space: &BoxSpace,
    ) -> Result<Box<Self>>;

    fn select_action(
        &mut self,
        state: &Tensor,
        mode: RunMode,
    ) -> Result<Tensor>;

    /// Run one training step, returning `None` while there is not enough
    /// data to train on.
    fn update(&mut self) -> Result<Option<UpdateInfo>>;

    /// Called at the start of every episode.
    fn reset_noise(&mut self) {}
}

pub trait OffPolicyAlgorithm: Algorithm {
    fn store(
        &mut self,
        transition: Transition,
    );

    fn replay_buffer(&self) -> &ReplayBuffer;
}
