//! # Components
//!
//! This module contains the components that are used to build an agent.
//!
//! ## Noise
//!
//! The [`Noise`] trait describes anything that perturbs actions. The
//! [`GaussianNoise`] struct draws i.i.d. normal noise with an optional decay
//! schedule and is used both for exploration and for target-policy smoothing
//! in the [`crate::agents::TD3`] algorithm. The [`OuNoise`] struct implements
//! the Ornstein-Uhlenbeck process as an alternative exploration noise.
//!
//! ## Replay Buffer
//!
//! The [`ReplayBuffer`] struct implements a fixed-capacity ring of
//! [`Transition`]s, sampled uniformly into [`Batch`]es by off-policy
//! algorithms such as [`crate::agents::TD3`].
//!
//! ## Function Approximators
//!
//! The [`FunctionApproximator`] trait is the seam between the algorithm and
//! the neural network. [`Mlp`] is the candle implementation used for actors
//! and critics.
//!
//! ## Action Bounds
//!
//! [`ActionBounds`] clips, rescales and uniformly samples actions.

mod approximator;
mod bounds;
mod noise;
mod ou_noise;
mod replay_buffer;

pub use approximator::{
    parameter_distance,
    FunctionApproximator,
    Mlp,
    OutputActivation,
};
pub use bounds::ActionBounds;
pub use noise::{
    GaussianNoise,
    Noise,
};
pub use ou_noise::OuNoise;
pub use replay_buffer::{
    Batch,
    ReplayBuffer,
    Transition,
};
