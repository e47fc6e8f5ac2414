//! The loops that drive an agent through an environment.
//!
//! [`training_loop_off_policy`] trains a single run, [`evaluation_loop`]
//! rolls out the greedy policy and [`run_experiment_off_policy`] repeats
//! training runs and writes their data to disk.

mod experiment;
mod train;

pub use experiment::run_experiment_off_policy;
pub use test::evaluation_loop;
pub use train::{
    training_loop_off_policy,
    TrainingReport,
};
