use {
    crate::{
        agents::{
            OffPolicyAlgorithm,
            RunMode,
        },
        components::Transition,
        configs::TrainConfig,
        envs::Environment,
    },
    anyhow::{
        bail,
        Result,
    },
    candle_core::{
        Device,
        Tensor,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    tracing::warn,
};


/// Per-episode statistics of a training run.
///
/// The loss columns hold the mean over the updates of an episode, and `None`
/// for episodes without any (actor) update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingReport {
    pub total_rewards: Vec<f64>,
    pub successes: Vec<bool>,
    pub critic_losses: Vec<Option<f64>>,
    pub actor_losses: Vec<Option<f64>>,
    pub env_steps: usize,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Convert an observation to a state tensor, failing on a shape mismatch.
pub(crate) fn observation_to_tensor(
    observation: &[f64],
    expected: usize,
    device: &Device,
) -> Result<Tensor> {
    if observation.len() != expected {
        bail!(
            "environment returned an observation of length {}, expected {expected}",
            observation.len(),
        )
    }
    Ok(Tensor::new(observation, device)?)
}

/// The number of steps after which the loop cuts an episode off.
pub(crate) fn episode_step_limit<Env: Environment>(
    env: &Env,
    max_episode_steps: Option<usize>,
) -> usize {
    match max_episode_steps {
        Some(max_steps) => max_steps.min(env.timelimit()),
        None => env.timelimit(),
    }
}

/// Train a single run on an environment with an off-policy algorithm.
///
/// Every environment step is stored with `done = terminated`, then the agent
/// gets one update. An episode ends when the environment terminates or
/// truncates, or when the step limit is reached. Reaching the step limit is
/// not a terminal transition.
///
/// # Arguments
///
/// * `env` - The environment to train on.
/// * `agent` - The agent to train.
/// * `config` - The configuration for the training run.
/// * `device` - The device to run on.
pub fn training_loop_off_policy<Alg, Env>(
    env: &mut Env,
    agent: &mut Alg,
    config: &TrainConfig,
    device: &Device,
) -> Result<TrainingReport>
where
    Env: Environment,
    Alg: OffPolicyAlgorithm,
{
    warn!("action space: {:?}", env.action_space());
    warn!("observation space: {:?}", env.observation_space());

    let size_state = env.observation_space().dim();
    let step_limit = episode_step_limit(env, config.max_episode_steps());
    let mut rng = StdRng::seed_from_u64(config.seed());
    let mut report = TrainingReport::default();

    for episode in 0..config.max_episodes() {
        let mut total_reward = 0.0;
        let mut success = false;
        let mut critic_losses = Vec::new();
        let mut actor_losses = Vec::new();

        let observation = env.reset(rng.gen::<u64>())?;
        let mut state = observation_to_tensor(&observation, size_state, device)?;
        agent.reset_noise();

        for _ in 0..step_limit {
            let action = agent.select_action(&state, RunMode::Train)?;
            let step = env.step(&action.to_vec1::<f64>()?)?;
            let next_state = observation_to_tensor(&step.observation, size_state, device)?;

            agent.store(Transition::new(
                &state,
                &action,
                step.reward,
                &next_state,
                step.terminated,
            ));
            if let Some(info) = agent.update()? {
                critic_losses.push(info.critic_loss);
                actor_losses.extend(info.actor_loss);
            }

            total_reward += step.reward;
            report.env_steps += 1;
            state = next_state;

            if step.terminated || step.truncated {
                success = step.terminated;
                break;
            }
        }

        warn!("episode {episode} with total reward of {total_reward}");
        report.total_rewards.push(total_reward);
        report.successes.push(success);
        report.critic_losses.push(mean(&critic_losses));
        report.actor_losses.push(mean(&actor_losses));
    }
    Ok(report)
}
