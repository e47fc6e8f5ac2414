use {
    super::{
        Algorithm,
        OffPolicyAlgorithm,
        RunMode,
        UpdateInfo,
    },
    crate::{
        components::{
            ActionBounds,
            Batch,
            FunctionApproximator,
            GaussianNoise,
            Mlp,
            Noise,
            OuNoise,
            OutputActivation,
            ReplayBuffer,
            Transition,
        },
        configs::{
            NoiseKind,
            TD3_Config,
        },
        envs::BoxSpace,
        errors::{
            config_error,
            ensure_finite,
        },
    },
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::{
        Device,
        Tensor,
        Var,
    },
    candle_nn::{
        loss::mse,
        AdamW,
        Optimizer,
        ParamsAdamW,
    },
    rand::{
        rngs::StdRng,
        SeedableRng,
    },
    tracing::{
        info,
        warn,
    },
};

/// Take one optimizer step on `loss`, refusing to touch the parameters if
/// the loss or any gradient of `params` is not finite.
fn checked_step<O: Optimizer>(
    optim: &mut O,
    loss: &Tensor,
    params: &[Var],
    name: &str,
) -> Result<f64> {
    let value = ensure_finite(name, loss.to_scalar::<f64>()?)?;
    let grads = loss.backward()?;
    for var in params {
        if let Some(grad) = grads.get(var.as_tensor()) {
            let norm = grad.sqr()?.sum_all()?.to_scalar::<f64>()?;
            ensure_finite(&format!("{name} gradient"), norm)?;
        }
    }
    optim.step(&grads)?;
    Ok(value)
}

/// The six approximators of a TD3 agent.
///
/// The targets are overwritten with copies of their main networks when the
/// agent is constructed, so their initial weights do not matter.
pub struct Networks<P, Q> {
    pub actor: P,
    pub actor_target: P,
    pub critic_1: Q,
    pub critic_1_target: Q,
    pub critic_2: Q,
    pub critic_2_target: Q,
}

impl Networks<Mlp, Mlp> {
    /// Fresh MLPs: a tanh actor and two linear-output critics, all with
    /// independent random weights.
    pub fn mlp(
        device: &Device,
        config: &TD3_Config,
        size_state: usize,
        size_action: usize,
    ) -> Result<Self> {
        let actor = || Mlp::new(
            device,
            size_state,
            &config.network.actor_hidden_sizes,
            size_action,
            OutputActivation::Tanh,
        );
        let critic = || Mlp::new(
            device,
            size_state + size_action,
            &config.network.critic_hidden_sizes,
            1,
            OutputActivation::Identity,
        );
        Ok(Self {
            actor: actor()?,
            actor_target: actor()?,
            critic_1: critic()?,
            critic_1_target: critic()?,
            critic_2: critic()?,
            critic_2_target: critic()?,
        })
    }
}

/// Twin Delayed Deep Deterministic policy gradient.
///
/// Both critics are trained on every update, towards the smaller of the two
/// target critics' estimates at a smoothed target action. The actor and all
/// target networks are only updated every `policy_update_freq` updates.
///
/// The actor emits actions in `[-1, 1]` which are rescaled onto the action
/// bounds, so the critics see actions in environment units.
#[allow(clippy::upper_case_acronyms)]
pub struct TD3<P = Mlp, Q = Mlp> {
    config: TD3_Config,
    device: Device,
    bounds: ActionBounds,

    actor: P,
    actor_target: P,
    actor_optim: AdamW,

    critic_1: Q,
    critic_1_target: Q,
    critic_2: Q,
    critic_2_target: Q,
    critic_optim: AdamW,

    replay_buffer: ReplayBuffer,
    exploration_noise: Box<dyn Noise>,
    target_policy_noise: GaussianNoise,
    rng: StdRng,

    size_state: usize,
    env_steps: usize,
    update_steps: usize,
}

impl<P, Q> TD3<P, Q>
where
    P: FunctionApproximator,
    Q: FunctionApproximator,
{
    /// Assemble an agent from existing approximators.
    ///
    /// The target networks are synchronized with their main networks, the
    /// two critics share one optimizer over their concatenated parameters.
    pub fn from_networks(
        device: &Device,
        config: &TD3_Config,
        size_state: usize,
        action_space: &BoxSpace,
        networks: Networks<P, Q>,
    ) -> Result<Self> {
        config.validate()?;
        if size_state == 0 {
            Err(config_error("the observation space has no dimensions"))?
        }
        let bounds = ActionBounds::new(action_space, device)?;
        let size_action = bounds.dim();

        let Networks {
            actor,
            actor_target,
            critic_1,
            critic_1_target,
            critic_2,
            critic_2_target,
        } = networks;

        actor_target.load_from(&actor)?;
        critic_1_target.load_from(&critic_1)?;
        critic_2_target.load_from(&critic_2)?;

        let actor_optim = AdamW::new(
            actor.parameters(),
            ParamsAdamW {
                lr: config.lr_actor,
                weight_decay: config.weight_decay,
                ..Default::default()
            },
        )?;
        let critic_optim = AdamW::new(
            critic_1
                .parameters()
                .into_iter()
                .chain(critic_2.parameters())
                .collect(),
            ParamsAdamW {
                lr: config.lr_critic,
                weight_decay: config.weight_decay,
                ..Default::default()
            },
        )?;

        let exploration_noise: Box<dyn Noise> = match config.exploration_noise_kind {
            NoiseKind::Gaussian => Box::new(GaussianNoise::new(
                size_action,
                config.exploration_noise_min,
                config.exploration_noise,
                config.noise_decay_period,
                config.seed.wrapping_add(1),
                device,
            )?),
            NoiseKind::OrnsteinUhlenbeck { theta } => Box::new(OuNoise::new(
                0.0,
                theta,
                config.exploration_noise,
                size_action,
                config.seed.wrapping_add(1),
                device,
            )?),
        };
        let target_policy_noise = GaussianNoise::constant(
            size_action,
            config.target_policy_noise,
            config.seed.wrapping_add(2),
            device,
        )?;

        Ok(Self {
            config: config.clone(),
            device: device.clone(),
            bounds,
            actor,
            actor_target,
            actor_optim,
            critic_1,
            critic_1_target,
            critic_2,
            critic_2_target,
            critic_optim,
            replay_buffer: ReplayBuffer::new(config.buffer_size, config.seed),
            exploration_noise,
            target_policy_noise,
            rng: StdRng::seed_from_u64(config.seed.wrapping_add(3)),
            size_state,
            env_steps: 0,
            update_steps: 0,
        })
    }

    pub fn actor(&self) -> &P {
        &self.actor
    }

    pub fn actor_target(&self) -> &P {
        &self.actor_target
    }

    pub fn critics(&self) -> (&Q, &Q) {
        (&self.critic_1, &self.critic_2)
    }

    pub fn critic_targets_networks(&self) -> (&Q, &Q) {
        (&self.critic_1_target, &self.critic_2_target)
    }

    pub fn bounds(&self) -> &ActionBounds {
        &self.bounds
    }

    /// The number of exploring action selections so far.
    pub fn env_steps(&self) -> usize {
        self.env_steps
    }

    /// The number of updates that actually trained.
    pub fn update_steps(&self) -> usize {
        self.update_steps
    }

    /// The deterministic policy on a batch of states.
    pub fn policy(
        &self,
        states: &Tensor,
    ) -> Result<Tensor> {
        self.bounds.rescale(&self.actor.forward(states)?)
    }

    fn target_policy(
        &self,
        states: &Tensor,
    ) -> Result<Tensor> {
        self.bounds.rescale(&self.actor_target.forward(states)?)
    }

    /// The deterministic policy on a single state.
    fn policy_item(
        &self,
        state: &Tensor,
    ) -> Result<Tensor> {
        // Candle assumes a batch dimension, so when we don't have one we need
        // to pretend we do by un- and resqueezing the state tensor.
        Ok(self.policy(&state.detach().unsqueeze(0)?)?.squeeze(0)?)
    }

    /// Select an action for a single state of shape `(S,)`.
    ///
    /// In [`RunMode::Train`] the first `initial_random_actions` calls sample
    /// uniformly from the action bounds without consulting the actor, later
    /// calls add exploration noise and clip to the bounds. In
    /// [`RunMode::Test`] the actor's action is returned as is.
    pub fn select_action(
        &mut self,
        state: &Tensor,
        mode: RunMode,
    ) -> Result<Tensor> {
        if state.dims() != [self.size_state] {
            Err(anyhow!(
                "expected a state of shape ({},), got {:?}",
                self.size_state,
                state.dims(),
            ))?
        }
        match mode {
            RunMode::Train => {
                let t = self.env_steps;
                self.env_steps += 1;

                if t < self.config.initial_random_actions {
                    return self.bounds.sample(&mut self.rng, &self.device);
                }
                let action = self.policy_item(state)?;
                let noise = self.exploration_noise.sample(Some(t))?;
                Ok(self.bounds.clip(&(action + noise)?)?.detach())
            }
            RunMode::Test => Ok(self.policy_item(state)?.detach()),
        }
    }

    pub fn store(
        &mut self,
        transition: Transition,
    ) {
        info!(
            concat!(
                "\nPushing to replay buffer:",
                "\n{state:?}",
                "\n{action:?}",
                "\n{reward:?}",
                "\n{next_state:?}",
                "\n{done:?}",
            ),
            state = transition.state(),
            action = transition.action(),
            reward = transition.reward(),
            next_state = transition.next_state(),
            done = transition.done(),
        );
        self.replay_buffer.push(transition)
    }

    /// The clipped double-Q targets
    /// `y = r + (1 - done) * gamma * min(Q1'(s', a'), Q2'(s', a'))` with the
    /// smoothed target action
    /// `a' = clip(actor'(s') + clip(noise, -c, c), low, high)`.
    ///
    /// Terminal transitions get exactly `y = r`.
    pub fn critic_targets(
        &mut self,
        batch: &Batch,
    ) -> Result<Tensor> {
        let clip = self.config.target_policy_noise_clip;
        let noise = self
            .target_policy_noise
            .sample_batch(batch.len(), None)?
            .clamp(-clip, clip)?;
        let next_actions = self.target_policy(&batch.next_states)?;
        let next_actions = self.bounds.clip(&(next_actions + noise)?)?;

        let xs = Tensor::cat(&[&batch.next_states, &next_actions], 1)?;
        let q1 = self.critic_1_target.forward(&xs)?;
        let q2 = self.critic_2_target.forward(&xs)?;
        let q_next = q1.minimum(&q2)?;

        let not_done = (1.0 - &batch.dones)?;
        let bootstrap = ((q_next * not_done)? * self.config.gamma)?;
        Ok((&batch.rewards + bootstrap)?.detach())
    }

    fn update_critics(
        &mut self,
        batch: &Batch,
        targets: &Tensor,
    ) -> Result<f64> {
        let xs = Tensor::cat(&[&batch.states, &batch.actions], 1)?;
        let q1 = self.critic_1.forward(&xs)?;
        let q2 = self.critic_2.forward(&xs)?;
        let loss = (mse(&q1, targets)? + mse(&q2, targets)?)?;

        let params: Vec<Var> = self
            .critic_1
            .parameters()
            .into_iter()
            .chain(self.critic_2.parameters())
            .collect();
        checked_step(&mut self.critic_optim, &loss, &params, "critic loss")
    }

    fn update_actor(
        &mut self,
        states: &Tensor,
    ) -> Result<f64> {
        let actions = self.policy(states)?;
        let xs = Tensor::cat(&[states, &actions], 1)?;
        let loss = self.critic_1.forward(&xs)?.mean_all()?.neg()?;
        checked_step(&mut self.actor_optim, &loss, &self.actor.parameters(), "actor loss")
    }

    fn update_targets(&mut self) -> Result<()> {
        let tau = self.config.tau;
        self.actor_target.track(&self.actor, tau)?;
        self.critic_1_target.track(&self.critic_1, tau)?;
        self.critic_2_target.track(&self.critic_2, tau)?;
        Ok(())
    }

    /// Run one TD3 update.
    ///
    /// Returns `None` without changing anything while the replay buffer
    /// holds fewer than `batch_size` transitions. Otherwise both critics
    /// take one step; on every `policy_update_freq`-th update the actor takes
    /// one step and the target networks are soft-updated.
    pub fn update(&mut self) -> Result<Option<UpdateInfo>> {
        if self.replay_buffer.len() < self.config.batch_size {
            return Ok(None);
        }
        let batch = self.replay_buffer.sample(self.config.batch_size)?;

        let targets = self.critic_targets(&batch)?;
        let critic_loss = self.update_critics(&batch, &targets)?;

        let actor_loss = if self.update_steps % self.config.policy_update_freq == 0 {
            let actor_loss = self.update_actor(&batch.states)?;
            self.update_targets()?;
            Some(actor_loss)
        } else {
            None
        };

        self.update_steps += 1;
        info!(
            update_steps = self.update_steps,
            critic_loss,
            actor_loss,
            "TD3 update",
        );
        Ok(Some(UpdateInfo {
            critic_loss,
            actor_loss,
        }))
    }
}

impl Algorithm for TD3 {
    type Config = TD3_Config;

    fn config(&self) -> &TD3_Config {
        &self.config
    }

    fn from_config(
        device: &Device,
        config: &TD3_Config,
        observation_space: &BoxSpace,
        action_space: &BoxSpace,
    ) -> Result<Box<Self>> {
        warn!(
            "Creating TD3 agent for {} state and {} action dimensions",
            observation_space.dim(),
            action_space.dim(),
        );
        let networks = Networks::mlp(
            device,
            config,
            observation_space.dim(),
            action_space.dim(),
        )?;
        Ok(Box::new(Self::from_networks(
            device,
            config,
            observation_space.dim(),
            action_space,
            networks,
        )?))
    }

    fn select_action(
        &mut self,
        state: &Tensor,
        mode: RunMode,
    ) -> Result<Tensor> {
        TD3::select_action(self, state, mode)
    }

    fn update(&mut self) -> Result<Option<UpdateInfo>> {
        TD3::update(self)
    }

    fn reset_noise(&mut self) {
        self.exploration_noise.reset()
    }
}

impl OffPolicyAlgorithm for TD3 {
    fn store(
        &mut self,
        transition: Transition,
    ) {
        TD3::store(self, transition)
    }

    fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay_buffer
    }
}
