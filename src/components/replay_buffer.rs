use {
    crate::errors::TD3Error,
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    rand::{
        distributions::Uniform,
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    unzip_n::unzip_n,
};

unzip_n!(5);

/// A transition in the replay buffer.
///
/// # Fields
///
/// * `state` - The state tensor of shape `(S,)`.
/// * `action` - The action tensor of shape `(A,)`.
/// * `reward` - The scalar reward.
/// * `next_state` - The next state tensor of shape `(S,)`.
/// * `done` - Whether `next_state` is terminal.
#[derive(Clone, Debug)]
pub struct Transition {
    state: Tensor,
    action: Tensor,
    reward: f64,
    next_state: Tensor,
    done: bool,
}
impl Transition {
    pub fn new(
        state: &Tensor,
        action: &Tensor,
        reward: f64,
        next_state: &Tensor,
        done: bool,
    ) -> Self {
        Self {
            state: state.detach(),
            action: action.detach(),
            reward,
            next_state: next_state.detach(),
            done,
        }
    }

    pub fn state(&self) -> &Tensor {
        &self.state
    }

    pub fn action(&self) -> &Tensor {
        &self.action
    }

    pub fn reward(&self) -> f64 {
        self.reward
    }

    pub fn next_state(&self) -> &Tensor {
        &self.next_state
    }

    pub fn done(&self) -> bool {
        self.done
    }
}

/// A batch of transitions, stacked along the first dimension.
///
/// `rewards` and `dones` have shape `(B, 1)`, `dones` holds `0.0` or `1.0`.
#[derive(Clone, Debug)]
pub struct Batch {
    pub states: Tensor,
    pub actions: Tensor,
    pub rewards: Tensor,
    pub next_states: Tensor,
    pub dones: Tensor,
}
impl Batch {
    pub fn len(&self) -> usize {
        self.states.dims().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stack a slice of transitions into a batch.
    pub fn from_transitions(transitions: &[&Transition]) -> Result<Self> {
        let device = match transitions.first() {
            Some(t) => t.state.device().clone(),
            None => Device::Cpu,
        };
        let n = transitions.len();

        let (states, actions, rewards, next_states, dones) = transitions
            .iter()
            .map(|t| (
                &t.state,
                &t.action,
                t.reward,
                &t.next_state,
                if t.done { 1.0 } else { 0.0 },
            ))
            .unzip_n_vec();

        Ok(Self {
            states: Tensor::stack(&states, 0)?,
            actions: Tensor::stack(&actions, 0)?,
            rewards: Tensor::from_vec(rewards, (n, 1), &device)?,
            next_states: Tensor::stack(&next_states, 0)?,
            dones: Tensor::from_vec(dones, (n, 1), &device)?,
        })
    }
}

/// A replay buffer for off-policy algorithms.
///
/// The replay buffer is a fixed-capacity ring: once full, every push
/// overwrites the oldest stored transition.
///
/// # Fields
///
/// * `buffer` - The stored transitions, at most `capacity` of them.
/// * `capacity` - The capacity of the buffer.
/// * `cursor` - The slot the next push writes to.
/// * `size` - The current number of stored transitions.
/// * `rng` - The source of randomness for sampling.
#[derive(Clone)]
pub struct ReplayBuffer {
    buffer: Vec<Transition>,
    capacity: usize,
    cursor: usize,
    size: usize,
    rng: StdRng,
}
impl ReplayBuffer {
    /// Create a new, empty replay buffer with the given capacity.
    pub fn new(
        capacity: usize,
        seed: u64,
    ) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
            size: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Check if the buffer is full.
    pub fn is_full(&self) -> bool {
        self.size == self.capacity
    }

    /// Iterate over the stored transitions in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }

    /// Push a transition into the buffer.
    ///
    /// If the buffer is full, the oldest transition is overwritten.
    pub fn push(
        &mut self,
        transition: Transition,
    ) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() < self.capacity {
            self.buffer.push(transition);
        } else {
            self.buffer[self.cursor] = transition;
        }
        self.cursor = (self.cursor + 1) % self.capacity;
        self.size = (self.size + 1).min(self.capacity);
    }

    /// Sample a random batch of transitions from the buffer.
    ///
    /// Indices are drawn uniformly with replacement. When the buffer holds
    /// fewer than `batch_size` transitions, [`TD3Error::InsufficientData`] is
    /// returned.
    pub fn sample(
        &mut self,
        batch_size: usize,
    ) -> Result<Batch> {
        if batch_size == 0 || self.size < batch_size {
            Err(TD3Error::InsufficientData {
                available: self.size,
                requested: batch_size,
            })?
        }

        let transitions: Vec<&Transition> = (&mut self.rng)
            .sample_iter(Uniform::from(0..self.size))
            .take(batch_size)
            .map(|i| &self.buffer[i])
            .collect();

        Batch::from_transitions(&transitions)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(label: usize) -> Transition {
        let device = Device::Cpu;
        let x = label as f64;
        Transition::new(
            &Tensor::new(&[x, x], &device).unwrap(),
            &Tensor::new(&[x], &device).unwrap(),
            x,
            &Tensor::new(&[x + 1.0, x + 1.0], &device).unwrap(),
            label % 2 == 0,
        )
    }

    #[test]
    fn push_grows_until_capacity() {
        let mut buffer = ReplayBuffer::new(3, 0);
        assert!(buffer.is_empty());

        for i in 0..3 {
            buffer.push(labeled(i));
            assert_eq!(buffer.len(), i + 1);
        }
        assert!(buffer.is_full());

        buffer.push(labeled(3));
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.capacity(), 3);
    }

    #[test]
    fn ring_keeps_only_the_most_recent_pushes() {
        let mut buffer = ReplayBuffer::new(5, 0);
        for i in 0..7 {
            buffer.push(labeled(i));
        }

        let mut labels: Vec<usize> = buffer.iter().map(|t| t.reward() as usize).collect();
        labels.sort();
        assert_eq!(labels, vec![2, 3, 4, 5, 6]);
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn sample_never_returns_evicted_transitions() {
        let mut buffer = ReplayBuffer::new(5, 42);
        for i in 0..23 {
            buffer.push(labeled(i));
        }

        for _ in 0..50 {
            let batch = buffer.sample(8).unwrap();
            let rewards = batch.rewards.flatten_all().unwrap().to_vec1::<f64>().unwrap();
            assert!(rewards.iter().all(|&r| (18.0..=22.0).contains(&r)));
        }
    }

    #[test]
    fn sample_with_too_little_data_fails() {
        let mut buffer = ReplayBuffer::new(10, 0);
        buffer.push(labeled(0));
        buffer.push(labeled(1));

        let err = buffer.sample(3).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TD3Error>(),
            Some(&TD3Error::InsufficientData { available: 2, requested: 3 }),
        );
    }

    #[test]
    fn sample_shapes_and_fields_line_up() {
        let mut buffer = ReplayBuffer::new(10, 7);
        for i in 0..4 {
            buffer.push(labeled(i));
        }

        let batch = buffer.sample(6).unwrap();
        assert_eq!(batch.len(), 6);
        assert_eq!(batch.states.dims(), &[6, 2]);
        assert_eq!(batch.actions.dims(), &[6, 1]);
        assert_eq!(batch.rewards.dims(), &[6, 1]);
        assert_eq!(batch.next_states.dims(), &[6, 2]);
        assert_eq!(batch.dones.dims(), &[6, 1]);

        // every row belongs to the same transition
        let states = batch.states.to_vec2::<f64>().unwrap();
        let rewards = batch.rewards.to_vec2::<f64>().unwrap();
        let dones = batch.dones.to_vec2::<f64>().unwrap();
        for ((s, r), d) in states.iter().zip(&rewards).zip(&dones) {
            assert_eq!(s[0], r[0]);
            let expected_done = if (r[0] as usize) % 2 == 0 { 1.0 } else { 0.0 };
            assert_eq!(d[0], expected_done);
        }
    }
}
