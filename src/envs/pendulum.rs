use {
    super::{
        BoxSpace,
        Environment,
        Step,
    },
    anyhow::{
        bail,
        Result,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::f64::consts::PI,
};

fn angle_normalize(theta: f64) -> f64 {
    (theta + PI).rem_euclid(2.0 * PI) - PI
}

/// The inverted pendulum swing-up task with the classic-control dynamics
/// of Gymnasium's Pendulum-v1.
///
/// The observation is `[cos(theta), sin(theta), theta_dot]`, the action is
/// the torque applied to the free end of the pendulum. The episode never
/// terminates; it only ends at the time limit.
pub struct PendulumEnv {
    config: PendulumConfig,
    theta: f64,
    theta_dot: f64,
}

/// The configuration struct for the Pendulum environment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendulumConfig {
    pub max_speed: f64,
    pub max_torque: f64,
    pub dt: f64,
    pub gravity: f64,
    pub mass: f64,
    pub length: f64,
    pub timelimit: usize,
}
impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            max_speed: 8.0,
            max_torque: 2.0,
            dt: 0.05,
            gravity: 10.0,
            mass: 1.0,
            length: 1.0,
            timelimit: 200,
        }
    }
}

impl PendulumEnv {
    fn observation(&self) -> Vec<f64> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }
}

impl Environment for PendulumEnv {
    type Config = PendulumConfig;

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn new(config: Self::Config) -> Result<Box<Self>> {
        Ok(Box::new(Self {
            config,
            theta: 0.0,
            theta_dot: 0.0,
        }))
    }

    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.theta = rng.gen_range(-PI..=PI);
        self.theta_dot = rng.gen_range(-1.0..=1.0);
        Ok(self.observation())
    }

    fn step(
        &mut self,
        action: &[f64],
    ) -> Result<Step> {
        let &[torque] = action else {
            bail!("pendulum expects a single torque, got {} values", action.len())
        };
        let PendulumConfig { max_speed, max_torque, dt, gravity: g, mass: m, length: l, .. } = self.config;

        let u = torque.clamp(-max_torque, max_torque);
        let cost = angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * u.powi(2);

        let theta_acc = 3.0 * g / (2.0 * l) * self.theta.sin() + 3.0 / (m * l.powi(2)) * u;
        self.theta_dot = (self.theta_dot + theta_acc * dt).clamp(-max_speed, max_speed);
        self.theta += self.theta_dot * dt;

        Ok(Step {
            observation: self.observation(),
            reward: -cost,
            terminated: false,
            truncated: false,
        })
    }

    fn timelimit(&self) -> usize {
        self.config.timelimit
    }

    fn action_space(&self) -> BoxSpace {
        BoxSpace {
            low: vec![-self.config.max_torque],
            high: vec![self.config.max_torque],
        }
    }

    fn observation_space(&self) -> BoxSpace {
        BoxSpace {
            low: vec![-1.0, -1.0, -self.config.max_speed],
            high: vec![1.0, 1.0, self.config.max_speed],
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angles_wrap_into_minus_pi_to_pi() {
        assert!((angle_normalize(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((angle_normalize(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!((angle_normalize(0.3) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn reset_is_seeded_and_inside_the_space() {
        let mut env = *PendulumEnv::new(Default::default()).unwrap();
        let a = env.reset(5).unwrap();
        let b = env.reset(5).unwrap();
        assert_eq!(a, b);
        assert!(env.observation_space().contains(&a));
    }

    #[test]
    fn upright_and_still_is_free_of_cost() {
        let mut env = *PendulumEnv::new(Default::default()).unwrap();
        env.theta = 0.0;
        env.theta_dot = 0.0;
        let step = env.step(&[0.0]).unwrap();
        assert_eq!(step.reward, 0.0);
        assert!(!step.terminated);
        assert_eq!(step.observation, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn velocity_is_capped() {
        let mut env = *PendulumEnv::new(Default::default()).unwrap();
        env.reset(0).unwrap();
        for _ in 0..500 {
            let step = env.step(&[2.0]).unwrap();
            assert!(step.observation[2].abs() <= 8.0);
        }
    }

    #[test]
    fn wrong_action_shape_is_an_error() {
        let mut env = *PendulumEnv::new(Default::default()).unwrap();
        env.reset(0).unwrap();
        assert!(env.step(&[0.0, 1.0]).is_err());
    }
}
