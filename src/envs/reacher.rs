use {
    super::{
        BoxSpace,
        Environment,
        Step,
    },
    crate::errors::config_error,
    anyhow::{
        bail,
        Result,
    },
    auto_ops::impl_op_ex,
    rand::{
        rngs::StdRng,
        Rng,
        RngCore,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    strum::Display,
};

/// A position in the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}
impl Point {
    fn sample(
        rng: &mut dyn RngCore,
        radius: f64,
    ) -> Self {
        Self {
            x: rng.gen_range(-radius..=radius),
            y: rng.gen_range(-radius..=radius),
        }
    }

    fn distance_to(
        &self,
        other: &Self,
    ) -> f64 {
        let v = self - other;
        v.x.hypot(v.y)
    }

    fn restrict(
        self,
        radius: f64,
    ) -> Self {
        Self {
            x: self.x.clamp(-radius, radius),
            y: self.y.clamp(-radius, radius),
        }
    }
}

impl_op_ex!(+ |a: &Point, b: &Point| -> Point { Point { x: a.x + b.x, y: a.y + b.y } });
impl_op_ex!(- |a: &Point, b: &Point| -> Point { Point { x: a.x - b.x, y: a.y - b.y } });

/// The reward function of the [`ReacherEnv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ReacherReward {
    /// 1 when the goal is reached, 0 otherwise.
    Sparse,
    /// The negative distance to the goal.
    L2Distance,
}
impl ReacherReward {
    pub fn compute(
        &self,
        distance: f64,
        threshold: f64,
    ) -> f64 {
        match self {
            ReacherReward::Sparse => if distance <= threshold { 1.0 } else { 0.0 },
            ReacherReward::L2Distance => -distance,
        }
    }
}

/// The configuration struct for the [`ReacherEnv`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReacherConfig {
    /// Half the side length of the square arena centered on the origin.
    pub arena_radius: f64,
    /// The largest displacement per axis in a single step.
    pub max_step: f64,
    /// The goal counts as reached within this distance.
    pub distance_threshold: f64,
    pub reward: ReacherReward,
    /// Every reward is multiplied by this factor.
    pub reward_rescale_ratio: f64,
    pub timelimit: usize,
}
impl Default for ReacherConfig {
    fn default() -> Self {
        Self {
            arena_radius: 1.0,
            max_step: 0.1,
            distance_threshold: 0.05,
            reward: ReacherReward::L2Distance,
            reward_rescale_ratio: 1.0,
            timelimit: 100,
        }
    }
}

/// A planar reaching task.
///
/// The end effector starts at a random position and must be moved to a
/// random goal. The observation is `[x, y, goal_x, goal_y]`, the action is a
/// displacement `[dx, dy]`. Reaching the goal terminates the episode.
pub struct ReacherEnv {
    config: ReacherConfig,
    effector: Point,
    goal: Point,
}

impl ReacherEnv {
    fn observation(&self) -> Vec<f64> {
        vec![self.effector.x, self.effector.y, self.goal.x, self.goal.y]
    }
}

impl Environment for ReacherEnv {
    type Config = ReacherConfig;

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn new(config: Self::Config) -> Result<Box<Self>> {
        if !(config.arena_radius > 0.0 && config.max_step > 0.0 && config.distance_threshold >= 0.0) {
            Err(config_error(
                "reacher needs a positive arena radius and step size and a non-negative threshold",
            ))?
        }
        Ok(Box::new(Self {
            config,
            effector: Point { x: 0.0, y: 0.0 },
            goal: Point { x: 0.0, y: 0.0 },
        }))
    }

    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let radius = self.config.arena_radius;
        self.effector = Point::sample(&mut rng, radius);
        self.goal = loop {
            let goal = Point::sample(&mut rng, radius);
            if goal.distance_to(&self.effector) > self.config.distance_threshold {
                break goal;
            }
        };
        Ok(self.observation())
    }

    fn step(
        &mut self,
        action: &[f64],
    ) -> Result<Step> {
        let &[dx, dy] = action else {
            bail!("reacher expects a 2-dimensional displacement, got {} values", action.len())
        };
        if !(dx.is_finite() && dy.is_finite()) {
            bail!("reacher received a non-finite action {action:?}")
        }

        let max_step = self.config.max_step;
        let delta = Point {
            x: dx.clamp(-max_step, max_step),
            y: dy.clamp(-max_step, max_step),
        };
        self.effector = (self.effector + delta).restrict(self.config.arena_radius);

        let distance = self.effector.distance_to(&self.goal);
        let reward = self.config.reward.compute(distance, self.config.distance_threshold);

        Ok(Step {
            observation: self.observation(),
            reward: self.config.reward_rescale_ratio * reward,
            terminated: distance <= self.config.distance_threshold,
            truncated: false,
        })
    }

    fn timelimit(&self) -> usize {
        self.config.timelimit
    }

    fn action_space(&self) -> BoxSpace {
        BoxSpace {
            low: vec![-self.config.max_step; 2],
            high: vec![self.config.max_step; 2],
        }
    }

    fn observation_space(&self) -> BoxSpace {
        let r = self.config.arena_radius;
        BoxSpace {
            low: vec![-r; 4],
            high: vec![r; 4],
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn env(reward: ReacherReward) -> ReacherEnv {
        *ReacherEnv::new(ReacherConfig {
            reward,
            reward_rescale_ratio: 2.0,
            ..Default::default()
        }).unwrap()
    }

    #[test]
    fn rewards_per_variant() {
        assert_eq!(ReacherReward::Sparse.compute(0.01, 0.05), 1.0);
        assert_eq!(ReacherReward::Sparse.compute(0.5, 0.05), 0.0);
        assert_eq!(ReacherReward::L2Distance.compute(0.5, 0.05), -0.5);
    }

    #[test]
    fn reset_places_goal_out_of_reach() {
        let mut env = env(ReacherReward::Sparse);
        for seed in 0..20 {
            let obs = env.reset(seed).unwrap();
            assert!(env.observation_space().contains(&obs));
            assert!(env.effector.distance_to(&env.goal) > env.config.distance_threshold);
        }
    }

    #[test]
    fn reaching_the_goal_terminates_with_scaled_reward() {
        let mut env = env(ReacherReward::Sparse);
        env.reset(0).unwrap();
        env.effector = Point { x: 0.0, y: 0.0 };
        env.goal = Point { x: 0.05, y: 0.0 };

        let step = env.step(&[0.05, 0.0]).unwrap();
        assert!(step.terminated);
        assert_eq!(step.reward, 2.0);
    }

    #[test]
    fn displacement_is_clipped_and_arena_is_bounded() {
        let mut env = env(ReacherReward::L2Distance);
        env.reset(0).unwrap();
        env.effector = Point { x: 0.95, y: 0.0 };
        env.goal = Point { x: -0.5, y: 0.0 };

        let step = env.step(&[1.0, -0.03]).unwrap();
        assert_eq!(step.observation[0], 1.0);
        assert!((step.observation[1] + 0.03).abs() < 1e-12);
        assert!(!step.terminated);
        assert!((step.reward + 2.0 * env.effector.distance_to(&env.goal)).abs() < 1e-12);
    }

    #[test]
    fn environment_never_counts_episode_steps() {
        let mut env = env(ReacherReward::L2Distance);
        env.reset(3).unwrap();
        for _ in 0..(env.timelimit() * 3) {
            let step = env.step(&[0.0, 0.0]).unwrap();
            assert!(!step.truncated);
        }
    }

    #[test]
    fn malformed_actions_are_errors() {
        let mut env = env(ReacherReward::L2Distance);
        env.reset(0).unwrap();
        assert!(env.step(&[0.1]).is_err());
        assert!(env.step(&[f64::NAN, 0.0]).is_err());
    }
}
