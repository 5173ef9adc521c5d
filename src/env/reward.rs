use burn::config::Config;

use crate::sim::Pose;

/// Per-sub-step rewards are clipped into this closed interval.
pub const REWARD_CLIP: (f32, f32) = (-1.0, 1.0);

#[derive(Config, Debug)]
pub struct RewardConfig {
    /// Bonus for every sub-step the craft stays in the air.
    #[config(default = 1.5)]
    pub continuing_reward: f32,
    #[config(default = 0.5)]
    pub vertical_velocity_weight: f32,
    /// Applied when the episode ends before the time limit.
    #[config(default = "-10.0")]
    pub crash_penalty: f32,
    /// Add weighted squared x/y distance from the goal to the deviation term.
    #[config(default = false)]
    pub include_lateral_deviation: bool,
    #[config(default = 0.1)]
    pub lateral_weight: f32,
}

/// The pre-clip components of a single sub-step reward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardTerms {
    pub deviation: f32,
    pub vertical_velocity: f32,
    pub continuing: f32,
    pub crash: f32,
}

impl RewardTerms {
    pub fn raw(&self) -> f32 {
        self.continuing + self.vertical_velocity + self.deviation + self.crash
    }

    pub fn clipped(&self) -> f32 {
        self.raw().clamp(REWARD_CLIP.0, REWARD_CLIP.1)
    }
}

/// Shapes the outcome of one physics sub-step into a reward in `[-1, 1]`.
///
/// The goal is fixed at construction. Only altitude error is scored unless
/// lateral deviation is switched on in the config.
#[derive(Debug, Clone)]
pub struct RewardModel {
    goal: [f32; 3],
    config: RewardConfig,
}

impl RewardModel {
    pub fn new(goal: [f32; 3], config: RewardConfig) -> Self {
        Self { goal, config }
    }

    pub fn goal(&self) -> [f32; 3] {
        self.goal
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    pub fn terms(
        &self,
        pose: &Pose,
        velocity: &[f32; 3],
        done: bool,
        elapsed_time: f32,
        runtime: f32,
    ) -> RewardTerms {
        let mut deviation = (pose.z() - self.goal[2]).powi(2);
        if self.config.include_lateral_deviation {
            deviation += self.config.lateral_weight * (pose.x() - self.goal[0]).powi(2);
            deviation += self.config.lateral_weight * (pose.y() - self.goal[1]).powi(2);
        }

        // strict: ending exactly on the time limit is not a crash
        let crash = if done && elapsed_time < runtime {
            self.config.crash_penalty
        } else {
            0.0
        };

        RewardTerms {
            deviation,
            vertical_velocity: self.config.vertical_velocity_weight * velocity[2],
            continuing: self.config.continuing_reward,
            crash,
        }
    }

    pub fn evaluate(
        &self,
        pose: &Pose,
        velocity: &[f32; 3],
        done: bool,
        elapsed_time: f32,
        runtime: f32,
    ) -> f32 {
        self.terms(pose, velocity, done, elapsed_time, runtime).clipped()
    }
}
