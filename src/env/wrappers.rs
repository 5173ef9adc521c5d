use std::collections::HashMap;

use crate::common::spaces::Space;

use super::base::{Env, EnvObservation, InfoData, ResetOptions, RewardRange};

/// Tracks the return and length of every finished episode.
///
/// On the step that ends an episode, the `"episode"` info key holds the
/// return as `"r"` and the length as `"l"`.
pub struct EpisodeStatsWrapper<O, A> {
    env: Box<dyn Env<O, A>>,
    running_reward: f32,
    running_len: usize,
    episode_returns: Vec<f32>,
    episode_lengths: Vec<usize>,
}

impl<O, A> EpisodeStatsWrapper<O, A> {
    pub fn new(env: Box<dyn Env<O, A>>) -> Self {
        Self {
            env,
            running_reward: 0.0,
            running_len: 0,
            episode_returns: Vec::new(),
            episode_lengths: Vec::new(),
        }
    }

    pub fn episode_returns(&self) -> &[f32] {
        &self.episode_returns
    }

    pub fn episode_lengths(&self) -> &[usize] {
        &self.episode_lengths
    }
}

impl<O: Clone, A: Clone> Env<O, A> for EpisodeStatsWrapper<O, A> {
    fn step(&mut self, action: &A) -> EnvObservation<O> {
        let mut step_result = self.env.step(action);

        self.running_reward += step_result.reward;
        self.running_len += 1;

        if step_result.terminated | step_result.truncated {
            if step_result.info.contains_key("episode") {
                panic!("info dict cannot contain key \"episode\"");
            }

            let mut episode = HashMap::new();
            episode.insert("r".to_string(), InfoData::Float(self.running_reward));
            episode.insert("l".to_string(), InfoData::Int(self.running_len as i32));
            step_result
                .info
                .insert("episode".to_string(), InfoData::InfoDict(episode));

            tracing::debug!(
                episode_return = self.running_reward,
                episode_len = self.running_len,
                "episode finished"
            );

            self.episode_returns.push(self.running_reward);
            self.episode_lengths.push(self.running_len);
            self.running_reward = 0.0;
            self.running_len = 0;
        }

        step_result
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<ResetOptions>) -> O {
        self.running_reward = 0.0;
        self.running_len = 0;

        self.env.reset(seed, options)
    }

    fn action_space(&self) -> Box<dyn Space<A>> {
        self.env.action_space()
    }

    fn observation_space(&self) -> Box<dyn Space<O>> {
        self.env.observation_space()
    }

    fn reward_range(&self) -> RewardRange {
        self.env.reward_range()
    }

    fn close(&mut self) {
        self.env.close()
    }

    fn unwrapped(&self) -> &dyn Env<O, A> {
        self.env.unwrapped()
    }
}

/// Resets the inner env as soon as an episode ends.
///
/// The observation that ended the episode moves to the `"final_observation"`
/// info key and the step's own info to `"final_info"`.
pub struct AutoResetWrapper<O, A> {
    env: Box<dyn Env<O, A>>,
}

impl<O, A> AutoResetWrapper<O, A> {
    pub fn new(env: Box<dyn Env<O, A>>) -> Self {
        Self { env }
    }
}

impl<O: Clone, A: Clone> Env<O, A> for AutoResetWrapper<O, A> {
    fn step(&mut self, action: &A) -> EnvObservation<O> {
        let mut step_result = self.env.step(action);

        if step_result.truncated | step_result.terminated {
            if step_result.info.contains_key("final_observation") {
                panic!("info dict cannot contain key \"final_observation\"");
            }

            if step_result.info.contains_key("final_info") {
                panic!("info dict cannot contain key \"final_info\"");
            }

            step_result.info.insert(
                "final_observation".to_string(),
                InfoData::Obs(step_result.obs.clone()),
            );
            step_result.info.insert(
                "final_info".to_string(),
                InfoData::InfoDict(step_result.info.clone()),
            );

            step_result.obs = self.env.reset(None, None);
        }

        step_result
    }

    fn reset(&mut self, seed: Option<u64>, options: Option<ResetOptions>) -> O {
        self.env.reset(seed, options)
    }

    fn action_space(&self) -> Box<dyn Space<A>> {
        self.env.action_space()
    }

    fn observation_space(&self) -> Box<dyn Space<O>> {
        self.env.observation_space()
    }

    fn reward_range(&self) -> RewardRange {
        self.env.reward_range()
    }

    fn close(&mut self) {
        self.env.close()
    }

    fn unwrapped(&self) -> &dyn Env<O, A> {
        self.env.unwrapped()
    }
}
