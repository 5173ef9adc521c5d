use burn::config::Config;
use core::fmt::Debug;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    common::utils::mean,
    env::base::{Env, InfoData},
};

#[derive(Debug, Clone)]
pub struct EvalResult {
    pub mean_len: f32,
    pub mean_reward: f32,
    /// Share of episodes that ended before the time limit.
    pub premature_fraction: f32,
    pub episode_rewards: Vec<f32>,
}

#[derive(Config, Debug)]
pub struct EvalConfig {
    #[config(default = 10)]
    pub n_eval_episodes: usize,
    #[config(default = false)]
    pub log_obs: bool,
    #[config(default = false)]
    pub log_action: bool,
    #[config(default = false)]
    pub log_reward: bool,
    #[config(default = false)]
    pub log_done: bool,
    #[config(default = false)]
    pub show_progress: bool,
}

/// Runs `policy` for `cfg.n_eval_episodes` full episodes.
pub fn evaluate_policy<O, A, P>(
    policy: &mut P,
    env: &mut dyn Env<O, A>,
    cfg: &EvalConfig,
) -> EvalResult
where
    O: Clone + Debug,
    A: Clone + Debug,
    P: FnMut(&O) -> A,
{
    let mut episode_rewards = Vec::new();
    let mut episode_lengths = Vec::new();
    let mut premature_episodes = 0;
    let mut completed_episodes = 0;

    let bar = if cfg.show_progress {
        ProgressBar::new(cfg.n_eval_episodes as u64)
    } else {
        ProgressBar::hidden()
    };
    let template = "{pos:>7}/{len:7} {bar} [{elapsed_precise}], eta: [{eta}]";
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        bar.set_style(style);
    }

    let mut state = env.reset(None, None);
    let mut running_reward = 0.0;
    let mut ep_len = 0.0;

    tracing::info!(episodes = cfg.n_eval_episodes, "starting evaluation");

    while completed_episodes < cfg.n_eval_episodes {
        if cfg.log_obs {
            tracing::info!("state: {:?}", state);
        }

        let action = policy(&state);

        if cfg.log_action {
            tracing::info!("action: {:?}", action);
        }

        let step_sample = env.step(&action);

        let done = step_sample.terminated | step_sample.truncated;
        running_reward += step_sample.reward;
        ep_len += 1.0;

        if cfg.log_reward {
            tracing::info!("reward: {:?}", step_sample.reward);
        }

        if cfg.log_done {
            tracing::info!("done: {:?}", done);
        }

        if done {
            if let Some(InfoData::Bool(true)) = step_sample.info.get("premature_termination") {
                premature_episodes += 1;
            }

            episode_rewards.push(running_reward);
            episode_lengths.push(ep_len);
            completed_episodes += 1;
            bar.inc(1);

            running_reward = 0.0;
            ep_len = 0.0;

            state = env.reset(None, None);
        } else {
            state = step_sample.obs;
        }
    }

    bar.finish_and_clear();

    EvalResult {
        mean_len: mean(&episode_lengths),
        mean_reward: mean(&episode_rewards),
        premature_fraction: premature_episodes as f32 / cfg.n_eval_episodes.max(1) as f32,
        episode_rewards,
    }
}
