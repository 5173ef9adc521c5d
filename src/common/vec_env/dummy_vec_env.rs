use crate::{
    common::{
        spaces::Space,
        vec_env::base_env::{VecEnv, VecEnvObservation},
    },
    env::base::{Env, ResetOptions, RewardRange},
};

/// Steps each env in turn on the calling thread.
///
/// Every slot owns its env (and so its simulator); nothing is shared between
/// slots. Finished slots are reset immediately.
pub struct DummyVecEnv<O, A> {
    envs: Vec<Box<dyn Env<O, A>>>,
    cached_obs: Option<VecEnvObservation<O>>,
}

impl<O, A> DummyVecEnv<O, A> {
    pub fn new(envs: Vec<Box<dyn Env<O, A>>>) -> Self {
        assert!(!envs.is_empty(), "DummyVecEnv needs at least one env");

        Self {
            envs,
            cached_obs: None,
        }
    }
}

impl<O: Clone, A: Clone> VecEnv<O, A> for DummyVecEnv<O, A> {
    fn step_async(&mut self, action: Vec<A>) {
        if action.len() != self.envs.len() {
            panic!(
                "Wrong amount of actions! Got {}, expecting {}",
                action.len(),
                self.envs.len()
            );
        }

        let mut new_obs = Vec::with_capacity(self.envs.len());
        let mut final_obs = Vec::with_capacity(self.envs.len());

        for (env, a) in self.envs.iter_mut().zip(action.iter()) {
            let mut obs = env.step(a);

            if obs.truncated || obs.terminated {
                final_obs.push(Some(obs.obs.clone()));
                obs.obs = env.reset(None, None);
            } else {
                final_obs.push(None);
            }

            new_obs.push(obs);
        }

        self.cached_obs = Some(VecEnvObservation::new(new_obs, final_obs));
    }

    fn step_wait(&mut self) -> VecEnvObservation<O> {
        match self.cached_obs.take() {
            Some(obs) => obs,
            None => panic!("step_wait called without a pending step_async"),
        }
    }

    /// Resets every slot. Slot `i` is handed `seed + i` (wrapping); envs that
    /// seed the shared space RNG therefore leave it seeded by the last slot.
    fn reset(&mut self, seed: Option<u64>, options: Option<ResetOptions>) -> Vec<O> {
        self.envs
            .iter_mut()
            .enumerate()
            .map(|(i, e)| e.reset(seed.map(|s| s.wrapping_add(i as u64)), options.clone()))
            .collect()
    }

    fn num_envs(&self) -> usize {
        self.envs.len()
    }

    fn action_space(&self) -> Box<dyn Space<A>> {
        self.envs[0].action_space()
    }

    fn observation_space(&self) -> Box<dyn Space<O>> {
        self.envs[0].observation_space()
    }

    fn reward_range(&self) -> RewardRange {
        self.envs[0].reward_range()
    }

    fn close(&mut self) {
        self.envs.iter_mut().for_each(|e| e.close());
    }
}
