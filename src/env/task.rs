use burn::config::Config;
use serde::{Deserialize, Serialize};

use crate::{
    common::spaces::{seed_spaces_rng, BoxSpace, Space},
    env::{
        base::{Env, EnvObservation, Info, InfoData, ResetOptions, RewardRange},
        reward::{RewardConfig, RewardModel, REWARD_CLIP},
    },
    error::TaskError,
    sim::{Action, QuadcopterSim, SimConfig, Simulator, ACTION_SIZE, POSE_SIZE},
};

/// What the sub-step loop does once a sub-step has ended the episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostTerminal {
    /// Keep advancing the simulator and keep accumulating reward.
    Advance,
    /// Stop advancing, repeat the terminal pose and add no further reward.
    HoldPose,
}

#[derive(Config, Debug)]
pub struct TaskConfig {
    #[config(default = "SimConfig::new()")]
    pub sim: SimConfig,
    /// Goal position, fixed for the lifetime of the task.
    #[config(default = "[0.0, 0.0, 10.0]")]
    pub target_pos: [f32; 3],
    /// Physics sub-steps per call to `step`.
    #[config(default = 3)]
    pub action_repeat: usize,
    #[config(default = 0.0)]
    pub action_low: f32,
    #[config(default = 500.0)]
    pub action_high: f32,
    /// Reject actions outside `[action_low, action_high]` instead of passing
    /// them to the simulator.
    #[config(default = false)]
    pub enforce_action_bounds: bool,
    #[config(default = "PostTerminal::Advance")]
    pub post_terminal: PostTerminal,
    #[config(default = "RewardConfig::new()")]
    pub reward: RewardConfig,
}

/// Result of one RL step.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// `action_repeat` poses, oldest first.
    pub observation: Vec<f32>,
    /// Sum of the clipped sub-step rewards.
    pub reward: f32,
    pub done: bool,
    /// The episode ended before the simulator's time limit.
    pub premature: bool,
}

/// Take-off task: reach and hold the goal altitude.
///
/// Each call to [`EpisodeTask::step`] holds the action for `action_repeat`
/// simulator sub-steps and stacks the poses seen along the way into the
/// observation. The task owns its simulator; run one task per worker for
/// parallel rollouts.
pub struct EpisodeTask<S: Simulator> {
    // constant
    sim: S,
    reward_model: RewardModel,
    action_repeat: usize,
    action_low: f32,
    action_high: f32,
    enforce_action_bounds: bool,
    post_terminal: PostTerminal,
    obs_space: BoxSpace<Vec<f32>>,
    action_space: BoxSpace<Vec<f32>>,

    // stateful
    done: bool,
    premature: bool,
}

impl<S: Simulator> EpisodeTask<S> {
    pub fn new(sim: S, config: &TaskConfig) -> Self {
        assert!(config.action_repeat > 0, "action_repeat must be at least 1");

        let (pose_low, pose_high) = sim.pose_bounds();
        let obs_space = BoxSpace::from((
            pose_low.to_array().to_vec(),
            pose_high.to_array().to_vec(),
        ))
        .repeat(config.action_repeat);
        let action_space = BoxSpace::uniform(ACTION_SIZE, config.action_low, config.action_high);

        Self {
            sim,
            reward_model: RewardModel::new(config.target_pos, config.reward.clone()),
            action_repeat: config.action_repeat,
            action_low: config.action_low,
            action_high: config.action_high,
            enforce_action_bounds: config.enforce_action_bounds,
            post_terminal: config.post_terminal,
            obs_space,
            action_space,
            done: false,
            premature: false,
        }
    }

    pub fn state_size(&self) -> usize {
        self.action_repeat * POSE_SIZE
    }

    pub fn action_size(&self) -> usize {
        ACTION_SIZE
    }

    pub fn action_low(&self) -> f32 {
        self.action_low
    }

    pub fn action_high(&self) -> f32 {
        self.action_high
    }

    pub fn repeat(&self) -> usize {
        self.action_repeat
    }

    pub fn goal(&self) -> [f32; 3] {
        self.reward_model.goal()
    }

    pub fn reward_model(&self) -> &RewardModel {
        &self.reward_model
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn sim(&self) -> &S {
        &self.sim
    }

    /// Start a new episode. Every slot of the observation holds the initial
    /// pose.
    pub fn reset(&mut self) -> Vec<f32> {
        self.sim.reset();
        self.done = false;
        self.premature = false;

        let obs = self.sim.pose().to_array().repeat(self.action_repeat);
        tracing::debug!(pose = ?self.sim.pose(), "episode reset");

        obs
    }

    pub fn step(&mut self, action: &[f32]) -> Result<Transition, TaskError> {
        if self.done {
            return Err(TaskError::NeedsReset);
        }

        let rotor_speeds: Action = action.try_into().map_err(|_| TaskError::ActionShape {
            expected: ACTION_SIZE,
            got: action.len(),
        })?;

        if self.enforce_action_bounds {
            self.check_bounds(&rotor_speeds)?;
        }

        let mut reward = 0.0;
        let mut pose_all = Vec::with_capacity(self.state_size());
        // committed to self only once every sub-step succeeded
        let mut done = false;
        let mut premature = false;

        for _ in 0..self.action_repeat {
            if done && self.post_terminal == PostTerminal::HoldPose {
                pose_all.extend_from_slice(&self.sim.pose().to_array());
                continue;
            }

            let terminated = self.sim.advance(&rotor_speeds)?;
            let pose = self.sim.pose();
            let elapsed = self.sim.elapsed_time();
            let runtime = self.sim.runtime();

            if terminated && !done {
                premature = elapsed < runtime;
                if premature {
                    tracing::debug!(elapsed, runtime, z = pose.z(), "episode ended early");
                } else {
                    tracing::debug!(elapsed, runtime, "episode reached time limit");
                }
            }
            done |= terminated;

            reward += self.reward_model.evaluate(
                &pose,
                &self.sim.velocity(),
                done,
                elapsed,
                runtime,
            );
            pose_all.extend_from_slice(&pose.to_array());
        }

        self.done = done;
        self.premature = premature;

        Ok(Transition {
            observation: pose_all,
            reward,
            done,
            premature,
        })
    }

    fn check_bounds(&self, rotor_speeds: &Action) -> Result<(), TaskError> {
        match rotor_speeds
            .iter()
            .enumerate()
            .find(|(_, &s)| !(self.action_low..=self.action_high).contains(&s))
        {
            Some((index, &value)) => Err(TaskError::ActionOutOfBounds {
                index,
                value,
                low: self.action_low,
                high: self.action_high,
            }),
            None => Ok(()),
        }
    }
}

impl<S: Simulator> Env<Vec<f32>, Vec<f32>> for EpisodeTask<S> {
    fn step(&mut self, action: &Vec<f32>) -> EnvObservation<Vec<f32>> {
        let transition = match EpisodeTask::step(self, action) {
            Ok(t) => t,
            Err(err) => panic!("{err}"),
        };

        let mut info = Info::new();
        info.insert(
            "elapsed_time".to_string(),
            InfoData::Float(self.sim.elapsed_time()),
        );
        info.insert(
            "premature_termination".to_string(),
            InfoData::Bool(transition.premature),
        );

        EnvObservation {
            obs: transition.observation,
            reward: transition.reward,
            terminated: transition.done,
            truncated: false,
            info,
        }
    }

    fn reset(&mut self, seed: Option<u64>, _options: Option<ResetOptions>) -> Vec<f32> {
        if let Some(seed) = seed {
            seed_spaces_rng(seed);
        }

        EpisodeTask::reset(self)
    }

    fn action_space(&self) -> Box<dyn Space<Vec<f32>>> {
        Box::new(self.action_space.clone())
    }

    fn observation_space(&self) -> Box<dyn Space<Vec<f32>>> {
        Box::new(self.obs_space.clone())
    }

    fn reward_range(&self) -> RewardRange {
        let repeat = self.action_repeat as f32;
        RewardRange {
            low: REWARD_CLIP.0 * repeat,
            high: REWARD_CLIP.1 * repeat,
        }
    }

    fn close(&mut self) {}

    fn unwrapped(&self) -> &dyn Env<Vec<f32>, Vec<f32>> {
        self
    }
}

pub fn make_takeoff_task(config: &TaskConfig) -> EpisodeTask<QuadcopterSim> {
    EpisodeTask::new(QuadcopterSim::new(&config.sim), config)
}

pub fn make_takeoff_env(config: &TaskConfig) -> Box<dyn Env<Vec<f32>, Vec<f32>>> {
    Box::new(make_takeoff_task(config))
}

#[cfg(test)]
mod test {
    use assert_approx_eq::assert_approx_eq;
    use burn::config::Config;

    use crate::{
        env::{
            base::{Env, InfoData},
            reward::RewardConfig,
        },
        error::TaskError,
        sim::{Action, Pose, QuadcopterSim, SimConfig, Simulator, SimulatorError},
    };

    use super::{make_takeoff_task, EpisodeTask, PostTerminal, TaskConfig};

    /// Climbs 10cm per sub-step, one second per sub-step, and ends the
    /// episode on a chosen sub-step. Optionally fails on a chosen sub-step.
    #[derive(Debug, Clone)]
    struct ScriptedSim {
        z: f32,
        time: f32,
        runtime: f32,
        end_after: usize,
        advances: usize,
        fail_on: Option<usize>,
        last_action: Option<Action>,
    }

    impl ScriptedSim {
        fn new(end_after: usize, runtime: f32) -> Self {
            Self {
                z: 10.0,
                time: 0.0,
                runtime,
                end_after,
                advances: 0,
                fail_on: None,
                last_action: None,
            }
        }
    }

    impl Simulator for ScriptedSim {
        fn reset(&mut self) {
            self.z = 10.0;
            self.time = 0.0;
            self.advances = 0;
        }

        fn advance(&mut self, rotor_speeds: &Action) -> Result<bool, SimulatorError> {
            if rotor_speeds[0] < 0.0 {
                return Err(SimulatorError::Failure("negative rotor".to_string()));
            }
            if self.fail_on == Some(self.advances + 1) {
                return Err(SimulatorError::Failure("solver diverged".to_string()));
            }
            self.last_action = Some(*rotor_speeds);
            self.advances += 1;
            self.z += 0.1;
            self.time += 1.0;
            Ok(self.advances >= self.end_after)
        }

        fn pose(&self) -> Pose {
            Pose::new([0.0, 0.0, self.z], [0.0; 3])
        }

        fn velocity(&self) -> [f32; 3] {
            [0.0; 3]
        }

        fn elapsed_time(&self) -> f32 {
            self.time
        }

        fn runtime(&self) -> f32 {
            self.runtime
        }

        fn pose_bounds(&self) -> (Pose, Pose) {
            (Pose::from([-100.0; 6]), Pose::from([100.0; 6]))
        }
    }

    fn scripted(end_after: usize, runtime: f32, config: &TaskConfig) -> EpisodeTask<ScriptedSim> {
        EpisodeTask::new(ScriptedSim::new(end_after, runtime), config)
    }

    #[test]
    fn test_reset_repeats_initial_pose() {
        let init_pose = Pose::new([1.0, 2.0, 3.0], [0.1, 0.2, 0.3]);
        let config = TaskConfig::new().with_sim(SimConfig::new().with_init_pose(init_pose));
        let mut task = make_takeoff_task(&config);

        let obs = task.reset();

        assert_eq!(obs.len(), task.state_size());
        assert_eq!(obs.len(), 18);
        for chunk in obs.chunks(6) {
            assert_eq!(chunk, init_pose.to_array());
        }
    }

    #[test]
    fn test_config_surface() {
        let task = make_takeoff_task(&TaskConfig::new());

        assert_eq!(task.state_size(), 18);
        assert_eq!(task.action_size(), 4);
        assert_eq!(task.action_low(), 0.0);
        assert_eq!(task.action_high(), 500.0);
        assert_eq!(task.goal(), [0.0, 0.0, 10.0]);
        assert_eq!(task.repeat(), 3);
    }

    #[test]
    fn test_step_stacks_sub_step_poses() {
        let mut task = scripted(100, 50.0, &TaskConfig::new());
        task.reset();

        let t = task.step(&[1.0; 4]).unwrap();

        assert_eq!(t.observation.len(), 18);
        for (pose, z) in t.observation.chunks(6).zip([10.1, 10.2, 10.3]) {
            assert_approx_eq!(pose[2], z, 1e-5);
        }
        assert!(!t.done);
        assert_eq!(task.sim().advances, 3);
        assert_eq!(task.sim().last_action, Some([1.0; 4]));
    }

    #[test]
    fn test_step_sums_clipped_rewards() {
        let mut task = scripted(100, 50.0, &TaskConfig::new());
        task.reset();

        // 1.5 + small altitude error saturates at +1
        let t = task.step(&[1.0; 4]).unwrap();
        assert_approx_eq!(t.reward, 3.0);

        let config = TaskConfig::new()
            .with_target_pos([0.0, 0.0, 9.2])
            .with_reward(RewardConfig::new().with_continuing_reward(0.0));
        let mut task = scripted(100, 50.0, &config);
        task.reset();

        // z_dev = 0.81, 1.0, 1.21 -> 0.81 + 1 + 1
        let t = task.step(&[1.0; 4]).unwrap();
        assert_approx_eq!(t.reward, 2.81, 1e-4);
    }

    #[test]
    fn test_early_termination_penalised_every_sub_step_after() {
        let mut task = scripted(2, 50.0, &TaskConfig::new());
        task.reset();

        let t = task.step(&[1.0; 4]).unwrap();

        // +1 then two crashed sub-steps at -1
        assert!(t.done);
        assert!(t.premature);
        assert_approx_eq!(t.reward, -1.0);
        assert_eq!(task.sim().advances, 3);
        assert_eq!(t.observation.len(), 18);
    }

    #[test]
    fn test_termination_at_time_limit_is_not_penalised() {
        let mut task = scripted(3, 3.0, &TaskConfig::new());
        task.reset();

        let t = task.step(&[1.0; 4]).unwrap();

        assert!(t.done);
        assert!(!t.premature);
        assert_approx_eq!(t.reward, 3.0);
    }

    #[test]
    fn test_hold_pose_after_termination() {
        let config = TaskConfig::new().with_post_terminal(PostTerminal::HoldPose);
        let mut task = scripted(1, 50.0, &config);
        task.reset();

        let t = task.step(&[1.0; 4]).unwrap();

        assert!(t.done);
        assert_eq!(task.sim().advances, 1);
        assert_approx_eq!(t.reward, -1.0);
        for pose in t.observation.chunks(6) {
            assert_approx_eq!(pose[2], 10.1, 1e-5);
        }
    }

    #[test]
    fn test_step_after_done_needs_reset() {
        let mut task = scripted(1, 50.0, &TaskConfig::new());
        task.reset();

        assert!(task.step(&[1.0; 4]).unwrap().done);
        assert!(task.is_done());
        assert_eq!(task.step(&[1.0; 4]), Err(TaskError::NeedsReset));

        task.reset();
        assert!(!task.is_done());
        assert!(task.step(&[1.0; 4]).is_ok());
    }

    #[test]
    fn test_wrong_action_length() {
        let mut task = make_takeoff_task(&TaskConfig::new());
        task.reset();

        assert_eq!(
            task.step(&[400.0; 3]),
            Err(TaskError::ActionShape {
                expected: 4,
                got: 3
            })
        );
        assert_eq!(task.sim().elapsed_time(), 0.0);
    }

    #[test]
    fn test_action_bounds_pass_through_by_default() {
        let mut task = scripted(100, 50.0, &TaskConfig::new());
        task.reset();

        task.step(&[900.0, 1.0, 1.0, 1.0]).unwrap();

        assert_eq!(task.sim().last_action, Some([900.0, 1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_action_bounds_enforced_when_enabled() {
        let config = TaskConfig::new().with_enforce_action_bounds(true);
        let mut task = scripted(100, 50.0, &config);
        task.reset();

        let err = task.step(&[1.0, 1.0, 900.0, 1.0]).unwrap_err();

        assert_eq!(
            err,
            TaskError::ActionOutOfBounds {
                index: 2,
                value: 900.0,
                low: 0.0,
                high: 500.0
            }
        );
        assert_eq!(task.sim().advances, 0);
        assert!(task.step(&[500.0; 4]).is_ok());
    }

    #[test]
    fn test_simulator_error_propagates() {
        let mut task = scripted(100, 50.0, &TaskConfig::new());
        task.reset();

        let err = task.step(&[-1.0, 1.0, 1.0, 1.0]).unwrap_err();

        assert_eq!(
            err,
            TaskError::Simulator(SimulatorError::Failure("negative rotor".to_string()))
        );
    }

    #[test]
    fn test_failed_step_does_not_end_episode() {
        let mut sim = ScriptedSim::new(1, 50.0);
        sim.fail_on = Some(2);
        let mut task = EpisodeTask::new(sim, &TaskConfig::new());
        task.reset();

        let err = task.step(&[1.0; 4]).unwrap_err();

        assert_eq!(
            err,
            TaskError::Simulator(SimulatorError::Failure("solver diverged".to_string()))
        );
        assert!(!task.is_done());
        assert_ne!(task.step(&[1.0; 4]), Err(TaskError::NeedsReset));
    }

    #[test]
    fn test_goal_survives_reset() {
        let config = TaskConfig::new().with_target_pos([1.0, 2.0, 30.0]);
        let mut task = make_takeoff_task(&config);

        task.reset();
        task.step(&[450.0; 4]).unwrap();
        task.reset();

        assert_eq!(task.goal(), [1.0, 2.0, 30.0]);
        assert_eq!(make_takeoff_task(&TaskConfig::new()).goal(), [0.0, 0.0, 10.0]);
    }

    #[test]
    fn test_free_fall_crashes_before_time_limit() {
        let mut task = make_takeoff_task(&TaskConfig::new());
        task.reset();

        let mut last = task.step(&[0.0; 4]).unwrap();
        while !last.done {
            assert_eq!(last.observation.len(), 18);
            last = task.step(&[0.0; 4]).unwrap();
        }

        assert!(last.premature);
        assert!(task.sim().elapsed_time() < task.sim().runtime());
        // altitude error at the floor outweighs the crash penalty
        assert_approx_eq!(last.reward, 3.0);
    }

    #[test]
    fn test_hover_runs_to_time_limit() {
        let mut task = make_takeoff_task(&TaskConfig::new());
        let hover = QuadcopterSim::default().hover_rotor_speed();
        task.reset();

        let mut steps = 0;
        let mut done = false;
        while !done {
            let t = task.step(&[hover; 4]).unwrap();
            assert_approx_eq!(t.reward, 3.0, 1e-3);
            done = t.done;
            if done {
                assert!(!t.premature);
            }
            steps += 1;
        }

        assert_eq!(steps, 84);
    }

    #[test]
    fn test_identical_rollouts() {
        let config = TaskConfig::new()
            .with_reward(RewardConfig::new().with_include_lateral_deviation(true));
        let mut a = make_takeoff_task(&config);
        let mut b = make_takeoff_task(&config);

        assert_eq!(a.reset(), b.reset());

        let actions = [
            [410.0, 400.0, 405.0, 395.0],
            [380.0, 420.0, 400.0, 400.0],
            [450.0, 450.0, 450.0, 450.0],
            [0.0, 500.0, 250.0, 125.0],
        ];
        for _ in 0..5 {
            for action in actions {
                if a.is_done() {
                    break;
                }
                assert_eq!(a.step(&action), b.step(&action));
            }
        }
    }

    #[test]
    fn test_env_surface() {
        let mut task = make_takeoff_task(&TaskConfig::new());
        let env: &mut dyn Env<Vec<f32>, Vec<f32>> = &mut task;

        let obs = env.reset(Some(3), None);
        assert!(env.observation_space().contains(&obs));

        let action = env.action_space().sample();
        assert!(env.action_space().contains(&action));

        let res = env.step(&action);
        assert_eq!(res.obs.len(), 18);
        assert!(!res.truncated);
        assert!(matches!(
            res.info.get("premature_termination"),
            Some(InfoData::Bool(false))
        ));
        assert!(matches!(
            res.info.get("elapsed_time"),
            Some(InfoData::Float(t)) if (t - 0.06).abs() < 1e-5
        ));

        let range = env.reward_range();
        assert_eq!((range.low, range.high), (-3.0, 3.0));
    }

    #[test]
    #[should_panic(expected = "reset required")]
    fn test_env_step_after_done_panics() {
        let mut task = scripted(1, 50.0, &TaskConfig::new());
        Env::reset(&mut task, None, None);

        Env::step(&mut task, &vec![1.0; 4]);
        Env::step(&mut task, &vec![1.0; 4]);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = TaskConfig::new()
            .with_target_pos([0.0, 0.0, 25.0])
            .with_post_terminal(PostTerminal::HoldPose);

        let mut path = std::env::temp_dir();
        path.push("quadcopter_task_config_round_trip.json");
        config.save(&path).unwrap();
        let loaded = TaskConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(path);

        assert_eq!(loaded.target_pos, [0.0, 0.0, 25.0]);
        assert_eq!(loaded.post_terminal, PostTerminal::HoldPose);
        assert_eq!(loaded.sim.runtime, 5.0);
    }
}
