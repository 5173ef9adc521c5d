use std::path::PathBuf;

use burn::config::Config;
use quadcopter_task::{
    common::{
        eval::{evaluate_policy, EvalConfig},
        logger::{CsvLogger, LogData, LogItem, Logger},
        spaces::seed_spaces_rng,
    },
    env::{
        base::Env,
        task::{make_takeoff_env, TaskConfig},
        wrappers::EpisodeStatsWrapper,
    },
    sim::QuadcopterSim,
};

fn main() {
    tracing_subscriber::fmt::init();

    // optional path to a saved TaskConfig json
    let config = match std::env::args().nth(1) {
        Some(path) => match TaskConfig::load(&path) {
            Ok(config) => config,
            Err(err) => panic!("Error loading task config from {path}: {err}"),
        },
        None => TaskConfig::new(),
    };
    tracing::info!("task config: {config}");

    let mut logger = CsvLogger::new(PathBuf::from("logs/hover_rollout/log.csv"), false, true);
    match logger.check_can_log(true) {
        Ok(_) => {}
        Err(err) => panic!("Error setting up logger: {err}"),
    }

    let hover = QuadcopterSim::new(&config.sim).hover_rotor_speed();
    let eval_cfg = EvalConfig::new()
        .with_n_eval_episodes(5)
        .with_show_progress(true);

    let mut env = EpisodeStatsWrapper::new(make_takeoff_env(&config));
    let hover_result = evaluate_policy::<Vec<f32>, Vec<f32>, _>(
        &mut |_: &Vec<f32>| vec![hover; 4],
        &mut env,
        &eval_cfg,
    );
    tracing::info!(
        mean_reward = hover_result.mean_reward,
        mean_len = hover_result.mean_len,
        "hover policy"
    );
    let mut item: LogItem = hover_result.into();
    item.combine(
        LogItem::default().push("policy".to_string(), LogData::String("hover".to_string())),
    );
    logger.log(item);

    seed_spaces_rng(42);
    let mut action_space = env.action_space();
    let random_result = evaluate_policy::<Vec<f32>, Vec<f32>, _>(
        &mut |_: &Vec<f32>| action_space.sample(),
        &mut env,
        &eval_cfg,
    );
    tracing::info!(
        mean_reward = random_result.mean_reward,
        mean_len = random_result.mean_len,
        "random policy"
    );
    let mut item: LogItem = random_result.into();
    item.combine(
        LogItem::default().push("policy".to_string(), LogData::String("random".to_string())),
    );
    logger.log(item);

    for (ep, (ret, len)) in env
        .episode_returns()
        .iter()
        .zip(env.episode_lengths())
        .enumerate()
    {
        logger.log(
            LogItem::default()
                .push("episode".to_string(), LogData::Int(ep as i32))
                .push("ep_return".to_string(), LogData::Float(*ret))
                .push("ep_len".to_string(), LogData::Int(*len as i32)),
        );
    }

    logger.print_last();
    if let Err(err) = logger.dump() {
        tracing::error!("failed to dump logs: {err}");
    }
}
