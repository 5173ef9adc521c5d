use thiserror::Error;

use crate::sim::SimulatorError;

/// Errors raised by [`EpisodeTask::step`](crate::env::task::EpisodeTask::step).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("action has {got} components, expected {expected}")]
    ActionShape { expected: usize, got: usize },
    #[error("rotor speed {index} = {value} is outside [{low}, {high}]")]
    ActionOutOfBounds {
        index: usize,
        value: f32,
        low: f32,
        high: f32,
    },
    #[error("episode has finished, reset required")]
    NeedsReset,
    #[error(transparent)]
    Simulator(#[from] SimulatorError),
}
