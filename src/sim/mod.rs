use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod quadcopter;

pub use quadcopter::{QuadcopterSim, SimConfig};

/// Number of rotors, and therefore the length of every action.
pub const ACTION_SIZE: usize = 4;

/// Number of scalars in a [`Pose`].
pub const POSE_SIZE: usize = 6;

/// Rotor speeds, one per propeller.
pub type Action = [f32; ACTION_SIZE];

/// Position (x, y, z) and Euler angles (roll, pitch, yaw) of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f32; 3],
    pub angles: [f32; 3],
}

impl Pose {
    pub fn new(position: [f32; 3], angles: [f32; 3]) -> Self {
        Self { position, angles }
    }

    pub fn x(&self) -> f32 {
        self.position[0]
    }

    pub fn y(&self) -> f32 {
        self.position[1]
    }

    pub fn z(&self) -> f32 {
        self.position[2]
    }

    pub fn to_array(&self) -> [f32; POSE_SIZE] {
        let [x, y, z] = self.position;
        let [roll, pitch, yaw] = self.angles;
        [x, y, z, roll, pitch, yaw]
    }
}

impl From<[f32; POSE_SIZE]> for Pose {
    fn from(value: [f32; POSE_SIZE]) -> Self {
        Self {
            position: [value[0], value[1], value[2]],
            angles: [value[3], value[4], value[5]],
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulatorError {
    #[error("rotor speed {index} is not finite: {value}")]
    NonFiniteAction { index: usize, value: f32 },
    #[error("simulator failure: {0}")]
    Failure(String),
}

/// The physics backend driven by an episode task.
///
/// Implementors own the full rigid-body state and clock. The task only reads
/// the state back after [`Simulator::reset`] or [`Simulator::advance`].
pub trait Simulator {
    /// Restore the initial pose, velocities and a zero clock.
    fn reset(&mut self);

    /// Apply `rotor_speeds` for one fixed timestep.
    ///
    /// Returns whether the episode should end: a boundary was hit, the body
    /// tilted too far, or the time limit passed.
    fn advance(&mut self, rotor_speeds: &Action) -> Result<bool, SimulatorError>;

    fn pose(&self) -> Pose;

    /// Linear velocity in the earth frame.
    fn velocity(&self) -> [f32; 3];

    fn elapsed_time(&self) -> f32;

    /// Configured episode time limit.
    fn runtime(&self) -> f32;

    /// Lowest and highest pose the simulator can report.
    fn pose_bounds(&self) -> (Pose, Pose);
}
