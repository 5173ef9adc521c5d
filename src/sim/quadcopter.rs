use std::array;
use std::f32::consts::TAU;

use burn::config::Config;

use super::{Action, Pose, Simulator, SimulatorError, ACTION_SIZE};

/// Peak thrust coefficient of a propeller at zero advance ratio.
const MAX_THRUST_COEFF: f32 = 0.12;

#[derive(Config, Debug)]
pub struct SimConfig {
    #[config(default = "Pose::new([0.0, 0.0, 10.0], [0.0, 0.0, 0.0])")]
    pub init_pose: Pose,
    #[config(default = "[0.0, 0.0, 0.0]")]
    pub init_velocities: [f32; 3],
    /// Radians per second about each Euler axis.
    #[config(default = "[0.0, 0.0, 0.0]")]
    pub init_angle_velocities: [f32; 3],
    /// Episode time limit in seconds.
    #[config(default = 5.0)]
    pub runtime: f32,
}

/// Four-rotor craft inside a 300m box, integrated at 50Hz.
///
/// Rotors 0 and 1 sit on the pitch axis, rotors 2 and 3 on the roll axis.
/// Hitting any face of the box or running past the time limit ends the
/// episode, and the episode stays ended until [`Simulator::reset`].
#[derive(Debug, Clone)]
pub struct QuadcopterSim {
    // constant
    init_pose: Pose,
    init_velocities: [f32; 3],
    init_angle_velocities: [f32; 3],
    runtime: f32,
    gravity: f32,
    rho: f32,
    mass: f32,
    dt: f32,
    c_d: f32,
    l_to_rotor: f32,
    propeller_size: f32,
    dims: [f32; 3],
    areas: [f32; 3],
    moments_of_inertia: [f32; 3],
    lower_bounds: [f32; 3],
    upper_bounds: [f32; 3],

    // stateful
    time: f32,
    pose: Pose,
    v: [f32; 3],
    angular_v: [f32; 3],
    prop_wind_speed: [f32; ACTION_SIZE],
    done: bool,
}

impl QuadcopterSim {
    pub fn new(config: &SimConfig) -> Self {
        let mass = 0.958;
        let (width, length, height): (f32, f32, f32) = (0.51, 0.51, 0.235);
        let env_bounds = 300.0;

        Self {
            init_pose: config.init_pose,
            init_velocities: config.init_velocities,
            init_angle_velocities: config.init_angle_velocities,
            runtime: config.runtime,
            gravity: -9.81,
            rho: 1.2,
            mass,
            dt: 1.0 / 50.0,
            c_d: 0.3,
            l_to_rotor: 0.4,
            propeller_size: 0.1,
            dims: [width, length, height],
            areas: [length * height, width * height, width * length],
            moments_of_inertia: [
                mass / 12.0 * (height.powi(2) + width.powi(2)),
                mass / 12.0 * (height.powi(2) + length.powi(2)),
                mass / 12.0 * (width.powi(2) + length.powi(2)),
            ],
            lower_bounds: [-env_bounds / 2.0, -env_bounds / 2.0, 0.0],
            upper_bounds: [env_bounds / 2.0, env_bounds / 2.0, env_bounds],
            time: 0.0,
            pose: config.init_pose,
            v: config.init_velocities,
            angular_v: config.init_angle_velocities,
            prop_wind_speed: [0.0; ACTION_SIZE],
            done: false,
        }
    }

    /// Rotor speed at which four still propellers exactly cancel gravity.
    pub fn hover_rotor_speed(&self) -> f32 {
        let per_rotor = -self.mass * self.gravity / ACTION_SIZE as f32;
        (per_rotor / (MAX_THRUST_COEFF * self.rho * self.propeller_size.powi(4))).sqrt()
    }

    pub fn angular_velocity(&self) -> [f32; 3] {
        self.angular_v
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    fn body_velocity(&self) -> [f32; 3] {
        mat_vec(&earth_to_body_frame(self.pose.angles), &self.v)
    }

    fn calc_prop_wind_speed(&mut self) {
        let body_velocity = self.body_velocity();
        let phi_dot = self.angular_v[0];
        let theta_dot = self.angular_v[1];

        let spin = [
            theta_dot * self.l_to_rotor,
            -theta_dot * self.l_to_rotor,
            phi_dot * self.l_to_rotor,
            -phi_dot * self.l_to_rotor,
        ];

        self.prop_wind_speed = array::from_fn(|i| spin[i] + body_velocity[2]);
    }

    /// Net thrust of each propeller given its inflow speed.
    fn propeller_thrust(&self, rotor_speeds: &Action) -> [f32; ACTION_SIZE] {
        let d = self.propeller_size;

        array::from_fn(|i| {
            let n = rotor_speeds[i];
            if n == 0.0 {
                return 0.0;
            }

            let j = (self.prop_wind_speed[i] / n * d).max(0.0);
            let c_t = (MAX_THRUST_COEFF - 0.07 * j - 0.1 * j.powi(2)).max(0.0);

            c_t * self.rho * n.powi(2) * d.powi(4)
        })
    }

    fn linear_forces(&self, thrusts: &[f32; ACTION_SIZE]) -> [f32; 3] {
        let body_velocity = self.body_velocity();
        let drag: [f32; 3] = array::from_fn(|i| {
            0.5 * self.rho * body_velocity[i] * body_velocity[i].abs() * self.areas[i] * self.c_d
        });

        let body_forces = [-drag[0], -drag[1], thrusts.iter().sum::<f32>() - drag[2]];
        let body_to_earth = transpose(&earth_to_body_frame(self.pose.angles));

        let mut forces = mat_vec(&body_to_earth, &body_forces);
        forces[2] += self.mass * self.gravity;

        forces
    }

    fn moments(&self, thrusts: &[f32; ACTION_SIZE]) -> [f32; 3] {
        let thrust_moment = [
            (thrusts[3] - thrusts[2]) * self.l_to_rotor,
            (thrusts[1] - thrusts[0]) * self.l_to_rotor,
            0.0,
        ];

        array::from_fn(|i| {
            let drag = self.c_d
                * 0.5
                * self.rho
                * self.angular_v[i]
                * self.angular_v[i].abs()
                * self.areas[i]
                * self.dims[i].powi(2);

            thrust_moment[i] - drag
        })
    }
}

impl Default for QuadcopterSim {
    fn default() -> Self {
        Self::new(&SimConfig::new())
    }
}

impl Simulator for QuadcopterSim {
    fn reset(&mut self) {
        self.time = 0.0;
        self.pose = self.init_pose;
        self.v = self.init_velocities;
        self.angular_v = self.init_angle_velocities;
        self.prop_wind_speed = [0.0; ACTION_SIZE];
        self.done = false;
    }

    fn advance(&mut self, rotor_speeds: &Action) -> Result<bool, SimulatorError> {
        if let Some((index, &value)) = rotor_speeds
            .iter()
            .enumerate()
            .find(|(_, speed)| !speed.is_finite())
        {
            return Err(SimulatorError::NonFiniteAction { index, value });
        }

        let dt = self.dt;

        self.calc_prop_wind_speed();
        let thrusts = self.propeller_thrust(rotor_speeds);
        let linear_accel = self.linear_forces(&thrusts).map(|f| f / self.mass);

        let position: [f32; 3] = array::from_fn(|i| {
            self.pose.position[i] + self.v[i] * dt + 0.5 * linear_accel[i] * dt.powi(2)
        });
        for (v, a) in self.v.iter_mut().zip(linear_accel) {
            *v += a * dt;
        }

        let moments = self.moments(&thrusts);
        let angular_accels: [f32; 3] = array::from_fn(|i| moments[i] / self.moments_of_inertia[i]);
        let angles: [f32; 3] = array::from_fn(|i| {
            (self.pose.angles[i] + self.angular_v[i] * dt + 0.5 * angular_accels[i] * dt.powi(2))
                .rem_euclid(TAU)
        });
        for (w, a) in self.angular_v.iter_mut().zip(angular_accels) {
            *w += a * dt;
        }

        let mut clamped = position;
        for (axis, p) in clamped.iter_mut().enumerate() {
            if *p <= self.lower_bounds[axis] {
                *p = self.lower_bounds[axis];
                self.done = true;
                tracing::trace!(axis, time = self.time, "hit lower bound");
            } else if *p > self.upper_bounds[axis] {
                *p = self.upper_bounds[axis];
                self.done = true;
                tracing::trace!(axis, time = self.time, "hit upper bound");
            }
        }

        self.pose = Pose::new(clamped, angles);
        self.time += dt;
        if self.time > self.runtime {
            self.done = true;
        }

        Ok(self.done)
    }

    fn pose(&self) -> Pose {
        self.pose
    }

    fn velocity(&self) -> [f32; 3] {
        self.v
    }

    fn elapsed_time(&self) -> f32 {
        self.time
    }

    fn runtime(&self) -> f32 {
        self.runtime
    }

    fn pose_bounds(&self) -> (Pose, Pose) {
        (
            Pose::new(self.lower_bounds, [0.0; 3]),
            Pose::new(self.upper_bounds, [TAU; 3]),
        )
    }
}

/// Rotation taking earth-frame vectors into the body frame of a craft at the
/// given roll, pitch and yaw.
fn earth_to_body_frame(angles: [f32; 3]) -> [[f32; 3]; 3] {
    let (si, ci) = angles[0].sin_cos();
    let (sj, cj) = angles[1].sin_cos();
    let (sk, ck) = angles[2].sin_cos();

    [
        [ck * cj, ck * sj * si - sk * ci, ck * sj * ci + sk * si],
        [sk * cj, sk * sj * si + ck * ci, sk * sj * ci - ck * si],
        [-sj, cj * si, cj * ci],
    ]
}

fn transpose(m: &[[f32; 3]; 3]) -> [[f32; 3]; 3] {
    array::from_fn(|r| array::from_fn(|c| m[c][r]))
}

fn mat_vec(m: &[[f32; 3]; 3], v: &[f32; 3]) -> [f32; 3] {
    array::from_fn(|r| m[r][0] * v[0] + m[r][1] * v[1] + m[r][2] * v[2])
}
