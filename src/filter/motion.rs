//! Velocity motion model and its Jacobians.
//!
//! Unicycle kinematics: the position advances by `v*dt` along the current
//! heading and the heading advances by `w*dt`. When the platform drives on
//! an incline the horizontal displacement shrinks by `cos(pitch)`.

use crate::core::types::Twist2D;

/// Control-noise growth coefficients.
///
/// Process noise injected per prediction scales with the squared control
/// magnitudes: translational variance `a1·v² + a2·w²`, rotational variance
/// `a3·v² + a4·w²`.
#[derive(Debug, Clone, Copy)]
pub struct MotionNoise {
    /// Translational variance per squared linear velocity
    pub trans_per_v2: f32,
    /// Translational variance per squared angular velocity
    pub trans_per_w2: f32,
    /// Rotational variance per squared linear velocity
    pub rot_per_v2: f32,
    /// Rotational variance per squared angular velocity
    pub rot_per_w2: f32,
}

impl Default for MotionNoise {
    fn default() -> Self {
        Self {
            trans_per_v2: 0.01,
            trans_per_w2: 0.005,
            rot_per_v2: 0.005,
            rot_per_w2: 0.01,
        }
    }
}

/// Unicycle motion model with optional pitch compensation.
#[derive(Debug, Clone, Copy)]
pub struct MotionModel {
    noise: MotionNoise,
    /// Platform pitch in radians (0 on level ground)
    pitch: f32,
}

impl MotionModel {
    /// Create a motion model.
    pub fn new(noise: MotionNoise, pitch: f32) -> Self {
        Self { noise, pitch }
    }

    /// Predicted state after applying `control` for `dt` seconds.
    pub fn predict(&self, state: &[f32; 3], control: &Twist2D, dt: f32) -> [f32; 3] {
        let (sin_t, cos_t) = state[2].sin_cos();
        let step = control.linear * dt * self.pitch.cos();
        [
            state[0] + step * cos_t,
            state[1] + step * sin_t,
            state[2] + control.angular * dt,
        ]
    }

    /// Jacobian of the predicted state with respect to the current state.
    ///
    /// ```text
    /// G = | 1  0  -v·dt·cos(pitch)·sin(θ) |
    ///     | 0  1   v·dt·cos(pitch)·cos(θ) |
    ///     | 0  0   1                      |
    /// ```
    pub fn state_jacobian(&self, state: &[f32; 3], control: &Twist2D, dt: f32) -> [f32; 9] {
        let (sin_t, cos_t) = state[2].sin_cos();
        let step = control.linear * dt * self.pitch.cos();
        [
            1.0,
            0.0,
            -step * sin_t,
            0.0,
            1.0,
            step * cos_t,
            0.0,
            0.0,
            1.0,
        ]
    }

    /// Jacobian of the predicted state with respect to the control (3x2,
    /// row-major).
    ///
    /// ```text
    /// V = | dt·cos(pitch)·cos(θ)  0  |
    ///     | dt·cos(pitch)·sin(θ)  0  |
    ///     | 0                     dt |
    /// ```
    pub fn control_jacobian(&self, state: &[f32; 3], dt: f32) -> [f32; 6] {
        let (sin_t, cos_t) = state[2].sin_cos();
        let scale = dt * self.pitch.cos();
        [scale * cos_t, 0.0, scale * sin_t, 0.0, 0.0, dt]
    }

    /// Control-noise covariance `M` (2x2 diagonal, row-major).
    pub fn noise_covariance(&self, control: &Twist2D) -> [f32; 4] {
        let v2 = control.linear * control.linear;
        let w2 = control.angular * control.angular;
        [
            self.noise.trans_per_v2 * v2 + self.noise.trans_per_w2 * w2,
            0.0,
            0.0,
            self.noise.rot_per_v2 * v2 + self.noise.rot_per_w2 * w2,
        ]
    }
}
