//! Extended Kalman filter over the planar pose.
//!
//! Owns the state vector (x, y, yaw) and its 3x3 covariance. Yaw is held
//! continuous (unwrapped) internally so that innovations against the
//! unwrapped observation stream stay small across the ±π boundary; it is
//! wrapped only when a pose is handed out for publication.
//!
//! # Recursions
//!
//! Prediction propagates uncertainty through the motion model Jacobians:
//!
//! ```text
//! x ← g(x, u, dt)
//! Σ ← G·Σ·Gᵀ + V·M·Vᵀ
//! ```
//!
//! Correction fuses an absolute pose observation z with per-axis variance
//! Q from the noise scheduler:
//!
//! ```text
//! y = z − h(x)
//! S = H·Σ·Hᵀ + Q
//! K = Σ·Hᵀ·S⁻¹
//! x ← x + K·y
//! Σ ← (I − K·H)·Σ
//! ```
//!
//! The covariance is re-symmetrized after both operations to counter
//! floating-point asymmetry drift.

use crate::core::math::{
    MAT3_IDENTITY, mat3_add, mat3_inverse, mat3_mul, mat3_mul_vec, mat3_sub, mat3_transpose,
};
use crate::core::types::{Covariance2D, Pose2D, Twist2D};
use crate::filter::motion::{MotionModel, MotionNoise};
use crate::filter::observation;

/// Configuration for the pose EKF.
#[derive(Debug, Clone, Copy)]
pub struct EkfConfig {
    /// Control-noise growth coefficients
    pub motion_noise: MotionNoise,
    /// Platform pitch in radians (0 on level ground)
    pub pitch: f32,
}

impl Default for EkfConfig {
    fn default() -> Self {
        Self {
            motion_noise: MotionNoise::default(),
            pitch: 0.0,
        }
    }
}

/// Extended Kalman filter for 2D robot pose estimation.
///
/// Created when the initial pose commits; lives for the process lifetime.
/// The state is mutated only by [`predict`](Self::predict) and
/// [`correct`](Self::correct).
#[derive(Debug)]
pub struct PoseEkf {
    motion: MotionModel,
    /// State (x, y, yaw); yaw continuous, not wrapped
    state: [f32; 3],
    covariance: Covariance2D,
}

impl PoseEkf {
    /// Create a filter seeded with an initial state and per-axis variances.
    ///
    /// `initial` carries a continuous yaw; `variances` are the diagonal of
    /// the initial covariance.
    pub fn new(initial: [f32; 3], variances: [f32; 3], config: EkfConfig) -> Self {
        Self {
            motion: MotionModel::new(config.motion_noise, config.pitch),
            state: initial,
            covariance: Covariance2D::diagonal(variances[0], variances[1], variances[2]),
        }
    }

    /// Prediction step: advance the state with the control and grow the
    /// covariance through the motion Jacobians.
    ///
    /// Call at most once per control update; the loop enforces this via
    /// its ready signals.
    pub fn predict(&mut self, control: &Twist2D, dt: f32) {
        let g = self.motion.state_jacobian(&self.state, control, dt);
        let v = self.motion.control_jacobian(&self.state, dt);
        let m = self.motion.noise_covariance(control);

        // G·Σ·Gᵀ
        let gt = mat3_transpose(&g);
        let propagated = mat3_mul(&mat3_mul(&g, self.covariance.as_slice()), &gt);

        // V·M·Vᵀ with V 3x2 row-major and M 2x2 diagonal:
        // (V·M·Vᵀ)[i][j] = V[i][0]·m00·V[j][0] + V[i][1]·m11·V[j][1]
        let mut injected = [0.0f32; 9];
        for i in 0..3 {
            for j in 0..3 {
                injected[i * 3 + j] =
                    v[i * 2] * m[0] * v[j * 2] + v[i * 2 + 1] * m[3] * v[j * 2 + 1];
            }
        }

        self.state = self.motion.predict(&self.state, control, dt);
        self.covariance =
            Covariance2D::from_array(mat3_add(&propagated, &injected)).symmetrized();
    }

    /// Correction step: fuse an absolute pose observation.
    ///
    /// `observation` is (x, y, yaw_continuous); `noise_scale` is the
    /// per-axis observation variance from the scheduler. Returns `false`
    /// and leaves the state untouched when the innovation covariance is
    /// numerically singular.
    pub fn correct(&mut self, observation: &[f32; 3], noise_scale: &[f32; 3]) -> bool {
        let q = [
            noise_scale[0],
            0.0,
            0.0,
            0.0,
            noise_scale[1],
            0.0,
            0.0,
            0.0,
            noise_scale[2],
        ];

        let h = observation::jacobian();
        let ht = mat3_transpose(&h);
        let p = self.covariance.as_slice();

        let expected = observation::expected(&self.state);
        let innovation = [
            observation[0] - expected[0],
            observation[1] - expected[1],
            observation[2] - expected[2],
        ];

        // S = H·Σ·Hᵀ + Q
        let s = mat3_add(&mat3_mul(&mat3_mul(&h, p), &ht), &q);
        let s_inv = match mat3_inverse(&s) {
            Some(inv) => inv,
            None => return false,
        };

        // K = Σ·Hᵀ·S⁻¹
        let k = mat3_mul(&mat3_mul(p, &ht), &s_inv);

        let correction = mat3_mul_vec(&k, &innovation);
        self.state = [
            self.state[0] + correction[0],
            self.state[1] + correction[1],
            self.state[2] + correction[2],
        ];

        // Σ = (I − K·H)·Σ
        let ikh = mat3_sub(&MAT3_IDENTITY, &mat3_mul(&k, &h));
        self.covariance = Covariance2D::from_array(mat3_mul(&ikh, p)).symmetrized();
        true
    }

    /// Current pose with yaw wrapped to [-π, π] for publication.
    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.state[0], self.state[1], self.state[2])
    }

    /// Raw state with continuous yaw.
    pub fn state(&self) -> [f32; 3] {
        self.state
    }

    /// Current covariance.
    pub fn covariance(&self) -> &Covariance2D {
        &self.covariance
    }
}
