//! Velocity control type.

use serde::{Deserialize, Serialize};

/// 2D velocity command: linear velocity along the heading and angular
/// velocity about the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist2D {
    /// Linear velocity in m/s
    pub linear: f32,
    /// Angular velocity in rad/s (CCW positive)
    pub angular: f32,
}

impl Twist2D {
    /// Create a new twist.
    #[inline]
    pub fn new(linear: f32, angular: f32) -> Self {
        Self { linear, angular }
    }

    /// Zero velocity.
    #[inline]
    pub fn zero() -> Self {
        Self::default()
    }
}
