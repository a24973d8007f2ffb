//! Heading continuity tracking.
//!
//! The map matcher reports yaw wrapped to (-π, π]. Differencing wrapped
//! headings across the ±π boundary produces a spurious ~2π jump, so the
//! filter tracks a continuous heading instead: each incoming wrapped value
//! extends an accumulated angle by the true angular displacement.

use std::f32::consts::{FRAC_PI_2, PI};

/// Converts wrapped heading samples into a continuous heading signal.
///
/// Stateful and single-instance: the accumulated heading is only
/// meaningful relative to the first sample seen, so the unwrapper lives
/// for the whole process and is never reset.
#[derive(Debug, Default)]
pub struct AngleUnwrapper {
    /// Last wrapped input, `None` until the first sample seeds the state.
    previous: Option<f32>,
    /// Continuous heading accumulated so far.
    accumulated: f32,
}

impl AngleUnwrapper {
    /// Create an unwrapper awaiting its first sample.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next wrapped heading, returning the continuous heading.
    ///
    /// A sign flip with the previous sample beyond ±π/2 is a boundary
    /// crossing and contributes a delta adjusted by a full turn; any other
    /// step contributes the plain signed difference.
    pub fn unwrap(&mut self, wrapped: f32) -> f32 {
        match self.previous {
            None => {
                self.previous = Some(wrapped);
                self.accumulated = wrapped;
            }
            Some(previous) => {
                if previous * wrapped < 0.0 && previous.abs() > FRAC_PI_2 {
                    // Crossed the ±π boundary, not zero.
                    if previous > 0.0 {
                        self.accumulated += 2.0 * PI - previous + wrapped;
                    } else {
                        self.accumulated -= 2.0 * PI + previous - wrapped;
                    }
                } else {
                    self.accumulated += wrapped - previous;
                }
                self.previous = Some(wrapped);
            }
        }
        self.accumulated
    }

    /// Current continuous heading (0.0 before the first sample).
    pub fn heading(&self) -> f32 {
        self.accumulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_first_sample_seeds_accumulator() {
        let mut unwrapper = AngleUnwrapper::new();
        assert_relative_eq!(unwrapper.unwrap(0.7), 0.7);
        assert_relative_eq!(unwrapper.heading(), 0.7);
    }

    #[test]
    fn test_small_steps_accumulate() {
        let mut unwrapper = AngleUnwrapper::new();
        unwrapper.unwrap(0.0);
        unwrapper.unwrap(0.1);
        let out = unwrapper.unwrap(0.3);
        assert_relative_eq!(out, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_full_ccw_rotation_is_continuous() {
        // One idealized steady CCW turn through the wrap point.
        let mut unwrapper = AngleUnwrapper::new();
        unwrapper.unwrap(0.0);
        unwrapper.unwrap(FRAC_PI_2);
        unwrapper.unwrap(PI);
        let after_wrap = unwrapper.unwrap(-FRAC_PI_2);
        assert_relative_eq!(after_wrap, 1.5 * PI, epsilon = 1e-5);
        let full_turn = unwrapper.unwrap(0.0);
        assert_relative_eq!(full_turn, 2.0 * PI, epsilon = 1e-5);
    }

    #[test]
    fn test_full_cw_rotation_is_continuous() {
        let mut unwrapper = AngleUnwrapper::new();
        unwrapper.unwrap(0.0);
        unwrapper.unwrap(-FRAC_PI_2);
        unwrapper.unwrap(-PI + 0.01);
        let after_wrap = unwrapper.unwrap(FRAC_PI_2);
        assert_relative_eq!(after_wrap, -1.5 * PI, epsilon = 1e-2);
        let full_turn = unwrapper.unwrap(0.0);
        assert_relative_eq!(full_turn, -2.0 * PI, epsilon = 1e-2);
    }

    #[test]
    fn test_sign_flip_near_zero_is_not_a_wrap() {
        let mut unwrapper = AngleUnwrapper::new();
        unwrapper.unwrap(0.1);
        let out = unwrapper.unwrap(-0.1);
        assert_relative_eq!(out, -0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_multiple_turns_keep_accumulating() {
        let mut unwrapper = AngleUnwrapper::new();
        unwrapper.unwrap(0.0);
        for _ in 0..3 {
            unwrapper.unwrap(FRAC_PI_2);
            unwrapper.unwrap(PI);
            unwrapper.unwrap(-FRAC_PI_2);
            unwrapper.unwrap(0.0);
        }
        assert_relative_eq!(unwrapper.heading(), 6.0 * PI, epsilon = 1e-4);
    }
}
