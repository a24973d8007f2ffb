//! Derivation of the reference→odometry transform.

use crate::core::types::Pose2D;
use crate::frames::FrameLookup;

/// Composes the reference→odometry transform from the filtered pose.
///
/// The filtered pose is reference→body. Combined with the odometry→body
/// relationship from the coordinate lookup:
///
/// ```text
/// reference→odometry = (reference→body) ∘ inverse(odometry→body)
/// ```
///
/// When the lookup fails the last successfully composed transform is
/// reused, so downstream consumers always receive a best-available
/// correction instead of a gap or a jump.
#[derive(Debug, Default)]
pub struct FrameComposer {
    last: Option<Pose2D>,
}

impl FrameComposer {
    /// Create a composer with no transform yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the transform from the current filtered pose.
    ///
    /// Returns the newly composed transform, or the held one on lookup
    /// failure. `None` only before the first successful composition.
    pub fn update<L: FrameLookup>(
        &mut self,
        filtered: Pose2D,
        lookup: &L,
        odometry_frame: &str,
        body_frame: &str,
        timestamp_us: u64,
    ) -> Option<Pose2D> {
        match lookup.lookup(odometry_frame, body_frame, timestamp_us) {
            Ok(odom_to_body) => {
                let transform = filtered.compose(&odom_to_body.inverse());
                self.last = Some(transform);
                Some(transform)
            }
            Err(e) => {
                log::debug!("frame lookup failed, holding last transform: {}", e);
                self.last
            }
        }
    }

    /// Last successfully composed transform.
    pub fn last(&self) -> Option<Pose2D> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::LookupError;
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::f32::consts::FRAC_PI_2;

    /// Lookup returning a fixed transform, optionally failing.
    struct FixedLookup {
        transform: Pose2D,
        fail: Cell<bool>,
    }

    impl FixedLookup {
        fn new(transform: Pose2D) -> Self {
            Self {
                transform,
                fail: Cell::new(false),
            }
        }
    }

    impl FrameLookup for FixedLookup {
        fn lookup(&self, parent: &str, child: &str, _ts: u64) -> Result<Pose2D, LookupError> {
            if self.fail.get() {
                Err(LookupError::NoData(parent.to_string(), child.to_string()))
            } else {
                Ok(self.transform)
            }
        }
    }

    #[test]
    fn test_identity_odometry_gives_filtered_pose() {
        let mut composer = FrameComposer::new();
        let lookup = FixedLookup::new(Pose2D::identity());
        let filtered = Pose2D::new(1.0, 2.0, 0.5);

        let tf = composer.update(filtered, &lookup, "odom", "base_link", 0).unwrap();
        assert_relative_eq!(tf.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(tf.y, 2.0, epsilon = 1e-6);
        assert_relative_eq!(tf.theta, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_composition_cancels_odometry_drift() {
        // reference→odometry composed with odometry→body must reproduce
        // the filtered reference→body pose.
        let mut composer = FrameComposer::new();
        let odom_to_body = Pose2D::new(0.4, -0.2, FRAC_PI_2);
        let lookup = FixedLookup::new(odom_to_body);
        let filtered = Pose2D::new(3.0, 1.0, 0.7);

        let tf = composer.update(filtered, &lookup, "odom", "base_link", 0).unwrap();
        let recomposed = tf.compose(&odom_to_body);
        assert_relative_eq!(recomposed.x, filtered.x, epsilon = 1e-5);
        assert_relative_eq!(recomposed.y, filtered.y, epsilon = 1e-5);
        assert_relative_eq!(recomposed.theta, filtered.theta, epsilon = 1e-5);
    }

    #[test]
    fn test_lookup_failure_holds_last_transform() {
        let mut composer = FrameComposer::new();
        let lookup = FixedLookup::new(Pose2D::new(0.1, 0.0, 0.0));

        let good = composer
            .update(Pose2D::new(1.0, 0.0, 0.0), &lookup, "odom", "base_link", 0)
            .unwrap();

        lookup.fail.set(true);
        let held = composer
            .update(Pose2D::new(2.0, 0.0, 0.0), &lookup, "odom", "base_link", 1)
            .unwrap();
        assert_eq!(held, good);

        // Recovery picks up the new pose again.
        lookup.fail.set(false);
        let fresh = composer
            .update(Pose2D::new(2.0, 0.0, 0.0), &lookup, "odom", "base_link", 2)
            .unwrap();
        assert_relative_eq!(fresh.x, 1.9, epsilon = 1e-5);
    }

    #[test]
    fn test_no_transform_before_first_success() {
        let mut composer = FrameComposer::new();
        let lookup = FixedLookup::new(Pose2D::identity());
        lookup.fail.set(true);

        let tf = composer.update(Pose2D::identity(), &lookup, "odom", "base_link", 0);
        assert!(tf.is_none());
        assert!(composer.last().is_none());
    }
}
