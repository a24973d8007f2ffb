//! Output seam for the fusion loop.
//!
//! Transport is not this crate's concern; the loop publishes through the
//! [`FusionOutput`] trait and integrators decide where the stream goes.
//! [`LatestOutput`] is the bundled implementation: a shared latest-value
//! snapshot read by the publisher thread and by tests.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::types::Pose2D;

/// Filtered pose with uncertainty, stamped for publication.
#[derive(Debug, Clone)]
pub struct PoseEstimate {
    /// Reference frame the pose is expressed in
    pub frame_id: String,
    /// Body frame the pose describes
    pub child_frame_id: String,
    /// Filtered pose, yaw wrapped to [-π, π]
    pub pose: Pose2D,
    /// Row-major 6x6 covariance; only the planar block is populated
    pub covariance: [f32; 36],
    /// Publication timestamp in microseconds
    pub timestamp_us: u64,
}

/// A stamped transform between two named frames.
#[derive(Debug, Clone)]
pub struct FrameTransform {
    /// Parent frame
    pub parent: String,
    /// Child frame
    pub child: String,
    /// Parent → child transform
    pub transform: Pose2D,
    /// Publication timestamp in microseconds
    pub timestamp_us: u64,
}

/// Sink for the fusion loop's per-tick outputs.
pub trait FusionOutput {
    /// Publish the filtered pose and covariance.
    fn publish_pose(&mut self, estimate: &PoseEstimate);

    /// Publish the reference→odometry transform.
    fn publish_transform(&mut self, transform: &FrameTransform);
}

/// Latest published outputs plus publish counters.
#[derive(Debug, Default)]
pub struct OutputState {
    /// Most recent pose estimate
    pub pose: Option<PoseEstimate>,
    /// Most recent transform
    pub transform: Option<FrameTransform>,
    /// Number of pose publications so far
    pub pose_count: u64,
    /// Number of transform publications so far
    pub transform_count: u64,
}

/// Shared latest-value output sink.
///
/// Clones share the same underlying state, so one handle can be given to
/// the fusion loop and another to the publisher thread.
#[derive(Debug, Clone, Default)]
pub struct LatestOutput {
    state: Arc<RwLock<OutputState>>,
}

impl LatestOutput {
    /// Create an empty output sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the latest outputs.
    pub fn read<R>(&self, f: impl FnOnce(&OutputState) -> R) -> R {
        f(&self.state.read())
    }

    /// Most recent pose estimate, if any.
    pub fn latest_pose(&self) -> Option<PoseEstimate> {
        self.state.read().pose.clone()
    }

    /// Most recent transform, if any.
    pub fn latest_transform(&self) -> Option<FrameTransform> {
        self.state.read().transform.clone()
    }
}

impl FusionOutput for LatestOutput {
    fn publish_pose(&mut self, estimate: &PoseEstimate) {
        let mut state = self.state.write();
        state.pose = Some(estimate.clone());
        state.pose_count += 1;
    }

    fn publish_transform(&mut self, transform: &FrameTransform) {
        let mut state = self.state.write();
        state.transform = Some(transform.clone());
        state.transform_count += 1;
    }
}
