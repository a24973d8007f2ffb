//! Latest-value input slots shared between producers and the fusion loop.
//!
//! Producers (odometry receiver, motion-rate conditioner, map matcher,
//! command handler) each deliver into their own slot through a narrow
//! setter; the loop tick drains whatever is new. Only the most recent
//! value per slot matters, so there is no queuing, and each slot is
//! guarded by its own mutex with no cross-slot atomicity.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::types::{Pose2D, Twist2D};
use crate::filter::{AngleUnwrapper, NoiseScheduleConfig, NoiseScheduler};
use crate::frames::TransformStore;

/// Odometry message: linear velocity plus the raw integrated pose used to
/// maintain the odometry-frame transform side-channel.
#[derive(Debug, Clone)]
pub struct OdometrySample {
    /// Odometry frame name
    pub frame_id: String,
    /// Body frame name (empty defaults to the configured body frame)
    pub child_frame_id: String,
    /// Raw integrated odometry pose
    pub pose: Pose2D,
    /// Linear velocity in m/s
    pub linear: f32,
    /// Timestamp in microseconds
    pub timestamp_us: u64,
}

/// Bias-conditioned angular rate message.
#[derive(Debug, Clone, Copy)]
pub struct RateSample {
    /// Angular velocity in rad/s (CCW positive)
    pub angular: f32,
    /// Timestamp in microseconds
    pub timestamp_us: u64,
}

/// Absolute pose observation from the map matcher.
#[derive(Debug, Clone)]
pub struct PoseObservation {
    /// Reference frame name
    pub frame_id: String,
    /// X position in meters
    pub x: f32,
    /// Y position in meters
    pub y: f32,
    /// Heading in radians, wrapped to (-π, π]
    pub yaw: f32,
    /// Timestamp in microseconds
    pub timestamp_us: u64,
}

/// Frame names in play, seeded from configuration and overwritten by the
/// frame ids carried on incoming messages.
#[derive(Debug, Clone)]
pub struct FrameLabels {
    /// Global reference frame (map-fixed)
    pub reference: String,
    /// Drifting odometry frame
    pub odometry: String,
    /// Robot body frame
    pub body: String,
}

/// Configuration for the input bus.
#[derive(Debug, Clone)]
pub struct InputBusConfig {
    /// Default reference frame name
    pub reference_frame: String,
    /// Default odometry frame name
    pub odometry_frame: String,
    /// Default body frame name
    pub body_frame: String,
    /// Observation-noise schedule
    pub noise: NoiseScheduleConfig,
    /// Initial per-axis observation variances (x, y, yaw)
    pub initial_observation_noise: [f32; 3],
    /// Initial pose committed at startup; `None` waits for an external
    /// initial-pose command
    pub initial_pose: Option<Pose2D>,
}

impl Default for InputBusConfig {
    fn default() -> Self {
        Self {
            reference_frame: "map".to_string(),
            odometry_frame: "odom".to_string(),
            body_frame: "base_link".to_string(),
            noise: NoiseScheduleConfig::default(),
            initial_observation_noise: [1.0, 1.0, 1.0],
            initial_pose: None,
        }
    }
}

#[derive(Debug)]
struct ControlSlot {
    control: Twist2D,
    motion_updated: bool,
    rate_updated: bool,
}

#[derive(Debug)]
struct ObservationSlot {
    value: [f32; 3],
    updated: bool,
    unwrapper: AngleUnwrapper,
}

#[derive(Debug)]
struct InitialPoseSlot {
    pending: Option<Pose2D>,
    committed: bool,
}

/// Shared input slots for the fusion loop.
///
/// Producers hold an `Arc<InputBus>` and only call the setters; the loop
/// drains with the `take_*` methods, which also clear the corresponding
/// ready signals.
#[derive(Debug)]
pub struct InputBus {
    control: Mutex<ControlSlot>,
    observation: Mutex<ObservationSlot>,
    noise: Mutex<NoiseScheduler>,
    initial: Mutex<InitialPoseSlot>,
    frames: Mutex<FrameLabels>,
    /// Transform side-channel fed by odometry samples, when enabled
    transforms: Option<Arc<TransformStore>>,
}

impl InputBus {
    /// Create the bus.
    ///
    /// `transforms` enables the odometry-frame transform side-channel:
    /// when present, every odometry sample also records its raw pose into
    /// the store.
    pub fn new(config: InputBusConfig, transforms: Option<Arc<TransformStore>>) -> Self {
        let committed = config.initial_pose.is_some();
        Self {
            control: Mutex::new(ControlSlot {
                control: Twist2D::zero(),
                motion_updated: false,
                rate_updated: false,
            }),
            observation: Mutex::new(ObservationSlot {
                value: [0.0; 3],
                updated: false,
                unwrapper: AngleUnwrapper::new(),
            }),
            noise: Mutex::new(NoiseScheduler::new(
                config.noise,
                config.initial_observation_noise,
            )),
            initial: Mutex::new(InitialPoseSlot {
                pending: config.initial_pose,
                committed,
            }),
            frames: Mutex::new(FrameLabels {
                reference: config.reference_frame,
                odometry: config.odometry_frame,
                body: config.body_frame,
            }),
            transforms,
        }
    }

    /// Deliver an odometry message: overwrite the linear velocity, mark
    /// the motion signal, update frame labels and feed the transform
    /// side-channel.
    pub fn push_odometry(&self, sample: OdometrySample) {
        {
            let mut slot = self.control.lock();
            slot.control.linear = sample.linear;
            slot.motion_updated = true;
        }
        {
            let mut frames = self.frames.lock();
            if !sample.frame_id.is_empty() {
                frames.odometry = sample.frame_id;
            }
            if !sample.child_frame_id.is_empty() {
                frames.body = sample.child_frame_id;
            } else {
                log::debug!("odometry without child frame id, keeping {}", frames.body);
            }
        }
        if let Some(store) = &self.transforms {
            store.record(sample.pose, sample.timestamp_us);
        }
    }

    /// Deliver an angular-rate message: overwrite the angular velocity and
    /// mark the rate signal.
    pub fn push_rate(&self, sample: RateSample) {
        let mut slot = self.control.lock();
        slot.control.angular = sample.angular;
        slot.rate_updated = true;
    }

    /// Deliver a pose observation. The wrapped yaw is unwrapped into the
    /// continuous heading signal at ingest.
    pub fn push_observation(&self, observation: PoseObservation) {
        {
            let mut slot = self.observation.lock();
            let yaw = slot.unwrapper.unwrap(observation.yaw);
            slot.value = [observation.x, observation.y, yaw];
            slot.updated = true;
        }
        if !observation.frame_id.is_empty() {
            self.frames.lock().reference = observation.frame_id;
        }
    }

    /// Deliver the external reliability signal. `true` marks the
    /// observation stream unreliable and resets the noise scale to its
    /// large value; `false` decays it toward the floor.
    pub fn set_reliability(&self, unreliable: bool) {
        let mut noise = self.noise.lock();
        if unreliable {
            noise.scale_up();
        } else {
            noise.scale_down();
        }
        log::debug!("observation noise scale: {:.4}", noise.current()[0]);
    }

    /// External one-shot initial-pose command.
    ///
    /// Only the first command is accepted, and only while no initial pose
    /// has been committed (including by configuration). Returns whether
    /// the command was accepted.
    pub fn request_initial_pose(&self, x: f32, y: f32, yaw: f32) -> bool {
        let mut slot = self.initial.lock();
        if slot.committed {
            log::debug!("initial pose already committed, ignoring command");
            return false;
        }
        slot.pending = Some(Pose2D::new(x, y, yaw));
        slot.committed = true;
        log::info!("initial pose committed: ({:.3}, {:.3}, {:.3})", x, y, yaw);
        true
    }

    /// Consume the control if both the motion and rate signals are set,
    /// clearing them. The values themselves persist (latest-value).
    pub(crate) fn take_control(&self) -> Option<Twist2D> {
        let mut slot = self.control.lock();
        if slot.motion_updated && slot.rate_updated {
            slot.motion_updated = false;
            slot.rate_updated = false;
            Some(slot.control)
        } else {
            None
        }
    }

    /// Consume the observation if new since the last tick, clearing its
    /// signal.
    pub(crate) fn take_observation(&self) -> Option<[f32; 3]> {
        let mut slot = self.observation.lock();
        if slot.updated {
            slot.updated = false;
            Some(slot.value)
        } else {
            None
        }
    }

    /// Current per-axis observation variances.
    pub(crate) fn noise_scales(&self) -> [f32; 3] {
        self.noise.lock().current()
    }

    /// Consume a pending initial pose, if any.
    pub(crate) fn take_initial_pose(&self) -> Option<Pose2D> {
        self.initial.lock().pending.take()
    }

    /// Snapshot of the current frame labels.
    pub(crate) fn frame_labels(&self) -> FrameLabels {
        self.frames.lock().clone()
    }
}
