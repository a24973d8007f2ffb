//! In-process transform provider fed by the odometry stream.

use parking_lot::Mutex;

use crate::core::types::{Pose2D, Timestamped};
use crate::frames::{FrameLookup, LookupError};

/// Configuration for the transform store.
#[derive(Debug, Clone)]
pub struct TransformStoreConfig {
    /// Parent frame served by this store (the odometry frame)
    pub parent_frame: String,
    /// Child frame served by this store (the robot body frame)
    pub child_frame: String,
    /// Maximum age a recorded transform may have when looked up
    pub max_age_us: u64,
}

impl Default for TransformStoreConfig {
    fn default() -> Self {
        Self {
            parent_frame: "odom".to_string(),
            child_frame: "base_link".to_string(),
            max_age_us: 500_000,
        }
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    /// First raw odometry pose; later samples are rebased against it so
    /// the odometry frame starts at the robot's boot pose.
    origin: Option<Pose2D>,
    latest: Option<Timestamped<Pose2D>>,
}

/// Holds the latest odometry→body transform.
///
/// Raw odometry poses are reported in the odometry source's own arbitrary
/// origin; the store rebases every sample against the first one received,
/// making the first pose the odometry-frame origin.
#[derive(Debug)]
pub struct TransformStore {
    config: TransformStoreConfig,
    inner: Mutex<StoreInner>,
}

impl TransformStore {
    /// Create an empty store.
    pub fn new(config: TransformStoreConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Record a raw odometry pose sample.
    pub fn record(&self, raw: Pose2D, timestamp_us: u64) {
        let mut inner = self.inner.lock();
        let origin = match inner.origin {
            Some(origin) => origin,
            None => {
                log::info!(
                    "odometry origin set at ({:.3}, {:.3}, {:.3})",
                    raw.x,
                    raw.y,
                    raw.theta
                );
                inner.origin = Some(raw);
                raw
            }
        };
        let rebased = origin.inverse().compose(&raw);
        inner.latest = Some(Timestamped::new(rebased, timestamp_us));
    }
}

impl FrameLookup for TransformStore {
    fn lookup(&self, parent: &str, child: &str, timestamp_us: u64) -> Result<Pose2D, LookupError> {
        if parent != self.config.parent_frame || child != self.config.child_frame {
            return Err(LookupError::UnknownFrames {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        }
        let inner = self.inner.lock();
        match &inner.latest {
            Some(latest) => {
                let age = timestamp_us.saturating_sub(latest.timestamp_us);
                if age > self.config.max_age_us {
                    Err(LookupError::Stale(
                        parent.to_string(),
                        child.to_string(),
                        age,
                    ))
                } else {
                    Ok(latest.data)
                }
            }
            None => Err(LookupError::NoData(parent.to_string(), child.to_string())),
        }
    }
}
