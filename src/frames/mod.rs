//! Coordinate frame chain: reference (map-fixed) → odometry → body.
//!
//! The filter estimates reference→body directly; the composer derives the
//! reference→odometry correction from it using the odometry→body
//! relationship served by a coordinate lookup.

mod composer;
mod store;

pub use composer::FrameComposer;
pub use store::{TransformStore, TransformStoreConfig};

use crate::core::types::Pose2D;

/// Errors returned by a coordinate lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The requested frame pair is not served by this lookup
    #[error("unknown frame pair {parent} -> {child}")]
    UnknownFrames {
        /// Requested parent frame
        parent: String,
        /// Requested child frame
        child: String,
    },

    /// No transform has been recorded yet
    #[error("no transform available for {0} -> {1}")]
    NoData(String, String),

    /// The newest recorded transform is older than the lookup allows
    #[error("transform {0} -> {1} is stale ({2} us old)")]
    Stale(String, String, u64),
}

/// Coordinate-lookup service interface.
///
/// Implementations resolve the transform from `parent` to `child` at the
/// given time, or report why they cannot. Lookups are expected to return
/// promptly; any internal waiting is bounded by the implementation's own
/// timeout policy.
pub trait FrameLookup {
    /// Resolve the `parent` → `child` transform at `timestamp_us`.
    fn lookup(&self, parent: &str, child: &str, timestamp_us: u64) -> Result<Pose2D, LookupError>;
}

impl<T: FrameLookup + ?Sized> FrameLookup for std::sync::Arc<T> {
    fn lookup(&self, parent: &str, child: &str, timestamp_us: u64) -> Result<Pose2D, LookupError> {
        (**self).lookup(parent, child, timestamp_us)
    }
}
