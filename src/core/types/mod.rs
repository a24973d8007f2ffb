//! Core data types for pose fusion.
//!
//! - [`Pose2D`]: robot pose (x, y, theta) in meters and radians
//! - [`Twist2D`]: 2D velocity control (linear and angular)
//! - [`Covariance2D`]: 3x3 covariance matrix for pose uncertainty
//! - [`Timestamped<T>`]: generic timestamp wrapper

mod covariance;
mod pose;
mod timestamped;
mod twist;

pub use covariance::Covariance2D;
pub use pose::Pose2D;
pub use timestamped::Timestamped;
pub use twist::Twist2D;
