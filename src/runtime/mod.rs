//! Runtime layer: latest-value input slots, the fixed-rate fusion loop
//! and the output seam.

mod fusion_loop;
mod inputs;
mod output;
mod publisher;

pub use fusion_loop::{FusionLoop, FusionLoopConfig, FusionThread};
pub use inputs::{
    FrameLabels, InputBus, InputBusConfig, OdometrySample, PoseObservation, RateSample,
};
pub use output::{FrameTransform, FusionOutput, LatestOutput, OutputState, PoseEstimate};
pub use publisher::PublisherThread;
