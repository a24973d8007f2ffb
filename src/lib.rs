//! DhruvaFusion - Pose fusion daemon for map-matched robot localization
//!
//! Estimates a mobile robot's planar pose (x, y, yaw) in real time by
//! fusing two asynchronous streams: velocity controls (gyro-odometry) and
//! absolute pose observations from an external map matcher. The estimate
//! is published at a fixed rate together with its covariance and the
//! reference→odometry transform correction.
//!
//! # Architecture
//!
//! The crate is organized into 4 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      main                           │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   runtime/                          │  ← Input slots, loop, output
//! │           (inputs, fusion_loop, publisher)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │               filter/      frames/                  │  ← Estimation + frame chain
//! │   (ekf, motion, noise, unwrap) (composer, store)    │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                 (types, math)                       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Data Flow
//!
//! Producers deliver into latest-value slots on the [`runtime::InputBus`];
//! the [`runtime::FusionLoop`] tick drains whatever is new, runs
//! predict/correct on the [`filter::PoseEkf`], refreshes the transform via
//! the [`frames::FrameComposer`] and publishes through the
//! [`runtime::FusionOutput`] seam. Before an initial pose commits the loop
//! is a pure wait state and publishes nothing.

// Layer 1: Core foundation (no internal deps)
pub mod core;

// Layer 2: Estimation filter (depends on core)
pub mod filter;

// Layer 3: Frame chain (depends on core)
pub mod frames;

// Layer 4: Runtime (depends on all layers)
pub mod runtime;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

// Core types
pub use crate::core::math;
pub use crate::core::types::{Covariance2D, Pose2D, Timestamped, Twist2D};

// Filter
pub use crate::filter::{
    AngleUnwrapper, EkfConfig, MotionModel, MotionNoise, NoiseScheduleConfig, NoiseScheduler,
    PoseEkf,
};

// Frames
pub use crate::frames::{
    FrameComposer, FrameLookup, LookupError, TransformStore, TransformStoreConfig,
};

// Runtime
pub use crate::runtime::{
    FrameTransform, FusionLoop, FusionLoopConfig, FusionOutput, FusionThread, InputBus,
    InputBusConfig, LatestOutput, OdometrySample, PoseEstimate, PoseObservation, PublisherThread,
    RateSample,
};
