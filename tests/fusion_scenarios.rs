//! Fusion Pipeline Scenario Tests
//!
//! End-to-end tests of the estimation pipeline without transport:
//! producers feed the input bus directly and the loop is ticked by hand.
//! Covers:
//! - Init gating (no output before the initial pose commits)
//! - Predict/correct sequencing with the ready signals
//! - Adaptive noise schedule driven by the reliability signal
//! - Transform hold across coordinate-lookup failures
//! - Covariance health across long predict/correct sequences
//!
//! Run with: `cargo test --test fusion_scenarios`

use std::sync::Arc;

use approx::assert_relative_eq;
use dhruva_fusion::{
    EkfConfig, FusionLoop, FusionLoopConfig, InputBus, InputBusConfig, LatestOutput, MotionNoise,
    NoiseScheduleConfig, OdometrySample, Pose2D, PoseEkf, PoseObservation, RateSample,
    TransformStore, TransformStoreConfig, Twist2D,
};

// ============================================================================
// Test Configuration
// ============================================================================

/// EKF with zero process noise for exact prediction checks.
fn zero_noise_ekf() -> EkfConfig {
    EkfConfig {
        motion_noise: MotionNoise {
            trans_per_v2: 0.0,
            trans_per_w2: 0.0,
            rot_per_v2: 0.0,
            rot_per_w2: 0.0,
        },
        pitch: 0.0,
    }
}

/// Noise schedule that reaches the floor within ten reliable signals.
fn fast_schedule() -> NoiseScheduleConfig {
    NoiseScheduleConfig {
        reset_value: 1.0,
        decay: 0.5,
        floor: 0.001,
    }
}

fn odometry(linear: f32, timestamp_us: u64) -> OdometrySample {
    OdometrySample {
        frame_id: "odom".to_string(),
        child_frame_id: "base_link".to_string(),
        pose: Pose2D::identity(),
        linear,
        timestamp_us,
    }
}

fn observation(x: f32, y: f32, yaw: f32, timestamp_us: u64) -> PoseObservation {
    PoseObservation {
        frame_id: "map".to_string(),
        x,
        y,
        yaw,
        timestamp_us,
    }
}

// ============================================================================
// Init gating
// ============================================================================

#[test]
fn uninitialized_loop_ignores_all_inputs() {
    let bus = Arc::new(InputBus::new(InputBusConfig::default(), None));
    let output = LatestOutput::new();
    let store = Arc::new(TransformStore::new(TransformStoreConfig::default()));
    let mut fusion_loop = FusionLoop::new(
        FusionLoopConfig::default(),
        bus.clone(),
        store,
        output.clone(),
    );

    for ts in 0..50u64 {
        bus.push_odometry(odometry(1.0, ts));
        bus.push_rate(RateSample {
            angular: 0.3,
            timestamp_us: ts,
        });
        bus.push_observation(observation(5.0, 5.0, 1.0, ts));
        bus.set_reliability(ts % 2 == 0);
        fusion_loop.tick(ts);
    }

    assert!(!fusion_loop.is_running());
    assert_eq!(output.read(|s| s.pose_count), 0);
    assert_eq!(output.read(|s| s.transform_count), 0);
}

#[test]
fn first_initial_pose_command_wins() {
    let bus = Arc::new(InputBus::new(InputBusConfig::default(), None));
    let output = LatestOutput::new();
    let store = Arc::new(TransformStore::new(TransformStoreConfig::default()));
    let mut fusion_loop = FusionLoop::new(
        FusionLoopConfig::default(),
        bus.clone(),
        store,
        output.clone(),
    );

    assert!(bus.request_initial_pose(2.0, 3.0, 0.5));
    assert!(!bus.request_initial_pose(-7.0, -7.0, -1.0));

    fusion_loop.tick(0);
    assert!(fusion_loop.is_running());

    let pose = output.latest_pose().unwrap();
    assert_relative_eq!(pose.pose.x, 2.0, epsilon = 1e-6);
    assert_relative_eq!(pose.pose.y, 3.0, epsilon = 1e-6);
    assert_relative_eq!(pose.pose.theta, 0.5, epsilon = 1e-6);

    // Re-initialization stays rejected while running.
    assert!(!bus.request_initial_pose(0.0, 0.0, 0.0));
}

// ============================================================================
// Predict / correct sequencing
// ============================================================================

#[test]
fn predict_requires_both_motion_and_rate() {
    let bus = Arc::new(InputBus::new(
        InputBusConfig {
            initial_pose: Some(Pose2D::identity()),
            ..Default::default()
        },
        None,
    ));
    let output = LatestOutput::new();
    let store = Arc::new(TransformStore::new(TransformStoreConfig::default()));
    let config = FusionLoopConfig {
        ekf: zero_noise_ekf(),
        ..Default::default()
    };
    let mut fusion_loop = FusionLoop::new(config, bus.clone(), store, output.clone());

    // Only odometry: no prediction may run.
    bus.push_odometry(odometry(1.0, 0));
    fusion_loop.tick(0);
    assert_relative_eq!(output.latest_pose().unwrap().pose.x, 0.0, epsilon = 1e-6);

    // Rate arrives: the next tick predicts with the fallback dt (1/20 s).
    bus.push_rate(RateSample {
        angular: 0.0,
        timestamp_us: 0,
    });
    fusion_loop.tick(1);
    let x = output.latest_pose().unwrap().pose.x;
    assert_relative_eq!(x, 0.05, epsilon = 1e-4);
}

#[test]
fn correction_converges_to_observation_at_noise_floor() {
    let bus = Arc::new(InputBus::new(
        InputBusConfig {
            initial_pose: Some(Pose2D::identity()),
            noise: fast_schedule(),
            initial_observation_noise: [1.0; 3],
            ..Default::default()
        },
        None,
    ));
    let output = LatestOutput::new();
    let store = Arc::new(TransformStore::new(TransformStoreConfig::default()));
    let mut fusion_loop = FusionLoop::new(
        FusionLoopConfig {
            ekf: zero_noise_ekf(),
            initial_variances: [0.1; 3],
            ..Default::default()
        },
        bus.clone(),
        store,
        output.clone(),
    );

    // Drive the noise schedule to its floor.
    for _ in 0..10 {
        bus.set_reliability(false);
    }

    // Repeatedly observe the same pose; the estimate must converge.
    for ts in 0..20u64 {
        bus.push_observation(observation(1.0, -0.5, 0.2, ts));
        fusion_loop.tick(ts);
    }

    let pose = output.latest_pose().unwrap().pose;
    assert_relative_eq!(pose.x, 1.0, epsilon = 1e-3);
    assert_relative_eq!(pose.y, -0.5, epsilon = 1e-3);
    assert_relative_eq!(pose.theta, 0.2, epsilon = 1e-3);
}

#[test]
fn correction_shrinks_covariance_trace() {
    // Scenario: predict forward, then fuse a floor-noise observation.
    let mut ekf = PoseEkf::new([0.0; 3], [0.01; 3], zero_noise_ekf());
    ekf.predict(&Twist2D::new(1.0, 0.0), 1.0);

    let state = ekf.state();
    assert_relative_eq!(state[0], 1.0, epsilon = 1e-5);
    assert_relative_eq!(state[1], 0.0, epsilon = 1e-5);
    assert_relative_eq!(state[2], 0.0, epsilon = 1e-5);

    let trace_before = ekf.covariance().trace();
    assert!(trace_before > 0.01);

    assert!(ekf.correct(&[1.0, 0.0, 0.0], &[0.001; 3]));
    assert!(ekf.covariance().trace() < trace_before);
}

#[test]
fn unreliable_observations_barely_move_the_estimate() {
    let bus = Arc::new(InputBus::new(
        InputBusConfig {
            initial_pose: Some(Pose2D::identity()),
            noise: NoiseScheduleConfig::default(),
            initial_observation_noise: [0.01; 3],
            ..Default::default()
        },
        None,
    ));
    let output = LatestOutput::new();
    let store = Arc::new(TransformStore::new(TransformStoreConfig::default()));
    let mut fusion_loop = FusionLoop::new(
        FusionLoopConfig {
            ekf: zero_noise_ekf(),
            initial_variances: [0.01; 3],
            ..Default::default()
        },
        bus.clone(),
        store,
        output.clone(),
    );

    // Mark the matcher unreliable, then deliver a wild observation.
    bus.set_reliability(true);
    bus.push_observation(observation(50.0, 50.0, 2.0, 0));
    fusion_loop.tick(0);

    let pose = output.latest_pose().unwrap().pose;
    assert!(pose.x < 0.1, "distrusted observation moved x to {}", pose.x);
    assert!(pose.y < 0.1);
}

// ============================================================================
// Transform chain
// ============================================================================

#[test]
fn transform_follows_filtered_pose_and_survives_lookup_failure() {
    let store = Arc::new(TransformStore::new(TransformStoreConfig {
        max_age_us: 100_000,
        ..Default::default()
    }));
    let bus = Arc::new(InputBus::new(
        InputBusConfig {
            initial_pose: Some(Pose2D::new(1.0, 2.0, 0.0)),
            ..Default::default()
        },
        Some(store.clone()),
    ));
    let output = LatestOutput::new();
    let mut fusion_loop = FusionLoop::new(
        FusionLoopConfig {
            ekf: zero_noise_ekf(),
            ..Default::default()
        },
        bus.clone(),
        store,
        output.clone(),
    );

    // Odometry at the lookup's origin: odom->base is identity, so the
    // reference->odometry transform equals the filtered pose.
    bus.push_odometry(odometry(0.0, 1000));
    bus.push_rate(RateSample {
        angular: 0.0,
        timestamp_us: 1000,
    });
    fusion_loop.tick(1000);

    let good = output.latest_transform().unwrap();
    assert_eq!(good.parent, "map");
    assert_eq!(good.child, "odom");
    assert_relative_eq!(good.transform.x, 1.0, epsilon = 1e-5);
    assert_relative_eq!(good.transform.y, 2.0, epsilon = 1e-5);

    // No fresh odometry: the stored transform goes stale, the published
    // transform must equal the previous tick's.
    fusion_loop.tick(10_000_000);
    let held = output.latest_transform().unwrap();
    assert_eq!(held.transform, good.transform);
    assert_eq!(output.read(|s| s.transform_count), 2);
}

// ============================================================================
// Covariance health
// ============================================================================

#[test]
fn covariance_stays_symmetric_through_noisy_run() {
    let bus = Arc::new(InputBus::new(
        InputBusConfig {
            initial_pose: Some(Pose2D::identity()),
            noise: fast_schedule(),
            ..Default::default()
        },
        None,
    ));
    let output = LatestOutput::new();
    let store = Arc::new(TransformStore::new(TransformStoreConfig::default()));
    let mut fusion_loop = FusionLoop::new(
        FusionLoopConfig::default(),
        bus.clone(),
        store,
        output.clone(),
    );

    for ts in 0..200u64 {
        bus.push_odometry(odometry(0.4, ts));
        bus.push_rate(RateSample {
            angular: 0.2,
            timestamp_us: ts,
        });
        if ts % 5 == 0 {
            let x = 0.02 * ts as f32;
            bus.push_observation(observation(x, 0.0, 0.0, ts));
            bus.set_reliability(ts % 25 == 0);
        }
        fusion_loop.tick(ts);

        let cov = output.latest_pose().unwrap().covariance;
        assert_relative_eq!(cov[1], cov[6], epsilon = 1e-4);
        assert_relative_eq!(cov[5], cov[30], epsilon = 1e-4);
        assert_relative_eq!(cov[11], cov[31], epsilon = 1e-4);
        assert!(cov[0] >= 0.0 && cov[7] >= 0.0 && cov[35] >= 0.0);
        assert!(cov[0].is_finite() && cov[7].is_finite() && cov[35].is_finite());
    }
}

#[test]
fn published_yaw_is_wrapped_while_tracking_stays_continuous() {
    use std::f32::consts::PI;

    let bus = Arc::new(InputBus::new(
        InputBusConfig {
            initial_pose: Some(Pose2D::new(0.0, 0.0, 3.0)),
            noise: fast_schedule(),
            ..Default::default()
        },
        None,
    ));
    let output = LatestOutput::new();
    let store = Arc::new(TransformStore::new(TransformStoreConfig::default()));
    let mut fusion_loop = FusionLoop::new(
        FusionLoopConfig {
            ekf: zero_noise_ekf(),
            initial_variances: [0.1; 3],
            ..Default::default()
        },
        bus.clone(),
        store,
        output.clone(),
    );

    for _ in 0..10 {
        bus.set_reliability(false);
    }

    // Observed heading rotates CCW across the +π boundary: the wrapped
    // reports jump from +3.1 to -3.1, the unwrapped signal continues
    // smoothly past π to about 3.28 rad.
    let mut ts = 0u64;
    for &yaw in &[3.0, 3.1, -3.1, -3.0, -3.0, -3.0, -3.0, -3.0, -3.0, -3.0, -3.0] {
        bus.push_observation(observation(0.0, 0.0, yaw, ts));
        fusion_loop.tick(ts);
        ts += 1;
    }

    // Internally the heading settled beyond +π; the published value is
    // wrapped onto the canonical range, landing near -π.
    let pose = output.latest_pose().unwrap().pose;
    assert!(pose.theta >= -PI && pose.theta <= PI);
    assert!(
        pose.theta < -2.9,
        "expected wrap onto the negative side, got {}",
        pose.theta
    );
}
