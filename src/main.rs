//! DhruvaFusion daemon entry point.
//!
//! Loads the TOML configuration, wires the input bus, transform store and
//! output, then runs the fusion and publisher threads until shutdown.
//! Message transport is external: producers attach to the daemon through
//! the `InputBus` handle exposed by the library.
//!
//! # Usage
//!
//! ```bash
//! # With default config
//! cargo run --release
//!
//! # With custom config file
//! cargo run --release -- --config dhruva-fusion.toml
//! ```

use std::fs;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;

use dhruva_fusion::{
    EkfConfig, FusionLoopConfig, FusionThread, InputBus, InputBusConfig, LatestOutput, MotionNoise,
    NoiseScheduleConfig, Pose2D, PublisherThread, TransformStore, TransformStoreConfig,
};

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct Config {
    #[serde(default)]
    filter: FilterConfig,
    #[serde(default)]
    initial_pose: InitialPoseConfig,
    #[serde(default)]
    motion_noise: MotionNoiseConfig,
    #[serde(default)]
    observation: ObservationConfig,
    #[serde(default)]
    frames: FramesConfig,
    #[serde(default)]
    output: OutputConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FilterConfig {
    /// Fusion loop tick rate in Hz.
    tick_rate_hz: f32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { tick_rate_hz: 20.0 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct InitialPoseConfig {
    /// Commit the configured pose at startup. When false, the filter
    /// waits for an external initial-pose command.
    auto_commit: bool,
    x: f32,
    y: f32,
    yaw: f32,
    /// Initial variances (x, y, yaw).
    sig_x: f32,
    sig_y: f32,
    sig_yaw: f32,
}

impl Default for InitialPoseConfig {
    fn default() -> Self {
        Self {
            auto_commit: false,
            x: 0.0,
            y: 0.0,
            yaw: 0.0,
            sig_x: 0.01,
            sig_y: 0.01,
            sig_yaw: 0.01,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MotionNoiseConfig {
    /// Translational variance per squared linear velocity.
    trans_per_v2: f32,
    /// Translational variance per squared angular velocity.
    trans_per_w2: f32,
    /// Rotational variance per squared linear velocity.
    rot_per_v2: f32,
    /// Rotational variance per squared angular velocity.
    rot_per_w2: f32,
    /// Platform pitch in radians (0 on level ground).
    pitch: f32,
}

impl Default for MotionNoiseConfig {
    fn default() -> Self {
        let noise = MotionNoise::default();
        Self {
            trans_per_v2: noise.trans_per_v2,
            trans_per_w2: noise.trans_per_w2,
            rot_per_v2: noise.rot_per_v2,
            rot_per_w2: noise.rot_per_w2,
            pitch: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ObservationConfig {
    /// Initial per-axis observation variances.
    sig_x: f32,
    sig_y: f32,
    sig_yaw: f32,
    /// Variance applied while the observation is unreliable.
    reset_value: f32,
    /// Decay multiplier per reliable signal.
    decay: f32,
    /// Variance floor.
    floor: f32,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        let schedule = NoiseScheduleConfig::default();
        Self {
            sig_x: 1.0,
            sig_y: 1.0,
            sig_yaw: 1.0,
            reset_value: schedule.reset_value,
            decay: schedule.decay,
            floor: schedule.floor,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FramesConfig {
    reference_frame: String,
    odometry_frame: String,
    body_frame: String,
    /// Publish the reference→odometry transform.
    publish_transform: bool,
    /// Maintain the odometry→body transform from the odometry stream.
    publish_odom_transform: bool,
    /// Maximum transform age accepted by the lookup, in milliseconds.
    transform_max_age_ms: u64,
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            reference_frame: "map".to_string(),
            odometry_frame: "odom".to_string(),
            body_frame: "base_link".to_string(),
            publish_transform: true,
            publish_odom_transform: true,
            transform_max_age_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OutputConfig {
    /// Status logging rate in Hz.
    status_rate_hz: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { status_rate_hz: 1.0 }
    }
}

// ============================================================================
// CLI Arguments
// ============================================================================

struct Args {
    config_path: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args { config_path: None };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("dhruva-fusion - pose fusion daemon for map-matched localization");
    println!();
    println!("USAGE:");
    println!("    dhruva-fusion [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>     Configuration file (default: dhruva-fusion.toml)");
    println!("    -h, --help              Print help information");
    println!();
    println!("CONFIGURATION:");
    println!("    All settings are configured via the TOML config file:");
    println!("    - [filter] tick_rate_hz: fusion loop rate");
    println!("    - [initial_pose] auto_commit, x, y, yaw, sig_*: filter seeding");
    println!("    - [motion_noise] control-noise growth coefficients");
    println!("    - [observation] noise schedule (reset/decay/floor)");
    println!("    - [frames] frame names and transform publication toggles");
}

fn load_config(args: &Args) -> Config {
    match &args.config_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(contents) => match basic_toml::from_str(&contents) {
                Ok(cfg) => {
                    log::info!("Loaded config from {}", path);
                    cfg
                }
                Err(e) => {
                    log::warn!("Failed to parse config {}: {}", path, e);
                    Config::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read config {}: {}", path, e);
                Config::default()
            }
        },
        None => {
            for path in &["dhruva-fusion.toml", "/etc/dhruva-fusion.toml"] {
                if let Ok(contents) = fs::read_to_string(path)
                    && let Ok(cfg) = basic_toml::from_str(&contents)
                {
                    log::info!("Loaded config from {}", path);
                    return cfg;
                }
            }
            Config::default()
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = parse_args();
    let config = load_config(&args);

    log::info!("dhruva-fusion starting");
    log::info!("  Tick rate: {:.1} Hz", config.filter.tick_rate_hz);
    log::info!(
        "  Frames: {} -> {} -> {}",
        config.frames.reference_frame,
        config.frames.odometry_frame,
        config.frames.body_frame
    );
    log::info!(
        "  Initial pose: {}",
        if config.initial_pose.auto_commit {
            "from config"
        } else {
            "awaiting external command"
        }
    );

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    // Transform side-channel: the odometry stream keeps odom->base fresh.
    let store = Arc::new(TransformStore::new(TransformStoreConfig {
        parent_frame: config.frames.odometry_frame.clone(),
        child_frame: config.frames.body_frame.clone(),
        max_age_us: config.frames.transform_max_age_ms * 1000,
    }));

    let initial_pose = if config.initial_pose.auto_commit {
        Some(Pose2D::new(
            config.initial_pose.x,
            config.initial_pose.y,
            config.initial_pose.yaw,
        ))
    } else {
        None
    };

    let bus = Arc::new(InputBus::new(
        InputBusConfig {
            reference_frame: config.frames.reference_frame.clone(),
            odometry_frame: config.frames.odometry_frame.clone(),
            body_frame: config.frames.body_frame.clone(),
            noise: NoiseScheduleConfig {
                reset_value: config.observation.reset_value,
                decay: config.observation.decay,
                floor: config.observation.floor,
            },
            initial_observation_noise: [
                config.observation.sig_x,
                config.observation.sig_y,
                config.observation.sig_yaw,
            ],
            initial_pose,
        },
        config.frames.publish_odom_transform.then(|| store.clone()),
    ));

    let loop_config = FusionLoopConfig {
        tick_rate_hz: config.filter.tick_rate_hz,
        publish_transform: config.frames.publish_transform,
        ekf: EkfConfig {
            motion_noise: MotionNoise {
                trans_per_v2: config.motion_noise.trans_per_v2,
                trans_per_w2: config.motion_noise.trans_per_w2,
                rot_per_v2: config.motion_noise.rot_per_v2,
                rot_per_w2: config.motion_noise.rot_per_w2,
            },
            pitch: config.motion_noise.pitch,
        },
        initial_variances: [
            config.initial_pose.sig_x,
            config.initial_pose.sig_y,
            config.initial_pose.sig_yaw,
        ],
    };

    let output = LatestOutput::new();

    log::info!("Spawning threads...");

    let fusion_thread = FusionThread::spawn(
        loop_config,
        bus.clone(),
        store,
        output.clone(),
        running.clone(),
    );
    log::info!("  Fusion thread started");

    let publisher_thread =
        PublisherThread::spawn(output, config.output.status_rate_hz, running.clone());
    log::info!("  Publisher thread started");

    // Wait for shutdown signal (main thread just monitors)
    while running.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(100));
    }

    log::info!("Shutdown signal received, waiting for threads...");

    if let Err(e) = fusion_thread.join() {
        log::error!("Fusion thread panicked: {:?}", e);
    }
    if let Err(e) = publisher_thread.join() {
        log::error!("Publisher thread panicked: {:?}", e);
    }

    log::info!("dhruva-fusion shutdown complete");
}
