//! Fixed-rate fusion loop.
//!
//! The loop is a two-state machine. While `Uninitialized` every tick is a
//! no-op wait for the initial pose to commit; once it does, the filter is
//! seeded and the loop transitions to `Running` permanently. A running
//! tick consumes whatever inputs arrived since the last tick:
//!
//! 1. predict, when both the motion and rate signals are set (dt from the
//!    wall clock, with a fixed fallback on the first predicting tick);
//! 2. correct, when a new observation is available;
//! 3. refresh the reference→odometry transform (best effort);
//! 4. publish pose, covariance and transform.
//!
//! Nothing in the tick blocks beyond the bounded coordinate lookup, and a
//! tick with no new data simply republishes the previous output.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::filter::{EkfConfig, PoseEkf};
use crate::frames::{FrameComposer, FrameLookup};
use crate::runtime::inputs::InputBus;
use crate::runtime::output::{FrameTransform, FusionOutput, PoseEstimate};

/// Configuration for the fusion loop.
#[derive(Debug, Clone)]
pub struct FusionLoopConfig {
    /// Tick rate in Hz
    pub tick_rate_hz: f32,
    /// Whether the reference→odometry transform is published
    pub publish_transform: bool,
    /// Filter configuration
    pub ekf: EkfConfig,
    /// Initial per-axis state variances (x, y, yaw)
    pub initial_variances: [f32; 3],
}

impl Default for FusionLoopConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20.0,
            publish_transform: true,
            ekf: EkfConfig::default(),
            initial_variances: [0.01, 0.01, 0.01],
        }
    }
}

/// Loop state: the filter exists only once an initial pose committed.
#[derive(Debug)]
enum LoopState {
    /// Waiting for the initial pose; ticks produce no output.
    Uninitialized,
    /// Filtering and publishing.
    Running { ekf: PoseEkf },
}

/// The fixed-rate estimation loop.
pub struct FusionLoop<L, O> {
    config: FusionLoopConfig,
    bus: Arc<InputBus>,
    lookup: L,
    output: O,
    state: LoopState,
    composer: FrameComposer,
    /// Wall-clock instant of the last predicting tick.
    last_predict: Option<Instant>,
}

impl<L: FrameLookup, O: FusionOutput> FusionLoop<L, O> {
    /// Create a loop in the `Uninitialized` state.
    pub fn new(config: FusionLoopConfig, bus: Arc<InputBus>, lookup: L, output: O) -> Self {
        Self {
            config,
            bus,
            lookup,
            output,
            state: LoopState::Uninitialized,
            composer: FrameComposer::new(),
            last_predict: None,
        }
    }

    /// Whether the initial pose has committed.
    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running { .. })
    }

    /// Execute one tick, stamping outputs with `timestamp_us`.
    pub fn tick(&mut self, timestamp_us: u64) {
        if let LoopState::Uninitialized = self.state {
            match self.bus.take_initial_pose() {
                Some(initial) => {
                    log::info!(
                        "filter initialized at ({:.3}, {:.3}, {:.3})",
                        initial.x,
                        initial.y,
                        initial.theta
                    );
                    let ekf = PoseEkf::new(
                        [initial.x, initial.y, initial.theta],
                        self.config.initial_variances,
                        self.config.ekf,
                    );
                    self.state = LoopState::Running { ekf };
                }
                None => return,
            }
        }

        let ekf = match &mut self.state {
            LoopState::Running { ekf } => ekf,
            LoopState::Uninitialized => return,
        };

        if let Some(control) = self.bus.take_control() {
            let now = Instant::now();
            let dt = match self.last_predict {
                Some(prev) => (now - prev).as_secs_f32(),
                None => 1.0 / self.config.tick_rate_hz,
            };
            self.last_predict = Some(now);
            ekf.predict(&control, dt);
            log::debug!(
                "predict: v={:.3} w={:.3} dt={:.4}",
                control.linear,
                control.angular,
                dt
            );
        }

        if let Some(observation) = self.bus.take_observation() {
            let scales = self.bus.noise_scales();
            if !ekf.correct(&observation, &scales) {
                log::warn!("innovation covariance singular, correction skipped");
            }
        }

        let labels = self.bus.frame_labels();
        let pose = ekf.pose();

        if self.config.publish_transform
            && let Some(transform) = self.composer.update(
                pose,
                &self.lookup,
                &labels.odometry,
                &labels.body,
                timestamp_us,
            )
        {
            self.output.publish_transform(&FrameTransform {
                parent: labels.reference.clone(),
                child: labels.odometry.clone(),
                transform,
                timestamp_us,
            });
        }

        self.output.publish_pose(&PoseEstimate {
            frame_id: labels.reference,
            child_frame_id: labels.body,
            pose,
            covariance: ekf.covariance().to_pose_covariance(),
            timestamp_us,
        });
    }

    /// Run ticks at the configured rate until the flag clears.
    pub fn run(&mut self, running: Arc<AtomicBool>) {
        let period = Duration::from_secs_f32(1.0 / self.config.tick_rate_hz);
        log::info!("fusion loop running at {:.1} Hz", self.config.tick_rate_hz);

        while running.load(Ordering::Relaxed) {
            let started = Instant::now();
            self.tick(now_us());
            if let Some(remaining) = period.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }

        log::info!("fusion loop stopped");
    }
}

/// Fusion thread handle.
pub struct FusionThread {
    handle: JoinHandle<()>,
}

impl FusionThread {
    /// Spawn the fusion loop on a named thread.
    pub fn spawn<L, O>(
        config: FusionLoopConfig,
        bus: Arc<InputBus>,
        lookup: L,
        output: O,
        running: Arc<AtomicBool>,
    ) -> Self
    where
        L: FrameLookup + Send + 'static,
        O: FusionOutput + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("fusion".into())
            .spawn(move || {
                let mut fusion_loop = FusionLoop::new(config, bus, lookup, output);
                fusion_loop.run(running);
            })
            .expect("Failed to spawn fusion thread");

        Self { handle }
    }

    /// Wait for the thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

/// Current timestamp in microseconds.
fn now_us() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
