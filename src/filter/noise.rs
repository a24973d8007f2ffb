//! Adaptive observation-noise scheduling.
//!
//! The map matcher's reliability is judged externally (it degrades during
//! fast rotation and poor registration). While the signal reports
//! "unreliable" the observation variance is pinned at a large value so the
//! correction step barely moves the estimate; once the signal clears, the
//! variance decays geometrically back down to a floor. The floor keeps the
//! innovation covariance invertible, so observations are never trusted
//! absolutely nor discarded entirely.

/// Configuration for the observation-noise scheduler.
#[derive(Debug, Clone, Copy)]
pub struct NoiseScheduleConfig {
    /// Variance applied to all axes while the observation is unreliable
    pub reset_value: f32,
    /// Multiplier applied per reliable signal (0 < decay < 1)
    pub decay: f32,
    /// Lower bound the variances settle at
    pub floor: f32,
}

impl Default for NoiseScheduleConfig {
    fn default() -> Self {
        Self {
            reset_value: 100.0,
            decay: 0.5,
            floor: 0.001,
        }
    }
}

/// Per-axis observation-noise scales (x, y, yaw) driven by the external
/// reliability signal.
#[derive(Debug)]
pub struct NoiseScheduler {
    config: NoiseScheduleConfig,
    scales: [f32; 3],
}

impl NoiseScheduler {
    /// Create a scheduler starting at the given per-axis variances.
    pub fn new(config: NoiseScheduleConfig, initial: [f32; 3]) -> Self {
        Self {
            config,
            scales: initial,
        }
    }

    /// Observation reported unreliable: distrust it on all axes.
    pub fn scale_up(&mut self) {
        self.scales = [self.config.reset_value; 3];
    }

    /// Observation reported reliable: geometrically restore trust.
    ///
    /// All three axes clamp to the floor together as soon as any axis
    /// would fall below it.
    pub fn scale_down(&mut self) {
        for s in &mut self.scales {
            *s *= self.config.decay;
        }
        if self.scales.iter().any(|s| *s < self.config.floor) {
            self.scales = [self.config.floor; 3];
        }
    }

    /// Current per-axis variances (x, y, yaw).
    pub fn current(&self) -> [f32; 3] {
        self.scales
    }
}
