//! Publisher thread: periodic status reporting of the fused output.
//!
//! Message transport is external to this crate; the publisher thread is
//! the pass-through side effect that surfaces the latest estimate for
//! diagnostics at a low rate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::runtime::output::LatestOutput;

/// Publisher thread handle.
pub struct PublisherThread {
    handle: JoinHandle<()>,
}

impl PublisherThread {
    /// Spawn the publisher thread reading from `output` at `status_rate_hz`.
    pub fn spawn(output: LatestOutput, status_rate_hz: f32, running: Arc<AtomicBool>) -> Self {
        let handle = thread::Builder::new()
            .name("publisher".into())
            .spawn(move || {
                run_publisher_loop(output, status_rate_hz, running);
            })
            .expect("Failed to spawn publisher thread");

        Self { handle }
    }

    /// Wait for the thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_publisher_loop(output: LatestOutput, status_rate_hz: f32, running: Arc<AtomicBool>) {
    let interval = Duration::from_secs_f64(1.0 / status_rate_hz as f64);
    let mut last_status = Instant::now();

    log::info!("publisher thread started ({:.1} Hz status)", status_rate_hz);

    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now.duration_since(last_status) >= interval {
            output.read(|state| {
                if let Some(pose) = &state.pose {
                    log::info!(
                        "pose [{}]: ({:.3}, {:.3}, {:.3}) var=({:.4}, {:.4}, {:.4})",
                        pose.frame_id,
                        pose.pose.x,
                        pose.pose.y,
                        pose.pose.theta,
                        pose.covariance[0],
                        pose.covariance[7],
                        pose.covariance[35]
                    );
                }
                if let Some(tf) = &state.transform {
                    log::debug!(
                        "transform {} -> {}: ({:.3}, {:.3}, {:.3})",
                        tf.parent,
                        tf.child,
                        tf.transform.x,
                        tf.transform.y,
                        tf.transform.theta
                    );
                }
            });
            last_status = now;
        }

        thread::sleep(Duration::from_millis(10));
    }

    log::info!("publisher thread shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_thread_starts_and_stops() {
        let output = LatestOutput::new();
        let running = Arc::new(AtomicBool::new(true));

        let publisher = PublisherThread::spawn(output, 100.0, running.clone());
        thread::sleep(Duration::from_millis(30));
        running.store(false, Ordering::Relaxed);

        assert!(publisher.join().is_ok());
    }
}
