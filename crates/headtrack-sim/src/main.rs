//! Simulated host for the head-tracking worker.
//!
//! Drives a HeadTracker through the lifecycle a mobile host would produce:
//! window creation, resume/pause cycles, input, window loss and stop. The
//! context and backend are simulated, so the whole run happens in-process.

mod backend;
mod context;
mod listener;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use headtrack_core::{HeadTracker, WorkerConfig};
use headtrack_hal::NativeWindow;

use backend::SimBackend;
use context::SimContext;
use listener::LoggingListener;

/// Handle value of the simulated window.
const SIM_WINDOW_HANDLE: usize = 0x5157;

#[derive(Parser)]
#[command(name = "headtrack-sim")]
#[command(about = "Run the head-tracking worker against a simulated device", long_about = None)]
#[command(version)]
struct Cli {
    /// How long each resumed period lasts, in milliseconds
    #[arg(long, default_value = "250")]
    active_ms: u64,

    /// Number of resume/pause cycles
    #[arg(long, default_value = "2")]
    cycles: u32,

    /// Pose sampling interval, in milliseconds
    #[arg(long, default_value = "16")]
    frame_interval_ms: u64,

    /// Message queue capacity (power of two)
    #[arg(long, default_value = "1024")]
    queue_capacity: usize,

    /// Simulated head yaw rate, in degrees per second
    #[arg(long, default_value = "45")]
    yaw_rate: f32,

    /// Log every Nth pose
    #[arg(long, default_value = "10")]
    pose_every: u64,

    /// Report the window in portrait orientation
    #[arg(long)]
    portrait: bool,

    /// Make backend initialization fail
    #[arg(long)]
    fail_init: bool,

    /// Suppress progress output (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn window(&self) -> NativeWindow {
        if self.portrait {
            NativeWindow::new(SIM_WINDOW_HANDLE, 1080, 1920)
        } else {
            NativeWindow::new(SIM_WINDOW_HANDLE, 1920, 1080)
        }
    }

    fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            queue_capacity: self.queue_capacity,
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            ..WorkerConfig::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    log::info!("headtrack-sim starting");

    let backend = SimBackend::new(cli.yaw_rate.to_radians(), cli.fail_init);
    let mut tracker = HeadTracker::start(SimContext::new(), backend, cli.worker_config())
        .context("failed to start head tracker")?;

    let listener = Arc::new(LoggingListener::new(cli.pose_every));
    tracker.add_listener(listener.clone());

    tracker.set_window(Some(cli.window()));
    for cycle in 1..=cli.cycles {
        log::info!("cycle {cycle}: resume");
        tracker.resume();
        tracker.key_event(96, 0);
        tracker.touch_event(0, 960.0, 540.0);
        thread::sleep(Duration::from_millis(cli.active_ms));
        log::info!("cycle {cycle}: pause");
        tracker.pause();
    }
    tracker.set_window(None);

    let data = tracker.data();
    let handled = tracker.stop().context("worker did not shut down cleanly")?;
    log::info!(
        "headtrack-sim done: {handled} messages handled, {} poses received",
        listener.poses()
    );

    if !data.error_message.is_empty() {
        bail!("tracking failed: {}", data.error_message);
    }
    if cli.cycles > 0 && !data.started {
        bail!("tracking never started");
    }
    Ok(())
}
