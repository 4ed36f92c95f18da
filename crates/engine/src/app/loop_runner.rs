use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::input::InputSource;
use super::metrics::MetricsAccumulator;
use super::registry::EntityRegistry;
use super::rendering::{RenderContext, RenderSink, Viewport};
use super::MetricsHandle;

pub const DEFAULT_TICK: Duration = Duration::from_millis(16);
const DEFAULT_METRICS_LOG_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub tick_ms: u64,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval_ms: u64,
    pub screen_width: u32,
    pub screen_height: u32,
    pub virtual_width: f64,
    pub virtual_height: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK.as_millis() as u64,
            max_ticks_per_frame: 5,
            metrics_log_interval_ms: DEFAULT_METRICS_LOG_INTERVAL.as_millis() as u64,
            screen_width: 800,
            screen_height: 600,
            virtual_width: 2000.0,
            virtual_height: 2000.0,
        }
    }
}

impl LoopConfig {
    pub fn tick(&self) -> Duration {
        normalize_non_zero_duration(Duration::from_millis(self.tick_ms), DEFAULT_TICK)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.screen_width,
            height: self.screen_height,
            virtual_width: self.virtual_width,
            virtual_height: self.virtual_height,
        }
    }

    fn metrics_log_interval(&self) -> Duration {
        normalize_non_zero_duration(
            Duration::from_millis(self.metrics_log_interval_ms),
            DEFAULT_METRICS_LOG_INTERVAL,
        )
    }
}

/// Wall-clock source. Only ever sampled, never waited on.
pub trait Clock {
    fn elapsed(&self) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.start)
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PlatformError {
    message: String,
}

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Continue,
    Quit,
}

/// Window, input and presentation plumbing the scheduler runs inside.
pub trait Platform: InputSource + RenderSink {
    fn init(&mut self) -> Result<(), PlatformError>;
    fn poll_events(&mut self) -> Result<PollOutcome, PlatformError>;
    fn present(&mut self) -> Result<(), PlatformError>;
    /// Releases platform resources. Called exactly once per `run`, whatever
    /// the outcome.
    fn shutdown(&mut self);
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("platform failed to initialize: {0}")]
    PlatformInit(#[source] PlatformError),
    #[error("platform event polling failed: {0}")]
    PlatformPoll(#[source] PlatformError),
    #[error("platform failed to present a frame: {0}")]
    PlatformPresent(#[source] PlatformError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Terminating,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub ticks_run: u32,
    pub dropped_ticks: u64,
    pub elapsed: Duration,
    pub simulated_time: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub ticks: u64,
    pub simulated_time: Duration,
    pub slip: Duration,
}

/// Catches a fixed-tick simulation up to wall-clock time, a bounded number of
/// ticks per frame.
///
/// Simulated time only advances in whole ticks. Backlog beyond
/// `max_ticks_per_frame` is dropped in whole ticks and accumulated as slip, so
/// `simulated_time + slip <= elapsed` holds after every frame.
pub struct FixedTimestepScheduler<C: Clock> {
    clock: C,
    config: LoopConfig,
    tick: Duration,
    max_ticks_per_frame: u32,
    state: SchedulerState,
    simulated_time: Duration,
    slip: Duration,
    frames: u64,
    ticks: u64,
    last_frame_at: Duration,
    metrics: MetricsAccumulator,
    metrics_handle: MetricsHandle,
}

impl<C: Clock> FixedTimestepScheduler<C> {
    pub fn new(config: LoopConfig, clock: C) -> Self {
        Self::with_metrics(config, clock, MetricsHandle::default())
    }

    pub fn with_metrics(config: LoopConfig, clock: C, metrics_handle: MetricsHandle) -> Self {
        let tick = config.tick();
        let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
        let now = clock.elapsed();
        let metrics = MetricsAccumulator::new(config.metrics_log_interval(), now);
        Self {
            clock,
            config,
            tick,
            max_ticks_per_frame,
            state: SchedulerState::Idle,
            simulated_time: Duration::ZERO,
            slip: Duration::ZERO,
            frames: 0,
            ticks: 0,
            last_frame_at: now,
            metrics,
            metrics_handle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn simulated_time(&self) -> Duration {
        self.simulated_time
    }

    pub fn slip(&self) -> Duration {
        self.slip
    }

    pub fn metrics_handle(&self) -> &MetricsHandle {
        &self.metrics_handle
    }

    pub fn summary(&self) -> LoopSummary {
        LoopSummary {
            frames: self.frames,
            ticks: self.ticks,
            simulated_time: self.simulated_time,
            slip: self.slip,
        }
    }

    /// Stops all future ticks. A tick already running is not interrupted.
    pub fn request_quit(&mut self) {
        if self.state != SchedulerState::Terminating {
            info!(reason = "external", "shutdown_requested");
            self.state = SchedulerState::Terminating;
        }
    }

    /// Drives the registry until the platform or the input asks to quit, or
    /// the platform fails. `platform.shutdown()` always runs once init has
    /// been attempted.
    pub fn run<P: Platform>(
        &mut self,
        registry: &mut EntityRegistry,
        platform: &mut P,
    ) -> Result<LoopSummary, SchedulerError> {
        if self.state == SchedulerState::Terminating {
            warn!("scheduler_already_terminated");
            return Ok(self.summary());
        }

        info!(
            tick_ms = self.tick.as_millis() as u64,
            max_ticks_per_frame = self.max_ticks_per_frame,
            metrics_log_interval_ms = self.config.metrics_log_interval().as_millis() as u64,
            entity_count = registry.len(),
            "loop_config"
        );

        if let Err(error) = platform.init() {
            warn!(error = %error, "platform_init_failed");
            self.state = SchedulerState::Terminating;
            platform.shutdown();
            return Err(SchedulerError::PlatformInit(error));
        }
        self.state = SchedulerState::Running;
        let render_ctx = RenderContext::new(self.config.viewport());

        let outcome = loop {
            match platform.poll_events() {
                Ok(PollOutcome::Continue) => {}
                Ok(PollOutcome::Quit) => {
                    info!(reason = "platform", "shutdown_requested");
                    self.state = SchedulerState::Terminating;
                    break Ok(());
                }
                Err(error) => {
                    warn!(error = %error, "platform_poll_failed");
                    self.state = SchedulerState::Terminating;
                    break Err(SchedulerError::PlatformPoll(error));
                }
            }

            self.run_frame(registry, platform);
            registry.show_all(&render_ctx, platform);

            if let Err(error) = platform.present() {
                warn!(error = %error, "platform_present_failed");
                self.state = SchedulerState::Terminating;
                break Err(SchedulerError::PlatformPresent(error));
            }
            if self.state == SchedulerState::Terminating {
                break Ok(());
            }
        };

        platform.shutdown();
        info!(
            frames = self.frames,
            ticks = self.ticks,
            simulated_ms = self.simulated_time.as_millis() as u64,
            slip_ms = self.slip.as_millis() as u64,
            "shutdown"
        );
        outcome.map(|()| self.summary())
    }

    /// One outer iteration without platform plumbing: sample the clock and
    /// run every due tick, up to the per-frame cap.
    pub fn run_frame(
        &mut self,
        registry: &mut EntityRegistry,
        input: &mut dyn InputSource,
    ) -> FrameReport {
        let now = self.clock.elapsed();
        if self.state == SchedulerState::Terminating {
            return FrameReport {
                elapsed: now,
                simulated_time: self.simulated_time,
                ..FrameReport::default()
            };
        }
        self.state = SchedulerState::Running;

        let frame_dt = now.saturating_sub(self.last_frame_at);
        self.last_frame_at = now;

        let plan = plan_sim_steps(
            now,
            self.simulated_time.saturating_add(self.slip),
            self.tick,
            self.max_ticks_per_frame,
        );

        let mut ticks_run = 0u32;
        for _ in 0..plan.ticks_to_run {
            let snapshot = input.snapshot_for_tick();
            registry.step(&snapshot);
            self.simulated_time = self.simulated_time.saturating_add(self.tick);
            self.ticks = self.ticks.saturating_add(1);
            ticks_run = ticks_run.saturating_add(1);
            self.metrics.record_tick();

            if snapshot.quit_requested() {
                info!(reason = "input", "shutdown_requested");
                self.state = SchedulerState::Terminating;
                break;
            }
        }

        let mut dropped_ticks = 0;
        if self.state != SchedulerState::Terminating && plan.dropped_ticks > 0 {
            dropped_ticks = plan.dropped_ticks;
            self.slip = self.slip.saturating_add(plan.dropped_backlog);
            self.metrics.record_dropped_ticks(dropped_ticks);
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_millis() as u64,
                dropped_ticks,
                max_ticks_per_frame = self.max_ticks_per_frame,
                "sim_clamp_triggered"
            );
        }

        self.frames = self.frames.saturating_add(1);
        self.metrics.record_frame(frame_dt);
        if let Some(snapshot) = self.metrics.maybe_snapshot(now) {
            self.metrics_handle.publish(snapshot);
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                max_ticks_in_frame = snapshot.max_ticks_in_frame,
                dropped_ticks = snapshot.dropped_ticks,
                entity_count = registry.len(),
                "loop_metrics"
            );
        }

        FrameReport {
            ticks_run,
            dropped_ticks,
            elapsed: now,
            simulated_time: self.simulated_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    dropped_ticks: u64,
    dropped_backlog: Duration,
}

/// `consumed` is simulated time plus slip so far.
fn plan_sim_steps(
    elapsed: Duration,
    consumed: Duration,
    tick: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let backlog = elapsed.saturating_sub(consumed);
    let due = backlog.as_nanos() / tick.as_nanos().max(1);
    let ticks_to_run = due.min(u128::from(max_ticks_per_frame)) as u32;
    let dropped = due - u128::from(ticks_to_run);
    let dropped_nanos = dropped.saturating_mul(tick.as_nanos());

    StepPlan {
        ticks_to_run,
        dropped_ticks: u64::try_from(dropped).unwrap_or(u64::MAX),
        dropped_backlog: Duration::from_nanos(u64::try_from(dropped_nanos).unwrap_or(u64::MAX)),
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
