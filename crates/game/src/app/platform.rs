use std::thread;
use std::time::Duration;

use engine::{
    Clock, DrawQuad, InputAction, InputSnapshot, InputSource, JoystickInput, ManualClock,
    Platform, PlatformError, PollOutcome, RenderSink,
};
use serde::Deserialize;
use tracing::{debug, info};

/// Input held for simulated time in `[from_seconds, until_seconds)`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct ScriptStep {
    pub(crate) from_seconds: f64,
    pub(crate) until_seconds: f64,
    #[serde(default)]
    pub(crate) held: Vec<InputAction>,
    #[serde(default)]
    pub(crate) joysticks: Vec<JoystickInput>,
    #[serde(default)]
    pub(crate) quit: bool,
}

impl ScriptStep {
    fn held(from_seconds: f64, until_seconds: f64, actions: &[InputAction]) -> Self {
        Self {
            from_seconds,
            until_seconds,
            held: actions.to_vec(),
            joysticks: Vec::new(),
            quit: false,
        }
    }

    fn covers(&self, at_seconds: f64) -> bool {
        at_seconds >= self.from_seconds && at_seconds < self.until_seconds
    }

    fn apply(&self, snapshot: InputSnapshot) -> InputSnapshot {
        let snapshot = self
            .held
            .iter()
            .fold(snapshot, |snapshot, action| snapshot.with_action_down(*action, true));
        let snapshot = self
            .joysticks
            .iter()
            .fold(snapshot, |snapshot, stick| snapshot.with_joystick(*stick));
        if self.quit {
            snapshot.with_quit_requested(true)
        } else {
            snapshot
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct HeadlessConfig {
    /// Wall-clock length of the run.
    pub(crate) run_seconds: f64,
    pub(crate) frame_pacing_ms: u64,
    /// `false` runs on a manual clock advanced by `frame_pacing_ms` per frame.
    pub(crate) realtime: bool,
    pub(crate) script: Vec<ScriptStep>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            run_seconds: 3.0,
            frame_pacing_ms: 4,
            realtime: true,
            script: vec![
                ScriptStep::held(0.0, 1.0, &[InputAction::MoveRight]),
                ScriptStep::held(1.0, 1.75, &[InputAction::MoveUp]),
                ScriptStep {
                    joysticks: vec![JoystickInput {
                        id: 0,
                        x: -0.7,
                        y: -0.7,
                    }],
                    ..ScriptStep::held(1.75, 2.5, &[])
                },
            ],
        }
    }
}

impl HeadlessConfig {
    pub(crate) fn frame_pacing(&self) -> Duration {
        Duration::from_millis(self.frame_pacing_ms)
    }
}

/// How a frame waits after presenting.
#[derive(Debug, Clone)]
pub(crate) enum FramePacing {
    Sleep(Duration),
    Advance { clock: ManualClock, step: Duration },
}

impl FramePacing {
    fn wait(&self) {
        match self {
            FramePacing::Sleep(duration) => {
                if !duration.is_zero() {
                    thread::sleep(*duration);
                }
            }
            FramePacing::Advance { clock, step } => clock.advance(*step),
        }
    }
}

/// Window-less platform: scripted input, counted draws, quits after a fixed
/// run time.
pub(crate) struct HeadlessPlatform<C: Clock> {
    config: HeadlessConfig,
    clock: C,
    pacing: FramePacing,
    tick: Duration,
    ticks_pulled: u64,
    frames: u64,
    frame_draws: u64,
    last_frame_draws: u64,
    total_draws: u64,
}

impl<C: Clock> HeadlessPlatform<C> {
    pub(crate) fn new(
        config: HeadlessConfig,
        clock: C,
        pacing: FramePacing,
        tick: Duration,
    ) -> Self {
        Self {
            config,
            clock,
            pacing,
            tick,
            ticks_pulled: 0,
            frames: 0,
            frame_draws: 0,
            last_frame_draws: 0,
            total_draws: 0,
        }
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames
    }

    pub(crate) fn total_draws(&self) -> u64 {
        self.total_draws
    }

    pub(crate) fn last_frame_draws(&self) -> u64 {
        self.last_frame_draws
    }
}

impl<C: Clock> InputSource for HeadlessPlatform<C> {
    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        // Scripted by simulated time so the run is independent of frame rate.
        let at_seconds = self.tick.as_secs_f64() * self.ticks_pulled as f64;
        self.ticks_pulled = self.ticks_pulled.saturating_add(1);
        self.config
            .script
            .iter()
            .filter(|step| step.covers(at_seconds))
            .fold(InputSnapshot::empty(), |snapshot, step| step.apply(snapshot))
    }
}

impl<C: Clock> RenderSink for HeadlessPlatform<C> {
    fn draw_quad(&mut self, _quad: &DrawQuad) {
        self.frame_draws = self.frame_draws.saturating_add(1);
    }
}

impl<C: Clock> Platform for HeadlessPlatform<C> {
    fn init(&mut self) -> Result<(), PlatformError> {
        if !self.config.run_seconds.is_finite() || self.config.run_seconds <= 0.0 {
            return Err(PlatformError::new(format!(
                "run_seconds must be positive and finite, got {}",
                self.config.run_seconds
            )));
        }
        if let Some(step) = self
            .config
            .script
            .iter()
            .find(|step| step.from_seconds.is_nan() || step.from_seconds > step.until_seconds)
        {
            return Err(PlatformError::new(format!(
                "script step starts at {} after it ends at {}",
                step.from_seconds, step.until_seconds
            )));
        }
        if let FramePacing::Advance { step, .. } = &self.pacing {
            if step.is_zero() {
                return Err(PlatformError::new(
                    "manual clock pacing needs a non-zero frame step",
                ));
            }
        }
        info!(
            run_seconds = self.config.run_seconds,
            frame_pacing_ms = self.config.frame_pacing_ms,
            realtime = self.config.realtime,
            script_steps = self.config.script.len(),
            "headless_platform_init"
        );
        Ok(())
    }

    fn poll_events(&mut self) -> Result<PollOutcome, PlatformError> {
        if self.clock.elapsed().as_secs_f64() >= self.config.run_seconds {
            return Ok(PollOutcome::Quit);
        }
        Ok(PollOutcome::Continue)
    }

    fn present(&mut self) -> Result<(), PlatformError> {
        self.frames = self.frames.saturating_add(1);
        self.last_frame_draws = self.frame_draws;
        self.total_draws = self.total_draws.saturating_add(self.frame_draws);
        self.frame_draws = 0;
        self.pacing.wait();
        Ok(())
    }

    fn shutdown(&mut self) {
        debug!(ticks_pulled = self.ticks_pulled, "headless_input_drained");
        info!(
            frames = self.frames,
            draws = self.total_draws,
            "headless_platform_shutdown"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(16);

    fn manual_platform(config: HeadlessConfig) -> (ManualClock, HeadlessPlatform<ManualClock>) {
        let clock = ManualClock::new();
        let pacing = FramePacing::Advance {
            clock: clock.clone(),
            step: TICK,
        };
        let platform = HeadlessPlatform::new(config, clock.clone(), pacing, TICK);
        (clock, platform)
    }

    #[test]
    fn script_is_indexed_by_simulated_time() {
        let (_, mut platform) = manual_platform(HeadlessConfig::default());

        // Tick 62 starts at 0.992 s, tick 63 at 1.008 s.
        for _ in 0..62 {
            assert!(platform.snapshot_for_tick().is_down(InputAction::MoveRight));
        }
        let last_right = platform.snapshot_for_tick();
        assert!(last_right.is_down(InputAction::MoveRight));
        let first_up = platform.snapshot_for_tick();
        assert!(!first_up.is_down(InputAction::MoveRight));
        assert!(first_up.is_down(InputAction::MoveUp));
    }

    #[test]
    fn joystick_and_quit_steps_reach_the_snapshot() {
        let config = HeadlessConfig {
            script: vec![ScriptStep {
                joysticks: vec![JoystickInput {
                    id: 3,
                    x: 0.0,
                    y: 1.0,
                }],
                quit: true,
                ..ScriptStep::held(0.0, 0.1, &[])
            }],
            ..HeadlessConfig::default()
        };
        let (_, mut platform) = manual_platform(config);

        let snapshot = platform.snapshot_for_tick();
        assert!(snapshot.quit_requested());
        assert_eq!(snapshot.joysticks().len(), 1);
        assert_eq!(snapshot.joysticks()[0].id, 3);
    }

    #[test]
    fn quits_once_run_time_has_elapsed() {
        let config = HeadlessConfig {
            run_seconds: 0.5,
            ..HeadlessConfig::default()
        };
        let (clock, mut platform) = manual_platform(config);

        assert_eq!(platform.poll_events(), Ok(PollOutcome::Continue));
        clock.set(Duration::from_millis(499));
        assert_eq!(platform.poll_events(), Ok(PollOutcome::Continue));
        clock.set(Duration::from_millis(500));
        assert_eq!(platform.poll_events(), Ok(PollOutcome::Quit));
    }

    #[test]
    fn present_counts_draws_and_advances_manual_clock() {
        let (clock, mut platform) = manual_platform(HeadlessConfig::default());
        let quad = DrawQuad {
            transform: engine::QuadTransform::from_world(
                engine::Aabb::new(engine::Vec2::default(), engine::Vec2::new(1.0, 1.0)),
                &engine::RenderContext::new(engine::Viewport {
                    width: 10,
                    height: 10,
                    virtual_width: 10.0,
                    virtual_height: 10.0,
                }),
            ),
            color: engine::Rgba::rgb(1, 2, 3),
        };

        platform.draw_quad(&quad);
        platform.draw_quad(&quad);
        platform.present().expect("present");
        platform.draw_quad(&quad);
        platform.present().expect("present");

        assert_eq!(platform.frames(), 2);
        assert_eq!(platform.last_frame_draws(), 1);
        assert_eq!(platform.total_draws(), 3);
        assert_eq!(clock.elapsed(), Duration::from_millis(32));
    }

    #[test]
    fn init_rejects_bad_run_time_and_zero_manual_step() {
        let config = HeadlessConfig {
            run_seconds: f64::NAN,
            ..HeadlessConfig::default()
        };
        let (_, mut platform) = manual_platform(config);
        assert!(platform.init().is_err());

        let clock = ManualClock::new();
        let mut stalled = HeadlessPlatform::new(
            HeadlessConfig::default(),
            clock.clone(),
            FramePacing::Advance {
                clock,
                step: Duration::ZERO,
            },
            TICK,
        );
        assert!(stalled.init().is_err());
    }

    #[test]
    fn init_rejects_inverted_script_window() {
        let config = HeadlessConfig {
            script: vec![ScriptStep::held(2.0, 1.0, &[InputAction::MoveUp])],
            ..HeadlessConfig::default()
        };
        let (_, mut platform) = manual_platform(config);
        let err = platform.init().expect_err("inverted window");
        assert!(err.to_string().contains("starts at 2"));
    }

    #[test]
    fn script_steps_deserialize_with_defaults() {
        let step: ScriptStep = serde_json::from_str(
            r#"{"from_seconds": 0.5, "until_seconds": 1.0, "held": ["MoveLeft"]}"#,
        )
        .expect("step");
        assert_eq!(step.held, vec![InputAction::MoveLeft]);
        assert!(step.joysticks.is_empty());
        assert!(!step.quit);
    }
}
