use std::process::ExitCode;

use engine::{
    Clock, FixedTimestepScheduler, LoopSummary, ManualClock, MonotonicClock, RegistryError,
    SchedulerError,
};
use thiserror::Error;
use tracing::{debug, error, info};

use super::bootstrap::{AppWiring, GameConfig};
use super::demo::{self, DemoError};
use super::platform::{FramePacing, HeadlessPlatform};

#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error("failed to build demo world: {0}")]
    Demo(#[from] DemoError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("cannot report final position: {0}")]
    Report(#[from] RegistryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunOutcome {
    pub(crate) summary: LoopSummary,
    pub(crate) final_x: i32,
    pub(crate) final_y: i32,
    pub(crate) draws: u64,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_configured(&app.config) {
        Ok(outcome) => {
            info!(
                entity = app.config.demo.report_entity.as_str(),
                x = outcome.final_x,
                y = outcome.final_y,
                ticks = outcome.summary.ticks,
                frames = outcome.summary.frames,
                slip_ms = outcome.summary.slip.as_millis() as u64,
                draws = outcome.draws,
                "final_position"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
    }
}

pub(crate) fn run_configured(config: &GameConfig) -> Result<RunOutcome, RunError> {
    let frame_pacing = config.headless.frame_pacing();
    if config.headless.realtime {
        run_headless(
            config,
            MonotonicClock::start(),
            FramePacing::Sleep(frame_pacing),
        )
    } else {
        let clock = ManualClock::new();
        let pacing = FramePacing::Advance {
            clock: clock.clone(),
            step: frame_pacing,
        };
        run_headless(config, clock, pacing)
    }
}

fn run_headless<C: Clock + Clone>(
    config: &GameConfig,
    clock: C,
    pacing: FramePacing,
) -> Result<RunOutcome, RunError> {
    let tick = config.loop_config.tick();
    let mut registry = demo::build_registry(&config.demo, tick)?;
    let mut platform = HeadlessPlatform::new(config.headless.clone(), clock.clone(), pacing, tick);
    let mut scheduler = FixedTimestepScheduler::new(config.loop_config.clone(), clock);

    let summary = scheduler.run(&mut registry, &mut platform)?;

    let name = config.demo.report_entity.as_str();
    let final_x = registry.entity_x(name)?;
    let final_y = registry.entity_y(name)?;
    debug!(
        frames = platform.frames(),
        last_frame_draws = platform.last_frame_draws(),
        "headless_run_finished"
    );

    Ok(RunOutcome {
        summary,
        final_x,
        final_y,
        draws: platform.total_draws(),
    })
}
