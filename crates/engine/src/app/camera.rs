use std::time::Duration;

use tracing::warn;

use crate::dynamics::{DynamicsError, DynamicsParams, SecondOrderDynamics};

use super::entity::{Entity, TickContext};
use super::rendering::{RenderContext, RenderSink};
use super::Vec2;

/// Camera that eases toward the center of a named target entity.
#[derive(Debug, Clone)]
pub struct FollowCamera {
    name: String,
    target: String,
    real: Vec2,
    settled: Vec2,
    future: Option<Vec2>,
    x_dynamics: SecondOrderDynamics,
    y_dynamics: SecondOrderDynamics,
    warned_missing_target: bool,
}

impl FollowCamera {
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        start: Vec2,
        params: DynamicsParams,
        tick: Duration,
    ) -> Result<Self, DynamicsError> {
        Ok(Self {
            name: name.into(),
            target: target.into(),
            real: start,
            settled: start,
            future: None,
            x_dynamics: SecondOrderDynamics::new(params, start.x, tick)?,
            y_dynamics: SecondOrderDynamics::new(params, start.y, tick)?,
            warned_missing_target: false,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn real_position(&self) -> Vec2 {
        self.real
    }
}

impl Entity for FollowCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose_state_changes(&mut self, ctx: &TickContext<'_>) {
        self.future = ctx.world.get(&self.target).map(|entry| entry.center());
        if self.future.is_none() && !self.warned_missing_target {
            self.warned_missing_target = true;
            warn!(camera = %self.name, target = %self.target, "camera_target_missing");
        }
    }

    fn commit_state_changes(&mut self) {
        if let Some(future) = self.future.take() {
            self.real = future;
        }
        self.settled = Vec2 {
            x: self.x_dynamics.update(self.real.x),
            y: self.y_dynamics.update(self.real.y),
        };
    }

    fn show(&self, _ctx: &RenderContext, _sink: &mut dyn RenderSink) {}

    fn settled_position(&self) -> Vec2 {
        self.settled
    }

    fn view_origin(&self) -> Option<Vec2> {
        Some(self.settled)
    }
}
