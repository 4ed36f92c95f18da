use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

use crate::dynamics::{DynamicsError, DynamicsParams, SecondOrderDynamics};

use super::entity::{Entity, TickContext};
use super::rendering::{DrawQuad, QuadTransform, RenderContext, RenderSink, Rgba};
use super::{Aabb, Vec2};

/// 9.2 units per 16 ms tick.
pub const DEFAULT_MOVE_SPEED_UNITS_PER_SECOND: f64 = 575.0;
pub const DEFAULT_JOYSTICK_DEADZONE: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MovableError {
    #[error("speed must be finite and non-negative, got {0}")]
    InvalidSpeed(f64),
    #[error("joystick deadzone must be finite and non-negative, got {0}")]
    InvalidDeadzone(f64),
    #[error(transparent)]
    Dynamics(#[from] DynamicsError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MovableDesc {
    pub name: String,
    pub position: Vec2,
    pub size: Vec2,
    pub color: Rgba,
    #[serde(default)]
    pub dynamics: DynamicsParams,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,
}

fn default_speed() -> f64 {
    DEFAULT_MOVE_SPEED_UNITS_PER_SECOND
}

fn default_deadzone() -> f64 {
    DEFAULT_JOYSTICK_DEADZONE
}

#[derive(Debug, Clone)]
struct Axis {
    real: f64,
    settled: f64,
    future: Option<f64>,
    dynamics: SecondOrderDynamics,
}

impl Axis {
    fn new(start: f64, params: DynamicsParams, tick: Duration) -> Result<Self, DynamicsError> {
        Ok(Self {
            real: start,
            settled: start,
            future: None,
            dynamics: SecondOrderDynamics::new(params, start, tick)?,
        })
    }

    fn commit(&mut self) {
        if let Some(future) = self.future.take() {
            self.real = future;
        }
        self.settled = self.dynamics.update(self.real);
    }
}

/// Input-driven box whose rendered position trails its authoritative one
/// through a second-order filter per axis.
#[derive(Debug, Clone)]
pub struct MovableEntity {
    name: String,
    size: Vec2,
    color: Rgba,
    step_distance: f64,
    deadzone: f64,
    x: Axis,
    y: Axis,
}

impl MovableEntity {
    pub fn new(desc: MovableDesc, tick: Duration) -> Result<Self, MovableError> {
        if !desc.speed.is_finite() || desc.speed < 0.0 {
            return Err(MovableError::InvalidSpeed(desc.speed));
        }
        if !desc.deadzone.is_finite() || desc.deadzone < 0.0 {
            return Err(MovableError::InvalidDeadzone(desc.deadzone));
        }
        let x = Axis::new(desc.position.x, desc.dynamics, tick)?;
        let y = Axis::new(desc.position.y, desc.dynamics, tick)?;
        Ok(Self {
            name: desc.name,
            size: desc.size,
            color: desc.color,
            step_distance: desc.speed * tick.as_secs_f64(),
            deadzone: desc.deadzone,
            x,
            y,
        })
    }

    pub fn real_position(&self) -> Vec2 {
        Vec2::new(self.x.real, self.y.real)
    }

    pub fn has_pending(&self) -> bool {
        self.x.future.is_some() || self.y.future.is_some()
    }

    pub fn step_distance(&self) -> f64 {
        self.step_distance
    }

    fn footprint_at(&self, min: Vec2) -> Aabb {
        Aabb::new(min, self.size)
    }
}

impl Entity for MovableEntity {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose_state_changes(&mut self, ctx: &TickContext<'_>) {
        self.x.future = None;
        self.y.future = None;

        let direction = ctx.input.movement_direction(self.deadzone);
        let delta = direction.scaled(self.step_distance);
        let mut accepted_x = self.x.real;

        if delta.x != 0.0 {
            let candidate = self.x.real + delta.x;
            let footprint = self.footprint_at(Vec2::new(candidate, self.y.real));
            if ctx.collision.is_area_occupied(footprint) {
                trace!(entity = %self.name, axis = "x", candidate, "move_blocked");
            } else {
                self.x.future = Some(candidate);
                accepted_x = candidate;
            }
        }

        if delta.y != 0.0 {
            let candidate = self.y.real + delta.y;
            let footprint = self.footprint_at(Vec2::new(accepted_x, candidate));
            if ctx.collision.is_area_occupied(footprint) {
                trace!(entity = %self.name, axis = "y", candidate, "move_blocked");
            } else {
                self.y.future = Some(candidate);
            }
        }
    }

    fn commit_state_changes(&mut self) {
        self.x.commit();
        self.y.commit();
    }

    fn show(&self, ctx: &RenderContext, sink: &mut dyn RenderSink) {
        let area = self.footprint_at(self.settled_position());
        sink.draw_quad(&DrawQuad {
            transform: QuadTransform::from_world(area, ctx),
            color: self.color,
        });
    }

    fn settled_position(&self) -> Vec2 {
        Vec2::new(self.x.settled, self.y.settled)
    }

    fn size(&self) -> Vec2 {
        self.size
    }
}
