use std::f64::consts::PI;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Tuning knobs for [`SecondOrderDynamics`].
///
/// - `frequency`: natural frequency in Hz. Speed of the response.
/// - `damping`: damping ratio. `1.0` is critically damped, below that the
///   output overshoots and settles, above it the output lags.
/// - `response`: initial response. `0.0` eases in, positive values react
///   immediately, above `1.0` overshoots, negative values anticipate.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DynamicsParams {
    pub frequency: f64,
    pub damping: f64,
    #[serde(default)]
    pub response: f64,
}

impl DynamicsParams {
    pub const fn new(frequency: f64, damping: f64, response: f64) -> Self {
        Self {
            frequency,
            damping,
            response,
        }
    }
}

impl Default for DynamicsParams {
    fn default() -> Self {
        Self::new(1.5, 1.0, 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DynamicsError {
    #[error("frequency must be greater than zero, got {0}")]
    NonPositiveFrequency(f64),
    #[error("damping must be greater than zero, got {0}")]
    NonPositiveDamping(f64),
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("tick duration must be non-zero")]
    ZeroTick,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsCoefficients {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
}

/// Damped second-order response for one scalar dimension.
///
/// Advances by exactly one fixed tick per update. Coefficients are expressed
/// in per-tick units, so `frequency` keeps its meaning in Hz whatever the
/// tick length is, as long as updates happen once per simulation tick and
/// never once per rendered frame.
#[derive(Debug, Clone)]
pub struct SecondOrderDynamics {
    coefficients: DynamicsCoefficients,
    xp: f64,
    y: f64,
    yd: f64,
}

impl SecondOrderDynamics {
    pub fn new(params: DynamicsParams, x0: f64, tick: Duration) -> Result<Self, DynamicsError> {
        validate_params(params, x0, tick)?;

        let cycles_per_tick = params.frequency * tick.as_secs_f64();
        let omega = 2.0 * PI * cycles_per_tick;
        let k1 = params.damping / (PI * cycles_per_tick);
        let raw_k2 = 1.0 / (omega * omega);
        let k3 = params.response * params.damping / omega;

        // Unit-step explicit integration diverges once k2 drops below these bounds.
        let k2 = raw_k2.max(0.5 + k1 * 0.5).max(k1);
        if k2 > raw_k2 {
            debug!(
                raw_k2,
                clamped_k2 = k2,
                frequency = params.frequency,
                damping = params.damping,
                "dynamics_k2_clamped"
            );
        }

        Ok(Self {
            coefficients: DynamicsCoefficients { k1, k2, k3 },
            xp: x0,
            y: x0,
            yd: 0.0,
        })
    }

    /// Steps toward `x`, estimating the target velocity from the previous
    /// input.
    pub fn update(&mut self, x: f64) -> f64 {
        let xd = x - self.xp;
        self.xp = x;
        self.update_with_velocity(x, xd)
    }

    /// Steps toward `x` with a caller-supplied target velocity (per tick).
    /// Does not touch the stored previous input.
    pub fn update_with_velocity(&mut self, x: f64, xd: f64) -> f64 {
        let DynamicsCoefficients { k1, k2, k3 } = self.coefficients;
        self.y += self.yd;
        self.yd += (x + k3 * xd - self.y - k1 * self.yd) / k2;
        self.y
    }

    pub fn output(&self) -> f64 {
        self.y
    }

    pub fn velocity(&self) -> f64 {
        self.yd
    }

    pub fn previous_input(&self) -> f64 {
        self.xp
    }

    pub fn coefficients(&self) -> DynamicsCoefficients {
        self.coefficients
    }
}

fn validate_params(params: DynamicsParams, x0: f64, tick: Duration) -> Result<(), DynamicsError> {
    for (field, value) in [
        ("frequency", params.frequency),
        ("damping", params.damping),
        ("response", params.response),
        ("initial value", x0),
    ] {
        if !value.is_finite() {
            return Err(DynamicsError::NonFinite { field, value });
        }
    }
    if params.frequency <= 0.0 {
        return Err(DynamicsError::NonPositiveFrequency(params.frequency));
    }
    if params.damping <= 0.0 {
        return Err(DynamicsError::NonPositiveDamping(params.damping));
    }
    if tick.is_zero() {
        return Err(DynamicsError::ZeroTick);
    }
    Ok(())
}
