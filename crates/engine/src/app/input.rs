use serde::Deserialize;

use super::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Quit,
}

const ACTION_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Quit => 4,
        }
    }
}

/// One analog stick reading. Axes are in `[-1, 1]`, `y` positive is up.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct JoystickInput {
    pub id: u32,
    pub x: f64,
    pub y: f64,
}

impl JoystickInput {
    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Read-only view of the input collaborator's state for one tick.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    joysticks: Vec<JoystickInput>,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested || self.actions.is_down(InputAction::Quit)
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn joysticks(&self) -> &[JoystickInput] {
        &self.joysticks
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    /// Replaces any reading with the same `id`; readings stay sorted by id.
    pub fn with_joystick(mut self, joystick: JoystickInput) -> Self {
        self.joysticks.retain(|existing| existing.id != joystick.id);
        self.joysticks.push(joystick);
        self.joysticks.sort_by_key(|stick| stick.id);
        self
    }

    /// Unit (or zero) direction from the arrow/WASD actions.
    pub fn key_direction(&self) -> Vec2 {
        let axis = |positive: InputAction, negative: InputAction| {
            f64::from(u8::from(self.is_down(positive))) - f64::from(u8::from(self.is_down(negative)))
        };
        Vec2 {
            x: axis(InputAction::MoveRight, InputAction::MoveLeft),
            y: axis(InputAction::MoveUp, InputAction::MoveDown),
        }
        .normalized_or_zero()
    }

    /// Direction to move this tick.
    ///
    /// Policy: the first joystick (lowest id) whose deflection exceeds
    /// `deadzone` wins over any held keys. Stick vectors longer than one are
    /// normalized, shorter ones keep their analog magnitude.
    pub fn movement_direction(&self, deadzone: f64) -> Vec2 {
        let active_stick = self
            .joysticks
            .iter()
            .find(|stick| stick.magnitude().is_finite() && stick.magnitude() > deadzone);

        match active_stick {
            Some(stick) => {
                let raw = Vec2 {
                    x: stick.x,
                    y: stick.y,
                };
                if stick.magnitude() > 1.0 {
                    raw.normalized_or_zero()
                } else {
                    raw
                }
            }
            None => self.key_direction(),
        }
    }
}

/// Supplies one input snapshot per simulation tick.
pub trait InputSource {
    fn snapshot_for_tick(&mut self) -> InputSnapshot;
}
