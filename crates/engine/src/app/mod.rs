mod camera;
mod collision;
mod entity;
mod geometry;
mod input;
mod loop_runner;
mod metrics;
mod movable;
mod registry;
mod rendering;

pub use camera::FollowCamera;
pub use collision::{CollisionMapError, CollisionOracle, GridCollisionMap, OpenWorld};
pub use entity::{Entity, SnapshotEntry, TickContext, WorldSnapshot};
pub use geometry::{Aabb, Vec2};
pub use input::{InputAction, InputSnapshot, InputSource, JoystickInput};
pub use loop_runner::{
    Clock, FixedTimestepScheduler, FrameReport, LoopConfig, LoopSummary, ManualClock,
    MonotonicClock, Platform, PlatformError, PollOutcome, SchedulerError, SchedulerState,
    DEFAULT_TICK,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use movable::{
    MovableDesc, MovableEntity, MovableError, DEFAULT_JOYSTICK_DEADZONE,
    DEFAULT_MOVE_SPEED_UNITS_PER_SECOND,
};
pub use registry::{EntityHandle, EntityRegistry, RegistryError};
pub use rendering::{
    world_to_screen, DrawQuad, QuadTransform, RenderContext, RenderSink, Rgba, Viewport,
};
