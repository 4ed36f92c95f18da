pub mod app;
pub mod dynamics;

pub use app::{
    world_to_screen, Aabb, Clock, CollisionMapError, CollisionOracle, DrawQuad, Entity,
    EntityHandle, EntityRegistry, FixedTimestepScheduler, FollowCamera, FrameReport,
    GridCollisionMap, InputAction, InputSnapshot, InputSource, JoystickInput, LoopConfig,
    LoopMetricsSnapshot, LoopSummary, ManualClock, MetricsHandle, MonotonicClock, MovableDesc,
    MovableEntity, MovableError, OpenWorld, Platform, PlatformError, PollOutcome, QuadTransform,
    RegistryError, RenderContext, RenderSink, Rgba, SchedulerError, SchedulerState,
    SnapshotEntry, TickContext, Vec2, Viewport, WorldSnapshot, DEFAULT_JOYSTICK_DEADZONE,
    DEFAULT_MOVE_SPEED_UNITS_PER_SECOND, DEFAULT_TICK,
};
pub use dynamics::{DynamicsCoefficients, DynamicsError, DynamicsParams, SecondOrderDynamics};
