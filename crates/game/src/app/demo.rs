use std::sync::Arc;
use std::time::Duration;

use engine::{
    Aabb, CollisionMapError, CollisionOracle, DynamicsError, DynamicsParams, EntityRegistry,
    FollowCamera, GridCollisionMap, MovableDesc, MovableEntity, MovableError, RegistryError, Rgba,
    Vec2, DEFAULT_JOYSTICK_DEADZONE, DEFAULT_MOVE_SPEED_UNITS_PER_SECOND,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub(crate) enum DemoError {
    #[error("invalid collision map: {0}")]
    CollisionMap(#[from] CollisionMapError),
    #[error("invalid filter parameters for {entity:?}: {source}")]
    Dynamics {
        entity: String,
        #[source]
        source: DynamicsError,
    },
    #[error("invalid movable {entity:?}: {source}")]
    Movable {
        entity: String,
        #[source]
        source: MovableError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct CameraDesc {
    pub(crate) name: String,
    pub(crate) target: String,
    pub(crate) dynamics: DynamicsParams,
}

impl Default for CameraDesc {
    fn default() -> Self {
        Self {
            name: "camera".to_string(),
            target: "orb".to_string(),
            dynamics: DynamicsParams::default(),
        }
    }
}

/// World layout for the headless demo.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct DemoConfig {
    pub(crate) world_width: f64,
    pub(crate) world_height: f64,
    pub(crate) cell_size: f64,
    /// `[column, row]` pairs.
    pub(crate) blocked_cells: Vec<[u32; 2]>,
    pub(crate) camera: Option<CameraDesc>,
    pub(crate) entities: Vec<MovableDesc>,
    /// Entity whose final position is reported when the run ends.
    pub(crate) report_entity: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            world_width: 2000.0,
            world_height: 2000.0,
            cell_size: 100.0,
            // Wall at x = 1000..1100 for the bottom five rows.
            blocked_cells: (0..5).map(|row| [10, row]).collect(),
            camera: Some(CameraDesc::default()),
            entities: vec![
                movable(
                    "orb",
                    Vec2::new(0.0, 0.0),
                    Vec2::new(500.0, 500.0),
                    Rgba::rgb(222, 72, 31),
                ),
                movable(
                    "box",
                    Vec2::new(600.0, 600.0),
                    Vec2::new(300.0, 400.0),
                    Rgba::rgb(165, 93, 201),
                ),
            ],
            report_entity: "orb".to_string(),
        }
    }
}

fn movable(name: &str, position: Vec2, size: Vec2, color: Rgba) -> MovableDesc {
    MovableDesc {
        name: name.to_string(),
        position,
        size,
        color,
        dynamics: DynamicsParams::default(),
        speed: DEFAULT_MOVE_SPEED_UNITS_PER_SECOND,
        deadzone: DEFAULT_JOYSTICK_DEADZONE,
    }
}

pub(crate) fn build_registry(
    config: &DemoConfig,
    tick: Duration,
) -> Result<EntityRegistry, DemoError> {
    let mut grid =
        GridCollisionMap::new(config.world_width, config.world_height, config.cell_size)?;
    for [column, row] in &config.blocked_cells {
        grid.set_occupied(*column, *row, true)?;
    }
    let blocked_cells = grid.occupied_count();
    let mut registry = EntityRegistry::new(Arc::new(grid));

    if let Some(camera) = &config.camera {
        // Start centred on the target so the first frames don't swoop in.
        let start = config
            .entities
            .iter()
            .find(|desc| desc.name == camera.target)
            .map(|desc| Aabb::new(desc.position, desc.size).center())
            .unwrap_or_default();
        let follow = FollowCamera::new(
            camera.name.clone(),
            camera.target.clone(),
            start,
            camera.dynamics,
            tick,
        )
        .map_err(|source| DemoError::Dynamics {
            entity: camera.name.clone(),
            source,
        })?;
        registry.add_entity(Box::new(follow))?;
    }

    for desc in &config.entities {
        let name = desc.name.clone();
        let entity = MovableEntity::new(desc.clone(), tick)
            .map_err(|source| DemoError::Movable { entity: name, source })?;
        registry.add_entity(Box::new(entity))?;
    }

    let world_size = registry.collision().world_size();
    info!(
        entity_count = registry.len(),
        blocked_cells,
        world_width = world_size.x,
        world_height = world_size.y,
        "demo_world_built"
    );
    Ok(registry)
}
