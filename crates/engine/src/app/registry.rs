use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::collision::CollisionOracle;
use super::entity::{Entity, SnapshotEntry, TickContext, WorldSnapshot};
use super::input::InputSnapshot;
use super::rendering::{RenderContext, RenderSink};
use super::Vec2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("an entity named {0:?} is already registered")]
    DuplicateEntityName(String),
    #[error("no entity named {0:?}")]
    EntityNotFound(String),
}

/// Registration index of an entity. Stable for the registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub usize);

/// Owns every entity and runs the propose/commit tick protocol over them.
pub struct EntityRegistry {
    entities: Vec<Box<dyn Entity>>,
    by_name: HashMap<String, usize>,
    collision: Arc<dyn CollisionOracle>,
}

impl EntityRegistry {
    pub fn new(collision: Arc<dyn CollisionOracle>) -> Self {
        Self {
            entities: Vec::new(),
            by_name: HashMap::new(),
            collision,
        }
    }

    pub fn add_entity(&mut self, entity: Box<dyn Entity>) -> Result<EntityHandle, RegistryError> {
        let name = entity.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateEntityName(name));
        }
        let handle = EntityHandle(self.entities.len());
        info!(entity = %name, index = handle.0, "entity_added");
        self.by_name.insert(name, handle.0);
        self.entities.push(entity);
        Ok(handle)
    }

    /// Single chokepoint for one simulation tick: every proposal runs against
    /// the same snapshot before any commit.
    pub fn step(&mut self, input: &InputSnapshot) {
        self.handle_state_changes(input);
        self.enact_state_changes();
    }

    /// Propose phase, in registration order. Proposers only see the snapshot
    /// taken here, so the order cannot change the outcome.
    pub fn handle_state_changes(&mut self, input: &InputSnapshot) {
        let world = self.snapshot();
        let ctx = TickContext {
            input,
            world: &world,
            collision: self.collision.as_ref(),
        };
        for entity in &mut self.entities {
            entity.propose_state_changes(&ctx);
        }
    }

    /// Commit phase, in registration order.
    pub fn enact_state_changes(&mut self) {
        for entity in &mut self.entities {
            entity.commit_state_changes();
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        let mut world = WorldSnapshot::default();
        for entity in &self.entities {
            world.insert(
                entity.name(),
                SnapshotEntry {
                    settled: entity.settled_position(),
                    size: entity.size(),
                },
            );
        }
        world
    }

    /// Draws every entity. The first entity offering a view origin positions
    /// the view.
    pub fn show_all(&self, ctx: &RenderContext, sink: &mut dyn RenderSink) {
        let ctx = match self.entities.iter().find_map(|entity| entity.view_origin()) {
            Some(origin) => ctx.with_view_origin(origin),
            None => *ctx,
        };
        for entity in &self.entities {
            entity.show(&ctx, sink);
        }
        debug!(entity_count = self.entities.len(), "entities_shown");
    }

    pub fn settled_position(&self, name: &str) -> Result<Vec2, RegistryError> {
        self.get(name).map(|entity| entity.settled_position())
    }

    /// Settled x of `name`, truncated toward zero.
    pub fn entity_x(&self, name: &str) -> Result<i32, RegistryError> {
        self.settled_position(name).map(|position| position.x as i32)
    }

    /// Settled y of `name`, truncated toward zero.
    pub fn entity_y(&self, name: &str) -> Result<i32, RegistryError> {
        self.settled_position(name).map(|position| position.y as i32)
    }

    pub fn get(&self, name: &str) -> Result<&dyn Entity, RegistryError> {
        self.by_name
            .get(name)
            .and_then(|index| self.entities.get(*index))
            .map(|entity| entity.as_ref())
            .ok_or_else(|| RegistryError::EntityNotFound(name.to_string()))
    }

    pub fn handle_of(&self, name: &str) -> Option<EntityHandle> {
        self.by_name.get(name).copied().map(EntityHandle)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|entity| entity.name())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn collision(&self) -> &dyn CollisionOracle {
        self.collision.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::app::camera::FollowCamera;
    use crate::app::collision::{GridCollisionMap, OpenWorld};
    use crate::app::input::InputAction;
    use crate::app::movable::{MovableDesc, MovableEntity};
    use crate::app::rendering::{Rgba, Viewport};
    use crate::dynamics::DynamicsParams;

    const TICK: Duration = Duration::from_millis(16);

    fn boxed(name: &str, position: Vec2) -> Box<dyn Entity> {
        Box::new(
            MovableEntity::new(
                MovableDesc {
                    name: name.to_string(),
                    position,
                    size: Vec2::new(10.0, 10.0),
                    color: Rgba::rgb(165, 93, 201),
                    dynamics: DynamicsParams::default(),
                    speed: 625.0,
                    deadzone: 0.15,
                },
                TICK,
            )
            .expect("entity"),
        )
    }

    fn camera(target: &str, start: Vec2) -> Box<dyn Entity> {
        Box::new(
            FollowCamera::new("camera", target, start, DynamicsParams::default(), TICK)
                .expect("camera"),
        )
    }

    fn grid_with_cell_5_5() -> Arc<dyn CollisionOracle> {
        let mut grid = GridCollisionMap::new(100.0, 100.0, 10.0).expect("grid");
        grid.set_occupied(5, 5, true).expect("in range");
        Arc::new(grid)
    }

    fn positions(registry: &EntityRegistry) -> Vec<(String, Vec2)> {
        let mut out: Vec<_> = registry
            .names()
            .map(|name| {
                (
                    name.to_string(),
                    registry.settled_position(name).expect("known"),
                )
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = EntityRegistry::new(Arc::new(OpenWorld));
        let first = registry.add_entity(boxed("orb", Vec2::default())).expect("first");
        let err = registry
            .add_entity(boxed("orb", Vec2::new(1.0, 1.0)))
            .expect_err("duplicate");

        assert_eq!(first, EntityHandle(0));
        assert_eq!(err, RegistryError::DuplicateEntityName("orb".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = EntityRegistry::new(Arc::new(OpenWorld));
        assert_eq!(
            registry.entity_x("nope").expect_err("missing"),
            RegistryError::EntityNotFound("nope".to_string())
        );
        assert!(registry.entity_y("nope").is_err());
        assert!(registry.handle_of("nope").is_none());
    }

    #[test]
    fn entity_queries_truncate_settled_coordinates() {
        let mut registry = EntityRegistry::new(Arc::new(OpenWorld));
        registry
            .add_entity(boxed("orb", Vec2::new(12.9, -3.7)))
            .expect("add");

        assert_eq!(registry.entity_x("orb"), Ok(12));
        assert_eq!(registry.entity_y("orb"), Ok(-3));
    }

    #[test]
    fn blocked_move_into_occupied_cell_keeps_real_position() {
        let mut registry = EntityRegistry::new(grid_with_cell_5_5());
        // "a" sits just left of cell (5,5); "b" is far away.
        let mut a = MovableEntity::new(
            MovableDesc {
                name: "a".to_string(),
                position: Vec2::new(40.0, 50.0),
                size: Vec2::new(10.0, 10.0),
                color: Rgba::rgb(1, 2, 3),
                dynamics: DynamicsParams::default(),
                speed: 625.0,
                deadzone: 0.15,
            },
            TICK,
        )
        .expect("a");
        let before = a.real_position();
        let input = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);
        let world = WorldSnapshot::default();
        a.propose_state_changes(&TickContext {
            input: &input,
            world: &world,
            collision: registry.collision(),
        });
        a.commit_state_changes();
        assert_eq!(a.real_position().x, before.x);

        registry.add_entity(Box::new(a)).expect("a");
        registry.add_entity(boxed("b", Vec2::new(0.0, 0.0))).expect("b");
        registry.step(&input);
        registry.step(&input);

        let a = registry.settled_position("a").expect("a");
        let b = registry.settled_position("b").expect("b");
        assert!((a.x - 40.0).abs() < 1e-9);
        assert!(b.x > 0.0);
    }

    #[test]
    fn propose_order_does_not_change_committed_world() {
        let layouts = [
            ("a", Vec2::new(0.0, 0.0)),
            ("b", Vec2::new(30.0, 0.0)),
            ("c", Vec2::new(0.0, 70.0)),
        ];
        let orders: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let inputs = [
            InputSnapshot::empty().with_action_down(InputAction::MoveRight, true),
            InputSnapshot::empty().with_action_down(InputAction::MoveUp, true),
            InputSnapshot::empty(),
        ];

        let mut results = Vec::new();
        for order in orders {
            let mut registry = EntityRegistry::new(grid_with_cell_5_5());
            let mut camera_added = false;
            for index in order {
                let (name, position) = layouts[index];
                registry.add_entity(boxed(name, position)).expect("add");
                if !camera_added {
                    registry.add_entity(camera("b", Vec2::default())).expect("camera");
                    camera_added = true;
                }
            }
            for input in inputs.iter().cycle().take(30) {
                registry.step(input);
            }
            results.push(positions(&registry));
        }

        for result in &results[1..] {
            assert_eq!(result, &results[0]);
        }
    }

    #[test]
    fn camera_sees_previous_tick_state_regardless_of_order() {
        let input = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);

        let mut camera_first = EntityRegistry::new(Arc::new(OpenWorld));
        camera_first
            .add_entity(camera("orb", Vec2::default()))
            .expect("camera");
        camera_first.add_entity(boxed("orb", Vec2::default())).expect("orb");

        let mut camera_last = EntityRegistry::new(Arc::new(OpenWorld));
        camera_last.add_entity(boxed("orb", Vec2::default())).expect("orb");
        camera_last
            .add_entity(camera("orb", Vec2::default()))
            .expect("camera");

        for _ in 0..20 {
            camera_first.step(&input);
            camera_last.step(&input);
        }

        assert_eq!(
            camera_first.settled_position("camera"),
            camera_last.settled_position("camera")
        );
    }

    #[test]
    fn show_all_uses_camera_view_origin() {
        let mut registry = EntityRegistry::new(Arc::new(OpenWorld));
        registry.add_entity(boxed("orb", Vec2::new(0.0, 0.0))).expect("orb");
        registry
            .add_entity(camera("orb", Vec2::new(5.0, 5.0)))
            .expect("camera");

        let ctx = RenderContext::new(Viewport {
            width: 100,
            height: 100,
            virtual_width: 100.0,
            virtual_height: 100.0,
        });
        let mut quads = Vec::new();
        registry.show_all(&ctx, &mut quads);

        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].transform.center_px, (50.0, 50.0));
    }
}
