use std::collections::HashMap;

use super::collision::CollisionOracle;
use super::input::InputSnapshot;
use super::rendering::{RenderContext, RenderSink};
use super::Vec2;

/// Settled state of one entity as every proposer sees it during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotEntry {
    pub settled: Vec2,
    pub size: Vec2,
}

impl SnapshotEntry {
    pub fn center(&self) -> Vec2 {
        Vec2 {
            x: self.settled.x + self.size.x * 0.5,
            y: self.settled.y + self.size.y * 0.5,
        }
    }
}

/// Immutable world view taken once per tick, before any proposal runs.
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    entries: HashMap<String, SnapshotEntry>,
}

impl WorldSnapshot {
    pub(crate) fn insert(&mut self, name: &str, entry: SnapshotEntry) {
        self.entries.insert(name.to_string(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only inputs to the propose phase.
pub struct TickContext<'a> {
    pub input: &'a InputSnapshot,
    pub world: &'a WorldSnapshot,
    pub collision: &'a dyn CollisionOracle,
}

/// A world object driven by the two-phase tick protocol.
///
/// `propose_state_changes` may only read the context and write the entity's
/// own pending state. `commit_state_changes` applies that pending state and
/// is the only place visible state moves. `show` reads settled state only.
pub trait Entity {
    fn name(&self) -> &str;

    fn propose_state_changes(&mut self, ctx: &TickContext<'_>);

    fn commit_state_changes(&mut self);

    fn show(&self, ctx: &RenderContext, sink: &mut dyn RenderSink);

    fn settled_position(&self) -> Vec2;

    fn size(&self) -> Vec2 {
        Vec2::default()
    }

    /// World point this entity wants at the center of the screen, if it acts
    /// as a camera.
    fn view_origin(&self) -> Option<Vec2> {
        None
    }
}
