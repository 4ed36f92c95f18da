use thiserror::Error;

use super::geometry::{inset_max, Aabb, Vec2};

/// Upper bound on grid cells, one byte each.
pub const MAX_GRID_CELLS: usize = 1 << 24;

/// Boolean occupancy queries over the virtual world. Never mutated by the
/// simulation.
pub trait CollisionOracle: Send + Sync {
    fn is_occupied(&self, x: f64, y: f64) -> bool;

    fn world_size(&self) -> Vec2;

    fn is_area_occupied(&self, area: Aabb) -> bool {
        area.sample_points()
            .iter()
            .any(|point| self.is_occupied(point.x, point.y))
    }
}

/// Oracle with nothing in it and no bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenWorld;

impl CollisionOracle for OpenWorld {
    fn is_occupied(&self, _x: f64, _y: f64) -> bool {
        false
    }

    fn world_size(&self) -> Vec2 {
        Vec2::new(f64::INFINITY, f64::INFINITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CollisionMapError {
    #[error("world size must be positive and finite, got {width}x{height}")]
    InvalidWorldSize { width: f64, height: f64 },
    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f64),
    #[error("cell ({x}, {y}) is outside the {columns}x{rows} grid")]
    CellOutOfRange {
        x: u32,
        y: u32,
        columns: u32,
        rows: u32,
    },
    #[error("{columns}x{rows} cells exceeds the limit of {max} cells")]
    TooManyCells { columns: f64, rows: f64, max: usize },
}

/// Occupancy grid covering `[0, width) x [0, height)`.
///
/// Cell `(cx, cy)` spans `[cx * cell_size, (cx + 1) * cell_size)` on x and the
/// same on y. Anything outside the world bounds reads as occupied.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCollisionMap {
    width: f64,
    height: f64,
    cell_size: f64,
    columns: u32,
    rows: u32,
    cells: Vec<bool>,
}

impl GridCollisionMap {
    pub fn new(width: f64, height: f64, cell_size: f64) -> Result<Self, CollisionMapError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(CollisionMapError::InvalidWorldSize { width, height });
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(CollisionMapError::InvalidCellSize(cell_size));
        }
        let columns_f = (width / cell_size).ceil();
        let rows_f = (height / cell_size).ceil();
        let too_many = CollisionMapError::TooManyCells {
            columns: columns_f,
            rows: rows_f,
            max: MAX_GRID_CELLS,
        };
        if !(columns_f <= u32::MAX as f64 && rows_f <= u32::MAX as f64) {
            return Err(too_many);
        }
        let columns = columns_f as u32;
        let rows = rows_f as u32;
        let count = (columns as usize)
            .checked_mul(rows as usize)
            .filter(|count| *count <= MAX_GRID_CELLS)
            .ok_or(too_many)?;
        Ok(Self {
            width,
            height,
            cell_size,
            columns,
            rows,
            cells: vec![false; count],
        })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn set_occupied(&mut self, x: u32, y: u32, occupied: bool) -> Result<(), CollisionMapError> {
        let index = self
            .index_of(x, y)
            .ok_or(CollisionMapError::CellOutOfRange {
                x,
                y,
                columns: self.columns,
                rows: self.rows,
            })?;
        self.cells[index] = occupied;
        Ok(())
    }

    pub fn is_cell_occupied(&self, x: u32, y: u32) -> Option<bool> {
        self.index_of(x, y)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Cell containing the world point, if it is inside the world.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        if !(x >= 0.0 && y >= 0.0 && x < self.width && y < self.height) {
            return None;
        }
        let cx = ((x / self.cell_size).floor() as u32).min(self.columns.saturating_sub(1));
        let cy = ((y / self.cell_size).floor() as u32).min(self.rows.saturating_sub(1));
        Some((cx, cy))
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }

    fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.columns || y >= self.rows {
            return None;
        }
        Some(y as usize * self.columns as usize + x as usize)
    }
}

impl CollisionOracle for GridCollisionMap {
    fn is_occupied(&self, x: f64, y: f64) -> bool {
        match self.cell_at(x, y) {
            Some((cx, cy)) => self.is_cell_occupied(cx, cy).unwrap_or(true),
            None => true,
        }
    }

    fn world_size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    fn is_area_occupied(&self, area: Aabb) -> bool {
        let max = area.max();
        let right = inset_max(area.min.x, max.x);
        let top = inset_max(area.min.y, max.y);
        let (Some((x0, y0)), Some((x1, y1))) = (
            self.cell_at(area.min.x, area.min.y),
            self.cell_at(right, top),
        ) else {
            return true;
        };

        (y0..=y1).any(|cy| {
            (x0..=x1).any(|cx| self.is_cell_occupied(cx, cy).unwrap_or(true))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_10x10() -> GridCollisionMap {
        GridCollisionMap::new(100.0, 100.0, 10.0).expect("grid")
    }

    #[test]
    fn rejects_invalid_dimensions() {
        assert_eq!(
            GridCollisionMap::new(0.0, 10.0, 1.0).expect_err("err"),
            CollisionMapError::InvalidWorldSize {
                width: 0.0,
                height: 10.0
            }
        );
        assert_eq!(
            GridCollisionMap::new(10.0, 10.0, -1.0).expect_err("err"),
            CollisionMapError::InvalidCellSize(-1.0)
        );
    }

    #[test]
    fn huge_cell_count_is_rejected_before_allocating() {
        assert!(matches!(
            GridCollisionMap::new(1e12, 1e12, 1e-3),
            Err(CollisionMapError::TooManyCells { max: MAX_GRID_CELLS, .. })
        ));
        // Each side fits in a u32 but the product is over the limit.
        assert!(matches!(
            GridCollisionMap::new(5_000.0, 5_000.0, 1.0),
            Err(CollisionMapError::TooManyCells { .. })
        ));
        assert!(matches!(
            GridCollisionMap::new(f64::MAX, 1.0, f64::MIN_POSITIVE),
            Err(CollisionMapError::TooManyCells { .. })
        ));
    }

    #[test]
    fn grid_at_the_cell_limit_is_accepted() {
        let grid = GridCollisionMap::new(4_096.0, 4_096.0, 1.0).expect("grid");
        assert_eq!(grid.columns() as usize * grid.rows() as usize, MAX_GRID_CELLS);
    }

    #[test]
    fn world_size_reports_bounds() {
        assert_eq!(grid_10x10().world_size(), Vec2::new(100.0, 100.0));
        let open = OpenWorld.world_size();
        assert!(open.x.is_infinite() && open.y.is_infinite());
    }

    #[test]
    fn partial_cells_round_up() {
        let grid = GridCollisionMap::new(2000.0, 2000.0, 107.0).expect("grid");
        assert_eq!(grid.columns(), 19);
        assert_eq!(grid.rows(), 19);
    }

    #[test]
    fn marked_cell_is_occupied_and_neighbours_are_not() {
        let mut grid = grid_10x10();
        grid.set_occupied(5, 5, true).expect("in range");

        assert!(grid.is_occupied(55.0, 55.0));
        assert!(grid.is_occupied(50.0, 50.0));
        assert!(!grid.is_occupied(49.9, 55.0));
        assert!(!grid.is_occupied(60.0, 55.0));
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn out_of_bounds_reads_as_occupied() {
        let grid = grid_10x10();
        assert!(grid.is_occupied(-0.1, 5.0));
        assert!(grid.is_occupied(5.0, 100.0));
        assert!(grid.is_occupied(f64::NAN, 5.0));
    }

    #[test]
    fn set_occupied_rejects_out_of_range_cell() {
        let mut grid = grid_10x10();
        assert!(matches!(
            grid.set_occupied(10, 0, true),
            Err(CollisionMapError::CellOutOfRange { x: 10, .. })
        ));
    }

    #[test]
    fn area_query_covers_interior_cells() {
        let mut grid = grid_10x10();
        grid.set_occupied(5, 5, true).expect("in range");

        // Corners land in cells 4 and 6; only the interior touches cell 5.
        let straddling = Aabb::new(Vec2::new(45.0, 45.0), Vec2::new(20.0, 20.0));
        assert!(grid.is_area_occupied(straddling));

        let flush = Aabb::new(Vec2::new(40.0, 40.0), Vec2::new(10.0, 10.0));
        assert!(!grid.is_area_occupied(flush));
    }

    #[test]
    fn area_leaving_the_world_is_occupied() {
        let grid = grid_10x10();
        let area = Aabb::new(Vec2::new(95.0, 0.0), Vec2::new(10.0, 10.0));
        assert!(grid.is_area_occupied(area));
    }

    #[test]
    fn open_world_is_never_occupied() {
        let area = Aabb::new(Vec2::new(-1e9, 1e9), Vec2::new(5.0, 5.0));
        assert!(!OpenWorld.is_area_occupied(area));
    }
}
