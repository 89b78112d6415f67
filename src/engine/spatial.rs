//! Spatial hash grid over target points
//!
//! Divides the arena into cells and stores point indices in each cell. Radius queries only
//! visit the cells overlapping the query circle.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::engine::world::TargetPoint;
use crate::util::vec2::Vec2;

// ============================================================================
// Target Grid Constants
// ============================================================================

/// Default cell size (world units), about the chain gap tolerance
pub const TARGET_GRID_CELL_SIZE: f32 = 64.0;

/// Initial capacity for grid cells (number of expected non-empty cells)
const TARGET_GRID_INITIAL_CAPACITY: usize = 256;

/// Grid cell key - (x, y) cell coordinates
pub type CellKey = (i32, i32);

/// Spatial hash grid of indices into a target slice
#[derive(Debug)]
pub struct TargetGrid {
    /// Cell size in world units
    cell_size: f32,
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f32,
    /// Map from cell key to point indices in that cell
    cells: HashMap<CellKey, SmallVec<[u32; 8]>>,
    len: usize,
}

impl TargetGrid {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { TARGET_GRID_CELL_SIZE };
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_capacity(TARGET_GRID_INITIAL_CAPACITY),
            len: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Clear all points, keeping allocated cells
    #[inline]
    pub fn clear(&mut self) {
        for cell in self.cells.values_mut() {
            cell.clear();
        }
        self.len = 0;
    }

    #[inline]
    fn position_to_cell(&self, position: Vec2) -> CellKey {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.y * self.inv_cell_size).floor() as i32,
        )
    }

    /// Re-index all finite points of `targets`
    pub fn rebuild(&mut self, targets: &[TargetPoint]) {
        self.clear();
        for (index, target) in targets.iter().enumerate() {
            if !target.position.is_finite() {
                continue;
            }
            let key = self.position_to_cell(target.position);
            self.cells.entry(key).or_default().push(index as u32);
            self.len += 1;
        }
    }

    /// Indices of points within `radius` of `center`, unordered.
    /// `targets` must be the slice the grid was last rebuilt from.
    pub fn query_radius<'a>(
        &'a self,
        targets: &'a [TargetPoint],
        center: Vec2,
        radius: f32,
    ) -> impl Iterator<Item = usize> + 'a {
        let radius = radius.max(0.0);
        let radius_sq = radius * radius;
        let (min_x, min_y) = self.position_to_cell(center - Vec2::new(radius, radius));
        let (max_x, max_y) = self.position_to_cell(center + Vec2::new(radius, radius));

        (min_x..=max_x)
            .flat_map(move |cx| (min_y..=max_y).map(move |cy| (cx, cy)))
            .filter_map(move |key| self.cells.get(&key))
            .flat_map(|cell| cell.iter().map(|&i| i as usize))
            .filter(move |&i| {
                targets
                    .get(i)
                    .is_some_and(|t| t.position.distance_sq_to(center) <= radius_sq)
            })
    }

    /// Number of non-empty cells
    pub fn occupied_cells(&self) -> usize {
        self.cells.values().filter(|c| !c.is_empty()).count()
    }
}

impl Default for TargetGrid {
    fn default() -> Self {
        Self::new(TARGET_GRID_CELL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(coords: &[(f32, f32)]) -> Vec<TargetPoint> {
        coords.iter().map(|&(x, y)| TargetPoint::new(Vec2::new(x, y), 1.0)).collect()
    }

    #[test]
    fn test_query_radius_exact() {
        let targets = points(&[(0.0, 0.0), (30.0, 0.0), (100.0, 0.0), (-63.0, -10.0), (500.0, 500.0)]);
        let mut grid = TargetGrid::default();
        grid.rebuild(&targets);
        assert_eq!(grid.len(), 5);

        let mut found: Vec<usize> = grid.query_radius(&targets, Vec2::ZERO, 70.0).collect();
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 3]);
    }

    #[test]
    fn test_query_spans_many_cells() {
        let targets: Vec<TargetPoint> = (0..50)
            .map(|i| TargetPoint::new(Vec2::new(i as f32 * 20.0, 0.0), 1.0))
            .collect();
        let mut grid = TargetGrid::new(32.0);
        grid.rebuild(&targets);
        assert_eq!(grid.query_radius(&targets, Vec2::new(500.0, 0.0), 200.0).count(), 21);
    }

    #[test]
    fn test_rebuild_clears_previous() {
        let mut grid = TargetGrid::default();
        grid.rebuild(&points(&[(0.0, 0.0), (10.0, 10.0)]));
        let fresh = points(&[(1000.0, 0.0)]);
        grid.rebuild(&fresh);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.query_radius(&fresh, Vec2::ZERO, 50.0).count(), 0);
        assert_eq!(grid.occupied_cells(), 1);
    }

    #[test]
    fn test_non_finite_points_skipped() {
        let targets = vec![TargetPoint::new(Vec2::new(f32::NAN, 0.0), 1.0)];
        let mut grid = TargetGrid::default();
        grid.rebuild(&targets);
        assert!(grid.is_empty());
    }
}
