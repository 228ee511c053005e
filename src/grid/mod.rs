use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Upper bound on cells per grid, whatever the surface resolution.
pub const MAX_GRID_CELLS: u64 = 1 << 24;

/// Grid dimensions in cells.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Grid covering a `surface_width x surface_height` pixel surface, one cell
    /// per `cell_size_px` square. Partial cells at the far edges count as whole.
    pub fn for_surface(
        surface_width: u32,
        surface_height: u32,
        cell_size_px: u32,
    ) -> Result<Self, ConfigError> {
        if cell_size_px == 0 {
            return Err(ConfigError::ZeroCellSize);
        }
        if surface_width == 0 || surface_height == 0 {
            return Err(ConfigError::EmptySurface {
                width: surface_width,
                height: surface_height,
            });
        }

        let width = surface_width.div_ceil(cell_size_px);
        let height = surface_height.div_ceil(cell_size_px);

        match u64::from(width).checked_mul(u64::from(height)) {
            Some(cells) if cells <= MAX_GRID_CELLS => Ok(Self { width, height }),
            _ => Err(ConfigError::GridTooLarge {
                width,
                height,
                max: MAX_GRID_CELLS,
            }),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub x: u32,
    pub y: u32,
}

impl GridCell {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Scratch state per cell. Cells only ever go from clear to marked; starting
/// over means building a new grid.
#[derive(Debug, Clone)]
pub struct CoverageGrid {
    size: GridSize,
    cells: Vec<bool>,
    marked: usize,
}

impl CoverageGrid {
    pub fn new(size: GridSize) -> Self {
        Self {
            size,
            cells: vec![false; size.cell_count()],
            marked: 0,
        }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn marked_count(&self) -> usize {
        self.marked
    }

    pub fn is_marked(&self, cell: GridCell) -> bool {
        self.index(cell).is_some_and(|index| self.cells[index])
    }

    /// Maps a position in cell units to the cell containing it, clamped into
    /// the grid. Non-finite input clamps like any other out of range value.
    pub fn clamp_to_cell(&self, x: f64, y: f64) -> GridCell {
        GridCell {
            x: clamp_axis(x, self.size.width),
            y: clamp_axis(y, self.size.height),
        }
    }

    /// Marks every cell of the filled disc of `radius` cells around the cell
    /// containing `(center_x, center_y)`. A cell belongs to the disc when its
    /// integer offset `(dx, dy)` from the centre cell has `dx² + dy² <= radius²`.
    ///
    /// Cells that were clear are appended to `newly_marked`; the number
    /// appended is returned.
    pub fn mark_disc(
        &mut self,
        center_x: f64,
        center_y: f64,
        radius: f64,
        newly_marked: &mut Vec<GridCell>,
    ) -> usize {
        if self.cells.is_empty() {
            return 0;
        }

        let center = self.clamp_to_cell(center_x, center_y);
        let radius = if radius.is_finite() { radius.max(0.0) } else { 0.0 };
        let radius_sq = radius * radius;
        let reach = radius.floor() as i64;

        let cx = i64::from(center.x);
        let cy = i64::from(center.y);
        let max_x = i64::from(self.size.width) - 1;
        let max_y = i64::from(self.size.height) - 1;

        let before = newly_marked.len();

        for y in (cy - reach).max(0)..=(cy + reach).min(max_y) {
            let dy = y - cy;
            for x in (cx - reach).max(0)..=(cx + reach).min(max_x) {
                let dx = x - cx;
                if ((dx * dx + dy * dy) as f64) > radius_sq {
                    continue;
                }

                let cell = GridCell::new(x as u32, y as u32);
                if self.mark(cell) {
                    newly_marked.push(cell);
                }
            }
        }

        newly_marked.len() - before
    }

    fn mark(&mut self, cell: GridCell) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };

        if self.cells[index] {
            return false;
        }

        self.cells[index] = true;
        self.marked += 1;
        true
    }

    fn index(&self, cell: GridCell) -> Option<usize> {
        if cell.x >= self.size.width || cell.y >= self.size.height {
            return None;
        }
        Some(cell.y as usize * self.size.width as usize + cell.x as usize)
    }
}

fn clamp_axis(value: f64, extent: u32) -> u32 {
    // `as` saturates and maps NaN to 0
    let floored = value.floor() as i64;
    floored.clamp(0, i64::from(extent.saturating_sub(1))) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: u32, height: u32) -> CoverageGrid {
        CoverageGrid::new(GridSize::new(width, height))
    }

    #[test]
    fn surface_size_rounds_partial_cells_up() {
        let size = GridSize::for_surface(101, 40, 10).unwrap();
        assert_eq!(size, GridSize::new(11, 4));
        assert_eq!(size.cell_count(), 44);
    }

    #[test]
    fn surface_without_area_is_rejected() {
        assert_eq!(
            GridSize::for_surface(0, 40, 10),
            Err(ConfigError::EmptySurface {
                width: 0,
                height: 40
            })
        );
        assert_eq!(GridSize::for_surface(10, 10, 0), Err(ConfigError::ZeroCellSize));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        assert_eq!(
            GridSize::for_surface(u32::MAX, u32::MAX, 1),
            Err(ConfigError::GridTooLarge {
                width: u32::MAX,
                height: u32::MAX,
                max: MAX_GRID_CELLS,
            })
        );

        // the same surface fits once cells are coarse enough
        let size = GridSize::for_surface(u32::MAX, u32::MAX, 1 << 20).unwrap();
        assert_eq!(size, GridSize::new(4096, 4096));
        assert!(size.cell_count() as u64 <= MAX_GRID_CELLS);
    }

    #[test]
    fn grid_at_the_cell_limit_is_accepted() {
        assert!(GridSize::for_surface(4096, 4096, 1).is_ok());
        assert!(GridSize::for_surface(4097, 4096, 1).is_err());
    }

    #[test]
    fn sub_cell_radius_marks_only_the_centre() {
        let mut grid = grid(10, 10);
        let mut marked = Vec::new();

        assert_eq!(grid.mark_disc(3.5, 7.5, 0.5, &mut marked), 1);
        assert_eq!(marked, vec![GridCell::new(3, 7)]);
        assert_eq!(grid.marked_count(), 1);
    }

    #[test]
    fn unit_radius_marks_a_plus() {
        let mut grid = grid(10, 10);
        let mut marked = Vec::new();

        assert_eq!(grid.mark_disc(5.0, 5.0, 1.0, &mut marked), 5);
        for cell in [(5, 4), (4, 5), (5, 5), (6, 5), (5, 6)] {
            assert!(grid.is_marked(GridCell::new(cell.0, cell.1)));
        }
        assert!(!grid.is_marked(GridCell::new(4, 4)));
    }

    #[test]
    fn radius_two_disc_has_thirteen_cells() {
        let mut grid = grid(10, 10);
        let mut marked = Vec::new();

        assert_eq!(grid.mark_disc(5.2, 5.9, 2.0, &mut marked), 13);
    }

    #[test]
    fn repeated_disc_marks_nothing_new() {
        let mut grid = grid(10, 10);
        let mut marked = Vec::new();

        assert_eq!(grid.mark_disc(2.0, 2.0, 1.0, &mut marked), 5);
        marked.clear();
        assert_eq!(grid.mark_disc(2.0, 2.0, 1.0, &mut marked), 0);
        assert!(marked.is_empty());
        assert_eq!(grid.marked_count(), 5);
    }

    #[test]
    fn overlapping_discs_only_report_new_cells() {
        let mut grid = grid(10, 10);
        let mut marked = Vec::new();

        grid.mark_disc(2.0, 2.0, 1.0, &mut marked);
        marked.clear();

        // shares (3, 2) with the previous plus
        assert_eq!(grid.mark_disc(4.0, 2.0, 1.0, &mut marked), 4);
        assert!(!marked.contains(&GridCell::new(3, 2)));
        assert_eq!(grid.marked_count(), 9);
    }

    #[test]
    fn out_of_bounds_points_are_clamped() {
        let mut grid = grid(4, 3);
        let mut marked = Vec::new();

        grid.mark_disc(-20.0, 99.0, 0.0, &mut marked);
        grid.mark_disc(f64::NAN, f64::INFINITY, 0.0, &mut marked);
        grid.mark_disc(1e12, -1e12, 0.0, &mut marked);

        assert_eq!(
            marked,
            vec![GridCell::new(0, 2), GridCell::new(3, 0)],
            "NaN clamps to the same cell as negative x"
        );
    }

    #[test]
    fn disc_is_clipped_at_grid_edges() {
        let mut grid = grid(10, 10);
        let mut marked = Vec::new();

        // plus at the corner keeps the centre and two in-bounds arms
        assert_eq!(grid.mark_disc(0.0, 0.0, 1.0, &mut marked), 3);
    }

    #[test]
    fn marks_are_commutative() {
        let centres = [(1.0, 1.0), (2.5, 1.5), (7.0, 8.0), (2.0, 2.0)];

        let mut forward = grid(10, 10);
        let mut backward = grid(10, 10);
        let mut scratch = Vec::new();

        for (x, y) in centres {
            forward.mark_disc(x, y, 1.5, &mut scratch);
        }
        for (x, y) in centres.iter().rev() {
            backward.mark_disc(*x, *y, 1.5, &mut scratch);
        }

        assert_eq!(forward.marked_count(), backward.marked_count());
        for y in 0..10 {
            for x in 0..10 {
                let cell = GridCell::new(x, y);
                assert_eq!(forward.is_marked(cell), backward.is_marked(cell));
            }
        }
    }
}
