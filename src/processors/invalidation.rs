use std::collections::HashMap;

use crate::{
    events::{EventEmitter, Region, ScratchEvent},
    grid::GridCell,
    models::ScratchPathPoint,
};

/// Inclusive block of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CellRect {
    pub fn cell_count(&self) -> u64 {
        u64::from(self.right - self.left + 1) * u64::from(self.bottom - self.top + 1)
    }
}

/// Forwards each batch's points and the surface regions its new cells cover.
/// Holds no state between batches.
#[derive(Debug, Clone)]
pub struct InvalidationProcessor {
    cell_size_px: u32,
    surface_width: u32,
    surface_height: u32,
    emitter: EventEmitter,
}

impl InvalidationProcessor {
    pub fn new(
        cell_size_px: u32,
        surface_width: u32,
        surface_height: u32,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            cell_size_px,
            surface_width,
            surface_height,
            emitter,
        }
    }

    pub fn on_cells_marked(
        &self,
        newly_marked: &[GridCell],
        origin_points: &[ScratchPathPoint],
    ) -> Vec<Region> {
        if newly_marked.is_empty() {
            return Vec::new();
        }

        let regions: Vec<Region> = coalesce_cells(newly_marked)
            .into_iter()
            .filter_map(|rect| self.to_surface_region(rect))
            .collect();

        self.emitter.emit(ScratchEvent::NewScratchedPoints {
            points: origin_points.to_vec(),
        });
        self.emitter.emit(ScratchEvent::InvalidateRegions {
            regions: regions.clone(),
        });

        regions
    }

    fn to_surface_region(&self, rect: CellRect) -> Option<Region> {
        let cell = u64::from(self.cell_size_px);
        let left = u64::from(rect.left) * cell;
        let top = u64::from(rect.top) * cell;
        let right = ((u64::from(rect.right) + 1) * cell).min(u64::from(self.surface_width));
        let bottom = ((u64::from(rect.bottom) + 1) * cell).min(u64::from(self.surface_height));

        if left >= right || top >= bottom {
            return None;
        }

        // every value is bounded by the u32 surface size
        Some(Region::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

/// Covers `cells` with non-overlapping rectangles: runs of adjacent cells in a
/// row, stacked with runs of the same span in the rows directly below.
pub fn coalesce_cells(cells: &[GridCell]) -> Vec<CellRect> {
    let mut sorted = cells.to_vec();
    sorted.sort_unstable_by_key(|cell| (cell.y, cell.x));
    sorted.dedup();

    let mut rects: Vec<CellRect> = Vec::new();
    let mut open: HashMap<(u32, u32), usize> = HashMap::new();

    let mut index = 0;
    while index < sorted.len() {
        let start = sorted[index];
        let mut end = start;
        index += 1;

        while index < sorted.len() && sorted[index].y == start.y && sorted[index].x == end.x + 1 {
            end = sorted[index];
            index += 1;
        }

        let span = (start.x, end.x);
        match open.get(&span) {
            Some(&rect) if rects[rect].bottom + 1 == start.y => rects[rect].bottom = start.y,
            _ => {
                open.insert(span, rects.len());
                rects.push(CellRect {
                    left: start.x,
                    top: start.y,
                    right: end.x,
                    bottom: start.y,
                });
            }
        }
    }

    rects
}
