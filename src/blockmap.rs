//! A uniform grid over the map, listing which subsectors overlap each cell.
//!
//! The grid is built in one go once the BSP is finished: every subsector is
//! bucketed into every cell its bounding box touches, then each bucket is
//! frozen into a boxed slice.  Nothing is ever added afterwards; changing the
//! map means building a new blockmap.

use std::ops::ControlFlow;
use std::time::Instant;

use bit_vec::BitVec;

use crate::geom::{BBox, Coord, Point, Size};
use crate::handle::Handle;
use crate::map::Subsector;

/// Cell edge used when nothing else is asked for.
pub const DEFAULT_CELL_SIZE: Coord = 128.0;

#[derive(Debug)]
pub struct SubsectorBlockmap {
    origin: Point,
    cell_size: Coord,
    width: usize,
    height: usize,
    /// One past the highest subsector index seen while building.
    num_subsectors: usize,
    /// Row-major; `None` for a cell no subsector touches.
    cells: Vec<Option<Box<[Handle<Subsector>]>>>,
}

impl SubsectorBlockmap {
    /// Buckets `subsectors` into a grid anchored at `bounds.min`.  The grid is
    /// `ceil(extent / cell_size) + 1` cells along each axis, so a subsector
    /// whose far edge lies exactly on the last grid line still fits.
    ///
    /// Subsectors without a sector are left out.  So are subsectors reaching
    /// outside the grid, with a warning, since that means `bounds` does not
    /// cover the map.
    ///
    /// # Panics
    ///
    /// If `cell_size` is not positive.
    pub fn build<'a, I>(bounds: &BBox, cell_size: Coord, subsectors: I) -> SubsectorBlockmap
    where
        I: IntoIterator<Item = (Handle<Subsector>, &'a Subsector)>,
    {
        assert!(cell_size > 0.0, "blockmap cell size must be positive, got {}", cell_size);
        let started = Instant::now();

        let origin = bounds.min;
        let width = (bounds.width() / cell_size).ceil() as usize + 1;
        let height = (bounds.height() / cell_size).ceil() as usize + 1;

        let mut buckets: Vec<Vec<Handle<Subsector>>> = vec![Vec::new(); width * height];
        let mut num_subsectors = 0;
        let mut skipped = 0;
        for (handle, subsector) in subsectors {
            num_subsectors = num_subsectors.max(handle.index() + 1);
            if subsector.sector().is_none() {
                continue;
            }

            let bbox = subsector.bbox();
            let block = |value: Coord, start: Coord| ((value - start) / cell_size).floor() as isize;
            let (xl, xh) = (block(bbox.min.x, origin.x), block(bbox.max.x, origin.x));
            let (yl, yh) = (block(bbox.min.y, origin.y), block(bbox.max.y, origin.y));
            if xl < 0 || yl < 0 || xh >= width as isize || yh >= height as isize {
                warn!(
                    "Subsector #{} spans blocks [{}, {}] x [{}, {}], outside the {}x{} blockmap; skipping it",
                    handle, xl, xh, yl, yh, width, height);
                skipped += 1;
                continue;
            }

            for y in yl as usize ..= yh as usize {
                for x in xl as usize ..= xh as usize {
                    buckets[y * width + x].push(handle);
                }
            }
        }

        let cells: Vec<_> = buckets.into_iter()
            .map(|bucket| if bucket.is_empty() { None } else { Some(bucket.into_boxed_slice()) })
            .collect();

        let used = cells.iter().filter(|cell| cell.is_some()).count();
        let entries: usize = cells.iter().flatten().map(|cell| cell.len()).sum();
        debug!(
            "Built {}x{} subsector blockmap in {:.2?}: {} of {} cells used, {} entries, {} subsectors skipped",
            width, height, started.elapsed(), used, cells.len(), entries, skipped);

        SubsectorBlockmap {
            origin,
            cell_size,
            width,
            height,
            num_subsectors,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell_size(&self) -> Coord {
        self.cell_size
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    /// The area the grid covers, which reaches one cell past the map.
    pub fn bounds(&self) -> BBox {
        let size = Size::new(self.width as Coord, self.height as Coord) * self.cell_size;
        BBox::new(self.origin, self.origin + size.to_vector())
    }

    /// Subsectors listed in cell `(x, y)`; empty for an empty cell or one
    /// outside the grid.
    pub fn cell(&self, x: usize, y: usize) -> &[Handle<Subsector>] {
        if x >= self.width || y >= self.height {
            return &[];
        }
        self.cells[y * self.width + x].as_deref().unwrap_or(&[])
    }

    /// The cell containing `point`, if it lies on the grid.
    pub fn cell_coords(&self, point: Point) -> Option<(usize, usize)> {
        let offset = (point - self.origin) / self.cell_size;
        let (x, y) = (offset.x.floor(), offset.y.floor());
        if x < 0.0 || y < 0.0 || x >= self.width as Coord || y >= self.height as Coord {
            return None;
        }
        Some((x as usize, y as usize))
    }

    pub fn cell_bounds(&self, x: usize, y: usize) -> BBox {
        let min = self.origin + euclid::vec2(x as Coord, y as Coord) * self.cell_size;
        BBox::new(min, min + euclid::vec2(self.cell_size, self.cell_size))
    }

    /// Subsectors listed in the cell under `point`.
    pub fn subsectors_at(&self, point: Point) -> &[Handle<Subsector>] {
        match self.cell_coords(point) {
            Some((x, y)) => self.cell(x, y),
            None => &[],
        }
    }

    /// Visits each subsector listed in any cell that `bbox` touches, once
    /// apiece.  Cells are walked row by row from the bottom left.
    pub fn subsectors_box_iterator<B, F>(&self, bbox: &BBox, mut visitor: F) -> ControlFlow<B>
    where
        F: FnMut(Handle<Subsector>) -> ControlFlow<B>,
    {
        let block = |value: Coord, start: Coord, limit: usize| -> Option<usize> {
            let block = ((value - start) / self.cell_size).floor();
            if block < 0.0 {
                None
            }
            else {
                Some((block as usize).min(limit - 1))
            }
        };
        if bbox.max.x < self.origin.x || bbox.max.y < self.origin.y {
            return ControlFlow::Continue(());
        }
        let xl = block(bbox.min.x, self.origin.x, self.width).unwrap_or(0);
        let yl = block(bbox.min.y, self.origin.y, self.height).unwrap_or(0);
        let (xh, yh) = match (block(bbox.max.x, self.origin.x, self.width), block(bbox.max.y, self.origin.y, self.height)) {
            (Some(xh), Some(yh)) => (xh, yh),
            _ => return ControlFlow::Continue(()),
        };
        let grid = self.bounds();
        if bbox.min.x > grid.max.x || bbox.min.y > grid.max.y {
            return ControlFlow::Continue(());
        }

        let mut seen = BitVec::from_elem(self.num_subsectors, false);
        for y in yl..=yh {
            for x in xl..=xh {
                for &subsector in self.cell(x, y) {
                    if seen[subsector.index()] {
                        continue;
                    }
                    seen.set(subsector.index(), true);
                    if let ControlFlow::Break(value) = visitor(subsector) {
                        return ControlFlow::Break(value);
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }
}
