//! Input dataset container

use crate::core::types::DVec3;
use crate::data::cell::Cell;
use crate::math::Aabb;

/// A collection of points and/or cells to resample.
///
/// The bounding box is computed from the content unless overridden with
/// [`DataSet::with_bounds`].
#[derive(Clone, Debug, Default)]
pub struct DataSet {
    points: Vec<DVec3>,
    cells: Vec<Cell>,
    explicit_bounds: Option<Aabb>,
}

impl DataSet {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dataset holding only points
    pub fn from_points(points: Vec<DVec3>) -> Self {
        Self {
            points,
            cells: Vec::new(),
            explicit_bounds: None,
        }
    }

    /// Create a dataset holding only cells
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self {
            points: Vec::new(),
            cells,
            explicit_bounds: None,
        }
    }

    /// Override the computed bounding box
    pub fn with_bounds(mut self, bounds: Aabb) -> Self {
        self.explicit_bounds = Some(bounds);
        self
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn point(&self, i: usize) -> DVec3 {
        self.points[i]
    }

    pub fn cell(&self, i: usize) -> &Cell {
        &self.cells[i]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Largest vertex count over all cells (scratch sizing)
    pub fn max_cell_points(&self) -> usize {
        self.cells.iter().map(|c| c.n_points()).max().unwrap_or(0)
    }

    /// Bounding box of all points and cells
    pub fn bounds(&self) -> Aabb {
        if let Some(b) = self.explicit_bounds {
            return b;
        }
        let mut aabb = Aabb::new(DVec3::INFINITY, DVec3::NEG_INFINITY);
        for &p in &self.points {
            aabb.expand(p);
        }
        for cell in &self.cells {
            let cb = cell.bounds();
            aabb.expand(cb.min);
            aabb.expand(cb.max);
        }
        if aabb.min.x > aabb.max.x {
            Aabb::default()
        } else {
            aabb
        }
    }
}
