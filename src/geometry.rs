use serde::{Deserialize, Serialize};

/// Anything with a position in window-local raster space.
pub trait PointLike {
    fn row(&self) -> f64;
    fn col(&self) -> f64;

    fn as_array(&self) -> [f64; 2] {
        [self.row(), self.col()]
    }

    fn distance<P: PointLike>(&self, other: &P) -> f64 {
        (self.row() - other.row()).hypot(self.col() - other.col())
    }
}

/// Integer raster coordinate, `(row, col)` with the origin at the window's top-left.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GridCoord {
    pub row: i32,
    pub col: i32,
}

impl GridCoord {
    pub fn new(row: i32, col: i32) -> Self {
        GridCoord { row, col }
    }

    pub fn distance_2(&self, other: &GridCoord) -> i64 {
        let dr = (self.row - other.row) as i64;
        let dc = (self.col - other.col) as i64;
        dr * dr + dc * dc
    }

    pub fn is_diagonal_step(&self, other: &GridCoord) -> bool {
        self.row != other.row && self.col != other.col
    }

    /// Map back into image space given the window the raster was cropped to.
    pub fn to_image(&self, left: usize, top: usize) -> ImagePoint {
        ImagePoint {
            x: (self.col as i64 + left as i64) as f64,
            y: (self.row as i64 + top as i64) as f64,
        }
    }
}

impl PointLike for GridCoord {
    fn row(&self) -> f64 {
        self.row as f64
    }

    fn col(&self) -> f64 {
        self.col as f64
    }
}

impl rstar::Point for GridCoord {
    type Scalar = i32;
    const DIMENSIONS: usize = 2;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        GridCoord {
            row: generator(0),
            col: generator(1),
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        match index {
            0 => self.row,
            1 => self.col,
            _ => unreachable!(),
        }
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        match index {
            0 => &mut self.row,
            1 => &mut self.col,
            _ => unreachable!(),
        }
    }
}

/// Floating point position in image space, as carried by the ROI payload.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImagePoint {
    pub x: f64,
    pub y: f64,
}

impl ImagePoint {
    pub fn new(x: f64, y: f64) -> Self {
        ImagePoint { x, y }
    }

    /// Window-local `(row, col)` position for a crop whose top-left is `(left, top)`.
    pub fn to_local(&self, left: usize, top: usize) -> LocalPoint {
        LocalPoint {
            row: self.y - top as f64,
            col: self.x - left as f64,
        }
    }
}

/// A sampled position expressed in window-local `(row, col)` space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalPoint {
    pub row: f64,
    pub col: f64,
}

impl PointLike for LocalPoint {
    fn row(&self) -> f64 {
        self.row
    }

    fn col(&self) -> f64 {
        self.col
    }
}

/// Region of interest polygon in image coordinates. Empty means "whole raster".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoiPolygon {
    pub vertices: Vec<ImagePoint>,
}

impl RoiPolygon {
    pub fn new(vertices: Vec<ImagePoint>) -> Self {
        RoiPolygon { vertices }
    }

    pub fn rectangle(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        RoiPolygon::new(vec![
            ImagePoint::new(left, top),
            ImagePoint::new(right, top),
            ImagePoint::new(right, bottom),
            ImagePoint::new(left, bottom),
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// `(min_x, min_y, max_x, max_y)` of the vertices.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let first = self.vertices.first()?;
        let mut bounds = (first.x, first.y, first.x, first.y);
        for vertex in &self.vertices[1..] {
            bounds.0 = bounds.0.min(vertex.x);
            bounds.1 = bounds.1.min(vertex.y);
            bounds.2 = bounds.2.max(vertex.x);
            bounds.3 = bounds.3.max(vertex.y);
        }
        Some(bounds)
    }

    /// Even-odd ray casting test.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[j];
            if (a.y > y) != (b.y > y) {
                let crossing_x = (b.x - a.x) * (y - a.y) / (b.y - a.y) + a.x;
                if x < crossing_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}
