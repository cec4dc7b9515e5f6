use serde::{Deserialize, Serialize};

use crate::error::RouteChoiceError;
use crate::geometry::{GridCoord, RoiPolygon};

/// Integer crop window of the source raster, `[left, right) x [top, bottom)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiWindow {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

impl RoiWindow {
    pub fn full(width: usize, height: usize) -> Self {
        RoiWindow {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    /// Bounding box of the polygon clipped to a `width x height` raster.
    pub fn from_roi(roi: &RoiPolygon, width: usize, height: usize) -> Self {
        let Some((min_x, min_y, max_x, max_y)) = roi.bounds() else {
            return RoiWindow::full(width, height);
        };
        let left = (min_x.floor().max(0.0) as usize).min(width);
        let top = (min_y.floor().max(0.0) as usize).min(height);
        let right = (max_x.ceil().max(0.0) as usize).min(width).max(left);
        let bottom = (max_y.ceil().max(0.0) as usize).min(height).max(top);
        RoiWindow {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> usize {
        self.right - self.left
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top
    }
}

/// Row-major boolean navigability raster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl NavMask {
    pub fn from_bools(width: usize, height: usize, cells: Vec<bool>) -> Result<Self, RouteChoiceError> {
        if width.checked_mul(height) != Some(cells.len()) {
            return Err(RouteChoiceError::RasterShape {
                width,
                height,
                len: cells.len(),
            });
        }
        Ok(NavMask { width, height, cells })
    }

    /// Threshold an 8-bit luminance raster: strictly brighter than `threshold` is navigable.
    pub fn from_luma(
        width: usize,
        height: usize,
        luma: &[u8],
        threshold: u8,
    ) -> Result<Self, RouteChoiceError> {
        NavMask::from_bools(width, height, luma.iter().map(|&v| v > threshold).collect())
    }

    /// Parse an ASCII picture where `#` marks navigable cells. Rows may be ragged.
    pub fn from_ascii(picture: &str) -> Self {
        let rows: Vec<&str> = picture.lines().filter(|l| !l.trim().is_empty()).collect();
        let width = rows.iter().map(|r| r.trim_end().len()).max().unwrap_or(0);
        let mut cells = vec![false; width * rows.len()];
        for (r, line) in rows.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                if ch == '#' {
                    cells[r * width + c] = true;
                }
            }
        }
        NavMask {
            width,
            height: rows.len(),
            cells,
        }
    }

    pub fn empty(width: usize, height: usize) -> Self {
        NavMask {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.row >= 0
            && coord.col >= 0
            && (coord.row as usize) < self.height
            && (coord.col as usize) < self.width
    }

    pub fn index_of(&self, coord: GridCoord) -> Option<usize> {
        if self.contains(coord) {
            Some(coord.row as usize * self.width + coord.col as usize)
        } else {
            None
        }
    }

    pub fn coord_of(&self, index: usize) -> GridCoord {
        GridCoord::new((index / self.width) as i32, (index % self.width) as i32)
    }

    /// Cells outside the raster read as non-navigable.
    pub fn get(&self, coord: GridCoord) -> bool {
        self.index_of(coord).map(|i| self.cells[i]).unwrap_or(false)
    }

    pub fn set(&mut self, coord: GridCoord, value: bool) {
        if let Some(i) = self.index_of(coord) {
            self.cells[i] = value;
        }
    }

    pub fn navigable_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Navigable cells in row-major order.
    pub fn navigable_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c)
            .map(|(i, _)| self.coord_of(i))
    }

    pub fn crop(&self, window: &RoiWindow) -> NavMask {
        let right = window.right.min(self.width);
        let bottom = window.bottom.min(self.height);
        let left = window.left.min(right);
        let top = window.top.min(bottom);
        let width = right - left;
        let height = bottom - top;
        let mut cells = Vec::with_capacity(width * height);
        for row in top..bottom {
            let start = row * self.width;
            cells.extend_from_slice(&self.cells[start + left..start + right]);
        }
        NavMask { width, height, cells }
    }

    /// Two-subiteration thinning (Guo-Hall conditions G1 to G3) down to a one pixel wide,
    /// 8-connected skeleton. Diagonal strokes and small blobs keep a pixel.
    pub fn skeletonize(&self) -> NavMask {
        let mut skeleton = self.clone();
        let mut to_clear: Vec<usize> = Vec::new();
        loop {
            let mut changed = false;
            for first_pass in [true, false] {
                to_clear.clear();
                for index in 0..skeleton.cells.len() {
                    if skeleton.cells[index] && skeleton.thinning_removes(index, first_pass) {
                        to_clear.push(index);
                    }
                }
                for &index in &to_clear {
                    skeleton.cells[index] = false;
                }
                changed |= !to_clear.is_empty();
            }
            if !changed {
                return skeleton;
            }
        }
    }

    fn thinning_removes(&self, index: usize, first_pass: bool) -> bool {
        let c = self.coord_of(index);
        // x1..x8 counter-clockwise from east; x[8] wraps to x1.
        let x = [
            self.get(GridCoord::new(c.row, c.col + 1)),
            self.get(GridCoord::new(c.row - 1, c.col + 1)),
            self.get(GridCoord::new(c.row - 1, c.col)),
            self.get(GridCoord::new(c.row - 1, c.col - 1)),
            self.get(GridCoord::new(c.row, c.col - 1)),
            self.get(GridCoord::new(c.row + 1, c.col - 1)),
            self.get(GridCoord::new(c.row + 1, c.col)),
            self.get(GridCoord::new(c.row + 1, c.col + 1)),
            self.get(GridCoord::new(c.row, c.col + 1)),
        ];

        // G1: exactly one 8-connected run of foreground around the pixel.
        let crossings = (0..4)
            .filter(|&i| !x[2 * i] && (x[2 * i + 1] || x[2 * i + 2]))
            .count();
        if crossings != 1 {
            return false;
        }

        // G2: the pixel is neither an end point nor interior.
        let n1 = (0..4).filter(|&k| x[2 * k] || x[2 * k + 1]).count();
        let n2 = (0..4).filter(|&k| x[2 * k + 1] || x[2 * k + 2]).count();
        if !(2..=3).contains(&n1.min(n2)) {
            return false;
        }

        // G3 peels the south-east side first, then the north-west side.
        let (x1, x2, x3, x4, x5, x6, x7, x8) = (x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7]);
        if first_pass {
            !((x2 || x3 || !x8) && x1)
        } else {
            !((x6 || x7 || !x4) && x5)
        }
    }
}
