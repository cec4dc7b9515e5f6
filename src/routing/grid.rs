use std::cmp::Reverse;

use priority_queue::PriorityQueue;

use crate::geometry::{GridCoord, PointLike};
use crate::raster::NavMask;

use super::types::{FloatOrd, PixelPath};

pub(crate) const NAVIGABLE_COST: f64 = 1.0;

const STEPS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Per-pixel traversal cost raster, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct CostGrid {
    pub width: usize,
    pub height: usize,
    costs: Vec<f64>,
}

impl CostGrid {
    /// Navigable pixels cost one, everything else `impassable_cost`.
    pub fn from_mask(mask: &NavMask, impassable_cost: f64) -> Self {
        CostGrid {
            width: mask.width(),
            height: mask.height(),
            costs: mask
                .cells()
                .iter()
                .map(|&n| if n { NAVIGABLE_COST } else { impassable_cost })
                .collect(),
        }
    }

    pub fn index_of(&self, coord: GridCoord) -> Option<usize> {
        if coord.row >= 0
            && coord.col >= 0
            && (coord.row as usize) < self.height
            && (coord.col as usize) < self.width
        {
            Some(coord.row as usize * self.width + coord.col as usize)
        } else {
            None
        }
    }

    fn coord_of(&self, index: usize) -> GridCoord {
        GridCoord::new((index / self.width) as i32, (index % self.width) as i32)
    }

    pub fn cost(&self, coord: GridCoord) -> Option<f64> {
        self.index_of(coord).map(|i| self.costs[i])
    }

    pub fn set_cost(&mut self, coord: GridCoord, cost: f64) {
        if let Some(i) = self.index_of(coord) {
            self.costs[i] = cost;
        }
    }

    pub(crate) fn costs_mut(&mut self) -> &mut [f64] {
        &mut self.costs
    }

    /// Minimum geometric-cost 8-connected path. Moving between neighbouring pixels costs
    /// the step length times the mean of the two pixel costs.
    pub fn find_path(&self, start: GridCoord, goal: GridCoord) -> Option<PixelPath> {
        let start_index = self.index_of(start)?;
        let goal_index = self.index_of(goal)?;
        if start_index == goal_index {
            return Some(PixelPath::new(vec![start]));
        }

        let floor_cost = self
            .costs
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
            .max(0.0);
        let heuristic = |coord: GridCoord| coord.distance(&goal) * floor_cost;

        let size = self.costs.len();
        let mut g_score = vec![f64::INFINITY; size];
        let mut came_from: Vec<u32> = vec![u32::MAX; size];
        let mut closed = vec![false; size];
        let mut frontier: PriorityQueue<usize, Reverse<FloatOrd>> = PriorityQueue::new();

        g_score[start_index] = 0.0;
        frontier.push(start_index, Reverse(FloatOrd(heuristic(start))));

        while let Some((current, _)) = frontier.pop() {
            if current == goal_index {
                let mut points = vec![self.coord_of(current)];
                let mut cursor = current;
                while came_from[cursor] != u32::MAX {
                    cursor = came_from[cursor] as usize;
                    points.push(self.coord_of(cursor));
                }
                points.reverse();
                return Some(PixelPath::new(points));
            }
            closed[current] = true;

            let coord = self.coord_of(current);
            let current_cost = self.costs[current];
            for (dr, dc) in STEPS {
                let next = GridCoord::new(coord.row + dr, coord.col + dc);
                let Some(next_index) = self.index_of(next) else {
                    continue;
                };
                if closed[next_index] {
                    continue;
                }
                let step = if dr != 0 && dc != 0 {
                    std::f64::consts::SQRT_2
                } else {
                    1.0
                };
                let tentative_g =
                    g_score[current] + step * (current_cost + self.costs[next_index]) / 2.0;
                if tentative_g >= g_score[next_index] {
                    continue;
                }
                g_score[next_index] = tentative_g;
                came_from[next_index] = current as u32;
                frontier.push_increase(
                    next_index,
                    Reverse(FloatOrd(tentative_g + heuristic(next))),
                );
            }
        }

        None
    }
}
