use rstar::RTree;

use crate::geometry::GridCoord;
use crate::raster::NavMask;

use super::grid::{CostGrid, NAVIGABLE_COST};
use super::types::GraphRoute;

/// Union of filled disks around each alternate node. A disk widens with the node's
/// distance from the main route: `base_width + scale_factor * distance`.
pub fn corridor_mask(
    width: usize,
    height: usize,
    alternate: &GraphRoute,
    main_nodes: &RTree<GridCoord>,
    base_width: f64,
    scale_factor: f64,
) -> NavMask {
    let mut corridor = NavMask::empty(width, height);
    for centre in &alternate.coords {
        let distance = main_nodes
            .nearest_neighbor(centre)
            .map(|n| (centre.distance_2(n) as f64).sqrt())
            .unwrap_or(0.0);
        let radius = base_width + scale_factor * distance;
        let radius_2 = radius * radius;
        let reach = radius.floor() as i32;
        let first_col = (centre.col - reach).max(0);
        let last_col = (centre.col + reach).min(width as i32 - 1);
        for dr in -reach..=reach {
            let row = centre.row + dr;
            if row < 0 || row as usize >= height {
                continue;
            }
            for col in first_col..=last_col {
                let dc = col - centre.col;
                if ((dr * dr + dc * dc) as f64) <= radius_2 {
                    corridor.set(GridCoord::new(row, col), true);
                }
            }
        }
    }
    corridor
}

/// Base costs with `outside_penalty` added off the corridor; the endpoints always cost one.
pub fn corridor_cost_grid(
    base: &CostGrid,
    corridor: &NavMask,
    outside_penalty: f64,
    start: GridCoord,
    end: GridCoord,
) -> CostGrid {
    let mut grid = base.clone();
    for (cost, &inside) in grid.costs_mut().iter_mut().zip(corridor.cells()) {
        if !inside {
            *cost += outside_penalty;
        }
    }
    grid.set_cost(start, NAVIGABLE_COST);
    grid.set_cost(end, NAVIGABLE_COST);
    grid
}
