use rstar::RTree;
use tracing::trace;

use crate::config::{tier_at, RouteChoiceConfig};
use crate::error::Rejection;
use crate::geometry::GridCoord;

use super::corridor::{corridor_cost_grid, corridor_mask};
use super::grid::CostGrid;
use super::types::{Candidate, PixelPath, RefinedRoute, ScoredCandidate};

/// Approximate per-cell bytes held by one refinement worker: the alternate cost grid,
/// pathfinder scores, back-pointers and the corridor raster.
pub const REFINE_BYTES_PER_CELL: u64 = 22;

#[derive(Clone, Copy, Debug)]
pub struct RefineParams<'a> {
    pub overlap_tiers: &'a [f64],
    pub overlap_tolerance: f64,
    pub corridor_base_width: f64,
    pub corridor_scale_factor: f64,
    pub corridor_outside_penalty: f64,
    pub smoothing_window: usize,
}

impl<'a> From<&'a RouteChoiceConfig> for RefineParams<'a> {
    fn from(config: &'a RouteChoiceConfig) -> Self {
        RefineParams {
            overlap_tiers: &config.overlap_tiers,
            overlap_tolerance: config.pixel_overlap_tolerance,
            corridor_base_width: config.corridor_base_width,
            corridor_scale_factor: config.corridor_scale_factor,
            corridor_outside_penalty: config.corridor_outside_penalty,
            smoothing_window: config.smoothing_window,
        }
    }
}

/// Centred moving average with truncation to whole pixels. The `(window - 1) / 2` points
/// at either end are kept as they are; paths shorter than the window are returned unchanged.
pub fn smooth_path(path: &PixelPath, window: usize) -> PixelPath {
    let points = &path.points;
    if window <= 1 || points.len() < window {
        return path.clone();
    }
    let half = (window - 1) / 2;
    let mut smoothed = Vec::with_capacity(points.len());
    smoothed.extend_from_slice(&points[..half]);
    for centre in half..points.len() - half {
        let span = &points[centre - half..=centre + half];
        let (rows, cols) = span
            .iter()
            .fold((0i64, 0i64), |(r, c), p| (r + p.row as i64, c + p.col as i64));
        smoothed.push(GridCoord::new(
            (rows / window as i64) as i32,
            (cols / window as i64) as i32,
        ));
    }
    smoothed.extend_from_slice(&points[points.len() - half..]);
    PixelPath::new(smoothed)
}

/// Shared pixels relative to the smaller of the two pixel sets; 1.0 when either is empty.
pub fn pixel_overlap(a: &PixelPath, b: &PixelPath) -> f64 {
    let set_a = a.pixel_set();
    let set_b = b.pixel_set();
    let smaller = set_a.len().min(set_b.len());
    if smaller == 0 {
        return 1.0;
    }
    set_a.intersection(&set_b).count() as f64 / smaller as f64
}

/// Workers the memory budget allows for a `cells`-sized raster, capped by the CPU count
/// and `max_workers`. Never zero.
pub fn refine_worker_count(cells: usize, budget_bytes: u64, cpus: usize, max_workers: Option<usize>) -> usize {
    let per_worker = (cells as u64).saturating_mul(REFINE_BYTES_PER_CELL).max(1);
    let by_memory = usize::try_from(budget_bytes / per_worker).unwrap_or(usize::MAX);
    let ceiling = max_workers.map_or(cpus, |m| m.min(cpus)).max(1);
    by_memory.clamp(1, ceiling)
}

/// Rebuild a graph level candidate at pixel resolution and re-check its diversity.
pub fn refine_candidate(
    base: &CostGrid,
    scored: &ScoredCandidate,
    params: &RefineParams,
) -> Result<Candidate, Rejection> {
    let start = scored.start();
    let end = scored.end();

    let main_pixels = base.find_path(start, end).ok_or(Rejection::NoPath)?;
    let main_pixels = smooth_path(&main_pixels, params.smoothing_window);
    let main_nodes = RTree::bulk_load(scored.main.coords.clone());

    let mut alternates: Vec<RefinedRoute> = Vec::with_capacity(scored.alternates.len());
    for (index, alternate) in scored.alternates.iter().enumerate() {
        let corridor = corridor_mask(
            base.width,
            base.height,
            alternate,
            &main_nodes,
            params.corridor_base_width,
            params.corridor_scale_factor,
        );
        let grid = corridor_cost_grid(base, &corridor, params.corridor_outside_penalty, start, end);
        let pixels = grid.find_path(start, end).ok_or(Rejection::NoPath)?;
        let pixels = smooth_path(&pixels, params.smoothing_window);

        let limit = tier_at(params.overlap_tiers, index) + params.overlap_tolerance;
        let references = std::iter::once(&main_pixels).chain(alternates.iter().map(|r| &r.pixels));
        for reference in references {
            let overlap = pixel_overlap(&pixels, reference);
            if overlap > limit {
                trace!(pair = ?scored.pair, alternate = index, overlap, limit, "pixel overlap too high");
                return Err(Rejection::RefinementMismatch {
                    alternate: index,
                    overlap,
                    limit,
                });
            }
        }

        alternates.push(RefinedRoute {
            graph: alternate.clone(),
            pixels,
        });
    }

    let first_overlap = alternates
        .first()
        .map(|first| pixel_overlap(&main_pixels, &first.pixels))
        .unwrap_or(0.0);

    Ok(Candidate {
        pair: scored.pair,
        main: RefinedRoute {
            graph: scored.main.clone(),
            pixels: main_pixels,
        },
        alternates,
        score: scored.score,
        main_length: scored.main_length,
        pixel_overlap: first_overlap,
        selection_pass: None,
    })
}
