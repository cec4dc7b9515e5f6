mod astar;
mod corridor;
mod divergence;
mod generator;
mod grid;
mod refine;
mod scoring;
mod select;
mod trace;
mod types;

pub use corridor::{corridor_cost_grid, corridor_mask};
pub use divergence::{evaluate_pair, evaluate_pair_with_config, max_separation, route_similarity, DivergenceParams};
pub use generator::{GenerationStats, RouteChoiceGenerator, RouteChoiceSet};
pub use grid::CostGrid;
pub use refine::{pixel_overlap, refine_candidate, refine_worker_count, smooth_path, RefineParams};
pub use scoring::{compound_score, score_candidate, simple_score};
pub use select::{
    hardness_order, select_diverse, select_in_batches, sort_by_hardness, too_close, BatchRecord, SelectionParams,
};
pub use trace::TRACE_ENV_VAR;
pub use types::{
    Candidate, CandidatePair, GraphRoute, PixelPath, Presentation, PresentedRoute, RefinedRoute, RouteKind,
    ScoredCandidate,
};
