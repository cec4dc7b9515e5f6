use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::config::RouteChoiceConfig;
use crate::error::{Rejection, RouteChoiceError};
use crate::geometry::RoiPolygon;
use crate::graph::TerrainGraph;
use crate::pairs::generate_pairs;
use crate::progress::{CancelToken, Milestone, ProgressReporter, TracingReporter};
use crate::raster::{NavMask, RoiWindow};
use crate::sampling::{deduplicate, sample_points, snap_points};

use super::divergence::evaluate_pair_with_config;
use super::grid::CostGrid;
use super::refine::{refine_candidate, refine_worker_count, RefineParams};
use super::select::{select_in_batches, sort_by_hardness, SelectionParams};
use super::trace::{
    build_graph_trace, build_scoring_trace, build_selection_trace, record_batch_trace, trace_path_from_env,
    write_trace,
};
use super::types::{Candidate, ScoredCandidate};

/// Counters describing one generation job.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GenerationStats {
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub sampled_points: usize,
    pub unique_points: usize,
    pub pairs: usize,
    pub scored: usize,
    pub refined: usize,
    pub batches: usize,
    pub workers: usize,
    /// Dropped pairs per rejection kind, graph and pixel level combined.
    pub rejections: HashMap<&'static str, usize>,
}

/// Output of a generation job; coordinates are local to `window`.
#[derive(Clone, Debug)]
pub struct RouteChoiceSet {
    pub window: RoiWindow,
    pub candidates: Vec<Candidate>,
    pub stats: GenerationStats,
}

/// Runs the whole pipeline: terrain graph, waypoints, pairs, divergence search,
/// pixel refinement and diverse selection.
pub struct RouteChoiceGenerator {
    config: RouteChoiceConfig,
    reporter: Arc<dyn ProgressReporter>,
    cancel: CancelToken,
}

impl RouteChoiceGenerator {
    pub fn new(config: RouteChoiceConfig) -> Self {
        RouteChoiceGenerator {
            config,
            reporter: Arc::new(TracingReporter),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_reporter<R: ProgressReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &RouteChoiceConfig {
        &self.config
    }

    fn check_cancelled(&self) -> Result<(), RouteChoiceError> {
        if self.cancel.is_cancelled() {
            Err(RouteChoiceError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn run(&self, mask: &NavMask, roi: &RoiPolygon) -> Result<RouteChoiceSet, RouteChoiceError> {
        let config = &self.config;
        config.validate()?;
        let _span = info_span!("route_choice_job", width = mask.width(), height = mask.height()).entered();

        let trace_path = trace_path_from_env();
        let mut stats = GenerationStats::default();

        let window = RoiWindow::from_roi(roi, mask.width(), mask.height());
        let local = mask.crop(&window);
        debug!(?window, "cropped navigability mask");

        self.check_cancelled()?;
        self.reporter.report(Milestone::BuildingGraph);
        let graph = TerrainGraph::build(&local)?;
        stats.graph_nodes = graph.node_count();
        stats.graph_edges = graph.edge_count();
        info!(nodes = stats.graph_nodes, edges = stats.graph_edges, "terrain graph ready");

        self.check_cancelled()?;
        let seed = config.seed.unwrap_or_else(|| job_seed(mask, roi));
        let mut rng = StdRng::seed_from_u64(seed);
        let sampled = sample_points(roi, &window, config.num_random_points, &mut rng);
        let local_points: Vec<_> = sampled.iter().map(|p| p.to_local(window.left, window.top)).collect();
        let waypoints = deduplicate(&snap_points(&graph, &local_points), config.dedup_radius);
        let pairs = generate_pairs(
            &waypoints,
            config.candidate_min_dist,
            config.candidate_max_dist,
            config.max_candidate_pairs,
            &mut rng,
        );
        stats.sampled_points = sampled.len();
        stats.unique_points = waypoints.len();
        stats.pairs = pairs.len();
        if sampled.len() < config.num_random_points {
            warn!(
                requested = config.num_random_points,
                sampled = sampled.len(),
                "region of interest yielded fewer sample points than requested"
            );
        }
        self.reporter.report(Milestone::PairsReady { pairs: pairs.len() });

        let outcomes: Vec<Option<Result<ScoredCandidate, Rejection>>> = pairs
            .par_iter()
            .map(|&pair| {
                if self.cancel.is_cancelled() {
                    None
                } else {
                    Some(evaluate_pair_with_config(&graph, pair, config))
                }
            })
            .collect();
        self.check_cancelled()?;

        let mut scored: Vec<ScoredCandidate> = Vec::new();
        for outcome in outcomes.into_iter().flatten() {
            match outcome {
                Ok(candidate) => scored.push(candidate),
                Err(rejection) => *stats.rejections.entry(rejection.kind()).or_insert(0) += 1,
            }
        }
        stats.scored = scored.len();
        let graph_rejected: usize = stats.rejections.values().sum();
        debug!(rejections = ?stats.rejections, "pair evaluation finished");
        self.reporter.report(Milestone::ScoringPairs {
            scored: scored.len(),
            rejected: graph_rejected,
        });
        let scoring_trace = trace_path
            .as_ref()
            .map(|_| build_scoring_trace(pairs.len(), scored.len(), &stats.rejections));

        sort_by_hardness(&mut scored);

        let base = CostGrid::from_mask(&local, config.impassable_cost);
        let workers = refine_worker_count(
            local.len(),
            config.refine_memory_budget_bytes,
            rayon::current_num_threads(),
            config.max_workers,
        );
        stats.workers = workers;
        let pool = match ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => Some(pool),
            Err(error) => {
                warn!(%error, "could not build refinement pool, using the global pool");
                None
            }
        };
        info!(workers, scored = scored.len(), "refining candidates");

        let refine_params = RefineParams::from(config);
        let selection_params = SelectionParams::from(config);
        let mut refine_rejections: HashMap<&'static str, usize> = HashMap::new();
        let mut refined_total = 0usize;
        let mut batch_logs = Vec::new();
        let mut batches = 0usize;

        let selected = select_in_batches(
            &scored,
            config.batch_size,
            &selection_params,
            |_, chunk| -> Result<Vec<Candidate>, RouteChoiceError> {
                self.check_cancelled()?;
                let results = run_in_pool(pool.as_ref(), || {
                    chunk
                        .par_iter()
                        .map(|candidate| {
                            if self.cancel.is_cancelled() {
                                None
                            } else {
                                Some(refine_candidate(&base, candidate, &refine_params))
                            }
                        })
                        .collect::<Vec<_>>()
                });
                self.check_cancelled()?;
                let mut refined = Vec::with_capacity(results.len());
                for result in results.into_iter().flatten() {
                    match result {
                        Ok(candidate) => refined.push(candidate),
                        Err(rejection) => *refine_rejections.entry(rejection.kind()).or_insert(0) += 1,
                    }
                }
                refined_total += refined.len();
                Ok(refined)
            },
            |record| {
                batches += 1;
                self.reporter.report(Milestone::Refining {
                    batch: record.batch,
                    refined: record.refined_pool,
                    selected: record.selected,
                });
                if trace_path.is_some() {
                    record_batch_trace(&mut batch_logs, record);
                }
            },
        )?;

        for (kind, count) in refine_rejections {
            *stats.rejections.entry(kind).or_insert(0) += count;
        }
        stats.refined = refined_total;
        stats.batches = batches;

        if selected.len() < config.num_output_routes {
            warn!(
                requested = config.num_output_routes,
                selected = selected.len(),
                "fewer route choices than requested"
            );
        }
        self.reporter.report(Milestone::Completed {
            selected: selected.len(),
        });

        if let Some(path) = trace_path {
            write_trace(
                &path,
                build_graph_trace(&graph, &window),
                scoring_trace.unwrap_or_default(),
                batch_logs,
                build_selection_trace(&selected, &window),
            )?;
        }

        Ok(RouteChoiceSet {
            window,
            candidates: selected,
            stats,
        })
    }
}

fn run_in_pool<T: Send>(pool: Option<&ThreadPool>, work: impl FnOnce() -> T + Send) -> T {
    match pool {
        Some(pool) => pool.install(work),
        None => work(),
    }
}

/// Seed derived from the job inputs so repeated runs over the same terrain agree.
fn job_seed(mask: &NavMask, roi: &RoiPolygon) -> u64 {
    let mut hasher = DefaultHasher::new();
    mask.width().hash(&mut hasher);
    mask.height().hash(&mut hasher);
    mask.navigable_count().hash(&mut hasher);
    for vertex in &roi.vertices {
        vertex.x.to_bits().hash(&mut hasher);
        vertex.y.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
