use hashbrown::HashMap;
use petgraph::graph::EdgeIndex;
use rstar::RTree;
use tracing::trace;

use crate::config::{tier_at, RouteChoiceConfig};
use crate::error::Rejection;
use crate::graph::TerrainGraph;

use super::astar::route_graph_astar;
use super::scoring::score_candidate;
use super::types::{CandidatePair, GraphRoute, ScoredCandidate};

/// Knobs of the alternate search, borrowed from the job configuration.
#[derive(Clone, Copy, Debug)]
pub struct DivergenceParams<'a> {
    pub num_alternates: usize,
    pub overlap_tiers: &'a [f64],
    pub min_separation: f64,
    pub max_length_ratio: f64,
    pub penalty_factor: f64,
}

impl<'a> From<&'a RouteChoiceConfig> for DivergenceParams<'a> {
    fn from(config: &'a RouteChoiceConfig) -> Self {
        DivergenceParams {
            num_alternates: config.num_alternate_routes,
            overlap_tiers: &config.overlap_tiers,
            min_separation: config.min_separation,
            max_length_ratio: config.max_length_ratio,
            penalty_factor: config.penalty_factor,
        }
    }
}

/// Node-set Jaccard similarity.
pub fn route_similarity(a: &GraphRoute, b: &GraphRoute) -> f64 {
    let set_a = a.node_set();
    let set_b = b.node_set();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    set_a.intersection(&set_b).count() as f64 / union as f64
}

/// Largest distance from any coordinate of `route` to its nearest coordinate on `reference`.
pub fn max_separation(route: &GraphRoute, reference: &GraphRoute) -> f64 {
    let tree = RTree::bulk_load(reference.coords.clone());
    route
        .coords
        .iter()
        .filter_map(|c| tree.nearest_neighbor(c).map(|n| (c.distance_2(n) as f64).sqrt()))
        .fold(0.0, f64::max)
}

/// Main route plus exactly `num_alternates` diverse alternates for one pair.
///
/// Penalties live in a pair-local override map; the shared graph is never touched.
pub fn evaluate_pair(
    graph: &TerrainGraph,
    pair: CandidatePair,
    params: &DivergenceParams,
    scorer: impl Fn(&GraphRoute, &[GraphRoute]) -> f64,
) -> Result<ScoredCandidate, Rejection> {
    let main_nodes =
        route_graph_astar(graph, pair.start, pair.end, |_, w| w).ok_or(Rejection::NoPath)?;
    let main = GraphRoute::from_nodes(graph, main_nodes);

    let mut overrides: HashMap<EdgeIndex, f64> = HashMap::new();
    let mut pool: Vec<GraphRoute> = vec![main.clone()];
    let mut alternates: Vec<GraphRoute> = Vec::with_capacity(params.num_alternates);

    for attempt in 0..params.num_alternates {
        let tier = tier_at(params.overlap_tiers, attempt);

        if let Some(last) = pool.last() {
            for edge in graph.path_edges(&last.nodes) {
                let current = overrides.get(&edge).copied().unwrap_or(graph.graph()[edge]);
                overrides.insert(edge, current * params.penalty_factor);
            }
        }

        let Some(nodes) = route_graph_astar(graph, pair.start, pair.end, |edge, weight| {
            overrides.get(&edge).copied().unwrap_or(weight)
        }) else {
            break;
        };
        let candidate = GraphRoute::from_nodes(graph, nodes);

        if pool.iter().any(|p| route_similarity(&candidate, p) > tier) {
            trace!(?pair, attempt, "alternate too similar");
            continue;
        }
        if candidate.length > params.max_length_ratio * main.length {
            trace!(?pair, attempt, length = candidate.length, "alternate too long");
            continue;
        }
        if pool
            .iter()
            .any(|p| max_separation(&candidate, p) < params.min_separation)
        {
            trace!(?pair, attempt, "alternate not separated");
            continue;
        }

        alternates.push(candidate.clone());
        pool.push(candidate);
    }

    if alternates.len() != params.num_alternates {
        return Err(Rejection::InsufficientAlts {
            accepted: alternates.len(),
            requested: params.num_alternates,
        });
    }

    let score = scorer(&main, &alternates);
    let main_length = main.length;
    Ok(ScoredCandidate {
        pair,
        main,
        alternates,
        score,
        main_length,
    })
}

/// `evaluate_pair` scored with the configured strategy.
pub fn evaluate_pair_with_config(
    graph: &TerrainGraph,
    pair: CandidatePair,
    config: &RouteChoiceConfig,
) -> Result<ScoredCandidate, Rejection> {
    evaluate_pair(graph, pair, &DivergenceParams::from(config), |main, alternates| {
        score_candidate(config.scoring, main, alternates)
    })
}
