use crate::config::ScoringStrategy;
use crate::geometry::PointLike;

use super::divergence::route_similarity;
use super::types::GraphRoute;

const COMPOUND_QUALITY_WEIGHT: f64 = 20.0;
const SIMPLE_WEIGHT: f64 = 10.0;

/// Ranking key for a candidate; larger is harder. Not comparable across strategies.
pub fn score_candidate(strategy: ScoringStrategy, main: &GraphRoute, alternates: &[GraphRoute]) -> f64 {
    match strategy {
        ScoringStrategy::Compound => compound_score(main, alternates),
        ScoringStrategy::Simple => simple_score(main, alternates),
    }
}

/// Inefficiency of the main route plus, per alternate, its closeness in length
/// weighted by how different it looks.
pub fn compound_score(main: &GraphRoute, alternates: &[GraphRoute]) -> f64 {
    let (Some(start), Some(end)) = (main.coords.first(), main.coords.last()) else {
        return 0.0;
    };
    let straight = start.distance(end);
    let inefficiency = if straight > 0.0 {
        main.length / straight - 1.0
    } else {
        0.0
    };
    if main.length <= 0.0 {
        return inefficiency;
    }
    let quality: f64 = alternates
        .iter()
        .map(|alt| {
            let closeness = (1.0 - (alt.length - main.length) / main.length).max(0.0);
            closeness * (1.0 - route_similarity(alt, main)) * COMPOUND_QUALITY_WEIGHT
        })
        .sum();
    inefficiency + quality
}

pub fn simple_score(main: &GraphRoute, alternates: &[GraphRoute]) -> f64 {
    alternates
        .first()
        .map(|alt| (1.0 - route_similarity(alt, main)) * SIMPLE_WEIGHT)
        .unwrap_or(0.0)
}
