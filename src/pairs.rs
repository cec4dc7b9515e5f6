use rand::seq::index;
use rand::Rng;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::debug;

use crate::geometry::PointLike;
use crate::routing::CandidatePair;
use crate::sampling::Waypoint;

/// Every pair of waypoints whose snapped distance lies in `[min_distance, max_distance]`,
/// subsampled uniformly without replacement down to `max_pairs`.
pub fn generate_pairs<R: Rng + ?Sized>(
    waypoints: &[Waypoint],
    min_distance: f64,
    max_distance: f64,
    max_pairs: usize,
    rng: &mut R,
) -> Vec<CandidatePair> {
    let tree = RTree::bulk_load(
        waypoints
            .iter()
            .enumerate()
            .map(|(i, w)| GeomWithData::new(w.coord.as_array(), i))
            .collect(),
    );

    let mut pairs = Vec::new();
    let mut neighbours: Vec<usize> = Vec::new();
    for (i, waypoint) in waypoints.iter().enumerate() {
        neighbours.clear();
        neighbours.extend(
            tree.locate_within_distance(waypoint.coord.as_array(), max_distance * max_distance)
                .map(|entry| entry.data)
                .filter(|&j| j > i),
        );
        neighbours.sort_unstable();
        for &j in &neighbours {
            let other = &waypoints[j];
            let distance = waypoint.coord.distance(&other.coord);
            if distance >= min_distance && distance <= max_distance && waypoint.node != other.node {
                pairs.push(CandidatePair::new(waypoint.node, other.node));
            }
        }
    }

    if pairs.len() > max_pairs {
        debug!(found = pairs.len(), kept = max_pairs, "subsampling candidate pairs");
        let mut keep = index::sample(rng, pairs.len(), max_pairs).into_vec();
        keep.sort_unstable();
        pairs = keep.into_iter().map(|i| pairs[i]).collect();
    }
    pairs
}
