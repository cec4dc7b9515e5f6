use std::collections::VecDeque;

use petgraph::graph::NodeIndex;
use rand::Rng;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Serialize;

use crate::geometry::{GridCoord, ImagePoint, LocalPoint, PointLike, RoiPolygon};
use crate::graph::TerrainGraph;
use crate::raster::RoiWindow;

const ATTEMPTS_PER_POINT: usize = 100;

/// A sampled point and the graph node it snapped to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Waypoint {
    pub raw: LocalPoint,
    #[serde(skip)]
    pub node: NodeIndex,
    pub coord: GridCoord,
}

/// Uniform rejection sampling of image points inside the ROI, limited to `window`.
/// Returns fewer than `count` points when the attempt budget runs out.
pub fn sample_points<R: Rng + ?Sized>(
    roi: &RoiPolygon,
    window: &RoiWindow,
    count: usize,
    rng: &mut R,
) -> Vec<ImagePoint> {
    let mut points = Vec::with_capacity(count);
    if window.width() == 0 || window.height() == 0 {
        return points;
    }
    let (min_x, max_x) = (window.left as f64, window.right as f64);
    let (min_y, max_y) = (window.top as f64, window.bottom as f64);

    let mut attempts = 0;
    while points.len() < count && attempts < count * ATTEMPTS_PER_POINT {
        attempts += 1;
        let x = rng.gen_range(min_x..max_x);
        let y = rng.gen_range(min_y..max_y);
        if roi.is_empty() || roi.contains(x, y) {
            points.push(ImagePoint::new(x, y));
        }
    }
    points
}

pub fn snap_points(graph: &TerrainGraph, points: &[LocalPoint]) -> Vec<Waypoint> {
    points
        .iter()
        .filter_map(|&raw| {
            let node = graph.snap(&raw)?;
            Some(Waypoint {
                raw,
                node,
                coord: graph.coord(node),
            })
        })
        .collect()
}

/// Density clustering of snapped points with a fixed radius and a minimum cluster
/// size of one. Each cluster is represented by its first member in input order.
pub fn deduplicate(waypoints: &[Waypoint], radius: f64) -> Vec<Waypoint> {
    let tree = RTree::bulk_load(
        waypoints
            .iter()
            .enumerate()
            .map(|(i, w)| GeomWithData::new(w.coord.as_array(), i))
            .collect(),
    );
    let radius_2 = radius * radius;
    let mut clustered = vec![false; waypoints.len()];
    let mut representatives = Vec::new();
    let mut queue = VecDeque::new();

    for (seed, waypoint) in waypoints.iter().enumerate() {
        if clustered[seed] {
            continue;
        }
        clustered[seed] = true;
        representatives.push(*waypoint);
        queue.push_back(seed);
        while let Some(member) = queue.pop_front() {
            let centre = waypoints[member].coord.as_array();
            for neighbour in tree.locate_within_distance(centre, radius_2) {
                if !clustered[neighbour.data] {
                    clustered[neighbour.data] = true;
                    queue.push_back(neighbour.data);
                }
            }
        }
    }
    representatives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::NavMask;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn waypoint(row: i32, col: i32) -> Waypoint {
        Waypoint {
            raw: LocalPoint {
                row: row as f64,
                col: col as f64,
            },
            node: NodeIndex::new(0),
            coord: GridCoord::new(row, col),
        }
    }

    #[test]
    fn samples_stay_inside_polygon() {
        let roi = RoiPolygon::new(vec![
            ImagePoint::new(10.0, 10.0),
            ImagePoint::new(40.0, 10.0),
            ImagePoint::new(10.0, 40.0),
        ]);
        let window = RoiWindow::from_roi(&roi, 100, 100);
        let mut rng = StdRng::seed_from_u64(7);
        let points = sample_points(&roi, &window, 50, &mut rng);
        assert_eq!(points.len(), 50);
        assert!(points.iter().all(|p| roi.contains(p.x, p.y)));
    }

    #[test]
    fn sampling_gives_up_after_attempt_budget() {
        // A degenerate polygon contains nothing.
        let roi = RoiPolygon::new(vec![
            ImagePoint::new(10.0, 10.0),
            ImagePoint::new(20.0, 20.0),
            ImagePoint::new(30.0, 30.0),
        ]);
        let window = RoiWindow::from_roi(&roi, 100, 100);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(sample_points(&roi, &window, 10, &mut rng).is_empty());
    }

    #[test]
    fn snapped_points_land_on_nodes() {
        let mut mask = NavMask::empty(30, 10);
        for col in 2..28 {
            mask.set(GridCoord::new(5, col), true);
        }
        for row in 0..5 {
            mask.set(GridCoord::new(row, 15), true);
        }
        let graph = TerrainGraph::build(&mask).unwrap();
        let points = [
            LocalPoint { row: 8.0, col: 3.0 },
            LocalPoint { row: 1.0, col: 14.0 },
        ];
        for waypoint in snap_points(&graph, &points) {
            assert_eq!(graph.node_at(waypoint.coord), Some(waypoint.node));
        }
    }

    #[test]
    fn dedup_chains_through_neighbours_and_keeps_first() {
        let points = vec![
            waypoint(0, 0),
            waypoint(0, 4),
            waypoint(0, 8),
            waypoint(50, 50),
            waypoint(0, 2),
            waypoint(50, 53),
        ];
        let kept = deduplicate(&points, 5.0);
        assert_eq!(kept, vec![waypoint(0, 0), waypoint(50, 50)]);
    }

    #[test]
    fn dedup_keeps_distant_points() {
        let points = vec![waypoint(0, 0), waypoint(0, 6), waypoint(6, 0)];
        assert_eq!(deduplicate(&points, 5.0).len(), 3);
    }
}
