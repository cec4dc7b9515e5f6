use std::cmp::Ordering;

use hashbrown::HashSet;
use petgraph::graph::NodeIndex;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::geometry::{GridCoord, PointLike};
use crate::graph::TerrainGraph;

/// Total ordering over `f64` for priority queues and sorting.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FloatOrd(pub f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Unordered pair of distinct graph nodes, stored with `start < end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidatePair {
    pub start: NodeIndex,
    pub end: NodeIndex,
}

impl CandidatePair {
    pub fn new(a: NodeIndex, b: NodeIndex) -> Self {
        if a <= b {
            CandidatePair { start: a, end: b }
        } else {
            CandidatePair { start: b, end: a }
        }
    }
}

/// Node sequence through the terrain graph with its unpenalized length.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphRoute {
    pub nodes: Vec<NodeIndex>,
    pub coords: Vec<GridCoord>,
    pub length: f64,
}

impl GraphRoute {
    pub fn from_nodes(graph: &TerrainGraph, nodes: Vec<NodeIndex>) -> Self {
        let coords = nodes.iter().map(|&n| graph.coord(n)).collect();
        let length = graph.path_length(&nodes);
        GraphRoute {
            nodes,
            coords,
            length,
        }
    }

    pub fn node_set(&self) -> HashSet<NodeIndex> {
        self.nodes.iter().copied().collect()
    }
}

/// Pixel level polyline.
#[derive(Clone, Debug, PartialEq, Default, Serialize)]
pub struct PixelPath {
    pub points: Vec<GridCoord>,
}

impl PixelPath {
    pub fn new(points: Vec<GridCoord>) -> Self {
        PixelPath { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn pixel_set(&self) -> HashSet<GridCoord> {
        self.points.iter().copied().collect()
    }

    pub fn polyline_length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }
}

/// Graph level candidate: a main route and exactly K alternates, ranked by `score`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredCandidate {
    pub pair: CandidatePair,
    pub main: GraphRoute,
    pub alternates: Vec<GraphRoute>,
    pub score: f64,
    pub main_length: f64,
}

impl ScoredCandidate {
    pub fn start(&self) -> GridCoord {
        self.main.coords[0]
    }

    pub fn end(&self) -> GridCoord {
        self.main.coords[self.main.coords.len() - 1]
    }
}

/// A route at both resolutions.
#[derive(Clone, Debug, PartialEq)]
pub struct RefinedRoute {
    pub graph: GraphRoute,
    pub pixels: PixelPath,
}

/// Pixel-validated candidate ready for presentation.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub pair: CandidatePair,
    pub main: RefinedRoute,
    pub alternates: Vec<RefinedRoute>,
    pub score: f64,
    pub main_length: f64,
    /// Pixel overlap between the main route and the first alternate.
    pub pixel_overlap: f64,
    /// Index of the selection pass that accepted this candidate.
    pub selection_pass: Option<usize>,
}

impl Candidate {
    pub fn start(&self) -> GridCoord {
        self.main.graph.coords[0]
    }

    pub fn end(&self) -> GridCoord {
        self.main.graph.coords[self.main.graph.coords.len() - 1]
    }

    /// All routes in random order, so the main route is not always drawn first.
    pub fn presentation<R: Rng + ?Sized>(&self, rng: &mut R) -> Presentation {
        let mut routes: Vec<PresentedRoute> = std::iter::once((RouteKind::Main, &self.main))
            .chain(
                self.alternates
                    .iter()
                    .enumerate()
                    .map(|(i, route)| (RouteKind::Alternate(i), route)),
            )
            .map(|(kind, route)| PresentedRoute {
                kind,
                points: route.pixels.points.clone(),
                length: (route.pixels.polyline_length() * 10.0).round() / 10.0,
            })
            .collect();
        routes.shuffle(rng);
        let main_route_index = routes
            .iter()
            .position(|r| r.kind == RouteKind::Main)
            .unwrap_or(0);
        Presentation {
            routes,
            main_route_index,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Main,
    Alternate(usize),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PresentedRoute {
    pub kind: RouteKind,
    pub points: Vec<GridCoord>,
    pub length: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Presentation {
    pub routes: Vec<PresentedRoute>,
    pub main_route_index: usize,
}
