use indexmap::IndexMap;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::debug;

use crate::error::RouteChoiceError;
use crate::geometry::{GridCoord, PointLike};
use crate::raster::NavMask;

type IndexedNode = GeomWithData<[f64; 2], usize>;

const NEIGHBOUR_OFFSETS: [(i32, i32); 4] = [(0, 1), (1, -1), (1, 0), (1, 1)];

fn step_weight(a: GridCoord, b: GridCoord) -> f64 {
    if a.is_diagonal_step(&b) {
        std::f64::consts::SQRT_2
    } else {
        1.0
    }
}

pub(crate) fn other_end(source: NodeIndex, target: NodeIndex, from: NodeIndex) -> NodeIndex {
    if source == from {
        target
    } else {
        source
    }
}

/// Full resolution 8-connected graph over skeleton pixels, nodes in row-major order.
#[derive(Clone, Debug, Default)]
pub struct SkeletonGraph {
    pub graph: UnGraph<GridCoord, f64>,
    pub nodes: IndexMap<GridCoord, NodeIndex>,
}

impl SkeletonGraph {
    pub fn from_skeleton(skeleton: &NavMask) -> Self {
        let mut graph = UnGraph::default();
        let mut nodes = IndexMap::new();
        for coord in skeleton.navigable_coords() {
            nodes.insert(coord, graph.add_node(coord));
        }
        // Half of the neighbourhood is enough since edges are undirected.
        for (&coord, &node) in &nodes {
            for (dr, dc) in NEIGHBOUR_OFFSETS {
                let other = GridCoord::new(coord.row + dr, coord.col + dc);
                if let Some(&other_node) = nodes.get(&other) {
                    graph.add_edge(node, other_node, step_weight(coord, other));
                }
            }
        }
        SkeletonGraph { graph, nodes }
    }

    pub fn node_at(&self, coord: GridCoord) -> Option<NodeIndex> {
        self.nodes.get(&coord).copied()
    }

    fn is_junction(&self, node: NodeIndex) -> bool {
        self.graph.neighbors(node).count() != 2
    }
}

/// Contracted routing graph: one node per skeleton junction, one edge per chain between them.
#[derive(Clone, Debug)]
pub struct TerrainGraph {
    graph: UnGraph<GridCoord, f64>,
    nodes: IndexMap<GridCoord, NodeIndex>,
    spatial_index: RTree<IndexedNode>,
}

impl TerrainGraph {
    /// Skeletonize the mask, then contract its pixel graph.
    pub fn build(mask: &NavMask) -> Result<Self, RouteChoiceError> {
        if mask.navigable_count() == 0 {
            return Err(RouteChoiceError::NoNavigableTerrain);
        }
        let skeleton = mask.skeletonize();
        let full = SkeletonGraph::from_skeleton(&skeleton);
        debug!(
            skeleton_pixels = full.graph.node_count(),
            skeleton_edges = full.graph.edge_count(),
            "built skeleton graph"
        );
        TerrainGraph::contract(&full)
    }

    pub fn contract(full: &SkeletonGraph) -> Result<Self, RouteChoiceError> {
        let mut graph: UnGraph<GridCoord, f64> = UnGraph::default();
        let mut nodes = IndexMap::new();
        for (&coord, &node) in &full.nodes {
            if full.is_junction(node) {
                nodes.insert(coord, graph.add_node(coord));
            }
        }
        if nodes.is_empty() {
            return Err(RouteChoiceError::NoNavigableTerrain);
        }

        let mut visited = vec![false; full.graph.edge_count()];
        let step_guard = full.graph.node_count() + 1;
        let mut dropped_loops = 0usize;

        for (&start_coord, &start) in &nodes {
            let Some(full_start) = full.node_at(start_coord) else {
                continue;
            };
            let first_steps: Vec<(EdgeIndex, NodeIndex, f64)> = full
                .graph
                .edges(full_start)
                .map(|e| (e.id(), other_end(e.source(), e.target(), full_start), *e.weight()))
                .collect();

            for (first_edge, first_node, first_weight) in first_steps {
                if visited[first_edge.index()] {
                    continue;
                }
                visited[first_edge.index()] = true;

                let mut current = first_node;
                let mut weight = first_weight;
                let mut steps = 0usize;
                let mut end = None;

                while steps < step_guard {
                    if full.is_junction(current) {
                        end = Some(current);
                        break;
                    }
                    let next = full
                        .graph
                        .edges(current)
                        .find(|e| !visited[e.id().index()])
                        .map(|e| (e.id(), other_end(e.source(), e.target(), current), *e.weight()));
                    let Some((edge, node, step)) = next else {
                        break;
                    };
                    visited[edge.index()] = true;
                    weight += step;
                    current = node;
                    steps += 1;
                }

                let Some(end) = end else {
                    continue;
                };
                if end == full_start {
                    dropped_loops += 1;
                    continue;
                }
                let Some(&to) = nodes.get(&full.graph[end]) else {
                    continue;
                };
                match graph.find_edge(start, to) {
                    Some(existing) => {
                        if weight < graph[existing] {
                            graph[existing] = weight;
                        }
                    }
                    None => {
                        graph.add_edge(start, to, weight);
                    }
                }
            }
        }

        debug!(
            junctions = graph.node_count(),
            chains = graph.edge_count(),
            dropped_loops,
            "contracted skeleton graph"
        );

        let spatial_index = RTree::bulk_load(
            nodes
                .iter()
                .map(|(coord, node)| GeomWithData::new(coord.as_array(), node.index()))
                .collect(),
        );

        Ok(TerrainGraph {
            graph,
            nodes,
            spatial_index,
        })
    }

    pub fn graph(&self) -> &UnGraph<GridCoord, f64> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn coord(&self, node: NodeIndex) -> GridCoord {
        self.graph[node]
    }

    pub fn node_at(&self, coord: GridCoord) -> Option<NodeIndex> {
        self.nodes.get(&coord).copied()
    }

    pub fn coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        self.nodes.keys().copied()
    }

    /// Nearest node to `point`; equidistant nodes resolve to the lowest node index.
    pub fn snap<P: PointLike>(&self, point: &P) -> Option<NodeIndex> {
        let mut candidates = self
            .spatial_index
            .nearest_neighbor_iter_with_distance_2(&point.as_array());
        let (first, best) = candidates.next()?;
        let tied = candidates
            .take_while(|(_, d)| *d <= best)
            .map(|(entry, _)| entry.data)
            .min()
            .map_or(first.data, |other| other.min(first.data));
        Some(NodeIndex::new(tied))
    }

    pub fn edge_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    /// True length of a node sequence over the unmodified edge weights.
    pub fn path_length(&self, path: &[NodeIndex]) -> f64 {
        path.windows(2)
            .filter_map(|w| self.edge_between(w[0], w[1]))
            .map(|e| self.graph[e])
            .sum()
    }

    /// Edges traversed by a node sequence, in order.
    pub fn path_edges(&self, path: &[NodeIndex]) -> Vec<EdgeIndex> {
        path.windows(2)
            .filter_map(|w| self.edge_between(w[0], w[1]))
            .collect()
    }
}
