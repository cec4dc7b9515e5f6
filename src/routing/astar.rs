use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::geometry::PointLike;
use crate::graph::{other_end, TerrainGraph};

use super::types::FloatOrd;

/// A* over the terrain graph with a Euclidean heuristic.
///
/// `cost_fn` maps an edge and its true weight to the traversal cost. Costs must never
/// fall below the true weight, or the heuristic stops being admissible.
pub(crate) fn route_graph_astar<CostFn>(
    graph: &TerrainGraph,
    start: NodeIndex,
    goal: NodeIndex,
    mut cost_fn: CostFn,
) -> Option<Vec<NodeIndex>>
where
    CostFn: FnMut(EdgeIndex, f64) -> f64,
{
    let node_count = graph.node_count();
    if start.index() >= node_count || goal.index() >= node_count {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let goal_coord = graph.coord(goal);
    let heuristic = |node: NodeIndex| graph.coord(node).distance(&goal_coord);

    let mut open_set: BinaryHeap<(Reverse<FloatOrd>, u64, NodeIndex)> = BinaryHeap::new();
    let mut came_from: Vec<Option<NodeIndex>> = vec![None; node_count];
    let mut g_score: Vec<f64> = vec![f64::INFINITY; node_count];
    let mut closed: Vec<bool> = vec![false; node_count];
    let mut insert_counter: u64 = 0;

    g_score[start.index()] = 0.0;
    open_set.push((Reverse(FloatOrd(heuristic(start))), insert_counter, start));
    insert_counter += 1;

    while let Some((_, _, current)) = open_set.pop() {
        if current == goal {
            let mut path = vec![current];
            let mut cursor = current;
            while let Some(prev) = came_from[cursor.index()] {
                cursor = prev;
                path.push(cursor);
            }
            path.reverse();
            return Some(path);
        }
        if closed[current.index()] {
            continue;
        }
        closed[current.index()] = true;

        let current_g = g_score[current.index()];
        for edge in graph.graph().edges(current) {
            let neighbour = other_end(edge.source(), edge.target(), current);
            if closed[neighbour.index()] {
                continue;
            }
            let step_cost = cost_fn(edge.id(), *edge.weight());
            if !step_cost.is_finite() {
                continue;
            }
            let tentative_g = current_g + step_cost;
            if tentative_g >= g_score[neighbour.index()] {
                continue;
            }
            came_from[neighbour.index()] = Some(current);
            g_score[neighbour.index()] = tentative_g;
            let f_score = tentative_g + heuristic(neighbour);
            open_set.push((Reverse(FloatOrd(f_score)), insert_counter, neighbour));
            insert_counter += 1;
        }
    }

    None
}
