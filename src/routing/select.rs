use std::cmp::Ordering;

use tracing::debug;

use crate::config::{ProximityRule, RouteChoiceConfig};
use crate::geometry::{GridCoord, PointLike};

use super::types::{Candidate, CandidatePair, ScoredCandidate};

#[derive(Clone, Copy, Debug)]
pub struct SelectionParams<'a> {
    pub passes: &'a [f64],
    pub target: usize,
    pub rule: ProximityRule,
}

impl<'a> From<&'a RouteChoiceConfig> for SelectionParams<'a> {
    fn from(config: &'a RouteChoiceConfig) -> Self {
        SelectionParams {
            passes: &config.selection_passes,
            target: config.num_output_routes,
            rule: config.proximity_rule,
        }
    }
}

/// Per-batch bookkeeping of the batched selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchRecord {
    pub batch: usize,
    pub submitted: usize,
    pub refined_pool: usize,
    pub selected: usize,
}

/// Descending score, then ascending pair identity.
pub fn hardness_order(a_score: f64, a_pair: CandidatePair, b_score: f64, b_pair: CandidatePair) -> Ordering {
    b_score.total_cmp(&a_score).then_with(|| a_pair.cmp(&b_pair))
}

pub fn sort_by_hardness(scored: &mut [ScoredCandidate]) {
    scored.sort_by(|a, b| hardness_order(a.score, a.pair, b.score, b.pair));
}

/// Whether two pairs are too close under `rule`, comparing start with start and end with end.
pub fn too_close(
    a: (GridCoord, GridCoord),
    b: (GridCoord, GridCoord),
    threshold: f64,
    rule: ProximityRule,
) -> bool {
    let starts_close = a.0.distance(&b.0) < threshold;
    let ends_close = a.1.distance(&b.1) < threshold;
    match rule {
        ProximityRule::BothEndpoints => starts_close && ends_close,
        ProximityRule::EitherEndpoint => starts_close || ends_close,
    }
}

/// Greedy multi-pass selection over a pool already in hardness order.
/// Returns `(pool index, pass index)` in acceptance order.
pub fn select_diverse(pool: &[Candidate], params: &SelectionParams) -> Vec<(usize, usize)> {
    let mut selected: Vec<(usize, usize)> = Vec::new();
    let mut taken = vec![false; pool.len()];

    'passes: for (pass, &threshold) in params.passes.iter().enumerate() {
        if selected.len() >= params.target {
            break;
        }
        for (index, candidate) in pool.iter().enumerate() {
            if taken[index] {
                continue;
            }
            let endpoints = (candidate.start(), candidate.end());
            let crowded = selected.iter().any(|&(other, _)| {
                let other = &pool[other];
                too_close(endpoints, (other.start(), other.end()), threshold, params.rule)
            });
            if crowded {
                continue;
            }
            taken[index] = true;
            selected.push((index, pass));
            if selected.len() >= params.target {
                break 'passes;
            }
        }
    }
    selected
}

/// Refine candidates batch by batch, re-running the selection over everything refined so far
/// after each batch, and stop as soon as the target is met or the scored list runs out.
pub fn select_in_batches<E, RefineFn, ObserveFn>(
    scored: &[ScoredCandidate],
    batch_size: usize,
    params: &SelectionParams,
    mut refine_batch: RefineFn,
    mut on_batch: ObserveFn,
) -> Result<Vec<Candidate>, E>
where
    RefineFn: FnMut(usize, &[ScoredCandidate]) -> Result<Vec<Candidate>, E>,
    ObserveFn: FnMut(&BatchRecord),
{
    let mut refined: Vec<Candidate> = Vec::new();
    let mut selection: Vec<(usize, usize)> = Vec::new();

    for (batch, chunk) in scored.chunks(batch_size.max(1)).enumerate() {
        if selection.len() >= params.target {
            break;
        }
        refined.extend(refine_batch(batch, chunk)?);
        refined.sort_by(|a, b| hardness_order(a.score, a.pair, b.score, b.pair));
        selection = select_diverse(&refined, params);

        let record = BatchRecord {
            batch,
            submitted: chunk.len(),
            refined_pool: refined.len(),
            selected: selection.len(),
        };
        debug!(
            batch,
            submitted = record.submitted,
            refined_pool = record.refined_pool,
            selected = record.selected,
            "selection after batch"
        );
        on_batch(&record);
    }

    Ok(selection
        .into_iter()
        .map(|(index, pass)| {
            let mut candidate = refined[index].clone();
            candidate.selection_pass = Some(pass);
            candidate
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::types::{GraphRoute, PixelPath, RefinedRoute};
    use petgraph::graph::NodeIndex;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn candidate(id: usize, start: (i32, i32), end: (i32, i32), score: f64) -> Candidate {
        let route = RefinedRoute {
            graph: GraphRoute {
                nodes: vec![NodeIndex::new(2 * id), NodeIndex::new(2 * id + 1)],
                coords: vec![GridCoord::new(start.0, start.1), GridCoord::new(end.0, end.1)],
                length: 1.0,
            },
            pixels: PixelPath::default(),
        };
        Candidate {
            pair: CandidatePair::new(NodeIndex::new(2 * id), NodeIndex::new(2 * id + 1)),
            main: route.clone(),
            alternates: vec![route],
            score,
            main_length: 1.0,
            pixel_overlap: 0.0,
            selection_pass: None,
        }
    }

    fn params(passes: &[f64], target: usize, rule: ProximityRule) -> SelectionParams<'_> {
        SelectionParams {
            passes,
            target,
            rule,
        }
    }

    #[test]
    fn proximity_rules_differ_on_one_shared_endpoint() {
        let a = (GridCoord::new(0, 0), GridCoord::new(0, 100));
        let b = (GridCoord::new(0, 5), GridCoord::new(80, 100));
        assert!(!too_close(a, b, 10.0, ProximityRule::BothEndpoints));
        assert!(too_close(a, b, 10.0, ProximityRule::EitherEndpoint));
        // Strictly closer than the threshold.
        let c = (GridCoord::new(0, 10), GridCoord::new(0, 110));
        assert!(!too_close(a, c, 10.0, ProximityRule::BothEndpoints));
    }

    #[test]
    fn later_passes_relax_the_threshold() {
        let pool = vec![
            candidate(0, (0, 0), (0, 100), 3.0),
            candidate(1, (0, 30), (0, 130), 2.0),
            candidate(2, (0, 300), (0, 400), 1.0),
        ];
        let selected = select_diverse(&pool, &params(&[50.0, 20.0], 10, ProximityRule::BothEndpoints));
        assert_eq!(selected, vec![(0, 0), (2, 0), (1, 1)]);
    }

    #[test]
    fn stops_at_target() {
        let pool: Vec<Candidate> = (0..10)
            .map(|i| candidate(i, (0, 1000 * i as i32), (10, 1000 * i as i32), 10.0 - i as f64))
            .collect();
        let selected = select_diverse(&pool, &params(&[300.0], 4, ProximityRule::BothEndpoints));
        assert_eq!(selected.iter().map(|s| s.0).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn selected_pairs_respect_their_pass_threshold() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut pool: Vec<Candidate> = (0..200)
            .map(|i| {
                let start = (rng.gen_range(0..500), rng.gen_range(0..500));
                let end = (rng.gen_range(0..500), rng.gen_range(0..500));
                candidate(i, start, end, rng.gen_range(0.0..10.0))
            })
            .collect();
        pool.sort_by(|a, b| hardness_order(a.score, a.pair, b.score, b.pair));
        let passes = [300.0, 250.0, 200.0, 150.0, 120.0, 100.0, 80.0, 60.0, 40.0, 20.0];
        for rule in [ProximityRule::BothEndpoints, ProximityRule::EitherEndpoint] {
            let selected = select_diverse(&pool, &params(&passes, 50, rule));
            for (position, &(later, pass)) in selected.iter().enumerate() {
                let l = &pool[later];
                for &(earlier, _) in &selected[..position] {
                    let e = &pool[earlier];
                    assert!(!too_close((l.start(), l.end()), (e.start(), e.end()), passes[pass], rule));
                }
            }
        }
    }

    #[test]
    fn batches_stop_once_target_is_met() {
        let scored: Vec<ScoredCandidate> = (0..40)
            .map(|i| {
                let c = candidate(i, (0, 1000 * i as i32), (10, 1000 * i as i32), 100.0 - i as f64);
                ScoredCandidate {
                    pair: c.pair,
                    main: c.main.graph.clone(),
                    alternates: vec![c.main.graph.clone()],
                    score: c.score,
                    main_length: 1.0,
                }
            })
            .collect();
        let mut calls = 0;
        let mut records = Vec::new();
        let selected: Result<Vec<Candidate>, ()> = select_in_batches(
            &scored,
            4,
            &params(&[300.0], 5, ProximityRule::BothEndpoints),
            |_, batch| {
                calls += 1;
                Ok(batch
                    .iter()
                    .map(|s| {
                        let mut c = candidate(s.pair.start.index() / 2, (0, 0), (0, 0), s.score);
                        c.main.graph = s.main.clone();
                        c
                    })
                    .collect())
            },
            |record| records.push(*record),
        );
        let selected = selected.unwrap();
        assert_eq!(selected.len(), 5);
        assert_eq!(calls, 2);
        assert_eq!(records.last().map(|r| r.refined_pool), Some(8));
        assert!(selected.iter().all(|c| c.selection_pass == Some(0)));
        let scores: Vec<f64> = selected.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![100.0, 99.0, 98.0, 97.0, 96.0]);
    }

    #[test]
    fn refinement_errors_abort_selection() {
        let c = candidate(0, (0, 0), (0, 50), 1.0);
        let scored = vec![ScoredCandidate {
            pair: c.pair,
            main: c.main.graph.clone(),
            alternates: vec![c.main.graph],
            score: 1.0,
            main_length: 1.0,
        }];
        let result: Result<Vec<Candidate>, &str> = select_in_batches(
            &scored,
            4,
            &params(&[300.0], 5, ProximityRule::BothEndpoints),
            |_, _| Err("cancelled"),
            |_| {},
        );
        assert_eq!(result, Err("cancelled"));
    }
}
