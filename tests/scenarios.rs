use rand::rngs::StdRng;
use rand::SeedableRng;
use routechoice_core::routing::{route_similarity, RouteKind};
use routechoice_core::{
    GridCoord, NavMask, PointLike, RoiPolygon, RouteChoiceConfig, RouteChoiceGenerator,
    RouteChoiceSet,
};

/// A rectangular loop with short stubs sticking out of every side. The stubs give the
/// graph junctions; between two junctions the two sides of the loop are the only routes.
fn loop_with_stubs() -> NavMask {
    let mut mask = NavMask::empty(80, 60);
    let mut mark = |row: i32, col: i32| mask.set(GridCoord::new(row, col), true);
    for col in 10..=70 {
        mark(10, col);
        mark(50, col);
    }
    for row in 10..=50 {
        mark(row, 10);
        mark(row, 70);
    }
    for col in [20, 35, 50, 62] {
        mark(8, col);
        mark(9, col);
    }
    for col in [18, 30, 45, 60] {
        mark(51, col);
        mark(52, col);
    }
    for row in [22, 38] {
        mark(row, 8);
        mark(row, 9);
    }
    for row in [18, 33, 44] {
        mark(row, 71);
        mark(row, 72);
    }
    mask
}

fn loop_config(seed: u64) -> RouteChoiceConfig {
    RouteChoiceConfig {
        num_alternate_routes: 1,
        overlap_tiers: vec![0.3],
        min_separation: 3.0,
        num_random_points: 40,
        candidate_min_dist: 30.0,
        candidate_max_dist: 200.0,
        num_output_routes: 4,
        batch_size: 5,
        corridor_base_width: 4.0,
        corridor_scale_factor: 0.5,
        seed: Some(seed),
        ..RouteChoiceConfig::default()
    }
}

fn run(config: RouteChoiceConfig) -> RouteChoiceSet {
    let roi = RoiPolygon::rectangle(0.0, 0.0, 80.0, 60.0);
    RouteChoiceGenerator::new(config).run(&loop_with_stubs(), &roi).unwrap()
}

#[test]
fn loop_terrain_yields_diverse_route_choices() {
    for seed in [3, 17, 42] {
        let config = loop_config(seed);
        let set = run(config.clone());
        assert!(!set.candidates.is_empty(), "seed {} selected nothing", seed);
        assert!(set.candidates.len() <= config.num_output_routes);
        assert!(set.stats.scored >= set.stats.refined);
        assert!(set.stats.refined >= set.candidates.len());

        for candidate in &set.candidates {
            assert_eq!(candidate.alternates.len(), 1);
            let main = &candidate.main;
            let alternate = &candidate.alternates[0];
            assert!(route_similarity(&alternate.graph, &main.graph) <= 0.3);
            assert!(alternate.graph.length <= config.max_length_ratio * candidate.main_length + 1e-9);
            assert!(candidate.pixel_overlap <= 0.3 + config.pixel_overlap_tolerance);
            assert!(candidate.selection_pass.is_some());

            for route in [main, alternate] {
                assert_eq!(route.graph.coords.first(), Some(&candidate.start()));
                assert_eq!(route.graph.coords.last(), Some(&candidate.end()));
                assert_eq!(route.pixels.points.first(), Some(&candidate.start()));
                assert_eq!(route.pixels.points.last(), Some(&candidate.end()));
            }
        }
    }
}

#[test]
fn selected_candidates_are_spread_by_their_pass_threshold() {
    let config = loop_config(17);
    let set = run(config.clone());
    for (position, later) in set.candidates.iter().enumerate() {
        let threshold = config.selection_passes[later.selection_pass.unwrap()];
        for earlier in &set.candidates[..position] {
            let starts_close = later.start().distance_2(&earlier.start()) < (threshold * threshold) as i64;
            let ends_close = later.end().distance_2(&earlier.end()) < (threshold * threshold) as i64;
            assert!(!(starts_close && ends_close));
        }
    }
}

#[test]
fn fixed_seed_is_reproducible() {
    let first = run(loop_config(5));
    let second = run(loop_config(5));
    let summary = |set: &RouteChoiceSet| -> Vec<(usize, usize, Option<usize>)> {
        set.candidates
            .iter()
            .map(|c| (c.pair.start.index(), c.pair.end.index(), c.selection_pass))
            .collect()
    };
    assert_eq!(summary(&first), summary(&second));
    assert_eq!(first.stats, second.stats);
}

#[test]
fn presentation_hides_the_main_route_position() {
    let set = run(loop_config(3));
    let candidate = &set.candidates[0];
    let mut rng = StdRng::seed_from_u64(9);
    let presentation = candidate.presentation(&mut rng);
    assert_eq!(presentation.routes.len(), 2);
    let main = &presentation.routes[presentation.main_route_index];
    assert_eq!(main.kind, RouteKind::Main);
    assert_eq!(main.points, candidate.main.pixels.points);
    for route in &presentation.routes {
        let tenths = route.length * 10.0;
        assert!((tenths - tenths.round()).abs() < 1e-6);
    }
}

#[test]
fn stats_serialize_to_json() {
    let set = run(loop_config(3));
    let json = serde_json::to_value(&set.stats).unwrap();
    assert_eq!(json["pairs"], set.stats.pairs);
    assert_eq!(json["graph_nodes"], set.stats.graph_nodes);
}

/// A loop hanging off a straight corridor on a 100 by 100 raster. Near-opposite points
/// of the loop are joined by two arcs of similar length.
fn corridor_with_loop() -> NavMask {
    let mut mask = NavMask::empty(100, 100);
    let mut mark = |row: i32, col: i32| mask.set(GridCoord::new(row, col), true);
    for col in 40..=60 {
        mark(20, col);
        mark(68, col);
    }
    for row in 34..=54 {
        mark(row, 26);
        mark(row, 74);
    }
    for i in 1..=13 {
        mark(20 + i, 60 + i);
        mark(54 + i, 74 - i);
        mark(68 - i, 40 - i);
        mark(34 - i, 26 + i);
    }
    for col in 5..=95 {
        mark(82, col);
    }
    for row in 69..=81 {
        mark(row, 50);
    }
    mark(18, 50);
    mark(19, 50);
    for col in [44, 56] {
        mark(69, col);
        mark(70, col);
    }
    for col in [24, 25, 75, 76] {
        mark(44, col);
    }
    mask
}

#[test]
fn corridor_with_loop_offers_a_short_distinct_alternate() {
    for seed in [1, 2, 3] {
        let config = RouteChoiceConfig {
            num_alternate_routes: 1,
            overlap_tiers: vec![0.3],
            num_random_points: 20,
            candidate_min_dist: 10.0,
            candidate_max_dist: 60.0,
            min_separation: 3.0,
            corridor_base_width: 3.0,
            seed: Some(seed),
            ..RouteChoiceConfig::default()
        };
        let roi = RoiPolygon::rectangle(0.0, 0.0, 100.0, 100.0);
        let set = RouteChoiceGenerator::new(config.clone())
            .run(&corridor_with_loop(), &roi)
            .unwrap();
        assert!(!set.candidates.is_empty(), "seed {} selected nothing", seed);
        for candidate in &set.candidates {
            assert_eq!(candidate.alternates.len(), 1);
            let alternate = &candidate.alternates[0].graph;
            assert!(route_similarity(alternate, &candidate.main.graph) < 0.3);
            assert!(alternate.length <= 1.25 * candidate.main_length + 1e-9);
            let distance = candidate.start().distance(&candidate.end());
            assert!((10.0..=60.0).contains(&distance));
        }
    }
}
