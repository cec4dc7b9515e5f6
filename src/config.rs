use serde::{Deserialize, Serialize};

use crate::error::RouteChoiceError;

pub const DEFAULT_OVERLAP_TIERS: [f64; 4] = [0.30, 0.70, 0.85, 0.90];
pub const DEFAULT_SELECTION_PASSES: [f64; 10] =
    [300.0, 250.0, 200.0, 150.0, 120.0, 100.0, 80.0, 60.0, 40.0, 20.0];

/// How candidates are ranked before refinement and selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Main-route inefficiency plus a quality term per alternate.
    #[default]
    Compound,
    /// Dissimilarity of the first alternate only.
    Simple,
}

/// When the selector considers two candidate pairs too close to coexist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProximityRule {
    /// Both corresponding endpoints lie within the pass threshold.
    #[default]
    BothEndpoints,
    /// Either corresponding endpoint lies within the pass threshold.
    EitherEndpoint,
}

/// Every tunable of a generation job. Field names follow the job payload's
/// `processing_parameters` keys so a payload deserializes directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteChoiceConfig {
    pub num_alternate_routes: usize,
    pub overlap_tiers: Vec<f64>,
    pub min_separation: f64,
    pub max_length_ratio: f64,
    pub num_random_points: usize,
    pub candidate_min_dist: f64,
    pub candidate_max_dist: f64,
    pub max_candidate_pairs: usize,
    pub num_output_routes: usize,
    pub batch_size: usize,
    pub penalty_factor: f64,
    pub corridor_base_width: f64,
    pub corridor_scale_factor: f64,
    pub corridor_outside_penalty: f64,
    pub impassable_cost: f64,
    pub smoothing_window: usize,
    pub pixel_overlap_tolerance: f64,
    pub dedup_radius: f64,
    pub selection_passes: Vec<f64>,
    pub proximity_rule: ProximityRule,
    pub scoring: ScoringStrategy,
    pub navigable_threshold: u8,
    pub seed: Option<u64>,
    pub refine_memory_budget_bytes: u64,
    pub max_workers: Option<usize>,
}

impl Default for RouteChoiceConfig {
    fn default() -> Self {
        RouteChoiceConfig {
            num_alternate_routes: 3,
            overlap_tiers: DEFAULT_OVERLAP_TIERS.to_vec(),
            min_separation: 60.0,
            max_length_ratio: 1.25,
            num_random_points: 1000,
            candidate_min_dist: 300.0,
            candidate_max_dist: 1500.0,
            max_candidate_pairs: 20_000,
            num_output_routes: 50,
            batch_size: 25,
            penalty_factor: 4.0,
            corridor_base_width: 50.0,
            corridor_scale_factor: 0.5,
            corridor_outside_penalty: 50_000.0,
            impassable_cost: 1e9,
            smoothing_window: 5,
            pixel_overlap_tolerance: 0.05,
            dedup_radius: 5.0,
            selection_passes: DEFAULT_SELECTION_PASSES.to_vec(),
            proximity_rule: ProximityRule::default(),
            scoring: ScoringStrategy::default(),
            navigable_threshold: 128,
            seed: None,
            refine_memory_budget_bytes: 4 * 1024 * 1024 * 1024,
            max_workers: None,
        }
    }
}

impl RouteChoiceConfig {
    /// Parse a (possibly partial) JSON parameter object; missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self, RouteChoiceError> {
        let config: RouteChoiceConfig = serde_json::from_str(json)
            .map_err(|e| RouteChoiceError::InvalidConfig(format!("malformed parameters: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Similarity ceiling for the alternate attempted at `attempt`; the last tier is reused.
    pub fn overlap_tier(&self, attempt: usize) -> f64 {
        tier_at(&self.overlap_tiers, attempt)
    }

    pub fn validate(&self) -> Result<(), RouteChoiceError> {
        let invalid = |message: &str| Err(RouteChoiceError::InvalidConfig(message.to_string()));

        if self.num_alternate_routes == 0 {
            return invalid("num_alternate_routes must be at least 1");
        }
        if self.overlap_tiers.is_empty() {
            return invalid("overlap_tiers must not be empty");
        }
        if self.overlap_tiers.iter().any(|t| !(0.0..=1.0).contains(t)) {
            return invalid("overlap_tiers must lie in [0, 1]");
        }
        if self.overlap_tiers.windows(2).any(|w| w[1] < w[0]) {
            return invalid("overlap_tiers must be non-decreasing");
        }
        let real_valued = [
            ("penalty_factor", self.penalty_factor),
            ("max_length_ratio", self.max_length_ratio),
            ("min_separation", self.min_separation),
            ("dedup_radius", self.dedup_radius),
            ("candidate_min_dist", self.candidate_min_dist),
            ("candidate_max_dist", self.candidate_max_dist),
            ("corridor_base_width", self.corridor_base_width),
            ("corridor_scale_factor", self.corridor_scale_factor),
            ("corridor_outside_penalty", self.corridor_outside_penalty),
            ("impassable_cost", self.impassable_cost),
            ("pixel_overlap_tolerance", self.pixel_overlap_tolerance),
        ];
        if let Some((name, _)) = real_valued.iter().find(|(_, value)| !value.is_finite()) {
            return invalid(&format!("{} must be a finite number", name));
        }
        if self.selection_passes.iter().any(|p| !p.is_finite()) {
            return invalid("selection_passes must be finite");
        }
        if !(self.penalty_factor > 1.0) {
            return invalid("penalty_factor must be greater than 1");
        }
        if !(self.max_length_ratio >= 1.0) {
            return invalid("max_length_ratio must be at least 1");
        }
        if self.min_separation < 0.0 || self.dedup_radius < 0.0 {
            return invalid("distances must not be negative");
        }
        if self.candidate_min_dist < 0.0 || self.candidate_min_dist > self.candidate_max_dist {
            return invalid("candidate_min_dist must not exceed candidate_max_dist");
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1");
        }
        if self.smoothing_window == 0 || self.smoothing_window % 2 == 0 {
            return invalid("smoothing_window must be odd");
        }
        if self.selection_passes.is_empty() {
            return invalid("selection_passes must not be empty");
        }
        if self.selection_passes.windows(2).any(|w| w[1] > w[0]) {
            return invalid("selection_passes must be descending");
        }
        if self.corridor_base_width < 0.0 || self.corridor_scale_factor < 0.0 {
            return invalid("corridor parameters must not be negative");
        }
        if !(self.impassable_cost > 1.0) || self.corridor_outside_penalty < 0.0 {
            return invalid("impassable_cost must exceed the navigable cost of 1");
        }
        if self.pixel_overlap_tolerance < 0.0 {
            return invalid("pixel_overlap_tolerance must not be negative");
        }
        Ok(())
    }
}

pub(crate) fn tier_at(tiers: &[f64], attempt: usize) -> f64 {
    tiers
        .get(attempt.min(tiers.len().saturating_sub(1)))
        .copied()
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_processing_parameters() {
        let config = RouteChoiceConfig::default();
        assert_eq!(config.num_alternate_routes, 3);
        assert_eq!(config.overlap_tiers, vec![0.30, 0.70, 0.85, 0.90]);
        assert_eq!(config.num_output_routes, 50);
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.scoring, ScoringStrategy::Compound);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = RouteChoiceConfig::from_json(
            r#"{"num_alternate_routes": 1, "candidate_min_dist": 10, "candidate_max_dist": 60, "scoring": "simple"}"#,
        )
        .unwrap();
        assert_eq!(config.num_alternate_routes, 1);
        assert_eq!(config.candidate_max_dist, 60.0);
        assert_eq!(config.scoring, ScoringStrategy::Simple);
        assert_eq!(config.penalty_factor, 4.0);
        assert_eq!(config.proximity_rule, ProximityRule::BothEndpoints);
    }

    #[test]
    fn tiers_are_reused_past_their_end() {
        let config = RouteChoiceConfig::default();
        assert_eq!(config.overlap_tier(0), 0.30);
        assert_eq!(config.overlap_tier(3), 0.90);
        assert_eq!(config.overlap_tier(7), 0.90);
    }

    #[test]
    fn rejects_invalid_configurations() {
        let cases: Vec<fn(&mut RouteChoiceConfig)> = vec![
            |c| c.num_alternate_routes = 0,
            |c| c.overlap_tiers.clear(),
            |c| c.overlap_tiers = vec![0.7, 0.3],
            |c| c.penalty_factor = 1.0,
            |c| c.candidate_min_dist = 2000.0,
            |c| c.batch_size = 0,
            |c| c.smoothing_window = 4,
            |c| c.selection_passes = vec![20.0, 300.0],
            |c| c.selection_passes.clear(),
            |c| c.min_separation = f64::NAN,
            |c| c.dedup_radius = f64::NAN,
            |c| c.candidate_max_dist = f64::NAN,
            |c| c.candidate_max_dist = f64::INFINITY,
            |c| c.corridor_base_width = f64::NAN,
            |c| c.corridor_scale_factor = f64::INFINITY,
            |c| c.corridor_outside_penalty = f64::NAN,
            |c| c.penalty_factor = f64::INFINITY,
            |c| c.selection_passes = vec![f64::NAN],
        ];
        for mutate in cases {
            let mut config = RouteChoiceConfig::default();
            mutate(&mut config);
            assert!(matches!(config.validate(), Err(RouteChoiceError::InvalidConfig(_))));
        }
    }

    #[test]
    fn malformed_json_is_invalid_config() {
        let result = RouteChoiceConfig::from_json("{\"batch_size\": \"many\"}");
        assert!(matches!(result, Err(RouteChoiceError::InvalidConfig(_))));
    }
}
