use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

/// Coarse stages of a generation job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Milestone {
    BuildingGraph,
    PairsReady { pairs: usize },
    ScoringPairs { scored: usize, rejected: usize },
    Refining { batch: usize, refined: usize, selected: usize },
    Completed { selected: usize },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, milestone: Milestone);
}

/// Logs each milestone at `info`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, milestone: Milestone) {
        match milestone {
            Milestone::BuildingGraph => info!("building terrain graph"),
            Milestone::PairsReady { pairs } => info!(pairs, "candidate pairs ready"),
            Milestone::ScoringPairs { scored, rejected } => {
                info!(scored, rejected, "scored candidate pairs")
            }
            Milestone::Refining {
                batch,
                refined,
                selected,
            } => info!(batch, refined, selected, "refining batch"),
            Milestone::Completed { selected } => info!(selected, "route choice generation complete"),
        }
    }
}

/// Shared cancellation flag, checked by workers between units of work.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
