use thiserror::Error;

/// Failures that abort a whole generation job.
#[derive(Debug, Error)]
pub enum RouteChoiceError {
    #[error("no navigable terrain found")]
    NoNavigableTerrain,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("navigability raster is {width}x{height} but holds {len} cells")]
    RasterShape { width: usize, height: usize, len: usize },
    #[error("job cancelled")]
    Cancelled,
    #[error("failed to write routing trace: {0}")]
    Trace(String),
    #[error("failed to set up tracing: {0}")]
    Tracing(String),
}

/// Why a single candidate pair was dropped. Never fatal for the job.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Rejection {
    #[error("no path between the pair endpoints")]
    NoPath,
    #[error("accepted {accepted} of {requested} alternates")]
    InsufficientAlts { accepted: usize, requested: usize },
    #[error("alternate {alternate} pixel overlap {overlap:.3} exceeds {limit:.3}")]
    RefinementMismatch {
        alternate: usize,
        overlap: f64,
        limit: f64,
    },
}

impl Rejection {
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::NoPath => "no_path",
            Rejection::InsufficientAlts { .. } => "insufficient_alts",
            Rejection::RefinementMismatch { .. } => "refinement_mismatch",
        }
    }
}
