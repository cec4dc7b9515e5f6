//! Route-choice candidate generation from terrain navigability masks.
//!
//! A mask is thinned to a skeleton and contracted into a junction graph. Sampled
//! waypoints are paired, each pair gets a main route plus diverse alternates, the
//! hardest candidates are rebuilt at pixel resolution inside corridors, and a
//! spatially spread subset is selected.

pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod lib_tracing;
pub mod pairs;
pub mod progress;
pub mod raster;
pub mod routing;
pub mod sampling;

pub use config::{ProximityRule, RouteChoiceConfig, ScoringStrategy};
pub use error::{Rejection, RouteChoiceError};
pub use geometry::{GridCoord, ImagePoint, LocalPoint, PointLike, RoiPolygon};
pub use graph::{SkeletonGraph, TerrainGraph};
pub use lib_tracing::{LibTracer, TracingOptions};
pub use progress::{CancelToken, Milestone, ProgressReporter, TracingReporter};
pub use raster::{NavMask, RoiWindow};
pub use routing::{Candidate, RouteChoiceGenerator, RouteChoiceSet};
