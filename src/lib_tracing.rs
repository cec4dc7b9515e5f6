use std::{
    fs::File,
    io::BufWriter,
    path::PathBuf,
    sync::Arc,
};

use tracing::{level_filters::LevelFilter, Dispatch};
use tracing_flame::{FlameLayer, FlushGuard};
use tracing_subscriber::prelude::*;

use crate::error::RouteChoiceError;

/// Where library events go. Stdout is always on; the debug log and the flame graph
/// sample file are opt-in.
#[derive(Clone, Debug)]
pub struct TracingOptions {
    pub stdout_level: LevelFilter,
    pub debug_log: Option<PathBuf>,
    pub flame_graph: Option<PathBuf>,
}

impl Default for TracingOptions {
    fn default() -> Self {
        TracingOptions {
            stdout_level: LevelFilter::INFO,
            debug_log: None,
            flame_graph: None,
        }
    }
}

pub struct LibTracer {
    dispatch: Dispatch,
    flame_guard: Option<FlushGuard<BufWriter<File>>>,
}

impl LibTracer {
    pub fn new(options: &TracingOptions) -> Result<Self, RouteChoiceError> {
        let stdout_log = tracing_subscriber::fmt::layer()
            .pretty()
            .with_filter(options.stdout_level);

        // A layer that logs debug events to a file.
        let debug_log = match &options.debug_log {
            Some(path) => {
                let file = File::create(path).map_err(|e| {
                    RouteChoiceError::Tracing(format!("cannot create debug log {}: {}", path.display(), e))
                })?;
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Arc::new(file))
                        .with_ansi(false)
                        .with_filter(LevelFilter::DEBUG),
                )
            }
            None => None,
        };

        let (flame_layer, flame_guard) = match &options.flame_graph {
            Some(path) => {
                let (layer, guard) = FlameLayer::with_file(path).map_err(|e| {
                    RouteChoiceError::Tracing(format!("cannot create flame graph file {}: {}", path.display(), e))
                })?;
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(stdout_log)
            .with(debug_log)
            .with(flame_layer);
        Ok(LibTracer {
            dispatch: Dispatch::new(subscriber),
            flame_guard,
        })
    }

    /// Make this tracer the process-wide default. Fails if one is already installed.
    pub fn install(&self) -> Result<(), RouteChoiceError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|e| RouteChoiceError::Tracing(e.to_string()))
    }

    /// Run `f` with this tracer as the thread-local default.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    pub fn flush(&self) -> Result<(), RouteChoiceError> {
        match &self.flame_guard {
            Some(guard) => guard
                .flush()
                .map_err(|e| RouteChoiceError::Tracing(format!("cannot flush flame graph: {}", e))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tracing::{debug, info_span};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("routechoice-{}-{}", std::process::id(), name))
    }

    #[test]
    fn debug_events_reach_the_log_file() {
        let log_path = temp_path("debug.log");
        let flame_path = temp_path("flame.folded");
        let options = TracingOptions {
            stdout_level: LevelFilter::OFF,
            debug_log: Some(log_path.clone()),
            flame_graph: Some(flame_path.clone()),
        };
        let tracer = LibTracer::new(&options).unwrap();
        tracer.in_scope(|| {
            let _span = info_span!("build_graph").entered();
            debug!(nodes = 3, "contracted skeleton");
        });
        tracer.flush().unwrap();
        drop(tracer);

        let log = fs::read_to_string(&log_path).unwrap();
        assert!(log.contains("contracted skeleton"));
        assert!(flame_path.exists());
        fs::remove_file(&log_path).unwrap();
        fs::remove_file(&flame_path).unwrap();
    }

    #[test]
    fn unwritable_log_is_an_error() {
        let options = TracingOptions {
            debug_log: Some(PathBuf::from("/nonexistent-dir/debug.log")),
            ..TracingOptions::default()
        };
        assert!(matches!(LibTracer::new(&options), Err(RouteChoiceError::Tracing(_))));
    }
}
