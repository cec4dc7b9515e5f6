use std::fs;

use hashbrown::HashMap;
use serde_json::json;

use crate::error::RouteChoiceError;
use crate::graph::TerrainGraph;
use crate::raster::RoiWindow;

use super::select::BatchRecord;
use super::types::Candidate;

/// When set, a JSON trace of the job is written to the named file.
pub const TRACE_ENV_VAR: &str = "ROUTECHOICE_TRACE_JSON";

pub(crate) fn trace_path_from_env() -> Option<String> {
    std::env::var(TRACE_ENV_VAR).ok().filter(|p| !p.is_empty())
}

pub(crate) fn build_graph_trace(graph: &TerrainGraph, window: &RoiWindow) -> serde_json::Value {
    let total_weight: f64 = graph.graph().edge_weights().sum();
    json!({
        "window": {
            "left": window.left,
            "top": window.top,
            "right": window.right,
            "bottom": window.bottom,
        },
        "nodes": graph.node_count(),
        "edges": graph.edge_count(),
        "total_edge_weight": total_weight,
    })
}

pub(crate) fn build_scoring_trace(
    pairs: usize,
    scored: usize,
    rejections: &HashMap<&'static str, usize>,
) -> serde_json::Value {
    let mut rejected: Vec<(&str, usize)> = rejections.iter().map(|(k, v)| (*k, *v)).collect();
    rejected.sort_unstable();
    let rejected: serde_json::Map<String, serde_json::Value> = rejected
        .into_iter()
        .map(|(kind, count)| (kind.to_string(), json!(count)))
        .collect();
    json!({
        "pairs": pairs,
        "scored": scored,
        "rejected": rejected,
    })
}

pub(crate) fn record_batch_trace(batch_logs: &mut Vec<serde_json::Value>, record: &BatchRecord) {
    batch_logs.push(json!({
        "batch": record.batch,
        "submitted": record.submitted,
        "refined_pool": record.refined_pool,
        "selected": record.selected,
    }));
}

/// Selected candidates with their endpoints mapped back to image coordinates.
pub(crate) fn build_selection_trace(candidates: &[Candidate], window: &RoiWindow) -> Vec<serde_json::Value> {
    candidates
        .iter()
        .map(|c| {
            let start = c.start().to_image(window.left, window.top);
            let end = c.end().to_image(window.left, window.top);
            json!({
                "pair": [c.pair.start.index(), c.pair.end.index()],
                "start": { "x": start.x, "y": start.y },
                "end": { "x": end.x, "y": end.y },
                "pass": c.selection_pass,
                "score": c.score,
                "main_length": c.main_length,
                "pixel_overlap": c.pixel_overlap,
            })
        })
        .collect()
}

pub(crate) fn write_trace(
    path: &str,
    graph: serde_json::Value,
    scoring: serde_json::Value,
    batches: Vec<serde_json::Value>,
    selection: Vec<serde_json::Value>,
) -> Result<(), RouteChoiceError> {
    let trace_json = json!({
        "graph": graph,
        "scoring": scoring,
        "batches": batches,
        "selection": selection,
    });
    let serialized = serde_json::to_string_pretty(&trace_json)
        .map_err(|e| RouteChoiceError::Trace(format!("failed to serialize routing trace: {}", e)))?;
    fs::write(path, serialized)
        .map_err(|e| RouteChoiceError::Trace(format!("failed to write routing trace to {}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_counts_are_sorted_by_kind() {
        let mut rejections = HashMap::new();
        rejections.insert("no_path", 2);
        rejections.insert("insufficient_alts", 5);
        let trace = build_scoring_trace(10, 3, &rejections);
        assert_eq!(trace["pairs"], 10);
        assert_eq!(trace["rejected"]["insufficient_alts"], 5);
        assert_eq!(trace["rejected"]["no_path"], 2);
    }

    #[test]
    fn trace_is_written_as_json() {
        let path = std::env::temp_dir().join(format!("routechoice-trace-{}.json", std::process::id()));
        let path = path.to_string_lossy().to_string();
        write_trace(&path, json!({"nodes": 1}), json!({}), vec![], vec![]).unwrap();
        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["graph"]["nodes"], 1);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unwritable_trace_is_reported() {
        let result = write_trace("/nonexistent-dir/trace.json", json!({}), json!({}), vec![], vec![]);
        assert!(matches!(result, Err(RouteChoiceError::Trace(_))));
    }
}
