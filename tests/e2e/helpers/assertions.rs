use serde_json::Value;

/// Check the shape of a run snapshot and that counters agree with the jobs
pub fn assert_run_snapshot(run: &Value) {
    assert!(run.get("id").and_then(|v| v.as_str()).is_some());
    assert!(run.get("provider").and_then(|v| v.as_str()).is_some());
    assert!(run.get("created_at").is_some());

    let profile = run.get("profile").expect("Missing profile");
    assert!(profile.get("max_chunk_length").and_then(|v| v.as_u64()).is_some());
    assert!(profile.get("batch_size").and_then(|v| v.as_u64()).is_some());

    let progress = run.get("progress").expect("Missing progress");
    let chunks = run
        .get("chunks")
        .and_then(|v| v.as_array())
        .expect("Missing chunks");

    assert_eq!(
        progress["total_chunks"].as_u64(),
        Some(chunks.len() as u64),
        "total_chunks does not match the job list"
    );

    let count = |status: &str| chunks.iter().filter(|c| c["status"] == status).count() as u64;
    assert_eq!(progress["completed_chunks"].as_u64(), Some(count("completed")));
    assert_eq!(progress["failed_chunks"].as_u64(), Some(count("failed")));

    let summary = run.get("summary").expect("Missing summary");
    assert!(summary.get("success_rate").and_then(|v| v.as_f64()).is_some());
}

/// Chunk indices in the order the snapshot lists them
pub fn chunk_indices(run: &Value) -> Vec<u64> {
    run["chunks"]
        .as_array()
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|c| c["chunk_index"].as_u64())
                .collect()
        })
        .unwrap_or_default()
}

pub fn chunk_statuses(run: &Value) -> Vec<String> {
    run["chunks"]
        .as_array()
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|c| c["status"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
