//! Text and JSON rendering for command results.

use serde_json::json;

use cellflow_client::api::ServiceApi;
use cellflow_client::submission::JobHandle;
use cellflow_core::catalog::ModelCatalog;
use cellflow_core::format::{format_bytes, format_progress};
use cellflow_core::result_set::ResultSet;
use cellflow_core::workflow::{WorkflowRecord, WorkflowStatus};

pub fn submitted(job: &JobHandle, json: bool) {
    if json {
        println!("{}", json!({ "workflow_id": job.id }));
    } else {
        println!("Workflow {} submitted", job.id);
    }
}

pub fn record(record: &WorkflowRecord, json: bool) {
    if json {
        println!("{}", record_json(record));
        return;
    }
    match record.status {
        WorkflowStatus::Running => println!(
            "{}  {}  {}",
            record.id,
            record.status.label(),
            format_progress(record.progress, 0)
        ),
        WorkflowStatus::Failed => println!(
            "{}  {}  {}",
            record.id,
            record.status.label(),
            record.error_message.as_deref().unwrap_or("An unknown error occurred")
        ),
        _ => println!("{}  {}", record.id, record.status.label()),
    }
}

pub fn results(api: &ServiceApi, job_id: &str, record: &WorkflowRecord, json: bool) {
    let set = ResultSet::for_job(job_id, record);
    if json {
        let items: Vec<_> = set
            .entries()
            .map(|(item, download)| {
                json!({
                    "result_id": item.id,
                    "type": item.kind,
                    "size_bytes": item.size_bytes,
                    "created_at": item.created_at,
                    "download_url": api.download_url(&download).as_str(),
                })
            })
            .collect();
        println!("{}", json!({ "workflow_id": set.job_id(), "results": items }));
        return;
    }

    if set.is_empty() {
        println!("No results available");
        return;
    }
    for (item, download) in set.entries() {
        let created = item
            .created_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  {}  {}  {}",
            item.id,
            item.kind,
            format_bytes(item.size_bytes),
            created,
            api.download_url(&download)
        );
    }
}

pub fn workflows(records: &[WorkflowRecord], json: bool) {
    if json {
        let items: Vec<_> = records.iter().map(record_json).collect();
        println!("{}", serde_json::Value::Array(items));
        return;
    }
    if records.is_empty() {
        println!("No workflows yet");
        return;
    }
    for record in records {
        let created = record
            .created_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        let progress = record
            .running_progress()
            .map(|p| format_progress(p, 0))
            .unwrap_or_default();
        println!(
            "{:<24} {:<12} {:<17} {}",
            record.id,
            record.status.label(),
            created,
            progress
        );
    }
}

pub fn models(catalog: &ModelCatalog, json: bool) {
    if json {
        println!("{}", json!({ "models": catalog.models() }));
        return;
    }
    if catalog.is_empty() {
        println!("No compatible models available");
        return;
    }
    for model in catalog.models() {
        println!(
            "{:<12} {:<10} {}",
            model.id.as_str(),
            model.descriptor.version,
            model.descriptor.description
        );
    }
}

fn record_json(record: &WorkflowRecord) -> serde_json::Value {
    json!({
        "workflow_id": record.id,
        "status": record.status,
        "label": record.status.label(),
        "progress": record.progress,
        "error_message": record.error_message,
        "results": record.results,
        "created_at": record.created_at,
    })
}
