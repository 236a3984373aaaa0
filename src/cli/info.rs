//! info and status commands.

use std::path::Path;

use imgsearch::{now_unix_secs, read_metadata, FolderState, IndexManager, IndexSummary};

fn age_hours(updated_at: u64) -> f64 {
    let age_secs = now_unix_secs().saturating_sub(updated_at);
    (age_secs as f64 / 3600.0 * 10.0).round() / 10.0
}

fn state_name(state: FolderState) -> &'static str {
    match state {
        FolderState::Unindexed => "unindexed",
        FolderState::Indexing => "indexing",
        FolderState::Indexed => "indexed",
    }
}

pub fn cmd_info(manager: &IndexManager) {
    let storage = manager.storage();
    eprintln!("Index directory: {}", storage.indexes_dir().display());
    eprintln!();

    let indexes = manager.list_indexes();
    if indexes.is_empty() {
        eprintln!("No indexes found. Use 'imgsearch index <DIR>' to create one.");
        return;
    }
    for summary in &indexes {
        let busy = if summary.state == FolderState::Indexing { " [INDEXING]" } else { "" };
        println!(
            "  {} -- {} images, {:.1}h ago{} ({})",
            summary.root, summary.documents, age_hours(summary.updated_at), busy, summary.folder_id
        );
    }
}

fn summary_json(summary: &IndexSummary) -> serde_json::Value {
    serde_json::json!({
        "folderId": summary.folder_id,
        "root": summary.root,
        "images": summary.documents,
        "updatedAt": summary.updated_at,
        "ageHours": age_hours(summary.updated_at),
        "state": state_name(summary.state),
    })
}

/// Every folder index as a JSON value.
pub fn cmd_info_json(manager: &IndexManager) -> serde_json::Value {
    let indexes: Vec<serde_json::Value> = manager.list_indexes().iter().map(summary_json).collect();
    serde_json::json!({
        "directory": manager.storage().indexes_dir().display().to_string(),
        "indexes": indexes,
    })
}

pub fn cmd_status(manager: &IndexManager, dir: &Path) {
    let state = manager.folder_state(dir);
    let store = manager.store_for(dir);
    println!("Folder:   {}", dir.display());
    println!("Id:       {}", manager.storage().folder_id(dir));
    println!("Store:    {}", store.dir().display());
    println!("State:    {}", state_name(state));
    if state == FolderState::Unindexed {
        return;
    }
    let tracked = read_metadata(store.dir()).len();
    println!("Tracked:  {} images", tracked);
    match store.load() {
        Ok(Some(index)) => println!(
            "Indexed:  {} images, {} terms, updated {:.1}h ago",
            index.len(),
            index.index.len(),
            age_hours(index.updated_at)
        ),
        Ok(None) => {}
        Err(e) => eprintln!("Warning: {}", e),
    }
}
