// src/pipeline/reindex.rs

//! Rebuild manifest and history from per-draw files already on disk.

use std::path::Path;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::RunSummary;
use crate::storage::RecordStore;

/// Merge every per-draw file in the note directory and refresh the latest pointer.
///
/// Picks up files placed there by hand; already indexed filenames are skipped.
pub async fn run_reindex(config: &Config, root: &Path) -> Result<RunSummary> {
    let store = RecordStore::new(root, config.paths.clone());

    let records = store.load_note_records().await?;
    log::info!(
        "Found {} per-draw files in {}",
        records.len(),
        store.note_dir().display()
    );

    let applied = store.merge(&records).await?;
    let latest = store.update_latest().await?;

    let summary = RunSummary {
        discovered: records.len(),
        extracted: records.len(),
        skipped: 0,
        applied,
        latest,
    };
    summary.log();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reindex_manual_uploads() {
        let dir = TempDir::new().unwrap();
        let config = Config::default();
        let note = dir.path().join(&config.paths.note_dir);
        std::fs::create_dir_all(&note).unwrap();

        std::fs::write(
            note.join("KR-720-2025-09-13.json"),
            r#"{"lottery_name":"KARUNYA","draw_number":"KR-720","draw_date":"2025-09-13","venue":"","prizes":{"1st_prize":{"amount":10000000,"label":"1st Prize","winners":["KA 111111"]}},"downloadLink":""}"#,
        )
        .unwrap();
        std::fs::write(
            note.join("SS-498-2025-09-16.json"),
            r#"{"lottery_name":"STHREE SAKTHI","draw_number":"SS-498","draw_date":"2025-09-16"}"#,
        )
        .unwrap();

        let summary = run_reindex(&config, dir.path()).await.unwrap();
        assert_eq!(summary.applied, 2);
        assert_eq!(summary.latest.as_deref(), Some("SS-498-2025-09-16.json"));

        let store = RecordStore::new(dir.path(), config.paths.clone());
        let history = store.load_history().await;
        assert_eq!(history[0].filename, "SS-498-2025-09-16.json");
        assert_eq!(history[1].numbers6, vec!["111111"]);

        let again = run_reindex(&config, dir.path()).await.unwrap();
        assert_eq!(again.applied, 0);
    }
}
