//! Persisted draw collections: per-draw files, manifest, history and the latest pointer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::models::{
    DrawDate, DrawRecord, HistoryEntry, ManifestEntry, PathsConfig, cmp_date_desc, parse_filename,
};
use crate::storage::{read_bytes, read_json, write_json};

/// File-backed record store rooted at the storage directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
    paths: PathsConfig,
}

impl RecordStore {
    pub fn new(root: impl Into<PathBuf>, paths: PathsConfig) -> Self {
        Self {
            root: root.into(),
            paths,
        }
    }

    pub fn note_dir(&self) -> PathBuf {
        self.root.join(&self.paths.note_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.paths.manifest_file)
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join(&self.paths.history_file)
    }

    pub fn latest_path(&self) -> PathBuf {
        self.note_dir().join(&self.paths.latest_file)
    }

    /// Write one record to `note/{filename}`, replacing any previous copy.
    pub async fn save_record(&self, record: &DrawRecord) -> Result<PathBuf> {
        let path = self.note_dir().join(filename_of(record));
        write_json(&path, record).await?;
        log::info!("Saved {}", path.display());
        Ok(path)
    }

    pub async fn load_manifest(&self) -> Vec<ManifestEntry> {
        load_collection(&self.manifest_path()).await
    }

    pub async fn load_history(&self) -> Vec<HistoryEntry> {
        load_collection(&self.history_path()).await
    }

    /// Merge new records into manifest and history, skipping known filenames.
    ///
    /// Returns the number of records applied. Nothing is written when that is zero.
    pub async fn merge(&self, records: &[DrawRecord]) -> Result<usize> {
        let mut manifest = self.load_manifest().await;
        let mut history = self.load_history().await;

        let mut known: HashSet<String> = manifest.iter().map(|e| e.filename.clone()).collect();
        let mut in_history: HashSet<String> =
            history.iter().map(|e| e.filename.clone()).collect();

        let mut applied = 0;
        for record in records {
            let filename = filename_of(record);
            if known.contains(&filename) {
                log::debug!("Already indexed: {}", filename);
                continue;
            }

            let mut record = record.clone();
            record.filename = filename.clone();

            manifest.push(ManifestEntry::from_record(&record));
            if in_history.insert(filename.clone()) {
                history.push(HistoryEntry::from_record(&record, &self.paths.raw_base_url));
            }
            known.insert(filename);
            applied += 1;
        }

        if applied == 0 {
            log::info!("No new records; manifest and history left untouched");
            return Ok(0);
        }

        manifest.sort_by(|a, b| cmp_date_desc(&a.date, &b.date));
        history.sort_by(|a, b| cmp_date_desc(&a.date, &b.date));

        write_json(&self.manifest_path(), &manifest).await?;
        write_json(&self.history_path(), &history).await?;
        log::info!(
            "Merged {} new records ({} manifest, {} history entries)",
            applied,
            manifest.len(),
            history.len()
        );

        Ok(applied)
    }

    /// Copy the newest per-draw file over the latest pointer.
    ///
    /// Newest means greatest filename date, ties broken by greatest filename.
    /// Returns the chosen filename.
    pub async fn update_latest(&self) -> Result<Option<String>> {
        let Some(newest) = self
            .note_files()
            .await?
            .into_iter()
            .filter_map(|name| parse_filename(&name).map(|parts| (parts.date, name)))
            .max()
        else {
            log::warn!("No per-draw files in {}", self.note_dir().display());
            return Ok(None);
        };

        let (_, filename) = newest;
        let Some(bytes) = read_bytes(&self.note_dir().join(&filename)).await? else {
            return Ok(None);
        };
        let content: serde_json::Value = serde_json::from_slice(&bytes)?;
        write_json(&self.latest_path(), &content).await?;
        log::info!("Updated {} with {}", self.paths.latest_file, filename);

        Ok(Some(filename))
    }

    /// Load every per-draw file whose name parses, filling fields older files lack.
    pub async fn load_note_records(&self) -> Result<Vec<DrawRecord>> {
        let mut records = Vec::new();

        for name in self.note_files().await? {
            let Some(parts) = parse_filename(&name) else {
                log::debug!("Ignoring {}", name);
                continue;
            };

            let path = self.note_dir().join(&name);
            let mut record: DrawRecord = match read_json(&path).await {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("Skipping unreadable {}: {}", path.display(), e);
                    continue;
                }
            };

            if record.lottery_code.is_empty() {
                record.lottery_code = parts.code;
            }
            if record.draw_date == DrawDate::Unknown {
                record.draw_date = DrawDate::Known(parts.date);
            }
            record.filename = name;
            records.push(record);
        }

        Ok(records)
    }

    /// `.json` files in the note directory, excluding the latest pointer, sorted by name.
    async fn note_files(&self) -> Result<Vec<String>> {
        let dir = self.note_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.ends_with(".json") && name != self.paths.latest_file {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn filename_of(record: &DrawRecord) -> String {
    if record.filename.is_empty() {
        record.derived_filename()
    } else {
        record.filename.clone()
    }
}

/// Absent or unreadable collections load as empty.
async fn load_collection<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    match read_json(path).await {
        Ok(Some(items)) => items,
        Ok(None) => Vec::new(),
        Err(e) => {
            log::warn!("Ignoring unreadable {}: {}", path.display(), e);
            Vec::new()
        }
    }
}
