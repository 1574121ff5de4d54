//! Monthly JSON archive for expired news items
//!
//! Each month lives in `<root>/<YYYY-MM>.json` as an array of snapshots.
//! Files are rewritten through a temporary file so a crash never leaves a
//! half-written archive behind.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use gamefeed_core::ArchivedItem;
use tracing::debug;

/// Errors that can occur while reading or writing archive files
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt archive {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize archive {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result of appending snapshots to a month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Snapshots written
    pub added: usize,
    /// Snapshots whose title was already archived
    pub skipped: usize,
}

/// Directory of monthly archive files
#[derive(Debug, Clone)]
pub struct Archive {
    root: PathBuf,
}

impl Archive {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the given `YYYY-MM` month
    pub fn path_for(&self, month: &str) -> PathBuf {
        self.root.join(format!("{}.json", month))
    }

    /// Read a month; a missing file is an empty month
    pub fn load(&self, month: &str) -> Result<Vec<ArchivedItem>, ArchiveError> {
        let path = self.path_for(month);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&path).map_err(|source| ArchiveError::Io {
            path: path.clone(),
            source,
        })?;

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|source| ArchiveError::Parse { path, source })
    }

    /// Replace a month's contents
    pub fn save(&self, month: &str, items: &[ArchivedItem]) -> Result<(), ArchiveError> {
        fs::create_dir_all(&self.root).map_err(|source| ArchiveError::Io {
            path: self.root.clone(),
            source,
        })?;

        let path = self.path_for(month);
        let data = serde_json::to_string_pretty(items).map_err(|source| ArchiveError::Serialize {
            path: path.clone(),
            source,
        })?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, data).map_err(|source| ArchiveError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| ArchiveError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(())
    }

    /// Add snapshots to a month, skipping titles archived in any month
    pub fn append(
        &self,
        month: &str,
        snapshots: Vec<ArchivedItem>,
    ) -> Result<AppendOutcome, ArchiveError> {
        let mut archived = self.load(month)?;
        let mut titles = self.titles()?;
        let mut outcome = AppendOutcome::default();

        for snapshot in snapshots {
            if titles.contains(&snapshot.title) {
                outcome.skipped += 1;
            } else {
                titles.insert(snapshot.title.clone());
                archived.push(snapshot);
                outcome.added += 1;
            }
        }

        if outcome.added > 0 {
            self.save(month, &archived)?;
        }

        debug!(
            "Archive {}: {} added, {} already present",
            month, outcome.added, outcome.skipped
        );
        Ok(outcome)
    }

    /// Every title in the archive, across all months
    pub fn titles(&self) -> Result<HashSet<String>, ArchiveError> {
        let mut titles = HashSet::new();
        for month in self.months()? {
            titles.extend(self.load(&month)?.into_iter().map(|item| item.title));
        }

        Ok(titles)
    }

    /// Month keys that have an archive file, oldest first
    pub fn months(&self) -> Result<Vec<String>, ArchiveError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ArchiveError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut months: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                let month = name.strip_suffix(".json")?;
                is_month_key(month).then(|| month.to_string())
            })
            .collect();
        months.sort();

        Ok(months)
    }
}

fn is_month_key(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes.len() == 7
        && bytes[4] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot(title: &str) -> ArchivedItem {
        ArchivedItem {
            title: title.to_string(),
            url: format!("https://example.com/{}", title.replace(' ', "-")),
            site: "gamed".to_string(),
            published_at: Utc.with_ymd_and_hms(2018, 9, 28, 8, 15, 30).unwrap(),
            categories: vec!["PS4".to_string(), "Xbox One".to_string()],
            game_id: Some(7),
        }
    }

    #[test]
    fn test_round_trip_preserves_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path());
        let item = snapshot("Spyro Reignited Trilogy review");

        archive.save("2018-09", std::slice::from_ref(&item)).unwrap();
        let loaded = archive.load("2018-09").unwrap();

        assert_eq!(loaded, vec![item]);
        assert!(dir.path().join("2018-09.json").exists());
        assert!(!dir.path().join("2018-09.json.tmp").exists());
    }

    #[test]
    fn test_missing_month_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path().join("not-created-yet"));

        assert!(archive.load("2018-01").unwrap().is_empty());
        assert!(archive.months().unwrap().is_empty());
    }

    #[test]
    fn test_append_skips_archived_titles() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path());

        let first = archive
            .append("2018-09", vec![snapshot("One"), snapshot("Two")])
            .unwrap();
        assert_eq!(first, AppendOutcome { added: 2, skipped: 0 });

        let second = archive
            .append("2018-09", vec![snapshot("Two"), snapshot("Three")])
            .unwrap();
        assert_eq!(second, AppendOutcome { added: 1, skipped: 1 });

        let titles: Vec<String> = archive
            .load("2018-09")
            .unwrap()
            .into_iter()
            .map(|item| item.title)
            .collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_append_skips_titles_archived_in_other_months() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path());
        archive.append("2018-09", vec![snapshot("Republished")]).unwrap();

        let outcome = archive
            .append("2018-10", vec![snapshot("Republished"), snapshot("Fresh")])
            .unwrap();
        assert_eq!(outcome, AppendOutcome { added: 1, skipped: 1 });

        let october: Vec<String> = archive
            .load("2018-10")
            .unwrap()
            .into_iter()
            .map(|item| item.title)
            .collect();
        assert_eq!(october, vec!["Fresh"]);
        assert_eq!(archive.titles().unwrap().len(), 2);
    }

    #[test]
    fn test_corrupt_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2018-09.json"), "{ not json").unwrap();
        let archive = Archive::new(dir.path());

        assert!(matches!(
            archive.load("2018-09"),
            Err(ArchiveError::Parse { .. })
        ));
        assert!(archive.append("2018-09", vec![snapshot("One")]).is_err());
    }

    #[test]
    fn test_months_lists_archive_files() {
        let dir = tempfile::tempdir().unwrap();
        let archive = Archive::new(dir.path());
        archive.save("2018-10", &[snapshot("A")]).unwrap();
        archive.save("2018-09", &[snapshot("B")]).unwrap();
        std::fs::write(dir.path().join("keywords.json"), "{}").unwrap();

        assert_eq!(archive.months().unwrap(), vec!["2018-09", "2018-10"]);
    }
}
