use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::batch::parse_entry;
use crate::error::StoreError;
use crate::io::{read_json, write_json_atomic};
use crate::models::{Item, Source};
use crate::normalize::normalize;

const RESULTS_KEY: &str = "results";

/// A collection file as stored. Entries stay raw so a rewrite never drops
/// fields the [`Item`] schema does not model.
#[derive(Debug, Default)]
struct StoredCollection {
    document: Map<String, Value>,
    entries: Vec<Value>,
}

impl StoredCollection {
    fn into_document(mut self) -> Value {
        self.document
            .insert(RESULTS_KEY.to_string(), Value::Array(self.entries));
        Value::Object(self.document)
    }
}

/// Result of merging one batch into a source collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub source: Source,
    pub added: usize,
    pub path: PathBuf,
}

impl MergeOutcome {
    pub fn message(&self) -> String {
        if self.added == 0 {
            format!("No new unique results to save for source '{}'.", self.source)
        } else {
            format!(
                "Successfully added {} new unique results to {}",
                self.added,
                self.path.display()
            )
        }
    }
}

/// Append-only per-source collections, deduplicated by normalized URL.
#[derive(Debug, Clone)]
pub struct RecordStore {
    data_dir: PathBuf,
    tolerate_corrupt_reads: bool,
}

impl RecordStore {
    pub fn new(data_dir: impl Into<PathBuf>, tolerate_corrupt_reads: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            tolerate_corrupt_reads,
        }
    }

    pub fn path(&self, source: Source) -> PathBuf {
        self.data_dir.join(source.file_name())
    }

    /// Load a collection. A missing file is empty; an unparseable one is an error.
    ///
    /// Entries that no longer fit the [`Item`] schema are skipped with a warning.
    pub fn load(&self, source: Source) -> Result<Vec<Item>, StoreError> {
        let path = self.path(source);
        let stored = self.load_raw(source)?;
        Ok(decode_entries(&path, source, stored.entries))
    }

    /// Load for read-only use, degrading a corrupt file to empty when configured to.
    pub fn read(&self, source: Source) -> Result<Vec<Item>, StoreError> {
        match self.load(source) {
            Err(err @ StoreError::Corrupt { .. }) if self.tolerate_corrupt_reads => {
                warn!(source = %source, error = %err, "Treating corrupt collection as empty");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    /// Append the items whose normalized URL is not yet stored.
    ///
    /// The first item with a given key wins, including within `new_items`.
    /// Stored entries are written back exactly as read. The file is rewritten
    /// only when something was added.
    pub fn merge(&self, source: Source, new_items: Vec<Item>) -> Result<MergeOutcome, StoreError> {
        let path = self.path(source);
        let mut stored = self.load_raw(source)?;
        let mut seen: HashSet<String> = stored.entries.iter().filter_map(stored_identity).collect();

        let before = stored.entries.len();
        for item in new_items {
            if !seen.insert(item.identity()) {
                debug!(source = %source, url = %item.url, "Skipping duplicate entry");
                continue;
            }
            let entry = serde_json::to_value(&item).map_err(|e| StoreError::Serialize {
                path: path.clone(),
                source: e,
            })?;
            stored.entries.push(entry);
        }
        let added = stored.entries.len() - before;

        if added > 0 {
            let total = stored.entries.len();
            write_json_atomic(&path, &stored.into_document())?;
            info!(source = %source, added, total, "Merged new results");
        } else {
            debug!(source = %source, "No new unique results");
        }

        Ok(MergeOutcome {
            source,
            added,
            path,
        })
    }

    fn load_raw(&self, source: Source) -> Result<StoredCollection, StoreError> {
        let path = self.path(source);
        match read_json(&path)? {
            None => Ok(StoredCollection::default()),
            Some(value) => split_collection(&path, value),
        }
    }
}

fn split_collection(path: &Path, value: Value) -> Result<StoredCollection, StoreError> {
    let corrupt = |reason: &str| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let Value::Object(mut document) = value else {
        return Err(corrupt("expected an object with a 'results' list"));
    };
    // Leaves an empty list behind; `into_document` refills it at the same position.
    let entries = match document.get_mut(RESULTS_KEY) {
        Some(Value::Array(entries)) => std::mem::take(entries),
        None => Vec::new(),
        Some(_) => return Err(corrupt("'results' is not a list")),
    };

    Ok(StoredCollection { document, entries })
}

fn decode_entries(path: &Path, source: Source, entries: Vec<Value>) -> Vec<Item> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match parse_entry(source, index, entry) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Skipping unreadable stored entry");
                None
            }
        })
        .collect()
}

/// Dedupe key of a stored entry, read straight from its `url` field.
fn stored_identity(entry: &Value) -> Option<String> {
    entry.get("url").and_then(Value::as_str).map(normalize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn item(url: &str, score: Option<u8>) -> Item {
        Item {
            source: Source::Arxiv,
            title: format!("Paper at {url}"),
            authors: vec!["A. Author".to_string()],
            publish_date: Some("01-02-2025".to_string()),
            summary: String::new(),
            url: url.to_string(),
            usefulness_score: score,
        }
    }

    #[test]
    fn test_merge_into_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path(), false);

        let outcome = store
            .merge(
                Source::Arxiv,
                vec![
                    item("http://arxiv.org/abs/2501.00001v1", Some(80)),
                    item("http://arxiv.org/abs/2501.00002v1", None),
                ],
            )
            .unwrap();

        assert_eq!(outcome.added, 2);
        assert_eq!(store.load(Source::Arxiv).unwrap().len(), 2);
        assert!(outcome.message().starts_with("Successfully added 2 new unique results"));
    }

    #[test]
    fn test_duplicates_within_batch_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path(), false);

        let outcome = store
            .merge(
                Source::Arxiv,
                vec![
                    item("http://arxiv.org/abs/2211.11179v1", Some(60)),
                    item("https://arxiv.org/abs/2211.11179v2", Some(90)),
                ],
            )
            .unwrap();

        assert_eq!(outcome.added, 1);
        let stored = store.load(Source::Arxiv).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].usefulness_score, Some(60));
    }

    #[test]
    fn test_remerge_adds_nothing_and_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path(), false);
        let batch = vec![item("https://example.com/post", Some(50))];

        store.merge(Source::Arxiv, batch.clone()).unwrap();
        let path = store.path(Source::Arxiv);
        let before = fs::read_to_string(&path).unwrap();
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        let outcome = store.merge(Source::Arxiv, batch).unwrap();

        assert_eq!(outcome.added, 0);
        assert_eq!(
            outcome.message(),
            "No new unique results to save for source 'arxiv'."
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), modified);
    }

    #[test]
    fn test_empty_batch_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path(), false);
        store.merge(Source::Blog, Vec::new()).unwrap();
        assert!(!store.path(Source::Blog).exists());
    }

    #[test]
    fn test_merge_refuses_corrupt_target() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path(), true);
        let path = store.path(Source::Arxiv);
        fs::write(&path, "{\"results\": [").unwrap();

        let err = store
            .merge(Source::Arxiv, vec![item("https://example.com/x", None)])
            .unwrap_err();

        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"results\": [");
    }

    #[test]
    fn test_read_tolerance_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blog_results.json"), "garbage").unwrap();

        let strict = RecordStore::new(dir.path(), false);
        assert!(strict.read(Source::Blog).is_err());

        let tolerant = RecordStore::new(dir.path(), true);
        assert!(tolerant.read(Source::Blog).unwrap().is_empty());
    }

    #[test]
    fn test_loads_existing_file_with_legacy_fields() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("gscholar_results.json"),
            r#"{"results": [{"source": "Gscholar", "title": "t", "authors": "A, B",
                "Publish_date": "2024/01/05", "abstract": "x", "url": "https://s.example/1"}]}"#,
        )
        .unwrap();

        let store = RecordStore::new(dir.path(), false);
        let items = store.load(Source::Gscholar).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].authors, vec!["A", "B"]);
    }

    #[test]
    fn test_merge_keeps_existing_entries_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gscholar_results.json");
        let existing = r#"{"results": [{"source": "Gscholar", "title": "Neural point processes",
            "authors": "A Smith, B Jones", "Publish_date": "2024/05/01", "abstract": "We study...",
            "url": "https://scholar.example.org/p/1", "citations": 12, "usefulness_score": "high"}]}"#;
        fs::write(&path, existing).unwrap();
        let before: Value = serde_json::from_str(existing).unwrap();

        let store = RecordStore::new(dir.path(), false);
        let outcome = store
            .merge(
                Source::Gscholar,
                vec![
                    Item {
                        source: Source::Gscholar,
                        ..item("https://scholar.example.org/p/1", Some(10))
                    },
                    Item {
                        source: Source::Gscholar,
                        ..item("https://scholar.example.org/p/2", Some(70))
                    },
                ],
            )
            .unwrap();
        assert_eq!(outcome.added, 1);

        let after: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let entries = after["results"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], before["results"][0]);
        assert_eq!(
            serde_json::to_string(&entries[0]).unwrap(),
            serde_json::to_string(&before["results"][0]).unwrap()
        );
        assert_eq!(entries[1]["url"], "https://scholar.example.org/p/2");
        assert_eq!(entries[1]["usefulness_score"], 70);
    }

    #[test]
    fn test_unreadable_stored_entry_is_skipped_and_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog_results.json");
        fs::write(
            &path,
            r#"{"results": [
                {"source": "blog", "title": null, "url": "https://b.example/1"},
                {"source": "blog", "title": "ok", "url": "https://b.example/2"}
            ]}"#,
        )
        .unwrap();

        let store = RecordStore::new(dir.path(), false);
        let items = store.load(Source::Blog).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://b.example/2");

        let outcome = store
            .merge(
                Source::Blog,
                vec![
                    Item {
                        source: Source::Blog,
                        ..item("https://b.example/1", None)
                    },
                    Item {
                        source: Source::Blog,
                        ..item("https://b.example/3", None)
                    },
                ],
            )
            .unwrap();
        assert_eq!(outcome.added, 1);

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let entries = raw["results"].as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["title"], Value::Null);
        assert_eq!(entries[2]["url"], "https://b.example/3");
    }

    #[test]
    fn test_results_that_are_not_a_list_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("arxiv_results.json"), r#"{"results": "none"}"#).unwrap();

        let store = RecordStore::new(dir.path(), false);
        assert!(matches!(
            store.load(Source::Arxiv),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
