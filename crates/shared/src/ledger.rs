use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::StoreError;
use crate::io::{read_json, write_json_atomic};
use crate::models::LedgerEntry;
use crate::normalize::normalize;

pub const LEDGER_FILE: &str = "tweets.json";

const LIST_KEY: &str = "tweets";
const LEGACY_LIST_KEY: &str = "tweeted";

/// The ledger file as stored. List elements stay raw so a rewrite keeps
/// entries that [`LedgerEntry`] cannot represent.
#[derive(Debug, Default)]
struct StoredLedger {
    document: Map<String, Value>,
    elements: Vec<Value>,
}

impl StoredLedger {
    /// Always written as `{"tweets": [...]}`; legacy `tweeted` elements move into it.
    fn into_document(mut self) -> Value {
        self.document.remove(LEGACY_LIST_KEY);
        self.document
            .insert(LIST_KEY.to_string(), Value::Array(self.elements));
        Value::Object(self.document)
    }

    fn entries<'a>(&'a self, path: &'a Path) -> impl Iterator<Item = LedgerEntry> + 'a {
        self.elements
            .iter()
            .filter_map(move |element| decode_element(path, element))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Saved,
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerOutcome {
    pub status: LedgerStatus,
    pub entry: LedgerEntry,
}

/// Record of already-published URLs, keyed by normalized URL.
#[derive(Debug, Clone)]
pub struct PostingLedger {
    path: PathBuf,
    tolerate_corrupt_reads: bool,
}

impl PostingLedger {
    pub fn new(data_dir: impl AsRef<Path>, tolerate_corrupt_reads: bool) -> Self {
        Self {
            path: data_dir.as_ref().join(LEDGER_FILE),
            tolerate_corrupt_reads,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        let stored = self.load_raw()?;
        Ok(stored.entries(&self.path).collect())
    }

    /// Normalized URLs already published, for exclusion during filtering.
    pub fn posted_keys(&self) -> Result<HashSet<String>, StoreError> {
        let entries = match self.entries() {
            Err(err @ StoreError::Corrupt { .. }) if self.tolerate_corrupt_reads => {
                warn!(error = %err, "Treating corrupt ledger as empty");
                Vec::new()
            }
            other => other?,
        };
        Ok(entries.iter().map(|e| normalize(&e.url)).collect())
    }

    /// Add `url` unless its normalized form is already recorded.
    ///
    /// A duplicate returns the stored entry and writes nothing. Existing
    /// elements are written back as read.
    pub fn record(&self, url: &str, posting_reason: &str) -> Result<LedgerOutcome, StoreError> {
        let mut stored = self.load_raw()?;
        let key = normalize(url);

        if let Some(existing) = stored
            .entries(&self.path)
            .find(|e| normalize(&e.url) == key)
        {
            info!(url, "Already in posting ledger");
            return Ok(LedgerOutcome {
                status: LedgerStatus::Duplicate,
                entry: existing,
            });
        }

        let entry = LedgerEntry {
            url: url.to_string(),
            posting_reason: posting_reason.to_string(),
        };
        let element = serde_json::to_value(&entry).map_err(|e| StoreError::Serialize {
            path: self.path.clone(),
            source: e,
        })?;
        stored.elements.push(element);
        let total = stored.elements.len();
        write_json_atomic(&self.path, &stored.into_document())?;
        info!(url, total, "Recorded posted item");

        Ok(LedgerOutcome {
            status: LedgerStatus::Saved,
            entry,
        })
    }

    fn load_raw(&self) -> Result<StoredLedger, StoreError> {
        match read_json(&self.path)? {
            None => Ok(StoredLedger::default()),
            Some(value) => split_ledger(&self.path, value),
        }
    }
}

/// Accepts `{"tweets": [...]}`, `{"tweeted": [...]}` (or both, concatenated in
/// that order), or a bare list.
fn split_ledger(path: &Path, value: Value) -> Result<StoredLedger, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    match value {
        Value::Array(elements) => Ok(StoredLedger {
            document: Map::new(),
            elements,
        }),
        Value::Object(mut document) => {
            let mut elements = Vec::new();
            for key in [LIST_KEY, LEGACY_LIST_KEY] {
                match document.get_mut(key) {
                    Some(Value::Array(list)) => elements.append(list),
                    None => {}
                    Some(_) => return Err(corrupt(format!("'{key}' is not a list"))),
                }
            }
            Ok(StoredLedger { document, elements })
        }
        _ => Err(corrupt("expected an object or a list".to_string())),
    }
}

/// Each element is either `{"url", "posting_reason"}` or a plain URL string.
fn decode_element(path: &Path, element: &Value) -> Option<LedgerEntry> {
    match element {
        Value::String(url) => Some(LedgerEntry {
            url: url.clone(),
            posting_reason: String::new(),
        }),
        Value::Object(fields) => {
            let url = match fields.get("url") {
                Some(Value::String(url)) => url.clone(),
                Some(Value::Null) | None => {
                    warn!(path = %path.display(), "Skipping ledger entry without url");
                    return None;
                }
                Some(other) => other.to_string(),
            };
            let posting_reason = match fields.get("posting_reason") {
                Some(Value::String(reason)) => reason.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            Some(LedgerEntry {
                url,
                posting_reason,
            })
        }
        other => {
            warn!(path = %path.display(), entry = %other, "Skipping unrecognized ledger entry");
            None
        }
    }
}
