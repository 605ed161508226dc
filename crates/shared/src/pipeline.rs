use chrono::NaiveDate;
use tracing::{info, warn};

use crate::batch::parse_batch;
use crate::config::Config;
use crate::error::{CurateError, Result};
use crate::filter::{FilterEngine, FilterOutcome, FilterQuery};
use crate::ledger::{LedgerOutcome, PostingLedger};
use crate::models::{Item, LedgerEntry, SelectionMode, Source, SourceSelector};
use crate::publish::{validate_post_content, PublishStatus, Publisher};
use crate::selection::{select_best, Selection};
use crate::store::{MergeOutcome, RecordStore};

/// One invocation's view of the store and ledger, driven by a [`Config`].
pub struct Pipeline<'c> {
    config: &'c Config,
    store: RecordStore,
    ledger: PostingLedger,
}

impl<'c> Pipeline<'c> {
    pub fn new(config: &'c Config) -> Self {
        Self {
            config,
            store: RecordStore::new(&config.data_dir, config.tolerate_corrupt_reads),
            ledger: PostingLedger::new(&config.data_dir, config.tolerate_corrupt_reads),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn ledger(&self) -> &PostingLedger {
        &self.ledger
    }

    /// Validate a fetch batch and merge it. A malformed batch merges nothing.
    pub fn ingest(&self, source: Source, content: &str) -> Result<MergeOutcome> {
        let items = parse_batch(source, content)?;
        let outcome = self.store.merge(source, items)?;
        info!(source = %source, added = outcome.added, "{}", outcome.message());
        Ok(outcome)
    }

    /// Filter with explicit thresholds, falling back to the configured minimum score.
    pub fn candidates(
        &self,
        selector: SourceSelector,
        min_score: Option<i64>,
        cutoff: Option<NaiveDate>,
    ) -> Result<FilterOutcome> {
        let query = FilterQuery::new(selector)
            .min_score(min_score.or(self.config.default_min_score))
            .since(cutoff);
        FilterEngine::new(&self.store, &self.ledger).fetch_filtered(&query)
    }

    pub fn record(&self, url: &str, posting_reason: &str) -> Result<LedgerOutcome> {
        Ok(self.ledger.record(url, posting_reason)?)
    }

    /// Act on a publish collaborator's status: record on success, surface failure.
    pub fn confirm(&self, status: &str, url: &str, posting_reason: &str) -> Result<LedgerOutcome> {
        match PublishStatus::interpret(status, &self.config.publish_success_prefix) {
            PublishStatus::Posted => self.record(url, posting_reason),
            PublishStatus::Failed(reason) => {
                warn!(url, %reason, "Publish failed, not recording");
                Err(CurateError::PublishFailed(reason))
            }
        }
    }

    /// Post `content` about `item` and record it once the collaborator reports success.
    pub fn publish_and_record(
        &self,
        publisher: &mut dyn Publisher,
        item: &Item,
        content: &str,
        posting_reason: &str,
    ) -> Result<LedgerOutcome> {
        validate_post_content(content, self.config.max_post_chars)?;
        let status = publisher.publish(content);
        self.confirm(&status, &item.url, posting_reason)
    }

    pub fn posted(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.ledger.entries()?)
    }
}

/// Pick the winner among filtered candidates.
pub fn choose(outcome: &FilterOutcome, mode: SelectionMode) -> Selection<'_> {
    let selection = select_best(&outcome.items, mode);
    if selection.is_fallback() {
        info!(requested = %mode, "Selection fell back to the other ranking mode");
    }
    selection
}
