use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

use crate::error::{CurateError, Result};
use crate::ledger::PostingLedger;
use crate::models::{Item, Source, SourceSelector};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterQuery {
    pub selector: SourceSelector,
    pub min_usefulness_score: Option<i64>,
    pub date_cutoff: Option<NaiveDate>,
}

impl FilterQuery {
    pub fn new(selector: SourceSelector) -> Self {
        Self {
            selector,
            min_usefulness_score: None,
            date_cutoff: None,
        }
    }

    pub fn min_score(mut self, score: Option<i64>) -> Self {
        self.min_usefulness_score = score;
        self
    }

    pub fn since(mut self, cutoff: Option<NaiveDate>) -> Self {
        self.date_cutoff = cutoff;
        self
    }
}

/// Audit record describing how a filter pass was carried out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sources_used: Vec<Source>,
    pub min_usefulness_score: Option<i64>,
    pub date_filter: Option<NaiveDate>,
    pub already_posted_excluded: usize,
    pub returned: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOutcome {
    #[serde(rename = "results")]
    pub items: Vec<Item>,
    pub meta: FilterMeta,
}

pub struct FilterEngine<'a> {
    store: &'a RecordStore,
    ledger: &'a PostingLedger,
}

impl<'a> FilterEngine<'a> {
    pub fn new(store: &'a RecordStore, ledger: &'a PostingLedger) -> Self {
        Self { store, ledger }
    }

    /// Eligible candidates: above the score threshold, on or after the cutoff,
    /// and never already posted. Sorted by score, then date, both descending.
    pub fn fetch_filtered(&self, query: &FilterQuery) -> Result<FilterOutcome> {
        if let Some(score) = query.min_usefulness_score {
            if !(0..=100).contains(&score) {
                return Err(CurateError::InvalidThreshold(score));
            }
        }

        let mut raw_items = Vec::new();
        let mut sources_used = Vec::new();
        for source in query.selector.sources() {
            let items = self.store.read(source)?;
            if !items.is_empty() {
                raw_items.extend(items);
                sources_used.push(source);
            }
        }

        if let (SourceSelector::One(source), true) = (query.selector, sources_used.is_empty()) {
            info!(source = %source, "No stored data for source");
            return Ok(FilterOutcome {
                items: Vec::new(),
                meta: FilterMeta {
                    error: Some(format!(
                        "No data found for source '{}'. Expected '{}'.",
                        source,
                        self.store.path(source).display()
                    )),
                    sources_used,
                    min_usefulness_score: query.min_usefulness_score,
                    date_filter: query.date_cutoff,
                    already_posted_excluded: 0,
                    returned: 0,
                },
            });
        }

        let posted = self.ledger.posted_keys()?;
        let mut already_posted_excluded = 0;
        let mut items = Vec::with_capacity(raw_items.len());

        for item in raw_items {
            if let Some(min) = query.min_usefulness_score {
                if i64::from(item.rank_score()) < min {
                    continue;
                }
            }

            if let Some(cutoff) = query.date_cutoff {
                match item.published_on() {
                    Some(published) if published >= cutoff => {}
                    _ => continue,
                }
            }

            if posted.contains(&item.identity()) {
                debug!(url = %item.url, "Excluding already posted item");
                already_posted_excluded += 1;
                continue;
            }

            items.push(item);
        }

        items.sort_by(rank_by_score_then_date);

        info!(
            selector = %query.selector,
            returned = items.len(),
            already_posted_excluded,
            "Filtered candidates"
        );

        Ok(FilterOutcome {
            meta: FilterMeta {
                error: None,
                sources_used,
                min_usefulness_score: query.min_usefulness_score,
                date_filter: query.date_cutoff,
                already_posted_excluded,
                returned: items.len(),
            },
            items,
        })
    }
}

/// Higher score first, then newer date; undated items after dated ones.
/// Used with a stable sort, so equal items keep their stored order.
fn rank_by_score_then_date(a: &Item, b: &Item) -> Ordering {
    b.rank_score()
        .cmp(&a.rank_score())
        .then_with(|| match (a.published_on(), b.published_on()) {
            (Some(da), Some(db)) => db.cmp(&da),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}
