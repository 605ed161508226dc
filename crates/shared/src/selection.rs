use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Item, SelectionMode, MISSING_SCORE};

/// Outcome of choosing one item to publish.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Selection<'a> {
    Chosen {
        item: &'a Item,
        requested: SelectionMode,
        /// Mode that actually ranked the winner
        applied: SelectionMode,
        fallback: bool,
    },
    Empty {
        reason: String,
    },
}

impl<'a> Selection<'a> {
    pub fn item(&self) -> Option<&'a Item> {
        match self {
            Selection::Chosen { item, .. } => Some(*item),
            Selection::Empty { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Selection::Chosen { fallback: true, .. })
    }
}

/// Pick the single best item.
///
/// `Score` ranks by usefulness score, then newer date. `Date` ranks by newest
/// date, then higher score. When nothing carries the requested signal (all
/// scores missing, or no parseable dates) the other mode is applied and the
/// outcome is marked as a fallback. Ties go to the earliest item in `items`.
pub fn select_best(items: &[Item], mode: SelectionMode) -> Selection<'_> {
    let applied = match mode {
        SelectionMode::Score if items.iter().all(|i| i.rank_score() == MISSING_SCORE) => {
            SelectionMode::Date
        }
        SelectionMode::Date if items.iter().all(|i| i.published_on().is_none()) => {
            SelectionMode::Score
        }
        _ => mode,
    };

    let best = match applied {
        SelectionMode::Score => first_max_by_key(items, score_key),
        SelectionMode::Date => first_max_by_key(items, date_key),
    };

    let Some(item) = best else {
        return Selection::Empty {
            reason: "No candidate items to select from".to_string(),
        };
    };

    Selection::Chosen {
        item,
        requested: mode,
        applied,
        fallback: applied != mode,
    }
}

// Option orders None below Some, so undated items lose date ties.
fn score_key(item: &Item) -> (i32, Option<NaiveDate>) {
    (item.rank_score(), item.published_on())
}

fn date_key(item: &Item) -> (Option<NaiveDate>, i32) {
    (item.published_on(), item.rank_score())
}

/// Like `Iterator::max_by_key`, but the first maximum wins instead of the last.
fn first_max_by_key<'a, K: Ord>(items: &'a [Item], key: impl Fn(&Item) -> K) -> Option<&'a Item> {
    let mut best: Option<(&'a Item, K)> = None;
    for item in items {
        let k = key(item);
        if best.as_ref().map_or(true, |(_, top)| k > *top) {
            best = Some((item, k));
        }
    }
    best.map(|(item, _)| item)
}
