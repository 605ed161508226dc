use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::dates::parse_publish_date;
use crate::error::CurateError;

/// Rank given to items whose usefulness score is missing or invalid.
pub const MISSING_SCORE: i32 = -1;

/// Upstream content origin. Each source has its own persisted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Arxiv,
    Blog,
    Gscholar,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Arxiv, Source::Blog, Source::Gscholar];

    pub fn storage_key(&self) -> &'static str {
        match self {
            Source::Arxiv => "arxiv",
            Source::Blog => "blog",
            Source::Gscholar => "gscholar",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_results.json", self.storage_key())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_key())
    }
}

impl FromStr for Source {
    type Err = CurateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arxiv" => Ok(Source::Arxiv),
            "blog" => Ok(Source::Blog),
            "gscholar" => Ok(Source::Gscholar),
            _ => Err(CurateError::UnknownSource(s.to_string())),
        }
    }
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.storage_key())
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Which collections a filter pass reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSelector {
    One(Source),
    All,
}

impl SourceSelector {
    pub fn sources(&self) -> Vec<Source> {
        match self {
            SourceSelector::One(source) => vec![*source],
            SourceSelector::All => Source::ALL.to_vec(),
        }
    }
}

impl fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSelector::One(source) => source.fmt(f),
            SourceSelector::All => f.write_str("all"),
        }
    }
}

impl FromStr for SourceSelector {
    type Err = CurateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(SourceSelector::All)
        } else {
            s.parse().map(SourceSelector::One)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Date,
    Score,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::Date => f.write_str("date"),
            SelectionMode::Score => f.write_str("score"),
        }
    }
}

impl FromStr for SelectionMode {
    type Err = CurateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SelectionMode::Date),
            "score" => Ok(SelectionMode::Score),
            _ => Err(CurateError::UnknownMode(s.to_string())),
        }
    }
}

/// A candidate paper or post as stored in a source collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub source: Source,
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_authors")]
    pub authors: Vec<String>,
    /// Raw upstream text; see [`Item::published_on`].
    #[serde(
        default,
        alias = "Publish_date",
        deserialize_with = "deserialize_publish_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub publish_date: Option<String>,
    #[serde(default, alias = "abstract")]
    pub summary: String,
    pub url: String,
    #[serde(
        default,
        deserialize_with = "deserialize_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub usefulness_score: Option<u8>,
}

impl Item {
    pub fn published_on(&self) -> Option<NaiveDate> {
        self.publish_date.as_deref().and_then(parse_publish_date)
    }

    /// Score used for ranking and thresholds; [`MISSING_SCORE`] when absent.
    pub fn rank_score(&self) -> i32 {
        self.usefulness_score
            .map(i32::from)
            .unwrap_or(MISSING_SCORE)
    }

    pub fn identity(&self) -> String {
        crate::normalize::normalize(&self.url)
    }
}

/// One published item in the posting ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub url: String,
    #[serde(default)]
    pub posting_reason: String,
}

fn deserialize_authors<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect()),
        Value::Array(values) => values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                other => Err(serde::de::Error::custom(format!(
                    "author must be a string, got {other}"
                ))),
            })
            .collect(),
        other => Err(serde::de::Error::custom(format!(
            "authors must be a list or a string, got {other}"
        ))),
    }
}

fn deserialize_publish_date<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Scores arrive as ints, floats, or numeric strings. Anything that is not an
/// integer in 0..=100 is treated as missing rather than failing the record.
fn deserialize_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(score_from_value(&value))
}

pub(crate) fn score_from_value(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    u8::try_from(n).ok().filter(|score| *score <= 100)
}
