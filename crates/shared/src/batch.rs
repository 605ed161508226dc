use serde_json::{Map, Value};
use url::Url;

use crate::error::BatchError;
use crate::models::{Item, Source};

/// Validate a fetch collaborator's output and turn it into items for `source`.
///
/// Expects `{"results": [...]}`. Every entry must fit the [`Item`] schema, or the
/// whole batch is rejected so that nothing is partially merged.
pub fn parse_batch(source: Source, content: &str) -> Result<Vec<Item>, BatchError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| BatchError::InvalidJson(e.to_string()))?;
    parse_batch_value(source, value)
}

pub fn parse_batch_value(source: Source, value: Value) -> Result<Vec<Item>, BatchError> {
    let Value::Object(mut object) = value else {
        return Err(BatchError::WrongShape);
    };

    let Some(Value::Array(entries)) = object.remove("results") else {
        return Err(BatchError::WrongShape);
    };

    if entries.is_empty() {
        if let Some(Value::String(error)) = object.get("error") {
            if !error.trim().is_empty() {
                return Err(BatchError::Collaborator(error.clone()));
            }
        }
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(source, index, entry))
        .collect()
}

/// Deserialize one stored or incoming entry, filling in `source` when absent.
pub(crate) fn parse_entry(source: Source, index: usize, entry: Value) -> Result<Item, BatchError> {
    let Value::Object(mut fields) = entry else {
        return Err(BatchError::Entry {
            index,
            reason: "entry is not an object".to_string(),
        });
    };

    let tagged = fill_source(&mut fields, source);

    let item: Item = serde_json::from_value(Value::Object(fields)).map_err(|e| BatchError::Entry {
        index,
        reason: e.to_string(),
    })?;

    if tagged && item.source != source {
        return Err(BatchError::SourceMismatch {
            index,
            expected: source,
            found: item.source,
        });
    }

    validate_url(&item.url).map_err(|reason| BatchError::Entry { index, reason })?;

    Ok(item)
}

/// Returns true when the entry already carried its own source tag.
fn fill_source(fields: &mut Map<String, Value>, source: Source) -> bool {
    match fields.get("source") {
        Some(Value::Null) | None => {
            fields.insert("source".to_string(), Value::String(source.to_string()));
            false
        }
        Some(_) => true,
    }
}

fn validate_url(raw: &str) -> Result<(), String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("url is empty".to_string());
    }
    let parsed = Url::parse(trimmed).map_err(|e| format!("url '{raw}' is invalid: {e}"))?;
    if parsed.cannot_be_a_base() {
        return Err(format!("url '{raw}' is not an absolute link"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_batch() {
        let content = r#"{"results": [
            {"source": "arxiv", "title": "A", "authors": ["X"], "publish_date": "01-02-2025",
             "summary": "s", "url": "http://arxiv.org/abs/2502.00001v1"},
            {"title": "B", "url": "http://arxiv.org/abs/2502.00002v1", "usefulness_score": 80}
        ]}"#;
        let items = parse_batch(Source::Arxiv, content).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].source, Source::Arxiv);
        assert_eq!(items[1].usefulness_score, Some(80));
    }

    #[test]
    fn test_invalid_json_string() {
        assert!(matches!(
            parse_batch(Source::Blog, "{results: oops"),
            Err(BatchError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_wrong_shapes() {
        for value in [json!([]), json!({"items": []}), json!({"results": {}}), json!("x")] {
            assert!(matches!(
                parse_batch_value(Source::Blog, value),
                Err(BatchError::WrongShape)
            ));
        }
    }

    #[test]
    fn test_collaborator_error_surfaced() {
        let value = json!({"results": [], "error": "No papers found for query 'x' in 2025"});
        match parse_batch_value(Source::Arxiv, value) {
            Err(BatchError::Collaborator(msg)) => assert!(msg.contains("No papers found")),
            other => panic!("expected collaborator error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_results_without_error_is_ok() {
        let items = parse_batch_value(Source::Arxiv, json!({"results": []})).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_one_bad_entry_rejects_batch() {
        let value = json!({"results": [
            {"title": "ok", "url": "https://example.com/a"},
            {"title": "missing url"}
        ]});
        match parse_batch_value(Source::Blog, value) {
            Err(BatchError::Entry { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected entry error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_or_relative_url_rejected() {
        for url in ["", "   ", "/relative/path", "mailto:someone@example.com"] {
            let value = json!({"results": [{"title": "t", "url": url}]});
            assert!(
                matches!(parse_batch_value(Source::Blog, value), Err(BatchError::Entry { .. })),
                "url {url:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_source_mismatch_rejected() {
        let value = json!({"results": [{"source": "blog", "title": "t", "url": "https://example.com"}]});
        assert!(matches!(
            parse_batch_value(Source::Arxiv, value),
            Err(BatchError::SourceMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn test_gscholar_capitalized_tag_accepted() {
        let value = json!({"results": [{
            "source": "Gscholar",
            "title": "t",
            "authors": "A, B",
            "Publish_date": "2024/03/01",
            "abstract": "a",
            "url": "https://scholar.example.org/citation?id=1"
        }]});
        let items = parse_batch_value(Source::Gscholar, value).unwrap();
        assert_eq!(items[0].summary, "a");
    }
}
