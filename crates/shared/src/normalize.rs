use regex::Regex;
use std::sync::LazyLock;

static ARXIV_ABS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^http://(?:www\.)?arxiv\.org/abs/([^?#]+)").expect("valid arxiv abs regex")
});

static ARXIV_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}\.\d{4,5})(?:v\d+)?$").expect("valid arxiv id regex")
});

/// Canonical identity key for a source URL.
///
/// Scheme (`http`/`https`) and case are folded. arXiv abstract pages collapse
/// to `arxiv:<id>` with any `vN` suffix dropped, so every version of a paper
/// shares one key. Total and idempotent: `normalize(&normalize(u)) == normalize(u)`.
pub fn normalize(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    if lowered.is_empty() {
        return lowered;
    }

    let folded = match lowered.strip_prefix("https://") {
        Some(rest) => format!("http://{rest}"),
        None => lowered,
    };

    if let Some(caps) = ARXIV_ABS.captures(&folded) {
        let tail = caps[1].trim_end_matches('/');
        return match ARXIV_ID.captures(tail) {
            Some(id) => format!("arxiv:{}", &id[1]),
            None => format!("arxiv:{tail}"),
        };
    }

    folded
}
