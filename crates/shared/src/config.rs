use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

use crate::io::get_default_data_dir;
use crate::models::SelectionMode;

pub const DEFAULT_MAX_POST_CHARS: usize = 280;
pub const DEFAULT_SUCCESS_PREFIX: &str = "Successfully posted";

/// Settings for one pipeline invocation. Built once and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `<source>_results.json` and `tweets.json`
    pub data_dir: PathBuf,
    /// Research field label, carried for callers building queries
    pub field: String,
    pub default_mode: SelectionMode,
    pub default_min_score: Option<i64>,
    /// Let read-only paths treat an unparseable file as empty instead of failing
    pub tolerate_corrupt_reads: bool,
    pub max_post_chars: usize,
    pub publish_success_prefix: String,
}

impl Config {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            field: String::new(),
            default_mode: SelectionMode::Score,
            default_min_score: None,
            tolerate_corrupt_reads: false,
            max_post_chars: DEFAULT_MAX_POST_CHARS,
            publish_success_prefix: DEFAULT_SUCCESS_PREFIX.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let data_dir = match env::var("CURATOR_DATA_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => get_default_data_dir()?,
        };

        let mut config = Self::with_data_dir(data_dir);

        if let Ok(field) = env::var("CURATOR_FIELD") {
            config.field = field;
        }

        if let Ok(mode) = env::var("CURATOR_MODE") {
            config.default_mode = mode
                .parse::<SelectionMode>()
                .with_context(|| format!("CURATOR_MODE is invalid: {mode}"))?;
        }

        if let Ok(score) = env::var("CURATOR_MIN_SCORE") {
            let score: i64 = score
                .trim()
                .parse()
                .with_context(|| format!("CURATOR_MIN_SCORE must be an integer, got {score}"))?;
            config.default_min_score = Some(score);
        }

        if let Ok(flag) = env::var("CURATOR_TOLERATE_CORRUPT") {
            config.tolerate_corrupt_reads = parse_flag(&flag)
                .with_context(|| format!("CURATOR_TOLERATE_CORRUPT must be true or false, got {flag}"))?;
        }

        if let Ok(chars) = env::var("CURATOR_MAX_POST_CHARS") {
            config.max_post_chars = parse_max_post_chars(&chars)?;
        }

        Ok(config)
    }

    fn try_load_dotenv() {
        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/research-curator/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("research-curator").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => anyhow::bail!("unrecognized flag value"),
    }
}

/// Post length limit; zero is rejected.
fn parse_max_post_chars(raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|chars| *chars > 0)
        .with_context(|| format!("CURATOR_MAX_POST_CHARS must be a positive integer, got {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::with_data_dir("/tmp/curator");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/curator"));
        assert_eq!(config.default_mode, SelectionMode::Score);
        assert_eq!(config.max_post_chars, 280);
        assert!(!config.tolerate_corrupt_reads);
        assert_eq!(config.publish_success_prefix, "Successfully posted");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn test_max_post_chars_must_be_positive() {
        assert_eq!(parse_max_post_chars(" 500 ").unwrap(), 500);
        assert!(parse_max_post_chars("0").is_err());
        assert!(parse_max_post_chars("-5").is_err());
        assert!(parse_max_post_chars("lots").is_err());
    }
}
