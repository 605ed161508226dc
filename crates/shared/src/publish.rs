use crate::error::{CurateError, Result};

/// External social-post action. Returns the collaborator's status line,
/// e.g. `"Successfully posted to X"` or `"Error posting to X: ..."`.
pub trait Publisher {
    fn publish(&mut self, content: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    Posted,
    Failed(String),
}

impl PublishStatus {
    /// Only a status starting with `success_prefix` counts as posted.
    pub fn interpret(status: &str, success_prefix: &str) -> Self {
        if status.trim_start().starts_with(success_prefix) {
            PublishStatus::Posted
        } else {
            PublishStatus::Failed(status.to_string())
        }
    }

    pub fn is_posted(&self) -> bool {
        matches!(self, PublishStatus::Posted)
    }
}

/// Reject content the publish collaborator would refuse anyway.
pub fn validate_post_content(content: &str, max_chars: usize) -> Result<()> {
    if content.trim().is_empty() {
        return Err(CurateError::InvalidContent("content cannot be empty".to_string()));
    }
    let length = content.chars().count();
    if length > max_chars {
        return Err(CurateError::InvalidContent(format!(
            "content is {length} characters, limit is {max_chars}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_status() {
        let prefix = "Successfully posted";
        assert!(PublishStatus::interpret("Successfully posted to X", prefix).is_posted());
        assert_eq!(
            PublishStatus::interpret("Error posting to X: 403 Forbidden", prefix),
            PublishStatus::Failed("Error posting to X: 403 Forbidden".to_string())
        );
        assert!(!PublishStatus::interpret("", prefix).is_posted());
    }

    #[test]
    fn test_content_limits() {
        assert!(validate_post_content("hello", 280).is_ok());
        assert!(validate_post_content("   ", 280).is_err());
        assert!(validate_post_content(&"x".repeat(281), 280).is_err());
        // characters, not bytes
        assert!(validate_post_content(&"é".repeat(280), 280).is_ok());
    }
}
