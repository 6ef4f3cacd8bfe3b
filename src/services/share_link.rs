use regex::Regex;

use crate::error::{AppError, Result};

/// Checks that a submitted url is a conversation share link.
#[derive(Debug, Clone)]
pub struct ShareLinkValidator {
    prefix: String,
    pattern: Regex,
}

impl ShareLinkValidator {
    pub fn new(prefix: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(
            r"^{}[A-Za-z0-9_-]+(?:[/?#]\S*)?$",
            regex::escape(prefix)
        ))
        .map_err(|e| AppError::Config(format!("invalid share url prefix {}: {}", prefix, e)))?;

        Ok(Self {
            prefix: prefix.to_string(),
            pattern,
        })
    }

    /// Returns the trimmed url when it has the share-link shape.
    pub fn validate<'a>(&self, url: &'a str) -> Result<&'a str> {
        let url = url.trim();
        if self.pattern.is_match(url) {
            Ok(url)
        } else {
            Err(AppError::InvalidInput(format!(
                "Invalid share URL format: expected a link starting with {}",
                self.prefix
            )))
        }
    }
}
