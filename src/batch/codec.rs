//! Packing several texts into one transform call and unpacking the reply.

use crate::{Error, ErrorContext, Result};
use regex::Regex;

/// Default separator. Chosen to be unlikely in ordinary UI strings.
pub const DEFAULT_DELIMITER: &str = ".ยง ";

/// Joins item texts with a delimiter and splits the combined output back.
///
/// Remote services tend to reflow whitespace around punctuation, so a codec can
/// be switched to a tolerant split that accepts any whitespace between the
/// delimiter's visible characters. Around the visible part it consumes at most
/// the whitespace the delimiter itself carries, so leading and trailing
/// whitespace of the items survives the round trip.
#[derive(Debug, Clone)]
pub struct BatchCodec {
    delimiter: String,
    tolerant: Option<Regex>,
}

impl BatchCodec {
    pub fn new(delimiter: impl Into<String>) -> Result<Self> {
        let delimiter = delimiter.into();
        if delimiter.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "delimiter must contain at least one visible character",
                ErrorContext::new()
                    .with_field_path("delimiter")
                    .with_source("batch_codec"),
            ));
        }
        Ok(Self {
            delimiter,
            tolerant: None,
        })
    }

    /// Enable or disable whitespace-tolerant splitting.
    pub fn with_tolerant_split(mut self, enabled: bool) -> Result<Self> {
        self.tolerant = if enabled {
            Some(Self::tolerant_pattern(&self.delimiter)?)
        } else {
            None
        };
        Ok(self)
    }

    fn tolerant_pattern(delimiter: &str) -> Result<Regex> {
        let visible: Vec<String> = delimiter
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| regex::escape(&c.to_string()))
            .collect();
        let leading = delimiter.chars().take_while(|c| c.is_whitespace()).count();
        let trailing = delimiter.chars().rev().take_while(|c| c.is_whitespace()).count();
        let pattern = format!(
            "{}{}{}",
            "\\s?".repeat(leading),
            visible.join("\\s*"),
            "\\s?".repeat(trailing)
        );
        Regex::new(&pattern).map_err(|e| {
            Error::configuration_with_context(
                "cannot build tolerant split pattern",
                ErrorContext::new()
                    .with_field_path("delimiter")
                    .with_details(e.to_string()),
            )
        })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn is_tolerant(&self) -> bool {
        self.tolerant.is_some()
    }

    pub fn join<'a, I>(&self, texts: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = String::new();
        for (i, text) in texts.into_iter().enumerate() {
            if i > 0 {
                out.push_str(&self.delimiter);
            }
            out.push_str(text);
        }
        out
    }

    pub fn split(&self, combined: &str) -> Vec<String> {
        match &self.tolerant {
            Some(re) => re.split(combined).map(str::to_string).collect(),
            None => combined
                .split(self.delimiter.as_str())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl Default for BatchCodec {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            tolerant: None,
        }
    }
}
