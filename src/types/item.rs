//! Work items scanned from the source collection.

use serde::{Deserialize, Serialize};

/// One key/source-text pair to be processed.
///
/// Identity is `key`, which is unique within a source collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub key: String,
    pub source_text: String,
}

impl WorkItem {
    pub fn new(key: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source_text: source_text.into(),
        }
    }

    /// Size of the source text as sent over the wire (UTF-8 bytes).
    pub fn encoded_len(&self) -> usize {
        self.source_text.len()
    }

    /// Build items from ordered key/text pairs, keeping the given order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Vec<WorkItem>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        pairs.into_iter().map(|(k, v)| WorkItem::new(k, v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_len_counts_utf8_bytes() {
        assert_eq!(WorkItem::new("a", "Hello").encoded_len(), 5);
        // Cyrillic letters take two bytes each.
        assert_eq!(WorkItem::new("b", "Привіт").encoded_len(), 12);
        assert_eq!(WorkItem::new("c", "").encoded_len(), 0);
    }

    #[test]
    fn test_from_pairs_keeps_order() {
        let items = WorkItem::from_pairs([("z", "last"), ("a", "first")]);
        assert_eq!(items[0].key, "z");
        assert_eq!(items[1].source_text, "first");
    }
}
