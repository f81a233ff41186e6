//! 输出存储：键到处理后文本的映射接口，以及 JSON 字符串表与多语言翻译文件的实现。
//!
//! # Output Stores
//!
//! The core never assumes a backing format. It reads from a [`ReadStore`]
//! (the destination itself, or an optional peer used for the clone shortcut)
//! and writes results into an [`OutputStore`], always from the scheduler's
//! task and only between harvests.
//!
//! | Store | Description |
//! |-------|-------------|
//! | `HashMap` / `BTreeMap` | In-memory maps |
//! | [`StringMap`] | Flat map that keeps file order and saves sorted |
//! | [`JsonStringTable`] | A `{"key": "text"}` file (`Strings.json`) |
//! | [`TranslationsFile`] | A `{lang: {"Strings": {...}, "Percentage": n}}` file (`Translations.json`) |

mod table;
mod translations;

pub use table::JsonStringTable;
pub use translations::{FileFormat, LanguageEntry, TranslationsFile};

use crate::types::WorkItem;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Read access to a key → text mapping.
pub trait ReadStore {
    fn get(&self, key: &str) -> Option<&str>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable key → text mapping supplied by the caller.
pub trait OutputStore: ReadStore {
    fn set(&mut self, key: &str, value: String);
}

impl ReadStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
    fn len(&self) -> usize {
        HashMap::len(self)
    }
}

impl OutputStore for HashMap<String, String> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }
}

impl ReadStore for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        BTreeMap::get(self, key).map(String::as_str)
    }
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }
}

impl OutputStore for BTreeMap<String, String> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_string(), value);
    }
}

/// Flat key → text map.
///
/// Iteration follows the order keys were read or first inserted in, so a scan
/// walks a file top to bottom. Serialization always writes keys sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringMap(Map<String, Value>);

impl StringMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v)))
    }

    /// Work items in insertion order.
    pub fn to_work_items(&self) -> Vec<WorkItem> {
        WorkItem::from_pairs(self.iter())
    }
}

impl ReadStore for StringMap {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
    fn len(&self) -> usize {
        self.0.len()
    }
}

impl OutputStore for StringMap {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), Value::String(value));
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StringMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for StringMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        if let Some((key, _)) = map.iter().find(|(_, v)| !v.is_string()) {
            return Err(serde::de::Error::custom(format!(
                "value of {key:?} is not a string"
            )));
        }
        Ok(Self(map))
    }
}

impl Serialize for StringMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let sorted: BTreeMap<&str, &Value> = self.0.iter().map(|(k, v)| (k.as_str(), v)).collect();
        sorted.serialize(serializer)
    }
}

/// Render `value` as tab-indented JSON, non-ASCII characters unescaped.
pub(crate) fn to_tab_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| Error::runtime(e.to_string()))
}
