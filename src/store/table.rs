//! Flat `{"key": "text"}` string table file.

use super::{to_tab_json, OutputStore, ReadStore, StringMap};
use crate::{Error, ErrorContext, Result};
use std::path::{Path, PathBuf};

/// A flat `{"key": "text"}` JSON file held in memory.
///
/// Keys are scanned in file order; saving writes them sorted, tab-indented,
/// UTF-8 without escaping non-ASCII characters.
#[derive(Debug, Clone, Default)]
pub struct JsonStringTable {
    entries: StringMap,
    path: Option<PathBuf>,
}

impl JsonStringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: StringMap) -> Self {
        Self {
            entries,
            path: None,
        }
    }

    /// Load a table from disk. A missing file yields an empty table bound to `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self {
                entries: StringMap::new(),
                path: Some(path.to_path_buf()),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let mut table = Self::from_json_str(&content).map_err(|e| {
            Error::configuration_with_context(
                "string table is not a flat JSON object of strings",
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_details(e.to_string())
                    .with_source("json_string_table"),
            )
        })?;
        table.path = Some(path.to_path_buf());
        Ok(table)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(Self::from_entries(serde_json::from_str(content)?))
    }

    pub fn to_json_string(&self) -> Result<String> {
        to_tab_json(&self.entries)
    }

    /// Write the table to `path`, or to the path it was loaded from.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let target = path
            .map(Path::to_path_buf)
            .or_else(|| self.path.clone())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "no output path for string table",
                    ErrorContext::new().with_source("json_string_table"),
                )
            })?;
        std::fs::write(&target, self.to_json_string()?)?;
        Ok(target)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &StringMap {
        &self.entries
    }
}

impl ReadStore for JsonStringTable {
    fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key)
    }
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl OutputStore for JsonStringTable {
    fn set(&mut self, key: &str, value: String) {
        self.entries.set(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_table_parse_and_render() {
        let table = JsonStringTable::from_json_str(r#"{"b": "Welt", "a": "Привіт"}"#).unwrap();
        assert_eq!(table.get("a"), Some("Привіт"));
        let rendered = table.to_json_string().unwrap();
        assert_eq!(rendered, "{\n\t\"a\": \"Привіт\",\n\t\"b\": \"Welt\"\n}");
    }

    #[test]
    fn test_json_table_scans_in_file_order() {
        let table = JsonStringTable::from_json_str(r#"{"b": "Welt", "a": "Hallo"}"#).unwrap();
        let keys: Vec<String> = table
            .entries()
            .to_work_items()
            .into_iter()
            .map(|i| i.key)
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_json_table_rejects_nested_values() {
        assert!(JsonStringTable::from_json_str(r#"{"a": {"b": "c"}}"#).is_err());
    }

    #[test]
    fn test_json_table_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("transpool-store-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("Strings_de.json");

        let mut table = JsonStringTable::load(&path).unwrap();
        assert!(table.is_empty());
        table.set("greeting", "Hallo".to_string());
        let written = table.save(None).unwrap();
        assert_eq!(written, path);

        let reloaded = JsonStringTable::load(&path).unwrap();
        assert_eq!(reloaded.get("greeting"), Some("Hallo"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_save_without_path_fails() {
        let table = JsonStringTable::new();
        assert!(table.save(None).is_err());
    }
}
