//! Multi-language `Translations.json` container.

use super::{to_tab_json, ReadStore, StringMap};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One language inside a translations file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageEntry {
    #[serde(rename = "Strings", default)]
    pub strings: StringMap,

    /// Share of the reference string set this language covers, 0..=100.
    #[serde(rename = "Percentage", default, deserialize_with = "percentage_from_any")]
    pub percentage: u32,

    /// Fields this crate does not interpret, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LanguageEntry {
    /// Size of the full string set, extrapolated from the strings present and
    /// the recorded percentage.
    pub fn estimated_total(&self) -> usize {
        let len = self.strings.len();
        match self.percentage {
            0 | 100.. => len,
            pct => len * 100 / pct as usize,
        }
    }

    /// Same entry metadata with no strings.
    pub fn emptied(&self) -> Self {
        Self {
            strings: StringMap::new(),
            percentage: 0,
            extra: self.extra.clone(),
        }
    }
}

fn percentage_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let pct = match &value {
        Value::Null => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid percentage {s:?}")))?,
        other => {
            return Err(serde::de::Error::custom(format!("invalid percentage {other}")));
        }
    };
    Ok(pct.clamp(0.0, 100.0) as u32)
}

/// Which shape a JSON input file has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Flat `{"key": "text"}`.
    StringTable,
    /// `{lang: {"Strings": {...}, "Percentage": n}}`.
    Translations,
}

impl FileFormat {
    pub fn detect(content: &str) -> Result<FileFormat> {
        let root: Map<String, Value> = serde_json::from_str(content)?;
        if !root.is_empty() && root.values().all(Value::is_object) {
            Ok(FileFormat::Translations)
        } else {
            Ok(FileFormat::StringTable)
        }
    }
}

/// A `Translations.json` file: per-language string sets with a completion
/// percentage each.
///
/// Languages keep file order in memory. Saving writes languages and fields
/// sorted, tab-indented, non-ASCII characters unescaped.
#[derive(Debug, Clone, Default)]
pub struct TranslationsFile {
    languages: Vec<(String, LanguageEntry)>,
    path: Option<PathBuf>,
}

impl TranslationsFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file from disk. A missing file yields an empty container bound to `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self {
                languages: Vec::new(),
                path: Some(path.to_path_buf()),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let mut file = Self::from_json_str(&content).map_err(|e| {
            Error::configuration_with_context(
                "translations file is not a map of language entries",
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_details(e.to_string())
                    .with_source("translations_file"),
            )
        })?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let root: Map<String, Value> = serde_json::from_str(content)?;
        let languages = root
            .into_iter()
            .map(|(code, value)| -> Result<(String, LanguageEntry)> {
                Ok((code, serde_json::from_value(value)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            languages,
            path: None,
        })
    }

    pub fn to_json_string(&self) -> Result<String> {
        let mut sorted: BTreeMap<&str, BTreeMap<String, Value>> = BTreeMap::new();
        for (code, entry) in &self.languages {
            let fields = match serde_json::to_value(entry)? {
                Value::Object(map) => map.into_iter().collect(),
                _ => BTreeMap::new(),
            };
            sorted.insert(code.as_str(), fields);
        }
        to_tab_json(&sorted)
    }

    /// Write the file to `path`, or to the path it was loaded from.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let target = path
            .map(Path::to_path_buf)
            .or_else(|| self.path.clone())
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "no output path for translations file",
                    ErrorContext::new().with_source("translations_file"),
                )
            })?;
        std::fs::write(&target, self.to_json_string()?)?;
        Ok(target)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Language codes in file order.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.iter().map(|(code, _)| code.as_str())
    }

    pub fn language(&self, code: &str) -> Option<&LanguageEntry> {
        self.languages
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, entry)| entry)
    }

    /// Entry for `code`, appended empty if absent.
    pub fn language_mut(&mut self, code: &str) -> &mut LanguageEntry {
        let idx = match self.languages.iter().position(|(c, _)| c == code) {
            Some(idx) => idx,
            None => {
                self.languages.push((code.to_string(), LanguageEntry::default()));
                self.languages.len() - 1
            }
        };
        &mut self.languages[idx].1
    }

    pub fn set_language(&mut self, code: &str, entry: LanguageEntry) {
        *self.language_mut(code) = entry;
    }

    pub fn strings(&self, code: &str) -> Option<&StringMap> {
        self.language(code).map(|entry| &entry.strings)
    }

    pub fn strings_mut(&mut self, code: &str) -> &mut StringMap {
        &mut self.language_mut(code).strings
    }

    /// First fully translated language other than `exclude`.
    pub fn complete_language(&self, exclude: &str) -> Option<&str> {
        self.languages
            .iter()
            .find(|(code, entry)| code != exclude && entry.percentage >= 100 && !entry.strings.is_empty())
            .map(|(code, _)| code.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OutputStore;

    const SAMPLE: &str = r#"{
        "uk": {"Strings": {"b": "Б", "a": ""}, "Percentage": 40, "Name": "Українська"},
        "en": {"Strings": {"b": "B", "a": "A"}, "Percentage": 100}
    }"#;

    #[test]
    fn test_translations_keep_file_order() {
        let file = TranslationsFile::from_json_str(SAMPLE).unwrap();
        assert_eq!(file.languages().collect::<Vec<_>>(), vec!["uk", "en"]);
        let keys: Vec<&str> = file.strings("en").unwrap().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(file.language("uk").unwrap().percentage, 40);
        assert!(file.language("fr").is_none());
    }

    #[test]
    fn test_percentage_accepts_loose_numbers() {
        let file = TranslationsFile::from_json_str(
            r#"{"a": {"Percentage": 57.9}, "b": {"Percentage": "33"}, "c": {"Percentage": null}, "d": {"Percentage": 250}}"#,
        )
        .unwrap();
        assert_eq!(file.language("a").unwrap().percentage, 57);
        assert_eq!(file.language("b").unwrap().percentage, 33);
        assert_eq!(file.language("c").unwrap().percentage, 0);
        assert_eq!(file.language("d").unwrap().percentage, 100);
        assert!(TranslationsFile::from_json_str(r#"{"a": {"Percentage": "lots"}}"#).is_err());
    }

    #[test]
    fn test_estimated_total() {
        let mut entry = LanguageEntry {
            strings: [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect(),
            percentage: 60,
            ..Default::default()
        };
        assert_eq!(entry.estimated_total(), 5);
        entry.percentage = 100;
        assert_eq!(entry.estimated_total(), 3);
        entry.percentage = 0;
        assert_eq!(entry.estimated_total(), 3);
    }

    #[test]
    fn test_strings_mut_adds_language() {
        let mut file = TranslationsFile::from_json_str(SAMPLE).unwrap();
        file.strings_mut("de").set("a", "Ä".to_string());
        assert_eq!(file.languages().last(), Some("de"));
        assert_eq!(file.strings("de").unwrap().get("a"), Some("Ä"));
        assert_eq!(file.language("de").unwrap().percentage, 0);
    }

    #[test]
    fn test_complete_language() {
        let file = TranslationsFile::from_json_str(SAMPLE).unwrap();
        assert_eq!(file.complete_language("uk"), Some("en"));
        assert_eq!(file.complete_language("en"), None);
    }

    #[test]
    fn test_save_keeps_extra_fields_sorted() {
        let mut file = TranslationsFile::from_json_str(SAMPLE).unwrap();
        file.language_mut("uk").percentage = 75;

        let rendered = file.to_json_string().unwrap();
        assert!(rendered.find("\"en\"").unwrap() < rendered.find("\"uk\"").unwrap());
        assert!(rendered.contains("\t\t\"Name\": \"Українська\""));

        let dir = std::env::temp_dir().join(format!("transpool-translations-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("Translations_uk.json");
        file.save(Some(&path)).unwrap();

        let reloaded = TranslationsFile::load(&path).unwrap();
        let uk = reloaded.language("uk").unwrap();
        assert_eq!(uk.percentage, 75);
        assert_eq!(uk.extra.get("Name"), Some(&Value::from("Українська")));
        assert_eq!(uk.strings.get("b"), Some("Б"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_emptied_entry_keeps_metadata() {
        let file = TranslationsFile::from_json_str(SAMPLE).unwrap();
        let seed = file.language("uk").unwrap().emptied();
        assert!(seed.strings.is_empty());
        assert_eq!(seed.percentage, 0);
        assert!(seed.extra.contains_key("Name"));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(FileFormat::detect(SAMPLE).unwrap(), FileFormat::Translations);
        assert_eq!(FileFormat::detect(r#"{"a": "b"}"#).unwrap(), FileFormat::StringTable);
        assert_eq!(FileFormat::detect("{}").unwrap(), FileFormat::StringTable);
        assert!(FileFormat::detect("[1, 2]").is_err());
    }
}
