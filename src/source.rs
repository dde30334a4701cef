//! Reference-data source registry.
//!
//! Each source publishes its catalog paginated by a key space: alphabetical
//! index pages keyed by a letter, or plain numeric pages. A source's
//! capabilities (categories offered, key validation/expansion, entry
//! extraction from a fetched segment document) live behind `SourceOps` so the
//! pipeline treats every source uniformly.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid key '{key}' for source '{source_name}'")]
    InvalidKey { source_name: &'static str, key: String },
    #[error("invalid key range '{spec}' for source '{source_name}'")]
    InvalidRange { source_name: &'static str, spec: String },
    #[error("malformed segment document: {0}")]
    MalformedSegment(String),
}

/// One catalog entry as listed by a source: a display name plus the
/// source-relative link to the entry's page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub link: Option<String>,
}

/// Capabilities of one reference-data source.
pub trait SourceOps: Sync {
    /// Stable source name, used as lookup-table key and provenance tag.
    fn name(&self) -> &'static str;

    /// Entity categories this source publishes.
    fn categories(&self) -> &'static [&'static str];

    /// Whether a single key is valid in this source's key space.
    fn valid_key(&self, key: &str) -> bool;

    /// Expand a key spec (single key, comma list, or range like "a-f" /
    /// "3-17") into the concrete key list, validating every member.
    fn expand_keys(&self, spec: &str) -> Result<Vec<String>, SourceError>;

    /// The full default key list used when no spec is given.
    fn default_keys(&self) -> Vec<String>;

    /// Pull the entry list out of a fetched segment document.
    fn extract_entries(&self, doc: &Value) -> Result<Vec<Entry>, SourceError>;
}

// ============================================================================
// Entry Extraction
// ============================================================================

/// Segments are either a bare JSON array of entry objects or an object with
/// the array under "items". Each entry object carries "name" and optionally
/// "link".
fn extract_json_entries(source: &'static str, doc: &Value) -> Result<Vec<Entry>, SourceError> {
    let items = match doc {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("items") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => {
                return Err(SourceError::MalformedSegment(format!(
                    "{}: expected array or object with 'items'",
                    source
                )))
            }
        },
        _ => {
            return Err(SourceError::MalformedSegment(format!(
                "{}: expected array or object with 'items'",
                source
            )))
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SourceError::MalformedSegment(format!("{}: entry {} has no 'name'", source, i))
            })?;
        let link = item.get("link").and_then(Value::as_str).map(str::to_string);
        entries.push(Entry { name: name.to_string(), link });
    }
    Ok(entries)
}

// ============================================================================
// Letter Key Space
// ============================================================================

static LETTER_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z])-([a-z])$").unwrap());

/// Source indexed by last-name initial, keys "a" through "z".
pub struct LetterKeySource {
    name: &'static str,
    categories: &'static [&'static str],
}

impl SourceOps for LetterKeySource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn categories(&self) -> &'static [&'static str] {
        self.categories
    }

    fn valid_key(&self, key: &str) -> bool {
        key.len() == 1 && key.chars().all(|c| c.is_ascii_lowercase())
    }

    fn expand_keys(&self, spec: &str) -> Result<Vec<String>, SourceError> {
        if let Some(m) = LETTER_RANGE.captures(spec) {
            let (from, to) = (m[1].as_bytes()[0], m[2].as_bytes()[0]);
            if from > to {
                return Err(SourceError::InvalidRange {
                    source_name: self.name,
                    spec: spec.to_string(),
                });
            }
            return Ok((from..=to).map(|b| (b as char).to_string()).collect());
        }
        let mut keys = Vec::new();
        for key in spec.split(',') {
            let key = key.trim();
            if !self.valid_key(key) {
                return Err(SourceError::InvalidKey {
                    source_name: self.name,
                    key: key.to_string(),
                });
            }
            keys.push(key.to_string());
        }
        Ok(keys)
    }

    fn default_keys(&self) -> Vec<String> {
        (b'a'..=b'z').map(|b| (b as char).to_string()).collect()
    }

    fn extract_entries(&self, doc: &Value) -> Result<Vec<Entry>, SourceError> {
        extract_json_entries(self.name, doc)
    }
}

// ============================================================================
// Page Key Space
// ============================================================================

static PAGE_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]+)-([0-9]+)$").unwrap());

/// Source indexed by 1-based numeric page.
pub struct PageKeySource {
    name: &'static str,
    categories: &'static [&'static str],
    default_pages: u32,
}

impl SourceOps for PageKeySource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn categories(&self) -> &'static [&'static str] {
        self.categories
    }

    fn valid_key(&self, key: &str) -> bool {
        !key.is_empty()
            && key.chars().all(|c| c.is_ascii_digit())
            && key.parse::<u32>().map_or(false, |n| n >= 1)
    }

    fn expand_keys(&self, spec: &str) -> Result<Vec<String>, SourceError> {
        if let Some(m) = PAGE_RANGE.captures(spec) {
            let from: u32 = m[1].parse().map_err(|_| SourceError::InvalidRange {
                source_name: self.name,
                spec: spec.to_string(),
            })?;
            let to: u32 = m[2].parse().map_err(|_| SourceError::InvalidRange {
                source_name: self.name,
                spec: spec.to_string(),
            })?;
            if from < 1 || from > to {
                return Err(SourceError::InvalidRange {
                    source_name: self.name,
                    spec: spec.to_string(),
                });
            }
            return Ok((from..=to).map(|n| n.to_string()).collect());
        }
        let mut keys = Vec::new();
        for key in spec.split(',') {
            let key = key.trim();
            if !self.valid_key(key) {
                return Err(SourceError::InvalidKey {
                    source_name: self.name,
                    key: key.to_string(),
                });
            }
            keys.push(key.to_string());
        }
        Ok(keys)
    }

    fn default_keys(&self) -> Vec<String> {
        (1..=self.default_pages).map(|n| n.to_string()).collect()
    }

    fn extract_entries(&self, doc: &Value) -> Result<Vec<Entry>, SourceError> {
        extract_json_entries(self.name, doc)
    }
}

// ============================================================================
// Registry
// ============================================================================

static CLMU: PageKeySource = PageKeySource {
    name: "clmu",
    categories: &["composer", "conductor", "performer"],
    default_pages: 40,
};
static IMSLP: LetterKeySource =
    LetterKeySource { name: "imslp", categories: &["composer"] };
static PRESTO: LetterKeySource =
    LetterKeySource { name: "presto", categories: &["composer", "conductor", "performer"] };
static ARKIV: LetterKeySource =
    LetterKeySource { name: "arkiv", categories: &["composer", "conductor"] };
static OPENOPUS: LetterKeySource =
    LetterKeySource { name: "openopus", categories: &["composer"] };

/// Look up a source by name. Unknown names are a caller error surfaced as
/// None (the CLI reports the known list).
pub fn source_ops(name: &str) -> Option<&'static dyn SourceOps> {
    match name {
        "clmu" => Some(&CLMU),
        "imslp" => Some(&IMSLP),
        "presto" => Some(&PRESTO),
        "arkiv" => Some(&ARKIV),
        "openopus" => Some(&OPENOPUS),
        _ => None,
    }
}

pub const SOURCE_NAMES: &[&str] = &["clmu", "imslp", "presto", "arkiv", "openopus"];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_letter_key_validation() {
        let src = source_ops("imslp").unwrap();
        assert!(src.valid_key("a"));
        assert!(src.valid_key("z"));
        assert!(!src.valid_key("A"));
        assert!(!src.valid_key("ab"));
        assert!(!src.valid_key("1"));
        assert!(!src.valid_key(""));
    }

    #[test]
    fn test_letter_key_expansion() {
        let src = source_ops("imslp").unwrap();
        assert_eq!(src.expand_keys("c").unwrap(), vec!["c"]);
        assert_eq!(src.expand_keys("a-d").unwrap(), vec!["a", "b", "c", "d"]);
        assert_eq!(src.expand_keys("a,c,f").unwrap(), vec!["a", "c", "f"]);
        assert!(matches!(
            src.expand_keys("d-a").unwrap_err(),
            SourceError::InvalidRange { .. }
        ));
        assert!(matches!(
            src.expand_keys("a,7").unwrap_err(),
            SourceError::InvalidKey { .. }
        ));
        assert_eq!(src.default_keys().len(), 26);
    }

    #[test]
    fn test_page_key_validation_and_expansion() {
        let src = source_ops("clmu").unwrap();
        assert!(src.valid_key("1"));
        assert!(src.valid_key("37"));
        assert!(!src.valid_key("0"));
        assert!(!src.valid_key("a"));
        assert!(!src.valid_key(""));

        assert_eq!(src.expand_keys("3").unwrap(), vec!["3"]);
        assert_eq!(src.expand_keys("3-6").unwrap(), vec!["3", "4", "5", "6"]);
        assert_eq!(src.expand_keys("1,5,9").unwrap(), vec!["1", "5", "9"]);
        assert!(matches!(
            src.expand_keys("6-3").unwrap_err(),
            SourceError::InvalidRange { .. }
        ));
        assert!(matches!(
            src.expand_keys("0-3").unwrap_err(),
            SourceError::InvalidRange { .. }
        ));
        assert_eq!(src.default_keys().len(), 40);
    }

    #[test]
    fn test_registry_lookup() {
        assert!(source_ops("clmu").is_some());
        assert!(source_ops("unknown").is_none());
        for name in SOURCE_NAMES {
            let src = source_ops(name).unwrap();
            assert_eq!(src.name(), *name);
            assert!(src.categories().contains(&"composer"));
        }
    }

    #[test]
    fn test_extract_entries_array() {
        let src = source_ops("imslp").unwrap();
        let doc = json!([
            {"name": "Bach, Johann Sebastian", "link": "/composer/bach"},
            {"name": "Buxtehude, Dieterich"},
        ]);
        let entries = src.extract_entries(&doc).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Bach, Johann Sebastian");
        assert_eq!(entries[0].link.as_deref(), Some("/composer/bach"));
        assert_eq!(entries[1].link, None);
    }

    #[test]
    fn test_extract_entries_items_object() {
        let src = source_ops("clmu").unwrap();
        let doc = json!({"items": [{"name": "Fauré, Gabriel", "link": "/p/faure"}], "page": 3});
        let entries = src.extract_entries(&doc).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_extract_entries_malformed() {
        let src = source_ops("clmu").unwrap();
        assert!(src.extract_entries(&json!("nope")).is_err());
        assert!(src.extract_entries(&json!([{"link": "/x"}])).is_err());
        assert!(src.extract_entries(&json!({"rows": []})).is_err());
    }
}
