//! Decision tags.
//!
//! Tags are key/value annotations attached to every decision so the host
//! can record what the evaluation service detected. They never affect
//! control flow.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Detector names whose findings were reported.
pub const TAG_REPORTS: &str = "pangea-ai-guard-reports";

/// Detector names whose findings were redacted.
pub const TAG_REDACTIONS: &str = "pangea-ai-guard-redactions";

/// `"true"` when the verdict rewrote content.
pub const TAG_MODIFIED: &str = "pangea-ai-guard-modified";

/// Detector names that blocked the exchange.
pub const TAG_ATTACKS: &str = "pangea-ai-guard-attacks";

/// `"true"` when the verdict blocked the exchange.
pub const TAG_BLOCKED: &str = "pangea-ai-guard-blocked";

/// Gateway-wide attack marker, mirrors [`TAG_ATTACKS`].
pub const TAG_ATTACKS_DETECTED: &str = "attacks-detected";

/// Insertion-ordered multimap of tags.
///
/// Adding values under an existing key appends to that key; keys keep the
/// position of their first insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    entries: Vec<(String, Vec<String>)>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one or more values under `key`.
    pub fn add<I, V>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let key = key.into();
        let values = values.into_iter().map(Into::into);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => existing.extend(values),
            None => self.entries.push((key, values.collect())),
        }
    }

    /// Append a boolean literal (`"true"` / `"false"`) under `key`.
    pub fn add_flag(&mut self, key: impl Into<String>, value: bool) {
        self.add(key, [value.to_string()]);
    }

    /// Values recorded under `key`.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TagSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, values) in &self.entries {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}
