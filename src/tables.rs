//! Read-only lookup tables consulted by the core: fade profiles per source,
//! the two text tables, and collection display names.

use crate::catalog::EntryKey;
use crate::constants::DEFAULT_FADE_KEY;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Fade-in and fade-out lengths, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FadeProfile {
    #[serde(default)]
    pub fade_in: f64,
    #[serde(default)]
    pub fade_out: f64,
}

impl FadeProfile {
    pub const fn new(fade_in: f64, fade_out: f64) -> Self {
        Self { fade_in, fade_out }
    }

    pub fn fade_in_ms(&self) -> f64 {
        self.fade_in * 1000.0
    }

    pub fn fade_out_ms(&self) -> f64 {
        self.fade_out * 1000.0
    }
}

/// Source name to fade profile, always carrying a `default` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FadeTable {
    profiles: BTreeMap<String, FadeProfile>,
}

impl Default for FadeTable {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl FadeTable {
    /// Missing `default` entries are filled with a zero-length fade.
    pub fn new(mut profiles: BTreeMap<String, FadeProfile>) -> Self {
        profiles
            .entry(DEFAULT_FADE_KEY.to_string())
            .or_insert_with(FadeProfile::default);
        Self { profiles }
    }

    pub fn profile_for(&self, source: &str) -> FadeProfile {
        self.profiles
            .get(source)
            .or_else(|| self.profiles.get(DEFAULT_FADE_KEY))
            .copied()
            .unwrap_or_default()
    }
}

/// A text record keyed by `"{collection}:{position}"`. Primary tables carry
/// the text under `text`, secondary tables under `t`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TextRecord {
    #[serde(alias = "t", default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextTable {
    records: HashMap<String, TextRecord>,
}

impl TextTable {
    pub fn new(records: HashMap<String, TextRecord>) -> Self {
        Self { records }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let table = Self::from_json(&json)?;
        log::info!("Loaded {} text records from {}", table.len(), path.display());
        Ok(table)
    }

    /// Empty string when the key is absent.
    pub fn lookup(&self, key: &EntryKey) -> &str {
        self.records
            .get(&key.to_string())
            .map(|r| r.text.as_str())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TextTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), TextRecord { text: v.into() }))
                .collect(),
        )
    }
}

/// Collection id to display name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionNames {
    names: HashMap<u32, String>,
}

impl CollectionNames {
    pub fn new(names: HashMap<u32, String>) -> Self {
        Self { names }
    }

    /// Accepts `{ "<id>": "<name>" }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        let names = raw
            .into_iter()
            .filter_map(|(id, name)| match id.trim().parse::<u32>() {
                Ok(id) => Some((id, name)),
                Err(_) => {
                    log::warn!("Ignoring collection name with non-numeric id: {id}");
                    None
                }
            })
            .collect();
        Ok(Self::new(names))
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn name_for(&self, collection_id: u32) -> String {
        self.names
            .get(&collection_id)
            .cloned()
            .unwrap_or_else(|| format!("Collection #{collection_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(collection_id: u32, local_position: u32) -> EntryKey {
        EntryKey {
            collection_id,
            local_position,
        }
    }

    #[test]
    fn test_fade_table_falls_back_to_default() {
        let mut profiles = BTreeMap::new();
        profiles.insert("Slow".to_string(), FadeProfile::new(0.3, 0.8));
        profiles.insert("default".to_string(), FadeProfile::new(0.1, 0.2));
        let table = FadeTable::new(profiles);

        assert_eq!(table.profile_for("Slow"), FadeProfile::new(0.3, 0.8));
        assert_eq!(table.profile_for("Unknown"), FadeProfile::new(0.1, 0.2));
    }

    #[test]
    fn test_fade_table_always_has_default() {
        let table = FadeTable::new(BTreeMap::new());
        assert_eq!(table.profile_for("anyone"), FadeProfile::new(0.0, 0.0));
    }

    #[test]
    fn test_text_table_lookup_handles_both_field_names() {
        let primary = TextTable::from_json(r#"{"1:1": {"text": "first"}}"#).unwrap();
        let secondary = TextTable::from_json(r#"{"1:1": {"t": ", first"}}"#).unwrap();

        assert_eq!(primary.lookup(&key(1, 1)), "first");
        assert_eq!(secondary.lookup(&key(1, 1)), ", first");
        assert_eq!(primary.lookup(&key(1, 2)), "");
    }

    #[test]
    fn test_text_table_from_iter() {
        let table: TextTable = [("2:3", "three")].into_iter().collect();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(&key(2, 3)), "three");
    }

    #[test]
    fn test_collection_names_default_format() {
        let names = CollectionNames::from_json(r#"{"1": "Al-Fatiha", "x": "bad"}"#).unwrap();
        assert_eq!(names.name_for(1), "Al-Fatiha");
        assert_eq!(names.name_for(114), "Collection #114");
    }
}
