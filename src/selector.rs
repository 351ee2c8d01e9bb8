//! Random collection selection.
//!
//! A source is drawn uniformly from the eligible sources, then a collection is
//! drawn uniformly from that source's distinct collection ids. The chosen
//! collection's entries are ordered by sequence number and numbered from 1.

use crate::catalog::{Catalog, Entry};
use crate::error::{LoungeError, Result};
use crate::tables::{CollectionNames, FadeProfile, FadeTable};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A collection ready to be played, in playback order.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub source: String,
    pub collection_id: u32,
    pub name: String,
    pub fade: FadeProfile,
    pub entries: Vec<Entry>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct Selector<R = StdRng> {
    catalog: Arc<Catalog>,
    fades: FadeTable,
    names: CollectionNames,
    rng: R,
}

impl Selector<StdRng> {
    /// Selector seeded from the operating system's entropy source.
    pub fn new(catalog: Arc<Catalog>, fades: FadeTable, names: CollectionNames) -> Self {
        Self::with_rng(catalog, fades, names, StdRng::from_entropy())
    }
}

impl<R: Rng> Selector<R> {
    pub fn with_rng(catalog: Arc<Catalog>, fades: FadeTable, names: CollectionNames, rng: R) -> Self {
        Self {
            catalog,
            fades,
            names,
            rng,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Pick a random collection, optionally restricted to `allow` sources.
    ///
    /// Fails with `EmptyCatalog` when no allowed source has any entries; an
    /// empty allow-list therefore always fails.
    pub fn select_random_collection(&mut self, allow: Option<&[String]>) -> Result<Selection> {
        let eligible: Vec<_> = self
            .catalog
            .sources()
            .iter()
            .filter(|s| !s.entries.is_empty())
            .filter(|s| allow.is_none_or(|allow| allow.iter().any(|a| *a == s.source)))
            .collect();

        let source = *eligible
            .choose(&mut self.rng)
            .ok_or(LoungeError::EmptyCatalog)?;

        let collection_ids: Vec<u32> = source
            .entries
            .iter()
            .map(|e| e.collection_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let collection_id = *collection_ids
            .choose(&mut self.rng)
            .ok_or(LoungeError::EmptyCatalog)?;

        let mut entries: Vec<Entry> = source
            .entries
            .iter()
            .filter(|e| e.collection_id == collection_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.sequence_number);
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.local_position = index as u32 + 1;
        }

        let selection = Selection {
            source: source.source.clone(),
            collection_id,
            name: self.names.name_for(collection_id),
            fade: self.fades.profile_for(&source.source),
            entries,
        };

        log::info!(
            "Selected {} ({}) from {} with {} entries",
            selection.name,
            selection.collection_id,
            selection.source,
            selection.len()
        );

        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SegmentData, SourceCatalog};
    use std::collections::{BTreeMap, HashMap};

    fn entry(collection_id: u32, sequence_number: u32) -> Entry {
        Entry::new(
            collection_id,
            sequence_number,
            SegmentData::default(),
            format!("{collection_id}/{sequence_number}.mp3"),
        )
    }

    fn selector(sources: Vec<SourceCatalog>, seed: u64) -> Selector<StdRng> {
        let mut fades = BTreeMap::new();
        fades.insert("Slow".to_string(), FadeProfile::new(0.3, 0.8));
        Selector::with_rng(
            Arc::new(Catalog::new(sources)),
            FadeTable::new(fades),
            CollectionNames::new(HashMap::from([(2, "Second".to_string())])),
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_orders_and_numbers_entries() {
        let source = SourceCatalog::new(
            "Slow",
            vec![entry(2, 12), entry(2, 10), entry(2, 11), entry(2, 9)],
        );
        let mut selector = selector(vec![source], 7);

        let selection = selector.select_random_collection(None).unwrap();
        assert_eq!(selection.collection_id, 2);
        assert_eq!(selection.name, "Second");
        assert_eq!(selection.fade, FadeProfile::new(0.3, 0.8));

        let sequence: Vec<u32> = selection.entries.iter().map(|e| e.sequence_number).collect();
        let positions: Vec<u32> = selection.entries.iter().map(|e| e.local_position).collect();
        assert_eq!(sequence, vec![9, 10, 11, 12]);
        assert_eq!(positions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_only_one_collection_is_returned() {
        let source = SourceCatalog::new(
            "Any",
            vec![entry(1, 1), entry(3, 20), entry(1, 2), entry(3, 21), entry(3, 22)],
        );
        let mut selector = selector(vec![source], 3);

        for _ in 0..20 {
            let selection = selector.select_random_collection(None).unwrap();
            assert!(
                selection
                    .entries
                    .iter()
                    .all(|e| e.collection_id == selection.collection_id)
            );
            let expected = if selection.collection_id == 1 { 2 } else { 3 };
            assert_eq!(selection.len(), expected);
            assert_eq!(selection.fade, FadeProfile::default());
        }
    }

    #[test]
    fn test_allow_list_restricts_sources() {
        let a = SourceCatalog::new("A", vec![entry(1, 1)]);
        let b = SourceCatalog::new("B", vec![entry(5, 1)]);
        let mut selector = selector(vec![a, b], 11);
        let allow = vec!["B".to_string()];

        for _ in 0..20 {
            let selection = selector.select_random_collection(Some(allow.as_slice())).unwrap();
            assert_eq!(selection.source, "B");
            assert_eq!(selection.collection_id, 5);
        }
    }

    #[test]
    fn test_every_source_is_reachable() {
        let sources = vec![
            SourceCatalog::new("A", vec![entry(1, 1)]),
            SourceCatalog::new("B", vec![entry(1, 1)]),
            SourceCatalog::new("C", vec![entry(1, 1)]),
        ];
        let mut selector = selector(sources, 99);

        let picked: BTreeSet<String> = (0..200)
            .map(|_| selector.select_random_collection(None).unwrap().source)
            .collect();
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn test_empty_catalog_errors() {
        let mut selector = selector(vec![SourceCatalog::new("A", vec![])], 1);
        assert!(matches!(
            selector.select_random_collection(None),
            Err(LoungeError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_empty_allow_list_errors() {
        let mut selector = selector(vec![SourceCatalog::new("A", vec![entry(1, 1)])], 1);
        let none: Vec<String> = Vec::new();
        assert!(matches!(
            selector.select_random_collection(Some(none.as_slice())),
            Err(LoungeError::EmptyCatalog)
        ));
        let unknown = vec!["Z".to_string()];
        assert!(matches!(
            selector.select_random_collection(Some(unknown.as_slice())),
            Err(LoungeError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_positions_are_fresh_per_selection() {
        let source = SourceCatalog::new("A", vec![entry(4, 30), entry(4, 31)]);
        let mut selector = selector(vec![source], 5);

        let first = selector.select_random_collection(None).unwrap();
        let second = selector.select_random_collection(None).unwrap();
        assert_eq!(first.entries[0].local_position, 1);
        assert_eq!(second.entries[0].local_position, 1);
        assert_eq!(
            selector.catalog().sources()[0].entries[0].local_position,
            0
        );
    }
}
