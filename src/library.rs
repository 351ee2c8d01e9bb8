//! Everything read from the data directory at startup.
//!
//! ```text
//! <data_dir>/
//!   sources/<source>.json   entries per source
//!   text/primary.json       "c:p" -> { "text": ... }
//!   text/secondary.json     "c:p" -> { "t": ... }
//!   names.json              "<id>" -> display name (optional)
//! ```

use crate::catalog::Catalog;
use crate::constants::{NAMES_FILE, PRIMARY_TEXT_FILE, SECONDARY_TEXT_FILE, SOURCES_DIR, TEXT_DIR};
use crate::error::Result;
use crate::tables::{CollectionNames, TextTable};
use std::path::Path;
use std::sync::Arc;

pub struct Library {
    pub catalog: Arc<Catalog>,
    pub primary: TextTable,
    pub secondary: TextTable,
    pub names: CollectionNames,
}

impl Library {
    /// The sources directory must exist. Text and name tables are optional;
    /// a missing or broken table only means less text on screen.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let sources_dir = data_dir.join(SOURCES_DIR);
        let catalog = Catalog::load_dir(&sources_dir)?;
        if catalog.is_empty() {
            log::warn!("No entries found under {}", sources_dir.display());
        }

        let text_dir = data_dir.join(TEXT_DIR);
        let primary = optional_table(&text_dir.join(PRIMARY_TEXT_FILE));
        let secondary = optional_table(&text_dir.join(SECONDARY_TEXT_FILE));

        let names_path = data_dir.join(NAMES_FILE);
        let names = if names_path.exists() {
            CollectionNames::load(&names_path).unwrap_or_else(|e| {
                log::warn!("Ignoring {}: {e}", names_path.display());
                CollectionNames::default()
            })
        } else {
            CollectionNames::default()
        };

        Ok(Self {
            catalog: Arc::new(catalog),
            primary,
            secondary,
            names,
        })
    }

    /// Names in `sources` that match no source in the catalog.
    pub fn unknown_sources<'a>(&self, sources: &'a [String]) -> Vec<&'a str> {
        sources
            .iter()
            .filter(|s| self.catalog.source(s).is_none())
            .map(String::as_str)
            .collect()
    }
}

fn optional_table(path: &Path) -> TextTable {
    if !path.exists() {
        log::warn!("No text table at {}", path.display());
        return TextTable::default();
    }
    TextTable::load(path).unwrap_or_else(|e| {
        log::warn!("Ignoring text table {}: {e}", path.display());
        TextTable::default()
    })
}
