//! Cursor over the playing collection, with the following collection already
//! picked so the switch at the end of a collection never waits on selection.

use crate::catalog::Entry;
use crate::error::{LoungeError, Result};
use crate::selector::{Selection, Selector};
use rand::Rng;
use rand::rngs::StdRng;

/// What `Playlist::advance` moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    NextEntry,
    NewCollection,
}

pub struct Playlist<R = StdRng> {
    selector: Selector<R>,
    allow: Option<Vec<String>>,
    current: Selection,
    queued: Option<Selection>,
    index: usize,
}

impl<R: Rng> Playlist<R> {
    /// Select the first collection and queue the one after it.
    pub fn start(mut selector: Selector<R>, allow: Option<Vec<String>>) -> Result<Self> {
        let current = select(&mut selector, allow.as_deref())?;
        let mut playlist = Self {
            selector,
            allow,
            current,
            queued: None,
            index: 0,
        };
        playlist.refill_queue();
        Ok(playlist)
    }

    pub fn selection(&self) -> &Selection {
        &self.current
    }

    pub fn queued(&self) -> Option<&Selection> {
        self.queued.as_ref()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_entry(&self) -> &Entry {
        &self.current.entries[self.index]
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.current.len()
    }

    /// The entry after the current one within this collection, for preloading.
    pub fn upcoming_entry(&self) -> Option<&Entry> {
        self.current.entries.get(self.index + 1)
    }

    /// Move to the next entry, or to a new collection after the last one.
    pub fn advance(&mut self) -> Result<Advance> {
        if self.is_last() {
            self.skip_collection()?;
            Ok(Advance::NewCollection)
        } else {
            self.index += 1;
            Ok(Advance::NextEntry)
        }
    }

    /// Promote the queued collection (selecting one if the queue is empty)
    /// and start it from its first entry.
    pub fn skip_collection(&mut self) -> Result<()> {
        let next = match self.queued.take() {
            Some(next) => next,
            None => select(&mut self.selector, self.allow.as_deref())?,
        };
        self.current = next;
        self.index = 0;
        self.refill_queue();
        Ok(())
    }

    /// Back to the first entry of the current collection.
    pub fn rewind(&mut self) {
        self.index = 0;
    }

    fn refill_queue(&mut self) {
        match select(&mut self.selector, self.allow.as_deref()) {
            Ok(next) => self.queued = Some(next),
            Err(e) => {
                log::warn!("Could not queue the next collection: {e}");
                self.queued = None;
            }
        }
    }
}

/// Selection honoring the allow-list, falling back to the whole catalog when
/// the allow-list matches nothing playable.
fn select<R: Rng>(selector: &mut Selector<R>, allow: Option<&[String]>) -> Result<Selection> {
    match selector.select_random_collection(allow) {
        Err(LoungeError::EmptyCatalog) if allow.is_some() => {
            log::warn!("Allowed sources {allow:?} have no entries; using every source");
            selector.select_random_collection(None)
        }
        other => other,
    }
}
