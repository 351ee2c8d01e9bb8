//! Playback synchronizer.
//!
//! Owns the single media handle and the playback session: which entry is
//! loaded, the last segment whose text was shown, and the user's base volume.
//! It is driven from one thread by position updates, end-of-entry signals,
//! and play/pause/volume requests, and reports what changed as `SyncEvent`s
//! on a channel.
//!
//! ```text
//!   Idle ──start──▶ Loading ──first update──▶ Playing ◀──▶ Paused
//!                     ▲                          │
//!                     └──────── Ended ◀──────────┘ media finished
//! ```

use crate::catalog::{Entry, EntryKey, Segment};
use crate::constants::{SECONDARY_TEXT_TRIM, SHORT_TRACK_MS};
use crate::fade::Fader;
use crate::media::MediaHandle;
use crate::playlist::{Advance, Playlist};
use crate::selector::Selection;
use crate::tables::{FadeProfile, TextTable};
use rand::Rng;
use rand::rngs::StdRng;
use std::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
}

/// Text currently on display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveText {
    pub primary: String,
    pub secondary: String,
}

/// One load of one entry. Loading the same entry again (a collection picked
/// twice in a row, or a rewind) yields a new generation, so callbacks from
/// the earlier load no longer match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadId {
    pub key: EntryKey,
    generation: u64,
}

impl LoadId {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    StateChanged(SyncState),
    CollectionChanged {
        source: String,
        collection_id: u32,
        name: String,
    },
    /// A different entry is now loaded; hosts keyed on entry identity remount.
    EntryChanged { key: EntryKey, media_uri: String },
    TextUpdated(ActiveText),
    TextCleared,
}

pub struct Synchronizer<M, R = StdRng> {
    media: M,
    playlist: Option<Playlist<R>>,
    primary: TextTable,
    secondary: TextTable,
    events: mpsc::Sender<SyncEvent>,
    state: SyncState,
    current: Option<LoadId>,
    generation: u64,
    segments: Vec<Segment>,
    last_segment: Option<usize>,
    text: ActiveText,
    fader: Fader,
    base_volume: f32,
    short_track_ms: f64,
    play_requested: bool,
    media_loaded: bool,
    media_running: bool,
}

impl<M: MediaHandle, R: Rng> Synchronizer<M, R> {
    pub fn new(
        media: M,
        primary: TextTable,
        secondary: TextTable,
        base_volume: f32,
        events: mpsc::Sender<SyncEvent>,
    ) -> Self {
        Self {
            media,
            playlist: None,
            primary,
            secondary,
            events,
            state: SyncState::Idle,
            current: None,
            generation: 0,
            segments: Vec::new(),
            last_segment: None,
            text: ActiveText::default(),
            fader: Fader::new(FadeProfile::default()),
            base_volume: base_volume.clamp(0.0, 1.0),
            short_track_ms: SHORT_TRACK_MS,
            play_requested: false,
            media_loaded: false,
            media_running: false,
        }
    }

    pub fn with_short_track_ms(mut self, short_track_ms: f64) -> Self {
        self.short_track_ms = short_track_ms;
        self.fader = self.fader.with_short_track_ms(short_track_ms);
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn active_text(&self) -> &ActiveText {
        &self.text
    }

    pub fn base_volume(&self) -> f32 {
        self.base_volume
    }

    pub fn current_key(&self) -> Option<EntryKey> {
        self.current.map(|load| load.key)
    }

    /// Identity to pass back with position and end-of-entry callbacks.
    pub fn current_load(&self) -> Option<LoadId> {
        self.current
    }

    pub fn is_play_requested(&self) -> bool {
        self.play_requested
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.playlist.as_ref().map(|p| p.selection())
    }

    pub fn current_entry(&self) -> Option<&Entry> {
        self.playlist.as_ref().map(|p| p.current_entry())
    }

    /// Media URI of the next entry in this collection, for hosts that preload.
    pub fn upcoming_uri(&self) -> Option<&str> {
        self.playlist
            .as_ref()
            .and_then(|p| p.upcoming_entry())
            .map(|e| e.media_uri.as_str())
    }

    /// Take a freshly started playlist and load its first entry.
    pub fn start(&mut self, playlist: Playlist<R>) {
        self.playlist = Some(playlist);
        self.announce_collection();
        self.load_current();
    }

    pub fn request_play(&mut self) {
        self.play_requested = true;
        match self.state {
            SyncState::Loading => {
                self.start_media();
            }
            SyncState::Paused => {
                if self.start_media() {
                    self.set_state(SyncState::Playing);
                }
            }
            SyncState::Idle | SyncState::Playing | SyncState::Ended => {}
        }
    }

    pub fn request_pause(&mut self) {
        self.play_requested = false;
        match self.state {
            SyncState::Playing => {
                self.stop_media();
                self.set_state(SyncState::Paused);
            }
            SyncState::Loading => self.stop_media(),
            SyncState::Idle | SyncState::Paused | SyncState::Ended => {}
        }
    }

    pub fn toggle_play(&mut self) {
        if self.play_requested {
            self.request_pause();
        } else {
            self.request_play();
        }
    }

    /// New base volume. While playing it is picked up by the next position
    /// update, so an in-progress fade rescales instead of jumping.
    pub fn on_volume_changed(&mut self, volume: f32) {
        self.base_volume = volume.clamp(0.0, 1.0);
        if self.state != SyncState::Playing {
            self.media.set_volume(self.base_volume);
        }
        log::debug!("Base volume set to {:.2}", self.base_volume);
    }

    /// Apply the fade envelope and surface the text of the segment under
    /// `current_ms`. Updates for any load other than the current one are
    /// dropped.
    pub fn on_position_update(&mut self, load: LoadId, current_ms: f64, duration_ms: Option<f64>) {
        if !self.is_current(load, "position update") {
            return;
        }
        let key = load.key;
        if self.state == SyncState::Loading && self.play_requested && self.media_running {
            self.set_state(SyncState::Playing);
        }
        if self.state != SyncState::Playing {
            return;
        }

        let volume = self.fader.volume_at(self.base_volume, current_ms, duration_ms);
        self.media.set_volume(volume);

        let Some(index) = self.segments.iter().position(|s| s.contains(current_ms)) else {
            return;
        };
        if self.last_segment == Some(index) {
            return;
        }
        self.last_segment = Some(index);

        self.text = ActiveText {
            primary: self.primary.lookup(&key).to_string(),
            secondary: self
                .secondary
                .lookup(&key)
                .trim_start_matches(|c: char| SECONDARY_TEXT_TRIM.contains(&c) || c.is_whitespace())
                .to_string(),
        };
        self.emit(SyncEvent::TextUpdated(self.text.clone()));
    }

    /// Restore the un-faded volume and move on to the next entry, or to a new
    /// collection after the last one.
    pub fn on_entry_ended(&mut self, load: LoadId) {
        if !self.is_current(load, "end of entry") {
            return;
        }
        self.set_state(SyncState::Ended);
        self.media_running = false;
        self.media.set_volume(self.base_volume);

        let Some(playlist) = self.playlist.as_mut() else {
            return;
        };
        match playlist.advance() {
            Ok(Advance::NextEntry) => {}
            Ok(Advance::NewCollection) => self.announce_collection(),
            Err(e) => {
                log::error!("No next collection available: {e}");
                self.current = None;
                self.set_state(SyncState::Idle);
                return;
            }
        }
        self.load_current();
    }

    /// Pause and return to the first entry of the current collection.
    pub fn stop(&mut self) {
        self.request_pause();
        if let Some(playlist) = self.playlist.as_mut() {
            playlist.rewind();
            self.load_current();
        }
    }

    /// Abandon the current collection for the queued one.
    pub fn skip_collection(&mut self) {
        if self.playlist.is_none() {
            return;
        }
        self.stop_media();
        let Some(playlist) = self.playlist.as_mut() else {
            return;
        };
        if let Err(e) = playlist.skip_collection() {
            log::error!("Could not skip collection: {e}");
            return;
        }
        self.announce_collection();
        self.load_current();
    }

    /// Poll the media handle and dispatch the matching callback.
    pub fn tick(&mut self) {
        let Some(load) = self.current else {
            return;
        };
        if !self.media_running {
            return;
        }
        if self.media.is_finished() {
            self.on_entry_ended(load);
        } else {
            let position = self.media.position_ms();
            let duration = self.media.duration_ms();
            self.on_position_update(load, position, duration);
        }
    }

    fn load_current(&mut self) {
        let Some(playlist) = self.playlist.as_ref() else {
            return;
        };
        let entry = playlist.current_entry();
        let key = entry.key();
        let uri = entry.media_uri.clone();
        let segments = entry.segments();
        let fade = playlist.selection().fade;

        self.generation += 1;
        self.current = Some(LoadId {
            key,
            generation: self.generation,
        });
        self.segments = segments;
        self.last_segment = None;
        self.fader = Fader::new(fade).with_short_track_ms(self.short_track_ms);
        self.text = ActiveText::default();
        self.media_running = false;
        self.media_loaded = false;

        self.set_state(SyncState::Loading);
        self.emit(SyncEvent::TextCleared);
        self.emit(SyncEvent::EntryChanged {
            key,
            media_uri: uri,
        });
        log::info!("Loading entry {key}");

        self.load_media();
        if self.play_requested {
            self.start_media();
        }
    }

    fn load_media(&mut self) -> bool {
        let Some(entry) = self.current_entry() else {
            return false;
        };
        let uri = entry.media_uri.clone();
        let hint = self
            .segments
            .iter()
            .map(|s| s.end_ms)
            .fold(None, |acc: Option<f64>, end| Some(acc.map_or(end, |a| a.max(end))));

        match self.media.load(&uri, hint) {
            Ok(()) => {
                self.media.set_volume(self.base_volume);
                self.media_loaded = true;
            }
            Err(e) => log::warn!("Could not load {uri}: {e}"),
        }
        self.media_loaded
    }

    /// Ask the media to play, loading it first if an earlier load failed.
    /// Failures leave the state untouched.
    fn start_media(&mut self) -> bool {
        if !self.media_loaded && !self.load_media() {
            return false;
        }
        match self.media.play() {
            Ok(()) => {
                self.media_running = true;
                true
            }
            Err(e) => {
                log::warn!("Playback did not start: {e}");
                false
            }
        }
    }

    fn stop_media(&mut self) {
        self.media.pause();
        self.media_running = false;
    }

    fn announce_collection(&self) {
        if let Some(selection) = self.selection() {
            self.emit(SyncEvent::CollectionChanged {
                source: selection.source.clone(),
                collection_id: selection.collection_id,
                name: selection.name.clone(),
            });
        }
    }

    fn is_current(&self, load: LoadId, what: &str) -> bool {
        if self.current == Some(load) {
            true
        } else {
            log::debug!(
                "Ignoring stale {what} for {} (load {})",
                load.key,
                load.generation
            );
            false
        }
    }

    fn set_state(&mut self, state: SyncState) {
        if self.state != state {
            log::debug!("{:?} -> {:?}", self.state, state);
            self.state = state;
            self.emit(SyncEvent::StateChanged(state));
        }
    }

    fn emit(&self, event: SyncEvent) {
        // A host that stopped listening is not an error for playback.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, SegmentData, SourceCatalog};
    use crate::error::{LoungeError, Result};
    use crate::selector::Selector;
    use crate::tables::{CollectionNames, FadeTable};
    use rand::SeedableRng;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeMedia {
        loaded: Option<String>,
        playing: bool,
        volume: f32,
        refuse_play: bool,
        plays: usize,
    }

    impl MediaHandle for FakeMedia {
        fn load(&mut self, uri: &str, _hint: Option<f64>) -> Result<()> {
            self.loaded = Some(uri.to_string());
            self.playing = false;
            Ok(())
        }
        fn play(&mut self) -> Result<()> {
            self.plays += 1;
            if self.refuse_play {
                return Err(LoungeError::MediaPlayback("autoplay blocked".into()));
            }
            self.playing = true;
            Ok(())
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }
        fn volume(&self) -> f32 {
            self.volume
        }
        fn position_ms(&self) -> f64 {
            0.0
        }
        fn duration_ms(&self) -> Option<f64> {
            None
        }
        fn is_finished(&self) -> bool {
            false
        }
    }

    fn two_segments() -> SegmentData {
        SegmentData::Parsed(vec![
            Segment::new(1, 1, 0.0, 1000.0),
            Segment::new(2, 2, 1000.0, 2500.0),
        ])
    }

    fn synchronizer(
        media: FakeMedia,
        entries: usize,
    ) -> (Synchronizer<FakeMedia>, mpsc::Receiver<SyncEvent>) {
        let entries = (1..=entries as u32)
            .map(|n| Entry::new(9, 100 + n, two_segments(), format!("9/{n}.mp3")))
            .collect();
        let mut fades = BTreeMap::new();
        fades.insert("A".to_string(), FadeProfile::new(0.3, 0.8));
        let selector = Selector::with_rng(
            Arc::new(Catalog::new(vec![SourceCatalog::new("A", entries)])),
            FadeTable::new(fades),
            CollectionNames::default(),
            StdRng::seed_from_u64(1),
        );
        let playlist = Playlist::start(selector, None).unwrap();

        let primary: TextTable = [("9:1", "primary one"), ("9:2", "primary two")]
            .into_iter()
            .collect();
        let secondary: TextTable = [("9:1", ", .  secondary one.")].into_iter().collect();

        let (tx, rx) = mpsc::channel();
        let mut sync = Synchronizer::new(media, primary, secondary, 0.5, tx);
        sync.start(playlist);
        (sync, rx)
    }

    fn key(local_position: u32) -> EntryKey {
        EntryKey {
            collection_id: 9,
            local_position,
        }
    }

    fn current(sync: &Synchronizer<FakeMedia>) -> LoadId {
        sync.current_load().unwrap()
    }

    fn text_updates(rx: &mpsc::Receiver<SyncEvent>) -> Vec<ActiveText> {
        rx.try_iter()
            .filter_map(|e| match e {
                SyncEvent::TextUpdated(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_start_loads_first_entry() {
        let (sync, rx) = synchronizer(FakeMedia::default(), 3);
        assert_eq!(sync.state(), SyncState::Loading);
        assert_eq!(sync.current_key(), Some(key(1)));
        assert_eq!(sync.media().loaded.as_deref(), Some("9/1.mp3"));
        assert_eq!(sync.upcoming_uri(), Some("9/2.mp3"));

        let events: Vec<_> = rx.try_iter().collect();
        assert!(events.contains(&SyncEvent::StateChanged(SyncState::Loading)));
        assert!(events.contains(&SyncEvent::EntryChanged {
            key: key(1),
            media_uri: "9/1.mp3".to_string()
        }));
    }

    #[test]
    fn test_loading_to_playing_on_first_update() {
        let (mut sync, _rx) = synchronizer(FakeMedia::default(), 3);
        sync.request_play();
        assert_eq!(sync.state(), SyncState::Loading);
        assert!(sync.media().playing);

        sync.on_position_update(current(&sync), 10.0, Some(10_000.0));
        assert_eq!(sync.state(), SyncState::Playing);
    }

    #[test]
    fn test_updates_without_play_request_do_nothing() {
        let (mut sync, rx) = synchronizer(FakeMedia::default(), 3);
        sync.on_position_update(current(&sync), 500.0, Some(10_000.0));
        assert_eq!(sync.state(), SyncState::Loading);
        assert!(text_updates(&rx).is_empty());
    }

    #[test]
    fn test_segment_sweep_emits_once_per_segment() {
        let (mut sync, rx) = synchronizer(FakeMedia::default(), 3);
        sync.request_play();

        let mut t = 0.0;
        while t <= 2500.0 {
            sync.on_position_update(current(&sync), t, Some(10_000.0));
            t += 250.0;
        }

        let updates = text_updates(&rx);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].primary, "primary one");
        assert_eq!(updates[0].secondary, "secondary one.");
    }

    #[test]
    fn test_repeated_update_is_idempotent() {
        let (mut sync, rx) = synchronizer(FakeMedia::default(), 3);
        sync.request_play();
        sync.on_position_update(current(&sync), 400.0, Some(10_000.0));
        sync.on_position_update(current(&sync), 400.0, Some(10_000.0));
        assert_eq!(text_updates(&rx).len(), 1);
    }

    #[test]
    fn test_gap_keeps_previous_text() {
        let (mut sync, rx) = synchronizer(FakeMedia::default(), 3);
        sync.request_play();
        sync.on_position_update(current(&sync), 400.0, Some(10_000.0));
        sync.on_position_update(current(&sync), 4000.0, Some(10_000.0));
        assert_eq!(text_updates(&rx).len(), 1);
        assert_eq!(sync.active_text().primary, "primary one");
    }

    #[test]
    fn test_fade_drives_media_volume() {
        let (mut sync, _rx) = synchronizer(FakeMedia::default(), 3);
        sync.request_play();

        sync.on_position_update(current(&sync), 150.0, Some(10_000.0));
        assert!((sync.media().volume - 0.25).abs() < 1e-6);
        sync.on_position_update(current(&sync), 5000.0, Some(10_000.0));
        assert_eq!(sync.media().volume, 0.5);
        sync.on_position_update(current(&sync), 9600.0, Some(10_000.0));
        assert!((sync.media().volume - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_volume_change_rescales_fade() {
        let (mut sync, _rx) = synchronizer(FakeMedia::default(), 3);
        sync.request_play();
        sync.on_position_update(current(&sync), 9600.0, Some(10_000.0));

        sync.on_volume_changed(1.0);
        assert!((sync.media().volume - 0.25).abs() < 1e-6);
        sync.on_position_update(current(&sync), 9600.0, Some(10_000.0));
        assert!((sync.media().volume - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_pause_keeps_position_state() {
        let (mut sync, rx) = synchronizer(FakeMedia::default(), 3);
        sync.request_play();
        sync.on_position_update(current(&sync), 400.0, Some(10_000.0));

        sync.toggle_play();
        assert_eq!(sync.state(), SyncState::Paused);
        assert!(!sync.media().playing);
        sync.on_position_update(current(&sync), 1500.0, Some(10_000.0));

        sync.toggle_play();
        assert_eq!(sync.state(), SyncState::Playing);
        sync.on_position_update(current(&sync), 400.0, Some(10_000.0));
        assert_eq!(text_updates(&rx).len(), 1);
    }

    #[test]
    fn test_entry_end_advances_and_resets_volume() {
        let (mut sync, rx) = synchronizer(FakeMedia::default(), 3);
        sync.request_play();
        sync.on_position_update(current(&sync), 400.0, Some(10_000.0));
        sync.on_position_update(current(&sync), 9900.0, Some(10_000.0));
        let _ = rx.try_iter().count();

        sync.on_entry_ended(current(&sync));
        assert_eq!(sync.current_key(), Some(key(2)));
        assert_eq!(sync.state(), SyncState::Loading);
        assert_eq!(sync.media().volume, 0.5);
        assert_eq!(sync.media().loaded.as_deref(), Some("9/2.mp3"));
        assert!(sync.media().playing);
        assert_eq!(sync.active_text(), &ActiveText::default());

        let events: Vec<_> = rx.try_iter().collect();
        assert!(events.contains(&SyncEvent::StateChanged(SyncState::Ended)));
        assert!(events.contains(&SyncEvent::TextCleared));

        sync.on_position_update(current(&sync), 400.0, Some(10_000.0));
        let updates = text_updates(&rx);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].primary, "primary two");
        assert_eq!(updates[0].secondary, "");
    }

    #[test]
    fn test_stale_callbacks_are_ignored() {
        let (mut sync, rx) = synchronizer(FakeMedia::default(), 3);
        sync.request_play();
        let first = current(&sync);
        sync.on_entry_ended(first);
        let _ = rx.try_iter().count();

        sync.on_position_update(first, 400.0, Some(10_000.0));
        sync.on_entry_ended(first);
        assert_eq!(sync.current_key(), Some(key(2)));
        assert_eq!(sync.state(), SyncState::Loading);
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn test_reloading_same_entry_invalidates_old_callbacks() {
        // A one-entry collection can only be followed by itself.
        let (mut sync, rx) = synchronizer(FakeMedia::default(), 1);
        sync.request_play();
        let first = current(&sync);
        sync.on_entry_ended(first);

        let second = current(&sync);
        assert_eq!(second.key, first.key);
        assert_ne!(second, first);
        assert!(second.generation() > first.generation());
        let _ = rx.try_iter().count();

        sync.on_position_update(first, 400.0, Some(10_000.0));
        sync.on_entry_ended(first);
        assert_eq!(sync.state(), SyncState::Loading);
        assert_eq!(current(&sync), second);
        assert_eq!(rx.try_iter().count(), 0);

        sync.on_position_update(second, 400.0, Some(10_000.0));
        assert_eq!(sync.state(), SyncState::Playing);
        assert_eq!(text_updates(&rx).len(), 1);
    }

    #[test]
    fn test_rewind_reload_gets_new_generation() {
        let (mut sync, _rx) = synchronizer(FakeMedia::default(), 3);
        let first = current(&sync);
        sync.stop();

        assert_eq!(current(&sync).key, first.key);
        assert_ne!(current(&sync), first);
    }

    #[test]
    fn test_last_entry_starts_new_collection() {
        let (mut sync, rx) = synchronizer(FakeMedia::default(), 5);
        sync.request_play();
        for position in 1..=5 {
            sync.on_entry_ended(current(&sync));
        }

        assert_eq!(sync.current_key(), Some(key(1)));
        let collections = rx
            .try_iter()
            .filter(|e| matches!(e, SyncEvent::CollectionChanged { .. }))
            .count();
        // One announcement at start, one after the fifth entry.
        assert_eq!(collections, 2);
    }

    #[test]
    fn test_refused_playback_stays_loading() {
        let media = FakeMedia {
            refuse_play: true,
            ..Default::default()
        };
        let (mut sync, rx) = synchronizer(media, 3);
        sync.request_play();
        sync.on_position_update(current(&sync), 400.0, Some(10_000.0));

        assert_eq!(sync.state(), SyncState::Loading);
        assert!(text_updates(&rx).is_empty());
        sync.request_play();
        assert_eq!(sync.media().plays, 2);
    }

    #[test]
    fn test_stop_rewinds_and_pauses() {
        let (mut sync, _rx) = synchronizer(FakeMedia::default(), 3);
        sync.request_play();
        sync.on_entry_ended(current(&sync));
        sync.stop();

        assert_eq!(sync.current_key(), Some(key(1)));
        assert_eq!(sync.state(), SyncState::Loading);
        assert!(!sync.is_play_requested());
        assert!(!sync.media().playing);
    }

    #[test]
    fn test_skip_collection_resets_position() {
        let (mut sync, rx) = synchronizer(FakeMedia::default(), 3);
        sync.on_entry_ended(current(&sync));
        sync.skip_collection();

        assert_eq!(sync.current_key(), Some(key(1)));
        assert!(
            rx.try_iter()
                .any(|e| matches!(e, SyncEvent::CollectionChanged { .. }))
        );
    }
}
