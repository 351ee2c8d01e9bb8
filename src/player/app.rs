//! Main application state and control flow for the terminal player.
//!
//! This module wires the synchronizer to the terminal: it owns the event loop,
//! polls the media clock on every frame, folds synchronizer events into the
//! state the UI draws from, and maps keys onto play/pause, stop, skip, volume
//! and text presentation.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::info;
use quran_lounge::catalog::EntryKey;
use quran_lounge::config::{Config, TextMode};
use quran_lounge::constants::LOG_FILE;
use quran_lounge::library::Library;
use quran_lounge::media::{ClockMedia, MediaHandle, RodioMedia};
use quran_lounge::playlist::Playlist;
use quran_lounge::selector::Selector;
use quran_lounge::sync::{ActiveText, SyncEvent, SyncState, Synchronizer};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::sync::mpsc;
use std::{error::Error, io, time::Duration};

use super::ui;

/// Volume change per key press.
const VOLUME_STEP: f32 = 0.05;

pub struct App {
    pub should_quit: bool,
    sync: Synchronizer<Box<dyn MediaHandle>>,
    events: mpsc::Receiver<SyncEvent>,
    pub state: SyncState,
    pub text: ActiveText,
    pub collection_name: String,
    pub source: String,
    pub entry: Option<EntryKey>,
    pub text_mode: TextMode,
    pub show_text: bool,
}

impl App {
    pub fn new(
        sync: Synchronizer<Box<dyn MediaHandle>>,
        events: mpsc::Receiver<SyncEvent>,
        config: &Config,
    ) -> Self {
        let mut app = Self {
            should_quit: false,
            sync,
            events,
            state: SyncState::Idle,
            text: ActiveText::default(),
            collection_name: String::new(),
            source: String::new(),
            entry: None,
            text_mode: config.text_mode,
            show_text: config.show_text,
        };
        app.drain_events();
        app
    }

    /// Advance the synchronizer from the media clock and pick up what changed.
    pub fn update(&mut self) {
        self.sync.tick();
        self.drain_events();
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                SyncEvent::StateChanged(state) => self.state = state,
                SyncEvent::CollectionChanged { source, name, .. } => {
                    info!("Now playing {name} by {source}");
                    self.collection_name = name;
                    self.source = source;
                }
                SyncEvent::EntryChanged { key, .. } => self.entry = Some(key),
                SyncEvent::TextUpdated(text) => self.text = text,
                SyncEvent::TextCleared => self.text = ActiveText::default(),
            }
        }
    }

    pub fn volume(&self) -> f32 {
        self.sync.base_volume()
    }

    pub fn is_playing(&self) -> bool {
        self.sync.is_play_requested()
    }

    pub fn entry_count(&self) -> usize {
        self.sync.selection().map(|s| s.len()).unwrap_or(0)
    }

    /// Position within the current entry, 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        let media = self.sync.media();
        match media.duration_ms() {
            Some(duration) if duration > 0.0 => (media.position_ms() / duration).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    pub fn toggle_playback(&mut self) {
        self.sync.toggle_play();
        self.drain_events();
    }

    pub fn stop(&mut self) {
        self.sync.stop();
        self.drain_events();
    }

    pub fn skip_collection(&mut self) {
        self.sync.skip_collection();
        self.drain_events();
    }

    pub fn change_volume(&mut self, delta: f32) {
        let volume = (self.volume() + delta).clamp(0.0, 1.0);
        self.sync.on_volume_changed(volume);
    }

    pub fn cycle_text_mode(&mut self) {
        self.text_mode = self.text_mode.next();
    }

    pub fn toggle_text(&mut self) {
        self.show_text = !self.show_text;
    }
}

/// Real audio output when a device opens, otherwise the silent clock.
fn open_media() -> Box<dyn MediaHandle> {
    match RodioMedia::new() {
        Ok(media) => Box::new(media),
        Err(e) => {
            log::error!("No audio output ({e}); continuing silently");
            Box::new(ClockMedia::new())
        }
    }
}

pub fn run(sources: &[String], volume: Option<f32>) -> Result<(), Box<dyn Error>> {
    // Initialize logging
    init_logging()?;
    info!("Starting lounge player");

    let config = Config::load()?;
    let data_path = config.data_path()?;
    let library = Library::load(&data_path)
        .map_err(|e| format!("Could not load {}: {e}", data_path.display()))?;

    let allow = crate::cli::pick::source_filter(sources, &config);
    if let Some(allow) = &allow {
        for unknown in library.unknown_sources(allow) {
            log::warn!("No source named '{unknown}'");
        }
    }
    let selector = Selector::new(library.catalog, config.fade_table(), library.names);
    let playlist = Playlist::start(selector, allow)?;

    let (events_tx, events_rx) = mpsc::channel();
    let mut sync = Synchronizer::new(
        open_media(),
        library.primary,
        library.secondary,
        volume.unwrap_or(config.volume),
        events_tx,
    )
    .with_short_track_ms(config.short_track_ms);
    sync.start(playlist);
    sync.request_play();

    let mut app = App::new(sync, events_rx, &config);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        log::error!("Player stopped: {e}");
    }
    res
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    loop {
        app.update();

        terminal.draw(|f| ui::draw(f, app))?;

        // Poll for events with a short timeout so position updates keep flowing
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            handle_key(app, key.code);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char(' ') => app.toggle_playback(),
        KeyCode::Char('s') => app.stop(),
        KeyCode::Char('n') => app.skip_collection(),
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => app.change_volume(VOLUME_STEP),
        KeyCode::Char('-') | KeyCode::Down => app.change_volume(-VOLUME_STEP),
        KeyCode::Char('t') => app.cycle_text_mode(),
        KeyCode::Char('h') => app.toggle_text(),
        _ => {}
    }
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    use simplelog::{CombinedLogger, LevelFilter, WriteLogger};
    use std::fs::File;

    CombinedLogger::init(vec![WriteLogger::new(
        LevelFilter::Debug,
        simplelog::Config::default(),
        File::create(LOG_FILE)?,
    )])?;

    Ok(())
}
