//! Media backends driven by the synchronizer.
//!
//! The synchronizer only ever talks to a `MediaHandle`. `ClockMedia` is a
//! silent stand-in whose clock advances with wall time; it lets the player
//! run against catalogs whose audio lives on remote URLs, and when no output
//! device opens. `RodioMedia` (feature `player`) decodes and plays local files.

use crate::error::{LoungeError, Result};
use std::time::{Duration, Instant};

/// Length assumed for an entry when neither the media nor the caller knows it.
const FALLBACK_DURATION: Duration = Duration::from_secs(5);

pub trait MediaHandle {
    /// Replace whatever is loaded with `uri`, paused at position zero.
    /// `duration_hint_ms` is used by backends that cannot probe the media.
    fn load(&mut self, uri: &str, duration_hint_ms: Option<f64>) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
    fn position_ms(&self) -> f64;
    fn duration_ms(&self) -> Option<f64>;
    fn is_finished(&self) -> bool;
}

impl<M: MediaHandle + ?Sized> MediaHandle for Box<M> {
    fn load(&mut self, uri: &str, duration_hint_ms: Option<f64>) -> Result<()> {
        (**self).load(uri, duration_hint_ms)
    }
    fn play(&mut self) -> Result<()> {
        (**self).play()
    }
    fn pause(&mut self) {
        (**self).pause()
    }
    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }
    fn volume(&self) -> f32 {
        (**self).volume()
    }
    fn position_ms(&self) -> f64 {
        (**self).position_ms()
    }
    fn duration_ms(&self) -> Option<f64> {
        (**self).duration_ms()
    }
    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}

pub struct ClockMedia {
    uri: Option<String>,
    duration: Duration,
    elapsed: Duration,
    resumed_at: Option<Instant>,
    volume: f32,
}

impl Default for ClockMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockMedia {
    pub fn new() -> Self {
        Self {
            uri: None,
            duration: FALLBACK_DURATION,
            elapsed: Duration::ZERO,
            resumed_at: None,
            volume: 1.0,
        }
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    fn position(&self) -> Duration {
        let running = self.resumed_at.map(|t| t.elapsed()).unwrap_or_default();
        (self.elapsed + running).min(self.duration)
    }
}

impl MediaHandle for ClockMedia {
    fn load(&mut self, uri: &str, duration_hint_ms: Option<f64>) -> Result<()> {
        if uri.trim().is_empty() {
            return Err(LoungeError::MediaPlayback("empty media uri".into()));
        }
        self.uri = Some(uri.to_string());
        self.duration = duration_hint_ms
            .filter(|ms| ms.is_finite() && *ms > 0.0)
            .map(|ms| Duration::from_secs_f64(ms / 1000.0))
            .unwrap_or(FALLBACK_DURATION);
        self.elapsed = Duration::ZERO;
        self.resumed_at = None;
        log::debug!("Clock media loaded {uri} ({:?})", self.duration);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.uri.is_none() {
            return Err(LoungeError::MediaPlayback("nothing loaded".into()));
        }
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(t) = self.resumed_at.take() {
            self.elapsed += t.elapsed();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn position_ms(&self) -> f64 {
        self.position().as_secs_f64() * 1000.0
    }

    fn duration_ms(&self) -> Option<f64> {
        self.uri
            .as_ref()
            .map(|_| self.duration.as_secs_f64() * 1000.0)
    }

    fn is_finished(&self) -> bool {
        self.uri.is_some() && self.position() >= self.duration
    }
}

#[cfg(feature = "player")]
pub use rodio_backend::RodioMedia;

#[cfg(feature = "player")]
mod rodio_backend {
    use super::MediaHandle;
    use crate::error::{LoungeError, Result};
    use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;
    use std::time::Duration;

    pub struct RodioMedia {
        stream: OutputStream,
        sink: Option<Sink>,
        duration: Option<Duration>,
        volume: f32,
    }

    fn playback_error(e: impl std::fmt::Display) -> LoungeError {
        LoungeError::MediaPlayback(e.to_string())
    }

    impl RodioMedia {
        pub fn new() -> Result<Self> {
            let stream = OutputStreamBuilder::open_default_stream().map_err(playback_error)?;
            Ok(Self {
                stream,
                sink: None,
                duration: None,
                volume: 1.0,
            })
        }
    }

    /// Filesystem path behind a media URI. Remote URIs cannot be decoded.
    pub(super) fn local_path(uri: &str) -> Result<&Path> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Err(playback_error(format!(
                "remote media is not supported: {uri}"
            )));
        }
        Ok(Path::new(uri.strip_prefix("file://").unwrap_or(uri)))
    }

    impl MediaHandle for RodioMedia {
        fn load(&mut self, uri: &str, _duration_hint_ms: Option<f64>) -> Result<()> {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
            self.duration = None;

            let path = local_path(uri)?;
            let file = BufReader::new(File::open(path)?);
            let source = Decoder::new(file).map_err(playback_error)?;

            self.duration = source.total_duration();
            let sink = Sink::connect_new(self.stream.mixer());
            sink.pause();
            sink.set_volume(self.volume);
            sink.append(source);
            self.sink = Some(sink);

            log::info!("Loaded {} ({:?})", path.display(), self.duration);
            Ok(())
        }

        fn play(&mut self) -> Result<()> {
            let sink = self
                .sink
                .as_ref()
                .ok_or_else(|| playback_error("nothing loaded"))?;
            sink.play();
            Ok(())
        }

        fn pause(&mut self) {
            if let Some(sink) = &self.sink {
                sink.pause();
            }
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
            if let Some(sink) = &self.sink {
                sink.set_volume(self.volume);
            }
        }

        fn volume(&self) -> f32 {
            self.volume
        }

        fn position_ms(&self) -> f64 {
            self.sink
                .as_ref()
                .map(|s| s.get_pos().as_secs_f64() * 1000.0)
                .unwrap_or(0.0)
        }

        fn duration_ms(&self) -> Option<f64> {
            self.duration.map(|d| d.as_secs_f64() * 1000.0)
        }

        fn is_finished(&self) -> bool {
            self.sink.as_ref().is_some_and(|s| s.empty())
        }
    }
}
