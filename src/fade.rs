//! Linear fade-in / fade-out envelope applied on top of the user's volume.

use crate::constants::SHORT_TRACK_MS;
use crate::tables::FadeProfile;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fader {
    pub profile: FadeProfile,
    /// Tracks shorter than this play at the base volume throughout.
    pub short_track_ms: f64,
}

impl Fader {
    pub fn new(profile: FadeProfile) -> Self {
        Self {
            profile,
            short_track_ms: SHORT_TRACK_MS,
        }
    }

    pub fn with_short_track_ms(mut self, short_track_ms: f64) -> Self {
        self.short_track_ms = short_track_ms;
        self
    }

    /// Effective volume at `current_ms` for a track of `duration_ms`, relative
    /// to `base`. An unknown (or non-finite) duration disables the fade-out.
    pub fn volume_at(&self, base: f32, current_ms: f64, duration_ms: Option<f64>) -> f32 {
        let duration_ms = duration_ms.filter(|d| d.is_finite() && *d > 0.0);

        if duration_ms.is_some_and(|d| d < self.short_track_ms) {
            return base;
        }

        let fade_in_ms = self.profile.fade_in_ms();
        let fade_out_ms = self.profile.fade_out_ms();
        let current_ms = current_ms.max(0.0);

        let fraction = if fade_in_ms > 0.0 && current_ms <= fade_in_ms {
            current_ms / fade_in_ms
        } else if let Some(duration_ms) = duration_ms
            && fade_out_ms > 0.0
            && duration_ms - current_ms <= fade_out_ms
            && duration_ms - current_ms > 0.0
        {
            (duration_ms - current_ms) / fade_out_ms
        } else {
            1.0
        };

        (base as f64 * fraction).clamp(0.0, 1.0) as f32
    }
}
