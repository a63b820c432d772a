use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Buffered `(start, end)` spans in seconds, ordered by start.
pub type TimeRanges = Vec<(f64, f64)>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("Unsupported playback rate: {0} (expected 0.5, 1, 1.5 or 2)")]
    InvalidRate(f64),
    #[error("Seek target must be a finite number of seconds, got {0}")]
    InvalidSeek(f64),
    #[error("Volume must be a number, got {0}")]
    InvalidVolume(f64),
    #[error("Unknown key: {0}")]
    UnknownKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackRate {
    Half,
    #[default]
    Normal,
    OneAndHalf,
    Double,
}

impl PlaybackRate {
    pub const ALL: [PlaybackRate; 4] = [
        PlaybackRate::Half,
        PlaybackRate::Normal,
        PlaybackRate::OneAndHalf,
        PlaybackRate::Double,
    ];

    pub fn value(self) -> f64 {
        match self {
            PlaybackRate::Half => 0.5,
            PlaybackRate::Normal => 1.0,
            PlaybackRate::OneAndHalf => 1.5,
            PlaybackRate::Double => 2.0,
        }
    }
}

impl TryFrom<f64> for PlaybackRate {
    type Error = ControlError;

    fn try_from(rate: f64) -> Result<Self, Self::Error> {
        PlaybackRate::ALL
            .into_iter()
            .find(|candidate| (candidate.value() - rate).abs() < 1e-9)
            .ok_or(ControlError::InvalidRate(rate))
    }
}

impl Serialize for PlaybackRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

impl fmt::Display for PlaybackRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Failed,
    Unmounted,
}

/// Render-facing snapshot of the media element.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackState {
    pub phase: Phase,
    pub source: Option<String>,
    pub is_playing: bool,
    pub current_time: f64,
    /// NaN until the backend reports metadata.
    pub duration: f64,
    pub buffered_fraction: f64,
    pub buffer_health: f64,
    pub volume: f64,
    pub is_muted: bool,
    pub playback_rate: PlaybackRate,
    pub is_fullscreen: bool,
    pub is_loading: bool,
    pub controls_visible: bool,
    pub error: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            source: None,
            is_playing: false,
            current_time: 0.0,
            duration: f64::NAN,
            buffered_fraction: 0.0,
            buffer_health: 0.0,
            volume: 1.0,
            is_muted: false,
            playback_rate: PlaybackRate::Normal,
            is_fullscreen: false,
            is_loading: false,
            controls_visible: true,
            error: None,
        }
    }
}

impl PlaybackState {
    pub fn duration_known(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }

    /// Clamps a playhead position into `[0, duration]`, or `[0, inf)` while
    /// the duration is unknown.
    pub fn clamp_time(&self, time: f64) -> f64 {
        let lower = time.max(0.0);
        if self.duration_known() {
            lower.min(self.duration)
        } else {
            lower
        }
    }

    /// Furthest buffered end relative to the duration.
    pub fn update_buffered(&mut self, ranges: &[(f64, f64)]) {
        self.buffered_fraction = match ranges.last() {
            Some(&(_, end)) if self.duration_known() && end.is_finite() => {
                (end / self.duration).clamp(0.0, 1.0)
            }
            _ => 0.0,
        };
        self.buffer_health = buffered_ahead(ranges, self.current_time);
    }
}

/// Seconds buffered past `position` inside the range that contains it.
pub fn buffered_ahead(ranges: &[(f64, f64)], position: f64) -> f64 {
    ranges
        .iter()
        .find(|&&(start, end)| start <= position && position <= end)
        .map_or(0.0, |&(_, end)| end - position)
}
