use crate::player::state::{PlaybackRate, TimeRanges};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
    #[error("Media element error: {0}")]
    Element(String),
    #[error("State change failed: {0}")]
    State(String),
}

/// Native notifications a media backend pushes to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    DurationChanged(f64),
    TimeUpdate(f64),
    Progress(TimeRanges),
    LoadedData,
    Waiting,
    Stalled,
    CanPlay,
    CanPlayThrough,
    Playing,
    Paused,
    Ended,
    FullscreenChanged(bool),
    Error(String),
}

pub type EventSender = mpsc::Sender<MediaEvent>;

/// Capability set the controller needs from a media element.
pub trait MediaBackend: Send {
    fn load(&mut self, source: &str) -> Result<(), BackendError>;
    fn play(&mut self) -> Result<(), BackendError>;
    fn pause(&mut self) -> Result<(), BackendError>;
    fn seek(&mut self, seconds: f64) -> Result<(), BackendError>;
    fn set_volume(&mut self, volume: f64) -> Result<(), BackendError>;
    fn set_muted(&mut self, muted: bool) -> Result<(), BackendError>;
    fn set_rate(&mut self, rate: PlaybackRate) -> Result<(), BackendError>;
    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), BackendError>;
    /// Detaches listeners and frees the media resource.
    fn release(&mut self);
}
