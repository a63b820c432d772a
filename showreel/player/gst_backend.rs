use crate::player::backend::{BackendError, EventSender, MediaBackend, MediaEvent};
use crate::player::state::{PlaybackRate, TimeRanges};
use futures_util::stream::StreamExt;
use gstreamer::prelude::*;
use gstreamer::{ClockTime, Element, Message, MessageView, SeekFlags, SeekType, State};
use log::{debug, error, info, warn};
use tokio::task::{self, JoinHandle};
use tokio::time::{interval, Duration};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[allow(clippy::cast_precision_loss)]
fn clock_to_secs(time: ClockTime) -> f64 {
    time.nseconds() as f64 / 1_000_000_000.0
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn secs_to_clock(seconds: f64) -> ClockTime {
    ClockTime::from_nseconds((seconds.max(0.0) * 1_000_000_000.0) as u64)
}

/// Accepts URIs as-is and turns local paths into `file://` URIs.
pub fn to_uri(source: &str) -> Result<String, BackendError> {
    if source.contains("://") {
        return Ok(source.to_string());
    }
    let path = std::fs::canonicalize(source)
        .map_err(|e| BackendError::Element(format!("Cannot resolve {source}: {e}")))?;
    glib::filename_to_uri(&path, None)
        .map(|uri| uri.to_string())
        .map_err(|e| BackendError::Element(e.to_string()))
}

/// `playbin` based media element.
pub struct GstBackend {
    playbin: Element,
    events: EventSender,
    rate: PlaybackRate,
    tasks: Vec<JoinHandle<()>>,
}

impl GstBackend {
    pub fn new(events: EventSender) -> Result<Self, BackendError> {
        let playbin = gstreamer::ElementFactory::make("playbin")
            .build()
            .map_err(|_| BackendError::Element("Failed to create playbin element".to_string()))?;
        info!("GStreamer playbin created successfully.");
        Ok(Self {
            playbin,
            events,
            rate: PlaybackRate::Normal,
            tasks: Vec::new(),
        })
    }

    fn listen_to_bus(&mut self) -> Result<(), BackendError> {
        let bus = self
            .playbin
            .bus()
            .ok_or_else(|| BackendError::Element("Failed to get GStreamer bus".to_string()))?;
        let playbin = self.playbin.clone();
        let events = self.events.clone();

        self.tasks.push(task::spawn(async move {
            let mut messages = bus.stream();
            while let Some(msg) = messages.next().await {
                let Some(event) = translate(&msg, &playbin) else {
                    continue;
                };
                if events.send(event).await.is_err() {
                    debug!("Event receiver dropped, stopping bus listener");
                    break;
                }
            }
        }));
        Ok(())
    }

    fn poll_position(&mut self) {
        let playbin = self.playbin.clone();
        let events = self.events.clone();

        self.tasks.push(task::spawn(async move {
            let mut ticker = interval(POLL_INTERVAL);
            let mut last_duration = None;
            loop {
                ticker.tick().await;
                let mut batch = Vec::with_capacity(3);
                if let Some(duration) = playbin.query_duration::<ClockTime>() {
                    if last_duration != Some(duration) {
                        last_duration = Some(duration);
                        batch.push(MediaEvent::DurationChanged(clock_to_secs(duration)));
                    }
                }
                if let Some(position) = playbin.query_position::<ClockTime>() {
                    batch.push(MediaEvent::TimeUpdate(clock_to_secs(position)));
                }
                let ranges = buffered_ranges(&playbin);
                if !ranges.is_empty() {
                    batch.push(MediaEvent::Progress(ranges));
                }
                for event in batch {
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
            }
        }));
    }

    fn seek_at(&self, position: ClockTime) -> Result<(), BackendError> {
        self.playbin
            .seek(
                self.rate.value(),
                SeekFlags::FLUSH | SeekFlags::ACCURATE,
                SeekType::Set,
                position,
                SeekType::End,
                ClockTime::ZERO,
            )
            .map_err(|e| BackendError::State(e.to_string()))
    }

    fn set_state(&self, state: State) -> Result<(), BackendError> {
        self.playbin
            .set_state(state)
            .map(|_| ())
            .map_err(|_| BackendError::State(format!("Failed to set pipeline to {state:?}")))
    }
}

fn buffered_ranges(playbin: &Element) -> TimeRanges {
    let mut query = gstreamer::query::Buffering::new(gstreamer::Format::Time);
    if !playbin.query(&mut query) {
        return Vec::new();
    }
    let (start, stop, _) = query.range();
    let (start, stop) = (start.value(), stop.value());
    if start < 0 || stop < 0 {
        return Vec::new();
    }
    #[allow(clippy::cast_sign_loss)]
    let range = (
        clock_to_secs(ClockTime::from_nseconds(start as u64)),
        clock_to_secs(ClockTime::from_nseconds(stop as u64)),
    );
    vec![range]
}

fn translate(msg: &Message, playbin: &Element) -> Option<MediaEvent> {
    match msg.view() {
        MessageView::Eos(_) => {
            info!("EOS message received");
            Some(MediaEvent::Ended)
        }
        MessageView::Error(err) => {
            error!("Error from GStreamer pipeline: {}", err.error());
            Some(MediaEvent::Error(err.error().to_string()))
        }
        MessageView::Buffering(buffering) => match buffering.percent() {
            0 => Some(MediaEvent::Stalled),
            1..=99 => Some(MediaEvent::Waiting),
            _ => Some(MediaEvent::CanPlayThrough),
        },
        MessageView::AsyncDone(_) => Some(MediaEvent::CanPlay),
        MessageView::DurationChanged(_) => playbin
            .query_duration::<ClockTime>()
            .map(|d| MediaEvent::DurationChanged(clock_to_secs(d))),
        MessageView::StateChanged(change) => {
            let from_playbin = msg
                .src()
                .is_some_and(|src| src == playbin.upcast_ref::<gstreamer::Object>());
            if !from_playbin {
                return None;
            }
            match (change.old(), change.current()) {
                (_, State::Playing) => Some(MediaEvent::Playing),
                (State::Playing, State::Paused) => Some(MediaEvent::Paused),
                (State::Ready, State::Paused) => Some(MediaEvent::LoadedData),
                _ => None,
            }
        }
        _ => None,
    }
}

impl MediaBackend for GstBackend {
    fn load(&mut self, source: &str) -> Result<(), BackendError> {
        let uri = to_uri(source)?;
        self.playbin.set_property("uri", uri.as_str());
        self.listen_to_bus()?;
        self.poll_position();
        // Preroll so duration and the first frame become available.
        self.set_state(State::Paused)
    }

    fn play(&mut self) -> Result<(), BackendError> {
        self.playbin
            .set_state(State::Playing)
            .map(|_| ())
            .map_err(|_| BackendError::Rejected("Pipeline refused to start playing".to_string()))
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.set_state(State::Paused)
    }

    fn seek(&mut self, seconds: f64) -> Result<(), BackendError> {
        self.seek_at(secs_to_clock(seconds))
    }

    fn set_volume(&mut self, volume: f64) -> Result<(), BackendError> {
        self.playbin.set_property("volume", volume);
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> Result<(), BackendError> {
        self.playbin.set_property("mute", muted);
        Ok(())
    }

    fn set_rate(&mut self, rate: PlaybackRate) -> Result<(), BackendError> {
        let previous = self.rate;
        self.rate = rate;
        let position = self
            .playbin
            .query_position::<ClockTime>()
            .unwrap_or(ClockTime::ZERO);
        if let Err(e) = self.seek_at(position) {
            self.rate = previous;
            return Err(e);
        }
        Ok(())
    }

    fn set_fullscreen(&mut self, _fullscreen: bool) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("fullscreen"))
    }

    fn release(&mut self) {
        for handle in self.tasks.drain(..) {
            handle.abort();
        }
        if let Err(e) = self.playbin.set_state(State::Null) {
            warn!("Failed to stop pipeline: {}", e);
        }
    }
}
