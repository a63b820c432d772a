use crate::player::backend::{BackendError, EventSender, MediaBackend, MediaEvent};
use crate::player::controller::{initial_volume, Controller, Settings};
use crate::player::keys::Key;
use crate::player::state::{ControlError, Phase, PlaybackState};
use log::{error, info, warn};
use std::future::pending;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

const EVENT_CAPACITY: usize = 64;

pub type Reply = oneshot::Sender<Result<(), ControlError>>;

pub enum PlayerCommand {
    Open(String),
    Play,
    Pause,
    TogglePlay,
    Seek(f64, Reply),
    SeekBy(f64, Reply),
    SetVolume(f64, Reply),
    SetRate(f64, Reply),
    ToggleMute,
    ToggleFullscreen,
    PointerMoved,
    PointerLeft,
    Key(Key),
    Status(oneshot::Sender<PlaybackState>),
    Shutdown,
}

/// Owns the controller and serializes commands, media events and the
/// auto-hide timer on a single task.
pub struct Player<B, F>
where
    B: MediaBackend,
    F: FnMut(EventSender) -> Result<B, BackendError>,
{
    make_backend: F,
    settings: Settings,
    controller: Option<Controller<B>>,
    events: Option<mpsc::Receiver<MediaEvent>>,
    unavailable: PlaybackState,
}

impl<B, F> Player<B, F>
where
    B: MediaBackend,
    F: FnMut(EventSender) -> Result<B, BackendError>,
{
    pub fn new(make_backend: F, settings: Settings) -> Self {
        Self {
            make_backend,
            settings,
            controller: None,
            events: None,
            unavailable: PlaybackState {
                volume: initial_volume(settings.volume),
                ..PlaybackState::default()
            },
        }
    }

    pub fn open(&mut self, source: &str) {
        self.unmount();
        let (event_sender, event_receiver) = mpsc::channel(EVENT_CAPACITY);
        match (self.make_backend)(event_sender) {
            Ok(backend) => {
                self.controller = Some(Controller::mount(backend, source, self.settings));
                self.events = Some(event_receiver);
            }
            Err(e) => {
                error!("Failed to create media backend for {}: {}", source, e);
                self.unavailable = PlaybackState {
                    phase: Phase::Failed,
                    source: Some(source.to_string()),
                    error: Some(e.to_string()),
                    ..self.unavailable.clone()
                };
            }
        }
    }

    fn unmount(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            controller.unmount();
        }
        self.events = None;
    }

    pub fn snapshot(&self) -> PlaybackState {
        self.controller
            .as_ref()
            .map_or_else(|| self.unavailable.clone(), |c| c.state().clone())
    }

    fn reply(reply: Reply, result: Result<(), ControlError>) {
        if let Err(e) = &result {
            warn!("Rejected command: {}", e);
        }
        let _ = reply.send(result);
    }

    fn handle_command(&mut self, command: PlayerCommand) {
        if let PlayerCommand::Open(source) = command {
            info!("Open {}", source);
            self.open(&source);
            return;
        }
        if let PlayerCommand::Status(reply) = command {
            let _ = reply.send(self.snapshot());
            return;
        }

        let Some(controller) = self.controller.as_mut() else {
            warn!("No media loaded, ignoring command");
            return;
        };
        match command {
            PlayerCommand::Play => controller.play(),
            PlayerCommand::Pause => controller.pause(),
            PlayerCommand::TogglePlay => controller.toggle_play(),
            PlayerCommand::Seek(time, reply) => Self::reply(reply, controller.seek(time)),
            PlayerCommand::SeekBy(delta, reply) => Self::reply(reply, controller.seek_by(delta)),
            PlayerCommand::SetVolume(volume, reply) => {
                Self::reply(reply, controller.set_volume(volume));
            }
            PlayerCommand::SetRate(rate, reply) => {
                Self::reply(reply, controller.set_playback_rate(rate));
            }
            PlayerCommand::ToggleMute => controller.toggle_mute(),
            PlayerCommand::ToggleFullscreen => controller.toggle_fullscreen(),
            PlayerCommand::PointerMoved => controller.pointer_moved(),
            PlayerCommand::PointerLeft => controller.pointer_left(),
            PlayerCommand::Key(key) => controller.handle_key(key),
            PlayerCommand::Open(_) | PlayerCommand::Status(_) | PlayerCommand::Shutdown => {}
        }
    }

    pub async fn run(mut self, mut commands: mpsc::Receiver<PlayerCommand>) {
        loop {
            let deadline = self
                .controller
                .as_ref()
                .and_then(Controller::autohide_deadline);

            // Pending media events are applied before the next command.
            tokio::select! {
                biased;
                event = next_event(&mut self.events) => match event {
                    Some(event) => {
                        if let Some(controller) = self.controller.as_mut() {
                            controller.handle_event(event);
                        }
                    }
                    None => self.events = None,
                },
                command = commands.recv() => match command {
                    Some(PlayerCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                () = wait_until(deadline) => {
                    if let Some(controller) = self.controller.as_mut() {
                        controller.poll_autohide();
                    }
                }
            }
        }
        info!("Player shutting down");
        self.unmount();
    }
}

async fn next_event(events: &mut Option<mpsc::Receiver<MediaEvent>>) -> Option<MediaEvent> {
    match events {
        Some(receiver) => receiver.recv().await,
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
