use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use zbus::{fdo, interface, ConnectionBuilder};

use crate::config::{Config, Theme};
use crate::error::App;
use crate::player::keys::Key;
use crate::player::service::Reply;
use crate::player::state::ControlError;
use crate::player::PlayerCommand;

pub const BUS_NAME: &str = "org.showreel.Player";
pub const OBJECT_PATH: &str = "/org/showreel/Player";

#[derive(Clone)]
pub struct PlayerDBus {
    tx: mpsc::Sender<PlayerCommand>,
    stop_signal: watch::Sender<()>,
    config: Arc<Mutex<Config>>,
    config_path: PathBuf,
}

impl PlayerDBus {
    async fn send(&self, command: PlayerCommand) -> fdo::Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|e| fdo::Error::Failed(format!("Player is not running: {e}")))
    }

    async fn request(&self, command: impl FnOnce(Reply) -> PlayerCommand) -> fdo::Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply)).await?;
        response
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))?
            .map_err(|e| fdo::Error::InvalidArgs(e.to_string()))
    }
}

#[interface(name = "org.showreel.Player")]
impl PlayerDBus {
    async fn test_connection(&self) -> fdo::Result<()> {
        Ok(())
    }

    async fn open(&self, source: String) -> fdo::Result<()> {
        self.send(PlayerCommand::Open(source)).await
    }

    async fn play(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::Play).await
    }

    async fn pause(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::Pause).await
    }

    async fn toggle_play(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::TogglePlay).await
    }

    async fn seek(&self, seconds: f64) -> fdo::Result<()> {
        self.request(|reply| PlayerCommand::Seek(seconds, reply)).await
    }

    async fn seek_by(&self, delta: f64) -> fdo::Result<()> {
        self.request(|reply| PlayerCommand::SeekBy(delta, reply)).await
    }

    async fn set_volume(&self, volume: f64) -> fdo::Result<()> {
        self.request(|reply| PlayerCommand::SetVolume(volume, reply)).await
    }

    async fn toggle_mute(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::ToggleMute).await
    }

    async fn set_rate(&self, rate: f64) -> fdo::Result<()> {
        self.request(|reply| PlayerCommand::SetRate(rate, reply)).await
    }

    async fn toggle_fullscreen(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::ToggleFullscreen).await
    }

    async fn pointer_moved(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::PointerMoved).await
    }

    async fn pointer_left(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::PointerLeft).await
    }

    async fn key(&self, name: String) -> fdo::Result<()> {
        let key: Key = name
            .parse()
            .map_err(|e: ControlError| fdo::Error::InvalidArgs(e.to_string()))?;
        self.send(PlayerCommand::Key(key)).await
    }

    async fn status(&self) -> fdo::Result<String> {
        let (reply, response) = oneshot::channel();
        self.send(PlayerCommand::Status(reply)).await?;
        let state = response
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))?;
        serde_json::to_string(&state).map_err(|e| fdo::Error::Failed(e.to_string()))
    }

    async fn theme(&self) -> fdo::Result<String> {
        Ok(self.config.lock().await.theme.to_string())
    }

    async fn set_theme(&self, theme: String) -> fdo::Result<()> {
        let theme: Theme = theme
            .parse()
            .map_err(|e: App| fdo::Error::InvalidArgs(e.to_string()))?;
        let mut config = self.config.lock().await;
        config.theme = theme;
        config
            .save(&self.config_path)
            .await
            .map_err(|e| fdo::Error::Failed(e.to_string()))?;
        info!("Theme set to {}", theme);
        Ok(())
    }

    async fn stop(&self) -> fdo::Result<()> {
        self.send(PlayerCommand::Shutdown).await?;
        if let Err(e) = self.stop_signal.send(()) {
            error!("Failed to send stop signal: {}", e);
        }
        Ok(())
    }
}

pub async fn run_dbus_server(
    command_sender: mpsc::Sender<PlayerCommand>,
    stop_signal: watch::Sender<()>,
    config: Arc<Mutex<Config>>,
    config_path: PathBuf,
) -> Result<(), App> {
    let player_dbus = PlayerDBus {
        tx: command_sender,
        stop_signal: stop_signal.clone(),
        config,
        config_path,
    };

    let _connection = ConnectionBuilder::session()?
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, player_dbus)?
        .build()
        .await?;

    let mut stop_receiver = stop_signal.subscribe();

    // Wait for the stop signal
    tokio::select! {
        _ = stop_receiver.changed() => {
            info!("Stop signal received, shutting down DBus server...");
        }
    }

    Ok(())
}
