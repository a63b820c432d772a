mod config;
mod dbus;
mod error;
mod player;
mod timefmt;

use crate::config::{config_dir, Config};
use crate::error::App;
use crate::player::controller::Settings;
use crate::player::gst_backend::GstBackend;
use crate::player::{Player, PlayerCommand};
use clap::Parser;
use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};
use log::{error, info};
use std::sync::Arc;
use tokio::fs;
use tokio::{
    sync::{mpsc, watch, Mutex},
    task,
};

#[derive(Parser)]
#[command(
    name = "showreel",
    about = "Video player daemon controlled over DBus.",
    version = "1.0.0"
)]
struct Args {
    /// URL or path of the video to load on startup
    source: Option<String>,

    /// Load the video without starting playback
    #[arg(long)]
    paused: bool,

    /// Overrides the log level from config.toml
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), App> {
    let args = Args::parse();
    let base_dir = config_dir()?;
    let log_dir = base_dir.join("logs");
    fs::create_dir_all(&log_dir).await?;

    let config_path = base_dir.join("config.toml");
    let config = Config::load_or_create(&config_path).await?;

    // Logger setup
    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    Logger::try_with_str(log_level)?
        .log_to_file(FileSpec::default().directory(&log_dir))
        .rotate(
            Criterion::Size(1_000_000),
            Naming::Timestamps,
            Cleanup::KeepLogFiles(3),
        )
        .duplicate_to_stderr(Duplicate::None)
        .start()?;

    gstreamer::init().map_err(|e| App::Init(e.to_string()))?;
    info!("GStreamer initialized, theme is {}", config.theme);

    let settings = Settings {
        autohide: config.autohide(),
        volume: config.volume,
        seek_step: config.seek_step,
        volume_step: config.volume_step,
    };
    let (command_sender, command_receiver) = mpsc::channel(16);
    let (stop_sender, stop_receiver) = watch::channel(());

    let player = Player::new(GstBackend::new, settings);
    let player_task = task::spawn(player.run(command_receiver));

    if let Some(source) = args.source {
        command_sender.send(PlayerCommand::Open(source)).await?;
        if !args.paused {
            command_sender.send(PlayerCommand::Play).await?;
        }
    }

    task::spawn({
        let command_sender = command_sender.clone();
        let stop_sender = stop_sender.clone();
        let config = Arc::new(Mutex::new(config));
        async move {
            if let Err(e) =
                dbus::run_dbus_server(command_sender, stop_sender, config, config_path).await
            {
                error!("DBus listener error: {}", e);
            }
        }
    });

    wait_for_stop_signal(stop_receiver).await;
    // The player task may already be gone if stop came over DBus.
    let _ = command_sender.send(PlayerCommand::Shutdown).await;
    player_task.await.map_err(|e| App::Pipeline(e.to_string()))?;
    info!("showreel stopped");
    Ok(())
}

async fn wait_for_stop_signal(mut stop_receiver: watch::Receiver<()>) {
    tokio::select! {
        result = stop_receiver.changed() => {
            if result.is_err() {
                error!("Stop signal sender dropped");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping player");
        }
    }
}
