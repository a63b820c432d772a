mod error;
#[path = "../showreel/timefmt.rs"]
mod timefmt;

use clap::{Parser, Subcommand, ValueEnum};
use error::App;
use serde::Deserialize;
use timefmt::format_time;
use tokio::process::Command;
use zbus::{proxy, Connection};

type StdResult<T> = std::result::Result<T, App>;

#[proxy(
    interface = "org.showreel.Player",
    default_service = "org.showreel.Player",
    default_path = "/org/showreel/Player"
)]
trait ShowreelPlayer {
    async fn test_connection(&self) -> zbus::Result<()>;
    async fn open(&self, source: &str) -> zbus::Result<()>;
    async fn play(&self) -> zbus::Result<()>;
    async fn pause(&self) -> zbus::Result<()>;
    async fn toggle_play(&self) -> zbus::Result<()>;
    async fn seek(&self, seconds: f64) -> zbus::Result<()>;
    async fn seek_by(&self, delta: f64) -> zbus::Result<()>;
    async fn set_volume(&self, volume: f64) -> zbus::Result<()>;
    async fn toggle_mute(&self) -> zbus::Result<()>;
    async fn set_rate(&self, rate: f64) -> zbus::Result<()>;
    async fn toggle_fullscreen(&self) -> zbus::Result<()>;
    async fn pointer_moved(&self) -> zbus::Result<()>;
    async fn pointer_left(&self) -> zbus::Result<()>;
    async fn key(&self, name: &str) -> zbus::Result<()>;
    async fn status(&self) -> zbus::Result<String>;
    async fn theme(&self) -> zbus::Result<String>;
    async fn set_theme(&self, theme: &str) -> zbus::Result<()>;
    async fn stop(&self) -> zbus::Result<()>;
}

#[derive(Parser)]
#[command(
    name = "srctl",
    about = "Control the showreel video player.",
    version = "1.0.0"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start showreel, optionally loading a video")]
    Start { source: Option<String> },

    #[command(about = "Load a video URL or file")]
    Open { source: String },

    #[command(about = "Resume playback")]
    Play,

    #[command(about = "Pause playback")]
    Pause,

    #[command(about = "Toggle between playing and paused")]
    Toggle,

    #[command(about = "Seek to a position in seconds")]
    Seek(SeekCommand),

    #[command(about = "Set the volume between 0 and 1")]
    Volume {
        #[arg(allow_negative_numbers = true)]
        level: f64,
    },

    #[command(about = "Toggle mute")]
    Mute,

    #[command(about = "Set the playback speed (0.5, 1, 1.5 or 2)")]
    Speed { rate: f64 },

    #[command(about = "Toggle fullscreen")]
    Fullscreen,

    #[command(about = "Report pointer activity over the video (move shows controls, leave hides them)")]
    Pointer { action: PointerArg },

    #[command(about = "Send a keyboard shortcut (space, k, f, m, left, right, up, down)")]
    Key { name: String },

    #[command(about = "Show the playback state")]
    Status {
        #[arg(long, help = "Print the raw JSON snapshot")]
        json: bool,
    },

    #[command(about = "Show or set the theme preference")]
    Theme { theme: Option<ThemeArg> },

    #[command(about = "Stop showreel")]
    Stop,
}

#[derive(Parser)]
struct SeekCommand {
    #[arg(allow_negative_numbers = true, help = "Target position in seconds")]
    seconds: f64,
    #[arg(short = 'r', long = "relative", help = "Seek relative to the current position")]
    relative: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PointerArg {
    Move,
    Leave,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ThemeArg {
    Dark,
    Light,
}

impl ThemeArg {
    fn as_str(self) -> &'static str {
        match self {
            ThemeArg::Dark => "dark",
            ThemeArg::Light => "light",
        }
    }
}

#[derive(Deserialize, Debug)]
struct Status {
    phase: String,
    source: Option<String>,
    is_playing: bool,
    current_time: f64,
    duration: Option<f64>,
    buffered_fraction: f64,
    buffer_health: f64,
    volume: f64,
    is_muted: bool,
    playback_rate: f64,
    is_fullscreen: bool,
    is_loading: bool,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> StdResult<()> {
    let cli = Cli::parse();
    let connection = Connection::session().await?;
    let proxy = ShowreelPlayerProxy::new(&connection).await?;
    handle_command(cli, proxy).await
}

async fn handle_command(cli: Cli, proxy: ShowreelPlayerProxy<'_>) -> StdResult<()> {
    if let Commands::Start { source } = cli.command {
        return start_showreel(source, &proxy).await;
    }
    if !is_showreel_running(&proxy).await? {
        eprintln!("showreel is not running, start it with `srctl start`");
        return Ok(());
    }

    let result = match cli.command {
        Commands::Start { .. } => Ok(()),
        Commands::Open { source } => proxy.open(&source).await,
        Commands::Play => proxy.play().await,
        Commands::Pause => proxy.pause().await,
        Commands::Toggle => proxy.toggle_play().await,
        Commands::Seek(seek) if seek.relative => proxy.seek_by(seek.seconds).await,
        Commands::Seek(seek) => proxy.seek(seek.seconds).await,
        Commands::Volume { level } => proxy.set_volume(level).await,
        Commands::Mute => proxy.toggle_mute().await,
        Commands::Speed { rate } => proxy.set_rate(rate).await,
        Commands::Fullscreen => proxy.toggle_fullscreen().await,
        Commands::Pointer {
            action: PointerArg::Move,
        } => proxy.pointer_moved().await,
        Commands::Pointer {
            action: PointerArg::Leave,
        } => proxy.pointer_left().await,
        Commands::Key { name } => proxy.key(&name).await,
        Commands::Status { json } => return show_status(&proxy, json).await,
        Commands::Theme { theme: Some(theme) } => proxy.set_theme(theme.as_str()).await,
        Commands::Theme { theme: None } => {
            println!("{}", proxy.theme().await?);
            Ok(())
        }
        Commands::Stop => {
            proxy.stop().await?;
            println!("showreel stopped");
            Ok(())
        }
    };
    report(result)
}

/// Prints argument rejections from the player instead of failing the CLI.
fn report(result: zbus::Result<()>) -> StdResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(zbus::Error::MethodError(_, Some(detail), _)) => {
            eprintln!("{detail}");
            Ok(())
        }
        Err(e) => Err(App::Zbus(e)),
    }
}

async fn is_showreel_running(proxy: &ShowreelPlayerProxy<'_>) -> StdResult<bool> {
    match proxy.test_connection().await {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}

async fn show_status(proxy: &ShowreelPlayerProxy<'_>, json: bool) -> StdResult<()> {
    let raw = proxy.status().await?;
    if json {
        println!("{raw}");
        return Ok(());
    }
    let status: Status = serde_json::from_str(&raw)?;
    println!("{}", render_status(&status));
    Ok(())
}

fn render_status(status: &Status) -> String {
    let duration = status.duration.unwrap_or(f64::NAN);
    let mut lines = vec![
        format!(
            "{} {} / {}",
            if status.is_playing { "▶" } else { "⏸" },
            format_time(status.current_time),
            format_time(duration)
        ),
        format!(
            "state: {}{}",
            status.phase,
            if status.is_loading { " (buffering)" } else { "" }
        ),
        format!(
            "volume: {:.0}%{}  speed: {}x{}",
            status.volume * 100.0,
            if status.is_muted { " (muted)" } else { "" },
            status.playback_rate,
            if status.is_fullscreen { "  fullscreen" } else { "" }
        ),
        format!(
            "buffered: {:.0}%  ahead: {:.1}s",
            status.buffered_fraction * 100.0,
            status.buffer_health
        ),
    ];
    if let Some(source) = &status.source {
        lines.insert(0, source.clone());
    }
    if let Some(error) = &status.error {
        lines.push(format!("error: {error}"));
    }
    lines.join("\n")
}

async fn start_showreel(source: Option<String>, proxy: &ShowreelPlayerProxy<'_>) -> StdResult<()> {
    if is_showreel_running(proxy).await? {
        match source {
            Some(source) => report(proxy.open(&source).await)?,
            None => println!("showreel is already running"),
        }
        return Ok(());
    }

    let current_exe_path = std::env::current_exe()?;
    let exe_dir = current_exe_path.parent().ok_or_else(|| {
        App::InvalidInput("Failed to get the directory of the executable".to_string())
    })?;
    let showreel_path = exe_dir.join("showreel");

    if !showreel_path.exists() {
        return Err(App::InvalidInput(
            "showreel executable not found in the same directory".to_string(),
        ));
    }

    let mut command = Command::new(showreel_path);
    if let Some(source) = source {
        command.arg(source);
    }
    let child = command.spawn().map_err(App::Io)?;
    println!("showreel started, process ID: {:?}", child.id());
    Ok(())
}
