use crate::error::App;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_AUTOHIDE_MS: u64 = 3000;
pub const DEFAULT_SEEK_STEP: f64 = 5.0;
pub const DEFAULT_VOLUME_STEP: f64 = 0.1;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Dark => f.write_str("dark"),
            Theme::Light => f.write_str("light"),
        }
    }
}

impl FromStr for Theme {
    type Err = App;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(App::InvalidInput(format!("Unknown theme: {other}"))),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub theme: Theme,
    pub autohide_ms: u64,
    pub volume: f64,
    pub seek_step: f64,
    pub volume_step: f64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            autohide_ms: DEFAULT_AUTOHIDE_MS,
            volume: 1.0,
            seek_step: DEFAULT_SEEK_STEP,
            volume_step: DEFAULT_VOLUME_STEP,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn autohide(&self) -> Duration {
        Duration::from_millis(self.autohide_ms)
    }

    pub async fn load_or_create(path: &Path) -> Result<Self, App> {
        if !path.exists() {
            let config = Config::default();
            config.save(path).await?;
            return Ok(config);
        }
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, App> {
        let mut config: Config = toml::from_str(content)?;
        if !config.volume.is_finite() {
            return Err(App::InvalidInput(format!(
                "volume must be a number between 0 and 1, got {}",
                config.volume
            )));
        }
        config.volume = config.volume.clamp(0.0, 1.0);
        for (name, step) in [
            ("seek_step", config.seek_step),
            ("volume_step", config.volume_step),
        ] {
            if !step.is_finite() || step <= 0.0 {
                return Err(App::InvalidInput(format!(
                    "{name} must be a positive number, got {step}"
                )));
            }
        }
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<(), App> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, toml::to_string(self)?).await?;
        Ok(())
    }
}

pub fn config_dir() -> Result<PathBuf, App> {
    let home_dir = std::env::var("HOME")
        .map_err(|e| App::Io(format!("Failed to get HOME environment variable: {e}")))?;
    Ok(PathBuf::from(home_dir).join(".config/showreel"))
}
