use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

/// Application configuration loaded from TOML config file.
/// Every field has a default; the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directories to scan for media (used when `scan` has no CLI args).
    pub media_dirs: Vec<PathBuf>,
    /// Custom cache path (overrides XDG default).
    pub db_path: Option<PathBuf>,
    /// Number of parallel probe workers. 0 = auto-detect (cores / 2, min 1).
    pub workers: usize,
    /// Explicit `ffmpeg` binary; otherwise looked up on `PATH`.
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit `mediainfo` binary; otherwise looked up on `PATH`.
    pub mediainfo_path: Option<PathBuf>,
    pub probe_timeout_secs: u64,
    pub thumbnail_timeout_secs: u64,
    pub generate_thumbnails: bool,
    /// Word used for untitled cue tracks ("Track #3").
    pub track_label: String,
    /// Engine assigned to virtual tracks that cover part of a file.
    pub transcoder: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            media_dirs: Vec::new(),
            db_path: None,
            workers: 0,
            ffmpeg_path: None,
            mediainfo_path: None,
            probe_timeout_secs: 30,
            thumbnail_timeout_secs: 10,
            generate_thumbnails: true,
            track_label: "Track".to_string(),
            transcoder: "ffmpeg-audio".to_string(),
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/mediameta/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|e| {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }),
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        let config = toml::from_str::<AppConfig>(contents)?;
        log::info!("Loaded config ({} media dirs)", config.media_dirs.len());
        Ok(config)
    }

    /// Resolve worker count: 0 → auto-detect (cores / 2, min 1).
    pub fn resolve_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2);
            (cores / 2).max(1)
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Resolve the default cache path using XDG data directory.
pub fn default_db_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", crate::APP_NAME) {
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).ok();
        data_dir.join("mediameta.db")
    } else {
        // Fallback: current directory
        PathBuf::from("mediameta.db")
    }
}
