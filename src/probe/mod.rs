//! Prober backends.
//!
//! Each backend turns its tool's output into `(stream kind, field, value)`
//! triples and feeds them through a [`ProbeSession`], which does the
//! classification and builds the [`MediaInfo`].

pub mod ffmpeg;
pub mod mediainfo;
pub mod process;
pub mod session;
pub mod tags;
pub mod thumbnail;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::AppConfig;
use crate::media::MediaInfo;

pub use ffmpeg::FfmpegProber;
pub use mediainfo::MediaInfoProber;
pub use process::{ProcessOutput, ProcessRunner, WatchdogRunner};
pub use session::ProbeSession;
pub use tags::TagProber;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} timed out after {timeout:?}")]
    Timeout { tool: String, timeout: Duration },
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("could not parse {tool} output: {message}")]
    Parse { tool: String, message: String },
    #[error("tag read failed: {0}")]
    Tags(#[from] lofty::error::LoftyError),
    #[error("no usable format resolved for {0}")]
    Unresolved(PathBuf),
    #[error("no prober supports {0}")]
    Unsupported(PathBuf),
}

pub type Result<T> = std::result::Result<T, ProbeError>;

/// A media file prober.
pub trait Prober: Send + Sync {
    fn name(&self) -> &'static str;

    /// Probe a file. A partially successful probe still returns `Ok` with
    /// whatever fields could be read.
    fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// Cheap check (extension) whether [`Prober::probe`] is worth trying.
    fn supports(&self, path: &Path) -> bool;
}

/// Tries each prober in order and returns the first success.
pub struct CompositeProber {
    probers: Vec<Box<dyn Prober>>,
}

impl CompositeProber {
    pub fn new(probers: Vec<Box<dyn Prober>>) -> Self {
        Self { probers }
    }

    /// Build the default chain from config: mediainfo, then ffmpeg, then
    /// tag reading. Tools that cannot be found are skipped.
    pub fn from_config(config: &AppConfig) -> Self {
        let runner: Arc<dyn ProcessRunner> = Arc::new(WatchdogRunner);
        let probe_timeout = Duration::from_secs(config.probe_timeout_secs);
        let mut probers: Vec<Box<dyn Prober>> = Vec::new();

        match find_tool(config.mediainfo_path.as_deref(), "mediainfo") {
            Some(path) => probers.push(Box::new(MediaInfoProber::new(
                path,
                Arc::clone(&runner),
                probe_timeout,
            ))),
            None => log::info!("mediainfo not found, skipping structured prober"),
        }

        match find_tool(config.ffmpeg_path.as_deref(), "ffmpeg") {
            Some(path) => {
                let mut prober = FfmpegProber::new(path, Arc::clone(&runner), probe_timeout);
                if config.generate_thumbnails {
                    prober = prober
                        .with_thumbnails(Duration::from_secs(config.thumbnail_timeout_secs));
                }
                probers.push(Box::new(prober));
            }
            None => log::info!("ffmpeg not found, skipping text prober"),
        }

        probers.push(Box::new(TagProber::new(config.generate_thumbnails)));
        Self::new(probers)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.probers.iter().map(|p| p.name()).collect()
    }
}

impl Prober for CompositeProber {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn supports(&self, path: &Path) -> bool {
        self.probers.iter().any(|p| p.supports(path))
    }

    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let mut last_err = None;

        for prober in &self.probers {
            if !prober.supports(path) {
                continue;
            }
            match prober.probe(path) {
                Ok(info) => return Ok(info),
                Err(e) => {
                    log::debug!("{} failed on {}: {e}, trying next", prober.name(), path.display());
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ProbeError::Unsupported(path.to_path_buf())))
    }
}

/// Configured path if set, otherwise look the tool up on `PATH`.
pub fn find_tool(configured: Option<&Path>, name: &str) -> Option<PathBuf> {
    match configured {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => {
            log::warn!("configured {name} path {} does not exist", p.display());
            which::which(name).ok()
        }
        None => which::which(name).ok(),
    }
}

pub(crate) fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Format;

    struct Fixed {
        name: &'static str,
        ext: &'static str,
        result: Option<Format>,
    }

    impl Prober for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn probe(&self, path: &Path) -> Result<MediaInfo> {
            match self.result {
                Some(f) => {
                    let mut m = MediaInfo::new();
                    m.container = Some(f);
                    Ok(m)
                }
                None => Err(ProbeError::Unresolved(path.to_path_buf())),
            }
        }

        fn supports(&self, path: &Path) -> bool {
            extension_lower(path).as_deref() == Some(self.ext)
        }
    }

    #[test]
    fn first_success_wins() {
        let composite = CompositeProber::new(vec![
            Box::new(Fixed { name: "broken", ext: "mkv", result: None }),
            Box::new(Fixed { name: "good", ext: "mkv", result: Some(Format::Matroska) }),
            Box::new(Fixed { name: "late", ext: "mkv", result: Some(Format::Avi) }),
        ]);
        let info = composite.probe(Path::new("/x/movie.MKV")).unwrap();
        assert_eq!(info.container, Some(Format::Matroska));
    }

    #[test]
    fn unsupported_file_is_an_error() {
        let composite = CompositeProber::new(vec![Box::new(Fixed {
            name: "mkv-only",
            ext: "mkv",
            result: Some(Format::Matroska),
        })]);
        assert!(!composite.supports(Path::new("song.flac")));
        assert!(matches!(
            composite.probe(Path::new("song.flac")),
            Err(ProbeError::Unsupported(_))
        ));
    }

    #[test]
    fn last_error_is_reported() {
        let composite = CompositeProber::new(vec![Box::new(Fixed {
            name: "broken",
            ext: "avi",
            result: None,
        })]);
        assert!(matches!(
            composite.probe(Path::new("a.avi")),
            Err(ProbeError::Unresolved(_))
        ));
    }
}
