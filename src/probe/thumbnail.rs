//! Single-frame thumbnail grab through ffmpeg.

use std::path::Path;
use std::time::Duration;

use super::process::ProcessRunner;
use super::ProbeError;
use crate::media::Thumbnail;

/// Seek target for video frames, clamped to half the duration for short clips.
pub const DEFAULT_SEEK_SECS: f64 = 4.0;

pub fn seek_position(duration: Option<f64>) -> f64 {
    match duration {
        Some(d) if d > 0.0 => DEFAULT_SEEK_SECS.min(d / 2.0),
        _ => 0.0,
    }
}

/// Which frame to grab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameSource {
    /// A video frame at the given offset in seconds.
    Video { seek: f64 },
    /// An embedded cover image (ffmpeg's `attached pic` stream).
    AttachedPicture { stream: u32 },
}

pub fn ffmpeg_args(path: &Path, source: FrameSource) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into()];
    if let FrameSource::Video { seek } = source {
        args.extend(["-ss".into(), format!("{seek:.3}")]);
    }
    args.extend(["-i".into(), path.to_string_lossy().into_owned()]);
    if let FrameSource::AttachedPicture { stream } = source {
        args.extend(["-map".into(), format!("0:{stream}")]);
    }
    args.extend(
        ["-an", "-sn", "-frames:v", "1", "-f", "image2", "-c:v", "mjpeg", "pipe:1"]
            .map(String::from),
    );
    args
}

/// Grab one frame as JPEG. Any failure, timeout included, leaves the
/// thumbnail unset; nothing else about the asset depends on it.
pub fn extract(
    runner: &dyn ProcessRunner,
    ffmpeg: &Path,
    path: &Path,
    source: FrameSource,
    timeout: Duration,
) -> Option<Thumbnail> {
    let output = match runner.run(ffmpeg, &ffmpeg_args(path, source), timeout) {
        Ok(out) => out,
        Err(ProbeError::Timeout { .. }) => {
            log::warn!("thumbnail extraction timed out for {}", path.display());
            return None;
        }
        Err(e) => {
            log::warn!("thumbnail extraction failed for {}: {e}", path.display());
            return None;
        }
    };
    if !output.success() || output.stdout.is_empty() {
        log::debug!(
            "no thumbnail for {} ({})",
            path.display(),
            output.status_string()
        );
        return None;
    }
    Some(Thumbnail {
        data: output.stdout,
        mime: "image/jpeg".to_string(),
        width: None,
        height: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::process::ProcessOutput;
    use crate::probe::Result;

    struct Canned(Result<ProcessOutput>);

    impl ProcessRunner for Canned {
        fn run(&self, _: &Path, _: &[String], timeout: Duration) -> Result<ProcessOutput> {
            match &self.0 {
                Ok(out) => Ok(out.clone()),
                Err(_) => Err(ProbeError::Timeout {
                    tool: "ffmpeg".into(),
                    timeout,
                }),
            }
        }
    }

    #[test]
    fn seek_is_clamped_for_short_clips() {
        assert_eq!(seek_position(Some(600.0)), 4.0);
        assert_eq!(seek_position(Some(3.0)), 1.5);
        assert_eq!(seek_position(None), 0.0);
    }

    #[test]
    fn attached_picture_maps_its_stream() {
        let args = ffmpeg_args(Path::new("/a/song.m4a"), FrameSource::AttachedPicture { stream: 2 });
        assert!(!args.contains(&"-ss".to_string()));
        let map = args.iter().position(|a| a == "-map").unwrap();
        assert_eq!(args[map + 1], "0:2");
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn timeout_leaves_thumbnail_unset() {
        let runner = Canned(Err(ProbeError::Unresolved("x".into())));
        let thumb = extract(
            &runner,
            Path::new("ffmpeg"),
            Path::new("/v.mkv"),
            FrameSource::Video { seek: 4.0 },
            Duration::from_millis(10),
        );
        assert!(thumb.is_none());
    }

    #[test]
    fn jpeg_bytes_become_thumbnail() {
        let runner = Canned(Ok(ProcessOutput {
            code: Some(0),
            stdout: vec![0xFF, 0xD8, 0xFF, 0xD9],
            stderr: Vec::new(),
        }));
        let thumb = extract(
            &runner,
            Path::new("ffmpeg"),
            Path::new("/v.mkv"),
            FrameSource::Video { seek: 1.0 },
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(thumb.mime, "image/jpeg");
        assert_eq!(thumb.data.len(), 4);
    }
}
