//! `mediainfo --Output=JSON` backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::process::ProcessRunner;
use super::session::{field, ProbeSession};
use super::{ProbeError, Prober, Result};
use crate::classifier::StreamKind;
use crate::media::MediaInfo;

#[derive(Debug, Deserialize)]
struct MiOutput {
    media: Option<MiMedia>,
}

#[derive(Debug, Deserialize)]
struct MiMedia {
    #[serde(default)]
    track: Vec<Map<String, Value>>,
}

/// Emitted first and in this order: later classifications depend on what
/// these resolve to.
const PRIORITY_KEYS: &[&str] = &[
    field::FORMAT,
    field::FORMAT_VERSION,
    field::FORMAT_PROFILE,
    field::FORMAT_ADDITIONAL_FEATURES,
];

/// Consumed while assembling other fields, never emitted on their own.
const ASSEMBLED_KEYS: &[&str] = &["Format_Level", "Format_Tier", "Video_Delay", "Delay", "extra"];

pub struct MediaInfoProber {
    mediainfo: PathBuf,
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

impl MediaInfoProber {
    pub fn new(mediainfo: PathBuf, runner: Arc<dyn ProcessRunner>, timeout: Duration) -> Self {
        Self {
            mediainfo,
            runner,
            timeout,
        }
    }
}

impl Prober for MediaInfoProber {
    fn name(&self) -> &'static str {
        "mediainfo"
    }

    fn supports(&self, path: &Path) -> bool {
        path.extension().is_some()
    }

    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let args = vec!["--Output=JSON".to_string(), path.to_string_lossy().into_owned()];
        let output = self.runner.run(&self.mediainfo, &args, self.timeout)?;
        if !output.success() {
            return Err(ProbeError::ToolFailed {
                tool: "mediainfo".into(),
                status: output.status_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let mut info = parse_output(&String::from_utf8_lossy(&output.stdout))?;
        if info.container.is_none() && info.audio_tracks.is_empty() && info.video_codec.is_none() {
            return Err(ProbeError::Unresolved(path.to_path_buf()));
        }
        if info.size.is_none() {
            info.size = std::fs::metadata(path).ok().map(|m| m.len());
        }
        Ok(info)
    }
}

fn stream_kind(track_type: &str) -> Option<StreamKind> {
    match track_type {
        "General" => Some(StreamKind::General),
        "Video" => Some(StreamKind::Video),
        "Audio" => Some(StreamKind::Audio),
        "Image" => Some(StreamKind::Image),
        "Text" => Some(StreamKind::Text),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `Format_Profile` + `Format_Level` + `Format_Tier` → `profile@Llevel@tier`.
fn profile_at_level(track: &Map<String, Value>) -> Option<String> {
    let profile = track.get(field::FORMAT_PROFILE).and_then(as_text)?;
    let mut out = profile;
    if let Some(level) = track.get("Format_Level").and_then(as_text) {
        if level.starts_with(|c: char| c.is_ascii_digit()) {
            out.push_str("@L");
        } else {
            out.push('@');
        }
        out.push_str(&level);
        if let Some(tier) = track.get("Format_Tier").and_then(as_text) {
            out.push('@');
            out.push_str(&tier);
        }
    }
    Some(out)
}

/// Convert mediainfo's JSON document into a finished [`MediaInfo`].
pub fn parse_output(json: &str) -> Result<MediaInfo> {
    let parsed: MiOutput = serde_json::from_str(json).map_err(|e| ProbeError::Parse {
        tool: "mediainfo".into(),
        message: e.to_string(),
    })?;
    let tracks = parsed.media.map(|m| m.track).unwrap_or_default();

    let mut session = ProbeSession::new();
    for track in &tracks {
        let Some(kind) = track.get("@type").and_then(Value::as_str).and_then(stream_kind) else {
            continue;
        };
        session.begin_stream(kind);

        for key in PRIORITY_KEYS {
            let value = if *key == field::FORMAT_PROFILE {
                profile_at_level(track)
            } else {
                track.get(*key).and_then(as_text)
            };
            if let Some(value) = value {
                session.field(kind, key, &value);
            }
        }

        for (key, value) in track {
            if key.starts_with('@')
                || key == field::CODEC_ID
                || PRIORITY_KEYS.contains(&key.as_str())
                || ASSEMBLED_KEYS.contains(&key.as_str())
            {
                continue;
            }
            if let Some(value) = as_text(value) {
                session.field(kind, key, &value);
            }
        }

        // Seconds in the JSON output; the session wants milliseconds.
        if let Some(secs) = track
            .get("Video_Delay")
            .and_then(as_text)
            .and_then(|s| s.parse::<f64>().ok())
        {
            session.field(kind, field::DELAY, &format!("{}", (secs * 1000.0).round()));
        }

        if let Some(Value::Object(extra)) = track.get("extra") {
            for (key, value) in extra {
                if let Some(value) = as_text(value) {
                    session.field(kind, &format!("{}{key}", field::EXTRA_PREFIX), &value);
                }
            }
        }

        if let Some(codec_id) = track.get(field::CODEC_ID).and_then(as_text) {
            session.field(kind, field::CODEC_ID, &codec_id);
        }
    }

    Ok(session.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Format, Level, SubtitleFormat};
    use crate::media::{MediaType, ScanType};

    const MOVIE: &str = r#"{
      "media": {
        "@ref": "/films/movie.mkv",
        "track": [
          {"@type": "General", "Format": "Matroska", "Duration": "5025.000",
           "OverallBitRate": "9500000", "FileSize": "5967342817",
           "extra": {"ErrorDetectionType": "Per level 1"}},
          {"@type": "Video", "Format": "AVC", "Format_Profile": "High",
           "Format_Level": "4.1", "CodecID": "V_MPEG4/ISO/AVC", "Width": "1920",
           "Height": "1080", "DisplayAspectRatio": "1.778", "FrameRate": "23.976",
           "FrameRate_Mode": "CFR", "ScanType": "Progressive", "BitDepth": "8",
           "Format_Settings_RefFrames": "4"},
          {"@type": "Audio", "Format": "DTS", "Format_AdditionalFeatures": "XLL",
           "Channels": "8 / 6", "SamplingRate": "48000", "BitDepth": "24",
           "Video_Delay": "-0.005", "Language": "en", "Title": "Surround"},
          {"@type": "Audio", "Format": "AC-3", "Channels": "2", "SamplingRate": "48000",
           "BitRate": "192000", "Language": "fr"},
          {"@type": "Text", "Format": "PGS", "Language": "en", "Forced": "No"},
          {"@type": "Menu"}
        ]
      }
    }"#;

    #[test]
    fn movie_document() {
        let m = parse_output(MOVIE).unwrap();
        assert_eq!(m.container, Some(Format::Matroska));
        assert_eq!(m.media_type, MediaType::Video);
        assert_eq!(m.duration, Some(5025.0));
        assert_eq!(m.bitrate, Some(9_500_000));
        assert_eq!(m.size, Some(5_967_342_817));

        assert_eq!(m.video_codec, Some(Format::H264));
        assert_eq!(m.video_profile.as_deref(), Some("High"));
        assert!(matches!(m.video_level, Some(Level::H264(_))));
        assert_eq!((m.width, m.height), (Some(1920), Some(1080)));
        assert_eq!(m.aspect_ratio_container.as_deref(), Some("1.778"));
        assert_eq!(m.scan_type, Some(ScanType::Progressive));
        assert_eq!(m.reference_frames, Some(4));

        assert_eq!(m.audio_tracks.len(), 2);
        let dts = &m.audio_tracks[0];
        assert_eq!(dts.codec, Some(Format::DtsHd));
        assert_eq!(dts.channels, Some(8));
        assert_eq!(dts.bit_depth, Some(24));
        assert_eq!(dts.delay, Some(-5));
        assert_eq!(dts.stream.title.as_deref(), Some("Surround"));
        assert_eq!(m.audio_tracks[1].codec, Some(Format::Ac3));
        assert_eq!(m.audio_tracks[1].bitrate, Some(192_000));

        assert_eq!(m.subtitle_tracks.len(), 1);
        assert_eq!(m.subtitle_tracks[0].format, Some(SubtitleFormat::Pgs));
        assert_eq!(
            m.extras.get("ErrorDetectionType").map(String::as_str),
            Some("Per level 1")
        );
    }

    #[test]
    fn mpeg2_alphabetic_level_is_reassembled() {
        let json = r#"{"media": {"track": [
            {"@type": "General", "Format": "MPEG-PS"},
            {"@type": "Video", "Format": "MPEG Video", "Format_Version": "Version 2",
             "Format_Profile": "Main", "Format_Level": "Main"}
        ]}}"#;
        let m = parse_output(json).unwrap();
        assert_eq!(m.video_codec, Some(Format::Mpeg2));
        assert_eq!(m.video_profile.as_deref(), Some("Main"));
        assert!(matches!(m.video_level, Some(Level::Mpeg2(_))));
    }

    #[test]
    fn audio_only_m4a() {
        let json = r#"{"media": {"track": [
            {"@type": "General", "Format": "MPEG-4", "CodecID": "M4A ",
             "Album": "Record", "Performer": "Artist", "Track": "Song"},
            {"@type": "Audio", "Format": "AAC", "Format_AdditionalFeatures": "LC",
             "SamplingRate": "44100", "Channels": "2"}
        ]}}"#;
        let m = parse_output(json).unwrap();
        assert_eq!(m.container, Some(Format::M4a));
        assert_eq!(m.audio_tracks[0].codec, Some(Format::AacLc));
        assert_eq!(m.audio_tracks[0].song_name.as_deref(), Some("Song"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(parse_output("{not json"), Err(ProbeError::Parse { .. })));
    }

    #[test]
    fn empty_media_yields_unknown_asset() {
        let m = parse_output(r#"{"media": null}"#).unwrap();
        assert_eq!(m.media_type, MediaType::Unknown);
        assert!(m.is_parsed());
    }
}
