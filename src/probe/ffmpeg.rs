//! `ffmpeg -i` diagnostic-text backend.
//!
//! ffmpeg has no machine-readable probe mode we rely on here; the stream
//! summary it prints to stderr is scraped line by line and mapped onto the
//! same field names the structured backend uses.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;

use super::process::ProcessRunner;
use super::session::{field, ProbeSession};
use super::thumbnail::{self, FrameSource};
use super::{ProbeError, Prober, Result};
use crate::classifier::StreamKind;
use crate::media::{MediaInfo, MediaType};

static INPUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Input #\d+, ([^,]+)(?:,[^ ]*)?, from").unwrap());
static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*Duration: ([^,]+)(?:, start: [^,]+)?(?:, bitrate: (\d+ kb/s))?").unwrap()
});
static STREAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*Stream #\d+:(\d+)(?:\[0x[0-9a-fA-F]+\])?(?:\(([A-Za-z]+)\))?: (Video|Audio|Subtitle|Data|Attachment): (.*)$",
    )
    .unwrap()
});
static METADATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+([A-Za-z_][A-Za-z0-9_\-]*)\s*: (.*)$").unwrap());
static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{2,5})x(\d{2,5})\b").unwrap());
static DAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"DAR (\d+:\d+)").unwrap());
static PIX_DEPTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"p(\d{2})(?:le|be)\b").unwrap());
static SAMPLE_DEPTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[su](\d{2})p?|flt|fltp|dbl|dblp)(?: \((\d+) bit\))?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scope {
    Input,
    Stream(StreamKind),
    Ignored,
}

/// Scraped result plus what thumbnail extraction needs.
#[derive(Debug)]
pub struct FfmpegOutput {
    pub info: MediaInfo,
    /// Index of an `(attached pic)` stream, if any.
    pub attached_pic: Option<u32>,
}

/// Split on commas that are not inside parentheses or brackets.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

/// `"h264 (High) (avc1 / 0x31637661)"` → (`"h264"`, `Some("High")`).
fn codec_and_profile(part: &str) -> (&str, Option<&str>) {
    let codec = part.split_whitespace().next().unwrap_or("");
    let profile = part
        .find('(')
        .and_then(|open| part[open + 1..].find(')').map(|close| &part[open + 1..open + 1 + close]))
        .filter(|p| !p.contains(" / "));
    (codec, profile)
}

fn video_stream(session: &mut ProbeSession, parts: &[&str]) {
    let kind = StreamKind::Video;
    let (codec, profile) = codec_and_profile(parts[0]);
    session.field(kind, field::FORMAT, codec);
    if let Some(profile) = profile {
        session.field(kind, field::FORMAT_PROFILE, profile);
    }

    for part in &parts[1..] {
        let lower = part.to_lowercase();
        if let Some(caps) = SIZE_RE.captures(part) {
            session.field(kind, field::WIDTH, &caps[1]);
            session.field(kind, field::HEIGHT, &caps[2]);
            if let Some(dar) = DAR_RE.captures(part) {
                session.field(kind, field::DISPLAY_ASPECT_RATIO, &dar[1]);
            }
        } else if let Some(rate) = lower.strip_suffix(" fps") {
            session.field(kind, field::FRAME_RATE, rate);
        } else if lower.contains("progressive") {
            session.field(kind, field::SCAN_TYPE, "progressive");
        } else if lower.contains("top first") {
            session.field(kind, field::SCAN_TYPE, "interlaced");
            session.field(kind, field::SCAN_ORDER, "tff");
        } else if lower.contains("bottom first") {
            session.field(kind, field::SCAN_TYPE, "interlaced");
            session.field(kind, field::SCAN_ORDER, "bff");
        }
        if let Some(depth) = PIX_DEPTH_RE.captures(part) {
            session.field(kind, field::BIT_DEPTH, &depth[1]);
        }
    }
}

fn audio_stream(session: &mut ProbeSession, parts: &[&str]) {
    let kind = StreamKind::Audio;
    let (codec, profile) = codec_and_profile(parts[0]);
    session.field(kind, field::FORMAT, codec);
    if let Some(profile) = profile {
        session.field(kind, field::FORMAT_PROFILE, profile);
    }
    if let Some(bits) = codec.strip_prefix("pcm_").and_then(|rest| {
        rest.get(1..3).filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
    }) {
        session.field(kind, field::BIT_DEPTH, bits);
    }

    let mut after_rate = false;
    for part in &parts[1..] {
        if part.ends_with(" Hz") {
            session.field(kind, field::SAMPLING_RATE, part);
            after_rate = true;
            continue;
        }
        if after_rate {
            session.field(kind, field::CHANNELS, part);
            after_rate = false;
            continue;
        }
        if part.contains(" kb/s") {
            session.field(kind, field::BITRATE, part);
        } else if let Some(caps) = SAMPLE_DEPTH_RE.captures(part) {
            if let Some(bits) = caps.get(2).or_else(|| caps.get(1)) {
                session.field(kind, field::BIT_DEPTH, bits.as_str());
            }
        }
    }
}

fn subtitle_stream(session: &mut ProbeSession, parts: &[&str], rest: &str) {
    let kind = StreamKind::Text;
    let (codec, _) = codec_and_profile(parts[0]);
    session.field(kind, field::FORMAT, codec);
    if rest.contains("(forced)") {
        session.field(kind, field::FORCED, "yes");
    }
    if rest.contains("(default)") {
        session.field(kind, field::DEFAULT, "yes");
    }
}

/// Map a top-level `Metadata:` key onto a General field.
fn input_metadata(session: &mut ProbeSession, key: &str, value: &str) {
    let name = match key.to_lowercase().as_str() {
        "major_brand" => field::CODEC_ID,
        "title" => field::TITLE,
        "album" => field::ALBUM,
        "artist" | "album_artist" => field::PERFORMER,
        "genre" => field::GENRE,
        "date" | "year" => field::RECORDED_DATE,
        "track" => field::TRACK_POSITION,
        _ => {
            session.field(
                StreamKind::General,
                &format!("{}{key}", field::EXTRA_PREFIX),
                value,
            );
            return;
        }
    };
    session.field(StreamKind::General, name, value);
}

/// Scrape `ffmpeg -i` stderr into a finished [`MediaInfo`].
pub fn parse_output(text: &str) -> Result<FfmpegOutput> {
    let mut session = ProbeSession::new();
    let mut scope = Scope::Ignored;
    let mut in_metadata = false;
    let mut seen_input = false;
    let mut attached_pic = None;

    for line in text.lines() {
        if let Some(caps) = INPUT_RE.captures(line) {
            seen_input = true;
            session.begin_stream(StreamKind::General);
            session.field(StreamKind::General, field::FORMAT, &caps[1]);
            scope = Scope::Input;
            in_metadata = false;
            continue;
        }
        if !seen_input {
            continue;
        }
        if let Some(caps) = DURATION_RE.captures(line) {
            session.field(StreamKind::General, field::DURATION, &caps[1]);
            if let Some(bitrate) = caps.get(2) {
                session.field(StreamKind::General, field::OVERALL_BITRATE, bitrate.as_str());
            }
            in_metadata = false;
            continue;
        }
        if let Some(caps) = STREAM_RE.captures(line) {
            in_metadata = false;
            let rest = &caps[4];
            let parts = split_top_level(rest);
            let lang = caps.get(2).map(|m| m.as_str());
            scope = match &caps[3] {
                "Video" if rest.contains("(attached pic)") => {
                    attached_pic = caps[1].parse().ok();
                    Scope::Ignored
                }
                "Video" => {
                    session.begin_stream(StreamKind::Video);
                    video_stream(&mut session, &parts);
                    Scope::Stream(StreamKind::Video)
                }
                "Audio" => {
                    session.begin_stream(StreamKind::Audio);
                    audio_stream(&mut session, &parts);
                    Scope::Stream(StreamKind::Audio)
                }
                "Subtitle" => {
                    session.begin_stream(StreamKind::Text);
                    subtitle_stream(&mut session, &parts, rest);
                    Scope::Stream(StreamKind::Text)
                }
                _ => Scope::Ignored,
            };
            if let (Scope::Stream(kind), Some(lang)) = (scope, lang) {
                session.field(kind, field::LANGUAGE, lang);
            }
            continue;
        }
        if line.trim() == "Metadata:" {
            in_metadata = true;
            continue;
        }
        if in_metadata {
            match METADATA_RE.captures(line) {
                Some(caps) => match scope {
                    Scope::Input => input_metadata(&mut session, &caps[1], &caps[2]),
                    Scope::Stream(kind) if caps[1].eq_ignore_ascii_case("title") => {
                        session.field(kind, field::TITLE, &caps[2]);
                    }
                    _ => {}
                },
                None => in_metadata = false,
            }
        }
    }

    if !seen_input {
        return Err(ProbeError::Parse {
            tool: "ffmpeg".into(),
            message: "no input section in output".into(),
        });
    }

    Ok(FfmpegOutput {
        info: session.finish(),
        attached_pic,
    })
}

pub struct FfmpegProber {
    ffmpeg: PathBuf,
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
    thumbnail_timeout: Option<Duration>,
}

impl FfmpegProber {
    pub fn new(ffmpeg: PathBuf, runner: Arc<dyn ProcessRunner>, timeout: Duration) -> Self {
        Self {
            ffmpeg,
            runner,
            timeout,
            thumbnail_timeout: None,
        }
    }

    pub fn with_thumbnails(mut self, timeout: Duration) -> Self {
        self.thumbnail_timeout = Some(timeout);
        self
    }
}

impl Prober for FfmpegProber {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn supports(&self, path: &Path) -> bool {
        path.extension().is_some()
    }

    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let args = vec![
            "-hide_banner".to_string(),
            "-i".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        // Exits non-zero without an output file; only the text matters.
        let output = self.runner.run(&self.ffmpeg, &args, self.timeout)?;
        let FfmpegOutput {
            mut info,
            attached_pic,
        } = parse_output(&String::from_utf8_lossy(&output.stderr))?;

        if info.container.is_none() {
            return Err(ProbeError::Unresolved(path.to_path_buf()));
        }
        if info.size.is_none() {
            info.size = std::fs::metadata(path).ok().map(|m| m.len());
        }

        if let Some(timeout) = self.thumbnail_timeout {
            let source = match (attached_pic, info.media_type) {
                (Some(stream), _) => Some(FrameSource::AttachedPicture { stream }),
                (None, MediaType::Video) => Some(FrameSource::Video {
                    seek: thumbnail::seek_position(info.duration),
                }),
                _ => None,
            };
            if let Some(source) = source {
                info.thumbnail =
                    thumbnail::extract(self.runner.as_ref(), &self.ffmpeg, path, source, timeout);
            }
        }

        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Format, SubtitleFormat};
    use crate::media::{ScanOrder, ScanType};

    const MOVIE: &str = "\
Input #0, matroska,webm, from '/films/movie.mkv':
  Metadata:
    title           : A Movie
    encoder         : libebml v1.4.2
  Duration: 01:23:45.67, start: 0.000000, bitrate: 9500 kb/s
  Stream #0:0(eng): Video: h264 (High), yuv420p10le(tv, bt709, top first), 1920x1080 [SAR 1:1 DAR 16:9], 25 fps, 25 tbr, 1k tbn (default)
  Stream #0:1(fre): Audio: ac3, 48000 Hz, 5.1(side), fltp, 640 kb/s (default)
    Metadata:
      title           : Surround
  Stream #0:2(eng): Audio: dts (DTS-HD MA), 48000 Hz, 7.1, s32p (24 bit)
  Stream #0:3(eng): Subtitle: hdmv_pgs_subtitle (forced)
At least one output file must be specified
";

    #[test]
    fn movie_streams() {
        let out = parse_output(MOVIE).unwrap();
        let m = out.info;
        assert_eq!(out.attached_pic, None);
        assert_eq!(m.container, Some(Format::Matroska));
        let d = m.duration.unwrap();
        assert!((d - 5025.67).abs() < 1e-6);
        assert_eq!(m.bitrate, Some(9_500_000));

        assert_eq!(m.video_codec, Some(Format::H264));
        assert_eq!(m.video_profile.as_deref(), Some("High"));
        assert_eq!((m.width, m.height), (Some(1920), Some(1080)));
        assert_eq!(m.aspect_ratio_container.as_deref(), Some("16:9"));
        assert_eq!(m.frame_rate.as_deref(), Some("25"));
        assert_eq!(m.scan_type, Some(ScanType::Interlaced));
        assert_eq!(m.scan_order, Some(ScanOrder::Tff));
        assert_eq!(m.video_bit_depth, Some(10));

        assert_eq!(m.audio_tracks.len(), 2);
        let ac3 = &m.audio_tracks[0];
        assert_eq!(ac3.codec, Some(Format::Ac3));
        assert_eq!(ac3.sample_rate, Some(48_000));
        assert_eq!(ac3.channels, Some(6));
        assert_eq!(ac3.bitrate, Some(640_000));
        assert_eq!(ac3.stream.lang.as_deref(), Some("fre"));
        assert_eq!(ac3.stream.title.as_deref(), Some("Surround"));

        let dts = &m.audio_tracks[1];
        assert_eq!(dts.codec, Some(Format::DtsHd));
        assert_eq!(dts.channels, Some(8));
        assert_eq!(dts.bit_depth, Some(24));

        assert_eq!(m.subtitle_tracks[0].format, Some(SubtitleFormat::Pgs));
        assert!(m.subtitle_tracks[0].forced);
        assert_eq!(
            m.extras.get("encoder").map(String::as_str),
            Some("libebml v1.4.2")
        );
    }

    #[test]
    fn attached_pic_is_not_a_video_track() {
        let text = "\
Input #0, flac, from 'song.flac':
  Metadata:
    ALBUM           : Record
    ARTIST          : Band
    TITLE           : Song
    track           : 4
    DATE            : 1977
  Duration: 00:05:00.00, start: 0.000000, bitrate: 900 kb/s
  Stream #0:0: Audio: flac, 44100 Hz, stereo, s16
  Stream #0:1: Video: mjpeg (Baseline), yuvj420p(pc, bt470bg/unknown/unknown), 500x500, 90k tbr, 90k tbn (attached pic)
";
        let out = parse_output(text).unwrap();
        assert_eq!(out.attached_pic, Some(1));
        let m = out.info;
        assert_eq!(m.video_track_count, 0);
        assert_eq!(m.container, Some(Format::Flac));
        let a = &m.audio_tracks[0];
        assert_eq!(a.codec, Some(Format::Flac));
        assert_eq!(a.channels, Some(2));
        assert_eq!(a.bit_depth, Some(16));
        assert_eq!(a.album.as_deref(), Some("Record"));
        assert_eq!(a.artist.as_deref(), Some("Band"));
        assert_eq!(a.song_name.as_deref(), Some("Song"));
        assert_eq!(a.track_number, Some(4));
        assert_eq!(a.year, Some(1977));
    }

    #[test]
    fn mp4_audio_uses_major_brand() {
        let text = "\
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'a.m4a':
  Metadata:
    major_brand     : M4A
  Duration: 00:03:00.00, start: 0.000000, bitrate: 256 kb/s
  Stream #0:0[0x1](und): Audio: aac (LC) (mp4a / 0x6134706D), 44100 Hz, stereo, fltp, 256 kb/s (default)
";
        let m = parse_output(text).unwrap().info;
        assert_eq!(m.container, Some(Format::M4a));
        assert_eq!(m.audio_tracks[0].codec, Some(Format::AacLc));
    }

    #[test]
    fn text_without_input_is_an_error() {
        assert!(matches!(
            parse_output("/x/file: No such file or directory"),
            Err(ProbeError::Parse { .. })
        ));
    }

    #[test]
    fn top_level_split_respects_parentheses() {
        assert_eq!(
            split_top_level("h264 (High), yuv420p(tv, bt709), 1920x1080"),
            ["h264 (High)", "yuv420p(tv, bt709)", "1920x1080"]
        );
    }
}
