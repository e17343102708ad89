//! Canonical in-memory description of a probed asset.
//!
//! Every measured field is stored raw as an `Option` (`None` = not measured)
//! and read through an `effective_*` accessor when a value to act on is
//! needed. Defaults are associated constants; nothing here is global state.

pub mod shared;
pub mod stereo;
pub mod track;

use std::collections::BTreeMap;
use std::fmt;

use crate::classifier::{Format, Level};

pub use shared::{ParseOutcome, SharedMediaInfo};
pub use stereo::Mode3D;
pub use track::{AudioTrack, StreamLang, SubtitleTrack};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaType {
    Audio,
    Image,
    Video,
    #[default]
    Unknown,
}

impl MediaType {
    /// Stable integer code stored in the cache.
    pub fn code(self) -> i32 {
        match self {
            MediaType::Audio => 1,
            MediaType::Image => 2,
            MediaType::Video => 4,
            MediaType::Unknown => 8,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => MediaType::Audio,
            2 => MediaType::Image,
            4 => MediaType::Video,
            _ => MediaType::Unknown,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaType::Audio => "audio",
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Bitrate / frame-rate mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateMode {
    Constant,
    Variable,
}

impl RateMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RateMode::Constant => "cbr",
            RateMode::Variable => "vbr",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "cbr" | "cfr" | "constant" => Some(RateMode::Constant),
            "vbr" | "vfr" | "variable" => Some(RateMode::Variable),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    Progressive,
    Interlaced,
    Mbaff,
    Paff,
    Mixed,
}

impl ScanType {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanType::Progressive => "progressive",
            ScanType::Interlaced => "interlaced",
            ScanType::Mbaff => "mbaff",
            ScanType::Paff => "paff",
            ScanType::Mixed => "mixed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "progressive" => Some(ScanType::Progressive),
            "interlaced" => Some(ScanType::Interlaced),
            "mbaff" => Some(ScanType::Mbaff),
            "paff" => Some(ScanType::Paff),
            "mixed" => Some(ScanType::Mixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    Tff,
    Bff,
    /// Telecine cadence (`2:3 Pulldown` and friends).
    Pulldown,
    BffTff,
    TffBff,
}

impl ScanOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanOrder::Tff => "tff",
            ScanOrder::Bff => "bff",
            ScanOrder::Pulldown => "pulldown",
            ScanOrder::BffTff => "bff/tff",
            ScanOrder::TffBff => "tff/bff",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim().to_lowercase();
        if v.contains("pulldown") {
            return Some(ScanOrder::Pulldown);
        }
        match v.as_str() {
            "tff" | "top field first" => Some(ScanOrder::Tff),
            "bff" | "bottom field first" => Some(ScanOrder::Bff),
            "bff/tff" => Some(ScanOrder::BffTff),
            "tff/bff" => Some(ScanOrder::TffBff),
            _ => None,
        }
    }
}

/// Embedded or extracted cover image / video frame.
#[derive(Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub mime: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thumbnail")
            .field("bytes", &self.data.len())
            .field("mime", &self.mime)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// One probed asset.
///
/// `Clone` deep-copies both track lists, so virtual tracks cloned from the same
/// base probe never share audio or subtitle metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaInfo {
    pub container: Option<Format>,
    pub media_type: MediaType,
    /// Seconds. `None` means truly unknown, distinct from zero.
    pub duration: Option<f64>,
    pub bitrate: Option<u32>,
    pub bitrate_mode: Option<RateMode>,
    /// File size in bytes. Cleared on virtual tracks.
    pub size: Option<u64>,

    // Video
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub aspect_ratio_container: Option<String>,
    pub aspect_ratio_video_track: Option<String>,
    pub aspect_ratio_dvd_iso: Option<String>,
    pub video_codec: Option<Format>,
    pub video_profile: Option<String>,
    pub video_level: Option<Level>,
    pub stereoscopy: Option<String>,
    pub scan_type: Option<ScanType>,
    pub scan_order: Option<ScanOrder>,
    pub frame_rate: Option<String>,
    pub frame_rate_mode: Option<RateMode>,
    pub reference_frames: Option<u8>,
    pub video_bit_depth: Option<u8>,
    pub video_track_count: u32,
    pub image_count: u32,

    pub thumbnail: Option<Thumbnail>,
    pub extras: BTreeMap<String, String>,

    pub audio_tracks: Vec<AudioTrack>,
    pub subtitle_tracks: Vec<SubtitleTrack>,

    parsed: bool,
}

impl MediaInfo {
    pub const DEFAULT_BITRATE: u32 = 0;
    pub const DEFAULT_VIDEO_BIT_DEPTH: u8 = 8;
    pub const DEFAULT_FRAME_RATE: &'static str = "25";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    /// Mark probing complete. Returns `false` if it was already marked.
    pub fn mark_parsed(&mut self) -> bool {
        if self.parsed {
            log::debug!("media info already marked parsed");
            return false;
        }
        self.parsed = true;
        true
    }

    pub fn effective_bitrate(&self) -> u32 {
        self.bitrate.unwrap_or(Self::DEFAULT_BITRATE)
    }

    pub fn effective_bitrate_mode(&self) -> RateMode {
        self.bitrate_mode.unwrap_or(RateMode::Constant)
    }

    pub fn effective_video_bit_depth(&self) -> u8 {
        self.video_bit_depth.unwrap_or(Self::DEFAULT_VIDEO_BIT_DEPTH)
    }

    pub fn effective_frame_rate(&self) -> &str {
        self.frame_rate.as_deref().unwrap_or(Self::DEFAULT_FRAME_RATE)
    }

    pub fn effective_frame_rate_mode(&self) -> RateMode {
        self.frame_rate_mode.unwrap_or(RateMode::Constant)
    }

    /// Display aspect ratio: track-reported, then container-reported, then
    /// computed from the frame size.
    pub fn effective_aspect_ratio(&self) -> Option<String> {
        if let Some(ar) = self
            .aspect_ratio_video_track
            .as_ref()
            .or(self.aspect_ratio_container.as_ref())
        {
            return Some(ar.clone());
        }
        match (self.width, self.height) {
            (Some(w), Some(h)) if h > 0 => Some(format!("{:.3}", w as f64 / h as f64)),
            _ => None,
        }
    }

    /// Media type from track counts: any video wins, then audio, then images.
    pub fn resolve_media_type(&mut self) -> MediaType {
        self.media_type = if self.video_track_count > 0 {
            MediaType::Video
        } else if !self.audio_tracks.is_empty() {
            MediaType::Audio
        } else if self.image_count > 0 {
            MediaType::Image
        } else {
            MediaType::Unknown
        };
        self.media_type
    }

    /// Whether the container can hold audio-only or audio+video content.
    pub fn is_audio_or_video_container(&self) -> bool {
        self.audio_variant().is_some()
    }

    pub fn audio_variant(&self) -> Option<Format> {
        self.container.and_then(Format::audio_variant)
    }

    pub fn audio_variant_format_configuration_string(&self) -> Option<&'static str> {
        self.audio_variant().map(Format::as_str)
    }

    /// Rewrite an audio-or-video container to its pure-audio variant.
    ///
    /// Only acts once the media type has been resolved to audio; returns
    /// whether the container changed.
    pub fn apply_audio_variant(&mut self) -> bool {
        if self.media_type != MediaType::Audio {
            return false;
        }
        match self.audio_variant() {
            Some(variant) => {
                self.container = Some(variant);
                true
            }
            None => false,
        }
    }

    pub fn first_audio_track(&self) -> Option<&AudioTrack> {
        self.audio_tracks.first()
    }

    pub fn first_audio_track_mut(&mut self) -> Option<&mut AudioTrack> {
        self.audio_tracks.first_mut()
    }

    /// True when the first audio track is usable for song tags.
    pub fn has_usable_audio(&self) -> bool {
        self.first_audio_track().is_some_and(AudioTrack::is_usable)
    }

    pub fn mode_3d(&self) -> Option<Mode3D> {
        self.stereoscopy.as_deref().and_then(stereo::layout_for)
    }

    pub fn is_3d(&self) -> bool {
        self.mode_3d().is_some()
    }

    pub fn is_3d_anaglyph(&self) -> bool {
        self.mode_3d().is_some_and(Mode3D::is_anaglyph)
    }

    /// `HH:MM:SS.mmm`, or `None` when the duration is unknown.
    pub fn duration_string(&self) -> Option<String> {
        self.duration.map(format_duration)
    }
}

pub fn format_duration(secs: f64) -> String {
    let total_ms = (secs * 1000.0).round() as u64;
    let h = total_ms / 3_600_000;
    let m = (total_ms / 60_000) % 60;
    let s = (total_ms / 1000) % 60;
    let ms = total_ms % 1000;
    format!("{h:02}:{m:02}:{s:02}.{ms:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio_only_mp4() -> MediaInfo {
        let mut m = MediaInfo::new();
        m.container = Some(Format::Mp4);
        let mut a = AudioTrack::new(0);
        a.codec = Some(Format::AacLc);
        m.audio_tracks.push(a);
        m
    }

    #[test]
    fn media_type_from_track_counts() {
        let mut m = MediaInfo::new();
        assert_eq!(m.resolve_media_type(), MediaType::Unknown);
        m.image_count = 1;
        assert_eq!(m.resolve_media_type(), MediaType::Image);
        m.audio_tracks.push(AudioTrack::new(0));
        assert_eq!(m.resolve_media_type(), MediaType::Audio);
        m.video_track_count = 1;
        assert_eq!(m.resolve_media_type(), MediaType::Video);
    }

    #[test]
    fn audio_variant_rewrite() {
        let mut m = audio_only_mp4();
        assert!(m.is_audio_or_video_container());
        assert_eq!(m.audio_variant_format_configuration_string(), Some("m4a"));

        // Not before the media type is known.
        assert!(!m.apply_audio_variant());
        assert_eq!(m.container, Some(Format::Mp4));

        m.resolve_media_type();
        assert!(m.apply_audio_variant());
        assert_eq!(m.container.map(Format::as_str), Some("m4a"));
    }

    #[test]
    fn video_keeps_its_container() {
        let mut m = audio_only_mp4();
        m.video_track_count = 1;
        m.resolve_media_type();
        assert!(!m.apply_audio_variant());
        assert_eq!(m.container, Some(Format::Mp4));
    }

    #[test]
    fn clone_is_deep() {
        let original = audio_only_mp4();
        let mut copy = original.clone();
        copy.audio_tracks[0].artist = Some("Someone".into());
        copy.subtitle_tracks.push(SubtitleTrack::new(0));
        assert_eq!(original.audio_tracks[0].artist, None);
        assert!(original.subtitle_tracks.is_empty());
    }

    #[test]
    fn parsed_is_marked_once() {
        let mut m = MediaInfo::new();
        assert!(!m.is_parsed());
        assert!(m.mark_parsed());
        assert!(!m.mark_parsed());
        assert!(m.is_parsed());
    }

    #[test]
    fn effective_defaults() {
        let mut m = MediaInfo::new();
        assert_eq!(m.effective_bitrate(), 0);
        assert_eq!(m.effective_video_bit_depth(), 8);
        assert_eq!(m.effective_frame_rate(), "25");
        m.frame_rate = Some("23.976".into());
        assert_eq!(m.effective_frame_rate(), "23.976");
    }

    #[test]
    fn aspect_ratios_stay_independent() {
        let mut m = MediaInfo::new();
        m.width = Some(1920);
        m.height = Some(1080);
        assert_eq!(m.effective_aspect_ratio().as_deref(), Some("1.778"));
        m.aspect_ratio_container = Some("16:9".into());
        m.aspect_ratio_dvd_iso = Some("4:3".into());
        assert_eq!(m.effective_aspect_ratio().as_deref(), Some("16:9"));
        m.aspect_ratio_video_track = Some("2.40:1".into());
        assert_eq!(m.effective_aspect_ratio().as_deref(), Some("2.40:1"));
        assert_eq!(m.aspect_ratio_container.as_deref(), Some("16:9"));
    }

    #[test]
    fn stereoscopy_is_recomputed() {
        let mut m = MediaInfo::new();
        assert!(!m.is_3d());
        m.stereoscopy = Some("ARCG".into());
        assert!(m.is_3d_anaglyph());
        m.stereoscopy = Some("sbsl".into());
        assert!(m.is_3d());
        assert!(!m.is_3d_anaglyph());
    }

    #[test]
    fn rate_and_scan_parsing() {
        assert_eq!(RateMode::parse("VBR"), Some(RateMode::Variable));
        assert_eq!(RateMode::parse("CFR"), Some(RateMode::Constant));
        assert_eq!(ScanType::parse("MBAFF"), Some(ScanType::Mbaff));
        assert_eq!(ScanOrder::parse("2:3 Pulldown"), Some(ScanOrder::Pulldown));
        assert_eq!(ScanOrder::parse("TFF"), Some(ScanOrder::Tff));
        assert_eq!(MediaType::from_code(MediaType::Video.code()), MediaType::Video);
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(3725.5), "01:02:05.500");
        assert_eq!(MediaInfo::new().duration_string(), None);
    }
}
