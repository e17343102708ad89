use crate::classifier::{Format, SubtitleFormat};

use super::RateMode;

/// Fields every elementary stream carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamLang {
    /// Zero-based ordinal within its kind (audio or subtitle), in stream order.
    pub id: u32,
    /// ISO 639 code as reported by the prober.
    pub lang: Option<String>,
    pub title: Option<String>,
}

impl StreamLang {
    pub const UNDETERMINED: &'static str = "und";

    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn effective_lang(&self) -> &str {
        self.lang
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(Self::UNDETERMINED)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioTrack {
    pub stream: StreamLang,
    pub codec: Option<Format>,
    pub channels: Option<u32>,
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u32>,
    pub bitrate: Option<u32>,
    pub bitrate_mode: Option<RateMode>,
    /// Offset relative to the video stream, in milliseconds.
    pub delay: Option<i32>,

    // Song tags
    pub album: Option<String>,
    pub artist: Option<String>,
    pub song_name: Option<String>,
    pub track_number: Option<u32>,
    pub year: Option<u32>,
    pub genre: Option<String>,
}

impl AudioTrack {
    pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
    pub const DEFAULT_BIT_DEPTH: u32 = 16;
    pub const DEFAULT_CHANNELS: u32 = 2;
    pub const DEFAULT_DELAY: i32 = 0;

    pub fn new(id: u32) -> Self {
        Self {
            stream: StreamLang::new(id),
            ..Default::default()
        }
    }

    pub fn effective_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(Self::DEFAULT_SAMPLE_RATE)
    }

    pub fn effective_bit_depth(&self) -> u32 {
        self.bit_depth.unwrap_or(Self::DEFAULT_BIT_DEPTH)
    }

    pub fn effective_channels(&self) -> u32 {
        self.channels.unwrap_or(Self::DEFAULT_CHANNELS)
    }

    pub fn effective_delay(&self) -> i32 {
        self.delay.unwrap_or(Self::DEFAULT_DELAY)
    }

    pub fn effective_bitrate_mode(&self) -> RateMode {
        self.bitrate_mode.unwrap_or(RateMode::Constant)
    }

    /// A track is usable for song tags once its codec is known.
    pub fn is_usable(&self) -> bool {
        self.codec.is_some()
    }

    pub fn is_lossless(&self) -> bool {
        matches!(
            self.codec,
            Some(
                Format::Flac
                    | Format::Alac
                    | Format::Ape
                    | Format::Lpcm
                    | Format::WavPack
                    | Format::Tta
                    | Format::TrueHd
                    | Format::Mlp
                    | Format::Als
                    | Format::Shorten
                    | Format::WmaLossless
                    | Format::Ralf
            )
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub stream: StreamLang,
    pub format: Option<SubtitleFormat>,
    pub forced: bool,
    pub default: bool,
}

impl SubtitleTrack {
    pub fn new(id: u32) -> Self {
        Self {
            stream: StreamLang::new(id),
            ..Default::default()
        }
    }

    /// Bitmap subtitles cannot be converted and have to be burned in.
    pub fn is_text(&self) -> bool {
        self.format.is_some_and(SubtitleFormat::is_text)
    }
}
