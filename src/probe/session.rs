//! Builds one [`MediaInfo`] from a stream of raw prober fields.

use crate::classifier::numeric;
use crate::classifier::{
    classify, parse_profile_level, Canonical, Classification, ClassificationContext, StreamKind,
};
use crate::media::{
    AudioTrack, MediaInfo, MediaType, RateMode, ScanOrder, ScanType, SubtitleTrack, Thumbnail,
};

/// Field names. Both backends emit these (the ffmpeg scraper maps its text
/// onto them), so they follow MediaInfo's spelling.
pub mod field {
    pub const FORMAT: &str = "Format";
    pub const CODEC_ID: &str = "CodecID";
    pub const FORMAT_PROFILE: &str = "Format_Profile";
    pub const FORMAT_ADDITIONAL_FEATURES: &str = "Format_AdditionalFeatures";
    pub const FORMAT_VERSION: &str = "Format_Version";
    pub const DURATION: &str = "Duration";
    pub const OVERALL_BITRATE: &str = "OverallBitRate";
    pub const OVERALL_BITRATE_MODE: &str = "OverallBitRate_Mode";
    pub const BITRATE: &str = "BitRate";
    pub const BITRATE_MODE: &str = "BitRate_Mode";
    pub const WIDTH: &str = "Width";
    pub const HEIGHT: &str = "Height";
    pub const DISPLAY_ASPECT_RATIO: &str = "DisplayAspectRatio";
    pub const DISPLAY_ASPECT_RATIO_ORIGINAL: &str = "DisplayAspectRatio_Original";
    pub const FRAME_RATE: &str = "FrameRate";
    pub const FRAME_RATE_MODE: &str = "FrameRate_Mode";
    pub const SCAN_TYPE: &str = "ScanType";
    pub const SCAN_ORDER: &str = "ScanOrder";
    pub const MULTIVIEW_LAYOUT: &str = "MultiView_Layout";
    pub const BIT_DEPTH: &str = "BitDepth";
    pub const REF_FRAMES: &str = "Format_Settings_RefFrames";
    pub const CHANNELS: &str = "Channels";
    pub const SAMPLING_RATE: &str = "SamplingRate";
    pub const DELAY: &str = "Delay";
    pub const LANGUAGE: &str = "Language";
    pub const TITLE: &str = "Title";
    pub const TRACK: &str = "Track";
    pub const ALBUM: &str = "Album";
    pub const PERFORMER: &str = "Performer";
    pub const TRACK_POSITION: &str = "Track_Position";
    pub const RECORDED_DATE: &str = "Recorded_Date";
    pub const GENRE: &str = "Genre";
    pub const FILE_SIZE: &str = "FileSize";
    pub const DEFAULT: &str = "Default";
    pub const FORCED: &str = "Forced";
    /// Prefix for free-form fields kept in the extras bag.
    pub const EXTRA_PREFIX: &str = "extra:";
}

/// Song tags reported on the General stream, copied onto the first audio
/// track when it has none of its own.
#[derive(Debug, Default)]
struct GeneralTags {
    album: Option<String>,
    artist: Option<String>,
    song_name: Option<String>,
    track_number: Option<u32>,
    year: Option<u32>,
    genre: Option<String>,
}

/// One asset's probe in progress.
///
/// Streams are announced with [`ProbeSession::begin_stream`] in file order;
/// fields for a stream kind apply to the most recently begun stream of that
/// kind. Video fields apply to the first video stream only.
#[derive(Debug, Default)]
pub struct ProbeSession {
    ctx: ClassificationContext,
    info: MediaInfo,
    tags: GeneralTags,
}

impl ProbeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> &ClassificationContext {
        &self.ctx
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    pub fn begin_stream(&mut self, kind: StreamKind) {
        match kind {
            StreamKind::General => {}
            StreamKind::Video => self.info.video_track_count += 1,
            StreamKind::Image => self.info.image_count += 1,
            StreamKind::Audio => {
                let id = self.info.audio_tracks.len() as u32;
                self.info.audio_tracks.push(AudioTrack::new(id));
                self.ctx.audio_codec = None;
            }
            StreamKind::Text => {
                let id = self.info.subtitle_tracks.len() as u32;
                self.info.subtitle_tracks.push(SubtitleTrack::new(id));
            }
        }
    }

    pub fn set_thumbnail(&mut self, thumbnail: Thumbnail) {
        self.info.thumbnail = Some(thumbnail);
    }

    pub fn set_size(&mut self, size: u64) {
        self.info.size = Some(size);
    }

    fn first_video(&self) -> bool {
        self.info.video_track_count <= 1
    }

    fn audio(&mut self) -> Option<&mut AudioTrack> {
        self.info.audio_tracks.last_mut()
    }

    fn subtitle(&mut self) -> Option<&mut SubtitleTrack> {
        self.info.subtitle_tracks.last_mut()
    }

    /// Feed one raw field.
    pub fn field(&mut self, kind: StreamKind, name: &str, value: &str) {
        use field::*;

        let value = value.trim();
        if value.is_empty() {
            return;
        }
        if let Some(key) = name.strip_prefix(EXTRA_PREFIX) {
            self.info.extras.insert(key.to_string(), value.to_string());
            return;
        }

        match (kind, name) {
            (StreamKind::Video, FORMAT_PROFILE) => {
                if self.first_video() {
                    let pl = parse_profile_level(self.ctx.video_codec, value);
                    self.info.video_profile = Some(pl.profile);
                    self.info.video_level = pl.level;
                }
            }
            (_, FORMAT | FORMAT_VERSION | FORMAT_PROFILE | FORMAT_ADDITIONAL_FEATURES) => {
                self.classify_into(kind, value);
            }
            (_, CODEC_ID) => {
                let resolved = match kind {
                    StreamKind::General => false,
                    StreamKind::Video => self.ctx.video_codec.is_some(),
                    StreamKind::Audio => self.ctx.audio_codec.is_some(),
                    StreamKind::Image => self.info.video_codec.is_some(),
                    StreamKind::Text => self
                        .info
                        .subtitle_tracks
                        .last()
                        .is_some_and(|s| s.format.is_some()),
                };
                if !resolved {
                    self.classify_into(kind, value);
                }
            }
            (StreamKind::General, DURATION) => self.info.duration = numeric::parse_duration(value),
            (_, DURATION) => {
                if self.info.duration.is_none() {
                    self.info.duration = numeric::parse_duration(value);
                }
            }
            (StreamKind::General, OVERALL_BITRATE) => {
                self.info.bitrate = numeric::parse_bitrate(value)
            }
            (StreamKind::General, OVERALL_BITRATE_MODE | BITRATE_MODE) => {
                self.info.bitrate_mode = RateMode::parse(value)
            }
            (StreamKind::General, FILE_SIZE) => self.info.size = value.parse().ok(),
            (StreamKind::Audio, BITRATE) => {
                let bitrate = numeric::parse_bitrate(value);
                if let Some(a) = self.audio() {
                    a.bitrate = bitrate;
                }
            }
            (StreamKind::Audio, BITRATE_MODE) => {
                let mode = RateMode::parse(value);
                if let Some(a) = self.audio() {
                    a.bitrate_mode = mode;
                }
            }
            (StreamKind::Video, BITRATE) => {
                if self.info.bitrate.is_none() {
                    self.info.bitrate = numeric::parse_bitrate(value);
                }
            }
            (StreamKind::Video | StreamKind::Image, WIDTH) => {
                if self.first_video() {
                    self.info.width = numeric::parse_dimension(value);
                }
            }
            (StreamKind::Video | StreamKind::Image, HEIGHT) => {
                if self.first_video() {
                    self.info.height = numeric::parse_dimension(value);
                }
            }
            (StreamKind::Video, _) if !self.first_video() => {
                log::trace!("ignoring {name} on secondary video stream");
            }
            (StreamKind::Video, DISPLAY_ASPECT_RATIO) => {
                self.info.aspect_ratio_container = Some(value.to_string())
            }
            (StreamKind::Video, DISPLAY_ASPECT_RATIO_ORIGINAL) => {
                self.info.aspect_ratio_video_track = Some(value.to_string())
            }
            (StreamKind::Video, FRAME_RATE) => self.info.frame_rate = numeric::parse_frame_rate(value),
            (StreamKind::Video, FRAME_RATE_MODE) => self.info.frame_rate_mode = RateMode::parse(value),
            (StreamKind::Video, SCAN_TYPE) => self.info.scan_type = ScanType::parse(value),
            (StreamKind::Video, SCAN_ORDER) => self.info.scan_order = ScanOrder::parse(value),
            (StreamKind::Video, MULTIVIEW_LAYOUT) => self.info.stereoscopy = Some(value.to_string()),
            (StreamKind::Video, BIT_DEPTH) => {
                self.info.video_bit_depth =
                    numeric::parse_bits_per_sample(value).and_then(|b| u8::try_from(b).ok())
            }
            (StreamKind::Video, REF_FRAMES) => {
                self.info.reference_frames = numeric::parse_dimension(value)
                    .and_then(|n| u8::try_from(n).ok())
            }
            (StreamKind::Audio, BIT_DEPTH) => {
                let bits = numeric::parse_bits_per_sample(value);
                if let Some(a) = self.audio() {
                    a.bit_depth = bits;
                }
            }
            (StreamKind::Audio, CHANNELS) => {
                let channels = numeric::parse_channels(value);
                if let Some(a) = self.audio() {
                    a.channels = channels;
                }
            }
            (StreamKind::Audio, SAMPLING_RATE) => {
                let rate = numeric::parse_sample_rate(value);
                if let Some(a) = self.audio() {
                    a.sample_rate = rate;
                }
            }
            (StreamKind::Audio, DELAY) => {
                let delay = numeric::parse_delay(value);
                if let Some(a) = self.audio() {
                    a.delay = delay;
                }
            }
            (StreamKind::Audio, LANGUAGE) => {
                if let Some(a) = self.audio() {
                    a.stream.lang = Some(value.to_string());
                }
            }
            (StreamKind::Audio, TITLE) => {
                if let Some(a) = self.audio() {
                    a.stream.title = Some(value.to_string());
                }
            }
            (StreamKind::Text, LANGUAGE) => {
                if let Some(s) = self.subtitle() {
                    s.stream.lang = Some(value.to_string());
                }
            }
            (StreamKind::Text, TITLE) => {
                if let Some(s) = self.subtitle() {
                    s.stream.title = Some(value.to_string());
                }
            }
            (StreamKind::Text, FORCED) => {
                if let Some(s) = self.subtitle() {
                    s.forced = is_yes(value);
                }
            }
            (StreamKind::Text, DEFAULT) => {
                if let Some(s) = self.subtitle() {
                    s.default = is_yes(value);
                }
            }
            (StreamKind::General, TITLE | TRACK) => self.tags.song_name = Some(value.to_string()),
            (StreamKind::General, ALBUM) => self.tags.album = Some(value.to_string()),
            (StreamKind::General, PERFORMER) => self.tags.artist = Some(value.to_string()),
            (StreamKind::General, GENRE) => self.tags.genre = Some(value.to_string()),
            (StreamKind::General, TRACK_POSITION) => {
                self.tags.track_number = leading_u32(value.split('/').next().unwrap_or(""))
            }
            (StreamKind::General, RECORDED_DATE) => self.tags.year = parse_year(value),
            _ => log::trace!("unhandled {kind:?} field {name}={value}"),
        }
    }

    fn classify_into(&mut self, kind: StreamKind, value: &str) {
        let result = classify(kind, value, &self.ctx);
        if result.is_empty() {
            return;
        }
        self.ctx.apply(kind, &result);
        self.apply(kind, result);
    }

    fn apply(&mut self, kind: StreamKind, result: Classification) {
        if let Some(container) = result.container {
            log::debug!("container reclassified as {container}");
            self.info.container = Some(container);
        }
        match result.value {
            Some(Canonical::Format(f)) => match kind {
                StreamKind::General => self.info.container = Some(f),
                StreamKind::Video => {
                    if self.first_video() {
                        self.info.video_codec = Some(f);
                    }
                }
                StreamKind::Image => {
                    self.info.video_codec = Some(f);
                    if self.info.container.is_none() {
                        self.info.container = Some(f);
                    }
                }
                StreamKind::Audio => {
                    if let Some(a) = self.audio() {
                        a.codec = Some(f);
                    }
                }
                StreamKind::Text => {}
            },
            Some(Canonical::Subtitle(s)) => {
                if let Some(track) = self.subtitle() {
                    track.format = Some(s);
                }
            }
            Some(Canonical::ProfileLevel(pl)) => {
                if self.first_video() {
                    self.info.video_profile = Some(pl.profile);
                    self.info.video_level = pl.level;
                }
            }
            None => {}
        }
    }

    /// Close the session: resolve the media type from track counts, rewrite
    /// an audio-only container to its audio variant, fall back to General
    /// song tags on the first audio track, and mark the result parsed.
    pub fn finish(mut self) -> MediaInfo {
        self.info.resolve_media_type();
        if self.info.apply_audio_variant() {
            log::debug!("audio-only container, now {:?}", self.info.container);
        }

        // A General title on a video is the movie title, not a song name.
        let tags = std::mem::take(&mut self.tags);
        if self.info.media_type != MediaType::Audio {
            return self.finalize();
        }
        if let Some(a) = self.info.first_audio_track_mut() {
            a.album = a.album.take().or(tags.album);
            a.artist = a.artist.take().or(tags.artist);
            a.song_name = a.song_name.take().or(tags.song_name);
            a.track_number = a.track_number.or(tags.track_number);
            a.year = a.year.or(tags.year);
            a.genre = a.genre.take().or(tags.genre);
        }
        self.finalize()
    }

    fn finalize(mut self) -> MediaInfo {
        if !self.info.is_parsed() {
            self.info.mark_parsed();
        }
        self.info
    }
}

fn is_yes(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "yes" | "true" | "1")
}

fn leading_u32(value: &str) -> Option<u32> {
    let digits: String = value.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// First four-digit run in a date string (`"2003-05-01"`, `"UTC 1999"`).
pub(crate) fn parse_year(value: &str) -> Option<u32> {
    let bytes = value.as_bytes();
    (0..bytes.len().saturating_sub(3))
        .find(|&i| bytes[i..i + 4].iter().all(u8::is_ascii_digit))
        .and_then(|i| value[i..i + 4].parse().ok())
}
