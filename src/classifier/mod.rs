//! Raw prober token → canonical identifier.
//!
//! [`classify`] is called once per raw field value as a probe session
//! progresses. It is a pure function of its inputs; the only state it sees is
//! the [`ClassificationContext`] of the asset being probed, which the caller
//! updates from each result with [`ClassificationContext::apply`].

pub mod format;
pub mod numeric;
pub mod profile;

use regex::Regex;
use std::sync::LazyLock;

pub use format::{Format, SubtitleFormat};
pub use profile::{parse_profile_level, Level, ProfileLevel};

/// The stream a raw field value was reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    General,
    Video,
    Audio,
    Image,
    Text,
}

/// What has been resolved so far for the asset currently being probed.
///
/// `audio_codec` refers to the audio stream currently being enumerated and is
/// cleared when a new audio stream begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationContext {
    pub container: Option<Format>,
    pub video_codec: Option<Format>,
    pub audio_codec: Option<Format>,
}

/// A canonical value resolved from one raw token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Canonical {
    /// Container (General), codec (Video/Audio/Image).
    Format(Format),
    /// Subtitle stream format (Text).
    Subtitle(SubtitleFormat),
    /// A `profile@level` token seen on a video stream.
    ProfileLevel(ProfileLevel),
}

/// Outcome of classifying a single token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub value: Option<Canonical>,
    /// Set when the token disambiguates a container resolved earlier
    /// (ASF vs WMV, MPEG audio layers).
    pub container: Option<Format>,
}

impl Classification {
    fn format(f: Format) -> Self {
        Self {
            value: Some(Canonical::Format(f)),
            container: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.container.is_none()
    }
}

impl ClassificationContext {
    /// The slot a `Format` result for `kind` lands in.
    pub fn resolved(&self, kind: StreamKind) -> Option<Format> {
        match kind {
            StreamKind::General => self.container,
            StreamKind::Video | StreamKind::Image => self.video_codec,
            StreamKind::Audio => self.audio_codec,
            StreamKind::Text => None,
        }
    }

    /// Fold a classification result back into the context.
    pub fn apply(&mut self, kind: StreamKind, c: &Classification) {
        if let Some(container) = c.container {
            self.container = Some(container);
        }
        if let Some(Canonical::Format(f)) = c.value {
            match kind {
                StreamKind::General => self.container = Some(f),
                StreamKind::Video | StreamKind::Image => self.video_codec = Some(f),
                StreamKind::Audio => self.audio_codec = Some(f),
                StreamKind::Text => {}
            }
        }
    }
}

static DV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:dv|cdv.?|dc25|dcap|dvc.?|dvs.?|dvrs|dv25|dv50|dvan|dvh.?|dvis|dvl.?|dvnm|dvp.?|mdvf|pdvc|r411|r420|sdcc|sl25|sl50|sldv|dvvideo)$",
    )
    .unwrap()
});

/// Classify one raw token reported for `kind`.
///
/// The token is trimmed and lower-cased first; blank input classifies to
/// nothing. Tests run most specific first, and some only fire when the
/// context already holds a particular container or codec.
pub fn classify(kind: StreamKind, raw: &str, ctx: &ClassificationContext) -> Classification {
    let value = raw.trim().to_lowercase();
    if value.is_empty() {
        return Classification::default();
    }

    if kind == StreamKind::Text {
        return Classification {
            value: classify_subtitle(&value).map(Canonical::Subtitle),
            container: None,
        };
    }

    // The value already settled for this slot maps to itself. Canonical
    // strings such as "m4a" and "asf" are also raw tokens for another format.
    let settled = ctx
        .resolved(kind)
        .filter(|f| f.as_str() == value)
        .map(Step::Resolved);

    let mut result = match settled.unwrap_or_else(|| cascade(kind, &value, ctx)) {
        Step::Resolved(f) => Classification::format(f),
        Step::Rewrite { format, container } => Classification {
            value: format.map(Canonical::Format),
            container: Some(container),
        },
        Step::Stop => Classification::default(),
        Step::NoMatch => {
            if kind == StreamKind::Video && value.contains("@l") {
                Classification {
                    value: Some(Canonical::ProfileLevel(parse_profile_level(
                        ctx.video_codec,
                        &value,
                    ))),
                    container: None,
                }
            } else {
                log::trace!("unrecognised {kind:?} token: {value}");
                Classification::default()
            }
        }
    };

    // A Windows Media container holding anything but WMV/VC-1 video is plain ASF.
    if kind == StreamKind::Video && ctx.container == Some(Format::Wmv) {
        if let Some(Canonical::Format(codec)) = result.value {
            if !matches!(codec, Format::Wmv | Format::Vc1) {
                result.container = Some(Format::Asf);
            }
        }
    }

    // Drop rewrites that would not change anything, so re-running on a
    // settled asset is a no-op.
    if result.container.is_some() && result.container == ctx.container {
        result.container = None;
    }

    result
}

enum Step {
    Resolved(Format),
    Rewrite {
        format: Option<Format>,
        container: Format,
    },
    /// A context-gated rule matched the token but its condition did not hold.
    Stop,
    NoMatch,
}

fn cascade(kind: StreamKind, v: &str, ctx: &ClassificationContext) -> Step {
    use Format as F;
    use StreamKind::{Audio, General, Video};

    let general = kind == General;
    let video = kind == Video;

    let found = if general && v.starts_with("3g2") && v != "3g2a" {
        F::ThreeGpp2
    } else if general && v.starts_with("3gp") {
        F::ThreeGpp
    } else if general && (v.starts_with("matroska") || v == "mkv") {
        F::Matroska
    } else if general && (v == "avi" || v == "opendml") {
        F::Avi
    } else if v.starts_with("cinepak") || v == "cvid" {
        F::Cinepak
    } else if general && (v.starts_with("flash") || v == "flv") {
        F::Flv
    } else if general && v == "webm" {
        F::Webm
    } else if general && (v == "qt" || v == "quicktime" || v == "mov") {
        F::Mov
    } else if general
        && (v.contains("isom")
            || (v.starts_with("mp4") && !v.starts_with("mp4a"))
            || v == "20"
            || v == "isml"
            || (v.starts_with("m4a") && !v.starts_with("m4ae"))
            || v.starts_with("m4v")
            || v == "mpeg-4"
            || v == "xavc")
    {
        F::Mp4
    } else if general && (v.contains("mpeg-ps") || v == "mpeg") {
        F::MpegPs
    } else if general && (v.contains("mpeg-ts") || v == "bdav" || v == "mpegts") {
        F::MpegTs
    } else if general && v == "caf" {
        F::Caf
    } else if v.contains("aiff") {
        F::Aiff
    } else if v.starts_with("atmos") || v == "131" {
        F::Atmos
    } else if general && v.contains("ogg") {
        F::Ogg
    } else if v.contains("opus") {
        F::Opus
    } else if general && (v.contains("realmedia") || v == "rm") {
        F::Rm
    } else if v.starts_with("theora") {
        F::Theora
    } else if general && (v.starts_with("windows media") || v == "wmv" || v == "asf") {
        F::Wmv
    } else if video && matches!(v, "wmv1" | "wmv2" | "wmv7" | "wmv8") {
        F::Wmv
    } else if video
        && (v.contains("mjpg")
            || v.contains("mjpeg")
            || v == "mjpa"
            || v == "mjpb"
            || v == "jpeg"
            || v == "jpeg2000")
    {
        F::Mjpeg
    } else if matches!(v, "h.263" | "h263" | "s263" | "u263") {
        F::H263
    } else if v.starts_with("avc") || v.starts_with("h264") {
        F::H264
    } else if v.starts_with("hevc") || v.starts_with("h265") {
        F::H265
    } else if v == "av1" || v.starts_with("av01") {
        F::Av1
    } else if v.starts_with("sorenson") || v == "flv1" {
        F::Sorenson
    } else if v.starts_with("vp6") {
        F::Vp6
    } else if v.starts_with("vp7") {
        F::Vp7
    } else if v.starts_with("vp8") {
        F::Vp8
    } else if v.starts_with("vp9") {
        F::Vp9
    } else if v.starts_with("div") || v == "dx50" || v == "dvx1" || v == "xvid" {
        F::DivX
    } else if v.starts_with("indeo") {
        F::Indeo
    } else if v.starts_with("prores") || v.starts_with("apc") {
        F::ProRes
    } else if video && v == "yuv" {
        F::Yuv
    } else if video && (v == "rgb" || v == "rgba") {
        F::Rgb
    } else if video && v == "rle" {
        F::Rle
    } else if v == "mac3" {
        F::Mace3
    } else if v == "mac6" {
        F::Mace6
    } else if video && v.starts_with("tga") {
        F::Tga
    } else if v == "ffv1" {
        F::Ffv1
    } else if v == "celp" {
        F::Celp
    } else if v == "qcelp" {
        F::Qcelp
    } else if kind != Audio && DV_RE.is_match(v) {
        F::Dv
    } else if v.contains("mpeg video") || v == "mpeg2video" {
        F::Mpeg2
    } else if video && v == "mpeg1video" {
        F::Mpeg1
    } else if video && (v.starts_with("version 1") || v == "155") {
        // MPEG-1 is reported as "MPEG Video" plus a version field.
        return if ctx.video_codec == Some(F::Mpeg2) && ctx.audio_codec.is_none() {
            Step::Resolved(F::Mpeg1)
        } else {
            Step::Stop
        };
    } else if video && matches!(v, "mpeg-4 visual" | "mpeg4" | "fmp4" | "mp4v") {
        F::Mpeg4Visual
    } else if matches!(v, "vc-1" | "vc1" | "wvc1" | "wmv3" | "wmv9" | "wmva") {
        F::Vc1
    } else if v == "au" || v == "ulaw/au audio file" {
        F::Au
    } else if v == "layer 3" {
        let format = (ctx.audio_codec == Some(F::Mpa)).then_some(F::Mp3);
        return match (format, ctx.container) {
            (format, Some(F::Mpa)) => Step::Rewrite {
                format,
                container: F::Mp3,
            },
            (Some(f), _) => Step::Resolved(f),
            (None, _) => Step::Stop,
        };
    } else if v == "layer 2" {
        // Only meaningful for bare MPEG audio files.
        return if ctx.audio_codec == Some(F::Mpa) && ctx.container == Some(F::Mpa) {
            Step::Rewrite {
                format: Some(F::Mp2),
                container: F::Mp2,
            }
        } else {
            Step::Stop
        };
    } else if matches!(
        v,
        "ma" | "ma / core" | "134" | "xll" | "xll / core" | "dts-hd ma" | "dts-hd hra"
    ) {
        return if ctx.audio_codec == Some(F::Dts) {
            Step::Resolved(F::DtsHd)
        } else {
            Step::Stop
        };
    } else if v == "vorbis" || v == "a_vorbis" {
        F::Vorbis
    } else if v == "adts" || (general && v == "aac") {
        F::Adts
    } else if v.starts_with("amr") {
        F::Amr
    } else if v == "dolby e" {
        F::DolbyE
    } else if matches!(v, "ac-3" | "a_ac3" | "2000" | "ac3") {
        F::Ac3
    } else if v.starts_with("cook") {
        F::Cook
    } else if v.starts_with("qdesign") || v == "qdm2" {
        F::QDesign
    } else if v == "realaudio lossless" {
        F::Ralf
    } else if v.contains("e-ac-3") || v == "eac3" || v == "a_eac3" {
        F::Eac3
    } else if v.contains("truehd") {
        F::TrueHd
    } else if v == "tta" || v == "true audio" {
        F::Tta
    } else if v == "55" || v == "a_mpeg/l3" || v == "mp3" || v == "mp3float" {
        F::Mp3
    } else if kind == Audio && (v == "mp2" || v == "a_mpeg/l2") {
        F::Mp2
    } else if matches!(
        v,
        "lc" | "aac lc" | "aac" | "a_aac" | "mp4a-40-2" | "00001000-0000-ff00-8000-00aa00389b71"
    ) {
        F::AacLc
    } else if v.contains("he-aac") || v == "aac he" || v == "mp4a-40-5" {
        F::HeAac
    } else if v.starts_with("adpcm") {
        F::Adpcm
    } else if v == "pcm" || v.starts_with("pcm_") || (v == "1" && ctx.audio_codec != Some(F::Dts)) {
        F::Lpcm
    } else if v == "alac" {
        F::Alac
    } else if v == "als" {
        F::Als
    } else if general && v == "wave" {
        F::Wav
    } else if v == "shorten" {
        F::Shorten
    } else if v == "sls" {
        F::Sls
    } else if v == "acelp" {
        F::Acelp
    } else if v == "g.729" {
        F::G729
    } else if v == "vselp" {
        F::RealAudio144
    } else if v == "g.728" {
        F::RealAudio288
    } else if v == "a_dts" || v == "dts" || v == "dca" || v == "8" || v.starts_with("dts ") {
        F::Dts
    } else if v == "mpeg audio" {
        F::Mpa
    } else if matches!(v, "wma" | "wmav1" | "wmav2" | "161") {
        F::Wma
    } else if v == "wmapro" || v == "162" {
        F::WmaPro
    } else if v == "wmalossless" || v == "163" {
        F::WmaLossless
    } else if v == "wmavoice" || v == "10" {
        F::WmaVoice
    } else if v == "flac" {
        F::Flac
    } else if v == "monkey's audio" || v == "ape" {
        F::Ape
    } else if v.contains("musepack") || v == "mpc" {
        F::Mpc
    } else if v.contains("wavpack") || (general && v == "wv") {
        F::WavPack
    } else if v.contains("mlp") {
        F::Mlp
    } else if v == "openmg"
        || v.starts_with("atrac")
        || v.ends_with("-a119-fffa01e4ce62")
        || v.ends_with("-88fc-61654f8c836c")
    {
        F::Atrac
    } else if v == "nellymoser" {
        F::Nellymoser
    } else if general && (v == "dsf" || v == "dsd") {
        F::Dsf
    } else if general && (v == "dsdiff" || v == "dff") {
        F::Dff
    } else if !video && (v == "jpeg" || v == "jpeg_pipe") {
        F::Jpg
    } else if v == "png" || v == "png_pipe" {
        F::Png
    } else if v == "gif" || v == "gif_pipe" {
        F::Gif
    } else if v == "bitmap" || v == "bmp" || v == "bmp_pipe" {
        F::Bmp
    } else if v == "tiff" || v == "tiff_pipe" {
        F::Tiff
    } else if v == "webp" || v == "webp_pipe" {
        F::Webp
    } else if let Ok(canonical) = v.parse::<Format>() {
        // Already-canonical identifiers map to themselves.
        canonical
    } else {
        return Step::NoMatch;
    };

    Step::Resolved(found)
}

fn classify_subtitle(v: &str) -> Option<SubtitleFormat> {
    use SubtitleFormat as S;
    let found = match v {
        "utf-8" | "subrip" | "srt" | "s_text/utf8" => S::SubRip,
        "ass" | "s_text/ass" => S::Ass,
        "ssa" | "s_text/ssa" => S::Ssa,
        "vobsub" | "dvd_subtitle" | "s_vobsub" => S::VobSub,
        "pgs" | "hdmv_pgs_subtitle" | "s_hdmv/pgs" => S::Pgs,
        "webvtt" | "s_text/webvtt" => S::WebVtt,
        "timed text" | "mov_text" | "tx3g" => S::MovText,
        "dvb subtitle" | "dvb_subtitle" | "s_dvbsub" => S::DvbSub,
        "eia-608" | "eia_608" | "cea-608" => S::Cea608,
        "eia-708" | "eia_708" | "cea-708" => S::Cea708,
        "ttml" => S::Ttml,
        "microdvd" => S::MicroDvd,
        "sami" => S::Sami,
        other => return other.parse().ok(),
    };
    Some(found)
}
