use std::fmt;
use std::str::FromStr;

/// Canonical container / codec / image identifiers.
///
/// Every variant has a stable lower-case configuration string. That string is
/// what gets persisted in the cache and what renderer profiles match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    // Containers
    ThreeGpp,
    ThreeGpp2,
    ThreeGa,
    ThreeG2a,
    Aiff,
    Asf,
    Au,
    Avi,
    Caf,
    Dff,
    Dsf,
    Flv,
    Matroska,
    Mka,
    Mov,
    Mp4,
    M4a,
    MpegPs,
    MpegTs,
    Ogg,
    Oga,
    Rm,
    Ra,
    Wav,
    Webm,
    Weba,
    Wmv,

    // Video codecs
    Av1,
    Cinepak,
    DivX,
    Dv,
    Ffv1,
    H263,
    H264,
    H265,
    Indeo,
    Mjpeg,
    Mpeg1,
    Mpeg2,
    Mpeg4Visual,
    ProRes,
    Rgb,
    Rle,
    Sorenson,
    Tga,
    Theora,
    Vc1,
    Vp6,
    Vp7,
    Vp8,
    Vp9,
    Yuv,

    // Audio codecs
    AacLc,
    Ac3,
    Acelp,
    Adpcm,
    Adts,
    Alac,
    Als,
    Amr,
    Ape,
    Atmos,
    Atrac,
    Celp,
    Cook,
    DolbyE,
    Dts,
    DtsHd,
    Eac3,
    Flac,
    G729,
    HeAac,
    Lpcm,
    Mace3,
    Mace6,
    Mlp,
    Mp2,
    Mp3,
    Mpa,
    Mpc,
    Nellymoser,
    Opus,
    QDesign,
    Qcelp,
    Ralf,
    RealAudio144,
    RealAudio288,
    Shorten,
    Sls,
    TrueHd,
    Tta,
    Vorbis,
    WavPack,
    Wma,
    WmaLossless,
    WmaPro,
    WmaVoice,

    // Images
    Bmp,
    Gif,
    Jpg,
    Png,
    Tiff,
    Webp,
}

impl Format {
    pub const ALL: &'static [Format] = &[
        Format::ThreeGpp,
        Format::ThreeGpp2,
        Format::ThreeGa,
        Format::ThreeG2a,
        Format::Aiff,
        Format::Asf,
        Format::Au,
        Format::Avi,
        Format::Caf,
        Format::Dff,
        Format::Dsf,
        Format::Flv,
        Format::Matroska,
        Format::Mka,
        Format::Mov,
        Format::Mp4,
        Format::M4a,
        Format::MpegPs,
        Format::MpegTs,
        Format::Ogg,
        Format::Oga,
        Format::Rm,
        Format::Ra,
        Format::Wav,
        Format::Webm,
        Format::Weba,
        Format::Wmv,
        Format::Av1,
        Format::Cinepak,
        Format::DivX,
        Format::Dv,
        Format::Ffv1,
        Format::H263,
        Format::H264,
        Format::H265,
        Format::Indeo,
        Format::Mjpeg,
        Format::Mpeg1,
        Format::Mpeg2,
        Format::Mpeg4Visual,
        Format::ProRes,
        Format::Rgb,
        Format::Rle,
        Format::Sorenson,
        Format::Tga,
        Format::Theora,
        Format::Vc1,
        Format::Vp6,
        Format::Vp7,
        Format::Vp8,
        Format::Vp9,
        Format::Yuv,
        Format::AacLc,
        Format::Ac3,
        Format::Acelp,
        Format::Adpcm,
        Format::Adts,
        Format::Alac,
        Format::Als,
        Format::Amr,
        Format::Ape,
        Format::Atmos,
        Format::Atrac,
        Format::Celp,
        Format::Cook,
        Format::DolbyE,
        Format::Dts,
        Format::DtsHd,
        Format::Eac3,
        Format::Flac,
        Format::G729,
        Format::HeAac,
        Format::Lpcm,
        Format::Mace3,
        Format::Mace6,
        Format::Mlp,
        Format::Mp2,
        Format::Mp3,
        Format::Mpa,
        Format::Mpc,
        Format::Nellymoser,
        Format::Opus,
        Format::QDesign,
        Format::Qcelp,
        Format::Ralf,
        Format::RealAudio144,
        Format::RealAudio288,
        Format::Shorten,
        Format::Sls,
        Format::TrueHd,
        Format::Tta,
        Format::Vorbis,
        Format::WavPack,
        Format::Wma,
        Format::WmaLossless,
        Format::WmaPro,
        Format::WmaVoice,
        Format::Bmp,
        Format::Gif,
        Format::Jpg,
        Format::Png,
        Format::Tiff,
        Format::Webp,
    ];

    /// The configuration string stored in the cache and matched by renderer profiles.
    pub fn as_str(self) -> &'static str {
        match self {
            Format::ThreeGpp => "3gp",
            Format::ThreeGpp2 => "3g2",
            Format::ThreeGa => "3ga",
            Format::ThreeG2a => "3g2a",
            Format::Aiff => "aiff",
            Format::Asf => "asf",
            Format::Au => "au",
            Format::Avi => "avi",
            Format::Caf => "caf",
            Format::Dff => "dff",
            Format::Dsf => "dsf",
            Format::Flv => "flv",
            Format::Matroska => "mkv",
            Format::Mka => "mka",
            Format::Mov => "mov",
            Format::Mp4 => "mp4",
            Format::M4a => "m4a",
            Format::MpegPs => "mpegps",
            Format::MpegTs => "mpegts",
            Format::Ogg => "ogg",
            Format::Oga => "oga",
            Format::Rm => "rm",
            Format::Ra => "ra",
            Format::Wav => "wav",
            Format::Webm => "webm",
            Format::Weba => "weba",
            Format::Wmv => "wmv",
            Format::Av1 => "av1",
            Format::Cinepak => "cvid",
            Format::DivX => "divx",
            Format::Dv => "dv",
            Format::Ffv1 => "ffv1",
            Format::H263 => "h263",
            Format::H264 => "h264",
            Format::H265 => "h265",
            Format::Indeo => "indeo",
            Format::Mjpeg => "mjpeg",
            Format::Mpeg1 => "mpeg1",
            Format::Mpeg2 => "mpeg2",
            Format::Mpeg4Visual => "mpeg4",
            Format::ProRes => "prores",
            Format::Rgb => "rgb",
            Format::Rle => "rle",
            Format::Sorenson => "sor",
            Format::Tga => "tga",
            Format::Theora => "theora",
            Format::Vc1 => "vc1",
            Format::Vp6 => "vp6",
            Format::Vp7 => "vp7",
            Format::Vp8 => "vp8",
            Format::Vp9 => "vp9",
            Format::Yuv => "yuv",
            Format::AacLc => "aac-lc",
            Format::Ac3 => "ac3",
            Format::Acelp => "acelp",
            Format::Adpcm => "adpcm",
            Format::Adts => "adts",
            Format::Alac => "alac",
            Format::Als => "als",
            Format::Amr => "amr",
            Format::Ape => "ape",
            Format::Atmos => "atmos",
            Format::Atrac => "atrac",
            Format::Celp => "celp",
            Format::Cook => "cook",
            Format::DolbyE => "dolbye",
            Format::Dts => "dts",
            Format::DtsHd => "dtshd",
            Format::Eac3 => "eac3",
            Format::Flac => "flac",
            Format::G729 => "g729",
            Format::HeAac => "he-aac",
            Format::Lpcm => "lpcm",
            Format::Mace3 => "mace3",
            Format::Mace6 => "mace6",
            Format::Mlp => "mlp",
            Format::Mp2 => "mp2",
            Format::Mp3 => "mp3",
            Format::Mpa => "mpa",
            Format::Mpc => "mpc",
            Format::Nellymoser => "nellymoser",
            Format::Opus => "opus",
            Format::QDesign => "qdmc",
            Format::Qcelp => "qcelp",
            Format::Ralf => "ralf",
            Format::RealAudio144 => "ra14.4",
            Format::RealAudio288 => "ra28.8",
            Format::Shorten => "shn",
            Format::Sls => "sls",
            Format::TrueHd => "truehd",
            Format::Tta => "tta",
            Format::Vorbis => "vorbis",
            Format::WavPack => "wavpack",
            Format::Wma => "wma",
            Format::WmaLossless => "wmalossless",
            Format::WmaPro => "wmapro",
            Format::WmaVoice => "wmavoice",
            Format::Bmp => "bmp",
            Format::Gif => "gif",
            Format::Jpg => "jpg",
            Format::Png => "png",
            Format::Tiff => "tiff",
            Format::Webp => "webp",
        }
    }

    /// The pure-audio counterpart of a container that may hold either
    /// audio-only or audio+video content.
    pub fn audio_variant(self) -> Option<Format> {
        AUDIO_VARIANTS
            .iter()
            .find(|(container, _)| *container == self)
            .map(|(_, variant)| *variant)
    }
}

/// Container → pure-audio variant. Applied once per asset, after all tracks
/// have been enumerated and no video track was found.
pub const AUDIO_VARIANTS: &[(Format, Format)] = &[
    (Format::Matroska, Format::Mka),
    (Format::Mp4, Format::M4a),
    (Format::Ogg, Format::Oga),
    (Format::Webm, Format::Weba),
    (Format::Wmv, Format::Wma),
    (Format::Asf, Format::Wma),
    (Format::Rm, Format::Ra),
    (Format::ThreeGpp, Format::ThreeGa),
    (Format::ThreeGpp2, Format::ThreeG2a),
];

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl fmt::Display for UnknownFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown format identifier: {}", self.0)
    }
}

impl std::error::Error for UnknownFormat {}

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// Canonical subtitle stream formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubtitleFormat {
    SubRip,
    Ass,
    Ssa,
    VobSub,
    Pgs,
    WebVtt,
    MovText,
    DvbSub,
    Cea608,
    Cea708,
    Ttml,
    MicroDvd,
    Sami,
}

impl SubtitleFormat {
    pub const ALL: &'static [SubtitleFormat] = &[
        SubtitleFormat::SubRip,
        SubtitleFormat::Ass,
        SubtitleFormat::Ssa,
        SubtitleFormat::VobSub,
        SubtitleFormat::Pgs,
        SubtitleFormat::WebVtt,
        SubtitleFormat::MovText,
        SubtitleFormat::DvbSub,
        SubtitleFormat::Cea608,
        SubtitleFormat::Cea708,
        SubtitleFormat::Ttml,
        SubtitleFormat::MicroDvd,
        SubtitleFormat::Sami,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubtitleFormat::SubRip => "subrip",
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::Ssa => "ssa",
            SubtitleFormat::VobSub => "vobsub",
            SubtitleFormat::Pgs => "pgs",
            SubtitleFormat::WebVtt => "webvtt",
            SubtitleFormat::MovText => "mov_text",
            SubtitleFormat::DvbSub => "dvbsub",
            SubtitleFormat::Cea608 => "cea608",
            SubtitleFormat::Cea708 => "cea708",
            SubtitleFormat::Ttml => "ttml",
            SubtitleFormat::MicroDvd => "microdvd",
            SubtitleFormat::Sami => "sami",
        }
    }

    /// Text-based formats can be converted by a renderer-side parser;
    /// the rest are bitmaps and have to be burned in.
    pub fn is_text(self) -> bool {
        !matches!(
            self,
            SubtitleFormat::VobSub | SubtitleFormat::Pgs | SubtitleFormat::DvbSub
        )
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubtitleFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubtitleFormat::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_strings_round_trip_through_from_str() {
        for f in Format::ALL {
            assert_eq!(f.as_str().parse::<Format>().unwrap(), *f);
        }
        for s in SubtitleFormat::ALL {
            assert_eq!(s.as_str().parse::<SubtitleFormat>().unwrap(), *s);
        }
    }

    #[test]
    fn config_strings_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for f in Format::ALL {
            assert!(seen.insert(f.as_str()), "duplicate: {}", f.as_str());
        }
    }

    #[test]
    fn audio_variants() {
        assert_eq!(Format::Mp4.audio_variant(), Some(Format::M4a));
        assert_eq!(Format::Matroska.audio_variant(), Some(Format::Mka));
        assert_eq!(Format::Asf.audio_variant(), Some(Format::Wma));
        assert_eq!(Format::Avi.audio_variant(), None);
        assert_eq!(Format::Mp3.audio_variant(), None);
    }

    #[test]
    fn unknown_identifier_is_an_error() {
        assert!("mpeg7".parse::<Format>().is_err());
    }
}
