//! Tag-reading backend for audio files, used when no external tool is available.

use std::path::Path;

use lofty::file::{FileType, TaggedFileExt};
use lofty::prelude::*;

use super::session::{field, ProbeSession};
use super::{extension_lower, ProbeError, Prober, Result};
use crate::classifier::StreamKind;
use crate::media::{MediaInfo, Thumbnail};

const AUDIO_EXTENSIONS: &[&str] = &[
    "aac", "aif", "aiff", "ape", "flac", "m4a", "mp3", "mpc", "oga", "ogg", "opus", "wav", "wv",
];

pub struct TagProber {
    thumbnails: bool,
}

impl TagProber {
    pub fn new(thumbnails: bool) -> Self {
        Self { thumbnails }
    }
}

/// General format token and audio codec token for a lofty file type.
fn format_tokens(file_type: FileType) -> Option<(&'static str, Option<&'static str>)> {
    let tokens = match file_type {
        FileType::Aac => ("adts", Some("aac")),
        FileType::Aiff => ("aiff", Some("pcm")),
        FileType::Ape => ("ape", Some("ape")),
        FileType::Flac => ("flac", Some("flac")),
        FileType::Mpeg => ("mp3", Some("mp3")),
        FileType::Mp4 => ("mpeg-4", Some("aac")),
        FileType::Mpc => ("mpc", Some("mpc")),
        FileType::Opus => ("ogg", Some("opus")),
        FileType::Vorbis => ("ogg", Some("vorbis")),
        FileType::Speex => ("ogg", None),
        FileType::Wav => ("wave", Some("pcm")),
        FileType::WavPack => ("wavpack", Some("wavpack")),
        _ => return None,
    };
    Some(tokens)
}

impl Prober for TagProber {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn supports(&self, path: &Path) -> bool {
        extension_lower(path).is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
    }

    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let tagged = lofty::read_from_path(path)?;
        let (container, codec) = format_tokens(tagged.file_type())
            .ok_or_else(|| ProbeError::Unsupported(path.to_path_buf()))?;

        let mut session = ProbeSession::new();
        session.begin_stream(StreamKind::General);
        session.field(StreamKind::General, field::FORMAT, container);

        let props = tagged.properties();
        let secs = props.duration().as_secs_f64();
        if secs > 0.0 {
            session.field(StreamKind::General, field::DURATION, &secs.to_string());
        }
        if let Some(kbps) = props.overall_bitrate() {
            session.field(StreamKind::General, field::OVERALL_BITRATE, &format!("{kbps} kb/s"));
        }

        session.begin_stream(StreamKind::Audio);
        if let Some(codec) = codec {
            session.field(StreamKind::Audio, field::FORMAT, codec);
        }
        if let Some(rate) = props.sample_rate() {
            session.field(StreamKind::Audio, field::SAMPLING_RATE, &rate.to_string());
        }
        if let Some(channels) = props.channels() {
            session.field(StreamKind::Audio, field::CHANNELS, &channels.to_string());
        }
        if let Some(bits) = props.bit_depth() {
            session.field(StreamKind::Audio, field::BIT_DEPTH, &bits.to_string());
        }
        if let Some(kbps) = props.audio_bitrate() {
            session.field(StreamKind::Audio, field::BITRATE, &format!("{kbps} kb/s"));
        }

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            let general = StreamKind::General;
            if let Some(v) = tag.title() {
                session.field(general, field::TRACK, &v);
            }
            if let Some(v) = tag.artist() {
                session.field(general, field::PERFORMER, &v);
            }
            if let Some(v) = tag.album() {
                session.field(general, field::ALBUM, &v);
            }
            if let Some(v) = tag.genre() {
                session.field(general, field::GENRE, &v);
            }
            if let Some(n) = tag.track() {
                session.field(general, field::TRACK_POSITION, &n.to_string());
            }
            match tag.year() {
                Some(y) => session.field(general, field::RECORDED_DATE, &y.to_string()),
                None => {
                    if let Some(date) = tag.get_string(&ItemKey::RecordingDate) {
                        session.field(general, field::RECORDED_DATE, date);
                    }
                }
            }

            if self.thumbnails {
                if let Some(picture) = tag.pictures().first() {
                    session.set_thumbnail(Thumbnail {
                        data: picture.data().to_vec(),
                        mime: picture
                            .mime_type()
                            .map(|m| m.as_str().to_string())
                            .unwrap_or_else(|| "image/jpeg".to_string()),
                        width: None,
                        height: None,
                    });
                }
            }
        }

        if let Ok(meta) = std::fs::metadata(path) {
            session.set_size(meta.len());
        }
        Ok(session.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify, Canonical, ClassificationContext, Format};

    #[test]
    fn supports_audio_extensions_only() {
        let p = TagProber::new(false);
        assert!(p.supports(Path::new("/m/song.FLAC")));
        assert!(p.supports(Path::new("/m/song.m4a")));
        assert!(!p.supports(Path::new("/m/movie.mkv")));
        assert!(!p.supports(Path::new("/m/noext")));
    }

    #[test]
    fn file_type_tokens_classify() {
        let ctx = ClassificationContext::default();
        let cases = [
            (FileType::Flac, Format::Flac, Format::Flac),
            (FileType::Mpeg, Format::Mp3, Format::Mp3),
            (FileType::Mp4, Format::Mp4, Format::AacLc),
            (FileType::Opus, Format::Ogg, Format::Opus),
            (FileType::WavPack, Format::WavPack, Format::WavPack),
        ];
        for (ft, container, codec) in cases {
            let (general, audio) = format_tokens(ft).unwrap();
            assert_eq!(
                classify(StreamKind::General, general, &ctx).value,
                Some(Canonical::Format(container)),
                "{ft:?}"
            );
            assert_eq!(
                classify(StreamKind::Audio, audio.unwrap(), &ctx).value,
                Some(Canonical::Format(codec)),
                "{ft:?}"
            );
        }
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.flac");
        std::fs::write(&path, b"not really flac").unwrap();
        assert!(TagProber::new(false).probe(&path).is_err());
    }
}
