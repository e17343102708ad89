use std::fmt;
use std::path::PathBuf;

use crate::media::MediaInfo;

const SEPARATOR: char = '>';

/// One-line persisted form of a virtual track:
/// `<path>>clip_start>clip_end[>title]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackReference {
    pub path: PathBuf,
    pub clip_start: f64,
    pub clip_end: f64,
    pub title: Option<String>,
}

impl TrackReference {
    /// Parse a serialized reference. Exactly three or four fields with
    /// numeric clip bounds; anything else is not a reference.
    pub fn parse(s: &str) -> Option<Self> {
        let fields: Vec<&str> = s.split(SEPARATOR).collect();
        if !(3..=4).contains(&fields.len()) || fields[0].is_empty() {
            return None;
        }
        let clip_start = fields[1].parse::<f64>().ok()?;
        let clip_end = fields[2].parse::<f64>().ok()?;
        Some(Self {
            path: PathBuf::from(fields[0]),
            clip_start,
            clip_end,
            title: fields.get(3).map(|t| t.to_string()),
        })
    }

    /// The physical path of a serialized reference, without allocating.
    pub fn split_path(s: &str) -> Option<&str> {
        Self::parse(s)?;
        s.split(SEPARATOR).next()
    }
}

impl fmt::Display for TrackReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            self.path.display(),
            self.clip_start,
            self.clip_end
        )?;
        if let Some(title) = &self.title {
            write!(f, "{SEPARATOR}{title}")?;
        }
        Ok(())
    }
}

/// A virtual track: a clip of a shared physical file with its own copy of
/// the file's descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct CueEntry {
    pub path: PathBuf,
    pub clip_start: f64,
    /// `f64::INFINITY` runs to the end of the file.
    pub clip_end: f64,
    pub title: String,
    pub info: MediaInfo,
    /// Transcoding engine forced onto this entry, if any.
    pub player: Option<String>,
}

impl CueEntry {
    /// True when the entry covers less than its whole file.
    ///
    /// An entry that starts at zero and runs to the end reports `false`
    /// even though it came from a cue sheet.
    pub fn is_partial_source(&self) -> bool {
        self.clip_start > 0.0 || (self.clip_end != 0.0 && self.clip_end.is_finite())
    }

    pub fn reference(&self) -> TrackReference {
        TrackReference {
            path: self.path.clone(),
            clip_start: self.clip_start,
            clip_end: self.clip_end,
            title: Some(self.title.clone()),
        }
    }

    pub fn duration(&self) -> Option<f64> {
        self.info.duration
    }
}

/// Length of a clip, falling back to the file's duration for the open end.
pub fn clip_duration(clip_start: f64, clip_end: f64, base: Option<f64>) -> Option<f64> {
    if clip_end.is_finite() && clip_end != 0.0 {
        Some(clip_end - clip_start)
    } else {
        base.map(|d| (d - clip_start).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start: f64, end: f64) -> CueEntry {
        CueEntry {
            path: PathBuf::from("/music/live.flac"),
            clip_start: start,
            clip_end: end,
            title: "Loser".into(),
            info: MediaInfo::new(),
            player: None,
        }
    }

    #[test]
    fn partial_source_boundaries() {
        assert!(entry(0.0, 180.0).is_partial_source());
        assert!(entry(180.0, f64::INFINITY).is_partial_source());
        assert!(!entry(0.0, f64::INFINITY).is_partial_source());
        assert!(!entry(0.0, 0.0).is_partial_source());
    }

    #[test]
    fn reference_text_form() {
        let r = entry(180.0, 330.5).reference();
        assert_eq!(r.to_string(), "/music/live.flac>180>330.5>Loser");

        let open = entry(330.0, f64::INFINITY).reference();
        let parsed = TrackReference::parse(&open.to_string()).unwrap();
        assert_eq!(parsed.clip_end, f64::INFINITY);
        assert_eq!(parsed.title.as_deref(), Some("Loser"));
    }

    #[test]
    fn parse_accepts_three_or_four_fields() {
        let r = TrackReference::parse("/m/a.flac>0>12.5").unwrap();
        assert_eq!(r.path, PathBuf::from("/m/a.flac"));
        assert_eq!(r.title, None);

        assert!(TrackReference::parse("/m/a.flac>0").is_none());
        assert!(TrackReference::parse("/m/a.flac>0>1>t>extra").is_none());
        assert!(TrackReference::parse("/m/a.flac>zero>1").is_none());
        assert!(TrackReference::parse("/m/plain.flac").is_none());
        assert!(TrackReference::parse(">0>1").is_none());
    }

    #[test]
    fn split_path_only_for_references() {
        assert_eq!(TrackReference::split_path("/m/a.flac>0>1"), Some("/m/a.flac"));
        assert_eq!(TrackReference::split_path("/m/a.flac"), None);
    }

    #[test]
    fn open_end_uses_file_duration() {
        assert_eq!(clip_duration(180.0, 330.0, Some(600.0)), Some(150.0));
        assert_eq!(clip_duration(330.0, f64::INFINITY, Some(600.0)), Some(270.0));
        assert_eq!(clip_duration(330.0, f64::INFINITY, None), None);
    }
}
