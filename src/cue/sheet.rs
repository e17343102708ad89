//! CUE sheet parsing.
//!
//! Only the commands the track composer consumes are interpreted: `FILE`,
//! `TRACK`, `INDEX`, `TITLE`, `PERFORMER`, `SONGWRITER`, and the `GENRE` and
//! `DATE` remarks. Everything else (`CATALOG`, `FLAGS`, `ISRC`, `PREGAP`,
//! other `REM` lines) is skipped.

use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CueError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, CueError>;

/// An `mm:ss:ff` position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CueTime {
    pub minutes: u32,
    pub seconds: u32,
    pub frames: u32,
}

impl CueTime {
    /// Position in seconds. Frames count as hundredths, which is what every
    /// cached clip boundary was computed with.
    pub fn to_seconds(self) -> f64 {
        self.minutes as f64 * 60.0 + self.seconds as f64 + self.frames as f64 / 100.0
    }

    fn parse(token: &str) -> Option<Self> {
        let mut parts = token.split(':');
        let minutes = parts.next()?.parse().ok()?;
        let seconds = parts.next()?.parse().ok()?;
        let frames = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            minutes,
            seconds,
            frames,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CueIndex {
    pub number: u32,
    pub position: CueTime,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CueTrack {
    pub number: u32,
    /// `AUDIO`, `MODE1/2352`, ...
    pub data_type: String,
    pub title: Option<String>,
    pub performer: Option<String>,
    pub songwriter: Option<String>,
    pub indices: Vec<CueIndex>,
}

impl CueTrack {
    /// Start of the track: its first listed index, or zero without one.
    pub fn start_seconds(&self) -> f64 {
        self.indices
            .first()
            .map(|i| i.position.to_seconds())
            .unwrap_or(0.0)
    }
}

/// One `FILE` section and the tracks inside it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CueFile {
    /// As written in the sheet, usually relative to the sheet's directory.
    pub path: String,
    pub file_type: String,
    pub tracks: Vec<CueTrack>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CueSheet {
    pub title: Option<String>,
    pub performer: Option<String>,
    pub songwriter: Option<String>,
    pub genre: Option<String>,
    pub date: Option<String>,
    pub files: Vec<CueFile>,
}

/// Split a line into whitespace-separated words, honouring double quotes.
fn tokenize(line: &str, line_no: usize) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut word = String::new();
        if c == '"' {
            chars.next();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                word.push(c);
            }
            if !closed {
                return Err(CueError::Parse {
                    line: line_no,
                    message: "unterminated quote".into(),
                });
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
        }
        words.push(word);
    }
    Ok(words)
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl CueSheet {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CueError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut sheet = CueSheet::default();

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let words = tokenize(raw, line_no)?;
            let Some((command, args)) = words.split_first() else {
                continue;
            };
            let err = |message: &str| CueError::Parse {
                line: line_no,
                message: message.to_string(),
            };
            let first_arg = || args.first().map(String::as_str).ok_or_else(|| err("missing argument"));

            match command.to_ascii_uppercase().as_str() {
                "FILE" => {
                    let path = first_arg()?.to_string();
                    sheet.files.push(CueFile {
                        path,
                        file_type: args.get(1).cloned().unwrap_or_default(),
                        tracks: Vec::new(),
                    });
                }
                "TRACK" => {
                    let number = first_arg()?
                        .parse()
                        .map_err(|_| err("track number is not a number"))?;
                    let file = sheet
                        .files
                        .last_mut()
                        .ok_or_else(|| err("TRACK before any FILE"))?;
                    file.tracks.push(CueTrack {
                        number,
                        data_type: args.get(1).cloned().unwrap_or_default(),
                        ..CueTrack::default()
                    });
                }
                "INDEX" => {
                    let number = first_arg()?
                        .parse()
                        .map_err(|_| err("index number is not a number"))?;
                    let position = args
                        .get(1)
                        .and_then(|t| CueTime::parse(t))
                        .ok_or_else(|| err("index position is not mm:ss:ff"))?;
                    let track = sheet
                        .files
                        .last_mut()
                        .and_then(|f| f.tracks.last_mut())
                        .ok_or_else(|| err("INDEX outside a TRACK"))?;
                    track.indices.push(CueIndex { number, position });
                }
                "TITLE" | "PERFORMER" | "SONGWRITER" => {
                    let value = non_blank(&args.join(" "));
                    let track = sheet.files.last_mut().and_then(|f| f.tracks.last_mut());
                    let slot = match (command.to_ascii_uppercase().as_str(), track) {
                        ("TITLE", Some(t)) => &mut t.title,
                        ("PERFORMER", Some(t)) => &mut t.performer,
                        (_, Some(t)) => &mut t.songwriter,
                        ("TITLE", None) => &mut sheet.title,
                        ("PERFORMER", None) => &mut sheet.performer,
                        (_, None) => &mut sheet.songwriter,
                    };
                    *slot = value;
                }
                "REM" => match args.first().map(|a| a.to_ascii_uppercase()).as_deref() {
                    Some("GENRE") => sheet.genre = non_blank(&args[1..].join(" ")),
                    Some("DATE") => sheet.date = non_blank(&args[1..].join(" ")),
                    _ => {}
                },
                other => log::trace!("cue line {line_no}: skipping {other}"),
            }
        }
        Ok(sheet)
    }

    /// Year from `REM DATE`, which may be a bare year or a full date.
    pub fn year(&self) -> Option<u32> {
        let date = self.date.as_deref()?;
        let digits: String = date.chars().take_while(|c| c.is_ascii_digit()).collect();
        (digits.len() == 4).then(|| digits.parse().ok()).flatten()
    }

    pub fn track_count(&self) -> usize {
        self.files.iter().map(|f| f.tracks.len()).sum()
    }
}
