//! Turns a cue sheet into virtual tracks over its physical files.

use std::path::{Path, PathBuf};

use super::entry::{clip_duration, CueEntry};
use super::sheet::{CueFile, CueSheet, CueTrack};
use crate::config::AppConfig;
use crate::media::MediaInfo;
use crate::probe::Prober;

pub struct TrackComposer<'a> {
    prober: &'a dyn Prober,
    track_label: String,
    transcoder: String,
}

/// Probe result and transcoder choice for the physical file being walked.
struct FileState {
    path: PathBuf,
    base: MediaInfo,
    transcoder: Option<String>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl<'a> TrackComposer<'a> {
    pub fn new(prober: &'a dyn Prober, track_label: &str, transcoder: &str) -> Self {
        Self {
            prober,
            track_label: track_label.to_string(),
            transcoder: transcoder.to_string(),
        }
    }

    pub fn from_config(prober: &'a dyn Prober, config: &AppConfig) -> Self {
        Self::new(prober, &config.track_label, &config.transcoder)
    }

    /// Load and compose the sheet at `cue_path`. An unreadable or malformed
    /// sheet yields no entries.
    pub fn compose_file(&self, cue_path: &Path) -> Vec<CueEntry> {
        match CueSheet::load(cue_path) {
            Ok(sheet) => {
                let base_dir = cue_path.parent().unwrap_or(Path::new(""));
                self.compose(&sheet, base_dir)
            }
            Err(e) => {
                log::warn!("skipping cue sheet {}: {e}", cue_path.display());
                Vec::new()
            }
        }
    }

    /// One entry per track, in sheet order. `FILE` paths are resolved
    /// against `base_dir`.
    ///
    /// The first track of each physical file probes it; the following tracks
    /// of that file clone the result. A section whose file cannot be probed
    /// into a usable format contributes nothing.
    pub fn compose(&self, sheet: &CueSheet, base_dir: &Path) -> Vec<CueEntry> {
        let mut entries = Vec::with_capacity(sheet.track_count());
        let mut current: Option<FileState> = None;
        let mut track_number = 0u32;

        for file in &sheet.files {
            let physical = base_dir.join(&file.path);
            if current.as_ref().is_none_or(|c| c.path != physical) {
                current = self.probe_file(&physical);
            }
            let Some(state) = current.as_mut() else {
                track_number += file.tracks.len() as u32;
                continue;
            };

            for (i, track) in file.tracks.iter().enumerate() {
                track_number += 1;
                let clip_start = track.start_seconds();
                let clip_end = file
                    .tracks
                    .get(i + 1)
                    .map(CueTrack::start_seconds)
                    .unwrap_or(f64::INFINITY);
                let entry = self.entry(sheet, file, track, state, clip_start, clip_end, track_number);
                entries.push(entry);
            }
        }

        log::debug!(
            "composed {} of {} cue tracks",
            entries.len(),
            sheet.track_count()
        );
        entries
    }

    fn probe_file(&self, path: &Path) -> Option<FileState> {
        let base = match self.prober.probe(path) {
            Ok(info) => info,
            Err(e) => {
                log::warn!("cannot probe cue target {}: {e}", path.display());
                return None;
            }
        };
        if base.container.is_none() && !base.has_usable_audio() {
            log::warn!("no usable format in cue target {}", path.display());
            return None;
        }
        Some(FileState {
            path: path.to_path_buf(),
            base,
            transcoder: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn entry(
        &self,
        sheet: &CueSheet,
        file: &CueFile,
        track: &CueTrack,
        state: &mut FileState,
        clip_start: f64,
        clip_end: f64,
        track_number: u32,
    ) -> CueEntry {
        let title = match non_blank(track.title.as_ref()) {
            Some(t) => t.to_string(),
            None => format!("{} #{track_number}", self.track_label),
        };
        let artist = non_blank(track.performer.as_ref())
            .or_else(|| non_blank(sheet.performer.as_ref()))
            .or_else(|| non_blank(track.songwriter.as_ref()))
            .or_else(|| non_blank(sheet.songwriter.as_ref()))
            .map(str::to_string);

        let mut info = state.base.clone();
        info.size = None;
        info.duration = clip_duration(clip_start, clip_end, state.base.duration);

        let usable = info.has_usable_audio();
        if let Some(audio) = info.first_audio_track_mut() {
            audio.song_name = Some(title.clone());
            audio.artist = artist;
            audio.track_number = Some(track_number);
            if usable {
                audio.album = non_blank(sheet.title.as_ref()).map(str::to_string);
                audio.genre = non_blank(sheet.genre.as_ref()).map(str::to_string);
                audio.year = sheet.year();
            }
        }

        let mut entry = CueEntry {
            path: state.path.clone(),
            clip_start,
            clip_end,
            title,
            info,
            player: None,
        };
        if entry.is_partial_source() {
            let engine = state
                .transcoder
                .get_or_insert_with(|| self.transcoder.clone());
            entry.player = Some(engine.clone());
        }
        log::trace!("cue track {track_number} of {}: {}", file.path, entry.title);
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Format;
    use crate::media::{AudioTrack, MediaType};
    use crate::probe::{ProbeError, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a fixed flac descriptor and counts calls.
    struct CountingProber {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingProber {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    impl Prober for CountingProber {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn supports(&self, _: &Path) -> bool {
            true
        }

        fn probe(&self, path: &Path) -> Result<MediaInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProbeError::Unresolved(path.to_path_buf()));
            }
            let mut info = MediaInfo::new();
            info.container = Some(Format::Flac);
            info.media_type = MediaType::Audio;
            info.duration = Some(600.0);
            info.size = Some(60_000_000);
            let mut audio = AudioTrack::new(0);
            audio.codec = Some(Format::Flac);
            info.audio_tracks.push(audio);
            Ok(info)
        }
    }

    const THREE_TRACKS: &str = r#"REM GENRE Rock
REM DATE 1977
PERFORMER "Grateful Dead"
TITLE "Cornell"
FILE "show.flac" WAVE
  TRACK 01 AUDIO
    TITLE "Minglewood"
    INDEX 01 00:00:00
  TRACK 02 AUDIO
    PERFORMER "Jerry Garcia"
    INDEX 01 03:00:00
  TRACK 03 AUDIO
    TITLE "El Paso"
    SONGWRITER "Marty Robbins"
    INDEX 01 05:30:00
"#;

    fn compose(text: &str, prober: &CountingProber) -> Vec<CueEntry> {
        let sheet = CueSheet::parse(text).unwrap();
        TrackComposer::new(prober, "Track", "ffmpeg-audio").compose(&sheet, Path::new("/music"))
    }

    #[test]
    fn tracks_tile_the_file() {
        let prober = CountingProber::new();
        let entries = compose(THREE_TRACKS, &prober);
        let starts: Vec<f64> = entries.iter().map(|e| e.clip_start).collect();
        let ends: Vec<f64> = entries.iter().map(|e| e.clip_end).collect();
        assert_eq!(starts, vec![0.0, 180.0, 330.0]);
        assert_eq!(ends, vec![180.0, 330.0, f64::INFINITY]);
        assert_eq!(entries[2].duration(), Some(270.0));
        assert!(entries.iter().all(|e| e.path == Path::new("/music/show.flac")));
    }

    #[test]
    fn one_probe_per_physical_file() {
        let prober = CountingProber::new();
        let entries = compose(THREE_TRACKS, &prober);
        assert_eq!(entries.len(), 3);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn track_metadata_overrides() {
        let prober = CountingProber::new();
        let entries = compose(THREE_TRACKS, &prober);

        assert_eq!(entries[0].title, "Minglewood");
        assert_eq!(entries[1].title, "Track #2");

        let audio: Vec<&AudioTrack> = entries.iter().map(|e| &e.info.audio_tracks[0]).collect();
        assert_eq!(audio[0].artist.as_deref(), Some("Grateful Dead"));
        assert_eq!(audio[1].artist.as_deref(), Some("Jerry Garcia"));
        assert_eq!(audio[2].artist.as_deref(), Some("Grateful Dead"));
        assert_eq!(audio[1].song_name.as_deref(), Some("Track #2"));
        assert_eq!(audio[2].track_number, Some(3));
        assert_eq!(audio[0].album.as_deref(), Some("Cornell"));
        assert_eq!(audio[0].genre.as_deref(), Some("Rock"));
        assert_eq!(audio[0].year, Some(1977));
        assert!(entries.iter().all(|e| e.info.size.is_none()));
    }

    #[test]
    fn songwriter_is_the_last_resort() {
        let prober = CountingProber::new();
        let text = "FILE \"a.flac\" WAVE\n TRACK 01 AUDIO\n SONGWRITER \"Writer\"\n INDEX 01 00:00:00\n";
        let entries = compose(text, &prober);
        assert_eq!(entries[0].info.audio_tracks[0].artist.as_deref(), Some("Writer"));
    }

    #[test]
    fn clones_do_not_share_tracks() {
        let prober = CountingProber::new();
        let mut entries = compose(THREE_TRACKS, &prober);
        entries[0].info.audio_tracks[0].genre = Some("Jazz".into());
        entries[0].info.audio_tracks.push(AudioTrack::new(9));
        assert_eq!(entries[1].info.audio_tracks.len(), 1);
        assert_eq!(entries[1].info.audio_tracks[0].genre.as_deref(), Some("Rock"));
    }

    #[test]
    fn single_track_covers_whole_file() {
        let prober = CountingProber::new();
        let text = "FILE \"a.flac\" WAVE\n TRACK 01 AUDIO\n INDEX 01 00:00:00\n";
        let entries = compose(text, &prober);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].clip_start, 0.0);
        assert_eq!(entries[0].clip_end, f64::INFINITY);
        assert!(!entries[0].is_partial_source());
        assert_eq!(entries[0].player, None);
        assert_eq!(entries[0].duration(), Some(600.0));
    }

    #[test]
    fn partial_tracks_get_the_transcoder() {
        let prober = CountingProber::new();
        let entries = compose(THREE_TRACKS, &prober);
        assert!(entries.iter().all(|e| e.player.as_deref() == Some("ffmpeg-audio")));
    }

    #[test]
    fn running_track_number_spans_files() {
        let prober = CountingProber::new();
        let text = "FILE \"cd1.flac\" WAVE\n TRACK 01 AUDIO\n INDEX 01 00:00:00\n TRACK 02 AUDIO\n INDEX 01 04:00:00\n\
                    FILE \"cd2.flac\" WAVE\n TRACK 03 AUDIO\n INDEX 01 00:00:00\n";
        let entries = compose(text, &prober);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[2].info.audio_tracks[0].track_number, Some(3));
        assert_eq!(entries[2].path, Path::new("/music/cd2.flac"));
        assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unprobeable_file_yields_nothing() {
        let prober = CountingProber {
            calls: AtomicUsize::new(0),
            fail: true,
        };
        assert!(compose(THREE_TRACKS, &prober).is_empty());
    }

    #[test]
    fn malformed_sheet_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cue = dir.path().join("bad.cue");
        std::fs::write(&cue, "FILE \"a.flac\" WAVE\nINDEX 01 00:00:00\n").unwrap();
        let prober = CountingProber::new();
        let entries = TrackComposer::new(&prober, "Track", "ffmpeg-audio").compose_file(&cue);
        assert!(entries.is_empty());
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
    }
}
