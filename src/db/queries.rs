use std::collections::BTreeMap;
use std::path::Path;
use std::time::UNIX_EPOCH;

use super::models::{CacheStats, SweepReport};
use super::{Database, Result};
use crate::classifier::{Format, Level, SubtitleFormat};
use crate::cue::TrackReference;
use crate::media::{
    AudioTrack, MediaInfo, MediaType, RateMode, ScanOrder, ScanType, StreamLang, SubtitleTrack,
    Thumbnail,
};
use rusqlite::{params, Connection, Row};

/// Last-modified time of `path` in milliseconds since the epoch, the unit
/// every cache key uses.
pub fn file_mtime(path: &Path) -> std::io::Result<i64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    Ok(millis)
}

const FILE_COLUMNS: &str = "id, type, container, duration, bitrate, bitrate_mode, size,
    width, height, aspect_ratio_container, aspect_ratio_video, aspect_ratio_dvd_iso,
    codecv, profile, level, stereoscopy, scan_type, scan_order, frame_rate,
    frame_rate_mode, ref_frames, video_bit_depth, video_track_count, image_count,
    thumb, thumb_mime, thumb_width, thumb_height, extras";

fn parse_format(value: Option<String>) -> Option<Format> {
    let value = value?;
    match value.parse() {
        Ok(format) => Some(format),
        Err(e) => {
            log::debug!("ignoring cached format: {e}");
            None
        }
    }
}

fn file_from_row(row: &Row) -> rusqlite::Result<(i64, MediaInfo)> {
    let mut info = MediaInfo::new();
    info.media_type = MediaType::from_code(row.get(1)?);
    info.container = parse_format(row.get(2)?);
    info.duration = row.get(3)?;
    info.bitrate = row.get(4)?;
    info.bitrate_mode = row.get::<_, Option<String>>(5)?.as_deref().and_then(RateMode::parse);
    info.size = row.get::<_, Option<i64>>(6)?.map(|s| s as u64);
    info.width = row.get(7)?;
    info.height = row.get(8)?;
    info.aspect_ratio_container = row.get(9)?;
    info.aspect_ratio_video_track = row.get(10)?;
    info.aspect_ratio_dvd_iso = row.get(11)?;
    info.video_codec = parse_format(row.get(12)?);
    info.video_profile = row.get(13)?;
    let level: Option<String> = row.get(14)?;
    info.video_level = match (info.video_codec, level) {
        (Some(codec), Some(level)) => Level::parse_for(codec, &level),
        _ => None,
    };
    info.stereoscopy = row.get(15)?;
    info.scan_type = row.get::<_, Option<String>>(16)?.as_deref().and_then(ScanType::parse);
    info.scan_order = row.get::<_, Option<String>>(17)?.as_deref().and_then(ScanOrder::parse);
    info.frame_rate = row.get(18)?;
    info.frame_rate_mode = row.get::<_, Option<String>>(19)?.as_deref().and_then(RateMode::parse);
    info.reference_frames = row.get(20)?;
    info.video_bit_depth = row.get(21)?;
    info.video_track_count = row.get(22)?;
    info.image_count = row.get(23)?;

    let thumb: Option<Vec<u8>> = row.get(24)?;
    info.thumbnail = thumb.map(|data| -> rusqlite::Result<Thumbnail> {
        Ok(Thumbnail {
            data,
            mime: row
                .get::<_, Option<String>>(25)?
                .unwrap_or_else(|| "image/jpeg".to_string()),
            width: row.get(26)?,
            height: row.get(27)?,
        })
    })
    .transpose()?;

    let extras: Option<String> = row.get(28)?;
    info.extras = extras
        .and_then(|json| serde_json::from_str::<BTreeMap<String, String>>(&json).ok())
        .unwrap_or_default();

    Ok((row.get(0)?, info))
}

fn audio_tracks(conn: &Connection, file_id: i64) -> Result<Vec<AudioTrack>> {
    let mut stmt = conn.prepare_cached(
        "SELECT stream_id, lang, title, codec, channels, sample_rate, bit_depth, bitrate,
                bitrate_mode, delay, album, artist, song_name, track_number, year, genre
         FROM audiotracks WHERE fileid = ?1 ORDER BY id",
    )?;
    let tracks = stmt
        .query_map(params![file_id], |row| {
            Ok(AudioTrack {
                stream: StreamLang {
                    id: row.get(0)?,
                    lang: row.get(1)?,
                    title: row.get(2)?,
                },
                codec: parse_format(row.get(3)?),
                channels: row.get(4)?,
                sample_rate: row.get(5)?,
                bit_depth: row.get(6)?,
                bitrate: row.get(7)?,
                bitrate_mode: row
                    .get::<_, Option<String>>(8)?
                    .as_deref()
                    .and_then(RateMode::parse),
                delay: row.get(9)?,
                album: row.get(10)?,
                artist: row.get(11)?,
                song_name: row.get(12)?,
                track_number: row.get(13)?,
                year: row.get(14)?,
                genre: row.get(15)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tracks)
}

fn subtitle_tracks(conn: &Connection, file_id: i64) -> Result<Vec<SubtitleTrack>> {
    let mut stmt = conn.prepare_cached(
        "SELECT stream_id, lang, title, format, forced, is_default
         FROM subtracks WHERE fileid = ?1 ORDER BY id",
    )?;
    let tracks = stmt
        .query_map(params![file_id], |row| {
            Ok(SubtitleTrack {
                stream: StreamLang {
                    id: row.get(0)?,
                    lang: row.get(1)?,
                    title: row.get(2)?,
                },
                format: row
                    .get::<_, Option<String>>(3)?
                    .and_then(|s| s.parse::<SubtitleFormat>().ok()),
                forced: row.get(4)?,
                default: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tracks)
}

/// Physical file behind a cache key; virtual tracks are stored under their
/// serialized reference.
fn physical_path(filename: &str) -> &Path {
    match TrackReference::split_path(filename) {
        Some(path) => Path::new(path),
        None => Path::new(filename),
    }
}

impl Database {
    /// Whether a row exists for exactly this `(path, mtime)` pair.
    pub fn exists(&self, path: &str, mtime: i64) -> Result<bool> {
        let conn = self.conn();
        let result: std::result::Result<i64, _> = conn.query_row(
            "SELECT id FROM files WHERE filename = ?1 AND modified = ?2",
            params![path, mtime],
            |row| row.get(0),
        );

        match result {
            Ok(_) => Ok(true),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Rehydrate the descriptor cached for `(path, mtime)`, child tracks in
    /// their stored order. The result is already marked parsed.
    pub fn get(&self, path: &str, mtime: i64) -> Result<Option<MediaInfo>> {
        let conn = self.conn();
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE filename = ?1 AND modified = ?2");
        let found = conn.query_row(&sql, params![path, mtime], file_from_row);

        let (id, mut info) = match found {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        info.audio_tracks = audio_tracks(&conn, id)?;
        info.subtitle_tracks = subtitle_tracks(&conn, id)?;
        info.mark_parsed();
        Ok(Some(info))
    }

    /// Insert or replace the row set for `(path, mtime)` in one transaction.
    /// Returns the file id.
    ///
    /// Child rows are matched by `(file id, ordinal)`. Ordinals beyond the new
    /// track count are left in place.
    pub fn upsert(&self, path: &str, mtime: i64, info: &MediaInfo) -> Result<i64> {
        let extras = if info.extras.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&info.extras)?)
        };
        let thumb = info.thumbnail.as_ref();

        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO files (
                filename, modified, type, container, duration, bitrate, bitrate_mode, size,
                width, height, aspect_ratio_container, aspect_ratio_video, aspect_ratio_dvd_iso,
                codecv, profile, level, stereoscopy, scan_type, scan_order, frame_rate,
                frame_rate_mode, ref_frames, video_bit_depth, video_track_count, image_count,
                thumb, thumb_mime, thumb_width, thumb_height, extras
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24, ?25,
                ?26, ?27, ?28, ?29, ?30
            )
            ON CONFLICT(filename, modified) DO UPDATE SET
                type = excluded.type,
                container = excluded.container,
                duration = excluded.duration,
                bitrate = excluded.bitrate,
                bitrate_mode = excluded.bitrate_mode,
                size = excluded.size,
                width = excluded.width,
                height = excluded.height,
                aspect_ratio_container = excluded.aspect_ratio_container,
                aspect_ratio_video = excluded.aspect_ratio_video,
                aspect_ratio_dvd_iso = excluded.aspect_ratio_dvd_iso,
                codecv = excluded.codecv,
                profile = excluded.profile,
                level = excluded.level,
                stereoscopy = excluded.stereoscopy,
                scan_type = excluded.scan_type,
                scan_order = excluded.scan_order,
                frame_rate = excluded.frame_rate,
                frame_rate_mode = excluded.frame_rate_mode,
                ref_frames = excluded.ref_frames,
                video_bit_depth = excluded.video_bit_depth,
                video_track_count = excluded.video_track_count,
                image_count = excluded.image_count,
                thumb = excluded.thumb,
                thumb_mime = excluded.thumb_mime,
                thumb_width = excluded.thumb_width,
                thumb_height = excluded.thumb_height,
                extras = excluded.extras
            ",
            params![
                path,
                mtime,
                info.media_type.code(),
                info.container.map(Format::as_str),
                info.duration,
                info.bitrate,
                info.bitrate_mode.map(RateMode::as_str),
                info.size.map(|s| s as i64),
                info.width,
                info.height,
                info.aspect_ratio_container,
                info.aspect_ratio_video_track,
                info.aspect_ratio_dvd_iso,
                info.video_codec.map(Format::as_str),
                info.video_profile,
                info.video_level.map(|l| l.to_string()),
                info.stereoscopy,
                info.scan_type.map(ScanType::as_str),
                info.scan_order.map(ScanOrder::as_str),
                info.frame_rate,
                info.frame_rate_mode.map(RateMode::as_str),
                info.reference_frames,
                info.video_bit_depth,
                info.video_track_count,
                info.image_count,
                thumb.map(|t| t.data.as_slice()),
                thumb.map(|t| t.mime.as_str()),
                thumb.and_then(|t| t.width),
                thumb.and_then(|t| t.height),
                extras,
            ],
        )?;

        let id: i64 = tx.query_row(
            "SELECT id FROM files WHERE filename = ?1 AND modified = ?2",
            params![path, mtime],
            |row| row.get(0),
        )?;

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO audiotracks (
                    fileid, id, stream_id, lang, title, codec, channels, sample_rate, bit_depth,
                    bitrate, bitrate_mode, delay, album, artist, song_name, track_number, year, genre
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                ON CONFLICT(fileid, id) DO UPDATE SET
                    stream_id = excluded.stream_id,
                    lang = excluded.lang,
                    title = excluded.title,
                    codec = excluded.codec,
                    channels = excluded.channels,
                    sample_rate = excluded.sample_rate,
                    bit_depth = excluded.bit_depth,
                    bitrate = excluded.bitrate,
                    bitrate_mode = excluded.bitrate_mode,
                    delay = excluded.delay,
                    album = excluded.album,
                    artist = excluded.artist,
                    song_name = excluded.song_name,
                    track_number = excluded.track_number,
                    year = excluded.year,
                    genre = excluded.genre",
            )?;
            for (ordinal, a) in info.audio_tracks.iter().enumerate() {
                stmt.execute(params![
                    id,
                    ordinal as i64,
                    a.stream.id,
                    a.stream.lang,
                    a.stream.title,
                    a.codec.map(Format::as_str),
                    a.channels,
                    a.sample_rate,
                    a.bit_depth,
                    a.bitrate,
                    a.bitrate_mode.map(RateMode::as_str),
                    a.delay,
                    a.album,
                    a.artist,
                    a.song_name,
                    a.track_number,
                    a.year,
                    a.genre,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO subtracks (fileid, id, stream_id, lang, title, format, forced, is_default)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(fileid, id) DO UPDATE SET
                    stream_id = excluded.stream_id,
                    lang = excluded.lang,
                    title = excluded.title,
                    format = excluded.format,
                    forced = excluded.forced,
                    is_default = excluded.is_default",
            )?;
            for (ordinal, s) in info.subtitle_tracks.iter().enumerate() {
                stmt.execute(params![
                    id,
                    ordinal as i64,
                    s.stream.id,
                    s.stream.lang,
                    s.stream.title,
                    s.format.map(SubtitleFormat::as_str),
                    s.forced,
                    s.default,
                ])?;
            }
        }

        tx.commit()?;
        Ok(id)
    }

    /// Drop every stored thumbnail. Returns how many rows held one.
    pub fn delete_thumbnails(&self) -> Result<usize> {
        let cleared = self.conn().execute(
            "UPDATE files SET thumb = NULL, thumb_mime = NULL, thumb_width = NULL, thumb_height = NULL
             WHERE thumb IS NOT NULL",
            [],
        )?;
        Ok(cleared)
    }

    /// Remove rows whose file is gone or whose on-disk mtime no longer matches
    /// the stored one. `progress` receives `(checked, total)` after each row.
    ///
    /// Rows keyed by a virtual-track reference are checked against the
    /// physical file they point into.
    pub fn sweep_stale<F>(&self, mut progress: F) -> Result<SweepReport>
    where
        F: FnMut(usize, usize),
    {
        let conn = self.conn();
        let rows: Vec<(i64, String, i64)> = {
            let mut stmt = conn.prepare("SELECT id, filename, modified FROM files ORDER BY id")?;
            stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        let total = rows.len();
        let mut report = SweepReport {
            checked: 0,
            removed: 0,
            surviving: Vec::with_capacity(total),
        };

        let tx = conn.unchecked_transaction()?;
        {
            let mut delete = tx.prepare_cached("DELETE FROM files WHERE id = ?1")?;
            for (id, filename, modified) in rows {
                let on_disk = file_mtime(physical_path(&filename)).ok();
                if on_disk == Some(modified) {
                    report.surviving.push(filename);
                } else {
                    log::debug!("sweeping stale cache row for {filename}");
                    delete.execute(params![id])?;
                    report.removed += 1;
                }
                report.checked += 1;
                progress(report.checked, total);
            }
        }
        tx.commit()?;

        log::info!(
            "cache sweep: {} checked, {} removed",
            report.checked,
            report.removed
        );
        Ok(report)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.conn();
        let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |row| row.get(0))?) };

        let files = count("SELECT COUNT(*) FROM files")?;
        let audio_tracks = count("SELECT COUNT(*) FROM audiotracks")?;
        let subtitle_tracks = count("SELECT COUNT(*) FROM subtracks")?;
        let thumbnails = count("SELECT COUNT(*) FROM files WHERE thumb IS NOT NULL")?;

        let total_duration_hours: f64 = conn.query_row(
            "SELECT COALESCE(SUM(duration), 0.0) / 3600.0 FROM files",
            [],
            |row| row.get(0),
        )?;

        let mut type_stmt =
            conn.prepare("SELECT type, COUNT(*) FROM files GROUP BY type ORDER BY COUNT(*) DESC")?;
        let media_types: Vec<(String, i64)> = type_stmt
            .query_map([], |row| {
                let code: i32 = row.get(0)?;
                Ok((MediaType::from_code(code).to_string(), row.get(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut container_stmt = conn.prepare(
            "SELECT COALESCE(container, 'unknown'), COUNT(*)
             FROM files
             GROUP BY COALESCE(container, 'unknown')
             ORDER BY COUNT(*) DESC",
        )?;
        let containers: Vec<(String, i64)> = container_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(CacheStats {
            files,
            audio_tracks,
            subtitle_tracks,
            thumbnails,
            total_duration_hours,
            media_types,
            containers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::profile::H264Level;

    fn movie() -> MediaInfo {
        let mut info = MediaInfo::new();
        info.container = Some(Format::Matroska);
        info.media_type = MediaType::Video;
        info.duration = Some(5025.5);
        info.bitrate = Some(9_500_000);
        info.size = Some(5_967_342_817);
        info.width = Some(1920);
        info.height = Some(1080);
        info.aspect_ratio_container = Some("16:9".into());
        info.video_codec = Some(Format::H264);
        info.video_profile = Some("High".into());
        info.video_level = Some(Level::H264(H264Level::L4_1));
        info.scan_type = Some(ScanType::Progressive);
        info.frame_rate = Some("23.976".into());
        info.video_track_count = 1;
        info.extras.insert("encoder".into(), "x264".into());

        let mut dts = AudioTrack::new(1);
        dts.codec = Some(Format::DtsHd);
        dts.channels = Some(8);
        dts.stream.lang = Some("eng".into());
        dts.delay = Some(-5);
        let mut ac3 = AudioTrack::new(2);
        ac3.codec = Some(Format::Ac3);
        ac3.channels = Some(6);
        ac3.stream.lang = Some("fre".into());
        info.audio_tracks = vec![dts, ac3];

        let mut pgs = SubtitleTrack::new(3);
        pgs.format = Some(SubtitleFormat::Pgs);
        pgs.forced = true;
        info.subtitle_tracks = vec![pgs];

        info.thumbnail = Some(Thumbnail {
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
            mime: "image/jpeg".into(),
            width: Some(320),
            height: None,
        });
        info
    }

    #[test]
    fn test_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let original = movie();
        db.upsert("/films/movie.mkv", 1_700_000_000_000, &original).unwrap();

        let cached = db.get("/films/movie.mkv", 1_700_000_000_000).unwrap().unwrap();
        assert!(cached.is_parsed());
        assert_eq!(cached.audio_tracks.len(), 2);
        assert_eq!(cached.subtitle_tracks.len(), 1);
        assert_eq!(cached.audio_tracks[0].codec, Some(Format::DtsHd));
        assert_eq!(cached.audio_tracks[1].stream.lang.as_deref(), Some("fre"));
        assert_eq!(cached.audio_tracks[0].delay, Some(-5));
        assert!(cached.subtitle_tracks[0].forced);

        assert_eq!(cached.container, original.container);
        assert_eq!(cached.video_level, original.video_level);
        assert_eq!(cached.size, original.size);
        assert_eq!(cached.extras, original.extras);
        assert_eq!(cached.thumbnail, original.thumbnail);
        assert_eq!(cached.audio_tracks, original.audio_tracks);
    }

    #[test]
    fn test_mtime_is_part_of_the_key() {
        let db = Database::open_in_memory().unwrap();
        db.upsert("/films/movie.mkv", 1000, &movie()).unwrap();

        assert!(db.exists("/films/movie.mkv", 1000).unwrap());
        assert!(!db.exists("/films/movie.mkv", 1001).unwrap());
        assert!(db.get("/films/movie.mkv", 1001).unwrap().is_none());
        assert!(db.get("/films/other.mkv", 1000).unwrap().is_none());
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let id1 = db.upsert("/films/movie.mkv", 1000, &movie()).unwrap();
        let id2 = db.upsert("/films/movie.mkv", 1000, &movie()).unwrap();
        assert_eq!(id1, id2);

        let stats = db.stats().unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.audio_tracks, 2);
        assert_eq!(stats.subtitle_tracks, 1);
    }

    #[test]
    fn test_fewer_tracks_leave_old_ordinals() {
        let db = Database::open_in_memory().unwrap();
        db.upsert("/films/movie.mkv", 1000, &movie()).unwrap();

        let mut single = movie();
        single.audio_tracks.truncate(1);
        db.upsert("/films/movie.mkv", 1000, &single).unwrap();

        let cached = db.get("/films/movie.mkv", 1000).unwrap().unwrap();
        assert_eq!(cached.audio_tracks.len(), 2);
    }

    #[test]
    fn test_failed_child_insert_rolls_back_upsert() {
        let db = Database::open_in_memory().unwrap();
        db.upsert("/films/movie.mkv", 1000, &movie()).unwrap();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER refuse_subs BEFORE INSERT ON subtracks
                 BEGIN SELECT RAISE(ABORT, 'refused'); END;",
            )
            .unwrap();

        assert!(db.upsert("/films/other.mkv", 1000, &movie()).is_err());
        assert!(!db.exists("/films/other.mkv", 1000).unwrap());
        assert!(db.get("/films/other.mkv", 1000).unwrap().is_none());

        let mut changed = movie();
        changed.container = Some(Format::Avi);
        changed.audio_tracks[0].codec = Some(Format::Ac3);
        assert!(db.upsert("/films/movie.mkv", 1000, &changed).is_err());

        let cached = db.get("/films/movie.mkv", 1000).unwrap().unwrap();
        assert_eq!(cached.container, Some(Format::Matroska));
        assert_eq!(cached.audio_tracks[0].codec, Some(Format::DtsHd));
        assert_eq!(db.stats().unwrap().files, 1);
    }

    #[test]
    fn test_delete_thumbnails() {
        let db = Database::open_in_memory().unwrap();
        db.upsert("/films/movie.mkv", 1000, &movie()).unwrap();
        db.upsert("/music/song.flac", 1000, &MediaInfo::new()).unwrap();

        assert_eq!(db.delete_thumbnails().unwrap(), 1);
        let cached = db.get("/films/movie.mkv", 1000).unwrap().unwrap();
        assert!(cached.thumbnail.is_none());
        assert_eq!(db.stats().unwrap().thumbnails, 0);
    }

    #[test]
    fn test_sweep_removes_deleted_and_modified_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.mkv");
        let gone = dir.path().join("gone.mkv");
        let touched = dir.path().join("touched.mkv");
        for p in [&kept, &gone, &touched] {
            std::fs::write(p, b"data").unwrap();
        }

        let db = Database::open_in_memory().unwrap();
        let key = |p: &Path| p.to_string_lossy().into_owned();
        let gone_mtime = file_mtime(&gone).unwrap();
        db.upsert(&key(&kept), file_mtime(&kept).unwrap(), &movie()).unwrap();
        db.upsert(&key(&gone), gone_mtime, &movie()).unwrap();
        db.upsert(&key(&touched), file_mtime(&touched).unwrap() - 1, &movie()).unwrap();

        let virtual_key = TrackReference {
            path: kept.clone(),
            clip_start: 0.0,
            clip_end: 180.0,
            title: None,
        }
        .to_string();
        db.upsert(&virtual_key, file_mtime(&kept).unwrap(), &movie()).unwrap();

        std::fs::remove_file(&gone).unwrap();

        let mut calls = Vec::new();
        let report = db.sweep_stale(|done, total| calls.push((done, total))).unwrap();
        assert_eq!(report.checked, 4);
        assert_eq!(report.removed, 2);
        assert_eq!(report.surviving, vec![key(&kept), virtual_key]);
        assert_eq!(calls.last(), Some(&(4, 4)));

        assert!(!db.exists(&key(&gone), gone_mtime).unwrap());
        assert!(db.get(&key(&gone), gone_mtime).unwrap().is_none());
        assert_eq!(db.stats().unwrap().audio_tracks, 4);
    }

    #[test]
    fn test_stats_empty() {
        let db = Database::open_in_memory().unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.files, 0);
        assert!(stats.containers.is_empty());
    }

    #[test]
    fn test_stats_groups_containers() {
        let db = Database::open_in_memory().unwrap();
        db.upsert("/a.mkv", 1, &movie()).unwrap();
        db.upsert("/b.mkv", 1, &movie()).unwrap();
        db.upsert("/c.bin", 1, &MediaInfo::new()).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.containers[0], ("mkv".to_string(), 2));
        assert!(stats.containers.contains(&("unknown".to_string(), 1)));
        assert_eq!(stats.media_types[0], ("video".to_string(), 2));
    }
}
