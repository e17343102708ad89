use crate::config::AppConfig;
use crate::cue::TrackComposer;
use crate::db::{file_mtime, Database, DbError};
use crate::media::{MediaInfo, ParseOutcome, SharedMediaInfo};
use crate::probe::{ProbeError, Prober};
use crate::SUPPORTED_EXTENSIONS;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Db(#[from] DbError),
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),
    #[error("Worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub scanned: u64,
    pub probed: u64,
    pub skipped: u64,
    pub errors: u64,
    pub cue_sheets: u64,
    pub virtual_tracks: u64,
}

/// A file found on disk with the mtime it will be cached under.
struct Candidate {
    path: PathBuf,
    mtime: i64,
}

impl Candidate {
    fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    pb
}

/// Walk `paths`, probe every media file not cached under its current
/// mtime, and compose cue sheets into virtual tracks.
///
/// Probing runs in parallel chunks; storing happens on the calling thread
/// after each chunk, so a crash keeps everything stored so far.
pub fn scan(
    db: &Database,
    prober: &dyn Prober,
    config: &AppConfig,
    paths: &[PathBuf],
    force: bool,
) -> std::result::Result<ScanResult, ScanError> {
    let mut media: Vec<Candidate> = Vec::new();
    let mut sheets: Vec<Candidate> = Vec::new();
    let mut result = ScanResult::default();

    for root in paths {
        for entry in WalkDir::new(root).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let ext = extension(entry.path());
            let is_cue = ext == "cue";
            if !is_cue && !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }
            let mtime = match file_mtime(entry.path()) {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("cannot stat {}: {e}", entry.path().display());
                    result.errors += 1;
                    continue;
                }
            };
            let candidate = Candidate {
                path: entry.into_path(),
                mtime,
            };
            result.scanned += 1;
            let cached = !force
                && db.exists(&candidate.key(), candidate.mtime).unwrap_or_else(|e| {
                    log::warn!("cache lookup failed for {}: {e}", candidate.path.display());
                    false
                });
            if cached {
                result.skipped += 1;
            } else if is_cue {
                sheets.push(candidate);
            } else {
                media.push(candidate);
            }
        }
    }

    probe_media(db, prober, config.resolve_workers(), &media, &mut result)?;
    compose_sheets(db, prober, config, &sheets, force, &mut result);

    log::info!(
        "scan: {} scanned, {} probed, {} skipped, {} virtual tracks, {} errors",
        result.scanned,
        result.probed,
        result.skipped,
        result.virtual_tracks,
        result.errors
    );
    Ok(result)
}

fn probe_media(
    db: &Database,
    prober: &dyn Prober,
    jobs: usize,
    media: &[Candidate],
    result: &mut ScanResult,
) -> std::result::Result<(), ScanError> {
    if media.is_empty() {
        return Ok(());
    }
    log::info!("Probing {} files with {} workers", media.len(), jobs);

    let pb = progress_bar(media.len() as u64);
    pb.set_message("Probing...");

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    // Chunk size = jobs * 2 keeps every worker busy while bounding memory.
    for chunk in media.chunks(jobs.max(1) * 2) {
        let probed: Vec<(&Candidate, Result<MediaInfo, ProbeError>)> = pool.install(|| {
            use rayon::prelude::*;
            chunk
                .par_iter()
                .map(|c| {
                    let outcome = prober.probe(&c.path);
                    pb.inc(1);
                    (c, outcome)
                })
                .collect()
        });

        for (candidate, outcome) in probed {
            match outcome {
                Ok(info) => match db.upsert(&candidate.key(), candidate.mtime, &info) {
                    Ok(_) => result.probed += 1,
                    Err(e) => {
                        log::error!("cannot cache {}: {e}", candidate.path.display());
                        result.errors += 1;
                    }
                },
                Err(e) => {
                    log::warn!("cannot probe {}: {e}", candidate.path.display());
                    result.errors += 1;
                }
            }
        }
        pb.set_message(format!("{} stored, {} failed", result.probed, result.errors));
    }

    pb.finish_with_message(format!(
        "Done: {} probed, {} failed",
        result.probed, result.errors
    ));
    Ok(())
}

/// Probes currently running through [`resolve`], keyed like the cache.
static IN_FLIGHT: LazyLock<Mutex<HashMap<(String, i64), Arc<SharedMediaInfo>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Cached descriptor for `path`, probing and storing it on a miss.
///
/// Concurrent callers for the same `(path, mtime)` share one probe: the
/// first runs it, the others wait on the asset's parsing flag and then read
/// what it stored.
pub fn resolve(
    db: &Database,
    prober: &dyn Prober,
    path: &Path,
) -> std::result::Result<MediaInfo, ScanError> {
    let mtime = file_mtime(path)?;
    let key = path.to_string_lossy().into_owned();
    if let Some(info) = db.get(&key, mtime)? {
        log::debug!("cache hit for {key}");
        return Ok(info);
    }

    let slot = (key, mtime);
    let shared = Arc::clone(
        IN_FLIGHT
            .lock()
            .entry(slot.clone())
            .or_insert_with(|| Arc::new(SharedMediaInfo::new(MediaInfo::new()))),
    );

    let mut failure: Option<ScanError> = None;
    let outcome = shared.parse_with(|info| match probe_and_store(db, prober, path, &slot) {
        Ok(probed) => *info = probed,
        Err(e) => failure = Some(e),
    });

    if outcome == ParseOutcome::Probed {
        let mut in_flight = IN_FLIGHT.lock();
        if in_flight.get(&slot).is_some_and(|s| Arc::ptr_eq(s, &shared)) {
            in_flight.remove(&slot);
        }
    }

    match outcome {
        ParseOutcome::Probed => match failure {
            Some(e) => Err(e),
            None => Ok(shared.snapshot()),
        },
        ParseOutcome::AlreadyParsed => match db.get(&slot.0, slot.1)? {
            Some(info) => Ok(info),
            // The probe that ran first failed; try once more on our own.
            None => probe_and_store(db, prober, path, &slot),
        },
        ParseOutcome::GaveUp => Ok(shared.snapshot()),
    }
}

fn probe_and_store(
    db: &Database,
    prober: &dyn Prober,
    path: &Path,
    (key, mtime): &(String, i64),
) -> std::result::Result<MediaInfo, ScanError> {
    if let Some(info) = db.get(key, *mtime)? {
        return Ok(info);
    }
    let info = prober.probe(path)?;
    db.upsert(key, *mtime, &info)?;
    Ok(info)
}

/// Virtual tracks are cached under their serialized reference with the
/// physical file's mtime. The sheet itself gets an empty row once all of
/// its tracks are stored, so an unchanged sheet is skipped next time.
/// Storage failures are counted per track and never abort the scan.
fn compose_sheets(
    db: &Database,
    prober: &dyn Prober,
    config: &AppConfig,
    sheets: &[Candidate],
    force: bool,
    result: &mut ScanResult,
) {
    let composer = TrackComposer::from_config(prober, config);

    for sheet in sheets {
        let entries = composer.compose_file(&sheet.path);
        let mut failed = 0;
        for entry in &entries {
            let mtime = match file_mtime(&entry.path) {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("cannot stat {}: {e}", entry.path.display());
                    failed += 1;
                    continue;
                }
            };
            let key = entry.reference().to_string();
            let stored = match db.exists(&key, mtime) {
                Ok(true) if !force => continue,
                Ok(_) => db.upsert(&key, mtime, &entry.info).map(|_| ()),
                Err(e) => Err(e),
            };
            match stored {
                Ok(()) => result.virtual_tracks += 1,
                Err(e) => {
                    log::error!("cannot cache {key}: {e}");
                    failed += 1;
                }
            }
        }
        result.errors += failed;
        if failed > 0 {
            continue;
        }

        let mut marker = MediaInfo::new();
        marker.mark_parsed();
        match db.upsert(&sheet.key(), sheet.mtime, &marker) {
            Ok(_) => result.cue_sheets += 1,
            Err(e) => {
                log::error!("cannot cache {}: {e}", sheet.path.display());
                result.errors += 1;
            }
        }
    }
}
