use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use mediameta::config::AppConfig;
use mediameta::cue::TrackComposer;
use mediameta::db::Database;
use mediameta::media::{format_duration, MediaInfo};
use mediameta::probe::{CompositeProber, Prober};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediameta", version, about = "Media metadata prober and cache")]
struct Cli {
    /// Path to the SQLite cache
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories for media files and cache their metadata
    Scan {
        /// Directories to scan (defaults to config file media_dirs)
        paths: Vec<PathBuf>,

        /// Re-probe files even if they are already cached
        #[arg(long)]
        force: bool,
    },

    /// Probe a single file and print its metadata (bypasses the cache)
    Probe {
        file: PathBuf,
    },

    /// List the virtual tracks a cue sheet composes to
    Cue {
        file: PathBuf,
    },

    /// Show a file's cached metadata, probing it on a cache miss
    Show {
        file: PathBuf,
    },

    /// Remove cache rows for files that were deleted or modified
    Sweep,

    /// Drop every cached thumbnail
    ClearThumbnails,

    /// Show cache statistics
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    // Resolve cache path: CLI > config > XDG default
    let db_path = cli
        .db_path
        .or(config.db_path.clone())
        .unwrap_or_else(mediameta::config::default_db_path);
    log::info!("Cache: {}", db_path.display());

    let prober = CompositeProber::from_config(&config);
    log::info!("Probers: {}", prober.names().join(", "));

    match cli.command {
        Commands::Scan { paths, force } => {
            // Resolve scan paths: CLI args > config media_dirs
            let scan_paths = if !paths.is_empty() {
                paths
            } else if !config.media_dirs.is_empty() {
                config.media_dirs.clone()
            } else {
                anyhow::bail!(
                    "No directories to scan. Pass paths as arguments or set media_dirs in config."
                );
            };

            let db = Database::open(&db_path).context("Failed to open cache")?;
            let result = mediameta::scanner::scan(&db, &prober, &config, &scan_paths, force)
                .context("Scan failed")?;
            println!(
                "Scan complete: {} scanned, {} probed, {} skipped, {} cue sheets ({} virtual tracks), {} errors",
                result.scanned,
                result.probed,
                result.skipped,
                result.cue_sheets,
                result.virtual_tracks,
                result.errors
            );
        }

        Commands::Probe { file } => {
            let info = prober
                .probe(&file)
                .with_context(|| format!("Failed to probe {}", file.display()))?;
            print_info(&info);
        }

        Commands::Cue { file } => {
            let composer = TrackComposer::from_config(&prober, &config);
            let entries = composer.compose_file(&file);
            if entries.is_empty() {
                println!("No tracks composed from {}.", file.display());
                return Ok(());
            }

            println!(
                "{:>3}  {:>12}  {:>12}  {:<7} {}",
                "#", "Start", "Length", "Partial", "Title"
            );
            println!("{}", "-".repeat(60));
            for (i, entry) in entries.iter().enumerate() {
                let length = entry
                    .duration()
                    .map(format_duration)
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "{:>3}  {:>12}  {:>12}  {:<7} {}",
                    i + 1,
                    format_duration(entry.clip_start),
                    length,
                    if entry.is_partial_source() { "yes" } else { "no" },
                    entry.title
                );
                log::debug!("reference: {}", entry.reference());
            }
        }

        Commands::Show { file } => {
            let db = Database::open(&db_path).context("Failed to open cache")?;
            let info = mediameta::scanner::resolve(&db, &prober, &file)
                .with_context(|| format!("Failed to resolve {}", file.display()))?;
            print_info(&info);
        }

        Commands::Sweep => {
            let db = Database::open(&db_path).context("Failed to open cache")?;
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            let report = db
                .sweep_stale(|done, total| {
                    pb.set_length(total as u64);
                    pb.set_position(done as u64);
                })
                .context("Sweep failed")?;
            pb.finish_and_clear();
            println!(
                "Sweep complete: {} checked, {} removed, {} kept",
                report.checked,
                report.removed,
                report.surviving.len()
            );
        }

        Commands::ClearThumbnails => {
            let db = Database::open(&db_path).context("Failed to open cache")?;
            let cleared = db.delete_thumbnails().context("Failed to clear thumbnails")?;
            println!("Cleared {cleared} thumbnails");
        }

        Commands::Stats => {
            let db = Database::open(&db_path).context("Failed to open cache")?;
            let stats = db.stats().context("Failed to get stats")?;
            println!("Cache Statistics");
            println!("================");
            println!("Files:            {}", stats.files);
            println!("Audio tracks:     {}", stats.audio_tracks);
            println!("Subtitle tracks:  {}", stats.subtitle_tracks);
            println!("Thumbnails:       {}", stats.thumbnails);
            println!(
                "Total duration:   {:.1} hours",
                stats.total_duration_hours
            );
            println!();

            if !stats.media_types.is_empty() {
                println!("Media types:");
                for (kind, count) in &stats.media_types {
                    println!("  {:<8} {}", kind, count);
                }
                println!();
            }

            if !stats.containers.is_empty() {
                println!("Containers:");
                for (container, count) in &stats.containers {
                    println!("  {:<8} {}", container, count);
                }
            }
        }
    }

    Ok(())
}

/// Print a descriptor, raw values alongside the defaults they fall back to.
fn print_info(info: &MediaInfo) {
    let or_unknown = |v: Option<String>| v.unwrap_or_else(|| "unknown".to_string());

    println!("Type:        {}", info.media_type);
    println!(
        "Container:   {}",
        or_unknown(info.container.map(|c| c.to_string()))
    );
    println!("Duration:    {}", or_unknown(info.duration_string()));
    println!("Bitrate:     {} bps", info.effective_bitrate());
    if let Some(size) = info.size {
        println!("Size:        {size} bytes");
    }

    if let Some(codec) = info.video_codec {
        println!();
        println!("Video:       {codec}");
        if let Some(profile) = &info.video_profile {
            match info.video_level {
                Some(level) => println!("  Profile:   {profile}@{level}"),
                None => println!("  Profile:   {profile}"),
            }
        }
        if let (Some(w), Some(h)) = (info.width, info.height) {
            println!("  Size:      {w}x{h}");
        }
        if let Some(ar) = info.effective_aspect_ratio() {
            println!("  Aspect:    {ar}");
        }
        println!(
            "  Frames:    {} fps ({})",
            info.effective_frame_rate(),
            info.effective_frame_rate_mode().as_str()
        );
        println!("  Depth:     {} bit", info.effective_video_bit_depth());
        if let Some(mode) = info.mode_3d() {
            println!("  3D:        {mode}");
        }
    }

    for audio in &info.audio_tracks {
        println!();
        println!(
            "Audio #{}:    {} [{}]",
            audio.stream.id,
            or_unknown(audio.codec.map(|c| c.to_string())),
            audio.stream.effective_lang()
        );
        println!(
            "  {} ch, {} Hz, {} bit, delay {} ms",
            audio.effective_channels(),
            audio.effective_sample_rate(),
            audio.effective_bit_depth(),
            audio.effective_delay()
        );
        if let Some(title) = &audio.song_name {
            println!(
                "  {} / {} / {}",
                title,
                audio.artist.as_deref().unwrap_or("?"),
                audio.album.as_deref().unwrap_or("?")
            );
        }
    }

    for sub in &info.subtitle_tracks {
        println!(
            "Subtitle #{}: {} [{}]{}",
            sub.stream.id,
            or_unknown(sub.format.map(|f| f.to_string())),
            sub.stream.effective_lang(),
            if sub.forced { " forced" } else { "" }
        );
    }

    if let Some(thumb) = &info.thumbnail {
        println!();
        println!("Thumbnail:   {} ({} bytes)", thumb.mime, thumb.data.len());
    }
    for (key, value) in &info.extras {
        println!("  {key}: {value}");
    }
}
