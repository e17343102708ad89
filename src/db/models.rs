/// Summary of what the cache currently holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub files: i64,
    pub audio_tracks: i64,
    pub subtitle_tracks: i64,
    pub thumbnails: i64,
    pub total_duration_hours: f64,
    /// `(media type, count)`, most common first.
    pub media_types: Vec<(String, i64)>,
    /// `(container, count)`, most common first. Unresolved containers are
    /// reported as `unknown`.
    pub containers: Vec<(String, i64)>,
}

/// Outcome of a full staleness sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub checked: usize,
    pub removed: usize,
    /// Paths whose rows survived, in table order.
    pub surviving: Vec<String>,
}
