pub mod classifier;
pub mod config;
pub mod cue;
pub mod db;
pub mod media;
pub mod probe;
pub mod scanner;

/// Media file extensions the scanner hands to the probers
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    // Audio
    "aac", "aif", "aiff", "ape", "flac", "m4a", "mka", "mp3", "mpc", "oga", "ogg", "opus", "wav",
    "wma", "wv",
    // Video
    "3g2", "3gp", "asf", "avi", "divx", "flv", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg",
    "mts", "ogv", "rm", "rmvb", "ts", "vob", "webm", "wmv",
    // Images
    "bmp", "gif", "jpeg", "jpg", "png", "tif", "tiff", "webp",
];

/// Application name for XDG paths
pub const APP_NAME: &str = "mediameta";
