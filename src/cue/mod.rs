//! Cue sheets and the virtual tracks composed from them.

pub mod compose;
pub mod entry;
pub mod sheet;

pub use compose::TrackComposer;
pub use entry::{clip_duration, CueEntry, TrackReference};
pub use sheet::{CueError, CueFile, CueSheet, CueTime, CueTrack};
