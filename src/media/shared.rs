//! At most one in-flight probe per asset.

use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use super::MediaInfo;

/// How a [`SharedMediaInfo::parse_with`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// This call ran the probe.
    Probed,
    /// Someone already finished probing; nothing was done.
    AlreadyParsed,
    /// Another probe was still running after every retry. The asset is used
    /// with whatever data it has.
    GaveUp,
}

/// A [`MediaInfo`] shared between request threads.
///
/// The `parsing` flag has its own lock, separate from the data, so readers
/// are never blocked behind a running probe.
pub struct SharedMediaInfo {
    info: RwLock<MediaInfo>,
    parsing: Mutex<bool>,
}

struct ParsingGuard<'a>(&'a Mutex<bool>);

impl Drop for ParsingGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock() = false;
    }
}

impl SharedMediaInfo {
    pub const PARSE_ATTEMPTS: u32 = 5;
    pub const PARSE_RETRY_DELAY: Duration = Duration::from_millis(100);

    pub fn new(info: MediaInfo) -> Self {
        Self {
            info: RwLock::new(info),
            parsing: Mutex::new(false),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, MediaInfo> {
        self.info.read()
    }

    pub fn snapshot(&self) -> MediaInfo {
        self.info.read().clone()
    }

    pub fn is_parsed(&self) -> bool {
        self.info.read().is_parsed()
    }

    pub fn is_parsing(&self) -> bool {
        *self.parsing.lock()
    }

    fn try_begin(&self) -> Option<ParsingGuard<'_>> {
        let mut parsing = self.parsing.lock();
        if *parsing {
            return None;
        }
        *parsing = true;
        Some(ParsingGuard(&self.parsing))
    }

    /// Run `probe` against this asset unless it is already parsed.
    ///
    /// The probe fills a private copy which replaces the shared value when it
    /// returns, so readers never observe a half-populated descriptor.
    pub fn parse_with<F>(&self, probe: F) -> ParseOutcome
    where
        F: FnOnce(&mut MediaInfo),
    {
        let mut guard = None;
        for attempt in 0..Self::PARSE_ATTEMPTS {
            if let Some(g) = self.try_begin() {
                guard = Some(g);
                break;
            }
            if attempt + 1 < Self::PARSE_ATTEMPTS {
                thread::sleep(Self::PARSE_RETRY_DELAY);
            }
        }
        let Some(_guard) = guard else {
            log::warn!(
                "gave up waiting for a concurrent probe after {} attempts",
                Self::PARSE_ATTEMPTS
            );
            return ParseOutcome::GaveUp;
        };

        if self.is_parsed() {
            return ParseOutcome::AlreadyParsed;
        }

        let mut working = self.snapshot();
        probe(&mut working);
        if !working.is_parsed() {
            working.mark_parsed();
        }
        *self.info.write() = working;
        ParseOutcome::Probed
    }
}

impl From<MediaInfo> for SharedMediaInfo {
    fn from(info: MediaInfo) -> Self {
        Self::new(info)
    }
}
