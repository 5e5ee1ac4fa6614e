//! Test probe with canned answers.
//!
//! # Usage
//!
//! ```ignore
//! use enospace_quota::testing::FixedProbe;
//!
//! let probe = FixedProbe::regular(stats);
//! let engine = QuotaEngine::new(config, &probe);
//! ```

use std::io;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::probe::{FileKind, FsProbe, FsStats};

/// Probe that answers every descriptor the same way and counts queries.
#[derive(Debug)]
pub struct FixedProbe {
    kind: Result<FileKind, i32>,
    stats: Result<FsStats, i32>,
    queries: AtomicUsize,
}

impl FixedProbe {
    pub fn new(kind: Result<FileKind, i32>, stats: Result<FsStats, i32>) -> Self {
        Self {
            kind,
            stats,
            queries: AtomicUsize::new(0),
        }
    }

    /// A regular file on a filesystem reporting `stats`.
    pub fn regular(stats: FsStats) -> Self {
        Self::new(Ok(FileKind::Regular), Ok(stats))
    }

    /// A pipe, socket or device. Asking for filesystem stats is a bug.
    pub fn other() -> Self {
        Self::new(Ok(FileKind::Other), Err(libc::ENOTSUP))
    }

    /// Every query fails with `errno`.
    pub fn failing(errno: i32) -> Self {
        Self::new(Err(errno), Err(errno))
    }

    /// fstat succeeds on a regular file, fstatfs fails with `errno`.
    pub fn statfs_failing(errno: i32) -> Self {
        Self::new(Ok(FileKind::Regular), Err(errno))
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

impl FsProbe for FixedProbe {
    fn file_kind(&self, _fd: RawFd) -> io::Result<FileKind> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.kind.map_err(io::Error::from_raw_os_error)
    }

    fn fs_stats(&self, _fd: RawFd) -> io::Result<FsStats> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.stats.map_err(io::Error::from_raw_os_error)
    }
}
