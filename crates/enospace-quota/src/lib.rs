//! # enospace-quota
//!
//! The quota decision engine: given a file descriptor, decide whether a write
//! to it may proceed or must fail with the configured error code.
//!
//! The engine is stateless beyond its immutable [`QuotaConfig`]. Filesystem
//! metadata comes through an [`FsProbe`], so everything here can be tested
//! without a real device of the right type.

pub mod fstype;
pub mod probe;
pub mod testing;

use std::fmt;
use std::io;
use std::os::fd::RawFd;

use enospace_config::{QuotaConfig, Threshold, ThresholdUnit};
use serde::{Deserialize, Serialize};

pub use probe::{FileKind, FsProbe, FsStats};
#[cfg(target_os = "linux")]
pub use probe::SysProbe;

/// Outcome of one quota check for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Allow,
    /// Fail the call with this errno.
    Deny(i32),
}

impl Verdict {
    pub fn is_allow(self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Figures computed for a threshold comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub threshold: u64,
    pub unit: ThresholdUnit,
    /// Available capacity in `unit`.
    pub available: u64,
    pub stats: FsStats,
}

/// Why a verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Reason {
    Unbounded,
    NotRegular,
    UnsupportedFilesystem { fs_type: u32 },
    Measured(Measurement),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: Reason,
}

impl Decision {
    fn allow(reason: Reason) -> Self {
        Self {
            verdict: Verdict::Allow,
            reason,
        }
    }

    /// Write the line-oriented debug record for this decision.
    ///
    /// Decisions that never looked at the filesystem produce no output.
    pub fn write_diagnostic<W: fmt::Write>(&self, w: &mut W) -> fmt::Result {
        match self.reason {
            Reason::Unbounded | Reason::NotRegular => Ok(()),
            Reason::UnsupportedFilesystem { fs_type } => writeln!(w, "fs_type: {:X}", fs_type),
            Reason::Measured(m) => match m.unit {
                ThresholdUnit::Bytes => writeln!(
                    w,
                    "avail:{} f_bsize:{} f_bavail:{} total:{}",
                    m.threshold,
                    m.stats.bsize,
                    m.stats.bavail,
                    m.stats.available_bytes()
                ),
                ThresholdUnit::Percent => writeln!(
                    w,
                    "avail:{} free:{} f_blocks:{} f_bsize:{} f_bavail:{} total:{}",
                    m.threshold,
                    m.available,
                    m.stats.blocks,
                    m.stats.bsize,
                    m.stats.bavail,
                    m.stats.available_bytes()
                ),
            },
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.verdict {
            Verdict::Allow => f.write_str("allow")?,
            Verdict::Deny(errno) => write!(f, "deny (errno {})", errno)?,
        }
        match self.reason {
            Reason::Unbounded => f.write_str(": no threshold configured"),
            Reason::NotRegular => f.write_str(": not a regular file"),
            Reason::UnsupportedFilesystem { fs_type } => {
                write!(f, ": filesystem type {:#X} is not quota-tracked", fs_type)
            }
            Reason::Measured(m) => write!(
                f,
                ": threshold {} {} against {} available",
                m.threshold, m.unit, m.available
            ),
        }
    }
}

/// Compare a threshold against filesystem counters.
///
/// A zero threshold simulates a device with no capacity left and always
/// denies. Otherwise the call is denied iff `threshold > available`.
pub fn measure(threshold: u64, unit: ThresholdUnit, stats: FsStats, errno: i32) -> Decision {
    let available = match unit {
        ThresholdUnit::Bytes => stats.available_bytes(),
        ThresholdUnit::Percent => stats.available_percent(),
    };
    let verdict = if threshold == 0 || threshold > available {
        Verdict::Deny(errno)
    } else {
        Verdict::Allow
    };
    Decision {
        verdict,
        reason: Reason::Measured(Measurement {
            threshold,
            unit,
            available,
            stats,
        }),
    }
}

/// Per-descriptor quota decisions over an immutable config.
#[derive(Debug, Clone)]
pub struct QuotaEngine<P> {
    config: QuotaConfig,
    probe: P,
}

impl<P: FsProbe> QuotaEngine<P> {
    pub fn new(config: QuotaConfig, probe: P) -> Self {
        Self {
            config: config.normalized(),
            probe,
        }
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Decide whether a write to `fd` may proceed.
    ///
    /// Metadata query failures are returned as-is: they are system failures,
    /// not quota denials.
    pub fn decide(&self, fd: RawFd) -> io::Result<Decision> {
        let threshold = match self.config.threshold {
            Threshold::Unbounded => return Ok(Decision::allow(Reason::Unbounded)),
            Threshold::Limit(n) => n,
        };

        if self.probe.file_kind(fd)? != FileKind::Regular {
            return Ok(Decision::allow(Reason::NotRegular));
        }

        let stats = self.probe.fs_stats(fd)?;
        if !fstype::is_quota_tracked(stats.fs_type) {
            return Ok(Decision::allow(Reason::UnsupportedFilesystem {
                fs_type: stats.fs_type,
            }));
        }

        Ok(measure(threshold, self.config.unit, stats, self.config.errno))
    }
}
