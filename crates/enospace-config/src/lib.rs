//! # enospace-config
//!
//! Load-once settings for the enospace fault-injection shim.
//!
//! Settings are read exactly once, from four environment variables:
//! 1. `LIBENOSPACE_AVAIL` - minimum free capacity before writes fail
//! 2. `LIBENOSPACE_OPT` - unit of the threshold (`bytes` or `percent`)
//! 3. `LIBENOSPACE_ERRNO` - error code reported by a simulated failure
//! 4. `LIBENOSPACE_DEBUG` - presence enables diagnostics on stderr
//!
//! Malformed numbers are fatal ([`ConfigError`]); an unknown unit falls back
//! to percent and is reported as a [`ConfigWarning`].

pub mod logging;

use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const ENV_AVAIL: &str = "LIBENOSPACE_AVAIL";
pub const ENV_ERRNO: &str = "LIBENOSPACE_ERRNO";
pub const ENV_OPT: &str = "LIBENOSPACE_OPT";
pub const ENV_DEBUG: &str = "LIBENOSPACE_DEBUG";

/// Every key the loader reads, in load order.
pub const ENV_KEYS: [&str; 4] = [ENV_DEBUG, ENV_AVAIL, ENV_ERRNO, ENV_OPT];

/// Minimum capacity that must remain available for a write to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Threshold {
    /// No quota: every write proceeds without a filesystem query.
    #[default]
    Unbounded,
    Limit(u64),
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Unbounded => f.write_str("unbounded"),
            Threshold::Limit(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdUnit {
    Bytes,
    #[default]
    Percent,
}

impl ThresholdUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            ThresholdUnit::Bytes => "bytes",
            ThresholdUnit::Percent => "percent",
        }
    }
}

impl fmt::Display for ThresholdUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThresholdUnit {
    type Err = ConfigWarning;

    /// Exact, case-sensitive match on `bytes` / `percent`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bytes" => Ok(ThresholdUnit::Bytes),
            "percent" => Ok(ThresholdUnit::Percent),
            other => Err(ConfigWarning::UnknownUnit(other.to_string())),
        }
    }
}

/// Fatal configuration errors. The shim terminates the process with
/// [`ConfigError::EXIT_STATUS`] when loading returns one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("libenospace:avail:{value}:{reason}")]
    InvalidThreshold { value: String, reason: &'static str },
    #[error("libenospace:errno:{value}:{reason}")]
    InvalidErrno { value: String, reason: &'static str },
}

impl ConfigError {
    /// Reserved exit status for a process killed by bad settings.
    pub const EXIT_STATUS: i32 = 111;
}

/// Recoverable configuration problems, reported but never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigWarning {
    #[error("libenospace:invalid option:{0}")]
    UnknownUnit(String),
}

/// Immutable quota settings, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub threshold: Threshold,
    pub unit: ThresholdUnit,
    /// Error code set by a simulated failure.
    pub errno: i32,
    pub debug: bool,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::Unbounded,
            unit: ThresholdUnit::Percent,
            errno: libc::ENOSPC,
            debug: false,
        }
    }
}

/// A loaded config plus the non-fatal problems found while loading it.
pub type Loaded = (QuotaConfig, Vec<ConfigWarning>);

impl QuotaConfig {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Loaded, ConfigError> {
        Self::from_lookup(|key| {
            std::env::var_os(key).map(|v| v.to_string_lossy().into_owned())
        })
    }

    /// Load settings from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Loaded, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = QuotaConfig {
            debug: lookup(ENV_DEBUG).is_some(),
            ..QuotaConfig::default()
        };
        let mut warnings = Vec::new();

        if let Some(raw) = lookup(ENV_AVAIL) {
            let n = parse_decimal::<u64>(&raw).map_err(|reason| ConfigError::InvalidThreshold {
                value: raw.clone(),
                reason,
            })?;
            config.threshold = Threshold::Limit(n);
        }

        if let Some(raw) = lookup(ENV_ERRNO) {
            config.errno = parse_decimal::<i32>(&raw).map_err(|reason| {
                ConfigError::InvalidErrno {
                    value: raw.clone(),
                    reason,
                }
            })?;
        }

        if let Some(raw) = lookup(ENV_OPT) {
            match raw.parse::<ThresholdUnit>() {
                Ok(unit) => config.unit = unit,
                Err(warning) => {
                    config.unit = ThresholdUnit::Percent;
                    warnings.push(warning);
                }
            }
        }

        Ok((config.normalized(), warnings))
    }

    /// Apply the percent clamp. Idempotent.
    pub fn normalized(mut self) -> Self {
        if let (ThresholdUnit::Percent, Threshold::Limit(n)) = (self.unit, self.threshold) {
            self.threshold = Threshold::Limit(n.min(100));
        }
        self
    }

    /// Render the config as the environment the loader reads back.
    /// `LIBENOSPACE_AVAIL` and `LIBENOSPACE_DEBUG` are omitted when unset.
    pub fn to_env_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(ENV_KEYS.len());
        if let Threshold::Limit(n) = self.threshold {
            pairs.push((ENV_AVAIL, n.to_string()));
        }
        pairs.push((ENV_ERRNO, self.errno.to_string()));
        pairs.push((ENV_OPT, self.unit.as_str().to_string()));
        if self.debug {
            pairs.push((ENV_DEBUG, "1".to_string()));
        }
        pairs
    }
}

/// Whole-string decimal parse with strerror-style failure reasons.
fn parse_decimal<T>(raw: &str) -> Result<T, &'static str>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    raw.parse::<T>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => "Numerical result out of range",
        _ => "Invalid argument",
    })
}
