//! # enospace CLI
//!
//! Runs commands with the enospace shim preloaded, and reports what the
//! shim would decide for a given file.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use enospace_config::logging::{init_logging, LogLevel};
use enospace_config::{
    log_cli_warn, ConfigError, Loaded, QuotaConfig, ThresholdUnit, ENV_AVAIL, ENV_DEBUG,
    ENV_ERRNO, ENV_OPT,
};

mod probe;
mod run;

/// Simulate a full disk for a command, without filling a disk.
#[derive(Parser, Debug)]
#[command(name = "enospace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a command with the shim preloaded
    Run {
        #[command(flatten)]
        quota: QuotaArgs,

        /// Path to libenospace.so (searched for when omitted)
        #[arg(long, value_name = "PATH")]
        library: Option<PathBuf>,

        #[arg(
            trailing_var_arg = true,
            allow_hyphen_values = true,
            required = true,
            value_name = "COMMAND"
        )]
        command: Vec<String>,
    },

    /// Show the verdict a write to PATH would get right now
    Probe {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        #[command(flatten)]
        quota: QuotaArgs,

        /// Print the decision as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Unit {
    Bytes,
    Percent,
}

impl From<Unit> for ThresholdUnit {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::Bytes => ThresholdUnit::Bytes,
            Unit::Percent => ThresholdUnit::Percent,
        }
    }
}

/// Quota settings shared by every subcommand.
///
/// Each flag overrides the matching `LIBENOSPACE_*` variable; unset flags
/// fall back to the environment, read exactly as the shim reads it.
#[derive(Args, Debug, Clone)]
struct QuotaArgs {
    /// Minimum free capacity; writes fail below it [env: LIBENOSPACE_AVAIL]
    #[arg(long, value_name = "N")]
    avail: Option<u64>,

    /// Unit of --avail, percent by default [env: LIBENOSPACE_OPT]
    #[arg(long, value_enum)]
    unit: Option<Unit>,

    /// Error code reported by a simulated failure, ENOSPC by default
    /// [env: LIBENOSPACE_ERRNO]
    #[arg(long, value_name = "ERRNO", allow_negative_numbers = true)]
    errno: Option<i32>,

    /// Print the shim's diagnostics on stderr [env: LIBENOSPACE_DEBUG]
    #[arg(long)]
    debug: bool,
}

impl QuotaArgs {
    fn flag_value(&self, key: &str) -> Option<String> {
        match key {
            ENV_AVAIL => self.avail.map(|n| n.to_string()),
            ENV_OPT => self
                .unit
                .map(|unit| ThresholdUnit::from(unit).as_str().to_string()),
            ENV_ERRNO => self.errno.map(|e| e.to_string()),
            ENV_DEBUG => self.debug.then(String::new),
            _ => None,
        }
    }

    /// Layer the flags over `env` and load the result like the shim does.
    fn load<F>(&self, env: F) -> Result<Loaded, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        QuotaConfig::from_lookup(|key| self.flag_value(key).or_else(|| env(key)))
    }

    fn to_config(&self) -> Result<QuotaConfig> {
        let (config, warnings) =
            self.load(|key| std::env::var_os(key).map(|v| v.to_string_lossy().into_owned()))?;
        for warning in warnings {
            log_cli_warn!("Ignoring setting", warning = warning.to_string().as_str());
        }
        Ok(config)
    }
}

fn level_for(verbose: u8) -> LogLevel {
    match verbose {
        0 => LogLevel::Warn,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(level_for(cli.verbose));

    match cli.command {
        Commands::Run {
            quota,
            library,
            command,
        } => run::cmd_run(&quota.to_config()?, library.as_deref(), &command),
        Commands::Probe { path, quota, json } => {
            let allowed = probe::cmd_probe(&path, &quota.to_config()?, json)?;
            if !allowed {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enospace_config::Threshold;
    use std::collections::HashMap;

    fn quota_of(args: &[&str]) -> QuotaArgs {
        let mut argv = vec!["enospace", "probe", "/tmp"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Probe { quota, .. } => quota,
            other => panic!("unexpected command {:?}", other),
        }
    }

    fn load_with_env(quota: &QuotaArgs, env: &[(&str, &str)]) -> Result<Loaded, ConfigError> {
        let map: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        quota.load(|key| map.get(key).cloned())
    }

    #[test]
    fn test_run_collects_trailing_command() {
        let cli = Cli::try_parse_from([
            "enospace", "run", "--avail", "0", "--unit", "bytes", "--", "dd", "if=/dev/zero",
            "-x",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { quota, command, .. } => {
                assert_eq!(command, vec!["dd", "if=/dev/zero", "-x"]);
                let (config, _) = load_with_env(&quota, &[]).unwrap();
                assert_eq!(config.threshold, Threshold::Limit(0));
                assert_eq!(config.unit, ThresholdUnit::Bytes);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_run_requires_command() {
        assert!(Cli::try_parse_from(["enospace", "run", "--avail", "5"]).is_err());
    }

    #[test]
    fn test_unknown_unit_is_rejected() {
        let parsed = Cli::try_parse_from(["enospace", "probe", "/tmp", "--unit", "blocks"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_probe_defaults_and_clamp() {
        let cli = Cli::try_parse_from(["enospace", "probe", "/tmp", "--avail", "400"]).unwrap();
        match cli.command {
            Commands::Probe { quota, json, .. } => {
                assert!(!json);
                let (config, _) = load_with_env(&quota, &[]).unwrap();
                assert_eq!(config.threshold, Threshold::Limit(100));
                assert_eq!(config.unit, ThresholdUnit::Percent);
                assert_eq!(config.errno, libc::ENOSPC);
                assert!(!config.debug);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_every_setting_falls_back_to_env() {
        let quota = quota_of(&[]);
        let (config, warnings) = load_with_env(
            &quota,
            &[
                (ENV_AVAIL, "4096"),
                (ENV_OPT, "bytes"),
                (ENV_ERRNO, "5"),
                (ENV_DEBUG, ""),
            ],
        )
        .unwrap();
        assert_eq!(config.threshold, Threshold::Limit(4096));
        assert_eq!(config.unit, ThresholdUnit::Bytes);
        assert_eq!(config.errno, libc::EIO);
        assert!(config.debug);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_flags_override_env() {
        let quota = quota_of(&["--avail", "10", "--unit", "percent", "--errno", "122"]);
        let (config, _) =
            load_with_env(&quota, &[(ENV_AVAIL, "4096"), (ENV_OPT, "bytes"), (ENV_ERRNO, "5")])
                .unwrap();
        assert_eq!(config.threshold, Threshold::Limit(10));
        assert_eq!(config.unit, ThresholdUnit::Percent);
        assert_eq!(config.errno, libc::EDQUOT);
    }

    #[test]
    fn test_bytes_unit_from_env_is_not_clamped() {
        let quota = quota_of(&["--avail", "4096"]);
        let (config, _) = load_with_env(&quota, &[(ENV_OPT, "bytes")]).unwrap();
        assert_eq!(config.threshold, Threshold::Limit(4096));
        assert_eq!(config.unit, ThresholdUnit::Bytes);
    }

    #[test]
    fn test_env_follows_shim_rules() {
        let quota = quota_of(&[]);
        let (config, warnings) = load_with_env(&quota, &[(ENV_OPT, "blocks")]).unwrap();
        assert_eq!(config.unit, ThresholdUnit::Percent);
        assert_eq!(warnings.len(), 1);

        let err = load_with_env(&quota, &[(ENV_AVAIL, "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold { .. }));

        // A valid flag shadows a malformed variable.
        let quota = quota_of(&["--avail", "3"]);
        assert!(load_with_env(&quota, &[(ENV_AVAIL, "lots")]).is_ok());
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for(0), LogLevel::Warn);
        assert_eq!(level_for(2), LogLevel::Debug);
        assert_eq!(level_for(9), LogLevel::Trace);
    }
}
