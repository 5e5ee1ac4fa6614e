//! `enospace run` - exec a command with the shim preloaded.

use std::env;
use std::ffi::{OsStr, OsString};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use enospace_config::{log_cli_debug, log_cli_info, QuotaConfig, ENV_KEYS};

pub const LIBRARY_NAME: &str = "libenospace.so";

/// Replace this process with `command`, running under the shim.
/// Only returns on failure.
pub fn cmd_run(config: &QuotaConfig, library: Option<&Path>, command: &[String]) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        bail!("no command given");
    };
    let library = find_library(library)?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    // The resolved config replaces whatever LIBENOSPACE_* the parent had.
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    for (key, value) in config.to_env_pairs() {
        log_cli_debug!("Exporting setting", key = key, value = value.as_str());
        cmd.env(key, value);
    }
    cmd.env(
        "LD_PRELOAD",
        preload_list(&library, env::var_os("LD_PRELOAD").as_deref()),
    );

    log_cli_info!(
        "Launching under enospace",
        program = program.as_str(),
        library = tracing::field::display(library.display()),
        threshold = tracing::field::display(config.threshold),
        unit = config.unit.as_str(),
    );

    let err = cmd.exec();
    Err(err).with_context(|| format!("failed to execute '{}'", program))
}

/// `library` first, then whatever was already preloaded.
pub fn preload_list(library: &Path, existing: Option<&OsStr>) -> OsString {
    let mut list = OsString::from(library.as_os_str());
    if let Some(existing) = existing.filter(|e| !e.is_empty()) {
        list.push(":");
        list.push(existing);
    }
    list
}

/// Places the shared library is looked for, in order.
pub fn candidate_paths(exe_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = exe_dir {
        // Same directory as the enospace binary
        candidates.push(dir.join(LIBRARY_NAME));
        // ../lib/ relative to bin/
        if let Some(parent) = dir.parent() {
            candidates.push(parent.join("lib").join(LIBRARY_NAME));
        }
    }
    // Cargo target directory (development mode)
    candidates.push(Path::new("target/debug").join(LIBRARY_NAME));
    candidates.push(Path::new("target/release").join(LIBRARY_NAME));
    candidates
}

fn find_library(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("shim library not found at {}", path.display());
        }
        return path.canonicalize().context("resolve library path");
    }

    let exe = env::current_exe().ok();
    let exe_dir = exe.as_deref().and_then(Path::parent);
    for candidate in candidate_paths(exe_dir) {
        if candidate.is_file() {
            // The loader resolves LD_PRELOAD entries against the child's cwd.
            return candidate.canonicalize().context("resolve library path");
        }
    }

    bail!(
        "Could not find {}. Please run 'cargo build -p enospace-preload' first or pass --library.",
        LIBRARY_NAME
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preload_list_prepends() {
        let lib = Path::new("/opt/lib/libenospace.so");
        assert_eq!(preload_list(lib, None), OsString::from("/opt/lib/libenospace.so"));
        assert_eq!(
            preload_list(lib, Some(OsStr::new(""))),
            OsString::from("/opt/lib/libenospace.so")
        );
        assert_eq!(
            preload_list(lib, Some(OsStr::new("/usr/lib/libfoo.so"))),
            OsString::from("/opt/lib/libenospace.so:/usr/lib/libfoo.so")
        );
    }

    #[test]
    fn test_candidate_order() {
        let candidates = candidate_paths(Some(Path::new("/usr/local/bin")));
        assert_eq!(candidates[0], PathBuf::from("/usr/local/bin/libenospace.so"));
        assert_eq!(candidates[1], PathBuf::from("/usr/local/lib/libenospace.so"));
        assert_eq!(candidates[2], PathBuf::from("target/debug/libenospace.so"));
        assert_eq!(candidates[3], PathBuf::from("target/release/libenospace.so"));
    }

    #[test]
    fn test_candidates_without_exe() {
        assert_eq!(candidate_paths(None).len(), 2);
    }

    #[test]
    fn test_explicit_missing_library_is_an_error() {
        let err = find_library(Some(Path::new("/nonexistent/libenospace.so"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/libenospace.so"));
    }

    #[test]
    fn test_explicit_library_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join(LIBRARY_NAME);
        std::fs::write(&lib, b"").unwrap();
        let found = find_library(Some(&lib)).unwrap();
        assert!(found.is_absolute());
        assert_eq!(found, lib.canonicalize().unwrap());
    }
}
