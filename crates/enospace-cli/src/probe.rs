//! `enospace probe` - evaluate the quota for one file without writing to it.

use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::Path;

use anyhow::{Context, Result};
use enospace_config::{log_quota_debug, QuotaConfig};
use enospace_quota::{fstype, Decision, QuotaEngine, Reason, SysProbe};
use serde::Serialize;

#[derive(Serialize)]
struct ProbeReport<'a> {
    path: &'a Path,
    config: &'a QuotaConfig,
    filesystem: Option<&'static str>,
    decision: Decision,
}

/// Print the decision for `path`. Returns whether a write would be allowed.
pub fn cmd_probe(path: &Path, config: &QuotaConfig, json: bool) -> Result<bool> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let engine = QuotaEngine::new(*config, SysProbe);
    let decision = engine
        .decide(file.as_raw_fd())
        .with_context(|| format!("quota check for {}", path.display()))?;

    log_quota_debug!(
        "Decision",
        allowed = decision.verdict.is_allow(),
        fd = file.as_raw_fd()
    );

    let filesystem = match decision.reason {
        Reason::Measured(m) => fstype::name(m.stats.fs_type),
        _ => None,
    };

    if json {
        let report = ProbeReport {
            path,
            config: engine.config(),
            filesystem,
            decision,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}: {}", path.display(), decision);
        if let Some(name) = filesystem {
            println!("  filesystem: {}", name);
        }
        let mut details = String::new();
        decision.write_diagnostic(&mut details)?;
        if !details.is_empty() {
            print!("  {}", details);
        }
    }

    Ok(decision.verdict.is_allow())
}
