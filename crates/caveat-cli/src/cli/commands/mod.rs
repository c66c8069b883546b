use super::args::*;
use anyhow::{Context, Result};
use caveat_core::{Delegation, ManagerConfig};
use std::path::{Path, PathBuf};

pub mod domain;
pub mod hash;
pub mod keygen;
pub mod sign;
pub mod simulate;
pub mod verify;

use crate::exit_codes::{CONFIG_ERROR, SUCCESS};

pub fn dispatch(cli: Cli) -> Result<i32> {
    match cli.cmd {
        Command::Keygen(args) => Ok(keygen::cmd_keygen(args)),
        Command::Hash(args) => Ok(hash::cmd_hash(args)),
        Command::Sign(args) => Ok(sign::cmd_sign(args)),
        Command::Domain(args) => Ok(domain::cmd_domain(args)),
        Command::Verify(args) => Ok(verify::cmd_verify(args)),
        Command::Simulate(args) => Ok(simulate::cmd_simulate(args)),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}

/// Map a command body's result to an exit code, printing the error chain.
pub(crate) fn report(result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            CONFIG_ERROR
        }
    }
}

pub(crate) fn load_config(path: Option<&PathBuf>) -> Result<ManagerConfig> {
    match path {
        Some(path) => ManagerConfig::from_file(path),
        None => Ok(ManagerConfig::default()),
    }
}

pub(crate) fn read_delegation(path: &Path) -> Result<Delegation> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read delegation file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse delegation JSON: {}", path.display()))
}

pub(crate) fn write_new(path: &Path, contents: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write output: {}", path.display()))
}
