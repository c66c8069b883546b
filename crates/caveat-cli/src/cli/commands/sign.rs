//! `caveat sign` - Sign a delegation file.

use super::super::args::SignArgs;
use super::keygen::KeyFile;
use super::{load_config, read_delegation, report};
use crate::exit_codes::SUCCESS;
use anyhow::{Context, Result};
use caveat_core::hash::typed_data_digest;
use std::fs;

pub fn cmd_sign(args: SignArgs) -> i32 {
    report(run_sign(args))
}

fn run_sign(args: SignArgs) -> Result<i32> {
    let output_path = if args.in_place {
        args.delegation.clone()
    } else if let Some(out) = args.out.clone() {
        out
    } else {
        anyhow::bail!("must specify --out <PATH> or --in-place");
    };

    let config = load_config(args.config.as_ref())?;
    let key = KeyFile::load(&args.key)?;
    let delegation = read_delegation(&args.delegation)?;

    if let KeyFile::Ed25519 { address, .. } = &key {
        if *address != delegation.delegator {
            tracing::warn!(
                "key address {address} differs from delegator {}; only a contract delegator will accept this signature",
                delegation.delegator
            );
        }
    }

    let hash = delegation.hash();
    let digest = typed_data_digest(&config.domain().separator(), &hash);
    let signature = key.sign_digest(&digest)?;
    let signed = delegation.with_signature(signature);

    let json = serde_json::to_string_pretty(&signed)?;
    fs::write(&output_path, json)
        .with_context(|| format!("failed to write output: {}", output_path.display()))?;

    println!("Signed delegation:");
    println!("  Input:  {}", args.delegation.display());
    println!("  Output: {}", output_path.display());
    println!();
    println!("  delegation_hash: {hash}");
    println!("  signing_digest:  {digest}");
    Ok(SUCCESS)
}
