//! `caveat verify` - Offline chain check.
//!
//! Runs the chain validator over a permission context with no smart accounts
//! present, so every delegator is checked as a key holder. Caveats are not
//! evaluated. On failure the exit code is the error class code.

use super::super::args::VerifyArgs;
use super::{load_config, report};
use crate::exit_codes::SUCCESS;
use anyhow::{Context, Result};
use caveat_core::codec::decode_permission_context;
use caveat_core::registry::RevocationRegistry;
use caveat_core::sim::World;
use caveat_core::validator::ChainValidator;
use caveat_core::{Address, H256};

pub fn cmd_verify(args: VerifyArgs) -> i32 {
    report(run_verify(args))
}

fn run_verify(args: VerifyArgs) -> Result<i32> {
    let config = load_config(args.config.as_ref())?;
    let redeemer: Address = args
        .redeemer
        .parse()
        .with_context(|| format!("invalid redeemer address: {}", args.redeemer))?;

    let mut registry = RevocationRegistry::new();
    for raw in &args.disabled {
        let hash: H256 = raw
            .parse()
            .with_context(|| format!("invalid delegation hash: {raw}"))?;
        registry.disable(hash)?;
    }

    let context = std::fs::read(&args.context)
        .with_context(|| format!("failed to read permission context: {}", args.context.display()))?;
    let chain = match decode_permission_context(&context) {
        Ok(chain) => chain,
        Err(e) => {
            eprintln!("invalid: malformed permission context: {e}");
            return Ok(caveat_core::ErrorClass::MalformedInput.exit_code());
        }
    };

    let host = World::new();
    let validator = ChainValidator::new(config.domain().separator(), &registry)
        .with_preregistered(false);
    match validator.validate(&host, chain, &redeemer) {
        Ok(validated) => {
            println!("valid: {} delegation(s)", validated.len());
            if let Some(root) = validated.root_delegator() {
                println!("root_delegator: {root}");
            }
            for (i, hash) in validated.hashes.iter().enumerate() {
                println!("  [{i}] {hash}");
            }
            Ok(SUCCESS)
        }
        Err(e) => {
            eprintln!("invalid ({}): {e}", e.class());
            Ok(e.exit_code())
        }
    }
}
