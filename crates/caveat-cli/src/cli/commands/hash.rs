//! `caveat hash` - Delegation hash and signed digest.

use super::super::args::{HashArgs, OutputFormat};
use super::{load_config, read_delegation, report};
use crate::exit_codes::SUCCESS;
use anyhow::Result;
use caveat_core::hash::typed_data_digest;
use caveat_core::H256;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct HashReport {
    delegation_hash: H256,
    domain_hash: H256,
    signing_digest: H256,
}

pub fn cmd_hash(args: HashArgs) -> i32 {
    report(run_hash(args))
}

fn run_hash(args: HashArgs) -> Result<i32> {
    let config = load_config(args.config.as_ref())?;
    let delegation = read_delegation(&args.delegation)?;

    let domain_hash = config.domain().separator();
    let delegation_hash = delegation.hash();
    let out = HashReport {
        delegation_hash,
        domain_hash,
        signing_digest: typed_data_digest(&domain_hash, &delegation_hash),
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&out)?),
        OutputFormat::Text => {
            println!("delegation_hash: {}", out.delegation_hash);
            println!("domain_hash:     {}", out.domain_hash);
            println!("signing_digest:  {}", out.signing_digest);
        }
    }
    Ok(SUCCESS)
}
