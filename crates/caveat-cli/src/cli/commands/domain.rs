//! `caveat domain` - Signing domain of a manager deployment.

use super::super::args::{DomainArgs, OutputFormat};
use super::{load_config, report};
use crate::exit_codes::SUCCESS;
use anyhow::Result;
use caveat_core::hash::Domain;
use caveat_core::H256;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct DomainReport {
    #[serde(flatten)]
    domain: Domain,
    separator: H256,
}

pub fn cmd_domain(args: DomainArgs) -> i32 {
    report(run_domain(args))
}

fn run_domain(args: DomainArgs) -> Result<i32> {
    let config = load_config(args.config.as_ref())?;
    let domain = config.domain();
    let separator = domain.separator();

    match args.format {
        OutputFormat::Json => {
            let out = DomainReport { domain, separator };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("name:               {}", domain.name);
            println!("version:            {}", domain.version);
            println!("chain_id:           {}", domain.chain_id);
            println!("verifying_contract: {}", domain.verifying_contract);
            println!("separator:          {separator}");
        }
    }
    Ok(SUCCESS)
}
