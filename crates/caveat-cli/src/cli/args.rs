use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "caveat",
    version,
    about = "Delegation chains and caveat enforcement for smart accounts: sign, hash, verify and simulate redemptions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a signing key (ed25519 key holder or P-256 credential)
    Keygen(KeygenArgs),
    /// Print the delegation hash and the digest its delegator signs
    Hash(HashArgs),
    /// Sign a delegation file with a key file
    Sign(SignArgs),
    /// Print the signing domain for a manager config
    Domain(DomainArgs),
    /// Check a permission context offline against key-holder signatures
    Verify(VerifyArgs),
    /// Run a scenario against the in-memory host
    Simulate(SimulateArgs),
    Version,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum KeyCurve {
    #[default]
    Ed25519,
    P256,
}

#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Output key file (JSON). Printed to stdout when omitted.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = KeyCurve::Ed25519)]
    pub curve: KeyCurve,

    /// Derive the seed from a label instead of drawing it at random
    #[arg(long, conflicts_with = "seed")]
    pub label: Option<String>,

    /// 32-byte hex seed
    #[arg(long)]
    pub seed: Option<String>,

    /// Credential id (P-256 only)
    #[arg(long, default_value = "default")]
    pub key_id: String,

    /// Force overwrite existing files
    #[arg(long, short)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct HashArgs {
    /// Delegation file (JSON)
    pub delegation: PathBuf,

    /// Manager config (YAML); defaults apply when omitted
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct SignArgs {
    /// Delegation file (JSON)
    pub delegation: PathBuf,

    /// Key file written by `caveat keygen`
    #[arg(long, short)]
    pub key: PathBuf,

    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Output file (required unless --in-place)
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Modify input file in place
    #[arg(long, conflicts_with = "out")]
    pub in_place: bool,
}

#[derive(Parser, Debug)]
pub struct DomainArgs {
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Permission context: JSON array of delegations, leaf first
    pub context: PathBuf,

    /// Address expected to redeem the chain
    #[arg(long)]
    pub redeemer: String,

    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Delegation hashes to treat as disabled
    #[arg(long = "disabled")]
    pub disabled: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Scenario file (YAML)
    pub scenario: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Stop at the first step whose outcome does not match
    #[arg(long)]
    pub fail_fast: bool,
}
