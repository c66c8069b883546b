//! Simulation scenarios.
//!
//! A scenario is a YAML document describing keys, smart accounts, tokens,
//! delegations and a list of steps. Names declared in one section are used
//! by reference in later ones; a raw `0x…` address is accepted anywhere a
//! name is.
//!
//! ```yaml
//! time: "2024-06-01T12:00:00Z"
//! owner: admin
//! keys:
//!   alice: { label: alice }
//!   bob: { label: bob }
//!   admin: { label: admin }
//! accounts:
//!   alice: { type: single_owner, owner: alice }
//!   bob: { type: single_owner, owner: bob }
//! tokens:
//!   TKN: { balances: { alice: 1000 } }
//! delegations:
//!   - name: alice_to_bob
//!     delegator: alice
//!     delegate: bob
//!     signers: [alice]
//!     caveats:
//!       - { kind: approval_amount, token: TKN, max: 100 }
//! steps:
//!   - name: approve within cap
//!     action:
//!       redeem:
//!         redeemer: bob
//!         entries:
//!           - chain: [alice_to_bob]
//!             calls: [{ approve: { token: TKN, spender: bob, amount: 100 } }]
//!     expect: ok
//! ```

pub mod runner;

use caveat_core::config::ManagerConfig;
use caveat_core::enforcers::BalanceDirection;
use caveat_core::types::decimal_u128;
use caveat_core::{ErrorClass, ExecType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use runner::{run_scenario, ScenarioReport};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub config: ManagerConfig,

    /// Manager owner, by name. Overrides `config.owner`.
    #[serde(default)]
    pub owner: Option<String>,

    /// Host time (RFC 3339).
    #[serde(default)]
    pub time: Option<String>,

    #[serde(default)]
    pub keys: BTreeMap<String, KeySpec>,

    #[serde(default)]
    pub accounts: BTreeMap<String, AccountSpec>,

    #[serde(default)]
    pub tokens: BTreeMap<String, TokenSpec>,

    #[serde(default)]
    pub native: BTreeMap<String, u64>,

    /// Declared in order; `authority` may only name an earlier delegation.
    #[serde(default)]
    pub delegations: Vec<DelegationSpec>,

    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeySpec {
    #[serde(default)]
    pub curve: Curve,

    /// Seed label; the key name is used when neither label nor seed is set.
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub seed: Option<String>,

    /// Credential id for P-256 keys (defaults to the key name).
    #[serde(default)]
    pub key_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    #[default]
    Ed25519,
    P256,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum AccountSpec {
    SingleOwner {
        owner: String,
    },
    Threshold {
        signers: Vec<String>,
        threshold: usize,
    },
    Hybrid {
        #[serde(default)]
        owner: Option<String>,
        #[serde(default)]
        credentials: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenSpec {
    #[serde(default)]
    pub balances: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelegationSpec {
    pub name: String,
    pub delegator: String,
    /// Account name, raw address, or `any` for an open delegation.
    pub delegate: String,
    /// Name of the parent delegation; root authority when omitted.
    #[serde(default)]
    pub authority: Option<String>,
    #[serde(default)]
    pub salt: u64,
    #[serde(default)]
    pub caveats: Vec<CaveatSpec>,
    /// Keys that sign. Several ed25519 keys make a threshold signature; no
    /// keys leaves the delegation unsigned.
    #[serde(default)]
    pub signers: Vec<String>,
}

/// Typed caveat terms for the reference catalog.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum CaveatSpec {
    AllowedTargets {
        targets: Vec<String>,
    },
    /// Selectors by name (`approve`, `transfer`, `transfer_from`,
    /// `balance_of`) or as 4-byte hex.
    AllowedMethods {
        methods: Vec<String>,
    },
    ValueLte {
        #[serde(with = "decimal_u128")]
        max: u128,
    },
    /// RFC 3339 bounds; either may be omitted.
    Timestamp {
        #[serde(default)]
        after: Option<String>,
        #[serde(default)]
        before: Option<String>,
    },
    LimitedCalls {
        limit: u64,
    },
    Redeemer {
        redeemers: Vec<String>,
    },
    ApprovalAmount {
        token: String,
        #[serde(with = "decimal_u128")]
        max: u128,
    },
    Erc20TransferAmount {
        token: String,
        #[serde(with = "decimal_u128")]
        max: u128,
    },
    Erc20BalanceChange {
        direction: BalanceDirection,
        token: String,
        recipient: String,
        #[serde(with = "decimal_u128")]
        amount: u128,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    #[serde(default)]
    pub name: Option<String>,

    pub action: Action,

    #[serde(default)]
    pub expect: Expectation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Redeem(RedeemSpec),
    Disable(RevocationSpec),
    Enable(RevocationSpec),
    Register(RevocationSpec),
    Pause(CallerSpec),
    Unpause(CallerSpec),
    /// Move host time (RFC 3339).
    SetTime(String),
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Redeem(_) => "redeem",
            Self::Disable(_) => "disable",
            Self::Enable(_) => "enable",
            Self::Register(_) => "register",
            Self::Pause(_) => "pause",
            Self::Unpause(_) => "unpause",
            Self::SetTime(_) => "set_time",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedeemSpec {
    pub redeemer: String,
    pub entries: Vec<EntrySpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntrySpec {
    /// Delegation names, leaf first. Empty for a self-authorized entry.
    #[serde(default)]
    pub chain: Vec<String>,

    pub calls: Vec<CallSpec>,

    /// Force the batch call type for a single call.
    #[serde(default)]
    pub batch: bool,

    #[serde(default)]
    pub exec: ExecType,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSpec {
    Approve {
        token: String,
        spender: String,
        #[serde(with = "decimal_u128")]
        amount: u128,
    },
    Transfer {
        token: String,
        to: String,
        #[serde(with = "decimal_u128")]
        amount: u128,
    },
    TransferFrom {
        token: String,
        from: String,
        to: String,
        #[serde(with = "decimal_u128")]
        amount: u128,
    },
    Native {
        to: String,
        #[serde(with = "decimal_u128")]
        value: u128,
    },
    Raw {
        target: String,
        #[serde(default, with = "decimal_u128")]
        value: u128,
        #[serde(default)]
        data: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevocationSpec {
    pub caller: String,
    pub delegation: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallerSpec {
    pub caller: String,
}

/// Expected step outcome: `ok`, or the error class the step must fail with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    #[default]
    Ok,
    MalformedInput,
    Authorization,
    Policy,
    Execution,
    StateConflict,
}

impl Expectation {
    pub fn matches(&self, outcome: Option<ErrorClass>) -> bool {
        match (self, outcome) {
            (Self::Ok, None) => true,
            (_, None) | (Self::Ok, Some(_)) => false,
            (expected, Some(class)) => expected.as_class() == Some(class),
        }
    }

    pub fn as_class(&self) -> Option<ErrorClass> {
        match self {
            Self::Ok => None,
            Self::MalformedInput => Some(ErrorClass::MalformedInput),
            Self::Authorization => Some(ErrorClass::Authorization),
            Self::Policy => Some(ErrorClass::Policy),
            Self::Execution => Some(ErrorClass::Execution),
            Self::StateConflict => Some(ErrorClass::StateConflict),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.as_class().map(|c| c.as_str()).unwrap_or("ok")
    }
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        use anyhow::Context;
        serde_yaml::from_str(yaml).context("failed to parse scenario")
    }
}
