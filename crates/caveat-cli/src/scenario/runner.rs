use super::{
    AccountSpec, Action, CallSpec, CaveatSpec, Curve, DelegationSpec, EntrySpec, Expectation,
    Scenario,
};
use crate::cli::commands::keygen::{label_seed, parse_seed};
use anyhow::{bail, Context, Result};
use caveat_core::codec::{
    APPROVE_SELECTOR, BALANCE_OF_SELECTOR, TRANSFER_FROM_SELECTOR, TRANSFER_SELECTOR,
};
use caveat_core::enforcers::{
    AllowedMethodsEnforcer, AllowedTargetsEnforcer, ApprovalAmountEnforcer,
    Erc20BalanceChangeEnforcer, Erc20TransferAmountEnforcer, LimitedCallsEnforcer,
    RedeemerEnforcer, TimestampEnforcer, ValueLteEnforcer,
};
use caveat_core::signature::{CredentialSigner, HybridPolicy, KeySigner, ThresholdPolicy};
use caveat_core::sim::{AccountValidator, FailedCall, World};
use caveat_core::{
    Address, Caveat, Delegation, DelegationManager, DelegationResult, Erc20Call, ErrorClass,
    Execution, ManagerEvent, RedemptionRequest, ANY_DELEGATE,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub action: &'static str,
    pub expected: Expectation,
    /// Error class of the failure, or `None` when the step succeeded.
    pub outcome: Option<ErrorClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub matched: bool,
}

impl StepReport {
    pub fn outcome_str(&self) -> &'static str {
        self.outcome.map(|c| c.as_str()).unwrap_or("ok")
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepReport>,
    pub events: Vec<ManagerEvent>,
    pub failed_calls: Vec<FailedCall>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| s.matched)
    }

    pub fn mismatches(&self) -> usize {
        self.steps.iter().filter(|s| !s.matched).count()
    }
}

enum Signer {
    Key(KeySigner),
    Credential(CredentialSigner),
}

/// Named fixtures and the live manager/host pair.
struct Env {
    world: World,
    manager: DelegationManager,
    keys: BTreeMap<String, Signer>,
    accounts: BTreeMap<String, Address>,
    tokens: BTreeMap<String, Address>,
    delegations: BTreeMap<String, Delegation>,
}

/// Build the scenario's world and run its steps in order.
///
/// Setup problems (unknown names, bad keys, bad times) are errors. Step
/// failures are recorded in the report and compared with the expectation.
pub fn run_scenario(scenario: &Scenario, fail_fast: bool) -> Result<ScenarioReport> {
    let mut env = Env::build(scenario)?;
    let mut report = ScenarioReport::default();

    for (index, step) in scenario.steps.iter().enumerate() {
        let result = env
            .run_step(&step.action)
            .with_context(|| format!("step {} ({})", index + 1, step.action.kind()))?;
        let outcome = result.as_ref().err().map(|e| e.class());
        let matched = step.expect.matches(outcome);
        debug!(step = index + 1, action = step.action.kind(), matched, "scenario step");

        report.steps.push(StepReport {
            index: index + 1,
            name: step.name.clone(),
            action: step.action.kind(),
            expected: step.expect,
            outcome,
            error: result.err().map(|e| e.to_string()),
            matched,
        });
        if fail_fast && !matched {
            break;
        }
    }

    report.events = env.manager.take_events();
    report.failed_calls = env.world.failed_calls().to_vec();
    info!(
        steps = report.steps.len(),
        mismatches = report.mismatches(),
        "scenario finished"
    );
    Ok(report)
}

fn parse_time(raw: &str) -> Result<u64> {
    let at = chrono::DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid RFC 3339 time: {raw}"))?;
    u64::try_from(at.timestamp()).with_context(|| format!("time before the epoch: {raw}"))
}

fn selector(name: &str) -> Result<[u8; 4]> {
    Ok(match name {
        "approve" => APPROVE_SELECTOR,
        "transfer" => TRANSFER_SELECTOR,
        "transfer_from" => TRANSFER_FROM_SELECTOR,
        "balance_of" => BALANCE_OF_SELECTOR,
        other => {
            let bytes = hex::decode(other.strip_prefix("0x").unwrap_or(other))
                .with_context(|| format!("unknown method: {other}"))?;
            bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("selector must be 4 bytes: {other}"))?
        }
    })
}

impl Env {
    fn build(scenario: &Scenario) -> Result<Self> {
        let mut world = World::new();
        if let Some(time) = &scenario.time {
            world.set_timestamp(parse_time(time)?);
        }

        let mut keys = BTreeMap::new();
        for (name, spec) in &scenario.keys {
            let seed = match (&spec.seed, &spec.label) {
                (Some(seed), _) => parse_seed(seed).with_context(|| format!("key {name}"))?,
                (None, Some(label)) => label_seed(label),
                (None, None) => label_seed(name),
            };
            let signer = match spec.curve {
                Curve::Ed25519 => Signer::Key(KeySigner::from_seed(&seed)),
                Curve::P256 => {
                    let key_id = spec.key_id.clone().unwrap_or_else(|| name.clone());
                    Signer::Credential(
                        CredentialSigner::from_seed(key_id, &seed)
                            .with_context(|| format!("key {name}: seed is not a valid P-256 scalar"))?,
                    )
                }
            };
            keys.insert(name.clone(), signer);
        }

        // Replaced once the owner can be resolved; the signing domain does
        // not depend on it.
        let mut env = Self {
            world,
            manager: DelegationManager::with_catalog(scenario.config.clone()),
            keys,
            accounts: BTreeMap::new(),
            tokens: BTreeMap::new(),
            delegations: BTreeMap::new(),
        };

        for (name, spec) in &scenario.accounts {
            let validator = env
                .validator(spec)
                .with_context(|| format!("account {name}"))?;
            let address = env.world.deploy_named_account(name, validator);
            env.accounts.insert(name.clone(), address);
        }

        for (symbol, spec) in &scenario.tokens {
            let token = env.world.deploy_token(symbol);
            env.tokens.insert(symbol.clone(), token);
            for (holder, amount) in &spec.balances {
                let holder = env.resolve(holder)?;
                env.world
                    .mint(&token, holder, u128::from(*amount))
                    .map_err(|e| anyhow::anyhow!("mint {symbol}: {e}"))?;
            }
        }

        for (holder, amount) in &scenario.native {
            let holder = env.resolve(holder)?;
            env.world.set_native_balance(holder, u128::from(*amount));
        }

        let mut config = scenario.config.clone();
        if let Some(owner) = &scenario.owner {
            config.owner = env.resolve(owner)?;
        }
        env.manager = DelegationManager::with_catalog(config);

        for spec in &scenario.delegations {
            let delegation = env
                .delegation(spec)
                .with_context(|| format!("delegation {}", spec.name))?;
            debug!(name = %spec.name, hash = %delegation.hash(), "delegation prepared");
            env.delegations.insert(spec.name.clone(), delegation);
        }
        Ok(env)
    }

    /// Accounts, then tokens, then key-holder addresses, then raw hex.
    fn resolve(&self, name: &str) -> Result<Address> {
        if name == "any" {
            return Ok(ANY_DELEGATE);
        }
        if let Some(address) = self.accounts.get(name).or_else(|| self.tokens.get(name)) {
            return Ok(*address);
        }
        if let Some(Signer::Key(key)) = self.keys.get(name) {
            return Ok(key.address());
        }
        name.parse()
            .with_context(|| format!("unknown name or address: {name}"))
    }

    fn key(&self, name: &str) -> Result<&KeySigner> {
        match self.keys.get(name) {
            Some(Signer::Key(key)) => Ok(key),
            Some(Signer::Credential(_)) => bail!("key {name} is a P-256 credential, not an ed25519 key"),
            None => bail!("unknown key: {name}"),
        }
    }

    fn validator(&self, spec: &AccountSpec) -> Result<AccountValidator> {
        Ok(match spec {
            AccountSpec::SingleOwner { owner } => {
                AccountValidator::SingleOwner(self.key(owner)?.address())
            }
            AccountSpec::Threshold { signers, threshold } => {
                let addresses = signers
                    .iter()
                    .map(|s| self.key(s).map(KeySigner::address))
                    .collect::<Result<Vec<_>>>()?;
                let policy = ThresholdPolicy::new(addresses, *threshold)
                    .context("invalid threshold configuration")?;
                AccountValidator::Threshold(policy)
            }
            AccountSpec::Hybrid { owner, credentials } => {
                let owner = owner
                    .as_deref()
                    .map(|o| self.key(o).map(KeySigner::address))
                    .transpose()?;
                let mut policy = HybridPolicy::new(owner);
                for name in credentials {
                    let Some(Signer::Credential(credential)) = self.keys.get(name) else {
                        bail!("credential {name} must be a P-256 key");
                    };
                    policy
                        .add_key(credential.key_id(), credential.verifying_key())
                        .context("invalid hybrid configuration")?;
                }
                if !policy.has_credentials() {
                    bail!("hybrid account needs an owner or at least one credential");
                }
                AccountValidator::Hybrid(policy)
            }
        })
    }

    fn caveat(&self, spec: &CaveatSpec) -> Result<Caveat> {
        let resolve_all = |names: &[String]| -> Result<Vec<Address>> {
            names.iter().map(|n| self.resolve(n)).collect()
        };
        Ok(match spec {
            CaveatSpec::AllowedTargets { targets } => {
                AllowedTargetsEnforcer::caveat(&resolve_all(targets)?)
            }
            CaveatSpec::AllowedMethods { methods } => {
                let selectors = methods
                    .iter()
                    .map(|m| selector(m))
                    .collect::<Result<Vec<_>>>()?;
                AllowedMethodsEnforcer::caveat(&selectors)
            }
            CaveatSpec::ValueLte { max } => ValueLteEnforcer::caveat(*max),
            CaveatSpec::Timestamp { after, before } => {
                let bound = |t: &Option<String>| -> Result<u128> {
                    t.as_deref().map(parse_time).transpose().map(|v| u128::from(v.unwrap_or(0)))
                };
                TimestampEnforcer::caveat(bound(after)?, bound(before)?)
            }
            CaveatSpec::LimitedCalls { limit } => LimitedCallsEnforcer::caveat(u128::from(*limit)),
            CaveatSpec::Redeemer { redeemers } => RedeemerEnforcer::caveat(&resolve_all(redeemers)?),
            CaveatSpec::ApprovalAmount { token, max } => {
                ApprovalAmountEnforcer::caveat(&self.resolve(token)?, *max)
            }
            CaveatSpec::Erc20TransferAmount { token, max } => {
                Erc20TransferAmountEnforcer::caveat(&self.resolve(token)?, *max)
            }
            CaveatSpec::Erc20BalanceChange {
                direction,
                token,
                recipient,
                amount,
            } => Erc20BalanceChangeEnforcer::caveat(
                *direction,
                &self.resolve(token)?,
                &self.resolve(recipient)?,
                *amount,
            ),
        })
    }

    fn delegation(&self, spec: &DelegationSpec) -> Result<Delegation> {
        let mut delegation = Delegation::new(self.resolve(&spec.delegator)?, self.resolve(&spec.delegate)?)
            .with_salt(u128::from(spec.salt));
        if let Some(parent) = &spec.authority {
            let parent = self
                .delegations
                .get(parent)
                .with_context(|| format!("authority {parent} is not an earlier delegation"))?;
            delegation = delegation.with_authority(parent.hash());
        }
        for caveat in &spec.caveats {
            delegation = delegation.with_caveat(self.caveat(caveat)?);
        }

        let digest = self.manager.signing_digest(&delegation);
        let signature = match spec.signers.as_slice() {
            [] => Vec::new(),
            [only] => match self.keys.get(only) {
                Some(Signer::Credential(credential)) => credential
                    .sign_digest(&digest)
                    .map_err(|e| anyhow::anyhow!("P-256 signing failed: {e}"))?,
                _ => self.key(only)?.sign_digest(&digest),
            },
            signers => {
                let mut keys = signers
                    .iter()
                    .map(|s| self.key(s))
                    .collect::<Result<Vec<_>>>()?;
                keys.sort_by_key(|k| k.address());
                keys.iter().flat_map(|k| k.sign_digest(&digest)).collect()
            }
        };
        Ok(delegation.with_signature(signature))
    }

    fn execution(&self, call: &CallSpec) -> Result<Execution> {
        Ok(match call {
            CallSpec::Approve {
                token,
                spender,
                amount,
            } => Execution::new(
                self.resolve(token)?,
                0,
                Erc20Call::Approve {
                    spender: self.resolve(spender)?,
                    amount: *amount,
                }
                .encode(),
            ),
            CallSpec::Transfer { token, to, amount } => Execution::new(
                self.resolve(token)?,
                0,
                Erc20Call::Transfer {
                    to: self.resolve(to)?,
                    amount: *amount,
                }
                .encode(),
            ),
            CallSpec::TransferFrom {
                token,
                from,
                to,
                amount,
            } => Execution::new(
                self.resolve(token)?,
                0,
                Erc20Call::TransferFrom {
                    from: self.resolve(from)?,
                    to: self.resolve(to)?,
                    amount: *amount,
                }
                .encode(),
            ),
            CallSpec::Native { to, value } => Execution::new(self.resolve(to)?, *value, Vec::new()),
            CallSpec::Raw {
                target,
                value,
                data,
            } => {
                let data = hex::decode(data.strip_prefix("0x").unwrap_or(data))
                    .with_context(|| format!("invalid call data: {data}"))?;
                Execution::new(self.resolve(target)?, *value, data)
            }
        })
    }

    fn request(&self, entry: &EntrySpec) -> Result<RedemptionRequest> {
        let chain = entry
            .chain
            .iter()
            .map(|name| {
                self.delegations
                    .get(name)
                    .cloned()
                    .with_context(|| format!("unknown delegation: {name}"))
            })
            .collect::<Result<Vec<_>>>()?;
        let calls = entry
            .calls
            .iter()
            .map(|c| self.execution(c))
            .collect::<Result<Vec<_>>>()?;

        let request = match calls.as_slice() {
            [single] if !entry.batch => RedemptionRequest::single(&chain, single),
            _ => RedemptionRequest::batch(&chain, &calls),
        };
        Ok(request.with_exec_type(entry.exec))
    }

    fn named_delegation(&self, name: &str) -> Result<&Delegation> {
        self.delegations
            .get(name)
            .with_context(|| format!("unknown delegation: {name}"))
    }

    /// Outer error: the step could not be set up. Inner error: the engine
    /// rejected it.
    fn run_step(&mut self, action: &Action) -> Result<DelegationResult<()>> {
        Ok(match action {
            Action::Redeem(spec) => {
                let redeemer = self.resolve(&spec.redeemer)?;
                let requests = spec
                    .entries
                    .iter()
                    .map(|e| self.request(e))
                    .collect::<Result<Vec<_>>>()?;
                self.manager
                    .redeem(&mut self.world, redeemer, &requests)
                    .map(|_| ())
            }
            Action::Disable(spec) => {
                let caller = self.resolve(&spec.caller)?;
                let delegation = self.named_delegation(&spec.delegation)?.clone();
                self.manager.disable_delegation(&caller, &delegation).map(|_| ())
            }
            Action::Enable(spec) => {
                let caller = self.resolve(&spec.caller)?;
                let delegation = self.named_delegation(&spec.delegation)?.clone();
                self.manager.enable_delegation(&caller, &delegation).map(|_| ())
            }
            Action::Register(spec) => {
                let caller = self.resolve(&spec.caller)?;
                let delegation = self.named_delegation(&spec.delegation)?.clone();
                self.manager.register_delegation(&caller, &delegation).map(|_| ())
            }
            Action::Pause(spec) => {
                let caller = self.resolve(&spec.caller)?;
                self.manager.pause(&caller)
            }
            Action::Unpause(spec) => {
                let caller = self.resolve(&spec.caller)?;
                self.manager.unpause(&caller)
            }
            Action::SetTime(at) => {
                self.world.set_timestamp(parse_time(at)?);
                Ok(())
            }
        })
    }
}
