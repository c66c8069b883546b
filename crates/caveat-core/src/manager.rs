//! Redemption orchestrator and administrative surface.
//!
//! A redemption batch moves through
//! `Received → Validated → BeforeAllRun → Executing → AfterRun → AfterAllRun → Completed`.
//! Any failure moves it to `Aborted`: the host is rolled back to the
//! checkpoint taken on entry, enforcer storage is restored, and buffered
//! events are dropped.

use crate::codec::{
    decode_executions, decode_permission_context, encode_batch, encode_permission_context,
    encode_single, ExecType, Execution, ExecutionMode,
};
use crate::config::ManagerConfig;
use crate::enforcer::{EnforcerRegistry, EnforcerStorage, HookArgs, HookEnv, HookKind};
use crate::error::{DelegationError, DelegationResult};
use crate::events::{DelegationRecord, ManagerEvent};
use crate::hash::{typed_data_digest, Domain};
use crate::host::{CallerContext, Host, HostView};
use crate::registry::RevocationRegistry;
use crate::types::{Address, Delegation, H256};
use crate::validator::{ChainValidator, ValidatedChain};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionPhase {
    Received,
    Validated,
    BeforeAllRun,
    Executing,
    AfterRun,
    AfterAllRun,
    Completed,
}

impl fmt::Display for RedemptionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::BeforeAllRun => "before_all_run",
            Self::Executing => "executing",
            Self::AfterRun => "after_run",
            Self::AfterAllRun => "after_all_run",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Outcome of one batch entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemedEntry {
    /// Account the action executed on.
    pub account: Address,
    /// Number of delegations in the chain (0 for self-authorized).
    pub delegations: usize,
    #[serde(skip)]
    pub return_data: Vec<Vec<u8>>,
}

/// Receipt of a completed batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Redemption {
    pub entries: Vec<RedeemedEntry>,
}

impl Redemption {
    /// Total delegations redeemed across the batch.
    pub fn redeemed(&self) -> usize {
        self.entries.iter().map(|e| e.delegations).sum()
    }
}

/// One `(permission context, mode, payload)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionRequest {
    pub context: Vec<u8>,
    pub mode: ExecutionMode,
    pub payload: Vec<u8>,
}

impl RedemptionRequest {
    pub fn single(chain: &[Delegation], execution: &Execution) -> Self {
        Self {
            context: encode_permission_context(chain),
            mode: ExecutionMode::SINGLE_DEFAULT,
            payload: encode_single(execution),
        }
    }

    pub fn batch(chain: &[Delegation], executions: &[Execution]) -> Self {
        Self {
            context: encode_permission_context(chain),
            mode: ExecutionMode::BATCH_DEFAULT,
            payload: encode_batch(executions),
        }
    }

    pub fn with_exec_type(mut self, exec_type: ExecType) -> Self {
        self.mode.exec_type = exec_type;
        self
    }
}

/// Decoded batch entry.
struct Entry {
    chain: ValidatedChain,
    mode: ExecutionMode,
}

pub struct DelegationManager {
    config: ManagerConfig,
    domain_hash: H256,
    owner: Address,
    pending_owner: Option<Address>,
    paused: bool,
    revocations: RevocationRegistry,
    enforcers: EnforcerRegistry,
    storage: EnforcerStorage,
    events: Vec<ManagerEvent>,
}

impl DelegationManager {
    pub fn new(config: ManagerConfig, enforcers: EnforcerRegistry) -> Self {
        let domain_hash = config.domain().separator();
        Self {
            owner: config.owner,
            config,
            domain_hash,
            pending_owner: None,
            paused: false,
            revocations: RevocationRegistry::new(),
            enforcers,
            storage: EnforcerStorage::new(),
            events: Vec::new(),
        }
    }

    /// Manager with the reference enforcer catalog installed.
    pub fn with_catalog(config: ManagerConfig) -> Self {
        Self::new(config, EnforcerRegistry::with_catalog())
    }

    // ── queries ───────────────────────────────────────────────────────

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn domain(&self) -> Domain {
        self.config.domain()
    }

    /// Domain separator signers must commit to.
    pub fn domain_hash(&self) -> H256 {
        self.domain_hash
    }

    pub fn delegation_hash(&self, delegation: &Delegation) -> H256 {
        delegation.hash()
    }

    /// Exact digest a delegator signs for `delegation`.
    pub fn signing_digest(&self, delegation: &Delegation) -> H256 {
        typed_data_digest(&self.domain_hash, &delegation.hash())
    }

    pub fn is_disabled(&self, hash: &H256) -> bool {
        self.revocations.is_disabled(hash)
    }

    pub fn is_registered(&self, hash: &H256) -> bool {
        self.revocations.is_registered(hash)
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn pending_owner(&self) -> Option<Address> {
        self.pending_owner
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn enforcers(&self) -> &EnforcerRegistry {
        &self.enforcers
    }

    pub fn enforcers_mut(&mut self) -> &mut EnforcerRegistry {
        &mut self.enforcers
    }

    pub fn enforcer_storage(&self) -> &EnforcerStorage {
        &self.storage
    }

    pub fn events(&self) -> &[ManagerEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<ManagerEvent> {
        std::mem::take(&mut self.events)
    }

    // ── administration ────────────────────────────────────────────────

    fn ensure_owner(&self, caller: &Address) -> DelegationResult<()> {
        if *caller != self.owner {
            return Err(DelegationError::NotOwner { caller: *caller });
        }
        Ok(())
    }

    pub fn pause(&mut self, caller: &Address) -> DelegationResult<()> {
        self.ensure_owner(caller)?;
        if self.paused {
            return Err(DelegationError::AlreadyPaused);
        }
        self.paused = true;
        info!(by = %caller, "redemption paused");
        self.events.push(ManagerEvent::Paused { by: *caller });
        Ok(())
    }

    pub fn unpause(&mut self, caller: &Address) -> DelegationResult<()> {
        self.ensure_owner(caller)?;
        if !self.paused {
            return Err(DelegationError::NotPaused);
        }
        self.paused = false;
        info!(by = %caller, "redemption unpaused");
        self.events.push(ManagerEvent::Unpaused { by: *caller });
        Ok(())
    }

    /// First step of an ownership transfer.
    pub fn transfer_ownership(&mut self, caller: &Address, pending: Address) -> DelegationResult<()> {
        self.ensure_owner(caller)?;
        self.pending_owner = Some(pending);
        self.events.push(ManagerEvent::OwnershipTransferStarted {
            previous: self.owner,
            pending,
        });
        Ok(())
    }

    pub fn accept_ownership(&mut self, caller: &Address) -> DelegationResult<()> {
        if self.pending_owner != Some(*caller) {
            return Err(DelegationError::NotPendingOwner { caller: *caller });
        }
        let previous = self.owner;
        self.owner = *caller;
        self.pending_owner = None;
        info!(previous = %previous, owner = %caller, "ownership transferred");
        self.events.push(ManagerEvent::OwnershipTransferred {
            previous,
            owner: *caller,
        });
        Ok(())
    }

    // ── revocation ────────────────────────────────────────────────────

    fn ensure_delegator(caller: &Address, delegation: &Delegation) -> DelegationResult<()> {
        if *caller != delegation.delegator {
            return Err(DelegationError::NotDelegator {
                caller: *caller,
                delegator: delegation.delegator,
            });
        }
        Ok(())
    }

    pub fn disable_delegation(
        &mut self,
        caller: &Address,
        delegation: &Delegation,
    ) -> DelegationResult<H256> {
        Self::ensure_delegator(caller, delegation)?;
        let hash = delegation.hash();
        self.revocations.disable(hash)?;
        info!(hash = %hash, delegator = %caller, "delegation disabled");
        self.events
            .push(ManagerEvent::DisabledDelegation(DelegationRecord::new(hash, delegation)));
        Ok(hash)
    }

    pub fn enable_delegation(
        &mut self,
        caller: &Address,
        delegation: &Delegation,
    ) -> DelegationResult<H256> {
        Self::ensure_delegator(caller, delegation)?;
        let hash = delegation.hash();
        self.revocations.enable(hash)?;
        info!(hash = %hash, delegator = %caller, "delegation enabled");
        self.events
            .push(ManagerEvent::EnabledDelegation(DelegationRecord::new(hash, delegation)));
        Ok(hash)
    }

    /// Mark a delegation as trusted without a signature.
    pub fn register_delegation(
        &mut self,
        caller: &Address,
        delegation: &Delegation,
    ) -> DelegationResult<H256> {
        if !self.config.allow_preregistered {
            return Err(DelegationError::PreregistrationDisabled);
        }
        Self::ensure_delegator(caller, delegation)?;
        let hash = delegation.hash();
        self.revocations.register(hash)?;
        info!(hash = %hash, delegator = %caller, "delegation registered");
        self.events
            .push(ManagerEvent::RegisteredDelegation(DelegationRecord::new(hash, delegation)));
        Ok(hash)
    }

    // ── redemption ────────────────────────────────────────────────────

    /// Validate and execute a batch of delegated actions, all or nothing.
    pub fn redeem_delegations<H: Host>(
        &mut self,
        host: &mut H,
        redeemer: Address,
        contexts: &[Vec<u8>],
        modes: &[ExecutionMode],
        payloads: &[Vec<u8>],
    ) -> DelegationResult<Redemption> {
        if self.paused {
            return Err(DelegationError::Paused);
        }
        if contexts.len() != modes.len() || contexts.len() != payloads.len() {
            return Err(DelegationError::BatchLengthMismatch {
                contexts: contexts.len(),
                modes: modes.len(),
                payloads: payloads.len(),
            });
        }
        if contexts.is_empty() {
            return Err(DelegationError::EmptyBatch);
        }

        let checkpoint = host.checkpoint();
        let snapshot = self.storage.clone();
        let mut phase = RedemptionPhase::Received;
        let mut pending = Vec::new();

        let result = self.run_batch(
            host,
            &redeemer,
            contexts,
            modes,
            payloads,
            &mut phase,
            &mut pending,
        );

        match result {
            Ok(redemption) => {
                host.commit(checkpoint);
                info!(
                    redeemer = %redeemer,
                    entries = redemption.entries.len(),
                    delegations = redemption.redeemed(),
                    "redemption completed"
                );
                self.events.append(&mut pending);
                Ok(redemption)
            }
            Err(err) => {
                host.revert_to(checkpoint);
                self.storage = snapshot;
                warn!(
                    redeemer = %redeemer,
                    phase = %phase,
                    class = %err.class(),
                    error = %err,
                    "redemption aborted"
                );
                Err(err)
            }
        }
    }

    /// Convenience over [`Self::redeem_delegations`] for typed requests.
    pub fn redeem<H: Host>(
        &mut self,
        host: &mut H,
        redeemer: Address,
        requests: &[RedemptionRequest],
    ) -> DelegationResult<Redemption> {
        let contexts: Vec<Vec<u8>> = requests.iter().map(|r| r.context.clone()).collect();
        let modes: Vec<ExecutionMode> = requests.iter().map(|r| r.mode).collect();
        let payloads: Vec<Vec<u8>> = requests.iter().map(|r| r.payload.clone()).collect();
        self.redeem_delegations(host, redeemer, &contexts, &modes, &payloads)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_batch<H: Host>(
        &mut self,
        host: &mut H,
        redeemer: &Address,
        contexts: &[Vec<u8>],
        modes: &[ExecutionMode],
        payloads: &[Vec<u8>],
        phase: &mut RedemptionPhase,
        pending: &mut Vec<ManagerEvent>,
    ) -> DelegationResult<Redemption> {
        let validator = ChainValidator::new(self.domain_hash, &self.revocations)
            .with_preregistered(self.config.allow_preregistered);

        let mut entries = Vec::with_capacity(contexts.len());
        for (index, (context, mode)) in contexts.iter().zip(modes).enumerate() {
            let chain = decode_permission_context(context)
                .map_err(|source| DelegationError::MalformedContext { index, source })?;
            decode_executions(*mode, &payloads[index])
                .map_err(|source| DelegationError::MalformedExecution { index, source })?;
            let chain = validator.validate(&*host, chain, redeemer)?;
            entries.push(Entry { chain, mode: *mode });
        }
        advance(phase, RedemptionPhase::Validated);

        for (entry, payload) in entries.iter().zip(payloads) {
            self.run_hooks(&*host, HookKind::BeforeAll, entry, payload, redeemer)?;
        }
        advance(phase, RedemptionPhase::BeforeAllRun);

        advance(phase, RedemptionPhase::Executing);
        let mut redemption = Redemption::default();
        for (entry, payload) in entries.iter().zip(payloads) {
            self.run_hooks(&*host, HookKind::Before, entry, payload, redeemer)?;

            let account = entry.chain.root_delegator().unwrap_or(*redeemer);
            let return_data = host
                .execute_from_executor(CallerContext::DelegationManager, &account, entry.mode, payload)
                .map_err(|revert| DelegationError::ExecutionFailed {
                    account,
                    reason: revert.to_string(),
                })?;
            debug!(account = %account, mode = %entry.mode, calls = return_data.len(), "action executed");

            self.run_hooks(&*host, HookKind::After, entry, payload, redeemer)?;
            redemption.entries.push(RedeemedEntry {
                account,
                delegations: entry.chain.len(),
                return_data,
            });
        }
        advance(phase, RedemptionPhase::AfterRun);

        for (entry, payload) in entries.iter().zip(payloads) {
            self.run_hooks(&*host, HookKind::AfterAll, entry, payload, redeemer)?;
        }
        advance(phase, RedemptionPhase::AfterAllRun);

        for entry in &entries {
            let Some(root_delegator) = entry.chain.root_delegator() else {
                continue;
            };
            for hash in &entry.chain.hashes {
                pending.push(ManagerEvent::RedeemedDelegation {
                    root_delegator,
                    redeemer: *redeemer,
                    delegation_hash: *hash,
                });
            }
        }
        advance(phase, RedemptionPhase::Completed);
        Ok(redemption)
    }

    /// Invoke one hook kind over every caveat of a chain.
    ///
    /// `BeforeAll`/`Before` walk leaf → root with caveats in order;
    /// `After`/`AfterAll` walk root → leaf with caveats reversed.
    fn run_hooks(
        &mut self,
        host: &dyn HostView,
        kind: HookKind,
        entry: &Entry,
        payload: &[u8],
        redeemer: &Address,
    ) -> DelegationResult<()> {
        let chain = &entry.chain;
        let forward = matches!(kind, HookKind::BeforeAll | HookKind::Before);

        let mut order: Vec<(usize, usize)> = Vec::new();
        for i in 0..chain.len() {
            for j in 0..chain.delegations[i].caveats.len() {
                order.push((i, j));
            }
        }
        if !forward {
            order.reverse();
        }

        for (i, j) in order {
            let delegation = &chain.delegations[i];
            let caveat = &delegation.caveats[j];
            let hash = chain.hashes[i];
            let enforcer = self
                .enforcers
                .get(&caveat.enforcer)
                .ok_or(DelegationError::UnknownEnforcer {
                    enforcer: caveat.enforcer,
                })?;

            debug!(hook = %kind, enforcer = enforcer.name(), delegation = %hash, "dispatch hook");
            let args = HookArgs {
                terms: &caveat.terms,
                args: &caveat.args,
                mode: entry.mode,
                execution_calldata: payload,
                delegation_hash: hash,
                delegator: delegation.delegator,
                redeemer: *redeemer,
            };
            let mut env = HookEnv {
                caller: self.config.address,
                host,
                storage: self.storage.scoped(caveat.enforcer),
            };
            enforcer
                .call_hook(kind, &args, &mut env)
                .map_err(|source| DelegationError::Caveat {
                    enforcer: caveat.enforcer,
                    hook: kind,
                    delegation: hash,
                    source,
                })?;
        }
        Ok(())
    }
}

fn advance(phase: &mut RedemptionPhase, next: RedemptionPhase) {
    debug!(from = %phase, to = %next, "redemption phase");
    *phase = next;
}

impl fmt::Debug for DelegationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegationManager")
            .field("address", &self.config.address)
            .field("domain_hash", &self.domain_hash)
            .field("owner", &self.owner)
            .field("paused", &self.paused)
            .field("enforcers", &self.enforcers)
            .finish_non_exhaustive()
    }
}
