//! Balance-delta enforcement across a whole batch.
//!
//! `beforeAll` takes a lock and snapshots the recipient balance; `afterAll`
//! releases the lock unconditionally and compares. A second `beforeAll` for
//! the same lock key while the snapshot is outstanding is rejected, so a
//! nested or repeated use cannot overwrite the snapshot.

use super::{word_terms, EnforcerKind};
use crate::enforcer::{CaveatEnforcer, EnforcerError, HookArgs, HookEnv, HookResult};
use crate::hash::{hash_concat, u128_word};
use crate::types::{Address, Caveat, H256};
use serde::{Deserialize, Serialize};
use tracing::debug;

const NAME: &str = "ERC20BalanceChangeEnforcer";

const TERMS_LEN: usize = 73;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceDirection {
    /// Balance must grow by at least the amount.
    Increase,
    /// Balance may shrink by at most the amount.
    Decrease,
}

struct Terms {
    direction: BalanceDirection,
    token: Address,
    recipient: Address,
    amount: u128,
}

/// Terms: `flag(1) ‖ token(20) ‖ recipient(20) ‖ amount(32)`, where flag
/// `0x00` is increase and `0x01` is decrease.
#[derive(Debug, Clone, Copy, Default)]
pub struct Erc20BalanceChangeEnforcer;

impl Erc20BalanceChangeEnforcer {
    pub fn terms(
        direction: BalanceDirection,
        token: &Address,
        recipient: &Address,
        amount: u128,
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(TERMS_LEN);
        out.push(match direction {
            BalanceDirection::Increase => 0x00,
            BalanceDirection::Decrease => 0x01,
        });
        out.extend_from_slice(token.as_bytes());
        out.extend_from_slice(recipient.as_bytes());
        out.extend_from_slice(&u128_word(amount));
        out
    }

    pub fn caveat(
        direction: BalanceDirection,
        token: &Address,
        recipient: &Address,
        amount: u128,
    ) -> Caveat {
        Caveat::new(
            EnforcerKind::Erc20BalanceChange.address(),
            Self::terms(direction, token, recipient, amount),
        )
    }

    fn decode(terms: &[u8]) -> Result<Terms, EnforcerError> {
        if terms.len() != TERMS_LEN {
            return Err(EnforcerError::invalid_terms(format!(
                "{NAME}:invalid-terms-length"
            )));
        }
        let direction = match terms[0] {
            0x00 => BalanceDirection::Increase,
            0x01 => BalanceDirection::Decrease,
            _ => {
                return Err(EnforcerError::invalid_terms(format!(
                    "{NAME}:invalid-direction-flag"
                )))
            }
        };
        let (Some(token), Some(recipient)) = (
            Address::from_slice(&terms[1..21]),
            Address::from_slice(&terms[21..41]),
        ) else {
            return Err(EnforcerError::invalid_terms(format!(
                "{NAME}:invalid-terms-length"
            )));
        };
        Ok(Terms {
            direction,
            token,
            recipient,
            amount: word_terms(&terms[41..], NAME)?,
        })
    }

    /// Lock key: `H(caller ‖ token ‖ recipient ‖ delegation_hash)`.
    fn lock_key(caller: &Address, terms: &Terms, delegation_hash: &H256) -> H256 {
        hash_concat(&[
            caller.as_ref(),
            terms.token.as_ref(),
            terms.recipient.as_ref(),
            delegation_hash.as_ref(),
        ])
    }

    fn snapshot_key(lock: &H256) -> H256 {
        hash_concat(&[b"balance".as_slice(), lock.as_ref()])
    }
}

impl CaveatEnforcer for Erc20BalanceChangeEnforcer {
    fn name(&self) -> &str {
        NAME
    }

    fn before_all_hook(&self, hook: &HookArgs<'_>, env: &mut HookEnv<'_>) -> HookResult {
        let terms = Self::decode(hook.terms)?;
        let lock = Self::lock_key(&env.caller, &terms, &hook.delegation_hash);
        if env.storage.contains(&lock) {
            return Err(EnforcerError::Locked);
        }

        let balance = env.host.token_balance(&terms.token, &terms.recipient);
        env.storage.set(lock, vec![1]);
        env.storage.set_u128(Self::snapshot_key(&lock), balance);
        debug!(token = %terms.token, recipient = %terms.recipient, balance, "balance snapshot");
        Ok(())
    }

    fn after_all_hook(&self, hook: &HookArgs<'_>, env: &mut HookEnv<'_>) -> HookResult {
        let terms = Self::decode(hook.terms)?;
        let lock = Self::lock_key(&env.caller, &terms, &hook.delegation_hash);
        let snapshot_key = Self::snapshot_key(&lock);

        env.storage.remove(&lock);
        let before = env.storage.get_u128(&snapshot_key);
        env.storage.remove(&snapshot_key);

        let after = env.host.token_balance(&terms.token, &terms.recipient);
        match terms.direction {
            BalanceDirection::Increase => {
                match before.checked_add(terms.amount) {
                    Some(min) if after >= min => {}
                    _ => {
                        return Err(EnforcerError::rejected(format!(
                            "{NAME}:insufficient-balance-increase"
                        )))
                    }
                }
            }
            BalanceDirection::Decrease => {
                if before.saturating_sub(after) > terms.amount {
                    return Err(EnforcerError::rejected(format!(
                        "{NAME}:exceeded-balance-decrease"
                    )));
                }
            }
        }
        Ok(())
    }
}
