//! Manager events.
//!
//! # Event Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | `caveat.delegation.redeemed.v1` | One per delegation in a redeemed chain |
//! | `caveat.delegation.disabled.v1` | Revocation |
//! | `caveat.delegation.enabled.v1` | Revocation lifted |
//! | `caveat.delegation.registered.v1` | Pre-registration |
//! | `caveat.manager.paused.v1` | Circuit breaker engaged |
//! | `caveat.manager.unpaused.v1` | Circuit breaker released |
//! | `caveat.manager.ownership_transfer_started.v1` | Pending owner set |
//! | `caveat.manager.ownership_transferred.v1` | Owner changed |

use crate::types::{Address, Delegation, H256};
use serde::{Deserialize, Serialize};

pub const EVENT_TYPE_REDEEMED: &str = "caveat.delegation.redeemed.v1";
pub const EVENT_TYPE_DISABLED: &str = "caveat.delegation.disabled.v1";
pub const EVENT_TYPE_ENABLED: &str = "caveat.delegation.enabled.v1";
pub const EVENT_TYPE_REGISTERED: &str = "caveat.delegation.registered.v1";
pub const EVENT_TYPE_PAUSED: &str = "caveat.manager.paused.v1";
pub const EVENT_TYPE_UNPAUSED: &str = "caveat.manager.unpaused.v1";
pub const EVENT_TYPE_OWNERSHIP_TRANSFER_STARTED: &str =
    "caveat.manager.ownership_transfer_started.v1";
pub const EVENT_TYPE_OWNERSHIP_TRANSFERRED: &str = "caveat.manager.ownership_transferred.v1";

/// Payload shared by revocation and registration events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRecord {
    pub hash: H256,
    pub delegator: Address,
    pub delegate: Address,
    pub delegation: Delegation,
}

impl DelegationRecord {
    pub fn new(hash: H256, delegation: &Delegation) -> Self {
        Self {
            hash,
            delegator: delegation.delegator,
            delegate: delegation.delegate,
            delegation: delegation.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManagerEvent {
    /// `root_delegator` is the account the chain executed against.
    RedeemedDelegation {
        root_delegator: Address,
        redeemer: Address,
        delegation_hash: H256,
    },
    DisabledDelegation(DelegationRecord),
    EnabledDelegation(DelegationRecord),
    RegisteredDelegation(DelegationRecord),
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
    OwnershipTransferStarted {
        previous: Address,
        pending: Address,
    },
    OwnershipTransferred {
        previous: Address,
        owner: Address,
    },
}

impl ManagerEvent {
    /// Stable versioned type string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RedeemedDelegation { .. } => EVENT_TYPE_REDEEMED,
            Self::DisabledDelegation(_) => EVENT_TYPE_DISABLED,
            Self::EnabledDelegation(_) => EVENT_TYPE_ENABLED,
            Self::RegisteredDelegation(_) => EVENT_TYPE_REGISTERED,
            Self::Paused { .. } => EVENT_TYPE_PAUSED,
            Self::Unpaused { .. } => EVENT_TYPE_UNPAUSED,
            Self::OwnershipTransferStarted { .. } => EVENT_TYPE_OWNERSHIP_TRANSFER_STARTED,
            Self::OwnershipTransferred { .. } => EVENT_TYPE_OWNERSHIP_TRANSFERRED,
        }
    }
}
