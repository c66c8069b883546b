pub mod codec;
pub mod config;
pub mod enforcer;
pub mod enforcers;
pub mod error;
pub mod events;
pub mod hash;
pub mod host;
pub mod manager;
pub mod registry;
pub mod signature;
pub mod sim;
pub mod types;
pub mod validator;

// Convenience re-exports
pub use codec::{Erc20Call, ExecType, Execution, ExecutionMode};
pub use config::ManagerConfig;
pub use enforcer::{CaveatEnforcer, EnforcerRegistry, HookKind};
pub use enforcers::EnforcerKind;
pub use error::{DelegationError, DelegationResult, ErrorClass};
pub use events::ManagerEvent;
pub use host::{CallerContext, Host, HostView, Revert};
pub use manager::{DelegationManager, Redemption, RedemptionPhase, RedemptionRequest};
pub use types::{Address, Caveat, Delegation, ANY_DELEGATE, H256, ROOT_AUTHORITY};
