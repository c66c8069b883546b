use super::EnforcerKind;
use crate::enforcer::{CaveatEnforcer, EnforcerError, HookArgs, HookEnv, HookResult};
use crate::types::Caveat;

const NAME: &str = "TimestampEnforcer";

/// Time window for redemption.
///
/// Terms: `after(16) ‖ before(16)`, seconds, big-endian. Zero leaves that
/// side unbounded. Host time must be strictly inside the window.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampEnforcer;

impl TimestampEnforcer {
    pub fn terms(after: u128, before: u128) -> Vec<u8> {
        let mut out = Vec::with_capacity(32);
        out.extend_from_slice(&after.to_be_bytes());
        out.extend_from_slice(&before.to_be_bytes());
        out
    }

    pub fn caveat(after: u128, before: u128) -> Caveat {
        Caveat::new(EnforcerKind::Timestamp.address(), Self::terms(after, before))
    }

    fn decode(terms: &[u8]) -> Result<(u128, u128), EnforcerError> {
        if terms.len() != 32 {
            return Err(EnforcerError::invalid_terms(format!(
                "{NAME}:invalid-terms-length"
            )));
        }
        let mut after = [0u8; 16];
        let mut before = [0u8; 16];
        after.copy_from_slice(&terms[..16]);
        before.copy_from_slice(&terms[16..]);
        let window = (u128::from_be_bytes(after), u128::from_be_bytes(before));
        if window == (0, 0) {
            return Err(EnforcerError::invalid_terms(format!(
                "{NAME}:invalid-time-window"
            )));
        }
        Ok(window)
    }
}

impl CaveatEnforcer for TimestampEnforcer {
    fn name(&self) -> &str {
        NAME
    }

    fn before_hook(&self, hook: &HookArgs<'_>, env: &mut HookEnv<'_>) -> HookResult {
        let (after, before) = Self::decode(hook.terms)?;
        let now = u128::from(env.host.timestamp());

        if after != 0 && now <= after {
            return Err(EnforcerError::rejected(format!("{NAME}:early-delegation")));
        }
        if before != 0 && now >= before {
            return Err(EnforcerError::rejected(format!("{NAME}:expired-delegation")));
        }
        Ok(())
    }
}
