//! Process exit codes for `caveat`.
//!
//! `0..=2` describe the command itself. Redemption failures reported by
//! `caveat verify` use the error-class codes from
//! [`caveat_core::ErrorClass::exit_code`] (10-14).

pub const SUCCESS: i32 = 0;
pub const EXPECTATION_MISMATCH: i32 = 1; // A scenario step did not match its expected outcome
pub const CONFIG_ERROR: i32 = 2; // Unreadable input, bad scenario or key file
