//! Simulation host: smart accounts, tokens and a clock in memory.

mod account;
mod token;
mod world;

pub use account::{AccountValidator, SmartAccount};
pub use token::TokenLedger;
pub use world::{FailedCall, World};
