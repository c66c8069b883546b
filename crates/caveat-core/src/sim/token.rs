use crate::host::Revert;
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fungible token balances and allowances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    pub symbol: String,
    balances: BTreeMap<Address, u128>,
    allowances: BTreeMap<(Address, Address), u128>,
}

impl TokenLedger {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    pub fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    pub fn mint(&mut self, to: Address, amount: u128) -> Result<(), Revert> {
        let balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or_else(|| Revert::with_reason("token: balance overflow"))?;
        self.balances.insert(to, balance);
        Ok(())
    }

    pub fn approve(&mut self, owner: Address, spender: Address, amount: u128) {
        self.allowances.insert((owner, spender), amount);
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), Revert> {
        let from_balance = self
            .balance_of(&from)
            .checked_sub(amount)
            .ok_or_else(|| Revert::with_reason("token: transfer amount exceeds balance"))?;
        self.balances.insert(from, from_balance);
        let to_balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or_else(|| Revert::with_reason("token: balance overflow"))?;
        self.balances.insert(to, to_balance);
        Ok(())
    }

    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), Revert> {
        let remaining = self
            .allowance(&from, &spender)
            .checked_sub(amount)
            .ok_or_else(|| Revert::with_reason("token: insufficient allowance"))?;
        self.transfer(from, to, amount)?;
        self.allowances.insert((from, spender), remaining);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_and_allowance() {
        let alice = Address::derive("alice");
        let bob = Address::derive("bob");
        let mut token = TokenLedger::new("TKN");
        token.mint(alice, 100).unwrap();

        token.transfer(alice, bob, 40).unwrap();
        assert_eq!(token.balance_of(&alice), 60);
        assert_eq!(token.balance_of(&bob), 40);

        let err = token.transfer(bob, alice, 41).unwrap_err();
        assert_eq!(err.reason.as_deref(), Some("token: transfer amount exceeds balance"));

        token.approve(alice, bob, 10);
        token.transfer_from(bob, alice, bob, 10).unwrap();
        assert_eq!(token.allowance(&alice, &bob), 0);
        assert!(token.transfer_from(bob, alice, bob, 1).is_err());
    }
}
