use super::CaveatEnforcer;
use crate::types::Address;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// `EnforcerId → implementation`, resolved at call time.
#[derive(Clone, Default)]
pub struct EnforcerRegistry {
    enforcers: BTreeMap<Address, Arc<dyn CaveatEnforcer>>,
}

impl EnforcerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the reference enforcer catalog.
    pub fn with_catalog() -> Self {
        let mut registry = Self::new();
        crate::enforcers::register_catalog(&mut registry);
        registry
    }

    /// Install `enforcer` at `address`, returning any implementation it replaced.
    pub fn register(
        &mut self,
        address: Address,
        enforcer: Arc<dyn CaveatEnforcer>,
    ) -> Option<Arc<dyn CaveatEnforcer>> {
        self.enforcers.insert(address, enforcer)
    }

    pub fn with(mut self, address: Address, enforcer: impl CaveatEnforcer + 'static) -> Self {
        self.register(address, Arc::new(enforcer));
        self
    }

    pub fn get(&self, address: &Address) -> Option<Arc<dyn CaveatEnforcer>> {
        self.enforcers.get(address).cloned()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.enforcers.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.enforcers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enforcers.is_empty()
    }
}

impl fmt::Debug for EnforcerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.enforcers.iter().map(|(addr, e)| (addr, e.name())))
            .finish()
    }
}
