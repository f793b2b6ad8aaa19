use crate::address::IntoAddress;
use crate::error::Result;
use alloy::primitives::Address;
use dashmap::DashMap;
use log::info;
use std::sync::Arc;

/// Identity registry: at most one shared handle per normalized address.
///
/// One registry is kept per handle type, so the effective key is
/// `(type, address)`. Lookups take a shard read lock; creation holds the
/// shard write lock only around the check-then-insert, never around I/O.
/// Entries live as long as the registry.
pub struct HandleRegistry<T> {
    by_address: Arc<DashMap<Address, Arc<T>>>,
    chain_id: u64,
}

impl<T> HandleRegistry<T> {
    pub fn new(chain_id: u64) -> Self {
        Self {
            by_address: Arc::new(DashMap::new()),
            chain_id,
        }
    }

    pub fn get_chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Number of registered handles (lock-free)
    pub fn handle_count(&self) -> usize {
        self.by_address.len()
    }

    /// Get an existing handle without creating one
    pub fn get(&self, address: &Address) -> Option<Arc<T>> {
        self.by_address.get(address).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.by_address.contains_key(address)
    }

    /// Return the handle for `raw`, constructing it with `make` if absent.
    ///
    /// When the handle already exists `make` is not called, so arguments the
    /// caller baked into it (mode, context) are ignored and the first
    /// construction wins.
    pub fn get_or_create<F>(&self, raw: impl IntoAddress, make: F) -> Result<Arc<T>>
    where
        F: FnOnce(Address) -> T,
    {
        let address = raw.into_address()?;
        if let Some(existing) = self.get(&address) {
            return Ok(existing);
        }
        let handle = self
            .by_address
            .entry(address)
            .or_insert_with(|| {
                info!("[Chain {}] Registered handle for {}", self.chain_id, address);
                Arc::new(make(address))
            })
            .value()
            .clone();
        Ok(handle)
    }

    /// Get all registered addresses (lock-free)
    pub fn get_all_addresses(&self) -> Vec<Address> {
        self.by_address.iter().map(|entry| *entry.key()).collect()
    }
}

impl<T> Clone for HandleRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            by_address: Arc::clone(&self.by_address),
            chain_id: self.chain_id,
        }
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<T> std::fmt::Debug for HandleRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("handle_count", &self.by_address.len())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use alloy::primitives::address;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

    #[derive(Debug)]
    struct Probe {
        address: Address,
        tag: &'static str,
    }

    #[test]
    fn test_same_address_same_instance() {
        let registry = HandleRegistry::new(1);
        let a = registry
            .get_or_create("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", |address| Probe {
                address,
                tag: "first",
            })
            .unwrap();
        let b = registry
            .get_or_create(WETH, |address| Probe {
                address,
                tag: "second",
            })
            .unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.tag, "first");
        assert_eq!(b.address, WETH);
        assert_eq!(registry.handle_count(), 1);
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let registry: HandleRegistry<Probe> = HandleRegistry::new(1);
        let err = registry
            .get_or_create("not-an-address", |address| Probe { address, tag: "x" })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress(_)));
        assert_eq!(registry.handle_count(), 0);
    }

    #[test]
    fn test_racing_creators_build_once() {
        let registry = HandleRegistry::new(1);
        let built = AtomicUsize::new(0);

        let handles: Vec<Arc<Probe>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..16)
                .map(|_| {
                    scope.spawn(|| {
                        registry
                            .get_or_create(WETH, |address| {
                                built.fetch_add(1, Ordering::SeqCst);
                                Probe { address, tag: "raced" }
                            })
                            .unwrap()
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(handles.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn test_clone_shares_state() {
        let registry = HandleRegistry::new(1);
        registry
            .get_or_create(WETH, |address| Probe { address, tag: "x" })
            .unwrap();

        let cloned = registry.clone();
        assert_eq!(cloned.handle_count(), 1);
        assert!(cloned.contains(&WETH));
        assert_eq!(cloned.get_all_addresses(), vec![WETH]);
    }
}
