//! Lookups the dispatcher needs to address and word a notification.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::{DriverId, MerchantId};
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantProfile {
    pub name: String,
    pub pickup_address: String,
}

impl MerchantProfile {
    pub fn new(name: impl Into<String>, pickup_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pickup_address: pickup_address.into(),
        }
    }
}

/// Resolves merchant profiles and the pool of drivers who see available
/// orders. There is no geographic filtering: the pool is everyone.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn merchant_profile(&self, merchant_id: MerchantId) -> Result<Option<MerchantProfile>>;

    async fn driver_pool(&self) -> Result<Vec<DriverId>>;
}

#[derive(Debug, Default)]
struct InMemoryDirectoryState {
    merchants: HashMap<MerchantId, MerchantProfile>,
    drivers: BTreeSet<DriverId>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a merchant's profile.
    pub fn register_merchant(&self, merchant_id: MerchantId, profile: MerchantProfile) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .merchants
            .insert(merchant_id, profile);
    }

    /// Adds a driver to the pool. Returns `false` if already there.
    pub fn add_driver(&self, driver_id: DriverId) -> bool {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drivers
            .insert(driver_id)
    }

    pub fn remove_driver(&self, driver_id: DriverId) -> bool {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drivers
            .remove(&driver_id)
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn merchant_profile(&self, merchant_id: MerchantId) -> Result<Option<MerchantProfile>> {
        Ok(self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .merchants
            .get(&merchant_id)
            .cloned())
    }

    async fn driver_pool(&self) -> Result<Vec<DriverId>> {
        Ok(self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .drivers
            .iter()
            .copied()
            .collect())
    }
}
