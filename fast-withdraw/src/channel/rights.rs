//! Deposit rights registry
//!
//! At most one deposit may be in flight per `(session, asset)` pair. The
//! registry hands out a guard per pair; dropping the guard releases it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{FlowError, Result};

type RightsKey = (String, String);

#[derive(Debug, Default)]
pub struct DepositRightsRegistry {
    held: Mutex<HashSet<RightsKey>>,
}

impl DepositRightsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the rights for `(session, asset_id)`.
    ///
    /// # Returns
    ///
    /// * `Ok(DepositRightsGuard)` - Rights held until the guard is dropped
    /// * `Err(FlowError::RightsConflict)` - Another deposit holds the pair
    pub fn try_acquire(self: &Arc<Self>, session: &str, asset_id: &str) -> Result<DepositRightsGuard> {
        let key = (session.to_string(), asset_id.to_lowercase());
        if !self.lock().insert(key.clone()) {
            return Err(FlowError::RightsConflict {
                session: session.to_string(),
                asset_id: asset_id.to_string(),
            });
        }
        debug!(session, asset_id, "Acquired deposit rights");

        Ok(DepositRightsGuard {
            registry: Arc::clone(self),
            key,
        })
    }

    pub fn is_held(&self, session: &str, asset_id: &str) -> bool {
        self.lock()
            .contains(&(session.to_string(), asset_id.to_lowercase()))
    }

    fn release(&self, key: &RightsKey) {
        self.lock().remove(key);
        debug!(session = %key.0, asset_id = %key.1, "Released deposit rights");
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<RightsKey>> {
        // The set stays consistent even if a holder panicked.
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Held deposit rights for one `(session, asset)` pair.
#[derive(Debug)]
pub struct DepositRightsGuard {
    registry: Arc<DepositRightsRegistry>,
    key: RightsKey,
}

impl Drop for DepositRightsGuard {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}
