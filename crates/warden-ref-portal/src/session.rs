//! A session-backed grant writer without batch support.
//!
//! Models a session store that persists one key per request: every write is
//! visible immediately and there is no way to roll several keys back
//! together. Keys held open by another session are locked and reject writes.

use std::collections::BTreeSet;

use tracing::debug;

use warden_contracts::{
    error::{WardenError, WardenResult},
    key::PermissionKey,
    principal::Principal,
};
use warden_core::traits::GrantWriter;

pub struct SessionGrantWriter {
    principal: Principal,
    locked: BTreeSet<String>,
    requests: usize,
}

impl SessionGrantWriter {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            locked: BTreeSet::new(),
            requests: 0,
        }
    }

    /// Reject writes to `key` as if another session held it.
    pub fn lock(mut self, key: &str) -> Self {
        self.locked.insert(key.to_string());
        self
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Number of write requests that reached the store.
    pub fn requests(&self) -> usize {
        self.requests
    }

    pub fn into_principal(self) -> Principal {
        self.principal
    }
}

impl GrantWriter for SessionGrantWriter {
    fn subject(&self) -> &str {
        &self.principal.id.0
    }

    fn write(&mut self, key: &PermissionKey, granted: bool) -> WardenResult<()> {
        let encoded = key.to_string();
        if self.locked.contains(&encoded) {
            return Err(WardenError::WriteFailed {
                key: encoded,
                reason: "key is locked by another session".to_string(),
            });
        }
        self.requests += 1;
        self.principal.grants.set(key, granted);
        debug!(subject = %self.principal.id, key = %encoded, granted, "session grant persisted");
        Ok(())
    }
}
