//! Credential vault contract.
//!
//! The secure store itself (keychain, keyring, encrypted file) is an
//! external collaborator; this crate only consumes its save/read/delete
//! contract, keyed by the opaque `credential_ref` on each account.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Opaque secret store. Calls are synchronous and safe to issue from
/// concurrent fetch paths since each account uses its own key.
pub trait CredentialVault: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    fn save(&self, value: &str, key: &str);

    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> Option<String>;

    /// Remove the value stored under `key`. No-op if absent.
    fn delete(&self, key: &str);
}

/// Process-lifetime vault used in tests and by embedders that supply their
/// own durable secret storage elsewhere.
#[derive(Default)]
pub struct MemoryVault {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialVault for MemoryVault {
    fn save(&self, value: &str, key: &str) {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
    }

    fn read(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn delete(&self, key: &str) {
        self.entries.write().remove(key);
    }
}
