//! Durable registry of configured LMS accounts and their course lists.
//!
//! Explicitly constructed (no process-wide singleton); every mutation
//! serializes the full account list and writes it back synchronously, so
//! callers must not assume incremental persistence. Secrets live only in
//! the vault, referenced by `credential_ref`.

use crate::models::{Account, Course, LmsKind};
use crate::vault::CredentialVault;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

pub struct AccountRegistry {
    path: PathBuf,
    vault: Arc<dyn CredentialVault>,
    accounts: RwLock<Vec<Account>>,
}

impl AccountRegistry {
    /// Open the registry at `path`, loading any previously persisted
    /// accounts. A missing or undecodable file starts empty; a corrupt
    /// registry is recoverable by reconfiguring, not fatal.
    #[tracing::instrument(level = "debug", skip(vault))]
    pub fn open(path: impl Into<PathBuf> + std::fmt::Debug, vault: Arc<dyn CredentialVault>) -> Self {
        let path = path.into();
        let accounts = Self::load(&path);
        Self {
            path,
            vault,
            accounts: RwLock::new(accounts),
        }
    }

    fn load(path: &Path) -> Vec<Account> {
        let Ok(bytes) = std::fs::read(path) else {
            return Vec::new();
        };
        match serde_json::from_slice(&bytes) {
            Ok(accounts) => accounts,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "account file failed to decode, starting empty");
                Vec::new()
            }
        }
    }

    fn persist(&self, accounts: &[Account]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::storage("create registry dir", e))?;
        }
        let bytes = serde_json::to_vec_pretty(accounts)
            .map_err(|e| Error::storage("serialize accounts", e))?;
        std::fs::write(&self.path, bytes).map_err(|e| Error::storage("write account file", e))
    }

    /// Append an account and store its token in the vault.
    ///
    /// No uniqueness check on nickname or base_url: duplicate accounts are
    /// permitted.
    #[tracing::instrument(level = "info", skip(self, account, token), fields(account_id = %account.id))]
    pub fn add_account(&self, account: Account, token: &str) -> Result<()> {
        let mut accounts = self.accounts.write();
        self.vault.save(token, &account.credential_ref);
        accounts.push(account);
        self.persist(&accounts)
    }

    /// Remove an account and its vault entry. Unknown ids are a silent no-op.
    #[tracing::instrument(level = "info", skip(self))]
    pub fn remove_account(&self, id: Uuid) -> Result<()> {
        let mut accounts = self.accounts.write();
        let Some(position) = accounts.iter().position(|a| a.id == id) else {
            return Ok(());
        };
        let removed = accounts.remove(position);
        self.vault.delete(&removed.credential_ref);
        self.persist(&accounts)
    }

    pub fn all_accounts(&self) -> Vec<Account> {
        self.accounts.read().clone()
    }

    pub fn accounts_for(&self, kind: LmsKind) -> Vec<Account> {
        self.accounts
            .read()
            .iter()
            .filter(|a| a.lms_kind == kind)
            .cloned()
            .collect()
    }

    pub fn enabled_accounts_for(&self, kind: LmsKind) -> Vec<Account> {
        self.accounts
            .read()
            .iter()
            .filter(|a| a.lms_kind == kind && a.enabled)
            .cloned()
            .collect()
    }

    pub fn get_account(&self, id: Uuid) -> Option<Account> {
        self.accounts.read().iter().find(|a| a.id == id).cloned()
    }

    /// Flip the enabled flag; returns the new state.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn toggle_account(&self, id: Uuid) -> Result<bool> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("account '{id}' not found")))?;
        account.enabled = !account.enabled;
        let enabled = account.enabled;
        self.persist(&accounts)?;
        Ok(enabled)
    }

    /// Full replace of the course list (not a merge): callers pass the
    /// complete desired list. Returns the stored list.
    #[tracing::instrument(level = "debug", skip(self, courses))]
    pub fn update_courses(&self, id: Uuid, courses: Vec<Course>) -> Result<Vec<Course>> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("account '{id}' not found")))?;
        account.courses = courses;
        let stored = account.courses.clone();
        self.persist(&accounts)?;
        Ok(stored)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn update_nickname(
        &self,
        id: Uuid,
        name: impl Into<String> + std::fmt::Debug,
    ) -> Result<String> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("nickname is empty".to_string()));
        }
        let mut accounts = self.accounts.write();
        let account = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("account '{id}' not found")))?;
        account.nickname = name;
        let nickname = account.nickname.clone();
        self.persist(&accounts)?;
        Ok(nickname)
    }

    /// Re-save the token for an existing account without touching the
    /// persisted account list.
    #[tracing::instrument(level = "debug", skip(self, token))]
    pub fn update_token(&self, id: Uuid, token: &str) -> Result<()> {
        let accounts = self.accounts.read();
        let account = accounts
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("account '{id}' not found")))?;
        self.vault.save(token, &account.credential_ref);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::MemoryVault;

    fn registry(dir: &tempfile::TempDir) -> (AccountRegistry, Arc<MemoryVault>) {
        let vault = Arc::new(MemoryVault::new());
        let registry = AccountRegistry::open(dir.path().join("accounts.json"), vault.clone());
        (registry, vault)
    }

    fn canvas_account() -> Account {
        Account::new(LmsKind::Canvas, "https://x.edu/api/v1", "school").unwrap()
    }

    #[test]
    fn add_stores_token_and_persists_without_secret() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, vault) = registry(&dir);

        let account = canvas_account();
        let key = account.credential_ref.clone();
        registry.add_account(account, "tok-123").unwrap();

        assert_eq!(vault.read(&key).as_deref(), Some("tok-123"));
        let persisted = std::fs::read_to_string(dir.path().join("accounts.json")).unwrap();
        assert!(!persisted.contains("tok-123"));
    }

    #[test]
    fn duplicate_accounts_are_permitted() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _vault) = registry(&dir);

        registry.add_account(canvas_account(), "a").unwrap();
        registry.add_account(canvas_account(), "b").unwrap();
        assert_eq!(registry.accounts_for(LmsKind::Canvas).len(), 2);
    }

    #[test]
    fn remove_deletes_vault_entry_and_ignores_unknown_ids() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, vault) = registry(&dir);

        let account = canvas_account();
        let id = account.id;
        let key = account.credential_ref.clone();
        registry.add_account(account, "tok").unwrap();

        registry.remove_account(id).unwrap();
        assert_eq!(vault.read(&key), None);
        assert!(registry.all_accounts().is_empty());

        // Unknown id: silent no-op.
        registry.remove_account(Uuid::new_v4()).unwrap();
    }

    #[test]
    fn toggle_returns_new_state_and_fails_on_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _vault) = registry(&dir);

        let account = canvas_account();
        let id = account.id;
        registry.add_account(account, "tok").unwrap();

        assert!(!registry.toggle_account(id).unwrap());
        assert!(registry.toggle_account(id).unwrap());
        assert!(registry.enabled_accounts_for(LmsKind::Canvas).len() == 1);
        assert!(matches!(
            registry.toggle_account(Uuid::new_v4()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn update_courses_is_a_full_replace() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _vault) = registry(&dir);

        let account = canvas_account();
        let id = account.id;
        registry.add_account(account, "tok").unwrap();

        let one = Course::new(
            "100",
            "https://x.edu/api/v1",
            LmsKind::Canvas,
            None,
            Some("Writing 101".to_string()),
            None,
            true,
        )
        .unwrap();
        let stored = registry.update_courses(id, vec![one.clone()]).unwrap();
        assert_eq!(stored.len(), 1);

        let two = Course::new(
            "200",
            "https://x.edu/api/v1",
            LmsKind::Canvas,
            None,
            None,
            None,
            false,
        )
        .unwrap();
        let stored = registry.update_courses(id, vec![two]).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, "200");
    }

    #[test]
    fn update_nickname_persists_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, _vault) = registry(&dir);

        let account = canvas_account();
        let id = account.id;
        registry.add_account(account, "tok").unwrap();

        assert_eq!(registry.update_nickname(id, "uni").unwrap(), "uni");
        assert!(matches!(
            registry.update_nickname(id, "  "),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn reopen_restores_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(MemoryVault::new());
        let path = dir.path().join("accounts.json");

        let account = canvas_account();
        let id = account.id;
        {
            let registry = AccountRegistry::open(path.clone(), vault.clone());
            registry.add_account(account, "tok").unwrap();
        }

        let registry = AccountRegistry::open(path, vault);
        let reloaded = registry.get_account(id).unwrap();
        assert_eq!(reloaded.nickname, "school");
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(&path, b"{not json").unwrap();

        let registry = AccountRegistry::open(path, Arc::new(MemoryVault::new()));
        assert!(registry.all_accounts().is_empty());
    }

    #[test]
    fn update_token_overwrites_vault_entry_only() {
        let dir = tempfile::tempdir().unwrap();
        let (registry, vault) = registry(&dir);

        let account = canvas_account();
        let id = account.id;
        let key = account.credential_ref.clone();
        registry.add_account(account, "old").unwrap();

        registry.update_token(id, "new").unwrap();
        assert_eq!(vault.read(&key).as_deref(), Some("new"));
        assert!(matches!(
            registry.update_token(Uuid::new_v4(), "x"),
            Err(Error::NotFound(_))
        ));
    }
}
