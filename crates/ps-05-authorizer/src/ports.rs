//! Outbound ports of the authorizer.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

use crate::account::AccountRecord;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("account directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup of account records by account reference.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// `Ok(None)` means the account does not exist; `Err` means the
    /// directory itself could not answer.
    async fn lookup(&self, account_ref: &str) -> Result<Option<AccountRecord>, DirectoryError>;
}

/// Directory backed by an in-process map. Production deployments put a
/// remote directory behind the same port; tests and the bundled runtime
/// use this one.
pub struct InMemoryDirectory {
    accounts: RwLock<HashMap<String, AccountRecord>>,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(&self, account_ref: impl Into<String>, record: AccountRecord) {
        self.accounts.write().insert(account_ref.into(), record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountDirectory for InMemoryDirectory {
    async fn lookup(&self, account_ref: &str) -> Result<Option<AccountRecord>, DirectoryError> {
        Ok(self.accounts.read().get(account_ref).cloned())
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;

    /// Directory that always fails, for exercising the internal-fault path.
    pub struct FailingDirectory;

    #[async_trait]
    impl AccountDirectory for FailingDirectory {
        async fn lookup(
            &self,
            _account_ref: &str,
        ) -> Result<Option<AccountRecord>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".into()))
        }
    }
}
