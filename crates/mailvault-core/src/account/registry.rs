//! Account registry backed by a directory scan.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::model::AccountId;
use crate::Result;

/// Enumerates the accounts present under an archive root.
///
/// Nothing is cached: every call rescans the directory.
#[derive(Debug, Clone)]
pub struct AccountRegistry {
    root: PathBuf,
    store_file: String,
}

impl AccountRegistry {
    /// Creates a registry for `root`, recognising accounts by `store_file`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, store_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            store_file: store_file.into(),
        }
    }

    /// The archive root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding an account's store and raw message files.
    #[must_use]
    pub fn account_dir(&self, id: &AccountId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Expected location of an account's store file.
    #[must_use]
    pub fn store_path(&self, id: &AccountId) -> PathBuf {
        self.account_dir(id).join(&self.store_file)
    }

    /// Returns true if the account has a store file on disk.
    pub async fn contains(&self, id: &AccountId) -> bool {
        is_file(&self.store_path(id)).await
    }

    /// Lists accounts in lexicographic order.
    ///
    /// A missing root yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the root exists but cannot be read.
    pub async fn list_accounts(&self) -> Result<Vec<AccountId>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Archive root {} does not exist", self.root.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut accounts = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                warn!("Skipping non UTF-8 entry in {}", self.root.display());
                continue;
            };
            let Ok(id) = AccountId::parse(name) else {
                continue;
            };
            if is_file(&self.store_path(&id)).await {
                accounts.push(id);
            }
        }

        accounts.sort();
        debug!("Found {} account(s) in {}", accounts.len(), self.root.display());
        Ok(accounts)
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}
