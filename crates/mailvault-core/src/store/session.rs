//! Process-wide archive session.
//!
//! The session owns at most one open store. Opening, switching and closing take the
//! write side of the lock; queries hold the read side, so they may run in parallel
//! against an unchanging connection but never across a switch.

use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

use super::connection::OpenStore;
use crate::account::{AccountId, AccountRegistry};
use crate::config::ArchiveConfig;
use crate::{Error, Result};

/// Owner of the single archive connection and the current-account state.
#[derive(Debug)]
pub struct ArchiveSession {
    registry: AccountRegistry,
    state: RwLock<Option<OpenStore>>,
}

impl ArchiveSession {
    /// Creates a closed session for the archive described by `config`.
    #[must_use]
    pub fn new(config: &ArchiveConfig) -> Self {
        Self::with_registry(AccountRegistry::new(
            config.accounts_dir.clone(),
            config.store_file.clone(),
        ))
    }

    /// Creates a closed session over an existing registry.
    #[must_use]
    pub fn with_registry(registry: AccountRegistry) -> Self {
        Self {
            registry,
            state: RwLock::new(None),
        }
    }

    /// The account registry backing this session.
    #[must_use]
    pub const fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    /// Opens `account`, closing any other open account first.
    ///
    /// Reopening the active account is a no-op while its connection is healthy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AccountNotFound`] if the account has no store file; the
    /// previously active account stays open in that case.
    pub async fn open_account(&self, account: &AccountId) -> Result<()> {
        let mut state = self.state.write().await;
        self.open_locked(&mut state, account).await
    }

    /// The currently open account, if any.
    pub async fn current_account(&self) -> Option<AccountId> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|store| store.account().clone())
    }

    /// Closes the open account. Closing a closed session does nothing.
    pub async fn close(&self) {
        let previous = self.state.write().await.take();
        if let Some(store) = previous {
            info!("Closing account {}", store.account());
            store.close().await;
        }
    }

    /// Makes sure some account is open, picking the first one if none is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAccountsAvailable`] if the archive root has no accounts.
    pub async fn ensure_selected(&self) -> Result<AccountId> {
        if let Some(account) = self.current_account().await {
            return Ok(account);
        }

        let mut state = self.state.write().await;
        if let Some(store) = state.as_ref() {
            return Ok(store.account().clone());
        }

        let first = self
            .registry
            .list_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NoAccountsAvailable)?;
        debug!("No account selected, defaulting to {first}");
        self.open_locked(&mut state, &first).await?;
        Ok(first)
    }

    /// Read access to the open store, selecting a default account if needed.
    ///
    /// Hold the guard only for the duration of the queries; switching accounts waits
    /// until every guard is released.
    ///
    /// # Errors
    ///
    /// Returns an error if no account can be selected.
    pub async fn store(&self) -> Result<RwLockReadGuard<'_, OpenStore>> {
        loop {
            if let Ok(store) = RwLockReadGuard::try_map(self.state.read().await, Option::as_ref) {
                return Ok(store);
            }
            // A concurrent close can win between selecting and reading; try again.
            self.ensure_selected().await?;
        }
    }

    async fn open_locked(
        &self,
        state: &mut Option<OpenStore>,
        account: &AccountId,
    ) -> Result<()> {
        if let Some(store) = state.as_ref()
            && store.account() == account
            && store.is_healthy().await
        {
            debug!("Account {account} already open");
            return Ok(());
        }

        if !self.registry.contains(account).await {
            return Err(Error::AccountNotFound(account.to_string()));
        }

        if let Some(previous) = state.take() {
            previous.close().await;
        }

        let store = OpenStore::open(
            account.clone(),
            self.registry.account_dir(account),
            &self.registry.store_path(account),
        )
        .await?;
        info!("Opened account {account}");
        *state = Some(store);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::Path;

    async fn create_account(root: &Path, name: &str, label: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.join("msg-db.sqlite").display());
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE labels (message_num INTEGER NOT NULL, label TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO labels VALUES (1, ?)")
            .bind(label)
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    fn session(root: &Path) -> ArchiveSession {
        ArchiveSession::new(&ArchiveConfig::with_accounts_dir(root))
    }

    #[tokio::test]
    async fn test_starts_closed() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        assert!(session.current_account().await.is_none());
    }

    #[tokio::test]
    async fn test_ensure_selected_picks_first_account() {
        let dir = tempfile::tempdir().unwrap();
        create_account(dir.path(), "bob", "b").await;
        create_account(dir.path(), "alice", "a").await;
        let session = session(dir.path());

        let picked = session.ensure_selected().await.unwrap();
        assert_eq!(picked.as_str(), "alice");
        assert_eq!(session.current_account().await, Some(picked));
    }

    #[tokio::test]
    async fn test_ensure_selected_without_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        assert!(matches!(
            session.ensure_selected().await,
            Err(Error::NoAccountsAvailable)
        ));
    }

    #[tokio::test]
    async fn test_switch_and_close() {
        let dir = tempfile::tempdir().unwrap();
        create_account(dir.path(), "alice", "a").await;
        create_account(dir.path(), "bob", "b").await;
        let session = session(dir.path());
        let alice = AccountId::parse("alice").unwrap();
        let bob = AccountId::parse("bob").unwrap();

        session.open_account(&alice).await.unwrap();
        session.open_account(&alice).await.unwrap();
        assert_eq!(session.current_account().await, Some(alice));

        session.open_account(&bob).await.unwrap();
        assert_eq!(session.current_account().await, Some(bob));

        session.close().await;
        session.close().await;
        assert!(session.current_account().await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_account_keeps_current() {
        let dir = tempfile::tempdir().unwrap();
        create_account(dir.path(), "alice", "a").await;
        let session = session(dir.path());
        let alice = AccountId::parse("alice").unwrap();
        session.open_account(&alice).await.unwrap();

        let result = session.open_account(&AccountId::parse("nope").unwrap()).await;
        assert!(matches!(result, Err(Error::AccountNotFound(name)) if name == "nope"));
        assert_eq!(session.current_account().await, Some(alice));
        assert!(session.store().await.unwrap().is_healthy().await);
    }

    #[tokio::test]
    async fn test_store_auto_selects() {
        let dir = tempfile::tempdir().unwrap();
        create_account(dir.path(), "alice", "a").await;
        let session = session(dir.path());

        let store = session.store().await.unwrap();
        assert_eq!(store.account().as_str(), "alice");
    }
}
