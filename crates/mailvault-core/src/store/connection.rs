//! A single read-only connection to one account's store.

use std::path::{Path, PathBuf};

use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Execute, Sqlite};
use tracing::debug;

use super::guard;
use crate::account::AccountId;
use crate::Result;

/// Bound, guarded query for the archive store.
pub(crate) type StoreQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// An open, read-only archive store.
///
/// There is no execute path: statements can only be fetched, and each one is
/// classified before it reaches the driver.
#[derive(Debug)]
pub struct OpenStore {
    account: AccountId,
    account_dir: PathBuf,
    pool: SqlitePool,
}

impl OpenStore {
    /// Opens `store_path` read-only for `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or the driver cannot open it.
    pub(crate) async fn open(
        account: AccountId,
        account_dir: PathBuf,
        store_path: &Path,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(store_path)
            .read_only(true)
            .create_if_missing(false)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .after_connect(|conn, _meta| Box::pin(async move { guard::install(conn).await }))
            .connect_with(options)
            .await
            .map_err(guard::classify)?;

        debug!("Opened {} read-only", store_path.display());
        Ok(Self {
            account,
            account_dir,
            pool,
        })
    }

    /// Account this store belongs to.
    #[must_use]
    pub const fn account(&self) -> &AccountId {
        &self.account
    }

    /// Directory holding the account's raw message files.
    #[must_use]
    pub fn account_dir(&self) -> &Path {
        &self.account_dir
    }

    /// Builds a query after checking that `sql` cannot write.
    #[allow(clippy::unused_self)]
    pub(crate) fn statement<'q>(&self, sql: &'q str) -> Result<StoreQuery<'q>> {
        guard::check_statement(sql)?;
        Ok(sqlx::query(sql))
    }

    /// Re-checks an already built query, for SQL assembled at runtime.
    #[allow(clippy::unused_self)]
    pub(crate) fn checked<'q>(&self, query: StoreQuery<'q>) -> Result<StoreQuery<'q>> {
        guard::check_statement(query.sql())?;
        Ok(query)
    }

    pub(crate) async fn fetch_all(&self, query: StoreQuery<'_>) -> Result<Vec<SqliteRow>> {
        query.fetch_all(&self.pool).await.map_err(guard::classify)
    }

    pub(crate) async fn fetch_optional(
        &self,
        query: StoreQuery<'_>,
    ) -> Result<Option<SqliteRow>> {
        query
            .fetch_optional(&self.pool)
            .await
            .map_err(guard::classify)
    }

    pub(crate) async fn fetch_one(&self, query: StoreQuery<'_>) -> Result<SqliteRow> {
        query.fetch_one(&self.pool).await.map_err(guard::classify)
    }

    /// Returns true if the connection answers a trivial query.
    pub(crate) async fn is_healthy(&self) -> bool {
        if self.pool.is_closed() {
            return false;
        }
        match self.statement("SELECT 1") {
            Ok(query) => self.fetch_one(query).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Releases the connection.
    pub(crate) async fn close(self) {
        self.pool.close().await;
        debug!("Closed store for account {}", self.account);
    }

    #[cfg(test)]
    pub(crate) const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
