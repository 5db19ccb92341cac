//! Fixture archives for integration tests.
//!
//! Each fixture is a temporary archive root with one directory per account, a
//! writable store built through sqlx, and optional raw message files.

#![allow(dead_code, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use mailvault_core::{ArchiveConfig, ArchiveService};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

pub const STORE_FILE: &str = "msg-db.sqlite";

const SCHEMA: &[&str] = &[
    "CREATE TABLE messages (
        message_num INTEGER PRIMARY KEY,
        message_filename TEXT UNIQUE,
        message_internaldate TIMESTAMP,
        from_address TEXT
    )",
    "CREATE TABLE labels (message_num INTEGER NOT NULL, label TEXT NOT NULL)",
    "CREATE TABLE uids (message_num INTEGER NOT NULL, uid TEXT NOT NULL)",
    "CREATE TABLE settings (name TEXT PRIMARY KEY, value TEXT)",
];

/// A temporary archive root.
pub struct Archive {
    dir: TempDir,
}

impl Archive {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> ArchiveConfig {
        ArchiveConfig::with_accounts_dir(self.root())
    }

    pub fn service(&self) -> ArchiveService {
        ArchiveService::new(&self.config())
    }

    /// Starts a new account with an empty store.
    pub async fn account(&self, name: &str) -> AccountBuilder {
        let dir = self.root().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.join(STORE_FILE).display());
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap();
        for sql in SCHEMA {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }
        AccountBuilder { dir, pool }
    }
}

/// Populates one account's store and message files.
pub struct AccountBuilder {
    dir: PathBuf,
    pool: SqlitePool,
}

impl AccountBuilder {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Adds a message with a UID, labels and a raw file at `<num>.eml`.
    pub async fn message(&self, num: i64, from: &str, subject: &str, labels: &[&str]) -> &Self {
        self.message_at(num, &timestamp(num), from, subject, labels)
            .await
    }

    /// Like [`Self::message`], received at `internaldate`.
    pub async fn message_at(
        &self,
        num: i64,
        internaldate: &str,
        from: &str,
        subject: &str,
        labels: &[&str],
    ) -> &Self {
        let filename = format!("{num}.eml");
        std::fs::write(self.dir.join(&filename), eml(from, subject)).unwrap();
        self.record_at(num, &filename, internaldate, from, labels)
            .await;
        self.uid(num, &format!("uid-{num}")).await
    }

    /// Adds a message row and its labels without writing a raw file.
    pub async fn record(&self, num: i64, filename: &str, from: &str, labels: &[&str]) -> &Self {
        self.record_at(num, filename, &timestamp(num), from, labels)
            .await
    }

    async fn record_at(
        &self,
        num: i64,
        filename: &str,
        internaldate: &str,
        from: &str,
        labels: &[&str],
    ) -> &Self {
        sqlx::query("INSERT INTO messages VALUES (?, ?, ?, ?)")
            .bind(num)
            .bind(filename)
            .bind(internaldate)
            .bind(from)
            .execute(&self.pool)
            .await
            .unwrap();
        for label in labels {
            sqlx::query("INSERT INTO labels VALUES (?, ?)")
                .bind(num)
                .bind(*label)
                .execute(&self.pool)
                .await
                .unwrap();
        }
        self
    }

    pub async fn uid(&self, num: i64, uid: &str) -> &Self {
        sqlx::query("INSERT INTO uids VALUES (?, ?)")
            .bind(num)
            .bind(uid)
            .execute(&self.pool)
            .await
            .unwrap();
        self
    }

    pub async fn setting(&self, name: &str, value: &str) -> &Self {
        sqlx::query("INSERT INTO settings VALUES (?, ?)")
            .bind(name)
            .bind(value)
            .execute(&self.pool)
            .await
            .unwrap();
        self
    }

    /// Closes the writable pool so the store is only reachable read-only.
    pub async fn finish(self) -> PathBuf {
        self.pool.close().await;
        self.dir
    }
}

/// Receipt timestamp for message `num`: one minute apart, increasing with `num`.
pub fn timestamp(num: i64) -> String {
    format!("2024-01-01 {:02}:{:02}:00", num / 60, num % 60)
}

pub fn eml(from: &str, subject: &str) -> Vec<u8> {
    format!(
        "From: {from}\r\n\
         To: archive@example.com\r\n\
         Subject: {subject}\r\n\
         Date: Mon, 01 Jan 2024 09:00:00 +0000\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         Body of {subject}.\r\n"
    )
    .into_bytes()
}

/// Builds `alice` and `bob`, each with a few labelled messages.
pub async fn two_accounts(archive: &Archive) {
    let alice = archive.account("alice").await;
    alice.setting("email_address", "alice@example.com").await;
    alice.setting("db_version", "6").await;
    alice
        .message(1, "ann@example.com", "Hello", &["INBOX", "Work"])
        .await;
    alice
        .message(2, "bert@example.org", "Lunch", &["INBOX"])
        .await;
    alice.message(3, "ann@example.com", "Notes", &["Work"]).await;
    alice.finish().await;

    let bob = archive.account("bob").await;
    bob.message(1, "zed@example.net", "Ping", &["Personal"]).await;
    bob.finish().await;
}
