//! Queries against the open archive store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;

use super::model::{
    AccountScope, LabelPage, ListRequest, MAX_SENDER_RESULTS, MIN_SENDER_QUERY_CHARS,
    MessageWithLabels, ScopedMessage, SystemInfo,
};
use crate::Result;
use crate::store::{ArchiveSession, OpenStore};

const UNKNOWN_SETTING: &str = "Unknown";

/// Read-only queries over the session's current account.
///
/// Every call selects a default account first if none is open, and every call reads
/// the store afresh.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    session: Arc<ArchiveSession>,
}

impl QueryEngine {
    /// Creates an engine over `session`.
    #[must_use]
    pub const fn new(session: Arc<ArchiveSession>) -> Self {
        Self { session }
    }

    /// The session this engine reads through.
    #[must_use]
    pub fn session(&self) -> &ArchiveSession {
        &self.session
    }

    /// Distinct label names, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if no account can be selected or the query fails.
    pub async fn list_labels(&self) -> Result<Vec<String>> {
        let store = self.session.store().await?;
        let query = store.statement("SELECT DISTINCT label FROM labels ORDER BY label")?;
        let rows = store.fetch_all(query).await?;
        Ok(rows.iter().map(|row| row.get("label")).collect())
    }

    /// One page of messages carrying `request.label`, plus the label's total.
    ///
    /// Messages without a UID are not listed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for a malformed request, or an error if
    /// the query fails.
    pub async fn list_by_label(&self, request: &ListRequest) -> Result<LabelPage> {
        request.validate()?;
        let store = self.session.store().await?;

        let direction = request.sort_order.keyword();
        let sql = format!(
            r"
            SELECT m.message_num AS message_num,
                   m.message_filename AS message_filename,
                   CAST(m.message_internaldate AS TEXT) AS message_internaldate,
                   CAST(u.uid AS TEXT) AS uid
            FROM messages m
            JOIN labels l ON m.message_num = l.message_num
            JOIN uids u ON m.message_num = u.message_num
            WHERE l.label = ?
            ORDER BY {column} {direction}, m.message_num {direction}
            LIMIT ? OFFSET ?
            ",
            column = request.sort_field.column(),
        );
        let query = store
            .statement(&sql)?
            .bind(&request.label)
            .bind(i64::from(request.page_size))
            .bind(request.offset()?);
        let rows = store.fetch_all(query).await?;
        let messages = with_labels(&store, rows.iter().map(row_to_message).collect()).await?;
        let total = count_label(&store, &request.label).await?;

        debug!(
            "Listed {} of {total} message(s) for label {:?} (page {}, sort {} {})",
            messages.len(),
            request.label,
            request.page,
            request.sort_field,
            request.sort_order,
        );
        Ok(LabelPage {
            scope: scope_of(&store),
            messages,
            total,
        })
    }

    /// Number of listable messages carrying `label`.
    ///
    /// # Errors
    ///
    /// Returns an error if no account can be selected or the query fails.
    pub async fn count_by_label(&self, label: &str) -> Result<i64> {
        let store = self.session.store().await?;
        count_label(&store, label).await
    }

    /// Looks up a message by its external identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if no account can be selected or the query fails. An unknown
    /// UID is `Ok(None)`.
    pub async fn get_by_uid(&self, uid: &str) -> Result<Option<MessageWithLabels>> {
        Ok(self.lookup_uid(uid).await?.map(|found| found.message))
    }

    /// Like [`Self::get_by_uid`], also reporting which account the message is in.
    ///
    /// # Errors
    ///
    /// Returns an error if no account can be selected or the query fails.
    pub async fn lookup_uid(&self, uid: &str) -> Result<Option<ScopedMessage>> {
        let store = self.session.store().await?;
        let query = store
            .statement(
                r"
                SELECT m.message_num AS message_num,
                       m.message_filename AS message_filename,
                       CAST(m.message_internaldate AS TEXT) AS message_internaldate,
                       CAST(u.uid AS TEXT) AS uid
                FROM messages m
                JOIN uids u ON m.message_num = u.message_num
                WHERE u.uid = ?
                LIMIT 1
                ",
            )?
            .bind(uid);

        let Some(row) = store.fetch_optional(query).await? else {
            debug!("No message with uid {uid:?} in {}", store.account());
            return Ok(None);
        };

        let mut found = with_labels(&store, vec![row_to_message(&row)]).await?;
        Ok(found.pop().map(|message| ScopedMessage {
            scope: scope_of(&store),
            message,
        }))
    }

    /// Distinct sender addresses containing `query`, ascending.
    ///
    /// Queries shorter than two characters return nothing without touching the
    /// store. At most ten addresses are returned whatever `limit` says.
    ///
    /// # Errors
    ///
    /// Returns an error if no account can be selected or the query fails.
    pub async fn search_senders(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        if query.chars().count() < MIN_SENDER_QUERY_CHARS {
            return Ok(Vec::new());
        }
        let limit = limit.min(MAX_SENDER_RESULTS);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let store = self.session.store().await?;
        let statement = store
            .statement(
                r"
                SELECT DISTINCT from_address AS sender
                FROM messages
                WHERE from_address IS NOT NULL AND instr(from_address, ?) > 0
                ORDER BY from_address
                LIMIT ?
                ",
            )?
            .bind(query)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX));
        let rows = store.fetch_all(statement).await?;
        Ok(rows.iter().map(|row| row.get("sender")).collect())
    }

    /// Messages per label, for every label in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if no account can be selected or the query fails.
    pub async fn label_counts(&self) -> Result<BTreeMap<String, i64>> {
        let store = self.session.store().await?;
        label_counts(&store).await
    }

    /// Exported address, schema version, message total and per-label counts.
    ///
    /// # Errors
    ///
    /// Returns an error if no account can be selected or the query fails.
    pub async fn system_info(&self) -> Result<SystemInfo> {
        let store = self.session.store().await?;

        let email_address = setting(&store, "email_address").await?;
        let db_version = setting(&store, "db_version").await?;
        let query = store.statement("SELECT COUNT(*) AS count FROM messages")?;
        let total_messages = store.fetch_one(query).await?.get("count");
        let label_counts = label_counts(&store).await?;

        Ok(SystemInfo {
            email_address: email_address.unwrap_or_else(|| UNKNOWN_SETTING.to_string()),
            db_version: db_version.unwrap_or_else(|| UNKNOWN_SETTING.to_string()),
            total_messages,
            label_counts,
        })
    }
}

fn scope_of(store: &OpenStore) -> AccountScope {
    AccountScope {
        account: store.account().clone(),
        dir: store.account_dir().to_path_buf(),
    }
}

fn row_to_message(row: &SqliteRow) -> MessageWithLabels {
    MessageWithLabels {
        message_num: row.get("message_num"),
        message_filename: row
            .get::<Option<String>, _>("message_filename")
            .unwrap_or_default(),
        message_internaldate: row
            .get::<Option<String>, _>("message_internaldate")
            .unwrap_or_default(),
        uid: row.get("uid"),
        labels: Vec::new(),
    }
}

async fn count_label(store: &OpenStore, label: &str) -> Result<i64> {
    let query = store
        .statement(
            r"
            SELECT COUNT(*) AS count
            FROM messages m
            JOIN labels l ON m.message_num = l.message_num
            JOIN uids u ON m.message_num = u.message_num
            WHERE l.label = ?
            ",
        )?
        .bind(label);
    Ok(store.fetch_one(query).await?.get("count"))
}

/// Attaches label sets with one query for the whole batch.
async fn with_labels(
    store: &OpenStore,
    mut messages: Vec<MessageWithLabels>,
) -> Result<Vec<MessageWithLabels>> {
    if messages.is_empty() {
        return Ok(messages);
    }

    let mut builder: QueryBuilder<'_, Sqlite> =
        QueryBuilder::new("SELECT message_num, label FROM labels WHERE message_num IN (");
    let mut numbers = builder.separated(", ");
    for message in &messages {
        numbers.push_bind(message.message_num);
    }
    numbers.push_unseparated(") ORDER BY message_num, label");

    let query = store.checked(builder.build())?;
    let rows = store.fetch_all(query).await?;

    let mut by_message: HashMap<i64, Vec<String>> = HashMap::new();
    for row in &rows {
        by_message
            .entry(row.get("message_num"))
            .or_default()
            .push(row.get("label"));
    }
    for message in &mut messages {
        message.labels = by_message
            .get(&message.message_num)
            .cloned()
            .unwrap_or_default();
    }
    Ok(messages)
}

async fn label_counts(store: &OpenStore) -> Result<BTreeMap<String, i64>> {
    let query =
        store.statement("SELECT label, COUNT(*) AS count FROM labels GROUP BY label")?;
    let rows = store.fetch_all(query).await?;
    Ok(rows
        .iter()
        .map(|row| (row.get("label"), row.get("count")))
        .collect())
}

async fn setting(store: &OpenStore, name: &str) -> Result<Option<String>> {
    let query = store
        .statement("SELECT CAST(value AS TEXT) AS value FROM settings WHERE name = ?")?
        .bind(name);
    Ok(store
        .fetch_optional(query)
        .await?
        .and_then(|row| row.get::<Option<String>, _>("value")))
}
