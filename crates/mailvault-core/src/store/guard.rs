//! Write barriers for archive stores.
//!
//! The store file is opened with the driver's read-only flag. On top of that every
//! connection gets `TEMP` triggers that abort writes on the record tables and
//! `PRAGMA query_only`, and every statement we issue is classified before it runs.

use sqlx::{Connection, SqliteConnection};
use tracing::{error, warn};

use crate::Error;

/// Record tables that must never be written.
pub const GUARDED_TABLES: [&str; 4] = ["messages", "labels", "uids", "settings"];

const GUARDED_OPERATIONS: [&str; 3] = ["INSERT", "UPDATE", "DELETE"];

/// Abort message raised by the write triggers.
pub const READ_ONLY_MESSAGE: &str = "archive store is read-only";

/// Keywords that make a statement mutating wherever they appear as a word.
const WRITE_KEYWORDS: [&str; 12] = [
    "INSERT", "UPDATE", "DELETE", "REPLACE", "UPSERT", "CREATE", "DROP", "ALTER", "ATTACH",
    "DETACH", "VACUUM", "REINDEX",
];

/// SQLite primary result code for writes against a read-only database.
const SQLITE_READONLY: i64 = 8;

/// Installs the per-connection barriers.
///
/// Trigger failures are logged and skipped; the read-only open still holds.
/// Failing to enable `query_only` is an error.
pub(crate) async fn install(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for table in GUARDED_TABLES {
        for operation in GUARDED_OPERATIONS {
            let sql = trigger_sql(table, operation);
            if let Err(e) = sqlx::query(&sql).execute(&mut *conn).await {
                warn!("Failed to create {operation} prevention trigger for {table}: {e}");
            }
        }
    }

    sqlx::query("PRAGMA query_only = ON")
        .execute(&mut *conn)
        .await?;
    conn.ping().await
}

fn trigger_sql(table: &str, operation: &str) -> String {
    format!(
        "CREATE TEMP TRIGGER IF NOT EXISTS prevent_{table}_{lower} \
         BEFORE {operation} ON {table} \
         BEGIN SELECT RAISE(ABORT, '{READ_ONLY_MESSAGE}'); END",
        lower = operation.to_lowercase(),
    )
}

/// Rejects any statement that is not a single read-only query.
///
/// Admits `SELECT`, `WITH ... SELECT`, `VALUES`, `EXPLAIN` and the query form of
/// `PRAGMA` (no assignment).
///
/// # Errors
///
/// Returns [`Error::StoreIntegrityViolation`] for anything else.
pub fn check_statement(sql: &str) -> crate::Result<()> {
    let body = strip_comments(sql);
    let body = body.trim().trim_end_matches(';').trim_end();

    if body.contains(';') {
        return Err(violation(sql, "multiple statements"));
    }

    let words = words(body);
    let Some((first, _)) = words.first() else {
        return Err(violation(sql, "empty statement"));
    };

    let read_only = match first.as_str() {
        "SELECT" | "WITH" | "VALUES" | "EXPLAIN" => !words
            .iter()
            .skip(1)
            .any(|(word, next)| is_write_keyword(word, *next)),
        "PRAGMA" => !body.contains('='),
        _ => false,
    };

    if read_only {
        Ok(())
    } else {
        Err(violation(sql, "mutating statement"))
    }
}

/// Upper-cased words with the first non-blank character after each.
fn words(body: &str) -> Vec<(String, Option<char>)> {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut out = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find(is_word) {
        let tail = &rest[start..];
        let end = tail.find(|c: char| !is_word(c)).unwrap_or(tail.len());
        let next = tail[end..].chars().find(|c| !c.is_whitespace());
        out.push((tail[..end].to_ascii_uppercase(), next));
        rest = &tail[end..];
    }
    out
}

/// `REPLACE(...)` inside a query is the string function, not a statement.
fn is_write_keyword(word: &str, next: Option<char>) -> bool {
    WRITE_KEYWORDS.contains(&word) && !(word == "REPLACE" && next == Some('('))
}

/// Converts a driver error, recognising blocked writes as integrity violations.
pub(crate) fn classify(err: sqlx::Error) -> Error {
    if is_write_rejection(&err) {
        error!("Blocked write against archive store: {err}");
        Error::StoreIntegrityViolation(err.to_string())
    } else {
        Error::Database(err)
    }
}

fn is_write_rejection(err: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = err else {
        return false;
    };
    let readonly_code = db
        .code()
        .and_then(|code| code.parse::<i64>().ok())
        .is_some_and(|code| code & 0xff == SQLITE_READONLY);
    let message = db.message();
    readonly_code
        || message.contains(READ_ONLY_MESSAGE)
        || message.contains("readonly database")
}

fn violation(sql: &str, reason: &str) -> Error {
    let statement = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    error!("Refusing {reason} against archive store: {statement}");
    Error::StoreIntegrityViolation(format!("{reason}: {statement}"))
}

fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    loop {
        let line = rest.find("--");
        let block = rest.find("/*");
        let block_first = match (line, block) {
            (Some(l), Some(b)) => b < l,
            (None, Some(_)) => true,
            _ => false,
        };

        if let (Some(b), true) = (block, block_first) {
            out.push_str(&rest[..b]);
            out.push(' ');
            rest = rest[b + 2..]
                .find("*/")
                .map_or("", |end| &rest[b + 2 + end + 2..]);
        } else if let Some(l) = line {
            out.push_str(&rest[..l]);
            rest = rest[l..].find('\n').map_or("", |end| &rest[l + end..]);
        } else {
            out.push_str(rest);
            return out;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_admits_queries() {
        for sql in [
            "SELECT DISTINCT label FROM labels ORDER BY label",
            "  select 1;  ",
            "WITH t AS (SELECT 1) SELECT * FROM t",
            "PRAGMA user_version",
            "-- leading comment\nSELECT message_num FROM messages",
            "/* note */ SELECT updated_at FROM settings",
            "SELECT replace(label, 'a', 'b') FROM labels",
            "SELECT REPLACE (from_address, '@', ' at ') FROM messages",
        ] {
            assert!(check_statement(sql).is_ok(), "{sql}");
        }
    }

    #[test]
    fn test_rejects_writes() {
        for sql in [
            "INSERT INTO labels VALUES (1, 'x')",
            "update messages set message_filename = ''",
            "DELETE FROM uids",
            "REPLACE INTO settings VALUES ('a', 'b')",
            "WITH t AS (SELECT 1) REPLACE INTO labels VALUES (1, 'x')",
            "SELECT replace('a', 'b', 'c'); REPLACE INTO labels VALUES (1, 'x')",
            "WITH t AS (SELECT 1) DELETE FROM labels",
            "SELECT 1; DROP TABLE messages",
            "PRAGMA query_only = OFF",
            "ATTACH DATABASE 'x.db' AS x",
            "/* SELECT */ DELETE FROM labels",
            "",
        ] {
            assert!(
                matches!(check_statement(sql), Err(Error::StoreIntegrityViolation(_))),
                "{sql}"
            );
        }
    }

    #[test]
    fn test_trigger_sql_shape() {
        let sql = trigger_sql("labels", "DELETE");
        assert!(sql.starts_with("CREATE TEMP TRIGGER IF NOT EXISTS prevent_labels_delete"));
        assert!(sql.contains("BEFORE DELETE ON labels"));
        assert!(sql.contains(READ_ONLY_MESSAGE));
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("SELECT 1 -- two\n").trim(), "SELECT 1");
        assert_eq!(strip_comments("a /* b */ c"), "a   c");
        assert_eq!(strip_comments("a /* unterminated"), "a  ");
    }

    fn any_case(keyword: &'static str) -> impl Strategy<Value = String> {
        proptest::collection::vec(any::<bool>(), keyword.len()).prop_map(move |upper| {
            keyword
                .chars()
                .zip(upper)
                .map(|(c, u)| if u { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_mutations_always_rejected(
            keyword in prop_oneof![any_case("insert"), any_case("update"), any_case("delete")],
            table in proptest::sample::select(GUARDED_TABLES.to_vec()),
            padding in "[ \t\n]{0,4}",
        ) {
            let sql = format!("{padding}{keyword} {table} WHERE 1 = 1");
            prop_assert!(check_statement(&sql).is_err());
        }
    }
}
