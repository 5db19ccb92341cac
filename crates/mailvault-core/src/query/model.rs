//! Query data models.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::{Error, Result};

/// Maximum number of sender addresses returned by a search.
pub const MAX_SENDER_RESULTS: usize = 10;

/// Shortest sender query that reaches the store.
pub const MIN_SENDER_QUERY_CHARS: usize = 2;

/// A stored message joined with its external identifier and labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWithLabels {
    /// Internal sequence number.
    pub message_num: i64,
    /// Raw file location, relative to the account directory.
    pub message_filename: String,
    /// Receipt timestamp as stored.
    pub message_internaldate: String,
    /// Stable external identifier.
    pub uid: String,
    /// Every label attached to the message.
    pub labels: Vec<String>,
}

/// The account a result was read from, captured while the store was held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountScope {
    /// Account the rows belong to.
    pub account: AccountId,
    /// Directory holding that account's raw message files.
    pub dir: PathBuf,
}

/// A message together with the account it came from.
#[derive(Debug, Clone)]
pub struct ScopedMessage {
    /// Where the message lives.
    pub scope: AccountScope,
    /// The message itself.
    pub message: MessageWithLabels,
}

/// One page of a label listing.
#[derive(Debug, Clone)]
pub struct LabelPage {
    /// Where the messages live.
    pub scope: AccountScope,
    /// Messages on this page, in sort order.
    pub messages: Vec<MessageWithLabels>,
    /// Messages carrying the label across all pages.
    pub total: i64,
}

/// Field a listing is sorted by.
///
/// `From` and `Subject` only exist inside the raw files, so they currently order by
/// the receipt timestamp just like `Date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Receipt timestamp.
    #[default]
    Date,
    /// Sender.
    From,
    /// Subject line.
    Subject,
}

impl SortField {
    /// Column expression used in `ORDER BY`.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Date | Self::From | Self::Subject => "m.message_internaldate",
        }
    }

    /// Name used in requests.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::From => "from",
            Self::Subject => "subject",
        }
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(Self::Date),
            "from" => Ok(Self::From),
            "subject" => Ok(Self::Subject),
            other => Err(Error::InvalidInput(format!("unknown sort field: {other}"))),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a listing sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Name used in requests.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(Error::InvalidInput(format!("unknown sort order: {other}"))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a label listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Label to filter by (exact, case-sensitive).
    pub label: String,
    /// 1-based page number.
    pub page: u32,
    /// Messages per page.
    pub page_size: u32,
    /// Sort field.
    pub sort_field: SortField,
    /// Sort direction.
    pub sort_order: SortOrder,
}

impl ListRequest {
    /// Creates a request for the first page, newest first.
    #[must_use]
    pub fn new(label: impl Into<String>, page_size: u32) -> Self {
        Self {
            label: label.into(),
            page: 1,
            page_size,
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }

    /// Sets the page number.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the sort.
    #[must_use]
    pub const fn sorted(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = field;
        self.sort_order = order;
        self
    }

    /// Checks the request is answerable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty label or a zero page/page size.
    pub fn validate(&self) -> Result<()> {
        if self.label.is_empty() {
            return Err(Error::InvalidInput("label parameter is required".into()));
        }
        if self.page == 0 {
            return Err(Error::InvalidInput("page must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(Error::InvalidInput("pageSize must be at least 1".into()));
        }
        self.offset().map(|_| ())
    }

    /// Rows to skip before this page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the offset does not fit in an `i64`.
    pub fn offset(&self) -> Result<i64> {
        i64::from(self.page.saturating_sub(1))
            .checked_mul(i64::from(self.page_size))
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "page {} with pageSize {} is out of range",
                    self.page, self.page_size
                ))
            })
    }
}

/// Store metadata for the open account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    /// Address the archive was exported from.
    pub email_address: String,
    /// Store schema version.
    pub db_version: String,
    /// Number of stored messages.
    pub total_messages: i64,
    /// Messages per label.
    pub label_counts: BTreeMap<String, i64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_field_parse() {
        assert_eq!("date".parse::<SortField>().unwrap(), SortField::Date);
        assert_eq!("From".parse::<SortField>().unwrap(), SortField::From);
        assert_eq!(" SUBJECT ".parse::<SortField>().unwrap(), SortField::Subject);
        assert!(matches!(
            "size".parse::<SortField>(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("desc; DROP TABLE labels".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_unindexed_fields_sort_by_date() {
        assert_eq!(SortField::From.column(), SortField::Date.column());
        assert_eq!(SortField::Subject.column(), SortField::Date.column());
    }

    #[test]
    fn test_offset() {
        let request = ListRequest::new("INBOX", 10).page(3);
        assert_eq!(request.offset().unwrap(), 20);
        assert_eq!(ListRequest::new("INBOX", 10).offset().unwrap(), 0);
    }

    #[test]
    fn test_offset_overflow_is_invalid() {
        let request = ListRequest::new("INBOX", u32::MAX).page(u32::MAX);
        assert!(matches!(request.offset(), Err(Error::InvalidInput(_))));
        assert!(matches!(request.validate(), Err(Error::InvalidInput(_))));

        let largest = ListRequest::new("INBOX", 1).page(u32::MAX);
        assert_eq!(largest.offset().unwrap(), i64::from(u32::MAX) - 1);
    }

    #[test]
    fn test_validate() {
        assert!(ListRequest::new("INBOX", 10).validate().is_ok());
        assert!(ListRequest::new("", 10).validate().is_err());
        assert!(ListRequest::new("INBOX", 0).validate().is_err());
        assert!(ListRequest::new("INBOX", 10).page(0).validate().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&SortField::Subject).unwrap(), "\"subject\"");
        assert_eq!(serde_json::to_string(&SortOrder::Asc).unwrap(), "\"asc\"");
    }
}
