//! Boundary request and response types.

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::enrich::{EnrichedMessage, MessageSummary};
use crate::query::{SortField, SortOrder};

/// Every account plus the one currently open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsOverview {
    /// Accounts with a store file, ascending.
    pub accounts: Vec<AccountId>,
    /// Open account, if any.
    pub current_account: Option<AccountId>,
}

/// Outcome of selecting an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedAccount {
    /// Always true; failures are errors.
    pub success: bool,
    /// The account now open.
    pub current_account: AccountId,
}

/// A listing request. Unset fields take the service defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageQuery {
    /// Label to list.
    pub label: String,
    /// 1-based page, default 1.
    pub page: Option<u32>,
    /// Page size, default from configuration.
    pub page_size: Option<u32>,
    /// Sort field, default date.
    pub sort_field: Option<SortField>,
    /// Sort direction, default descending.
    pub sort_order: Option<SortOrder>,
}

impl MessageQuery {
    /// Query for the first page of `label`.
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

/// One page of message summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    /// Messages on the page, in sort order.
    pub emails: Vec<MessageSummary>,
    /// Messages carrying the label across all pages.
    pub total: i64,
}

/// A single message with its raw source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetail {
    /// Enriched message, or a placeholder.
    pub email: EnrichedMessage,
    /// Raw file as text, empty when unavailable.
    pub original: String,
    /// Description of the enrichment issue, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Raw message ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Suggested file name.
    pub filename: String,
    /// MIME type of the payload.
    pub content_type: &'static str,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

/// Sender addresses matching a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderMatches {
    /// Matching addresses, ascending.
    pub senders: Vec<String>,
}
