//! Enriched message models.

use serde::{Deserialize, Serialize};

use super::parser::{Attachment, ParsedMessage};
use crate::query::MessageWithLabels;

/// Why a message could only be shown as a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnrichmentIssue {
    /// The raw file could not be opened or read in time.
    FileUnavailable,
    /// The raw file was read but is not a usable message.
    ContentCorrupted,
}

impl EnrichmentIssue {
    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::FileUnavailable => "EML file is missing or inaccessible",
            Self::ContentCorrupted => "EML file is corrupted or invalid",
        }
    }
}

impl std::fmt::Display for EnrichmentIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// A stored message merged with what its raw file says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedMessage {
    /// Stable external identifier.
    pub uid: String,
    /// Internal sequence number.
    pub message_num: i64,
    /// Raw file location, relative to the account directory.
    pub message_filename: String,
    /// Receipt timestamp as stored.
    pub message_internaldate: String,
    /// Labels from the store.
    pub labels: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Sender.
    pub from: String,
    /// Recipients.
    pub to: String,
    /// RFC 3339 date from the Date header, or the stored timestamp.
    pub date: String,
    /// Plain-text body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// HTML body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Attachment metadata.
    pub attachments: Vec<Attachment>,
    /// Set when only a placeholder could be produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<EnrichmentIssue>,
}

impl EnrichedMessage {
    pub(crate) const NO_SUBJECT: &'static str = "(No Subject)";
    pub(crate) const NO_SENDER: &'static str = "(No Sender)";
    pub(crate) const NO_RECIPIENTS: &'static str = "(No Recipients)";
    pub(crate) const SUBJECT_UNAVAILABLE: &'static str = "(Subject not available)";
    pub(crate) const SENDER_UNAVAILABLE: &'static str = "(Sender not available)";
    pub(crate) const RECIPIENTS_UNAVAILABLE: &'static str = "(Recipients not available)";

    /// Merges parsed content onto the stored record.
    #[must_use]
    pub fn from_parsed(message: MessageWithLabels, parsed: ParsedMessage) -> Self {
        let date = parsed
            .date
            .map_or_else(|| message.message_internaldate.clone(), |d| d.to_rfc3339());
        Self {
            uid: message.uid,
            message_num: message.message_num,
            message_filename: message.message_filename,
            message_internaldate: message.message_internaldate,
            labels: message.labels,
            subject: or_sentinel(parsed.subject, Self::NO_SUBJECT),
            from: or_sentinel(parsed.from, Self::NO_SENDER),
            to: or_sentinel(parsed.to, Self::NO_RECIPIENTS),
            date,
            text: parsed.text,
            html: parsed.html,
            attachments: parsed.attachments,
            issue: None,
        }
    }

    /// Stand-in for a message whose file could not be used.
    #[must_use]
    pub fn placeholder(message: MessageWithLabels, issue: EnrichmentIssue) -> Self {
        Self {
            uid: message.uid,
            message_num: message.message_num,
            message_filename: message.message_filename,
            date: message.message_internaldate.clone(),
            message_internaldate: message.message_internaldate,
            labels: message.labels,
            subject: Self::SUBJECT_UNAVAILABLE.to_string(),
            from: Self::SENDER_UNAVAILABLE.to_string(),
            to: Self::RECIPIENTS_UNAVAILABLE.to_string(),
            text: None,
            html: None,
            attachments: Vec::new(),
            issue: Some(issue),
        }
    }

    /// Returns true if this is a placeholder.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.issue.is_some()
    }
}

fn or_sentinel(value: String, sentinel: &str) -> String {
    if value.trim().is_empty() {
        sentinel.to_string()
    } else {
        value
    }
}

/// Listing view of an [`EnrichedMessage`], without bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    /// Stable external identifier.
    pub uid: String,
    /// Internal sequence number.
    pub message_num: i64,
    /// Raw file location.
    pub message_filename: String,
    /// Receipt timestamp as stored.
    pub message_internaldate: String,
    /// Labels from the store.
    pub labels: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Sender.
    pub from: String,
    /// Recipients.
    pub to: String,
    /// Display date.
    pub date: String,
    /// Whether the message carries attachments.
    pub has_attachments: bool,
    /// Set for placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<EnrichmentIssue>,
}

impl From<EnrichedMessage> for MessageSummary {
    fn from(message: EnrichedMessage) -> Self {
        Self {
            has_attachments: !message.attachments.is_empty(),
            uid: message.uid,
            message_num: message.message_num,
            message_filename: message.message_filename,
            message_internaldate: message.message_internaldate,
            labels: message.labels,
            subject: message.subject,
            from: message.from,
            to: message.to,
            date: message.date,
            issue: message.issue,
        }
    }
}
