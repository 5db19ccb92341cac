//! # mailvault-core
//!
//! Read-only browsing of Gmail archives exported by Got Your Back.
//!
//! This crate provides:
//! - Account discovery under an archive root
//! - A guarded, read-only connection to each account's `SQLite` store
//! - Label listings, UID lookup, sender search and store metadata
//! - Enrichment of stored records from their raw `.eml` files
//! - A boundary service returning serializable responses

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod config;
pub mod enrich;
mod error;
pub mod query;
pub mod service;
pub mod store;

pub use account::{AccountId, AccountRegistry};
pub use config::ArchiveConfig;
pub use enrich::{
    Attachment, EnrichedMessage, EnrichmentBridge, EnrichmentIssue, MailParser, MessageParser,
    MessageSummary, ParseError, ParsedMessage,
};
pub use error::{Error, Result};
pub use query::{
    ListRequest, MessageWithLabels, QueryEngine, SortField, SortOrder, SystemInfo,
};
pub use service::{
    AccountsOverview, ArchiveService, Download, MessageDetail, MessagePage, MessageQuery,
    SelectedAccount, SenderMatches,
};
pub use store::{ArchiveSession, OpenStore};
