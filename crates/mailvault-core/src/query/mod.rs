//! Query Engine.
//!
//! Label listing, label-filtered pagination with sort, UID lookup, counts, sender
//! search and store metadata, all joining `messages`, `labels` and `uids`.

mod engine;
mod model;

pub use engine::QueryEngine;
pub use model::{
    AccountScope, LabelPage, ListRequest, MAX_SENDER_RESULTS, MIN_SENDER_QUERY_CHARS,
    MessageWithLabels, ScopedMessage, SortField, SortOrder, SystemInfo,
};
