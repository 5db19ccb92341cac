//! Boundary service.
//!
//! This module exposes the archive to front ends: each operation returns a
//! serializable response or a [`crate::Error`].

mod archive;
mod model;

pub use archive::{ArchiveService, MESSAGE_CONTENT_TYPE};
pub use model::{
    AccountsOverview, Download, MessageDetail, MessagePage, MessageQuery, SelectedAccount,
    SenderMatches,
};
