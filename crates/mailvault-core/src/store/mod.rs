//! Archive Store Connector.
//!
//! Opens one account's store strictly read-only and manages the single connection
//! across account switches.

mod connection;
pub mod guard;
mod session;

pub use connection::OpenStore;
pub(crate) use connection::StoreQuery;
pub use session::ArchiveSession;
