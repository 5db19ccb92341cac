//! Account discovery.
//!
//! An account is a directory under the archive root that contains a store file.

mod model;
mod registry;

pub use model::AccountId;
pub use registry::AccountRegistry;
