//! Account model types.

use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifier of an archived account: its directory name under the archive root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Creates an account ID after checking it names a single directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for empty names, path separators or `.`/`..`.
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("account name is required".into()));
        }
        let mut components = Path::new(&name).components();
        let single_normal = matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none();
        if !single_normal || name.contains(['/', '\\']) {
            return Err(Error::InvalidInput(format!("invalid account name: {name}")));
        }
        Ok(Self(name))
    }

    /// Returns the directory name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
