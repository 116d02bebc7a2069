//! Stable identifiers for user-configurable shortcuts.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::types::Shortcut;

/// One logical, user-configurable shortcut purpose in the host application.
///
/// Equality and hashing use the identifier only; the default is declaration
/// metadata.
#[derive(Clone, Debug)]
pub struct Name {
    id: Arc<str>,
    default: Option<Shortcut>,
}

impl Name {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self {
            id: Arc::from(id.as_ref()),
            default: None,
        }
    }

    pub fn with_default(id: impl AsRef<str>, default: Shortcut) -> Self {
        Self {
            id: Arc::from(id.as_ref()),
            default: Some(default),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn default_shortcut(&self) -> Option<Shortcut> {
        self.default
    }

    pub(crate) fn set_default(&mut self, default: Option<Shortcut>) {
        self.default = default;
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl From<&str> for Name {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
