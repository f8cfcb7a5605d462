use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a section or lesson, as seen by the editor.
///
/// Entities that only exist locally carry a [`EntityId::Draft`] id until the
/// store assigns them a real one on save.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EntityId {
    Persisted(String),
    Draft(Uuid),
}

impl EntityId {
    pub fn draft() -> Self {
        Self::Draft(Uuid::new_v4())
    }

    pub fn persisted(id: impl Into<String>) -> Self {
        Self::Persisted(id.into())
    }

    /// The store id, if this entity has one. An empty persisted id counts as
    /// not persisted.
    pub fn persisted_id(&self) -> Option<&str> {
        match self {
            Self::Persisted(id) if !id.is_empty() => Some(id),
            _ => None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted_id().is_some()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persisted(id) => write!(f, "{id}"),
            Self::Draft(local_id) => write!(f, "draft:{local_id}"),
        }
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::persisted(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_persisted_id_is_not_persisted() {
        assert!(!EntityId::persisted("").is_persisted());
        assert!(!EntityId::draft().is_persisted());
        assert_eq!(EntityId::persisted("abc").persisted_id(), Some("abc"));
    }

    #[test]
    fn serializes_as_tagged_value() {
        let json = serde_json::to_string(&EntityId::persisted("s1")).unwrap();
        assert_eq!(json, r#"{"persisted":"s1"}"#);
    }
}
