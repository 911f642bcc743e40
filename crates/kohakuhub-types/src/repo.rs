//! Repository identity and kind.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three kinds of artifact repository the hub hosts.
///
/// Each is a distinct namespace for uniqueness purposes: `models/foo/bar`
/// and `datasets/foo/bar` are unrelated repositories even when `foo/bar`
/// is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    /// A model repository.
    Model,
    /// A dataset repository.
    Dataset,
    /// A Space (application bundle) repository.
    Space,
}

impl RepoType {
    /// The URL path segment used for this repo type (`models`, `datasets`, `spaces`).
    #[must_use]
    pub fn path_segment(&self) -> &'static str {
        match self {
            RepoType::Model => "models",
            RepoType::Dataset => "datasets",
            RepoType::Space => "spaces",
        }
    }

    /// Parses a URL path segment back into a `RepoType`.
    #[must_use]
    pub fn from_path_segment(s: &str) -> Option<Self> {
        match s {
            "models" => Some(RepoType::Model),
            "datasets" => Some(RepoType::Dataset),
            "spaces" => Some(RepoType::Space),
            _ => None,
        }
    }

    /// The singular form stored in the database's `repositories.repo_type`
    /// column and used as the versioned-store repo key's type segment
    /// (`model/alice/demo`, not `models/alice/demo`).
    #[must_use]
    pub fn db_key(&self) -> &'static str {
        match self {
            RepoType::Model => "model",
            RepoType::Dataset => "dataset",
            RepoType::Space => "space",
        }
    }

    /// Parses the singular DB form back into a `RepoType`.
    #[must_use]
    pub fn from_db_key(s: &str) -> Option<Self> {
        match s {
            "model" => Some(RepoType::Model),
            "dataset" => Some(RepoType::Dataset),
            "space" => Some(RepoType::Space),
            _ => None,
        }
    }
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

/// Identifies a repository by its type and `namespace/name`.
///
/// Repository identity is case-normalized: `Foo/Bar` and `foo/bar` name the
/// same repository, per the uniqueness invariant on
/// `(repo_type, normalized_namespace, normalized_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryId {
    /// The repository's kind.
    pub repo_type: RepoType,
    /// The owning namespace (a user or organization login), as written.
    pub namespace: String,
    /// The repository's name, as written.
    pub name: String,
}

impl RepositoryId {
    /// Builds a new repository identifier.
    #[must_use]
    pub fn new(repo_type: RepoType, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repo_type,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Returns the case-folded form used for uniqueness lookups.
    #[must_use]
    pub fn normalized(&self) -> (String, String) {
        (self.namespace.to_lowercase(), self.name.to_lowercase())
    }

    /// Returns the `namespace/name` form as displayed to users.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.repo_type, self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_segment_roundtrip() {
        for t in [RepoType::Model, RepoType::Dataset, RepoType::Space] {
            assert_eq!(RepoType::from_path_segment(t.path_segment()), Some(t));
        }
    }

    #[test]
    fn unknown_segment_is_none() {
        assert_eq!(RepoType::from_path_segment("widgets"), None);
    }

    #[test]
    fn db_key_roundtrip() {
        for t in [RepoType::Model, RepoType::Dataset, RepoType::Space] {
            assert_eq!(RepoType::from_db_key(t.db_key()), Some(t));
        }
    }

    #[test]
    fn db_key_is_singular_unlike_path_segment() {
        assert_eq!(RepoType::Model.db_key(), "model");
        assert_eq!(RepoType::Model.path_segment(), "models");
    }

    #[test]
    fn normalized_case_folds() {
        let id = RepositoryId::new(RepoType::Model, "Acme", "Widget");
        assert_eq!(id.normalized(), ("acme".to_string(), "widget".to_string()));
    }

    #[test]
    fn full_name_preserves_case() {
        let id = RepositoryId::new(RepoType::Dataset, "Acme", "Widget");
        assert_eq!(id.full_name(), "Acme/Widget");
    }
}
