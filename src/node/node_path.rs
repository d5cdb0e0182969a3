use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::NodeName;

/// The absolute path of a node in a hierarchy, such as `/data/signal`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodePath(String);

/// An invalid node path.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid node path {0}")]
pub struct NodePathError(String);

impl NodePath {
    /// Create a new node path from `path`.
    ///
    /// # Errors
    /// Returns [`NodePathError`] if `path` is not valid according to [`NodePath::validate`].
    pub fn new(path: &str) -> Result<Self, NodePathError> {
        if Self::validate(path) {
            Ok(Self(path.to_string()))
        } else {
            Err(NodePathError(path.to_string()))
        }
    }

    /// The root node.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Extracts a string slice of the path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is the root node.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Return the path of the child `name` of this node.
    #[must_use]
    pub fn join(&self, name: &NodeName) -> Self {
        if self.is_root() {
            Self(format!("/{name}"))
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }

    /// Return the name of this node, or [`None`] for the root node.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Validates a path:
    /// - a path always starts with `/`,
    /// - a non-root path cannot end with `/`, and
    /// - a path cannot contain empty nodes (i.e. a `//` substring).
    #[must_use]
    pub fn validate(path: &str) -> bool {
        path.eq("/") || (path.starts_with('/') && !path.ends_with('/') && !path.contains("//"))
    }
}

impl TryFrom<&str> for NodePath {
    type Error = NodePathError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl TryFrom<String> for NodePath {
    type Error = NodePathError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        if Self::validate(&path) {
            Ok(Self(path))
        } else {
            Err(NodePathError(path))
        }
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_path() {
        assert!(NodePath::new("/").is_ok());
        assert!(NodePath::new("/a/b").is_ok());
        assert_eq!(NodePath::new("/a/b").unwrap().to_string(), "/a/b");
        assert!(NodePath::new("a/b").is_err());
        assert!(NodePath::new("/a/b/").is_err());
        assert_eq!(
            NodePath::new("/a/b/").unwrap_err().to_string(),
            "invalid node path /a/b/"
        );
        assert!(NodePath::new("/a//b").is_err());
    }

    #[test]
    fn node_path_serde() {
        let path: NodePath = serde_json::from_str(r#""/data/signal""#).unwrap();
        assert_eq!(path.as_str(), "/data/signal");
        assert_eq!(serde_json::to_string(&path).unwrap(), r#""/data/signal""#);
        assert!(serde_json::from_str::<NodePath>(r#""data//signal""#).is_err());
    }

    #[test]
    fn node_path_join() {
        let data = NodePath::root().join(&NodeName::new("data").unwrap());
        assert_eq!(data.as_str(), "/data");
        let signal = data.join(&NodeName::new("signal").unwrap());
        assert_eq!(signal.as_str(), "/data/signal");
        assert_eq!(signal.name(), Some("signal"));
        assert_eq!(NodePath::root().name(), None);
    }
}
