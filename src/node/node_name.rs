use thiserror::Error;

/// The name of a node in a hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeName(String);

/// An invalid node name.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid node name {0:?}")]
pub struct NodeNameError(String);

impl NodeName {
    /// Create a new node name from `name`.
    ///
    /// # Errors
    /// Returns [`NodeNameError`] if `name` is not valid according to [`NodeName::validate`].
    pub fn new(name: &str) -> Result<Self, NodeNameError> {
        if Self::validate(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(NodeNameError(name.to_string()))
        }
    }

    /// Extracts a string slice of the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a node name. A name
    /// - must not be empty,
    /// - must not include the character `/`, and
    /// - must not consist only of periods, e.g. `.` or `..`.
    #[must_use]
    pub fn validate(name: &str) -> bool {
        !name.contains('/') && !name.replace('.', "").is_empty()
    }
}

impl std::fmt::Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_name() {
        assert!(NodeName::new("signal").is_ok());
        assert!(NodeName::new("my.array").is_ok());
        assert!(NodeName::new("").is_err());
        assert!(NodeName::new("..").is_err());
        assert_eq!(
            NodeName::new("a/b").unwrap_err().to_string(),
            "invalid node name \"a/b\""
        );
    }
}
