//! Memory URLs: the starting reference of a context query.
//!
//! A memory URL is `memory://<path>` or a bare project-relative path. A path
//! containing `*` is a pattern that may match many entities.
//!
//! ```rust
//! use notegraph_core::memory_url::MemoryUrl;
//!
//! let url = MemoryUrl::parse("memory://notes/a.md").unwrap();
//! assert_eq!(url, MemoryUrl::Path("notes/a.md".to_string()));
//! assert!(MemoryUrl::parse("memory://notes/*").unwrap().is_pattern());
//! ```

use serde::Serialize;
use std::fmt;

use crate::error::ContextError;

pub const SCHEME: &str = "memory://";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryUrl {
    /// A single path, title, or path suffix.
    Path(String),
    /// A `*` glob over file paths.
    Pattern(String),
}

impl MemoryUrl {
    /// Parse and normalize a reference.
    ///
    /// Leading and trailing `/` are dropped. Empty references, foreign
    /// schemes, `..` segments, and control characters are rejected.
    pub fn parse(input: &str) -> Result<Self, ContextError> {
        let trimmed = input.trim();
        let rest = match trimmed.strip_prefix(SCHEME) {
            Some(rest) => rest,
            None if trimmed.contains("://") => {
                return Err(ContextError::InvalidReference(format!(
                    "unsupported scheme in '{}'",
                    input
                )))
            }
            None => trimmed,
        };

        let path = rest.trim_matches('/');
        if path.is_empty() {
            return Err(ContextError::InvalidReference(format!(
                "empty reference '{}'",
                input
            )));
        }
        if path.chars().any(char::is_control) {
            return Err(ContextError::InvalidReference(
                "reference contains control characters".to_string(),
            ));
        }
        if path.split('/').any(|segment| segment == "..") {
            return Err(ContextError::InvalidReference(format!(
                "reference may not contain '..': '{}'",
                input
            )));
        }

        if path.contains('*') {
            Ok(MemoryUrl::Pattern(path.to_string()))
        } else {
            Ok(MemoryUrl::Path(path.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MemoryUrl::Path(p) | MemoryUrl::Pattern(p) => p,
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, MemoryUrl::Pattern(_))
    }
}

impl fmt::Display for MemoryUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SCHEME, self.as_str())
    }
}
