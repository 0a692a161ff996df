//! Route tree schema loading for staticapi.
//!
//! Parses `schema.json`, a nested route tree describing an API's routes.
//! Each node carries a `path` segment, a display `title`, and optionally an
//! ordered `content` list of child nodes; any other fields are preserved and
//! flow through to the generated documents untouched.
//!
//! The schema is trusted input: beyond JSON well-formedness and the
//! `path`/`title` fields, no validation is performed here.

mod node;

pub use node::{NodeKind, RouteNode};

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Error returned when loading a schema file.
///
/// Both variants are fatal before any output is produced.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Schema file missing or unreadable.
    #[error("Failed to read schema {}: {source}", .path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Schema file content is not a valid route tree document.
    #[error("Failed to parse schema {}: {source}", .path.display())]
    Parse {
        /// Path that was read.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level route tree as read from `schema.json`.
///
/// The root is a pure container for the top-level route list: only its
/// `content` entries are materialized, the root itself never becomes a
/// document.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    /// Top-level routes in input order. `None` when the root object has no
    /// `content` field; such a schema produces no output at all.
    pub routes: Option<Vec<RouteNode>>,
}

/// Wire shape of the schema root.
#[derive(Deserialize)]
struct RawSchema {
    content: Option<Vec<RouteNode>>,
}

impl Schema {
    /// Read and parse a schema file.
    ///
    /// The file is read once, synchronously, before any output is produced.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Read`] if the file is missing or unreadable and
    /// [`SchemaError::Parse`] if its content is not valid JSON.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|source| SchemaError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a schema document from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error if the document does not deserialize
    /// into a route tree.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawSchema = serde_json::from_str(json)?;
        Ok(Self { routes: raw.content })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_route_list() {
        let schema = Schema::parse(
            r#"{"content": [
                {"path": "users", "title": "Users", "content": [
                    {"path": "list", "title": "List Users"}
                ]},
                {"path": "health", "title": "Health"}
            ]}"#,
        )
        .unwrap();

        let routes = schema.routes.unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].path, "users");
        assert!(!routes[0].is_leaf());
        assert_eq!(routes[1].path, "health");
        assert!(routes[1].is_leaf());
    }

    #[test]
    fn test_parse_root_without_content() {
        let schema = Schema::parse(r#"{"version": "1.0"}"#).unwrap();

        assert_eq!(schema.routes, None);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(Schema::parse("{not json").is_err());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, r#"{"content": [{"path": "a", "title": "A"}]}"#).unwrap();

        let schema = Schema::load(&path).unwrap();

        assert_eq!(schema.routes.unwrap().len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = Schema::load(&dir.path().join("missing.json")).unwrap_err();

        assert!(matches!(err, SchemaError::Read { .. }));
    }

    #[test]
    fn test_load_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(&path, "{{{").unwrap();

        let err = Schema::load(&path).unwrap_err();

        assert!(matches!(err, SchemaError::Parse { .. }));
    }
}
