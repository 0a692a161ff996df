//! Route tree node types.

use serde::Deserialize;
use serde_json::{Map, Value};

/// A single node in the route tree.
///
/// Wire shape: `{"path": "...", "title": "...", "content": [...], ...}`.
/// Whether a node is a leaf or an interior node is decided once, during
/// deserialization: a missing `content` field means leaf, a present (even
/// empty) list means interior. Downstream code matches on [`NodeKind`]
/// instead of re-checking field presence.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(from = "RawNode")]
pub struct RouteNode {
    /// Path segment, unique among siblings.
    pub path: String,
    /// Display name.
    pub title: String,
    /// Leaf/interior distinction, with children for interior nodes.
    pub kind: NodeKind,
    /// Fields this tool does not interpret. Carried through to the generated
    /// document unchanged.
    pub extra: Map<String, Value>,
}

impl RouteNode {
    /// True if the node has no `content` field and therefore owns no
    /// directory on disk.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf)
    }
}

/// Children of a route node, as declared by the schema.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// No `content` field.
    Leaf,
    /// `content` present. An empty list is still an interior node: it gets a
    /// directory and an empty `content` list in its document.
    Interior(Vec<RouteNode>),
}

/// Wire-shape mirror of [`RouteNode`] used during deserialization.
#[derive(Deserialize)]
struct RawNode {
    path: String,
    title: String,
    content: Option<Vec<RouteNode>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawNode> for RouteNode {
    fn from(raw: RawNode) -> Self {
        Self {
            path: raw.path,
            title: raw.title,
            kind: match raw.content {
                None => NodeKind::Leaf,
                Some(children) => NodeKind::Interior(children),
            },
            extra: raw.extra,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_node_without_content_is_leaf() {
        let node: RouteNode =
            serde_json::from_str(r#"{"path": "list", "title": "List Users"}"#).unwrap();

        assert!(node.is_leaf());
        assert_eq!(node.path, "list");
        assert_eq!(node.title, "List Users");
        assert!(node.extra.is_empty());
    }

    #[test]
    fn test_node_with_empty_content_is_interior() {
        let node: RouteNode =
            serde_json::from_str(r#"{"path": "users", "title": "Users", "content": []}"#).unwrap();

        assert_eq!(node.kind, NodeKind::Interior(Vec::new()));
        assert!(!node.is_leaf());
    }

    #[test]
    fn test_node_with_null_content_is_leaf() {
        let node: RouteNode =
            serde_json::from_str(r#"{"path": "users", "title": "Users", "content": null}"#)
                .unwrap();

        assert!(node.is_leaf());
    }

    #[test]
    fn test_nested_children_preserve_order() {
        let node: RouteNode = serde_json::from_str(
            r#"{
                "path": "users",
                "title": "Users",
                "content": [
                    {"path": "list", "title": "List"},
                    {"path": "create", "title": "Create"},
                    {"path": "delete", "title": "Delete"}
                ]
            }"#,
        )
        .unwrap();

        let NodeKind::Interior(children) = node.kind else {
            panic!("expected interior node");
        };
        let paths: Vec<&str> = children.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["list", "create", "delete"]);
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        let node: RouteNode = serde_json::from_str(
            r#"{"path": "list", "title": "List", "method": "GET", "deprecated": true}"#,
        )
        .unwrap();

        assert_eq!(node.extra.len(), 2);
        assert_eq!(node.extra["method"], serde_json::json!("GET"));
        assert_eq!(node.extra["deprecated"], serde_json::json!(true));
    }
}
