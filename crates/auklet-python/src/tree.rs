//! Syntax trees and the parent/descendant annotation pass.
//!
//! The raw [`SyntaxNode`] mirrors the shape of a CPython `ast` node: a kind
//! (the `ast` class name), the `_fields` entries in declaration order, and
//! optional cached source coordinates. Nodes are immutable and shared via
//! `Arc`, so mutation operators build perturbed trees cheaply by splicing
//! unchanged sub-trees — which is exactly why annotation must defend
//! against one node object appearing at several tree positions.
//!
//! [`AnnotatedTree::annotate`] walks a raw tree once, depth-first, and
//! produces an arena where every position knows its parent and its complete
//! descendant set, computed bottom-up in the same pass.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use auklet_core::OrderedSet;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while decoding a wire-format tree.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The wire value does not describe a syntax node.
    #[error("malformed wire node: {reason}")]
    Malformed { reason: String },
}

impl TreeError {
    fn malformed(reason: impl Into<String>) -> Self {
        TreeError::Malformed {
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Raw Nodes
// ============================================================================

/// Source coordinates cached on a node by the parser.
///
/// Lines are 1-indexed, columns 0-indexed, matching CPython's `ast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub col: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_col: Option<u32>,
}

/// One field value of a syntax node.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A child node.
    Node(Arc<SyntaxNode>),
    /// A list field (statement bodies, argument lists, ...).
    List(Vec<FieldValue>),
    /// A plain constant: identifier strings, numbers, `null`, or an opaque
    /// `{"_repr": ...}` stand-in for values JSON cannot carry.
    Value(Value),
}

impl FieldValue {
    /// The child node, if this field holds exactly one.
    pub fn as_node(&self) -> Option<&Arc<SyntaxNode>> {
        match self {
            FieldValue::Node(node) => Some(node),
            _ => None,
        }
    }

    /// The plain value, if this field holds one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// A parsed syntax node.
///
/// `fields` preserves the declaration order of the parser's `_fields`
/// tuple; traversal order (and therefore annotation order) follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    /// The `ast` class name, e.g. `"Module"`, `"Expr"`, `"Constant"`.
    pub kind: String,
    pub fields: Vec<(String, FieldValue)>,
    pub location: Option<SourceLocation>,
}

impl SyntaxNode {
    /// Create a node with no cached location.
    pub fn new(kind: impl Into<String>, fields: Vec<(String, FieldValue)>) -> Arc<Self> {
        Arc::new(SyntaxNode {
            kind: kind.into(),
            fields,
            location: None,
        })
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Whether this node is a string-literal constant.
    pub fn is_string_constant(&self) -> bool {
        self.kind == "Constant"
            && matches!(self.field("value"), Some(FieldValue::Value(v)) if v.is_string())
    }

    // ------------------------------------------------------------------------
    // Wire format
    // ------------------------------------------------------------------------

    /// Encode to the driver wire format:
    /// `{"_kind", "location"?, "fields": [[name, value], ...]}`.
    ///
    /// Field order is carried by the pair list, so no assumptions about
    /// JSON object ordering are needed on either side of the bridge.
    pub fn to_wire(&self) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|(name, value)| json!([name, field_to_wire(value)]))
            .collect();
        let mut wire = json!({ "_kind": self.kind, "fields": fields });
        if let Some(location) = &self.location {
            wire["location"] = serde_json::to_value(location).unwrap_or(Value::Null);
        }
        wire
    }

    /// Decode from the driver wire format.
    pub fn from_wire(wire: &Value) -> Result<Arc<Self>, TreeError> {
        let kind = wire
            .get("_kind")
            .and_then(Value::as_str)
            .ok_or_else(|| TreeError::malformed("missing _kind"))?
            .to_string();
        let location = match wire.get("location") {
            Some(value) => Some(
                serde_json::from_value(value.clone())
                    .map_err(|e| TreeError::malformed(format!("bad location: {e}")))?,
            ),
            None => None,
        };
        let raw_fields = wire
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| TreeError::malformed("missing fields"))?;
        let mut fields = Vec::with_capacity(raw_fields.len());
        for entry in raw_fields {
            let pair = entry
                .as_array()
                .filter(|pair| pair.len() == 2)
                .ok_or_else(|| TreeError::malformed("field entry is not a [name, value] pair"))?;
            let name = pair[0]
                .as_str()
                .ok_or_else(|| TreeError::malformed("field name is not a string"))?;
            fields.push((name.to_string(), field_from_wire(&pair[1])?));
        }
        Ok(Arc::new(SyntaxNode {
            kind,
            fields,
            location,
        }))
    }
}

fn field_to_wire(value: &FieldValue) -> Value {
    match value {
        FieldValue::Node(node) => node.to_wire(),
        FieldValue::List(items) => Value::Array(items.iter().map(field_to_wire).collect()),
        FieldValue::Value(plain) => plain.clone(),
    }
}

fn field_from_wire(value: &Value) -> Result<FieldValue, TreeError> {
    match value {
        Value::Object(map) if map.contains_key("_kind") => {
            Ok(FieldValue::Node(SyntaxNode::from_wire(value)?))
        }
        Value::Array(items) => Ok(FieldValue::List(
            items.iter().map(field_from_wire).collect::<Result<_, _>>()?,
        )),
        plain => Ok(FieldValue::Value(plain.clone())),
    }
}

// ============================================================================
// Annotated Tree
// ============================================================================

/// Position of a node within an [`AnnotatedTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An immediate child, labelled with the field it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildLink {
    /// Field name on the parent node (e.g. `"body"`, `"value"`).
    pub field: String,
    /// Position within a list field; `None` for single-node fields.
    pub index: Option<usize>,
    pub id: NodeId,
}

/// A syntax node annotated with its tree position.
#[derive(Debug)]
pub struct AnnotatedNode {
    node: Arc<SyntaxNode>,
    parent: Option<NodeId>,
    links: Vec<ChildLink>,
    children: OrderedSet<NodeId>,
}

impl AnnotatedNode {
    /// The node payload. For an aliased input node this is a clone with the
    /// stale location dropped.
    pub fn node(&self) -> &Arc<SyntaxNode> {
        &self.node
    }

    /// The immediate syntactic container, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Immediate children, labelled with their field and list position.
    pub fn links(&self) -> &[ChildLink] {
        &self.links
    }

    /// *Every* descendant of this node (transitive closure, not just the
    /// immediate children), in traversal order.
    pub fn children(&self) -> &OrderedSet<NodeId> {
        &self.children
    }
}

/// A single-rooted syntax tree where every position knows its parent and
/// its full descendant set.
#[derive(Debug)]
pub struct AnnotatedTree {
    nodes: Vec<AnnotatedNode>,
    root: NodeId,
}

impl AnnotatedTree {
    /// Annotate a parsed tree in one depth-first pass.
    ///
    /// The parser (and mutation operators splicing shared sub-trees) may
    /// reuse one node object at several positions. A reused node is
    /// shallow-cloned before annotation so that every arena position has a
    /// single parent, and the clone's cached location is discarded: it
    /// described the original position and is stale at the new one.
    pub fn annotate(root: &Arc<SyntaxNode>) -> Self {
        let mut tree = AnnotatedTree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let mut seen: HashSet<*const SyntaxNode> = HashSet::new();
        tree.root = tree.visit(root, None, &mut seen);
        tree
    }

    fn visit(
        &mut self,
        node: &Arc<SyntaxNode>,
        parent: Option<NodeId>,
        seen: &mut HashSet<*const SyntaxNode>,
    ) -> NodeId {
        let payload = if seen.insert(Arc::as_ptr(node)) {
            Arc::clone(node)
        } else {
            Arc::new(SyntaxNode {
                kind: node.kind.clone(),
                fields: node.fields.clone(),
                location: None,
            })
        };

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AnnotatedNode {
            node: Arc::clone(&payload),
            parent,
            links: Vec::new(),
            children: OrderedSet::new(),
        });

        let mut links = Vec::new();
        let mut descendants = OrderedSet::new();
        for (field_name, value) in &payload.fields {
            match value {
                FieldValue::Node(child) => {
                    let child_id = self.visit(child, Some(id), seen);
                    links.push(ChildLink {
                        field: field_name.clone(),
                        index: None,
                        id: child_id,
                    });
                    // The descendant set accumulates bottom-up: the child
                    // plus everything below it, which is complete by now.
                    descendants.insert(child_id);
                    descendants.extend(self.nodes[child_id.index()].children.iter().copied());
                }
                FieldValue::List(items) => {
                    for (position, item) in items.iter().enumerate() {
                        if let FieldValue::Node(child) = item {
                            let child_id = self.visit(child, Some(id), seen);
                            links.push(ChildLink {
                                field: field_name.clone(),
                                index: Some(position),
                                id: child_id,
                            });
                            descendants.insert(child_id);
                            descendants
                                .extend(self.nodes[child_id.index()].children.iter().copied());
                        }
                    }
                }
                FieldValue::Value(_) => {}
            }
        }

        let entry = &mut self.nodes[id.index()];
        entry.links = links;
        entry.children = descendants;
        id
    }

    /// The root position.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of annotated positions.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no nodes. An annotated tree always has at
    /// least its root, so this is only meaningful via the `len`/`is_empty`
    /// pairing convention.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The annotated node at `id`.
    pub fn node(&self, id: NodeId) -> &AnnotatedNode {
        &self.nodes[id.index()]
    }

    /// Iterate all positions in traversal (depth-first) order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &AnnotatedNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index as u32), node))
    }

    /// The first statement of `id`'s `body` field, if any.
    pub fn first_in_body(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)
            .links
            .iter()
            .find(|link| link.field == "body" && link.index == Some(0))
            .map(|link| link.id)
    }

    /// Whether the node at `id` is a docstring.
    ///
    /// A node is a docstring iff it is a bare string-literal expression,
    /// its parent is a standalone expression statement, and that statement
    /// is the *first* statement of a function, class, or module body. A
    /// string assigned to a variable, appearing later in a body, or nested
    /// in another expression never classifies.
    pub fn is_docstring(&self, id: NodeId) -> bool {
        let node = self.node(id);
        if !node.node.is_string_constant() {
            return false;
        }
        let Some(statement_id) = node.parent else {
            return false;
        };
        let statement = self.node(statement_id);
        if statement.node.kind != "Expr" {
            return false;
        }
        let Some(definition_id) = statement.parent else {
            return false;
        };
        let definition = self.node(definition_id);
        if !matches!(
            definition.node.kind.as_str(),
            "FunctionDef" | "ClassDef" | "Module"
        ) {
            return false;
        }
        self.first_in_body(definition_id) == Some(statement_id)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_str(value: &str) -> Arc<SyntaxNode> {
        SyntaxNode::new(
            "Constant",
            vec![
                ("value".to_string(), FieldValue::Value(json!(value))),
                ("kind".to_string(), FieldValue::Value(Value::Null)),
            ],
        )
    }

    fn constant_int(value: i64) -> Arc<SyntaxNode> {
        SyntaxNode::new(
            "Constant",
            vec![
                ("value".to_string(), FieldValue::Value(json!(value))),
                ("kind".to_string(), FieldValue::Value(Value::Null)),
            ],
        )
    }

    fn expr_statement(value: Arc<SyntaxNode>) -> Arc<SyntaxNode> {
        SyntaxNode::new(
            "Expr",
            vec![("value".to_string(), FieldValue::Node(value))],
        )
    }

    fn name(id: &str) -> Arc<SyntaxNode> {
        SyntaxNode::new(
            "Name",
            vec![("id".to_string(), FieldValue::Value(json!(id)))],
        )
    }

    fn assign(target: &str, value: Arc<SyntaxNode>) -> Arc<SyntaxNode> {
        SyntaxNode::new(
            "Assign",
            vec![
                (
                    "targets".to_string(),
                    FieldValue::List(vec![FieldValue::Node(name(target))]),
                ),
                ("value".to_string(), FieldValue::Node(value)),
            ],
        )
    }

    fn module(body: Vec<Arc<SyntaxNode>>) -> Arc<SyntaxNode> {
        SyntaxNode::new(
            "Module",
            vec![
                (
                    "body".to_string(),
                    FieldValue::List(body.into_iter().map(FieldValue::Node).collect()),
                ),
                ("type_ignores".to_string(), FieldValue::List(vec![])),
            ],
        )
    }

    fn function_def(name: &str, body: Vec<Arc<SyntaxNode>>) -> Arc<SyntaxNode> {
        SyntaxNode::new(
            "FunctionDef",
            vec![
                ("name".to_string(), FieldValue::Value(json!(name))),
                (
                    "body".to_string(),
                    FieldValue::List(body.into_iter().map(FieldValue::Node).collect()),
                ),
            ],
        )
    }

    mod wire_format {
        use super::*;

        #[test]
        fn roundtrip_preserves_kind_fields_and_order() {
            let tree = module(vec![assign("x", constant_int(1))]);
            let wire = tree.to_wire();
            let decoded = SyntaxNode::from_wire(&wire).unwrap();
            assert_eq!(*decoded, *tree);
        }

        #[test]
        fn roundtrip_preserves_location() {
            let node = Arc::new(SyntaxNode {
                kind: "Pass".to_string(),
                fields: vec![],
                location: Some(SourceLocation {
                    line: 3,
                    col: 4,
                    end_line: Some(3),
                    end_col: Some(8),
                }),
            });
            let decoded = SyntaxNode::from_wire(&node.to_wire()).unwrap();
            assert_eq!(decoded.location, node.location);
        }

        #[test]
        fn opaque_repr_values_pass_through_untouched() {
            let node = SyntaxNode::new(
                "Constant",
                vec![(
                    "value".to_string(),
                    FieldValue::Value(json!({"_repr": "b'raw'"})),
                )],
            );
            let decoded = SyntaxNode::from_wire(&node.to_wire()).unwrap();
            assert_eq!(*decoded, *node);
            // A repr stand-in is not a string constant.
            assert!(!decoded.is_string_constant());
        }

        #[test]
        fn missing_kind_is_rejected() {
            let err = SyntaxNode::from_wire(&json!({"fields": []})).unwrap_err();
            assert!(err.to_string().contains("_kind"));
        }
    }

    mod annotation {
        use super::*;

        /// Recompute the descendant closure naively and compare with the
        /// single-pass result.
        fn closure_of(tree: &AnnotatedTree, id: NodeId) -> OrderedSet<NodeId> {
            let mut result = OrderedSet::new();
            for link in tree.node(id).links() {
                result.insert(link.id);
                result.extend(closure_of(tree, link.id).iter().copied());
            }
            result
        }

        #[test]
        fn parents_point_to_immediate_containers() {
            let tree = AnnotatedTree::annotate(&module(vec![assign("x", constant_int(1))]));
            assert_eq!(tree.node(tree.root()).parent(), None);

            for (id, node) in tree.iter() {
                if id == tree.root() {
                    continue;
                }
                let parent = node.parent().expect("non-root node must have a parent");
                // The parent's links must mention this node exactly once.
                let mentions = tree
                    .node(parent)
                    .links()
                    .iter()
                    .filter(|link| link.id == id)
                    .count();
                assert_eq!(mentions, 1);
            }
        }

        #[test]
        fn children_hold_the_full_transitive_closure() {
            let tree = AnnotatedTree::annotate(&module(vec![
                assign("x", constant_int(1)),
                expr_statement(name("x")),
            ]));
            for (id, node) in tree.iter() {
                assert_eq!(*node.children(), closure_of(&tree, id), "node {id}");
            }
            // The root's closure covers every other position.
            assert_eq!(tree.node(tree.root()).children().len(), tree.len() - 1);
        }

        #[test]
        fn links_carry_field_names_and_list_positions() {
            let tree = AnnotatedTree::annotate(&module(vec![
                assign("x", constant_int(1)),
                expr_statement(name("x")),
            ]));
            let root_links = tree.node(tree.root()).links();
            assert_eq!(root_links.len(), 2);
            assert_eq!(root_links[0].field, "body");
            assert_eq!(root_links[0].index, Some(0));
            assert_eq!(root_links[1].index, Some(1));

            let assign_id = root_links[0].id;
            let assign_links = tree.node(assign_id).links();
            assert_eq!(assign_links[0].field, "targets");
            assert_eq!(assign_links[1].field, "value");
            assert_eq!(assign_links[1].index, None);
        }

        #[test]
        fn aliased_subtree_is_cloned_with_location_dropped() {
            // One node object spliced into two tree positions, as a parser
            // memory optimization or a mutation operator would produce.
            let shared = Arc::new(SyntaxNode {
                kind: "Constant".to_string(),
                fields: vec![("value".to_string(), FieldValue::Value(json!(1)))],
                location: Some(SourceLocation {
                    line: 1,
                    col: 4,
                    end_line: None,
                    end_col: None,
                }),
            });
            let tree = AnnotatedTree::annotate(&module(vec![
                assign("x", Arc::clone(&shared)),
                assign("y", shared),
            ]));

            let constants: Vec<NodeId> = tree
                .iter()
                .filter(|(_, node)| node.node().kind == "Constant")
                .map(|(id, _)| id)
                .collect();
            assert_eq!(constants.len(), 2);

            let first = tree.node(constants[0]);
            let second = tree.node(constants[1]);
            // Distinct positions with distinct parents.
            assert_ne!(first.parent(), second.parent());
            // The second occurrence was cloned: a different object, with
            // the stale location discarded. The first keeps its metadata.
            assert!(!Arc::ptr_eq(first.node(), second.node()));
            assert!(first.node().location.is_some());
            assert!(second.node().location.is_none());
        }

        #[test]
        fn every_position_has_a_single_parent() {
            let shared = constant_int(7);
            let tree = AnnotatedTree::annotate(&module(vec![
                assign("a", Arc::clone(&shared)),
                assign("b", Arc::clone(&shared)),
                assign("c", shared),
            ]));
            // Each position appears in exactly one parent's links.
            let mut seen = HashSet::new();
            for (_, node) in tree.iter() {
                for link in node.links() {
                    assert!(seen.insert(link.id), "node {} has two parents", link.id);
                }
            }
        }
    }

    mod docstrings {
        use super::*;

        fn find_constant(tree: &AnnotatedTree) -> NodeId {
            tree.iter()
                .find(|(_, node)| node.node().kind == "Constant")
                .map(|(id, _)| id)
                .expect("tree contains a constant")
        }

        #[test]
        fn first_string_statement_of_module_classifies() {
            let tree =
                AnnotatedTree::annotate(&module(vec![expr_statement(constant_str("doc"))]));
            assert!(tree.is_docstring(find_constant(&tree)));
        }

        #[test]
        fn first_string_statement_of_function_classifies() {
            let function = function_def("f", vec![expr_statement(constant_str("doc"))]);
            let tree = AnnotatedTree::annotate(&module(vec![function]));
            assert!(tree.is_docstring(find_constant(&tree)));
        }

        #[test]
        fn assigned_string_does_not_classify() {
            let tree = AnnotatedTree::annotate(&module(vec![assign("x", constant_str("doc"))]));
            assert!(!tree.is_docstring(find_constant(&tree)));
        }

        #[test]
        fn later_string_statement_does_not_classify() {
            let tree = AnnotatedTree::annotate(&module(vec![
                assign("x", constant_int(1)),
                expr_statement(constant_str("doc")),
            ]));
            let string_id = tree
                .iter()
                .find(|(_, node)| node.node().is_string_constant())
                .map(|(id, _)| id)
                .unwrap();
            assert!(!tree.is_docstring(string_id));
        }

        #[test]
        fn non_string_first_statement_does_not_classify() {
            let tree = AnnotatedTree::annotate(&module(vec![expr_statement(constant_int(1))]));
            assert!(!tree.is_docstring(find_constant(&tree)));
        }

        #[test]
        fn async_function_docstring_does_not_classify() {
            let function = SyntaxNode::new(
                "AsyncFunctionDef",
                vec![
                    ("name".to_string(), FieldValue::Value(json!("f"))),
                    (
                        "body".to_string(),
                        FieldValue::List(vec![FieldValue::Node(expr_statement(constant_str(
                            "doc",
                        )))]),
                    ),
                ],
            );
            let tree = AnnotatedTree::annotate(&module(vec![function]));
            assert!(!tree.is_docstring(find_constant(&tree)));
        }
    }
}
