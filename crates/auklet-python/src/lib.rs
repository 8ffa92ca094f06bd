//! Python reflection and mutation substrate for auklet.
//!
//! This crate provides the Python-facing half of auklet:
//! - Accessible-object model over reflected program elements
//! - Test-cluster pools for a module under test
//! - Syntax-tree annotation and docstring classification
//! - The mutation-site sampling gate
//! - A CPython subprocess bridge for parsing, materialization, and
//!   module reflection

pub mod accessible;
pub mod analyse;
pub mod cluster;
pub mod interpreter;
pub mod mutation;
pub mod tree;
pub mod typesystem;

pub use accessible::AccessibleObject;
pub use analyse::{analyse_module, generate_test_cluster, ModuleReflection};
pub use cluster::TestCluster;
pub use interpreter::{Interpreter, InterpreterError, MaterializedUnit, Namespace};
pub use mutation::RandomSampler;
pub use tree::{AnnotatedTree, FieldValue, NodeId, SyntaxNode};
pub use typesystem::{
    CallableRef, InferredSignature, ProperType, SignatureMemo, TypeInfo, TypeRegistry,
};
