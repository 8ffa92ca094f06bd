//! Type descriptors consumed by the accessible-object model.
//!
//! auklet does not infer types: descriptors, signatures, and the dependency
//! memo are the *interface* to the type-inference collaborator. Everything
//! here is a name-addressed stand-in for a runtime type or callable handle,
//! since the runtime itself lives on the other side of the interpreter
//! bridge.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Descriptors
// ============================================================================

/// Descriptor of a nominal runtime type.
///
/// Identity, equality, and hashing are by qualified name: in a bridge that
/// addresses the interpreter by name, `module.qualname` *is* the runtime
/// type handle. Descriptors are shared as `Arc<TypeInfo>` and outlive the
/// accessible objects that reference them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Module the type is defined in (e.g., `"queue"`).
    pub module: String,
    /// Qualified name within the module (e.g., `"Queue"` or `"Outer.Inner"`).
    pub qualname: String,
}

impl TypeInfo {
    /// Create a new type descriptor.
    pub fn new(module: impl Into<String>, qualname: impl Into<String>) -> Self {
        TypeInfo {
            module: module.into(),
            qualname: qualname.into(),
        }
    }

    /// Fully qualified name, `module.qualname`.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.module, self.qualname)
    }

    /// The unqualified name (last segment of `qualname`).
    pub fn name(&self) -> &str {
        self.qualname.rsplit('.').next().unwrap_or(&self.qualname)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.qualname)
    }
}

/// Interner for type descriptors.
///
/// Every mention of a runtime type should resolve to the same shared
/// descriptor, so that descriptor equality is cheap and pools keyed by type
/// deduplicate correctly.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<TypeInfo>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// Look up or create the shared descriptor for `module.qualname`.
    pub fn type_info(&mut self, module: &str, qualname: &str) -> Arc<TypeInfo> {
        let full_name = format!("{module}.{qualname}");
        Arc::clone(
            self.types
                .entry(full_name)
                .or_insert_with(|| Arc::new(TypeInfo::new(module, qualname))),
        )
    }

    /// Number of interned descriptors.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ============================================================================
// Proper Types
// ============================================================================

/// A concrete (non-deferred) type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProperType {
    /// The unknown/unconstrained type.
    Any,
    /// The type of `None`.
    NoneType,
    /// An instance of a nominal type.
    Instance(Arc<TypeInfo>),
    /// A fixed-arity tuple.
    Tuple(Vec<ProperType>),
    /// An untagged union of alternatives.
    Union(Vec<ProperType>),
}

/// Builtin types treated as primitives by the cluster (no generator needed;
/// the search engine seeds them directly).
const PRIMITIVE_TYPES: &[&str] = &["int", "float", "str", "bool", "bytes", "complex"];

impl ProperType {
    /// Instance type for a shared descriptor.
    pub fn instance(owner: &Arc<TypeInfo>) -> Self {
        ProperType::Instance(Arc::clone(owner))
    }

    /// Whether this is the type of `None`.
    pub fn is_none_type(&self) -> bool {
        matches!(self, ProperType::NoneType)
    }

    /// Whether this is an instance of a builtin primitive type.
    pub fn is_primitive(&self) -> bool {
        match self {
            ProperType::Instance(info) => {
                info.module == "builtins" && PRIMITIVE_TYPES.contains(&info.qualname.as_str())
            }
            _ => false,
        }
    }
}

impl fmt::Display for ProperType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProperType::Any => write!(f, "Any"),
            ProperType::NoneType => write!(f, "None"),
            ProperType::Instance(info) => write!(f, "{info}"),
            ProperType::Tuple(elements) => {
                write!(f, "tuple[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            ProperType::Union(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{alternative}")?;
                }
                Ok(())
            }
        }
    }
}

// ============================================================================
// Signatures
// ============================================================================

/// A formal parameter with its declared (possibly `Any`) type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub declared_type: ProperType,
}

impl Parameter {
    pub fn new(name: impl Into<String>, declared_type: ProperType) -> Self {
        Parameter {
            name: name.into(),
            declared_type,
        }
    }

    /// Parameter with no type information.
    pub fn untyped(name: impl Into<String>) -> Self {
        Parameter::new(name, ProperType::Any)
    }
}

/// Signature identity, assigned at construction.
///
/// The dependency memo is keyed by this id, so repeated dependency queries
/// against the same signature reuse earlier results.
pub type SignatureId = u64;

/// Caller-owned memo of parameter types per signature.
///
/// Opaque to the accessible-object model: it is only read and inserted
/// into through [`InferredSignature::parameter_types`], never cleared or
/// otherwise interpreted.
pub type SignatureMemo = HashMap<SignatureId, Vec<ProperType>>;

static NEXT_SIGNATURE_ID: AtomicU64 = AtomicU64::new(1);

/// Signature of a callable as supplied by the type-inference collaborator.
///
/// `self`/`cls` receivers are excluded from `original_parameters`.
#[derive(Debug, Clone)]
pub struct InferredSignature {
    id: SignatureId,
    pub return_type: ProperType,
    pub original_parameters: Vec<Parameter>,
}

impl InferredSignature {
    /// Create a signature with a fresh identity.
    pub fn new(return_type: ProperType, original_parameters: Vec<Parameter>) -> Self {
        InferredSignature {
            id: NEXT_SIGNATURE_ID.fetch_add(1, Ordering::Relaxed),
            return_type,
            original_parameters,
        }
    }

    /// Signature with the given parameter names and no type information.
    pub fn untyped(parameter_names: &[String]) -> Self {
        InferredSignature::new(
            ProperType::Any,
            parameter_names
                .iter()
                .map(|name| Parameter::untyped(name.as_str()))
                .collect(),
        )
    }

    /// This signature's identity.
    pub fn id(&self) -> SignatureId {
        self.id
    }

    /// The parameter types, memoized in the caller-owned `memo`.
    pub fn parameter_types(&self, memo: &mut SignatureMemo) -> Vec<ProperType> {
        memo.entry(self.id)
            .or_insert_with(|| {
                self.original_parameters
                    .iter()
                    .map(|parameter| parameter.declared_type.clone())
                    .collect()
            })
            .clone()
    }
}

// ============================================================================
// Callable Identity
// ============================================================================

/// Identity of a runtime callable (function, method, descriptor).
///
/// Two wrappers around the same `module`/`qualname` pair refer to the same
/// callable object in the target interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallableRef {
    pub module: String,
    pub qualname: String,
}

impl CallableRef {
    pub fn new(module: impl Into<String>, qualname: impl Into<String>) -> Self {
        CallableRef {
            module: module.into(),
            qualname: qualname.into(),
        }
    }

    /// The unqualified callable name (last segment of `qualname`).
    pub fn name(&self) -> &str {
        self.qualname.rsplit('.').next().unwrap_or(&self.qualname)
    }
}

impl fmt::Display for CallableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.qualname)
    }
}

// ============================================================================
// Tests
// ============================================================================
