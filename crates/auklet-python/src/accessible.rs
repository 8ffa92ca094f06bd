// Copyright (c) the auklet contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Wrappers around constructors, methods, functions, fields and enums.
//!
//! Think of these like the reflection classes in Java: one uniform
//! capability over every program element that can produce a value or
//! perform a call, so the search engine can enumerate "all ways to obtain
//! a value of type T" without knowing whether T comes from a constructor,
//! a factory method, a field read, or an enum member.
//!
//! Each variant carries exactly the facts its identity rule needs:
//!
//! - `Enum` and `Constructor` are identified by their owning type — a class
//!   is modeled as having exactly one constructor entry, and an enum's
//!   member listing is fully determined by its owner.
//! - `Method` and `Function` are identified by the underlying callable
//!   alone; cached signatures and display names do not participate.
//! - `Field` and `StaticField` are identified by (owner, field name);
//!   `ModuleField` by (module name, field name).
//!
//! Ownership invariants are enforced by construction: variants that require
//! an owner store a non-optional descriptor, so an owner-less field or
//! method cannot be represented at all.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem::discriminant;
use std::sync::Arc;

use auklet_core::OrderedSet;

use crate::typesystem::{CallableRef, InferredSignature, ProperType, SignatureMemo, TypeInfo};

// ============================================================================
// Variant Data
// ============================================================================

/// An enumeration type, usable by naming one of its members.
#[derive(Debug, Clone)]
pub struct EnumAccessible {
    pub owner: Arc<TypeInfo>,
    /// Member names, in declaration order.
    pub members: Vec<String>,
}

/// The constructor of a class.
#[derive(Debug, Clone)]
pub struct ConstructorAccessible {
    pub owner: Arc<TypeInfo>,
    pub signature: Arc<InferredSignature>,
    pub raised_exceptions: BTreeSet<String>,
}

/// A method bound to an owning class.
#[derive(Debug, Clone)]
pub struct MethodAccessible {
    pub owner: Arc<TypeInfo>,
    pub callable: CallableRef,
    pub signature: Arc<InferredSignature>,
    pub raised_exceptions: BTreeSet<String>,
    /// Optional display name; does not participate in identity.
    pub name: Option<String>,
}

/// A free function, owned by no class.
#[derive(Debug, Clone)]
pub struct FunctionAccessible {
    pub callable: CallableRef,
    pub signature: Arc<InferredSignature>,
    pub raised_exceptions: BTreeSet<String>,
    /// Optional display name; does not participate in identity.
    pub name: Option<String>,
}

/// An instance field of a class.
#[derive(Debug, Clone)]
pub struct FieldAccessible {
    pub owner: Arc<TypeInfo>,
    pub field: String,
    pub field_type: ProperType,
}

/// A static (class-level) field.
#[derive(Debug, Clone)]
pub struct StaticFieldAccessible {
    pub owner: Arc<TypeInfo>,
    pub field: String,
    pub field_type: ProperType,
}

/// A module-level field, resolved by module name rather than owner type.
#[derive(Debug, Clone)]
pub struct ModuleFieldAccessible {
    pub module: String,
    pub field: String,
    pub field_type: ProperType,
}

// ============================================================================
// Accessible Object
// ============================================================================

/// A program element usable to produce or mutate a runtime value.
#[derive(Debug, Clone)]
pub enum AccessibleObject {
    Enum(EnumAccessible),
    Constructor(ConstructorAccessible),
    Method(MethodAccessible),
    Function(FunctionAccessible),
    Field(FieldAccessible),
    StaticField(StaticFieldAccessible),
    ModuleField(ModuleFieldAccessible),
}

impl AccessibleObject {
    /// Wrap an enumeration type with its member names.
    pub fn enumeration(owner: Arc<TypeInfo>, members: Vec<String>) -> Self {
        AccessibleObject::Enum(EnumAccessible { owner, members })
    }

    /// Wrap the constructor of `owner`.
    pub fn constructor(
        owner: Arc<TypeInfo>,
        signature: Arc<InferredSignature>,
        raised_exceptions: BTreeSet<String>,
    ) -> Self {
        AccessibleObject::Constructor(ConstructorAccessible {
            owner,
            signature,
            raised_exceptions,
        })
    }

    /// Wrap a method of `owner`.
    pub fn method(
        owner: Arc<TypeInfo>,
        callable: CallableRef,
        signature: Arc<InferredSignature>,
        raised_exceptions: BTreeSet<String>,
        name: Option<String>,
    ) -> Self {
        AccessibleObject::Method(MethodAccessible {
            owner,
            callable,
            signature,
            raised_exceptions,
            name,
        })
    }

    /// Wrap a free function.
    pub fn function(
        callable: CallableRef,
        signature: Arc<InferredSignature>,
        raised_exceptions: BTreeSet<String>,
        name: Option<String>,
    ) -> Self {
        AccessibleObject::Function(FunctionAccessible {
            callable,
            signature,
            raised_exceptions,
            name,
        })
    }

    /// Wrap an instance field of `owner`.
    pub fn field(owner: Arc<TypeInfo>, field: impl Into<String>, field_type: ProperType) -> Self {
        AccessibleObject::Field(FieldAccessible {
            owner,
            field: field.into(),
            field_type,
        })
    }

    /// Wrap a static field of `owner`.
    pub fn static_field(
        owner: Arc<TypeInfo>,
        field: impl Into<String>,
        field_type: ProperType,
    ) -> Self {
        AccessibleObject::StaticField(StaticFieldAccessible {
            owner,
            field: field.into(),
            field_type,
        })
    }

    /// Wrap a module-level field.
    pub fn module_field(
        module: impl Into<String>,
        field: impl Into<String>,
        field_type: ProperType,
    ) -> Self {
        AccessibleObject::ModuleField(ModuleFieldAccessible {
            module: module.into(),
            field: field.into(),
            field_type,
        })
    }

    // ------------------------------------------------------------------------
    // Common operations
    // ------------------------------------------------------------------------

    /// The type produced by using this accessible object.
    pub fn generated_type(&self) -> ProperType {
        match self {
            AccessibleObject::Enum(e) => ProperType::instance(&e.owner),
            AccessibleObject::Constructor(c) => ProperType::instance(&c.owner),
            AccessibleObject::Method(m) => m.signature.return_type.clone(),
            AccessibleObject::Function(f) => f.signature.return_type.clone(),
            AccessibleObject::Field(f) => f.field_type.clone(),
            AccessibleObject::StaticField(f) => f.field_type.clone(),
            AccessibleObject::ModuleField(f) => f.field_type.clone(),
        }
    }

    /// The owning type, absent for free functions and module-level fields.
    pub fn owner(&self) -> Option<&Arc<TypeInfo>> {
        match self {
            AccessibleObject::Enum(e) => Some(&e.owner),
            AccessibleObject::Constructor(c) => Some(&c.owner),
            AccessibleObject::Method(m) => Some(&m.owner),
            AccessibleObject::Field(f) => Some(&f.owner),
            AccessibleObject::StaticField(f) => Some(&f.owner),
            AccessibleObject::Function(_) | AccessibleObject::ModuleField(_) => None,
        }
    }

    /// The types that must already be obtainable before this accessible
    /// object can be used. Parameter-type lookups are memoized in the
    /// caller-owned `memo`.
    pub fn dependencies(&self, memo: &mut SignatureMemo) -> OrderedSet<ProperType> {
        match self {
            AccessibleObject::Enum(_)
            | AccessibleObject::StaticField(_)
            | AccessibleObject::ModuleField(_) => OrderedSet::new(),
            AccessibleObject::Constructor(c) => {
                c.signature.parameter_types(memo).into_iter().collect()
            }
            AccessibleObject::Method(m) => {
                let mut dependencies: OrderedSet<ProperType> =
                    m.signature.parameter_types(memo).into_iter().collect();
                dependencies.insert(ProperType::instance(&m.owner));
                dependencies
            }
            AccessibleObject::Function(f) => {
                f.signature.parameter_types(memo).into_iter().collect()
            }
            AccessibleObject::Field(f) => {
                let mut dependencies = OrderedSet::new();
                dependencies.insert(ProperType::instance(&f.owner));
                dependencies
            }
        }
    }

    /// Number of formal parameters (0 for non-callable variants).
    pub fn num_parameters(&self) -> usize {
        match self.signature() {
            Some(signature) => signature.original_parameters.len(),
            None => 0,
        }
    }

    /// The inferred signature, for callable variants.
    pub fn signature(&self) -> Option<&Arc<InferredSignature>> {
        match self {
            AccessibleObject::Constructor(c) => Some(&c.signature),
            AccessibleObject::Method(m) => Some(&m.signature),
            AccessibleObject::Function(f) => Some(&f.signature),
            _ => None,
        }
    }

    /// The underlying callable, for method and function variants.
    pub fn callable(&self) -> Option<&CallableRef> {
        match self {
            AccessibleObject::Method(m) => Some(&m.callable),
            AccessibleObject::Function(f) => Some(&f.callable),
            _ => None,
        }
    }

    /// Declared raised exceptions, for callable variants.
    pub fn raised_exceptions(&self) -> Option<&BTreeSet<String>> {
        match self {
            AccessibleObject::Constructor(c) => Some(&c.raised_exceptions),
            AccessibleObject::Method(m) => Some(&m.raised_exceptions),
            AccessibleObject::Function(f) => Some(&f.raised_exceptions),
            _ => None,
        }
    }

    /// The field name, for field variants.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            AccessibleObject::Field(f) => Some(&f.field),
            AccessibleObject::StaticField(f) => Some(&f.field),
            AccessibleObject::ModuleField(f) => Some(&f.field),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------------

    pub fn is_enum(&self) -> bool {
        matches!(self, AccessibleObject::Enum(_))
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self, AccessibleObject::Constructor(_))
    }

    pub fn is_method(&self) -> bool {
        matches!(self, AccessibleObject::Method(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, AccessibleObject::Function(_))
    }

    pub fn is_field(&self) -> bool {
        matches!(
            self,
            AccessibleObject::Field(_)
                | AccessibleObject::StaticField(_)
                | AccessibleObject::ModuleField(_)
        )
    }

    pub fn is_static(&self) -> bool {
        matches!(
            self,
            AccessibleObject::StaticField(_) | AccessibleObject::ModuleField(_)
        )
    }
}

// ============================================================================
// Identity
// ============================================================================

impl PartialEq for AccessibleObject {
    fn eq(&self, other: &Self) -> bool {
        use AccessibleObject::*;
        match (self, other) {
            (Enum(a), Enum(b)) => a.owner == b.owner,
            (Constructor(a), Constructor(b)) => a.owner == b.owner,
            (Method(a), Method(b)) => a.callable == b.callable,
            (Function(a), Function(b)) => a.callable == b.callable,
            (Field(a), Field(b)) => a.owner == b.owner && a.field == b.field,
            (StaticField(a), StaticField(b)) => a.owner == b.owner && a.field == b.field,
            (ModuleField(a), ModuleField(b)) => a.module == b.module && a.field == b.field,
            _ => false,
        }
    }
}

impl Eq for AccessibleObject {}

impl Hash for AccessibleObject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // The discriminant keeps, e.g., a Field and a StaticField over the
        // same (owner, name) pair from colliding.
        discriminant(self).hash(state);
        match self {
            AccessibleObject::Enum(e) => e.owner.hash(state),
            AccessibleObject::Constructor(c) => c.owner.hash(state),
            AccessibleObject::Method(m) => m.callable.hash(state),
            AccessibleObject::Function(f) => f.callable.hash(state),
            AccessibleObject::Field(f) => {
                f.owner.hash(state);
                f.field.hash(state);
            }
            AccessibleObject::StaticField(f) => {
                f.owner.hash(state);
                f.field.hash(state);
            }
            AccessibleObject::ModuleField(f) => {
                f.module.hash(state);
                f.field.hash(state);
            }
        }
    }
}

impl fmt::Display for AccessibleObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessibleObject::Enum(e) => write!(f, "{}", e.owner.full_name()),
            AccessibleObject::Constructor(c) => write!(f, "{}", c.owner.full_name()),
            AccessibleObject::Method(m) => {
                write!(f, "{}.{}", m.owner.full_name(), m.callable.name())
            }
            AccessibleObject::Function(fun) => write!(f, "{}", fun.callable),
            AccessibleObject::Field(fd) => write!(f, "{}.{}", fd.owner.full_name(), fd.field),
            AccessibleObject::StaticField(fd) => {
                write!(f, "{}.{}", fd.owner.full_name(), fd.field)
            }
            AccessibleObject::ModuleField(fd) => write!(f, "{}.{}", fd.module, fd.field),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
