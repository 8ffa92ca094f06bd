//! Pools of accessible objects for a module under test.
//!
//! A test cluster holds every way to *generate* a value of some type,
//! every way to *modify* a value of some type, and the set of accessibles
//! the search actually targets. All pools are ordered sets, so enumeration
//! is deterministic and identical across runs with the same inputs.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;

use auklet_core::OrderedSet;

use crate::accessible::AccessibleObject;
use crate::typesystem::{ProperType, TypeInfo};

/// Accessible-object pools for one module under test.
#[derive(Debug, Default)]
pub struct TestCluster {
    generators: HashMap<ProperType, OrderedSet<Arc<AccessibleObject>>>,
    modifiers: HashMap<Arc<TypeInfo>, OrderedSet<Arc<AccessibleObject>>>,
    accessible_objects_under_test: OrderedSet<Arc<AccessibleObject>>,
}

impl TestCluster {
    /// Create an empty cluster.
    pub fn new() -> Self {
        TestCluster::default()
    }

    /// Register `generator` as a way to obtain its generated type.
    ///
    /// Generators of `None` and of primitive types are dropped: the search
    /// engine seeds those values directly and a generator entry would only
    /// widen the search space without adding reachable values.
    pub fn add_generator(&mut self, generator: Arc<AccessibleObject>) {
        let generated = generator.generated_type();
        if generated.is_none_type() || generated.is_primitive() {
            return;
        }
        self.generators
            .entry(generated)
            .or_default()
            .insert(generator);
    }

    /// Register `modifier` as something that can change a value of `type_`
    /// in place (typically a method of that type).
    pub fn add_modifier(&mut self, type_: Arc<TypeInfo>, modifier: Arc<AccessibleObject>) {
        self.modifiers.entry(type_).or_default().insert(modifier);
    }

    /// Add an accessible object to the set the search targets.
    pub fn add_accessible_object_under_test(&mut self, accessible: Arc<AccessibleObject>) {
        self.accessible_objects_under_test.insert(accessible);
    }

    /// All known generators for `type_`.
    pub fn generators_for(
        &self,
        type_: &ProperType,
    ) -> Option<&OrderedSet<Arc<AccessibleObject>>> {
        self.generators.get(type_)
    }

    /// All known modifiers for values of `type_`.
    pub fn modifiers_for(&self, type_: &TypeInfo) -> Option<&OrderedSet<Arc<AccessibleObject>>> {
        self.modifiers.get(type_)
    }

    /// All generator pools.
    pub fn generators(&self) -> &HashMap<ProperType, OrderedSet<Arc<AccessibleObject>>> {
        &self.generators
    }

    /// All modifier pools.
    pub fn modifiers(&self) -> &HashMap<Arc<TypeInfo>, OrderedSet<Arc<AccessibleObject>>> {
        &self.modifiers
    }

    /// The accessible objects under test.
    pub fn accessible_objects_under_test(&self) -> &OrderedSet<Arc<AccessibleObject>> {
        &self.accessible_objects_under_test
    }

    /// Number of accessible objects under test. Useful to check whether
    /// there is anything to test at all.
    pub fn num_accessible_objects_under_test(&self) -> usize {
        self.accessible_objects_under_test.len()
    }

    /// A uniformly random accessible under test, or `None` if the cluster
    /// is empty. Deterministic for a given generator state.
    pub fn random_accessible(&self, rng: &mut impl Rng) -> Option<Arc<AccessibleObject>> {
        if self.accessible_objects_under_test.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.accessible_objects_under_test.len());
        self.accessible_objects_under_test
            .iter()
            .nth(index)
            .cloned()
    }
}

// ============================================================================
// Tests
// ============================================================================
