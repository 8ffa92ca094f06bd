//! Module analysis: from reflection facts to a test cluster.
//!
//! The interpreter's `reflect` operation reports what a module defines;
//! this module decides what of that is usable for generation and wraps it
//! in accessible objects. Private (`__x`) and protected (`_x`) names,
//! constructors (handled via the class entry), inherited methods (reported
//! under their defining class), and async generators are skipped.
//!
//! All declared types come back as `Any`: type inference belongs to a
//! separate collaborator and is deliberately not performed here.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::accessible::AccessibleObject;
use crate::cluster::TestCluster;
use crate::interpreter::{Interpreter, InterpreterResult};
use crate::typesystem::{CallableRef, InferredSignature, ProperType, TypeRegistry};

// ============================================================================
// Reflection Facts
// ============================================================================

/// Reflection facts for one imported module, as reported by the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleReflection {
    /// Fully qualified module name.
    pub module: String,
    /// Module-level functions defined in this module.
    #[serde(default)]
    pub functions: Vec<FunctionReflection>,
    /// Classes defined in this module.
    #[serde(default)]
    pub classes: Vec<ClassReflection>,
    /// Module-level non-callable bindings.
    #[serde(default)]
    pub module_fields: Vec<ModuleFieldReflection>,
}

/// A module-level function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionReflection {
    pub name: String,
    pub qualname: String,
    /// Parameter names, receivers excluded.
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub is_async_generator: bool,
}

/// A class, with the members usable for generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassReflection {
    pub name: String,
    pub qualname: String,
    #[serde(default)]
    pub is_enum: bool,
    /// Enum member names (empty for non-enums).
    #[serde(default)]
    pub members: Vec<String>,
    /// Constructor parameter names, receiver excluded.
    #[serde(default)]
    pub constructor_parameters: Vec<String>,
    /// Methods defined on this class (inherited ones are reported under
    /// their defining class).
    #[serde(default)]
    pub methods: Vec<MethodReflection>,
}

/// A method defined on a class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodReflection {
    pub name: String,
    pub qualname: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub is_async_generator: bool,
}

/// A module-level non-callable binding, with the runtime type of its value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleFieldReflection {
    pub name: String,
    pub type_module: String,
    pub type_qualname: String,
}

// ============================================================================
// Name Filters
// ============================================================================

/// `__name` but not `__name__`.
fn is_private(name: &str) -> bool {
    name.starts_with("__") && !name.ends_with("__")
}

/// `_name` but not `__name`.
fn is_protected(name: &str) -> bool {
    name.starts_with('_') && !name.starts_with("__")
}

fn is_constructor(name: &str) -> bool {
    name == "__init__"
}

// ============================================================================
// Analysis
// ============================================================================

/// Build a test cluster for `module_name` by reflecting it through the
/// given interpreter.
pub fn generate_test_cluster(
    interpreter: &Interpreter,
    module_name: &str,
    search_path: Option<&Path>,
    registry: &mut TypeRegistry,
) -> InterpreterResult<TestCluster> {
    let reflection = interpreter.reflect(module_name, search_path)?;
    Ok(analyse_module(&reflection, registry))
}

/// Build a test cluster from already-gathered reflection facts.
pub fn analyse_module(reflection: &ModuleReflection, registry: &mut TypeRegistry) -> TestCluster {
    let mut cluster = TestCluster::new();

    for function in &reflection.functions {
        analyse_function(&reflection.module, function, &mut cluster);
    }
    for class in &reflection.classes {
        analyse_class(&reflection.module, class, registry, &mut cluster);
    }
    for field in &reflection.module_fields {
        analyse_module_field(&reflection.module, field, registry, &mut cluster);
    }

    cluster
}

fn analyse_function(module: &str, function: &FunctionReflection, cluster: &mut TestCluster) {
    if is_private(&function.name) || is_protected(&function.name) {
        debug!(name = %function.name, "skipping function from analysis");
        return;
    }
    if function.is_async_generator {
        debug!(name = %function.name, "skipping async function from analysis");
        return;
    }

    debug!(name = %function.name, "analysing function");
    let accessible = Arc::new(AccessibleObject::function(
        CallableRef::new(module, function.qualname.as_str()),
        Arc::new(InferredSignature::untyped(&function.parameters)),
        BTreeSet::new(),
        Some(function.name.clone()),
    ));
    cluster.add_generator(Arc::clone(&accessible));
    cluster.add_accessible_object_under_test(accessible);
}

fn analyse_class(
    module: &str,
    class: &ClassReflection,
    registry: &mut TypeRegistry,
    cluster: &mut TestCluster,
) {
    if is_private(&class.name) || is_protected(&class.name) {
        debug!(name = %class.name, "skipping class from analysis");
        return;
    }

    debug!(name = %class.name, "analysing class");
    let owner = registry.type_info(module, &class.qualname);

    let generic = if class.is_enum {
        AccessibleObject::enumeration(Arc::clone(&owner), class.members.clone())
    } else {
        AccessibleObject::constructor(
            Arc::clone(&owner),
            Arc::new(InferredSignature::untyped(&class.constructor_parameters)),
            BTreeSet::new(),
        )
    };
    let generic = Arc::new(generic);
    cluster.add_generator(Arc::clone(&generic));
    cluster.add_accessible_object_under_test(generic);

    for method in &class.methods {
        analyse_method(module, class, method, registry, cluster);
    }
}

fn analyse_method(
    module: &str,
    class: &ClassReflection,
    method: &MethodReflection,
    registry: &mut TypeRegistry,
    cluster: &mut TestCluster,
) {
    if is_private(&method.name) || is_protected(&method.name) || is_constructor(&method.name) {
        debug!(class = %class.name, name = %method.name, "skipping method from analysis");
        return;
    }
    if method.is_async_generator {
        debug!(class = %class.name, name = %method.name, "skipping async method from analysis");
        return;
    }

    debug!(class = %class.name, name = %method.name, "analysing method");
    let owner = registry.type_info(module, &class.qualname);
    let accessible = Arc::new(AccessibleObject::method(
        Arc::clone(&owner),
        CallableRef::new(module, method.qualname.as_str()),
        Arc::new(InferredSignature::untyped(&method.parameters)),
        BTreeSet::new(),
        Some(method.name.clone()),
    ));
    cluster.add_generator(Arc::clone(&accessible));
    cluster.add_modifier(owner, Arc::clone(&accessible));
    cluster.add_accessible_object_under_test(accessible);
}

fn analyse_module_field(
    module: &str,
    field: &ModuleFieldReflection,
    registry: &mut TypeRegistry,
    cluster: &mut TestCluster,
) {
    let field_type =
        ProperType::instance(&registry.type_info(&field.type_module, &field.type_qualname));
    let accessible = Arc::new(AccessibleObject::module_field(
        module,
        field.name.as_str(),
        field_type,
    ));
    cluster.add_generator(accessible);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::TypeInfo;

    fn reflection() -> ModuleReflection {
        ModuleReflection {
            module: "sut".to_string(),
            functions: vec![
                FunctionReflection {
                    name: "make_queue".to_string(),
                    qualname: "make_queue".to_string(),
                    parameters: vec!["size".to_string()],
                    is_async_generator: false,
                },
                FunctionReflection {
                    name: "_helper".to_string(),
                    qualname: "_helper".to_string(),
                    parameters: vec![],
                    is_async_generator: false,
                },
                FunctionReflection {
                    name: "stream".to_string(),
                    qualname: "stream".to_string(),
                    parameters: vec![],
                    is_async_generator: true,
                },
            ],
            classes: vec![
                ClassReflection {
                    name: "Queue".to_string(),
                    qualname: "Queue".to_string(),
                    is_enum: false,
                    members: vec![],
                    constructor_parameters: vec!["capacity".to_string()],
                    methods: vec![
                        MethodReflection {
                            name: "push".to_string(),
                            qualname: "Queue.push".to_string(),
                            parameters: vec!["item".to_string()],
                            is_async_generator: false,
                        },
                        MethodReflection {
                            name: "__init__".to_string(),
                            qualname: "Queue.__init__".to_string(),
                            parameters: vec!["capacity".to_string()],
                            is_async_generator: false,
                        },
                        MethodReflection {
                            name: "_rebalance".to_string(),
                            qualname: "Queue._rebalance".to_string(),
                            parameters: vec![],
                            is_async_generator: false,
                        },
                    ],
                },
                ClassReflection {
                    name: "Color".to_string(),
                    qualname: "Color".to_string(),
                    is_enum: true,
                    members: vec!["RED".to_string(), "BLUE".to_string()],
                    constructor_parameters: vec![],
                    methods: vec![],
                },
            ],
            module_fields: vec![ModuleFieldReflection {
                name: "DEFAULT_CAPACITY".to_string(),
                type_module: "builtins".to_string(),
                type_qualname: "int".to_string(),
            }],
        }
    }

    #[test]
    fn public_function_becomes_accessible_under_test() {
        let mut registry = TypeRegistry::new();
        let cluster = analyse_module(&reflection(), &mut registry);

        let under_test = cluster.accessible_objects_under_test();
        assert!(under_test
            .iter()
            .any(|acc| acc.is_function() && acc.to_string() == "sut.make_queue"));
    }

    #[test]
    fn private_and_async_functions_are_skipped() {
        let mut registry = TypeRegistry::new();
        let cluster = analyse_module(&reflection(), &mut registry);

        for accessible in cluster.accessible_objects_under_test() {
            assert_ne!(accessible.to_string(), "sut._helper");
            assert_ne!(accessible.to_string(), "sut.stream");
        }
    }

    #[test]
    fn class_contributes_constructor_generator_and_method_modifier() {
        let mut registry = TypeRegistry::new();
        let cluster = analyse_module(&reflection(), &mut registry);
        let queue = registry.type_info("sut", "Queue");

        let generators = cluster
            .generators_for(&ProperType::instance(&queue))
            .expect("constructor registered as generator");
        assert!(generators.iter().any(|acc| acc.is_constructor()));

        let modifiers = cluster.modifiers_for(&queue).expect("push is a modifier");
        assert_eq!(modifiers.len(), 1);
        assert!(modifiers.iter().all(|acc| acc.is_method()));
    }

    #[test]
    fn constructor_and_private_methods_are_not_modifiers() {
        let mut registry = TypeRegistry::new();
        let cluster = analyse_module(&reflection(), &mut registry);
        let queue = registry.type_info("sut", "Queue");

        let modifiers = cluster.modifiers_for(&queue).unwrap();
        for modifier in modifiers {
            let name = modifier.callable().unwrap().name();
            assert_ne!(name, "__init__");
            assert_ne!(name, "_rebalance");
        }
    }

    #[test]
    fn enum_class_becomes_enum_accessible() {
        let mut registry = TypeRegistry::new();
        let cluster = analyse_module(&reflection(), &mut registry);
        let color = registry.type_info("sut", "Color");

        let generators = cluster
            .generators_for(&ProperType::instance(&color))
            .expect("enum registered as generator");
        assert!(generators.iter().any(|acc| acc.is_enum()));
    }

    #[test]
    fn primitive_module_fields_do_not_become_generators() {
        let mut registry = TypeRegistry::new();
        let cluster = analyse_module(&reflection(), &mut registry);

        // DEFAULT_CAPACITY is an int; primitive generators are dropped by
        // the cluster, so no generator pool may contain it.
        let int_type = ProperType::Instance(Arc::new(TypeInfo::new("builtins", "int")));
        assert!(cluster.generators_for(&int_type).is_none());
    }

    #[test]
    fn name_filters() {
        assert!(is_private("__secret"));
        assert!(!is_private("__init__"));
        assert!(is_protected("_helper"));
        assert!(!is_protected("__secret"));
        assert!(is_constructor("__init__"));
    }
}
