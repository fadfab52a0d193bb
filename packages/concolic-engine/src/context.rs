//! Analysis context
//!
//! Everything the engine would otherwise look up in process-wide state:
//! configuration, callee predicate states for inlining, the class
//! hierarchy used for `instanceof` and model type concretization, and the
//! terms a dataflow pass proved non-null. Built by the driver and passed by
//! reference to every component.

use crate::config::EngineConfig;
use crate::features::predicate_state::PredicateState;
use crate::shared::models::{MethodRef, SymType, Term};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::sync::Arc;

/// Root of every class hierarchy
pub const OBJECT_CLASS: &str = "java/lang/Object";

// ═══════════════════════════════════════════════════════════════════════════
// Method registry
// ═══════════════════════════════════════════════════════════════════════════

/// Predicate states of methods available for inlining.
///
/// Callee states are written against placeholders: `Term::this`,
/// `Term::argument(i)` and `Term::return_value(method)`.
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    states: FxHashMap<MethodRef, PredicateState>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: MethodRef, state: PredicateState) {
        self.states.insert(method, state);
    }

    pub fn get(&self, method: &MethodRef) -> Option<&PredicateState> {
        self.states.get(method)
    }

    pub fn contains(&self, method: &MethodRef) -> bool {
        self.states.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Type registry
// ═══════════════════════════════════════════════════════════════════════════

/// Class hierarchy supplied by the bytecode layer
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    supertypes: FxHashMap<Arc<str>, Vec<Arc<str>>>,
    abstract_types: FxHashSet<Arc<str>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instantiable class with its direct supertypes
    pub fn register_class<I, S>(&mut self, name: impl Into<Arc<str>>, supertypes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        self.supertypes
            .insert(name.into(), supertypes.into_iter().map(Into::into).collect());
    }

    /// Register an interface or abstract class
    pub fn register_abstract<I, S>(&mut self, name: impl Into<Arc<str>>, supertypes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let name = name.into();
        self.abstract_types.insert(name.clone());
        self.register_class(name, supertypes);
    }

    pub fn is_known(&self, name: &str) -> bool {
        name == OBJECT_CLASS || self.supertypes.contains_key(name)
    }

    pub fn is_abstract(&self, name: &str) -> bool {
        self.abstract_types.contains(name)
    }

    /// Reflexive, transitive subtype check; every class is an `Object`
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT_CLASS {
            return true;
        }
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::from([sub]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(supers) = self.supertypes.get(current) {
                for s in supers {
                    if s.as_ref() == sup {
                        return true;
                    }
                    queue.push_back(s);
                }
            }
        }
        false
    }

    /// `Some(true)` when `sub <: sup`, `Some(false)` when both are known and
    /// no object can be both, `None` when the hierarchy cannot tell
    pub fn relation(&self, sub: &str, sup: &str) -> Option<bool> {
        if self.is_subtype(sub, sup) {
            return Some(true);
        }
        if !self.is_known(sub) || !self.is_known(sup) {
            return None;
        }
        if self.is_subtype(sup, sub) {
            // downcast: depends on the dynamic type
            return None;
        }
        if self.is_abstract(sub) || self.is_abstract(sup) {
            // an unregistered class could implement both
            return None;
        }
        Some(false)
    }

    /// Instantiable stand-in for an abstract class type, if one is registered
    pub fn concretize(&self, ty: &SymType) -> Option<SymType> {
        let SymType::Class { name, memspace } = ty else {
            return None;
        };
        if !self.is_abstract(name) {
            return None;
        }
        let mut candidates: Vec<&Arc<str>> = self
            .supertypes
            .keys()
            .filter(|c| !self.is_abstract(c) && self.is_subtype(c, name))
            .collect();
        candidates.sort();
        candidates.first().map(|c| SymType::Class {
            name: (*c).clone(),
            memspace: *memspace,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Context
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct AnalysisContext {
    config: Arc<EngineConfig>,
    methods: MethodRegistry,
    types: TypeRegistry,
    non_null: FxHashSet<Term>,
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self::new(Arc::new(EngineConfig::default()))
    }
}

impl AnalysisContext {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            config,
            methods: MethodRegistry::new(),
            types: TypeRegistry::new(),
            non_null: FxHashSet::default(),
        }
    }

    pub fn with_registries(
        config: Arc<EngineConfig>,
        methods: MethodRegistry,
        types: TypeRegistry,
    ) -> Self {
        Self {
            config,
            methods,
            types,
            non_null: FxHashSet::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<EngineConfig> {
        self.config.clone()
    }

    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    pub fn methods_mut(&mut self) -> &mut MethodRegistry {
        &mut self.methods
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// Record a dataflow fact: `term` is never null
    pub fn mark_non_null(&mut self, term: Term) {
        self.non_null.insert(term);
    }

    pub fn non_null(&self) -> &FxHashSet<Term> {
        &self.non_null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types.register_abstract("Shape", [OBJECT_CLASS]);
        types.register_class("Circle", ["Shape"]);
        types.register_class("Square", ["Shape"]);
        types.register_class("Point", [OBJECT_CLASS]);
        types
    }

    #[test]
    fn test_subtyping() {
        let types = hierarchy();
        assert!(types.is_subtype("Circle", "Shape"));
        assert!(types.is_subtype("Circle", OBJECT_CLASS));
        assert!(!types.is_subtype("Shape", "Circle"));
        assert_eq!(types.relation("Circle", "Point"), Some(false));
        assert_eq!(types.relation("Shape", "Circle"), None);
        assert_eq!(types.relation("Unknown", "Circle"), None);
    }

    #[test]
    fn test_concretize_picks_registered_implementation() {
        let types = hierarchy();
        assert_eq!(
            types.concretize(&SymType::class("Shape")),
            Some(SymType::class("Circle"))
        );
        assert_eq!(types.concretize(&SymType::class("Point")), None);
    }

    #[test]
    fn test_context_carries_config() {
        let ctx = AnalysisContext::default();
        assert_eq!(ctx.config().version, 1);
        assert!(ctx.methods().is_empty());
    }
}
