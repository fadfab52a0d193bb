//! Reachability queries over one backend
//!
//! Every query converts the state and the query with a fresh
//! `StateConverter`, asks the backend once and reads the probed values back
//! into an `SmtModel`. Nothing is kept between queries.

use super::converter::{MemoryKey, StateConverter};
use crate::context::{TypeRegistry, OBJECT_CLASS};
use crate::features::predicate_state::PredicateState;
use crate::features::smt::domain::{
    MemoryShape, RawValue, SmtEngine, SmtError, SmtModel, SmtResult, SolverBackend, Verdict,
};
use crate::shared::models::{SymType, Term};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryMode {
    /// state ∧ query
    Path,
    /// state ∧ query path ∧ ¬(query requirements)
    Violation,
}

/// What each probe stands for
enum Probe {
    Term(Term),
    Memory { key: MemoryKey, initial: bool },
}

pub struct SmtSolver<'t, B: SolverBackend> {
    backend: B,
    types: &'t TypeRegistry,
    log_formulae: bool,
}

impl<'t, B: SolverBackend> SmtSolver<'t, B> {
    pub fn new(backend: B, types: &'t TypeRegistry) -> Self {
        Self {
            backend,
            types,
            log_formulae: false,
        }
    }

    pub fn with_formula_logging(mut self, enabled: bool) -> Self {
        self.log_formulae = enabled;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Can execution reach the end of `state`?
    pub fn is_reachable(&mut self, state: &PredicateState) -> Result<SmtResult, SmtError> {
        self.solve(state, &PredicateState::empty(), QueryMode::Path)
    }

    /// Can execution reach the end of `state` and then satisfy every
    /// predicate of `query`?
    pub fn is_path_possible(
        &mut self,
        state: &PredicateState,
        query: &PredicateState,
    ) -> Result<SmtResult, SmtError> {
        self.solve(state, query, QueryMode::Path)
    }

    /// Can the query's path hold while one of its `Require` predicates fails?
    pub fn is_violated(
        &mut self,
        state: &PredicateState,
        query: &PredicateState,
    ) -> Result<SmtResult, SmtError> {
        self.solve(state, query, QueryMode::Violation)
    }

    fn solve(
        &mut self,
        state: &PredicateState,
        query: &PredicateState,
        mode: QueryMode,
    ) -> Result<SmtResult, SmtError> {
        let types = self.types;
        let (assertions, probe_exprs, probes, owners) = {
            let mut conv = StateConverter::new(self.backend.engine(), types);
            let state_formula = conv.convert_state(state)?;
            let query_formula = match mode {
                QueryMode::Path => {
                    let path = conv.convert_path(query)?;
                    let required = conv.convert_requirements(query)?;
                    conv.engine().conjunction(&[path, required])
                }
                QueryMode::Violation => {
                    let path = conv.convert_path(query)?;
                    let required = conv.convert_requirements(query)?;
                    let violated = conv.engine().negate(&required)?;
                    conv.engine().conjunction(&[path, violated])
                }
            };

            let mut assertions = vec![state_formula, query_formula];
            assertions.extend(conv.axioms().iter().cloned());

            let mut probe_exprs = Vec::new();
            let mut probes = Vec::new();
            for (term, expr) in conv.named_terms() {
                probe_exprs.push(expr.clone());
                probes.push(Probe::Term(term.clone()));
            }
            let mut owners = FxHashMap::default();
            for (key, initial, fin) in conv.memories() {
                if let Some(ty) = conv.owner_type(key.memspace()) {
                    owners.insert(key.memspace(), ty.clone());
                }
                probe_exprs.push(initial);
                probes.push(Probe::Memory {
                    key: key.clone(),
                    initial: true,
                });
                probe_exprs.push(fin);
                probes.push(Probe::Memory { key, initial: false });
            }
            (assertions, probe_exprs, probes, owners)
        };

        if self.log_formulae {
            for a in &assertions {
                debug!(backend = self.backend.name(), "assert {:?}", a);
            }
        }

        let verdict = self.backend.check(&assertions, &probe_exprs)?;
        trace!(backend = self.backend.name(), ?mode, "verdict {:?}", verdict);
        Ok(match verdict {
            Verdict::Sat(values) => SmtResult::Sat(build_model(self.types, &probes, values, &owners)),
            Verdict::Unsat => SmtResult::Unsat,
            Verdict::Unknown(reason) => SmtResult::Unknown(reason),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Model reconstruction
// ═══════════════════════════════════════════════════════════════════════════

fn build_model(
    types: &TypeRegistry,
    probes: &[Probe],
    values: Vec<Option<RawValue>>,
    owners: &FxHashMap<u32, SymType>,
) -> SmtModel {
    let mut model = SmtModel::default();
    for (probe, value) in probes.iter().zip(values) {
        let Some(value) = value else { continue };
        match probe {
            Probe::Term(term) => {
                let Some(v) = value_term(&value, term.ty()) else {
                    continue;
                };
                if term.ty().is_reference() && !v.is_null() {
                    if let Some(concrete) = types.concretize(term.ty()) {
                        model.types.insert(term.clone(), concrete);
                    }
                }
                model.assignments.insert(term.clone(), v);
            }
            Probe::Memory { key, initial } => {
                let shape = shape_for(&mut model, key);
                let target = if *initial {
                    &mut shape.initial_memory
                } else {
                    &mut shape.final_memory
                };
                fill_memory(target, key, &value, owners);
            }
        }
    }
    model
}

fn shape_for<'m>(model: &'m mut SmtModel, key: &MemoryKey) -> &'m mut MemoryShape {
    match key {
        MemoryKey::Property { memspace, name, .. } => model
            .properties
            .entry(*memspace)
            .or_default()
            .entry(name.to_string())
            .or_default(),
        MemoryKey::Elements { memspace, .. } => model.memories.entry(*memspace).or_default(),
        MemoryKey::Length { memspace } => model.bounds.entry(*memspace).or_default(),
    }
}

fn fill_memory(
    target: &mut FxHashMap<Term, Term>,
    key: &MemoryKey,
    value: &RawValue,
    owners: &FxHashMap<u32, SymType>,
) {
    let RawValue::Array { entries, .. } = value else {
        return;
    };
    let memspace = key.memspace();
    match key {
        MemoryKey::Property { ty, .. } => {
            let owner = owners
                .get(&memspace)
                .cloned()
                .unwrap_or_else(|| SymType::class(OBJECT_CLASS).with_memspace(memspace));
            for (addr, v) in entries {
                let (Some(addr), Some(v)) = (address_term(addr, &owner), value_term(v, ty)) else {
                    continue;
                };
                target.insert(addr, v);
            }
        }
        MemoryKey::Elements { element, .. } => {
            let array_ty = SymType::Array {
                element: Box::new(element.clone()),
                memspace,
            };
            for (addr, inner) in entries {
                let Some(array) = address_term(addr, &array_ty) else {
                    continue;
                };
                let RawValue::Array { entries: cells, .. } = inner else {
                    continue;
                };
                for (idx, v) in cells {
                    let (Some(idx), Some(v)) = (idx.as_signed(), value_term(v, element)) else {
                        continue;
                    };
                    let index = Term::array_index(array.clone(), Term::integral(idx, SymType::Int));
                    target.insert(index, v);
                }
            }
        }
        MemoryKey::Length { .. } => {
            let owner = owners
                .get(&memspace)
                .cloned()
                .unwrap_or_else(|| SymType::array(SymType::Int).with_memspace(memspace));
            for (addr, len) in entries {
                let (Some(addr), Some(len)) = (address_term(addr, &owner), len.as_signed()) else {
                    continue;
                };
                target.insert(addr, Term::integral(len, SymType::Int));
            }
        }
    }
}

fn address_term(raw: &RawValue, ty: &SymType) -> Option<Term> {
    match raw.as_signed()? {
        0 => Some(Term::null()),
        addr => Some(Term::integral(addr, ty.clone())),
    }
}

/// Constant term of type `ty` for a raw solver value
pub fn value_term(raw: &RawValue, ty: &SymType) -> Option<Term> {
    match ty {
        SymType::Bool => raw.as_bool().map(Term::bool),
        SymType::Float => match raw {
            RawValue::Float(f) => Some(Term::float(*f as f32)),
            _ => None,
        },
        SymType::Double => match raw {
            RawValue::Float(f) => Some(Term::double(*f)),
            _ => None,
        },
        ty if ty.is_reference() => address_term(raw, ty),
        SymType::Void => None,
        ty => raw.as_signed().map(|v| Term::integral(v, ty.clone())),
    }
}
