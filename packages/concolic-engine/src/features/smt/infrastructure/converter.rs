//! PredicateState → solver expressions
//!
//! Heap contents are modelled as one array per memory: a field property of a
//! memspace, the element arrays of a memspace, or the array lengths of a
//! memspace. Stores produce new versions; every memory keeps its initial
//! version so the model can report before/after shapes. `Choice` branches
//! convert against the same incoming memory and their outgoing memories are
//! merged with `ite` over a fresh guard per branch, the guard also selecting
//! the branch formula.

use crate::context::TypeRegistry;
use crate::features::predicate_state::PredicateState;
use crate::features::smt::domain::{Opcode, SmtEngine, SmtError};
use crate::shared::models::{
    BinaryOp, CmpOp, Predicate, PredicateBody, PredicateKind, SymType, Term, TermKind, WORD,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Identity of one modelled memory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryKey {
    /// Field `name` of objects in `memspace`; `ty` is the field type
    Property {
        memspace: u32,
        name: Arc<str>,
        ty: SymType,
    },
    /// Elements of arrays in `memspace`
    Elements { memspace: u32, element: SymType },
    /// Lengths of arrays in `memspace`
    Length { memspace: u32 },
}

impl MemoryKey {
    pub fn memspace(&self) -> u32 {
        match self {
            MemoryKey::Property { memspace, .. }
            | MemoryKey::Elements { memspace, .. }
            | MemoryKey::Length { memspace } => *memspace,
        }
    }

    fn label(&self) -> String {
        match self {
            MemoryKey::Property { memspace, name, .. } => format!("prop!{}!{}", memspace, name),
            MemoryKey::Elements { memspace, .. } => format!("elems!{}", memspace),
            MemoryKey::Length { memspace } => format!("len!{}", memspace),
        }
    }
}

type Memory<E> = FxHashMap<MemoryKey, <E as SmtEngine>::Expr>;

/// Converts states and queries into assertions for one engine. Terms keep
/// the same expression across calls, so a state and its query share
/// variables and memories.
pub struct StateConverter<'a, E: SmtEngine> {
    engine: &'a mut E,
    types: &'a TypeRegistry,
    terms: FxHashMap<Term, E::Expr>,
    names: FxHashMap<String, Term>,
    /// Terms whose values the model reports
    named: Vec<(Term, E::Expr)>,
    initial: Memory<E>,
    current: Memory<E>,
    axioms: Vec<E::Expr>,
    /// First reference type seen per memspace, used to type model addresses
    owners: FxHashMap<u32, SymType>,
}

impl<'a, E: SmtEngine> StateConverter<'a, E> {
    pub fn new(engine: &'a mut E, types: &'a TypeRegistry) -> Self {
        Self {
            engine,
            types,
            terms: FxHashMap::default(),
            names: FxHashMap::default(),
            named: Vec::new(),
            initial: FxHashMap::default(),
            current: FxHashMap::default(),
            axioms: Vec::new(),
            owners: FxHashMap::default(),
        }
    }

    pub fn engine(&mut self) -> &mut E {
        &mut *self.engine
    }

    /// Side conditions collected while converting (non-null string
    /// constants and the like)
    pub fn axioms(&self) -> &[E::Expr] {
        &self.axioms
    }

    pub fn named_terms(&self) -> &[(Term, E::Expr)] {
        &self.named
    }

    /// Reference type addresses of `memspace` are reported with
    pub fn owner_type(&self, memspace: u32) -> Option<&SymType> {
        self.owners.get(&memspace)
    }

    fn note_owner(&mut self, owner: &Term) {
        let ty = owner.ty();
        if ty.is_reference() && !matches!(ty, SymType::Null) {
            self.owners.entry(ty.memspace()).or_insert_with(|| ty.clone());
        }
    }

    /// `(key, initial, final)` for every memory touched so far
    pub fn memories(&self) -> Vec<(MemoryKey, E::Expr, E::Expr)> {
        let mut keys: Vec<&MemoryKey> = self.initial.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|k| {
                let init = self.initial[k].clone();
                let fin = self.current.get(k).cloned().unwrap_or_else(|| init.clone());
                (k.clone(), init, fin)
            })
            .collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // States
    // ═══════════════════════════════════════════════════════════════════════

    /// Formula of the whole state; the converter's memory afterwards is the
    /// state's final memory
    pub fn convert_state(&mut self, state: &PredicateState) -> Result<E::Expr, SmtError> {
        match state {
            PredicateState::Basic(predicates) => {
                let mut parts = Vec::with_capacity(predicates.len());
                for p in predicates.iter() {
                    parts.push(self.convert_predicate(p)?);
                }
                Ok(self.engine.conjunction(&parts))
            }
            PredicateState::Chain { base, tail } => {
                let base = self.convert_state(base)?;
                let tail = self.convert_state(tail)?;
                Ok(self.engine.conjunction(&[base, tail]))
            }
            PredicateState::Choice(branches) => self.convert_choice(branches),
        }
    }

    fn convert_choice(&mut self, branches: &[PredicateState]) -> Result<E::Expr, SmtError> {
        if branches.is_empty() {
            return Ok(self.engine.make_bool(true));
        }
        let incoming = self.current.clone();
        let bool_sort = self.engine.bool_sort();
        let mut guarded = Vec::with_capacity(branches.len());
        let mut outgoing: Vec<(E::Expr, Memory<E>)> = Vec::with_capacity(branches.len());
        for branch in branches {
            self.current = incoming.clone();
            let formula = self.convert_state(branch)?;
            let guard = self.engine.make_fresh_var("choice", &bool_sort);
            guarded.push(self.engine.conjunction(&[guard.clone(), formula]));
            outgoing.push((guard, std::mem::take(&mut self.current)));
        }

        let mut touched: Vec<MemoryKey> = outgoing
            .iter()
            .flat_map(|(_, mem)| mem.keys().cloned())
            .collect();
        touched.sort();
        touched.dedup();

        let mut merged = incoming;
        for key in touched {
            let fallback = match merged.get(&key) {
                Some(m) => m.clone(),
                None => self.initial_memory(&key),
            };
            let versions: Vec<(E::Expr, E::Expr)> = outgoing
                .iter()
                .map(|(g, mem)| (g.clone(), mem.get(&key).cloned().unwrap_or_else(|| fallback.clone())))
                .collect();
            let mut result = match versions.last() {
                Some((_, last)) => last.clone(),
                None => fallback.clone(),
            };
            for (guard, version) in versions.iter().rev().skip(1) {
                result = self.engine.ite(guard, version, &result)?;
            }
            merged.insert(key, result);
        }
        self.current = merged;
        Ok(self.engine.disjunction(&guarded))
    }

    /// Encoding of one predicate; `Require` predicates encode their
    /// condition like any other
    pub fn convert_predicate(&mut self, predicate: &Predicate) -> Result<E::Expr, SmtError> {
        match &predicate.body {
            PredicateBody::Equality { lhv, rhv } => self.compare(Opcode::Eq, lhv, rhv),
            PredicateBody::Inequality { lhv, rhv } => self.compare(Opcode::Neq, lhv, rhv),
            PredicateBody::DefaultSwitch { cond, cases } => {
                let mut parts = Vec::with_capacity(cases.len());
                for c in cases {
                    parts.push(self.compare(Opcode::Neq, cond, c)?);
                }
                Ok(self.engine.conjunction(&parts))
            }
            PredicateBody::Call { lhv: Some(lhv), call } => self.compare(Opcode::Eq, lhv, call),
            PredicateBody::Call { lhv: None, .. } => Ok(self.engine.make_bool(true)),
            PredicateBody::New { lhv } => {
                let obj = self.convert_term(lhv)?;
                let null = self.null();
                self.engine.binary(Opcode::Neq, &obj, &null)
            }
            PredicateBody::NewArray { lhv, dimensions } => {
                let arr = self.convert_term(lhv)?;
                let null = self.null();
                let mut parts = vec![self.engine.binary(Opcode::Neq, &arr, &null)?];
                if let Some(length) = dimensions.first() {
                    let len = self.convert_term(length)?;
                    let len = self.coerce(len, &SymType::Int)?;
                    let zero = self.engine.make_bv(0, WORD);
                    parts.push(self.engine.binary(Opcode::Ge, &len, &zero)?);
                    let key = MemoryKey::Length {
                        memspace: lhv.ty().memspace(),
                    };
                    self.note_owner(lhv);
                    let mem = self.memory(&key);
                    let updated = self.engine.store(&mem, &arr, &len)?;
                    self.current.insert(key, updated);
                }
                Ok(self.engine.conjunction(&parts))
            }
            PredicateBody::FieldStore { field, value } => {
                let TermKind::Field { owner, name } = field.kind() else {
                    return Err(SmtError::unsupported(format!("field store into `{}`", field)));
                };
                let key = property_key(owner, name, field.ty());
                self.note_owner(owner);
                let addr = self.convert_term(owner)?;
                let value = self.convert_term(value)?;
                let value = self.coerce(value, field.ty())?;
                let mem = self.memory(&key);
                let updated = self.engine.store(&mem, &addr, &value)?;
                self.current.insert(key, updated);
                Ok(self.engine.make_bool(true))
            }
            PredicateBody::ArrayStore { index, value } => {
                let TermKind::ArrayIndex { array, index: idx } = index.kind() else {
                    return Err(SmtError::unsupported(format!("array store into `{}`", index)));
                };
                let key = elements_key(array);
                self.note_owner(array);
                let addr = self.convert_term(array)?;
                let idx = self.convert_term(idx)?;
                let idx = self.coerce(idx, &SymType::Int)?;
                let value = self.convert_term(value)?;
                let value = self.coerce(value, index.ty())?;
                let mem = self.memory(&key);
                let inner = self.engine.load(&mem, &addr)?;
                let inner = self.engine.store(&inner, &idx, &value)?;
                let updated = self.engine.store(&mem, &addr, &inner)?;
                self.current.insert(key, updated);
                Ok(self.engine.make_bool(true))
            }
        }
    }

    /// Conjunction of the query's non-`Require` predicates against the
    /// current memory
    pub fn convert_path(&mut self, query: &PredicateState) -> Result<E::Expr, SmtError> {
        let mut parts = Vec::new();
        for p in query.predicates() {
            if p.kind != PredicateKind::Require {
                parts.push(self.convert_predicate(p)?);
            }
        }
        Ok(self.engine.conjunction(&parts))
    }

    /// Conjunction of the query's `Require` predicates
    pub fn convert_requirements(&mut self, query: &PredicateState) -> Result<E::Expr, SmtError> {
        let mut parts = Vec::new();
        for p in query.predicates() {
            if p.kind == PredicateKind::Require {
                parts.push(self.convert_predicate(p)?);
            }
        }
        Ok(self.engine.conjunction(&parts))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Memories
    // ═══════════════════════════════════════════════════════════════════════

    fn initial_memory(&mut self, key: &MemoryKey) -> E::Expr {
        if let Some(mem) = self.initial.get(key) {
            return mem.clone();
        }
        let addr = self.engine.bv_sort(WORD);
        let sort = match key {
            MemoryKey::Property { ty, .. } => {
                let range = self.sort(ty);
                self.engine.array_sort(&addr, &range)
            }
            MemoryKey::Elements { element, .. } => {
                let range = self.sort(element);
                let inner = self.engine.array_sort(&addr, &range);
                self.engine.array_sort(&addr, &inner)
            }
            MemoryKey::Length { .. } => self.engine.array_sort(&addr, &addr),
        };
        let mem = self.engine.make_var(&key.label(), &sort);
        self.initial.insert(key.clone(), mem.clone());
        mem
    }

    fn memory(&mut self, key: &MemoryKey) -> E::Expr {
        match self.current.get(key) {
            Some(mem) => mem.clone(),
            None => self.initial_memory(key),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Terms
    // ═══════════════════════════════════════════════════════════════════════

    pub fn sort(&mut self, ty: &SymType) -> E::Sort {
        match ty {
            SymType::Bool => self.engine.bool_sort(),
            SymType::Float => self.engine.float_sort(),
            SymType::Double => self.engine.double_sort(),
            other => self.engine.bv_sort(other.bit_size()),
        }
    }

    fn null(&mut self) -> E::Expr {
        self.engine.make_bv(0, WORD)
    }

    fn named_var(&mut self, term: &Term) -> E::Expr {
        if let Some(e) = self.terms.get(term) {
            return e.clone();
        }
        let base = term.to_string();
        let mut name = base.clone();
        let mut n = 1;
        while let Some(owner) = self.names.get(&name) {
            if owner == term {
                break;
            }
            name = format!("{}#{}", base, n);
            n += 1;
        }
        self.names.insert(name.clone(), term.clone());
        let sort = self.sort(term.ty());
        let var = self.engine.make_var(&name, &sort);
        self.terms.insert(term.clone(), var.clone());
        self.named.push((term.clone(), var.clone()));
        var
    }

    /// Opaque value shared by every occurrence of the same term
    fn opaque(&mut self, term: &Term, prefix: &str) -> E::Expr {
        if let Some(e) = self.terms.get(term) {
            return e.clone();
        }
        let sort = self.sort(term.ty());
        let var = self.engine.make_fresh_var(prefix, &sort);
        self.terms.insert(term.clone(), var.clone());
        self.named.push((term.clone(), var.clone()));
        var
    }

    /// Explicit conversion of `expr` to the sort of `ty`
    pub fn coerce(&mut self, expr: E::Expr, ty: &SymType) -> Result<E::Expr, SmtError> {
        let target = self.sort(ty);
        self.coerce_to(expr, &target)
    }

    fn coerce_to(&mut self, expr: E::Expr, target: &E::Sort) -> Result<E::Expr, SmtError> {
        let from = self.engine.sort_of(&expr);
        if &from == target {
            return Ok(expr);
        }
        let e = &mut *self.engine;
        if e.is_bool_sort(&from) {
            if let Some(w) = e.bv_width(target) {
                return e.bool2bv(&expr, w);
            }
        } else if e.bv_width(&from).is_some() {
            if e.is_bool_sort(target) {
                return e.bv2bool(&expr);
            }
            if let Some(w) = e.bv_width(target) {
                return e.bv2bv(&expr, w);
            }
            if is_fp(&*e, target) {
                let double = e.is_double_sort(target);
                return e.bv2float(&expr, double);
            }
        } else if is_fp(&*e, &from) {
            if let Some(w) = e.bv_width(target) {
                return e.float2bv(&expr, w);
            }
            if is_fp(&*e, target) {
                let double = e.is_double_sort(target);
                return e.float2float(&expr, double);
            }
        }
        Err(SmtError::sort_mismatch(
            "coerce",
            format!("{:?}", from),
            format!("{:?}", target),
        ))
    }

    fn compare(&mut self, op: Opcode, lhv: &Term, rhv: &Term) -> Result<E::Expr, SmtError> {
        let l = self.convert_term(lhv)?;
        let r = self.convert_term(rhv)?;
        let sort = self.engine.sort_of(&l);
        let r = self.coerce_to(r, &sort)?;
        self.engine.binary(op, &l, &r)
    }

    pub fn convert_term(&mut self, term: &Term) -> Result<E::Expr, SmtError> {
        match term.kind() {
            TermKind::Value(_) | TermKind::Argument(_) | TermKind::This | TermKind::ReturnValue(_) => {
                Ok(self.named_var(term))
            }
            TermKind::ConstBool(b) => Ok(self.engine.make_bool(*b)),
            TermKind::ConstInt(v) => match term.ty() {
                SymType::Bool => Ok(self.engine.make_bool(*v != 0)),
                SymType::Float => Ok(self.engine.make_float(*v as f32)),
                SymType::Double => Ok(self.engine.make_double(*v as f64)),
                ty => Ok(self.engine.make_bv(*v, ty.bit_size())),
            },
            TermKind::ConstFloat(bits) => {
                let v = f64::from_bits(*bits);
                match term.ty() {
                    SymType::Float => Ok(self.engine.make_float(v as f32)),
                    _ => Ok(self.engine.make_double(v)),
                }
            }
            TermKind::ConstString(_) => {
                let fresh = !self.terms.contains_key(term);
                let s = self.opaque(term, "str");
                if fresh {
                    let null = self.null();
                    let non_null = self.engine.binary(Opcode::Neq, &s, &null)?;
                    self.axioms.push(non_null);
                }
                Ok(s)
            }
            TermKind::Null => Ok(self.null()),
            TermKind::Binary { op, lhv, rhv } => self.convert_binary(*op, lhv, rhv),
            TermKind::Cmp { op, lhv, rhv } => self.convert_cmp(*op, lhv, rhv),
            TermKind::Neg(t) => {
                let e = self.convert_term(t)?;
                self.engine.negate(&e)
            }
            TermKind::Cast(t) => {
                let e = self.convert_term(t)?;
                self.coerce(e, term.ty())
            }
            TermKind::InstanceOf { operand, class } => self.convert_instance_of(term, operand, class),
            TermKind::FieldLoad(field) => {
                let TermKind::Field { owner, name } = field.kind() else {
                    return Err(SmtError::unsupported(format!("load from `{}`", field)));
                };
                let key = property_key(owner, name, field.ty());
                self.note_owner(owner);
                let addr = self.convert_term(owner)?;
                let mem = self.memory(&key);
                self.engine.load(&mem, &addr)
            }
            TermKind::ArrayLoad(index) => {
                let TermKind::ArrayIndex { array, index: idx } = index.kind() else {
                    return Err(SmtError::unsupported(format!("load from `{}`", index)));
                };
                let key = elements_key(array);
                self.note_owner(array);
                let addr = self.convert_term(array)?;
                let idx = self.convert_term(idx)?;
                let idx = self.coerce(idx, &SymType::Int)?;
                let mem = self.memory(&key);
                let inner = self.engine.load(&mem, &addr)?;
                self.engine.load(&inner, &idx)
            }
            TermKind::ArrayLength(array) => {
                let key = MemoryKey::Length {
                    memspace: array.ty().memspace(),
                };
                self.note_owner(array);
                let addr = self.convert_term(array)?;
                let mem = self.memory(&key);
                self.engine.load(&mem, &addr)
            }
            TermKind::Call { .. } => Ok(self.opaque(term, "call")),
            TermKind::Undef => {
                let sort = self.sort(term.ty());
                Ok(self.engine.make_fresh_var("undef", &sort))
            }
            TermKind::Field { .. } | TermKind::ArrayIndex { .. } => Err(SmtError::unsupported(
                format!("reference term `{}` outside a load or store", term),
            )),
        }
    }

    fn convert_binary(&mut self, op: BinaryOp, lhv: &Term, rhv: &Term) -> Result<E::Expr, SmtError> {
        let l = self.convert_term(lhv)?;
        let r = self.convert_term(rhv)?;
        let lsort = self.engine.sort_of(&l);

        if self.engine.is_bool_sort(&lsort) {
            let r = self.coerce_to(r, &lsort)?;
            return match op {
                BinaryOp::And => Ok(self.engine.conjunction(&[l, r])),
                BinaryOp::Or => Ok(self.engine.disjunction(&[l, r])),
                BinaryOp::Xor => self.engine.binary(Opcode::Xor, &l, &r),
                _ => {
                    // arithmetic over booleans goes through words
                    let lw = self.engine.bool2bv(&l, WORD)?;
                    let rw = self.engine.bool2bv(&r, WORD)?;
                    let res = self.engine.binary(arith_opcode(op), &lw, &rw)?;
                    self.engine.bv2bool(&res)
                }
            };
        }

        let r = self.coerce_to(r, &lsort)?;
        match op {
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Ushr => {
                let width = self.engine.bv_width(&lsort).unwrap_or(WORD);
                let m = self.engine.make_bv((width - 1) as i64, width);
                let amount = self.engine.binary(Opcode::And, &r, &m)?;
                self.engine.binary(arith_opcode(op), &l, &amount)
            }
            _ => self.engine.binary(arith_opcode(op), &l, &r),
        }
    }

    fn convert_cmp(&mut self, op: CmpOp, lhv: &Term, rhv: &Term) -> Result<E::Expr, SmtError> {
        let opcode = match op {
            CmpOp::Eq => Opcode::Eq,
            CmpOp::Neq => Opcode::Neq,
            CmpOp::Lt => Opcode::Lt,
            CmpOp::Le => Opcode::Le,
            CmpOp::Gt => Opcode::Gt,
            CmpOp::Ge => Opcode::Ge,
            CmpOp::Cmp | CmpOp::Cmpg | CmpOp::Cmpl => {
                let l = self.convert_term(lhv)?;
                let r = self.convert_term(rhv)?;
                let sort = self.engine.sort_of(&l);
                let r = self.coerce_to(r, &sort)?;
                let minus_one = self.engine.make_bv(-1, WORD);
                let zero = self.engine.make_bv(0, WORD);
                let one = self.engine.make_bv(1, WORD);
                let eq = self.engine.binary(Opcode::Eq, &l, &r)?;
                // an unordered (NaN) comparison falls through to the last arm
                return if op == CmpOp::Cmpl {
                    let gt = self.engine.binary(Opcode::Gt, &l, &r)?;
                    let inner = self.engine.ite(&eq, &zero, &minus_one)?;
                    self.engine.ite(&gt, &one, &inner)
                } else {
                    let lt = self.engine.binary(Opcode::Lt, &l, &r)?;
                    let inner = self.engine.ite(&eq, &zero, &one)?;
                    self.engine.ite(&lt, &minus_one, &inner)
                };
            }
        };
        self.compare(opcode, lhv, rhv)
    }

    fn convert_instance_of(&mut self, term: &Term, operand: &Term, class: &str) -> Result<E::Expr, SmtError> {
        if operand.is_null() {
            return Ok(self.engine.make_bool(false));
        }
        let obj = self.convert_term(operand)?;
        let null = self.null();
        let non_null = self.engine.binary(Opcode::Neq, &obj, &null)?;
        let static_class = match operand.ty() {
            SymType::Class { name, .. } => Some(name.clone()),
            _ => None,
        };
        let relation = match &static_class {
            Some(name) => self.types.relation(name, class),
            None => None,
        };
        match relation {
            Some(true) => Ok(non_null),
            Some(false) => Ok(self.engine.make_bool(false)),
            None => {
                let dynamic = self.opaque(term, "instanceof");
                Ok(self.engine.conjunction(&[non_null, dynamic]))
            }
        }
    }
}

fn is_fp<E: SmtEngine>(engine: &E, sort: &E::Sort) -> bool {
    engine.is_float_sort(sort) || engine.is_double_sort(sort)
}

fn arith_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Divide,
        BinaryOp::Rem => Opcode::Mod,
        BinaryOp::Shl => Opcode::Shl,
        BinaryOp::Shr => Opcode::Ashr,
        BinaryOp::Ushr => Opcode::Shr,
        BinaryOp::And => Opcode::And,
        BinaryOp::Or => Opcode::Or,
        BinaryOp::Xor => Opcode::Xor,
    }
}

fn erase(ty: &SymType) -> SymType {
    match ty {
        SymType::Array { element, .. } => SymType::array(erase(element)),
        other => other.with_memspace(0),
    }
}

fn property_key(owner: &Term, name: &Arc<str>, ty: &SymType) -> MemoryKey {
    MemoryKey::Property {
        memspace: owner.ty().memspace(),
        name: name.clone(),
        ty: erase(ty),
    }
}

fn elements_key(array: &Term) -> MemoryKey {
    MemoryKey::Elements {
        memspace: array.ty().memspace(),
        element: erase(array.ty().element().unwrap_or(&SymType::Int)),
    }
}
