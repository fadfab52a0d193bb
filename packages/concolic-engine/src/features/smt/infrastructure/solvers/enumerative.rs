//! Bounded model search over the in-crate AST
//!
//! Arrays are lowered first: reads are pushed through `store`/`ite`/const
//! arrays until they hit a base array variable, each distinct base read
//! becomes a cell variable, and pairwise functional-consistency constraints
//! (`i == j => a[i] == a[j]`) are added. The lowered formula is then decided
//! by depth-first assignment with three-valued partial evaluation.
//!
//! For the comparison fragment (variables compared against each other and
//! constants under boolean structure) the candidate sets are complete, so an
//! exhausted search is a sound `Unsat`. Outside that fragment exhaustion
//! gives `Unknown`.

use crate::features::smt::domain::{
    mask, sign_extend, Opcode, RawValue, SmtError, SolverBackend, Verdict,
};
use crate::features::smt::infrastructure::ast::{AstEngine, Conversion, ExprKind, SmtExpr, Sort};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::debug;

pub struct EnumerativeBackend {
    engine: AstEngine,
    budget: u64,
}

impl EnumerativeBackend {
    pub fn new(budget: u64) -> Self {
        Self {
            engine: AstEngine::new(),
            budget,
        }
    }
}

impl SolverBackend for EnumerativeBackend {
    type Engine = AstEngine;

    fn name(&self) -> &'static str {
        "enumerative"
    }

    fn engine(&mut self) -> &mut AstEngine {
        &mut self.engine
    }

    fn check(&mut self, assertions: &[SmtExpr], probes: &[SmtExpr]) -> Result<Verdict, SmtError> {
        if assertions.iter().any(SmtExpr::has_binders) {
            return Ok(Verdict::Unknown(
                "quantified formulas are outside the enumerative fragment".into(),
            ));
        }

        let mut lowering = ArrayLowering::default();
        let mut lowered = Vec::with_capacity(assertions.len());
        for a in assertions {
            lowered.push(lowering.lower(a)?);
        }
        lowered.append(&mut lowering.constraints);

        let mut search = Search::new(&lowered, &lowering.reads, self.budget)?;
        let outcome = search.run();
        debug!(
            backend = "enumerative",
            vars = search.vars.len(),
            visited = search.visited,
            "search finished"
        );

        match outcome {
            SearchOutcome::Found => {
                let mut assignment = std::mem::take(&mut search.assignment);
                search.fill_defaults(&mut assignment);
                let mut values = Vec::with_capacity(probes.len());
                for probe in probes {
                    let mut free = Vec::new();
                    probe.free_vars(&mut free);
                    let mut local = assignment.clone();
                    for (name, sort) in free {
                        if !local.contains_key(&name) && !matches!(sort, Sort::Array(..)) {
                            local.insert(name, default_value(&sort));
                        }
                    }
                    let probe_eval = Evaluator {
                        assignment: &local,
                        reads: &lowering.reads,
                    };
                    values.push(probe_eval.eval(probe));
                }
                Ok(Verdict::Sat(values))
            }
            SearchOutcome::Exhausted if search.complete => Ok(Verdict::Unsat),
            SearchOutcome::Exhausted => Ok(Verdict::Unknown(
                "bounded search exhausted outside the decidable fragment".into(),
            )),
            SearchOutcome::BudgetExceeded => Ok(Verdict::Unknown(format!(
                "search budget of {} assignments exceeded",
                self.budget
            ))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Array lowering
// ═══════════════════════════════════════════════════════════════════════════

type Reads = FxHashMap<Arc<str>, Vec<(SmtExpr, SmtExpr)>>;

#[derive(Default)]
struct ArrayLowering {
    /// base array name -> (index, cell variable)
    reads: Reads,
    constraints: Vec<SmtExpr>,
}

fn eq(a: &SmtExpr, b: &SmtExpr) -> SmtExpr {
    SmtExpr::new(Sort::Bool, ExprKind::Binary(Opcode::Eq, a.clone(), b.clone()))
}

fn ite(c: SmtExpr, t: SmtExpr, e: SmtExpr) -> SmtExpr {
    match c.as_bool_const() {
        Some(true) => t,
        Some(false) => e,
        None => SmtExpr::new(t.sort().clone(), ExprKind::Ite(c, t, e)),
    }
}

impl ArrayLowering {
    fn lower(&mut self, expr: &SmtExpr) -> Result<SmtExpr, SmtError> {
        let kind = match expr.kind() {
            ExprKind::Var(_)
            | ExprKind::Bound { .. }
            | ExprKind::BoolConst(_)
            | ExprKind::BvConst(_)
            | ExprKind::FpConst(_)
            | ExprKind::StrConst(_) => return Ok(expr.clone()),
            ExprKind::Select(array, index) => {
                let array = self.lower(array)?;
                let index = self.lower(index)?;
                return self.select(&array, &index);
            }
            ExprKind::ConstArray(v) => ExprKind::ConstArray(self.lower(v)?),
            ExprKind::Not(e) => ExprKind::Not(self.lower(e)?),
            ExprKind::And(es) => ExprKind::And(self.lower_all(es)?),
            ExprKind::Or(es) => ExprKind::Or(self.lower_all(es)?),
            ExprKind::Binary(op, a, b) => ExprKind::Binary(*op, self.lower(a)?, self.lower(b)?),
            ExprKind::Neg(e) => ExprKind::Neg(self.lower(e)?),
            ExprKind::Ite(c, t, e) => ExprKind::Ite(self.lower(c)?, self.lower(t)?, self.lower(e)?),
            ExprKind::Extract { high, low, arg } => ExprKind::Extract {
                high: *high,
                low: *low,
                arg: self.lower(arg)?,
            },
            ExprKind::Convert(c, e) => ExprKind::Convert(*c, self.lower(e)?),
            ExprKind::Store(a, i, v) => ExprKind::Store(self.lower(a)?, self.lower(i)?, self.lower(v)?),
            ExprKind::Quantifier { .. } | ExprKind::Lambda { .. } => {
                return Err(SmtError::unsupported("binder under array lowering"))
            }
        };
        Ok(SmtExpr::new(expr.sort().clone(), kind))
    }

    fn lower_all(&mut self, es: &[SmtExpr]) -> Result<Vec<SmtExpr>, SmtError> {
        es.iter().map(|e| self.lower(e)).collect()
    }

    /// Read `array[index]` where both operands are already lowered
    fn select(&mut self, array: &SmtExpr, index: &SmtExpr) -> Result<SmtExpr, SmtError> {
        match array.kind() {
            ExprKind::Store(base, at, value) => {
                if at == index {
                    return Ok(value.clone());
                }
                let rest = self.select(base, index)?;
                Ok(ite(eq(index, at), value.clone(), rest))
            }
            ExprKind::Ite(c, t, e) => {
                let t = self.select(t, index)?;
                let e = self.select(e, index)?;
                Ok(ite(c.clone(), t, e))
            }
            ExprKind::ConstArray(value) => Ok(value.clone()),
            ExprKind::Var(name) => Ok(self.cell(name, array, index)),
            _ => Err(SmtError::unsupported(format!(
                "array read through `{}`",
                array
            ))),
        }
    }

    fn cell(&mut self, name: &Arc<str>, array: &SmtExpr, index: &SmtExpr) -> SmtExpr {
        let range = match array.sort() {
            Sort::Array(_, range) => range.as_ref().clone(),
            other => other.clone(),
        };
        let reads = self.reads.entry(name.clone()).or_default();
        if let Some((_, cell)) = reads.iter().find(|(i, _)| i == index) {
            return cell.clone();
        }
        let cell = SmtExpr::new(
            range,
            ExprKind::Var(format!("{}[{}]", name, reads.len()).into()),
        );
        for (other_index, other_cell) in reads.iter() {
            let same_index = eq(index, other_index);
            let same_value = eq(&cell, other_cell);
            let not_same = SmtExpr::new(Sort::Bool, ExprKind::Not(same_index));
            self.constraints
                .push(SmtExpr::new(Sort::Bool, ExprKind::Or(vec![not_same, same_value])));
        }
        reads.push((index.clone(), cell.clone()));
        cell
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Search
// ═══════════════════════════════════════════════════════════════════════════

enum SearchOutcome {
    Found,
    Exhausted,
    BudgetExceeded,
}

type Assignment = FxHashMap<Arc<str>, RawValue>;

struct Search<'a> {
    assertions: &'a [SmtExpr],
    reads: &'a Reads,
    vars: Vec<(Arc<str>, Sort)>,
    candidates: Vec<Vec<RawValue>>,
    assignment: Assignment,
    budget: u64,
    visited: u64,
    complete: bool,
}

impl<'a> Search<'a> {
    fn new(assertions: &'a [SmtExpr], reads: &'a Reads, budget: u64) -> Result<Self, SmtError> {
        let mut vars = Vec::new();
        for a in assertions {
            a.free_vars(&mut vars);
        }
        if let Some((name, _)) = vars.iter().find(|(_, s)| matches!(s, Sort::Array(..))) {
            return Err(SmtError::unsupported(format!(
                "array variable `{}` outside of a read",
                name
            )));
        }

        let mut bv_consts: FxHashMap<u32, Vec<i64>> = FxHashMap::default();
        let mut fp_consts = Vec::new();
        let mut str_consts = Vec::new();
        for a in assertions {
            collect_constants(a, &mut bv_consts, &mut fp_consts, &mut str_consts);
        }

        let mut width_counts: FxHashMap<u32, i64> = FxHashMap::default();
        for (_, sort) in &vars {
            if let Sort::BitVec(w) = sort {
                *width_counts.entry(*w).or_default() += 1;
            }
        }

        let candidates = vars
            .iter()
            .map(|(_, sort)| match sort {
                Sort::Bool => vec![RawValue::Bool(false), RawValue::Bool(true)],
                Sort::BitVec(w) => bv_candidates(
                    *w,
                    bv_consts.get(w).map(Vec::as_slice).unwrap_or(&[]),
                    width_counts.get(w).copied().unwrap_or(1),
                ),
                Sort::Float | Sort::Double => fp_candidates(&fp_consts, sort),
                Sort::Str => {
                    let mut out: Vec<RawValue> = vec![RawValue::Str(String::new())];
                    for s in &str_consts {
                        let v = RawValue::Str(s.clone());
                        if !out.contains(&v) {
                            out.push(v);
                        }
                    }
                    out
                }
                Sort::Array(..) => Vec::new(),
            })
            .collect();

        let complete = vars
            .iter()
            .all(|(_, s)| matches!(s, Sort::Bool | Sort::BitVec(_)))
            && assertions.iter().all(in_decidable_fragment);

        Ok(Self {
            assertions,
            reads,
            vars,
            candidates,
            assignment: FxHashMap::default(),
            budget,
            visited: 0,
            complete,
        })
    }

    fn run(&mut self) -> SearchOutcome {
        self.descend(0)
    }

    /// `Some(false)` if some assertion is already false, `Some(true)` if all
    /// are true
    fn status(&self) -> Option<bool> {
        let evaluator = Evaluator {
            assignment: &self.assignment,
            reads: self.reads,
        };
        let mut all_true = true;
        for a in self.assertions {
            match evaluator.eval(a).and_then(|v| v.as_bool()) {
                Some(false) => return Some(false),
                Some(true) => {}
                None => all_true = false,
            }
        }
        if all_true {
            Some(true)
        } else {
            None
        }
    }

    fn descend(&mut self, depth: usize) -> SearchOutcome {
        self.visited += 1;
        if self.visited > self.budget {
            return SearchOutcome::BudgetExceeded;
        }
        match self.status() {
            Some(false) => return SearchOutcome::Exhausted,
            Some(true) => return SearchOutcome::Found,
            None => {}
        }
        if depth >= self.vars.len() {
            // every variable is assigned yet some assertion is undecided
            return SearchOutcome::Exhausted;
        }
        let name = self.vars[depth].0.clone();
        for i in 0..self.candidates[depth].len() {
            let value = self.candidates[depth][i].clone();
            self.assignment.insert(name.clone(), value);
            match self.descend(depth + 1) {
                SearchOutcome::Exhausted => {}
                other => return other,
            }
        }
        self.assignment.remove(&name);
        SearchOutcome::Exhausted
    }

    fn fill_defaults(&self, assignment: &mut Assignment) {
        for ((name, sort), candidates) in self.vars.iter().zip(&self.candidates) {
            if !assignment.contains_key(name) {
                let value = candidates
                    .first()
                    .cloned()
                    .unwrap_or_else(|| default_value(sort));
                assignment.insert(name.clone(), value);
            }
        }
    }
}

fn default_value(sort: &Sort) -> RawValue {
    match sort {
        Sort::Bool => RawValue::Bool(false),
        Sort::BitVec(w) => RawValue::BitVec { bits: 0, width: *w },
        Sort::Float | Sort::Double => RawValue::Float(0.0),
        Sort::Str => RawValue::Str(String::new()),
        Sort::Array(_, range) => RawValue::Array {
            entries: Vec::new(),
            default: Box::new(default_value(range)),
        },
    }
}

fn signed_range(width: u32) -> (i64, i64) {
    if width >= 64 {
        (i64::MIN, i64::MAX)
    } else {
        (-(1i64 << (width - 1)), (1i64 << (width - 1)) - 1)
    }
}

/// `{c + k : c in constants ∪ {0}, |k| <= n}` within the signed range,
/// nearest offsets first
fn bv_candidates(width: u32, constants: &[i64], n: i64) -> Vec<RawValue> {
    let (lo, hi) = signed_range(width.max(1));
    let mut bases = vec![0i64];
    for c in constants {
        if !bases.contains(c) {
            bases.push(*c);
        }
    }
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    for k in 0..=n {
        for base in &bases {
            for offset in [k, -k] {
                if let Some(v) = base.checked_add(offset) {
                    if v >= lo && v <= hi && seen.insert(v) {
                        out.push(RawValue::BitVec {
                            bits: (v as u64) & mask(width),
                            width,
                        });
                    }
                }
            }
        }
    }
    out
}

fn fp_candidates(constants: &[f64], sort: &Sort) -> Vec<RawValue> {
    let mut out: Vec<f64> = Vec::new();
    let mut push = |v: f64| {
        let v = round_fp(v, sort);
        if !out.iter().any(|o| o.to_bits() == v.to_bits()) {
            out.push(v);
        }
    };
    push(0.0);
    for c in constants {
        push(*c);
    }
    for c in constants.iter().chain(std::iter::once(&0.0)) {
        for d in [1.0, -1.0, 0.5, -0.5] {
            push(c + d);
        }
    }
    out.into_iter().map(RawValue::Float).collect()
}

fn collect_constants(
    expr: &SmtExpr,
    bv: &mut FxHashMap<u32, Vec<i64>>,
    fp: &mut Vec<f64>,
    strs: &mut Vec<String>,
) {
    match (expr.kind(), expr.sort()) {
        (ExprKind::BvConst(bits), Sort::BitVec(w)) => {
            let v = sign_extend(*bits, *w);
            let entry = bv.entry(*w).or_default();
            if !entry.contains(&v) {
                entry.push(v);
            }
        }
        (ExprKind::FpConst(bits), _) => fp.push(f64::from_bits(*bits)),
        (ExprKind::StrConst(s), _) => strs.push(s.to_string()),
        _ => {}
    }
    for child in expr.children() {
        collect_constants(child, bv, fp, strs);
    }
}

fn is_ground(expr: &SmtExpr) -> bool {
    !matches!(expr.kind(), ExprKind::Var(_)) && expr.children().into_iter().all(is_ground)
}

fn in_decidable_fragment(expr: &SmtExpr) -> bool {
    let own = match expr.kind() {
        ExprKind::Binary(op, a, b) => {
            let computes = op.is_arithmetic()
                || op.is_shift()
                || *op == Opcode::Concat
                || (op.is_bitwise() && !matches!(a.sort(), Sort::Bool));
            !computes || (is_ground(a) && is_ground(b))
        }
        ExprKind::Neg(arg) | ExprKind::Extract { arg, .. } | ExprKind::Convert(_, arg) => {
            is_ground(arg)
        }
        ExprKind::Var(_) => matches!(expr.sort(), Sort::Bool | Sort::BitVec(_)),
        ExprKind::Quantifier { .. } | ExprKind::Lambda { .. } => false,
        _ => true,
    };
    own && expr.children().into_iter().all(in_decidable_fragment)
}

// ═══════════════════════════════════════════════════════════════════════════
// Evaluation
// ═══════════════════════════════════════════════════════════════════════════

struct Evaluator<'a> {
    assignment: &'a Assignment,
    reads: &'a Reads,
}

fn round_fp(v: f64, sort: &Sort) -> f64 {
    match sort {
        Sort::Float => v as f32 as f64,
        _ => v,
    }
}

fn bv(bits: u64, width: u32) -> RawValue {
    RawValue::BitVec {
        bits: bits & mask(width),
        width,
    }
}

impl Evaluator<'_> {
    /// Three-valued evaluation: `None` when the value depends on an
    /// unassigned variable
    fn eval(&self, expr: &SmtExpr) -> Option<RawValue> {
        match expr.kind() {
            ExprKind::Var(name) => match expr.sort() {
                Sort::Array(_, range) => self.base_array(name, range),
                _ => self.assignment.get(name).cloned(),
            },
            ExprKind::Bound { .. } => None,
            ExprKind::BoolConst(b) => Some(RawValue::Bool(*b)),
            ExprKind::BvConst(bits) => match expr.sort() {
                Sort::BitVec(w) => Some(bv(*bits, *w)),
                _ => None,
            },
            ExprKind::FpConst(bits) => Some(RawValue::Float(round_fp(f64::from_bits(*bits), expr.sort()))),
            ExprKind::StrConst(s) => Some(RawValue::Str(s.to_string())),
            ExprKind::ConstArray(v) => Some(RawValue::Array {
                entries: Vec::new(),
                default: Box::new(self.eval(v)?),
            }),
            ExprKind::Not(e) => self.eval(e)?.as_bool().map(|b| RawValue::Bool(!b)),
            ExprKind::And(es) => {
                let mut unknown = false;
                for e in es {
                    match self.eval(e).and_then(|v| v.as_bool()) {
                        Some(false) => return Some(RawValue::Bool(false)),
                        Some(true) => {}
                        None => unknown = true,
                    }
                }
                (!unknown).then_some(RawValue::Bool(true))
            }
            ExprKind::Or(es) => {
                let mut unknown = false;
                for e in es {
                    match self.eval(e).and_then(|v| v.as_bool()) {
                        Some(true) => return Some(RawValue::Bool(true)),
                        Some(false) => {}
                        None => unknown = true,
                    }
                }
                (!unknown).then_some(RawValue::Bool(false))
            }
            ExprKind::Binary(op, a, b) => self.binary(*op, a, b),
            ExprKind::Neg(e) => match self.eval(e)? {
                RawValue::BitVec { bits, width } => Some(bv(bits.wrapping_neg(), width)),
                RawValue::Float(f) => Some(RawValue::Float(-f)),
                _ => None,
            },
            ExprKind::Ite(c, t, e) => match self.eval(c).and_then(|v| v.as_bool()) {
                Some(true) => self.eval(t),
                Some(false) => self.eval(e),
                None => {
                    let t = self.eval(t)?;
                    let e = self.eval(e)?;
                    (t == e).then_some(t)
                }
            },
            ExprKind::Extract { high, low, arg } => match self.eval(arg)? {
                RawValue::BitVec { bits, .. } => Some(bv(bits >> low, high - low + 1)),
                _ => None,
            },
            ExprKind::Convert(conv, arg) => self.convert(*conv, arg, expr.sort()),
            ExprKind::Select(array, index) => {
                let index = self.eval(index)?;
                match self.eval(array)? {
                    RawValue::Array { entries, default } => Some(
                        entries
                            .into_iter()
                            .rev()
                            .find(|(k, _)| k == &index)
                            .map(|(_, v)| v)
                            .unwrap_or(*default),
                    ),
                    _ => None,
                }
            }
            ExprKind::Store(array, index, value) => {
                let index = self.eval(index)?;
                let value = self.eval(value)?;
                match self.eval(array)? {
                    RawValue::Array {
                        mut entries,
                        default,
                    } => {
                        entries.retain(|(k, _)| k != &index);
                        entries.push((index, value));
                        Some(RawValue::Array { entries, default })
                    }
                    _ => None,
                }
            }
            ExprKind::Quantifier { .. } | ExprKind::Lambda { .. } => None,
        }
    }

    /// Contents of a base array as observed through its lowered reads
    fn base_array(&self, name: &Arc<str>, range: &Sort) -> Option<RawValue> {
        let mut entries: Vec<(RawValue, RawValue)> = Vec::new();
        if let Some(reads) = self.reads.get(name) {
            for (index, cell) in reads {
                let (Some(k), Some(v)) = (self.eval(index), self.eval(cell)) else {
                    continue;
                };
                if !entries.iter().any(|(e, _)| e == &k) {
                    entries.push((k, v));
                }
            }
        }
        Some(RawValue::Array {
            entries,
            default: Box::new(default_value(range)),
        })
    }

    fn binary(&self, op: Opcode, a: &SmtExpr, b: &SmtExpr) -> Option<RawValue> {
        if op == Opcode::Implies {
            let l = self.eval(a).and_then(|v| v.as_bool());
            let r = self.eval(b).and_then(|v| v.as_bool());
            return match (l, r) {
                (Some(false), _) | (_, Some(true)) => Some(RawValue::Bool(true)),
                (Some(true), Some(false)) => Some(RawValue::Bool(false)),
                _ => None,
            };
        }
        let l = self.eval(a)?;
        let r = self.eval(b)?;
        match (l, r) {
            (RawValue::BitVec { bits: x, width }, RawValue::BitVec { bits: y, width: wy }) => {
                bv_binary(op, x, y, width, wy)
            }
            (RawValue::Float(x), RawValue::Float(y)) => fp_binary(op, x, y, a.sort()),
            (RawValue::Bool(x), RawValue::Bool(y)) => {
                let v = match op {
                    Opcode::Eq | Opcode::Iff => x == y,
                    Opcode::Neq | Opcode::Xor => x != y,
                    Opcode::And => x && y,
                    Opcode::Or => x || y,
                    _ => return None,
                };
                Some(RawValue::Bool(v))
            }
            (RawValue::Str(x), RawValue::Str(y)) => match op {
                Opcode::Eq => Some(RawValue::Bool(x == y)),
                Opcode::Neq => Some(RawValue::Bool(x != y)),
                Opcode::Concat => Some(RawValue::Str(x + &y)),
                _ => None,
            },
            (l @ RawValue::Array { .. }, r @ RawValue::Array { .. }) => match op {
                Opcode::Eq => Some(RawValue::Bool(l == r)),
                Opcode::Neq => Some(RawValue::Bool(l != r)),
                _ => None,
            },
            _ => None,
        }
    }

    fn convert(&self, conv: Conversion, arg: &SmtExpr, target: &Sort) -> Option<RawValue> {
        let value = self.eval(arg)?;
        match (conv, value, target) {
            (Conversion::SignExtend(_), RawValue::BitVec { bits, width }, Sort::BitVec(w)) => {
                Some(bv(sign_extend(bits, width) as u64, *w))
            }
            (Conversion::BvToFp, RawValue::BitVec { bits, width }, sort) => Some(RawValue::Float(
                round_fp(sign_extend(bits, width) as f64, sort),
            )),
            (Conversion::FpToBv, RawValue::Float(f), Sort::BitVec(w)) => {
                let v = if f.is_nan() {
                    0
                } else if *w >= 64 {
                    f.trunc() as i64
                } else {
                    let (lo, hi) = signed_range(*w);
                    (f.trunc() as i64).clamp(lo, hi)
                };
                Some(bv(v as u64, *w))
            }
            (Conversion::FpToFp, RawValue::Float(f), sort) => Some(RawValue::Float(round_fp(f, sort))),
            _ => None,
        }
    }
}

fn bv_binary(op: Opcode, x: u64, y: u64, width: u32, y_width: u32) -> Option<RawValue> {
    let sx = sign_extend(x, width);
    let sy = sign_extend(y, width);
    let shift = |amount: u64| -> Option<u32> { (amount < width as u64).then_some(amount as u32) };
    let value = match op {
        Opcode::Eq => return Some(RawValue::Bool(x == y)),
        Opcode::Neq => return Some(RawValue::Bool(x != y)),
        Opcode::Gt => return Some(RawValue::Bool(sx > sy)),
        Opcode::Ge => return Some(RawValue::Bool(sx >= sy)),
        Opcode::Lt => return Some(RawValue::Bool(sx < sy)),
        Opcode::Le => return Some(RawValue::Bool(sx <= sy)),
        Opcode::Add => x.wrapping_add(y),
        Opcode::Sub => x.wrapping_sub(y),
        Opcode::Mul => x.wrapping_mul(y),
        Opcode::Divide => {
            if sy == 0 {
                if sx >= 0 {
                    u64::MAX
                } else {
                    1
                }
            } else {
                sx.wrapping_div(sy) as u64
            }
        }
        Opcode::Mod => {
            if sy == 0 {
                x
            } else {
                sx.wrapping_rem(sy) as u64
            }
        }
        Opcode::Shl => shift(y).map(|s| x << s).unwrap_or(0),
        Opcode::Shr => shift(y).map(|s| (x & mask(width)) >> s).unwrap_or(0),
        Opcode::Ashr => match shift(y) {
            Some(s) => (sx >> s) as u64,
            None if sx < 0 => u64::MAX,
            None => 0,
        },
        Opcode::And => x & y,
        Opcode::Or => x | y,
        Opcode::Xor => x ^ y,
        Opcode::Concat => {
            let w = width + y_width;
            if w > 64 {
                return None;
            }
            return Some(bv((x << y_width) | y, w));
        }
        Opcode::Implies | Opcode::Iff => return None,
    };
    Some(bv(value, width))
}

fn fp_binary(op: Opcode, x: f64, y: f64, sort: &Sort) -> Option<RawValue> {
    let value = match op {
        Opcode::Eq => return Some(RawValue::Bool(x == y)),
        Opcode::Neq => return Some(RawValue::Bool(x != y)),
        Opcode::Gt => return Some(RawValue::Bool(x > y)),
        Opcode::Ge => return Some(RawValue::Bool(x >= y)),
        Opcode::Lt => return Some(RawValue::Bool(x < y)),
        Opcode::Le => return Some(RawValue::Bool(x <= y)),
        Opcode::Add => x + y,
        Opcode::Sub => x - y,
        Opcode::Mul => x * y,
        Opcode::Divide => x / y,
        Opcode::Mod => x % y,
        _ => return None,
    };
    Some(RawValue::Float(round_fp(value, sort)))
}
