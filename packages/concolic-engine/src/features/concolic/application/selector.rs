//! Path selection strategies
//!
//! A selector consumes completed runs and proposes the next symbolic state
//! to solve: a prefix of an observed run whose last path clause has been
//! reversed.

use crate::features::concolic::infrastructure::{ClauseReverser, Context, ExecutionTree};
use crate::shared::models::{Clause, ClauseState, PathCondition, Predicate, SymbolicState};
use petgraph::graph::NodeIndex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use tracing::{debug, trace};

pub trait PathSelector: Send {
    fn name(&self) -> &'static str;

    /// Nothing has been recorded yet
    fn is_empty(&self) -> bool;

    fn has_next(&mut self) -> bool;

    /// Next state to solve; `None` once `has_next` is false
    fn next(&mut self) -> Option<SymbolicState>;

    fn add_execution_trace(&mut self, state: &SymbolicState);
}

/// Clauses of `source` before its `n`-th path clause (1-based)
fn clauses_before_path_clause(source: &SymbolicState, n: usize) -> Vec<Clause> {
    let mut seen = 0;
    let mut out = Vec::new();
    for clause in &source.clauses.0 {
        if clause.is_path() {
            seen += 1;
            if seen == n {
                break;
            }
        }
        out.push(clause.clone());
    }
    out
}

fn candidate_state(source: &SymbolicState, clauses: Vec<Clause>, path: Vec<Clause>) -> SymbolicState {
    let trace = clauses.iter().map(|c| c.instruction.clone()).collect();
    SymbolicState {
        clauses: ClauseState(clauses),
        path: PathCondition(path),
        concrete_values: source.concrete_values.clone(),
        trace,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Context-guided selection
// ═══════════════════════════════════════════════════════════════════════════

struct Candidate {
    context: Context,
    /// Path condition before the active clause
    path: Vec<Clause>,
    reversed: Clause,
}

/// Scans the execution tree depth by depth, flipping each branch once per
/// distinct context of length `k`, and widens `k` after every full sweep.
pub struct ContextGuidedSelector {
    tree: ExecutionTree,
    reverser: ClauseReverser,
    current_depth: usize,
    k: usize,
    initial_k: usize,
    branches: VecDeque<NodeIndex>,
    visited: FxHashSet<Context>,
    pending: VecDeque<Candidate>,
}

impl ContextGuidedSelector {
    pub fn new(initial_k: usize) -> Self {
        let initial_k = initial_k.max(1);
        Self {
            tree: ExecutionTree::new(),
            reverser: ClauseReverser::new(),
            current_depth: 0,
            k: initial_k,
            initial_k,
            branches: VecDeque::new(),
            visited: FxHashSet::default(),
            pending: VecDeque::new(),
        }
    }

    pub fn tree(&self) -> &ExecutionTree {
        &self.tree
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn current_depth(&self) -> usize {
        self.current_depth
    }

    fn next_edge(&mut self) -> Option<NodeIndex> {
        if self.branches.is_empty() {
            if self.current_depth < self.tree.depth() {
                self.current_depth += 1;
            } else {
                self.k += 1;
                self.current_depth = 0;
            }
            self.branches = self.tree.branches_at(self.current_depth).into();
        }
        self.branches.pop_front()
    }

    fn enqueue(&mut self, vertex: NodeIndex) {
        let siblings = self.tree.siblings(vertex);
        for context in self.tree.contexts(vertex, self.k) {
            if self.visited.contains(&context) {
                continue;
            }
            let mut path = context.full_path.0.clone();
            let Some(active) = path.pop() else {
                continue;
            };
            let Some(reversed) = self.reverser.reverse(&active, &siblings) else {
                continue;
            };
            trace!(k = self.k, clause = %active, "candidate context");
            self.pending.push_back(Candidate {
                context,
                path,
                reversed,
            });
        }
    }
}

impl PathSelector for ContextGuidedSelector {
    fn name(&self) -> &'static str {
        "context-guided"
    }

    fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    fn has_next(&mut self) -> bool {
        if !self.pending.is_empty() {
            return true;
        }
        loop {
            if let Some(vertex) = self.next_edge() {
                if !self.tree.is_exhausted(vertex) {
                    self.enqueue(vertex);
                    if !self.pending.is_empty() {
                        return true;
                    }
                }
            }
            let depth = self.tree.depth();
            if self.current_depth > depth || self.k > depth {
                return false;
            }
        }
    }

    fn next(&mut self) -> Option<SymbolicState> {
        let Candidate {
            context,
            mut path,
            reversed,
        } = self.pending.pop_front()?;
        let source = context.state.clone();
        let clauses = clauses_before_path_clause(&source, context.full_path.len());
        path.push(reversed);
        self.visited.insert(context);
        Some(candidate_state(&source, clauses, path))
    }

    fn add_execution_trace(&mut self, state: &SymbolicState) {
        let before = self.tree.vertex_count();
        self.tree.add_trace(state);
        if self.tree.vertex_count() > before {
            debug!(
                vertices = self.tree.vertex_count(),
                depth = self.tree.depth(),
                "execution tree grew, restarting sweep"
            );
            self.current_depth = 0;
            self.k = self.initial_k;
            self.branches.clear();
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Breadth-first selection
// ═══════════════════════════════════════════════════════════════════════════

/// Flips every path clause of every new run, shortest prefixes first
#[derive(Default)]
pub struct BfsPathSelector {
    reverser: ClauseReverser,
    covered: FxHashSet<PathCondition>,
    /// Every prefix of a covered path
    observed: FxHashSet<PathCondition>,
    /// Outcomes observed after each prefix
    outcomes: FxHashMap<PathCondition, Vec<Predicate>>,
    candidates: FxHashSet<PathCondition>,
    queue: VecDeque<SymbolicState>,
}

impl BfsPathSelector {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, path: &PathCondition) {
        let mut prefix = Vec::new();
        for clause in path.iter() {
            let outcomes = self.outcomes.entry(PathCondition(prefix.clone())).or_default();
            if !outcomes.contains(&clause.predicate) {
                outcomes.push(clause.predicate.clone());
            }
            prefix.push(clause.clone());
            self.observed.insert(PathCondition(prefix.clone()));
        }
    }

    fn add_candidates(&mut self, state: &SymbolicState) {
        let mut clauses = Vec::new();
        let mut path = Vec::new();
        for clause in &state.clauses.0 {
            if clause.is_path() {
                let key = PathCondition(path.clone());
                let siblings: Vec<&Predicate> =
                    self.outcomes.get(&key).map(|o| o.iter().collect()).unwrap_or_default();
                if let Some(reversed) = self.reverser.reverse(clause, &siblings) {
                    let mut new_path = path.clone();
                    new_path.push(reversed.clone());
                    let new_path = PathCondition(new_path);
                    if !self.observed.contains(&new_path) && self.candidates.insert(new_path.clone()) {
                        let mut new_clauses = clauses.clone();
                        new_clauses.push(reversed);
                        self.queue
                            .push_back(candidate_state(state, new_clauses, new_path.0));
                    }
                }
                path.push(clause.clone());
            }
            clauses.push(clause.clone());
        }
    }
}

impl PathSelector for BfsPathSelector {
    fn name(&self) -> &'static str {
        "bfs"
    }

    fn is_empty(&self) -> bool {
        self.covered.is_empty()
    }

    fn has_next(&mut self) -> bool {
        !self.queue.is_empty()
    }

    fn next(&mut self) -> Option<SymbolicState> {
        self.queue.pop_front()
    }

    fn add_execution_trace(&mut self, state: &SymbolicState) {
        if !self.covered.insert(state.path.clone()) {
            return;
        }
        self.record(&state.path);
        self.add_candidates(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{CmpOp, InstructionRef, SymType, Term};
    use pretty_assertions::assert_eq;

    fn branch(i: u32, taken: bool) -> Clause {
        Clause::new(
            InstructionRef::branch("m", i),
            Predicate::path(
                Term::cmp(CmpOp::Gt, Term::value("x", SymType::Int), Term::int(i as i32)),
                Term::bool(taken),
            ),
        )
    }

    fn def(i: u32) -> Clause {
        Clause::new(
            InstructionRef::other("m", i),
            Predicate::assign(Term::value("y", SymType::Int), Term::int(i as i32)),
        )
    }

    fn drain(selector: &mut dyn PathSelector) -> Vec<SymbolicState> {
        let mut out = Vec::new();
        while selector.has_next() {
            match selector.next() {
                Some(state) => out.push(state),
                None => break,
            }
            assert!(out.len() < 100, "selector did not terminate");
        }
        out
    }

    #[test]
    fn test_context_selector_terminates_on_fixed_tree() {
        let mut selector = ContextGuidedSelector::new(1);
        assert!(selector.is_empty());
        selector.add_execution_trace(&SymbolicState::from_clauses(vec![
            branch(1, true),
            def(2),
            branch(3, true),
        ]));

        let states = drain(&mut selector);
        assert_eq!(states.len(), 2);
        assert!(states[0].clauses.0.is_empty());
        assert_eq!(states[0].path.0, vec![branch(1, false)]);
        assert_eq!(states[1].clauses.0, vec![branch(1, true), def(2)]);
        assert_eq!(states[1].path.0, vec![branch(1, true), branch(3, false)]);
        assert!(!selector.has_next());
        assert!(selector.k() > selector.tree().depth());
    }

    #[test]
    fn test_context_selector_restarts_on_growth() {
        let mut selector = ContextGuidedSelector::new(1);
        selector.add_execution_trace(&SymbolicState::from_clauses(vec![branch(1, true)]));
        assert_eq!(drain(&mut selector).len(), 1);

        // the flipped run covers the other side: nothing left to try
        selector.add_execution_trace(&SymbolicState::from_clauses(vec![
            branch(1, false),
            branch(2, true),
        ]));
        assert_eq!(selector.k(), 1);
        assert_eq!(selector.current_depth(), 0);
        let states = drain(&mut selector);
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].path.0, vec![branch(1, false), branch(2, false)]);
    }

    #[test]
    fn test_bfs_flips_each_prefix_once() {
        let mut selector = BfsPathSelector::new();
        let run = SymbolicState::from_clauses(vec![branch(1, true), def(2), branch(3, true)]);
        selector.add_execution_trace(&run);
        selector.add_execution_trace(&run);
        let states = drain(&mut selector);
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].path.0, vec![branch(1, false)]);
        assert_eq!(
            states[1].clauses.0,
            vec![branch(1, true), def(2), branch(3, false)]
        );

        selector.add_execution_trace(&SymbolicState::from_clauses(vec![branch(1, false)]));
        assert!(!selector.has_next());
    }
}
