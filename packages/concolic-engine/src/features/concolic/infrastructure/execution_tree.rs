//! Execution tree: prefix-shared record of every observed run
//!
//! ```text
//!   <entry> ─ @S a = x ─ @P (a > 0) = true ─┬─ @S b = 1 ─ @P (b < y) = true
//!                                           └─ @P (a < 5) = false
//! ```
//!
//! One vertex per distinct clause, shared by every trace that produced it,
//! so the graph is a trie-like DAG rooted at a sentinel entry vertex.
//! Path vertices remember every path prefix that reached them together with
//! the run that produced it; those pairs become the contexts the selector
//! deduplicates on. Insertion only ever adds vertices, edges and recorded
//! prefixes, so merging traces is order-independent.

use crate::shared::models::{
    Clause, InstructionKind, InstructionRef, PathCondition, Predicate, PredicateBody,
    PredicateKind, SymbolicState, Term,
};
use petgraph::algo::dominators::{self, Dominators};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

// ═══════════════════════════════════════════════════════════════════════════
// Graph elements
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct Vertex {
    pub clause: Clause,
    /// `(path prefix ending at this vertex, run)`; empty for data vertices
    states: Vec<(PathCondition, Arc<SymbolicState>)>,
    /// Position of each prefix in `states`
    slots: FxHashMap<PathCondition, usize>,
}

impl Vertex {
    fn new(clause: Clause) -> Self {
        Self {
            clause,
            states: Vec::new(),
            slots: FxHashMap::default(),
        }
    }

    pub fn is_path(&self) -> bool {
        self.clause.is_path()
    }

    fn record(&mut self, prefix: PathCondition, state: &Arc<SymbolicState>) {
        match self.slots.get(&prefix) {
            Some(&slot) => self.states[slot].1 = Arc::clone(state),
            None => {
                self.slots.insert(prefix.clone(), self.states.len());
                self.states.push((prefix, Arc::clone(state)));
            }
        }
    }
}

/// Edge label: whether the source vertex was a branch decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Straight,
    Path,
}

/// Distinguishable outcome of a branching instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Outcome {
    /// Switch target block
    Target(u32),
    Predicate(Predicate),
}

fn outcome_of(clause: &Clause) -> Outcome {
    if let InstructionKind::Switch { cases, default } = &clause.instruction.kind {
        let target = match &clause.predicate.body {
            PredicateBody::Equality { rhv, .. } => rhv
                .as_int()
                .and_then(|v| cases.iter().find(|(c, _)| *c == v).map(|(_, t)| *t)),
            PredicateBody::DefaultSwitch { .. } => Some(*default),
            _ => None,
        };
        if let Some(target) = target {
            return Outcome::Target(target);
        }
    }
    Outcome::Predicate(clause.predicate.clone())
}

// ═══════════════════════════════════════════════════════════════════════════
// Contexts
// ═══════════════════════════════════════════════════════════════════════════

/// A branch vertex seen through the last `k` non-dominating path decisions
/// that led to it. Equality ignores the concrete run behind it.
#[derive(Debug, Clone)]
pub struct Context {
    pub target: NodeIndex,
    pub vertices: Vec<NodeIndex>,
    /// Path condition up to and including the target clause
    pub full_path: PathCondition,
    pub state: Arc<SymbolicState>,
}

impl Context {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target && self.vertices == other.vertices
    }
}

impl Eq for Context {}

impl Hash for Context {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.target.hash(state);
        self.vertices.hash(state);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tree
// ═══════════════════════════════════════════════════════════════════════════

pub struct ExecutionTree {
    graph: DiGraph<Vertex, EdgeKind>,
    root: NodeIndex,
    nodes: FxHashMap<Clause, NodeIndex>,
    edges: FxHashSet<(NodeIndex, NodeIndex)>,
    dominators: Option<Dominators<NodeIndex>>,
    exhaustiveness: FxHashMap<InstructionRef, FxHashSet<Outcome>>,
    depth: usize,
}

impl Default for ExecutionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionTree {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(Vertex::new(Self::entry_clause()));
        Self {
            graph,
            root,
            nodes: FxHashMap::default(),
            edges: FxHashSet::default(),
            dominators: None,
            exhaustiveness: FxHashMap::default(),
            depth: 0,
        }
    }

    fn entry_clause() -> Clause {
        Clause::new(
            InstructionRef::other("<entry>", 0),
            Predicate::equality(PredicateKind::State, Term::bool(true), Term::bool(true)),
        )
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// No trace has been added yet
    pub fn is_empty(&self) -> bool {
        self.graph
            .neighbors_directed(self.root, Direction::Outgoing)
            .next()
            .is_none()
    }

    /// Largest number of path clauses in any recorded run
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Vertex count, including the entry sentinel
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn vertex(&self, index: NodeIndex) -> &Vertex {
        &self.graph[index]
    }

    pub fn path_vertex(&self, clause: &Clause) -> Option<NodeIndex> {
        self.nodes
            .get(clause)
            .copied()
            .filter(|&v| self.graph[v].is_path())
    }

    pub fn successors(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(index, Direction::Outgoing)
    }

    pub fn add_trace(&mut self, state: &SymbolicState) {
        let shared = Arc::new(state.clone());
        let mut prev = self.root;
        let mut prefix = Vec::new();
        let mut path_clauses = 0;
        for clause in &state.clauses.0 {
            let current = match self.nodes.get(clause) {
                Some(&v) => v,
                None => {
                    let v = self.graph.add_node(Vertex::new(clause.clone()));
                    self.nodes.insert(clause.clone(), v);
                    v
                }
            };
            if clause.is_path() {
                path_clauses += 1;
                prefix.push(clause.clone());
                self.graph[current].record(PathCondition(prefix.clone()), &shared);
                self.exhaustiveness
                    .entry(clause.instruction.clone())
                    .or_default()
                    .insert(outcome_of(clause));
            }
            if self.edges.insert((prev, current)) {
                let kind = if self.graph[prev].is_path() {
                    EdgeKind::Path
                } else {
                    EdgeKind::Straight
                };
                self.graph.add_edge(prev, current, kind);
            }
            prev = current;
        }
        self.depth = self.depth.max(path_clauses);
        self.dominators = Some(dominators::simple_fast(&self.graph, self.root));
        debug!(
            clauses = state.clauses.0.len(),
            vertices = self.graph.node_count(),
            depth = self.depth,
            "trace added"
        );
    }

    /// Every outcome of the vertex's instruction has been observed
    pub fn is_exhausted(&self, vertex: NodeIndex) -> bool {
        let instruction = &self.graph[vertex].clause.instruction;
        let seen = self
            .exhaustiveness
            .get(instruction)
            .map(|s| s.len())
            .unwrap_or(0);
        seen >= instruction.outcomes().unwrap_or(2)
    }

    /// `a` strictly dominates `b`
    fn dominates(&self, a: NodeIndex, b: NodeIndex) -> bool {
        if a == b {
            return false;
        }
        self.dominators
            .as_ref()
            .and_then(|d| d.dominators(b))
            .map(|mut it| it.any(|n| n == a))
            .unwrap_or(false)
    }

    /// Contexts of length at most `k` for `vertex`, one per distinct
    /// recorded prefix, in recording order
    pub fn contexts(&self, vertex: NodeIndex, k: usize) -> Vec<Context> {
        let mut out: Vec<Context> = Vec::new();
        for (path, state) in &self.graph[vertex].states {
            let vertices: Vec<NodeIndex> = path
                .iter()
                .filter_map(|c| self.nodes.get(c).copied())
                .filter(|&v| !self.dominates(v, vertex))
                .collect();
            let start = vertices.len().saturating_sub(k);
            let context = Context {
                target: vertex,
                vertices: vertices[start..].to_vec(),
                full_path: path.clone(),
                state: Arc::clone(state),
            };
            if !out.contains(&context) {
                out.push(context);
            }
        }
        out
    }

    /// Path vertices that share a decision point with `vertex`, itself
    /// included
    pub fn siblings(&self, vertex: NodeIndex) -> Vec<&Predicate> {
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for parent in self.graph.neighbors_directed(vertex, Direction::Incoming) {
            for child in self.graph.neighbors_directed(parent, Direction::Outgoing) {
                if self.graph[child].is_path() && seen.insert(child) {
                    out.push(&self.graph[child].clause.predicate);
                }
            }
        }
        out
    }

    /// Minimal branch depth of every path vertex, counting from 1
    pub fn branch_depths(&self) -> FxHashMap<NodeIndex, usize> {
        let mut depths: FxHashMap<NodeIndex, usize> = FxHashMap::default();
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::from([(self.root, 1usize)]);
        while let Some((top, depth)) = queue.pop_front() {
            if !visited.insert(top) {
                continue;
            }
            for next in self.graph.neighbors_directed(top, Direction::Outgoing) {
                let is_path = self.graph[next].is_path();
                if is_path {
                    depths
                        .entry(next)
                        .and_modify(|d| *d = (*d).min(depth))
                        .or_insert(depth);
                }
                if !visited.contains(&next) {
                    queue.push_back((next, if is_path { depth + 1 } else { depth }));
                }
            }
        }
        depths
    }

    /// Path vertices at `depth`, in insertion order
    pub fn branches_at(&self, depth: usize) -> Vec<NodeIndex> {
        let mut branches: Vec<NodeIndex> = self
            .branch_depths()
            .into_iter()
            .filter(|(_, d)| *d == depth)
            .map(|(v, _)| v)
            .collect();
        branches.sort_unstable();
        branches
    }

    /// Structural edge set, independent of vertex numbering
    pub fn edge_set(&self) -> FxHashSet<(Clause, Clause, EdgeKind)> {
        self.graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].clause.clone(),
                    self.graph[e.target()].clause.clone(),
                    *e.weight(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{CmpOp, SymType};

    fn x() -> Term {
        Term::value("x", SymType::Int)
    }

    fn def(i: u32, v: i32) -> Clause {
        Clause::new(
            InstructionRef::other("m", i),
            Predicate::assign(Term::value(format!("v{}", i), SymType::Int), Term::int(v)),
        )
    }

    fn branch(i: u32, taken: bool) -> Clause {
        Clause::new(
            InstructionRef::branch("m", i),
            Predicate::path(
                Term::cmp(CmpOp::Gt, x(), Term::int(i as i32)),
                Term::bool(taken),
            ),
        )
    }

    #[test]
    fn test_shared_prefix_is_one_path() {
        let prefix = vec![def(0, 1), branch(1, true), def(2, 3)];
        let mut a = prefix.clone();
        a.push(branch(3, true));
        let mut b = prefix;
        b.push(branch(3, false));

        let mut tree = ExecutionTree::new();
        tree.add_trace(&SymbolicState::from_clauses(a));
        tree.add_trace(&SymbolicState::from_clauses(b));

        // entry + 3 shared + 2 divergent
        assert_eq!(tree.vertex_count(), 6);
        let divergence = tree.nodes[&def(2, 3)];
        assert_eq!(tree.successors(divergence).count(), 2);
        assert_eq!(tree.depth(), 2);
        let last = tree.path_vertex(&branch(3, true)).unwrap();
        assert_eq!(tree.siblings(last).len(), 2);
        assert!(tree.is_exhausted(last));
    }

    #[test]
    fn test_insertion_commutes() {
        let a = SymbolicState::from_clauses(vec![def(0, 1), branch(1, true), def(2, 2)]);
        let b = SymbolicState::from_clauses(vec![def(0, 1), branch(1, false), branch(4, true)]);

        let mut ab = ExecutionTree::new();
        ab.add_trace(&a);
        ab.add_trace(&b);
        let mut ba = ExecutionTree::new();
        ba.add_trace(&b);
        ba.add_trace(&a);

        assert_eq!(ab.edge_set(), ba.edge_set());
        assert_eq!(ab.depth(), ba.depth());

        // re-adding is a no-op on structure
        let before = ab.edge_set();
        ab.add_trace(&a);
        assert_eq!(ab.edge_set(), before);
        assert_eq!(ab.vertex_count(), 6);
    }

    #[test]
    fn test_repeated_prefix_keeps_latest_run() {
        let clauses = vec![def(0, 1), branch(1, true), branch(2, true)];
        let mut first = SymbolicState::from_clauses(clauses.clone());
        first.trace.clear();
        let second = SymbolicState::from_clauses(clauses);

        let mut tree = ExecutionTree::new();
        tree.add_trace(&first);
        tree.add_trace(&second);

        let last = tree.path_vertex(&branch(2, true)).unwrap();
        let states = &tree.vertex(last).states;
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].0.len(), 2);
        assert_eq!(states[0].1.trace, second.trace);
        assert_eq!(tree.edge_set().len(), 3);
    }

    #[test]
    fn test_branch_depths_and_contexts() {
        let mut tree = ExecutionTree::new();
        assert!(tree.is_empty());
        tree.add_trace(&SymbolicState::from_clauses(vec![
            branch(1, true),
            def(2, 0),
            branch(3, true),
        ]));
        assert!(!tree.is_empty());
        let first = tree.path_vertex(&branch(1, true)).unwrap();
        let second = tree.path_vertex(&branch(3, true)).unwrap();
        assert_eq!(tree.branches_at(1), vec![first]);
        assert_eq!(tree.branches_at(2), vec![second]);
        assert!(tree.branches_at(0).is_empty());

        // the first branch dominates the second and is filtered out
        let contexts = tree.contexts(second, 2);
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].vertices, vec![second]);
        assert_eq!(contexts[0].full_path.len(), 2);
        assert!(!tree.is_exhausted(second));
    }
}
