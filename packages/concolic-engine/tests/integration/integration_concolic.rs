//! Concolic exploration end to end
//!
//! A tiny program under test, nested `if (x > 0) { if (x > 10) .. }`, is
//! driven through the explorer with in-process generator and executor.

#[path = "../common/mod.rs"]
mod common;

use async_trait::async_trait;
use common::*;
use concolic_engine::config::EngineConfig;
use concolic_engine::context::AnalysisContext;
use concolic_engine::features::concolic::{
    BfsPathSelector, ConcolicExplorer, ExecutionTree, PathSelector, TestCaseGenerator,
    TestExecutor,
};
use concolic_engine::features::smt::{Checker, SmtModel};
use concolic_engine::shared::models::{
    Clause, CmpOp, ExecutionCompletedResult, ExecutionResult, SymbolicState, Term, TestExecutionRequest,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

const METHOD: &str = "Foo.classify";

fn x() -> Term {
    int("x")
}

fn outer(taken: bool) -> Clause {
    branch(METHOD, 1, Term::cmp(CmpOp::Gt, x(), Term::int(0)), taken)
}

fn inner(taken: bool) -> Clause {
    branch(METHOD, 4, Term::cmp(CmpOp::Gt, x(), Term::int(10)), taken)
}

fn run_program(input: i64) -> SymbolicState {
    let mut clauses = vec![outer(input > 0)];
    if input > 0 {
        clauses.push(assign(METHOD, 2, int("y"), Term::int(1)));
        clauses.push(inner(input > 10));
    }
    trace(clauses)
}

struct Generator;

#[async_trait]
impl TestCaseGenerator for Generator {
    async fn initial(&self, _method: &str) -> Option<TestExecutionRequest> {
        Some(TestExecutionRequest::new("FooTest", "0"))
    }

    async fn generate(
        &self,
        _method: &str,
        _state: &SymbolicState,
        model: &SmtModel,
    ) -> Option<TestExecutionRequest> {
        let value = model.value_of(&x())?.as_int()?;
        Some(TestExecutionRequest::new("FooTest", value.to_string()))
    }
}

/// Records every input it runs, in order
#[derive(Default)]
struct Executor {
    inputs: Mutex<Vec<i64>>,
}

impl Executor {
    fn inputs(&self) -> Vec<i64> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TestExecutor for Executor {
    async fn execute(&self, request: &TestExecutionRequest) -> Option<ExecutionResult> {
        let input: i64 = request.test_method.parse().ok()?;
        self.inputs.lock().unwrap().push(input);
        Some(ExecutionResult::completed(
            ExecutionCompletedResult::SuccessResult {
                trace: vec![request.test_method.clone()],
                symbolic_state: run_program(input),
            },
        ))
    }
}

fn paths_of(inputs: &[i64]) -> Vec<(bool, Option<bool>)> {
    let mut paths: Vec<(bool, Option<bool>)> = inputs
        .iter()
        .map(|&v| (v > 0, (v > 0).then_some(v > 10)))
        .collect();
    paths.sort();
    paths.dedup();
    paths
}

#[test]
fn test_tree_merges_runs_on_shared_prefix() {
    let mut tree = ExecutionTree::new();
    tree.add_trace(&run_program(1));
    tree.add_trace(&run_program(11));

    // entry, outer, assignment, two inner outcomes
    assert_eq!(tree.vertex_count(), 5);
    assert_eq!(tree.depth(), 2);
    let taken = tree.path_vertex(&inner(true)).unwrap();
    assert!(tree.is_exhausted(taken));
    assert_eq!(tree.siblings(taken).len(), 2);
    assert!(!tree.is_exhausted(tree.path_vertex(&outer(true)).unwrap()));

    tree.add_trace(&run_program(-3));
    assert!(tree.is_exhausted(tree.path_vertex(&outer(true)).unwrap()));
}

#[tokio::test]
async fn test_context_guided_exploration_covers_every_path() {
    let ctx = AnalysisContext::new(Arc::new(EngineConfig::default()));
    let executor = Arc::new(Executor::default());
    let explorer = ConcolicExplorer::with_checker(
        &ctx,
        Checker::new(&ctx, Enumerative),
        Arc::new(Generator),
        executor.clone(),
    );

    let mut selector = explorer.selector();
    let report = explorer.explore(METHOD, &mut selector).await.unwrap();

    assert_eq!(report.sat, 2);
    assert_eq!(report.executed, 3);
    assert!(!report.timed_out && !report.cancelled);
    assert_eq!(paths_of(&executor.inputs()).len(), 3);
    assert!(!selector.has_next());
}

#[tokio::test]
async fn test_bfs_exploration_covers_every_path() {
    let ctx = AnalysisContext::new(Arc::new(EngineConfig::default()));
    let executor = Arc::new(Executor::default());
    let explorer = ConcolicExplorer::with_checker(
        &ctx,
        Checker::new(&ctx, Enumerative),
        Arc::new(Generator),
        executor.clone(),
    );

    let mut selector = BfsPathSelector::new();
    let report = explorer.explore(METHOD, &mut selector).await.unwrap();

    assert_eq!(report.executed, 3);
    assert_eq!(report.unsat, 0);
    assert_eq!(paths_of(&executor.inputs()).len(), 3);
}

#[tokio::test]
async fn test_iteration_limit_stops_exploration() {
    let config = EngineConfig::from_yaml("concolic:\n  max_iterations: 1\n").unwrap();
    let ctx = AnalysisContext::new(Arc::new(config));
    let executor = Arc::new(Executor::default());
    let explorer = ConcolicExplorer::with_checker(
        &ctx,
        Checker::new(&ctx, Enumerative),
        Arc::new(Generator),
        executor.clone(),
    );

    let reports = explorer.explore_all(&[METHOD.to_string()]).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].iterations, 1);
    assert_eq!(reports[0].executed, 2);
}
