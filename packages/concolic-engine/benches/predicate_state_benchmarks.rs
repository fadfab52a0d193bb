//! PredicateState algebra and pipeline benchmarks
//!
//! States are built as chains of basic blocks with a two-way choice every
//! few blocks, roughly the shape a loop-free method body produces.

use concolic_engine::config::EngineConfig;
use concolic_engine::context::AnalysisContext;
use concolic_engine::features::predicate_state::PredicateState;
use concolic_engine::features::transform::TransformPipeline;
use concolic_engine::shared::models::{BinaryOp, CmpOp, Predicate, SymType, Term};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

fn var(i: usize) -> Term {
    Term::value(format!("v{}", i), SymType::Int)
}

fn block(i: usize) -> PredicateState {
    PredicateState::basic(vec![
        Predicate::assign(var(i + 1), Term::binary(BinaryOp::Add, var(i), Term::int(1))),
        Predicate::path(Term::cmp(CmpOp::Lt, var(i + 1), Term::int(i as i32)), Term::bool(true)),
    ])
}

fn method_state(blocks: usize) -> PredicateState {
    let mut state = PredicateState::empty();
    for i in 0..blocks {
        let next = if i % 4 == 3 {
            PredicateState::choice(vec![block(i), PredicateState::empty()])
        } else {
            block(i)
        };
        state = PredicateState::chain(state, next);
    }
    state
}

// ============================================================================
// Algebra
// ============================================================================

fn bench_simplify(c: &mut Criterion) {
    let mut group = c.benchmark_group("simplify");
    for blocks in [16usize, 128, 1024] {
        let state = method_state(blocks);
        group.throughput(Throughput::Elements(state.size() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &state, |b, state| {
            b.iter(|| black_box(state.simplify()));
        });
    }
    group.finish();
}

fn bench_slice_on(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice_on");
    for blocks in [16usize, 128, 1024] {
        let prefix = method_state(blocks / 2);
        let state = PredicateState::chain(prefix.clone(), method_state(blocks / 2));
        group.bench_with_input(
            BenchmarkId::from_parameter(blocks),
            &(state, prefix),
            |b, (state, prefix)| {
                b.iter(|| black_box(state.slice_on(prefix)));
            },
        );
    }
    group.finish();
}

fn bench_reverse(c: &mut Criterion) {
    let state = method_state(256);
    c.bench_function("reverse_256", |b| {
        b.iter(|| black_box(state.reverse()));
    });
}

// ============================================================================
// Pipeline
// ============================================================================

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let mut config = EngineConfig::default();
    config.smt.slicing = true;
    let ctx = AnalysisContext::new(Arc::new(config));
    let pipeline = TransformPipeline::from_config(ctx.config());

    for blocks in [16usize, 128] {
        let state = method_state(blocks);
        let query = PredicateState::basic(vec![Predicate::path(
            Term::cmp(CmpOp::Gt, var(blocks), Term::int(0)),
            Term::bool(true),
        )]);
        group.bench_with_input(
            BenchmarkId::from_parameter(blocks),
            &(state, query),
            |b, (state, query)| {
                b.iter(|| black_box(pipeline.apply(&ctx, state, query)));
            },
        );
    }
    group.finish();
}

criterion_group!(algebra, bench_simplify, bench_slice_on, bench_reverse);
criterion_group!(transform, bench_pipeline);
criterion_main!(algebra, transform);
