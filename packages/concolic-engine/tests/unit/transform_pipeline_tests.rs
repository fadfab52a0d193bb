//! Transformation pipeline driven by configuration
//!
//! Covers the stage list built from YAML and the passes working together:
//! inlining from the context's registry, nullity facts, folding and dead
//! definitions, memory spacing feeding the slicer.

#[path = "../common/mod.rs"]
mod common;

use common::*;
use concolic_engine::config::EngineConfig;
use concolic_engine::context::AnalysisContext;
use concolic_engine::features::predicate_state::PredicateState;
use concolic_engine::features::transform::{Stage, TransformPipeline};
use concolic_engine::shared::models::{
    BinaryOp, CmpOp, MethodRef, Predicate, PredicateKind, SymType, Term,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn context(yaml: &str) -> AnalysisContext {
    let config = EngineConfig::from_yaml(yaml).unwrap();
    AnalysisContext::new(Arc::new(config))
}

#[test]
fn test_stages_from_yaml() {
    let ctx = context(
        r#"
version: 1
smt:
  slicing: true
transform:
  nullity: false
  float_adapter: false
"#,
    );
    let pipeline = TransformPipeline::from_config(ctx.config());
    let names: Vec<&str> = pipeline.stages().iter().map(Stage::as_str).collect();
    assert!(!names.contains(&"nullity"));
    assert!(!names.contains(&"float-adapter"));
    assert_eq!(names.last(), Some(&"slicing"));
    assert_eq!(pipeline.stages().iter().position(|s| *s == Stage::Memspacing), Some(names.len() - 2));
}

#[test]
fn test_registered_callee_is_inlined() {
    let mut ctx = context("smt:\n  ps_inlining: true\ntransform:\n  inlining:\n    enabled: true\n");
    let inc = MethodRef::new("Util", "inc");
    let tmp = int("tmp");
    ctx.methods_mut().register(
        inc.clone(),
        PredicateState::basic(vec![
            Predicate::assign(
                tmp.clone(),
                Term::binary(BinaryOp::Add, Term::argument(0, SymType::Int), Term::int(1)),
            ),
            Predicate::assign(Term::return_value(inc.clone(), SymType::Int), tmp),
        ]),
    );

    let (x, y) = (int("x"), int("y"));
    let state = PredicateState::basic(vec![
        Predicate::call(Some(y.clone()), Term::call(inc, None, vec![x], SymType::Int)),
        path_cmp(CmpOp::Eq, y, Term::int(5)),
    ]);
    let pipeline = TransformPipeline::from_config(ctx.config());
    let out = pipeline.apply_state(&ctx, &state).unwrap();
    let text = texts(&out);
    assert_eq!(text.len(), 3);
    assert_eq!(&text[..2], &["@S tmp#1 = (x + 1)", "@S y = tmp#1"]);
}

#[test]
fn test_non_null_facts_become_requirements() {
    let mut ctx = context("transform:\n  nullity: true\n");
    let a = SymType::class("A");
    let arg = Term::argument(0, a.clone());
    ctx.mark_non_null(arg.clone());
    let state = PredicateState::basic(vec![path_cmp(CmpOp::Neq, arg, Term::null())]);

    let pipeline = TransformPipeline::from_config(ctx.config());
    let out = pipeline.apply_state(&ctx, &state).unwrap();
    let first = out.predicates()[0].clone();
    assert_eq!(first.kind, PredicateKind::Require);
}

#[test]
fn test_memspacing_feeds_slicing() {
    let ctx = context("smt:\n  memspacing: true\n  slicing: true\n");
    let a = SymType::class("A");
    let (o, p, v) = (Term::value("o", a.clone()), Term::value("p", a.clone()), int("v"));
    let state = PredicateState::basic(vec![
        Predicate::new_object(o.clone()),
        Predicate::new_object(p.clone()),
        Predicate::field_store(Term::field(o.clone(), "f", SymType::Int), Term::int(3)),
        Predicate::field_store(Term::field(p, "f", SymType::Int), Term::int(4)),
        Predicate::assign(v.clone(), Term::field_load(Term::field(o, "f", SymType::Int))),
    ]);
    let query = PredicateState::basic(vec![path_cmp(CmpOp::Eq, v, Term::int(3))]);

    let pipeline = TransformPipeline::from_config(ctx.config());
    let (out, _) = pipeline.apply(&ctx, &state, &query).unwrap();
    assert_eq!(out.size(), 3);
    assert!(out.collect_vars().iter().all(|t| t.to_string() != "p"));
}

#[test]
fn test_disabled_pipeline_only_simplifies() {
    let ctx = context(
        r#"
smt:
  ps_inlining: false
  memspacing: false
  slicing: false
transform:
  intrinsics: false
  nullity: false
  bool_adapter: false
  float_adapter: false
  constant_propagation: false
  optimizer: false
"#,
    );
    let pipeline = TransformPipeline::from_config(ctx.config());
    assert!(pipeline.stages().is_empty());

    let x = int("x");
    let state = PredicateState::chain(
        PredicateState::basic(vec![Predicate::assign(x.clone(), Term::int(1))]),
        PredicateState::basic(vec![path_cmp(CmpOp::Gt, x, Term::int(0))]),
    );
    let out = pipeline.apply_state(&ctx, &state).unwrap();
    assert_eq!(out, state.simplify());
}
