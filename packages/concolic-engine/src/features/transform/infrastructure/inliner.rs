//! Call inlining
//!
//! A `Call` predicate whose callee has a registered state is replaced by that
//! state, renamed for the call site: callee locals get a `#<site>` suffix,
//! `this` becomes the receiver, arguments become the actual arguments and
//! the callee's return value becomes the call's left-hand side.

use crate::config::InliningConfig;
use crate::context::MethodRegistry;
use crate::features::predicate_state::{PredicateState, StateBuilder};
use crate::features::transform::domain::{PipelineError, Transformer};
use crate::shared::models::{MethodRef, Predicate, PredicateBody, Term, TermKind};
use tracing::debug;

pub struct MethodInliner<'c> {
    methods: &'c MethodRegistry,
    config: &'c InliningConfig,
    depth: usize,
    sites: usize,
    arity_error: Option<String>,
}

impl<'c> MethodInliner<'c> {
    pub fn new(methods: &'c MethodRegistry, config: &'c InliningConfig) -> Self {
        Self {
            methods,
            config,
            depth: 0,
            sites: 0,
            arity_error: None,
        }
    }

    /// Number of call sites inlined so far
    pub fn inlined(&self) -> usize {
        self.sites
    }

    fn inlinable(&self, method: &MethodRef) -> bool {
        if self.depth >= self.config.max_depth {
            return false;
        }
        let name = method.full_name();
        !self.config.ignore.iter().any(|ignored| ignored == &name) && self.methods.contains(method)
    }

    fn inline_call(&mut self, lhv: Option<&Term>, call: &Term) -> Option<PredicateState> {
        let TermKind::Call {
            method,
            owner,
            args,
        } = call.kind()
        else {
            return None;
        };
        if !self.inlinable(method) {
            return None;
        }
        let callee = self.methods.get(method)?;
        if let Some(missing) = max_argument(callee).filter(|&i| i as usize >= args.len()) {
            self.arity_error.get_or_insert_with(|| {
                format!("{} reads arg${} but the call passes {}", method, missing, args.len())
            });
            return None;
        }

        self.sites += 1;
        let site = self.sites;
        let renamed = callee.map(&mut |p| {
            p.map_terms(&mut |t| {
                t.transform(&mut |node| rename(node, site, method, owner.as_ref(), args, lhv))
            })
        });
        debug!(method = %method, site, depth = self.depth, "inlining call");

        self.depth += 1;
        let inlined = self.transform_state(&renamed);
        self.depth -= 1;
        Some(inlined)
    }
}

fn max_argument(state: &PredicateState) -> Option<u32> {
    state
        .collect_vars()
        .iter()
        .filter_map(|t| match t.kind() {
            TermKind::Argument(i) => Some(*i),
            _ => None,
        })
        .max()
}

fn rename(
    node: Term,
    site: usize,
    method: &MethodRef,
    owner: Option<&Term>,
    args: &[Term],
    lhv: Option<&Term>,
) -> Term {
    match node.kind() {
        TermKind::This => owner.cloned().unwrap_or(node),
        TermKind::Argument(i) => args.get(*i as usize).cloned().unwrap_or(node),
        TermKind::ReturnValue(m) if m == method => match lhv {
            Some(l) => l.clone(),
            None => Term::value(format!("{}.retval#{}", method.name, site), node.ty().clone()),
        },
        TermKind::Value(name) => Term::value(format!("{}#{}", name, site), node.ty().clone()),
        _ => node,
    }
}

impl Transformer for MethodInliner<'_> {
    fn name(&self) -> &'static str {
        "method-inliner"
    }

    fn apply(&mut self, state: &PredicateState) -> Result<PredicateState, PipelineError> {
        let inlined = self.transform_state(state);
        match self.arity_error.take() {
            Some(message) => Err(PipelineError::inlining(message)),
            None => Ok(inlined),
        }
    }

    fn transform_basic(&mut self, predicates: &[Predicate]) -> PredicateState {
        let mut builder = StateBuilder::new();
        for p in predicates {
            let inlined = match &p.body {
                PredicateBody::Call { lhv, call } => self.inline_call(lhv.as_ref(), call),
                _ => None,
            };
            match inlined {
                Some(state) => {
                    builder.add_state(&state);
                }
                None => {
                    builder.add_predicate(p.clone());
                }
            }
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{BinaryOp, SymType};

    fn inc_method() -> MethodRef {
        MethodRef::new("Util", "inc")
    }

    /// `tmp = arg0 + 1; retval = tmp`
    fn registry() -> MethodRegistry {
        let tmp = Term::value("tmp", SymType::Int);
        let mut methods = MethodRegistry::new();
        methods.register(
            inc_method(),
            PredicateState::basic(vec![
                Predicate::assign(
                    tmp.clone(),
                    Term::binary(BinaryOp::Add, Term::argument(0, SymType::Int), Term::int(1)),
                ),
                Predicate::assign(Term::return_value(inc_method(), SymType::Int), tmp),
            ]),
        );
        methods
    }

    fn call_state(x: &Term, y: &Term) -> PredicateState {
        PredicateState::basic(vec![Predicate::call(
            Some(y.clone()),
            Term::call(inc_method(), None, vec![x.clone()], SymType::Int),
        )])
    }

    #[test]
    fn test_call_replaced_by_renamed_callee() {
        let methods = registry();
        let config = InliningConfig::default();
        let x = Term::value("x", SymType::Int);
        let y = Term::value("y", SymType::Int);
        let mut inliner = MethodInliner::new(&methods, &config);
        let out = inliner.apply(&call_state(&x, &y)).unwrap();

        let text: Vec<String> = out.predicates().iter().map(|p| p.to_string()).collect();
        assert_eq!(text, vec!["@S tmp#1 = (x + 1)", "@S y = tmp#1"]);
        assert_eq!(inliner.inlined(), 1);
    }

    #[test]
    fn test_ignored_and_depth_limited_calls_stay() {
        let methods = registry();
        let x = Term::value("x", SymType::Int);
        let y = Term::value("y", SymType::Int);
        let state = call_state(&x, &y);

        let ignoring = InliningConfig {
            ignore: vec!["Util.inc".to_string()],
            ..InliningConfig::default()
        };
        let out = MethodInliner::new(&methods, &ignoring).apply(&state).unwrap();
        assert_eq!(out, state);

        let shallow = InliningConfig {
            max_depth: 0,
            ..InliningConfig::default()
        };
        let out = MethodInliner::new(&methods, &shallow).apply(&state).unwrap();
        assert_eq!(out, state);
    }

    #[test]
    fn test_arity_mismatch_is_an_error() {
        let methods = registry();
        let config = InliningConfig::default();
        let y = Term::value("y", SymType::Int);
        let state = PredicateState::basic(vec![Predicate::call(
            Some(y),
            Term::call(inc_method(), None, vec![], SymType::Int),
        )]);
        let err = MethodInliner::new(&methods, &config).apply(&state).unwrap_err();
        assert!(matches!(err, PipelineError::Inlining(_)));
    }
}
