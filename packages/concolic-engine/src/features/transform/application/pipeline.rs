//! Transformation pipeline
//!
//! The fixed pass order run before every solver call. Each stage can be
//! switched off through configuration, but enabled stages always run in the
//! order of [`Stage`]: memory spacing must see the state after every
//! rewrite, and slicing relies on the spaces it assigns.

use crate::config::{EngineConfig, InliningConfig};
use crate::context::AnalysisContext;
use crate::features::predicate_state::PredicateState;
use crate::features::transform::domain::{PairTransformer, PipelineError, Transformer};
use crate::features::transform::infrastructure::{
    BoolTypeAdapter, ConstantPropagator, FloatTypeAdapter, IntrinsicAdapter, MemorySpacer,
    MethodInliner, NullityAnnotator, Optimizer, Slicer,
};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Inlining,
    Intrinsics,
    Nullity,
    BoolAdapter,
    FloatAdapter,
    ConstantPropagation,
    Optimization,
    Memspacing,
    Slicing,
}

impl Stage {
    pub const ORDER: [Stage; 9] = [
        Stage::Inlining,
        Stage::Intrinsics,
        Stage::Nullity,
        Stage::BoolAdapter,
        Stage::FloatAdapter,
        Stage::ConstantPropagation,
        Stage::Optimization,
        Stage::Memspacing,
        Stage::Slicing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Inlining => "inlining",
            Stage::Intrinsics => "intrinsics",
            Stage::Nullity => "nullity",
            Stage::BoolAdapter => "bool-adapter",
            Stage::FloatAdapter => "float-adapter",
            Stage::ConstantPropagation => "constant-propagation",
            Stage::Optimization => "optimization",
            Stage::Memspacing => "memspacing",
            Stage::Slicing => "slicing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TransformPipeline {
    stages: Vec<Stage>,
    inlining: InliningConfig,
}

impl TransformPipeline {
    pub fn from_config(config: &EngineConfig) -> Self {
        let transform = &config.transform;
        let enabled = |stage: &Stage| match stage {
            Stage::Inlining => config.smt.ps_inlining && transform.inlining.enabled,
            Stage::Intrinsics => transform.intrinsics,
            Stage::Nullity => transform.nullity,
            Stage::BoolAdapter => transform.bool_adapter,
            Stage::FloatAdapter => transform.float_adapter,
            Stage::ConstantPropagation => transform.constant_propagation,
            Stage::Optimization => transform.optimizer,
            Stage::Memspacing => config.smt.memspacing,
            Stage::Slicing => config.smt.slicing,
        };
        Self {
            stages: Stage::ORDER.iter().copied().filter(enabled).collect(),
            inlining: transform.inlining.clone(),
        }
    }

    /// Enabled stages, in run order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run every enabled stage over `(state, query)`
    pub fn apply(
        &self,
        ctx: &AnalysisContext,
        state: &PredicateState,
        query: &PredicateState,
    ) -> Result<(PredicateState, PredicateState), PipelineError> {
        let mut state = state.clone();
        let mut query = query.clone();
        for stage in &self.stages {
            let before = state.size();
            match stage {
                Stage::Inlining => {
                    let mut pass = MethodInliner::new(ctx.methods(), &self.inlining);
                    state = pass.apply(&state)?;
                    query = pass.apply(&query)?;
                }
                Stage::Intrinsics => run_both(&mut IntrinsicAdapter::new(), &mut state, &mut query)?,
                Stage::Nullity => {
                    run_both(&mut NullityAnnotator::new(ctx.non_null()), &mut state, &mut query)?
                }
                Stage::BoolAdapter => run_both(&mut BoolTypeAdapter::new(), &mut state, &mut query)?,
                Stage::FloatAdapter => {
                    run_both(&mut FloatTypeAdapter::new(), &mut state, &mut query)?
                }
                Stage::ConstantPropagation => {
                    run_both(&mut ConstantPropagator::new(), &mut state, &mut query)?
                }
                Stage::Optimization => {
                    state = Optimizer::with_query(&query).apply(&state)?;
                }
                Stage::Memspacing => {
                    (state, query) = MemorySpacer::new().apply_pair(&state, &query)?;
                }
                Stage::Slicing => {
                    (state, query) = Slicer::new().apply_pair(&state, &query)?;
                }
            }
            debug!(stage = %stage, before, after = state.size(), "pipeline stage");
        }
        Ok((state.simplify(), query.simplify()))
    }

    /// Single-state variant for reachability checks
    pub fn apply_state(
        &self,
        ctx: &AnalysisContext,
        state: &PredicateState,
    ) -> Result<PredicateState, PipelineError> {
        self.apply(ctx, state, &PredicateState::empty())
            .map(|(state, _)| state)
    }
}

fn run_both(
    pass: &mut dyn Transformer,
    state: &mut PredicateState,
    query: &mut PredicateState,
) -> Result<(), PipelineError> {
    *state = pass.apply(state)?;
    *query = pass.apply(query)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use crate::shared::models::{BinaryOp, CmpOp, Predicate, SymType, Term};
    use std::sync::Arc;

    #[test]
    fn test_stage_order_follows_flags() {
        let mut config = EngineConfig::preset(Preset::Balanced);
        config.smt.slicing = true;
        config.transform.nullity = false;
        let pipeline = TransformPipeline::from_config(&config);
        assert_eq!(pipeline.stages().first(), Some(&Stage::Inlining));
        assert_eq!(pipeline.stages().last(), Some(&Stage::Slicing));
        assert!(!pipeline.stages().contains(&Stage::Nullity));

        config.smt.ps_inlining = false;
        let pipeline = TransformPipeline::from_config(&config);
        assert!(!pipeline.stages().contains(&Stage::Inlining));
    }

    #[test]
    fn test_folding_then_dead_code() {
        let config = Arc::new(EngineConfig::default());
        let ctx = AnalysisContext::new(config.clone());
        let x = Term::value("x", SymType::Int);
        let t = Term::value("t", SymType::Int);
        let state = PredicateState::basic(vec![
            Predicate::assign(t, Term::binary(BinaryOp::Add, Term::int(2), Term::int(3))),
            Predicate::path(Term::cmp(CmpOp::Lt, x, Term::int(5)), Term::bool(true)),
        ]);
        let pipeline = TransformPipeline::from_config(&config);
        let out = pipeline.apply_state(&ctx, &state).unwrap();
        let text: Vec<String> = out.predicates().iter().map(|p| p.to_string()).collect();
        assert_eq!(text, vec!["@P (x < 5) = true"]);
    }
}
