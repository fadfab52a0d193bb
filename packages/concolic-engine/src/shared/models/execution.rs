//! Test execution messages exchanged between the exploration loop and the
//! isolated executor

use super::clause::SymbolicState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestExecutionRequest {
    pub klass: String,
    pub test_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_method: Option<String>,
}

impl TestExecutionRequest {
    pub fn new(klass: impl Into<String>, test_method: impl Into<String>) -> Self {
        Self {
            klass: klass.into(),
            test_method: test_method.into(),
            setup_method: None,
        }
    }

    pub fn with_setup(mut self, setup_method: impl Into<String>) -> Self {
        self.setup_method = Some(setup_method.into());
        self
    }
}

/// Outcome of a run that reached the test body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExecutionCompletedResult {
    #[serde(rename_all = "camelCase")]
    SuccessResult {
        trace: Vec<String>,
        symbolic_state: SymbolicState,
    },
    #[serde(rename_all = "camelCase")]
    ExceptionResult {
        cause: String,
        trace: Vec<String>,
        symbolic_state: SymbolicState,
    },
}

impl ExecutionCompletedResult {
    pub fn symbolic_state(&self) -> &SymbolicState {
        match self {
            ExecutionCompletedResult::SuccessResult { symbolic_state, .. }
            | ExecutionCompletedResult::ExceptionResult { symbolic_state, .. } => symbolic_state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum ExecutionResult {
    ExecutionFailedResult { message: String },
    SetupFailedResult { message: String },
    ExecutionTimedOutResult { message: String },
    ExecutionCompletedResult { completed: ExecutionCompletedResult },
}

impl ExecutionResult {
    pub fn failed(message: impl Into<String>) -> Self {
        ExecutionResult::ExecutionFailedResult {
            message: message.into(),
        }
    }

    pub fn setup_failed(message: impl Into<String>) -> Self {
        ExecutionResult::SetupFailedResult {
            message: message.into(),
        }
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        ExecutionResult::ExecutionTimedOutResult {
            message: message.into(),
        }
    }

    pub fn completed(completed: ExecutionCompletedResult) -> Self {
        ExecutionResult::ExecutionCompletedResult { completed }
    }

    pub fn symbolic_state(&self) -> Option<&SymbolicState> {
        match self {
            ExecutionResult::ExecutionCompletedResult { completed } => {
                Some(completed.symbolic_state())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{
        Clause, CmpOp, ConcreteBinding, ConcreteValue, InstructionRef, Predicate, SymType, Term,
    };
    use pretty_assertions::assert_eq;

    fn state() -> SymbolicState {
        let x = Term::value("x", SymType::Int);
        let mut state = SymbolicState::from_clauses(vec![
            Clause::new(
                InstructionRef::other("Foo.bar", 0),
                Predicate::assign(Term::value("y", SymType::Int), Term::int(1)),
            ),
            Clause::new(
                InstructionRef::branch("Foo.bar", 1),
                Predicate::path(Term::cmp(CmpOp::Gt, x.clone(), Term::int(0)), Term::bool(true)),
            ),
        ]);
        state.concrete_values.push(ConcreteBinding {
            term: x,
            value: ConcreteValue::Int { value: 7 },
        });
        state
    }

    fn round_trip<T>(value: &T) -> T
    where
        T: Serialize + serde::de::DeserializeOwned,
    {
        let json = serde_json::to_string(value).unwrap();
        assert!(!json.contains('\n'), "messages must fit on one line");
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_every_result_survives_the_wire() {
        let results = vec![
            ExecutionResult::failed("boom"),
            ExecutionResult::setup_failed("no such class"),
            ExecutionResult::timed_out("timeout"),
            ExecutionResult::completed(ExecutionCompletedResult::SuccessResult {
                trace: vec!["Foo.bar".to_string()],
                symbolic_state: state(),
            }),
            ExecutionResult::completed(ExecutionCompletedResult::ExceptionResult {
                cause: "java.lang.NullPointerException".to_string(),
                trace: vec![],
                symbolic_state: state(),
            }),
        ];
        for result in &results {
            assert_eq!(&round_trip(result), result);
        }
    }

    #[test]
    fn test_non_finite_doubles_survive_the_wire() {
        let doubles = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.0, 2.5];
        let mut symbolic_state = state();
        for (i, value) in doubles.iter().enumerate() {
            symbolic_state.concrete_values.push(ConcreteBinding {
                term: Term::value(format!("d{}", i), SymType::Double),
                value: ConcreteValue::Double { value: *value },
            });
        }
        let result = ExecutionResult::completed(ExecutionCompletedResult::SuccessResult {
            trace: vec![],
            symbolic_state,
        });

        let decoded = round_trip(&result);
        let values: Vec<f64> = decoded
            .symbolic_state()
            .unwrap()
            .concrete_values
            .iter()
            .filter_map(|b| match b.value {
                ConcreteValue::Double { value } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(values.len(), doubles.len());
        assert!(values[0].is_nan());
        assert_eq!(values[1], f64::INFINITY);
        assert_eq!(values[2], f64::NEG_INFINITY);
        assert!(values[3] == 0.0 && values[3].is_sign_negative());
        assert_eq!(values[4], 2.5);
    }

    #[test]
    fn test_request_wire_names() {
        let request = TestExecutionRequest::new("FooTest", "test0");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"klass": "FooTest", "testMethod": "test0"}));
        assert_eq!(round_trip(&request), request);

        let with_setup = request.with_setup("setUp");
        assert_eq!(round_trip(&with_setup), with_setup);
    }

    #[test]
    fn test_result_tag() {
        let json = serde_json::to_value(ExecutionResult::timed_out("t")).unwrap();
        assert_eq!(json["result"], "executionTimedOutResult");
        assert!(ExecutionResult::timed_out("t").symbolic_state().is_none());
    }
}
