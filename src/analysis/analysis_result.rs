use crate::analysis::memory::expression::ExpressionType;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Violations of the contract between the front-end and the engine.
/// Everything the engine can recover from soundly is a diagnostic instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
    #[error("unknown class `{0}`")]
    UnknownClass(String),
    #[error("class `{class_name}` has no field `{field_name}`")]
    UnknownField {
        class_name: String,
        field_name: String,
    },
    #[error("`{method}` expects {expected} arguments, found {found}")]
    WrongArgumentCount {
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("cannot determine the class of `{0}`")]
    UntypedReceiver(String),
    #[error("unbound variable `{0}`")]
    UnboundVariable(String),
    #[error("operator `{operator}` cannot be applied to {left} and {right}")]
    IncompatibleOperands {
        operator: String,
        left: ExpressionType,
        right: ExpressionType,
    },
    #[error("expression cannot be assigned to: {0}")]
    NotAssignable(String),
    #[error("condition has type {0}, expected boolean")]
    NonBooleanCondition(ExpressionType),
    #[error("unsupported expression: {0}")]
    Unsupported(String),
}

pub struct AnalysisInfo {
    pub analysis_time: Duration,
}

impl fmt::Debug for AnalysisInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnalysisInfo {{ {:?} }}", self.analysis_time)
    }
}
