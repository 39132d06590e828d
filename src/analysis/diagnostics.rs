use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Define the cause of a diagnostic message
/// Used to provide user options to suppress some specific kinds of warnings
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticCause {
    LoopIterationCap,  // A loop fixed point did not stabilize in time
    CallDepthCap,      // Call inlining went too deep, including recursion
    ExpressionSizeCap, // A tree grew too large and was replaced by its interval
    ForkCap,           // Too many live forks, they were merged
    UnresolvedCall,    // Dispatch could not be resolved or the callee is unknown
    AmbiguousAliasing, // A callee summary could not be specialized to the caller's aliasing
    DivZero,           // Division by zero / remainder by zero
    Other,             // Other
}

impl DiagnosticCause {
    /// The short name used in rendered results.
    pub fn name(self) -> &'static str {
        match self {
            DiagnosticCause::LoopIterationCap => "loop-iteration-cap",
            DiagnosticCause::CallDepthCap => "call-depth-cap",
            DiagnosticCause::ExpressionSizeCap => "expression-size-cap",
            DiagnosticCause::ForkCap => "fork-cap",
            DiagnosticCause::UnresolvedCall => "unresolved-call",
            DiagnosticCause::AmbiguousAliasing => "ambiguous-aliasing",
            DiagnosticCause::DivZero => "division-by-zero",
            DiagnosticCause::Other => "other",
        }
    }
}

/// A recoverable event of an analysis: the analysis went on with a sound fallback.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Diagnostic {
    pub cause: DiagnosticCause,
    pub message: String,
}

impl Diagnostic {
    pub fn new(cause: DiagnosticCause, message: impl Into<String>) -> Self {
        Self {
            cause,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.cause.name(), self.message)
    }
}

/// Known reasons why an interval is wider than the set of values that can actually occur.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImprecisionReason {
    GapsFromMultiplication,
    GapsFromPowers,
    RequiresIdentifyingIdenticalExpressions,
    RequiresModulusReasoning,
}

impl ImprecisionReason {
    pub fn name(self) -> &'static str {
        match self {
            ImprecisionReason::GapsFromMultiplication => "gaps-from-multiplication",
            ImprecisionReason::GapsFromPowers => "gaps-from-powers",
            ImprecisionReason::RequiresIdentifyingIdenticalExpressions => {
                "requires-identifying-identical-expressions"
            }
            ImprecisionReason::RequiresModulusReasoning => "requires-modulus-reasoning",
        }
    }
}

/// Store all the diagnoses generated for each analyzed method
#[derive(Default)]
pub struct DiagnosticsForMethod {
    pub map: HashMap<Rc<String>, Vec<Diagnostic>>,
}

impl DiagnosticsForMethod {
    pub fn insert(&mut self, key: Rc<String>, diags: Vec<Diagnostic>) {
        self.map.insert(key, diags);
    }

    pub fn get(&self, key: &str) -> Option<&Vec<Diagnostic>> {
        self.map.get(&Rc::new(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let diag = Diagnostic::new(DiagnosticCause::ForkCap, "merged 70 forks");
        assert_eq!(diag.to_string(), "[fork-cap] merged 70 forks");
    }
}
