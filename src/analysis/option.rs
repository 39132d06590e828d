use crate::analysis::diagnostics::DiagnosticCause;
use log::warn;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AnalysisOption {
    /// Loop fixed point iterations before unstable bounds jump to the type bounds.
    pub widening_delay: u32,
    /// Rounds of narrowing, for loop head bounds after widening and for inputs under a condition.
    pub narrowing_iteration: u32,
    /// Loop fixed point iterations before giving up with the full domain.
    pub max_loop_iterations: u32,
    /// Nested call resolutions before a call takes the unknown fallback.
    pub max_call_depth: usize,
    /// Largest tree kept symbolically, larger ones are replaced by their interval.
    pub max_expression_size: u64,
    /// Live forks tolerated after a branch before they are merged.
    pub max_forks: usize,
    /// Re-analyses of one callee under refined aliasing per call site.
    pub max_alias_refinements: usize,
    pub suppressed_warnings: Option<Vec<DiagnosticCause>>,
}

impl Default for AnalysisOption {
    fn default() -> Self {
        Self {
            widening_delay: 5,
            narrowing_iteration: 5,
            max_loop_iterations: 50,
            max_call_depth: 8,
            max_expression_size: 4000,
            max_forks: 64,
            max_alias_refinements: 2,
            suppressed_warnings: None,
        }
    }
}

impl AnalysisOption {
    /// Picks the options this crate understands out of `args` and removes them,
    /// leaving everything else in place.
    pub fn from_args(args: &mut Vec<String>) -> Self {
        let mut indeices_to_remove = vec![];
        let mut res = Self::default();
        for (i, arg) in args.iter().enumerate() {
            if !arg.starts_with("--") {
                continue;
            }
            let value = args.get(i + 1);
            let known = match &arg[2..] {
                "widening_delay" => {
                    Self::parse_into(value, &mut res.widening_delay, "widening delay");
                    true
                }
                "narrowing_iteration" => {
                    Self::parse_into(value, &mut res.narrowing_iteration, "narrowing iteration");
                    true
                }
                "max_loop_iterations" => {
                    Self::parse_into(value, &mut res.max_loop_iterations, "loop iteration cap");
                    true
                }
                "max_call_depth" => {
                    Self::parse_into(value, &mut res.max_call_depth, "call depth cap");
                    true
                }
                "max_expression_size" => {
                    Self::parse_into(value, &mut res.max_expression_size, "expression size cap");
                    true
                }
                "max_forks" => {
                    Self::parse_into(value, &mut res.max_forks, "fork cap");
                    true
                }
                "max_alias_refinements" => {
                    Self::parse_into(
                        value,
                        &mut res.max_alias_refinements,
                        "alias refinement cap",
                    );
                    true
                }
                "suppress_warnings" => {
                    if let Some(suppressed_warnings) =
                        value.and_then(|v| Self::get_suppressed_warnings(v))
                    {
                        res.suppressed_warnings = Some(suppressed_warnings);
                    } else {
                        warn!("Invalid suppressed warning types, will not suppress any warnings by default");
                    }
                    true
                }
                _ => false,
            };
            if known {
                indeices_to_remove.push(i);
                if value.is_some() {
                    indeices_to_remove.push(i + 1);
                }
            }
        }
        indeices_to_remove.reverse();
        for i in indeices_to_remove {
            args.remove(i);
        }
        res
    }

    /// True if diagnostics with this cause should not be reported.
    pub fn is_suppressed(&self, cause: DiagnosticCause) -> bool {
        self.suppressed_warnings
            .as_ref()
            .map_or(false, |causes| causes.contains(&cause))
    }

    fn parse_into<T: FromStr + std::fmt::Display>(value: Option<&String>, field: &mut T, what: &str) {
        match value.map(|v| v.parse::<T>()) {
            Some(Ok(parsed)) => *field = parsed,
            _ => warn!("Invalid {}, use {} as default", what, field),
        }
    }

    fn get_suppressed_warnings(arg: &str) -> Option<Vec<DiagnosticCause>> {
        let mut res = Vec::new();
        for ch in arg.chars() {
            match ch {
                'l' => res.push(DiagnosticCause::LoopIterationCap),
                'c' => res.push(DiagnosticCause::CallDepthCap),
                's' => res.push(DiagnosticCause::ExpressionSizeCap),
                'f' => res.push(DiagnosticCause::ForkCap),
                'u' => res.push(DiagnosticCause::UnresolvedCall),
                'a' => res.push(DiagnosticCause::AmbiguousAliasing),
                'd' => res.push(DiagnosticCause::DivZero), // Division by zero / remainder by zero
                _ => return None,                          // Invalid flags
            }
        }
        if res.is_empty() {
            None
        } else {
            Some(res)
        }
    }
}
