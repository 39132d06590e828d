use crate::analysis::analysis_result::{AnalysisInfo, Result};
use crate::analysis::analyzer::range_analysis::MethodAnalysis;
use crate::analysis::global_context::GlobalContext;

/// General trait for static analysis
/// Developers may reuse this trait to implement their own analysis
pub trait StaticAnalysis<'a> {
    fn new(context: &'a mut GlobalContext) -> Self;
    /// Analyzes every method of the program and emits the diagnostics
    fn run(&mut self) -> Result<AnalysisInfo>;
    fn analyze_method(&mut self, method_key: &str) -> Result<MethodAnalysis>;
    fn emit_diagnostics(&mut self);
}
