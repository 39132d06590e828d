use crate::analysis::abstract_domain::ExitState;
use crate::analysis::diagnostics::{Diagnostic, DiagnosticsForMethod};
use crate::analysis::memory::heap::AliasPartition;
use crate::analysis::memory::known_names::KnownNamesCache;
use crate::analysis::memory::path::Path;
use crate::analysis::option::AnalysisOption;
use crate::ast::{MethodDecl, Program};
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

/// What a call to a method under one aliasing of its inputs may do.
#[derive(Clone, Debug)]
pub struct MethodSummary {
    pub method: Rc<MethodDecl>,
    pub partition: Rc<AliasPartition>,
    pub exits: Vec<ExitState>,
    /// Fresh, loop and havoc ordinals used by the body, callers shift theirs past these.
    pub ordinal_count: usize,
    pub heap_block_count: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Input objects the method or its callees read or wrote.
    pub touched: BTreeSet<Rc<Path>>,
}

type SummaryKey = (Rc<String>, Vec<(Rc<Path>, Rc<Path>)>);

/// Cache the summaries so we do not need to recompute them when a method is called several times
#[derive(Default)]
pub struct SummaryCache {
    value: HashMap<SummaryKey, Rc<MethodSummary>>,
}

impl SummaryCache {
    pub fn get(&self, method_key: &Rc<String>, partition: &AliasPartition) -> Option<Rc<MethodSummary>> {
        self.value
            .get(&(method_key.clone(), partition.key()))
            .cloned()
    }

    pub fn insert(&mut self, summary: Rc<MethodSummary>) {
        let key = (summary.method.key.clone(), summary.partition.key());
        self.value.insert(key, summary);
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Stores the global information of the analysis
pub struct GlobalContext {
    /// Every class and method that calls may reach
    pub program: Rc<Program>,

    /// Customized options that may change the behavior of the analysis
    pub analysis_options: AnalysisOption,

    /// Summaries of methods that were already analyzed, keyed by method and aliasing
    pub summary_cache: SummaryCache,

    /// Generated diagnostic messages for each analyzed method
    pub diagnostics_for: DiagnosticsForMethod,

    /// Cache for the library methods that are expanded in place
    pub known_names_cache: KnownNamesCache,
}

impl fmt::Debug for GlobalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalContext")
    }
}

impl GlobalContext {
    pub fn new(program: Program, analysis_options: AnalysisOption) -> Self {
        info!(
            "Initializing GlobalContext with {} classes and {} methods",
            program.classes.len(),
            program.methods.len()
        );
        debug!("Options: {:?}", analysis_options);
        Self {
            program: Rc::new(program),
            analysis_options,
            summary_cache: SummaryCache::default(),
            diagnostics_for: DiagnosticsForMethod::default(),
            known_names_cache: KnownNamesCache::default(),
        }
    }
}
