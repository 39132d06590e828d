#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate log;

// The program representation handed over by the front-end
pub mod ast;

// Modules for static analyses
pub mod analysis {
    // For error handling
    pub mod analysis_result;
    // The global state of the whole analysis process
    pub mod global_context;
    // Abstract domain
    pub mod abstract_domain;
    // Interval domain, range evaluation and branch narrowing
    pub mod numerical {
        pub mod constraint_solver;
        pub mod evaluator;
        pub mod interval;
        pub mod lattice;
        pub mod linear_constraint;
    }
    // Memory model
    pub mod memory {
        pub mod constant_value;
        pub mod expression;
        pub mod heap;
        pub mod known_names;
        pub mod path;
        pub mod symbolic_domain;
        pub mod symbolic_value;
    }
    // Abstractly executes method bodies
    pub mod ast_visitor {
        pub mod block_visitor;
        pub mod body_visitor;
        pub mod call_visitor;
        pub mod loop_visitor;
    }
    // Different kinds of analyses
    pub mod analyzer {
        pub mod analysis_trait;
        pub mod range_analysis;
    }
    // Analysis options
    pub mod option;
    // The structure and helper functions for emitting diagnostics
    pub mod diagnostics;
}
