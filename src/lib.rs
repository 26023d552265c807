//! bindplan - annotation-driven binding planner for C++ libraries
//!
//! This crate re-exports every layer of the bindplan system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 3: bindplan_engine       - Exposure graph, visibility, flattening, scheduling
//! Layer 2: bindplan_ast          - Front-end input model, JSON loading
//! Layer 1: bindplan_annotations  - Annotation lexer, parser, directive schema
//! Layer 0: bindplan_foundation   - Errors, diagnostics, locations, identifiers
//! ```
//!
//! The `bindplan` binary lives in `bindplan_cli`.

pub use bindplan_annotations as annotations;
pub use bindplan_ast as ast;
pub use bindplan_engine as engine;
pub use bindplan_foundation as foundation;
