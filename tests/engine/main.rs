//! Integration tests for Layer 3: Engine
//!
//! Tests visibility, flattening, template instantiations, and scheduling
//! through the public pipeline.

mod flattening;
mod scheduling;
mod templates;
mod visibility;
