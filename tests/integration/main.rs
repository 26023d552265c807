//! Cross-layer integration tests for bindplan
//!
//! Tests that run annotated translation units through the whole pipeline.

mod determinism;
mod end_to_end;
mod fixtures;
