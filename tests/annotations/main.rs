//! Integration tests for Layer 1: Annotations
//!
//! Tests payload parsing and directive validation through the public API.

mod payloads;
mod schema;
