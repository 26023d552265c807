//! Errors, diagnostics, source locations, and identifier rules for bindplan.
//!
//! This crate provides:
//! - [`Error`] - Fatal errors with a stable category and declaration context
//! - [`Diagnostic`] - Warnings and errors as reported to the caller
//! - [`Location`] - Source positions of declarations
//! - [`make_valid_identifier`] - Spelling normalization for exposed names

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod diagnostics;
pub mod error;
pub mod identifier;
pub mod location;

pub use diagnostics::{Diagnostic, Diagnostics, Failure, Severity};
pub use error::{Error, ErrorContext, ErrorKind, Note, Result};
pub use identifier::{
    IdentifierDiscriminator, is_valid_identifier, make_valid_identifier, qualified_name_matches,
};
pub use location::Location;
