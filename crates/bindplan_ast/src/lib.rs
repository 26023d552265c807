//! Front-end input model for bindplan.
//!
//! This crate provides:
//! - [`Declaration`] - One declaration as reported by the C++ front end
//! - [`DeclKind`] - Kind-specific payload (bases, signatures, template arguments)
//! - [`TranslationUnit`] - A validated, pre-ordered set of declarations
//! - [`TranslationUnitBuilder`] - Programmatic construction for tests and fixtures

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod builder;
pub mod decl;
pub mod unit;

pub use builder::TranslationUnitBuilder;
pub use decl::{
    Access, BaseSpec, DeclId, DeclKind, Declaration, InstantiationOrigin, Param, Signature,
    TemplateArgument, TemplateInfo,
};
pub use unit::TranslationUnit;
