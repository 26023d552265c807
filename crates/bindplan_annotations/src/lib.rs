//! Annotation payload lexer, parser, and typed directive schema for bindplan.
//!
//! This crate provides:
//! - [`Lexer`] - Tokenization of annotation text such as `visible, expose_as("x")`
//! - [`parse_annotation`] - Parsing tokens into [`RawDirective`]s
//! - [`RawPayload`] - Text or string-keyed map payloads as delivered by the front end
//! - [`Directive`] - Validated, typed directives
//! - [`Annotation`] - The per-declaration directive set, with unset distinct from false

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod annotation;
pub mod directive;
pub mod lexer;
pub mod literal;
pub mod parser;
pub mod payload;
pub mod token;


pub use annotation::{Annotation, ExposeHere, InstantiationSelection, ManualPlacement};
pub use directive::{
    ArgRef, ArgSelection, BaseSelection, DeclTarget, Directive, DirectiveKind, ReturnValuePolicy,
};
pub use lexer::Lexer;
pub use literal::Literal;
pub use parser::{Parser, RawDirective, parse_annotation};
pub use payload::RawPayload;
pub use token::{Token, TokenKind};
