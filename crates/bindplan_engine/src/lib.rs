//! Exposure resolution and registration scheduling for bindplan.
//!
//! This crate turns an annotated [`TranslationUnit`](bindplan_ast::TranslationUnit)
//! into an ordered stream of [`EmissionRecord`]s. The stages run strictly in
//! sequence, each consuming the completed output of the previous one:
//!
//! 1. [`AnnotationTable`] - parse and validate every annotation payload
//! 2. [`ExposureGraph`] - merge redeclarations, apply `expose_here` relocations
//! 3. [`Visibility`] - pre-order exposure decisions and pruning
//! 4. [`Instantiations`] - canonical names for template instantiations
//! 5. [`Flattening`] - hide/inline base-class resolution
//! 6. [`PropertyTable`] and [`OperatorTable`] - accessor pairing and operator slots
//! 7. [`Schedule`] - dependency-ordered emission units and items
//! 8. [`synthesize`] - descriptor records for the emitter
//!
//! [`Generator`] runs the whole pipeline.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod annotate;
pub mod config;
pub mod descriptor;
pub mod flatten;
pub mod graph;
pub mod inspect;
pub mod operators;
pub mod pipeline;
pub mod properties;
pub mod schedule;
pub mod synthesize;
pub mod templates;
pub mod visibility;

pub use annotate::AnnotationTable;
pub use config::GeneratorConfig;
pub use descriptor::{
    AliasDescriptor, ConstructorOverload, ConstructorSet, ContextClose, ContextDescriptor,
    ContextKind, EmissionRecord, EnumDescriptor, EnumeratorDescriptor, FieldDescriptor,
    FunctionDescriptor, KeepAlive, ManualBlockDescriptor, OperatorDescriptor, ParamDescriptor,
    PropertyDescriptor, ReturnDescriptor,
};
pub use flatten::{BaseMode, BaseSpecifier, FlattenedClass, Flattening, MemberRef};
pub use graph::{ExposureGraph, Node, NodeId};
pub use inspect::{DumpStage, dump_graph};
pub use operators::{OperatorSlot, OperatorTable};
pub use pipeline::{Analysis, Generation, Generator};
pub use properties::{Property, PropertyTable};
pub use schedule::{Inputs, Item, Schedule, ScheduledUnit, UnitId, topological_order};
pub use synthesize::synthesize;
pub use templates::{InstantiationRecord, Instantiations, RequestOrigin, TemplateInstantiationKey};
pub use visibility::{ExposureDecision, Visibility};
