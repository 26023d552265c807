//! Descriptor synthesis: the scheduled items become emission records.
//!
//! Every opened context gets a unique identifier that later records use as
//! their registration scope. Transparent namespaces open nothing; their
//! members register into the nearest enclosing scope that does.

use std::collections::BTreeMap;

use bindplan_annotations::{Annotation, ArgRef, ArgSelection};
use bindplan_ast::{DeclKind, Signature};
use bindplan_foundation::{IdentifierDiscriminator, make_valid_identifier};

use crate::config::GeneratorConfig;
use crate::descriptor::{
    AliasDescriptor, ConstructorOverload, ConstructorSet, ContextClose, ContextDescriptor,
    ContextKind, EmissionRecord, EnumDescriptor, EnumeratorDescriptor, FieldDescriptor,
    FunctionDescriptor, KeepAlive, ManualBlockDescriptor, OperatorDescriptor, ParamDescriptor,
    PropertyDescriptor, ReturnDescriptor,
};
use crate::flatten::MemberRef;
use crate::graph::{Node, NodeId};
use crate::schedule::{Inputs, Item, Schedule, UnitId};
use crate::templates::callable_annotation;

const ROOT_IDENTIFIER: &str = "root";

/// Produces the record stream for a schedule.
#[must_use]
pub fn synthesize(
    inputs: &Inputs<'_>,
    schedule: &Schedule,
    config: &GeneratorConfig,
) -> Vec<EmissionRecord> {
    let mut discriminator = IdentifierDiscriminator::new();
    discriminator.reserve(ROOT_IDENTIFIER);
    let mut synthesizer = Synthesizer {
        inputs,
        config,
        identifiers: BTreeMap::new(),
        discriminator,
        records: Vec::new(),
    };
    for unit in &schedule.units {
        match unit.id {
            UnitId::Early | UnitId::Postamble => {
                synthesizer.items(ROOT_IDENTIFIER, NodeId::ROOT, &unit.items);
            }
            UnitId::Context(id) => synthesizer.context(id, &unit.items),
            UnitId::Alias(id) => {
                if let Some(target) = schedule.alias_targets.get(&id) {
                    synthesizer.alias(id, *target);
                }
            }
        }
    }
    log::debug!("synthesized {} records", synthesizer.records.len());
    synthesizer.records
}

struct Synthesizer<'a> {
    inputs: &'a Inputs<'a>,
    config: &'a GeneratorConfig,
    identifiers: BTreeMap<NodeId, String>,
    discriminator: IdentifierDiscriminator,
    records: Vec<EmissionRecord>,
}

impl Synthesizer<'_> {
    fn node(&self, id: NodeId) -> &Node {
        self.inputs.graph.node(id)
    }

    fn exposed_name(&self, id: NodeId) -> String {
        self.inputs.visibility.exposed_name(id).to_string()
    }

    fn doc(&self, node: &Node) -> Option<String> {
        (self.config.emit_docs && !node.docs.is_empty()).then(|| node.docs.join("\n"))
    }

    /// Identifier of the nearest opened ancestor.
    fn scope_of(&self, id: NodeId) -> String {
        self.inputs
            .graph
            .ancestors(id)
            .find_map(|a| self.identifiers.get(&a).cloned())
            .unwrap_or_else(|| ROOT_IDENTIFIER.to_string())
    }

    fn identifier_for(&mut self, id: NodeId) -> String {
        let identifier = if id == NodeId::ROOT {
            ROOT_IDENTIFIER.to_string()
        } else {
            let spelling = format!("::{}", self.node(id).qualified_name);
            self.discriminator
                .discriminate(&format!("context{}", make_valid_identifier(&spelling)))
        };
        self.identifiers.insert(id, identifier.clone());
        identifier
    }

    // =========================================================================
    // Contexts
    // =========================================================================

    fn context(&mut self, id: NodeId, items: &[Item]) {
        let node = self.node(id);
        let kind = match node.kind {
            DeclKind::TranslationUnit => ContextKind::Root,
            DeclKind::Namespace { .. } if node.is_module() => ContextKind::Module,
            DeclKind::Class { .. } => ContextKind::Class {
                bases: self
                    .inputs
                    .flattening
                    .registered_bases(id)
                    .iter()
                    .filter_map(|b| self.identifiers.get(b).cloned())
                    .collect(),
                holder_type: node.annotation.holder_type.clone(),
                dynamic_attr: node.annotation.dynamic_attr.unwrap_or(false),
            },
            DeclKind::Enum { scoped } => {
                self.enumeration(id, scoped, items);
                return;
            }
            _ => {
                // Transparent namespace.
                let scope = self.scope_of(id);
                self.items(&scope, id, items);
                return;
            }
        };

        let scope = (id != NodeId::ROOT).then(|| self.scope_of(id));
        let identifier = self.identifier_for(id);
        let node = self.node(id);
        self.records.push(EmissionRecord::ContextOpen(ContextDescriptor {
            identifier: identifier.clone(),
            scope,
            qualified_name: node.qualified_name.clone(),
            exposed_name: self.exposed_name(id),
            context: kind,
            doc: self.doc(node),
        }));
        self.items(&identifier, id, items);
        self.records.push(EmissionRecord::ContextClose(ContextClose {
            identifier,
            export_values: false,
        }));
    }

    fn enumeration(&mut self, id: NodeId, scoped: bool, items: &[Item]) {
        let scope = self.scope_of(id);
        let identifier = self.identifier_for(id);
        let node = self.node(id);
        let export_values = node.annotation.export_values.unwrap_or(!scoped);
        self.records.push(EmissionRecord::Enum(EnumDescriptor {
            identifier: identifier.clone(),
            scope,
            qualified_name: node.qualified_name.clone(),
            exposed_name: self.exposed_name(id),
            scoped,
            arithmetic: node.annotation.arithmetic.unwrap_or(false),
            export_values,
            doc: self.doc(node),
        }));
        self.items(&identifier, id, items);
        self.records.push(EmissionRecord::ContextClose(ContextClose {
            identifier,
            export_values,
        }));
    }

    fn alias(&mut self, id: NodeId, target: NodeId) {
        self.records.push(EmissionRecord::Alias(AliasDescriptor {
            scope: self.scope_of(id),
            name: self.exposed_name(id),
            qualified_name: self.node(id).qualified_name.clone(),
            target: self.identifiers.get(&target).cloned(),
            target_qualified_name: self.node(target).qualified_name.clone(),
        }));
    }

    // =========================================================================
    // Items
    // =========================================================================

    fn items(&mut self, scope: &str, context: NodeId, items: &[Item]) {
        for item in items {
            let record = match item {
                Item::Member(member) => self.member(scope, context, *member),
                Item::Constructors(ids) => Some(self.constructors(scope, ids)),
                Item::Property(name) => self.property(scope, context, name),
                Item::Manual(id) => match &self.node(*id).kind {
                    DeclKind::ManualBlock { body } => {
                        Some(EmissionRecord::ManualBlock(ManualBlockDescriptor {
                            scope: scope.to_string(),
                            body: body.clone(),
                        }))
                    }
                    _ => None,
                },
            };
            self.records.extend(record);
        }
    }

    fn member(&self, scope: &str, context: NodeId, member: MemberRef) -> Option<EmissionRecord> {
        let node = self.node(member.node);
        let in_class = matches!(self.node(context).kind, DeclKind::Class { .. });
        match &node.kind {
            DeclKind::Method { .. } => self.function(scope, member).map(EmissionRecord::Method),
            DeclKind::Function { .. } => self.function(scope, member).map(EmissionRecord::Function),
            DeclKind::Operator { .. } | DeclKind::ConversionFunction { .. } => {
                let mut function = self.function(scope, member)?;
                match self.inputs.operators.slot(member.node) {
                    Some(slot) => {
                        function.name = slot.name.to_string();
                        Some(EmissionRecord::Operator(OperatorDescriptor {
                            slot: slot.name.to_string(),
                            reflected: slot.reflected,
                            function,
                        }))
                    }
                    None if in_class => Some(EmissionRecord::Method(function)),
                    None => Some(EmissionRecord::Function(function)),
                }
            }
            DeclKind::Field {
                ty,
                is_const,
                is_static,
            } => Some(EmissionRecord::Field(FieldDescriptor {
                scope: scope.to_string(),
                name: self.exposed_name(member.node),
                qualified_name: node.qualified_name.clone(),
                ty: ty.clone(),
                readonly: *is_const || node.annotation.readonly == Some(true),
                is_static: *is_static,
                doc: self.doc(node),
                inlined_from: self.inlined_from(member),
            })),
            DeclKind::Variable { ty, is_const } => {
                Some(EmissionRecord::Variable(FieldDescriptor {
                    scope: scope.to_string(),
                    name: self.exposed_name(member.node),
                    qualified_name: node.qualified_name.clone(),
                    ty: ty.clone(),
                    readonly: *is_const || node.annotation.readonly == Some(true),
                    is_static: true,
                    doc: self.doc(node),
                    inlined_from: None,
                }))
            }
            DeclKind::Enumerator { value } => {
                Some(EmissionRecord::Enumerator(EnumeratorDescriptor {
                    scope: scope.to_string(),
                    name: self.exposed_name(member.node),
                    qualified_name: node.qualified_name.clone(),
                    value: value.clone(),
                    doc: self.doc(node),
                }))
            }
            _ => None,
        }
    }

    fn inlined_from(&self, member: MemberRef) -> Option<String> {
        member
            .inlined_from
            .map(|class| self.node(class).qualified_name.clone())
    }

    fn function(&self, scope: &str, member: MemberRef) -> Option<FunctionDescriptor> {
        let node = self.node(member.node);
        let signature = node.kind.signature()?;
        if signature.is_deleted {
            return None;
        }
        let annotation = callable_annotation(self.inputs.graph, node);
        let has_this = node.kind.has_this();
        let (is_static, is_const) = match node.kind {
            DeclKind::Method {
                is_static,
                is_const,
                ..
            } => (is_static, is_const),
            _ => (false, false),
        };
        Some(FunctionDescriptor {
            scope: scope.to_string(),
            name: self.exposed_name(member.node),
            qualified_name: node.qualified_name.clone(),
            params: params(signature, annotation, has_this),
            returns: ReturnDescriptor {
                ty: signature.return_type.clone(),
                policy: annotation.return_value_policy.unwrap_or_default(),
            },
            keep_alive: keep_alive(signature, annotation, has_this),
            is_static,
            is_const,
            doc: self.doc(node),
            inlined_from: self.inlined_from(member),
        })
    }

    fn constructors(&self, scope: &str, ids: &[NodeId]) -> EmissionRecord {
        let overloads = ids
            .iter()
            .filter_map(|id| {
                let node = self.node(*id);
                let DeclKind::Constructor {
                    signature,
                    is_inherited,
                } = &node.kind
                else {
                    return None;
                };
                if signature.is_deleted {
                    return None;
                }
                Some(ConstructorOverload {
                    qualified_name: node.qualified_name.clone(),
                    params: params(signature, &node.annotation, true),
                    keep_alive: keep_alive(signature, &node.annotation, true),
                    implicit_conversion: node.annotation.implicit_conversion == Some(true),
                    inherited: *is_inherited,
                    doc: self.doc(node),
                })
            })
            .collect();
        EmissionRecord::Constructors(ConstructorSet {
            scope: scope.to_string(),
            overloads,
        })
    }

    fn property(&self, scope: &str, class: NodeId, name: &str) -> Option<EmissionRecord> {
        let property = self
            .inputs
            .properties
            .for_class(class)
            .iter()
            .find(|p| p.name == name)?;
        let getter = self.node(property.getter);
        Some(EmissionRecord::Property(PropertyDescriptor {
            scope: scope.to_string(),
            name: property.name.clone(),
            getter: getter.qualified_name.clone(),
            setter: property
                .setter
                .map(|s| self.node(s).qualified_name.clone()),
            doc: self.doc(getter),
        }))
    }
}

// =============================================================================
// Parameters
// =============================================================================

fn selects(refs: &[ArgRef], names: &[&str], has_this: bool, index: u32) -> bool {
    refs.iter()
        .any(|r| r.resolve(names, has_this) == Some(index))
}

fn params(signature: &Signature, annotation: &Annotation, has_this: bool) -> Vec<ParamDescriptor> {
    let names = signature.param_names();
    let offset = 1 + u32::from(has_this);
    signature
        .params
        .iter()
        .zip(offset..)
        .map(|(param, index)| ParamDescriptor {
            name: param.name.clone(),
            ty: param.ty.clone(),
            has_default: param.default.is_some(),
            default: param.default.clone(),
            convert: match &annotation.noconvert {
                None => true,
                Some(ArgSelection::All) => false,
                Some(ArgSelection::Only(refs)) => !selects(refs, &names, has_this, index),
            },
            required: selects(&annotation.required, &names, has_this, index),
        })
        .collect()
}

/// References were checked against the signature before scheduling.
fn keep_alive(signature: &Signature, annotation: &Annotation, has_this: bool) -> Vec<KeepAlive> {
    let names = signature.param_names();
    annotation
        .keep_alive
        .iter()
        .filter_map(|(nurse, patient)| {
            Some(KeepAlive {
                nurse: nurse.resolve(&names, has_this)?,
                patient: patient.resolve(&names, has_this)?,
            })
        })
        .collect()
}
