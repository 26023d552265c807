//! Emission records consumed by the code emitter.
//!
//! Each record maps to one fixed call pattern of the binding runtime.
//! Records refer to registration scopes by identifier: `root` for the
//! translation unit, and a unique `context_*` identifier for every other
//! opened context.

use bindplan_annotations::ReturnValuePolicy;
use serde::{Deserialize, Serialize};

/// One entry of the ordered output stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum EmissionRecord {
    /// Opens the root, a module namespace, or a class.
    ContextOpen(ContextDescriptor),
    /// Opens an enum.
    Enum(EnumDescriptor),
    /// Ends the own items of a context; later records may still use it as
    /// their scope.
    ContextClose(ContextClose),
    /// Every constructor of a class.
    Constructors(ConstructorSet),
    /// A member function.
    Method(FunctionDescriptor),
    /// A namespace-scope function.
    Function(FunctionDescriptor),
    /// An operator bound to a runtime slot.
    Operator(OperatorDescriptor),
    /// A data member.
    Field(FieldDescriptor),
    /// A namespace-scope variable.
    Variable(FieldDescriptor),
    /// A getter/setter pair.
    Property(PropertyDescriptor),
    /// One enumerator.
    Enumerator(EnumeratorDescriptor),
    /// A second name for a registered class or enum.
    Alias(AliasDescriptor),
    /// Verbatim code.
    ManualBlock(ManualBlockDescriptor),
}

impl EmissionRecord {
    /// Returns the record kind as serialized.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ContextOpen(_) => "context-open",
            Self::Enum(_) => "enum",
            Self::ContextClose(_) => "context-close",
            Self::Constructors(_) => "constructors",
            Self::Method(_) => "method",
            Self::Function(_) => "function",
            Self::Operator(_) => "operator",
            Self::Field(_) => "field",
            Self::Variable(_) => "variable",
            Self::Property(_) => "property",
            Self::Enumerator(_) => "enumerator",
            Self::Alias(_) => "alias",
            Self::ManualBlock(_) => "manual-block",
        }
    }

    /// Returns the registration scope of the record, if it has one.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        match self {
            Self::ContextOpen(c) => c.scope.as_deref(),
            Self::Enum(e) => Some(&e.scope),
            Self::ContextClose(c) => Some(&c.identifier),
            Self::Constructors(c) => Some(&c.scope),
            Self::Method(f) | Self::Function(f) => Some(&f.scope),
            Self::Operator(o) => Some(&o.function.scope),
            Self::Field(f) | Self::Variable(f) => Some(&f.scope),
            Self::Property(p) => Some(&p.scope),
            Self::Enumerator(e) => Some(&e.scope),
            Self::Alias(a) => Some(&a.scope),
            Self::ManualBlock(m) => Some(&m.scope),
        }
    }

    /// Returns the exposed name of the record, if it has one.
    #[must_use]
    pub fn exposed_name(&self) -> Option<&str> {
        match self {
            Self::ContextOpen(c) => Some(&c.exposed_name),
            Self::Enum(e) => Some(&e.exposed_name),
            Self::Method(f) | Self::Function(f) => Some(&f.name),
            Self::Operator(o) => Some(&o.slot),
            Self::Field(f) | Self::Variable(f) => Some(&f.name),
            Self::Property(p) => Some(&p.name),
            Self::Enumerator(e) => Some(&e.name),
            Self::Alias(a) => Some(&a.name),
            Self::Constructors(_) => Some("__init__"),
            Self::ContextClose(_) | Self::ManualBlock(_) => None,
        }
    }
}

// =============================================================================
// Contexts
// =============================================================================

/// What kind of scope a context opens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContextKind {
    /// The extension module itself.
    Root,
    /// A submodule.
    Module,
    /// A class.
    Class {
        /// Identifiers of the registered supertypes, in base-list order.
        bases: Vec<String>,
        /// Holder type spelling, if overridden.
        holder_type: Option<String>,
        /// Instances accept new attributes at run time.
        dynamic_attr: bool,
    },
}

/// A context-open record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDescriptor {
    /// Unique identifier of this context.
    pub identifier: String,
    /// Identifier of the enclosing registration scope; absent for the root.
    pub scope: Option<String>,
    /// C++ qualified name.
    pub qualified_name: String,
    /// Name in the host language.
    pub exposed_name: String,
    /// Scope flavour.
    pub context: ContextKind,
    /// Documentation.
    pub doc: Option<String>,
}

/// An enum-open record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDescriptor {
    /// Unique identifier of this enum.
    pub identifier: String,
    /// Identifier of the enclosing registration scope.
    pub scope: String,
    /// C++ qualified name.
    pub qualified_name: String,
    /// Name in the host language.
    pub exposed_name: String,
    /// `enum class`
    pub scoped: bool,
    /// Supports arithmetic on its values.
    pub arithmetic: bool,
    /// Enumerators are also exported into the enclosing scope.
    pub export_values: bool,
    /// Documentation.
    pub doc: Option<String>,
}

/// A context-close record.
///
/// A close ends the context's own items, not its lifetime as a scope. Nested
/// contexts, and the members of transparent namespaces inside it, are
/// emitted after the close and still name its identifier as their `scope`,
/// so records do not nest between an open and its close.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextClose {
    /// Identifier of the closed context.
    pub identifier: String,
    /// Export enumerators into the enclosing scope (enums only).
    pub export_values: bool,
}

// =============================================================================
// Callables
// =============================================================================

/// One parameter of a callable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    /// Parameter name; may be empty.
    pub name: String,
    /// Type spelling.
    #[serde(rename = "type")]
    pub ty: String,
    /// The parameter has a default value.
    pub has_default: bool,
    /// Default value spelling.
    pub default: Option<String>,
    /// Implicit conversions are allowed.
    pub convert: bool,
    /// `None` is rejected.
    pub required: bool,
}

/// The returned value of a callable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnDescriptor {
    /// Type spelling.
    #[serde(rename = "type")]
    pub ty: String,
    /// Ownership policy.
    pub policy: ReturnValuePolicy,
}

/// Keeps `patient` alive at least as long as `nurse`.
///
/// Index 0 is the return value. For methods index 1 is `this` and
/// parameters follow; for free functions parameters start at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepAlive {
    /// Argument that holds the reference.
    pub nurse: u32,
    /// Argument kept alive.
    pub patient: u32,
}

/// A method or a free function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    /// Identifier of the registration scope.
    pub scope: String,
    /// Name in the host language.
    pub name: String,
    /// C++ qualified name.
    pub qualified_name: String,
    /// Parameters.
    pub params: Vec<ParamDescriptor>,
    /// Return value.
    pub returns: ReturnDescriptor,
    /// Lifetime couplings.
    pub keep_alive: Vec<KeepAlive>,
    /// `static` member function.
    pub is_static: bool,
    /// `const` member function.
    pub is_const: bool,
    /// Documentation.
    pub doc: Option<String>,
    /// Qualified name of the inlined base that declared this member.
    pub inlined_from: Option<String>,
}

/// An operator mapped to a runtime slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorDescriptor {
    /// Slot name such as `__add__`.
    pub slot: String,
    /// Operands are swapped.
    pub reflected: bool,
    /// The implementing function.
    pub function: FunctionDescriptor,
}

/// One constructor overload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorOverload {
    /// C++ qualified name.
    pub qualified_name: String,
    /// Parameters.
    pub params: Vec<ParamDescriptor>,
    /// Lifetime couplings.
    pub keep_alive: Vec<KeepAlive>,
    /// Register an implicit conversion from the single argument.
    pub implicit_conversion: bool,
    /// Introduced by `using Base::Base;`.
    pub inherited: bool,
    /// Documentation.
    pub doc: Option<String>,
}

/// Every constructor of a class, in source order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorSet {
    /// Identifier of the class.
    pub scope: String,
    /// Overloads; a parameter list that prefixes another is kept apart.
    pub overloads: Vec<ConstructorOverload>,
}

// =============================================================================
// Data
// =============================================================================

/// A field or a variable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Identifier of the registration scope.
    pub scope: String,
    /// Name in the host language.
    pub name: String,
    /// C++ qualified name.
    pub qualified_name: String,
    /// Type spelling.
    #[serde(rename = "type")]
    pub ty: String,
    /// Not writable from the host language.
    pub readonly: bool,
    /// `static` member or namespace-scope variable.
    pub is_static: bool,
    /// Documentation.
    pub doc: Option<String>,
    /// Qualified name of the inlined base that declared this member.
    pub inlined_from: Option<String>,
}

/// A property built from accessor methods.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Identifier of the class.
    pub scope: String,
    /// Property name.
    pub name: String,
    /// Qualified name of the getter.
    pub getter: String,
    /// Qualified name of the setter.
    pub setter: Option<String>,
    /// Documentation of the getter.
    pub doc: Option<String>,
}

/// One enumerator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumeratorDescriptor {
    /// Identifier of the enum.
    pub scope: String,
    /// Name in the host language.
    pub name: String,
    /// C++ qualified name.
    pub qualified_name: String,
    /// Value spelling, if known.
    pub value: Option<String>,
    /// Documentation.
    pub doc: Option<String>,
}

/// An additional name for a registered type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasDescriptor {
    /// Identifier of the registration scope.
    pub scope: String,
    /// Name in the host language.
    pub name: String,
    /// C++ qualified name of the alias.
    pub qualified_name: String,
    /// Identifier of the aliased context, when this run registers it.
    /// Otherwise the target is registered elsewhere and is found by type.
    pub target: Option<String>,
    /// C++ qualified name of the aliased type.
    pub target_qualified_name: String,
}

/// Code injected verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualBlockDescriptor {
    /// Identifier of the owning scope.
    pub scope: String,
    /// The code.
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_tagged_by_kind() {
        let record = EmissionRecord::ContextClose(ContextClose {
            identifier: "context_Color".into(),
            export_values: true,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "context-close");
        assert_eq!(json["identifier"], "context_Color");
        assert_eq!(record.kind(), "context-close");
    }

    #[test]
    fn class_context_nests_its_kind() {
        let record = EmissionRecord::ContextOpen(ContextDescriptor {
            identifier: "context_Derived".into(),
            scope: Some("root".into()),
            qualified_name: "Derived".into(),
            exposed_name: "Derived".into(),
            context: ContextKind::Class {
                bases: vec!["context_Base".into()],
                holder_type: None,
                dynamic_attr: false,
            },
            doc: None,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "context-open");
        assert_eq!(json["context"]["type"], "class");
        assert_eq!(json["context"]["bases"][0], "context_Base");
        let back: EmissionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn params_serialize_type_field() {
        let param = ParamDescriptor {
            name: "x".into(),
            ty: "int".into(),
            has_default: true,
            default: Some("0".into()),
            convert: false,
            required: false,
        };
        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(json["type"], "int");
        assert_eq!(json["convert"], false);
    }

    #[test]
    fn return_policy_is_snake_case() {
        let returns = ReturnDescriptor {
            ty: "Node&".into(),
            policy: ReturnValuePolicy::ReferenceInternal,
        };
        let json = serde_json::to_value(&returns).unwrap();
        assert_eq!(json["policy"], "reference_internal");
    }
}
