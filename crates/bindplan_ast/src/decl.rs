//! Declarations as reported by the front end.

use std::fmt;

use bindplan_annotations::{DeclTarget, RawPayload};
use bindplan_foundation::Location;
use serde::{Deserialize, Serialize};

// =============================================================================
// Identifiers and small enums
// =============================================================================

/// Identifier of a declaration within one translation unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeclId(pub u32);

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// C++ access specifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// `public` (also used for namespace-scope declarations)
    #[default]
    Public,
    /// `protected`
    Protected,
    /// `private`
    Private,
}

/// One entry of a class's base list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseSpec {
    /// Qualified name of the base class.
    pub qualified_name: String,
    /// Access of the inheritance.
    #[serde(default)]
    pub access: Access,
    /// `virtual` inheritance.
    #[serde(default)]
    pub is_virtual: bool,
}

impl BaseSpec {
    /// Creates a public, non-virtual base.
    #[must_use]
    pub fn public(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            access: Access::Public,
            is_virtual: false,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// A template argument as spelled by the front end.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateArgument {
    /// A type argument such as `int` or `ns::Thing`.
    Type(String),
    /// A non-type argument such as `123` or `true`.
    Value(String),
}

impl TemplateArgument {
    /// Returns the argument's spelling.
    #[must_use]
    pub fn spelling(&self) -> &str {
        match self {
            Self::Type(s) | Self::Value(s) => s,
        }
    }
}

/// How an instantiation came to exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstantiationOrigin {
    /// `template class X<Args>;` in the source.
    ExplicitInstantiation,
    /// Instantiated because it was used.
    #[default]
    Implicit,
}

/// Marks a class or function as a template instantiation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    /// Qualified name of the template.
    pub template: String,
    /// Template arguments in order.
    #[serde(default)]
    pub arguments: Vec<TemplateArgument>,
    /// Explicit or implicit instantiation.
    #[serde(default)]
    pub origin: InstantiationOrigin,
}

// =============================================================================
// Signatures
// =============================================================================

/// A function parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name; may be empty for unnamed parameters.
    #[serde(default)]
    pub name: String,
    /// Type spelling.
    #[serde(rename = "type")]
    pub ty: String,
    /// Default argument spelling.
    #[serde(default)]
    pub default: Option<String>,
}

/// A callable's parameters and return type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Parameters in order.
    #[serde(default)]
    pub params: Vec<Param>,
    /// Return type spelling.
    #[serde(default = "void")]
    pub return_type: String,
    /// `= delete`
    #[serde(default)]
    pub is_deleted: bool,
}

fn void() -> String {
    "void".to_string()
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            return_type: void(),
            is_deleted: false,
        }
    }
}

impl Signature {
    /// Creates a signature with the given return type and no parameters.
    #[must_use]
    pub fn returning(return_type: impl Into<String>) -> Self {
        Self {
            return_type: return_type.into(),
            ..Self::default()
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty: ty.into(),
            default: None,
        });
        self
    }

    /// Adds a parameter with a default argument.
    #[must_use]
    pub fn param_with_default(
        mut self,
        name: impl Into<String>,
        ty: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        self.params.push(Param {
            name: name.into(),
            ty: ty.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Marks the signature as deleted.
    #[must_use]
    pub fn deleted(mut self) -> Self {
        self.is_deleted = true;
        self
    }

    /// Returns the parameter names in order.
    #[must_use]
    pub fn param_names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    /// Key distinguishing overloads: parameter types joined.
    #[must_use]
    pub fn overload_key(&self) -> String {
        self.params
            .iter()
            .map(|p| p.ty.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

// =============================================================================
// Declarations
// =============================================================================

/// Kind-specific payload of a declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclKind {
    /// The translation unit root.
    TranslationUnit,
    /// A namespace.
    Namespace {
        /// `inline namespace`
        #[serde(default)]
        inline: bool,
    },
    /// A class or struct, possibly a template instantiation.
    Class {
        /// Direct bases in declaration order.
        #[serde(default)]
        bases: Vec<BaseSpec>,
        /// Set when this class instantiates a class template.
        #[serde(default)]
        template: Option<TemplateInfo>,
    },
    /// A class template.
    ClassTemplate,
    /// A function template.
    FunctionTemplate,
    /// An enum.
    Enum {
        /// `enum class`
        #[serde(default)]
        scoped: bool,
    },
    /// An enumerator.
    Enumerator {
        /// Value spelling, if known.
        #[serde(default)]
        value: Option<String>,
    },
    /// A free function, possibly a template instantiation.
    Function {
        /// Parameters and return type.
        #[serde(default)]
        signature: Signature,
        /// Set when this function instantiates a function template.
        #[serde(default)]
        template: Option<TemplateInfo>,
    },
    /// A member function.
    Method {
        /// Parameters and return type.
        #[serde(default)]
        signature: Signature,
        /// `static`
        #[serde(default)]
        is_static: bool,
        /// `const`-qualified
        #[serde(default)]
        is_const: bool,
    },
    /// A constructor.
    Constructor {
        /// Parameters.
        #[serde(default)]
        signature: Signature,
        /// Introduced by `using Base::Base;`
        #[serde(default)]
        is_inherited: bool,
    },
    /// A destructor.
    Destructor,
    /// A conversion function such as `operator bool()`.
    ConversionFunction {
        /// The return type is the conversion target.
        #[serde(default)]
        signature: Signature,
    },
    /// A member or free operator.
    Operator {
        /// Operator symbol such as `+`, `[]`, or `<<`.
        symbol: String,
        /// Parameters (excluding `this`) and return type.
        #[serde(default)]
        signature: Signature,
        /// Declared as a member function.
        #[serde(default)]
        is_member: bool,
    },
    /// A data member.
    Field {
        /// Type spelling.
        #[serde(rename = "type")]
        ty: String,
        /// `const`
        #[serde(default)]
        is_const: bool,
        /// `static`
        #[serde(default)]
        is_static: bool,
    },
    /// A namespace-scope variable.
    Variable {
        /// Type spelling.
        #[serde(rename = "type")]
        ty: String,
        /// `const` or `constexpr`
        #[serde(default)]
        is_const: bool,
    },
    /// A typedef or alias declaration.
    TypeAlias {
        /// Qualified name of the aliased declaration; absent if unresolved.
        #[serde(default)]
        target: Option<String>,
    },
    /// A manually injected code block.
    ManualBlock {
        /// Code to inject verbatim.
        body: String,
    },
}

impl DeclKind {
    /// Returns the annotation target of this kind.
    #[must_use]
    pub const fn target(&self) -> DeclTarget {
        match self {
            Self::TranslationUnit => DeclTarget::TranslationUnit,
            Self::Namespace { .. } => DeclTarget::Namespace,
            Self::Class { .. } => DeclTarget::Class,
            Self::ClassTemplate => DeclTarget::ClassTemplate,
            Self::FunctionTemplate => DeclTarget::FunctionTemplate,
            Self::Enum { .. } => DeclTarget::Enum,
            Self::Enumerator { .. } => DeclTarget::Enumerator,
            Self::Function { .. } => DeclTarget::Function,
            Self::Method { .. } => DeclTarget::Method,
            Self::Constructor { .. } => DeclTarget::Constructor,
            Self::Destructor => DeclTarget::Destructor,
            Self::ConversionFunction { .. } => DeclTarget::ConversionFunction,
            Self::Operator { .. } => DeclTarget::Operator,
            Self::Field { .. } => DeclTarget::Field,
            Self::Variable { .. } => DeclTarget::Variable,
            Self::TypeAlias { .. } => DeclTarget::TypeAlias,
            Self::ManualBlock { .. } => DeclTarget::ManualBlock,
        }
    }

    /// Returns a short lowercase name of the kind.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TranslationUnit => "translation_unit",
            Self::Namespace { .. } => "namespace",
            Self::Class { .. } => "class",
            Self::ClassTemplate => "class_template",
            Self::FunctionTemplate => "function_template",
            Self::Enum { .. } => "enum",
            Self::Enumerator { .. } => "enumerator",
            Self::Function { .. } => "function",
            Self::Method { .. } => "method",
            Self::Constructor { .. } => "constructor",
            Self::Destructor => "destructor",
            Self::ConversionFunction { .. } => "conversion_function",
            Self::Operator { .. } => "operator",
            Self::Field { .. } => "field",
            Self::Variable { .. } => "variable",
            Self::TypeAlias { .. } => "type_alias",
            Self::ManualBlock { .. } => "manual_block",
        }
    }

    /// Returns true for kinds that own nested declarations.
    #[must_use]
    pub const fn is_context(&self) -> bool {
        matches!(
            self,
            Self::TranslationUnit | Self::Namespace { .. } | Self::Class { .. } | Self::Enum { .. }
        )
    }

    /// Returns the signature of callables.
    #[must_use]
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::Function { signature, .. }
            | Self::Method { signature, .. }
            | Self::Constructor { signature, .. }
            | Self::ConversionFunction { signature }
            | Self::Operator { signature, .. } => Some(signature),
            _ => None,
        }
    }

    /// Returns template instantiation information of classes and functions.
    #[must_use]
    pub fn template(&self) -> Option<&TemplateInfo> {
        match self {
            Self::Class { template, .. } | Self::Function { template, .. } => template.as_ref(),
            _ => None,
        }
    }

    /// Returns true if the callable has an implicit `this` argument.
    #[must_use]
    pub const fn has_this(&self) -> bool {
        match self {
            Self::Method { is_static, .. } => !*is_static,
            Self::Constructor { .. } | Self::ConversionFunction { .. } => true,
            Self::Operator { is_member, .. } => *is_member,
            _ => false,
        }
    }
}

/// One declaration reported by the front end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Unique identifier within the translation unit.
    pub id: DeclId,
    /// Kind-specific payload.
    #[serde(flatten)]
    pub kind: DeclKind,
    /// Unqualified spelling.
    #[serde(default)]
    pub name: String,
    /// `::`-separated qualified name; empty for the root.
    #[serde(default)]
    pub qualified_name: String,
    /// Enclosing declaration; absent only for the root.
    #[serde(default)]
    pub parent: Option<DeclId>,
    /// Source order index.
    pub order: u32,
    /// Source location.
    #[serde(default)]
    pub location: Location,
    /// Raw annotation payloads.
    #[serde(default)]
    pub annotations: Vec<RawPayload>,
    /// Documentation comment.
    #[serde(default)]
    pub doc: Option<String>,
    /// Access specifier.
    #[serde(default)]
    pub access: Access,
}

impl Declaration {
    /// Returns the annotation target of this declaration.
    #[must_use]
    pub const fn target(&self) -> DeclTarget {
        self.kind.target()
    }

    /// Returns a name fit for messages: the qualified name, or the kind for unnamed ones.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.qualified_name.is_empty() {
            format!("<{}>", self.kind.name())
        } else {
            self.qualified_name.clone()
        }
    }

    /// Key under which redeclarations of the same entity are merged.
    ///
    /// Callables include their parameter types so overloads stay apart;
    /// manual blocks and unnamed declarations are never merged.
    #[must_use]
    pub fn merge_key(&self) -> Option<String> {
        match &self.kind {
            DeclKind::ManualBlock { .. } => None,
            _ if self.qualified_name.is_empty() && self.parent.is_some() => None,
            kind => {
                let family = if kind.is_context() || matches!(kind, DeclKind::ClassTemplate) {
                    "scope"
                } else {
                    kind.name()
                };
                let overload = kind.signature().map(Signature::overload_key).unwrap_or_default();
                Some(format!("{family}|{}|{overload}", self.qualified_name))
            }
        }
    }
}
