//! The directive schema.
//!
//! Every directive name maps to a [`DirectiveKind`]; [`Directive::from_raw`]
//! checks the argument count and argument types of a [`RawDirective`] and
//! produces the typed [`Directive`]. Which declarations a directive may be
//! attached to is answered by [`DirectiveKind::applies_to`].

use std::fmt;

use bindplan_foundation::{Error, ErrorKind, Result, is_valid_identifier};
use serde::{Deserialize, Serialize};

use crate::literal::Literal;
use crate::parser::RawDirective;

// =============================================================================
// Declaration targets
// =============================================================================

/// The kind of declaration an annotation is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeclTarget {
    /// The translation unit root.
    TranslationUnit,
    /// A namespace.
    Namespace,
    /// A class, struct, or class template specialization.
    Class,
    /// A class template.
    ClassTemplate,
    /// A function template.
    FunctionTemplate,
    /// An enum.
    Enum,
    /// An enumerator.
    Enumerator,
    /// A free function.
    Function,
    /// A member function.
    Method,
    /// A constructor.
    Constructor,
    /// A destructor.
    Destructor,
    /// A member or free operator.
    Operator,
    /// A conversion function.
    ConversionFunction,
    /// A data member.
    Field,
    /// A namespace-scope variable.
    Variable,
    /// A typedef or alias declaration.
    TypeAlias,
    /// A manually injected code block.
    ManualBlock,
}

impl DeclTarget {
    /// Returns true for declarations with a parameter list.
    #[must_use]
    pub const fn is_callable(self) -> bool {
        matches!(
            self,
            Self::Function
                | Self::Method
                | Self::Constructor
                | Self::Operator
                | Self::ConversionFunction
                | Self::FunctionTemplate
        )
    }

    /// Returns a human-readable description.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::TranslationUnit => "the translation unit",
            Self::Namespace => "a namespace",
            Self::Class => "a class",
            Self::ClassTemplate => "a class template",
            Self::FunctionTemplate => "a function template",
            Self::Enum => "an enum",
            Self::Enumerator => "an enumerator",
            Self::Function => "a function",
            Self::Method => "a method",
            Self::Constructor => "a constructor",
            Self::Destructor => "a destructor",
            Self::Operator => "an operator",
            Self::ConversionFunction => "a conversion function",
            Self::Field => "a field",
            Self::Variable => "a variable",
            Self::TypeAlias => "a type alias",
            Self::ManualBlock => "a manual block",
        }
    }
}

// =============================================================================
// Directive kinds
// =============================================================================

/// Every directive the schema knows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `visible`, `visible(bool)`, `visible(default)`
    Visible,
    /// `hidden`
    Hidden,
    /// `expose_as("name")` / `name("name")`
    ExposeAs,
    /// `module`, `module("name")`
    Module,
    /// `only_expose_in("a", ...)`
    OnlyExposeIn,
    /// `expose_here`, `expose_here("ctx")`
    ExposeHere,
    /// `encourage`
    Encourage,
    /// `expose_instantiations`, `expose_instantiations("int", ...)`
    ExposeInstantiations,
    /// `arithmetic`, `arithmetic(bool)`
    Arithmetic,
    /// `export_values`, `export_values(bool)`, `export_values(default)`
    ExportValues,
    /// `dynamic_attr`, `dynamic_attr(bool)`
    DynamicAttr,
    /// `holder_type("std::shared_ptr")`
    HolderType,
    /// `hide_base`, `hide_base("A", ...)`
    HideBase,
    /// `inline_base`, `inline_base("A", ...)`
    InlineBase,
    /// `keep_alive(a, b)`
    KeepAlive,
    /// `noconvert(a, ...)`
    NoConvert,
    /// `required(a, ...)`
    Required,
    /// `return_value_policy(policy)`
    ReturnValuePolicy,
    /// `getter_for("prop", ...)`
    GetterFor,
    /// `setter_for("prop", ...)`
    SetterFor,
    /// `implicit_conversion`, `implicit_conversion(bool)`
    ImplicitConversion,
    /// `readonly`, `readonly(bool)`
    Readonly,
    /// `manual`
    Manual,
    /// `early`
    Early,
    /// `postamble`
    Postamble,
    /// `before("member")`
    Before,
    /// `after("member")`
    After,
}

impl DirectiveKind {
    /// Looks up a directive by its spelling.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "visible" => Self::Visible,
            "hidden" => Self::Hidden,
            "expose_as" | "name" => Self::ExposeAs,
            "module" => Self::Module,
            "only_expose_in" => Self::OnlyExposeIn,
            "expose_here" => Self::ExposeHere,
            "encourage" => Self::Encourage,
            "expose_instantiations" => Self::ExposeInstantiations,
            "arithmetic" => Self::Arithmetic,
            "export_values" => Self::ExportValues,
            "dynamic_attr" => Self::DynamicAttr,
            "holder_type" => Self::HolderType,
            "hide_base" => Self::HideBase,
            "inline_base" => Self::InlineBase,
            "keep_alive" => Self::KeepAlive,
            "noconvert" => Self::NoConvert,
            "required" => Self::Required,
            "return_value_policy" => Self::ReturnValuePolicy,
            "getter_for" => Self::GetterFor,
            "setter_for" => Self::SetterFor,
            "implicit_conversion" => Self::ImplicitConversion,
            "readonly" => Self::Readonly,
            "manual" => Self::Manual,
            "early" => Self::Early,
            "postamble" => Self::Postamble,
            "before" => Self::Before,
            "after" => Self::After,
            _ => return None,
        })
    }

    /// Returns the canonical spelling.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Hidden => "hidden",
            Self::ExposeAs => "expose_as",
            Self::Module => "module",
            Self::OnlyExposeIn => "only_expose_in",
            Self::ExposeHere => "expose_here",
            Self::Encourage => "encourage",
            Self::ExposeInstantiations => "expose_instantiations",
            Self::Arithmetic => "arithmetic",
            Self::ExportValues => "export_values",
            Self::DynamicAttr => "dynamic_attr",
            Self::HolderType => "holder_type",
            Self::HideBase => "hide_base",
            Self::InlineBase => "inline_base",
            Self::KeepAlive => "keep_alive",
            Self::NoConvert => "noconvert",
            Self::Required => "required",
            Self::ReturnValuePolicy => "return_value_policy",
            Self::GetterFor => "getter_for",
            Self::SetterFor => "setter_for",
            Self::ImplicitConversion => "implicit_conversion",
            Self::Readonly => "readonly",
            Self::Manual => "manual",
            Self::Early => "early",
            Self::Postamble => "postamble",
            Self::Before => "before",
            Self::After => "after",
        }
    }

    /// Returns true if the directive never takes arguments.
    #[must_use]
    pub const fn is_flag(self) -> bool {
        matches!(
            self,
            Self::Hidden | Self::Encourage | Self::Manual | Self::Early | Self::Postamble
        )
    }

    /// Returns true if the directive may be attached to `target`.
    #[must_use]
    pub const fn applies_to(self, target: DeclTarget) -> bool {
        use DeclTarget as T;
        match self {
            Self::Visible | Self::Hidden => !matches!(target, T::TranslationUnit),
            Self::ExposeAs => !matches!(
                target,
                T::TranslationUnit | T::ManualBlock | T::Destructor | T::Namespace
            ),
            Self::Module | Self::OnlyExposeIn => matches!(target, T::Namespace),
            Self::ExposeHere => matches!(target, T::TypeAlias | T::Namespace | T::Class),
            Self::Encourage => matches!(target, T::TypeAlias),
            Self::ExposeInstantiations => {
                matches!(target, T::ClassTemplate | T::FunctionTemplate)
            }
            Self::Arithmetic | Self::ExportValues => matches!(target, T::Enum),
            Self::DynamicAttr | Self::HolderType | Self::HideBase | Self::InlineBase => {
                matches!(target, T::Class | T::ClassTemplate)
            }
            Self::KeepAlive | Self::NoConvert | Self::Required | Self::ReturnValuePolicy => {
                target.is_callable()
            }
            Self::GetterFor | Self::SetterFor => matches!(target, T::Method),
            Self::ImplicitConversion => matches!(target, T::Constructor),
            Self::Readonly => matches!(target, T::Field | T::Variable),
            Self::Manual | Self::Early | Self::Postamble | Self::Before | Self::After => {
                matches!(target, T::ManualBlock)
            }
        }
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Argument value types
// =============================================================================

/// A reference to a callable's argument.
///
/// Indices count `[return, this?, params...]`, so `0` is the return value
/// and `1` is `this` for methods.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArgRef {
    /// Positional reference.
    Index(u32),
    /// `return`, `this`, or a parameter name.
    Name(String),
}

impl ArgRef {
    /// Resolves the reference against a callable's parameter names.
    ///
    /// Returns `None` if it does not name an argument.
    #[must_use]
    pub fn resolve(&self, params: &[&str], has_this: bool) -> Option<u32> {
        let offset = 1 + u32::from(has_this);
        let count = offset + u32::try_from(params.len()).ok()?;
        match self {
            Self::Index(n) => (*n < count).then_some(*n),
            Self::Name(name) if name == "return" => Some(0),
            Self::Name(name) if name == "this" => has_this.then_some(1),
            Self::Name(name) => params
                .iter()
                .position(|p| p == name)
                .and_then(|i| u32::try_from(i).ok())
                .map(|i| i + offset),
        }
    }

    fn from_literal(directive: DirectiveKind, literal: &Literal) -> Result<Self> {
        match literal {
            Literal::Unsigned(n) => u32::try_from(*n)
                .map(Self::Index)
                .map_err(|_| Error::bad_value(directive.name(), format!("index {n} is too large"))),
            Literal::String(s) | Literal::Identifier(s) => Ok(Self::Name(s.clone())),
            other => Err(Error::bad_value(
                directive.name(),
                format!("expected argument name or index, got {}", other.type_name()),
            )),
        }
    }
}

impl fmt::Display for ArgRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(n) => write!(f, "{n}"),
            Self::Name(s) => write!(f, "{s}"),
        }
    }
}

/// Which base classes a `hide_base`/`inline_base` directive selects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BaseSelection {
    /// Every immediate base.
    All,
    /// Bases matching these names.
    Named(Vec<String>),
}

impl BaseSelection {
    /// Merges a later selection into this one.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        match (self, other) {
            (Self::All, _) | (_, Self::All) => Self::All,
            (Self::Named(mut a), Self::Named(b)) => {
                for name in b {
                    if !a.contains(&name) {
                        a.push(name);
                    }
                }
                Self::Named(a)
            }
        }
    }
}

/// Which arguments a `noconvert` directive selects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgSelection {
    /// Every parameter.
    All,
    /// The listed arguments.
    Only(Vec<ArgRef>),
}

/// How the binding runtime treats a returned value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnValuePolicy {
    /// Let the runtime pick based on the return type.
    #[default]
    Automatic,
    /// Like automatic, but references are not copied.
    AutomaticReference,
    /// The host takes ownership of the returned pointer.
    TakeOwnership,
    /// Return a copy.
    Copy,
    /// Move the returned value.
    Move,
    /// Reference without ownership.
    Reference,
    /// Reference kept alive by `this`.
    ReferenceInternal,
}

impl ReturnValuePolicy {
    /// Looks up a policy by its spelling.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "automatic" => Self::Automatic,
            "automatic_reference" => Self::AutomaticReference,
            "take_ownership" => Self::TakeOwnership,
            "copy" => Self::Copy,
            "move" => Self::Move,
            "reference" => Self::Reference,
            "reference_internal" => Self::ReferenceInternal,
            _ => return None,
        })
    }
}

// =============================================================================
// Typed directives
// =============================================================================

/// A validated directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    /// Explicit visibility; `None` resets to the inherited value.
    Visible(Option<bool>),
    /// Shorthand for `visible(false)`.
    Hidden,
    /// Exposed name; `None` resets to the spelling.
    ExposeAs(Option<String>),
    /// Makes a namespace a module scope, optionally renamed.
    Module(Option<String>),
    /// Restricts a namespace to the named modules.
    OnlyExposeIn(Vec<String>),
    /// Relocation: `None` on aliases, a target context on namespaces and classes.
    ExposeHere(Option<String>),
    /// Exposes an alias's target even if it is hidden.
    Encourage,
    /// Template instantiations to expose; `None` means all of them.
    ExposeInstantiations(Option<Vec<String>>),
    /// Enum supports arithmetic.
    Arithmetic(bool),
    /// Export enumerators into the enclosing scope; `None` means "unless scoped".
    ExportValues(Option<bool>),
    /// Instances accept new attributes.
    DynamicAttr(bool),
    /// Smart pointer used to hold instances.
    HolderType(String),
    /// Bases removed from the registered hierarchy.
    HideBase(BaseSelection),
    /// Bases whose members are merged into the class.
    InlineBase(BaseSelection),
    /// Keep the second argument alive as long as the first.
    KeepAlive(ArgRef, ArgRef),
    /// Arguments that must not be implicitly converted.
    NoConvert(ArgSelection),
    /// Arguments that must not be `None`.
    Required(Vec<ArgRef>),
    /// Return value policy.
    ReturnValuePolicy(ReturnValuePolicy),
    /// Method is the getter of these properties.
    GetterFor(Vec<String>),
    /// Method is the setter of these properties.
    SetterFor(Vec<String>),
    /// Constructor enables implicit conversion.
    ImplicitConversion(bool),
    /// Field cannot be assigned from the host.
    Readonly(bool),
    /// Marks a manual injection site.
    Manual,
    /// Manual block runs before everything else.
    Early,
    /// Manual block runs after everything else.
    Postamble,
    /// Manual block runs before the named member.
    Before(String),
    /// Manual block runs after the named member.
    After(String),
}

impl Directive {
    /// Returns the kind of this directive.
    #[must_use]
    pub const fn kind(&self) -> DirectiveKind {
        match self {
            Self::Visible(_) => DirectiveKind::Visible,
            Self::Hidden => DirectiveKind::Hidden,
            Self::ExposeAs(_) => DirectiveKind::ExposeAs,
            Self::Module(_) => DirectiveKind::Module,
            Self::OnlyExposeIn(_) => DirectiveKind::OnlyExposeIn,
            Self::ExposeHere(_) => DirectiveKind::ExposeHere,
            Self::Encourage => DirectiveKind::Encourage,
            Self::ExposeInstantiations(_) => DirectiveKind::ExposeInstantiations,
            Self::Arithmetic(_) => DirectiveKind::Arithmetic,
            Self::ExportValues(_) => DirectiveKind::ExportValues,
            Self::DynamicAttr(_) => DirectiveKind::DynamicAttr,
            Self::HolderType(_) => DirectiveKind::HolderType,
            Self::HideBase(_) => DirectiveKind::HideBase,
            Self::InlineBase(_) => DirectiveKind::InlineBase,
            Self::KeepAlive(..) => DirectiveKind::KeepAlive,
            Self::NoConvert(_) => DirectiveKind::NoConvert,
            Self::Required(_) => DirectiveKind::Required,
            Self::ReturnValuePolicy(_) => DirectiveKind::ReturnValuePolicy,
            Self::GetterFor(_) => DirectiveKind::GetterFor,
            Self::SetterFor(_) => DirectiveKind::SetterFor,
            Self::ImplicitConversion(_) => DirectiveKind::ImplicitConversion,
            Self::Readonly(_) => DirectiveKind::Readonly,
            Self::Manual => DirectiveKind::Manual,
            Self::Early => DirectiveKind::Early,
            Self::Postamble => DirectiveKind::Postamble,
            Self::Before(_) => DirectiveKind::Before,
            Self::After(_) => DirectiveKind::After,
        }
    }

    /// Checks a raw directive against the schema.
    ///
    /// # Errors
    /// Returns `UnknownDirective`, `WrongArity`, `BadValue`, or
    /// `InvalidIdentifier` when the directive does not fit the schema.
    pub fn from_raw(raw: &RawDirective) -> Result<Self> {
        let kind =
            DirectiveKind::from_name(&raw.name).ok_or_else(|| Error::unknown_directive(&raw.name))?;
        let args = Arguments {
            kind,
            values: &raw.arguments,
        };

        Ok(match kind {
            DirectiveKind::Visible => Self::Visible(args.optional_bool_or_default(Some(true))?),
            DirectiveKind::Hidden => {
                args.nullary()?;
                Self::Hidden
            }
            DirectiveKind::ExposeAs => {
                let name = args.single_string_or_default()?;
                if let Some(spelling) = &name {
                    if !is_valid_identifier(spelling) {
                        return Err(Error::new(ErrorKind::InvalidIdentifier {
                            spelling: spelling.clone(),
                        }));
                    }
                }
                Self::ExposeAs(name)
            }
            DirectiveKind::Module => Self::Module(args.optional_string()?),
            DirectiveKind::OnlyExposeIn => Self::OnlyExposeIn(args.strings(1)?),
            DirectiveKind::ExposeHere => Self::ExposeHere(args.optional_string()?),
            DirectiveKind::Encourage => {
                args.nullary()?;
                Self::Encourage
            }
            DirectiveKind::ExposeInstantiations => {
                let list = args.strings(0)?;
                Self::ExposeInstantiations((!list.is_empty()).then_some(list))
            }
            DirectiveKind::Arithmetic => Self::Arithmetic(args.flag_bool()?),
            DirectiveKind::ExportValues => {
                Self::ExportValues(args.optional_bool_or_default(Some(true))?)
            }
            DirectiveKind::DynamicAttr => Self::DynamicAttr(args.flag_bool()?),
            DirectiveKind::HolderType => Self::HolderType(args.single_string()?),
            DirectiveKind::HideBase => Self::HideBase(args.base_selection()?),
            DirectiveKind::InlineBase => Self::InlineBase(args.base_selection()?),
            DirectiveKind::KeepAlive => {
                args.exact(2)?;
                Self::KeepAlive(
                    ArgRef::from_literal(kind, &raw.arguments[0])?,
                    ArgRef::from_literal(kind, &raw.arguments[1])?,
                )
            }
            DirectiveKind::NoConvert => {
                if args.selects_all() {
                    Self::NoConvert(ArgSelection::All)
                } else {
                    Self::NoConvert(ArgSelection::Only(args.arg_refs(1)?))
                }
            }
            DirectiveKind::Required => Self::Required(args.arg_refs(1)?),
            DirectiveKind::ReturnValuePolicy => {
                args.exact(1)?;
                let name = raw.arguments[0].as_text().ok_or_else(|| {
                    Error::bad_value(kind.name(), "expected a policy name")
                })?;
                let policy = ReturnValuePolicy::from_name(name).ok_or_else(|| {
                    Error::bad_value(kind.name(), format!("unknown policy '{name}'"))
                })?;
                Self::ReturnValuePolicy(policy)
            }
            DirectiveKind::GetterFor => Self::GetterFor(args.strings(1)?),
            DirectiveKind::SetterFor => Self::SetterFor(args.strings(1)?),
            DirectiveKind::ImplicitConversion => Self::ImplicitConversion(args.flag_bool()?),
            DirectiveKind::Readonly => Self::Readonly(args.flag_bool()?),
            DirectiveKind::Manual => {
                args.nullary()?;
                Self::Manual
            }
            DirectiveKind::Early => {
                args.nullary()?;
                Self::Early
            }
            DirectiveKind::Postamble => {
                args.nullary()?;
                Self::Postamble
            }
            DirectiveKind::Before => Self::Before(args.single_string()?),
            DirectiveKind::After => Self::After(args.single_string()?),
        })
    }
}

/// Argument list accessors shared by the schema checks.
struct Arguments<'a> {
    kind: DirectiveKind,
    values: &'a [Literal],
}

impl Arguments<'_> {
    fn arity_error(&self, expected: &str) -> Error {
        Error::wrong_arity(self.kind.name(), expected, self.values.len())
    }

    fn type_error(&self, expected: &str, got: &Literal) -> Error {
        Error::bad_value(
            self.kind.name(),
            format!("expected {expected}, got {}", got.type_name()),
        )
    }

    fn nullary(&self) -> Result<()> {
        if self.values.is_empty() {
            Ok(())
        } else {
            Err(self.arity_error("0"))
        }
    }

    fn exact(&self, n: usize) -> Result<()> {
        if self.values.len() == n {
            Ok(())
        } else {
            Err(self.arity_error(&n.to_string()))
        }
    }

    /// Nullary means `nullary_value`; `default` means unset.
    fn optional_bool_or_default(&self, nullary_value: Option<bool>) -> Result<Option<bool>> {
        match self.values {
            [] => Ok(nullary_value),
            [Literal::Boolean(b)] => Ok(Some(*b)),
            [Literal::Default] => Ok(None),
            [other] => Err(self.type_error("boolean or default", other)),
            _ => Err(self.arity_error("0 or 1")),
        }
    }

    /// Nullary means true.
    fn flag_bool(&self) -> Result<bool> {
        match self.values {
            [] => Ok(true),
            [Literal::Boolean(b)] => Ok(*b),
            [other] => Err(self.type_error("boolean", other)),
            _ => Err(self.arity_error("0 or 1")),
        }
    }

    fn single_string(&self) -> Result<String> {
        match self.values {
            [Literal::String(s)] => Ok(s.clone()),
            [other] => Err(self.type_error("string", other)),
            _ => Err(self.arity_error("1")),
        }
    }

    fn single_string_or_default(&self) -> Result<Option<String>> {
        match self.values {
            [Literal::String(s)] => Ok(Some(s.clone())),
            [Literal::Default] => Ok(None),
            [other] => Err(self.type_error("string or default", other)),
            _ => Err(self.arity_error("1")),
        }
    }

    fn optional_string(&self) -> Result<Option<String>> {
        match self.values {
            [] => Ok(None),
            [Literal::String(s)] => Ok(Some(s.clone())),
            [other] => Err(self.type_error("string", other)),
            _ => Err(self.arity_error("0 or 1")),
        }
    }

    fn strings(&self, minimum: usize) -> Result<Vec<String>> {
        if self.values.len() < minimum {
            return Err(self.arity_error(&format!("at least {minimum}")));
        }
        self.values
            .iter()
            .map(|v| match v {
                Literal::String(s) => Ok(s.clone()),
                other => Err(self.type_error("string", other)),
            })
            .collect()
    }

    /// Nullary or a single `all` identifier.
    fn selects_all(&self) -> bool {
        match self.values {
            [] => true,
            [Literal::Identifier(s)] => s == "all",
            _ => false,
        }
    }

    fn base_selection(&self) -> Result<BaseSelection> {
        if self.selects_all() {
            return Ok(BaseSelection::All);
        }
        Ok(BaseSelection::Named(self.strings(1)?))
    }

    fn arg_refs(&self, minimum: usize) -> Result<Vec<ArgRef>> {
        if self.values.len() < minimum {
            return Err(self.arity_error(&format!("at least {minimum}")));
        }
        self.values
            .iter()
            .map(|v| ArgRef::from_literal(self.kind, v))
            .collect()
    }
}
