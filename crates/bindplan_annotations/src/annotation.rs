//! The typed annotation of one declaration.
//!
//! An [`Annotation`] is built from the directives of every payload attached
//! to a declaration. Fields are `Option`s wherever "unset" must be told apart
//! from an explicit value, since only unset visibility inherits from the
//! enclosing context.

use bindplan_foundation::{Error, ErrorKind, Result};

use crate::directive::{
    ArgRef, ArgSelection, BaseSelection, DeclTarget, Directive, DirectiveKind, ReturnValuePolicy,
};
use crate::payload::RawPayload;

/// Where an `expose_here` directive relocates a declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExposeHere {
    /// On an alias: expose the alias target here, under the alias's name.
    Here,
    /// On a namespace or class: expose it inside the named context.
    Into(String),
}

/// Which instantiations a template asks to expose.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstantiationSelection {
    /// Every instantiation present in the translation unit.
    All,
    /// Only these argument lists, each spelled like `"int, bool"`.
    Only(Vec<String>),
}

/// Where a manual block is spliced into the emission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManualPlacement {
    /// Before every other registration.
    Early,
    /// After every other registration.
    Postamble,
    /// Before the named member of the owning context.
    Before(String),
    /// After the named member of the owning context.
    After(String),
}

/// Validated directives of a declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotation {
    /// Explicit visibility; `None` inherits.
    pub visible: Option<bool>,
    /// Explicit exposed name.
    pub expose_as: Option<String>,
    /// Namespace is a module scope.
    pub module: bool,
    /// Explicit module name.
    pub module_name: Option<String>,
    /// Modules this namespace is restricted to.
    pub only_expose_in: Vec<String>,
    /// Relocation request.
    pub expose_here: Option<ExposeHere>,
    /// Alias target should be exposed in its own context.
    pub encourage: bool,
    /// Template instantiations to expose.
    pub expose_instantiations: Option<InstantiationSelection>,
    /// Enum arithmetic support.
    pub arithmetic: Option<bool>,
    /// Enum value export.
    pub export_values: Option<bool>,
    /// Class dynamic attributes.
    pub dynamic_attr: Option<bool>,
    /// Class holder type.
    pub holder_type: Option<String>,
    /// Bases to hide.
    pub hide_base: Option<BaseSelection>,
    /// Bases to inline.
    pub inline_base: Option<BaseSelection>,
    /// Keep-alive pairs, in directive order.
    pub keep_alive: Vec<(ArgRef, ArgRef)>,
    /// Arguments without implicit conversion.
    pub noconvert: Option<ArgSelection>,
    /// Arguments that must not be `None`.
    pub required: Vec<ArgRef>,
    /// Return value policy.
    pub return_value_policy: Option<ReturnValuePolicy>,
    /// Properties this method reads.
    pub getter_for: Vec<String>,
    /// Properties this method writes.
    pub setter_for: Vec<String>,
    /// Constructor enables implicit conversion.
    pub implicit_conversion: Option<bool>,
    /// Field is read-only.
    pub readonly: Option<bool>,
    /// Manual injection site.
    pub manual: bool,
    /// Manual block placement.
    pub placement: Option<ManualPlacement>,
}

impl Annotation {
    /// Parses and validates every payload of a declaration.
    ///
    /// # Errors
    /// Returns the first payload that fails to parse or a directive that does
    /// not fit `target`.
    pub fn from_payloads(payloads: &[RawPayload], target: DeclTarget) -> Result<Self> {
        let mut directives = Vec::new();
        for payload in payloads {
            for raw in payload.directives()? {
                directives.push(Directive::from_raw(&raw)?);
            }
        }
        Self::from_directives(directives, target)
    }

    /// Builds an annotation from validated directives. Later directives win.
    ///
    /// # Errors
    /// Returns `InvalidForDeclaration` for directives that do not apply to
    /// `target`, and `ConflictingDirectives` or `BadValue` for combinations
    /// that cannot hold together.
    pub fn from_directives(directives: Vec<Directive>, target: DeclTarget) -> Result<Self> {
        let mut ann = Self::default();
        for directive in directives {
            let kind = directive.kind();
            if !kind.applies_to(target) {
                return Err(Error::new(ErrorKind::InvalidForDeclaration {
                    directive: kind.name().to_string(),
                    declaration_kind: target.describe().to_string(),
                }));
            }
            match directive {
                Directive::Visible(v) => ann.visible = v,
                Directive::Hidden => ann.visible = Some(false),
                Directive::ExposeAs(name) => ann.expose_as = name,
                Directive::Module(name) => {
                    ann.module = true;
                    ann.module_name = name;
                }
                Directive::OnlyExposeIn(modules) => ann.only_expose_in.extend(modules),
                Directive::ExposeHere(target_ctx) => {
                    ann.expose_here = Some(Self::relocation(target, target_ctx)?);
                }
                Directive::Encourage => ann.encourage = true,
                Directive::ExposeInstantiations(None) => {
                    ann.expose_instantiations = Some(InstantiationSelection::All);
                }
                Directive::ExposeInstantiations(Some(list)) => {
                    ann.expose_instantiations = Some(match ann.expose_instantiations.take() {
                        Some(InstantiationSelection::All) => InstantiationSelection::All,
                        Some(InstantiationSelection::Only(mut prev)) => {
                            prev.extend(list);
                            InstantiationSelection::Only(prev)
                        }
                        None => InstantiationSelection::Only(list),
                    });
                }
                Directive::Arithmetic(b) => ann.arithmetic = Some(b),
                Directive::ExportValues(v) => ann.export_values = v,
                Directive::DynamicAttr(b) => ann.dynamic_attr = Some(b),
                Directive::HolderType(t) => ann.holder_type = Some(t),
                Directive::HideBase(sel) => {
                    ann.hide_base = Some(match ann.hide_base.take() {
                        Some(prev) => prev.union(sel),
                        None => sel,
                    });
                }
                Directive::InlineBase(sel) => {
                    ann.inline_base = Some(match ann.inline_base.take() {
                        Some(prev) => prev.union(sel),
                        None => sel,
                    });
                }
                Directive::KeepAlive(a, b) => ann.keep_alive.push((a, b)),
                Directive::NoConvert(sel) => ann.noconvert = Some(sel),
                Directive::Required(args) => ann.required.extend(args),
                Directive::ReturnValuePolicy(p) => ann.return_value_policy = Some(p),
                Directive::GetterFor(props) => ann.getter_for.extend(props),
                Directive::SetterFor(props) => ann.setter_for.extend(props),
                Directive::ImplicitConversion(b) => ann.implicit_conversion = Some(b),
                Directive::Readonly(b) => ann.readonly = Some(b),
                Directive::Manual => ann.manual = true,
                Directive::Early => ann.set_placement(ManualPlacement::Early)?,
                Directive::Postamble => ann.set_placement(ManualPlacement::Postamble)?,
                Directive::Before(m) => ann.set_placement(ManualPlacement::Before(m))?,
                Directive::After(m) => ann.set_placement(ManualPlacement::After(m))?,
            }
        }
        if ann.encourage && ann.expose_here.is_some() {
            return Err(Error::new(ErrorKind::ConflictingDirectives {
                first: DirectiveKind::ExposeHere.name().to_string(),
                second: DirectiveKind::Encourage.name().to_string(),
            }));
        }
        Ok(ann)
    }

    fn relocation(target: DeclTarget, context: Option<String>) -> Result<ExposeHere> {
        match (target, context) {
            (DeclTarget::TypeAlias, None) => Ok(ExposeHere::Here),
            (DeclTarget::TypeAlias, Some(_)) => Err(Error::bad_value(
                DirectiveKind::ExposeHere.name(),
                "aliases are exposed where they are declared; no target context is accepted",
            )),
            (_, Some(ctx)) => Ok(ExposeHere::Into(ctx)),
            (_, None) => Err(Error::bad_value(
                DirectiveKind::ExposeHere.name(),
                "expected the qualified name of the target context",
            )),
        }
    }

    fn set_placement(&mut self, placement: ManualPlacement) -> Result<()> {
        if let Some(previous) = &self.placement {
            if *previous != placement {
                return Err(Error::new(ErrorKind::ConflictingDirectives {
                    first: placement_name(previous).to_string(),
                    second: placement_name(&placement).to_string(),
                }));
            }
        }
        self.placement = Some(placement);
        Ok(())
    }

    /// Merges the annotation of a redeclaration into this one.
    ///
    /// Unset fields are filled from `other`; lists are unioned.
    ///
    /// # Errors
    /// Returns the name of the first directive on which the two disagree.
    pub fn merge_redeclaration(&mut self, other: &Self) -> std::result::Result<(), &'static str> {
        merge_option(&mut self.visible, &other.visible, "visible")?;
        merge_option(&mut self.expose_as, &other.expose_as, "expose_as")?;
        merge_option(&mut self.module_name, &other.module_name, "module")?;
        merge_option(&mut self.expose_here, &other.expose_here, "expose_here")?;
        merge_option(&mut self.arithmetic, &other.arithmetic, "arithmetic")?;
        merge_option(&mut self.export_values, &other.export_values, "export_values")?;
        merge_option(&mut self.dynamic_attr, &other.dynamic_attr, "dynamic_attr")?;
        merge_option(&mut self.holder_type, &other.holder_type, "holder_type")?;
        merge_option(
            &mut self.return_value_policy,
            &other.return_value_policy,
            "return_value_policy",
        )?;
        merge_option(
            &mut self.implicit_conversion,
            &other.implicit_conversion,
            "implicit_conversion",
        )?;
        merge_option(&mut self.readonly, &other.readonly, "readonly")?;
        merge_option(&mut self.noconvert, &other.noconvert, "noconvert")?;

        self.module |= other.module;
        self.encourage |= other.encourage;
        self.manual |= other.manual;
        union_into(&mut self.only_expose_in, &other.only_expose_in);
        union_into(&mut self.getter_for, &other.getter_for);
        union_into(&mut self.setter_for, &other.setter_for);
        union_into(&mut self.required, &other.required);
        union_into(&mut self.keep_alive, &other.keep_alive);

        self.hide_base = merge_bases(self.hide_base.take(), other.hide_base.clone());
        self.inline_base = merge_bases(self.inline_base.take(), other.inline_base.clone());
        if self.expose_instantiations.is_none() {
            self.expose_instantiations.clone_from(&other.expose_instantiations);
        }
        if self.placement.is_none() {
            self.placement.clone_from(&other.placement);
        }
        Ok(())
    }

    /// Returns true if no directive was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn placement_name(placement: &ManualPlacement) -> &'static str {
    match placement {
        ManualPlacement::Early => "early",
        ManualPlacement::Postamble => "postamble",
        ManualPlacement::Before(_) => "before",
        ManualPlacement::After(_) => "after",
    }
}

fn merge_option<T: Clone + PartialEq>(
    mine: &mut Option<T>,
    theirs: &Option<T>,
    directive: &'static str,
) -> std::result::Result<(), &'static str> {
    match (mine.as_ref(), theirs) {
        (Some(a), Some(b)) if a != b => Err(directive),
        (None, Some(b)) => {
            *mine = Some(b.clone());
            Ok(())
        }
        _ => Ok(()),
    }
}

fn union_into<T: Clone + PartialEq>(mine: &mut Vec<T>, theirs: &[T]) {
    for item in theirs {
        if !mine.contains(item) {
            mine.push(item.clone());
        }
    }
}

fn merge_bases(a: Option<BaseSelection>, b: Option<BaseSelection>) -> Option<BaseSelection> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, b) => a.or(b),
    }
}
