//! Programmatic construction of translation units.
//!
//! Used by tests, fixtures, and benchmarks in place of a real front end.
//! Source order and line numbers follow the order of builder calls.
//!
//! ```
//! use bindplan_ast::{Signature, TranslationUnitBuilder};
//!
//! let mut b = TranslationUnitBuilder::new("shapes.h");
//! let geo = b.namespace(b.root(), "geo");
//! b.annotate(geo, "visible");
//! let shape = b.class(geo, "Shape");
//! b.method(shape, "area", Signature::returning("double"));
//! let unit = b.build().unwrap();
//! assert_eq!(unit.len(), 4);
//! ```

use bindplan_annotations::RawPayload;
use bindplan_foundation::{Location, Result};

use crate::decl::{
    Access, BaseSpec, DeclId, DeclKind, Declaration, InstantiationOrigin, Signature,
    TemplateArgument, TemplateInfo,
};
use crate::unit::TranslationUnit;

/// Builds a [`TranslationUnit`] declaration by declaration.
pub struct TranslationUnitBuilder {
    file: String,
    declarations: Vec<Declaration>,
}

impl TranslationUnitBuilder {
    /// Creates a builder with only the root declaration.
    #[must_use]
    pub fn new(file: impl Into<String>) -> Self {
        let file = file.into();
        let root = Declaration {
            id: DeclId(0),
            kind: DeclKind::TranslationUnit,
            name: String::new(),
            qualified_name: String::new(),
            parent: None,
            order: 0,
            location: Location::new(file.clone(), 1, 1),
            annotations: Vec::new(),
            doc: None,
            access: Access::Public,
        };
        Self {
            file,
            declarations: vec![root],
        }
    }

    /// Returns the root declaration.
    #[must_use]
    pub fn root(&self) -> DeclId {
        DeclId(0)
    }

    /// Adds a declaration of any kind and returns its id.
    ///
    /// # Panics
    /// Panics if `parent` was not created by this builder.
    pub fn add(&mut self, parent: DeclId, name: &str, kind: DeclKind) -> DeclId {
        let qualified_name = {
            let parent_decl = self.decl(parent);
            if parent_decl.qualified_name.is_empty() {
                name.to_string()
            } else if name.is_empty() {
                String::new()
            } else {
                format!("{}::{name}", parent_decl.qualified_name)
            }
        };
        self.push(parent, name, qualified_name, kind)
    }

    fn push(&mut self, parent: DeclId, name: &str, qualified_name: String, kind: DeclKind) -> DeclId {
        let id = DeclId(u32::try_from(self.declarations.len()).unwrap_or(u32::MAX));
        let line = id.0 + 1;
        self.declarations.push(Declaration {
            id,
            kind,
            name: name.to_string(),
            qualified_name,
            parent: Some(parent),
            order: id.0,
            location: Location::new(self.file.clone(), line, 1),
            annotations: Vec::new(),
            doc: None,
            access: Access::Public,
        });
        id
    }

    fn decl(&self, id: DeclId) -> &Declaration {
        &self.declarations[id.0 as usize]
    }

    fn decl_mut(&mut self, id: DeclId) -> &mut Declaration {
        &mut self.declarations[id.0 as usize]
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Attaches annotation text.
    pub fn annotate(&mut self, id: DeclId, text: &str) -> &mut Self {
        self.decl_mut(id)
            .annotations
            .push(RawPayload::Text(text.to_string()));
        self
    }

    /// Attaches a pre-built payload.
    pub fn annotate_payload(&mut self, id: DeclId, payload: RawPayload) -> &mut Self {
        self.decl_mut(id).annotations.push(payload);
        self
    }

    /// Sets the documentation comment.
    pub fn doc(&mut self, id: DeclId, text: &str) -> &mut Self {
        self.decl_mut(id).doc = Some(text.to_string());
        self
    }

    /// Sets the access specifier.
    pub fn access(&mut self, id: DeclId, access: Access) -> &mut Self {
        self.decl_mut(id).access = access;
        self
    }

    /// Overrides the source order index.
    pub fn order(&mut self, id: DeclId, order: u32) -> &mut Self {
        self.decl_mut(id).order = order;
        self
    }

    /// Overrides the location.
    pub fn location(&mut self, id: DeclId, location: Location) -> &mut Self {
        self.decl_mut(id).location = location;
        self
    }

    /// Adds a redeclaration of `id` (a reopened namespace, or a definition
    /// after a forward declaration) under `parent`.
    pub fn redeclare(&mut self, id: DeclId, parent: DeclId) -> DeclId {
        let original = self.decl(id).clone();
        self.push(parent, &original.name, original.qualified_name, original.kind)
    }

    // =========================================================================
    // Contexts
    // =========================================================================

    /// Adds a namespace.
    pub fn namespace(&mut self, parent: DeclId, name: &str) -> DeclId {
        self.add(parent, name, DeclKind::Namespace { inline: false })
    }

    /// Adds a class without bases.
    pub fn class(&mut self, parent: DeclId, name: &str) -> DeclId {
        self.class_with_bases(parent, name, &[])
    }

    /// Adds a class with public bases.
    pub fn class_with_bases(&mut self, parent: DeclId, name: &str, bases: &[&str]) -> DeclId {
        self.add(
            parent,
            name,
            DeclKind::Class {
                bases: bases.iter().map(|b| BaseSpec::public(*b)).collect(),
                template: None,
            },
        )
    }

    /// Adds an enum.
    pub fn enumeration(&mut self, parent: DeclId, name: &str, scoped: bool) -> DeclId {
        self.add(parent, name, DeclKind::Enum { scoped })
    }

    /// Adds an enumerator.
    pub fn enumerator(&mut self, parent: DeclId, name: &str) -> DeclId {
        self.add(parent, name, DeclKind::Enumerator { value: None })
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Adds a class template.
    pub fn class_template(&mut self, parent: DeclId, name: &str) -> DeclId {
        self.add(parent, name, DeclKind::ClassTemplate)
    }

    /// Adds a function template.
    pub fn function_template(&mut self, parent: DeclId, name: &str) -> DeclId {
        self.add(parent, name, DeclKind::FunctionTemplate)
    }

    /// Adds a class template instantiation such as `Tpl<int>`.
    ///
    /// `template` is the qualified name of the template; type arguments are
    /// given as spellings.
    pub fn instantiation(
        &mut self,
        parent: DeclId,
        template: &str,
        arguments: &[&str],
        origin: InstantiationOrigin,
    ) -> DeclId {
        let simple = template.rsplit("::").next().unwrap_or(template);
        let name = format!("{simple}<{}>", arguments.join(", "));
        self.add(
            parent,
            &name,
            DeclKind::Class {
                bases: Vec::new(),
                template: Some(TemplateInfo {
                    template: template.to_string(),
                    arguments: arguments
                        .iter()
                        .map(|a| template_argument(a))
                        .collect(),
                    origin,
                }),
            },
        )
    }

    /// Adds a function template instantiation.
    pub fn function_instantiation(
        &mut self,
        parent: DeclId,
        template: &str,
        arguments: &[&str],
        signature: Signature,
    ) -> DeclId {
        let simple = template.rsplit("::").next().unwrap_or(template);
        self.add(
            parent,
            simple,
            DeclKind::Function {
                signature,
                template: Some(TemplateInfo {
                    template: template.to_string(),
                    arguments: arguments
                        .iter()
                        .map(|a| template_argument(a))
                        .collect(),
                    origin: InstantiationOrigin::Implicit,
                }),
            },
        )
    }

    // =========================================================================
    // Members
    // =========================================================================

    /// Adds a free function.
    pub fn function(&mut self, parent: DeclId, name: &str, signature: Signature) -> DeclId {
        self.add(
            parent,
            name,
            DeclKind::Function {
                signature,
                template: None,
            },
        )
    }

    /// Adds a non-static, non-const member function.
    pub fn method(&mut self, parent: DeclId, name: &str, signature: Signature) -> DeclId {
        self.add(
            parent,
            name,
            DeclKind::Method {
                signature,
                is_static: false,
                is_const: false,
            },
        )
    }

    /// Adds a static member function.
    pub fn static_method(&mut self, parent: DeclId, name: &str, signature: Signature) -> DeclId {
        self.add(
            parent,
            name,
            DeclKind::Method {
                signature,
                is_static: true,
                is_const: false,
            },
        )
    }

    /// Adds a constructor.
    pub fn constructor(&mut self, parent: DeclId, signature: Signature) -> DeclId {
        let name = self.decl(parent).name.clone();
        self.add(
            parent,
            &name,
            DeclKind::Constructor {
                signature,
                is_inherited: false,
            },
        )
    }

    /// Adds a destructor.
    pub fn destructor(&mut self, parent: DeclId) -> DeclId {
        let name = format!("~{}", self.decl(parent).name);
        self.add(parent, &name, DeclKind::Destructor)
    }

    /// Adds a member operator.
    pub fn member_operator(&mut self, parent: DeclId, symbol: &str, signature: Signature) -> DeclId {
        self.add(
            parent,
            &format!("operator{symbol}"),
            DeclKind::Operator {
                symbol: symbol.to_string(),
                signature,
                is_member: true,
            },
        )
    }

    /// Adds a free operator.
    pub fn free_operator(&mut self, parent: DeclId, symbol: &str, signature: Signature) -> DeclId {
        self.add(
            parent,
            &format!("operator{symbol}"),
            DeclKind::Operator {
                symbol: symbol.to_string(),
                signature,
                is_member: false,
            },
        )
    }

    /// Adds a data member.
    pub fn field(&mut self, parent: DeclId, name: &str, ty: &str) -> DeclId {
        self.add(
            parent,
            name,
            DeclKind::Field {
                ty: ty.to_string(),
                is_const: false,
                is_static: false,
            },
        )
    }

    /// Adds a namespace-scope variable.
    pub fn variable(&mut self, parent: DeclId, name: &str, ty: &str) -> DeclId {
        self.add(
            parent,
            name,
            DeclKind::Variable {
                ty: ty.to_string(),
                is_const: false,
            },
        )
    }

    /// Adds a type alias; `None` models a target the front end could not resolve.
    pub fn alias(&mut self, parent: DeclId, name: &str, target: Option<&str>) -> DeclId {
        self.add(
            parent,
            name,
            DeclKind::TypeAlias {
                target: target.map(str::to_string),
            },
        )
    }

    /// Adds a manual block carrying the `manual` directive.
    pub fn manual(&mut self, parent: DeclId, body: &str) -> DeclId {
        let id = self.push(
            parent,
            "",
            String::new(),
            DeclKind::ManualBlock {
                body: body.to_string(),
            },
        );
        self.annotate(id, "manual");
        id
    }

    /// Validates and returns the translation unit.
    ///
    /// # Errors
    /// Returns `MalformedInput` if the declarations violate the front-end contract.
    pub fn build(self) -> Result<TranslationUnit> {
        TranslationUnit::new(self.declarations)
    }
}

fn template_argument(spelling: &str) -> TemplateArgument {
    let is_value = spelling
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '-')
        || spelling == "true"
        || spelling == "false";
    if is_value {
        TemplateArgument::Value(spelling.to_string())
    } else {
        TemplateArgument::Type(spelling.to_string())
    }
}
