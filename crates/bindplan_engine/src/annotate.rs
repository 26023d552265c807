//! Annotation parsing for a whole translation unit.
//!
//! Every declaration's payloads are parsed before any later stage runs, and
//! every failure is collected so one run reports all malformed annotations.

use std::collections::HashMap;

use bindplan_annotations::{Annotation, ArgRef, ArgSelection, DirectiveKind, ManualPlacement};
use bindplan_ast::{DeclId, DeclKind, Declaration, TranslationUnit};
use bindplan_foundation::{Diagnostic, Diagnostics, Error, ErrorKind};

/// Parsed annotations of every declaration in a unit.
#[derive(Clone, Debug, Default)]
pub struct AnnotationTable {
    annotations: HashMap<DeclId, Annotation>,
    empty: Annotation,
}

impl AnnotationTable {
    /// Parses and validates the annotations of every declaration.
    ///
    /// # Errors
    /// Returns every parse, argument, and placement error found, each
    /// attached to its declaration.
    pub fn build(
        unit: &TranslationUnit,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<Self, Vec<Error>> {
        let mut annotations = HashMap::with_capacity(unit.len());
        let mut errors = Vec::new();

        for decl in unit.declarations() {
            if decl.annotations.is_empty() {
                continue;
            }
            let at = |e: Error| e.at(decl.display_name(), decl.location.clone());
            match Annotation::from_payloads(&decl.annotations, decl.target()) {
                Ok(ann) => {
                    let before = errors.len();
                    errors.extend(check_arguments(decl, &ann, diagnostics).into_iter().map(at));
                    if let Err(e) = check_placement(unit, decl, &ann) {
                        errors.push(at(e));
                    }
                    if errors.len() == before && !ann.is_empty() {
                        annotations.insert(decl.id, ann);
                    }
                }
                Err(e) => errors.push(at(e)),
            }
        }

        log::debug!(
            "parsed annotations of {} declarations ({} errors)",
            annotations.len(),
            errors.len()
        );
        if errors.is_empty() {
            Ok(Self {
                annotations,
                empty: Annotation::default(),
            })
        } else {
            Err(errors)
        }
    }

    /// Returns the annotation of a declaration; unannotated ones get the
    /// all-unset annotation.
    #[must_use]
    pub fn get(&self, id: DeclId) -> &Annotation {
        self.annotations.get(&id).unwrap_or(&self.empty)
    }

    /// Returns the number of declarations with a non-empty annotation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    /// Returns true if no declaration is annotated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Resolves argument references against the declaration's signature.
fn check_arguments(decl: &Declaration, ann: &Annotation, diagnostics: &mut Diagnostics) -> Vec<Error> {
    // Function templates carry no signature; their instantiations are checked
    // when descriptors are built.
    let Some(signature) = decl.kind.signature() else {
        return Vec::new();
    };
    let params = signature.param_names();
    let has_this = decl.kind.has_this();
    let mut errors = Vec::new();
    let mut check = |directive: DirectiveKind, arg: &ArgRef| -> Option<u32> {
        let resolved = arg.resolve(&params, has_this);
        if resolved.is_none() {
            errors.push(Error::new(ErrorKind::UnknownArgument {
                directive: directive.name().to_string(),
                argument: arg.to_string(),
            }));
        }
        resolved
    };

    for (nurse, patient) in &ann.keep_alive {
        check(DirectiveKind::KeepAlive, nurse);
        check(DirectiveKind::KeepAlive, patient);
    }
    let mut non_params = Vec::new();
    if let Some(ArgSelection::Only(args)) = &ann.noconvert {
        for arg in args {
            if let Some(index) = check(DirectiveKind::NoConvert, arg) {
                if index < 1 + u32::from(has_this) {
                    non_params.push((DirectiveKind::NoConvert, arg.clone()));
                }
            }
        }
    }
    for arg in &ann.required {
        if let Some(index) = check(DirectiveKind::Required, arg) {
            if index < 1 + u32::from(has_this) {
                non_params.push((DirectiveKind::Required, arg.clone()));
            }
        }
    }

    for (directive, arg) in non_params {
        diagnostics.warn(
            Diagnostic::warning(
                "ignored-directive",
                format!("'{directive}' has no effect on '{arg}', which is not a parameter"),
            )
            .at(decl.display_name(), decl.location.clone()),
        );
    }
    errors
}

/// `early` and `postamble` blocks must sit directly in the root.
fn check_placement(
    unit: &TranslationUnit,
    decl: &Declaration,
    ann: &Annotation,
) -> bindplan_foundation::Result<()> {
    let placement = match ann.placement {
        Some(ManualPlacement::Early) => "early",
        Some(ManualPlacement::Postamble) => "postamble",
        _ => return Ok(()),
    };
    let at_root = decl
        .parent
        .and_then(|p| unit.get(p))
        .is_some_and(|p| matches!(p.kind, DeclKind::TranslationUnit));
    if at_root {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::MisplacedManualBlock {
            placement: placement.to_string(),
        }))
    }
}
