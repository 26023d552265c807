//! A validated translation unit.

use std::collections::HashMap;

use bindplan_foundation::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::decl::{DeclId, DeclKind, Declaration};

/// On-disk form of a translation unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct UnitFile {
    declarations: Vec<Declaration>,
}

/// The declarations of one translation unit, in pre-order.
///
/// Construction checks the front-end contract: a single root of kind
/// `translation_unit` comes first, identifiers are unique, and every other
/// declaration names a parent that appears before it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "UnitFile", into = "UnitFile")]
pub struct TranslationUnit {
    declarations: Vec<Declaration>,
    index: HashMap<DeclId, usize>,
    children: HashMap<DeclId, Vec<DeclId>>,
}

impl TranslationUnit {
    /// Validates and indexes a list of declarations.
    ///
    /// # Errors
    /// Returns `MalformedInput` if the list violates the front-end contract.
    pub fn new(declarations: Vec<Declaration>) -> Result<Self> {
        let Some(first) = declarations.first() else {
            return Err(Error::malformed("translation unit has no declarations"));
        };
        if first.kind != DeclKind::TranslationUnit || first.parent.is_some() {
            return Err(Error::malformed(
                "the first declaration must be the translation unit root",
            ));
        }

        let mut index = HashMap::with_capacity(declarations.len());
        let mut children: HashMap<DeclId, Vec<DeclId>> = HashMap::new();
        for (position, decl) in declarations.iter().enumerate() {
            if index.insert(decl.id, position).is_some() {
                return Err(Error::malformed(format!("duplicate declaration id {}", decl.id)));
            }
            if position == 0 {
                continue;
            }
            let Some(parent) = decl.parent else {
                return Err(Error::malformed(format!(
                    "'{}' has no enclosing declaration",
                    decl.display_name()
                )));
            };
            let Some(&parent_position) = index.get(&parent) else {
                return Err(Error::malformed(format!(
                    "'{}' refers to parent {parent} which does not precede it",
                    decl.display_name()
                )));
            };
            if !declarations[parent_position].kind.is_context()
                && !matches!(declarations[parent_position].kind, DeclKind::ClassTemplate)
            {
                return Err(Error::malformed(format!(
                    "'{}' is nested in a {} which cannot own declarations",
                    decl.display_name(),
                    declarations[parent_position].kind.name()
                )));
            }
            if matches!(decl.kind, DeclKind::TranslationUnit) {
                return Err(Error::malformed("nested translation unit root"));
            }
            children.entry(parent).or_default().push(decl.id);
        }

        for list in children.values_mut() {
            list.sort_by_key(|id| (declarations[index[id]].order, *id));
        }

        Ok(Self {
            declarations,
            index,
            children,
        })
    }

    /// Parses a translation unit from JSON.
    ///
    /// # Errors
    /// Returns `MalformedInput` if the JSON does not describe a valid unit.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::malformed(e.to_string()))
    }

    /// Serializes the translation unit to pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `MalformedInput` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::malformed(e.to_string()))
    }

    /// Returns the root declaration.
    #[must_use]
    pub fn root(&self) -> &Declaration {
        &self.declarations[0]
    }

    /// Looks up a declaration.
    #[must_use]
    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.index.get(&id).map(|&i| &self.declarations[i])
    }

    /// Returns every declaration in pre-order.
    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Returns the direct children of a declaration, in source order.
    #[must_use]
    pub fn children(&self, id: DeclId) -> &[DeclId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Returns the number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns true if the unit holds only its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.len() <= 1
    }
}

impl TryFrom<UnitFile> for TranslationUnit {
    type Error = Error;

    fn try_from(file: UnitFile) -> Result<Self> {
        Self::new(file.declarations)
    }
}

impl From<TranslationUnit> for UnitFile {
    fn from(unit: TranslationUnit) -> Self {
        Self {
            declarations: unit.declarations,
        }
    }
}
