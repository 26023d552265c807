//! Error types for bindplan.
//!
//! Uses `thiserror` for ergonomic error definition with rich context. Every
//! [`ErrorKind`] has a stable [`category`](ErrorKind::category) string that
//! callers can match on without parsing messages.

use std::fmt;

use thiserror::Error;

use crate::location::Location;

/// The main error type for bindplan operations.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about which declaration the error refers to.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Attaches the offending declaration, keeping any notes already present.
    #[must_use]
    pub fn at(mut self, qualified_name: impl Into<String>, location: Location) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(
            context
                .with_declaration(qualified_name)
                .with_location(location),
        );
        self
    }

    /// Creates an unknown directive error.
    #[must_use]
    pub fn unknown_directive(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownDirective { name: name.into() })
    }

    /// Creates a bad value error.
    #[must_use]
    pub fn bad_value(directive: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadValue {
            directive: directive.into(),
            message: message.into(),
        })
    }

    /// Creates a wrong arity error.
    #[must_use]
    pub fn wrong_arity(directive: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        Self::new(ErrorKind::WrongArity {
            directive: directive.into(),
            expected: expected.into(),
            actual,
        })
    }

    /// Creates a malformed input error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedInput(message.into()))
    }

    /// Creates a cyclic dependency error naming the participants.
    #[must_use]
    pub fn cyclic_dependency(participants: Vec<String>) -> Self {
        Self::new(ErrorKind::CyclicDependency { participants })
    }

    /// Returns the stable category string of this error.
    #[must_use]
    pub fn category(&self) -> &'static str {
        self.kind.category()
    }

    /// Returns the location of the offending declaration, if known.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.context.as_ref().and_then(|c| c.location.as_ref())
    }

    /// Returns the qualified name of the offending declaration, if known.
    #[must_use]
    pub fn qualified_name(&self) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|c| c.qualified_name.as_deref())
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// An annotation names a directive that does not exist.
    #[error("unknown directive '{name}'")]
    UnknownDirective {
        /// The directive as spelled.
        name: String,
    },

    /// A directive argument has the wrong type or an unsupported value.
    #[error("bad value for '{directive}': {message}")]
    BadValue {
        /// The directive receiving the value.
        directive: String,
        /// What was wrong with it.
        message: String,
    },

    /// A directive received the wrong number of arguments.
    #[error("wrong number of arguments for '{directive}': expected {expected}, got {actual}")]
    WrongArity {
        /// The directive receiving the arguments.
        directive: String,
        /// Description of the accepted arity.
        expected: String,
        /// Number of arguments supplied.
        actual: usize,
    },

    /// The annotation text contains a character or token out of place.
    #[error("invalid token at column {column}: {message}")]
    InvalidToken {
        /// Description of the offending token.
        message: String,
        /// Column inside the annotation payload (1-indexed).
        column: u32,
    },

    /// An argument list was not closed.
    #[error("missing closing parenthesis after arguments of '{directive}'")]
    MissingClosingParen {
        /// The directive whose argument list is unterminated.
        directive: String,
    },

    /// A directive is not meaningful on this kind of declaration.
    #[error("'{directive}' cannot be applied to {declaration_kind}")]
    InvalidForDeclaration {
        /// The directive.
        directive: String,
        /// Human-readable kind of the annotated declaration.
        declaration_kind: String,
    },

    /// A name given to `expose_as` is not a valid identifier.
    #[error("'{spelling}' is not a valid identifier")]
    InvalidIdentifier {
        /// The rejected spelling.
        spelling: String,
    },

    /// An argument reference does not name a parameter of the callable.
    #[error("'{directive}' refers to unknown argument '{argument}'")]
    UnknownArgument {
        /// The directive containing the reference.
        directive: String,
        /// The reference as written.
        argument: String,
    },

    /// Two directives on the same declaration cannot be combined.
    #[error("'{first}' cannot be combined with '{second}'")]
    ConflictingDirectives {
        /// The first directive.
        first: String,
        /// The second directive.
        second: String,
    },

    /// Redeclarations of one entity carry contradicting annotations.
    #[error("redeclarations of '{name}' disagree on '{directive}'")]
    ConflictingRedeclarations {
        /// Qualified name of the entity.
        name: String,
        /// The contested directive.
        directive: String,
    },

    /// A declaration was relocated by more than one `expose_here`.
    #[error("'{name}' is already exposed elsewhere")]
    AlreadyExposedElsewhere {
        /// Qualified name of the relocated declaration.
        name: String,
    },

    /// A relocation names a context that does not exist.
    #[error("cannot expose '{name}' in unknown context '{target}'")]
    UnreachableExposure {
        /// Qualified name of the relocated declaration.
        name: String,
        /// The requested target context.
        target: String,
    },

    /// Contexts depend on each other in a cycle.
    #[error("cyclic dependency between {}", .participants.join(", "))]
    CyclicDependency {
        /// Qualified names of the contexts in the cycle.
        participants: Vec<String>,
    },

    /// Two distinct instantiations resolve to the same exposed name.
    #[error("duplicate instantiation name '{name}': {first} at {first_location} and {second} at {second_location}")]
    DuplicateInstantiationName {
        /// The colliding exposed name.
        name: String,
        /// Spelling of the first instantiation.
        first: String,
        /// Location of the first instantiation.
        first_location: Location,
        /// Spelling of the second instantiation.
        second: String,
        /// Location of the second instantiation.
        second_location: Location,
    },

    /// A class reaches itself through its base list.
    #[error("base class cycle through {}", .classes.join(" -> "))]
    BaseClassCycle {
        /// Classes along the cycle.
        classes: Vec<String>,
    },

    /// A property has a setter but no getter.
    #[error("property '{property}' has a setter but no getter")]
    SetterWithoutGetter {
        /// The property name.
        property: String,
    },

    /// A property has two getters or two setters.
    #[error("property '{property}' already has a {accessor}")]
    DuplicateProperty {
        /// The property name.
        property: String,
        /// `getter` or `setter`.
        accessor: String,
    },

    /// A manual block uses a placement only valid at the root.
    #[error("manual block placement '{placement}' is only valid at the translation unit root")]
    MisplacedManualBlock {
        /// The placement directive.
        placement: String,
    },

    /// A manual block is anchored to a member that does not exist.
    #[error("manual block anchor '{anchor}' does not name a member of its context")]
    UnknownAnchor {
        /// The anchor name.
        anchor: String,
    },

    /// The translation unit handed over by the front end is inconsistent.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl ErrorKind {
    /// Returns the stable, machine-checkable category of this kind.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownDirective { .. } => "parse-error/unknown-directive",
            Self::BadValue { .. } => "parse-error/bad-value",
            Self::WrongArity { .. } => "parse-error/wrong-arity",
            Self::InvalidToken { .. } => "parse-error/invalid-token",
            Self::MissingClosingParen { .. } => "parse-error/missing-closing-paren",
            Self::InvalidForDeclaration { .. } => "parse-error/invalid-for-declaration",
            Self::InvalidIdentifier { .. } => "parse-error/invalid-identifier",
            Self::UnknownArgument { .. } => "parse-error/unknown-argument",
            Self::ConflictingDirectives { .. } => "parse-error/conflicting-directives",
            Self::ConflictingRedeclarations { .. } => "conflicting-redeclarations",
            Self::AlreadyExposedElsewhere { .. } => "already-exposed-elsewhere",
            Self::UnreachableExposure { .. } => "unreachable-exposure",
            Self::CyclicDependency { .. } => "scheduling-error/cyclic-dependency",
            Self::DuplicateInstantiationName { .. } => "duplicate-instantiation-name",
            Self::BaseClassCycle { .. } => "base-class-cycle",
            Self::SetterWithoutGetter { .. } => "property/setter-without-getter",
            Self::DuplicateProperty { .. } => "property/duplicate",
            Self::MisplacedManualBlock { .. } => "manual-block/misplaced",
            Self::UnknownAnchor { .. } => "manual-block/unknown-anchor",
            Self::MalformedInput(_) => "malformed-input",
        }
    }

    /// Returns true for malformed annotation payloads.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        self.category().starts_with("parse-error/")
    }
}

/// A secondary message attached to an error, such as a previous location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// The note text.
    pub message: String,
    /// Where the note points, if anywhere.
    pub location: Option<Location>,
}

/// Context about which declaration an error refers to.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Qualified name of the offending declaration.
    pub qualified_name: Option<String>,
    /// Location of the offending declaration.
    pub location: Option<Location>,
    /// Additional notes, in the order they were added.
    pub notes: Vec<Note>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the offending declaration.
    #[must_use]
    pub fn with_declaration(mut self, qualified_name: impl Into<String>) -> Self {
        self.qualified_name = Some(qualified_name.into());
        self
    }

    /// Sets the source location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Adds a note.
    #[must_use]
    pub fn with_note(mut self, message: impl Into<String>, location: Option<Location>) -> Self {
        self.notes.push(Note {
            message: message.into(),
            location,
        });
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.qualified_name, &self.location) {
            (Some(name), Some(loc)) => write!(f, "in '{name}' at {loc}")?,
            (Some(name), None) => write!(f, "in '{name}'")?,
            (None, Some(loc)) => write!(f, "at {loc}")?,
            (None, None) => {}
        }
        for note in &self.notes {
            write!(f, "\n  note: {}", note.message)?;
            if let Some(loc) = &note.location {
                write!(f, " at {loc}")?;
            }
        }
        Ok(())
    }
}

/// Result type alias using bindplan's Error.
pub type Result<T> = std::result::Result<T, Error>;
