//! Error types for query compilation.
//!
//! Every error is raised before any SQL text is returned: a failed
//! compilation never yields a partial statement.

use thiserror::Error;

/// Broad classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller asked for something impossible given the schema or
    /// the dialect (missing identity, unknown association, ...).
    Configuration,
    /// The dialect has no equivalent for the requested capability and no
    /// safe degraded form exists.
    UnsupportedFeature,
}

/// Errors that can occur while building a schema or compiling a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A limited delete needs a row identity on this dialect, and none was
    /// supplied.
    #[error("cannot limit delete without identity reference (table '{table}', dialect {dialect})")]
    MissingIdentity {
        /// Target table.
        table: String,
        /// Dialect tag.
        dialect: &'static str,
    },

    /// No association connects the two entities.
    #[error("no association from '{source_entity}' to '{target}'")]
    MissingAssociation {
        /// Entity the include hangs off.
        source_entity: String,
        /// Entity or alias that was requested.
        target: String,
    },

    /// More than one association connects the two entities and the caller
    /// did not pick one by alias.
    #[error(
        "ambiguous association from '{source_entity}' to '{target}', use one of: {}",
        .candidates.join(", ")
    )]
    AmbiguousAssociation {
        /// Entity the include hangs off.
        source_entity: String,
        /// Requested target entity.
        target: String,
        /// Aliases of the candidate associations.
        candidates: Vec<String>,
    },

    /// The entity is not registered.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    /// An association refers to an attribute its owning entity lacks.
    #[error("entity '{entity}' has no attribute '{attribute}'")]
    UnknownAttribute {
        /// Entity name.
        entity: String,
        /// Attribute name.
        attribute: String,
    },

    /// An entity with the same name was registered twice.
    #[error("entity '{0}' is already registered")]
    DuplicateEntity(String),

    /// Two different associations share an alias on the same source.
    #[error("entity '{source_entity}' already has an association named '{alias}'")]
    DuplicateAssociation {
        /// Source entity.
        source_entity: String,
        /// Conflicting alias.
        alias: String,
    },

    /// An association declaration is incomplete or contradictory.
    #[error("invalid association: {0}")]
    InvalidAssociation(String),

    /// The include tree is malformed.
    #[error("invalid include: {0}")]
    InvalidInclude(String),

    /// A comparison pairs an operator with an operand it cannot take.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// Caller-supplied query options have an invalid shape.
    #[error("invalid query options: {0}")]
    InvalidOptions(String),

    /// The dialect cannot express the requested feature.
    #[error("{feature} is not supported by {dialect}")]
    UnsupportedFeature {
        /// Dialect tag.
        dialect: &'static str,
        /// Human-readable feature name.
        feature: &'static str,
    },
}

impl CompileError {
    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFeature { .. } => ErrorKind::UnsupportedFeature,
            _ => ErrorKind::Configuration,
        }
    }
}

/// Result type alias for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CompileError::MissingIdentity {
            table: String::from("users"),
            dialect: "postgres",
        };
        assert_eq!(
            err.to_string(),
            "cannot limit delete without identity reference (table 'users', dialect postgres)"
        );

        let err = CompileError::AmbiguousAssociation {
            source_entity: String::from("Task"),
            target: String::from("User"),
            candidates: vec![String::from("Owner"), String::from("Assignee")],
        };
        assert_eq!(
            err.to_string(),
            "ambiguous association from 'Task' to 'User', use one of: Owner, Assignee"
        );
    }

    #[test]
    fn test_error_kind() {
        let unsupported = CompileError::UnsupportedFeature {
            dialect: "sqlite",
            feature: "RESTART IDENTITY",
        };
        assert_eq!(unsupported.kind(), ErrorKind::UnsupportedFeature);
        assert_eq!(
            CompileError::UnknownEntity(String::from("Ghost")).kind(),
            ErrorKind::Configuration
        );
    }
}
