//! Include trees for eager loading.
//!
//! An [`Include`] names a related entity (or an association alias) to join
//! alongside its parent, with an optional filter and nested includes:
//!
//! ```rust
//! use oxide_query_core::condition::col;
//! use oxide_query_core::Include;
//!
//! // Tasks whose project belongs to leia.
//! let include = Include::new("Project")
//!     .include(Include::new("User").filter(col("username").eq("leia")));
//! assert!(include.is_required());
//! ```

use crate::condition::Condition;
use crate::error::{CompileError, Result};

/// One node of an include tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    entity: Option<String>,
    alias: Option<String>,
    filter: Option<Condition>,
    required: Option<bool>,
    children: Vec<Include>,
}

impl Include {
    /// Includes the single association leading to `entity`.
    #[must_use]
    pub fn new(entity: &str) -> Self {
        Self {
            entity: Some(String::from(entity)),
            alias: None,
            filter: None,
            required: None,
            children: Vec::new(),
        }
    }

    /// Includes the association named `alias`.
    #[must_use]
    pub fn association(alias: &str) -> Self {
        Self {
            entity: None,
            alias: Some(String::from(alias)),
            filter: None,
            required: None,
            children: Vec::new(),
        }
    }

    /// Picks the association by alias when several lead to the same entity.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(String::from(alias));
        self
    }

    /// Filters the included rows. Columns are resolved against the included
    /// entity, not the root.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(condition);
        self
    }

    /// Sets whether a matching row is required.
    ///
    /// Defaults to true when the include carries a filter.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Adds a nested include.
    #[must_use]
    pub fn include(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the target entity, if named.
    #[must_use]
    pub fn entity_name(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    /// Returns the association alias, if named.
    #[must_use]
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Returns the filter, ignoring one that constrains nothing.
    #[must_use]
    pub fn filter_condition(&self) -> Option<&Condition> {
        self.filter.as_ref().filter(|c| !c.is_empty())
    }

    /// Returns the explicit required flag.
    #[must_use]
    pub const fn required_flag(&self) -> Option<bool> {
        self.required
    }

    /// Returns the nested includes.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Returns true when this node, taken alone, must match a row: it is
    /// flagged required or, without a flag, carries a filter.
    #[must_use]
    pub fn requires_match(&self) -> bool {
        self.required
            .unwrap_or_else(|| self.filter_condition().is_some())
    }

    /// Returns true when this node or any descendant must match a row.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.requires_match() || self.children.iter().any(Self::is_required)
    }

    /// Checks the shape of the tree.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidInclude`] when a node names neither an
    /// entity nor an alias, or names an empty one.
    pub fn validate(&self) -> Result<()> {
        fn named(s: &Option<String>) -> Option<&str> {
            s.as_deref().map(str::trim)
        }
        match (named(&self.entity), named(&self.alias)) {
            (None, None) => {
                return Err(CompileError::InvalidInclude(String::from(
                    "include must name an entity or an association",
                )))
            }
            (Some(""), _) | (_, Some("")) => {
                return Err(CompileError::InvalidInclude(String::from(
                    "include names an empty entity or association",
                )))
            }
            _ => {}
        }
        self.children.iter().try_for_each(Self::validate)
    }
}
