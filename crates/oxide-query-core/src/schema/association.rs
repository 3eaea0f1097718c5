//! Association edges between entities.

use serde::{Deserialize, Serialize};

/// Kind of association, seen from the source entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssociationKind {
    /// Many-to-one: the source holds the foreign key.
    BelongsTo,
    /// One-to-one: the target holds the foreign key.
    HasOne,
    /// One-to-many: the target holds the foreign key.
    HasMany,
    /// Many-to-many through a join table.
    BelongsToMany,
}

impl AssociationKind {
    /// Returns true when the foreign key lives on the source entity.
    #[must_use]
    pub const fn source_owns_key(self) -> bool {
        matches!(self, Self::BelongsTo)
    }
}

/// Join table of a many-to-many association.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Through {
    /// Name of the join entity.
    pub entity: String,
    /// Attribute on the join entity referencing the source.
    pub foreign_key: String,
    /// Attribute on the join entity referencing the target.
    pub other_key: String,
}

/// A directed association edge.
///
/// For [`AssociationKind::BelongsTo`] the foreign key is an attribute of the
/// source and references `key` on the target. For `HasOne`/`HasMany` the
/// foreign key is an attribute of the target and references `key` on the
/// source. For `BelongsToMany` both keys live on the [`Through`] entity and
/// `key`/`target_key` are the source and target primary keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Association {
    /// Name used to refer to the association from the source.
    pub alias: String,
    /// Source entity.
    pub source: String,
    /// Target entity.
    pub target: String,
    /// Kind of association.
    pub kind: AssociationKind,
    /// Foreign key attribute.
    pub foreign_key: String,
    /// Referenced key attribute (see type docs).
    pub key: String,
    /// Target key for many-to-many associations.
    pub target_key: Option<String>,
    /// Join table for many-to-many associations.
    pub through: Option<Through>,
}

/// Options for declaring an association.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationOptions {
    pub(crate) alias: Option<String>,
    pub(crate) foreign_key: Option<String>,
    pub(crate) key: Option<String>,
    pub(crate) through: Option<String>,
    pub(crate) other_key: Option<String>,
}

impl AssociationOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names the association. Defaults to the target entity name.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(String::from(alias));
        self
    }

    /// Sets the foreign key attribute.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: &str) -> Self {
        self.foreign_key = Some(foreign_key.to_owned());
        self
    }

    /// Sets the referenced key attribute. Defaults to the primary key.
    #[must_use]
    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_owned());
        self
    }

    /// Sets the join entity of a many-to-many association.
    #[must_use]
    pub fn through(mut self, through: &str) -> Self {
        self.through = Some(through.to_owned());
        self
    }

    /// Sets the join-table attribute referencing the target of a
    /// many-to-many association.
    #[must_use]
    pub fn other_key(mut self, other_key: &str) -> Self {
        self.other_key = Some(other_key.to_owned());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_owns_key() {
        assert!(AssociationKind::BelongsTo.source_owns_key());
        assert!(!AssociationKind::HasMany.source_owns_key());
        assert!(!AssociationKind::BelongsToMany.source_owns_key());
    }

    #[test]
    fn test_options_builder() {
        let opts = AssociationOptions::new()
            .alias("Owner")
            .foreign_key("owner_id");
        assert_eq!(opts.alias.as_deref(), Some("Owner"));
        assert_eq!(opts.foreign_key.as_deref(), Some("owner_id"));
        assert!(opts.through.is_none());
    }
}
