//! Statement intents.
//!
//! These are the dialect-neutral descriptions handed to the
//! [`QueryCompiler`](crate::QueryCompiler).

use crate::condition::{col, ColumnRef, Condition};
use crate::include::Include;
use crate::schema::TableRef;

/// What a statement reads from or deletes in: a registered entity or a bare
/// table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A registered entity; its table, columns and primary key come from
    /// the schema.
    Entity(String),
    /// A table unknown to the schema.
    Table(TableRef),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column, qualified by an include alias or relative to the root.
    pub column: ColumnRef,
    /// Direction.
    pub direction: Direction,
}

/// A SELECT intent.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Root target.
    pub target: Target,
    /// Top-level filter, relative to the root.
    pub filter: Option<Condition>,
    /// Eager-loaded associations.
    pub includes: Vec<Include>,
    /// ORDER BY terms.
    pub order: Vec<OrderBy>,
    /// Maximum number of rows.
    pub limit: Option<u64>,
    /// Rows to skip.
    pub offset: Option<u64>,
}

impl SelectQuery {
    /// Selects from `target`.
    #[must_use]
    pub const fn new(target: Target) -> Self {
        Self {
            target,
            filter: None,
            includes: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Selects from a registered entity.
    #[must_use]
    pub fn from_entity(entity: &str) -> Self {
        Self::new(Target::Entity(String::from(entity)))
    }

    /// Selects from a bare table (`schema.table` is split on the first dot).
    #[must_use]
    pub fn from_table(table: &str) -> Self {
        Self::new(Target::Table(TableRef::parse(table)))
    }

    /// Adds a filter, ANDed with any previous one.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Adds an include.
    #[must_use]
    pub fn include(mut self, include: Include) -> Self {
        self.includes.push(include);
        self
    }

    /// Adds an ORDER BY term.
    #[must_use]
    pub fn order_by(mut self, column: ColumnRef, direction: Direction) -> Self {
        self.order.push(OrderBy { column, direction });
        self
    }

    /// Orders by a root column, ascending.
    #[must_use]
    pub fn order_asc(self, column: &str) -> Self {
        self.order_by(col(column), Direction::Asc)
    }

    /// Orders by a root column, descending.
    #[must_use]
    pub fn order_desc(self, column: &str) -> Self {
        self.order_by(col(column), Direction::Desc)
    }

    /// Sets LIMIT.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets OFFSET.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Row limit of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowLimit {
    /// Delete every match.
    #[default]
    Unlimited,
    /// Use the dialect's default limit, unlimited where it has none.
    DialectDefault,
    /// Delete at most this many rows.
    Rows(u64),
}

/// A DELETE or TRUNCATE intent.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    /// Table to delete from.
    pub target: Target,
    /// Entity describing a bare table target; supplies the primary key for
    /// limited deletes. Ignored for entity targets.
    pub model: Option<String>,
    /// Filter.
    pub filter: Option<Condition>,
    /// Maximum number of rows to delete.
    pub limit: RowLimit,
    /// Truncate instead of delete. Filter and limit are ignored.
    pub truncate: bool,
    /// Truncate dependent tables too.
    pub cascade: bool,
    /// Reset identity sequences on truncate.
    pub restart_identity: bool,
}

impl DeleteQuery {
    /// Deletes from `target`.
    #[must_use]
    pub const fn new(target: Target) -> Self {
        Self {
            target,
            model: None,
            filter: None,
            limit: RowLimit::Unlimited,
            truncate: false,
            cascade: false,
            restart_identity: false,
        }
    }

    /// Deletes rows of a registered entity.
    #[must_use]
    pub fn from_entity(entity: &str) -> Self {
        Self::new(Target::Entity(String::from(entity)))
    }

    /// Deletes from a bare table (`schema.table` is split on the first dot).
    #[must_use]
    pub fn from_table(table: &str) -> Self {
        Self::new(Target::Table(TableRef::parse(table)))
    }

    /// Describes a bare table target with a registered entity.
    #[must_use]
    pub fn model(mut self, entity: &str) -> Self {
        self.model = Some(String::from(entity));
        self
    }

    /// Adds a filter, ANDed with any previous one.
    #[must_use]
    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = RowLimit::Rows(limit);
        self
    }

    /// Defers the row limit to the dialect's default.
    #[must_use]
    pub const fn dialect_default_limit(mut self) -> Self {
        self.limit = RowLimit::DialectDefault;
        self
    }

    /// Truncates the table instead of deleting rows.
    #[must_use]
    pub const fn truncate(mut self) -> Self {
        self.truncate = true;
        self
    }

    /// Requests `CASCADE` on truncate.
    #[must_use]
    pub const fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }

    /// Requests `RESTART IDENTITY` on truncate.
    #[must_use]
    pub const fn restart_identity(mut self) -> Self {
        self.restart_identity = true;
        self
    }
}

/// Any statement intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT.
    Select(SelectQuery),
    /// DELETE or TRUNCATE.
    Delete(DeleteQuery),
}

impl From<SelectQuery> for Statement {
    fn from(query: SelectQuery) -> Self {
        Self::Select(query)
    }
}

impl From<DeleteQuery> for Statement {
    fn from(query: DeleteQuery) -> Self {
        Self::Delete(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_accumulate() {
        let query = SelectQuery::from_entity("Task")
            .filter(col("a").eq(1))
            .filter(col("b").eq(2));
        assert_eq!(query.filter, Some(col("a").eq(1).and(col("b").eq(2))));
    }

    #[test]
    fn test_from_table_splits_schema() {
        let query = DeleteQuery::from_table("public.test_users").truncate().cascade();
        assert_eq!(
            query.target,
            Target::Table(TableRef::new("test_users").with_schema("public"))
        );
        assert!(query.truncate && query.cascade && !query.restart_identity);
        assert!(query.model.is_none());
        assert_eq!(query.limit, RowLimit::Unlimited);
    }

    #[test]
    fn test_delete_limit_builders() {
        let query = DeleteQuery::from_entity("User").limit(3);
        assert_eq!(query.limit, RowLimit::Rows(3));
        assert_eq!(
            query.dialect_default_limit().limit,
            RowLimit::DialectDefault
        );
    }
}
