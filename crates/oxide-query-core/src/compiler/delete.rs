//! DELETE and TRUNCATE emission.

use tracing::debug;

use super::{non_empty, CompiledQuery, QueryCompiler};
use crate::condition::Condition;
use crate::dialect::{DeleteLimit, RowIdentity, SubqueryLimit};
use crate::error::{CompileError, Result};
use crate::query::{DeleteQuery, RowLimit, Target};
use crate::schema::{Entity, TableRef};

impl QueryCompiler<'_> {
    /// Compiles a DELETE or TRUNCATE intent.
    ///
    /// Limited deletes use the dialect's native syntax when it has one and
    /// a row-identity subquery otherwise. Truncates degrade to a plain
    /// `DELETE FROM` on dialects without `TRUNCATE`.
    ///
    /// # Errors
    ///
    /// - [`CompileError::UnknownEntity`] if the target or model is not
    ///   registered.
    /// - [`CompileError::MissingIdentity`] for a limited delete that needs
    ///   the primary key on a target without a model.
    /// - [`CompileError::UnsupportedFeature`] for `RESTART IDENTITY` on a
    ///   dialect that cannot truncate.
    pub fn compile_delete(&self, query: &DeleteQuery) -> Result<CompiledQuery> {
        let (table, model) = match &query.target {
            Target::Entity(name) => {
                let entity = self.schema.entity(name)?;
                (entity.table_ref().clone(), Some(entity))
            }
            Target::Table(table) => {
                let model = query
                    .model
                    .as_deref()
                    .map(|name| self.schema.entity(name))
                    .transpose()?;
                (table.clone(), model)
            }
        };

        if query.truncate {
            return self.compile_truncate(query, &table);
        }

        let filter = non_empty(query.filter.as_ref()).map(|f| f.resolve(None, model));
        let limit = match query.limit {
            RowLimit::Unlimited => None,
            RowLimit::DialectDefault => self.dialect.spec().default_delete_limit,
            RowLimit::Rows(n) => Some(n),
        };
        let sql = match limit {
            None => self.plain_delete(&table, filter.as_ref()),
            Some(limit) => self.limited_delete(&table, model, filter.as_ref(), limit)?,
        };
        debug!(dialect = %self.dialect, sql = %sql, "Compiled delete");

        match self.dialect.spec().row_count_query {
            Some(count) => Ok(CompiledQuery {
                statements: vec![sql, String::from(count)],
                affected_rows: Some(1),
            }),
            None => Ok(CompiledQuery::single(sql)),
        }
    }

    fn plain_delete(&self, table: &TableRef, filter: Option<&Condition>) -> String {
        let mut sql = format!("DELETE FROM {}", self.table(table));
        if let Some(filter) = filter {
            sql.push_str(" WHERE ");
            sql.push_str(&self.render(filter));
        }
        sql
    }

    fn limited_delete(
        &self,
        table: &TableRef,
        model: Option<&Entity>,
        filter: Option<&Condition>,
        limit: u64,
    ) -> Result<String> {
        match self.dialect.spec().delete_limit {
            DeleteLimit::Trailing => Ok(format!(
                "{} LIMIT {limit}",
                self.plain_delete(table, filter)
            )),
            DeleteLimit::Top => {
                let mut sql = format!("DELETE TOP({limit}) FROM {}", self.table(table));
                if let Some(filter) = filter {
                    sql.push_str(" WHERE ");
                    sql.push_str(&self.render(filter));
                }
                Ok(sql)
            }
            DeleteLimit::Subquery { identity, limit: placement } => {
                let (columns, identity) = self.row_identity(identity, table, model)?;
                let quoted = self.table(table);
                let inner = match placement {
                    SubqueryLimit::Trailing => {
                        let mut inner = format!("SELECT {columns} FROM {quoted}");
                        if let Some(filter) = filter {
                            inner.push_str(" WHERE ");
                            inner.push_str(&self.render(filter));
                        }
                        inner.push_str(&format!(" LIMIT {limit}"));
                        inner
                    }
                    SubqueryLimit::RowNum => {
                        let mut inner =
                            format!("SELECT {columns} FROM {quoted} WHERE rownum <= {limit}");
                        if let Some(filter) = filter {
                            inner.push_str(" AND ");
                            inner.push_str(&filter.render_conjunct(self.dialect));
                        }
                        inner
                    }
                };
                Ok(format!(
                    "DELETE FROM {quoted} WHERE {identity} IN ({inner})"
                ))
            }
        }
    }

    /// Renders the identity used to correlate a limited delete, as the
    /// subquery's select list and as the outer comparison operand. A
    /// composite primary key becomes a row value in the comparison.
    fn row_identity(
        &self,
        identity: RowIdentity,
        table: &TableRef,
        model: Option<&Entity>,
    ) -> Result<(String, String)> {
        let missing = || CompileError::MissingIdentity {
            table: table.name.clone(),
            dialect: self.dialect.name(),
        };
        match identity {
            RowIdentity::RowId(name) => Ok((String::from(name), String::from(name))),
            RowIdentity::PrimaryKey => {
                let columns: Vec<String> = model
                    .ok_or_else(missing)?
                    .primary_key()
                    .map(|a| self.dialect.quote_identifier(a.column_name()))
                    .collect();
                match columns.as_slice() {
                    [] => Err(missing()),
                    [single] => Ok((single.clone(), single.clone())),
                    many => {
                        let list = many.join(", ");
                        let row = format!("({list})");
                        Ok((list, row))
                    }
                }
            }
        }
    }

    fn compile_truncate(&self, query: &DeleteQuery, table: &TableRef) -> Result<CompiledQuery> {
        let truncate = self.dialect.spec().truncate;
        let sql = match truncate.keyword {
            None => {
                if query.restart_identity {
                    return Err(CompileError::UnsupportedFeature {
                        dialect: self.dialect.name(),
                        feature: "RESTART IDENTITY",
                    });
                }
                debug!(dialect = %self.dialect, "Truncate degraded to a full delete");
                format!("DELETE FROM {}", self.table(table))
            }
            Some(keyword) => {
                let mut sql = format!("{keyword} {}", self.table(table));
                if query.restart_identity {
                    if truncate.restart_identity {
                        sql.push_str(" RESTART IDENTITY");
                    } else {
                        debug!(dialect = %self.dialect, "Dropped RESTART IDENTITY");
                    }
                }
                if query.cascade {
                    if truncate.cascade {
                        sql.push_str(" CASCADE");
                    } else {
                        debug!(dialect = %self.dialect, "Dropped CASCADE");
                    }
                }
                sql
            }
        };
        debug!(dialect = %self.dialect, sql = %sql, "Compiled truncate");
        Ok(CompiledQuery::single(sql))
    }
}

#[cfg(test)]
mod tests {
    use crate::condition::{col, Condition};
    use crate::dialect::Dialect;
    use crate::error::CompileError;
    use crate::query::DeleteQuery;
    use crate::schema::{Attribute, DataType, Entity, Schema};
    use crate::QueryCompiler;

    fn schema() -> Schema {
        Schema::builder()
            .entity(
                Entity::new("Membership")
                    .table("memberships")
                    .attribute(Attribute::new("user_id", DataType::Integer).primary_key())
                    .attribute(Attribute::new("group_id", DataType::Integer).primary_key()),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_composite_primary_key_uses_row_value() {
        let schema = schema();
        let sql = QueryCompiler::new(Dialect::Postgres, &schema)
            .compile_delete(&DeleteQuery::from_entity("Membership").limit(5))
            .unwrap()
            .sql();
        assert_eq!(
            sql,
            "DELETE FROM \"memberships\" WHERE (\"user_id\", \"group_id\") IN \
             (SELECT \"user_id\", \"group_id\" FROM \"memberships\" LIMIT 5)"
        );
    }

    #[test]
    fn test_rownum_keeps_precedence() {
        let schema = schema();
        let query = DeleteQuery::from_table("logs")
            .filter(col("a").eq(1).or(col("b").eq(2)))
            .limit(3);
        let sql = QueryCompiler::new(Dialect::Oracle, &schema)
            .compile_delete(&query)
            .unwrap()
            .sql();
        assert_eq!(
            sql,
            "DELETE FROM logs WHERE rowid IN (SELECT rowid FROM logs WHERE rownum <= 3 AND (a = 1 OR b = 2))"
        );
    }

    #[test]
    fn test_rownum_parenthesizes_raw_filter() {
        let schema = schema();
        let query = DeleteQuery::from_table("logs")
            .filter(Condition::raw("a = 1 OR b = 2"))
            .limit(3);
        let sql = QueryCompiler::new(Dialect::Oracle, &schema)
            .compile_delete(&query)
            .unwrap()
            .sql();
        assert_eq!(
            sql,
            "DELETE FROM logs WHERE rowid IN (SELECT rowid FROM logs WHERE rownum <= 3 AND (a = 1 OR b = 2))"
        );
    }

    #[test]
    fn test_composite_primary_key_with_filter() {
        let schema = schema();
        let query = DeleteQuery::from_entity("Membership")
            .filter(col("group_id").eq(7))
            .limit(2);
        let sql = QueryCompiler::new(Dialect::Postgres, &schema)
            .compile_delete(&query)
            .unwrap()
            .sql();
        assert_eq!(
            sql,
            "DELETE FROM \"memberships\" WHERE (\"user_id\", \"group_id\") IN \
             (SELECT \"user_id\", \"group_id\" FROM \"memberships\" WHERE \"group_id\" = 7 LIMIT 2)"
        );
    }

    #[test]
    fn test_dialect_default_limit() {
        let schema = schema();
        let query = DeleteQuery::from_table("logs")
            .filter(col("a").eq(1))
            .dialect_default_limit();
        let compile = |dialect| {
            QueryCompiler::new(dialect, &schema)
                .compile_delete(&query)
                .unwrap()
                .sql()
        };
        assert_eq!(compile(Dialect::MySql), "DELETE FROM `logs` WHERE `a` = 1 LIMIT 1");
        assert_eq!(compile(Dialect::Oracle), "DELETE FROM logs WHERE a = 1");
    }

    #[test]
    fn test_restart_identity_without_truncate_is_unsupported() {
        let schema = schema();
        let query = DeleteQuery::from_table("logs").truncate().restart_identity();
        let err = QueryCompiler::new(Dialect::Sqlite, &schema)
            .compile_delete(&query)
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::UnsupportedFeature {
                dialect: "sqlite",
                feature: "RESTART IDENTITY",
            }
        );
    }

    #[test]
    fn test_truncate_ignores_filter_and_limit() {
        let schema = schema();
        let query = DeleteQuery::from_table("logs")
            .filter(col("a").eq(1))
            .limit(3)
            .truncate();
        let sql = QueryCompiler::new(Dialect::MySql, &schema)
            .compile_delete(&query)
            .unwrap()
            .sql();
        assert_eq!(sql, "TRUNCATE `logs`");
    }
}
