//! SELECT emission.

use tracing::debug;

use super::{non_empty, CompiledQuery, QueryCompiler};
use crate::condition::{ColumnRef, Condition};
use crate::dialect::SelectLimit;
use crate::error::{CompileError, Result};
use crate::planner::{JoinPlan, JoinPlanner, JoinType};
use crate::query::{OrderBy, SelectQuery, Target};
use crate::schema::{Entity, TableRef};

/// Largest row count accepted by MySQL, used for an offset without a limit.
const MYSQL_MAX_ROWS: &str = "18446744073709551615";

/// Resolved FROM clause of a select.
struct Root<'s> {
    table: TableRef,
    alias: Option<String>,
    entity: Option<&'s Entity>,
}

impl QueryCompiler<'_> {
    /// Compiles a SELECT intent, planning joins for its includes.
    ///
    /// # Errors
    ///
    /// Returns an error if the root entity is unknown, includes are given
    /// for a bare table, or the include tree cannot be planned.
    pub fn compile_select(&self, query: &SelectQuery) -> Result<CompiledQuery> {
        let root = match &query.target {
            Target::Entity(name) => {
                let entity = self.schema.entity(name)?;
                Root {
                    table: entity.table_ref().clone(),
                    alias: Some(name.clone()),
                    entity: Some(entity),
                }
            }
            Target::Table(table) => {
                if !query.includes.is_empty() {
                    return Err(CompileError::InvalidInclude(format!(
                        "table '{}' is not an entity and cannot include associations",
                        table.name
                    )));
                }
                Root {
                    table: table.clone(),
                    alias: None,
                    entity: None,
                }
            }
        };

        let plan = match &root.alias {
            Some(alias) => JoinPlanner::new(self.schema).plan(alias, &query.includes)?,
            None => JoinPlan {
                root_alias: String::new(),
                entries: Vec::new(),
            },
        };

        let spec = self.dialect.spec();
        let mut sql = String::from("SELECT ");
        if let (SelectLimit::TopOrFetch, Some(limit), None) =
            (spec.select_limit, query.limit, query.offset)
        {
            sql.push_str(&format!("TOP({limit}) "));
        }
        sql.push_str(&self.projection(&root, &plan)?);
        sql.push_str(" FROM ");
        sql.push_str(&self.table(&root.table));
        if let Some(alias) = &root.alias {
            sql.push_str(&self.table_alias(alias));
        }

        for entry in &plan.entries {
            let entity = self.schema.entity(&entry.entity)?;
            let on = match (&entry.attached_where, entry.join_type) {
                (Some(filter), JoinType::Left) => entry.on.clone().and(filter.clone()),
                _ => entry.on.clone(),
            };
            sql.push_str(&format!(
                " {} {}{} ON {}",
                entry.join_type.sql_keyword(),
                self.table(entity.table_ref()),
                self.table_alias(&entry.alias),
                self.render(&on)
            ));
        }

        let mut filters: Vec<Condition> = Vec::new();
        if let Some(filter) = non_empty(query.filter.as_ref()) {
            let filter = filter.try_map_columns(&mut |c| self.resolve_column(c, &root, &plan))?;
            filters.push(filter);
        }
        filters.extend(
            plan.entries
                .iter()
                .filter(|e| e.join_type == JoinType::Inner)
                .filter_map(|e| e.attached_where.clone()),
        );
        if !filters.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.render(&Condition::all(filters)));
        }

        if !query.order.is_empty() {
            let terms = query
                .order
                .iter()
                .map(|term| self.order_term(term, &root, &plan))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        sql.push_str(&self.select_limit(query));
        debug!(dialect = %self.dialect, sql = %sql, "Compiled select");
        Ok(CompiledQuery::single(sql))
    }

    fn table_alias(&self, alias: &str) -> String {
        if self.dialect.spec().table_alias_keyword {
            format!(" AS {}", self.dialect.quote_identifier(alias))
        } else {
            format!(" {}", self.dialect.quote_identifier(alias))
        }
    }

    fn projection(&self, root: &Root<'_>, plan: &JoinPlan) -> Result<String> {
        let (Some(entity), Some(alias)) = (root.entity, root.alias.as_deref()) else {
            return Ok(String::from("*"));
        };
        let q = |name: &str| self.dialect.quote_identifier(name);

        let mut columns: Vec<String> = entity
            .attributes()
            .iter()
            .map(|attr| {
                let column = format!("{}.{}", q(alias), q(attr.column_name()));
                if attr.column_name() == attr.name {
                    column
                } else {
                    format!("{column} AS {}", q(&attr.name))
                }
            })
            .collect();

        for entry in plan.entries.iter().filter(|e| !e.through) {
            let joined = self.schema.entity(&entry.entity)?;
            let prefix = entry.projection_prefix();
            columns.extend(joined.attributes().iter().map(|attr| {
                format!(
                    "{}.{} AS {}",
                    q(&entry.alias),
                    q(attr.column_name()),
                    q(&format!("{prefix}.{}", attr.name))
                )
            }));
        }
        Ok(columns.join(", "))
    }

    /// Maps a column of the top-level filter or ORDER BY to its physical
    /// column. Unqualified names belong to the root; qualified names to the
    /// entity joined under that alias. Unknown qualifiers pass through.
    fn resolve_column(
        &self,
        column: &ColumnRef,
        root: &Root<'_>,
        plan: &JoinPlan,
    ) -> Result<ColumnRef> {
        let Some(alias) = column.qualifier.as_deref() else {
            let name = root
                .entity
                .map_or(column.name.as_str(), |e| e.column_name(&column.name));
            return Ok(ColumnRef {
                qualifier: root.alias.clone(),
                name: String::from(name),
            });
        };
        if root.alias.as_deref() == Some(alias) {
            if let Some(entity) = root.entity {
                return Ok(ColumnRef::qualified(alias, entity.column_name(&column.name)));
            }
        }
        match plan.entry(alias) {
            Some(entry) => {
                let entity = self.schema.entity(&entry.entity)?;
                Ok(ColumnRef::qualified(alias, entity.column_name(&column.name)))
            }
            None => Ok(column.clone()),
        }
    }

    fn order_term(&self, term: &OrderBy, root: &Root<'_>, plan: &JoinPlan) -> Result<String> {
        let column = self.resolve_column(&term.column, root, plan)?;
        Ok(format!(
            "{} {}",
            column.render(self.dialect),
            term.direction.as_sql()
        ))
    }

    fn select_limit(&self, query: &SelectQuery) -> String {
        let (limit, offset) = (query.limit, query.offset);
        match self.dialect.spec().select_limit {
            SelectLimit::LimitOffset { unbounded } => match (limit, offset, unbounded) {
                (Some(n), Some(m), _) => format!(" LIMIT {n} OFFSET {m}"),
                (Some(n), None, _) => format!(" LIMIT {n}"),
                (None, Some(m), Some(all)) => format!(" LIMIT {all} OFFSET {m}"),
                (None, Some(m), None) => format!(" OFFSET {m}"),
                (None, None, _) => String::new(),
            },
            SelectLimit::LimitComma => match (limit, offset) {
                (Some(n), Some(m)) => format!(" LIMIT {m}, {n}"),
                (Some(n), None) => format!(" LIMIT {n}"),
                (None, Some(m)) => format!(" LIMIT {m}, {MYSQL_MAX_ROWS}"),
                (None, None) => String::new(),
            },
            SelectLimit::TopOrFetch => match offset {
                // TOP was emitted after SELECT.
                None => String::new(),
                Some(m) => {
                    let mut sql = String::new();
                    if query.order.is_empty() {
                        sql.push_str(" ORDER BY (SELECT NULL)");
                    }
                    sql.push_str(&format!(" OFFSET {m} ROWS"));
                    if let Some(n) = limit {
                        sql.push_str(&format!(" FETCH NEXT {n} ROWS ONLY"));
                    }
                    sql
                }
            },
            SelectLimit::OffsetFetch => {
                let mut sql = String::new();
                if let Some(m) = offset {
                    sql.push_str(&format!(" OFFSET {m} ROWS"));
                }
                if let Some(n) = limit {
                    sql.push_str(&format!(" FETCH NEXT {n} ROWS ONLY"));
                }
                sql
            }
        }
    }
}
