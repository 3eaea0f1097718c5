//! Dialect SQL emitter.
//!
//! A [`QueryCompiler`] binds a [`Dialect`] to a frozen [`Schema`] and turns
//! statement intents into SQL text. All dialect differences come from the
//! dialect's [`DialectSpec`](crate::dialect::DialectSpec) table.
//!
//! ```rust
//! use oxide_query_core::{DeleteQuery, Dialect, QueryCompiler, Schema};
//! use oxide_query_core::condition::col;
//!
//! let schema = Schema::builder().build().unwrap();
//! let compiler = QueryCompiler::new(Dialect::MySql, &schema);
//! let query = DeleteQuery::from_table("logs").filter(col("level").eq("debug")).limit(100);
//!
//! let compiled = compiler.compile_delete(&query).unwrap();
//! assert_eq!(compiled.sql(), "DELETE FROM `logs` WHERE `level` = 'debug' LIMIT 100");
//! ```

mod delete;
mod select;

use core::fmt;

use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::query::Statement;
use crate::schema::{Schema, TableRef};

/// Compiled SQL: one statement, or several to run in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    statements: Vec<String>,
    affected_rows: Option<usize>,
}

impl CompiledQuery {
    pub(crate) fn single(sql: String) -> Self {
        Self {
            statements: vec![sql],
            affected_rows: None,
        }
    }

    /// Returns the statements in execution order.
    #[must_use]
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Returns the index of the statement whose result carries the number
    /// of affected rows, when the dialect reports it through a separate
    /// query.
    #[must_use]
    pub const fn affected_rows_statement(&self) -> Option<usize> {
        self.affected_rows
    }

    /// Renders the SQL text. Several statements are joined by `; ` and
    /// terminated by `;`.
    #[must_use]
    pub fn sql(&self) -> String {
        match self.statements.as_slice() {
            [single] => single.clone(),
            many => format!("{};", many.join("; ")),
        }
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql())
    }
}

/// Compiles statement intents for one dialect.
///
/// The compiler only reads the schema, so any number of compilers may share
/// one schema across threads.
#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler<'a> {
    dialect: Dialect,
    schema: &'a Schema,
}

impl<'a> QueryCompiler<'a> {
    /// Creates a compiler.
    #[must_use]
    pub const fn new(dialect: Dialect, schema: &'a Schema) -> Self {
        Self { dialect, schema }
    }

    /// Returns the target dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Compiles any statement intent.
    ///
    /// # Errors
    ///
    /// See [`QueryCompiler::compile_select`] and
    /// [`QueryCompiler::compile_delete`].
    pub fn compile(&self, statement: &Statement) -> Result<CompiledQuery> {
        match statement {
            Statement::Select(query) => self.compile_select(query),
            Statement::Delete(query) => self.compile_delete(query),
        }
    }

    fn table(&self, table: &TableRef) -> String {
        self.dialect.quote_table(table)
    }

    fn render(&self, condition: &Condition) -> String {
        condition.render(self.dialect)
    }
}

/// Drops conditions that constrain nothing.
fn non_empty(condition: Option<&Condition>) -> Option<&Condition> {
    condition.filter(|c| !c.is_empty())
}
