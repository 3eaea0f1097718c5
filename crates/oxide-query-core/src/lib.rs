//! # oxide-query-core
//!
//! A dialect-neutral query compiler for relational databases.
//!
//! This crate provides:
//! - A recursive condition model rendered with per-dialect escaping
//! - An association graph between entity definitions
//! - An eager-load join planner that deduplicates nested includes and keeps
//!   every filter on its own alias
//! - A table-driven SQL emitter for PostgreSQL, MySQL, SQL Server, SQLite
//!   and Oracle, including limited-delete emulation and truncate fallbacks
//!
//! ## Compiling a query
//!
//! ```rust
//! use oxide_query_core::condition::col;
//! use oxide_query_core::schema::{AssociationOptions, Attribute, DataType, Entity};
//! use oxide_query_core::{Dialect, Include, QueryCompiler, Schema, SelectQuery};
//!
//! let schema = Schema::builder()
//!     .entity(Entity::new("User").attribute(Attribute::new("username", DataType::Text)))
//!     .entity(Entity::new("Task").attribute(Attribute::new("title", DataType::Text)))
//!     .belongs_to("Task", "User", AssociationOptions::new())
//!     .build()
//!     .unwrap();
//!
//! let query = SelectQuery::from_entity("Task")
//!     .include(Include::new("User").filter(col("username").eq("leia")));
//! let sql = QueryCompiler::new(Dialect::Postgres, &schema)
//!     .compile_select(&query)
//!     .unwrap()
//!     .sql();
//!
//! assert!(sql.contains("INNER JOIN \"User\" AS \"User\""));
//! assert!(sql.ends_with("WHERE \"User\".\"username\" = 'leia'"));
//! ```
//!
//! ## SQL Injection Prevention
//!
//! Every value is escaped by the target dialect before it reaches SQL text:
//!
//! ```rust
//! use oxide_query_core::condition::col;
//! use oxide_query_core::Dialect;
//!
//! let cond = col("name").eq("'; DROP TABLE users; --");
//! assert_eq!(cond.render(Dialect::Sqlite), "`name` = '''; DROP TABLE users; --'");
//! ```

pub mod compiler;
pub mod condition;
pub mod dialect;
pub mod error;
pub mod include;
pub mod options;
pub mod planner;
pub mod query;
pub mod schema;
pub mod value;

pub use compiler::{CompiledQuery, QueryCompiler};
pub use condition::{col, ColumnRef, Condition};
pub use dialect::Dialect;
pub use error::{CompileError, ErrorKind, Result};
pub use include::Include;
pub use options::QueryOptions;
pub use planner::{JoinPlan, JoinPlanEntry, JoinPlanner, JoinType};
pub use query::{DeleteQuery, Direction, RowLimit, SelectQuery, Statement, Target};
pub use schema::{Entity, Schema, SchemaBuilder};
pub use value::{SqlValue, ToSqlValue};
