//! Plain-mapping query options.
//!
//! [`QueryOptions`] mirrors the nested option objects a higher-level API
//! passes around:
//!
//! ```json
//! {
//!   "model": "Task",
//!   "where": { "title": { "$like": "%death star%" } },
//!   "include": [{ "model": "Project", "include": [
//!     { "model": "User", "where": { "username": "leia" } }
//!   ]}],
//!   "order": ["id"],
//!   "limit": 10
//! }
//! ```
//!
//! The shape is checked twice: unknown keys are rejected while
//! deserializing, and operator values are checked when the options are
//! converted into a [`SelectQuery`] or [`DeleteQuery`]. Nothing is deferred
//! to rendering.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::condition::{col, ColumnRef, Condition, Operand, Operator};
use crate::error::{CompileError, Result};
use crate::include::Include;
use crate::query::{DeleteQuery, Direction, RowLimit, SelectQuery, Target};
use crate::schema::TableRef;
use crate::value::SqlValue;

/// Options of a select, delete or truncate call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueryOptions {
    /// Registered entity the query runs against.
    pub model: Option<String>,
    /// Bare table, `schema.table` allowed.
    pub table: Option<String>,
    /// Filter mapping.
    #[serde(rename = "where")]
    pub filter: Option<Value>,
    /// Includes.
    #[serde(default)]
    pub include: Vec<IncludeOptions>,
    /// ORDER BY terms.
    #[serde(default)]
    pub order: Vec<OrderOption>,
    /// Row limit. An explicit `null` is kept apart from an absent key:
    /// deletes without the key use the dialect's default limit.
    #[serde(default, deserialize_with = "present")]
    pub limit: Option<Option<u64>>,
    /// Rows to skip.
    pub offset: Option<u64>,
    /// Truncate instead of delete.
    #[serde(default)]
    pub truncate: bool,
    /// Truncate with CASCADE.
    #[serde(default)]
    pub cascade: bool,
    /// Truncate with RESTART IDENTITY.
    #[serde(default)]
    pub restart_identity: bool,
}

/// One include of [`QueryOptions::include`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncludeOptions {
    /// Included entity.
    pub model: Option<String>,
    /// Association alias.
    #[serde(rename = "as")]
    pub alias: Option<String>,
    /// Filter on the included entity.
    #[serde(rename = "where")]
    pub filter: Option<Value>,
    /// Whether a match is required.
    pub required: Option<bool>,
    /// Nested includes.
    #[serde(default)]
    pub include: Vec<IncludeOptions>,
}

/// One ORDER BY term: `"col"`, `"-col"` or `["col", "DESC"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OrderOption {
    /// Column name, descending when prefixed with `-`.
    Column(String),
    /// Column name and direction.
    Directed(String, String),
}

/// Marks a key that is present, possibly as `null`.
fn present<'de, D, T>(deserializer: D) -> core::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl QueryOptions {
    /// Parses options from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidOptions`] if the text is not a valid
    /// options object.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| CompileError::InvalidOptions(e.to_string()))
    }

    fn target(&self) -> Result<Target> {
        match (&self.model, &self.table) {
            (_, Some(table)) => Ok(Target::Table(TableRef::parse(table))),
            (Some(model), None) => Ok(Target::Entity(model.clone())),
            (None, None) => Err(CompileError::InvalidOptions(String::from(
                "either 'model' or 'table' is required",
            ))),
        }
    }

    /// Converts into a select intent.
    ///
    /// A `model` takes precedence over a `table` for selects.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidOptions`] for truncate flags, a
    /// missing target, or a malformed filter or order, and
    /// [`CompileError::InvalidInclude`] for a malformed include.
    pub fn into_select(self) -> Result<SelectQuery> {
        if self.truncate || self.cascade || self.restart_identity {
            return Err(CompileError::InvalidOptions(String::from(
                "truncate options only apply to deletes",
            )));
        }
        let target = match &self.model {
            Some(model) => Target::Entity(model.clone()),
            None => self.target()?,
        };
        let mut query = SelectQuery::new(target);
        if let Some(filter) = &self.filter {
            query = query.filter(parse_where(filter)?);
        }
        for include in self.include {
            query = query.include(include.into_include()?);
        }
        for term in &self.order {
            let (column, direction) = term.parse()?;
            query = query.order_by(column, direction);
        }
        query.limit = self.limit.flatten();
        query.offset = self.offset;
        Ok(query)
    }

    /// Converts into a delete or truncate intent.
    ///
    /// With both `table` and `model`, the table is deleted from and the
    /// model supplies the primary key.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidOptions`] for includes, order or
    /// offset, a missing target, or a malformed filter.
    pub fn into_delete(self) -> Result<DeleteQuery> {
        if !self.include.is_empty() || !self.order.is_empty() || self.offset.is_some() {
            return Err(CompileError::InvalidOptions(String::from(
                "include, order and offset do not apply to deletes",
            )));
        }
        let mut query = DeleteQuery::new(self.target()?);
        query.model = self.model.clone();
        if let Some(filter) = &self.filter {
            query = query.filter(parse_where(filter)?);
        }
        query.limit = match self.limit {
            None => RowLimit::DialectDefault,
            Some(None) => RowLimit::Unlimited,
            Some(Some(n)) => RowLimit::Rows(n),
        };
        query.truncate = self.truncate;
        query.cascade = self.cascade;
        query.restart_identity = self.restart_identity;
        Ok(query)
    }
}

impl IncludeOptions {
    /// Converts into a validated [`Include`].
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidInclude`] when neither `model` nor
    /// `as` is given, and [`CompileError::InvalidOptions`] for a malformed
    /// filter.
    pub fn into_include(self) -> Result<Include> {
        let mut include = match (&self.model, &self.alias) {
            (Some(model), Some(alias)) => Include::new(model).alias(alias),
            (Some(model), None) => Include::new(model),
            (None, Some(alias)) => Include::association(alias),
            (None, None) => {
                return Err(CompileError::InvalidInclude(String::from(
                    "include needs 'model' or 'as'",
                )))
            }
        };
        if let Some(filter) = &self.filter {
            include = include.filter(parse_where(filter)?);
        }
        if let Some(required) = self.required {
            include = include.required(required);
        }
        for child in self.include {
            include = include.include(child.into_include()?);
        }
        include.validate()?;
        Ok(include)
    }
}

impl OrderOption {
    fn parse(&self) -> Result<(ColumnRef, Direction)> {
        match self {
            Self::Column(name) => match name.strip_prefix('-') {
                Some(name) => Ok((column_path(name), Direction::Desc)),
                None => Ok((column_path(name), Direction::Asc)),
            },
            Self::Directed(name, direction) => {
                let direction = if direction.eq_ignore_ascii_case("asc") {
                    Direction::Asc
                } else if direction.eq_ignore_ascii_case("desc") {
                    Direction::Desc
                } else {
                    return Err(CompileError::InvalidOptions(format!(
                        "unknown order direction '{direction}'"
                    )));
                };
                Ok((column_path(name), direction))
            }
        }
    }
}

/// Parses a `where` mapping into a condition.
///
/// Scalars compare for equality, arrays test membership and `null` tests
/// for NULL. A key wrapped in `$` (`$Project.User.username$`) refers to a
/// column of an included association.
///
/// # Errors
///
/// Returns [`CompileError::InvalidOptions`] for anything else.
pub fn parse_where(value: &Value) -> Result<Condition> {
    let map = value
        .as_object()
        .ok_or_else(|| invalid(format!("'where' must be an object, got {value}")))?;
    parse_mapping(map)
}

fn parse_mapping(map: &Map<String, Value>) -> Result<Condition> {
    let mut parts = Vec::with_capacity(map.len());
    for (key, value) in map {
        let part = match key.as_str() {
            "$and" => Condition::all(parse_each(key, value)?),
            "$or" => Condition::any(parse_each(key, value)?),
            "$not" => parse_where(value)?.not(),
            _ if is_operator(key) => {
                return Err(invalid(format!("operator '{key}' needs a column")));
            }
            _ => parse_column(column_key(key), value)?,
        };
        parts.push(part);
    }
    Ok(match parts.len() {
        1 => parts.remove(0),
        _ => Condition::all(parts),
    })
}

fn parse_each(key: &str, value: &Value) -> Result<Vec<Condition>> {
    match value {
        Value::Array(items) => items.iter().map(parse_where).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let mut single = Map::new();
                single.insert(k.clone(), v.clone());
                parse_mapping(&single)
            })
            .collect(),
        other => Err(invalid(format!("'{key}' expects an array, got {other}"))),
    }
}

fn parse_column(column: ColumnRef, value: &Value) -> Result<Condition> {
    match value {
        Value::Null => Ok(column.is_null()),
        Value::Array(_) => Condition::compare(
            column,
            Operator::In,
            Operand::List(list("$in", value)?),
        ),
        Value::Object(ops) => {
            let parts = ops
                .iter()
                .map(|(op, operand)| parse_operator(column.clone(), op, operand))
                .collect::<Result<Vec<_>>>()?;
            Ok(match parts.len() {
                1 => parts.into_iter().next().unwrap_or_else(Condition::tautology),
                _ => Condition::all(parts),
            })
        }
        scalar => Condition::compare(
            column,
            Operator::Eq,
            Operand::Value(scalar_value("$eq", scalar)?),
        ),
    }
}

fn parse_operator(column: ColumnRef, op: &str, operand: &Value) -> Result<Condition> {
    let operator = match op {
        "$eq" => Operator::Eq,
        "$ne" => Operator::Ne,
        "$gt" => Operator::Gt,
        "$gte" => Operator::Gte,
        "$lt" => Operator::Lt,
        "$lte" => Operator::Lte,
        "$like" => Operator::Like,
        "$notLike" => Operator::NotLike,
        "$iLike" => Operator::ILike,
        "$notILike" => Operator::NotILike,
        "$in" => Operator::In,
        "$notIn" => Operator::NotIn,
        "$between" => Operator::Between,
        "$notBetween" => Operator::NotBetween,
        other => return Err(invalid(format!("unknown operator '{other}'"))),
    };
    let operand = match operator {
        Operator::In | Operator::NotIn => Operand::List(list(op, operand)?),
        Operator::Between | Operator::NotBetween => match list(op, operand)?.as_slice() {
            [low, high] => Operand::Range(low.clone(), high.clone()),
            _ => return Err(invalid(format!("'{op}' expects two bounds"))),
        },
        Operator::Eq | Operator::Ne if operand.is_array() => Operand::List(list(op, operand)?),
        _ => Operand::Value(scalar_value(op, operand)?),
    };
    Condition::compare(column, operator, operand)
}

fn list(op: &str, value: &Value) -> Result<Vec<SqlValue>> {
    value
        .as_array()
        .ok_or_else(|| invalid(format!("'{op}' expects an array, got {value}")))?
        .iter()
        .map(|item| scalar_value(op, item))
        .collect()
}

fn scalar_value(op: &str, value: &Value) -> Result<SqlValue> {
    SqlValue::from_json(value)
        .ok_or_else(|| invalid(format!("'{op}' expects a scalar, got {value}")))
}

fn is_operator(key: &str) -> bool {
    key.starts_with('$') && !(key.len() > 2 && key.ends_with('$'))
}

/// `$Project.User.username$` refers to `username` on alias `Project->User`.
fn column_key(key: &str) -> ColumnRef {
    match key
        .strip_prefix('$')
        .and_then(|k| k.strip_suffix('$'))
        .filter(|k| !k.is_empty())
    {
        Some(path) => column_path(path),
        None => col(key),
    }
}

/// `Project.User.title` refers to `title` on alias `Project->User`.
fn column_path(path: &str) -> ColumnRef {
    match path.rsplit_once('.') {
        Some((alias, name)) => ColumnRef::qualified(&alias.replace('.', "->"), name),
        None => col(path),
    }
}

fn invalid(message: String) -> CompileError {
    CompileError::InvalidOptions(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_arrays_and_null() {
        assert_eq!(parse_where(&json!({ "name": "foo" })).unwrap(), col("name").eq("foo"));
        assert_eq!(
            parse_where(&json!({ "id": [1, 2] })).unwrap(),
            col("id").in_list(vec![1, 2])
        );
        assert_eq!(
            parse_where(&json!({ "deleted": null })).unwrap(),
            col("deleted").is_null()
        );
        assert_eq!(parse_where(&json!({})).unwrap(), Condition::tautology());

        match parse_where(&json!({ "a": 1, "b": 2 })).unwrap() {
            Condition::Logical { children, .. } => assert_eq!(children.len(), 2),
            other => panic!("expected a conjunction, got {other:?}"),
        }
    }

    #[test]
    fn test_operators() {
        let cond = parse_where(&json!({ "age": { "$gte": 18, "$lt": 65 } })).unwrap();
        assert_eq!(cond, col("age").gte(18).and(col("age").lt(65)));

        let cond = parse_where(&json!({ "age": { "$between": [1, 9] } })).unwrap();
        assert_eq!(cond, col("age").between(1, 9));

        let cond = parse_where(&json!({ "id": { "$ne": [1] } })).unwrap();
        assert_eq!(cond, col("id").not_in_list(vec![1]));
    }

    #[test]
    fn test_logical_keys() {
        let cond = parse_where(&json!({ "$or": [{ "a": 1 }, { "b": 2 }] })).unwrap();
        assert_eq!(cond, col("a").eq(1).or(col("b").eq(2)));

        let cond = parse_where(&json!({ "$not": { "c": 3 } })).unwrap();
        assert_eq!(cond, col("c").eq(3).not());

        let cond = parse_where(&json!({ "$and": [{ "a": 1 }, { "$or": [{ "b": 2 }, { "c": 3 }] }] }))
            .unwrap();
        assert_eq!(
            cond,
            Condition::all(vec![col("a").eq(1), col("b").eq(2).or(col("c").eq(3))])
        );
    }

    #[test]
    fn test_nested_column_key() {
        let cond = parse_where(&json!({ "$Project.User.username$": "leia" })).unwrap();
        assert_eq!(cond, ColumnRef::qualified("Project->User", "username").eq("leia"));
    }

    #[test]
    fn test_malformed_where_rejected() {
        for bad in [
            json!([1]),
            json!({ "a": { "$regex": "x" } }),
            json!({ "a": { "$in": 3 } }),
            json!({ "a": { "$between": [1] } }),
            json!({ "a": { "$eq": { "b": 1 } } }),
            json!({ "$gt": 3 }),
        ] {
            assert!(
                matches!(parse_where(&bad), Err(CompileError::InvalidOptions(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = QueryOptions::from_json(r#"{ "model": "User", "limt": 3 }"#).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOptions(_)));
    }

    #[test]
    fn test_into_select() {
        let options = QueryOptions::from_json(
            r#"{
                "model": "Task",
                "include": [{ "model": "Project", "include": [
                    { "model": "User", "where": { "username": "leia" } }
                ]}],
                "order": ["-id", ["title", "asc"], "Project.title"],
                "limit": 10
            }"#,
        )
        .unwrap();
        let query = options.into_select().unwrap();
        assert_eq!(query.target, Target::Entity(String::from("Task")));
        assert_eq!(query.includes.len(), 1);
        assert!(query.includes[0].is_required());
        assert_eq!(query.order[0].direction, Direction::Desc);
        assert_eq!(query.order[1].direction, Direction::Asc);
        assert_eq!(query.order[2].column, ColumnRef::qualified("Project", "title"));
        assert_eq!(query.limit, Some(10));
    }

    #[test]
    fn test_into_delete() {
        let options = QueryOptions::from_json(
            r#"{ "table": "public.test_users", "model": "User",
                 "where": {}, "truncate": true, "cascade": true, "limit": 10 }"#,
        )
        .unwrap();
        let query = options.into_delete().unwrap();
        assert_eq!(
            query.target,
            Target::Table(TableRef::new("test_users").with_schema("public"))
        );
        assert_eq!(query.model.as_deref(), Some("User"));
        assert!(query.truncate && query.cascade);
        assert_eq!(query.limit, RowLimit::Rows(10));

        let options = QueryOptions::from_json(r#"{ "table": "t", "order": ["id"] }"#).unwrap();
        assert!(options.into_delete().is_err());

        let options = QueryOptions::from_json(r#"{ "limit": null }"#).unwrap();
        assert!(options.into_delete().is_err());
    }

    #[test]
    fn test_absent_and_null_limit_differ() {
        let limit = |text: &str| {
            QueryOptions::from_json(text)
                .unwrap()
                .into_delete()
                .unwrap()
                .limit
        };
        assert_eq!(limit(r#"{ "table": "t" }"#), RowLimit::DialectDefault);
        assert_eq!(limit(r#"{ "table": "t", "limit": null }"#), RowLimit::Unlimited);
        assert_eq!(limit(r#"{ "table": "t", "limit": 4 }"#), RowLimit::Rows(4));

        let select = QueryOptions::from_json(r#"{ "table": "t", "limit": null }"#)
            .unwrap()
            .into_select()
            .unwrap();
        assert_eq!(select.limit, None);
    }

    #[test]
    fn test_include_needs_a_name() {
        let options = QueryOptions::from_json(r#"{ "model": "User", "include": [{}] }"#).unwrap();
        assert!(matches!(
            options.into_select(),
            Err(CompileError::InvalidInclude(_))
        ));
    }
}
