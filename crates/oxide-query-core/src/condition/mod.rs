//! Dialect-neutral condition trees.
//!
//! A [`Condition`] describes a WHERE/ON predicate without committing to any
//! dialect. Builders are pure: combining conditions returns a new tree and
//! never mutates a shared one.
//!
//! ```rust
//! use oxide_query_core::condition::col;
//! use oxide_query_core::Dialect;
//!
//! let filter = col("status")
//!     .eq("active")
//!     .and(col("age").gt(18).or(col("verified").eq(true)));
//!
//! assert_eq!(
//!     filter.render(Dialect::Postgres),
//!     "\"status\" = 'active' AND (\"age\" > 18 OR \"verified\" = true)"
//! );
//! ```

mod render;

use crate::error::{CompileError, Result};
use crate::schema::Entity;
use crate::value::{SqlValue, ToSqlValue};

/// Creates an unqualified column reference.
#[must_use]
pub fn col(name: &str) -> ColumnRef {
    ColumnRef {
        qualifier: None,
        name: String::from(name),
    }
}

/// A column reference, optionally qualified by a table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Table alias qualifier.
    pub qualifier: Option<String>,
    /// Attribute or column name.
    pub name: String,
}

impl ColumnRef {
    /// Creates a qualified column reference.
    #[must_use]
    pub fn qualified(qualifier: &str, name: &str) -> Self {
        Self {
            qualifier: Some(String::from(qualifier)),
            name: String::from(name),
        }
    }

    fn compare<T: ToSqlValue>(self, operator: Operator, value: T) -> Condition {
        Condition::comparison(self, operator, Operand::Value(value.to_sql_value()))
    }

    /// Creates an equality condition.
    #[must_use]
    pub fn eq<T: ToSqlValue>(self, value: T) -> Condition {
        self.compare(Operator::Eq, value)
    }

    /// Creates an inequality condition.
    #[must_use]
    pub fn ne<T: ToSqlValue>(self, value: T) -> Condition {
        self.compare(Operator::Ne, value)
    }

    /// Creates a greater-than condition.
    #[must_use]
    pub fn gt<T: ToSqlValue>(self, value: T) -> Condition {
        self.compare(Operator::Gt, value)
    }

    /// Creates a greater-than-or-equal condition.
    #[must_use]
    pub fn gte<T: ToSqlValue>(self, value: T) -> Condition {
        self.compare(Operator::Gte, value)
    }

    /// Creates a less-than condition.
    #[must_use]
    pub fn lt<T: ToSqlValue>(self, value: T) -> Condition {
        self.compare(Operator::Lt, value)
    }

    /// Creates a less-than-or-equal condition.
    #[must_use]
    pub fn lte<T: ToSqlValue>(self, value: T) -> Condition {
        self.compare(Operator::Lte, value)
    }

    /// Creates a LIKE condition.
    #[must_use]
    pub fn like<T: ToSqlValue>(self, pattern: T) -> Condition {
        self.compare(Operator::Like, pattern)
    }

    /// Creates a NOT LIKE condition.
    #[must_use]
    pub fn not_like<T: ToSqlValue>(self, pattern: T) -> Condition {
        self.compare(Operator::NotLike, pattern)
    }

    /// Creates a case-insensitive LIKE condition.
    #[must_use]
    pub fn ilike<T: ToSqlValue>(self, pattern: T) -> Condition {
        self.compare(Operator::ILike, pattern)
    }

    /// Creates a case-insensitive NOT LIKE condition.
    #[must_use]
    pub fn not_ilike<T: ToSqlValue>(self, pattern: T) -> Condition {
        self.compare(Operator::NotILike, pattern)
    }

    /// Creates an IS NULL condition.
    #[must_use]
    pub fn is_null(self) -> Condition {
        self.compare(Operator::Eq, SqlValue::Null)
    }

    /// Creates an IS NOT NULL condition.
    #[must_use]
    pub fn is_not_null(self) -> Condition {
        self.compare(Operator::Ne, SqlValue::Null)
    }

    /// Creates an IN condition.
    #[must_use]
    pub fn in_list<T: ToSqlValue>(self, values: Vec<T>) -> Condition {
        let values = values.into_iter().map(ToSqlValue::to_sql_value).collect();
        Condition::comparison(self, Operator::In, Operand::List(values))
    }

    /// Creates a NOT IN condition.
    #[must_use]
    pub fn not_in_list<T: ToSqlValue>(self, values: Vec<T>) -> Condition {
        let values = values.into_iter().map(ToSqlValue::to_sql_value).collect();
        Condition::comparison(self, Operator::NotIn, Operand::List(values))
    }

    /// Creates a BETWEEN condition.
    #[must_use]
    pub fn between<T: ToSqlValue, U: ToSqlValue>(self, low: T, high: U) -> Condition {
        Condition::comparison(
            self,
            Operator::Between,
            Operand::Range(low.to_sql_value(), high.to_sql_value()),
        )
    }

    /// Compares this column with another column.
    #[must_use]
    pub fn eq_column(self, other: Self) -> Condition {
        Condition::comparison(self, Operator::Eq, Operand::Column(other))
    }

    fn resolve(&self, qualifier: Option<&str>, entity: Option<&Entity>) -> Self {
        if self.qualifier.is_some() {
            return self.clone();
        }
        let name = entity.map_or(self.name.as_str(), |e| e.column_name(&self.name));
        Self {
            qualifier: qualifier.map(String::from),
            name: String::from(name),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=` / `<>`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `ILIKE` or its emulation
    ILike,
    /// `NOT ILIKE` or its emulation
    NotILike,
    /// `IN (...)`
    In,
    /// `NOT IN (...)`
    NotIn,
    /// `BETWEEN a AND b`
    Between,
    /// `NOT BETWEEN a AND b`
    NotBetween,
}

impl Operator {
    /// Returns true for operators that negate their positive form.
    #[must_use]
    pub const fn is_negated(self) -> bool {
        matches!(
            self,
            Self::Ne | Self::NotLike | Self::NotILike | Self::NotIn | Self::NotBetween
        )
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A single literal.
    Value(SqlValue),
    /// A list of literals (membership).
    List(Vec<SqlValue>),
    /// Inclusive range bounds.
    Range(SqlValue, SqlValue),
    /// Another column.
    Column(ColumnRef),
}

/// Logical combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// All children hold.
    And,
    /// Any child holds.
    Or,
    /// The conjunction of the children does not hold.
    Not,
}

/// A dialect-neutral predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column operator value`
    Comparison {
        /// Left-hand column.
        column: ColumnRef,
        /// Operator.
        operator: Operator,
        /// Right-hand operand.
        value: Operand,
    },
    /// Logical combination of children.
    Logical {
        /// Combinator.
        combinator: Combinator,
        /// Children in order.
        children: Vec<Condition>,
    },
    /// Pre-escaped SQL emitted verbatim.
    ///
    /// The engine cannot verify this text; keeping it free of untrusted
    /// input is the caller's responsibility.
    Raw(String),
}

impl Condition {
    /// Creates a comparison.
    ///
    /// A list operand implies membership: `Eq` becomes `In` and `Ne`
    /// becomes `NotIn`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidCondition`] when a list is paired with
    /// an operator other than equality or membership, a range with anything
    /// but `Between`/`NotBetween`, or a `Between` with a single operand.
    pub fn compare(column: ColumnRef, operator: Operator, value: Operand) -> Result<Self> {
        let operator = match (&value, operator) {
            (Operand::List(_), Operator::Eq | Operator::In) => Operator::In,
            (Operand::List(_), Operator::Ne | Operator::NotIn) => Operator::NotIn,
            (Operand::Range(..), op @ (Operator::Between | Operator::NotBetween)) => op,
            (Operand::Value(_) | Operand::Column(_), op)
                if !matches!(op, Operator::Between | Operator::NotBetween) =>
            {
                op
            }
            (value, op) => {
                let kind = match value {
                    Operand::Value(_) => "a single value",
                    Operand::List(_) => "a list",
                    Operand::Range(..) => "a range",
                    Operand::Column(_) => "a column",
                };
                return Err(CompileError::InvalidCondition(format!(
                    "{op:?} on '{}' cannot take {kind}",
                    column.name
                )));
            }
        };
        Ok(Self::comparison(column, operator, value))
    }

    fn comparison(column: ColumnRef, operator: Operator, value: Operand) -> Self {
        Self::Comparison {
            column,
            operator,
            value,
        }
    }

    /// Conjunction of all conditions.
    #[must_use]
    pub fn all(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Logical {
            combinator: Combinator::And,
            children: children.into_iter().collect(),
        }
    }

    /// Disjunction of all conditions.
    #[must_use]
    pub fn any(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Logical {
            combinator: Combinator::Or,
            children: children.into_iter().collect(),
        }
    }

    /// A condition that always holds.
    #[must_use]
    pub const fn tautology() -> Self {
        Self::Logical {
            combinator: Combinator::And,
            children: Vec::new(),
        }
    }

    /// Raw SQL fragment, emitted verbatim.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    /// Combines with AND, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.combine(Combinator::And, other)
    }

    /// Combines with OR, flattening nested disjunctions.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.combine(Combinator::Or, other)
    }

    /// Negates the condition.
    #[must_use]
    pub fn not(self) -> Self {
        Self::Logical {
            combinator: Combinator::Not,
            children: vec![self],
        }
    }

    fn combine(self, combinator: Combinator, other: Self) -> Self {
        let mut children = self.into_operands(combinator);
        children.extend(other.into_operands(combinator));
        Self::Logical {
            combinator,
            children,
        }
    }

    fn into_operands(self, combinator: Combinator) -> Vec<Self> {
        match self {
            Self::Logical {
                combinator: c,
                children,
            } if c == combinator => children,
            other => vec![other],
        }
    }

    /// Returns true when the condition is an empty conjunction or
    /// disjunction, i.e. it constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Logical {
                combinator: Combinator::And | Combinator::Or,
                children,
            } => children.iter().all(Self::is_empty),
            _ => false,
        }
    }

    /// Rewrites unqualified columns to be qualified by `qualifier` and maps
    /// attribute names to physical column names using `entity`.
    ///
    /// Already-qualified columns are left untouched.
    #[must_use]
    pub fn resolve(&self, qualifier: Option<&str>, entity: Option<&Entity>) -> Self {
        match self {
            Self::Comparison {
                column,
                operator,
                value,
            } => Self::Comparison {
                column: column.resolve(qualifier, entity),
                operator: *operator,
                value: match value {
                    Operand::Column(other) => Operand::Column(other.resolve(qualifier, entity)),
                    other => other.clone(),
                },
            },
            Self::Logical {
                combinator,
                children,
            } => Self::Logical {
                combinator: *combinator,
                children: children
                    .iter()
                    .map(|c| c.resolve(qualifier, entity))
                    .collect(),
            },
            Self::Raw(sql) => Self::Raw(sql.clone()),
        }
    }

    /// Rewrites every column reference, on either side of a comparison,
    /// with `f`. Raw fragments are left untouched.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map_columns<E, F>(&self, f: &mut F) -> core::result::Result<Self, E>
    where
        F: FnMut(&ColumnRef) -> core::result::Result<ColumnRef, E>,
    {
        Ok(match self {
            Self::Comparison {
                column,
                operator,
                value,
            } => Self::Comparison {
                column: f(column)?,
                operator: *operator,
                value: match value {
                    Operand::Column(other) => Operand::Column(f(other)?),
                    other => other.clone(),
                },
            },
            Self::Logical {
                combinator,
                children,
            } => Self::Logical {
                combinator: *combinator,
                children: children
                    .iter()
                    .map(|c| c.try_map_columns(f))
                    .collect::<core::result::Result<_, E>>()?,
            },
            Self::Raw(sql) => Self::Raw(sql.clone()),
        })
    }
}
