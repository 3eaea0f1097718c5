//! Rendering of condition trees into dialect SQL.

use super::{ColumnRef, Combinator, Condition, Operand, Operator};
use crate::dialect::Dialect;
use crate::value::SqlValue;

const TAUTOLOGY: &str = "1=1";
const CONTRADICTION: &str = "1=0";

impl ColumnRef {
    /// Renders the quoted, possibly qualified, column.
    #[must_use]
    pub fn render(&self, dialect: Dialect) -> String {
        match &self.qualifier {
            Some(q) => format!(
                "{}.{}",
                dialect.quote_identifier(q),
                dialect.quote_identifier(&self.name)
            ),
            None => dialect.quote_identifier(&self.name),
        }
    }
}

impl Condition {
    /// Renders the condition for `dialect`.
    ///
    /// Every literal passes through the dialect's escaping. An empty
    /// conjunction or disjunction renders as `1=1`.
    #[must_use]
    pub fn render(&self, dialect: Dialect) -> String {
        match self {
            Self::Comparison {
                column,
                operator,
                value,
            } => render_comparison(dialect, column, *operator, value),
            Self::Logical {
                combinator: Combinator::Not,
                children,
            } => {
                if children.is_empty() {
                    return String::from(TAUTOLOGY);
                }
                let inner = render_joined(dialect, Combinator::And, children);
                format!("NOT ({inner})")
            }
            Self::Logical {
                combinator,
                children,
            } => {
                if children.is_empty() {
                    return String::from(TAUTOLOGY);
                }
                render_joined(dialect, *combinator, children)
            }
            Self::Raw(sql) => sql.clone(),
        }
    }

    /// Renders the condition as one operand of a larger conjunction,
    /// parenthesized when its own operators would bind differently.
    #[must_use]
    pub fn render_conjunct(&self, dialect: Dialect) -> String {
        render_child(dialect, self, Combinator::And, 2)
    }
}

fn render_joined(dialect: Dialect, combinator: Combinator, children: &[Condition]) -> String {
    let separator = if combinator == Combinator::Or {
        " OR "
    } else {
        " AND "
    };
    children
        .iter()
        .map(|child| render_child(dialect, child, combinator, children.len()))
        .collect::<Vec<_>>()
        .join(separator)
}

fn render_child(dialect: Dialect, child: &Condition, parent: Combinator, siblings: usize) -> String {
    let child = collapse(child);
    let sql = child.render(dialect);
    if siblings > 1 && needs_parens(child, parent) {
        format!("({sql})")
    } else {
        sql
    }
}

/// A collapsed child next to siblings needs parentheses when it is a
/// multi-term AND/OR under a different combinator, or raw SQL whose
/// operators are unknown.
fn needs_parens(child: &Condition, parent: Combinator) -> bool {
    match child {
        Condition::Logical {
            combinator: c @ (Combinator::And | Combinator::Or),
            children,
        } => *c != parent && children.len() > 1,
        Condition::Raw(_) => true,
        _ => false,
    }
}

/// Unwraps single-child AND/OR nodes, which render as their only child.
fn collapse(condition: &Condition) -> &Condition {
    match condition {
        Condition::Logical {
            combinator: Combinator::And | Combinator::Or,
            children,
        } if children.len() == 1 => collapse(&children[0]),
        other => other,
    }
}

fn render_comparison(
    dialect: Dialect,
    column: &ColumnRef,
    operator: Operator,
    value: &Operand,
) -> String {
    let lhs = column.render(dialect);
    let spec = dialect.spec();

    match value {
        Operand::Value(SqlValue::Null) => {
            if operator.is_negated() {
                format!("{lhs} IS NOT NULL")
            } else {
                format!("{lhs} IS NULL")
            }
        }
        Operand::List(values) => render_membership(dialect, &lhs, operator, values),
        Operand::Range(low, high) => {
            let keyword = if operator.is_negated() {
                "NOT BETWEEN"
            } else {
                "BETWEEN"
            };
            format!(
                "{lhs} {keyword} {} AND {}",
                dialect.literal(low),
                dialect.literal(high)
            )
        }
        Operand::Value(v) => {
            let rhs = dialect.literal(v);
            match operator {
                Operator::In | Operator::NotIn => {
                    render_membership(dialect, &lhs, operator, core::slice::from_ref(v))
                }
                Operator::ILike | Operator::NotILike => match spec.case_insensitive_like {
                    Some(op) if operator == Operator::ILike => format!("{lhs} {op} {rhs}"),
                    Some(op) => format!("{lhs} NOT {op} {rhs}"),
                    None => {
                        let keyword = if operator.is_negated() {
                            "NOT LIKE"
                        } else {
                            "LIKE"
                        };
                        format!("LOWER({lhs}) {keyword} LOWER({rhs})")
                    }
                },
                _ => format!("{lhs} {} {rhs}", operator_token(dialect, operator)),
            }
        }
        Operand::Column(other) => format!(
            "{lhs} {} {}",
            operator_token(dialect, operator),
            other.render(dialect)
        ),
    }
}

fn render_membership(dialect: Dialect, lhs: &str, operator: Operator, values: &[SqlValue]) -> String {
    let negated = operator.is_negated();
    if values.is_empty() {
        return String::from(if negated { TAUTOLOGY } else { CONTRADICTION });
    }
    let list = values
        .iter()
        .map(|v| dialect.literal(v))
        .collect::<Vec<_>>()
        .join(", ");
    if negated {
        format!("{lhs} NOT IN ({list})")
    } else {
        format!("{lhs} IN ({list})")
    }
}

fn operator_token(dialect: Dialect, operator: Operator) -> &'static str {
    match operator {
        Operator::Eq | Operator::In | Operator::Between => "=",
        Operator::Ne | Operator::NotIn | Operator::NotBetween => dialect.spec().not_equal,
        Operator::Gt => ">",
        Operator::Gte => ">=",
        Operator::Lt => "<",
        Operator::Lte => "<=",
        Operator::Like | Operator::ILike => "LIKE",
        Operator::NotLike | Operator::NotILike => "NOT LIKE",
    }
}

#[cfg(test)]
mod tests {
    use crate::condition::{col, ColumnRef, Condition};
    use crate::dialect::Dialect;

    #[test]
    fn test_simple_comparisons() {
        let d = Dialect::Postgres;
        assert_eq!(col("name").eq("foo").render(d), "\"name\" = 'foo'");
        assert_eq!(col("age").gte(18).render(d), "\"age\" >= 18");
        assert_eq!(col("age").ne(3).render(d), "\"age\" != 3");
        assert_eq!(col("age").ne(3).render(Dialect::MsSql), "[age] <> 3");
    }

    #[test]
    fn test_null_forces_is_null() {
        let d = Dialect::Sqlite;
        assert_eq!(col("deleted_at").eq(None::<i32>).render(d), "`deleted_at` IS NULL");
        assert_eq!(col("deleted_at").ne(None::<i32>).render(d), "`deleted_at` IS NOT NULL");
        assert_eq!(col("deleted_at").gt(None::<i32>).render(d), "`deleted_at` IS NULL");
        assert_eq!(col("deleted_at").is_not_null().render(d), "`deleted_at` IS NOT NULL");
    }

    #[test]
    fn test_membership() {
        let d = Dialect::MySql;
        assert_eq!(col("id").in_list(vec![1, 2, 3]).render(d), "`id` IN (1, 2, 3)");
        assert_eq!(col("id").not_in_list(vec![1]).render(d), "`id` NOT IN (1)");
        assert_eq!(col("id").in_list(Vec::<i32>::new()).render(d), "1=0");
        assert_eq!(col("id").not_in_list(Vec::<i32>::new()).render(d), "1=1");
    }

    #[test]
    fn test_between() {
        assert_eq!(
            col("age").between(18, 65).render(Dialect::Postgres),
            "\"age\" BETWEEN 18 AND 65"
        );
    }

    #[test]
    fn test_ilike_fallback() {
        assert_eq!(
            col("name").ilike("%lei%").render(Dialect::Postgres),
            "\"name\" ILIKE '%lei%'"
        );
        assert_eq!(
            col("name").not_ilike("%lei%").render(Dialect::Postgres),
            "\"name\" NOT ILIKE '%lei%'"
        );
        assert_eq!(
            col("name").ilike("%lei%").render(Dialect::Sqlite),
            "LOWER(`name`) LIKE LOWER('%lei%')"
        );
    }

    #[test]
    fn test_precedence_parentheses() {
        let d = Dialect::Postgres;
        let cond = col("a").eq(1).and(col("b").eq(2).or(col("c").eq(3)));
        assert_eq!(cond.render(d), "\"a\" = 1 AND (\"b\" = 2 OR \"c\" = 3)");

        let cond = col("a").eq(1).or(col("b").eq(2).and(col("c").eq(3)));
        assert_eq!(cond.render(d), "\"a\" = 1 OR (\"b\" = 2 AND \"c\" = 3)");

        let cond = Condition::all(vec![Condition::any(vec![col("a").eq(1)]), col("b").eq(2)]);
        assert_eq!(cond.render(d), "\"a\" = 1 AND \"b\" = 2");
    }

    #[test]
    fn test_single_child_wrapper_keeps_parentheses() {
        let inner = Condition::all(vec![col("a").eq(1).or(col("b").eq(2))]);
        let cond = Condition::all(vec![inner, col("c").eq(3)]);
        assert_eq!(
            cond.render(Dialect::Postgres),
            "(\"a\" = 1 OR \"b\" = 2) AND \"c\" = 3"
        );
    }

    #[test]
    fn test_raw_fragment_keeps_its_precedence() {
        let d = Dialect::Postgres;
        let raw = Condition::raw("a = 1 OR b = 2");
        assert_eq!(raw.render(d), "a = 1 OR b = 2");
        assert_eq!(
            raw.clone().and(col("c").eq(3)).render(d),
            "(a = 1 OR b = 2) AND \"c\" = 3"
        );
        assert_eq!(
            Condition::all(vec![raw.clone()]).render(d),
            "a = 1 OR b = 2"
        );
        assert_eq!(raw.render_conjunct(d), "(a = 1 OR b = 2)");
        assert_eq!(col("c").eq(3).render_conjunct(d), "\"c\" = 3");
    }

    #[test]
    fn test_not_of_disjunction() {
        let cond = col("a").eq(1).or(col("b").eq(2)).not();
        assert_eq!(
            cond.render(Dialect::Postgres),
            "NOT (\"a\" = 1 OR \"b\" = 2)"
        );
    }

    #[test]
    fn test_not() {
        let cond = col("a").eq(1).and(col("b").eq(2)).not();
        assert_eq!(
            cond.render(Dialect::Postgres),
            "NOT (\"a\" = 1 AND \"b\" = 2)"
        );
    }

    #[test]
    fn test_empty_logical_is_tautology() {
        assert_eq!(Condition::tautology().render(Dialect::Oracle), "1=1");
        assert_eq!(Condition::any(vec![]).render(Dialect::Oracle), "1=1");
    }

    #[test]
    fn test_qualified_columns() {
        let cond = ColumnRef::qualified("Project->User", "id")
            .eq_column(ColumnRef::qualified("Project", "UserId"));
        assert_eq!(
            cond.render(Dialect::Postgres),
            "\"Project->User\".\"id\" = \"Project\".\"UserId\""
        );
    }

    #[test]
    fn test_values_never_escape_literal() {
        let payload = "x'); DELETE FROM users; --";
        for dialect in Dialect::ALL {
            let sql = col("name").eq(payload).render(dialect);
            assert!(!sql.contains("x');"), "{dialect}: {sql}");
        }
    }
}
