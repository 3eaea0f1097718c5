//! PostgreSQL dialect table.

use super::{
    BlobLiteral, DeleteLimit, DialectSpec, IdentifierQuoting, RowIdentity, SelectLimit,
    StringEscape, SubqueryLimit, TimestampLiteral, Truncate,
};

pub(super) static SPEC: DialectSpec = DialectSpec {
    name: "postgres",
    identifiers: IdentifierQuoting::Always {
        open: '"',
        close: '"',
    },
    strings: StringEscape::DoubledQuote,
    national_strings: false,
    booleans: ("true", "false"),
    blobs: BlobLiteral::ByteaHex,
    timestamps: TimestampLiteral::Quoted,
    not_equal: "!=",
    case_insensitive_like: Some("ILIKE"),
    schema_qualified: true,
    table_alias_keyword: true,
    select_limit: SelectLimit::LimitOffset { unbounded: None },
    // No DELETE ... LIMIT; correlate on the primary key instead.
    delete_limit: DeleteLimit::Subquery {
        identity: RowIdentity::PrimaryKey,
        limit: SubqueryLimit::Trailing,
    },
    default_delete_limit: Some(1),
    truncate: Truncate {
        keyword: Some("TRUNCATE"),
        cascade: true,
        restart_identity: true,
    },
    row_count_query: None,
};

#[cfg(test)]
mod tests {
    use crate::dialect::Dialect;
    use crate::value::SqlValue;

    #[test]
    fn test_postgres_quoting() {
        let d = Dialect::Postgres;
        assert_eq!(d.quote_identifier("name"), "\"name\"");
        assert_eq!(d.literal(&SqlValue::Bool(true)), "true");
        assert_eq!(
            d.literal(&SqlValue::Text(String::from("it's"))),
            "'it''s'"
        );
    }
}
