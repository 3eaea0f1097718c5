//! Oracle dialect table.
//!
//! Oracle folds unquoted identifiers to upper case, so identifiers are only
//! quoted when they have to be.

use super::{
    BlobLiteral, DeleteLimit, DialectSpec, IdentifierQuoting, RowIdentity, SelectLimit,
    StringEscape, SubqueryLimit, TimestampLiteral, Truncate,
};

const RESERVED: &[&str] = &[
    "ACCESS", "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "AUDIT", "BETWEEN", "BY",
    "CHAR", "CHECK", "CLUSTER", "COLUMN", "COMMENT", "COMPRESS", "CONNECT", "CREATE",
    "CURRENT", "DATE", "DECIMAL", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE",
    "EXCLUSIVE", "EXISTS", "FILE", "FLOAT", "FOR", "FROM", "GRANT", "GROUP", "HAVING",
    "IDENTIFIED", "IMMEDIATE", "IN", "INCREMENT", "INDEX", "INITIAL", "INSERT", "INTEGER",
    "INTERSECT", "INTO", "IS", "LEVEL", "LIKE", "LOCK", "LONG", "MAXEXTENTS", "MINUS",
    "MLSLABEL", "MODE", "MODIFY", "NOAUDIT", "NOCOMPRESS", "NOT", "NOWAIT", "NULL", "NUMBER",
    "OF", "OFFLINE", "ON", "ONLINE", "OPTION", "OR", "ORDER", "PCTFREE", "PRIOR", "PUBLIC",
    "RAW", "RENAME", "RESOURCE", "REVOKE", "ROW", "ROWID", "ROWNUM", "ROWS", "SELECT",
    "SESSION", "SET", "SHARE", "SIZE", "SMALLINT", "START", "SUCCESSFUL", "SYNONYM",
    "SYSDATE", "TABLE", "THEN", "TO", "TRIGGER", "UID", "UNION", "UNIQUE", "UPDATE", "USER",
    "VALIDATE", "VALUES", "VARCHAR", "VARCHAR2", "VIEW", "WHENEVER", "WHERE", "WITH",
];

pub(super) static SPEC: DialectSpec = DialectSpec {
    name: "oracle",
    identifiers: IdentifierQuoting::WhenNeeded {
        quote: '"',
        reserved: RESERVED,
    },
    strings: StringEscape::DoubledQuote,
    national_strings: false,
    booleans: ("1", "0"),
    blobs: BlobLiteral::HexToRaw,
    timestamps: TimestampLiteral::ToTimestamp,
    not_equal: "<>",
    case_insensitive_like: None,
    schema_qualified: true,
    table_alias_keyword: false,
    select_limit: SelectLimit::OffsetFetch,
    delete_limit: DeleteLimit::Subquery {
        identity: RowIdentity::RowId("rowid"),
        limit: SubqueryLimit::RowNum,
    },
    default_delete_limit: None,
    truncate: Truncate {
        keyword: Some("TRUNCATE TABLE"),
        cascade: false,
        restart_identity: false,
    },
    row_count_query: None,
};
