//! SQLite dialect table.

use super::{
    BlobLiteral, DeleteLimit, DialectSpec, IdentifierQuoting, RowIdentity, SelectLimit,
    StringEscape, SubqueryLimit, TimestampLiteral, Truncate,
};

pub(super) static SPEC: DialectSpec = DialectSpec {
    name: "sqlite",
    identifiers: IdentifierQuoting::Always {
        open: '`',
        close: '`',
    },
    strings: StringEscape::DoubledQuote,
    national_strings: false,
    booleans: ("1", "0"),
    blobs: BlobLiteral::XQuoted,
    timestamps: TimestampLiteral::Quoted,
    not_equal: "!=",
    case_insensitive_like: None,
    schema_qualified: false,
    table_alias_keyword: true,
    select_limit: SelectLimit::LimitOffset { unbounded: Some("-1") },
    // DELETE ... LIMIT needs SQLITE_ENABLE_UPDATE_DELETE_LIMIT; rowid always works.
    delete_limit: DeleteLimit::Subquery {
        identity: RowIdentity::RowId("rowid"),
        limit: SubqueryLimit::Trailing,
    },
    default_delete_limit: Some(1),
    truncate: Truncate {
        keyword: None,
        cascade: false,
        restart_identity: false,
    },
    row_count_query: None,
};
