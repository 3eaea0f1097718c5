//! MySQL dialect table.

use super::{
    BlobLiteral, DeleteLimit, DialectSpec, IdentifierQuoting, SelectLimit, StringEscape,
    TimestampLiteral, Truncate,
};

pub(super) static SPEC: DialectSpec = DialectSpec {
    name: "mysql",
    identifiers: IdentifierQuoting::Always {
        open: '`',
        close: '`',
    },
    strings: StringEscape::Backslash,
    national_strings: false,
    booleans: ("1", "0"),
    blobs: BlobLiteral::XQuoted,
    timestamps: TimestampLiteral::Quoted,
    not_equal: "!=",
    case_insensitive_like: None,
    schema_qualified: false,
    table_alias_keyword: true,
    select_limit: SelectLimit::LimitComma,
    delete_limit: DeleteLimit::Trailing,
    default_delete_limit: Some(1),
    // TRUNCATE resets AUTO_INCREMENT on its own.
    truncate: Truncate {
        keyword: Some("TRUNCATE"),
        cascade: false,
        restart_identity: false,
    },
    row_count_query: None,
};
