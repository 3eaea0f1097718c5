//! Microsoft SQL Server dialect table.

use super::{
    BlobLiteral, DeleteLimit, DialectSpec, IdentifierQuoting, SelectLimit, StringEscape,
    TimestampLiteral, Truncate,
};

pub(super) static SPEC: DialectSpec = DialectSpec {
    name: "mssql",
    identifiers: IdentifierQuoting::Always {
        open: '[',
        close: ']',
    },
    strings: StringEscape::DoubledQuote,
    national_strings: true,
    booleans: ("1", "0"),
    blobs: BlobLiteral::HexPrefix,
    timestamps: TimestampLiteral::Quoted,
    not_equal: "<>",
    case_insensitive_like: None,
    schema_qualified: true,
    table_alias_keyword: true,
    select_limit: SelectLimit::TopOrFetch,
    delete_limit: DeleteLimit::Top,
    default_delete_limit: Some(1),
    // TRUNCATE TABLE reseeds IDENTITY columns on its own.
    truncate: Truncate {
        keyword: Some("TRUNCATE TABLE"),
        cascade: false,
        restart_identity: false,
    },
    row_count_query: Some("SELECT @@ROWCOUNT AS AFFECTEDROWS"),
};
