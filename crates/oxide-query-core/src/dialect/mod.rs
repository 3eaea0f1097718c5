//! SQL dialect support.
//!
//! Each supported backend is a [`Dialect`] tag backed by exactly one
//! [`DialectSpec`] table describing its quoting rules and capabilities.
//! The emitter consults the table instead of branching on the tag, so a new
//! dialect only needs a new table.

mod mssql;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::TableRef;
use crate::value::SqlValue;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL.
    Postgres,
    /// MySQL / MariaDB.
    #[serde(rename = "mysql")]
    MySql,
    /// Microsoft SQL Server.
    #[serde(rename = "mssql")]
    MsSql,
    /// SQLite.
    Sqlite,
    /// Oracle Database (12c and later).
    Oracle,
}

impl Dialect {
    /// Every supported dialect, in a stable order.
    pub const ALL: [Self; 5] = [
        Self::Postgres,
        Self::MySql,
        Self::MsSql,
        Self::Sqlite,
        Self::Oracle,
    ];

    /// Returns the capability and quoting table for this dialect.
    #[must_use]
    pub fn spec(self) -> &'static DialectSpec {
        match self {
            Self::Postgres => &postgres::SPEC,
            Self::MySql => &mysql::SPEC,
            Self::MsSql => &mssql::SPEC,
            Self::Sqlite => &sqlite::SPEC,
            Self::Oracle => &oracle::SPEC,
        }
    }

    /// Returns the lowercase dialect tag.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Quotes an identifier, escaping embedded quote characters.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        match self.spec().identifiers {
            IdentifierQuoting::Always { open, close } => wrap_identifier(name, open, close),
            IdentifierQuoting::WhenNeeded { quote, reserved } => {
                if is_plain_identifier(name) && !is_reserved(name, reserved) {
                    String::from(name)
                } else {
                    wrap_identifier(name, quote, quote)
                }
            }
        }
    }

    /// Quotes a possibly schema-qualified table name.
    ///
    /// Dialects without schema qualification receive a single compound
    /// identifier such as `` `public.users` ``.
    #[must_use]
    pub fn quote_table(self, table: &TableRef) -> String {
        match table.schema.as_deref() {
            None => self.quote_identifier(&table.name),
            Some(schema) if self.spec().schema_qualified => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(&table.name)
            ),
            Some(schema) => self.quote_identifier(&format!("{schema}.{}", table.name)),
        }
    }

    /// Renders a value as an escaped SQL literal.
    #[must_use]
    pub fn literal(self, value: &SqlValue) -> String {
        let spec = self.spec();
        match value {
            SqlValue::Null => String::from("NULL"),
            SqlValue::Bool(b) => String::from(if *b { spec.booleans.0 } else { spec.booleans.1 }),
            SqlValue::Int(n) => format!("{n}"),
            SqlValue::Float(f) if f.is_finite() => format!("{f}"),
            SqlValue::Float(f) => self.string_literal(&format!("{f}")),
            SqlValue::Text(s) => self.string_literal(s),
            SqlValue::Blob(bytes) => spec.blobs.render(bytes),
            SqlValue::Timestamp(ts) => {
                let text = ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string();
                match spec.timestamps {
                    TimestampLiteral::Quoted => self.string_literal(&text),
                    TimestampLiteral::ToTimestamp => format!(
                        "TO_TIMESTAMP({}, 'YYYY-MM-DD HH24:MI:SS.FF3')",
                        self.string_literal(&text)
                    ),
                }
            }
        }
    }

    /// Renders a string literal using the dialect's escape rules.
    #[must_use]
    pub fn string_literal(self, text: &str) -> String {
        let spec = self.spec();
        let escaped = match spec.strings {
            StringEscape::DoubledQuote => text.replace('\'', "''"),
            StringEscape::Backslash => escape_backslash(text),
        };
        if spec.national_strings {
            format!("N'{escaped}'")
        } else {
            format!("'{escaped}'")
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown dialect '{s}'"))
    }
}

/// Capability and quoting table for one dialect.
#[derive(Debug)]
pub struct DialectSpec {
    /// Lowercase dialect tag.
    pub name: &'static str,
    /// Identifier quoting rule.
    pub identifiers: IdentifierQuoting,
    /// String escaping rule.
    pub strings: StringEscape,
    /// Whether string literals carry the `N` prefix.
    pub national_strings: bool,
    /// Literals for true and false.
    pub booleans: (&'static str, &'static str),
    /// Blob literal form.
    pub blobs: BlobLiteral,
    /// Timestamp literal form.
    pub timestamps: TimestampLiteral,
    /// Inequality operator token.
    pub not_equal: &'static str,
    /// Native case-insensitive LIKE operator, if any.
    pub case_insensitive_like: Option<&'static str>,
    /// Whether `schema.table` can be written as two identifiers.
    pub schema_qualified: bool,
    /// Whether `AS` may precede a table alias.
    pub table_alias_keyword: bool,
    /// LIMIT/OFFSET syntax for SELECT.
    pub select_limit: SelectLimit,
    /// How a DELETE with a row limit is expressed.
    pub delete_limit: DeleteLimit,
    /// Row limit of a delete that leaves it to the dialect.
    pub default_delete_limit: Option<u64>,
    /// Truncate support.
    pub truncate: Truncate,
    /// Statement reporting the affected rows of the preceding DELETE.
    pub row_count_query: Option<&'static str>,
}

/// How identifiers are quoted.
#[derive(Debug, Clone, Copy)]
pub enum IdentifierQuoting {
    /// Always wrap with the given delimiters.
    Always {
        /// Opening delimiter.
        open: char,
        /// Closing delimiter, doubled when it appears inside the name.
        close: char,
    },
    /// Quote only reserved words and names that are not plain identifiers.
    WhenNeeded {
        /// Quote character.
        quote: char,
        /// Upper-case reserved words.
        reserved: &'static [&'static str],
    },
}

/// How quote characters inside string literals are escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEscape {
    /// `'` becomes `''`.
    DoubledQuote,
    /// Backslash escapes for quotes, backslashes and control bytes.
    Backslash,
}

/// Blob literal forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobLiteral {
    /// `X'48454C4C4F'`
    XQuoted,
    /// `'\x48454c4c4f'`
    ByteaHex,
    /// `0x48454C4C4F`
    HexPrefix,
    /// `HEXTORAW('48454C4C4F')`
    HexToRaw,
}

impl BlobLiteral {
    fn render(self, bytes: &[u8]) -> String {
        let upper: String = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
        match self {
            Self::XQuoted => format!("X'{upper}'"),
            Self::ByteaHex => format!("'\\x{}'", upper.to_ascii_lowercase()),
            Self::HexPrefix => format!("0x{upper}"),
            Self::HexToRaw => format!("HEXTORAW('{upper}')"),
        }
    }
}

/// Timestamp literal forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLiteral {
    /// A plain string literal.
    Quoted,
    /// `TO_TIMESTAMP('...', 'YYYY-MM-DD HH24:MI:SS.FF3')`
    ToTimestamp,
}

/// LIMIT/OFFSET syntax for SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectLimit {
    /// `LIMIT n OFFSET m`
    LimitOffset {
        /// LIMIT value standing for "no limit" when only an offset is given,
        /// or `None` when OFFSET may appear alone.
        unbounded: Option<&'static str>,
    },
    /// `LIMIT m, n`; an offset without a limit uses the largest row count.
    LimitComma,
    /// `SELECT TOP(n)` without offset, `OFFSET m ROWS FETCH NEXT n ROWS ONLY` with.
    TopOrFetch,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    OffsetFetch,
}

/// How a DELETE with a row limit is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteLimit {
    /// `DELETE FROM t WHERE ... LIMIT n`
    Trailing,
    /// `DELETE TOP(n) FROM t WHERE ...`
    Top,
    /// `DELETE FROM t WHERE id IN (SELECT id FROM t WHERE ... <limit>)`
    Subquery {
        /// Row identity used to correlate the subquery.
        identity: RowIdentity,
        /// Where the limit goes inside the subquery.
        limit: SubqueryLimit,
    },
}

/// Row identity for limited-delete emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowIdentity {
    /// The primary key of the target entity; requires an entity.
    PrimaryKey,
    /// A pseudo-column present on every row.
    RowId(&'static str),
}

/// Placement of the limit inside a limited-delete subquery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryLimit {
    /// `... LIMIT n`
    Trailing,
    /// `... WHERE rownum <= n AND ...`
    RowNum,
}

/// Truncate support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncate {
    /// Statement keyword, or `None` when the dialect cannot truncate.
    pub keyword: Option<&'static str>,
    /// Whether `CASCADE` is accepted.
    pub cascade: bool,
    /// Whether `RESTART IDENTITY` is accepted.
    pub restart_identity: bool,
}

fn wrap_identifier(name: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(open);
    for c in name.chars() {
        if c == close {
            out.push(close);
        }
        out.push(c);
    }
    out.push(close);
    out
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#'))
}

fn is_reserved(name: &str, reserved: &[&str]) -> bool {
    reserved.iter().any(|word| word.eq_ignore_ascii_case(name))
}

fn escape_backslash(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}
