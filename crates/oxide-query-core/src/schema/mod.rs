//! Entity definitions and the association graph.
//!
//! The schema is assembled once with a [`SchemaBuilder`] and frozen into an
//! immutable [`Schema`]. A frozen schema is `Send + Sync` and can be shared
//! by any number of concurrent compilations without locking.

mod association;
mod registry;

pub use association::{Association, AssociationKind, AssociationOptions, Through};
pub use registry::{Schema, SchemaBuilder};

use serde::{Deserialize, Serialize};

use crate::value::SqlValue;

/// A table name with an optional schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Schema, if any.
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
}

impl TableRef {
    /// Creates an unqualified table reference.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            schema: None,
            name: String::from(name),
        }
    }

    /// Parses `schema.table`, splitting on the first dot.
    #[must_use]
    pub fn parse(qualified: &str) -> Self {
        match qualified.split_once('.') {
            Some((schema, name)) => Self::new(name).with_schema(schema),
            None => Self::new(qualified),
        }
    }

    /// Sets the schema.
    #[must_use]
    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = Some(String::from(schema));
        self
    }
}

/// Logical attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Integer (4 bytes).
    Integer,
    /// Big integer (8 bytes).
    Bigint,
    /// Floating point.
    Double,
    /// Text of any length.
    Text,
    /// Boolean.
    Boolean,
    /// Timestamp.
    Timestamp,
    /// Binary large object.
    Blob,
}

/// Column metadata for one attribute of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Attribute name as used in conditions.
    pub name: String,
    /// Physical column name override.
    pub column: Option<String>,
    /// Logical type.
    pub data_type: DataType,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether the attribute is part of the primary key.
    pub primary_key: bool,
    /// Default value.
    pub default: Option<SqlValue>,
}

impl Attribute {
    /// Creates a nullable attribute.
    #[must_use]
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: String::from(name),
            column: None,
            data_type,
            nullable: true,
            primary_key: false,
            default: None,
        }
    }

    /// Maps the attribute onto a differently named physical column.
    #[must_use]
    pub fn column(mut self, column: &str) -> Self {
        self.column = Some(String::from(column));
        self
    }

    /// Marks the attribute as (part of) the primary key. Implies NOT NULL.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Marks the attribute NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: SqlValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Returns the physical column name.
    #[must_use]
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

/// An entity definition: a named, ordered set of attributes stored in one
/// table.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    name: String,
    table: TableRef,
    attributes: Vec<Attribute>,
}

impl Entity {
    /// Creates an entity stored in a table of the same name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            table: TableRef::new(name),
            attributes: Vec::new(),
        }
    }

    /// Sets the table name.
    #[must_use]
    pub fn table(mut self, table: &str) -> Self {
        self.table.name = String::from(table);
        self
    }

    /// Sets the schema the table lives in.
    #[must_use]
    pub fn schema(mut self, schema: &str) -> Self {
        self.table.schema = Some(String::from(schema));
        self
    }

    /// Adds an attribute, replacing any attribute with the same name.
    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.put_attribute(attribute);
        self
    }

    pub(crate) fn put_attribute(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    /// Returns the entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the table reference.
    #[must_use]
    pub const fn table_ref(&self) -> &TableRef {
        &self.table
    }

    /// Returns the attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Maps an attribute name to its physical column.
    ///
    /// Names that are not attributes are returned unchanged, so callers may
    /// refer to physical columns directly.
    #[must_use]
    pub fn column_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.get_attribute(name).map_or(name, Attribute::column_name)
    }

    /// Returns the primary key attributes.
    pub fn primary_key(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.primary_key)
    }
}
