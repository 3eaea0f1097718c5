//! JSON schema descriptions.
//!
//! ```json
//! {
//!   "entities": [
//!     { "name": "User", "table": "users",
//!       "attributes": [{ "name": "username", "type": "text" }] }
//!   ],
//!   "associations": [
//!     { "source": "Project", "kind": "belongsTo", "target": "User" }
//!   ]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use oxide_query_core::schema::{AssociationKind, AssociationOptions, Attribute, DataType, Entity};
use oxide_query_core::{Schema, SqlValue};

/// Top-level schema document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub associations: Vec<AssociationDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntityDef {
    pub name: String,
    pub table: Option<String>,
    pub schema: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AttributeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub column: Option<String>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default = "default_true")]
    pub allow_null: bool,
    pub default_value: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssociationDef {
    pub source: String,
    pub kind: AssociationKind,
    pub target: String,
    #[serde(rename = "as")]
    pub alias: Option<String>,
    pub foreign_key: Option<String>,
    pub key: Option<String>,
    pub through: Option<String>,
    pub other_key: Option<String>,
}

const fn default_true() -> bool {
    true
}

impl SchemaFile {
    /// Reads and parses a schema file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse schema file {}", path.display()))
    }

    /// Registers every entity and association and freezes the schema.
    pub fn into_schema(self) -> Result<Schema> {
        let mut builder = Schema::builder();
        for def in self.entities {
            builder = builder.entity(def.into_entity()?);
        }
        for def in self.associations {
            debug!(
                source = %def.source,
                kind = ?def.kind,
                target = %def.target,
                "Registering association"
            );
            let options = def.options();
            builder = builder.associate(&def.source, def.kind, &def.target, options);
        }
        Ok(builder.build()?)
    }
}

impl EntityDef {
    fn into_entity(self) -> Result<Entity> {
        let mut entity = Entity::new(&self.name);
        if let Some(table) = &self.table {
            entity = entity.table(table);
        }
        if let Some(schema) = &self.schema {
            entity = entity.schema(schema);
        }
        for def in self.attributes {
            let mut attribute = Attribute::new(&def.name, def.data_type);
            if let Some(column) = &def.column {
                attribute = attribute.column(column);
            }
            if def.primary_key {
                attribute = attribute.primary_key();
            } else if !def.allow_null {
                attribute = attribute.not_null();
            }
            if let Some(value) = &def.default_value {
                let value = SqlValue::from_json(value).with_context(|| {
                    format!(
                        "Default of {}.{} must be a scalar, got {value}",
                        self.name, def.name
                    )
                })?;
                attribute = attribute.default_value(value);
            }
            entity = entity.attribute(attribute);
        }
        Ok(entity)
    }
}

impl AssociationDef {
    fn options(&self) -> AssociationOptions {
        let mut options = AssociationOptions::new();
        if let Some(alias) = &self.alias {
            options = options.alias(alias);
        }
        if let Some(foreign_key) = &self.foreign_key {
            options = options.foreign_key(foreign_key);
        }
        if let Some(key) = &self.key {
            options = options.key(key);
        }
        if let Some(through) = &self.through {
            options = options.through(through);
        }
        if let Some(other_key) = &self.other_key {
            options = options.other_key(other_key);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BLOG: &str = r#"{
        "entities": [
            { "name": "User", "table": "users", "schema": "public",
              "attributes": [
                { "name": "id", "type": "bigint", "primaryKey": true, "column": "user_id" },
                { "name": "username", "type": "text", "allowNull": false },
                { "name": "active", "type": "boolean", "defaultValue": true }
              ] },
            { "name": "Project", "table": "projects",
              "attributes": [{ "name": "title", "type": "text" }] }
        ],
        "associations": [
            { "source": "Project", "kind": "belongsTo", "target": "User", "as": "Owner" },
            { "source": "User", "kind": "belongsToMany", "target": "Project", "through": "members" }
        ]
    }"#;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_and_build() {
        let file = write_temp(BLOG);
        let schema = SchemaFile::load(file.path()).unwrap().into_schema().unwrap();

        let user = schema.entity("User").unwrap();
        assert_eq!(user.table_ref().schema.as_deref(), Some("public"));
        assert_eq!(user.column_name("id"), "user_id");
        let username = user.get_attribute("username").unwrap();
        assert!(!username.nullable);
        assert_eq!(
            user.get_attribute("active").unwrap().default,
            Some(SqlValue::Bool(true))
        );

        let project = schema.entity("Project").unwrap();
        assert!(project.get_attribute("OwnerId").is_some());
        assert!(schema.association("Project", "Owner").is_some());
        assert!(schema.entity("members").is_ok());
        assert!(schema.association("Project", "User").is_some());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let file = write_temp(r#"{ "entities": [{ "name": "User", "tabel": "users" }] }"#);
        let err = SchemaFile::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("tabel"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = SchemaFile::load(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/schema.json"));
    }

    #[test]
    fn test_registration_errors_surface() {
        let file = write_temp(
            r#"{ "entities": [{ "name": "User" }],
                 "associations": [{ "source": "User", "kind": "hasMany", "target": "Ghost" }] }"#,
        );
        let err = SchemaFile::load(file.path())
            .unwrap()
            .into_schema()
            .unwrap_err();
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn test_non_scalar_default_rejected() {
        let file = write_temp(
            r#"{ "entities": [{ "name": "User",
                 "attributes": [{ "name": "tags", "type": "text", "defaultValue": [1] }] }] }"#,
        );
        let err = SchemaFile::load(file.path())
            .unwrap()
            .into_schema()
            .unwrap_err();
        assert!(err.to_string().contains("User.tags"));
    }
}
