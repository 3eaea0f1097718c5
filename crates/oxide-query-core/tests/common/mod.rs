#![allow(dead_code)]

use oxide_query_core::schema::{AssociationOptions, Attribute, DataType, Entity};
use oxide_query_core::{CompileError, Dialect, QueryCompiler, Schema, Statement};

/// `User` stored in `public.test_users` with an implicit `id` key.
pub fn test_users_schema() -> Schema {
    Schema::builder()
        .entity(
            Entity::new("User")
                .table("test_users")
                .schema("public")
                .attribute(Attribute::new("name", DataType::Text)),
        )
        .entity(
            Entity::new("test_user").attribute(
                Attribute::new("id", DataType::Text)
                    .primary_key()
                    .column("test_user_id"),
            ),
        )
        .build()
        .unwrap_or_else(|e| panic!("Failed to build schema: {e}"))
}

fn people() -> oxide_query_core::SchemaBuilder {
    Schema::builder()
        .entity(
            Entity::new("User")
                .table("users")
                .attribute(Attribute::new("username", DataType::Text)),
        )
        .entity(
            Entity::new("Project")
                .table("projects")
                .attribute(Attribute::new("title", DataType::Text)),
        )
}

/// User -(hasMany)-> Project -(hasMany)-> Task, each belonging to its parent.
pub fn blog_schema() -> Schema {
    people()
        .entity(
            Entity::new("Task")
                .table("tasks")
                .attribute(Attribute::new("title", DataType::Text)),
        )
        .belongs_to("Project", "User", AssociationOptions::new())
        .has_many("User", "Project", AssociationOptions::new())
        .belongs_to("Task", "Project", AssociationOptions::new())
        .has_many("Project", "Task", AssociationOptions::new())
        .build()
        .unwrap_or_else(|e| panic!("Failed to build schema: {e}"))
}

/// User <-> Project through `user_project`, declared from both sides.
pub fn membership_schema() -> Schema {
    people()
        .belongs_to_many(
            "Project",
            "User",
            AssociationOptions::new().through("user_project"),
        )
        .belongs_to_many(
            "User",
            "Project",
            AssociationOptions::new().through("user_project"),
        )
        .build()
        .unwrap_or_else(|e| panic!("Failed to build schema: {e}"))
}

pub fn try_compile(
    dialect: Dialect,
    schema: &Schema,
    statement: impl Into<Statement>,
) -> Result<String, CompileError> {
    QueryCompiler::new(dialect, schema)
        .compile(&statement.into())
        .map(|compiled| compiled.sql())
}

pub fn compile(dialect: Dialect, schema: &Schema, statement: impl Into<Statement>) -> String {
    let statement = statement.into();
    try_compile(dialect, schema, statement.clone())
        .unwrap_or_else(|e| panic!("Failed to compile {statement:?} for {dialect}: {e}"))
}
