//! Nested include filters executed against an in-memory SQLite database.

mod common;
use common::*;

use oxide_query_core::condition::col;
use oxide_query_core::{Condition, Dialect, Include, Schema, SelectQuery};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

async fn execute_all(pool: &SqlitePool, statements: &[&str]) {
    for sql in statements {
        sqlx::query(sql)
            .execute(pool)
            .await
            .unwrap_or_else(|e| panic!("Failed to execute {sql}: {e}"));
    }
}

/// Two users, one project each, two tasks per project.
async fn seeded_pool() -> SqlitePool {
    let pool = create_test_pool().await;
    execute_all(
        &pool,
        &[
            "CREATE TABLE users (id INTEGER PRIMARY KEY, username TEXT)",
            "CREATE TABLE projects (id INTEGER PRIMARY KEY, title TEXT, UserId INTEGER)",
            "CREATE TABLE tasks (id INTEGER PRIMARY KEY, title TEXT, ProjectId INTEGER)",
            "CREATE TABLE user_project (UserId INTEGER, ProjectId INTEGER, PRIMARY KEY (UserId, ProjectId))",
            "INSERT INTO users (id, username) VALUES (1, 'leia'), (2, 'vader')",
            "INSERT INTO projects (id, title, UserId) VALUES (1, 'republic', 1), (2, 'empire', 2)",
            "INSERT INTO tasks (id, title, ProjectId) VALUES \
             (1, 'fight empire', 1), (2, 'stablish republic', 1), \
             (3, 'destroy rebel alliance', 2), (4, 'rule everything', 2)",
            "INSERT INTO user_project (UserId, ProjectId) VALUES (1, 1), (2, 2)",
        ],
    )
    .await;
    pool
}

async fn fetch_column(pool: &SqlitePool, schema: &Schema, query: SelectQuery, name: &str) -> Vec<String> {
    let sql = compile(Dialect::Sqlite, schema, query);
    sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| panic!("Failed to run {sql}: {e}"))
        .iter()
        .map(|row| row.get::<String, _>(name))
        .collect()
}

// ===================================================================
// belongsTo
// ===================================================================

#[tokio::test]
async fn filters_through_belongs_to_chain() {
    let pool = seeded_pool().await;
    let schema = blog_schema();
    let query = SelectQuery::from_entity("Task")
        .include(
            Include::new("Project")
                .include(Include::new("User").filter(col("username").eq("leia"))),
        )
        .order_asc("id");

    let titles = fetch_column(&pool, &schema, query, "title").await;
    assert_eq!(titles, vec!["fight empire", "stablish republic"]);
}

#[tokio::test]
async fn avoids_duplicate_rows_with_compound_filter() {
    let pool = seeded_pool().await;
    let schema = blog_schema();
    let leia = Include::new("User").filter(col("username").eq("leia").and(col("id").eq(1)));
    let query = SelectQuery::from_entity("Task")
        .include(Include::new("Project").include(leia.clone()))
        .include(Include::new("Project").include(leia))
        .order_asc("id");

    let titles = fetch_column(&pool, &schema, query, "title").await;
    assert_eq!(titles, vec!["fight empire", "stablish republic"]);
}

#[tokio::test]
async fn raw_disjunction_stays_grouped_with_include_filter() {
    let pool = seeded_pool().await;
    let schema = blog_schema();
    let query = SelectQuery::from_entity("Task")
        .filter(Condition::raw("`Task`.`id` = 1 OR `Task`.`id` = 3"))
        .include(
            Include::new("Project")
                .include(Include::new("User").filter(col("username").eq("vader"))),
        )
        .order_asc("id");

    let titles = fetch_column(&pool, &schema, query, "title").await;
    assert_eq!(titles, vec!["destroy rebel alliance"]);
}

// ===================================================================
// hasMany
// ===================================================================

#[tokio::test]
async fn filters_through_has_many_chain() {
    let pool = seeded_pool().await;
    let schema = blog_schema();
    let query = SelectQuery::from_entity("User").include(
        Include::new("Project")
            .include(Include::new("Task").filter(col("title").eq("fight empire"))),
    );

    let usernames = fetch_column(&pool, &schema, query, "username").await;
    assert_eq!(usernames, vec!["leia"]);
}

#[tokio::test]
async fn unfiltered_has_many_keeps_parents_without_children() {
    let pool = seeded_pool().await;
    execute_all(&pool, &["INSERT INTO users (id, username) VALUES (3, 'han')"]).await;
    let schema = blog_schema();
    let query = SelectQuery::from_entity("User")
        .include(Include::new("Project"))
        .order_asc("id");

    let usernames = fetch_column(&pool, &schema, query, "username").await;
    assert_eq!(usernames, vec!["leia", "vader", "han"]);
}

// ===================================================================
// belongsToMany
// ===================================================================

#[tokio::test]
async fn filters_through_join_table() {
    let pool = seeded_pool().await;
    let schema = membership_schema();
    let query = SelectQuery::from_entity("User")
        .include(Include::new("Project").filter(col("title").eq("republic")));

    let usernames = fetch_column(&pool, &schema, query.clone(), "username").await;
    assert_eq!(usernames, vec!["leia"]);

    execute_all(
        &pool,
        &["INSERT INTO user_project (UserId, ProjectId) VALUES (1, 2)"],
    )
    .await;
    let usernames = fetch_column(&pool, &schema, query, "username").await;
    assert_eq!(usernames, vec!["leia"]);
}

#[tokio::test]
async fn join_table_filter_from_other_side() {
    let pool = seeded_pool().await;
    let schema = membership_schema();
    let query = SelectQuery::from_entity("Project")
        .include(Include::new("User").filter(col("username").eq("vader")));

    let titles = fetch_column(&pool, &schema, query, "title").await;
    assert_eq!(titles, vec!["empire"]);
}
