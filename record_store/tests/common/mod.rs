//! Schema and records shared by the database tests.
//!
//! Tests return early when `DATABASE_URL` is not set.

#![allow(dead_code)]

use record_store::prelude::*;

#[model]
#[derive(PartialEq)]
#[record(table = "ops_parents", alias = "parent")]
pub struct Parent {
    #[primary_key]
    pub id: String,
    pub name: String,

    #[relation(has_one, join = "id=parent_id", persist)]
    pub child: Option<Child>,

    #[relation(has_many, join = "id=parent_id", persist)]
    pub notes: Vec<Note>,
}

#[model]
#[derive(PartialEq)]
#[record(table = "ops_children", alias = "child")]
pub struct Child {
    #[primary_key]
    pub id: String,
    pub parent_id: String,
}

#[model]
#[derive(PartialEq)]
#[record(table = "ops_notes", alias = "note")]
pub struct Note {
    #[primary_key]
    pub id: String,
    pub parent_id: String,
    pub body: String,
}

#[model]
#[record(table = "ops_audits", alias = "audit")]
pub struct Audit {
    #[primary_key]
    pub id: String,
    pub parent_id: String,
}

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS ops_parents (id TEXT PRIMARY KEY, name TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS ops_children (id TEXT PRIMARY KEY, parent_id TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS ops_notes (id TEXT PRIMARY KEY, parent_id TEXT NOT NULL, body TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS ops_audits (id TEXT PRIMARY KEY, parent_id TEXT NOT NULL)",
];

/// Pool with the test schema in place, or `None` without a database.
pub async fn pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPool::connect(&url).await.expect("connect to DATABASE_URL");

    // Test binaries run concurrently; serialise the DDL.
    let mut tx = pool.begin().await.expect("begin");
    sqlx::query("SELECT pg_advisory_xact_lock(74017)")
        .execute(&mut *tx)
        .await
        .expect("advisory lock");
    for ddl in SCHEMA {
        sqlx::query(ddl).execute(&mut *tx).await.expect("create table");
    }
    tx.commit().await.expect("commit schema");

    Some(pool)
}

pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

pub fn parent(name: &str) -> Parent {
    Parent {
        id: unique("parent"),
        name: name.to_string(),
        child: None,
        notes: Vec::new(),
    }
}

pub fn child_of(parent: &Parent) -> Child {
    Child {
        id: unique("child"),
        parent_id: parent.id.clone(),
    }
}

pub fn note_of(parent: &Parent, body: &str) -> Note {
    Note {
        id: unique("note"),
        parent_id: parent.id.clone(),
        body: body.to_string(),
    }
}

pub async fn count(pool: &PgPool, table: &str, parent_id: &str) -> i64 {
    let column = if table == "ops_parents" { "id" } else { "parent_id" };
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {} WHERE {} = $1",
        table, column
    ))
    .bind(parent_id)
    .fetch_one(pool)
    .await
    .expect("count rows")
}
