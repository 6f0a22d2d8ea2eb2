#![allow(dead_code)]

use quill::blog::models::declare_all;
use quill::orm::{Db, PoolConfig};

/// A private in-memory SQLite database holding the blog tables.
///
/// One connection only: every connection to `sqlite::memory:` opens its own
/// empty database.
pub async fn memory_db() -> Db {
    let config = PoolConfig {
        url: Some("sqlite::memory:".into()),
        maxsize: 1,
        minsize: 1,
        ..PoolConfig::default()
    };
    let db = Db::connect(&config).await.unwrap();
    for schema in declare_all() {
        db.execute(&schema.create_table_sql(), &[], true).await.unwrap();
    }
    db
}
