//! A small ORM over a single SQL database.
//!
//! An entity is a serde struct paired with a [`Schema`] declared once per
//! type. The schema precomputes the select/insert/update/delete statements;
//! [`Db`] runs them against a pooled connection.
//!
//! ```rust,no_run
//! use std::sync::OnceLock;
//!
//! use quill::orm::{self, Db, Entity, Field, FindAll, Schema};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Deserialize, Serialize)]
//! struct Person {
//!     id: Option<i64>,
//!     name: Option<String>,
//! }
//!
//! impl Entity for Person {
//!     fn schema() -> &'static Schema {
//!         static SCHEMA: OnceLock<Schema> = OnceLock::new();
//!         orm::declared(&SCHEMA, || {
//!             Schema::new("people", vec![Field::integer("id").primary_key(), Field::string("name")])
//!         })
//!     }
//! }
//!
//! # async fn demo(db: Db) -> quill::Result<()> {
//! let mut tom = Person { id: Some(11), name: Some("tom".into()) };
//! db.save(&mut tom).await?;
//! let people: Vec<Person> = db.find_all(&FindAll::new().order_by("name")).await?;
//! # Ok(())
//! # }
//! ```

mod db;
mod field;
mod model;
mod query;
mod schema;

pub use db::{Db, Dialect, PoolConfig, Row};
pub use field::{Field, FieldDefault, FieldKind};
pub use model::Entity;
pub use query::{FindAll, Limit};
pub use schema::{declared, Schema};
