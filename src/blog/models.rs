//! Blog entities.

use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::orm::{self, Entity, Field, Schema};
use crate::session::{Credentials, SCRUBBED_PASSWORD};

/// A sortable unique id: 15-digit millisecond timestamp, a random uuid in
/// hex, then `000`.
pub fn next_id() -> String {
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_millis());
    format!("{millis:015}{}000", Uuid::new_v4().simple())
}

fn id_default() -> Value {
    Value::String(next_id())
}

fn created_at_default() -> Value {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0.0, |d| d.as_secs_f64());
    Value::from(secs)
}

fn id_field() -> Field {
    Field::string("id").primary_key().default_with(id_default).ddl("VARCHAR(50)")
}

fn created_at_field() -> Field {
    Field::float("created_at").default_with(created_at_default)
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct User {
    pub id: Option<String>,
    pub email: Option<String>,
    pub passwd: Option<String>,
    pub admin: Option<bool>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub created_at: Option<f64>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.admin.unwrap_or(false)
    }
}

impl Entity for User {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        orm::declared(&SCHEMA, || {
            Schema::new(
                "users",
                vec![
                    id_field(),
                    Field::string("email").ddl("VARCHAR(50)"),
                    // sha-256 hex
                    Field::string("passwd").ddl("VARCHAR(64)"),
                    Field::boolean("admin"),
                    Field::string("name").ddl("VARCHAR(50)"),
                    Field::string("image").ddl("VARCHAR(500)"),
                    created_at_field(),
                ],
            )
        })
    }
}

impl Credentials for User {
    fn user_id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    fn password_hash(&self) -> &str {
        self.passwd.as_deref().unwrap_or_default()
    }

    fn scrub_password(&mut self) {
        self.passwd = Some(SCRUBBED_PASSWORD.to_owned());
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Blog {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub created_at: Option<f64>,
}

impl Entity for Blog {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        orm::declared(&SCHEMA, || {
            Schema::new(
                "blogs",
                vec![
                    id_field(),
                    Field::string("user_id").ddl("VARCHAR(50)"),
                    Field::string("user_name").ddl("VARCHAR(50)"),
                    Field::string("user_image").ddl("VARCHAR(500)"),
                    Field::string("name").ddl("VARCHAR(50)"),
                    Field::string("summary").ddl("VARCHAR(200)"),
                    Field::text("content"),
                    created_at_field(),
                ],
            )
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Comment {
    pub id: Option<String>,
    pub blog_id: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_image: Option<String>,
    pub content: Option<String>,
    pub created_at: Option<f64>,
}

impl Entity for Comment {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        orm::declared(&SCHEMA, || {
            Schema::new(
                "comments",
                vec![
                    id_field(),
                    Field::string("blog_id").ddl("VARCHAR(50)"),
                    Field::string("user_id").ddl("VARCHAR(50)"),
                    Field::string("user_name").ddl("VARCHAR(50)"),
                    Field::string("user_image").ddl("VARCHAR(500)"),
                    Field::text("content"),
                    created_at_field(),
                ],
            )
        })
    }
}

/// Declares every blog entity, failing fast on a malformed one.
pub fn declare_all() -> [&'static Schema; 3] {
    [User::schema(), Blog::schema(), Comment::schema()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_fixed_width_and_unique() {
        let (a, b) = (next_id(), next_id());
        assert_eq!(a.len(), 50);
        assert!(a.ends_with("000"));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn entities_declare() {
        let [users, blogs, comments] = declare_all();
        assert_eq!(users.table(), "users");
        assert_eq!(blogs.primary_key().name(), "id");
        assert_eq!(comments.fields().len(), 6);
    }

    #[test]
    fn users_scrub_their_password() {
        let mut user = User { id: Some("u1".into()), passwd: Some("hash".into()), ..User::default() };
        assert_eq!(user.password_hash(), "hash");
        user.scrub_password();
        assert_eq!(user.passwd.as_deref(), Some(SCRUBBED_PASSWORD));
        assert!(!user.is_admin());
    }
}
