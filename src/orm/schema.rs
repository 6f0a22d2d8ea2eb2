//! Entity metadata, computed once per entity type.

use std::sync::OnceLock;

use tracing::info;

use crate::error::{Error, Result};

use super::field::Field;

/// Table metadata and the precompiled statements for one entity type.
///
/// Identifiers are backtick-quoted so column names never collide with SQL
/// keywords. Statements use `?` placeholders; [`Db`](super::Db) translates
/// them for the connected backend.
#[derive(Clone, Debug)]
pub struct Schema {
    table: String,
    primary_key: Field,
    fields: Vec<Field>,
    select: String,
    insert: String,
    update: String,
    delete: String,
}

impl Schema {
    /// Declares `table` with `fields` in column order.
    ///
    /// Exactly one field must be the primary key.
    pub fn new(table: &str, fields: Vec<Field>) -> Result<Self> {
        info!("found model: {table}");
        let mut primary_key = None;
        let mut others = Vec::new();
        for field in fields {
            if others.iter().chain(primary_key.as_ref()).any(|f: &Field| f.name() == field.name()) {
                return Err(Error::declaration(format!("duplicate field `{}` in `{table}`", field.name())));
            }
            info!("  found mapping: {} ==> {}", field.name(), field.kind().ddl());
            if field.is_primary_key() {
                if primary_key.is_some() {
                    return Err(Error::declaration(format!(
                        "duplicate primary key for field `{}` in `{table}`",
                        field.name()
                    )));
                }
                primary_key = Some(field);
            } else {
                others.push(field);
            }
        }
        let Some(primary_key) = primary_key else {
            return Err(Error::declaration(format!("primary key not found in `{table}`")));
        };

        let pk = primary_key.name();
        let escaped: Vec<String> = others.iter().map(|f| format!("`{}`", f.name())).collect();
        let select = if escaped.is_empty() {
            format!("select `{pk}` from `{table}`")
        } else {
            format!("select `{pk}`, {} from `{table}`", escaped.join(", "))
        };
        let columns: Vec<String> = escaped.iter().cloned().chain([format!("`{pk}`")]).collect();
        let insert = format!(
            "insert into `{table}` ({}) values({})",
            columns.join(", "),
            placeholders(columns.len())
        );
        let update = format!("update `{table}` set ? where `{pk}`=?");
        let delete = format!("delete from `{table}` where `{pk}`=?");

        Ok(Self {
            table: table.to_owned(),
            primary_key,
            fields: others,
            select,
            insert,
            update,
            delete,
        })
    }

    pub fn table(&self) -> &str { &self.table }
    pub fn primary_key(&self) -> &Field { &self.primary_key }

    /// Non-key fields, in declaration order.
    pub fn fields(&self) -> &[Field] { &self.fields }

    /// `` select `K`, `f1`, ... from `T` ``
    pub fn select_sql(&self) -> &str { &self.select }

    /// `` insert into `T` (`f1`, ..., `K`) values(?, ..., ?) ``
    pub fn insert_sql(&self) -> &str { &self.insert }

    /// `` update `T` set ? where `K`=? ``. The `set ?` slot is filled by
    /// [`update_sql`](Schema::update_sql).
    pub fn update_template(&self) -> &str { &self.update }

    /// `` delete from `T` where `K`=? ``
    pub fn delete_sql(&self) -> &str { &self.delete }

    /// Looks up a declared field, key included.
    pub fn field(&self, name: &str) -> Option<&Field> {
        std::iter::once(&self.primary_key)
            .chain(&self.fields)
            .find(|f| f.name() == name)
    }

    /// The update statement assigning `columns` as bound parameters:
    /// `` update `T` set `a`=?, `b`=? where `K`=? ``. Every column must be
    /// declared on this entity.
    pub fn update_sql(&self, columns: &[&str]) -> Result<String> {
        if columns.is_empty() {
            return Err(Error::Value(format!("no columns to update in `{}`", self.table)));
        }
        if let Some(unknown) = columns.iter().find(|c| self.field(c).is_none()) {
            return Err(Error::Value(format!("unknown field `{unknown}` in `{}`", self.table)));
        }
        let assignments: Vec<String> = columns.iter().map(|c| format!("`{c}`=?")).collect();
        Ok(self.update.replacen('?', &assignments.join(", "), 1))
    }

    /// `create table` DDL for this entity.
    pub fn create_table_sql(&self) -> String {
        let pk = &self.primary_key;
        let mut columns = vec![format!("`{}` {} not null", pk.name(), pk.kind().ddl())];
        columns.extend(self.fields.iter().map(|f| format!("`{}` {}", f.name(), f.kind().ddl())));
        columns.push(format!("primary key (`{}`)", pk.name()));
        format!("create table `{}` ({})", self.table, columns.join(", "))
    }
}

/// Returns the schema cached in `cell`, declaring it on first use.
///
/// # Panics
///
/// Panics when the declaration fails: a malformed entity is a startup error.
pub fn declared(cell: &'static OnceLock<Schema>, declare: impl FnOnce() -> Result<Schema>) -> &'static Schema {
    cell.get_or_init(|| declare().unwrap_or_else(|e| panic!("{e}")))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Schema {
        Schema::new(
            "users",
            vec![
                Field::string("id").primary_key().ddl("VARCHAR(50)"),
                Field::string("email").ddl("VARCHAR(50)"),
                Field::boolean("admin"),
                Field::float("created_at"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn precomputes_statements() {
        let s = users();
        assert_eq!(s.select_sql(), "select `id`, `email`, `admin`, `created_at` from `users`");
        assert_eq!(
            s.insert_sql(),
            "insert into `users` (`email`, `admin`, `created_at`, `id`) values(?, ?, ?, ?)"
        );
        assert_eq!(s.update_template(), "update `users` set ? where `id`=?");
        assert_eq!(s.delete_sql(), "delete from `users` where `id`=?");
    }

    #[test]
    fn key_may_be_declared_anywhere() {
        let s = Schema::new("t", vec![Field::string("a"), Field::integer("k").primary_key()]).unwrap();
        assert_eq!(s.primary_key().name(), "k");
        assert_eq!(s.select_sql(), "select `k`, `a` from `t`");
    }

    #[test]
    fn key_only_entities() {
        let s = Schema::new("tags", vec![Field::string("name").primary_key()]).unwrap();
        assert_eq!(s.select_sql(), "select `name` from `tags`");
        assert_eq!(s.insert_sql(), "insert into `tags` (`name`) values(?)");
    }

    #[test]
    fn requires_exactly_one_primary_key() {
        let none = Schema::new("t", vec![Field::string("a"), Field::string("b")]);
        assert!(matches!(none, Err(Error::Declaration(_))));

        let two = Schema::new("t", vec![Field::string("a").primary_key(), Field::integer("b").primary_key()]);
        assert!(matches!(two, Err(Error::Declaration(_))));

        assert!(matches!(Schema::new("t", vec![]), Err(Error::Declaration(_))));
    }

    #[test]
    fn rejects_duplicate_fields() {
        let dup = Schema::new("t", vec![Field::string("a").primary_key(), Field::string("a")]);
        assert!(matches!(dup, Err(Error::Declaration(_))));
    }

    #[test]
    fn update_binds_assignments() {
        let s = users();
        assert_eq!(
            s.update_sql(&["email", "admin"]).unwrap(),
            "update `users` set `email`=?, `admin`=? where `id`=?"
        );
        assert!(matches!(s.update_sql(&["email`=1 --"]), Err(Error::Value(_))));
        assert!(matches!(s.update_sql(&[]), Err(Error::Value(_))));
    }

    #[test]
    fn create_table_uses_declared_ddl() {
        assert_eq!(
            users().create_table_sql(),
            "create table `users` (`id` VARCHAR(50) not null, `email` VARCHAR(50), `admin` tinyint(1), \
             `created_at` real, primary key (`id`))"
        );
    }
}
