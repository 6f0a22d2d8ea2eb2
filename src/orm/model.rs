//! Entity operations.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::db::{Db, Row};
use super::query::FindAll;
use super::schema::Schema;

/// A persisted type: a serde struct whose fields mirror its [`Schema`].
///
/// Serialized field names must match the declared column names. Columns the
/// caller leaves unset are best modelled as `Option` so `save` can fill in
/// their defaults.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn schema() -> &'static Schema;
}

impl Db {
    /// Entities matching `query`, empty when nothing matches.
    pub async fn find_all<E: Entity>(&self, query: &FindAll) -> Result<Vec<E>> {
        let schema = E::schema();
        let (sql, args) = query.to_sql(schema);
        self.select(&sql, &args, None)
            .await?
            .into_iter()
            .map(|row| from_row(schema, row))
            .collect()
    }

    /// A single scalar such as `count(id)`, `None` when it is null or no row
    /// comes back.
    pub async fn find_number<E: Entity>(
        &self,
        select: &str,
        filter: Option<&str>,
        args: &[Value],
    ) -> Result<Option<Value>> {
        let mut sql = format!("select {select} _num_ from `{}`", E::schema().table());
        if let Some(filter) = filter {
            sql.push_str(" where ");
            sql.push_str(filter);
        }
        let row = self.select(&sql, args, Some(1)).await?.into_iter().next();
        Ok(row.and_then(|mut row| row.remove("_num_")).filter(|v| !v.is_null()))
    }

    pub async fn find_by_key<E: Entity>(&self, key: impl Into<Value>) -> Result<Option<E>> {
        let schema = E::schema();
        let sql = format!("{} where `{}`=?", schema.select_sql(), schema.primary_key().name());
        match self.select(&sql, &[key.into()], Some(1)).await?.into_iter().next() {
            Some(row) => from_row(schema, row).map(Some),
            None => Ok(None),
        }
    }

    /// Inserts `entity`. Unset columns take their declared defaults, which
    /// are written back into `entity`.
    ///
    /// Returns the affected row count; anything but one is logged, not
    /// raised.
    pub async fn save<E: Entity>(&self, entity: &mut E) -> Result<u64> {
        let schema = E::schema();
        let mut row = to_row(entity)?;
        let args = insert_args(schema, &mut row);
        let affected = self.execute(schema.insert_sql(), &args, self.autocommit()).await?;
        *entity = serde_json::from_value(Value::Object(row))?;
        Ok(check_affected("insert", schema, affected))
    }

    /// Sets `values` on the row keyed by `key`. Column names must be
    /// declared on `E`; values are bound, never inlined.
    pub async fn update_by_key<E: Entity>(
        &self,
        key: impl Into<Value>,
        values: &[(&str, Value)],
    ) -> Result<u64> {
        let schema = E::schema();
        let columns: Vec<&str> = values.iter().map(|(column, _)| *column).collect();
        let sql = schema.update_sql(&columns)?;
        let args: Vec<Value> = values
            .iter()
            .map(|(_, value)| value.clone())
            .chain([key.into()])
            .collect();
        let affected = self.execute(&sql, &args, self.autocommit()).await?;
        Ok(check_affected("update by primary key", schema, affected))
    }

    pub async fn remove_by_key<E: Entity>(&self, key: impl Into<Value>) -> Result<u64> {
        let schema = E::schema();
        let affected = self.execute(schema.delete_sql(), &[key.into()], self.autocommit()).await?;
        Ok(check_affected("remove by primary key", schema, affected))
    }

    /// Deletes the row `entity` was loaded from.
    pub async fn remove_item<E: Entity>(&self, entity: &E) -> Result<u64> {
        let schema = E::schema();
        let pk = schema.primary_key().name();
        let key = to_row(entity)?
            .remove(pk)
            .filter(|v| !v.is_null())
            .ok_or_else(|| Error::Value(format!("`{}` has no value for `{pk}`", schema.table())))?;
        self.remove_by_key::<E>(key).await
    }
}

/// Insert arguments in `insert_sql` column order. Missing or null columns
/// resolve to their defaults, which are recorded in `row`.
fn insert_args(schema: &Schema, row: &mut Row) -> Vec<Value> {
    schema
        .fields()
        .iter()
        .chain([schema.primary_key()])
        .map(|field| {
            if let Some(value) = row.get(field.name()).filter(|v| !v.is_null()) {
                return value.clone();
            }
            let value = field.default().resolve().unwrap_or(Value::Null);
            debug!("using default value for {}: {value}", field.name());
            row.insert(field.name().to_owned(), value.clone());
            value
        })
        .collect()
}

fn to_row<E: Entity>(entity: &E) -> Result<Row> {
    match serde_json::to_value(entity)? {
        Value::Object(row) => Ok(row),
        other => Err(Error::Value(format!(
            "`{}` entity serialized to {other} instead of an object",
            E::schema().table()
        ))),
    }
}

fn from_row<E: Entity>(schema: &Schema, mut row: Row) -> Result<E> {
    for (name, value) in row.iter_mut() {
        if let Some(field) = schema.field(name) {
            *value = field.normalize(value.take());
        }
    }
    Ok(serde_json::from_value(Value::Object(row))?)
}

fn check_affected(op: &str, schema: &Schema, affected: u64) -> u64 {
    if affected != 1 {
        warn!("failed to {op} record in `{}`: affected rows: {affected}", schema.table());
    }
    affected
}
