//! `find_all` statement building.

use serde_json::Value;

use crate::error::{Error, Result};

use super::schema::Schema;

/// A `limit` clause: a row cap, or an offset/count window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    Rows(u64),
    Window { offset: u64, count: u64 },
}

impl From<u64> for Limit {
    fn from(rows: u64) -> Self {
        Self::Rows(rows)
    }
}

impl From<(u64, u64)> for Limit {
    fn from((offset, count): (u64, u64)) -> Self {
        Self::Window { offset, count }
    }
}

/// Accepts an integer or a two-element `[offset, count]` array.
impl TryFrom<&Value> for Limit {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        let invalid = || Error::Value(format!("Invalid limit value: {value}"));
        match value {
            Value::Number(n) => n.as_u64().map(Self::Rows).ok_or_else(invalid),
            Value::Array(pair) => match pair.as_slice() {
                [offset, count] => match (offset.as_u64(), count.as_u64()) {
                    (Some(offset), Some(count)) => Ok(Self::Window { offset, count }),
                    _ => Err(invalid()),
                },
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

/// Clauses appended to an entity's select statement. Every part is optional.
#[derive(Clone, Debug, Default)]
pub struct FindAll {
    filter: Option<String>,
    args: Vec<Value>,
    order_by: Option<String>,
    limit: Option<Limit>,
}

impl FindAll {
    pub fn new() -> Self {
        Self::default()
    }

    /// `where` expression with `?` placeholders bound from `args`.
    pub fn filter(mut self, expr: &str, args: impl IntoIterator<Item = Value>) -> Self {
        self.filter = Some(expr.to_owned());
        self.args = args.into_iter().collect();
        self
    }

    pub fn order_by(mut self, expr: &str) -> Self {
        self.order_by = Some(expr.to_owned());
        self
    }

    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// The statement and its positional arguments. Limit bounds are bound,
    /// never inlined.
    pub fn to_sql(&self, schema: &Schema) -> (String, Vec<Value>) {
        let mut sql = vec![schema.select_sql().to_owned()];
        let mut args = self.args.clone();
        if let Some(filter) = &self.filter {
            sql.push("where".into());
            sql.push(filter.clone());
        }
        if let Some(order_by) = &self.order_by {
            sql.push("order by".into());
            sql.push(order_by.clone());
        }
        match self.limit {
            Some(Limit::Rows(rows)) => {
                sql.push("limit ?".into());
                args.push(Value::from(rows));
            }
            Some(Limit::Window { offset, count }) => {
                sql.push("limit ?, ?".into());
                args.push(Value::from(offset));
                args.push(Value::from(count));
            }
            None => {}
        }
        (sql.join(" "), args)
    }
}
