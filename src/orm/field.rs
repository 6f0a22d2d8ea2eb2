//! Column descriptors.

use serde_json::Value;

/// Storage type of a column, with its DDL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Character data; `ddl` is the column type, `VARCHAR(100)` unless set.
    String { ddl: String },
    /// `tinyint(1)`: MySQL's `BOOLEAN`, and an integer column on SQLite,
    /// whose `BOOLEAN` affinity the Any driver cannot decode.
    Bool,
    Int,
    Float,
    Text,
}

impl FieldKind {
    pub fn ddl(&self) -> &str {
        match self {
            Self::String { ddl } => ddl,
            Self::Bool  => "tinyint(1)",
            Self::Int   => "bigint",
            Self::Float => "real",
            Self::Text  => "text",
        }
    }
}

/// What a missing value resolves to.
#[derive(Clone, Debug, Default)]
pub enum FieldDefault {
    /// No default: the column is written as `NULL`.
    #[default]
    None,
    Value(Value),
    /// Evaluated each time a missing value is resolved (clocks, id generators).
    Producer(fn() -> Value),
}

impl FieldDefault {
    /// Resolves the default. Producers run on every call.
    pub fn resolve(&self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Value(value) => Some(value.clone()),
            Self::Producer(produce) => Some(produce()),
        }
    }
}

/// One declared column. Immutable once part of a [`Schema`](super::Schema).
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    kind: FieldKind,
    primary_key: bool,
    default: FieldDefault,
}

impl Field {
    fn new(name: &str, kind: FieldKind, default: FieldDefault) -> Self {
        Self { name: name.to_owned(), kind, primary_key: false, default }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, FieldKind::String { ddl: "VARCHAR(100)".to_owned() }, FieldDefault::None)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldKind::Bool, FieldDefault::Value(Value::Bool(false)))
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, FieldKind::Int, FieldDefault::Value(Value::from(0)))
    }

    pub fn float(name: &str) -> Self {
        Self::new(name, FieldKind::Float, FieldDefault::Value(Value::from(0.0)))
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, FieldKind::Text, FieldDefault::None)
    }

    /// Marks this column as the entity's key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Overrides the column type of a string field. Ignored for other kinds.
    pub fn ddl(mut self, ddl: &str) -> Self {
        if let FieldKind::String { ddl: current } = &mut self.kind {
            *current = ddl.to_owned();
        }
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = FieldDefault::Value(value.into());
        self
    }

    pub fn default_with(mut self, produce: fn() -> Value) -> Self {
        self.default = FieldDefault::Producer(produce);
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn kind(&self) -> &FieldKind { &self.kind }
    pub fn is_primary_key(&self) -> bool { self.primary_key }
    pub fn default(&self) -> &FieldDefault { &self.default }

    /// Coerces a decoded database value to this column's kind: integers
    /// become booleans for bool columns and floats for float columns.
    pub(crate) fn normalize(&self, value: Value) -> Value {
        match (&self.kind, value) {
            (FieldKind::Bool, Value::Number(n)) => Value::Bool(n.as_f64().is_some_and(|v| v != 0.0)),
            (FieldKind::Float, Value::Number(n)) => n.as_f64().map_or(Value::Null, Value::from),
            (_, value) => value,
        }
    }
}
