use super::DatabaseError;

/// A single SQLite/libSQL value, independent of the driver that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Real(x)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One result row: column names in select order, paired with their values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Row { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn get_text(&self, column: &str) -> Result<String, DatabaseError> {
        match self.get(column) {
            Some(Value::Text(s)) => Ok(s.clone()),
            other => Err(mismatch(column, "text", other)),
        }
    }

    pub fn get_i64(&self, column: &str) -> Result<i64, DatabaseError> {
        match self.get(column) {
            Some(Value::Integer(i)) => Ok(*i),
            other => Err(mismatch(column, "integer", other)),
        }
    }
}

fn mismatch(column: &str, expected: &str, found: Option<&Value>) -> DatabaseError {
    match found {
        None => DatabaseError::Decode(format!("no column named '{}'", column)),
        Some(v) => DatabaseError::Decode(format!(
            "column '{}' is not {}: {:?}",
            column, expected, v
        )),
    }
}
