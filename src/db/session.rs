//! Engine session seam.
//!
//! Everything above this module speaks `Session`; only the MySQL
//! implementation at the bottom knows the client crate. Each call blocks
//! the calling thread until the engine responds.

use crate::config::ConnectOptions;
use crate::error::{DriverError, DriverResult};
use crate::models::Value;
use mysql::prelude::Queryable;
use parking_lot::Mutex;
use std::sync::Arc;

/// Outcome of one executed statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOutcome {
    /// Result rows in engine order, one value per selected column.
    pub rows: Vec<Vec<Value>>,
    /// Rows affected by a write.
    pub affected: u64,
    /// Engine-assigned id of the last inserted row, when one exists.
    pub last_insert_id: Option<u64>,
}

/// One live session with the engine. Owned exclusively by the pool until
/// handed to exactly one caller.
pub trait Session: Send {
    /// Run a statement with no binds, discarding any result set.
    fn exec_raw(&mut self, sql: &str) -> DriverResult<()>;

    /// Prepare and run a statement with positional binds, applied in list
    /// order.
    fn exec(&mut self, sql: &str, binds: &[Value]) -> DriverResult<StatementOutcome>;
}

/// Shared handle to a session inside the pool arena.
pub type SharedSession = Arc<Mutex<Box<dyn Session>>>;

/// Live MySQL session.
pub struct MysqlSession {
    conn: mysql::Conn,
}

impl MysqlSession {
    /// Open a session to the engine described by `options`.
    pub fn connect(options: &ConnectOptions) -> DriverResult<Self> {
        let conn = mysql::Conn::new(options.to_engine_opts())
            .map_err(|e| DriverError::connection(e.to_string()))?;
        Ok(Self { conn })
    }
}

impl Session for MysqlSession {
    fn exec_raw(&mut self, sql: &str) -> DriverResult<()> {
        self.conn.query_drop(sql).map_err(DriverError::from)
    }

    fn exec(&mut self, sql: &str, binds: &[Value]) -> DriverResult<StatementOutcome> {
        let params = if binds.is_empty() {
            mysql::Params::Empty
        } else {
            mysql::Params::Positional(binds.iter().map(to_engine_value).collect())
        };

        let result = self.conn.exec_iter(sql, params).map_err(DriverError::from)?;
        let affected = result.affected_rows();
        let last_insert_id = result.last_insert_id();

        let mut rows = Vec::new();
        for row in result {
            let row = row.map_err(DriverError::from)?;
            rows.push(row.unwrap().into_iter().map(from_engine_value).collect());
        }

        Ok(StatementOutcome {
            rows,
            affected,
            last_insert_id,
        })
    }
}

/// Map a driver value onto the client's wire value. Floats travel as text;
/// the engine parses them server-side.
fn to_engine_value(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Bool(v) => mysql::Value::Int(i64::from(*v)),
        Value::Int(v) => mysql::Value::Int(*v),
        Value::Float(v) => mysql::Value::Bytes(v.to_string().into_bytes()),
        Value::Str(v) => mysql::Value::Bytes(v.clone().into_bytes()),
        // Struct binds are encoded to Str before they reach the session;
        // this arm only covers a caller bypassing the driver.
        Value::Struct(v) => mysql::Value::Bytes(v.to_string().into_bytes()),
    }
}

/// Map a wire value back onto a driver value. Text-protocol columns arrive
/// as bytes; per-property typing happens later in the driver's decoder.
fn from_engine_value(value: mysql::Value) -> Value {
    match value {
        mysql::Value::NULL => Value::Null,
        mysql::Value::Int(v) => Value::Int(v),
        mysql::Value::UInt(v) => Value::Int(v as i64),
        mysql::Value::Float(v) => Value::Float(f64::from(v)),
        mysql::Value::Double(v) => Value::Float(v),
        mysql::Value::Bytes(bytes) => Value::Str(String::from_utf8_lossy(&bytes).into_owned()),
        temporal => Value::Str(temporal.as_sql(true).trim_matches('\'').to_string()),
    }
}
