//! Driver orchestrator.
//!
//! Ties one pooled session, the transaction stack, and the structured-value
//! encoder together behind the operations the mapping layer calls:
//! find/count/insert/update/delete, advisory locks, and nested transactions.

use crate::db::query::{self, Bind, Compiled};
use crate::db::session::{SharedSession, StatementOutcome};
use crate::db::transaction::TransactionStack;
use crate::encoder::Encoder;
use crate::error::{DriverError, DriverResult};
use crate::models::{Filter, GenerationStrategy, Metadata, Order, PropertyType, Row, Value};
use tracing::debug;

pub struct Driver {
    session: SharedSession,
    transactions: TransactionStack,
    encoder: Box<dyn Encoder>,
}

impl Driver {
    pub fn new(session: SharedSession, encoder: Box<dyn Encoder>) -> Self {
        Self {
            session,
            transactions: TransactionStack::new(),
            encoder,
        }
    }

    // ==================== Reads ====================

    /// Fetch rows matching the filters, decoded per declared property type.
    pub fn find(
        &self,
        metadata: &Metadata,
        filters: &[Filter],
        orders: &[Order],
        limit: u64,
        offset: u64,
    ) -> DriverResult<Vec<Row>> {
        let columns: Vec<String> = metadata
            .properties()
            .iter()
            .map(|(key, _)| query::quote(key))
            .collect();
        let compiled = query::select(metadata.source(), &columns, filters, orders, limit, offset)?;
        let outcome = self.run(metadata, compiled)?;

        outcome
            .rows
            .into_iter()
            .map(|row| self.decode_row(metadata, row))
            .collect()
    }

    /// Count rows matching the filters.
    pub fn count(&self, metadata: &Metadata, filters: &[Filter]) -> DriverResult<u64> {
        let columns = vec!["count(*)".to_string()];
        let compiled = query::select(metadata.source(), &columns, filters, &[], 0, 0)?;
        let outcome = self.run(metadata, compiled)?;

        let value = outcome
            .rows
            .first()
            .and_then(|row| row.first())
            .ok_or_else(|| DriverError::query("count query returned no rows"))?;
        match value {
            Value::Int(count) if *count >= 0 => Ok(*count as u64),
            Value::Str(text) => text
                .parse::<u64>()
                .map_err(|_| DriverError::query(format!("unreadable count result `{text}`"))),
            other => Err(DriverError::query(format!(
                "unreadable count result of type {}",
                other.type_name()
            ))),
        }
    }

    // ==================== Writes ====================

    /// Insert the rows, honoring the source's generation strategy. Rows are
    /// mutated in place when values are generated for them.
    pub fn insert(&self, metadata: &Metadata, rows: &mut [Row]) -> DriverResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        match metadata.strategy() {
            GenerationStrategy::Auto => {
                // One statement per row so the last-insert-id attributes
                // unambiguously to the row it back-fills.
                for row in rows.iter_mut() {
                    self.insert_row_auto(metadata, row)?;
                }
                Ok(())
            }
            GenerationStrategy::Custom => {
                let generator = metadata.generator().ok_or_else(|| {
                    DriverError::query(format!(
                        "source `{}` declares custom generation without a generator",
                        metadata.source()
                    ))
                })?;
                generator.generate(metadata, rows)?;
                self.insert_grouped(metadata, rows)
            }
            GenerationStrategy::None => self.insert_grouped(metadata, rows),
        }
    }

    /// Apply the assignments to every matching row. Returns the number of
    /// rows the engine reports as affected.
    pub fn update(
        &self,
        metadata: &Metadata,
        assignments: &Row,
        filters: &[Filter],
        orders: &[Order],
        limit: u64,
        offset: u64,
    ) -> DriverResult<u64> {
        let compiled = query::update(
            metadata.source(),
            assignments,
            filters,
            orders,
            limit,
            offset,
        )?;
        let outcome = self.run(metadata, compiled)?;
        Ok(outcome.affected)
    }

    /// Delete every matching row. Returns the affected-row count.
    pub fn delete(
        &self,
        metadata: &Metadata,
        filters: &[Filter],
        orders: &[Order],
        limit: u64,
        offset: u64,
    ) -> DriverResult<u64> {
        let compiled = query::delete(metadata.source(), filters, orders, limit, offset)?;
        let outcome = self.run(metadata, compiled)?;
        Ok(outcome.affected)
    }

    // ==================== Advisory locks ====================

    /// Take a named advisory lock scoped to the current database and source.
    /// `wait` blocks until the lock frees; otherwise the call gives up
    /// immediately. Any execution failure reads as "not acquired".
    pub fn lock(&self, metadata: &Metadata, resource: &str, wait: bool) -> bool {
        let timeout: i64 = if wait { -1 } else { 0 };
        let binds = vec![
            Value::Str(metadata.source().to_string()),
            Value::Str(resource.to_string()),
            Value::Int(timeout),
        ];
        self.lock_call(
            "SELECT GET_LOCK(concat(database(), '.', ?, '.', ?), ?)",
            &binds,
        )
    }

    /// Release a previously taken advisory lock. Failure reads as "not
    /// released".
    pub fn unlock(&self, metadata: &Metadata, resource: &str) -> bool {
        let binds = vec![
            Value::Str(metadata.source().to_string()),
            Value::Str(resource.to_string()),
        ];
        self.lock_call(
            "SELECT RELEASE_LOCK(concat(database(), '.', ?, '.', ?))",
            &binds,
        )
    }

    fn lock_call(&self, sql: &str, binds: &[Value]) -> bool {
        let mut session = self.session.lock();
        match session.exec(sql, binds) {
            Ok(outcome) => matches!(
                outcome.rows.first().and_then(|row| row.first()),
                Some(Value::Int(1))
            ),
            Err(error) => {
                debug!(%error, "lock statement failed");
                false
            }
        }
    }

    // ==================== Transactions ====================

    pub fn begin(&mut self) -> DriverResult<()> {
        let mut session = self.session.lock();
        self.transactions.begin(session.as_mut())
    }

    pub fn commit(&mut self) -> DriverResult<()> {
        let mut session = self.session.lock();
        self.transactions.commit(session.as_mut())
    }

    pub fn rollback(&mut self) -> DriverResult<()> {
        let mut session = self.session.lock();
        self.transactions.rollback(session.as_mut())
    }

    pub fn in_transaction(&self) -> bool {
        self.transactions.in_transaction()
    }

    // ==================== Internals ====================

    /// Validate and encode the compiled binds, then execute.
    fn run(&self, metadata: &Metadata, compiled: Compiled) -> DriverResult<StatementOutcome> {
        let binds = self.prepare_binds(metadata, &compiled.binds)?;
        debug!(sql = %compiled.sql, binds = binds.len(), "executing statement");
        let mut session = self.session.lock();
        session.exec(&compiled.sql, &binds)
    }

    /// Check every bind against its declared property and produce the final
    /// engine values. No statement is issued if any bind is rejected.
    fn prepare_binds(&self, metadata: &Metadata, binds: &[Bind]) -> DriverResult<Vec<Value>> {
        binds
            .iter()
            .map(|(key, value)| self.prepare_bind(metadata, key, value))
            .collect()
    }

    fn prepare_bind(&self, metadata: &Metadata, key: &str, value: &Value) -> DriverResult<Value> {
        let property = metadata
            .property(key)
            .ok_or_else(|| DriverError::unknown_property(key))?;

        property
            .validate(value)
            .map_err(|message| DriverError::validation(key, message))?;

        if value.is_null() {
            return Ok(Value::Null);
        }

        match (property.ty(), value) {
            (PropertyType::Int, Value::Int(_)) => Ok(value.clone()),
            (PropertyType::Bool, Value::Bool(_)) => Ok(value.clone()),
            (PropertyType::Float, Value::Float(_)) => Ok(value.clone()),
            (PropertyType::Str, Value::Str(_)) => Ok(value.clone()),
            (PropertyType::Numeric, Value::Str(_)) => Ok(value.clone()),
            (PropertyType::Numeric, Value::Int(v)) => Ok(Value::Str(v.to_string())),
            (PropertyType::Numeric, Value::Float(v)) => Ok(Value::Str(v.to_string())),
            (PropertyType::Struct, Value::Struct(json)) => {
                Ok(Value::Str(self.encoder.encode(json)?))
            }
            (declared, got) => Err(DriverError::validation(
                key,
                format!("declared {declared}, got {} value", got.type_name()),
            )),
        }
    }

    /// Decode one engine row into a property-keyed map, columns in
    /// declaration order.
    fn decode_row(&self, metadata: &Metadata, columns: Vec<Value>) -> DriverResult<Row> {
        let mut row = Row::new();
        for ((key, property), value) in metadata.properties().iter().zip(columns) {
            let decoded = self.decode_value(key, property.ty(), value)?;
            row.insert(key.clone(), decoded);
        }
        Ok(row)
    }

    fn decode_value(&self, key: &str, ty: PropertyType, value: Value) -> DriverResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match (ty, value) {
            (PropertyType::Int, Value::Int(v)) => Ok(Value::Int(v)),
            (PropertyType::Int, Value::Str(text)) => text
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| decode_error(key, ty, &text)),
            (PropertyType::Bool, Value::Int(v)) => Ok(Value::Bool(v != 0)),
            (PropertyType::Bool, Value::Bool(v)) => Ok(Value::Bool(v)),
            (PropertyType::Float, Value::Float(v)) => Ok(Value::Float(v)),
            (PropertyType::Float, Value::Int(v)) => Ok(Value::Float(v as f64)),
            (PropertyType::Float, Value::Str(text)) => text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| decode_error(key, ty, &text)),
            (PropertyType::Str, Value::Str(text)) => Ok(Value::Str(text)),
            (PropertyType::Numeric, Value::Str(text)) => Ok(Value::Str(text)),
            (PropertyType::Numeric, Value::Int(v)) => Ok(Value::Str(v.to_string())),
            (PropertyType::Struct, Value::Str(text)) => {
                Ok(Value::Struct(self.encoder.decode(&text)?))
            }
            (declared, got) => Err(DriverError::query(format!(
                "column `{key}` declared {declared} but the engine sent {}",
                got.type_name()
            ))),
        }
    }

    /// Auto strategy: insert one row, then back-fill the first declared
    /// generated property the row left unset.
    fn insert_row_auto(&self, metadata: &Metadata, row: &mut Row) -> DriverResult<()> {
        let (keys, values) = present_columns(row);
        let compiled = query::insert(metadata.source(), &keys, &[values])?;
        let outcome = self.run(metadata, compiled)?;

        if let Some((key, property)) = metadata.generated().next() {
            let absent = row.get(key).map(Value::is_null).unwrap_or(true);
            if absent {
                let id = outcome.last_insert_id.ok_or_else(|| {
                    DriverError::query(format!(
                        "engine reported no generated id for `{}`",
                        metadata.source()
                    ))
                })?;
                let value = match property.ty() {
                    PropertyType::Int => Value::Int(id as i64),
                    PropertyType::Str | PropertyType::Numeric => Value::Str(id.to_string()),
                    other => return Err(DriverError::unsupported_type(key, other)),
                };
                row.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Group sparse rows by their set of present columns and issue one
    /// multi-row INSERT per distinct column set, rows in input order.
    fn insert_grouped(&self, metadata: &Metadata, rows: &[Row]) -> DriverResult<()> {
        let mut groups: Vec<(Vec<String>, Vec<Vec<Value>>)> = Vec::new();
        for row in rows {
            let (keys, values) = present_columns(row);
            match groups.iter_mut().find(|(group_keys, _)| *group_keys == keys) {
                Some((_, group_rows)) => group_rows.push(values),
                None => groups.push((keys, vec![values])),
            }
        }

        for (keys, group_rows) in &groups {
            let compiled = query::insert(metadata.source(), keys, group_rows)?;
            self.run(metadata, compiled)?;
        }
        Ok(())
    }
}

fn decode_error(key: &str, ty: PropertyType, text: &str) -> DriverError {
    DriverError::query(format!(
        "column `{key}` declared {ty} but the engine sent `{text}`"
    ))
}

/// Non-null columns of a row, keys in the row's sorted order.
fn present_columns(row: &Row) -> (Vec<String>, Vec<Value>) {
    let mut keys = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (key, value) in row {
        if !value.is_null() {
            keys.push(key.clone());
            values.push(value.clone());
        }
    }
    (keys, values)
}
