//! Query compiler.
//!
//! Pure, stateless translation of filters, orders, assignments, and rows
//! into MySQL text plus an ordered bind list. Nothing here executes; the
//! critical contract is that binds come out in the exact order their
//! placeholders appear in the SQL.

use crate::error::{DriverError, DriverResult};
use crate::models::{Comparison, Filter, Junction, Operand, Order, Row, Value};
use std::cmp::Ordering;

/// One positional bind: the property key it belongs to, and the value.
pub type Bind = (String, Value);

/// Compiled statement: SQL text plus binds in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub binds: Vec<Bind>,
}

/// Compile a SELECT.
///
/// `columns` are raw select expressions: the caller quotes property keys
/// and may pass aggregates like `count(*)` verbatim.
pub fn select(
    table: &str,
    columns: &[String],
    filters: &[Filter],
    orders: &[Order],
    limit: u64,
    offset: u64,
) -> DriverResult<Compiled> {
    let mut binds = Vec::new();
    let tail = clause_tail(&mut binds, filters, orders, limit, offset)?;
    let sql = format!(
        "SELECT {} FROM {}{}",
        columns.join(","),
        quote(table),
        tail
    );
    Ok(Compiled { sql, binds })
}

/// Compile a multi-row INSERT over a homogeneous batch: every row must
/// carry exactly one value per key.
pub fn insert(table: &str, keys: &[String], rows: &[Vec<Value>]) -> DriverResult<Compiled> {
    let mut binds = Vec::with_capacity(keys.len() * rows.len());
    let mut tuples = Vec::with_capacity(rows.len());

    for row in rows {
        if row.len() != keys.len() {
            return Err(DriverError::query(format!(
                "insert row carries {} values for {} columns",
                row.len(),
                keys.len()
            )));
        }
        for (key, value) in keys.iter().zip(row) {
            binds.push((key.clone(), value.clone()));
        }
        tuples.push(format!("({})", placeholders(row.len())));
    }

    let quoted: Vec<String> = keys.iter().map(|key| quote(key)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote(table),
        quoted.join(","),
        tuples.join(",")
    );
    Ok(Compiled { sql, binds })
}

/// Compile an UPDATE. Assignments bind first, then the condition binds.
pub fn update(
    table: &str,
    assignments: &Row,
    filters: &[Filter],
    orders: &[Order],
    limit: u64,
    offset: u64,
) -> DriverResult<Compiled> {
    let mut binds = Vec::new();
    let mut sets = Vec::with_capacity(assignments.len());
    for (key, value) in assignments {
        binds.push((key.clone(), value.clone()));
        sets.push(format!("{} = ?", quote(key)));
    }

    let tail = clause_tail(&mut binds, filters, orders, limit, offset)?;
    let sql = format!("UPDATE {} SET {}{}", quote(table), sets.join(","), tail);
    Ok(Compiled { sql, binds })
}

/// Compile a DELETE.
pub fn delete(
    table: &str,
    filters: &[Filter],
    orders: &[Order],
    limit: u64,
    offset: u64,
) -> DriverResult<Compiled> {
    let mut binds = Vec::new();
    let tail = clause_tail(&mut binds, filters, orders, limit, offset)?;
    let sql = format!("DELETE FROM {}{}", quote(table), tail);
    Ok(Compiled { sql, binds })
}

/// Quote an identifier MySQL-style.
pub(crate) fn quote(identifier: &str) -> String {
    format!("`{identifier}`")
}

/// WHERE / ORDER BY / LIMIT / OFFSET shared by select, update, and delete.
/// Zero limit and offset are "unbounded" sentinels and render nothing.
fn clause_tail(
    binds: &mut Vec<Bind>,
    filters: &[Filter],
    orders: &[Order],
    limit: u64,
    offset: u64,
) -> DriverResult<String> {
    let mut sql = String::new();

    let mut parts = Vec::with_capacity(filters.len());
    for filter in filters {
        let fragment = compile_filter(binds, filter)?;
        if !fragment.is_empty() {
            parts.push(fragment);
        }
    }
    if !parts.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&parts.join(" AND "));
    }

    if !orders.is_empty() {
        let rendered: Vec<String> = orders
            .iter()
            .map(|order| format!("{} {}", quote(&order.key), order.direction.keyword()))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&rendered.join(","));
    }

    if limit > 0 {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if offset > 0 {
        sql.push_str(&format!(" OFFSET {offset}"));
    }

    Ok(sql)
}

fn compile_filter(binds: &mut Vec<Bind>, filter: &Filter) -> DriverResult<String> {
    match filter {
        Filter::Condition { op, key, operand } => compile_condition(binds, *op, key, operand),
        Filter::Conjunction { op, filters } => compile_conjunction(binds, *op, filters),
    }
}

fn compile_conjunction(
    binds: &mut Vec<Bind>,
    op: Junction,
    filters: &[Filter],
) -> DriverResult<String> {
    let mut parts = Vec::with_capacity(filters.len());
    for filter in filters {
        let fragment = compile_filter(binds, filter)?;
        if !fragment.is_empty() {
            parts.push(fragment);
        }
    }

    // an empty conjunction constrains nothing
    if parts.is_empty() {
        return Ok(String::new());
    }
    let separator = format!(" {} ", op.keyword());
    Ok(format!("({})", parts.join(separator.as_str())))
}

fn compile_condition(
    binds: &mut Vec<Bind>,
    op: Comparison,
    key: &str,
    operand: &Operand,
) -> DriverResult<String> {
    match op {
        Comparison::Eq | Comparison::Ne => match operand {
            Operand::Null => {
                let test = if op == Comparison::Eq {
                    "IS NULL"
                } else {
                    "IS NOT NULL"
                };
                Ok(format!("{} {}", quote(key), test))
            }
            Operand::Set(values) => {
                if values.is_empty() {
                    return Err(DriverError::unsupported_operator(
                        op.symbol(),
                        format!("empty operand set on `{key}`"),
                    ));
                }
                for value in values {
                    binds.push((key.to_string(), value.clone()));
                }
                let test = if op == Comparison::Eq { "IN" } else { "NOT IN" };
                Ok(format!(
                    "{} {} ({})",
                    quote(key),
                    test,
                    placeholders(values.len())
                ))
            }
            Operand::Value(value) => {
                binds.push((key.to_string(), value.clone()));
                Ok(format!("{} {} ?", quote(key), op.symbol()))
            }
        },
        Comparison::Gt | Comparison::Ge | Comparison::Lt | Comparison::Le => {
            let bound = match operand {
                Operand::Null => Value::Null,
                Operand::Value(value) => value.clone(),
                Operand::Set(values) => reduce_set(op, key, values)?,
            };
            binds.push((key.to_string(), bound));
            Ok(format!("{} {} ?", quote(key), op.symbol()))
        }
    }
}

/// Ordered comparisons take a single bound: GT/GE reduce a set operand to
/// its maximum element, LT/LE to its minimum.
fn reduce_set(op: Comparison, key: &str, values: &[Value]) -> DriverResult<Value> {
    let unreducible = |detail: String| DriverError::unsupported_operator(op.symbol(), detail);

    let mut values = values.iter();
    let mut bound = values
        .next()
        .ok_or_else(|| unreducible(format!("empty operand set on `{key}`")))?;

    let keep_greater = matches!(op, Comparison::Gt | Comparison::Ge);
    for value in values {
        let ordering = value.engine_cmp(bound).ok_or_else(|| {
            unreducible(format!(
                "cannot order {} against {} on `{key}`",
                value.type_name(),
                bound.type_name()
            ))
        })?;
        let replace = if keep_greater {
            ordering == Ordering::Greater
        } else {
            ordering == Ordering::Less
        };
        if replace {
            bound = value;
        }
    }

    Ok(bound.clone())
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}
