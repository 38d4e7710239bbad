//! Filter and ordering model.
//!
//! Filters form a recursive AST with exactly two node kinds, decided at
//! construction time: a `Condition` comparing one property against an
//! operand, and a `Conjunction` joining child filters. Orders are an
//! explicit list; their slice order is the SQL clause order.

use crate::models::Value;

/// Comparison operator of a condition node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Comparison {
    /// SQL symbol for the scalar form of this comparison.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }
}

/// Joining operator of a conjunction node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Junction {
    And,
    Or,
    Xor,
}

impl Junction {
    /// SQL keyword for this junction.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
        }
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// SQL NULL; compiles to IS NULL / IS NOT NULL under EQ / NE.
    Null,
    /// A single scalar.
    Value(Value),
    /// A set of scalars. EQ / NE test membership; ordered comparisons
    /// reduce the set to its maximum or minimum first.
    Set(Vec<Value>),
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            other => Self::Value(other),
        }
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Self::Value(Value::Int(v))
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Self::Value(Value::Float(v))
    }
}

impl From<bool> for Operand {
    fn from(v: bool) -> Self {
        Self::Value(Value::Bool(v))
    }
}

impl From<&str> for Operand {
    fn from(v: &str) -> Self {
        Self::Value(Value::Str(v.to_string()))
    }
}

impl From<String> for Operand {
    fn from(v: String) -> Self {
        Self::Value(Value::Str(v))
    }
}

impl From<Vec<Value>> for Operand {
    fn from(values: Vec<Value>) -> Self {
        Self::Set(values)
    }
}

/// A filter tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Compare one property against an operand.
    Condition {
        op: Comparison,
        key: String,
        operand: Operand,
    },
    /// Join child filters with AND / OR / XOR.
    Conjunction { op: Junction, filters: Vec<Filter> },
}

impl Filter {
    fn condition(op: Comparison, key: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::Condition {
            op,
            key: key.into(),
            operand: operand.into(),
        }
    }

    pub fn eq(key: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::condition(Comparison::Eq, key, operand)
    }

    pub fn ne(key: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::condition(Comparison::Ne, key, operand)
    }

    pub fn gt(key: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::condition(Comparison::Gt, key, operand)
    }

    pub fn lt(key: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::condition(Comparison::Lt, key, operand)
    }

    pub fn ge(key: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::condition(Comparison::Ge, key, operand)
    }

    pub fn le(key: impl Into<String>, operand: impl Into<Operand>) -> Self {
        Self::condition(Comparison::Le, key, operand)
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Self::Conjunction {
            op: Junction::And,
            filters,
        }
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Conjunction {
            op: Junction::Or,
            filters,
        }
    }

    pub fn xor(filters: Vec<Filter>) -> Self {
        Self::Conjunction {
            op: Junction::Xor,
            filters,
        }
    }
}

/// Sort direction of one ORDER BY entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// SQL keyword for this direction.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One ORDER BY entry. Direction is always explicit.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub key: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: Direction::Desc,
        }
    }
}
