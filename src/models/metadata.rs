//! Entity metadata consumed by the driver.
//!
//! The schema model itself lives outside this crate; the driver only reads
//! it: a source (table) name, an ordered property map, and the key
//! generation strategy. Nothing here is persisted by the driver.

use crate::error::DriverResult;
use crate::models::{Row, Value};
use std::fmt;
use std::sync::Arc;

/// Semantic type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    /// Integer, bound natively.
    Int,
    /// String, passed through unchanged.
    Str,
    /// Boolean, bound natively.
    Bool,
    /// Float; travels as text to avoid client-side rounding differences.
    Float,
    /// Structured/array value, run through the encoder.
    Struct,
    /// Numeric string (e.g. DECIMAL), passed through unchanged.
    Numeric,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Str => "string",
            Self::Bool => "bool",
            Self::Float => "float",
            Self::Struct => "struct",
            Self::Numeric => "numeric",
        };
        write!(f, "{name}")
    }
}

/// A property-level validation rule. Runs against the runtime value of
/// every bind for that property; a message describes the rejection.
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// One declared entity property.
#[derive(Clone)]
pub struct Property {
    ty: PropertyType,
    validator: Option<Validator>,
}

impl Property {
    pub fn new(ty: PropertyType) -> Self {
        Self {
            ty,
            validator: None,
        }
    }

    pub fn with_validator(ty: PropertyType, validator: Validator) -> Self {
        Self {
            ty,
            validator: Some(validator),
        }
    }

    pub fn ty(&self) -> PropertyType {
        self.ty
    }

    /// Run the property's validation rule, if any.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match &self.validator {
            Some(validator) => validator(value),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("ty", &self.ty)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// How generated property values come to exist on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationStrategy {
    /// Rows are inserted as given.
    #[default]
    None,
    /// The engine assigns an id; inserts run one row at a time so the
    /// last-insert-id attributes unambiguously.
    Auto,
    /// An external generator fills the batch before any SQL is issued.
    Custom,
}

/// External value generator for the custom generation strategy. Invoked
/// once over the whole row batch before insertion.
pub trait Generator: Send + Sync {
    fn generate(&self, metadata: &Metadata, rows: &mut [Row]) -> DriverResult<()>;
}

/// Read-only description of one entity source.
#[derive(Clone)]
pub struct Metadata {
    source: String,
    properties: Vec<(String, Property)>,
    strategy: GenerationStrategy,
    generated: Vec<String>,
    generator: Option<Arc<dyn Generator>>,
}

impl Metadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            properties: Vec::new(),
            strategy: GenerationStrategy::None,
            generated: Vec::new(),
            generator: None,
        }
    }

    /// Declare a property. Declaration order is the column order of find
    /// queries and row decoding.
    pub fn with_property(mut self, key: impl Into<String>, property: Property) -> Self {
        self.properties.push((key.into(), property));
        self
    }

    pub fn with_strategy(mut self, strategy: GenerationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Mark a declared property as generated. Declaration order matters:
    /// the auto strategy back-fills the first generated property.
    pub fn with_generated(mut self, key: impl Into<String>) -> Self {
        self.generated.push(key.into());
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn properties(&self) -> &[(String, Property)] {
        &self.properties
    }

    /// Look up a declared property by key.
    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, property)| property)
    }

    pub fn strategy(&self) -> GenerationStrategy {
        self.strategy
    }

    /// Generated property keys with their declarations, in order.
    pub fn generated(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.generated.iter().filter_map(|key| {
            self.property(key).map(|property| (key.as_str(), property))
        })
    }

    pub fn generator(&self) -> Option<&dyn Generator> {
        self.generator.as_deref()
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metadata")
            .field("source", &self.source)
            .field("properties", &self.properties)
            .field("strategy", &self.strategy)
            .field("generated", &self.generated)
            .field("has_generator", &self.generator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        Metadata::new("users")
            .with_property("id", Property::new(PropertyType::Int))
            .with_property("name", Property::new(PropertyType::Str))
            .with_strategy(GenerationStrategy::Auto)
            .with_generated("id")
    }

    #[test]
    fn test_property_lookup() {
        let metadata = sample();
        assert_eq!(metadata.property("id").map(Property::ty), Some(PropertyType::Int));
        assert!(metadata.property("missing").is_none());
    }

    #[test]
    fn test_generated_iteration_order() {
        let metadata = sample();
        let keys: Vec<&str> = metadata.generated().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["id"]);
    }

    #[test]
    fn test_validator_runs() {
        let property = Property::with_validator(
            PropertyType::Int,
            Arc::new(|value| match value {
                Value::Int(v) if *v >= 0 => Ok(()),
                _ => Err("must be non-negative".into()),
            }),
        );
        assert!(property.validate(&Value::Int(5)).is_ok());
        assert!(property.validate(&Value::Int(-1)).is_err());
    }
}
