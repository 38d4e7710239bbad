//! Data models for the execution layer.
//!
//! This module re-exports the value, filter, and metadata types used
//! throughout the crate.

pub mod filter;
pub mod metadata;
pub mod value;

// Re-export commonly used types
pub use filter::{Comparison, Direction, Filter, Junction, Operand, Order};
pub use metadata::{GenerationStrategy, Generator, Metadata, Property, PropertyType, Validator};
pub use value::{Row, Value};
