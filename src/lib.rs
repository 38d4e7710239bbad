//! MySQL execution layer for a data-mapping framework.
//!
//! Turns abstract query descriptions (filter trees, ordering, pagination,
//! typed row values) into parameterized SQL, runs them over a bounded pool
//! of live connections, and exposes nested transactions as a savepoint
//! stack over a single connection.
//!
//! The layer splits into four subsystems:
//! - [`db::pool`] — bounded connection pool with an idle subset
//! - [`db::query`] — pure compiler from filters/orders/rows to SQL + binds
//! - [`db::transaction`] — LIFO scope stack (real transaction + savepoints)
//! - [`db::driver`] — the orchestrator the mapping layer talks to
//!
//! ```no_run
//! use granite_mysql::config::ConnectOptions;
//! use granite_mysql::db::{ConnectionPool, Driver};
//! use granite_mysql::encoder::JsonEncoder;
//! use granite_mysql::models::{Filter, Metadata, Property, PropertyType};
//!
//! # fn main() -> Result<(), granite_mysql::DriverError> {
//! let options = ConnectOptions::from_url("mysql://app:secret@db/shop?limit=4")
//!     .map_err(granite_mysql::DriverError::connection)?;
//! let pool = ConnectionPool::new(options);
//! let handle = pool.acquire()?;
//! let driver = Driver::new(handle.session().clone(), Box::new(JsonEncoder));
//!
//! let users = Metadata::new("users")
//!     .with_property("id", Property::new(PropertyType::Int))
//!     .with_property("name", Property::new(PropertyType::Str));
//! let rows = driver.find(&users, &[Filter::gt("id", 100i64)], &[], 10, 0)?;
//! # let _ = rows;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod encoder;
pub mod error;
pub mod models;

pub use config::ConnectOptions;
pub use db::{ConnectionPool, Driver};
pub use encoder::{Encoder, JsonEncoder};
pub use error::{DriverError, DriverResult};
pub use models::{
    Direction, Filter, GenerationStrategy, Metadata, Operand, Order, Property, PropertyType, Row,
    Value,
};
