//! Database layer: engine session, connection pool, query compiler,
//! transaction stack, and the driver that composes them.

pub mod driver;
pub mod pool;
pub mod query;
pub mod session;
pub mod transaction;

pub use driver::Driver;
pub use pool::{ConnectionPool, Connector, PooledSession};
pub use query::{Bind, Compiled};
pub use session::{MysqlSession, Session, SharedSession, StatementOutcome};
pub use transaction::TransactionStack;
