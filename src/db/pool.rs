//! Connection pool.
//!
//! Outstanding connections form a small arena of shared session handles;
//! the idle list is an id subset of that arena, so idle ⊆ outstanding holds
//! by construction. Both counts are bounded independently: `limit` caps
//! peak concurrency, `idle_limit` caps warm retention.
//!
//! All bookkeeping sits behind one mutex. The admission check and the
//! increment happen under the same lock, so `limit` is never exceeded even
//! when two callers acquire at the same moment.

use crate::config::ConnectOptions;
use crate::db::session::{MysqlSession, Session, SharedSession};
use crate::error::{DriverError, DriverResult};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Connection factory seam. The pool calls this under its state lock, so
/// connection creation also serializes with admission control.
pub trait Connector: Send + Sync {
    fn connect(&self) -> DriverResult<Box<dyn Session>>;
}

/// Connects real MySQL sessions from `ConnectOptions`.
pub struct MysqlConnector {
    options: ConnectOptions,
}

impl MysqlConnector {
    pub fn new(options: ConnectOptions) -> Self {
        Self { options }
    }
}

impl Connector for MysqlConnector {
    fn connect(&self) -> DriverResult<Box<dyn Session>> {
        Ok(Box::new(MysqlSession::connect(&self.options)?))
    }
}

/// A connection checked out of the pool. Belongs to exactly one caller;
/// hand it back with [`ConnectionPool::release`].
pub struct PooledSession {
    id: u64,
    session: SharedSession,
}

impl PooledSession {
    /// Pool-assigned connection id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Shared handle on the underlying session, for driving statements.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }
}

impl std::fmt::Debug for PooledSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledSession").field("id", &self.id).finish()
    }
}

struct PoolState {
    /// Arena of every outstanding connection, keyed by id.
    connections: Vec<(u64, SharedSession)>,
    /// Ids of released, reusable connections.
    idle: Vec<u64>,
    next_id: u64,
}

/// Bounded pool of engine connections. Safe to share across threads.
pub struct ConnectionPool {
    limit: usize,
    idle_limit: usize,
    connector: Box<dyn Connector>,
    state: Mutex<PoolState>,
}

impl ConnectionPool {
    /// Create a pool connecting real MySQL sessions.
    pub fn new(options: ConnectOptions) -> Self {
        let limit = options.limit;
        let idle_limit = options.idle_limit;
        Self::with_connector(Box::new(MysqlConnector::new(options)), limit, idle_limit)
    }

    /// Create a pool over an arbitrary connector.
    pub fn with_connector(connector: Box<dyn Connector>, limit: usize, idle_limit: usize) -> Self {
        Self {
            limit,
            idle_limit,
            connector,
            state: Mutex::new(PoolState {
                connections: Vec::new(),
                idle: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Hand out a connection: an idle one when available, a fresh one while
    /// under `limit`, otherwise `PoolExhausted`.
    pub fn acquire(&self) -> DriverResult<PooledSession> {
        let mut state = self.state.lock();

        if let Some(id) = state.idle.pop() {
            // idle ⊆ outstanding: the arena entry must exist
            if let Some(session) = Self::arena_get(&state, id) {
                debug!(connection_id = id, "reusing idle connection");
                return Ok(PooledSession { id, session });
            }
        }

        if state.connections.len() >= self.limit {
            return Err(DriverError::pool_exhausted(self.limit));
        }

        let session: SharedSession = Arc::new(Mutex::new(self.connector.connect()?));
        let id = state.next_id;
        state.next_id += 1;
        state.connections.push((id, Arc::clone(&session)));

        info!(
            connection_id = id,
            outstanding = state.connections.len(),
            "opened connection"
        );

        Ok(PooledSession { id, session })
    }

    /// Return a connection. Kept idle while under `idle_limit`, closed and
    /// dropped from the arena otherwise.
    pub fn release(&self, handle: PooledSession) {
        let mut state = self.state.lock();

        if state.idle.contains(&handle.id) {
            warn!(connection_id = handle.id, "connection is already idle, ignoring release");
            return;
        }
        if Self::arena_get(&state, handle.id).is_none() {
            warn!(connection_id = handle.id, "released connection is not in the pool");
            return;
        }

        if state.idle.len() < self.idle_limit {
            state.idle.push(handle.id);
            debug!(connection_id = handle.id, idle = state.idle.len(), "connection kept idle");
        } else {
            state.connections.retain(|(id, _)| *id != handle.id);
            info!(
                connection_id = handle.id,
                outstanding = state.connections.len(),
                "closed surplus connection"
            );
        }
    }

    /// Issue a no-op statement on every outstanding connection. Failures
    /// come back per connection; bookkeeping is untouched.
    pub fn ping(&self) -> Vec<(u64, DriverError)> {
        let slots: Vec<(u64, SharedSession)> = {
            let state = self.state.lock();
            state
                .connections
                .iter()
                .map(|(id, session)| (*id, Arc::clone(session)))
                .collect()
        };

        let mut failures = Vec::new();
        for (id, session) in slots {
            if let Err(error) = session.lock().exec_raw("DO 0") {
                warn!(connection_id = id, error = %error, "connection failed ping");
                failures.push((id, error));
            }
        }
        failures
    }

    /// Number of outstanding connections.
    pub fn outstanding(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Number of idle connections.
    pub fn idle(&self) -> usize {
        self.state.lock().idle.len()
    }

    fn arena_get(state: &PoolState, id: u64) -> Option<SharedSession> {
        state
            .connections
            .iter()
            .find(|(cid, _)| *cid == id)
            .map(|(_, session)| Arc::clone(session))
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ConnectionPool")
            .field("limit", &self.limit)
            .field("idle_limit", &self.idle_limit)
            .field("outstanding", &state.connections.len())
            .field("idle", &state.idle.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::session::StatementOutcome;
    use crate::models::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopSession {
        fail_ping: bool,
    }

    impl Session for NoopSession {
        fn exec_raw(&mut self, _sql: &str) -> DriverResult<()> {
            if self.fail_ping {
                Err(DriverError::query("gone away"))
            } else {
                Ok(())
            }
        }

        fn exec(&mut self, _sql: &str, _binds: &[Value]) -> DriverResult<StatementOutcome> {
            Ok(StatementOutcome::default())
        }
    }

    struct NoopConnector {
        connected: AtomicUsize,
        fail_ping: bool,
    }

    impl NoopConnector {
        fn new() -> Self {
            Self {
                connected: AtomicUsize::new(0),
                fail_ping: false,
            }
        }
    }

    impl Connector for NoopConnector {
        fn connect(&self) -> DriverResult<Box<dyn Session>> {
            self.connected.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NoopSession {
                fail_ping: self.fail_ping,
            }))
        }
    }

    struct RefusingConnector;

    impl Connector for RefusingConnector {
        fn connect(&self) -> DriverResult<Box<dyn Session>> {
            Err(DriverError::connection("connection refused"))
        }
    }

    #[test]
    fn test_acquire_up_to_limit_then_exhausted() {
        let pool = ConnectionPool::with_connector(Box::new(NoopConnector::new()), 2, 1);
        let first = pool.acquire().unwrap();
        let _second = pool.acquire().unwrap();
        assert_eq!(pool.outstanding(), 2);

        let result = pool.acquire();
        assert!(matches!(result, Err(DriverError::PoolExhausted { limit: 2 })));

        // releasing frees a slot again
        pool.release(first);
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn test_idle_reuse_does_not_reconnect() {
        let pool = ConnectionPool::with_connector(Box::new(NoopConnector::new()), 2, 2);
        let first = pool.acquire().unwrap();
        let id = first.id();
        pool.release(first);
        assert_eq!(pool.idle(), 1);

        let again = pool.acquire().unwrap();
        assert_eq!(again.id(), id);
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_release_beyond_idle_limit_closes() {
        let pool = ConnectionPool::with_connector(Box::new(NoopConnector::new()), 3, 1);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.release(a);
        pool.release(b);

        assert_eq!(pool.idle(), 1);
        assert_eq!(pool.outstanding(), 1);
    }

    #[test]
    fn test_double_release_is_ignored() {
        let pool = ConnectionPool::with_connector(Box::new(NoopConnector::new()), 2, 2);
        let handle = pool.acquire().unwrap();
        let ghost = PooledSession {
            id: handle.id(),
            session: Arc::clone(handle.session()),
        };
        pool.release(handle);
        pool.release(ghost);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_connect_failure_is_connection_error() {
        let pool = ConnectionPool::with_connector(Box::new(RefusingConnector), 2, 1);
        let result = pool.acquire();
        assert!(matches!(result, Err(DriverError::Connection { .. })));
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_ping_reports_dead_connections_without_evicting() {
        let connector = NoopConnector {
            connected: AtomicUsize::new(0),
            fail_ping: true,
        };
        let pool = ConnectionPool::with_connector(Box::new(connector), 2, 2);
        let handle = pool.acquire().unwrap();
        pool.release(handle);

        let failures = pool.ping();
        assert_eq!(failures.len(), 1);
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_concurrent_acquire_never_exceeds_limit() {
        let pool = Arc::new(ConnectionPool::with_connector(
            Box::new(NoopConnector::new()),
            4,
            4,
        ));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                let peak = Arc::clone(&peak);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if let Ok(session) = pool.acquire() {
                            peak.fetch_max(pool.outstanding(), Ordering::SeqCst);
                            pool.release(session);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert!(pool.idle() <= 4);
    }
}
