//! Nested transaction control.
//!
//! The first `begin` opens a real MySQL transaction; every nested `begin`
//! stacks a savepoint on top of it. Commit and rollback always resolve the
//! innermost scope, so nesting unwinds strictly LIFO.

use crate::db::session::Session;
use crate::error::{DriverError, DriverResult};
use tracing::debug;

/// One open transaction scope.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Real,
    Savepoint(String),
}

/// LIFO stack of open scopes for a single session.
#[derive(Debug, Default)]
pub struct TransactionStack {
    scopes: Vec<Scope>,
    next_savepoint: u64,
}

impl TransactionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn in_transaction(&self) -> bool {
        !self.scopes.is_empty()
    }

    /// Open a new scope. The statement runs before the stack grows, so a
    /// failed BEGIN or SAVEPOINT leaves the stack unchanged.
    pub fn begin(&mut self, session: &mut dyn Session) -> DriverResult<()> {
        let scope = if self.scopes.is_empty() {
            session.exec_raw("BEGIN")?;
            Scope::Real
        } else {
            let id = format!("sp_{}", self.next_savepoint);
            session.exec_raw(&format!("SAVEPOINT {id}"))?;
            self.next_savepoint += 1;
            Scope::Savepoint(id)
        };
        self.scopes.push(scope);
        debug!(depth = self.scopes.len(), "opened transaction scope");
        Ok(())
    }

    /// Commit the innermost scope.
    pub fn commit(&mut self, session: &mut dyn Session) -> DriverResult<()> {
        let scope = self
            .scopes
            .pop()
            .ok_or(DriverError::NoActiveTransaction)?;
        let result = match &scope {
            Scope::Real => session.exec_raw("COMMIT"),
            Scope::Savepoint(id) => session.exec_raw(&format!("RELEASE SAVEPOINT {id}")),
        };
        if result.is_err() {
            self.scopes.push(scope);
        }
        result?;
        debug!(depth = self.scopes.len(), "committed transaction scope");
        Ok(())
    }

    /// Roll back the innermost scope.
    pub fn rollback(&mut self, session: &mut dyn Session) -> DriverResult<()> {
        let scope = self
            .scopes
            .pop()
            .ok_or(DriverError::NoActiveTransaction)?;
        let result = match &scope {
            Scope::Real => session.exec_raw("ROLLBACK"),
            Scope::Savepoint(id) => session.exec_raw(&format!("ROLLBACK TO SAVEPOINT {id}")),
        };
        if result.is_err() {
            self.scopes.push(scope);
        }
        result?;
        debug!(depth = self.scopes.len(), "rolled back transaction scope");
        Ok(())
    }
}
