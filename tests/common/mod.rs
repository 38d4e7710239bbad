//! Shared test doubles: a session that records every statement and plays
//! back scripted outcomes, and a connector that hands them out.

// not every test binary touches every helper
#![allow(dead_code)]

use granite_mysql::db::{Connector, Session, SharedSession, StatementOutcome};
use granite_mysql::{DriverError, DriverResult, Value};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Default)]
pub struct Recording {
    pub statements: Vec<(String, Vec<Value>)>,
    pub raw: Vec<String>,
    pub outcomes: VecDeque<DriverResult<StatementOutcome>>,
}

/// A scripted session. Statements below the script length return the
/// scripted outcome; anything beyond returns an empty success.
#[derive(Clone, Default)]
pub struct FakeSession {
    recording: Arc<Mutex<Recording>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, outcome: StatementOutcome) {
        self.recording.lock().outcomes.push_back(Ok(outcome));
    }

    pub fn script_rows(&self, rows: Vec<Vec<Value>>) {
        self.script(StatementOutcome {
            rows,
            ..Default::default()
        });
    }

    pub fn script_failure(&self, message: &str) {
        self.recording
            .lock()
            .outcomes
            .push_back(Err(DriverError::query(message)));
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.recording.lock().statements.clone()
    }

    pub fn statement_texts(&self) -> Vec<String> {
        self.recording
            .lock()
            .statements
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn raw_statements(&self) -> Vec<String> {
        self.recording.lock().raw.clone()
    }

    pub fn shared(&self) -> SharedSession {
        Arc::new(Mutex::new(Box::new(self.clone())))
    }
}

impl Session for FakeSession {
    fn exec_raw(&mut self, sql: &str) -> DriverResult<()> {
        self.recording.lock().raw.push(sql.to_string());
        Ok(())
    }

    fn exec(&mut self, sql: &str, binds: &[Value]) -> DriverResult<StatementOutcome> {
        let mut recording = self.recording.lock();
        recording.statements.push((sql.to_string(), binds.to_vec()));
        recording
            .outcomes
            .pop_front()
            .unwrap_or_else(|| Ok(StatementOutcome::default()))
    }
}

/// Hands out fresh fake sessions, optionally refusing after a quota.
pub struct FakeConnector {
    created: Mutex<usize>,
    refuse_after: Option<usize>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            created: Mutex::new(0),
            refuse_after: None,
        }
    }

    pub fn refusing_after(quota: usize) -> Self {
        Self {
            created: Mutex::new(0),
            refuse_after: Some(quota),
        }
    }

    pub fn created(&self) -> usize {
        *self.created.lock()
    }
}

impl Connector for FakeConnector {
    fn connect(&self) -> DriverResult<Box<dyn Session>> {
        let mut created = self.created.lock();
        if let Some(quota) = self.refuse_after {
            if *created >= quota {
                return Err(DriverError::connection("connector quota exhausted"));
            }
        }
        *created += 1;
        Ok(Box::new(FakeSession::new()))
    }
}
