//! Shared test fixtures: a recording in-memory connection pool.

#![allow(dead_code)]

use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use steampipe_mcp_server::db::{ConnectionPool, JsonRow, PooledConnection};
use steampipe_mcp_server::error::{DbError, DbResult};

/// Something that happened on the mock pool, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Acquire,
    Begin,
    Query { sql: String, params: Vec<String> },
    Rollback,
    Release,
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    responses: VecDeque<DbResult<Vec<JsonRow>>>,
    fail_acquire: bool,
    fail_begin: bool,
    fail_rollback: bool,
    panic_on_query: bool,
}

/// A pool whose connections record every call and answer queries from a
/// FIFO of scripted responses. Unscripted queries return no rows.
#[derive(Clone, Default)]
pub struct MockPool {
    state: Arc<Mutex<State>>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Turn a JSON object literal into a row.
pub fn row(value: JsonValue) -> JsonRow {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("row must be a JSON object, got {other}"),
    }
}

impl MockPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next query to return these rows.
    pub fn respond(&self, rows: Vec<JsonValue>) -> &Self {
        lock(&self.state)
            .responses
            .push_back(Ok(rows.into_iter().map(row).collect()));
        self
    }

    /// Script the next query to fail.
    pub fn respond_err(&self, err: DbError) -> &Self {
        lock(&self.state).responses.push_back(Err(err));
        self
    }

    pub fn fail_acquire(&self) -> &Self {
        lock(&self.state).fail_acquire = true;
        self
    }

    pub fn fail_begin(&self) -> &Self {
        lock(&self.state).fail_begin = true;
        self
    }

    pub fn fail_rollback(&self) -> &Self {
        lock(&self.state).fail_rollback = true;
        self
    }

    pub fn panic_on_query(&self) -> &Self {
        lock(&self.state).panic_on_query = true;
        self
    }

    pub fn events(&self) -> Vec<Event> {
        lock(&self.state).events.clone()
    }

    pub fn count(&self, wanted: fn(&Event) -> bool) -> usize {
        lock(&self.state).events.iter().filter(|e| wanted(e)).count()
    }

    pub fn acquisitions(&self) -> usize {
        self.count(|e| matches!(e, Event::Acquire))
    }

    pub fn releases(&self) -> usize {
        self.count(|e| matches!(e, Event::Release))
    }

    pub fn rollbacks(&self) -> usize {
        self.count(|e| matches!(e, Event::Rollback))
    }

    /// SQL and parameters of every query, in order.
    pub fn queries(&self) -> Vec<(String, Vec<String>)> {
        lock(&self.state)
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Query { sql, params } => Some((sql.clone(), params.clone())),
                _ => None,
            })
            .collect()
    }

    /// True when no query was recorded before the first begin.
    pub fn begin_precedes_queries(&self) -> bool {
        let events = self.events();
        let first_begin = events.iter().position(|e| *e == Event::Begin);
        let first_query = events
            .iter()
            .position(|e| matches!(e, Event::Query { .. }));
        match (first_begin, first_query) {
            (_, None) => true,
            (Some(begin), Some(query)) => begin < query,
            (None, Some(_)) => false,
        }
    }
}

impl ConnectionPool for MockPool {
    type Connection = MockConnection;

    async fn acquire(&self) -> DbResult<MockConnection> {
        let mut state = lock(&self.state);
        if state.fail_acquire {
            return Err(DbError::timeout("connection pool acquire", 30));
        }
        state.events.push(Event::Acquire);
        Ok(MockConnection {
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MockConnection {
    state: Arc<Mutex<State>>,
}

impl PooledConnection for MockConnection {
    async fn begin_read_only(&mut self) -> DbResult<()> {
        let mut state = lock(&self.state);
        if state.fail_begin {
            return Err(DbError::connection("server closed the connection", "Reconnect"));
        }
        state.events.push(Event::Begin);
        Ok(())
    }

    async fn query(&mut self, sql: &str, params: &[String]) -> DbResult<Vec<JsonRow>> {
        let panic_now = {
            let mut state = lock(&self.state);
            state.events.push(Event::Query {
                sql: sql.to_string(),
                params: params.to_vec(),
            });
            state.panic_on_query
        };
        if panic_now {
            panic!("unit of work exploded");
        }
        lock(&self.state)
            .responses
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn rollback(&mut self) -> DbResult<()> {
        let mut state = lock(&self.state);
        state.events.push(Event::Rollback);
        if state.fail_rollback {
            return Err(DbError::connection("connection reset by peer", "Reconnect"));
        }
        Ok(())
    }

    fn release(self) {
        lock(&self.state).events.push(Event::Release);
    }
}
