// Recording collaborators shared by the routing and context tests
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::models::ConnectionEndpoint;
use crate::services::backend::{ExecutionBackend, MetadataBackend};
use crate::services::remote::{RemoteConnection, RemoteConnector, RowCursor};

/// Ordered record of every collaborator call, shared between mocks
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

pub struct RecordingBackend {
    name: &'static str,
    log: CallLog,
    result: Vec<String>,
    failure: Option<String>,
}

impl RecordingBackend {
    pub fn new(name: &'static str, log: &CallLog, result: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: log.clone(),
            result: result.iter().map(|s| s.to_string()).collect(),
            failure: None,
        })
    }

    pub fn failing(name: &'static str, log: &CallLog, message: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: log.clone(),
            result: Vec::new(),
            failure: Some(message.to_string()),
        })
    }

    fn run(&self, sql: &str) -> Result<Vec<String>, AppError> {
        self.log.record(format!("{}: {}", self.name, sql));
        match &self.failure {
            Some(message) => Err(AppError::Database(message.clone())),
            None => Ok(self.result.clone()),
        }
    }
}

#[async_trait]
impl MetadataBackend for RecordingBackend {
    async fn run_statement(&self, sql: &str) -> Result<Vec<String>, AppError> {
        self.run(sql)
    }
}

#[async_trait]
impl ExecutionBackend for RecordingBackend {
    async fn run_statement(&self, sql: &str) -> Result<Vec<String>, AppError> {
        self.run(sql)
    }
}

/// Connector whose connections replay a fixed result set
pub struct MockConnector {
    log: CallLog,
    rows: Vec<Option<String>>,
    /// Row index at which `get_string` fails
    fail_at: Option<usize>,
    pub connects: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    pub endpoints: Mutex<Vec<(String, Option<String>)>>,
}

impl MockConnector {
    pub fn new(log: &CallLog, rows: &[Option<&str>]) -> Arc<Self> {
        Self::build(log, rows, None)
    }

    pub fn failing_at(log: &CallLog, rows: &[Option<&str>], fail_at: usize) -> Arc<Self> {
        Self::build(log, rows, Some(fail_at))
    }

    fn build(log: &CallLog, rows: &[Option<&str>], fail_at: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            log: log.clone(),
            rows: rows.iter().map(|r| r.map(str::to_string)).collect(),
            fail_at,
            connects: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            endpoints: Mutex::new(Vec::new()),
        })
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteConnector for MockConnector {
    async fn connect(
        &self,
        endpoint: &ConnectionEndpoint,
        user: Option<&str>,
    ) -> Result<Arc<dyn RemoteConnection>, AppError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.endpoints
            .lock()
            .push((endpoint.url().to_string(), user.map(str::to_string)));
        Ok(Arc::new(MockConnection {
            log: self.log.clone(),
            rows: self.rows.clone(),
            fail_at: self.fail_at,
            closes: self.closes.clone(),
        }))
    }
}

struct MockConnection {
    log: CallLog,
    rows: Vec<Option<String>>,
    fail_at: Option<usize>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl RemoteConnection for MockConnection {
    async fn execute_query(&self, sql: &str) -> Result<Box<dyn RowCursor>, AppError> {
        self.log.record(format!("remote query: {}", sql));
        Ok(Box::new(MockCursor {
            rows: self.rows.clone(),
            position: None,
            fail_at: self.fail_at,
            closes: self.closes.clone(),
        }))
    }

    async fn execute_update(&self, sql: &str) -> Result<(), AppError> {
        self.log.record(format!("remote update: {}", sql));
        Ok(())
    }
}

struct MockCursor {
    rows: Vec<Option<String>>,
    position: Option<usize>,
    fail_at: Option<usize>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl RowCursor for MockCursor {
    async fn next(&mut self) -> Result<bool, AppError> {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next);
        Ok(next < self.rows.len())
    }

    fn column_count(&self) -> usize {
        usize::from(self.position.is_some_and(|p| p < self.rows.len()))
    }

    fn get_string(&self, column: usize) -> Result<Option<String>, AppError> {
        let position = self
            .position
            .ok_or_else(|| AppError::Database("cursor not positioned".to_string()))?;
        if column != 0 {
            return Err(AppError::Database(format!("no column {}", column)));
        }
        if self.fail_at == Some(position) {
            return Err(AppError::Database(format!("cannot read row {}", position)));
        }
        Ok(self.rows[position].clone())
    }

    async fn close(&mut self) -> Result<(), AppError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
