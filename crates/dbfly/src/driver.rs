//! Database driver boundary.
//!
//! The engine never talks to a database directly; every statement goes
//! through the [`Driver`] trait supplied by the caller. Implementations are
//! expected to check the cancellation token before issuing work and to run
//! each call inside whatever connection/transaction scope the caller
//! manages; the engine itself opens no transactions.
//!
//! Bind parameters use `?` placeholders; drivers for databases with a
//! different placeholder style are expected to translate.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{MigrateError, Result};

/// A SQL bind parameter or result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

/// One result row.
#[derive(Debug, Clone, Default)]
pub struct Row(Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, index: usize) -> Result<&Value> {
        self.0
            .get(index)
            .ok_or_else(|| MigrateError::Row(format!("missing column {}", index)))
    }

    /// Read a text column.
    pub fn get_str(&self, index: usize) -> Result<&str> {
        match self.get(index)? {
            Value::Text(text) => Ok(text),
            other => Err(MigrateError::Row(format!(
                "column {} is not text: {:?}",
                index, other
            ))),
        }
    }

    /// Read a nullable text column.
    pub fn get_opt_str(&self, index: usize) -> Result<Option<&str>> {
        match self.get(index)? {
            Value::Null => Ok(None),
            Value::Text(text) => Ok(Some(text)),
            other => Err(MigrateError::Row(format!(
                "column {} is not text: {:?}",
                index, other
            ))),
        }
    }

    /// Read an integer column.
    pub fn get_i64(&self, index: usize) -> Result<i64> {
        match self.get(index)? {
            Value::Int(value) => Ok(*value),
            Value::Bool(value) => Ok(i64::from(*value)),
            other => Err(MigrateError::Row(format!(
                "column {} is not an integer: {:?}",
                index, other
            ))),
        }
    }

    /// Read a boolean column; integers coerce with the usual non-zero rule.
    pub fn get_bool(&self, index: usize) -> Result<bool> {
        match self.get(index)? {
            Value::Bool(value) => Ok(*value),
            Value::Int(value) => Ok(*value != 0),
            other => Err(MigrateError::Row(format!(
                "column {} is not a boolean: {:?}",
                index, other
            ))),
        }
    }
}

/// Streaming query result. Dropping the value releases it.
#[async_trait]
pub trait Rows: Send {
    /// Fetch the next row, or `None` when the result set is exhausted.
    async fn next(&mut self) -> Result<Option<Row>>;
}

/// Executes statements against the target database.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Execute a statement. Must abort with [`MigrateError::Cancelled`]
    /// before issuing anything if the token is already cancelled.
    async fn execute(&self, cancel: &CancellationToken, sql: &str, params: &[Value])
        -> Result<()>;

    /// Run a query and stream its rows.
    async fn query(
        &self,
        cancel: &CancellationToken,
        sql: &str,
        params: &[Value],
    ) -> Result<Box<dyn Rows>>;
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for std::sync::Arc<D> {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        sql: &str,
        params: &[Value],
    ) -> Result<()> {
        (**self).execute(cancel, sql, params).await
    }

    async fn query(
        &self,
        cancel: &CancellationToken,
        sql: &str,
        params: &[Value],
    ) -> Result<Box<dyn Rows>> {
        (**self).query(cancel, sql, params).await
    }
}

/// An empty result set.
pub struct EmptyRows;

#[async_trait]
impl Rows for EmptyRows {
    async fn next(&mut self) -> Result<Option<Row>> {
        Ok(None)
    }
}

/// Whether a recorded call was an execute or a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Execute,
    Query,
}

/// One call recorded by [`DryRunDriver`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub sql: String,
    pub params: Vec<Value>,
}

/// A driver that records every call instead of touching a database.
///
/// Queries return empty result sets, so against this driver the engine
/// behaves as if no change-log table and no schema objects exist. Useful
/// for dry runs and for counting the statements a migration would issue.
#[derive(Debug, Default)]
pub struct DryRunDriver {
    calls: Mutex<Vec<RecordedCall>>,
}

impl DryRunDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// SQL texts of the recorded execute calls, in order.
    pub fn executed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.kind == CallKind::Execute)
            .map(|call| call.sql)
            .collect()
    }

    fn record(&self, kind: CallKind, sql: &str, params: &[Value]) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                kind,
                sql: sql.to_string(),
                params: params.to_vec(),
            });
        }
    }
}

#[async_trait]
impl Driver for DryRunDriver {
    async fn execute(
        &self,
        cancel: &CancellationToken,
        sql: &str,
        params: &[Value],
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }
        debug!(sql, ?params, "dry-run execute");
        self.record(CallKind::Execute, sql, params);
        Ok(())
    }

    async fn query(
        &self,
        cancel: &CancellationToken,
        sql: &str,
        params: &[Value],
    ) -> Result<Box<dyn Rows>> {
        if cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }
        debug!(sql, ?params, "dry-run query");
        self.record(CallKind::Query, sql, params);
        Ok(Box::new(EmptyRows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_accessors() {
        let row = Row::new(vec![
            Value::Int(3),
            Value::Text("name".to_string()),
            Value::Null,
            Value::Bool(true),
        ]);
        assert_eq!(row.get_i64(0).unwrap(), 3);
        assert_eq!(row.get_str(1).unwrap(), "name");
        assert_eq!(row.get_opt_str(2).unwrap(), None);
        assert!(row.get_bool(3).unwrap());
        assert!(row.get_bool(0).unwrap());
        assert!(row.get_str(0).is_err());
        assert!(row.get(9).is_err());
    }

    #[tokio::test]
    async fn test_dry_run_driver_records_calls() {
        let driver = DryRunDriver::new();
        let cancel = CancellationToken::new();
        driver
            .execute(&cancel, "CREATE TABLE t (id INT)", &[])
            .await
            .unwrap();
        let mut rows = driver
            .query(&cancel, "SELECT 1", &[Value::from("x")])
            .await
            .unwrap();
        assert!(rows.next().await.unwrap().is_none());

        let calls = driver.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].kind, CallKind::Execute);
        assert_eq!(calls[1].kind, CallKind::Query);
        assert_eq!(driver.executed(), vec!["CREATE TABLE t (id INT)"]);
    }

    #[tokio::test]
    async fn test_dry_run_driver_honors_cancellation() {
        let driver = DryRunDriver::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = driver.execute(&cancel, "SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, MigrateError::Cancelled));
        assert!(driver.calls().is_empty());
    }
}
