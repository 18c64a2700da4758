//! Invocation records and the audit boundary.
//!
//! Each tool invocation produces exactly one [`InvocationRecord`], handed to
//! a [`Recorder`]. Persisting records is the recorder's business.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::BindingMode;

/// Whether the invocation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    /// The binding produced a non-error result.
    Success,
    /// The binding failed or returned an error result.
    Error,
}

/// One audited tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRecord {
    /// Tool name.
    pub tool_name: String,
    /// Binding `type` tag.
    pub binding_type: String,
    /// Declared mode, recorded even when nothing was intercepted.
    pub mode: BindingMode,
    /// Arguments as received.
    pub parameters: Value,
    /// Truncated JSON of the result, or the truncated error message.
    pub result_summary: String,
    /// `status` of the execution result, when there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_status: Option<String>,
    /// Wall-clock duration.
    pub elapsed_ms: u64,
    /// Overall outcome.
    pub status: InvocationStatus,
    /// Truncated error text on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When the invocation finished.
    pub timestamp: DateTime<Utc>,
}

/// A recorder could not accept a record.
#[derive(Error, Debug)]
#[error("Recorder failed: {0}")]
pub struct RecorderError(pub String);

/// Sink for invocation records.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Accept one record.
    ///
    /// # Errors
    ///
    /// Returns an error when the record could not be stored.
    async fn record(&self, record: InvocationRecord) -> Result<(), RecorderError>;
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<InvocationRecord>>,
}

impl MemoryRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every record so far.
    #[must_use]
    pub fn records(&self) -> Vec<InvocationRecord> {
        self.guard().clone()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.guard().clear();
    }

    // Records are pushed whole; a poisoned lock still guards a valid list.
    fn guard(&self) -> MutexGuard<'_, Vec<InvocationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Recorder for MemoryRecorder {
    async fn record(&self, record: InvocationRecord) -> Result<(), RecorderError> {
        self.guard().push(record);
        Ok(())
    }
}

/// Emits records as JSON on the `owlclaw::audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

#[async_trait]
impl Recorder for TracingRecorder {
    async fn record(&self, record: InvocationRecord) -> Result<(), RecorderError> {
        let json = serde_json::to_string(&record).map_err(|e| RecorderError(e.to_string()))?;
        tracing::info!(
            target: "owlclaw::audit",
            tool = %record.tool_name,
            status = ?record.status,
            record = %json,
            "Binding invocation"
        );
        Ok(())
    }
}
