//! Per-upload state threaded through the chunk loop.
//!
//! Each acknowledged chunk consumes the current [`SessionState`] and yields
//! the next one together with the [`NextStep`] the transport has to take, so
//! the protocol decisions can be exercised without any I/O.

use serde_json::Value;

use crate::error::{Result, UploadError};
use crate::progress::UploadProgress;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    total_size: u64,
    uploaded: u64,
    continuation_id: Option<String>,
    chunk_index: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextStep {
    /// Every byte has been acknowledged; the response body is the result.
    Complete,
    /// The server has not issued a continuation id yet; read it from the body.
    CaptureId,
    /// Send the next chunk, ignoring this response body.
    Continue,
}

impl SessionState {
    pub fn new(total_size: u64) -> Self {
        Self {
            total_size,
            uploaded: 0,
            continuation_id: None,
            chunk_index: 0,
        }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn uploaded(&self) -> u64 {
        self.uploaded
    }

    pub fn chunk_index(&self) -> u64 {
        self.chunk_index
    }

    pub fn continuation_id(&self) -> Option<&str> {
        self.continuation_id.as_deref()
    }

    pub fn progress(&self) -> UploadProgress {
        UploadProgress {
            bytes_uploaded: self.uploaded,
            total_bytes: self.total_size,
        }
    }

    /// Records a successfully acknowledged chunk of `chunk_len` bytes.
    ///
    /// Completion is decided by byte count alone, ahead of any chunk-index
    /// bookkeeping.
    pub fn acknowledge(mut self, chunk_len: u64) -> (Self, NextStep) {
        self.uploaded += chunk_len;
        self.chunk_index += 1;

        let step = if self.uploaded == self.total_size {
            NextStep::Complete
        } else if self.continuation_id.is_some() {
            NextStep::Continue
        } else {
            NextStep::CaptureId
        };
        (self, step)
    }

    /// Stores the continuation id from an intermediate response body.
    pub fn capture_id(mut self, body: &Value) -> Result<Self> {
        let id = extract_id(body).ok_or_else(UploadError::missing_id)?;
        self.continuation_id = Some(id);
        Ok(self)
    }
}

/// The record's non-empty `id`, if it has one.
pub(crate) fn extract_id(body: &Value) -> Option<String> {
    match body.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
