use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, info};

use super::{ACCEPT_JSON, UploadRequest, UploadTransport};
use crate::chunk::{ChunkRange, DEFAULT_CHUNK_SIZE, plan_chunks};
use crate::error::{Result, UploadError, status_text};
use crate::file::UploadFile;
use crate::progress::ProgressReporter;
use crate::session::{NextStep, SessionState};

/// Sends the file as a sequence of bounded multipart requests.
///
/// The first response carries the continuation id that ties the remaining
/// chunks to the same upload, so chunks go out strictly one after another.
#[derive(Clone, Copy, Debug)]
pub struct ChunkedTransport {
    chunk_size: u64,
}

impl Default for ChunkedTransport {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ChunkedTransport {
    pub fn new(chunk_size: u64) -> Result<Self> {
        if chunk_size == 0 {
            return Err(UploadError::InvalidChunkSize);
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }
}

/// Text fields sent alongside the bytes of `chunk`.
pub fn chunk_fields(
    file: &UploadFile,
    chunk: &ChunkRange,
    note: Option<&str>,
    continuation_id: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("filename", file.name().to_string()),
        ("contentType", file.content_type().to_string()),
        ("last", if chunk.is_last { "1" } else { "0" }.to_string()),
    ];
    if let Some(note) = note.filter(|note| !note.is_empty()) {
        fields.push(("note", note.to_string()));
    }
    if let Some(id) = continuation_id {
        fields.push(("id", id.to_string()));
    }
    fields
}

fn chunk_form(file: &UploadFile, data: Bytes, fields: Vec<(&'static str, String)>) -> Form {
    let len = data.len() as u64;
    let part = Part::stream_with_length(data, len).file_name(file.name().to_string());
    fields
        .into_iter()
        .fold(Form::new().part("file", part), |form, (name, value)| {
            form.text(name, value)
        })
}

#[async_trait]
impl UploadTransport for ChunkedTransport {
    async fn send(
        &self,
        request: UploadRequest<'_>,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Option<Value>> {
        let file = request.file;
        let chunks = plan_chunks(file.size(), self.chunk_size);
        let mut state = SessionState::new(file.size());

        if chunks.is_empty() {
            // Nothing to send and so no record to return for an empty file.
            info!(file = file.name(), "empty file, no chunks sent");
            return Ok(None);
        }

        for chunk in &chunks {
            let data = file.read_range(chunk.start, chunk.end).await?;
            let fields = chunk_fields(file, chunk, request.note(), state.continuation_id());
            debug!(
                chunk = chunk.index,
                of = chunks.len(),
                start = chunk.start,
                end = chunk.end,
                continuation_id = state.continuation_id(),
                "sending chunk"
            );

            let response = request
                .client
                .post(request.url.clone())
                .header(ACCEPT, ACCEPT_JSON)
                .multipart(chunk_form(file, data, fields))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                debug!(chunk = chunk.index, %status, "chunk rejected");
                return Err(UploadError::ServerRejected {
                    status,
                    message: format!("Upload failed: {}", status_text(status)),
                });
            }

            let (next, step) = state.acknowledge(chunk.len());
            state = next;
            progress.report(state.progress());

            match step {
                NextStep::Complete => {
                    let body = response.text().await?;
                    let record: Value = serde_json::from_str(&body)?;
                    info!(
                        file = file.name(),
                        bytes = state.uploaded(),
                        chunks = state.chunk_index(),
                        "upload complete"
                    );
                    return Ok(Some(record));
                }
                NextStep::CaptureId => {
                    let body = response.text().await?;
                    let body: Value = serde_json::from_str(&body)?;
                    state = state.capture_id(&body)?;
                    debug!(continuation_id = state.continuation_id(), "continuation id issued");
                }
                NextStep::Continue => {}
            }
        }

        // The plan tiles the file exactly, so the last chunk always completes.
        Err(UploadError::ProtocolViolation(format!(
            "Upload ended after {} of {} bytes",
            state.uploaded(),
            state.total_size()
        )))
    }
}
