use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use futures::stream::BoxStream;
use mime_guess::Mime;
use reqwest::Body;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{ACCEPT_JSON, UploadRequest, UploadTransport};
use crate::error::{Result, UploadError};
use crate::progress::{ProgressReporter, UploadProgress};
use crate::session::extract_id;

const SUB_CHUNK_SIZE: usize = 64 * 1024;

/// Sends the whole file in one request, reporting progress as the body is
/// handed to the connection.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleShotTransport;

fn progress_body(
    slices: BoxStream<'static, io::Result<Bytes>>,
    progress_tx: mpsc::UnboundedSender<u64>,
) -> Body {
    Body::wrap_stream(slices.inspect_ok(move |slice| {
        let _ = progress_tx.send(slice.len() as u64);
    }))
}

impl SingleShotTransport {
    /// Uploads the file and returns the server's record, which must carry an
    /// `id`.
    pub async fn upload(
        &self,
        request: UploadRequest<'_>,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Value> {
        let file = request.file;
        let total_bytes = file.size();
        let slices = file.stream(SUB_CHUNK_SIZE).await?;

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<u64>();
        let mut part = Part::stream_with_length(progress_body(slices, progress_tx), total_bytes)
            .file_name(file.name().to_string());
        if file.content_type().parse::<Mime>().is_ok() {
            part = part.mime_str(file.content_type())?;
        }
        let mut form = Form::new().part("file", part);
        if let Some(note) = request.note() {
            form = form.text("note", note.to_string());
        }

        debug!(file = file.name(), bytes = total_bytes, "sending single-shot upload");
        let upload_fut = request
            .client
            .post(request.url.clone())
            .header(ACCEPT, ACCEPT_JSON)
            .multipart(form)
            .send();
        tokio::pin!(upload_fut);

        let mut bytes_uploaded = 0u64;
        let upload_result = loop {
            tokio::select! {
                biased;
                Some(sent) = progress_rx.recv() => {
                    bytes_uploaded += sent;
                    progress.report(UploadProgress { bytes_uploaded, total_bytes });
                }
                result = &mut upload_fut => {
                    break result;
                }
            }
        };
        while let Ok(sent) = progress_rx.try_recv() {
            bytes_uploaded += sent;
            progress.report(UploadProgress {
                bytes_uploaded,
                total_bytes,
            });
        }

        let response = upload_result?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            debug!(%status, "upload rejected");
            return Err(UploadError::rejected(status, body));
        }

        let record: Value = serde_json::from_str(&body)?;
        if extract_id(&record).is_none() {
            return Err(UploadError::missing_id());
        }
        info!(file = file.name(), bytes = total_bytes, "upload complete");
        Ok(record)
    }
}

#[async_trait]
impl UploadTransport for SingleShotTransport {
    async fn send(
        &self,
        request: UploadRequest<'_>,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Option<Value>> {
        self.upload(request, progress).await.map(Some)
    }
}
