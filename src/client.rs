use futures::future::BoxFuture;
use futures::stream::BoxStream;
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use crate::error::{Result, UploadError};
use crate::file::UploadFile;
use crate::progress::{ProgressReporter, UploadEvent, UploadProgress};
use crate::rest_types::EditEntryRequest;
use crate::transport::{ACCEPT_JSON, SingleShotTransport, UploadRequest, UploadTransport};

/// Client for the share server's upload and entry endpoints.
#[derive(Clone, Debug)]
pub struct ShareClient {
    client: Client,
    base_url: Url,
}

/// Forwards progress from the upload task to an event stream.
struct ChannelReporter(mpsc::UnboundedSender<UploadProgress>);

impl ProgressReporter for ChannelReporter {
    fn report(&mut self, progress: UploadProgress) {
        let _ = self.0.send(progress);
    }
}

impl ShareClient {
    /// Builds a client. `session_cookie` (`name=value`) is sent with every
    /// request, which is how edits and deletes are authorized.
    pub fn new(base_url: Url, session_cookie: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = session_cookie.filter(|cookie| !cookie.is_empty()) {
            let mut value =
                HeaderValue::from_str(cookie).map_err(|_| UploadError::InvalidSessionCookie)?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }
        let client = Client::builder().default_headers(headers).build()?;
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: Client, base_url: Url) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` to the base URL, encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| UploadError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn upload_url(&self, segments: &[&str], expiration: &str) -> Result<Url> {
        let mut url = self.endpoint(segments)?;
        url.query_pairs_mut().append_pair("expiration", expiration);
        Ok(url)
    }

    /// Uploads `file` as an authenticated entry using `transport`.
    ///
    /// Returns `Ok(None)` when the transport sent nothing, which the chunked
    /// transport does for an empty file.
    pub async fn upload_file(
        &self,
        file: &UploadFile,
        expiration: &str,
        note: Option<&str>,
        transport: &dyn UploadTransport,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Option<Value>> {
        let url = self.upload_url(&["api", "entry"], expiration)?;
        debug!(%url, file = file.name(), size = file.size(), "uploading entry");
        transport
            .send(
                UploadRequest {
                    client: &self.client,
                    url,
                    file,
                    note,
                },
                progress,
            )
            .await
    }

    /// Uploads `file` through a guest link. Guest uploads are single-shot and
    /// never carry a note.
    pub async fn guest_upload_file(
        &self,
        file: &UploadFile,
        guest_link_id: &str,
        expiration: &str,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Value> {
        let url = self.upload_url(&["api", "guest", guest_link_id], expiration)?;
        debug!(%url, file = file.name(), size = file.size(), "uploading through guest link");
        SingleShotTransport
            .upload(
                UploadRequest {
                    client: &self.client,
                    url,
                    file,
                    note: None,
                },
                progress,
            )
            .await
    }

    /// [`upload_file`](Self::upload_file) as a stream of progress events
    /// ending in `Complete`. An empty chunked upload ends without `Complete`.
    pub fn upload_file_events<'a>(
        &'a self,
        file: &'a UploadFile,
        expiration: &'a str,
        note: Option<&'a str>,
        transport: &'a dyn UploadTransport,
    ) -> BoxStream<'a, Result<UploadEvent>> {
        track_events(file.size(), move |mut reporter| {
            Box::pin(async move {
                self.upload_file(file, expiration, note, transport, &mut reporter)
                    .await
            })
        })
    }

    pub fn guest_upload_file_events<'a>(
        &'a self,
        file: &'a UploadFile,
        guest_link_id: &'a str,
        expiration: &'a str,
    ) -> BoxStream<'a, Result<UploadEvent>> {
        track_events(file.size(), move |mut reporter| {
            Box::pin(async move {
                self.guest_upload_file(file, guest_link_id, expiration, &mut reporter)
                    .await
                    .map(Some)
            })
        })
    }

    /// Updates an entry's metadata. An absent or empty `expiration` leaves
    /// the entry's expiration alone.
    pub async fn edit_file(
        &self,
        id: &str,
        filename: &str,
        expiration: Option<&str>,
        note: &str,
    ) -> Result<()> {
        let url = self.endpoint(&["api", "entry", id])?;
        let request = EditEntryRequest {
            filename,
            note,
            expiration,
        };
        debug!(%url, "editing entry");

        let response = self
            .client
            .put(url)
            .header(ACCEPT, ACCEPT_JSON)
            .json(&request)
            .send()
            .await?;
        ensure_success(response).await
    }

    pub async fn delete_file(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&["api", "entry", id])?;
        debug!(%url, "deleting entry");

        let response = self
            .client
            .delete(url)
            .header(ACCEPT, ACCEPT_JSON)
            .send()
            .await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await?;
    Err(UploadError::rejected(status, body))
}

fn track_events<'a, F>(total_bytes: u64, run: F) -> BoxStream<'a, Result<UploadEvent>>
where
    F: FnOnce(ChannelReporter) -> BoxFuture<'a, Result<Option<Value>>>,
{
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let mut upload = run(ChannelReporter(progress_tx));

    let stream = async_stream::try_stream! {
        yield UploadEvent::Progress(UploadProgress {
            bytes_uploaded: 0,
            total_bytes,
        });

        let upload_result = loop {
            tokio::select! {
                biased;
                Some(progress) = progress_rx.recv() => {
                    yield UploadEvent::Progress(progress);
                }
                result = &mut upload => {
                    break result;
                }
            }
        };
        while let Ok(progress) = progress_rx.try_recv() {
            yield UploadEvent::Progress(progress);
        }

        if let Some(record) = upload_result? {
            yield UploadEvent::Complete(record);
        }
    };

    Box::pin(stream)
}
