//! Ways of getting an [`UploadFile`] to the server.
//!
//! Both transports share one completion contract: the server's JSON record
//! on success, the first failure otherwise, never a retry.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::Result;
use crate::file::UploadFile;
use crate::progress::ProgressReporter;

mod chunked;
mod single_shot;

pub use chunked::{ChunkedTransport, chunk_fields};
pub use single_shot::SingleShotTransport;

pub(crate) const ACCEPT_JSON: &str = "application/json";

/// Everything a transport needs to send one upload.
pub struct UploadRequest<'a> {
    pub client: &'a Client,
    pub url: Url,
    pub file: &'a UploadFile,
    pub note: Option<&'a str>,
}

impl UploadRequest<'_> {
    /// The note, if there is one worth sending.
    pub(crate) fn note(&self) -> Option<&str> {
        self.note.filter(|note| !note.is_empty())
    }
}

#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Sends the file and returns the server's final record.
    ///
    /// `Ok(None)` means nothing was sent, which only happens for an empty
    /// file on the chunked transport.
    async fn send(
        &self,
        request: UploadRequest<'_>,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Option<Value>>;
}
