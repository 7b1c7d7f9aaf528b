//! Upload client for a self-hosted file-sharing server.
//!
//! Files go up either in bounded chunks tied together by a server-issued
//! continuation id ([`ChunkedTransport`]) or as one streamed request with
//! byte-level progress ([`SingleShotTransport`]). The caller picks the
//! transport; [`ShareClient`] owns the endpoints.

pub mod chunk;
pub mod client;
pub mod error;
pub mod file;
pub mod progress;
pub mod rest_types;
pub mod serde_utils;
pub mod session;
pub mod transport;

pub use chunk::{ChunkRange, DEFAULT_CHUNK_SIZE, plan_chunks};
pub use client::ShareClient;
pub use error::UploadError;
pub use file::UploadFile;
pub use progress::{ProgressReporter, UploadEvent, UploadProgress};
pub use transport::{ChunkedTransport, SingleShotTransport, UploadTransport};
