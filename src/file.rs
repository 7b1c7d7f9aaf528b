use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::Result;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone, Debug)]
enum Content {
    Memory(Bytes),
    Disk(PathBuf),
}

/// A read-only payload with the name and content type it is uploaded under.
#[derive(Clone, Debug)]
pub struct UploadFile {
    name: String,
    content_type: String,
    size: u64,
    content: Content,
}

impl UploadFile {
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size: data.len() as u64,
            content: Content::Memory(data),
        }
    }

    /// Opens a file on disk. Its size is captured now; the bytes are read
    /// lazily, one range at a time.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let size = tokio::fs::metadata(path).await?.len();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        Ok(Self {
            name,
            content_type,
            size,
            content: Content::Disk(path.to_path_buf()),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Reads bytes `[start, end)`.
    pub async fn read_range(&self, start: u64, end: u64) -> Result<Bytes> {
        let end = end.min(self.size);
        let start = start.min(end);
        match &self.content {
            Content::Memory(data) => Ok(data.slice(start as usize..end as usize)),
            Content::Disk(path) => {
                let mut file = File::open(path).await?;
                file.seek(SeekFrom::Start(start)).await?;
                let mut buffer = vec![0u8; (end - start) as usize];
                file.read_exact(&mut buffer).await?;
                Ok(Bytes::from(buffer))
            }
        }
    }

    /// Streams the whole content in slices of at most `slice_len` bytes. A
    /// file on disk is read slice by slice rather than loaded up front.
    pub async fn stream(
        &self,
        slice_len: usize,
    ) -> Result<BoxStream<'static, io::Result<Bytes>>> {
        let slice_len = slice_len.max(1);
        match &self.content {
            Content::Memory(data) => {
                let data = data.clone();
                let slices: Vec<io::Result<Bytes>> = (0..data.len())
                    .step_by(slice_len)
                    .map(|start| Ok(data.slice(start..(start + slice_len).min(data.len()))))
                    .collect();
                Ok(stream::iter(slices).boxed())
            }
            Content::Disk(path) => {
                let file = File::open(path).await?;
                Ok(
                    stream::try_unfold((file, self.size), move |(file, remaining)| {
                        read_slice(file, remaining, slice_len)
                    })
                    .boxed(),
                )
            }
        }
    }
}

async fn read_slice(
    mut file: File,
    remaining: u64,
    slice_len: usize,
) -> io::Result<Option<(Bytes, (File, u64))>> {
    if remaining == 0 {
        return Ok(None);
    }
    let len = remaining.min(slice_len as u64) as usize;
    let mut buffer = vec![0u8; len];
    file.read_exact(&mut buffer).await?;
    Ok(Some((Bytes::from(buffer), (file, remaining - len as u64))))
}
