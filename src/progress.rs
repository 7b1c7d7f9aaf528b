use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_uploaded: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    pub fn percent(&self) -> f32 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes_uploaded as f32 / self.total_bytes as f32) * 100.0
    }
}

#[derive(Debug)]
pub enum UploadEvent {
    Progress(UploadProgress),
    Complete(Value),
}

/// Receives `(bytes transferred, total bytes)` updates from a transport.
///
/// Called on the upload task itself, so a slow reporter stalls the upload.
pub trait ProgressReporter: Send {
    fn report(&mut self, progress: UploadProgress);
}

impl<F> ProgressReporter for F
where
    F: FnMut(UploadProgress) + Send,
{
    fn report(&mut self, progress: UploadProgress) {
        self(progress)
    }
}
