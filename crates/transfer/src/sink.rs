//! Durable storage for completed transfers.
//!
//! The state machine only sees [`PersistenceSink`]. [`FileSink`] stores
//! each transfer as its own timestamped file, [`MemorySink`] keeps them in
//! memory for tests and embedders that hand the bytes elsewhere.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;

use bledrop_protocol::FileHandle;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::SinkError;
use crate::validation::validate_file_prefix;

/// Boxed future returned by [`PersistenceSink`] methods.
pub type SinkFuture<'a, T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send + 'a>>;

/// Stores completed transfers.
///
/// `write` must be durable once it resolves and must return a handle that
/// is unique per call, so a later transfer never overwrites an earlier one.
pub trait PersistenceSink: Send + Sync {
    /// Stores `content` and returns a handle to it.
    fn write<'a>(&'a self, content: &'a [u8]) -> SinkFuture<'a, FileHandle>;

    /// Removes a previously written artifact.
    fn discard<'a>(&'a self, handle: &'a FileHandle) -> SinkFuture<'a, ()>;
}

/// Upper bound on collision suffixes tried for one timestamp.
const MAX_NAME_ATTEMPTS: u32 = 1000;

// ---------------------------------------------------------------------------
// FileSink
// ---------------------------------------------------------------------------

/// Writes each transfer to `<dir>/<prefix>_<YYYYmmdd_HHMMSS_mmm>.bin`.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    prefix: String,
}

impl FileSink {
    /// Creates a sink rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>, prefix: &str) -> Result<Self, SinkError> {
        validate_file_prefix(prefix)?;
        Ok(Self {
            dir: dir.into(),
            prefix: prefix.to_string(),
        })
    }

    /// Returns the output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(&self, stamp: &str, attempt: u32) -> String {
        if attempt == 0 {
            format!("{}_{stamp}.bin", self.prefix)
        } else {
            format!("{}_{stamp}_{attempt}.bin", self.prefix)
        }
    }

    async fn write_file(&self, content: &[u8]) -> io::Result<FileHandle> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(self.file_name(&stamp, attempt));
            let file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            let mut file = match file {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };

            if let Err(e) = write_durably(&mut file, content).await {
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e);
            }

            debug!(path = %path.display(), size = content.len(), "transfer written");
            return Ok(FileHandle::new(path.to_string_lossy()));
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free file name for timestamp {stamp}"),
        ))
    }

    async fn remove_file(&self, handle: &FileHandle) -> io::Result<()> {
        let path = Path::new(handle.as_str());
        if path.parent() != Some(self.dir.as_path()) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("handle outside sink directory: {handle}"),
            ));
        }
        tokio::fs::remove_file(path).await?;
        debug!(path = %path.display(), "transfer discarded");
        Ok(())
    }
}

async fn write_durably(file: &mut tokio::fs::File, content: &[u8]) -> io::Result<()> {
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await
}

impl PersistenceSink for FileSink {
    fn write<'a>(&'a self, content: &'a [u8]) -> SinkFuture<'a, FileHandle> {
        Box::pin(self.write_file(content))
    }

    fn discard<'a>(&'a self, handle: &'a FileHandle) -> SinkFuture<'a, ()> {
        Box::pin(self.remove_file(handle))
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Keeps written transfers in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: u64,
    files: Vec<(FileHandle, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored bytes for `handle`.
    pub fn get(&self, handle: &FileHandle) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        inner
            .files
            .iter()
            .find(|(h, _)| h == handle)
            .map(|(_, data)| data.clone())
    }

    /// Number of artifacts currently stored.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of writes ever accepted, including discarded ones.
    pub fn writes(&self) -> u64 {
        self.inner.lock().unwrap().next_id
    }
}

impl PersistenceSink for MemorySink {
    fn write<'a>(&'a self, content: &'a [u8]) -> SinkFuture<'a, FileHandle> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.next_id += 1;
            let handle = FileHandle::new(format!("mem-{}", inner.next_id));
            inner.files.push((handle.clone(), content.to_vec()));
            Ok(handle)
        })
    }

    fn discard<'a>(&'a self, handle: &'a FileHandle) -> SinkFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            let before = inner.files.len();
            inner.files.retain(|(h, _)| h != handle);
            if inner.files.len() == before {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("unknown handle: {handle}"),
                ));
            }
            Ok(())
        })
    }
}
