//! Background profile image uploads.
//!
//! Each upload runs as one blocking task on a tokio runtime. The task reads
//! the file in chunks, writes them to a [`BlobStore`], and reports through a
//! channel: a [`UploadEvent::Progress`] after every chunk and exactly one
//! [`UploadEvent::Finished`] at the end. It never touches caller state; the
//! caller drains events on its own thread with [`UploadHandle::try_next`] or
//! waits with [`UploadHandle::next`].
//!
//! Uploads can be cancelled through their [`CancellationToken`]. The token is
//! checked between chunks; a cancelled upload finishes with
//! [`RosterError::Cancelled`]. An upload that is cancelled or fails after its
//! blob was opened removes the partial blob.

use crate::blob::BlobStore;
use crate::error::{Result, RosterError};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug)]
pub enum UploadEvent {
    /// Fraction of bytes transferred, 0.0 to 1.0.
    Progress(f64),
    /// Blob reference on success.
    Finished(Result<String>),
}

#[derive(Clone)]
pub struct Uploader {
    blobs: Arc<dyn BlobStore>,
    chunk_size: usize,
}

impl Uploader {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn start(&self, runtime: &Handle, path: impl Into<PathBuf>) -> UploadHandle {
        self.start_with_token(runtime, path, CancellationToken::new())
    }

    pub fn start_with_token(
        &self,
        runtime: &Handle,
        path: impl Into<PathBuf>,
        cancel: CancellationToken,
    ) -> UploadHandle {
        let path = path.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let blobs = Arc::clone(&self.blobs);
        let chunk_size = self.chunk_size;
        let token = cancel.clone();

        runtime.spawn_blocking(move || {
            let outcome = transfer(blobs.as_ref(), &path, chunk_size, &token, &tx);
            match &outcome {
                Ok(reference) => info!(path = %path.display(), %reference, "upload finished"),
                Err(e) => warn!(path = %path.display(), error = %e, "upload failed"),
            }
            // the receiver may be gone; nobody is left to tell
            let _ = tx.send(UploadEvent::Finished(outcome));
        });

        UploadHandle {
            events: rx,
            cancel,
            progress: 0.0,
            finished: false,
        }
    }
}

fn blob_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| RosterError::Upload(format!("{} is not a file", path.display())))
}

fn transfer(
    blobs: &dyn BlobStore,
    path: &Path,
    chunk_size: usize,
    cancel: &CancellationToken,
    tx: &UnboundedSender<UploadEvent>,
) -> Result<String> {
    let name = blob_name(path)?;
    let mut file =
        File::open(path).map_err(|e| RosterError::Upload(format!("{}: {}", path.display(), e)))?;
    let total = file
        .metadata()
        .map_err(|e| RosterError::Upload(format!("{}: {}", path.display(), e)))?
        .len();

    // from here on a failure must not leave a partial blob behind
    let mut writer = blobs.writer(&name)?;
    let copied = (|| -> Result<()> {
        let mut buffer = vec![0u8; chunk_size];
        let mut sent: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RosterError::Cancelled);
            }

            let read = file
                .read(&mut buffer)
                .map_err(|e| RosterError::Upload(format!("{}: {}", path.display(), e)))?;
            if read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..read])
                .map_err(|e| RosterError::Upload(format!("{}: {}", name, e)))?;

            sent += read as u64;
            let fraction = if total == 0 {
                1.0
            } else {
                (sent as f64 / total as f64).min(1.0)
            };
            debug!(%name, sent, total, "upload progress");
            let _ = tx.send(UploadEvent::Progress(fraction));
        }
        writer
            .flush()
            .map_err(|e| RosterError::Upload(format!("{}: {}", name, e)))
    })();
    drop(writer);

    if let Err(e) = copied {
        if let Err(cleanup) = blobs.remove(&name) {
            warn!(%name, error = %cleanup, "could not remove partial blob");
        }
        return Err(e);
    }
    if total == 0 {
        let _ = tx.send(UploadEvent::Progress(1.0));
    }
    Ok(blobs.locate(&name))
}

/// The caller's side of a running upload.
pub struct UploadHandle {
    events: UnboundedReceiver<UploadEvent>,
    cancel: CancellationToken,
    progress: f64,
    finished: bool,
}

impl UploadHandle {
    /// Last progress fraction seen by the caller.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn observe(&mut self, event: UploadEvent) -> UploadEvent {
        match &event {
            UploadEvent::Progress(p) => self.progress = *p,
            UploadEvent::Finished(_) => self.finished = true,
        }
        event
    }

    /// Next event if one is ready. Never blocks.
    pub fn try_next(&mut self) -> Option<UploadEvent> {
        if self.finished {
            return None;
        }
        match self.events.try_recv() {
            Ok(event) => Some(self.observe(event)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Some(UploadEvent::Finished(Err(RosterError::Upload(
                    "upload task ended without a result".to_string(),
                ))))
            }
        }
    }

    pub async fn next(&mut self) -> Option<UploadEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await?;
        Some(self.observe(event))
    }
}
