//! Blob storage for profile images.
//!
//! A blob store accepts a named byte stream. [`DirBlobStore`] treats a local
//! directory as the container; [`MemoryBlobStore`] keeps blobs in memory for
//! tests.

use crate::error::{Result, RosterError};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub trait BlobStore: Send + Sync {
    /// Opens a writer for a new blob. The blob is complete once the writer has
    /// been flushed.
    fn writer(&self, name: &str) -> Result<Box<dyn Write + Send>>;

    /// Removes a blob. Removing a missing blob is not an error.
    fn remove(&self, name: &str) -> Result<()>;

    /// The reference stored in a record's image field for this blob.
    fn locate(&self, name: &str) -> String;
}

/// Blob names are flat: no separators, no parent references.
fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(RosterError::Upload(format!("invalid blob name '{}'", name)));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DirBlobStore {
    root: PathBuf,
}

impl DirBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl BlobStore for DirBlobStore {
    fn writer(&self, name: &str) -> Result<Box<dyn Write + Send>> {
        check_name(name)?;
        fs::create_dir_all(&self.root)
            .map_err(|e| RosterError::Upload(format!("{}: {}", self.root.display(), e)))?;
        let file = File::create(self.root.join(name))
            .map_err(|e| RosterError::Upload(format!("{}: {}", name, e)))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn remove(&self, name: &str) -> Result<()> {
        check_name(name)?;
        match fs::remove_file(self.root.join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RosterError::Upload(format!("{}: {}", name, e))),
        }
    }

    fn locate(&self, name: &str) -> String {
        self.root.join(name).display().to_string()
    }
}

type Blobs = Arc<Mutex<HashMap<String, Vec<u8>>>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Blobs,
    offline: bool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses every upload.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.blobs.lock().ok()?.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

struct MemoryWriter {
    name: String,
    buf: Vec<u8>,
    blobs: Blobs,
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "blob map poisoned"))?;
        blobs.insert(self.name.clone(), self.buf.clone());
        Ok(())
    }
}

impl BlobStore for MemoryBlobStore {
    fn writer(&self, name: &str) -> Result<Box<dyn Write + Send>> {
        check_name(name)?;
        if self.offline {
            return Err(RosterError::Upload("blob store is offline".to_string()));
        }
        Ok(Box::new(MemoryWriter {
            name: name.to_string(),
            buf: Vec::new(),
            blobs: Arc::clone(&self.blobs),
        }))
    }

    fn remove(&self, name: &str) -> Result<()> {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.remove(name);
        }
        Ok(())
    }

    fn locate(&self, name: &str) -> String {
        format!("memory://{}", name)
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use std::sync::mpsc::{self, Receiver, Sender};

    type Permits = Arc<Mutex<Receiver<()>>>;

    /// Wraps a store so that every chunk write waits for a permit. Dropping the
    /// sender fails any write still waiting.
    pub struct GatedBlobStore<B> {
        inner: B,
        permits: Permits,
    }

    pub fn gated<B: BlobStore>(inner: B) -> (GatedBlobStore<B>, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let store = GatedBlobStore {
            inner,
            permits: Arc::new(Mutex::new(rx)),
        };
        (store, tx)
    }

    struct GatedWriter {
        inner: Box<dyn Write + Send>,
        permits: Permits,
    }

    impl Write for GatedWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            let permit = self
                .permits
                .lock()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "gate poisoned"))?
                .recv();
            if permit.is_err() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "gate closed"));
            }
            self.inner.write(data)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl<B: BlobStore> BlobStore for GatedBlobStore<B> {
        fn writer(&self, name: &str) -> Result<Box<dyn Write + Send>> {
            Ok(Box::new(GatedWriter {
                inner: self.inner.writer(name)?,
                permits: Arc::clone(&self.permits),
            }))
        }

        fn remove(&self, name: &str) -> Result<()> {
            self.inner.remove(name)
        }

        fn locate(&self, name: &str) -> String {
            self.inner.locate(name)
        }
    }

    /// Opens real writers on the inner store, then fails every write.
    pub struct FailingBlobStore<B>(pub B);

    struct FailingWriter {
        _inner: Box<dyn Write + Send>,
    }

    impl Write for FailingWriter {
        fn write(&mut self, _data: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<B: BlobStore> BlobStore for FailingBlobStore<B> {
        fn writer(&self, name: &str) -> Result<Box<dyn Write + Send>> {
            Ok(Box::new(FailingWriter {
                _inner: self.0.writer(name)?,
            }))
        }

        fn remove(&self, name: &str) -> Result<()> {
            self.0.remove(name)
        }

        fn locate(&self, name: &str) -> String {
            self.0.locate(name)
        }
    }
}
