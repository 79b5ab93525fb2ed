//! # Filesystem Queue
//!
//! One JSON document per item, named `<uuid-v7>.json` inside the queue
//! directory. UUID v7 is time-ordered, so sorting filenames gives
//! approximate arrival order.
//!
//! Every file access holds an exclusive advisory lock on that one file.
//! `pop` never blocks on a lock: a consumer that loses the race for a file
//! moves on to the next candidate. An item is claimed by reading and
//! truncating it under the lock, so a second consumer that locks the same
//! file before it is deleted finds it empty and skips it.

use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::constants::QUEUE_FILE_EXTENSION;
use crate::messaging::codec;
use crate::messaging::traits::{Delivery, QueueDriver};
use crate::messaging::QueueError;
use crate::updates::Update;

const DRIVER: &str = "file";

#[derive(Debug, Clone)]
pub struct FileQueue {
    directory: PathBuf,
}

impl FileQueue {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the queue directory if it does not exist.
    pub fn ensure_directory(&self) -> Result<(), QueueError> {
        fs::create_dir_all(&self.directory).map_err(|e| QueueError::io(&self.directory, e))
    }

    pub async fn try_push(&self, update: &Update) -> Result<PathBuf, QueueError> {
        let bytes = codec::encode(update)?;
        let path = self.next_item_path();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_item(&target, &bytes)).await??;
        Ok(path)
    }

    pub async fn try_pop(&self) -> Result<Option<Update>, QueueError> {
        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || claim_first(&directory)).await?
    }

    pub async fn try_count(&self) -> Result<usize, QueueError> {
        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || Ok(list_items(&directory)?.len())).await?
    }

    /// The directory exists and this process can create files in it.
    /// Mode bits alone say nothing about ownership, so a marker file is
    /// created and removed.
    pub fn probe(&self) -> bool {
        if !self.directory.is_dir() {
            return false;
        }
        let marker = self
            .directory
            .join(format!(".probe-{}", Uuid::new_v4().simple()));
        match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(file) => {
                drop(file);
                if let Err(e) = fs::remove_file(&marker) {
                    debug!(path = %marker.display(), error = %e, "Failed to remove writability marker");
                }
                true
            }
            Err(e) => {
                debug!(directory = %self.directory.display(), error = %e, "Queue directory is not writable");
                false
            }
        }
    }

    fn next_item_path(&self) -> PathBuf {
        self.directory.join(format!(
            "{}.{}",
            Uuid::now_v7().simple(),
            QUEUE_FILE_EXTENSION
        ))
    }
}

fn write_item(path: &Path, bytes: &[u8]) -> Result<(), QueueError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| QueueError::io(path, e))?;

    // Blocking is fine here: nobody else knows the name yet except a
    // consumer that sees the empty file and lets go immediately.
    file.lock_exclusive().map_err(|e| QueueError::io(path, e))?;
    let result = file
        .set_len(0)
        .and_then(|()| file.write_all(bytes))
        .and_then(|()| file.flush())
        .map_err(|e| QueueError::io(path, e));
    let _ = FileExt::unlock(&file);
    result
}

fn list_items(directory: &Path) -> Result<Vec<PathBuf>, QueueError> {
    let entries = fs::read_dir(directory).map_err(|e| QueueError::io(directory, e))?;
    let mut items: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension().and_then(|ext| ext.to_str()) == Some(QUEUE_FILE_EXTENSION)
                && path.is_file()
        })
        .collect();
    items.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(items)
}

fn claim_first(directory: &Path) -> Result<Option<Update>, QueueError> {
    for path in list_items(directory)? {
        let Some(content) = claim(&path)? else {
            continue;
        };

        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove claimed queue item");
            }
        }

        return codec::decode(&content).map(Some);
    }
    Ok(None)
}

/// Read and truncate one item under a non-blocking exclusive lock. `None`
/// means the file is gone, locked by someone else, or already claimed.
fn claim(path: &Path) -> Result<Option<Vec<u8>>, QueueError> {
    let mut file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(QueueError::io(path, e)),
    };

    if file.try_lock_exclusive().is_err() {
        debug!(path = %path.display(), "Queue item locked by another consumer, skipping");
        return Ok(None);
    }

    let result = read_and_clear(&mut file).map_err(|e| QueueError::io(path, e));
    let _ = FileExt::unlock(&file);

    match result? {
        content if content.iter().all(u8::is_ascii_whitespace) => Ok(None),
        content => Ok(Some(content)),
    }
}

fn read_and_clear(file: &mut File) -> std::io::Result<Vec<u8>> {
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    if !content.is_empty() {
        file.set_len(0)?;
    }
    Ok(content)
}

#[async_trait]
impl QueueDriver for FileQueue {
    fn driver_name(&self) -> &'static str {
        DRIVER
    }

    async fn push(&self, update: &Update) -> bool {
        match self.try_push(update).await {
            Ok(path) => {
                debug!(path = %path.display(), "Saved update to queue file");
                true
            }
            Err(e) => {
                warn!(driver = DRIVER, error = %e, "Failed to push to file queue");
                false
            }
        }
    }

    async fn receive(&self) -> Option<Delivery> {
        match self.try_pop().await {
            Ok(update) => update.map(Delivery::settled),
            Err(QueueError::MalformedItem { message }) => {
                warn!(driver = DRIVER, error = %message, "Dropped malformed queue item");
                None
            }
            Err(e) => {
                warn!(driver = DRIVER, error = %e, "Failed to pop from file queue");
                None
            }
        }
    }

    async fn count(&self) -> usize {
        self.try_count().await.unwrap_or_else(|e| {
            warn!(driver = DRIVER, error = %e, "Failed to count file queue");
            0
        })
    }

    async fn is_connected(&self) -> bool {
        self.probe()
    }
}
