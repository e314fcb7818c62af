pub mod lock;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::model::Document;
use crate::parse::{parse_document, serialize_document};
use crate::store::lock::{LockError, LockedFile};
use crate::title::TitleResolver;

/// Error type for task store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Owner of the single backing task file.
///
/// Every operation is a full load-mutate-save cycle: the Document is
/// parsed fresh, used, and discarded; the markdown file is the only
/// durable state. Mutations serialize through an in-process mutex plus
/// an advisory flock (for concurrent processes), and all writes are
/// atomic (temp file + rename), so a reader never observes a
/// half-written file. Concurrent replaces are last-write-wins.
pub struct TaskStore {
    path: PathBuf,
    resolver: TitleResolver,
    guard: Mutex<()>,
}

impl TaskStore {
    pub fn new(path: PathBuf, resolver: TitleResolver) -> TaskStore {
        TaskStore {
            path,
            resolver,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current Document. A missing file is an empty Document,
    /// not an error.
    pub fn read(&self) -> Result<Document, StoreError> {
        let text = self.read_markdown()?;
        // title resolution (possibly network) happens here, after the
        // file section has been released
        let (doc, dropped) = parse_document(&text, &self.resolver);
        report_dropped(&dropped);
        Ok(doc)
    }

    /// Read the raw markdown. A missing file yields the canonical empty
    /// document text.
    pub fn read_markdown(&self) -> Result<String, StoreError> {
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        match LockedFile::open_existing(&self.path, LOCK_TIMEOUT)? {
            Some(mut locked) => locked.contents().map_err(|e| StoreError::Read {
                path: self.path.clone(),
                source: e,
            }),
            None => Ok(serialize_document(&Document::default())),
        }
    }

    /// Replace the whole file with the given markdown text. The text is
    /// round-tripped through the codec so the persisted form is
    /// canonical. Returns the resulting Document.
    pub fn replace_markdown(&self, markdown: &str) -> Result<Document, StoreError> {
        // parse first: any title fetches run before the file section
        let (doc, dropped) = parse_document(markdown, &self.resolver);
        report_dropped(&dropped);
        self.persist(&doc)?;
        Ok(doc)
    }

    /// Replace the whole file with a Document supplied as JSON.
    pub fn replace_json(&self, body: &str) -> Result<Document, StoreError> {
        let mut doc: Document =
            serde_json::from_str(body).map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
        doc.assign_ids();
        self.persist(&doc)?;
        Ok(doc)
    }

    /// Persist an empty Document. Unconditional; confirmation is the
    /// caller's concern.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.persist(&Document::default())
    }

    /// Resolve a URL to a title. Never touches the backing file.
    pub fn resolve_title(&self, url: &str) -> String {
        self.resolver.resolve(url)
    }

    fn persist(&self, doc: &Document) -> Result<(), StoreError> {
        let content = serialize_document(doc);
        let _guard = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        }
        // hold the current file's flock across the rename; waiters
        // re-check the path and pick up the replacement
        let _locked = LockedFile::create(&self.path, LOCK_TIMEOUT)?;
        atomic_write(&self.path, content.as_bytes()).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

fn report_dropped(dropped: &[String]) {
    if !dropped.is_empty() {
        log::warn!("task file: skipped {} unparsable line(s)", dropped.len());
    }
}

/// Write `content` to `path` atomically using a temp file + rename.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
