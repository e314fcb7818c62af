use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// An exclusive advisory lock on the task file itself.
///
/// The flock rides the file's own descriptor, so there is no sidecar
/// lock file for concurrent processes to race on. Writes replace the
/// path by renaming a temp file over it, which means a waiter can win
/// the flock on an inode that is no longer the task file; after every
/// acquisition the descriptor is checked against the path and the open
/// is retried when the file was swapped underneath it.
pub struct LockedFile {
    file: File,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("timed out waiting for lock on {path}: another gtdd process may be writing")]
    Timeout { path: PathBuf },
    #[error("lock error: {0}")]
    Io(#[from] io::Error),
}

impl LockedFile {
    /// Lock the file at `path`, creating it when absent.
    /// Blocks up to `timeout` waiting for the lock.
    pub fn create(path: &Path, timeout: Duration) -> Result<LockedFile, LockError> {
        match Self::lock_at(path, timeout, true)? {
            Some(locked) => Ok(locked),
            // lock_at only reports a missing file when not creating
            None => Err(LockError::Open {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
        }
    }

    /// Lock the file at `path` when it exists; `Ok(None)` when it does
    /// not (a missing task file is an empty document, not an error).
    pub fn open_existing(path: &Path, timeout: Duration) -> Result<Option<LockedFile>, LockError> {
        Self::lock_at(path, timeout, false)
    }

    /// Lock with the default timeout (5 seconds), creating if absent.
    pub fn create_default(path: &Path) -> Result<LockedFile, LockError> {
        Self::create(path, Duration::from_secs(5))
    }

    fn lock_at(
        path: &Path,
        timeout: Duration,
        create: bool,
    ) -> Result<Option<LockedFile>, LockError> {
        let start = Instant::now();
        loop {
            let mut options = OpenOptions::new();
            options.read(true);
            if create {
                options.write(true).create(true).truncate(false);
            }
            let file = match options.open(path) {
                Ok(file) => file,
                Err(e) if !create && e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    return Err(LockError::Open {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
            };

            loop {
                match try_flock(&file) {
                    Ok(()) => break,
                    Err(_) if start.elapsed() < timeout => {
                        thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => {
                        return Err(LockError::Timeout {
                            path: path.to_path_buf(),
                        });
                    }
                }
            }

            if is_current(&file, path)? {
                return Ok(Some(LockedFile { file }));
            }
            // the path was replaced while we waited; lock the new file
        }
    }

    /// Read the whole locked file.
    pub fn contents(&mut self) -> io::Result<String> {
        let mut text = String::new();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_string(&mut text)?;
        Ok(text)
    }
}

/// Whether the locked descriptor still names the file at `path`.
#[cfg(unix)]
fn is_current(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;
    let held = file.metadata()?;
    let named = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    Ok(held.ino() == named.ino() && held.dev() == named.dev())
}

#[cfg(not(unix))]
fn is_current(_file: &File, _path: &Path) -> io::Result<bool> {
    Ok(true)
}

/// Try to acquire an exclusive flock on the file (non-blocking)
#[cfg(unix)]
fn try_flock(file: &File) -> Result<(), io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_flock(_file: &File) -> Result<(), io::Error> {
    // On non-Unix platforms, just succeed (advisory locking)
    Ok(())
}
