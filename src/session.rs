//! Session record: the single persisted "Aegis verified" flag.
//!
//! The record is a small TOON file:
//!
//! ```text
//! [SESSION]
//! id: sess_...
//! project: kavach
//! workdir: /work/kavach
//! today: 2026-10-19
//!
//! [STATE]
//! aegis: true
//! ```
//!
//! A record from an earlier day or another project is replaced by a fresh one.
//! Writers serialise on a `<path>.lock` file and replace the record by
//! renaming a temp file over it.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use thiserror::Error;

/// A lock file older than this is assumed to belong to a dead process.
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);
/// How long to wait for a live lock before giving up.
const LOCK_WAIT: Duration = Duration::from_secs(5);
const LOCK_RETRY: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session file {path} is locked by another process")]
    Locked { path: PathBuf },
    #[error("session file line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// The persisted session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub project: String,
    pub workdir: String,
    pub today: String,
    pub aegis_verified: bool,
}

impl Session {
    /// A fresh, unverified session. The id is a digest of the working
    /// directory and the date, so it is stable for a day.
    pub fn new(project: &str, workdir: &Path, today: &str) -> Self {
        let workdir = workdir.to_string_lossy().into_owned();
        Self {
            id: session_id(&workdir, today),
            project: project.to_string(),
            workdir,
            today: today.to_string(),
            aegis_verified: false,
        }
    }

    /// Parse the TOON record. Unknown keys and sections are ignored.
    pub fn parse(text: &str) -> Result<Self, SessionError> {
        let mut session = Session {
            id: String::new(),
            project: String::new(),
            workdir: String::new(),
            today: String::new(),
            aegis_verified: false,
        };

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "id" => session.id = value.to_string(),
                "project" => session.project = value.to_string(),
                "workdir" => session.workdir = value.to_string(),
                "today" => session.today = value.to_string(),
                "aegis" => {
                    session.aegis_verified = match value {
                        "true" => true,
                        "false" => false,
                        other => {
                            return Err(SessionError::Parse {
                                line: idx + 1,
                                message: format!("expected true or false, got {:?}", other),
                            })
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(session)
    }

    pub fn to_toon(&self) -> String {
        format!(
            "[SESSION]\nid: {}\nproject: {}\nworkdir: {}\ntoday: {}\n\n[STATE]\naegis: {}\n",
            self.id, self.project, self.workdir, self.today, self.aegis_verified
        )
    }
}

fn session_id(workdir: &str, today: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(workdir.as_bytes());
    hasher.update([0u8]);
    hasher.update(today.as_bytes());
    let digest: String = hasher.finalize()[..8]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect();
    format!("sess_{}_{}", today.replace('-', ""), digest)
}

/// Where the verifier records a successful run.
pub trait SessionStore {
    /// Set the verified flag. Idempotent.
    fn mark_aegis_verified(&self) -> Result<(), SessionError>;
}

/// Session record kept in a file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
    project: String,
    workdir: PathBuf,
    today: String,
}

impl FileSessionStore {
    pub fn new(path: PathBuf, project: &str, workdir: &Path, today: &str) -> Self {
        Self {
            path,
            project: project.to_string(),
            workdir: workdir.to_path_buf(),
            today: today.to_string(),
        }
    }

    /// Platform data dir location, e.g. `~/.local/share/kavach/session-state.toon`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "kavach")
            .map(|dirs| dirs.data_dir().join("session-state.toon"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current record, if one exists for today and this project.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let session = Session::parse(&text)?;
        if session.today != self.today || session.project != self.project {
            tracing::debug!(path = %self.path.display(), "discarding session from another day or project");
            return Ok(None);
        }
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        let tmp = self.path.with_extension("toon.tmp");
        fs::write(&tmp, session.to_toon()).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    fn lock(&self) -> Result<LockGuard, SessionError> {
        let lock_path = self.lock_path();
        let started = SystemTime::now();
        loop {
            match try_lock(&lock_path) {
                Ok(Some(guard)) => return Ok(guard),
                Ok(None) => {}
                Err(source) => {
                    return Err(SessionError::Io {
                        path: lock_path,
                        source,
                    })
                }
            }

            if lock_age(&lock_path).is_some_and(|age| age > STALE_LOCK_AGE) {
                tracing::warn!(path = %lock_path.display(), "breaking stale session lock");
                let _ = fs::remove_file(&lock_path);
                continue;
            }

            if started.elapsed().unwrap_or_default() >= LOCK_WAIT {
                return Err(SessionError::Locked { path: self.path.clone() });
            }
            thread::sleep(LOCK_RETRY);
        }
    }
}

impl SessionStore for FileSessionStore {
    fn mark_aegis_verified(&self) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let _guard = self.lock()?;

        let mut session = match self.load()? {
            Some(session) => session,
            None => Session::new(&self.project, &self.workdir, &self.today),
        };
        if session.aegis_verified {
            return Ok(());
        }
        session.aegis_verified = true;
        self.save(&session)?;
        tracing::info!(path = %self.path.display(), session = %session.id, "session marked aegis-verified");
        Ok(())
    }
}

/// Exclusive hold on a lock file, released on drop.
struct LockGuard {
    path: PathBuf,
    _file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn try_lock(path: &Path) -> io::Result<Option<LockGuard>> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(Some(LockGuard {
            path: path.to_path_buf(),
            _file: file,
        })),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(e),
    }
}

fn lock_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

/// Session store that only counts marks. Useful in tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    marks: AtomicU32,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_verified(&self) -> bool {
        self.marks() > 0
    }

    pub fn marks(&self) -> u32 {
        self.marks.load(Ordering::SeqCst)
    }
}

impl SessionStore for MemorySessionStore {
    fn mark_aegis_verified(&self) -> Result<(), SessionError> {
        self.marks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
