//! Input sources and the lock-guarded access handle.
//!
//! An [`AccessLayer`] owns the diagnostic-message stack that readers append
//! to. It is not meant for concurrent use, so every call goes through an
//! [`AccessSession`]: acquiring one takes the layer's lock, and dropping it
//! clears the message stack and releases the lock on every exit path.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, TryLockError};

use tracing::{debug, warn};

use crate::error::{AccessError, Result};

/// Label used for in-memory sources that were not given one.
pub const MEMORY_LABEL: &str = "<memory>";

/// Where the bytes of a FITS file come from.
#[derive(Debug, Clone)]
pub enum Source<'a> {
    /// A file on disk.
    Path(PathBuf),
    /// A caller-owned buffer and an optional display label.
    Memory {
        bytes: &'a [u8],
        label: Option<String>,
    },
}

impl<'a> Source<'a> {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Source::Path(path.into())
    }

    pub fn memory(bytes: &'a [u8]) -> Self {
        Source::Memory { bytes, label: None }
    }

    /// Attach a display label. Paths already name themselves, so the label
    /// only applies to in-memory sources.
    pub fn with_label(self, label: impl Into<String>) -> Self {
        match self {
            Source::Memory { bytes, .. } => Source::Memory {
                bytes,
                label: Some(label.into()),
            },
            path => path,
        }
    }

    /// Name used for this source in messages.
    pub fn label(&self) -> String {
        match self {
            Source::Path(path) => path.display().to_string(),
            Source::Memory { label, .. } => {
                label.clone().unwrap_or_else(|| MEMORY_LABEL.to_string())
            }
        }
    }
}

#[derive(Debug, Default)]
struct AccessState {
    messages: Vec<String>,
    sessions: u64,
}

/// Shared access handle. At most one [`AccessSession`] exists per layer at
/// any time.
#[derive(Debug, Default)]
pub struct AccessLayer {
    state: Mutex<AccessState>,
}

static SHARED: OnceLock<Arc<AccessLayer>> = OnceLock::new();

impl AccessLayer {
    /// An independent layer, for callers that verify concurrently.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default layer.
    pub fn shared() -> Arc<AccessLayer> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(AccessLayer::new())))
    }

    /// Acquire the layer, blocking while another session is active.
    pub fn session(&self) -> AccessSession<'_> {
        // The guarded state is reset by every session, so a panic in a
        // previous holder leaves nothing to repair.
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        AccessSession::start(guard)
    }

    /// Acquire the layer only if no other session is active.
    pub fn try_session(&self) -> Option<AccessSession<'_>> {
        match self.state.try_lock() {
            Ok(guard) => Some(AccessSession::start(guard)),
            Err(TryLockError::Poisoned(poisoned)) => {
                Some(AccessSession::start(poisoned.into_inner()))
            }
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Number of sessions opened on this layer so far.
    pub fn sessions_opened(&self) -> u64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).sessions
    }
}

/// Exclusive, scoped use of an [`AccessLayer`].
pub struct AccessSession<'a> {
    state: MutexGuard<'a, AccessState>,
}

impl<'a> AccessSession<'a> {
    fn start(mut state: MutexGuard<'a, AccessState>) -> Self {
        state.sessions += 1;
        state.messages.clear();
        debug!(session = state.sessions, "access session opened");
        Self { state }
    }

    /// Read the full contents of `source`. Failures are also pushed onto the
    /// message stack.
    pub fn load<'s>(&mut self, source: &Source<'s>) -> Result<Cow<'s, [u8]>> {
        let loaded = match source {
            Source::Memory { bytes, .. } => Ok(Cow::Borrowed(*bytes)),
            Source::Path(path) => read_file(path).map(Cow::Owned),
        };
        if let Err(err) = &loaded {
            warn!(source = %source.label(), error = %err, "failed to load source");
            self.push_message(err.to_string());
        }
        loaded
    }

    /// Append a diagnostic message.
    pub fn push_message(&mut self, message: impl Into<String>) {
        self.state.messages.push(message.into());
    }

    /// Messages pushed during this session, oldest first.
    pub fn messages(&self) -> &[String] {
        &self.state.messages
    }

    /// Remove and return all pending messages.
    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.state.messages)
    }
}

impl Drop for AccessSession<'_> {
    fn drop(&mut self) {
        self.state.messages.clear();
        debug!(session = self.state.sessions, "access session closed");
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| AccessError::Io {
        path: path.to_path_buf(),
        source,
    })
}
