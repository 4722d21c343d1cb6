// auth-server/src/snapshot.rs
use actix::{Actor, AsyncContext, Context, Handler, Message, MessageResult};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use crate::credential_store::{CredentialStore, StoreSnapshot};
use crate::error::AuthError;

/// Read a snapshot written by [`write_snapshot`]. A missing file means a fresh store.
pub fn load_snapshot(path: &Path) -> Result<Option<StoreSnapshot>, AuthError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!("No snapshot at {}, starting empty", path.display());
            return Ok(None);
        },
        Err(e) => {
            return Err(AuthError::Internal(format!(
                "failed to read snapshot {}: {}",
                path.display(),
                e
            )))
        }
    };

    let snapshot = serde_json::from_slice(&bytes).map_err(|e| {
        AuthError::Internal(format!("failed to decode snapshot {}: {}", path.display(), e))
    })?;
    Ok(Some(snapshot))
}

/// Write the snapshot next to `path` and rename it into place
pub fn write_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<(), AuthError> {
    let io_err = |e: std::io::Error| {
        AuthError::Internal(format!("failed to write snapshot {}: {}", path.display(), e))
    };

    let bytes = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| AuthError::Internal(format!("failed to encode snapshot: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    // A leftover tmp file may carry looser permissions
    match fs::remove_file(&tmp) {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(io_err(e)),
        _ => {},
    }
    write_private(&tmp, &bytes).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

/// Create `path` readable and writable by the owner only
#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    fs::write(path, bytes)
}

/// Actor message: write the store to disk now if it changed.
/// Resolves to whether a snapshot was written.
#[derive(Message)]
#[rtype(result = "Result<bool, AuthError>")]
pub struct FlushSnapshot;

/// Periodically persists the credential store
pub struct SnapshotActor {
    store: Arc<CredentialStore>,
    path: PathBuf,
    flush_interval: Duration,
}

impl SnapshotActor {
    pub fn new(store: Arc<CredentialStore>, path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            path: path.into(),
            flush_interval: Duration::from_secs(30),
        }
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    fn flush(&self) -> Result<bool, AuthError> {
        if !self.store.take_dirty() {
            return Ok(false);
        }

        if let Err(e) = write_snapshot(&self.path, &self.store.snapshot()) {
            // Retry on the next tick
            self.store.mark_dirty();
            return Err(e);
        }

        tracing::debug!(
            "Wrote snapshot: {} users, {} registration codes",
            self.store.user_count(),
            self.store.outstanding_codes()
        );
        Ok(true)
    }
}

impl Actor for SnapshotActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            "SnapshotActor started: {} every {}s",
            self.path.display(),
            self.flush_interval.as_secs()
        );

        ctx.run_interval(self.flush_interval, |act, _ctx| {
            if let Err(e) = act.flush() {
                tracing::error!("Snapshot flush failed: {}", e);
            }
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        match self.flush() {
            Ok(_) => tracing::info!("SnapshotActor stopped, store persisted"),
            Err(e) => tracing::error!("Final snapshot flush failed: {}", e),
        }
    }
}

impl Handler<FlushSnapshot> for SnapshotActor {
    type Result = MessageResult<FlushSnapshot>;

    fn handle(&mut self, _msg: FlushSnapshot, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.flush())
    }
}
