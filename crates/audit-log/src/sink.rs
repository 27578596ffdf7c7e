use std::path::Path;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::entry::AuditEntry;
use crate::writer::AuditWriter;

/// Channel buffer size between producers and the background writer task.
const CHANNEL_BUFFER: usize = 1024;

/// Interval at which outstanding writes are flushed to disk.
const FLUSH_INTERVAL_SECS: u64 = 1;

/// A cheap, cloneable handle used to submit [`AuditEntry`] values into the
/// background audit-log writer.
///
/// `AuditSink` is `Clone + Send + Sync` so it can be shared freely across
/// tasks and components.  Dropping the last clone closes the channel; the
/// background task performs a final flush and exits.
#[derive(Clone)]
pub struct AuditSink {
    tx: mpsc::Sender<AuditEntry>,
}

impl AuditSink {
    /// Spawn the background writer task and return a `(sink, join_handle)`
    /// pair.
    ///
    /// The writer opens (or creates) the file at `path` in append mode and
    /// drains entries from the internal channel, flushing once per
    /// [`FLUSH_INTERVAL_SECS`] while writes are outstanding.  The background
    /// task never panics: I/O errors are logged via `tracing::error` and the
    /// offending entry is skipped.
    pub async fn start(
        path: impl AsRef<Path>,
    ) -> Result<(Self, JoinHandle<()>), crate::writer::AuditWriteError> {
        let (tx, rx) = mpsc::channel::<AuditEntry>(CHANNEL_BUFFER);

        let writer = AuditWriter::new(path).await?;

        let handle = tokio::spawn(drain_entries(writer, rx));

        Ok((Self { tx }, handle))
    }

    /// Send an audit entry to the background writer.
    ///
    /// Waits asynchronously when the channel is full.  If the background
    /// task has already exited the entry is dropped and a warning is logged.
    pub async fn log(&self, entry: AuditEntry) {
        if let Err(err) = self.tx.send(entry).await {
            tracing::warn!(
                event_type = ?err.0.event_type,
                "audit sink channel closed; entry dropped"
            );
        }
    }
}

/// Core loop executed inside the background task: write each received entry,
/// flush on a fixed interval while writes are outstanding, and flush once
/// more when the channel closes.
async fn drain_entries(mut writer: AuditWriter, mut rx: mpsc::Receiver<AuditEntry>) {
    let mut ticker =
        tokio::time::interval(tokio::time::Duration::from_secs(FLUSH_INTERVAL_SECS));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut dirty = false;

    loop {
        tokio::select! {
            received = rx.recv() => {
                match received {
                    Some(entry) => {
                        if let Err(err) = writer.write(&entry).await {
                            tracing::error!(%err, "failed to write audit entry");
                        } else {
                            dirty = true;
                        }
                    }
                    // Channel closed: final flush, then exit.
                    None => {
                        if dirty {
                            if let Err(err) = writer.flush().await {
                                tracing::error!(%err, "failed to flush audit log on shutdown");
                            }
                        }
                        tracing::debug!("audit writer background task shutting down");
                        return;
                    }
                }
            }
            _ = ticker.tick() => {
                if dirty {
                    if let Err(err) = writer.flush().await {
                        tracing::error!(%err, "periodic audit log flush failed");
                    } else {
                        dirty = false;
                    }
                }
            }
        }
    }
}
