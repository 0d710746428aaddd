use std::path::Path;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};

use reelsync_core::error::CoreError;
use reelsync_core::storage::Storage;
use reelsync_core::store::{StateStore, StoreChange, CHANGE_CHANNEL_CAPACITY};

/// Handle to the SQLite state store. All queries run on a dedicated
/// `db-actor` thread; clones share the same actor.
#[derive(Clone)]
pub struct DbHandle {
    tx: mpsc::UnboundedSender<DbCommand>,
    changes: broadcast::Sender<StoreChange>,
}

enum DbCommand {
    Get {
        key: String,
        reply: oneshot::Sender<Result<Option<Value>, CoreError>>,
    },
    Set {
        key: String,
        value: Value,
        reply: oneshot::Sender<Result<(), CoreError>>,
    },
    Remove {
        key: String,
        reply: oneshot::Sender<Result<bool, CoreError>>,
    },
}

fn actor_closed() -> CoreError {
    CoreError::Config("DB actor closed".into())
}

impl DbHandle {
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let storage = Storage::open(path).inspect_err(|e| {
            tracing::error!(path = %path.display(), "Failed to open database: {e}");
        })?;
        Self::spawn(storage)
    }

    pub fn open_memory() -> Result<Self, CoreError> {
        Self::spawn(Storage::open_memory()?)
    }

    fn spawn(storage: Storage) -> Result<Self, CoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        std::thread::Builder::new()
            .name("db-actor".into())
            .spawn(move || actor_loop(storage, rx))
            .inspect_err(|e| tracing::error!("Failed to spawn DB thread: {e}"))?;

        Ok(Self { tx, changes })
    }

    fn notify(&self, key: &str, value: Option<Value>) {
        // No subscribers is fine.
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value,
        });
    }
}

impl StateStore for DbHandle {
    async fn get(&self, key: &str) -> Result<Option<Value>, CoreError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::Get {
            key: key.to_string(),
            reply,
        });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CoreError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::Set {
            key: key.to_string(),
            value: value.clone(),
            reply,
        });
        rx.await.unwrap_or_else(|_| Err(actor_closed()))?;
        self.notify(key, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(DbCommand::Remove {
            key: key.to_string(),
            reply,
        });
        if rx.await.unwrap_or_else(|_| Err(actor_closed()))? {
            self.notify(key, None);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

fn actor_loop(storage: Storage, mut rx: mpsc::UnboundedReceiver<DbCommand>) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            DbCommand::Get { key, reply } => {
                let _ = reply.send(storage.get(&key));
            }
            DbCommand::Set { key, value, reply } => {
                let _ = reply.send(storage.set(&key, &value));
            }
            DbCommand::Remove { key, reply } => {
                let _ = reply.send(storage.remove(&key));
            }
        }
    }
    tracing::debug!("DB actor stopped");
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_roundtrip_and_change_feed() {
        let db = DbHandle::open_memory().unwrap();
        let mut changes = db.subscribe();

        db.set("api_keys", json!({ "client_id": "abc" })).await.unwrap();
        assert_eq!(
            db.get("api_keys").await.unwrap(),
            Some(json!({ "client_id": "abc" }))
        );

        let change = changes.recv().await.unwrap();
        assert_eq!(change.key, "api_keys");
        assert!(change.value.is_some());

        db.remove("api_keys").await.unwrap();
        assert_eq!(db.get("api_keys").await.unwrap(), None);
        assert_eq!(changes.recv().await.unwrap().value, None);

        // Removing a missing key is silent.
        db.remove("api_keys").await.unwrap();
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        {
            let db = DbHandle::open(&path).unwrap();
            db.set("now_playing", json!({ "status": "playing" }))
                .await
                .unwrap();
        }
        let db = DbHandle::open(&path).unwrap();
        assert_eq!(
            db.get("now_playing").await.unwrap(),
            Some(json!({ "status": "playing" }))
        );
    }
}
