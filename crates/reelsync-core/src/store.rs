//! The shared key-value state store contract.
//!
//! Values are JSON. Every write is announced to subscribers as a
//! [`StoreChange`], which is how UI consumers observe the pipeline.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use reelsync_api::trakt::TokenResponse;
use reelsync_api::Credentials;

use crate::error::CoreError;
use crate::models::NowPlayingRecord;

/// Well-known store keys.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const API_KEYS: &str = "api_keys";
    pub const CORRECTIONS: &str = "corrections";
    pub const NOW_PLAYING: &str = "now_playing";
}

/// Capacity of the change broadcast channel.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A key was written (`Some`) or removed (`None`).
#[derive(Debug, Clone, PartialEq)]
pub struct StoreChange {
    pub key: String,
    pub value: Option<Value>,
}

/// Durable key-value store with change notification. Writes are
/// last-write-wins per key.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, CoreError>> + Send;

    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Client id, secret and TMDB key entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub tmdb_api_key: Option<String>,
}

/// Read a key and deserialize it. A value of the wrong shape reads as absent.
pub async fn get_json<T, S>(store: &S, key: &str) -> Result<Option<T>, CoreError>
where
    T: DeserializeOwned,
    S: StateStore + ?Sized,
{
    let Some(value) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring malformed store value");
            Ok(None)
        }
    }
}

pub async fn set_json<T, S>(store: &S, key: &str, value: &T) -> Result<(), CoreError>
where
    T: Serialize + ?Sized,
    S: StateStore + ?Sized,
{
    store.set(key, serde_json::to_value(value)?).await
}

pub async fn api_keys<S: StateStore + ?Sized>(store: &S) -> Result<ApiKeys, CoreError> {
    Ok(get_json(store, keys::API_KEYS).await?.unwrap_or_default())
}

pub async fn access_token<S: StateStore + ?Sized>(
    store: &S,
) -> Result<Option<TokenResponse>, CoreError> {
    get_json(store, keys::ACCESS_TOKEN).await
}

/// Assemble client credentials from the stored keys and token.
pub async fn load_credentials<S: StateStore + ?Sized>(store: &S) -> Result<Credentials, CoreError> {
    let keys = api_keys(store).await?;
    let token = access_token(store).await?;
    Ok(Credentials {
        access_token: token.map(|t| t.access_token),
        client_id: keys.client_id,
        client_secret: keys.client_secret,
        tmdb_api_key: keys.tmdb_api_key,
    })
}

pub async fn now_playing<S: StateStore + ?Sized>(
    store: &S,
) -> Result<Option<NowPlayingRecord>, CoreError> {
    get_json(store, keys::NOW_PLAYING).await
}

/// In-memory store, for tests and ephemeral runs.
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            values: Mutex::new(HashMap::new()),
            changes,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CoreError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CoreError> {
        self.lock().insert(key.to_string(), value.clone());
        let _ = self.changes.send(StoreChange {
            key: key.to_string(),
            value: Some(value),
        });
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CoreError> {
        if self.lock().remove(key).is_some() {
            let _ = self.changes.send(StoreChange {
                key: key.to_string(),
                value: None,
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_set_get_remove_notifies() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store.set("k", json!({ "a": 1 })).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({ "a": 1 })));
        let change = rx.recv().await.unwrap();
        assert_eq!(change.key, "k");
        assert_eq!(change.value, Some(json!({ "a": 1 })));

        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        assert_eq!(rx.recv().await.unwrap().value, None);
    }

    #[tokio::test]
    async fn test_load_credentials() {
        let store = MemoryStore::new();
        set_json(
            &store,
            keys::API_KEYS,
            &ApiKeys {
                client_id: Some("cid".into()),
                client_secret: Some("secret".into()),
                tmdb_api_key: None,
            },
        )
        .await
        .unwrap();
        store
            .set(keys::ACCESS_TOKEN, json!({ "access_token": "tok", "token_type": "bearer" }))
            .await
            .unwrap();

        let creds = load_credentials(&store).await.unwrap();
        assert_eq!(creds.client_id.as_deref(), Some("cid"));
        assert_eq!(creds.access_token.as_deref(), Some("tok"));
        assert!(creds.tmdb_api_key.is_none());
    }

    #[tokio::test]
    async fn test_malformed_value_reads_as_absent() {
        let store = MemoryStore::new();
        store.set(keys::API_KEYS, json!("not an object")).await.unwrap();
        assert_eq!(api_keys(&store).await.unwrap(), ApiKeys::default());
    }
}
