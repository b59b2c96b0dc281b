//! File-backed key-value store

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use coinpeek_aggregator::KeyValueStore;

/// Durable key-value store persisted as one JSON object on disk.
///
/// Writes go to a sibling temp file first and are swapped in with a
/// rename, so readers only ever see a complete document. Single-writer
/// use only.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn load(&self) -> HashMap<String, String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => HashMap::new(),
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.load().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        let mut slots = self.load().await;
        slots.insert(key.to_string(), value);

        let raw = serde_json::to_string_pretty(&slots)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), %key, "persisted slot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> JsonFileStore {
        let path = std::env::temp_dir().join(format!(
            "coinpeek-{}-{}.json",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        JsonFileStore::new(path)
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = temp_store("round-trip");

        assert!(store.get("cryptoData").await.is_none());

        store.set("cryptoData", "{\"v\":1}".to_string()).await.unwrap();
        assert_eq!(store.get("cryptoData").await.as_deref(), Some("{\"v\":1}"));

        // Overwrite replaces the slot
        store.set("cryptoData", "{\"v\":2}".to_string()).await.unwrap();
        assert_eq!(store.get("cryptoData").await.as_deref(), Some("{\"v\":2}"));
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let store = temp_store("reopen");
        store.set("cryptoData", "persisted".to_string()).await.unwrap();

        let reopened = JsonFileStore::new(store.path.clone());
        assert_eq!(reopened.get("cryptoData").await.as_deref(), Some("persisted"));
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let store = temp_store("corrupt");
        tokio::fs::write(&store.path, "{oops").await.unwrap();

        assert!(store.get("cryptoData").await.is_none());
        // And a write recovers the file
        store.set("cryptoData", "ok".to_string()).await.unwrap();
        assert_eq!(store.get("cryptoData").await.as_deref(), Some("ok"));
    }
}
