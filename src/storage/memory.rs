use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::storage::{Record, RecordStore};

/// In-process store keeping each record as a field map, the same shape the
/// Redis adapter writes. Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    // keyed by record id -> field name -> value
    buffer: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.buffer.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.buffer.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.buffer.read().await.keys().cloned().collect())
    }

    async fn get_record(&self, key: &str) -> Result<Option<Record>> {
        let buffer = self.buffer.read().await;
        Ok(buffer
            .get(key)
            .map(|fields| Record::from_fields(key, fields.clone())))
    }

    async fn put_record(&self, key: &str, record: &Record) -> Result<()> {
        let mut buffer = self.buffer.write().await;
        let entry = buffer.entry(key.to_string()).or_default();
        for (field, value) in record.fields() {
            entry.insert(field.to_string(), value.to_string());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.buffer.write().await.clear();
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, temperature: &str) -> Record {
        Record {
            id: id.to_string(),
            temperature: temperature.to_string(),
            humidity: "40.0".to_string(),
            luminosity: "30.0".to_string(),
            timestamp: "01-01-2024 12:00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn put_then_get() {
        let store = MemoryStore::new();
        store.put_record("1", &record("1", "20.0")).await.unwrap();

        let got = store.get_record("1").await.unwrap();
        assert_eq!(got, Some(record("1", "20.0")));
        assert_eq!(store.get_record("2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_fields() {
        let store = MemoryStore::new();
        store.put_record("1", &record("1", "20.0")).await.unwrap();
        store.put_record("1", &record("1", "25.0")).await.unwrap();

        assert_eq!(store.len().await, 1);
        let got = store.get_record("1").await.unwrap().unwrap();
        assert_eq!(got.temperature, "25.0");
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let store = MemoryStore::new();
        store.put_record("1", &record("1", "20.0")).await.unwrap();
        store.put_record("2", &record("2", "21.0")).await.unwrap();

        let mut keys = store.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["1".to_string(), "2".to_string()]);

        store.clear().await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.put_record("3", &record("3", "20.0")).await.unwrap();
        assert!(other.get_record("3").await.unwrap().is_some());
    }
}
