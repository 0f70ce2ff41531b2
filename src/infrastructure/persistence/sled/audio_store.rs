//! Sled-based Audio Store Implementation

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{AudioMetadata, AudioStorePort, StoreError, StoreStats};

const KEY_PREFIX: &str = "audio:";

/// Sled 存储配置
#[derive(Debug, Clone)]
pub struct SledStoreConfig {
    /// 数据库路径
    pub db_path: String,
    /// 容量上限（字节），0 表示不限制
    pub max_size_bytes: u64,
}

impl Default for SledStoreConfig {
    fn default() -> Self {
        Self {
            db_path: "data/audio.sled".to_string(),
            max_size_bytes: 10 * 1024 * 1024 * 1024, // 10GB
        }
    }
}

/// 内部存储条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalAudioEntry {
    audio_data: Vec<u8>,
    size_bytes: u64,
    duration_ms: u64,
    content_hash: String,
    sample_rate: Option<u32>,
    created_at: i64,
}

impl InternalAudioEntry {
    fn metadata(&self) -> AudioMetadata {
        AudioMetadata {
            content_hash: self.content_hash.clone(),
            duration_ms: self.duration_ms,
            sample_rate: self.sample_rate,
        }
    }
}

fn db_error(e: sled::Error) -> StoreError {
    StoreError::DatabaseError(e.to_string())
}

fn decode(bytes: &[u8]) -> Result<InternalAudioEntry, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::SerializationError(e.to_string()))
}

/// Sled 音频存储
///
/// 音频片段与合并产物都写在这里；容量满时拒绝写入，不做淘汰。
pub struct SledAudioStore {
    db: Db,
    max_size_bytes: u64,
    current_size: AtomicU64,
}

impl SledAudioStore {
    /// 创建新的存储实例
    pub fn new(config: &SledStoreConfig) -> Result<Self, StoreError> {
        let db = sled::open(&config.db_path).map_err(db_error)?;

        let current_size = Self::calculate_total_size(&db)?;

        tracing::info!(
            db_path = %config.db_path,
            max_size_bytes = config.max_size_bytes,
            current_size = current_size,
            "SledAudioStore initialized"
        );

        Ok(Self {
            db,
            max_size_bytes: config.max_size_bytes,
            current_size: AtomicU64::new(current_size),
        })
    }

    /// 打开现有存储
    pub fn open<P: AsRef<Path>>(path: P, max_size_bytes: u64) -> Result<Self, StoreError> {
        let config = SledStoreConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
            max_size_bytes,
        };
        Self::new(&config)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 计算数据库中所有条目的总大小
    fn calculate_total_size(db: &Db) -> Result<u64, StoreError> {
        let mut total = 0u64;
        for item in db.scan_prefix(KEY_PREFIX) {
            let (_, value) = item.map_err(db_error)?;
            if let Ok(entry) = decode(&value) {
                total += entry.size_bytes;
            }
        }
        Ok(total)
    }

    fn storage_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    /// 预留容量
    fn reserve(&self, size: u64) -> Result<(), StoreError> {
        let limit = self.max_size_bytes;
        self.current_size
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                let next = current.saturating_add(size);
                if limit > 0 && next > limit {
                    None
                } else {
                    Some(next)
                }
            })
            .map(|_| ())
            .map_err(|current| StoreError::QuotaExceeded {
                needed: current.saturating_add(size),
                limit,
            })
    }

    fn release(&self, size: u64) {
        let _ = self
            .current_size
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_sub(size))
            });
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush().map_err(db_error)?;
        Ok(())
    }
}

#[async_trait]
impl AudioStorePort for SledAudioStore {
    async fn put(
        &self,
        key: &str,
        audio_data: Vec<u8>,
        metadata: AudioMetadata,
    ) -> Result<(), StoreError> {
        let size = audio_data.len() as u64;
        self.reserve(size)?;

        let entry = InternalAudioEntry {
            audio_data,
            size_bytes: size,
            duration_ms: metadata.duration_ms,
            content_hash: metadata.content_hash,
            sample_rate: metadata.sample_rate,
            created_at: Utc::now().timestamp(),
        };

        let entry_bytes = match bincode::serialize(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.release(size);
                return Err(StoreError::SerializationError(e.to_string()));
            }
        };

        match self.db.insert(Self::storage_key(key), entry_bytes) {
            Ok(Some(previous)) => {
                // 覆盖写入时扣除旧条目
                if let Ok(previous) = decode(&previous) {
                    self.release(previous.size_bytes);
                }
            }
            Ok(None) => {}
            Err(e) => {
                self.release(size);
                return Err(db_error(e));
            }
        }

        tracing::debug!(key = %key, size_bytes = size, "Audio stored");

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.db.get(Self::storage_key(key)).map_err(db_error)? {
            Some(data) => Ok(Some(decode(&data)?.audio_data)),
            None => Ok(None),
        }
    }

    async fn metadata(&self, key: &str) -> Result<Option<AudioMetadata>, StoreError> {
        match self.db.get(Self::storage_key(key)).map_err(db_error)? {
            Some(data) => Ok(Some(decode(&data)?.metadata())),
            None => Ok(None),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.db
            .contains_key(Self::storage_key(key))
            .map_err(db_error)
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if let Some(data) = self.db.remove(Self::storage_key(key)).map_err(db_error)? {
            if let Ok(entry) = decode(&data) {
                self.release(entry.size_bytes);
            }
        }
        Ok(())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let mut removed = 0;
        for item in self.db.scan_prefix(Self::storage_key(prefix)) {
            let (key, _) = item.map_err(db_error)?;
            if let Some(data) = self.db.remove(&key).map_err(db_error)? {
                if let Ok(entry) = decode(&data) {
                    self.release(entry.size_bytes);
                }
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!(prefix = %prefix, removed = removed, "Audio entries removed");
        }
        Ok(removed)
    }

    async fn stats(&self) -> StoreStats {
        StoreStats {
            total_entries: self.db.scan_prefix(KEY_PREFIX).count(),
            total_size_bytes: self.current_size.load(Ordering::Relaxed),
            max_size_bytes: self.max_size_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn metadata(duration_ms: u64) -> AudioMetadata {
        AudioMetadata {
            content_hash: "test_hash".to_string(),
            duration_ms,
            sample_rate: Some(22050),
        }
    }

    fn open_store(dir: &tempfile::TempDir, max_size_bytes: u64) -> SledAudioStore {
        let config = SledStoreConfig {
            db_path: dir.path().join("test.sled").to_string_lossy().to_string(),
            max_size_bytes,
        };
        SledAudioStore::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_store_put_get() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, 1024 * 1024);

        let audio_data = vec![1, 2, 3, 4, 5];
        store.put("segment:a:b:c", audio_data.clone(), metadata(1000)).await.unwrap();

        assert_eq!(store.get("segment:a:b:c").await.unwrap(), Some(audio_data));
        assert!(store.exists("segment:a:b:c").await.unwrap());
        assert_eq!(
            store.metadata("segment:a:b:c").await.unwrap().unwrap().duration_ms,
            1000
        );
        assert!(store.get("segment:missing").await.unwrap().is_none());

        let stats = store.stats().await;
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.total_size_bytes, 5);
    }

    #[tokio::test]
    async fn test_quota_rejects_without_eviction() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, 8);

        store.put("a", vec![0; 6], metadata(1)).await.unwrap();
        let result = store.put("b", vec![0; 6], metadata(1)).await;

        assert!(matches!(result, Err(StoreError::QuotaExceeded { limit: 8, .. })));
        // 已有条目保留
        assert!(store.exists("a").await.unwrap());
        assert_eq!(store.stats().await.total_size_bytes, 6);
    }

    #[tokio::test]
    async fn test_remove_prefix() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir, 0);

        store.put("segment:t1:s1:j1", vec![1; 4], metadata(1)).await.unwrap();
        store.put("segment:t1:s2:j1", vec![1; 4], metadata(1)).await.unwrap();
        store.put("segment:t2:s1:j1", vec![1; 4], metadata(1)).await.unwrap();

        assert_eq!(store.remove_prefix("segment:t1:").await.unwrap(), 2);
        assert!(store.exists("segment:t2:s1:j1").await.unwrap());
        assert_eq!(store.stats().await.total_size_bytes, 4);

        store.remove("segment:t2:s1:j1").await.unwrap();
        assert_eq!(store.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn test_size_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = open_store(&dir, 0);
            store.put("merge:t:m", vec![7; 10], metadata(1)).await.unwrap();
            store.flush().unwrap();
        }

        let store = open_store(&dir, 0);
        assert_eq!(store.stats().await.total_size_bytes, 10);
    }
}
