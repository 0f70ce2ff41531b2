//! Audio Store Port - 音频片段与合并产物存储
//!
//! 具体实现使用 Sled

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::task::{SentenceId, TaskId};

/// Audio Store 错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Audio not found: {0}")]
    NotFound(String),

    #[error("Storage quota exceeded: need {needed} bytes, limit {limit} bytes")]
    QuotaExceeded { needed: u64, limit: u64 },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// 音频元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioMetadata {
    /// md5(audio_data)
    pub content_hash: String,
    pub duration_ms: u64,
    pub sample_rate: Option<u32>,
}

/// 存储统计
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
}

/// Audio Store Port
///
/// key 按任务分区，删除任务时可按前缀整体清理：
/// - 句子片段: `segment:{task_id}:{sentence_id}:{job_id}`
/// - 合并产物: `merge:{task_id}:{merge_id}`
#[async_trait]
pub trait AudioStorePort: Send + Sync {
    /// 写入音频；超出容量上限时返回 QuotaExceeded，不做淘汰
    async fn put(
        &self,
        key: &str,
        audio_data: Vec<u8>,
        metadata: AudioMetadata,
    ) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn metadata(&self, key: &str) -> Result<Option<AudioMetadata>, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// 删除前缀下的全部条目，返回删除数量
    async fn remove_prefix(&self, prefix: &str) -> Result<usize, StoreError>;

    async fn stats(&self) -> StoreStats;
}

/// 句子片段 key
pub fn segment_key(task_id: TaskId, sentence_id: SentenceId, job_id: Uuid) -> String {
    format!("segment:{}:{}:{}", task_id, sentence_id, job_id)
}

/// 单个句子全部片段的前缀
pub fn sentence_prefix(task_id: TaskId, sentence_id: SentenceId) -> String {
    format!("segment:{}:{}:", task_id, sentence_id)
}

/// 合并产物 key
pub fn merge_key(task_id: TaskId, merge_id: Uuid) -> String {
    format!("merge:{}:{}", task_id, merge_id)
}

/// 任务全部音频的前缀（片段与合并产物）
pub fn task_prefixes(task_id: TaskId) -> [String; 2] {
    [format!("segment:{}:", task_id), format!("merge:{}:", task_id)]
}

/// 音频内容哈希
pub fn content_hash(audio_data: &[u8]) -> String {
    format!("{:x}", md5::compute(audio_data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_share_task_prefix() {
        let task_id = TaskId::new();
        let sentence_id = SentenceId::new();
        let job_id = Uuid::new_v4();

        let key = segment_key(task_id, sentence_id, job_id);
        let [segments, merges] = task_prefixes(task_id);

        assert!(key.starts_with(&segments));
        assert!(key.starts_with(&sentence_prefix(task_id, sentence_id)));
        assert!(merge_key(task_id, job_id).starts_with(&merges));
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }
}
