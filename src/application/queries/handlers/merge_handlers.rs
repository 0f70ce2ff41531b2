//! Merge Query Handlers

use std::sync::Arc;

use super::AudioBlob;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioStorePort, MergeJob, MergeRepositoryPort, MergeState, TaskRepositoryPort,
};
use crate::application::queries::{GetMerge, GetMergeAudio, ListMerges};

/// GetMerge Handler
pub struct GetMergeHandler {
    merge_repo: Arc<dyn MergeRepositoryPort>,
}

impl GetMergeHandler {
    pub fn new(merge_repo: Arc<dyn MergeRepositoryPort>) -> Self {
        Self { merge_repo }
    }

    pub async fn handle(&self, query: GetMerge) -> Result<MergeJob, ApplicationError> {
        self.merge_repo
            .find_by_id(query.merge_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Merge", query.merge_id))
    }
}

/// ListMerges Handler
pub struct ListMergesHandler {
    merge_repo: Arc<dyn MergeRepositoryPort>,
    task_repo: Arc<dyn TaskRepositoryPort>,
}

impl ListMergesHandler {
    pub fn new(
        merge_repo: Arc<dyn MergeRepositoryPort>,
        task_repo: Arc<dyn TaskRepositoryPort>,
    ) -> Self {
        Self {
            merge_repo,
            task_repo,
        }
    }

    pub async fn handle(&self, query: ListMerges) -> Result<Vec<MergeJob>, ApplicationError> {
        if self.task_repo.find_summary(query.task_id).await?.is_none() {
            return Err(ApplicationError::not_found("Task", *query.task_id.as_uuid()));
        }
        Ok(self.merge_repo.list_by_task(query.task_id).await?)
    }
}

/// GetMergeAudio Handler
pub struct GetMergeAudioHandler {
    merge_repo: Arc<dyn MergeRepositoryPort>,
    audio_store: Arc<dyn AudioStorePort>,
}

impl GetMergeAudioHandler {
    pub fn new(
        merge_repo: Arc<dyn MergeRepositoryPort>,
        audio_store: Arc<dyn AudioStorePort>,
    ) -> Self {
        Self {
            merge_repo,
            audio_store,
        }
    }

    pub async fn handle(&self, query: GetMergeAudio) -> Result<AudioBlob, ApplicationError> {
        let job = self
            .merge_repo
            .find_by_id(query.merge_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Merge", query.merge_id))?;

        let (MergeState::Succeeded, Some(key)) = (job.state, job.audio_key.as_deref()) else {
            return Err(ApplicationError::conflict(format!(
                "合并任务 {} 尚未完成（{}）",
                job.id,
                job.state.as_str()
            )));
        };

        let data = self
            .audio_store
            .get(key)
            .await?
            .ok_or_else(|| ApplicationError::not_found("MergeAudio", query.merge_id))?;

        Ok(AudioBlob {
            data,
            duration_ms: job.duration_ms.unwrap_or(0),
        })
    }
}
