//! Task Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{Page, SentenceRecord, TaskRepositoryPort, TaskSummary};
use crate::application::queries::{
    GetSentence, GetTask, ListBreakingStandards, ListSentences, ListTasks,
};
use crate::domain::BreakingStandard;

// ============================================================================
// Response DTOs
// ============================================================================

/// 断句标准目录项
#[derive(Debug, Clone)]
pub struct StandardInfo {
    pub id: u8,
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub requires_char_count: bool,
}

impl From<BreakingStandard> for StandardInfo {
    fn from(standard: BreakingStandard) -> Self {
        Self {
            id: standard.id(),
            key: standard.as_str(),
            name: standard.name(),
            description: standard.description(),
            requires_char_count: standard.requires_char_count(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GetTask Handler
pub struct GetTaskHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
}

impl GetTaskHandler {
    pub fn new(task_repo: Arc<dyn TaskRepositoryPort>) -> Self {
        Self { task_repo }
    }

    pub async fn handle(&self, query: GetTask) -> Result<TaskSummary, ApplicationError> {
        self.task_repo
            .find_summary(query.task_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Task", *query.task_id.as_uuid()))
    }
}

/// ListTasks Handler
pub struct ListTasksHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
}

impl ListTasksHandler {
    pub fn new(task_repo: Arc<dyn TaskRepositoryPort>) -> Self {
        Self { task_repo }
    }

    pub async fn handle(&self, query: ListTasks) -> Result<Page<TaskSummary>, ApplicationError> {
        Ok(self.task_repo.list(query.page).await?)
    }
}

/// ListSentences Handler
pub struct ListSentencesHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
}

impl ListSentencesHandler {
    pub fn new(task_repo: Arc<dyn TaskRepositoryPort>) -> Self {
        Self { task_repo }
    }

    pub async fn handle(
        &self,
        query: ListSentences,
    ) -> Result<Page<SentenceRecord>, ApplicationError> {
        if self.task_repo.find_summary(query.task_id).await?.is_none() {
            return Err(ApplicationError::not_found("Task", *query.task_id.as_uuid()));
        }
        Ok(self.task_repo.list_sentences(query.task_id, query.page).await?)
    }
}

/// GetSentence Handler
pub struct GetSentenceHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
}

impl GetSentenceHandler {
    pub fn new(task_repo: Arc<dyn TaskRepositoryPort>) -> Self {
        Self { task_repo }
    }

    pub async fn handle(&self, query: GetSentence) -> Result<SentenceRecord, ApplicationError> {
        self.task_repo
            .find_sentence(query.sentence_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Sentence", *query.sentence_id.as_uuid()))
    }
}

/// ListBreakingStandards Handler
pub struct ListBreakingStandardsHandler;

impl ListBreakingStandardsHandler {
    pub fn handle(&self, _query: ListBreakingStandards) -> Vec<StandardInfo> {
        BreakingStandard::ALL.into_iter().map(StandardInfo::from).collect()
    }
}
