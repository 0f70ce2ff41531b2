//! Reading Rule Handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use super::{parse_id, unexpected};
use crate::application::commands::{
    ApplyReadingRule, CreateReadingRule, DeleteReadingRule, SetRuleSetting,
};
use crate::application::ports::RuleFilter;
use crate::application::queries::{ListReadingRules, MatchReadingRules};
use crate::application::{ApplicationError, Operation, Outcome};
use crate::domain::reading_rule::{RuleId, RuleScope, RuleType};
use crate::infrastructure::http::dto::{
    ApiResponse, ApplyRuleRequest, ApplyRuleResponse, CreateRuleRequest, Empty, ListRulesQuery,
    MatchRulesRequest, RuleHitResponse, RuleResponse, RuleSettingRequest, RuleSettingResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

fn rule_id(raw: &str) -> Result<RuleId, ApiError> {
    parse_id(raw, "rule_id").map(RuleId::from_uuid)
}

fn list_filter(query: ListRulesQuery) -> Result<RuleFilter, ApiError> {
    let scope = match query.scope.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            Some(RuleScope::parse(raw).map_err(ApplicationError::from)?)
        }
        _ => None,
    };

    match (scope, query.task_id) {
        (None, task_id) => Ok(RuleFilter::All { task_id }),
        (Some(RuleScope::Global), _) => Ok(RuleFilter::Global),
        (Some(RuleScope::Task), Some(task_id)) => Ok(RuleFilter::Task(task_id)),
        (Some(RuleScope::Task), None) => Err(ApiError::BadRequest(
            "scope=task 时必须提供 task_id".to_string(),
        )),
    }
}

pub async fn create_reading_rule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<Json<ApiResponse<RuleResponse>>, ApiError> {
    let op = Operation::CreateReadingRule(CreateReadingRule {
        scope: RuleScope::parse(&req.scope).map_err(ApplicationError::from)?,
        task_id: req.task_id,
        rule_type: RuleType::parse(&req.rule_type).map_err(ApplicationError::from)?,
        pattern: req.pattern,
        rule_value: req.rule_value,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Rule(rule) => Ok(Json(ApiResponse::success(rule.into()))),
        _ => Err(unexpected("create_reading_rule")),
    }
}

/// 按创建顺序列出规则
pub async fn list_reading_rules(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRulesQuery>,
) -> Result<Json<ApiResponse<Vec<RuleResponse>>>, ApiError> {
    let op = Operation::ListReadingRules(ListReadingRules {
        filter: list_filter(query)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Rules(rules) => Ok(Json(ApiResponse::success(
            rules.into_iter().map(RuleResponse::from).collect(),
        ))),
        _ => Err(unexpected("list_reading_rules")),
    }
}

pub async fn delete_reading_rule(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    let op = Operation::DeleteReadingRule(DeleteReadingRule {
        rule_id: rule_id(&raw_id)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Deleted => Ok(Json(ApiResponse::ok())),
        _ => Err(unexpected("delete_reading_rule")),
    }
}

pub async fn apply_reading_rule(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Json(req): Json<ApplyRuleRequest>,
) -> Result<Json<ApiResponse<ApplyRuleResponse>>, ApiError> {
    let op = Operation::ApplyReadingRule(ApplyReadingRule {
        rule_id: rule_id(&raw_id)?,
        task_id: req.task_id,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Applied { modified } => Ok(Json(ApiResponse::success(ApplyRuleResponse {
            modified,
        }))),
        _ => Err(unexpected("apply_reading_rule")),
    }
}

/// 在任务或单个句子上启用/停用规则
pub async fn set_rule_setting(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Json(req): Json<RuleSettingRequest>,
) -> Result<Json<ApiResponse<RuleSettingResponse>>, ApiError> {
    let op = Operation::SetRuleSetting(SetRuleSetting {
        rule_id: rule_id(&raw_id)?,
        task_id: req.task_id,
        sentence_id: req.sentence_id,
        enabled: req.enabled,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::RuleSetting(setting) => Ok(Json(ApiResponse::success(setting.into()))),
        _ => Err(unexpected("set_rule_setting")),
    }
}

pub async fn match_reading_rules(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MatchRulesRequest>,
) -> Result<Json<ApiResponse<Vec<RuleHitResponse>>>, ApiError> {
    let op = Operation::MatchReadingRules(MatchReadingRules {
        text: req.text,
        task_id: req.task_id,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Matches(hits) => Ok(Json(ApiResponse::success(
            hits.into_iter().map(RuleHitResponse::from).collect(),
        ))),
        _ => Err(unexpected("match_reading_rules")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::TaskId;

    #[test]
    fn test_list_filter() {
        let task_id = TaskId::new();
        let query = |scope: Option<&str>, task_id: Option<TaskId>| ListRulesQuery {
            scope: scope.map(String::from),
            task_id,
        };

        assert_eq!(
            list_filter(query(None, Some(task_id))).unwrap(),
            RuleFilter::All {
                task_id: Some(task_id)
            }
        );
        assert_eq!(
            list_filter(query(Some("global"), None)).unwrap(),
            RuleFilter::Global
        );
        assert_eq!(
            list_filter(query(Some("task"), Some(task_id))).unwrap(),
            RuleFilter::Task(task_id)
        );
        assert!(list_filter(query(Some("task"), None)).is_err());
        assert!(list_filter(query(Some("bogus"), None)).is_err());
    }
}
