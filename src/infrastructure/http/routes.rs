//! HTTP Routes
//!
//! API Endpoints（均在 /api 下）:
//! - /ping                                  GET     健康检查
//! - /breaking-standards                    GET     断句标准列表
//! - /voices                                GET     音色目录
//! - /tasks                                 POST    创建任务（同步断句）
//! - /tasks                                 GET     任务列表
//! - /tasks/:task_id                        GET     任务详情
//! - /tasks/:task_id                        DELETE  删除任务
//! - /tasks/:task_id/sentences              GET     句子列表
//! - /tasks/:task_id/synthesize             POST    批量合成
//! - /tasks/:task_id/synthesis              GET     任务合成进度
//! - /tasks/:task_id/merges                 POST    合并音频
//! - /tasks/:task_id/merges                 GET     合并记录
//! - /sentences/:sentence_id                GET     句子详情
//! - /sentences/:sentence_id                DELETE  删除句子
//! - /sentences/:sentence_id/settings       POST    组合设置
//! - /sentences/:sentence_id/insert         POST    下方插入
//! - /sentences/:sentence_id/rebreak        POST    重新断句
//! - /sentences/:sentence_id/synthesize     POST    合成
//! - /sentences/:sentence_id/resynthesize   POST    重新合成
//! - /sentences/:sentence_id/synthesis      GET     句子合成状态
//! - /sentences/:sentence_id/audio          GET     句子音频
//! - /reading-rules                         POST    创建读法规则
//! - /reading-rules                         GET     规则列表
//! - /reading-rules/match                   POST    匹配文本
//! - /reading-rules/:rule_id                DELETE  删除规则
//! - /reading-rules/:rule_id/apply          POST    应用到任务
//! - /reading-rules/:rule_id/settings       POST    按任务/句子启用或停用
//! - /merges/:merge_id                      GET     合并状态
//! - /merges/:merge_id/audio                GET     合并音频
//!
//! WebSocket:
//! - /ws/tasks/:task_id                     任务合成/合并事件

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/api", api_routes())
        .route("/ws/tasks/:task_id", get(handlers::task_websocket_handler))
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/breaking-standards", get(handlers::list_breaking_standards))
        .route("/voices", get(handlers::list_voices))
        .merge(task_routes())
        .merge(sentence_routes())
        .merge(rule_routes())
        .merge(merge_routes())
}

/// Task 路由
fn task_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks", post(handlers::create_task).get(handlers::list_tasks))
        .route(
            "/tasks/:task_id",
            get(handlers::get_task).delete(handlers::delete_task),
        )
        .route("/tasks/:task_id/sentences", get(handlers::list_sentences))
        .route("/tasks/:task_id/synthesize", post(handlers::batch_synthesize))
        .route("/tasks/:task_id/synthesis", get(handlers::get_task_synthesis))
        .route(
            "/tasks/:task_id/merges",
            post(handlers::create_merge).get(handlers::list_merges),
        )
}

/// Sentence 路由
fn sentence_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/sentences/:sentence_id",
            get(handlers::get_sentence).delete(handlers::delete_sentence),
        )
        .route("/sentences/:sentence_id/settings", post(handlers::update_sentence_settings))
        .route("/sentences/:sentence_id/insert", post(handlers::insert_sentence))
        .route("/sentences/:sentence_id/rebreak", post(handlers::rebreak_sentence))
        .route("/sentences/:sentence_id/synthesize", post(handlers::synthesize_sentence))
        .route("/sentences/:sentence_id/resynthesize", post(handlers::resynthesize_sentence))
        .route("/sentences/:sentence_id/synthesis", get(handlers::get_sentence_synthesis))
        .route("/sentences/:sentence_id/audio", get(handlers::get_sentence_audio))
}

/// Reading Rule 路由
fn rule_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/reading-rules",
            post(handlers::create_reading_rule).get(handlers::list_reading_rules),
        )
        .route("/reading-rules/match", post(handlers::match_reading_rules))
        .route("/reading-rules/:rule_id", delete(handlers::delete_reading_rule))
        .route("/reading-rules/:rule_id/apply", post(handlers::apply_reading_rule))
        .route("/reading-rules/:rule_id/settings", post(handlers::set_rule_setting))
}

/// Merge 路由
fn merge_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/merges/:merge_id", get(handlers::get_merge))
        .route("/merges/:merge_id/audio", get(handlers::get_merge_audio))
}
