use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::error::HttpError;
use crate::api::dto::{
    AssignRequest, ConfirmDistributionRequest, CreateFromDemandRequest, CreateScheduleRequest,
    ListSchedulesRequest, MoveRequest, UpdateQuantityRequest,
};
use crate::api::error::{ApiError, ApiResult};
use crate::app::state::AppState;
use crate::perf::OpTimer;

/// POST /api/schedule 中由需求生成计划的 action 值
const CREATE_FROM_DEMAND: &str = "CREATE_FROM_DEMAND";

/// 操作日志默认条数
const DEFAULT_ACTION_LOG_LIMIT: i64 = 50;

type HandlerResult<T> = Result<Json<T>, HttpError>;

// ==========================================
// 公共工具
// ==========================================

/// 操作人取自 `x-actor` 请求头，缺省为 system
fn actor_of(headers: &HeaderMap) -> String {
    headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("system")
        .to_string()
}

fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, HttpError> {
    serde_json::from_value(body)
        .map_err(|e| HttpError::from(ApiError::InvalidInput(format!("请求体格式错误: {}", e))))
}

/// 在阻塞线程池执行 API 调用，并记录耗时
async fn run_blocking<T, F>(op: &'static str, f: F) -> HandlerResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        let _perf = OpTimer::start(op);
        f()
    })
    .await
    .map_err(|e| HttpError::from(ApiError::InternalError(format!("任务执行失败: {}", e))))??;
    Ok(Json(result))
}

fn created<T: Serialize>(json: Json<T>) -> Response {
    (StatusCode::CREATED, json).into_response()
}

// ==========================================
// 查询参数
// ==========================================

#[derive(Debug, Deserialize)]
pub struct ViewRangeQuery {
    #[serde(default, alias = "date_from")]
    pub from: Option<String>,
    #[serde(default, alias = "date_to")]
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ItemIdQuery {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitmentQuery {
    pub order_id: i64,
    pub flyer_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ActionLogQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub target_id: Option<String>,
}

// ==========================================
// 健康检查
// ==========================================

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "app": crate::APP_NAME,
        "version": crate::VERSION,
    }))
}

// ==========================================
// 计划
// ==========================================

pub async fn list_schedules(
    State(state): State<Arc<AppState>>,
    Query(req): Query<ListSchedulesRequest>,
) -> Result<Response, HttpError> {
    let api = state.query_api.clone();
    let views = run_blocking("list_schedules", move || api.list_schedules(req)).await?;
    Ok(views.into_response())
}

pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(schedule_id): Path<String>,
) -> Result<Response, HttpError> {
    let api = state.query_api.clone();
    let view = run_blocking("get_schedule", move || api.get_schedule(&schedule_id)).await?;
    Ok(view.into_response())
}

/// 新建计划；body 含 `action: CREATE_FROM_DEMAND` 时由需求生成
pub async fn create_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, HttpError> {
    let actor = actor_of(&headers);
    let api = state.dispatch_api.clone();

    let from_demand = body
        .get("action")
        .and_then(Value::as_str)
        .map_or(false, |a| a.eq_ignore_ascii_case(CREATE_FROM_DEMAND));

    if from_demand {
        let req: CreateFromDemandRequest = parse_body(body)?;
        let result = run_blocking("create_schedule_from_demand", move || {
            api.create_schedule_from_demand(req, &actor)
        })
        .await?;
        Ok(created(result))
    } else {
        let req: CreateScheduleRequest = parse_body(body)?;
        let result = run_blocking("create_schedule", move || api.create_schedule(req, &actor)).await?;
        Ok(created(result))
    }
}

pub async fn update_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(schedule_id): Path<String>,
    Json(patch): Json<Map<String, Value>>,
) -> Result<Response, HttpError> {
    let actor = actor_of(&headers);
    let api = state.dispatch_api.clone();
    let result = run_blocking("update_schedule_fields", move || {
        api.update_schedule_fields_json(&schedule_id, &patch, &actor)
    })
    .await?;
    Ok(result.into_response())
}

pub async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(schedule_id): Path<String>,
) -> Result<Response, HttpError> {
    let actor = actor_of(&headers);
    let api = state.dispatch_api.clone();
    let result = run_blocking("delete_schedule", move || api.delete_schedule(&schedule_id, &actor)).await?;
    Ok(result.into_response())
}

// ==========================================
// 槽位
// ==========================================

pub async fn assign_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AssignRequest>,
) -> Result<Response, HttpError> {
    let actor = actor_of(&headers);
    let api = state.dispatch_api.clone();
    let result = run_blocking("assign", move || api.assign(req, &actor)).await?;
    Ok(created(result))
}

/// 移动落位或修正份数（body 含 planned_count 时为修正份数）
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, HttpError> {
    let actor = actor_of(&headers);
    let api = state.dispatch_api.clone();

    if body.get("planned_count").is_some() {
        let req: UpdateQuantityRequest = parse_body(body)?;
        let result = run_blocking("update_quantity", move || api.update_quantity(req, &actor)).await?;
        Ok(result.into_response())
    } else {
        let req: MoveRequest = parse_body(body)?;
        let result = run_blocking("move_item", move || api.move_item(req, &actor)).await?;
        Ok(result.into_response())
    }
}

pub async fn unassign_item(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<ItemIdQuery>,
) -> Result<Response, HttpError> {
    let actor = actor_of(&headers);
    let api = state.dispatch_api.clone();
    let result = run_blocking("unassign", move || api.unassign(&q.id, &actor)).await?;
    Ok(result.into_response())
}

// ==========================================
// 需求池 / 受理
// ==========================================

pub async fn list_unassigned(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ViewRangeQuery>,
) -> Result<Response, HttpError> {
    let api = state.query_api.clone();
    let result = run_blocking("list_unassigned", move || {
        api.list_unassigned(q.from.as_deref(), q.to.as_deref())
    })
    .await?;
    Ok(result.into_response())
}

pub async fn confirm_distribution(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ConfirmDistributionRequest>,
) -> Result<Response, HttpError> {
    let actor = actor_of(&headers);
    let api = state.intake_api.clone();
    let result = run_blocking("confirm_distribution_request", move || {
        api.confirm_distribution_request(req, &actor)
    })
    .await?;
    Ok(created(result))
}

pub async fn get_commitment(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CommitmentQuery>,
) -> Result<Response, HttpError> {
    let api = state.intake_api.clone();
    let result = run_blocking("get_commitment", move || api.get_commitment(q.order_id, q.flyer_id)).await?;
    Ok(result.into_response())
}

// ==========================================
// 审计
// ==========================================

pub async fn list_action_logs(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ActionLogQuery>,
) -> Result<Response, HttpError> {
    let api = state.query_api.clone();
    let limit = q.limit.unwrap_or(DEFAULT_ACTION_LOG_LIMIT);
    let result = run_blocking("list_action_logs", move || {
        api.list_action_logs(q.target_id.as_deref(), limit)
    })
    .await?;
    Ok(result.into_response())
}
