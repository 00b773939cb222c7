// ==========================================
// 传单配布调度系统 - HTTP 路由
// ==========================================
// 职责: axum 路由定义，连接 HTTP 请求与后端 API
// 约定: API 调用为同步阻塞 (SQLite)，统一放入 spawn_blocking 执行
// ==========================================

mod error;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::app::state::AppState;

pub use error::{ErrorResponse, HttpError};

/// 构建路由
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // 计划
        .route("/api/schedules", get(handlers::list_schedules))
        .route("/api/schedule", post(handlers::create_schedule))
        .route(
            "/api/schedule/:id",
            get(handlers::get_schedule)
                .patch(handlers::update_schedule)
                .delete(handlers::delete_schedule),
        )
        // 槽位
        .route(
            "/api/item",
            post(handlers::assign_item)
                .put(handlers::update_item)
                .delete(handlers::unassign_item),
        )
        // 需求池 / 受理
        .route("/api/unassigned", get(handlers::list_unassigned))
        .route("/api/demand", post(handlers::confirm_distribution))
        .route("/api/commitment", get(handlers::get_commitment))
        // 审计
        .route("/api/action-logs", get(handlers::list_action_logs))
        .with_state(state)
}

/// 启动 HTTP 服务（阻塞直到服务退出）
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("端口绑定失败 {}: {}", addr, e))?;

    tracing::info!(%addr, "HTTP 服务已启动");
    axum::serve(listener, router).await?;
    tracing::info!("HTTP 服务已退出");
    Ok(())
}
