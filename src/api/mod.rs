// ==========================================
// 传单配布调度系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口, 供 HTTP 路由调用
// ==========================================

pub mod common;
pub mod dispatch_api;
pub mod dto;
pub mod error;
pub mod intake_api;
pub mod query_api;

// 重导出核心类型
pub use dispatch_api::DispatchApi;
pub use error::{ApiError, ApiResult};
pub use intake_api::IntakeApi;
pub use query_api::QueryApi;
