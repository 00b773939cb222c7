// ==========================================
// 传单配布调度系统 - 应用层
// ==========================================
// 职责: 应用状态装配 + HTTP 服务
// ==========================================

pub mod http;
pub mod state;

// 重导出
pub use http::{build_router, serve};
pub use state::{get_default_db_path, AppState};
