// ==========================================
// 传单配布调度系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{DispatchApi, IntakeApi, QueryApi};
use crate::config::ConfigManager;
use crate::domain::area::AreaCapacityProvider;
use crate::engine::alert::AlertCalculator;
use crate::engine::allocation::AllocationEngine;
use crate::engine::listing::ListingEngine;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::area_repo::AreaRepository;

/// 应用状态
///
/// 包含所有API实例和共享资源，在 HTTP 路由中作为共享状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 调度API (计划/槽位写操作)
    pub dispatch_api: Arc<DispatchApi>,

    /// 查询API (列表/需求池/日志)
    pub query_api: Arc<QueryApi>,

    /// 需求受理API
    pub intake_api: Arc<IntakeApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并建表（幂等）
    /// 2. 初始化所有Repository / Engine
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::perf::install_sqlite_tracing(&mut conn);
        crate::db::init_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;

        Self::with_connection(db_path, conn)
    }

    /// 由已打开（且已建表）的连接构建
    pub fn with_connection(db_path: String, conn: Connection) -> Result<Self, String> {
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let area_repo = Arc::new(AreaRepository::new(conn.clone()));
        let capacity_provider: Arc<dyn AreaCapacityProvider> = area_repo;
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let allocation_engine = Arc::new(AllocationEngine::new());
        let alert_calculator = Arc::new(AlertCalculator::new());
        let listing_engine = Arc::new(ListingEngine::new());

        // ==========================================
        // 初始化API层
        // ==========================================
        let dispatch_api = Arc::new(DispatchApi::new(
            conn.clone(),
            capacity_provider,
            config_manager.clone(),
            allocation_engine,
        ));
        let query_api = Arc::new(QueryApi::new(
            conn.clone(),
            config_manager.clone(),
            alert_calculator,
            listing_engine,
            action_log_repo,
        ));
        let intake_api = Arc::new(IntakeApi::new(conn, config_manager.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            dispatch_api,
            query_api,
            intake_api,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 FLYER_DISPATCH_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("FLYER_DISPATCH_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./flyer_dispatch.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("flyer-dispatch");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("flyer_dispatch.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_with_in_memory_connection() {
        let conn = crate::db::open_in_memory().unwrap();
        let state = AppState::with_connection(":memory:".to_string(), conn).unwrap();
        assert!(state.config_manager.is_action_log_enabled().unwrap());
    }
}
