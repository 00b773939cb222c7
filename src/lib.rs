// ==========================================
// 传单配布调度系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + axum
// 系统定位: 配布计划的需求池 / 槽位落位 / 告警计算
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - HTTP 服务
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DistributionMethod, ScheduleStatus};

// 领域实体
pub use domain::{ActionLog, ActionType, Commitment, DemandUnit, Schedule, SlotAssignment};

// 引擎
pub use engine::{AlertCalculator, AllocationEngine, ListingEngine};

// API
pub use api::{ApiError, ApiResult, DispatchApi, IntakeApi, QueryApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "传单配布调度系统";
