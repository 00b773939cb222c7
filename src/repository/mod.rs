// ==========================================
// 传单配布调度系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: `*_in(conn, ..)` 为事务内静态操作，由调用方持有事务
// ==========================================

pub mod action_log_repo;
pub mod area_repo;
pub mod demand_repo;
pub mod error;
pub mod master_repo;
pub mod order_repo;
pub mod schedule_repo;
pub(crate) mod sql_utils;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use area_repo::AreaRepository;
pub use demand_repo::DemandRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use master_repo::MasterDataRepository;
pub use order_repo::OrderAuthorizationRepository;
pub use schedule_repo::{ScheduleRepository, SlotAssignmentRepository};
