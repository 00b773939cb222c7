// ==========================================
// 传单配布调度系统 - 调度 API
// ==========================================
// 职责: 计划与槽位的全部写操作
// 约束: 每个操作为一个 BEGIN IMMEDIATE 事务；校验在写入之前完成；
//       失败时所涉实体保持原状；不做自动重试
// ==========================================

mod schedule_ops;
mod slot_ops;

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::area::AreaCapacityProvider;
use crate::engine::allocation::{AllocationEngine, SlotOccupant};
use crate::repository::error::RepositoryResult;
use crate::repository::master_repo::MasterDataRepository;
use crate::repository::schedule_repo::SlotAssignmentRepository;

// ==========================================
// DispatchApi - 调度 API
// ==========================================

/// 调度API
///
/// 职责：
/// 1. 计划管理（新建、由需求生成、字段修改、删除）
/// 2. 槽位操作（落位、移动、取消落位、份数修正）
/// 3. 每次写入同事务记录操作日志
pub struct DispatchApi {
    conn: Arc<Mutex<Connection>>,
    capacity_provider: Arc<dyn AreaCapacityProvider>,
    config_manager: Arc<ConfigManager>,
    allocation_engine: Arc<AllocationEngine>,
}

impl DispatchApi {
    /// 创建新的DispatchApi实例
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        capacity_provider: Arc<dyn AreaCapacityProvider>,
        config_manager: Arc<ConfigManager>,
        allocation_engine: Arc<AllocationEngine>,
    ) -> Self {
        Self {
            conn,
            capacity_provider,
            config_manager,
            allocation_engine,
        }
    }

    /// 审计开关（事务开始前读取）
    fn audit_enabled(&self) -> ApiResult<bool> {
        self.config_manager
            .is_action_log_enabled()
            .map_err(|e| ApiError::InternalError(format!("读取审计配置失败: {}", e)))
    }
}

/// 槽位号校验 (1..=6)
fn validate_slot_index(slot_index: i64) -> ApiResult<u8> {
    if crate::domain::schedule::is_valid_slot_index(slot_index) {
        Ok(slot_index as u8)
    } else {
        Err(ApiError::InvalidInput(format!(
            "槽位号必须在1-{}之间: {}",
            crate::domain::schedule::MAX_SLOTS,
            slot_index
        )))
    }
}

/// 读取计划内现有落位及候选传单编码
///
/// # 返回
/// (现有落位列表, 候选传单的编码)
fn load_occupants_in(
    conn: &Connection,
    schedule_id: &str,
    candidate_flyer_id: i64,
) -> RepositoryResult<(Vec<SlotOccupant>, Option<String>)> {
    let items = SlotAssignmentRepository::find_by_schedule_in(conn, schedule_id)?;

    let mut flyer_ids: Vec<i64> = items.iter().map(|i| i.flyer_id).collect();
    flyer_ids.push(candidate_flyer_id);
    flyer_ids.sort_unstable();
    flyer_ids.dedup();
    let flyers = MasterDataRepository::flyers_by_ids_in(conn, &flyer_ids)?;
    let code_of = |flyer_id: i64| flyers.get(&flyer_id).and_then(|f| f.flyer_code.clone());

    let occupants = items
        .iter()
        .map(|i| SlotOccupant {
            item_id: i.item_id.clone(),
            slot_index: i.slot_index,
            flyer_id: i.flyer_id,
            flyer_code: code_of(i.flyer_id),
        })
        .collect();

    Ok((occupants, code_of(candidate_flyer_id)))
}
