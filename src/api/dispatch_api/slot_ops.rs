use serde_json::json;
use tracing::{info, warn};

use super::{load_occupants_in, validate_slot_index, DispatchApi};
use crate::api::common::write_action_log;
use crate::api::dto::{AssignRequest, MoveRequest, UpdateQuantityRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::db::with_write_tx;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::demand::DemandUnit;
use crate::domain::schedule::SlotAssignment;
use crate::engine::allocation::PlacementCandidate;
use crate::repository::demand_repo::DemandRepository;
use crate::repository::schedule_repo::{ScheduleRepository, SlotAssignmentRepository};

impl DispatchApi {
    // ==========================================
    // 槽位操作接口
    // ==========================================

    /// 需求落位
    ///
    /// 校验顺序: 区域一致 → 传单不重复 (ID 或编码) → 槽位空闲
    /// 校验通过后同一事务内: 需求出池 + 新建分配
    pub fn assign(&self, req: AssignRequest, actor: &str) -> ApiResult<SlotAssignment> {
        let slot_index = validate_slot_index(req.slot_index)?;
        let audit = self.audit_enabled()?;
        let engine = self.allocation_engine.clone();

        let result = with_write_tx(&self.conn, |tx| -> ApiResult<_> {
            let schedule = ScheduleRepository::require_in(tx, &req.schedule_id)?;
            let demand = DemandRepository::find_by_id_in(tx, &req.demand_id)?.ok_or_else(|| {
                ApiError::NotFound(format!("DemandUnit(id={})不存在", req.demand_id))
            })?;

            let (occupants, flyer_code) = load_occupants_in(tx, &schedule.schedule_id, demand.flyer_id)?;
            let candidate = PlacementCandidate {
                area_id: demand.area_id,
                flyer_id: demand.flyer_id,
                flyer_code,
                slot_index,
                moving_item_id: None,
            };
            engine.check_placement(&schedule, &candidate, &occupants)?;

            let demand = DemandRepository::take_in(tx, &req.demand_id)?;
            let item = SlotAssignment::from_demand(&demand, &schedule.schedule_id, slot_index);
            SlotAssignmentRepository::insert_in(tx, &item)?;

            write_action_log(
                tx,
                audit,
                ActionLog::new(ActionType::Assign, actor)
                    .with_target(&item.item_id)
                    .with_schedule_date(schedule.schedule_date)
                    .with_payload(json!({
                        "demand_id": demand.demand_id,
                        "schedule_id": schedule.schedule_id,
                        "slot_index": slot_index,
                        "flyer_id": item.flyer_id,
                        "planned_count": item.planned_count,
                    })),
            )?;
            Ok(item)
        });

        match &result {
            Ok(item) => info!(
                item_id = %item.item_id,
                schedule_id = %item.schedule_id,
                slot_index = item.slot_index,
                demand_id = %req.demand_id,
                "需求已落位"
            ),
            Err(e) => warn!(
                schedule_id = %req.schedule_id,
                demand_id = %req.demand_id,
                slot_index,
                error = %e,
                "落位被拒绝"
            ),
        }
        result
    }

    /// 移动落位 (可跨计划)
    ///
    /// 规则:
    /// - 以源计划区域对目标计划做三项校验，重复校验排除自身
    /// - 移动到自身当前槽位视为成功且不写入
    /// - 原子地变更所属计划与槽位，失败时两侧均不变
    pub fn move_item(&self, req: MoveRequest, actor: &str) -> ApiResult<SlotAssignment> {
        let slot_index = validate_slot_index(req.target_slot_index)?;
        let audit = self.audit_enabled()?;
        let engine = self.allocation_engine.clone();

        let result = with_write_tx(&self.conn, |tx| -> ApiResult<_> {
            let item = SlotAssignmentRepository::require_in(tx, &req.item_id)?;
            if item.schedule_id == req.target_schedule_id && item.slot_index == slot_index {
                return Ok(item);
            }

            let source = ScheduleRepository::require_in(tx, &item.schedule_id)?;
            let target = ScheduleRepository::require_in(tx, &req.target_schedule_id)?;

            let (occupants, flyer_code) = load_occupants_in(tx, &target.schedule_id, item.flyer_id)?;
            let candidate = PlacementCandidate {
                area_id: source.area_id,
                flyer_id: item.flyer_id,
                flyer_code,
                slot_index,
                moving_item_id: Some(item.item_id.clone()),
            };
            engine.check_placement(&target, &candidate, &occupants)?;

            SlotAssignmentRepository::update_parent_in(tx, &item.item_id, &target.schedule_id, slot_index)?;

            write_action_log(
                tx,
                audit,
                ActionLog::new(ActionType::MoveItem, actor)
                    .with_target(&item.item_id)
                    .with_schedule_date(target.schedule_date)
                    .with_payload(json!({
                        "from_schedule_id": source.schedule_id,
                        "from_slot_index": item.slot_index,
                        "to_schedule_id": target.schedule_id,
                        "to_slot_index": slot_index,
                    })),
            )?;

            Ok(SlotAssignment {
                schedule_id: target.schedule_id,
                slot_index,
                ..item
            })
        });

        match &result {
            Ok(item) => info!(
                item_id = %item.item_id,
                schedule_id = %item.schedule_id,
                slot_index = item.slot_index,
                "落位已移动"
            ),
            Err(e) => warn!(
                item_id = %req.item_id,
                target_schedule_id = %req.target_schedule_id,
                slot_index,
                error = %e,
                "移动被拒绝"
            ),
        }
        result
    }

    /// 取消落位: 删除分配并以等价需求放回需求池
    pub fn unassign(&self, item_id: &str, actor: &str) -> ApiResult<DemandUnit> {
        let audit = self.audit_enabled()?;

        let demand = with_write_tx(&self.conn, |tx| -> ApiResult<_> {
            let item = SlotAssignmentRepository::require_in(tx, item_id)?;
            let schedule = ScheduleRepository::require_in(tx, &item.schedule_id)?;
            let demand = item.to_demand(schedule.area_id);

            SlotAssignmentRepository::delete_in(tx, item_id)?;
            DemandRepository::put_in(tx, &demand)?;

            write_action_log(
                tx,
                audit,
                ActionLog::new(ActionType::Unassign, actor)
                    .with_target(item_id)
                    .with_schedule_date(schedule.schedule_date)
                    .with_payload(json!({
                        "schedule_id": schedule.schedule_id,
                        "slot_index": item.slot_index,
                        "demand_id": demand.demand_id,
                    })),
            )?;
            Ok(demand)
        })?;

        info!(item_id = %item_id, demand_id = %demand.demand_id, "落位已取消，需求已退回");
        Ok(demand)
    }

    /// 修正份数 (>= 0)
    ///
    /// 超量告警给出的建议份数需经操作员确认后通过此接口应用
    pub fn update_quantity(&self, req: UpdateQuantityRequest, actor: &str) -> ApiResult<SlotAssignment> {
        if req.planned_count < 0 {
            return Err(ApiError::InvalidInput(format!(
                "份数不能为负数: {}",
                req.planned_count
            )));
        }
        let audit = self.audit_enabled()?;

        let item = with_write_tx(&self.conn, |tx| -> ApiResult<_> {
            let item = SlotAssignmentRepository::require_in(tx, &req.item_id)?;
            SlotAssignmentRepository::update_quantity_in(tx, &req.item_id, req.planned_count)?;

            write_action_log(
                tx,
                audit,
                ActionLog::new(ActionType::UpdateQuantity, actor)
                    .with_target(&req.item_id)
                    .with_payload(json!({
                        "order_id": item.order_id,
                        "flyer_id": item.flyer_id,
                        "before": item.planned_count,
                        "after": req.planned_count,
                    })),
            )?;
            Ok(SlotAssignment {
                planned_count: req.planned_count,
                ..item
            })
        })?;

        info!(item_id = %item.item_id, planned_count = item.planned_count, "份数已修正");
        Ok(item)
    }
}
