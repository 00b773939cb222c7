use chrono::NaiveDate;
use serde_json::json;
use tracing::{info, warn};

use super::DispatchApi;
use crate::api::common::{parse_date, parse_opt_date, write_action_log};
use crate::api::dto::{
    CreateFromDemandRequest, CreateFromDemandResponse, CreateScheduleRequest, DeleteScheduleResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::db::with_write_tx;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::demand::DemandUnit;
use crate::domain::schedule::{Schedule, ScheduleFieldUpdate, SlotAssignment};
use crate::repository::demand_repo::DemandRepository;
use crate::repository::schedule_repo::{ScheduleRepository, SlotAssignmentRepository};

impl DispatchApi {
    // ==========================================
    // 计划管理接口
    // ==========================================

    /// 新建空计划 (状态 UNSTARTED，无槽位)
    ///
    /// 说明: (date, area_id) 不去重
    pub fn create_schedule(&self, req: CreateScheduleRequest, actor: &str) -> ApiResult<Schedule> {
        let date = parse_date("date", &req.date)?;
        let audit = self.audit_enabled()?;
        let schedule = Schedule::new(date, req.area_id, req.branch_id, req.distributor_id);

        with_write_tx(&self.conn, |tx| -> ApiResult<_> {
            ScheduleRepository::insert_in(tx, &schedule)?;
            write_action_log(
                tx,
                audit,
                ActionLog::new(ActionType::CreateSchedule, actor)
                    .with_target(&schedule.schedule_id)
                    .with_schedule_date(date)
                    .with_payload(json!({
                        "area_id": schedule.area_id,
                        "branch_id": schedule.branch_id,
                        "distributor_id": schedule.distributor_id,
                    })),
            )
        })?;

        info!(
            schedule_id = %schedule.schedule_id,
            date = %date,
            area_id = schedule.area_id,
            "计划已创建"
        );
        Ok(schedule)
    }

    /// 由需求生成计划，并将需求放入 1 号槽位
    ///
    /// 规则:
    /// 1) 目标日期: 请求日期在需求窗口内则用之，否则回退到结束日
    /// 2) 1 号槽份数 = min(需求份数, 区域按方式的产能)
    /// 3) 超出产能部分作为新需求放回需求池
    /// 4) 目标日期超出视图时在返回值中提示
    pub fn create_schedule_from_demand(
        &self,
        req: CreateFromDemandRequest,
        actor: &str,
    ) -> ApiResult<CreateFromDemandResponse> {
        let requested = parse_date("date", &req.date)?;
        let view_from = parse_opt_date("view_from", req.view_from.as_deref())?;
        let view_to = parse_opt_date("view_to", req.view_to.as_deref())?;
        let view = match (view_from, view_to) {
            (None, None) => None,
            (from, to) => Some((from.unwrap_or(NaiveDate::MIN), to.unwrap_or(NaiveDate::MAX))),
        };
        let audit = self.audit_enabled()?;

        // 区域与方式不可变，产能在事务外读取（产能提供方可能使用同一连接）
        let preview = DemandRepository::new(self.conn.clone())
            .find_by_id(&req.demand_id)?
            .ok_or_else(|| ApiError::NotFound(format!("DemandUnit(id={})不存在", req.demand_id)))?;
        let capacity = self
            .capacity_provider
            .capacity_of(preview.area_id)
            .map_err(|e| ApiError::InternalError(format!("区域产能查询失败: {}", e)))?
            .map(|c| c.for_method(preview.method));
        if capacity.is_none() {
            warn!(area_id = preview.area_id, "区域未登记产能，首槽份数不封顶");
        }

        let engine = self.allocation_engine.clone();
        let response = with_write_tx(&self.conn, |tx| -> ApiResult<_> {
            let demand = DemandRepository::take_in(tx, &req.demand_id)?;
            let target = engine.resolve_target_date(&demand, requested, view);
            let capped = engine.cap_to_capacity(demand.planned_count, capacity);

            let schedule = Schedule::new(target.date, demand.area_id, None, None);
            ScheduleRepository::insert_in(tx, &schedule)?;

            let mut item = SlotAssignment::from_demand(&demand, &schedule.schedule_id, 1);
            item.planned_count = capped.slot_count;
            SlotAssignmentRepository::insert_in(tx, &item)?;

            let residual_demand = if capped.residual > 0 {
                let residual = DemandUnit {
                    demand_id: uuid::Uuid::new_v4().to_string(),
                    planned_count: capped.residual,
                    ..demand.clone()
                };
                DemandRepository::put_in(tx, &residual)?;
                Some(residual)
            } else {
                None
            };

            write_action_log(
                tx,
                audit,
                ActionLog::new(ActionType::CreateScheduleFromDemand, actor)
                    .with_target(&schedule.schedule_id)
                    .with_schedule_date(target.date)
                    .with_payload(json!({
                        "demand_id": demand.demand_id,
                        "requested_date": requested.to_string(),
                        "target_date": target.date.to_string(),
                        "view_shift_required": target.view_shift_required,
                        "slot_count": capped.slot_count,
                        "residual": capped.residual,
                    })),
            )?;

            Ok(CreateFromDemandResponse {
                schedule,
                item,
                target,
                residual_demand,
            })
        })?;

        info!(
            schedule_id = %response.schedule.schedule_id,
            demand_id = %req.demand_id,
            target_date = %response.target.date,
            view_shift_required = response.target.view_shift_required,
            "由需求生成计划"
        );
        Ok(response)
    }

    /// 修改计划字段（可同时修改多个）
    ///
    /// 说明: 状态可任意设置（含回退）；告警在下次读取时重新计算
    pub fn update_schedule_fields(
        &self,
        schedule_id: &str,
        updates: Vec<ScheduleFieldUpdate>,
        actor: &str,
    ) -> ApiResult<Schedule> {
        if updates.is_empty() {
            return Err(ApiError::InvalidInput("未指定要修改的字段".to_string()));
        }
        let audit = self.audit_enabled()?;

        let schedule = with_write_tx(&self.conn, |tx| -> ApiResult<_> {
            let mut schedule = ScheduleRepository::require_in(tx, schedule_id)?;
            let before_date = schedule.schedule_date;
            for update in &updates {
                update.apply(&mut schedule);
            }
            schedule.updated_at = chrono::Local::now().naive_local();
            ScheduleRepository::update_in(tx, &schedule)?;

            let fields: Vec<&str> = updates.iter().map(|u| u.field_name()).collect();
            write_action_log(
                tx,
                audit,
                ActionLog::new(ActionType::UpdateScheduleField, actor)
                    .with_target(schedule_id)
                    .with_schedule_date(schedule.schedule_date)
                    .with_payload(json!({
                        "fields": fields,
                        "before_date": before_date.to_string(),
                        "after_date": schedule.schedule_date.to_string(),
                        "status": schedule.status.to_db_str(),
                    })),
            )?;
            Ok(schedule)
        })?;

        info!(schedule_id = %schedule_id, fields = updates.len(), "计划字段已修改");
        Ok(schedule)
    }

    /// 修改计划字段（`{field: value}` JSON 形式）
    pub fn update_schedule_fields_json(
        &self,
        schedule_id: &str,
        patch: &serde_json::Map<String, serde_json::Value>,
        actor: &str,
    ) -> ApiResult<Schedule> {
        let updates = patch
            .iter()
            .map(|(field, value)| ScheduleFieldUpdate::from_json(field, value))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ApiError::InvalidInput)?;
        self.update_schedule_fields(schedule_id, updates, actor)
    }

    /// 删除计划: 全部槽位转回需求池后删除计划
    pub fn delete_schedule(&self, schedule_id: &str, actor: &str) -> ApiResult<DeleteScheduleResponse> {
        let audit = self.audit_enabled()?;

        let returned_demands = with_write_tx(&self.conn, |tx| -> ApiResult<_> {
            let schedule = ScheduleRepository::require_in(tx, schedule_id)?;
            let items = SlotAssignmentRepository::find_by_schedule_in(tx, schedule_id)?;

            let mut returned = Vec::with_capacity(items.len());
            for item in &items {
                let demand = item.to_demand(schedule.area_id);
                SlotAssignmentRepository::delete_in(tx, &item.item_id)?;
                DemandRepository::put_in(tx, &demand)?;
                returned.push(demand);
            }
            ScheduleRepository::delete_in(tx, schedule_id)?;

            write_action_log(
                tx,
                audit,
                ActionLog::new(ActionType::DeleteSchedule, actor)
                    .with_target(schedule_id)
                    .with_schedule_date(schedule.schedule_date)
                    .with_payload(json!({
                        "area_id": schedule.area_id,
                        "returned_demand_ids": returned.iter().map(|d| d.demand_id.as_str()).collect::<Vec<_>>(),
                    })),
            )?;
            Ok(returned)
        })?;

        info!(
            schedule_id = %schedule_id,
            returned = returned_demands.len(),
            "计划已删除，槽位已退回需求池"
        );
        Ok(DeleteScheduleResponse {
            schedule_id: schedule_id.to_string(),
            returned_demands,
        })
    }
}
