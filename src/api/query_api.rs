// ==========================================
// 传单配布调度系统 - 查询 API
// ==========================================
// 职责: 计划列表 / 单个计划 / 需求池 / 操作日志的只读查询
// 红线: 告警每次读取时由 AlertCalculator 重新计算，不读缓存
// ==========================================

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use tracing::debug;

use crate::api::common::parse_opt_date;
use crate::api::dto::{ListSchedulesRequest, ScheduleView, SlotView};
use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::db::with_read_conn;
use crate::domain::action_log::ActionLog;
use crate::domain::demand::DemandUnit;
use crate::domain::schedule::{Schedule, SlotAssignment};
use crate::domain::types::{ScheduleSortKey, ScheduleStatus, SortDirection};
use crate::engine::alert::AlertCalculator;
use crate::engine::listing::{ListingEngine, ScheduleFilter};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::area_repo::AreaRepository;
use crate::repository::demand_repo::DemandRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::master_repo::MasterDataRepository;
use crate::repository::order_repo::OrderAuthorizationRepository;
use crate::repository::schedule_repo::{ScheduleRepository, SlotAssignmentRepository};

/// 操作日志查询条数上限
const MAX_ACTION_LOG_LIMIT: i64 = 500;

// ==========================================
// QueryApi - 查询 API
// ==========================================
pub struct QueryApi {
    conn: Arc<Mutex<Connection>>,
    config_manager: Arc<ConfigManager>,
    alert_calculator: Arc<AlertCalculator>,
    listing_engine: Arc<ListingEngine>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl QueryApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        config_manager: Arc<ConfigManager>,
        alert_calculator: Arc<AlertCalculator>,
        listing_engine: Arc<ListingEngine>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            conn,
            config_manager,
            alert_calculator,
            listing_engine,
            action_log_repo,
        }
    }

    // ==========================================
    // 计划列表
    // ==========================================

    /// 查询计划列表
    ///
    /// # 参数
    /// - date_from / date_to: 含边界；缺省时按 `listing.default_view_days` 从今天（或给定一侧）展开
    /// - status: 精确匹配 (UNSTARTED / IN_PROGRESS / COMPLETED)
    /// - query: 配布员名 / 区域名 / 传单名 子串匹配 (大小写不敏感)
    /// - sort_key: areaCode / branch / date，缺省取 `listing.default_sort_key`
    /// - sort_dir: asc / desc (缺省 asc)
    pub fn list_schedules(&self, req: ListSchedulesRequest) -> ApiResult<Vec<ScheduleView>> {
        let filter = self.build_filter(&req)?;

        let rows = with_read_conn(&self.conn, |conn| -> ApiResult<_> {
            let schedules =
                ScheduleRepository::list_by_date_range_in(conn, filter.date_from, filter.date_to)?;
            Ok(self.build_views_in(conn, schedules)?)
        })?;

        let total = rows.len();
        let views = self.listing_engine.filter_and_sort(rows, &filter);
        debug!(
            date_from = %filter.date_from,
            date_to = %filter.date_to,
            total,
            returned = views.len(),
            "计划列表查询"
        );
        Ok(views)
    }

    /// 查询单个计划（含实时告警）
    pub fn get_schedule(&self, schedule_id: &str) -> ApiResult<ScheduleView> {
        with_read_conn(&self.conn, |conn| -> ApiResult<_> {
            let schedule = ScheduleRepository::require_in(conn, schedule_id)?;
            let mut views = self.build_views_in(conn, vec![schedule])?;
            views
                .pop()
                .ok_or_else(|| ApiError::InternalError(format!("计划{}视图构建失败", schedule_id)))
        })
    }

    // ==========================================
    // 需求池
    // ==========================================

    /// 查询与视图相交的未分配需求 (空边界视为无界)
    pub fn list_unassigned(
        &self,
        date_from: Option<&str>,
        date_to: Option<&str>,
    ) -> ApiResult<Vec<DemandUnit>> {
        let from = parse_opt_date("date_from", date_from)?;
        let to = parse_opt_date("date_to", date_to)?;
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(ApiError::InvalidInput(format!("起始日期{}晚于结束日期{}", f, t)));
            }
        }

        let units = with_read_conn(&self.conn, |conn| -> ApiResult<_> {
            Ok(DemandRepository::list_all_in(conn)?)
        })?;
        let total = units.len();
        let units = self.listing_engine.filter_unassigned(units, from, to);
        debug!(total, returned = units.len(), "需求池查询");
        Ok(units)
    }

    // ==========================================
    // 操作日志
    // ==========================================

    /// 查询操作日志 (新的在前)，可按对象ID过滤
    pub fn list_action_logs(&self, target_id: Option<&str>, limit: i64) -> ApiResult<Vec<ActionLog>> {
        let limit = limit.clamp(1, MAX_ACTION_LOG_LIMIT);
        let logs = match target_id.map(str::trim).filter(|t| !t.is_empty()) {
            Some(target) => self.action_log_repo.find_by_target(target, limit)?,
            None => self.action_log_repo.find_recent(limit)?,
        };
        Ok(logs)
    }

    // ==========================================
    // 内部: 过滤条件与视图构建
    // ==========================================

    fn build_filter(&self, req: &ListSchedulesRequest) -> ApiResult<ScheduleFilter> {
        let view_days = self
            .config_manager
            .get_default_view_days()
            .map_err(|e| ApiError::InternalError(format!("读取列表配置失败: {}", e)))?;
        let span = Duration::days(view_days - 1);

        let from = parse_opt_date("date_from", req.date_from.as_deref())?;
        let to = parse_opt_date("date_to", req.date_to.as_deref())?;
        let out_of_range = |date: NaiveDate| {
            ApiError::InvalidInput(format!("日期{}按{}天视图展开后超出可表示范围", date, view_days))
        };
        let (date_from, date_to) = match (from, to) {
            (Some(f), Some(t)) => (f, t),
            (Some(f), None) => (f, f.checked_add_signed(span).ok_or_else(|| out_of_range(f))?),
            (None, Some(t)) => (t.checked_sub_signed(span).ok_or_else(|| out_of_range(t))?, t),
            (None, None) => {
                let today = chrono::Local::now().date_naive();
                (today, today.checked_add_signed(span).ok_or_else(|| out_of_range(today))?)
            }
        };
        if date_from > date_to {
            return Err(ApiError::InvalidInput(format!(
                "起始日期{}晚于结束日期{}",
                date_from, date_to
            )));
        }

        let status = match req.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                ScheduleStatus::parse(raw)
                    .ok_or_else(|| ApiError::InvalidInput(format!("无效的状态值: {}", raw)))?,
            ),
            None => None,
        };

        let sort_key = match req.sort_key.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => ScheduleSortKey::parse(raw)
                .ok_or_else(|| ApiError::InvalidInput(format!("无效的排序键: {}", raw)))?,
            None => self
                .config_manager
                .get_default_sort_key()
                .map_err(|e| ApiError::InternalError(format!("读取列表配置失败: {}", e)))?,
        };

        let sort_dir = match req.sort_dir.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => SortDirection::parse(raw)
                .ok_or_else(|| ApiError::InvalidInput(format!("无效的排序方向: {}", raw)))?,
            None => SortDirection::Asc,
        };

        Ok(ScheduleFilter {
            date_from,
            date_to,
            status,
            query: req.query.clone(),
            sort_key,
            sort_dir,
        })
    }

    /// 关联主数据并计算告警
    ///
    /// 承诺按 (order_id, flyer_id) 跨全部计划汇总，不受本次查询日期范围影响
    fn build_views_in(&self, conn: &Connection, schedules: Vec<Schedule>) -> RepositoryResult<Vec<ScheduleView>> {
        let schedule_ids: Vec<String> = schedules.iter().map(|s| s.schedule_id.clone()).collect();
        let items = SlotAssignmentRepository::find_by_schedules_in(conn, &schedule_ids)?;

        let flyer_ids: Vec<i64> = items
            .iter()
            .map(|i| i.flyer_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let pairs: HashSet<(i64, i64)> = items.iter().map(|i| (i.order_id, i.flyer_id)).collect();

        let areas = AreaRepository::map_all_in(conn)?;
        let branches = MasterDataRepository::branch_map_in(conn)?;
        let distributors = MasterDataRepository::distributor_map_in(conn)?;
        let flyers = MasterDataRepository::flyers_by_ids_in(conn, &flyer_ids)?;
        let commitments = OrderAuthorizationRepository::commitments_for_pairs_in(conn, &pairs)?;

        let mut items_by_schedule: HashMap<String, Vec<SlotAssignment>> = HashMap::new();
        for item in items {
            items_by_schedule
                .entry(item.schedule_id.clone())
                .or_default()
                .push(item);
        }

        let views = schedules
            .into_iter()
            .map(|schedule| {
                let slots: Vec<SlotView> = items_by_schedule
                    .remove(&schedule.schedule_id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|item| {
                        let alert = self.alert_calculator.evaluate_slot(
                            schedule.schedule_date,
                            &item,
                            commitments.get(&(item.order_id, item.flyer_id)),
                        );
                        let flyer = flyers.get(&item.flyer_id);
                        SlotView {
                            flyer_name: flyer.map(|f| f.flyer_name.clone()),
                            flyer_code: flyer.and_then(|f| f.flyer_code.clone()),
                            item_id: item.item_id,
                            slot_index: item.slot_index,
                            flyer_id: item.flyer_id,
                            order_id: item.order_id,
                            method: item.method,
                            planned_count: item.planned_count,
                            start_date: item.start_date,
                            end_date: item.end_date,
                            spare_date: item.spare_date,
                            alert,
                        }
                    })
                    .collect();

                let has_alert = AlertCalculator::has_alert(slots.iter().map(|s| &s.alert));
                let area = areas.get(&schedule.area_id);
                ScheduleView {
                    area_code: area.map(|a| a.area_code.clone()),
                    area_name: area.map(|a| a.area_name.clone()),
                    branch_name: schedule
                        .branch_id
                        .and_then(|id| branches.get(&id))
                        .map(|b| b.branch_name.clone()),
                    distributor_name: schedule
                        .distributor_id
                        .and_then(|id| distributors.get(&id))
                        .map(|d| d.distributor_name.clone()),
                    schedule_id: schedule.schedule_id,
                    schedule_date: schedule.schedule_date,
                    area_id: schedule.area_id,
                    branch_id: schedule.branch_id,
                    distributor_id: schedule.distributor_id,
                    status: schedule.status,
                    has_alert,
                    slots,
                }
            })
            .collect();
        Ok(views)
    }
}
