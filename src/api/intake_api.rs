// ==========================================
// 传单配布调度系统 - 需求受理 API
// ==========================================
// 职责: 订单配布确认 → 写入授权份数 + 按小区域生成需求
// 红线: 授权与需求在同一事务内写入，失败时全部回滚
// ==========================================

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde_json::json;
use tracing::info;

use crate::api::common::{parse_opt_date, write_action_log};
use crate::api::dto::{CommitmentView, ConfirmDistributionRequest, ConfirmDistributionResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::db::{with_read_conn, with_write_tx};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::commitment::OrderFlyerAuthorization;
use crate::domain::demand::DemandUnit;
use crate::domain::types::DistributionMethod;
use crate::repository::demand_repo::DemandRepository;
use crate::repository::order_repo::OrderAuthorizationRepository;

// ==========================================
// IntakeApi - 需求受理 API
// ==========================================
pub struct IntakeApi {
    conn: Arc<Mutex<Connection>>,
    config_manager: Arc<ConfigManager>,
}

impl IntakeApi {
    pub fn new(conn: Arc<Mutex<Connection>>, config_manager: Arc<ConfigManager>) -> Self {
        Self { conn, config_manager }
    }

    /// 订单配布确认
    ///
    /// # 校验
    /// - 至少选定一个小区域，且区域不重复
    /// - 授权份数 / 各区域份数非负
    /// - 开始日 <= 结束日 <= 预备日 (两端都填写时)
    ///
    /// # 写入
    /// 授权份数 UPSERT (重复确认覆盖上限)，每个区域生成一个需求放入需求池
    pub fn confirm_distribution_request(
        &self,
        req: ConfirmDistributionRequest,
        actor: &str,
    ) -> ApiResult<ConfirmDistributionResponse> {
        let method = DistributionMethod::parse(req.method.trim())
            .ok_or_else(|| ApiError::InvalidInput(format!("无效的配布方式: {}", req.method)))?;
        let start_date = parse_opt_date("start_date", req.start_date.as_deref())?;
        let end_date = parse_opt_date("end_date", req.end_date.as_deref())?;
        let spare_date = parse_opt_date("spare_date", req.spare_date.as_deref())?;

        if req.areas.is_empty() {
            return Err(ApiError::InvalidInput("至少需要选定一个小区域".to_string()));
        }
        if req.authorized_count < 0 {
            return Err(ApiError::InvalidInput(format!(
                "授权份数不能为负数: {}",
                req.authorized_count
            )));
        }
        let mut seen = HashSet::new();
        for area in &req.areas {
            if area.planned_count < 0 {
                return Err(ApiError::InvalidInput(format!(
                    "区域{}的计划份数不能为负数: {}",
                    area.area_id, area.planned_count
                )));
            }
            if !seen.insert(area.area_id) {
                return Err(ApiError::InvalidInput(format!("区域{}重复选定", area.area_id)));
            }
        }
        if let (Some(s), Some(e)) = (start_date, end_date) {
            if s > e {
                return Err(ApiError::InvalidInput(format!("开始日{}晚于结束日{}", s, e)));
            }
        }
        if let (Some(e), Some(sp)) = (end_date, spare_date) {
            if e > sp {
                return Err(ApiError::InvalidInput(format!("结束日{}晚于预备日{}", e, sp)));
            }
        }

        let authorization = OrderFlyerAuthorization {
            order_id: req.order_id,
            flyer_id: req.flyer_id,
            authorized_count: req.authorized_count,
        };
        let demands: Vec<DemandUnit> = req
            .areas
            .iter()
            .map(|area| DemandUnit {
                demand_id: uuid::Uuid::new_v4().to_string(),
                order_id: req.order_id,
                flyer_id: req.flyer_id,
                area_id: area.area_id,
                method,
                planned_count: area.planned_count,
                start_date,
                end_date,
                spare_date,
            })
            .collect();

        let audit = self
            .config_manager
            .is_action_log_enabled()
            .map_err(|e| ApiError::InternalError(format!("读取审计配置失败: {}", e)))?;

        with_write_tx(&self.conn, |tx| -> ApiResult<_> {
            OrderAuthorizationRepository::upsert_in(tx, &authorization)?;
            for demand in &demands {
                DemandRepository::put_in(tx, demand)?;
            }

            let log = ActionLog::new(ActionType::ConfirmDistribution, actor)
                .with_target(&format!("{}:{}", req.order_id, req.flyer_id))
                .with_payload(json!({
                    "order_id": req.order_id,
                    "flyer_id": req.flyer_id,
                    "method": method.to_db_str(),
                    "authorized_count": req.authorized_count,
                    "demand_ids": demands.iter().map(|d| d.demand_id.as_str()).collect::<Vec<_>>(),
                }));
            write_action_log(tx, audit, log)?;
            Ok(())
        })?;

        info!(
            order_id = req.order_id,
            flyer_id = req.flyer_id,
            method = %method,
            area_count = demands.len(),
            authorized_count = req.authorized_count,
            "订单配布确认完成"
        );

        Ok(ConfirmDistributionResponse {
            authorization,
            demands,
        })
    }

    /// 查询订单×传单的份数承诺
    pub fn get_commitment(&self, order_id: i64, flyer_id: i64) -> ApiResult<CommitmentView> {
        let commitment = with_read_conn(&self.conn, |conn| -> ApiResult<_> {
            Ok(OrderAuthorizationRepository::commitment_in(conn, order_id, flyer_id)?)
        })?;
        Ok(CommitmentView::from(commitment))
    }
}
