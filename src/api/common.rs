// ==========================================
// 公共工具：日期解析、操作日志写入
// ==========================================

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::repository::action_log_repo::ActionLogRepository;

/// 解析日期字符串 (YYYY-MM-DD)
pub(crate) fn parse_date(field: &str, date_str: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
        ApiError::InvalidInput(format!("{}日期格式错误（应为YYYY-MM-DD）: {}", field, e))
    })
}

/// 解析可选日期，空字符串视为未填
pub(crate) fn parse_opt_date(field: &str, date_str: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match date_str.map(str::trim) {
        Some(s) if !s.is_empty() => parse_date(field, s).map(Some),
        _ => Ok(None),
    }
}

/// 在业务事务内写入操作日志（审计关闭时跳过）
pub(crate) fn write_action_log(conn: &Connection, enabled: bool, log: ActionLog) -> ApiResult<()> {
    if !enabled {
        return Ok(());
    }
    ActionLogRepository::insert_in(conn, &log)?;
    Ok(())
}
