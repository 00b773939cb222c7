// ==========================================
// 传单配布调度系统 - 仓储层公共工具
// ==========================================
// 职责: 日期/枚举列的读写转换，IN 子句构建
// 约定: 日期列为 YYYY-MM-DD 文本，ISO 格式支持字符串比较
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::Row;

use crate::domain::types::{DistributionMethod, ScheduleStatus};

pub(crate) const DATE_FMT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

pub(crate) fn fmt_opt_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(fmt_date)
}

pub(crate) fn fmt_datetime(ts: NaiveDateTime) -> String {
    ts.format(DATETIME_FMT).to_string()
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn invalid_enum(idx: usize, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("无法识别的枚举值: {}", raw).into(),
    )
}

pub(crate) fn get_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FMT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_opt_date(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) if !raw.trim().is_empty() => NaiveDate::parse_from_str(raw.trim(), DATE_FMT)
            .map(Some)
            .map_err(|e| conversion_error(idx, e)),
        _ => Ok(None),
    }
}

pub(crate) fn get_datetime(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FMT).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_method(row: &Row, idx: usize) -> rusqlite::Result<DistributionMethod> {
    let raw: String = row.get(idx)?;
    DistributionMethod::parse(&raw).ok_or_else(|| invalid_enum(idx, &raw))
}

pub(crate) fn get_status(row: &Row, idx: usize) -> rusqlite::Result<ScheduleStatus> {
    let raw: String = row.get(idx)?;
    ScheduleStatus::parse(&raw).ok_or_else(|| invalid_enum(idx, &raw))
}

/// 构建 IN 子句的 SQL 片段，空列表返回永假条件
pub(crate) fn build_in_clause(column_name: &str, len: usize) -> String {
    if len == 0 {
        return "1 = 0".to_string();
    }
    let placeholders = vec!["?"; len].join(", ");
    format!("{} IN ({})", column_name, placeholders)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_in_clause() {
        assert_eq!(build_in_clause("schedule_id", 3), "schedule_id IN (?, ?, ?)");
        assert_eq!(build_in_clause("schedule_id", 0), "1 = 0");
    }

    #[test]
    fn test_date_columns() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let (d, none): (NaiveDate, Option<NaiveDate>) = conn
            .query_row("SELECT '2026-03-10', NULL", [], |row| {
                Ok((get_date(row, 0)?, get_opt_date(row, 1)?))
            })
            .unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert_eq!(none, None);

        let bad = conn.query_row("SELECT '10/03/2026'", [], |row| get_date(row, 0));
        assert!(bad.is_err());
    }
}
