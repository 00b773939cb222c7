use super::core::{ActionLogRepository, ACTION_LOG_COLUMNS};
use crate::domain::action_log::ActionLog;
use crate::repository::error::RepositoryResult;
use crate::repository::sql_utils::{get_datetime, get_opt_date};
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM action_log WHERE action_id = ?1", ACTION_LOG_COLUMNS);
        let log = conn
            .query_row(&sql, params![action_id], Self::map_row)
            .optional()?;
        Ok(log)
    }

    /// 查询指定对象（计划/分配/需求）的操作日志，新的在前
    pub fn find_by_target(&self, target_id: &str, limit: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM action_log
               WHERE target_id = ?1
               ORDER BY action_ts DESC, rowid DESC
               LIMIT ?2"#,
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![target_id, limit], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 查询最近的 N 条日志
    pub fn find_recent(&self, limit: i64) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log ORDER BY action_ts DESC, rowid DESC LIMIT ?1",
            ACTION_LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 日志总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM action_log", [], |row| row.get(0))?;
        Ok(n)
    }

    /// 映射数据库行到 ActionLog
    ///
    /// payload_json 解析失败时置空（历史脏数据不阻断查询）
    fn map_row(row: &Row) -> SqliteResult<ActionLog> {
        let payload_raw: Option<String> = row.get(6)?;
        Ok(ActionLog {
            action_id: row.get(0)?,
            action_type: row.get(1)?,
            action_ts: get_datetime(row, 2)?,
            actor: row.get(3)?,
            target_id: row.get(4)?,
            schedule_date: get_opt_date(row, 5)?,
            payload_json: payload_raw.and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(7)?,
        })
    }
}
