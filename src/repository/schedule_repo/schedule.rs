use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::domain::schedule::Schedule;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{fmt_date, fmt_datetime, get_date, get_datetime, get_status};

const SCHEDULE_COLUMNS: &str = r#"schedule_id, schedule_date, area_id, branch_id, distributor_id,
       status, created_at, updated_at"#;

// ==========================================
// ScheduleRepository - 配布计划仓储
// ==========================================
// 说明: (schedule_date, area_id) 不唯一
pub struct ScheduleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleRepository {
    /// 创建新的ScheduleRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按ID查询计划
    pub fn find_by_id(&self, schedule_id: &str) -> RepositoryResult<Option<Schedule>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, schedule_id)
    }

    /// 按日期区间查询计划（含边界）
    ///
    /// 返回顺序: 配布日期升序，同日按创建先后
    pub fn list_by_date_range(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> RepositoryResult<Vec<Schedule>> {
        let conn = self.get_conn()?;
        Self::list_by_date_range_in(&conn, date_from, date_to)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn find_by_id_in(conn: &Connection, schedule_id: &str) -> RepositoryResult<Option<Schedule>> {
        let sql = format!(
            "SELECT {} FROM dispatch_schedule WHERE schedule_id = ?1",
            SCHEDULE_COLUMNS
        );
        let schedule = conn
            .query_row(&sql, params![schedule_id], Self::map_row)
            .optional()?;
        Ok(schedule)
    }

    /// 查询计划，不存在时返回 NotFound
    pub fn require_in(conn: &Connection, schedule_id: &str) -> RepositoryResult<Schedule> {
        Self::find_by_id_in(conn, schedule_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Schedule".to_string(),
            id: schedule_id.to_string(),
        })
    }

    pub fn list_by_date_range_in(
        conn: &Connection,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> RepositoryResult<Vec<Schedule>> {
        let sql = format!(
            r#"SELECT {} FROM dispatch_schedule
               WHERE schedule_date BETWEEN ?1 AND ?2
               ORDER BY schedule_date, created_at, rowid"#,
            SCHEDULE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let schedules = stmt
            .query_map(params![fmt_date(date_from), fmt_date(date_to)], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(schedules)
    }

    pub fn insert_in(conn: &Connection, schedule: &Schedule) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO dispatch_schedule (
                schedule_id, schedule_date, area_id, branch_id, distributor_id,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                &schedule.schedule_id,
                fmt_date(schedule.schedule_date),
                schedule.area_id,
                schedule.branch_id,
                schedule.distributor_id,
                schedule.status.to_db_str(),
                fmt_datetime(schedule.created_at),
                fmt_datetime(schedule.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 更新可编辑字段 (日期/营业所/配布员/状态)
    pub fn update_in(conn: &Connection, schedule: &Schedule) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"UPDATE dispatch_schedule
               SET schedule_date = ?1, branch_id = ?2, distributor_id = ?3,
                   status = ?4, updated_at = ?5
               WHERE schedule_id = ?6"#,
            params![
                fmt_date(schedule.schedule_date),
                schedule.branch_id,
                schedule.distributor_id,
                schedule.status.to_db_str(),
                fmt_datetime(schedule.updated_at),
                &schedule.schedule_id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Schedule".to_string(),
                id: schedule.schedule_id.clone(),
            });
        }
        Ok(())
    }

    /// 删除计划（调用方须先清空槽位）
    pub fn delete_in(conn: &Connection, schedule_id: &str) -> RepositoryResult<()> {
        let rows = conn.execute(
            "DELETE FROM dispatch_schedule WHERE schedule_id = ?1",
            params![schedule_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Schedule".to_string(),
                id: schedule_id.to_string(),
            });
        }
        Ok(())
    }

    /// 映射数据库行到Schedule对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Schedule> {
        Ok(Schedule {
            schedule_id: row.get(0)?,
            schedule_date: get_date(row, 1)?,
            area_id: row.get(2)?,
            branch_id: row.get(3)?,
            distributor_id: row.get(4)?,
            status: get_status(row, 5)?,
            created_at: get_datetime(row, 6)?,
            updated_at: get_datetime(row, 7)?,
        })
    }
}
