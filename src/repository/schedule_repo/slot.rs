use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::domain::schedule::SlotAssignment;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{build_in_clause, fmt_opt_date, get_method, get_opt_date};

const SLOT_COLUMNS: &str = r#"item_id, schedule_id, slot_index, flyer_id, order_id, method,
       planned_count, start_date, end_date, spare_date"#;

// ==========================================
// SlotAssignmentRepository - 槽位分配仓储
// ==========================================
// 约束: UNIQUE(schedule_id, slot_index) / UNIQUE(schedule_id, flyer_id)
pub struct SlotAssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SlotAssignmentRepository {
    /// 创建新的SlotAssignmentRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按ID查询分配
    pub fn find_by_id(&self, item_id: &str) -> RepositoryResult<Option<SlotAssignment>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, item_id)
    }

    /// 查询计划内的全部分配（按槽位号）
    pub fn find_by_schedule(&self, schedule_id: &str) -> RepositoryResult<Vec<SlotAssignment>> {
        let conn = self.get_conn()?;
        Self::find_by_schedule_in(&conn, schedule_id)
    }

    /// 查询全部分配数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM slot_assignment", [], |row| row.get(0))?;
        Ok(n)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn find_by_id_in(conn: &Connection, item_id: &str) -> RepositoryResult<Option<SlotAssignment>> {
        let sql = format!("SELECT {} FROM slot_assignment WHERE item_id = ?1", SLOT_COLUMNS);
        let item = conn
            .query_row(&sql, params![item_id], Self::map_row)
            .optional()?;
        Ok(item)
    }

    /// 查询分配，不存在时返回 NotFound
    pub fn require_in(conn: &Connection, item_id: &str) -> RepositoryResult<SlotAssignment> {
        Self::find_by_id_in(conn, item_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "SlotAssignment".to_string(),
            id: item_id.to_string(),
        })
    }

    pub fn find_by_schedule_in(conn: &Connection, schedule_id: &str) -> RepositoryResult<Vec<SlotAssignment>> {
        let sql = format!(
            "SELECT {} FROM slot_assignment WHERE schedule_id = ?1 ORDER BY slot_index",
            SLOT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![schedule_id], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// 批量查询多个计划的分配
    pub fn find_by_schedules_in(
        conn: &Connection,
        schedule_ids: &[String],
    ) -> RepositoryResult<Vec<SlotAssignment>> {
        if schedule_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM slot_assignment WHERE {} ORDER BY schedule_id, slot_index",
            SLOT_COLUMNS,
            build_in_clause("schedule_id", schedule_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(schedule_ids.iter()), Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn insert_in(conn: &Connection, item: &SlotAssignment) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO slot_assignment (
                item_id, schedule_id, slot_index, flyer_id, order_id, method,
                planned_count, start_date, end_date, spare_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                &item.item_id,
                &item.schedule_id,
                item.slot_index,
                item.flyer_id,
                item.order_id,
                item.method.to_db_str(),
                item.planned_count,
                fmt_opt_date(item.start_date),
                fmt_opt_date(item.end_date),
                fmt_opt_date(item.spare_date),
            ],
        )?;
        Ok(())
    }

    /// 变更所属计划与槽位（移动）
    pub fn update_parent_in(
        conn: &Connection,
        item_id: &str,
        schedule_id: &str,
        slot_index: u8,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            "UPDATE slot_assignment SET schedule_id = ?1, slot_index = ?2 WHERE item_id = ?3",
            params![schedule_id, slot_index, item_id],
        )?;
        Self::expect_one(rows, item_id)
    }

    pub fn update_quantity_in(conn: &Connection, item_id: &str, planned_count: i64) -> RepositoryResult<()> {
        let rows = conn.execute(
            "UPDATE slot_assignment SET planned_count = ?1 WHERE item_id = ?2",
            params![planned_count, item_id],
        )?;
        Self::expect_one(rows, item_id)
    }

    pub fn delete_in(conn: &Connection, item_id: &str) -> RepositoryResult<()> {
        let rows = conn.execute("DELETE FROM slot_assignment WHERE item_id = ?1", params![item_id])?;
        Self::expect_one(rows, item_id)
    }

    fn expect_one(rows: usize, item_id: &str) -> RepositoryResult<()> {
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "SlotAssignment".to_string(),
                id: item_id.to_string(),
            });
        }
        Ok(())
    }

    /// 映射数据库行到SlotAssignment对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<SlotAssignment> {
        Ok(SlotAssignment {
            item_id: row.get(0)?,
            schedule_id: row.get(1)?,
            slot_index: row.get(2)?,
            flyer_id: row.get(3)?,
            order_id: row.get(4)?,
            method: get_method(row, 5)?,
            planned_count: row.get(6)?,
            start_date: get_opt_date(row, 7)?,
            end_date: get_opt_date(row, 8)?,
            spare_date: get_opt_date(row, 9)?,
        })
    }
}
