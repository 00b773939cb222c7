// ==========================================
// 传单配布调度系统 - 需求池数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: take/put 只在调度事务内调用，需求不可重复、不可丢失
// ==========================================

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::domain::demand::DemandUnit;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{fmt_opt_date, get_method, get_opt_date};

const DEMAND_COLUMNS: &str = r#"demand_id, order_id, flyer_id, area_id, method,
       planned_count, start_date, end_date, spare_date"#;

// ==========================================
// DemandRepository - 需求池仓储
// ==========================================
pub struct DemandRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DemandRepository {
    /// 创建新的DemandRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按ID查询未分配需求
    pub fn find_by_id(&self, demand_id: &str) -> RepositoryResult<Option<DemandUnit>> {
        let conn = self.get_conn()?;
        Self::find_by_id_in(&conn, demand_id)
    }

    /// 查询需求池全部需求 (按结束日升序，空结束日排最后)
    pub fn list_all(&self) -> RepositoryResult<Vec<DemandUnit>> {
        let conn = self.get_conn()?;
        Self::list_all_in(&conn)
    }

    /// 需求池中的需求数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM demand_unit", [], |row| row.get(0))?;
        Ok(n)
    }

    // ==========================================
    // 事务内操作 (调用方持有连接/事务)
    // ==========================================

    pub fn find_by_id_in(conn: &Connection, demand_id: &str) -> RepositoryResult<Option<DemandUnit>> {
        let sql = format!("SELECT {} FROM demand_unit WHERE demand_id = ?1", DEMAND_COLUMNS);
        let unit = conn
            .query_row(&sql, params![demand_id], Self::map_row)
            .optional()?;
        Ok(unit)
    }

    pub fn list_all_in(conn: &Connection) -> RepositoryResult<Vec<DemandUnit>> {
        let sql = format!(
            r#"SELECT {} FROM demand_unit
               ORDER BY end_date IS NULL, end_date, order_id, flyer_id, area_id, rowid"#,
            DEMAND_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let units = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(units)
    }

    /// 放回需求池
    pub fn put_in(conn: &Connection, unit: &DemandUnit) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO demand_unit (
                demand_id, order_id, flyer_id, area_id, method,
                planned_count, start_date, end_date, spare_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                &unit.demand_id,
                unit.order_id,
                unit.flyer_id,
                unit.area_id,
                unit.method.to_db_str(),
                unit.planned_count,
                fmt_opt_date(unit.start_date),
                fmt_opt_date(unit.end_date),
                fmt_opt_date(unit.spare_date),
            ],
        )?;
        Ok(())
    }

    /// 从需求池取出 (查询 + 删除)
    ///
    /// # 返回
    /// - `Err(NotFound)`: 需求不在池中 (可能已被其他操作取走)
    pub fn take_in(conn: &Connection, demand_id: &str) -> RepositoryResult<DemandUnit> {
        let unit = Self::find_by_id_in(conn, demand_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "DemandUnit".to_string(),
            id: demand_id.to_string(),
        })?;

        let deleted = conn.execute("DELETE FROM demand_unit WHERE demand_id = ?1", params![demand_id])?;
        if deleted != 1 {
            return Err(RepositoryError::InternalError(format!(
                "需求{}删除行数异常: {}",
                demand_id, deleted
            )));
        }
        Ok(unit)
    }

    /// 映射数据库行到DemandUnit对象
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<DemandUnit> {
        Ok(DemandUnit {
            demand_id: row.get(0)?,
            order_id: row.get(1)?,
            flyer_id: row.get(2)?,
            area_id: row.get(3)?,
            method: get_method(row, 4)?,
            planned_count: row.get(5)?,
            start_date: get_opt_date(row, 6)?,
            end_date: get_opt_date(row, 7)?,
            spare_date: get_opt_date(row, 8)?,
        })
    }
}
