// ==========================================
// 传单配布调度系统 - 小区域数据仓储
// ==========================================
// 产能数值由外部提供，这里只做存取
// 同时作为 AreaCapacityProvider 的默认实现
// ==========================================

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

use crate::domain::area::{AreaCapacity, AreaCapacityProvider};
use crate::domain::master::Area;
use crate::repository::error::{RepositoryError, RepositoryResult};

const AREA_COLUMNS: &str =
    "area_id, area_code, area_name, door_to_door_count, multi_family_count, capped_count";

pub struct AreaRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AreaRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或覆盖区域 (主数据同步)
    pub fn upsert(&self, area: &Area) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO area (
                area_id, area_code, area_name, door_to_door_count, multi_family_count, capped_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(area_id) DO UPDATE SET
                area_code = excluded.area_code,
                area_name = excluded.area_name,
                door_to_door_count = excluded.door_to_door_count,
                multi_family_count = excluded.multi_family_count,
                capped_count = excluded.capped_count"#,
            params![
                area.area_id,
                &area.area_code,
                &area.area_name,
                area.door_to_door_count,
                area.multi_family_count,
                area.capped_count,
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, area_id: i64) -> RepositoryResult<Option<Area>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM area WHERE area_id = ?1", AREA_COLUMNS);
        let area = conn
            .query_row(&sql, params![area_id], Self::map_row)
            .optional()?;
        Ok(area)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Area>> {
        let conn = self.get_conn()?;
        Self::list_all_in(&conn)
    }

    pub fn list_all_in(conn: &Connection) -> RepositoryResult<Vec<Area>> {
        let sql = format!("SELECT {} FROM area ORDER BY area_code, area_id", AREA_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let areas = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(areas)
    }

    /// area_id -> Area 映射 (列表展示用)
    pub fn map_all_in(conn: &Connection) -> RepositoryResult<HashMap<i64, Area>> {
        Ok(Self::list_all_in(conn)?
            .into_iter()
            .map(|a| (a.area_id, a))
            .collect())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Area> {
        Ok(Area {
            area_id: row.get(0)?,
            area_code: row.get(1)?,
            area_name: row.get(2)?,
            door_to_door_count: row.get(3)?,
            multi_family_count: row.get(4)?,
            capped_count: row.get(5)?,
        })
    }
}

impl AreaCapacityProvider for AreaRepository {
    fn capacity_of(&self, area_id: i64) -> Result<Option<AreaCapacity>, Box<dyn Error + Send + Sync>> {
        Ok(self.find_by_id(area_id)?.map(|a| a.capacity()))
    }
}
