// ==========================================
// 传单配布调度系统 - 主数据仓储 (营业所/配布员/传单)
// ==========================================
// 只读引用: 引擎只保存ID，展示时关联名称
// 传单编码用于重复投放校验
// ==========================================

use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::master::{Branch, Distributor, Flyer};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::build_in_clause;

pub struct MasterDataRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MasterDataRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 主数据同步
    // ==========================================

    pub fn upsert_branch(&self, branch: &Branch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO branch (branch_id, branch_name) VALUES (?1, ?2)
               ON CONFLICT(branch_id) DO UPDATE SET branch_name = excluded.branch_name"#,
            params![branch.branch_id, &branch.branch_name],
        )?;
        Ok(())
    }

    pub fn upsert_distributor(&self, distributor: &Distributor) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO distributor (distributor_id, distributor_name) VALUES (?1, ?2)
               ON CONFLICT(distributor_id) DO UPDATE SET distributor_name = excluded.distributor_name"#,
            params![distributor.distributor_id, &distributor.distributor_name],
        )?;
        Ok(())
    }

    pub fn upsert_flyer(&self, flyer: &Flyer) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO flyer (flyer_id, flyer_name, flyer_code) VALUES (?1, ?2, ?3)
               ON CONFLICT(flyer_id) DO UPDATE SET
                   flyer_name = excluded.flyer_name,
                   flyer_code = excluded.flyer_code"#,
            params![flyer.flyer_id, &flyer.flyer_name, &flyer.flyer_code],
        )?;
        Ok(())
    }

    // ==========================================
    // 事务内查询
    // ==========================================

    pub fn branch_map_in(conn: &Connection) -> RepositoryResult<HashMap<i64, Branch>> {
        let mut stmt = conn.prepare("SELECT branch_id, branch_name FROM branch")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Branch {
                    branch_id: row.get(0)?,
                    branch_name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().map(|b| (b.branch_id, b)).collect())
    }

    pub fn distributor_map_in(conn: &Connection) -> RepositoryResult<HashMap<i64, Distributor>> {
        let mut stmt = conn.prepare("SELECT distributor_id, distributor_name FROM distributor")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Distributor {
                    distributor_id: row.get(0)?,
                    distributor_name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().map(|d| (d.distributor_id, d)).collect())
    }

    /// 按ID批量查询传单 (未登记的ID不出现在结果中)
    pub fn flyers_by_ids_in(conn: &Connection, flyer_ids: &[i64]) -> RepositoryResult<HashMap<i64, Flyer>> {
        if flyer_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!(
            "SELECT flyer_id, flyer_name, flyer_code FROM flyer WHERE {}",
            build_in_clause("flyer_id", flyer_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(flyer_ids.iter()), |row| {
                let code: Option<String> = row.get(2)?;
                Ok(Flyer {
                    flyer_id: row.get(0)?,
                    flyer_name: row.get(1)?,
                    // 空白编码视为无编码
                    flyer_code: code.filter(|c| !c.trim().is_empty()),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().map(|f| (f.flyer_id, f)).collect())
    }
}
