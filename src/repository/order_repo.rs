// ==========================================
// 传单配布调度系统 - 订单授权份数仓储
// ==========================================
// 授权份数 = Commitment 上限，由订单配布确认写入
// ==========================================

use rusqlite::{params, Connection};
use std::collections::{HashMap, HashSet};

use crate::domain::commitment::{Commitment, OrderFlyerAuthorization};
use crate::repository::error::RepositoryResult;

/// 无状态，仅提供事务内操作
pub struct OrderAuthorizationRepository;

impl OrderAuthorizationRepository {
    /// 写入授权份数（重复确认时覆盖）
    pub fn upsert_in(conn: &Connection, auth: &OrderFlyerAuthorization) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO order_flyer_authorization (order_id, flyer_id, authorized_count, updated_at)
               VALUES (?1, ?2, ?3, datetime('now'))
               ON CONFLICT(order_id, flyer_id) DO UPDATE SET
                   authorized_count = excluded.authorized_count,
                   updated_at = excluded.updated_at"#,
            params![auth.order_id, auth.flyer_id, auth.authorized_count],
        )?;
        Ok(())
    }

    /// 计算单个 (订单, 传单) 的承诺
    pub fn commitment_in(conn: &Connection, order_id: i64, flyer_id: i64) -> RepositoryResult<Commitment> {
        let (authorized_count, total_assigned): (Option<i64>, i64) = conn.query_row(
            r#"SELECT
                   (SELECT authorized_count FROM order_flyer_authorization
                     WHERE order_id = ?1 AND flyer_id = ?2),
                   (SELECT COALESCE(SUM(planned_count), 0) FROM slot_assignment
                     WHERE order_id = ?1 AND flyer_id = ?2)"#,
            params![order_id, flyer_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(Commitment {
            order_id,
            flyer_id,
            authorized_count,
            total_assigned,
        })
    }

    /// 批量计算承诺（跨全部计划汇总，不受列表日期范围影响）
    pub fn commitments_for_pairs_in(
        conn: &Connection,
        pairs: &HashSet<(i64, i64)>,
    ) -> RepositoryResult<HashMap<(i64, i64), Commitment>> {
        let mut result = HashMap::with_capacity(pairs.len());
        for &(order_id, flyer_id) in pairs {
            result.insert((order_id, flyer_id), Self::commitment_in(conn, order_id, flyer_id)?);
        }
        Ok(result)
    }
}
