// ==========================================
// 传单配布调度系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表幂等 (CREATE TABLE IF NOT EXISTS)，记录 schema_version
// ==========================================

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::repository::error::{RepositoryError, RepositoryResult};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存数据库并建表（测试 / 演示用）
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// 表:
/// - 主数据: area / branch / distributor / flyer
/// - 订单授权: order_flyer_authorization
/// - 需求池: demand_unit
/// - 配布计划: dispatch_schedule / slot_assignment
/// - 审计与配置: action_log / config_kv / schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS area (
            area_id INTEGER PRIMARY KEY,
            area_code TEXT NOT NULL,
            area_name TEXT NOT NULL,
            door_to_door_count INTEGER NOT NULL DEFAULT 0,
            multi_family_count INTEGER NOT NULL DEFAULT 0,
            capped_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS branch (
            branch_id INTEGER PRIMARY KEY,
            branch_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS distributor (
            distributor_id INTEGER PRIMARY KEY,
            distributor_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS flyer (
            flyer_id INTEGER PRIMARY KEY,
            flyer_name TEXT NOT NULL,
            flyer_code TEXT
        );

        CREATE TABLE IF NOT EXISTS order_flyer_authorization (
            order_id INTEGER NOT NULL,
            flyer_id INTEGER NOT NULL,
            authorized_count INTEGER NOT NULL CHECK (authorized_count >= 0),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (order_id, flyer_id)
        );

        CREATE TABLE IF NOT EXISTS demand_unit (
            demand_id TEXT PRIMARY KEY,
            order_id INTEGER NOT NULL,
            flyer_id INTEGER NOT NULL,
            area_id INTEGER NOT NULL,
            method TEXT NOT NULL,
            planned_count INTEGER NOT NULL CHECK (planned_count >= 0),
            start_date TEXT,
            end_date TEXT,
            spare_date TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_demand_unit_window
            ON demand_unit(start_date, end_date);

        CREATE TABLE IF NOT EXISTS dispatch_schedule (
            schedule_id TEXT PRIMARY KEY,
            schedule_date TEXT NOT NULL,
            area_id INTEGER NOT NULL,
            branch_id INTEGER,
            distributor_id INTEGER,
            status TEXT NOT NULL DEFAULT 'UNSTARTED',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_dispatch_schedule_date
            ON dispatch_schedule(schedule_date);

        CREATE TABLE IF NOT EXISTS slot_assignment (
            item_id TEXT PRIMARY KEY,
            schedule_id TEXT NOT NULL REFERENCES dispatch_schedule(schedule_id),
            slot_index INTEGER NOT NULL CHECK (slot_index BETWEEN 1 AND 6),
            flyer_id INTEGER NOT NULL,
            order_id INTEGER NOT NULL,
            method TEXT NOT NULL,
            planned_count INTEGER NOT NULL CHECK (planned_count >= 0),
            start_date TEXT,
            end_date TEXT,
            spare_date TEXT,
            UNIQUE (schedule_id, slot_index),
            UNIQUE (schedule_id, flyer_id)
        );

        CREATE INDEX IF NOT EXISTS idx_slot_assignment_commitment
            ON slot_assignment(order_id, flyer_id);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            target_id TEXT,
            schedule_date TEXT,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts);
        CREATE INDEX IF NOT EXISTS idx_action_log_target ON action_log(target_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 在单个 IMMEDIATE 事务中执行写操作
///
/// 说明：
/// - BEGIN IMMEDIATE 立即获取写锁，校验读取与写入看到同一快照
/// - 闭包返回 Err 时事务随 Transaction drop 回滚
/// - 闭包内只能使用 `&Transaction`，不可再次获取同一连接的锁
pub fn with_write_tx<T, E, F>(conn: &Arc<Mutex<Connection>>, f: F) -> Result<T, E>
where
    F: FnOnce(&Transaction) -> Result<T, E>,
    E: From<RepositoryError>,
{
    let mut guard = conn
        .lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))?;
    let tx = guard
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

    let value = f(&tx)?;

    tx.commit()
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
    Ok(value)
}

/// 只读访问（持有连接锁期间执行闭包）
pub fn with_read_conn<T, E, F>(conn: &Arc<Mutex<Connection>>, f: F) -> Result<T, E>
where
    F: FnOnce(&Connection) -> Result<T, E>,
    E: From<RepositoryError>,
{
    let guard = conn
        .lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))?;
    f(&guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_write_tx_rolls_back_on_error() {
        let conn = Arc::new(Mutex::new(open_in_memory().unwrap()));

        let result: Result<(), RepositoryError> = with_write_tx(&conn, |tx| {
            tx.execute(
                "INSERT INTO branch (branch_id, branch_name) VALUES (1, '本店')",
                [],
            )?;
            Err(RepositoryError::ValidationError("abort".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = with_read_conn(&conn, |c| {
            c.query_row("SELECT COUNT(*) FROM branch", [], |row| row.get(0))
                .map_err(RepositoryError::from)
        })
        .unwrap();
        assert_eq!(count, 0);
    }
}
