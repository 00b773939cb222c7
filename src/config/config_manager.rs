// ==========================================
// 传单配布调度系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::ScheduleSortKey;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// 列表默认视图天数
pub const DEFAULT_VIEW_DAYS: i64 = 7;

/// 视图天数上限
pub const MAX_VIEW_DAYS: i64 = 366;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    // ===== 列表配置 =====

    /// 列表请求未指定日期区间时的视图天数（含当天），取值 1..=MAX_VIEW_DAYS
    pub fn get_default_view_days(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_VIEW_DAYS, "7")?;
        let days = value.trim().parse::<i64>().unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::DEFAULT_VIEW_DAYS,
                raw_value = %value,
                "视图天数配置格式错误，使用默认值"
            );
            DEFAULT_VIEW_DAYS
        });
        Ok(days.clamp(1, MAX_VIEW_DAYS))
    }

    /// 列表默认排序键
    pub fn get_default_sort_key(&self) -> Result<ScheduleSortKey, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_SORT_KEY, "date")?;
        Ok(ScheduleSortKey::parse(&value).unwrap_or(ScheduleSortKey::Date))
    }

    // ===== 审计配置 =====

    /// 是否记录操作日志（默认开启）
    pub fn is_action_log_enabled(&self) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::ACTION_LOG_ENABLED, "true")?;
        Ok(!matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "false" | "0" | "off" | "no"
        ))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 列表
    pub const DEFAULT_VIEW_DAYS: &str = "listing.default_view_days";
    pub const DEFAULT_SORT_KEY: &str = "listing.default_sort_key";

    // 审计
    pub const ACTION_LOG_ENABLED: &str = "audit.action_log_enabled";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()));
        ConfigManager::from_connection(conn).unwrap()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = manager();
        assert_eq!(config.get_default_view_days().unwrap(), 7);
        assert_eq!(config.get_default_sort_key().unwrap(), ScheduleSortKey::Date);
        assert!(config.is_action_log_enabled().unwrap());
    }

    #[test]
    fn test_set_and_snapshot() {
        let config = manager();
        config.set_global_config_value(config_keys::DEFAULT_VIEW_DAYS, "14").unwrap();
        config.set_global_config_value(config_keys::ACTION_LOG_ENABLED, "off").unwrap();
        config.set_global_config_value(config_keys::DEFAULT_SORT_KEY, "branch").unwrap();

        assert_eq!(config.get_default_view_days().unwrap(), 14);
        assert!(!config.is_action_log_enabled().unwrap());
        assert_eq!(config.get_default_sort_key().unwrap(), ScheduleSortKey::Branch);

        let snapshot: HashMap<String, String> =
            serde_json::from_str(&config.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.get("listing.default_view_days").map(String::as_str), Some("14"));
    }

    #[test]
    fn test_bad_view_days_falls_back() {
        let config = manager();
        config.set_global_config_value(config_keys::DEFAULT_VIEW_DAYS, "abc").unwrap();
        assert_eq!(config.get_default_view_days().unwrap(), DEFAULT_VIEW_DAYS);
    }

    #[test]
    fn test_view_days_clamped() {
        let config = manager();
        config.set_global_config_value(config_keys::DEFAULT_VIEW_DAYS, "100000000").unwrap();
        assert_eq!(config.get_default_view_days().unwrap(), MAX_VIEW_DAYS);
        config.set_global_config_value(config_keys::DEFAULT_VIEW_DAYS, "-3").unwrap();
        assert_eq!(config.get_default_view_days().unwrap(), 1);
    }
}
