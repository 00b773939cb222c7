// ==========================================
// 传单配布调度系统 - 性能统计
// ==========================================
// OpTimer: 每个调度/查询操作一条 perf 日志 (耗时 + SQL 语句数 + 慢 SQL 数)
// SQL 计数依赖 SQLite trace/profile 回调，与操作在同一线程上执行
// (HTTP 层在 spawn_blocking 线程内创建 OpTimer 并访问连接)
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 慢 SQL 日志中保留的 SQL 字符数
const SQL_LOG_CHARS: usize = 240;

static SQL_TRACING: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(u64::MAX);
static SLOW_OP_MS: AtomicU64 = AtomicU64::new(u64::MAX);

#[derive(Default, Clone, Copy)]
struct OpCounters {
    depth: u32,
    sql: u64,
    slow_sql: u64,
}

thread_local! {
    static COUNTERS: Cell<OpCounters> = Cell::new(OpCounters::default());
}

fn update(f: impl FnOnce(&mut OpCounters)) -> OpCounters {
    COUNTERS.with(|cell| {
        let mut c = cell.get();
        f(&mut c);
        cell.set(c);
        c
    })
}

// ==========================================
// PerfSettings - 环境变量开关
// ==========================================

/// - `FLYER_DISPATCH_PERF_SQL`: SQL 计数开关 (Debug 默认开, Release 默认关)
/// - `FLYER_DISPATCH_SLOW_SQL_MS`: 慢 SQL 阈值
/// - `FLYER_DISPATCH_SLOW_OP_MS`: 慢操作阈值 (超过时 perf 日志升为 warn)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfSettings {
    pub sql_tracing: bool,
    pub slow_sql_ms: u64,
    pub slow_op_ms: u64,
}

impl PerfSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let sql_tracing = lookup("FLYER_DISPATCH_PERF_SQL")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "on"))
            .unwrap_or(cfg!(debug_assertions));
        let millis = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };
        Self {
            sql_tracing,
            slow_sql_ms: millis("FLYER_DISPATCH_SLOW_SQL_MS", 100),
            slow_op_ms: millis("FLYER_DISPATCH_SLOW_OP_MS", 500),
        }
    }
}

/// 在共享连接上安装 SQL 计数与慢 SQL 日志
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let settings = PerfSettings::from_env();
    SLOW_OP_MS.store(settings.slow_op_ms, Ordering::Relaxed);
    SQL_TRACING.store(settings.sql_tracing, Ordering::Relaxed);

    if settings.sql_tracing {
        SLOW_SQL_MS.store(settings.slow_sql_ms, Ordering::Relaxed);
        conn.trace(Some(on_sql));
        conn.profile(Some(on_sql_done));
    } else {
        conn.trace(None);
        conn.profile(None);
    }
    tracing::debug!(target: "perf", ?settings, "性能统计已配置");
}

fn on_sql(_sql: &str) {
    if SQL_TRACING.load(Ordering::Relaxed) {
        update(|c| {
            if c.depth > 0 {
                c.sql += 1;
            }
        });
    }
}

fn on_sql_done(sql: &str, duration: Duration) {
    let ms = duration.as_millis() as u64;
    if ms < SLOW_SQL_MS.load(Ordering::Relaxed) {
        return;
    }
    let sql: String = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    let sql: String = sql.chars().take(SQL_LOG_CHARS).collect();
    tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %sql, "慢 SQL");
    update(|c| {
        if c.depth > 0 {
            c.slow_sql += 1;
        }
    });
}

// ==========================================
// OpTimer - 操作计时
// ==========================================

/// drop 时输出 perf 日志；可嵌套，内层操作的 SQL 同时计入外层
pub struct OpTimer {
    op: &'static str,
    start: Instant,
    sql_at_start: u64,
    slow_sql_at_start: u64,
}

impl OpTimer {
    pub fn start(op: &'static str) -> Self {
        let c = update(|c| c.depth += 1);
        Self {
            op,
            start: Instant::now(),
            sql_at_start: c.sql,
            slow_sql_at_start: c.slow_sql,
        }
    }
}

impl Drop for OpTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;
        let c = update(|c| c.depth = c.depth.saturating_sub(1));
        let sql_count = c.sql - self.sql_at_start;
        let slow_sql_count = c.slow_sql - self.slow_sql_at_start;

        if elapsed_ms >= SLOW_OP_MS.load(Ordering::Relaxed) {
            tracing::warn!(target: "perf", op = self.op, elapsed_ms, sql_count, slow_sql_count, "慢操作");
        } else {
            tracing::info!(target: "perf", op = self.op, elapsed_ms, sql_count, slow_sql_count, "done");
        }
    }
}
