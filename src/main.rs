// ==========================================
// 传单配布调度系统 - HTTP 服务主入口
// ==========================================
// 技术栈: Rust + SQLite + axum
// ==========================================

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use flyer_dispatch::app::{self, get_default_db_path, AppState};

#[derive(Parser, Debug)]
#[command(name = "flyer-dispatch")]
#[command(version)]
#[command(about = "传单配布调度服务 (需求池 / 槽位落位 / 告警)")]
struct Cli {
    /// 数据库文件路径（缺省: FLYER_DISPATCH_DB_PATH 或用户数据目录）
    #[arg(long)]
    db_path: Option<String>,

    /// 监听地址
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// 监听端口
    #[arg(long, short = 'p', default_value_t = 8080)]
    port: u16,

    /// 日志级别（RUST_LOG 优先）
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    flyer_dispatch::logging::init_with_level(&cli.log_level);

    tracing::info!("==================================================");
    tracing::info!("{} 版本: {}", flyer_dispatch::APP_NAME, flyer_dispatch::VERSION);
    tracing::info!("==================================================");

    let db_path = cli.db_path.unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow::anyhow!("无法初始化AppState: {}", e))?;

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("监听地址无效 {}:{}: {}", cli.host, cli.port, e))?;

    app::serve(Arc::new(state), addr).await
}
