use tracing_subscriber::{EnvFilter, fmt};

/// 以指定的默认级别初始化日志系统
///
/// RUST_LOG 环境变量优先，例如:
/// - RUST_LOG=apiscript=debug apiscript run flow.http
/// - RUST_LOG=trace apiscript run flow.http
pub fn init_logger_with_default(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）不视为错误
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();

    tracing::debug!("Logger initialized");
}
