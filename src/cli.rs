use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use apiscript::http::{Client, Transport};
use apiscript::listener::{LoggingListener, MultiListener};
use apiscript::parser::load_scripts;
use apiscript::parser::parse_duration;
use apiscript::runner::{CancelHandle, ConsoleReporter, MultiDriver, RunSummary, RunnerOptions};
use apiscript::variable::{ConfigLoader, VariableConfig};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

pub type Result<T> = std::result::Result<T, anyhow::Error>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 执行 .http 或 Markdown 脚本文件
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// 脚本文件路径
    pub path: PathBuf,

    /// 使用配置文件中的环境
    #[arg(short, long)]
    pub env: Option<String>,

    /// 覆盖变量，可重复
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// 并发运行器数量
    #[arg(short = 'n', long, default_value_t = 1)]
    pub concurrency: usize,

    /// 重试间隔，例如 250ms
    #[arg(long, value_parser = parse_duration_arg)]
    pub backoff: Option<Duration>,

    /// 单次调用超时
    #[arg(long, value_parser = parse_duration_arg)]
    pub call_timeout: Option<Duration>,

    /// 脚本未声明 @timeout 时的超时
    #[arg(long, value_parser = parse_duration_arg)]
    pub timeout: Option<Duration>,

    /// 终止性失败只记录，不终止运行
    #[arg(short, long)]
    pub keep_going: bool,

    /// 显示响应详情和重试
    #[arg(short, long)]
    pub verbose: bool,

    /// 指定配置文件，默认向上查找 apiscript.toml
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    ConfigLoader::parse_cli_var(s)
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

fn parse_duration_arg(s: &str) -> std::result::Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

fn load_config(path: Option<&Path>) -> Result<VariableConfig> {
    match path {
        Some(path) => ConfigLoader::load_from_path(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(ConfigLoader::find_and_load().unwrap_or_default()),
    }
}

/// 命令行参数覆盖配置文件
fn resolve_options(config: &VariableConfig, args: &RunArgs) -> Result<RunnerOptions> {
    let mut options = ConfigLoader::runner_options(config)?;
    if let Some(backoff) = args.backoff {
        options.backoff = backoff;
    }
    if let Some(call_timeout) = args.call_timeout {
        options.call_timeout = call_timeout;
    }
    if let Some(timeout) = args.timeout {
        options.default_timeout = timeout;
    }
    Ok(options)
}

/// 执行 run 子命令，返回是否全部成功
pub async fn run(args: RunArgs) -> Result<bool> {
    if args.concurrency == 0 {
        bail!("--concurrency must be at least 1");
    }

    let scripts = load_scripts(&args.path)
        .with_context(|| format!("failed to load scripts from {}", args.path.display()))?;
    let config = load_config(args.config.as_deref())?;
    if let Some(env) = &args.env
        && config.get_environment(env).is_none()
    {
        bail!("environment '{}' not found in config", env);
    }

    let options = resolve_options(&config, &args)?;
    let context = ConfigLoader::build_context(&config, args.env.as_deref(), &args.vars);
    let transport: Arc<dyn Transport> = Arc::new(Client::with_timeout(options.call_timeout)?);

    let reporter = ConsoleReporter::new(args.verbose).keep_going(args.keep_going);
    let listener = MultiListener::new("cli")
        .with(LoggingListener::new())
        .with(reporter.clone());

    let cancel = Arc::new(CancelHandle::new());
    let on_interrupt = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling runners");
            on_interrupt.cancel();
        }
    });

    reporter.print_header(
        &args.path.display().to_string(),
        scripts.len(),
        args.concurrency,
    );

    let driver = MultiDriver::new(transport, listener)
        .with_context(context)
        .with_options(options)
        .with_cancel(cancel.token());
    let results = driver.run(&scripts, args.concurrency).await;

    for (index, result) in results.iter().enumerate() {
        match result {
            Ok(report) => reporter.print_skipped(report),
            Err(e) if args.concurrency > 1 => {
                eprintln!("\n{} #{}: {}", "Aborted".red().bold(), index, e)
            }
            Err(e) => eprintln!("\n{}: {}", "Aborted".red().bold(), e),
        }
    }

    let summary = RunSummary::from_results(&results);
    reporter.print_summary(&summary);
    Ok(summary.is_success())
}
