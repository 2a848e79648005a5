mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => {
            // 控制台报告负责常规输出，日志默认只显示错误
            let level = if args.verbose { "debug" } else { "error" };
            apiscript::logger::init_logger_with_default(level);

            if !cli::run(args).await? {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
