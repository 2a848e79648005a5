use colored::Colorize;

use crate::Result;
use crate::assertion::AssertionResult;
use crate::http::Response;
use crate::listener::{ApiRunnerListener, defaults};
use crate::runner::driver::RUNNER_INDEX_VAR;
use crate::runner::types::{RunReport, RunSummary, ScriptStatus};
use crate::script::{Check, Script};
use crate::utils::{ResponseFormat, ResponseFormatter};
use crate::variable::VariableContext;

/// 终端报告监听器
///
/// 脚本到达终态时打印一行结果；`keep_going` 打开时把终止性的校验失败
/// 降级为非致命，运行继续执行后续脚本。
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    name: String,
    verbose: bool,
    keep_going: bool,
    formatter: ResponseFormatter,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        let format = if verbose {
            ResponseFormat::Verbose
        } else {
            ResponseFormat::Compact
        };

        Self {
            name: "console".to_string(),
            verbose,
            keep_going: false,
            formatter: ResponseFormatter::new(format),
        }
    }

    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    /// 打印运行开始
    pub fn print_header(&self, file_path: &str, total: usize, runners: usize) {
        if runners > 1 {
            println!(
                "\nRunning {} scripts from {} on {} runners...\n",
                total,
                file_path.bold(),
                runners
            );
        } else {
            println!("\nRunning {} scripts from {}...\n", total, file_path.bold());
        }
    }

    /// 打印被跳过的脚本，它们不会触发任何钩子
    pub fn print_skipped(&self, report: &RunReport) {
        for outcome in &report.outcomes {
            if outcome.status == ScriptStatus::Skipped {
                println!(
                    " {} [{}] {} {}",
                    "⊘".dimmed(),
                    outcome.index,
                    outcome.label,
                    "(skipped)".dimmed()
                );
            }
        }
    }

    /// 打印汇总
    pub fn print_summary(&self, summary: &RunSummary) {
        println!("\n{}", "━".repeat(50));
        println!("{}", "Summary".bold());
        println!("{}", "━".repeat(50));

        if summary.runners > 1 {
            let aborted = if summary.aborted > 0 {
                summary.aborted.to_string().red()
            } else {
                summary.aborted.to_string().green()
            };
            println!(
                "  {}: {} total, {} aborted",
                "Runners".bold(),
                summary.runners,
                aborted
            );
        } else if summary.aborted > 0 {
            println!("  {}: {}", "Run".bold(), "aborted".red());
        }

        let mut parts = vec![format!("{} completed", summary.completed.to_string().green())];
        if summary.failed > 0 {
            parts.push(format!("{} failed", summary.failed.to_string().red()));
        }
        if summary.skipped > 0 {
            parts.push(format!("{} skipped", summary.skipped.to_string().dimmed()));
        }
        println!("  {}: {}", "Scripts".bold(), parts.join(", "));
        println!("  {}: {}", "Attempts".bold(), summary.attempts);
        println!(
            "  {}: {:.3}s",
            "Duration".bold(),
            summary.total_duration.as_secs_f64()
        );
        println!();
    }

    fn prefix(ctx: &VariableContext) -> String {
        ctx.get(RUNNER_INDEX_VAR)
            .map(|index| format!("#{} ", index))
            .unwrap_or_default()
    }

    fn print_response(&self, response: &Response) {
        match self.formatter.format(response) {
            Ok(formatted) => {
                for line in formatted.lines() {
                    println!("   {}", line);
                }
            }
            Err(e) => {
                println!(
                    "   {}: Failed to format response: {}",
                    "Warning".yellow(),
                    e
                );
            }
        }
        println!();
    }

    fn print_failure(&self, script: &Script, ctx: &VariableContext, message: &str) {
        println!(
            " {} {}{} {}",
            "✗".red(),
            Self::prefix(ctx),
            script.label(),
            script.request_line().cyan()
        );
        println!("   {}: {}", "Error".red().bold(), message);
    }

    fn print_retry(&self, script: &Script, ctx: &VariableContext, reason: &str) {
        if self.verbose {
            println!(
                " {} {}{} {}",
                "↻".dimmed(),
                Self::prefix(ctx),
                script.label(),
                format!("({}, retrying)", reason).dimmed()
            );
        }
    }

    /// 终止性失败时的返回值：keep_going 时降级，否则沿用默认策略
    fn settle(&self, fallback: Result<()>) -> Result<()> {
        if self.keep_going { Ok(()) } else { fallback }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ApiRunnerListener for ConsoleReporter {
    fn name(&self) -> &str {
        &self.name
    }

    fn status_check_failed(
        &mut self,
        script: &Script,
        response: &Response,
        ctx: &VariableContext,
    ) -> Result<()> {
        let reason = format!(
            "expected {} but was {}",
            script.response.status,
            response.status.code()
        );
        if !script.is_timed_out() {
            self.print_retry(script, ctx, &reason);
            return Ok(());
        }
        self.print_failure(script, ctx, &reason);
        self.print_response(response);
        self.settle(defaults::status_check_failed(
            &self.name, script, response, ctx,
        ))
    }

    fn session_id_not_found(
        &mut self,
        script: &Script,
        response: &Response,
        ctx: &VariableContext,
    ) -> Result<()> {
        let field = script
            .response
            .session
            .as_ref()
            .map(|s| s.field.clone())
            .unwrap_or_default();
        let reason = format!("session field '{}' not found", field);
        if !script.is_timed_out() {
            self.print_retry(script, ctx, &reason);
            return Ok(());
        }
        self.print_failure(script, ctx, &reason);
        self.print_response(response);
        self.settle(defaults::session_id_not_found(
            &self.name, script, response, ctx,
        ))
    }

    fn condition_check_failed(
        &mut self,
        script: &Script,
        response: &Response,
        check: &Check,
        result: &AssertionResult,
        ctx: &VariableContext,
    ) -> Result<()> {
        if !script.is_timed_out() {
            self.print_retry(script, ctx, &format!("check {} failed", check));
            return Ok(());
        }
        self.print_failure(script, ctx, "check failed");
        println!("   Checks:");
        println!("     {} {}", "✗".red(), check);
        if let Some(message) = &result.message {
            println!("       {}", message.red());
        }
        println!();
        if self.verbose {
            self.print_response(response);
        }
        self.settle(defaults::condition_check_failed(
            &self.name, script, response, check, result, ctx,
        ))
    }

    fn unexpected_response(
        &mut self,
        script: &Script,
        response: Option<&Response>,
        reason: &str,
        ctx: &VariableContext,
    ) -> Result<()> {
        if !script.is_timed_out() {
            self.print_retry(script, ctx, reason);
            return Ok(());
        }
        self.print_failure(script, ctx, reason);
        if let Some(response) = response {
            self.print_response(response);
        }
        self.settle(defaults::unexpected_response(
            &self.name, script, response, reason, ctx,
        ))
    }

    fn template_failed(
        &mut self,
        script: &Script,
        missing: &[String],
        ctx: &VariableContext,
    ) -> Result<()> {
        self.print_failure(
            script,
            ctx,
            &format!("unset variables: {}", missing.join(", ")),
        );
        self.settle(defaults::template_failed(&self.name, script, missing, ctx))
    }

    fn script_completed(&mut self, script: &Script, response: &Response, ctx: &VariableContext) {
        println!(
            " {} {}{} {} ({}ms)",
            "✓".green(),
            Self::prefix(ctx),
            script.label(),
            script.request_line().cyan(),
            response.duration.as_millis()
        );
        if self.verbose {
            self.print_response(response);
        }
    }

    fn script_timed_out(&mut self, script: &Script, ctx: &VariableContext) -> Result<()> {
        self.print_failure(script, ctx, "timed out without a response");
        defaults::script_timed_out(&self.name, script, ctx)
    }
}
