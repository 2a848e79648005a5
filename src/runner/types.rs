use std::fmt;
use std::time::Duration;

use crate::listener::Hook;
use crate::variable::VariableContext;

/// 运行器参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// 两次尝试之间的等待时间
    pub backoff: Duration,
    /// 单次 HTTP 调用的上限
    pub call_timeout: Duration,
    /// 脚本未声明超时时使用的截止时长
    pub default_timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            backoff: Duration::from_millis(250),
            call_timeout: Duration::from_secs(30),
            default_timeout: Duration::from_secs(10),
        }
    }
}

/// 单个脚本的最终结果
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStatus {
    Completed,
    /// 终止性失败被监听器降级为非致命，运行继续
    Failed { hook: Hook, message: String },
    Skipped,
}

impl ScriptStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, ScriptStatus::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ScriptStatus::Failed { .. })
    }
}

impl fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptStatus::Completed => write!(f, "completed"),
            ScriptStatus::Failed { hook, message } => write!(f, "failed ({}): {}", hook, message),
            ScriptStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// 单个脚本的执行记录
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutcome {
    /// 脚本序号（从 1 开始）
    pub index: usize,

    /// 脚本名称（来自 @name 或请求行）
    pub label: String,

    /// 未展开的请求行
    pub request_line: String,

    pub status: ScriptStatus,

    /// 发起的 HTTP 尝试次数
    pub attempts: u32,

    /// 从开始到终态的耗时
    pub duration: Duration,
}

impl ScriptOutcome {
    pub fn skipped(index: usize, label: String, request_line: String) -> Self {
        Self {
            index,
            label,
            request_line,
            status: ScriptStatus::Skipped,
            attempts: 0,
            duration: Duration::ZERO,
        }
    }
}

/// 一个运行器跑完脚本序列后的报告
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcomes: Vec<ScriptOutcome>,

    /// 运行结束时的执行上下文
    pub context: VariableContext,

    pub duration: Duration,
}

impl RunReport {
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_completed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == ScriptStatus::Skipped)
            .count()
    }

    /// 没有任何失败的脚本
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn total_attempts(&self) -> u32 {
        self.outcomes.iter().map(|o| o.attempts).sum()
    }
}

/// 多个运行器的汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub runners: usize,
    /// 被致命错误终止的运行器数量
    pub aborted: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub attempts: u32,
    pub total_duration: Duration,
}

impl RunSummary {
    pub fn from_results<E>(results: &[std::result::Result<RunReport, E>]) -> Self {
        let mut summary = Self {
            runners: results.len(),
            ..Self::default()
        };

        for result in results {
            match result {
                Ok(report) => {
                    summary.completed += report.completed();
                    summary.failed += report.failed();
                    summary.skipped += report.skipped();
                    summary.attempts += report.total_attempts();
                    summary.total_duration = summary.total_duration.max(report.duration);
                }
                Err(_) => summary.aborted += 1,
            }
        }

        summary
    }

    pub fn is_success(&self) -> bool {
        self.aborted == 0 && self.failed == 0
    }
}
