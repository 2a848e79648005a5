//! 运行器生命周期监听
//!
//! 运行器在每个状态转换点调用 [`ApiRunnerListener`] 的钩子。失败类钩子返回
//! `Err` 即终止整个运行；默认实现只在脚本已超时时才终止，超时前的失败视为
//! 暂时性失败，由运行器重试。

mod base;
mod logging;
mod multi;

use std::fmt;

use crate::Result;
use crate::assertion::AssertionResult;
use crate::http::Response;
use crate::script::{Check, Script};
use crate::variable::VariableContext;

pub use base::{ListenerBase, defaults};
pub use logging::LoggingListener;
pub use multi::MultiListener;

/// 生命周期钩子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    BeforeScript,
    AfterScript,
    BeforeCall,
    AfterCall,
    StatusCheckFailed,
    SessionIdNotFound,
    ConditionCheckFailed,
    UnexpectedResponse,
    TemplateFailed,
    ScriptCompleted,
    ScriptTimedOut,
}

impl Hook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::BeforeScript => "before_script",
            Hook::AfterScript => "after_script",
            Hook::BeforeCall => "before_call",
            Hook::AfterCall => "after_call",
            Hook::StatusCheckFailed => "status_check_failed",
            Hook::SessionIdNotFound => "session_id_not_found",
            Hook::ConditionCheckFailed => "condition_check_failed",
            Hook::UnexpectedResponse => "unexpected_response",
            Hook::TemplateFailed => "template_failed",
            Hook::ScriptCompleted => "script_completed",
            Hook::ScriptTimedOut => "script_timed_out",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 深拷贝支持，为所有 `Clone` 的监听器自动实现
pub trait ListenerClone {
    fn clone_box(&self) -> Box<dyn ApiRunnerListener>;
}

impl<T> ListenerClone for T
where
    T: ApiRunnerListener + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn ApiRunnerListener> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn ApiRunnerListener> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// 运行器监听器
///
/// 每个运行器独占自己的监听器树，因此钩子使用 `&mut self`，无需加锁。
/// 所有钩子都是同步的：返回即表示该事件已处理完毕。
pub trait ApiRunnerListener: ListenerClone + Send {
    fn name(&self) -> &str;

    /// 脚本的重试循环开始前调用一次，失败会无条件终止运行
    fn before_script(&mut self, _script: &Script, _ctx: &mut VariableContext) -> Result<()> {
        Ok(())
    }

    /// 脚本的重试循环结束后调用一次，失败会无条件终止运行
    fn after_script(&mut self, _script: &Script, _ctx: &mut VariableContext) -> Result<()> {
        Ok(())
    }

    fn before_call(&mut self, _script: &Script, _ctx: &VariableContext) {}

    /// `response` 为 None 表示传输层没有返回响应
    fn after_call(
        &mut self,
        _script: &Script,
        _ctx: &VariableContext,
        _response: Option<&Response>,
    ) {
    }

    fn status_check_failed(
        &mut self,
        script: &Script,
        response: &Response,
        ctx: &VariableContext,
    ) -> Result<()> {
        defaults::status_check_failed(self.name(), script, response, ctx)
    }

    fn session_id_not_found(
        &mut self,
        script: &Script,
        response: &Response,
        ctx: &VariableContext,
    ) -> Result<()> {
        defaults::session_id_not_found(self.name(), script, response, ctx)
    }

    fn condition_check_failed(
        &mut self,
        script: &Script,
        response: &Response,
        check: &Check,
        result: &AssertionResult,
        ctx: &VariableContext,
    ) -> Result<()> {
        defaults::condition_check_failed(self.name(), script, response, check, result, ctx)
    }

    fn unexpected_response(
        &mut self,
        script: &Script,
        response: Option<&Response>,
        reason: &str,
        ctx: &VariableContext,
    ) -> Result<()> {
        defaults::unexpected_response(self.name(), script, response, reason, ctx)
    }

    /// 请求模板引用了未设置的变量；返回 Ok 时脚本记为失败，运行继续
    fn template_failed(
        &mut self,
        script: &Script,
        missing: &[String],
        ctx: &VariableContext,
    ) -> Result<()> {
        defaults::template_failed(self.name(), script, missing, ctx)
    }

    fn script_completed(&mut self, _script: &Script, _response: &Response, _ctx: &VariableContext) {
    }

    /// 截止时间已过且没有任何可归类的结果，无论返回什么运行都会终止
    fn script_timed_out(&mut self, script: &Script, ctx: &VariableContext) -> Result<()> {
        defaults::script_timed_out(self.name(), script, ctx)
    }

    /// 每次尝试、每个检查调用一次；返回 true 时该检查不求值
    fn skip_check(&mut self, _script: &Script, _check: &Check) -> bool {
        false
    }
}
