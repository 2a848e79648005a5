use crate::listener::ApiRunnerListener;

/// 只带名称、完全使用默认策略的监听器
#[derive(Debug, Clone)]
pub struct ListenerBase {
    name: String,
}

impl ListenerBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

impl Default for ListenerBase {
    fn default() -> Self {
        Self::new("api-runner")
    }
}

impl ApiRunnerListener for ListenerBase {
    fn name(&self) -> &str {
        &self.name
    }
}

/// 默认策略：失败类钩子只在脚本已超时时返回致命错误
///
/// 自定义监听器覆盖钩子后，可以调用这里的函数保留默认行为。
pub mod defaults {
    use crate::assertion::AssertionResult;
    use crate::http::Response;
    use crate::listener::Hook;
    use crate::script::{Check, Script};
    use crate::variable::VariableContext;
    use crate::{ApiScriptError, Result};

    pub fn status_check_failed(
        name: &str,
        script: &Script,
        response: &Response,
        ctx: &VariableContext,
    ) -> Result<()> {
        if !script.is_timed_out() {
            return Ok(());
        }
        let mut message = format!(
            "request {} expected {} but was {}",
            script.request_line(),
            script.response.status,
            response.status.code()
        );
        if response.status.code() == 422 {
            message.push_str(&format!(", validation errors: {}", response.body));
        }
        message.push_str(&format!("\nctx={}", ctx));
        Err(ApiScriptError::aborted(Hook::StatusCheckFailed, name, message))
    }

    pub fn session_id_not_found(
        name: &str,
        script: &Script,
        response: &Response,
        ctx: &VariableContext,
    ) -> Result<()> {
        if !script.is_timed_out() {
            return Ok(());
        }
        let field = script
            .response
            .session
            .as_ref()
            .map(|s| s.field.as_str())
            .unwrap_or_default();
        Err(ApiScriptError::aborted(
            Hook::SessionIdNotFound,
            name,
            format!(
                "request {} expected session field '{}', server response={}\nctx={}",
                script.request_line(),
                field,
                response,
                ctx
            ),
        ))
    }

    pub fn condition_check_failed(
        name: &str,
        script: &Script,
        response: &Response,
        check: &Check,
        result: &AssertionResult,
        ctx: &VariableContext,
    ) -> Result<()> {
        if !script.is_timed_out() {
            return Ok(());
        }
        let detail = result.message.as_deref().unwrap_or("condition was false");
        Err(ApiScriptError::aborted(
            Hook::ConditionCheckFailed,
            name,
            format!(
                "{}:\nfailed condition={} ({})\nserver response={}\nctx={}",
                script.request_line(),
                check,
                detail,
                response,
                ctx
            ),
        ))
    }

    pub fn unexpected_response(
        name: &str,
        script: &Script,
        response: Option<&Response>,
        reason: &str,
        ctx: &VariableContext,
    ) -> Result<()> {
        if !script.is_timed_out() {
            return Ok(());
        }
        let shown = response
            .map(|r| r.to_string())
            .unwrap_or_else(|| "<none>".to_string());
        Err(ApiScriptError::aborted(
            Hook::UnexpectedResponse,
            name,
            format!(
                "script={}, {}, server response={}\nctx={}",
                script, reason, shown, ctx
            ),
        ))
    }

    pub fn template_failed(
        name: &str,
        script: &Script,
        missing: &[String],
        ctx: &VariableContext,
    ) -> Result<()> {
        Err(ApiScriptError::aborted(
            Hook::TemplateFailed,
            name,
            format!(
                "request {} references unset variables [{}]\nctx={}",
                script.request_line(),
                missing.join(", "),
                ctx
            ),
        ))
    }

    pub fn script_timed_out(name: &str, script: &Script, ctx: &VariableContext) -> Result<()> {
        Err(ApiScriptError::aborted(
            Hook::ScriptTimedOut,
            name,
            format!("script={}, timed out\nctx={}", script, ctx),
        ))
    }
}
