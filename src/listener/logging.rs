use tracing::{debug, error, info, warn};

use crate::Result;
use crate::assertion::AssertionResult;
use crate::http::Response;
use crate::listener::ApiRunnerListener;
use crate::script::{Check, Script};
use crate::variable::VariableContext;

/// 把每个生命周期事件写入 tracing 日志，不改变运行结果
///
/// 失败类钩子总是返回 Ok；通常与其他监听器一起放进 MultiListener。
#[derive(Debug, Clone)]
pub struct LoggingListener {
    name: String,
}

impl LoggingListener {
    pub fn new() -> Self {
        Self {
            name: "logging".to_string(),
        }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiRunnerListener for LoggingListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn before_script(&mut self, script: &Script, ctx: &mut VariableContext) -> Result<()> {
        debug!(script = %script.label(), before = ?script.before, vars = ctx.len(), "Script starting");
        Ok(())
    }

    fn after_script(&mut self, script: &Script, _ctx: &mut VariableContext) -> Result<()> {
        debug!(script = %script.label(), after = ?script.after, "Script finished");
        Ok(())
    }

    fn before_call(&mut self, script: &Script, _ctx: &VariableContext) {
        debug!(request = %script.request_line(), "Sending request");
    }

    fn after_call(&mut self, script: &Script, _ctx: &VariableContext, response: Option<&Response>) {
        match response {
            Some(response) => debug!(
                request = %script.request_line(),
                status = response.status.code(),
                duration_ms = response.duration.as_millis() as u64,
                "Response received"
            ),
            None => debug!(request = %script.request_line(), "No response received"),
        }
    }

    fn status_check_failed(
        &mut self,
        script: &Script,
        response: &Response,
        _ctx: &VariableContext,
    ) -> Result<()> {
        if script.is_timed_out() {
            error!(
                request = %script.request_line(),
                expected = script.response.status,
                actual = response.status.code(),
                "Unexpected status"
            );
        } else {
            warn!(
                request = %script.request_line(),
                expected = script.response.status,
                actual = response.status.code(),
                "Unexpected status, retrying"
            );
        }
        Ok(())
    }

    fn session_id_not_found(
        &mut self,
        script: &Script,
        _response: &Response,
        _ctx: &VariableContext,
    ) -> Result<()> {
        let field = script.response.session.as_ref().map(|s| s.field.as_str());
        if script.is_timed_out() {
            error!(request = %script.request_line(), field, "Session value missing");
        } else {
            warn!(request = %script.request_line(), field, "Session value missing, retrying");
        }
        Ok(())
    }

    fn condition_check_failed(
        &mut self,
        script: &Script,
        _response: &Response,
        check: &Check,
        result: &AssertionResult,
        _ctx: &VariableContext,
    ) -> Result<()> {
        let detail = result.message.as_deref().unwrap_or_default();
        if script.is_timed_out() {
            error!(request = %script.request_line(), check = %check, detail, "Check failed");
        } else {
            warn!(request = %script.request_line(), check = %check, detail, "Check failed, retrying");
        }
        Ok(())
    }

    fn unexpected_response(
        &mut self,
        script: &Script,
        _response: Option<&Response>,
        reason: &str,
        _ctx: &VariableContext,
    ) -> Result<()> {
        if script.is_timed_out() {
            error!(request = %script.request_line(), reason, "Unexpected response");
        } else {
            warn!(request = %script.request_line(), reason, "Unexpected response, retrying");
        }
        Ok(())
    }

    fn template_failed(
        &mut self,
        script: &Script,
        missing: &[String],
        _ctx: &VariableContext,
    ) -> Result<()> {
        error!(request = %script.request_line(), missing = ?missing, "Template references unset variables");
        Ok(())
    }

    fn script_completed(&mut self, script: &Script, response: &Response, _ctx: &VariableContext) {
        info!(
            script = %script.label(),
            status = response.status.code(),
            duration_ms = response.duration.as_millis() as u64,
            "Script completed"
        );
    }

    fn script_timed_out(&mut self, script: &Script, _ctx: &VariableContext) -> Result<()> {
        error!(script = %script.label(), timeout = ?script.timeout, "Script timed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use std::time::Duration;

    #[test]
    fn test_logging_listener_never_aborts() {
        let mut listener = LoggingListener::new();
        let mut script = Script::new("GET", "http://localhost/");
        script.expire();
        let response = Response::new(500, HeaderMap::new(), String::new(), Duration::ZERO).unwrap();
        let ctx = VariableContext::new();

        assert!(listener.status_check_failed(&script, &response, &ctx).is_ok());
        assert!(listener.script_timed_out(&script, &ctx).is_ok());
        assert!(listener.template_failed(&script, &["x".to_string()], &ctx).is_ok());
        assert_eq!(listener.name(), "logging");
    }
}
