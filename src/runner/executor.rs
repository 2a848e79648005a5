use std::sync::Arc;

use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::assertion::{AssertionResult, navigate};
use crate::http::{Request, Response, Transport};
use crate::listener::{ApiRunnerListener, Hook, ListenerBase};
use crate::runner::cancel::CancelToken;
use crate::runner::types::{RunReport, RunnerOptions, ScriptOutcome, ScriptStatus};
use crate::script::{ResponseType, Script, SessionRule};
use crate::variable::VariableContext;
use crate::{ApiScriptError, Result};

/// 一次失败的尝试，按校验顺序归类
#[derive(Debug)]
enum Failure {
    Status(Response),
    Session(Response),
    Condition {
        response: Response,
        check: usize,
        result: AssertionResult,
    },
    Unexpected {
        response: Option<Response>,
        reason: String,
    },
}

impl Failure {
    fn hook(&self) -> Hook {
        match self {
            Failure::Status(_) => Hook::StatusCheckFailed,
            Failure::Session(_) => Hook::SessionIdNotFound,
            Failure::Condition { .. } => Hook::ConditionCheckFailed,
            Failure::Unexpected { .. } => Hook::UnexpectedResponse,
        }
    }

    fn describe(&self, script: &Script) -> String {
        match self {
            Failure::Status(response) => format!(
                "expected status {} but was {}",
                script.response.status,
                response.status.code()
            ),
            Failure::Session(_) => format!(
                "session field '{}' not found",
                script
                    .response
                    .session
                    .as_ref()
                    .map(|s| s.field.as_str())
                    .unwrap_or_default()
            ),
            Failure::Condition { check, result, .. } => format!(
                "check {} failed: {}",
                script.response.checks[*check],
                result.message.as_deref().unwrap_or("condition was false")
            ),
            Failure::Unexpected { reason, .. } => reason.clone(),
        }
    }
}

/// 单次 HTTP 调用的结果
enum Attempt {
    Response(Response),
    NoResponse(String),
    /// 调用被脚本截止时间打断
    DeadlineReached,
    Cancelled,
}

/// 按顺序执行脚本的运行器
///
/// 每个脚本在截止时间内反复尝试：发请求，再依次校验状态码、响应类型、
/// 会话令牌和检查条件。失败时通知监听器，未超时则等待 backoff 后重试。
/// 每个脚本恰好触发一个终止性钩子（成功、被降级的失败或致命错误）。
pub struct ApiRunner {
    transport: Arc<dyn Transport>,
    listener: Box<dyn ApiRunnerListener>,
    context: VariableContext,
    options: RunnerOptions,
    cancel: CancelToken,
}

impl ApiRunner {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            listener: Box::new(ListenerBase::default()),
            context: VariableContext::new(),
            options: RunnerOptions::default(),
            cancel: CancelToken::never(),
        }
    }

    pub fn with_listener<L>(self, listener: L) -> Self
    where
        L: ApiRunnerListener + 'static,
    {
        self.with_boxed_listener(Box::new(listener))
    }

    pub fn with_boxed_listener(mut self, listener: Box<dyn ApiRunnerListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_context(mut self, context: VariableContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn context(&self) -> &VariableContext {
        &self.context
    }

    pub fn listener(&self) -> &dyn ApiRunnerListener {
        self.listener.as_ref()
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// 按顺序执行所有脚本
    ///
    /// 返回 `Err` 表示某个监听器判定了致命错误，后续脚本不再执行。
    pub async fn run(&mut self, scripts: &[Script]) -> Result<RunReport> {
        for script in scripts {
            script.validate()?;
        }

        let started = Instant::now();
        info!(
            scripts = scripts.len(),
            listener = self.listener.name(),
            "Run starting"
        );

        let mut outcomes = Vec::with_capacity(scripts.len());
        for (i, script) in scripts.iter().enumerate() {
            match self.run_script(i + 1, script).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(script = %script.label(), error = %e, "Run aborted");
                    return Err(e);
                }
            }
        }

        let report = RunReport {
            outcomes,
            context: self.context.clone(),
            duration: started.elapsed(),
        };
        info!(
            completed = report.completed(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Run finished"
        );
        Ok(report)
    }

    /// 执行单个脚本，包括前后的 before_script / after_script 钩子
    pub async fn run_script(&mut self, index: usize, script: &Script) -> Result<ScriptOutcome> {
        let label = script.label();
        if script.skip {
            debug!(script = %label, "Skipping script");
            return Ok(ScriptOutcome::skipped(index, label, script.request_line()));
        }

        let mut script = script.clone();
        let started = Instant::now();

        self.listener
            .before_script(&script, &mut self.context)
            .map_err(|e| bracket(Hook::BeforeScript, &label, e))?;

        let (status, attempts) = self.drive(&mut script).await?;

        self.listener
            .after_script(&script, &mut self.context)
            .map_err(|e| bracket(Hook::AfterScript, &label, e))?;

        Ok(ScriptOutcome {
            index,
            label,
            request_line: script.request_line(),
            status,
            attempts,
            duration: started.elapsed(),
        })
    }

    /// 重试循环
    async fn drive(&mut self, script: &mut Script) -> Result<(ScriptStatus, u32)> {
        let window = script.timeout.unwrap_or(self.options.default_timeout);
        script.start(Instant::now(), window);

        let label = script.label();
        let mut attempts = 0u32;
        let mut last: Option<Failure> = None;

        loop {
            if self.cancel.is_cancelled() {
                script.expire();
                return self.finish_expired(script, last, attempts);
            }

            // 在截止时间醒来：上一次失败直接成为终止性失败，不再发请求
            if script.check_deadline(Instant::now()) {
                return self.finish_expired(script, last, attempts);
            }

            attempts += 1;
            debug!(script = %label, attempt = attempts, "Attempt starting");

            let request = match script.request.render(&label, &self.context) {
                Ok(request) => request,
                Err(ApiScriptError::Template { missing, .. }) => {
                    warn!(script = %label, missing = ?missing, "Unset template variables");
                    self.listener
                        .template_failed(script, &missing, &self.context)?;
                    let status = ScriptStatus::Failed {
                        hook: Hook::TemplateFailed,
                        message: format!("unset variables: {}", missing.join(", ")),
                    };
                    return Ok((status, attempts));
                }
                Err(e) => {
                    // 展开后的 URL 或请求头无效，重试无法修复
                    script.expire();
                    let failure = Failure::Unexpected {
                        response: None,
                        reason: format!("invalid request: {}", e),
                    };
                    self.dispatch(script, &failure)?;
                    return Ok((failed(script, &failure), attempts));
                }
            };

            self.listener.before_call(script, &self.context);

            let failure = match self.call(script, request).await {
                Attempt::Cancelled | Attempt::DeadlineReached => {
                    self.listener.after_call(script, &self.context, None);
                    script.expire();
                    return self.finish_expired(script, last, attempts);
                }
                Attempt::NoResponse(reason) => {
                    self.listener.after_call(script, &self.context, None);
                    Failure::Unexpected {
                        response: None,
                        reason,
                    }
                }
                Attempt::Response(response) => {
                    self.listener
                        .after_call(script, &self.context, Some(&response));
                    match self.validate(script, response) {
                        Ok(response) => {
                            self.complete(script, &response);
                            return Ok((ScriptStatus::Completed, attempts));
                        }
                        Err(failure) => failure,
                    }
                }
            };

            // 先更新超时判定，保证所有监听器看到同一个结论
            if self.cancel.is_cancelled() {
                script.expire();
            }
            let terminal = script.check_deadline(Instant::now());
            self.dispatch(script, &failure)?;

            if terminal {
                warn!(script = %label, hook = %failure.hook(), "Script failed, continuing");
                return Ok((failed(script, &failure), attempts));
            }

            let pause = self.options.backoff.min(script.remaining(Instant::now()));
            debug!(
                script = %label,
                hook = %failure.hook(),
                backoff_ms = pause.as_millis() as u64,
                "Attempt failed, retrying"
            );
            last = Some(failure);

            let mut cancel = self.cancel.clone();
            tokio::select! {
                _ = sleep(pause) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }

    async fn call(&mut self, script: &Script, request: Request) -> Attempt {
        let budget = self
            .options
            .call_timeout
            .min(script.remaining(Instant::now()));
        let transport = Arc::clone(&self.transport);
        let mut cancel = self.cancel.clone();

        tokio::select! {
            result = timeout(budget, transport.execute(request)) => match result {
                Ok(Ok(response)) => Attempt::Response(response),
                Ok(Err(e)) => Attempt::NoResponse(e.to_string()),
                Err(_) if script.remaining(Instant::now()).is_zero() => Attempt::DeadlineReached,
                Err(_) => Attempt::NoResponse(format!("call timed out after {:?}", budget)),
            },
            _ = cancel.cancelled() => Attempt::Cancelled,
        }
    }

    /// 校验顺序：状态码、响应类型、会话令牌、检查条件
    fn validate(
        &mut self,
        script: &Script,
        response: Response,
    ) -> std::result::Result<Response, Failure> {
        if response.status.code() != script.response.status {
            return Err(Failure::Status(response));
        }

        if script.response.response_type == Some(ResponseType::Json) && response.json().is_err() {
            return Err(Failure::Unexpected {
                response: Some(response),
                reason: "response body is not valid JSON".to_string(),
            });
        }

        if let Some(rule) = &script.response.session {
            match session_value(&response, rule) {
                Some(value) => {
                    debug!(var = %rule.var, "Session value captured");
                    self.context.set(rule.var.as_str(), value);
                }
                None => return Err(Failure::Session(response)),
            }
        }

        for (index, check) in script.response.checks.iter().enumerate() {
            if self.listener.skip_check(script, check) {
                debug!(check = %check, "Check skipped by listener");
                continue;
            }
            let result = check.evaluate(&response, &self.context);
            if !result.passed {
                return Err(Failure::Condition {
                    response,
                    check: index,
                    result,
                });
            }
        }

        Ok(response)
    }

    fn complete(&mut self, script: &Script, response: &Response) {
        if let Some(var) = &script.response.store {
            self.context.set(var.as_str(), response.body.clone());
        }
        info!(
            script = %script.label(),
            status = response.status.code(),
            elapsed_ms = script.elapsed(Instant::now()).as_millis() as u64,
            "Script completed"
        );
        self.listener
            .script_completed(script, response, &self.context);
    }

    fn dispatch(&mut self, script: &Script, failure: &Failure) -> Result<()> {
        let ctx = &self.context;
        match failure {
            Failure::Status(response) => self.listener.status_check_failed(script, response, ctx),
            Failure::Session(response) => self.listener.session_id_not_found(script, response, ctx),
            Failure::Condition {
                response,
                check,
                result,
            } => self.listener.condition_check_failed(
                script,
                response,
                &script.response.checks[*check],
                result,
                ctx,
            ),
            Failure::Unexpected { response, reason } => {
                self.listener
                    .unexpected_response(script, response.as_ref(), reason, ctx)
            }
        }
    }

    /// 脚本已超时：有过可归类的失败就以它终止，否则触发 script_timed_out
    fn finish_expired(
        &mut self,
        script: &Script,
        last: Option<Failure>,
        attempts: u32,
    ) -> Result<(ScriptStatus, u32)> {
        match last {
            Some(failure) => {
                self.dispatch(script, &failure)?;
                Ok((failed(script, &failure), attempts))
            }
            None => {
                self.listener.script_timed_out(script, &self.context)?;
                Err(ApiScriptError::aborted(
                    Hook::ScriptTimedOut,
                    self.listener.name(),
                    format!(
                        "script {} timed out after {:?}",
                        script.label(),
                        script.timeout.unwrap_or(self.options.default_timeout)
                    ),
                ))
            }
        }
    }
}

fn failed(script: &Script, failure: &Failure) -> ScriptStatus {
    ScriptStatus::Failed {
        hook: failure.hook(),
        message: failure.describe(script),
    }
}

fn bracket(hook: Hook, label: &str, err: ApiScriptError) -> ApiScriptError {
    match err {
        err @ ApiScriptError::Bracket { .. } => err,
        err => ApiScriptError::Bracket {
            hook,
            script: label.to_string(),
            message: err.to_string(),
        },
    }
}

/// 从 JSON body 中读取会话值，缺失或为空时返回 None
fn session_value(response: &Response, rule: &SessionRule) -> Option<String> {
    let json = response.json().ok()?;
    match navigate(&json, &rule.path())? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl std::fmt::Debug for ApiRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRunner")
            .field("listener", &self.listener.name())
            .field("context", &self.context)
            .field("options", &self.options)
            .finish()
    }
}
