#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apiscript::assertion::AssertionResult;
use apiscript::http::{Request, Response, Transport};
use apiscript::script::{Check, Script};
use apiscript::variable::VariableContext;
use apiscript::{ApiRunnerListener, ApiScriptError, Result, listener::defaults};
use async_trait::async_trait;
use reqwest::header::HeaderMap;

/// 内存传输层的一次应答
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(u16, String),
    /// 永远不返回
    Hang,
    Fail(String),
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Reply::Respond(status, body.to_string())
    }

    pub fn status(status: u16) -> Self {
        Reply::Respond(status, String::new())
    }
}

/// 按 URL 路径排队应答的内存传输层，队列只剩一个时重复使用
#[derive(Default)]
pub struct FakeServer {
    routes: Mutex<Vec<(String, VecDeque<Reply>)>>,
    requests: Mutex<Vec<Request>>,
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, path: &str, replies: Vec<Reply>) {
        self.routes
            .lock()
            .unwrap()
            .push((path.to_string(), replies.into()));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }

    fn next_reply(&self, path: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let (_, replies) = routes.iter_mut().find(|(p, _)| p == path)?;
        if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn execute(&self, request: Request) -> Result<Response> {
        let path = request.url.path().to_string();
        self.requests.lock().unwrap().push(request);

        match self.next_reply(&path) {
            Some(Reply::Respond(status, body)) => {
                Response::new(status, HeaderMap::new(), body, Duration::from_millis(5))
            }
            Some(Reply::Fail(message)) => Err(ApiScriptError::NetworkError(message)),
            Some(Reply::Hang) => std::future::pending().await,
            None => Response::new(404, HeaderMap::new(), String::new(), Duration::ZERO),
        }
    }
}

/// 事件日志，记录为 `<listener>:<hook>:<script>`
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn count(log: &EventLog, suffix: &str) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|e| e.contains(suffix))
        .count()
}

/// 记录每个钩子的监听器，失败策略沿用默认实现，可配置为降级或跳过检查
#[derive(Clone)]
pub struct Recorder {
    pub name: String,
    pub log: EventLog,
    /// 终止性失败返回 Ok
    pub tolerate: bool,
    /// 名称在此列表中的检查被跳过
    pub skip: Vec<String>,
    pub fail_before_script: bool,
    pub fail_after_script: bool,
}

impl Recorder {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::clone(log),
            tolerate: false,
            skip: Vec::new(),
            fail_before_script: false,
            fail_after_script: false,
        }
    }

    pub fn tolerant(mut self) -> Self {
        self.tolerate = true;
        self
    }

    pub fn skipping(mut self, check: &str) -> Self {
        self.skip.push(check.to_string());
        self
    }

    fn record(&self, hook: &str, script: &Script) {
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}:{}", self.name, hook, script.label()));
    }

    fn settle(&self, fallback: Result<()>) -> Result<()> {
        if self.tolerate { Ok(()) } else { fallback }
    }
}

impl ApiRunnerListener for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn before_script(&mut self, script: &Script, _ctx: &mut VariableContext) -> Result<()> {
        self.record("before_script", script);
        if self.fail_before_script {
            let label = script.before.as_deref().unwrap_or("-");
            return Err(ApiScriptError::Other(format!("fixtures missing for {label}")));
        }
        Ok(())
    }

    fn after_script(&mut self, script: &Script, _ctx: &mut VariableContext) -> Result<()> {
        self.record("after_script", script);
        if self.fail_after_script {
            let label = script.after.as_deref().unwrap_or("-");
            return Err(ApiScriptError::Other(format!("cleanup failed for {label}")));
        }
        Ok(())
    }

    fn before_call(&mut self, script: &Script, _ctx: &VariableContext) {
        self.record("before_call", script);
    }

    fn after_call(&mut self, script: &Script, _ctx: &VariableContext, _response: Option<&Response>) {
        self.record("after_call", script);
    }

    fn status_check_failed(
        &mut self,
        script: &Script,
        response: &Response,
        ctx: &VariableContext,
    ) -> Result<()> {
        self.record(terminal("status_check_failed", script), script);
        self.settle(defaults::status_check_failed(&self.name, script, response, ctx))
    }

    fn session_id_not_found(
        &mut self,
        script: &Script,
        response: &Response,
        ctx: &VariableContext,
    ) -> Result<()> {
        self.record(terminal("session_id_not_found", script), script);
        self.settle(defaults::session_id_not_found(&self.name, script, response, ctx))
    }

    fn condition_check_failed(
        &mut self,
        script: &Script,
        response: &Response,
        check: &Check,
        result: &AssertionResult,
        ctx: &VariableContext,
    ) -> Result<()> {
        self.record(terminal("condition_check_failed", script), script);
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
        self.record(terminal("unexpected_response", script), script);
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
        self.record("template_failed", script);
        self.settle(defaults::template_failed(&self.name, script, missing, ctx))
    }

    fn script_completed(&mut self, script: &Script, _response: &Response, _ctx: &VariableContext) {
        self.record("script_completed", script);
    }

    fn script_timed_out(&mut self, script: &Script, ctx: &VariableContext) -> Result<()> {
        self.record("script_timed_out", script);
        self.settle(defaults::script_timed_out(&self.name, script, ctx))
    }

    fn skip_check(&mut self, script: &Script, check: &Check) -> bool {
        self.record(&format!("skip_check[{}]", check.name()), script);
        self.skip.iter().any(|name| name == check.name())
    }
}

/// 终止性失败在钩子名后加 `!`
fn terminal(hook: &'static str, script: &Script) -> &'static str {
    if !script.is_timed_out() {
        return hook;
    }
    match hook {
        "status_check_failed" => "status_check_failed!",
        "session_id_not_found" => "session_id_not_found!",
        "condition_check_failed" => "condition_check_failed!",
        _ => "unexpected_response!",
    }
}
