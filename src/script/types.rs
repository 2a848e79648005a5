use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::time::Instant;

use crate::script::check::Check;
use crate::script::template::RequestTemplate;
use crate::{ApiScriptError, Result};

/// 响应体的类型提示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// body 必须是合法 JSON
    Json,
    /// 任意文本
    Text,
}

impl FromStr for ResponseType {
    type Err = ApiScriptError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ResponseType::Json),
            "text" => Ok(ResponseType::Text),
            other => Err(ApiScriptError::ParseError(format!(
                "Invalid response type: {} (expected json or text)",
                other
            ))),
        }
    }
}

/// 会话令牌提取规则：从响应 body 的 `field` 路径读取，写入上下文变量 `var`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRule {
    pub field: String,
    pub var: String,
}

impl SessionRule {
    /// `var` 缺省时使用字段路径的最后一段
    pub fn new(field: impl Into<String>, var: Option<String>) -> Self {
        let field = field.into();
        let var = var.unwrap_or_else(|| {
            field
                .rsplit('.')
                .next()
                .unwrap_or(field.as_str())
                .to_string()
        });
        Self { field, var }
    }

    pub fn path(&self) -> Vec<String> {
        self.field.split('.').map(|s| s.to_string()).collect()
    }
}

/// 对成功响应的声明式描述
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseExpectation {
    /// 期望的状态码，默认 200
    pub status: u16,
    pub session: Option<SessionRule>,
    /// 成功后把原始 body 存入的上下文变量名
    pub store: Option<String>,
    pub response_type: Option<ResponseType>,
    pub checks: Vec<Check>,
}

impl Default for ResponseExpectation {
    fn default() -> Self {
        Self {
            status: 200,
            session: None,
            store: None,
            response_type: None,
            checks: Vec::new(),
        }
    }
}

impl fmt::Display for ResponseExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.status)?;
        if let Some(session) = &self.session {
            write!(f, ", session {} -> {}", session.field, session.var)?;
        }
        if !self.checks.is_empty() {
            let names: Vec<_> = self.checks.iter().map(|c| c.to_string()).collect();
            write!(f, ", checks [{}]", names.join("; "))?;
        }
        Ok(())
    }
}

/// 截止时间的上限，超出时钟范围的超时窗口按此截断
const MAX_WINDOW: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// 脚本的计时状态，只由运行器修改
#[derive(Debug, Clone, Default, PartialEq)]
struct ScriptTiming {
    start: Option<Instant>,
    deadline: Option<Instant>,
    expired: bool,
}

/// 一次声明式 HTTP 调用：请求模板 + 响应期望 + 超时窗口
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub name: Option<String>,
    pub request: RequestTemplate,
    pub response: ResponseExpectation,
    /// 整体超时；None 时使用运行器的默认值
    pub timeout: Option<Duration>,
    /// 传给 before_script 钩子的标签
    pub before: Option<String>,
    /// 传给 after_script 钩子的标签
    pub after: Option<String>,
    pub skip: bool,
    timing: ScriptTiming,
}

impl Script {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self::from_template(RequestTemplate::new(method, url))
    }

    pub fn from_template(request: RequestTemplate) -> Self {
        Self {
            name: None,
            request,
            response: ResponseExpectation::default(),
            timeout: None,
            before: None,
            after: None,
            skip: false,
            timing: ScriptTiming::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.request.body = Some(body.into());
        self
    }

    pub fn expect_status(mut self, status: u16) -> Self {
        self.response.status = status;
        self
    }

    pub fn with_session(mut self, field: impl Into<String>, var: Option<&str>) -> Self {
        self.response.session = Some(SessionRule::new(field, var.map(str::to_string)));
        self
    }

    pub fn store_as(mut self, var: impl Into<String>) -> Self {
        self.response.store = Some(var.into());
        self
    }

    pub fn with_response_type(mut self, response_type: ResponseType) -> Self {
        self.response.response_type = Some(response_type);
        self
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.response.checks.push(check);
        self
    }

    pub fn with_before(mut self, label: impl Into<String>) -> Self {
        self.before = Some(label.into());
        self
    }

    pub fn with_after(mut self, label: impl Into<String>) -> Self {
        self.after = Some(label.into());
        self
    }

    pub fn lenient(mut self) -> Self {
        self.request.lenient = true;
        self
    }

    /// 未展开的请求行，例如 `POST {{base_url}}/login`
    pub fn request_line(&self) -> String {
        self.request.request_line()
    }

    /// 用于日志和报告的名称，没有 @name 时使用请求行
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.request_line())
    }

    /// 开始一轮尝试：记录开始时间并固定截止时间
    pub(crate) fn start(&mut self, now: Instant, timeout: Duration) {
        let deadline = now
            .checked_add(timeout)
            .or_else(|| now.checked_add(MAX_WINDOW))
            .unwrap_or(now);
        self.timing = ScriptTiming {
            start: Some(now),
            deadline: Some(deadline),
            expired: false,
        };
    }

    /// 用给定时刻重新判定是否超时，返回判定结果
    pub(crate) fn check_deadline(&mut self, now: Instant) -> bool {
        if let Some(deadline) = self.timing.deadline {
            self.timing.expired = self.timing.expired || now >= deadline;
        }
        self.timing.expired
    }

    /// 立即视为超时（外部取消）
    pub(crate) fn expire(&mut self) {
        self.timing.expired = true;
    }

    /// 最近一次判定时脚本是否已超时
    ///
    /// 运行器在调用失败类钩子之前更新该状态，
    /// 因此同一次失败里所有监听器看到的结论一致。
    pub fn is_timed_out(&self) -> bool {
        self.timing.expired
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timing.deadline
    }

    /// 距截止时间的剩余时长
    pub fn remaining(&self, now: Instant) -> Duration {
        self.timing
            .deadline
            .map(|d| d.saturating_duration_since(now))
            .unwrap_or_default()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.timing
            .start
            .map(|s| now.saturating_duration_since(s))
            .unwrap_or_default()
    }

    /// 校验脚本定义本身
    pub fn validate(&self) -> Result<()> {
        if self.request.url.trim().is_empty() {
            return Err(ApiScriptError::ParseError(format!(
                "Script {} has no URL",
                self.label()
            )));
        }
        if !(100..600).contains(&self.response.status) {
            return Err(ApiScriptError::ParseError(format!(
                "Script {} expects invalid status {}",
                self.label(),
                self.response.status
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{} ", name)?;
        }
        write!(f, "[{}] expecting {}", self.request_line(), self.response)?;
        if let Some(timeout) = self.timeout {
            write!(f, " within {:?}", timeout)?;
        }
        Ok(())
    }
}
