use std::fmt;
use std::time::Duration;

use reqwest::header::HeaderMap as Headers;

use crate::Result;
use crate::http::types::Status;

/// 服务端的实际响应，收到后不再修改
#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,
    pub headers: Headers,
    pub body: String,
    pub duration: Duration,
}

impl Response {
    pub fn new(status: u16, headers: Headers, body: String, duration: Duration) -> Result<Self> {
        Ok(Self {
            status: Status::new(status)?,
            headers,
            body,
            duration,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// 按 JSON 解析 body
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAX_BODY: usize = 512;

        write!(
            f,
            "HTTP {} {}",
            self.status.code(),
            self.status.reason_phrase()
        )?;
        if self.body.is_empty() {
            return Ok(());
        }
        if self.body.len() > MAX_BODY {
            let mut end = MAX_BODY;
            while !self.body.is_char_boundary(end) {
                end -= 1;
            }
            write!(f, " {}...", &self.body[..end])
        } else {
            write!(f, " {}", self.body)
        }
    }
}
