use reqwest::header::{HeaderMap as Headers, HeaderName, HeaderValue};
use serde::Serialize;

use crate::http::types::{Method, Url};
use crate::{ApiScriptError, Result};

/// 模板展开后、可直接发送的请求
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: &str, url: &str) -> Result<Self> {
        Ok(Self {
            method: method.parse()?,
            url: Url::parse(url)?,
            headers: Headers::new(),
            body: None,
        })
    }

    fn insert_header(&mut self, key: &str, value: &str) -> Result<()> {
        let name: HeaderName = key
            .parse()
            .map_err(|_| ApiScriptError::ParseError(format!("Invalid header name: {}", key)))?;
        let value: HeaderValue = value.parse().map_err(|_| {
            ApiScriptError::ParseError(format!("Invalid value for header {}: {}", key, value))
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self> {
        self.insert_header(key, value)?;
        Ok(self)
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.body = Some(text.to_owned());
        self
    }

    pub fn with_json<T: Serialize>(mut self, data: &T) -> Result<Self> {
        let json = serde_json::to_string(data)?;
        if !self.headers.contains_key(reqwest::header::CONTENT_TYPE) {
            self.insert_header("Content-Type", "application/json")?;
        }
        self.body = Some(json);
        Ok(self)
    }

    pub fn with_auth_bearer(self, token: &str) -> Result<Self> {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    /// 请求行，例如 `POST http://localhost:3000/login`
    pub fn request_line(&self) -> String {
        format!("{} {}", self.method, self.url)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
