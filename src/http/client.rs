use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::Result;
use crate::http::request::Request;
use crate::http::response::Response;

/// 传输层：把一个已展开的请求变成实际响应
///
/// 运行器只依赖这个接口，测试中可以替换为内存实现。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response>;
}

/// 基于 reqwest 的默认传输实现
#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    /// 默认单次请求超时
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Result<Self> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl Transport for Client {
    async fn execute(&self, request: Request) -> Result<Response> {
        let mut req = self
            .inner
            .request(request.method.into(), request.url.as_url().clone())
            .headers(request.headers);

        if let Some(body) = request.body {
            req = req.body(body);
        }

        let start = Instant::now();
        let response = req.send().await?;
        let duration = start.elapsed();

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Response::new(status, headers, body, duration)
    }
}
