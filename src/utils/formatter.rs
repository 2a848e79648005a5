use crate::http::Response;
use anyhow::Result;
use colored::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Compact,
    Verbose,
}

/// 把响应渲染成终端输出
#[derive(Debug, Clone)]
pub struct ResponseFormatter {
    format: ResponseFormat,
    color: bool,
    /// Compact 模式下超过该长度的 body 只显示字节数
    compact_body_limit: usize,
}

impl ResponseFormatter {
    pub fn new(format: ResponseFormat) -> Self {
        Self {
            format,
            color: true,
            compact_body_limit: 200,
        }
    }

    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn format(&self, response: &Response) -> Result<String> {
        let mut output = vec![self.status_line(response), self.timing(response)];

        match self.format {
            ResponseFormat::Compact => {
                let body = &response.body;
                if body.len() > self.compact_body_limit {
                    output.push(format!("Body: {} bytes", body.len()));
                } else if !body.is_empty() {
                    output.push(pretty_json(body).unwrap_or_else(|_| body.to_string()));
                }
            }
            ResponseFormat::Verbose => {
                output.push(String::new());
                output.push(self.heading("Headers:"));
                for (key, value) in response.headers.iter() {
                    let line = format!("   {}: {}", key, value.to_str().unwrap_or("<invalid utf-8>"));
                    output.push(if self.color { line.blue().to_string() } else { line });
                }
                if !response.body.is_empty() {
                    output.push(String::new());
                    output.push(self.heading("Body:"));
                    output.push(pretty_json(&response.body).unwrap_or_else(|_| response.body.clone()));
                }
            }
        }

        Ok(output.join("\n"))
    }

    fn status_line(&self, response: &Response) -> String {
        let line = format!(
            "HTTP {} {}",
            response.status.code(),
            response.status.reason_phrase()
        );
        if !self.color {
            return line;
        }
        let colored = if response.is_success() {
            line.green()
        } else if response.is_client_error() {
            line.yellow()
        } else {
            line.red()
        };
        match self.format {
            ResponseFormat::Verbose => colored.bold().to_string(),
            ResponseFormat::Compact => colored.to_string(),
        }
    }

    fn timing(&self, response: &Response) -> String {
        let line = format!("Time: {}ms", response.duration.as_millis());
        if self.color { line.cyan().to_string() } else { line }
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.blue().bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// 尝试将 body 格式化为漂亮的 JSON，不是合法 JSON 时返回错误
fn pretty_json(body: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    serde_json::to_string_pretty(&value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};
    use std::time::Duration;

    fn response(body: &str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        Response::new(200, headers, body.to_string(), Duration::from_millis(12)).unwrap()
    }

    #[test]
    fn test_compact_pretty_prints_small_json() {
        let formatter = ResponseFormatter::new(ResponseFormat::Compact).without_color();
        let output = formatter.format(&response(r#"{"ok":true}"#)).unwrap();
        assert_eq!(output, "HTTP 200 OK\nTime: 12ms\n{\n  \"ok\": true\n}");
    }

    #[test]
    fn test_compact_summarizes_large_body() {
        let formatter = ResponseFormatter::new(ResponseFormat::Compact).without_color();
        let output = formatter.format(&response(&"x".repeat(300))).unwrap();
        assert!(output.ends_with("Body: 300 bytes"));
    }

    #[test]
    fn test_verbose_lists_headers() {
        let formatter = ResponseFormatter::new(ResponseFormat::Verbose).without_color();
        let output = formatter.format(&response("plain")).unwrap();
        assert!(output.contains("Headers:\n   content-type: application/json"));
        assert!(output.ends_with("Body:\nplain"));
    }
}
