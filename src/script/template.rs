use crate::http::Request;
use crate::variable::{VariableContext, VariableResolver};
use crate::{ApiScriptError, Result};

/// 请求模板：方法、URL、Headers、Body 都可以包含 {{name}} 占位符
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestTemplate {
    /// HTTP 方法，缺失时为 GET
    pub method: Option<String>,
    pub url: String,
    /// 保持原始顺序
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// 为 true 时未设置的变量保持原样，不视为失败
    pub lenient: bool,
}

impl RequestTemplate {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self {
            method: Some(method.to_uppercase()),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn method_or_default(&self) -> &str {
        self.method.as_deref().unwrap_or("GET")
    }

    /// 未展开的请求行
    pub fn request_line(&self) -> String {
        format!("{} {}", self.method_or_default(), self.url)
    }

    /// 用上下文展开模板并构建请求
    ///
    /// 非 lenient 模式下逐段严格替换，收集所有未设置的变量（去重、按出现顺序），
    /// 有缺失就返回 `ApiScriptError::Template`。
    pub fn render(&self, script_label: &str, context: &VariableContext) -> Result<Request> {
        let mut missing: Vec<String> = Vec::new();
        let mut expand = |text: &str| {
            if self.lenient {
                return VariableResolver::substitute(text, context);
            }
            VariableResolver::substitute_strict(text, context).unwrap_or_else(|names| {
                for name in names {
                    if !missing.contains(&name) {
                        missing.push(name);
                    }
                }
                text.to_string()
            })
        };

        let url = expand(&self.url);
        let headers: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(key, value)| (expand(key), expand(value)))
            .collect();
        let body = self.body.as_deref().map(&mut expand);

        if !missing.is_empty() {
            return Err(ApiScriptError::Template {
                script: script_label.to_string(),
                missing,
            });
        }

        let mut request = Request::new(self.method_or_default(), &url)?;
        for (key, value) in &headers {
            request = request.with_header(key, value)?;
        }

        if let Some(body) = &body {
            request = add_body(request, body)?;
        }

        Ok(request)
    }
}

/// Body 类型推断和添加
fn add_body(request: Request, body: &str) -> Result<Request> {
    let content_type = request.header("content-type").map(str::to_string);

    match content_type.as_deref() {
        Some(ct) if ct.contains("application/json") => {
            // 显式指定 JSON：验证格式
            let json: serde_json::Value = serde_json::from_str(body)?;
            request.with_json(&json)
        }
        Some(_) => Ok(request.with_text(body)),
        None => {
            // 未指定 Content-Type：看起来像 JSON 就按 JSON 发送
            if is_json_like(body) {
                match serde_json::from_str::<serde_json::Value>(body) {
                    Ok(json) => request.with_json(&json),
                    Err(_) => Ok(request.with_text(body)),
                }
            } else {
                Ok(request.with_text(body))
            }
        }
    }
}

/// 简单的 JSON 格式检测
fn is_json_like(s: &str) -> bool {
    let trimmed = s.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_template() -> RequestTemplate {
        RequestTemplate {
            method: Some("POST".to_string()),
            url: "{{base_url}}/login".to_string(),
            headers: vec![("X-Session".to_string(), "{{session}}".to_string())],
            body: Some(r#"{"user": "{{user}}"}"#.to_string()),
            lenient: false,
        }
    }

    #[test]
    fn test_render_substitutes_everywhere() {
        let mut ctx = VariableContext::new();
        ctx.insert("base_url", "http://localhost:3000");
        ctx.insert("session", "s-1");
        ctx.insert("user", "alice");

        let request = login_template().render("login", &ctx).unwrap();
        assert_eq!(request.request_line(), "POST http://localhost:3000/login");
        assert_eq!(request.header("x-session"), Some("s-1"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(r#"{"user":"alice"}"#));
    }

    #[test]
    fn test_render_reports_missing_variables() {
        let mut ctx = VariableContext::new();
        ctx.insert("base_url", "http://localhost:3000");

        let err = login_template().render("login", &ctx).unwrap_err();
        match err {
            ApiScriptError::Template { script, missing } => {
                assert_eq!(script, "login");
                assert_eq!(missing, vec!["session".to_string(), "user".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_names_are_collected_across_parts() {
        let mut template = RequestTemplate::new("PUT", "{{base_url}}/users/{{id}}");
        template.headers = vec![("Authorization".to_string(), "Bearer {{token}}".to_string())];
        template.body = Some(r#"{"id": "{{id}}", "by": "{{base_url}}"}"#.to_string());

        let err = template.render("update", &VariableContext::new()).unwrap_err();
        match err {
            ApiScriptError::Template { missing, .. } => assert_eq!(
                missing,
                vec!["base_url".to_string(), "id".to_string(), "token".to_string()]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lenient_keeps_placeholders() {
        let mut template = RequestTemplate::new("get", "http://localhost/items?tag={{tag}}");
        template.lenient = true;

        let request = template.render("items", &VariableContext::new()).unwrap();
        assert_eq!(request.method.as_str(), "GET");
        assert!(request.url.query().is_some_and(|q| q.starts_with("tag=")));
    }

    #[test]
    fn test_plain_text_body() {
        let mut template = RequestTemplate::new("POST", "http://localhost/notes");
        template.body = Some("remember {{thing}}".to_string());
        let mut ctx = VariableContext::new();
        ctx.insert("thing", "milk");

        let request = template.render("notes", &ctx).unwrap();
        assert_eq!(request.body.as_deref(), Some("remember milk"));
        assert!(request.header("content-type").is_none());
    }

    #[test]
    fn test_is_json_like() {
        assert!(is_json_like(r#"  {"key": "value"}  "#));
        assert!(is_json_like("[1, 2, 3]"));
        assert!(!is_json_like("key=value"));
    }
}
