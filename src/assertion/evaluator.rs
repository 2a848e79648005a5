use crate::assertion::extractor::extract_value;
use crate::assertion::types::{AssertError, AssertExpr, AssertValue, AssertionResult};
use crate::http::Response;
use crate::variable::VariableContext;

/// 执行断言求值，纯函数：相同输入总是得到相同结果
pub fn evaluate_assertion(
    assertion: &AssertExpr,
    response: &Response,
    context: &VariableContext,
) -> AssertionResult {
    let raw = format_assertion(assertion);

    match assertion {
        AssertExpr::Compare { left, op, right } => {
            let actual_value = match extract_value(response, context, left) {
                Ok(v) => v,
                Err(e) => return AssertionResult::error(raw, e),
            };

            let expected_value = match resolve_operand(right, context) {
                Ok(v) => v,
                Err(e) => return AssertionResult::error(raw, e),
            };

            match actual_value.compare(*op, &expected_value) {
                Ok(passed) => {
                    let actual_str = actual_value.to_string();
                    let expected_str = format!("{} {}", op, expected_value);

                    if passed {
                        AssertionResult::pass(raw, actual_str, expected_str)
                    } else {
                        let message = format!(
                            "Expected {} to be {}, but got {}",
                            left, expected_str, actual_str
                        );
                        AssertionResult::fail(raw, actual_str, expected_str, message)
                    }
                }
                Err(e) => AssertionResult::error(raw, e),
            }
        }

        AssertExpr::Exists { path } => match extract_value(response, context, path) {
            Ok(value) => AssertionResult::pass(raw, value.to_string(), "exists".to_string()),
            Err(_) => {
                let message = format!("Expected {} to exist, but it was not found", path);
                AssertionResult::fail(
                    raw,
                    "not found".to_string(),
                    "exists".to_string(),
                    message,
                )
            }
        },
    }
}

/// 把 {{name}} 右值替换为上下文中的值
fn resolve_operand(value: &AssertValue, context: &VariableContext) -> Result<AssertValue, AssertError> {
    match value {
        AssertValue::Variable(name) => context
            .get(name)
            .map(AssertValue::from_context_str)
            .ok_or_else(|| AssertError::InvalidValue(format!("Variable '{}' is not set", name))),
        other => Ok(other.clone()),
    }
}

/// 格式化断言表达式为字符串
pub fn format_assertion(assertion: &AssertExpr) -> String {
    match assertion {
        AssertExpr::Compare { left, op, right } => format!("{} {} {}", left, op, right),
        AssertExpr::Exists { path } => format!("{} exists", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::parser::parse_assertion;
    use reqwest::header::HeaderMap;
    use std::time::Duration;

    fn create_test_response(status: u16, body: &str, duration_ms: u64) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        Response::new(
            status,
            headers,
            body.to_string(),
            Duration::from_millis(duration_ms),
        )
        .unwrap()
    }

    fn eval(expr: &str, response: &Response, ctx: &VariableContext) -> AssertionResult {
        evaluate_assertion(&parse_assertion(expr).unwrap(), response, ctx)
    }

    #[test]
    fn test_evaluate_status() {
        let ctx = VariableContext::new();
        let ok = eval("status == 200", &create_test_response(200, "{}", 10), &ctx);
        assert!(ok.passed);
        assert_eq!(ok.actual, Some("200".to_string()));

        let bad = eval("status == 200", &create_test_response(404, "{}", 10), &ctx);
        assert!(!bad.passed);
        assert!(bad.message.unwrap().contains("but got 404"));
    }

    #[test]
    fn test_evaluate_body_and_headers() {
        let ctx = VariableContext::new();
        let response = create_test_response(200, r#"{"balance": 150, "name": "test"}"#, 10);

        assert!(eval("body.balance > 100", &response, &ctx).passed);
        assert!(!eval("body.balance > 200", &response, &ctx).passed);
        assert!(eval("body.name == \"test\"", &response, &ctx).passed);
        assert!(eval("headers.content-type contains json", &response, &ctx).passed);
        assert!(eval("response.time < 200", &response, &ctx).passed);
    }

    #[test]
    fn test_evaluate_exists() {
        let ctx = VariableContext::new();
        assert!(eval("body.token exists", &create_test_response(200, r#"{"token": "a"}"#, 1), &ctx).passed);
        let missing = eval("body.token exists", &create_test_response(200, "{}", 1), &ctx);
        assert!(!missing.passed);
        assert_eq!(missing.actual, Some("not found".to_string()));
    }

    #[test]
    fn test_evaluate_against_context_variable() {
        let mut ctx = VariableContext::new();
        ctx.insert("user_id", "42");
        let response = create_test_response(200, r#"{"owner": 42}"#, 1);

        let result = eval("body.owner == {{user_id}}", &response, &ctx);
        assert!(result.passed);
        assert_eq!(result.expected, "== 42");

        let unset = eval("body.owner == {{other}}", &response, &ctx);
        assert!(!unset.passed);
        assert!(unset.message.unwrap().contains("other"));
    }

    #[test]
    fn test_evaluate_path_not_found() {
        let ctx = VariableContext::new();
        let result = eval("body.missing == 123", &create_test_response(200, "{}", 1), &ctx);
        assert!(!result.passed);
        assert!(result.actual.is_none());
    }
}
