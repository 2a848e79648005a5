use crate::assertion::types::{AssertError, AssertExpr, AssertValue, CompareOp, ValuePath};

/// 运算符，按长度优先排列以免 `>=` 被识别成 `>`
const OPERATORS: [&str; 7] = [">=", "<=", "==", "!=", ">", "<", "contains"];

/// 解析断言表达式
///
/// 支持的格式：
/// - `status == 200`
/// - `headers.content-type contains "json"`
/// - `body.user.id > 0`
/// - `response.time < 1000`
/// - `body.token exists`
/// - `ctx.account.balance >= 100`
/// - `body.owner == {{user_id}}`
pub fn parse_assertion(input: &str) -> Result<AssertExpr, AssertError> {
    let input = input.trim();

    if let Some(path_str) = input.strip_suffix("exists") {
        if path_str.ends_with(char::is_whitespace) {
            let path = parse_value_path(path_str.trim())?;
            return Ok(AssertExpr::Exists { path });
        }
    }

    let (op_pos, op_str) = find_operator(input).ok_or_else(|| {
        AssertError::InvalidSyntax(format!("No valid operator found in assertion: {}", input))
    })?;

    let op = CompareOp::parse(op_str)
        .ok_or_else(|| AssertError::InvalidOperator(format!("Invalid operator: {}", op_str)))?;

    let left_str = input[..op_pos].trim();
    let right_str = input[op_pos + op_str.len()..].trim();

    if left_str.is_empty() {
        return Err(AssertError::InvalidSyntax(
            "Left side of assertion is empty".to_string(),
        ));
    }

    if right_str.is_empty() {
        return Err(AssertError::InvalidSyntax(
            "Right side of assertion is empty".to_string(),
        ));
    }

    let left = parse_value_path(left_str)?;
    let right = parse_assert_value(right_str)?;

    Ok(AssertExpr::Compare { left, op, right })
}

/// 找到最靠左、且不在引号内的运算符
fn find_operator(input: &str) -> Option<(usize, &'static str)> {
    let mut quote: Option<char> = None;

    for (pos, ch) in input.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None => {
                let rest = &input[pos..];
                for op in OPERATORS {
                    if !rest.starts_with(op) {
                        continue;
                    }
                    // 关键字运算符必须是独立单词
                    if op == "contains" && !is_word_boundary(input, pos, op.len()) {
                        continue;
                    }
                    return Some((pos, op));
                }
            }
        }
    }

    None
}

fn is_word_boundary(input: &str, pos: usize, len: usize) -> bool {
    let before = input[..pos].chars().next_back();
    let after = input[pos + len..].chars().next();
    before.is_none_or(char::is_whitespace) && after.is_none_or(char::is_whitespace)
}

/// 解析值路径
fn parse_value_path(input: &str) -> Result<ValuePath, AssertError> {
    let input = input.trim();

    if input == "status" {
        return Ok(ValuePath::Status);
    }

    if input == "response.time" {
        return Ok(ValuePath::ResponseTime);
    }

    if let Some(rest) = input.strip_prefix("headers.") {
        if rest.is_empty() {
            return Err(AssertError::InvalidSyntax(
                "Header name cannot be empty".to_string(),
            ));
        }
        return Ok(ValuePath::Header(rest.to_string()));
    }

    if let Some(rest) = input.strip_prefix("body.") {
        return Ok(ValuePath::Body(split_segments(rest, "Body")?));
    }

    if let Some(rest) = input.strip_prefix("ctx.") {
        let mut segments = split_segments(rest, "Context")?;
        let name = segments.remove(0);
        return Ok(ValuePath::Context { name, segments });
    }

    Err(AssertError::InvalidSyntax(format!(
        "Invalid value path: {}. Must start with 'status', 'headers.', 'body.', 'ctx.', or 'response.time'",
        input
    )))
}

fn split_segments(rest: &str, kind: &str) -> Result<Vec<String>, AssertError> {
    let segments: Vec<String> = rest.split('.').map(|s| s.to_string()).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(AssertError::InvalidSyntax(format!(
            "{} path has an empty segment: {}",
            kind, rest
        )));
    }
    Ok(segments)
}

/// 解析断言值（右值）
fn parse_assert_value(input: &str) -> Result<AssertValue, AssertError> {
    let input = input.trim();

    if input == "null" {
        return Ok(AssertValue::Null);
    }

    if input == "true" {
        return Ok(AssertValue::Bool(true));
    }
    if input == "false" {
        return Ok(AssertValue::Bool(false));
    }

    // 字符串（带引号）
    if input.len() >= 2
        && ((input.starts_with('"') && input.ends_with('"'))
            || (input.starts_with('\'') && input.ends_with('\'')))
    {
        let s = &input[1..input.len() - 1];
        return Ok(AssertValue::String(s.to_string()));
    }

    // 上下文变量引用
    if let Some(name) = input
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(AssertError::InvalidValue(
                "Empty variable reference".to_string(),
            ));
        }
        return Ok(AssertValue::Variable(name.to_string()));
    }

    if let Ok(n) = input.parse::<f64>() {
        return Ok(AssertValue::Number(n));
    }

    // 未带引号的字符串（用于 contains 等）
    Ok(AssertValue::String(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_assertion() {
        let expr = parse_assertion("status == 200").unwrap();
        assert_eq!(
            expr,
            AssertExpr::Compare {
                left: ValuePath::Status,
                op: CompareOp::Equal,
                right: AssertValue::Number(200.0),
            }
        );
    }

    #[test]
    fn test_parse_header_contains() {
        let expr = parse_assertion("headers.content-type contains \"json\"").unwrap();
        match expr {
            AssertExpr::Compare { left, op, right } => {
                assert_eq!(left, ValuePath::Header("content-type".to_string()));
                assert_eq!(op, CompareOp::Contains);
                assert_eq!(right, AssertValue::String("json".to_string()));
            }
            _ => panic!("Expected Compare assertion"),
        }
    }

    #[test]
    fn test_parse_leftmost_operator_wins() {
        // `>=` 必须整体识别，引号内的运算符字符被忽略
        let expr = parse_assertion("body.note == \"a >= b\"").unwrap();
        match expr {
            AssertExpr::Compare { op, right, .. } => {
                assert_eq!(op, CompareOp::Equal);
                assert_eq!(right, AssertValue::String("a >= b".to_string()));
            }
            _ => panic!("Expected Compare assertion"),
        }

        let expr = parse_assertion("body.balance >= 100").unwrap();
        assert!(matches!(
            expr,
            AssertExpr::Compare { op: CompareOp::GreaterOrEqual, .. }
        ));
    }

    #[test]
    fn test_parse_contains_needs_word_boundary() {
        let expr = parse_assertion("body.containsFlag == true").unwrap();
        match expr {
            AssertExpr::Compare { left, op, .. } => {
                assert_eq!(left, ValuePath::Body(vec!["containsFlag".to_string()]));
                assert_eq!(op, CompareOp::Equal);
            }
            _ => panic!("Expected Compare assertion"),
        }
    }

    #[test]
    fn test_parse_exists_assertion() {
        let expr = parse_assertion("body.token exists").unwrap();
        assert_eq!(
            expr,
            AssertExpr::Exists {
                path: ValuePath::Body(vec!["token".to_string()])
            }
        );
    }

    #[test]
    fn test_parse_context_path_and_variable() {
        let expr = parse_assertion("ctx.account.balance > {{minimum}}").unwrap();
        match expr {
            AssertExpr::Compare { left, right, .. } => {
                assert_eq!(
                    left,
                    ValuePath::Context {
                        name: "account".to_string(),
                        segments: vec!["balance".to_string()],
                    }
                );
                assert_eq!(right, AssertValue::Variable("minimum".to_string()));
            }
            _ => panic!("Expected Compare assertion"),
        }
    }

    #[test]
    fn test_parse_values() {
        let right_of = |s: &str| match parse_assertion(s).unwrap() {
            AssertExpr::Compare { right, .. } => right,
            _ => panic!("Expected Compare assertion"),
        };

        assert_eq!(right_of("body.count == 42"), AssertValue::Number(42.0));
        assert_eq!(right_of("body.active == true"), AssertValue::Bool(true));
        assert_eq!(right_of("body.data == null"), AssertValue::Null);
        assert_eq!(
            right_of("body.name == 'test'"),
            AssertValue::String("test".to_string())
        );
    }

    #[test]
    fn test_parse_invalid_syntax() {
        assert!(parse_assertion("invalid").is_err());
        assert!(parse_assertion("status").is_err());
        assert!(parse_assertion("== 200").is_err());
        assert!(parse_assertion("status ==").is_err());
        assert!(parse_assertion("body..id == 1").is_err());
        assert!(parse_assertion("balance > 100").is_err());
    }
}
