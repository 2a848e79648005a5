use crate::assertion::types::{AssertError, AssertValue, ValuePath};
use crate::http::Response;
use crate::variable::VariableContext;

/// 从响应或上下文中提取值
pub fn extract_value(
    response: &Response,
    context: &VariableContext,
    path: &ValuePath,
) -> Result<AssertValue, AssertError> {
    match path {
        ValuePath::Status => Ok(AssertValue::Number(response.status.code() as f64)),

        ValuePath::Header(name) => {
            let value = response
                .headers
                .get(name.as_str())
                .ok_or_else(|| AssertError::PathNotFound(format!("Header '{}' not found", name)))?;
            Ok(AssertValue::String(
                value
                    .to_str()
                    .map_err(|e| {
                        AssertError::ExtractionError(format!(
                            "Failed to convert header value to string: {}",
                            e
                        ))
                    })?
                    .to_string(),
            ))
        }

        ValuePath::Body(segments) => {
            let json: serde_json::Value = serde_json::from_str(&response.body)?;
            let value = navigate(&json, segments).ok_or_else(|| {
                AssertError::PathNotFound(format!("Path '{}' not found", path))
            })?;
            json_value_to_assert_value(value)
        }

        ValuePath::ResponseTime => Ok(AssertValue::Number(response.duration.as_millis() as f64)),

        ValuePath::Context { name, segments } => {
            let raw = context.get(name).ok_or_else(|| {
                AssertError::PathNotFound(format!("Context variable '{}' is not set", name))
            })?;
            if segments.is_empty() {
                return Ok(AssertValue::from_context_str(raw));
            }
            let json: serde_json::Value = serde_json::from_str(raw)?;
            let value = navigate(&json, segments).ok_or_else(|| {
                AssertError::PathNotFound(format!("Path '{}' not found", path))
            })?;
            json_value_to_assert_value(value)
        }
    }
}

/// 按点号路径在 JSON 中导航，数字段可作为数组下标
pub fn navigate<'a>(
    value: &'a serde_json::Value,
    segments: &[String],
) -> Option<&'a serde_json::Value> {
    segments.iter().try_fold(value, |current, segment| match current {
        serde_json::Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => current.get(segment.as_str()),
    })
}

/// 将 serde_json::Value 转换为 AssertValue
fn json_value_to_assert_value(value: &serde_json::Value) -> Result<AssertValue, AssertError> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().map(AssertValue::Number).ok_or_else(|| {
            AssertError::ExtractionError("Number cannot be represented as f64".to_string())
        }),
        serde_json::Value::String(s) => Ok(AssertValue::String(s.clone())),
        serde_json::Value::Bool(b) => Ok(AssertValue::Bool(*b)),
        serde_json::Value::Null => Ok(AssertValue::Null),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(
            AssertError::ExtractionError("Cannot compare arrays or objects directly".to_string()),
        ),
    }
}
