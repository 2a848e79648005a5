use apiscript::{ApiScriptError, Hook, Result};

#[test]
fn test_parse_error() {
    let err = ApiScriptError::ParseError("test error".to_string());
    assert_eq!(err.to_string(), "解析错误: test error");
    assert!(!err.is_fatal());
}

#[test]
fn test_invalid_url() {
    let err = ApiScriptError::InvalidUrl("not a url".to_string());
    assert_eq!(err.to_string(), "无效的 URL: not a url");
}

#[test]
fn test_error_conversion_from_anyhow() {
    let anyhow_err = anyhow::anyhow!("test anyhow error");
    let err: ApiScriptError = anyhow_err.into();
    assert!(err.to_string().contains("test anyhow error"));
}

#[test]
fn test_template_error_names_missing_variables() {
    let err = ApiScriptError::Template {
        script: "login".to_string(),
        missing: vec!["base_url".to_string(), "email".to_string()],
    };
    assert_eq!(
        err.to_string(),
        "模板错误: script login references unset variables: base_url, email"
    );
    assert_eq!(err.hook(), Some(Hook::TemplateFailed));
}

#[test]
fn test_aborted_and_bracket_are_fatal() {
    let aborted = ApiScriptError::aborted(Hook::StatusCheckFailed, "console", "expected 200");
    assert!(aborted.is_fatal());
    assert_eq!(aborted.to_string(), "status_check_failed(console): expected 200");

    let bracket = ApiScriptError::Bracket {
        hook: Hook::AfterScript,
        script: "cleanup".to_string(),
        message: "db unavailable".to_string(),
    };
    assert!(bracket.is_fatal());
    assert_eq!(bracket.to_string(), "after_script(cleanup) failed: db unavailable");
}

#[test]
fn test_result_type() {
    fn returns_error() -> Result<()> {
        Err(ApiScriptError::ParseError("test".to_string()))
    }

    let result = returns_error();
    assert!(result.is_err());
    match result {
        Err(ApiScriptError::ParseError(msg)) => assert_eq!(msg, "test"),
        _ => panic!("Expected ParseError"),
    }
}
