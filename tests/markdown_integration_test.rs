use std::time::Duration;

use apiscript::parser::{ParseError, load_scripts, parse_markdown};
use apiscript::script::ResponseType;

#[test]
fn test_orders_demo() {
    let scripts = load_scripts("demos/orders.md").unwrap();

    // ```json 响应示例不是脚本
    assert_eq!(scripts.len(), 3);

    // 名称来自前面的标题，@name 覆盖标题
    let labels: Vec<_> = scripts.iter().map(|s| s.label()).collect();
    assert_eq!(labels, vec!["Log in", "Place an order", "balance"]);

    let login = &scripts[0];
    assert_eq!(login.request.method_or_default(), "POST");
    assert!(login.request.url.ends_with("/login"));
    let session = login.response.session.as_ref().unwrap();
    assert_eq!(session.field, "token");
    assert_eq!(session.var, "token");

    let order = &scripts[1];
    assert_eq!(order.response.status, 201);
    assert_eq!(order.timeout, Some(Duration::from_secs(10)));
    assert_eq!(order.response.checks.len(), 1);

    let balance = &scripts[2];
    assert_eq!(balance.response.checks.len(), 2);
    assert_eq!(balance.response.checks[0].name(), "enough credit");
}

#[test]
fn test_signup_demo_keeps_skipped_script() {
    let scripts = load_scripts("demos/signup-flow.http").unwrap();
    assert_eq!(scripts.len(), 4);
    assert!(scripts[3].skip);
    assert_eq!(scripts[2].response.response_type, Some(ResponseType::Json));
    assert_eq!(scripts[2].response.store.as_deref(), Some("profile"));
}

#[test]
fn test_nested_fences_are_ignored() {
    let content = r#"
# API

## Fetch

````markdown
```http
GET https://example.com/inside-docs
```
````

```http
@assert status == 200
@assert body.id exists
GET https://example.com/items/1
```
"#;
    let scripts = parse_markdown(content).unwrap();
    assert_eq!(scripts.len(), 1);
    assert_eq!(scripts[0].request.url, "https://example.com/items/1");
    assert_eq!(scripts[0].response.checks.len(), 2);
    assert_eq!(scripts[0].label(), "Fetch");
}

#[test]
fn test_mixed_http_rest_blocks() {
    let content = r#"
## One

```http
GET https://example.com/one
```

## Two

```rest
DELETE https://example.com/two
```
"#;
    let scripts = parse_markdown(content).unwrap();
    assert_eq!(scripts.len(), 2);
    assert_eq!(scripts[1].request_line(), "DELETE https://example.com/two");
    assert_eq!(scripts[1].label(), "Two");
}

#[test]
fn test_document_without_scripts_is_an_error() {
    let content = "# Notes\n\nNothing to run here.\n\n```json\n{\"a\": 1}\n```\n";
    assert!(matches!(parse_markdown(content), Err(ParseError::NoScripts)));
}

#[test]
fn test_bad_check_points_at_document_line() {
    let content = "# Orders\n\nSome text.\n\n```http\n@assert [ok] total > 1\nGET https://example.com/orders\n```\n";
    let err = parse_markdown(content).unwrap_err();
    assert_eq!(err.line(), Some(6));
    assert!(err.to_string().contains("total > 1"));
}
