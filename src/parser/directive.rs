use std::time::Duration;

use crate::parser::error::{ParseError, ParseResult};
use crate::script::{Check, ResponseType, Script, SessionRule};

/// 脚本块里的一条 `@` 指令
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Name(String),
    Skip(bool),
    Timeout(Duration),
    Status(u16),
    Session { field: String, var: Option<String> },
    Store(String),
    Type(ResponseType),
    Check { name: Option<String>, condition: String },
    Before(String),
    After(String),
    Lenient,
}

impl Directive {
    /// 解析一行指令；不以 `@` 开头的行返回 `None`，未知指令被忽略
    pub fn parse(line: &str) -> ParseResult<Option<Self>> {
        let Some(rest) = line.trim().strip_prefix('@') else {
            return Ok(None);
        };
        let (keyword, arg) = match rest.split_once(char::is_whitespace) {
            Some((keyword, arg)) => (keyword, arg.trim()),
            None => (rest, ""),
        };

        let directive = match keyword {
            "name" => Directive::Name(value(keyword, arg)?),
            "skip" => Directive::Skip(arg.is_empty() || arg.parse().unwrap_or(true)),
            "timeout" => Directive::Timeout(parse_duration(arg)?),
            "status" => Directive::Status(status(arg)?),
            "session" => session(arg)?,
            "store" => Directive::Store(value(keyword, arg)?),
            "type" => Directive::Type(
                arg.parse()
                    .map_err(|e: crate::ApiScriptError| ParseError::directive(e.to_string()))?,
            ),
            "assert" => check(arg)?,
            "before" => Directive::Before(value(keyword, arg)?),
            "after" => Directive::After(value(keyword, arg)?),
            "lenient" => Directive::Lenient,
            _ => {
                tracing::debug!(directive = keyword, "Ignoring unrecognized directive");
                return Ok(None);
            }
        };
        Ok(Some(directive))
    }

    /// 把指令写进脚本
    pub fn apply(self, script: &mut Script) -> ParseResult<()> {
        match self {
            Directive::Name(name) => script.name = Some(name),
            Directive::Skip(skip) => script.skip = skip,
            Directive::Timeout(timeout) => script.timeout = Some(timeout),
            Directive::Status(status) => script.response.status = status,
            Directive::Session { field, var } => {
                script.response.session = Some(SessionRule::new(field, var));
            }
            Directive::Store(var) => script.response.store = Some(var),
            Directive::Type(response_type) => script.response.response_type = Some(response_type),
            Directive::Check { name, condition } => {
                let check = match name {
                    Some(name) => Check::named(name, &condition),
                    None => Check::parse(&condition),
                }
                .map_err(|e| ParseError::Check {
                    line: 0,
                    condition: condition.clone(),
                    message: e.to_string(),
                })?;
                script.response.checks.push(check);
            }
            Directive::Before(label) => script.before = Some(label),
            Directive::After(label) => script.after = Some(label),
            Directive::Lenient => script.request.lenient = true,
        }
        Ok(())
    }
}

fn value(keyword: &str, arg: &str) -> ParseResult<String> {
    if arg.is_empty() {
        return Err(ParseError::directive(format!("@{} requires a value", keyword)));
    }
    Ok(arg.to_string())
}

fn status(arg: &str) -> ParseResult<u16> {
    arg.parse::<u16>()
        .ok()
        .filter(|code| (100..600).contains(code))
        .ok_or_else(|| ParseError::directive(format!("Invalid status code: {}", arg)))
}

/// `@session <field> [as <var>]`
fn session(arg: &str) -> ParseResult<Directive> {
    let mut words = arg.split_whitespace();
    match (words.next(), words.next(), words.next(), words.next()) {
        (Some(field), None, None, None) => Ok(Directive::Session {
            field: field.to_string(),
            var: None,
        }),
        (Some(field), Some("as"), Some(var), None) => Ok(Directive::Session {
            field: field.to_string(),
            var: Some(var.to_string()),
        }),
        _ => Err(ParseError::directive(
            "Expected @session <field> [as <var>]".to_string(),
        )),
    }
}

/// `@assert [<name>] <condition>`
fn check(arg: &str) -> ParseResult<Directive> {
    let Some(named) = arg.strip_prefix('[') else {
        return Ok(Directive::Check {
            name: None,
            condition: value("assert", arg)?,
        });
    };

    let (name, condition) = named
        .split_once(']')
        .ok_or_else(|| ParseError::directive(format!("Unclosed check name in: {}", arg)))?;
    let condition = condition.trim();
    if condition.is_empty() {
        return Err(ParseError::directive(format!(
            "Check '{}' has no condition",
            name.trim()
        )));
    }
    Ok(Directive::Check {
        name: Some(name.trim().to_string()),
        condition: condition.to_string(),
    })
}

/// 时长：`250ms`、`5s`、`2m`
pub fn parse_duration(s: &str) -> ParseResult<Duration> {
    let s = s.trim();
    let invalid = || ParseError::Duration(format!("Invalid duration: {}", s));

    let (digits, unit_ms) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1_000)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60_000)
    } else {
        return Err(ParseError::Duration(format!(
            "Duration must end with 'ms', 's' or 'm': {}",
            s
        )));
    };

    let amount: u64 = digits.trim().parse().map_err(|_| invalid())?;
    let millis = amount
        .checked_mul(unit_ms)
        .ok_or_else(|| ParseError::Duration(format!("Duration too large: {}", s)))?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Directive {
        Directive::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_name_and_skip() {
        assert_eq!(parse("@name Sign up"), Directive::Name("Sign up".to_string()));
        assert_eq!(parse("@skip"), Directive::Skip(true));
        assert_eq!(parse("@skip false"), Directive::Skip(false));
        assert!(Directive::parse("@name").is_err());
    }

    #[test]
    fn test_timeout_status_and_type() {
        assert_eq!(parse("@timeout 2s"), Directive::Timeout(Duration::from_secs(2)));
        assert_eq!(parse("@status 201"), Directive::Status(201));
        assert_eq!(parse("@type JSON"), Directive::Type(ResponseType::Json));
        assert!(Directive::parse("@status abc").is_err());
        assert!(Directive::parse("@status 700").is_err());
        assert!(Directive::parse("@type xml").is_err());
    }

    #[test]
    fn test_session_forms() {
        assert_eq!(
            parse("@session token"),
            Directive::Session {
                field: "token".to_string(),
                var: None
            }
        );
        assert_eq!(
            parse("@session data.sid as session"),
            Directive::Session {
                field: "data.sid".to_string(),
                var: Some("session".to_string())
            }
        );
        assert!(Directive::parse("@session data.sid into session").is_err());
        assert!(Directive::parse("@session").is_err());
    }

    #[test]
    fn test_check_with_and_without_name() {
        assert_eq!(
            parse("@assert [balance ok] body.balance > 100"),
            Directive::Check {
                name: Some("balance ok".to_string()),
                condition: "body.balance > 100".to_string()
            }
        );
        assert_eq!(
            parse("@assert status == 200"),
            Directive::Check {
                name: None,
                condition: "status == 200".to_string()
            }
        );
        assert!(Directive::parse("@assert [oops body.x == 1").is_err());
        assert!(Directive::parse("@assert [empty]").is_err());
        assert!(Directive::parse("@assert").is_err());
    }

    #[test]
    fn test_unknown_and_plain_lines() {
        assert_eq!(Directive::parse("@retry 3").unwrap(), None);
        assert_eq!(Directive::parse("GET http://x").unwrap(), None);
    }

    #[test]
    fn test_apply_builds_script() {
        let mut script = Script::new("POST", "http://localhost/login");
        for line in [
            "@name login",
            "@status 201",
            "@session data.token as session",
            "@store login_body",
            "@assert [has user] body.user exists",
            "@lenient",
        ] {
            parse(line).apply(&mut script).unwrap();
        }

        assert_eq!(script.label(), "login");
        assert_eq!(script.response.status, 201);
        assert_eq!(script.response.session.as_ref().unwrap().var, "session");
        assert_eq!(script.response.store.as_deref(), Some("login_body"));
        assert_eq!(script.response.checks[0].name(), "has user");
        assert!(script.request.lenient);
    }

    #[test]
    fn test_apply_rejects_bad_condition() {
        let mut script = Script::new("GET", "http://localhost/");
        let err = parse("@assert balance > 100").apply(&mut script).unwrap_err();
        assert!(matches!(err, ParseError::Check { ref condition, .. } if condition == "balance > 100"));
    }

    #[test]
    fn test_duration_units() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert!(parse_duration("5h").is_err());
        assert!(parse_duration("xs").is_err());
    }

    #[test]
    fn test_duration_overflow_is_an_error() {
        let err = parse_duration("18446744073709551615s").unwrap_err();
        assert!(err.to_string().contains("Duration too large"));
        assert!(parse_duration("307445734561825861m").is_err());
        assert_eq!(
            parse_duration("18446744073709551615ms").unwrap(),
            Duration::from_millis(u64::MAX)
        );
    }
}
