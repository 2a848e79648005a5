use std::str::FromStr;

use crate::http::Method;
use crate::parser::directive::Directive;
use crate::parser::error::{ParseError, ParseResult};
use crate::script::{RequestTemplate, Script};

/// 脚本块内当前所在的部分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// 请求行之前：`@` 指令、注释、空行
    Directives,
    Headers,
    Body,
}

/// 逐行构建中的脚本
///
/// 指令直接写进 `Script`，请求行确定方法和 URL，之后是 headers，
/// 第一个空行之后全部是 body。
#[derive(Debug)]
pub(crate) struct ScriptDraft {
    script: Script,
    section: Section,
    /// 第一条指令所在行，用于报告没有请求行的块
    first_directive: Option<usize>,
    body: Vec<String>,
}

impl ScriptDraft {
    pub(crate) fn new() -> Self {
        Self {
            script: Script::from_template(RequestTemplate::default()),
            section: Section::Directives,
            first_directive: None,
            body: Vec::new(),
        }
    }

    pub(crate) fn feed(&mut self, line: usize, text: &str) -> ParseResult<()> {
        let trimmed = text.trim();
        match self.section {
            Section::Directives => {
                if trimmed.is_empty() || is_comment(trimmed) {
                    return Ok(());
                }
                if trimmed.starts_with('@') {
                    self.first_directive.get_or_insert(line);
                    if let Some(directive) = Directive::parse(trimmed).map_err(|e| e.at_line(line))? {
                        directive
                            .apply(&mut self.script)
                            .map_err(|e| e.at_line(line))?;
                    }
                    return Ok(());
                }
                self.request_line(line, trimmed)?;
                self.section = Section::Headers;
            }
            Section::Headers => {
                if trimmed.is_empty() {
                    self.section = Section::Body;
                } else if !is_comment(trimmed) {
                    let (key, value) = trimmed
                        .split_once(':')
                        .filter(|(key, _)| {
                            let key = key.trim();
                            !key.is_empty() && !key.contains(char::is_whitespace)
                        })
                        .ok_or_else(|| ParseError::Header {
                            line,
                            text: trimmed.to_string(),
                        })?;
                    self.script
                        .request
                        .headers
                        .push((key.trim().to_string(), value.trim().to_string()));
                }
            }
            Section::Body => self.body.push(text.to_string()),
        }
        Ok(())
    }

    /// `[METHOD] URL [HTTP/x]`
    fn request_line(&mut self, line: usize, text: &str) -> ParseResult<()> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let (method, url) = match words.as_slice() {
            [url] => (None, *url),
            [method, url] => (Some(*method), *url),
            [method, url, version] if version.starts_with("HTTP/") => (Some(*method), *url),
            _ => {
                return Err(ParseError::RequestLine {
                    line,
                    message: format!("expected '[METHOD] URL', found '{}'", text),
                });
            }
        };

        if let Some(method) = method {
            let method = Method::from_str(method).map_err(|_| ParseError::Method {
                line,
                method: method.to_string(),
            })?;
            self.script.request.method = Some(method.as_str().to_string());
        }
        self.script.request.url = url.to_string();
        Ok(())
    }

    /// 结束当前块；只有空行和注释的块返回 `None`
    pub(crate) fn finish(mut self) -> ParseResult<Option<Script>> {
        if self.section == Section::Directives {
            return match self.first_directive {
                Some(line) => Err(ParseError::Dangling { line }),
                None => Ok(None),
            };
        }

        let body = self.body.join("\n");
        let body = body.trim();
        if !body.is_empty() {
            self.script.request.body = Some(body.to_string());
        }
        Ok(Some(self.script))
    }
}

/// 按 `###` 分隔符把行切成脚本
///
/// 分隔符后面的文字作为下一个脚本的默认名称，`@name` 优先。
pub(crate) fn collect_scripts<'a>(
    lines: impl IntoIterator<Item = (usize, &'a str)>,
) -> ParseResult<Vec<Script>> {
    let mut scripts = Vec::new();
    let mut draft = ScriptDraft::new();
    let mut title: Option<String> = None;

    for (line, text) in lines {
        if let Some(rest) = text.trim().strip_prefix("###") {
            push(&mut scripts, draft.finish()?, title.take());
            draft = ScriptDraft::new();
            title = Some(rest.trim().to_string()).filter(|t| !t.is_empty());
            continue;
        }
        draft.feed(line, text)?;
    }
    push(&mut scripts, draft.finish()?, title);

    Ok(scripts)
}

fn push(scripts: &mut Vec<Script>, script: Option<Script>, title: Option<String>) {
    if let Some(mut script) = script {
        if script.name.is_none() {
            script.name = title;
        }
        scripts.push(script);
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("//")
}
