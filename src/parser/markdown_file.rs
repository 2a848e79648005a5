use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

use crate::parser::draft::collect_scripts;
use crate::parser::error::{ParseError, ParseResult};
use crate::script::Script;

/// 能承载脚本的代码块语言
const SCRIPT_LANGS: [&str; 2] = ["http", "rest"];

/// 解析 Markdown 文档中的 ```http / ```rest 代码块
///
/// 每个代码块按 `.http` 语法解析，没有名称的脚本使用前面最近的标题。
/// 错误中的行号是文档中的行号。
pub fn parse_markdown(content: &str) -> ParseResult<Vec<Script>> {
    let mut scripts = Vec::new();
    let mut heading: Option<String> = None;
    let mut pending: Option<String> = None;
    let mut block: Option<FencedBlock> = None;

    for (event, range) in Parser::new(content).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { .. }) => pending = Some(String::new()),
            Event::End(TagEnd::Heading(_)) => {
                if let Some(text) = pending.take().filter(|t| !t.trim().is_empty()) {
                    heading = Some(text.trim().to_string());
                }
            }
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let lang = info.split_whitespace().next().unwrap_or("").to_lowercase();
                if SCRIPT_LANGS.contains(&lang.as_str()) {
                    block = Some(FencedBlock {
                        first_line: line_of(content, range.start) + 1,
                        text: String::new(),
                    });
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = block.take() {
                    for mut script in block.scripts()? {
                        if script.name.is_none() {
                            script.name = heading.clone();
                        }
                        scripts.push(script);
                    }
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(block) = block.as_mut() {
                    block.text.push_str(&text);
                } else if let Some(pending) = pending.as_mut() {
                    pending.push_str(&text);
                }
            }
            _ => {}
        }
    }

    if scripts.is_empty() {
        return Err(ParseError::NoScripts);
    }
    Ok(scripts)
}

/// 一个脚本代码块的内容及其第一行在文档中的行号
struct FencedBlock {
    first_line: usize,
    text: String,
}

impl FencedBlock {
    fn scripts(&self) -> ParseResult<Vec<Script>> {
        collect_scripts(
            self.text
                .lines()
                .enumerate()
                .map(|(i, line)| (self.first_line + i, line)),
        )
    }
}

/// 字节偏移所在的行号
fn line_of(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}
