use crate::parser::draft::collect_scripts;
use crate::parser::error::{ParseError, ParseResult};
use crate::script::Script;

/// 解析 `.http` 脚本文件，脚本之间以 `###` 分隔
pub fn parse_http(content: &str) -> ParseResult<Vec<Script>> {
    let scripts = collect_scripts(content.lines().enumerate().map(|(i, line)| (i + 1, line)))?;
    if scripts.is_empty() {
        return Err(ParseError::NoScripts);
    }
    Ok(scripts)
}
