mod directive;
mod draft;
mod error;
mod http_file;
mod markdown_file;

use std::path::Path;

use crate::script::Script;

pub use directive::{Directive, parse_duration};
pub use error::{ParseError, ParseResult};
pub use http_file::parse_http;
pub use markdown_file::parse_markdown;

/// 按扩展名加载脚本文件：`.md` / `.markdown` 按 Markdown 解析，其余按 `.http` 解析
pub fn load_scripts<P: AsRef<Path>>(path: P) -> ParseResult<Vec<Script>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let is_markdown = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "md" | "markdown"));

    let scripts = if is_markdown {
        parse_markdown(&content)?
    } else {
        parse_http(&content)?
    };

    tracing::debug!(
        path = %path.display(),
        scripts = scripts.len(),
        "Loaded script file"
    );
    Ok(scripts)
}
