/// 脚本文件的解析错误，行号从 1 开始
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Directive { line: usize, message: String },

    #[error("line {line}: invalid check '{condition}': {message}")]
    Check {
        line: usize,
        condition: String,
        message: String,
    },

    #[error("line {line}: {message}")]
    RequestLine { line: usize, message: String },

    #[error("line {line}: unknown HTTP method '{method}'")]
    Method { line: usize, method: String },

    #[error("line {line}: expected a 'Name: value' header, found '{text}'")]
    Header { line: usize, text: String },

    #[error("line {line}: directives are not followed by a request line")]
    Dangling { line: usize },

    /// 非法时长；出现在脚本文件里时转为带行号的 Directive
    #[error("{0}")]
    Duration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no scripts found")]
    NoScripts,
}

impl ParseError {
    /// 行号待定的指令错误
    pub(crate) fn directive(message: String) -> Self {
        ParseError::Directive { line: 0, message }
    }

    /// 为指令错误补上所在行
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            ParseError::Directive { message, .. } | ParseError::Duration(message) => {
                ParseError::Directive { line, message }
            }
            ParseError::Check {
                condition, message, ..
            } => ParseError::Check {
                line,
                condition,
                message,
            },
            other => other,
        }
    }

    /// 出错的行号
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Directive { line, .. }
            | ParseError::Check { line, .. }
            | ParseError::RequestLine { line, .. }
            | ParseError::Method { line, .. }
            | ParseError::Header { line, .. }
            | ParseError::Dangling { line } => Some(*line),
            ParseError::Duration(_) | ParseError::Io(_) | ParseError::NoScripts => None,
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_line_fills_directive_errors() {
        let err = ParseError::directive("bad".to_string()).at_line(12);
        assert_eq!(err.to_string(), "line 12: bad");
        assert_eq!(err.line(), Some(12));

        let err = ParseError::Dangling { line: 3 }.at_line(9);
        assert_eq!(err.line(), Some(3));
        assert_eq!(ParseError::NoScripts.line(), None);

        let err = ParseError::Duration("Invalid duration: soon".to_string());
        assert_eq!(err.to_string(), "Invalid duration: soon");
        assert_eq!(err.at_line(4).to_string(), "line 4: Invalid duration: soon");
    }
}
