use thiserror::Error;

use crate::listener::Hook;

#[derive(Error, Debug)]
pub enum ApiScriptError {
    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("无效的 URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP 请求失败: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("网络错误: {0}")]
    NetworkError(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL 解析错误: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// 请求模板中引用了未设置的变量
    #[error("模板错误: script {script} references unset variables: {}", .missing.join(", "))]
    Template { script: String, missing: Vec<String> },

    /// beforeScript / afterScript 钩子失败，无条件终止
    #[error("{hook}({script}) failed: {message}")]
    Bracket {
        hook: Hook,
        script: String,
        message: String,
    },

    /// 监听器判定的致命错误，终止整个运行
    #[error("{hook}({listener}): {message}")]
    Aborted {
        hook: Hook,
        listener: String,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

impl ApiScriptError {
    /// 构造致命终止错误
    pub fn aborted(hook: Hook, listener: impl Into<String>, message: impl Into<String>) -> Self {
        ApiScriptError::Aborted {
            hook,
            listener: listener.into(),
            message: message.into(),
        }
    }

    /// 是否为终止整个运行的错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ApiScriptError::Aborted { .. } | ApiScriptError::Bracket { .. }
        )
    }

    /// 触发终止的钩子（如果有）
    pub fn hook(&self) -> Option<Hook> {
        match self {
            ApiScriptError::Aborted { hook, .. } | ApiScriptError::Bracket { hook, .. } => {
                Some(*hook)
            }
            ApiScriptError::Template { .. } => Some(Hook::TemplateFailed),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for ApiScriptError {
    fn from(err: anyhow::Error) -> Self {
        ApiScriptError::Other(err.to_string())
    }
}

impl From<crate::parser::ParseError> for ApiScriptError {
    fn from(err: crate::parser::ParseError) -> Self {
        ApiScriptError::ParseError(err.to_string())
    }
}

impl From<crate::assertion::AssertError> for ApiScriptError {
    fn from(err: crate::assertion::AssertError) -> Self {
        ApiScriptError::ParseError(err.to_string())
    }
}

/// Result type for apiscript crate
pub type Result<T> = std::result::Result<T, ApiScriptError>;
