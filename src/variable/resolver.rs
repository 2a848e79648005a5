use crate::variable::types::VariableContext;
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// 变量替换器
pub struct VariableResolver;

fn var_regex() -> &'static Regex {
    static VAR_REGEX: OnceLock<Regex> = OnceLock::new();
    VAR_REGEX.get_or_init(|| {
        Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}").expect("valid placeholder regex")
    })
}

impl VariableResolver {
    /// 替换文本中的所有 {{variable}} 占位符，未设置的变量保持原样
    pub fn substitute(text: &str, context: &VariableContext) -> String {
        var_regex()
            .replace_all(text, |caps: &Captures| {
                let var_name = &caps[1];
                context.get(var_name).unwrap_or(&caps[0]).to_string()
            })
            .to_string()
    }

    /// 严格替换：任何未设置的变量都会导致失败，返回缺失的变量名（去重、按出现顺序）
    pub fn substitute_strict(
        text: &str,
        context: &VariableContext,
    ) -> Result<String, Vec<String>> {
        let missing = Self::missing(text, context);
        if missing.is_empty() {
            Ok(Self::substitute(text, context))
        } else {
            Err(missing)
        }
    }

    /// 文本中引用但上下文中未设置的变量
    pub fn missing(text: &str, context: &VariableContext) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for name in Self::placeholders(text) {
            if !context.contains(name) && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }
        missing
    }

    /// 文本中出现的所有占位符名称
    pub fn placeholders(text: &str) -> impl Iterator<Item = &str> {
        var_regex()
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
    }

    /// 解析并替换系统环境变量 ${VAR}
    pub fn resolve_env_vars(text: &str) -> String {
        static ENV_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = ENV_REGEX
            .get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env regex"));

        re.replace_all(text, |caps: &Captures| {
            let env_name = &caps[1];
            std::env::var(env_name).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
    }
}
