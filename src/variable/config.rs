use crate::parser::parse_duration;
use crate::runner::RunnerOptions;
use crate::variable::resolver::VariableResolver;
use crate::variable::types::{VariableConfig, VariableContext};
use crate::{ApiScriptError, Result};
use std::fs;
use std::path::Path;

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "apiscript.toml";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<VariableConfig> {
        let content = fs::read_to_string(path.as_ref())?;

        toml::from_str(&content).map_err(|e| {
            ApiScriptError::ParseError(format!(
                "Failed to parse config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// 查找并加载配置文件
    /// 查找顺序：
    /// 1. 当前目录及其父目录
    /// 2. 用户配置目录 ~/.config/apiscript/
    pub fn find_and_load() -> Option<VariableConfig> {
        Self::try_load_from_current_dir().or_else(Self::try_load_from_user_dir)
    }

    /// 尝试从当前目录及其父目录加载
    fn try_load_from_current_dir() -> Option<VariableConfig> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.exists() {
                return Self::load_or_warn(&config_path);
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// 尝试从用户配置目录加载
    fn try_load_from_user_dir() -> Option<VariableConfig> {
        let home = dirs::home_dir()?;
        let config_path = home
            .join(".config")
            .join("apiscript")
            .join(Self::CONFIG_FILE);

        if config_path.exists() {
            Self::load_or_warn(&config_path)
        } else {
            None
        }
    }

    fn load_or_warn(path: &Path) -> Option<VariableConfig> {
        match Self::load_from_path(path) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "Loaded config");
                Some(config)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                None
            }
        }
    }

    /// 构建变量上下文
    /// env_name: 环境名称（如 "dev", "prod"）
    /// cli_vars: CLI 传入的变量覆盖（--var key=value）
    pub fn build_context(
        config: &VariableConfig,
        env_name: Option<&str>,
        cli_vars: &[(String, String)],
    ) -> VariableContext {
        let mut context = VariableContext::new();

        if let Some(env) = env_name.and_then(|name| config.get_environment(name)) {
            // 排序后插入，保证上下文顺序稳定
            let mut keys: Vec<_> = env.variables.keys().collect();
            keys.sort();
            for key in keys {
                let resolved_value = VariableResolver::resolve_env_vars(&env.variables[key]);
                context.insert(key.clone(), resolved_value);
            }
        }

        // CLI 覆盖优先级最高
        for (key, value) in cli_vars {
            context.insert(key.clone(), value.clone());
        }

        context
    }

    /// 由 `[runner]` 表生成运行参数，未配置的项使用默认值
    pub fn runner_options(config: &VariableConfig) -> Result<RunnerOptions> {
        let mut options = RunnerOptions::default();
        let section = &config.runner;

        if let Some(backoff) = &section.backoff {
            options.backoff = parse_duration(backoff)?;
        }
        if let Some(call_timeout) = &section.call_timeout {
            options.call_timeout = parse_duration(call_timeout)?;
        }
        if let Some(default_timeout) = &section.default_timeout {
            options.default_timeout = parse_duration(default_timeout)?;
        }

        Ok(options)
    }

    /// 解析 CLI 变量参数 "key=value"
    pub fn parse_cli_var(s: &str) -> Option<(String, String)> {
        s.split_once('=')
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_path() {
        let config_content = r#"
[environments.dev]
base_url = "http://localhost:8080"
api_key = "dev-key"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = ConfigLoader::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.environments.len(), 1);
        assert!(config.get_environment("dev").is_some());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[environments.dev\nbroken").unwrap();
        temp_file.flush().unwrap();

        let err = ConfigLoader::load_from_path(temp_file.path()).unwrap_err();
        assert!(matches!(err, ApiScriptError::ParseError(_)));
    }

    #[test]
    fn test_build_context_cli_override() {
        let config_content = r#"
[environments.dev]
base_url = "http://localhost:8080"
token = "dev-token"
"#;

        let config: VariableConfig = toml::from_str(config_content).unwrap();

        let context = ConfigLoader::build_context(&config, Some("dev"), &[]);
        assert_eq!(context.get("base_url"), Some("http://localhost:8080"));
        assert_eq!(context.get("token"), Some("dev-token"));

        let cli_vars = vec![("token".to_string(), "custom-token".to_string())];
        let context = ConfigLoader::build_context(&config, Some("dev"), &cli_vars);
        assert_eq!(context.get("token"), Some("custom-token"));
    }

    #[test]
    fn test_runner_options_from_config() {
        let config: VariableConfig = toml::from_str(
            r#"
[runner]
backoff = "50ms"
default_timeout = "2s"
"#,
        )
        .unwrap();

        let options = ConfigLoader::runner_options(&config).unwrap();
        assert_eq!(options.backoff, Duration::from_millis(50));
        assert_eq!(options.default_timeout, Duration::from_secs(2));
        assert_eq!(options.call_timeout, RunnerOptions::default().call_timeout);
    }

    #[test]
    fn test_runner_options_rejects_bad_duration() {
        let config: VariableConfig = toml::from_str("[runner]\nbackoff = \"soon\"\n").unwrap();
        assert!(ConfigLoader::runner_options(&config).is_err());
    }

    #[test]
    fn test_parse_cli_var() {
        assert_eq!(
            ConfigLoader::parse_cli_var("url=https://example.com"),
            Some(("url".to_string(), "https://example.com".to_string()))
        );
        assert_eq!(ConfigLoader::parse_cli_var("invalid"), None);
    }
}
