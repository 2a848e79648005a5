use crate::Result;
use crate::assertion::AssertionResult;
use crate::http::Response;
use crate::listener::ApiRunnerListener;
use crate::script::{Check, Script};
use crate::variable::VariableContext;

/// 组合监听器：按注册顺序把每个事件转发给所有子监听器
///
/// 失败类钩子遇到第一个 `Err` 就停止转发并向上返回。
/// 没有子监听器返回 `Err` 时结果就是 `Ok`：空的 MultiListener，
/// 或只含 LoggingListener 的 MultiListener，会容忍所有终止性失败。
/// 需要默认的致命处理时，再注册一个 ListenerBase。
/// `Clone` 是深拷贝，每个子监听器都会各自复制一份，
/// 因此可以安全地分发给多个并发运行器。
#[derive(Clone)]
pub struct MultiListener {
    name: String,
    listeners: Vec<Box<dyn ApiRunnerListener>>,
}

impl MultiListener {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listeners: Vec::new(),
        }
    }

    /// 注册子监听器，子监听器也可以是另一个 MultiListener
    pub fn add<L>(&mut self, listener: L) -> &mut Self
    where
        L: ApiRunnerListener + 'static,
    {
        self.add_boxed(Box::new(listener))
    }

    pub fn add_boxed(&mut self, listener: Box<dyn ApiRunnerListener>) -> &mut Self {
        self.listeners.push(listener);
        self
    }

    pub fn with<L>(mut self, listener: L) -> Self
    where
        L: ApiRunnerListener + 'static,
    {
        self.add(listener);
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// 子监听器名称，按注册顺序
    pub fn names(&self) -> Vec<&str> {
        self.listeners.iter().map(|l| l.name()).collect()
    }
}

impl Default for MultiListener {
    fn default() -> Self {
        Self::new("multi")
    }
}

impl std::fmt::Debug for MultiListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiListener")
            .field("name", &self.name)
            .field("listeners", &self.names())
            .finish()
    }
}

impl ApiRunnerListener for MultiListener {
    fn name(&self) -> &str {
        &self.name
    }

    fn before_script(&mut self, script: &Script, ctx: &mut VariableContext) -> Result<()> {
        for listener in &mut self.listeners {
            listener.before_script(script, ctx)?;
        }
        Ok(())
    }

    fn after_script(&mut self, script: &Script, ctx: &mut VariableContext) -> Result<()> {
        for listener in &mut self.listeners {
            listener.after_script(script, ctx)?;
        }
        Ok(())
    }

    fn before_call(&mut self, script: &Script, ctx: &VariableContext) {
        for listener in &mut self.listeners {
            listener.before_call(script, ctx);
        }
    }

    fn after_call(&mut self, script: &Script, ctx: &VariableContext, response: Option<&Response>) {
        for listener in &mut self.listeners {
            listener.after_call(script, ctx, response);
        }
    }

    fn status_check_failed(
        &mut self,
        script: &Script,
        response: &Response,
        ctx: &VariableContext,
    ) -> Result<()> {
        for listener in &mut self.listeners {
            listener.status_check_failed(script, response, ctx)?;
        }
        Ok(())
    }

    fn session_id_not_found(
        &mut self,
        script: &Script,
        response: &Response,
        ctx: &VariableContext,
    ) -> Result<()> {
        for listener in &mut self.listeners {
            listener.session_id_not_found(script, response, ctx)?;
        }
        Ok(())
    }

    fn condition_check_failed(
        &mut self,
        script: &Script,
        response: &Response,
        check: &Check,
        result: &AssertionResult,
        ctx: &VariableContext,
    ) -> Result<()> {
        for listener in &mut self.listeners {
            listener.condition_check_failed(script, response, check, result, ctx)?;
        }
        Ok(())
    }

    fn unexpected_response(
        &mut self,
        script: &Script,
        response: Option<&Response>,
        reason: &str,
        ctx: &VariableContext,
    ) -> Result<()> {
        for listener in &mut self.listeners {
            listener.unexpected_response(script, response, reason, ctx)?;
        }
        Ok(())
    }

    fn template_failed(
        &mut self,
        script: &Script,
        missing: &[String],
        ctx: &VariableContext,
    ) -> Result<()> {
        for listener in &mut self.listeners {
            listener.template_failed(script, missing, ctx)?;
        }
        Ok(())
    }

    fn script_completed(&mut self, script: &Script, response: &Response, ctx: &VariableContext) {
        for listener in &mut self.listeners {
            listener.script_completed(script, response, ctx);
        }
    }

    fn script_timed_out(&mut self, script: &Script, ctx: &VariableContext) -> Result<()> {
        for listener in &mut self.listeners {
            listener.script_timed_out(script, ctx)?;
        }
        Ok(())
    }

    /// 每个子监听器都会被询问，任意一个返回 true 即跳过
    fn skip_check(&mut self, script: &Script, check: &Check) -> bool {
        self.listeners
            .iter_mut()
            .fold(false, |skip, listener| listener.skip_check(script, check) || skip)
    }
}
