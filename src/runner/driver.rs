use std::sync::Arc;

use tracing::info;

use crate::http::Transport;
use crate::listener::{ApiRunnerListener, MultiListener};
use crate::runner::cancel::CancelToken;
use crate::runner::executor::ApiRunner;
use crate::runner::types::{RunReport, RunnerOptions};
use crate::script::Script;
use crate::variable::VariableContext;
use crate::{ApiScriptError, Result};

/// 上下文中记录运行器序号的变量名
pub const RUNNER_INDEX_VAR: &str = "runner_index";

/// 并发驱动多个相互独立的运行器
///
/// 每个运行器拿到监听器树的深拷贝和上下文的副本，彼此不共享可变状态；
/// 只有传输层和取消信号是共享的。
pub struct MultiDriver {
    transport: Arc<dyn Transport>,
    listener: MultiListener,
    context: VariableContext,
    options: RunnerOptions,
    cancel: CancelToken,
}

impl MultiDriver {
    pub fn new(transport: Arc<dyn Transport>, listener: MultiListener) -> Self {
        Self {
            transport,
            listener,
            context: VariableContext::new(),
            options: RunnerOptions::default(),
            cancel: CancelToken::never(),
        }
    }

    pub fn with_context(mut self, context: VariableContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 启动 `runners` 个运行器执行同一组脚本，按序号返回各自的结果
    ///
    /// 一个运行器的致命错误不影响其他运行器。
    pub async fn run(&self, scripts: &[Script], runners: usize) -> Vec<Result<RunReport>> {
        info!(runners, scripts = scripts.len(), "Starting concurrent runners");

        let mut tasks = Vec::with_capacity(runners);
        for index in 0..runners {
            let mut context = self.context.clone();
            context.set(RUNNER_INDEX_VAR, index.to_string());

            let mut listener = self.listener.clone();
            listener.set_name(format!("{}#{}", self.listener.name(), index));

            let mut runner = ApiRunner::new(Arc::clone(&self.transport))
                .with_listener(listener)
                .with_context(context)
                .with_options(self.options)
                .with_cancel(self.cancel.clone());
            let scripts = scripts.to_vec();

            tasks.push(tokio::spawn(async move { runner.run(&scripts).await }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (index, task) in tasks.into_iter().enumerate() {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => Err(ApiScriptError::Other(format!(
                    "runner {} did not finish: {}",
                    index, e
                ))),
            };
            results.push(result);
        }
        results
    }
}
