pub mod assertion;
pub mod error;
pub mod http;
pub mod listener;
pub mod logger;
pub mod parser;
pub mod runner;
pub mod script;
pub mod utils;
pub mod variable;

// Re-export commonly used types
pub use error::{ApiScriptError, Result};
pub use listener::{ApiRunnerListener, Hook, ListenerBase, LoggingListener, MultiListener};
pub use runner::{ApiRunner, MultiDriver, RunReport, RunnerOptions};
pub use script::{Check, Script};
pub use variable::VariableContext;
