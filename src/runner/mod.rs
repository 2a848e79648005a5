pub mod cancel;
pub mod driver;
pub mod executor;
pub mod reporter;
pub mod types;

pub use cancel::{CancelHandle, CancelToken};
pub use driver::{MultiDriver, RUNNER_INDEX_VAR};
pub use executor::ApiRunner;
pub use reporter::ConsoleReporter;
pub use types::{RunReport, RunSummary, RunnerOptions, ScriptOutcome, ScriptStatus};
