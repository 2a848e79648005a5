pub mod check;
pub mod template;
pub mod types;

pub use check::Check;
pub use template::RequestTemplate;
pub use types::{ResponseExpectation, ResponseType, Script, SessionRule};
