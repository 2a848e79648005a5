/// 断言模块 - 检查条件的解析与求值
mod evaluator;
mod extractor;
mod parser;
mod types;

pub use evaluator::{evaluate_assertion, format_assertion};
pub use extractor::{extract_value, navigate};
pub use parser::parse_assertion;
pub use types::{AssertError, AssertExpr, AssertValue, AssertionResult, CompareOp, ValuePath};
