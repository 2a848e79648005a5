use std::fmt;

use crate::assertion::{
    AssertError, AssertExpr, AssertionResult, evaluate_assertion, format_assertion,
    parse_assertion,
};
use crate::http::Response;
use crate::variable::VariableContext;

/// 命名的检查条件，针对（实际响应，上下文）求值
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    name: String,
    condition: AssertExpr,
}

impl Check {
    /// 解析条件并以条件文本作为名称
    pub fn parse(condition: &str) -> Result<Self, AssertError> {
        let condition = parse_assertion(condition)?;
        Ok(Self {
            name: format_assertion(&condition),
            condition,
        })
    }

    /// 解析条件并指定名称
    pub fn named(name: impl Into<String>, condition: &str) -> Result<Self, AssertError> {
        Ok(Self {
            name: name.into(),
            condition: parse_assertion(condition)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn condition(&self) -> &AssertExpr {
        &self.condition
    }

    pub fn evaluate(&self, response: &Response, context: &VariableContext) -> AssertionResult {
        evaluate_assertion(&self.condition, response, context)
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let condition = format_assertion(&self.condition);
        if condition == self.name {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, condition)
        }
    }
}
