use std::cmp::Ordering;
use std::fmt;

/// 检查条件的解析或求值错误
#[derive(Debug, thiserror::Error)]
pub enum AssertError {
    #[error("Invalid assertion syntax: {0}")]
    InvalidSyntax(String),

    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: CompareOp,
        left: &'static str,
        right: &'static str,
    },

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Value extraction failed: {0}")]
    ExtractionError(String),
}

/// 解析后的检查条件
#[derive(Debug, Clone, PartialEq)]
pub enum AssertExpr {
    /// `<path> <op> <value>`
    Compare {
        left: ValuePath,
        op: CompareOp,
        right: AssertValue,
    },
    /// `<path> exists`
    Exists { path: ValuePath },
}

/// 条件左侧：从实际响应或上下文中取值的位置
#[derive(Debug, Clone, PartialEq)]
pub enum ValuePath {
    Status,
    Header(String),
    /// JSON body 中以点号分隔的路径
    Body(Vec<String>),
    /// 响应耗时，毫秒
    ResponseTime,
    /// 上下文变量；其余路径段把变量值当作 JSON 继续导航
    Context { name: String, segments: Vec<String> },
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (root, segments) = match self {
            ValuePath::Status => return f.write_str("status"),
            ValuePath::ResponseTime => return f.write_str("response.time"),
            ValuePath::Header(name) => return write!(f, "headers.{}", name),
            ValuePath::Body(segments) => ("body", segments.as_slice()),
            ValuePath::Context { name, segments } => {
                write!(f, "ctx.{}", name)?;
                return segments.iter().try_for_each(|s| write!(f, ".{}", s));
            }
        };
        write!(f, "{}.{}", root, segments.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
}

impl CompareOp {
    const SYMBOLS: [(CompareOp, &'static str); 7] = [
        (CompareOp::Equal, "=="),
        (CompareOp::NotEqual, "!="),
        (CompareOp::Greater, ">"),
        (CompareOp::Less, "<"),
        (CompareOp::GreaterOrEqual, ">="),
        (CompareOp::LessOrEqual, "<="),
        (CompareOp::Contains, "contains"),
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::SYMBOLS
            .iter()
            .find(|(_, symbol)| *symbol == s)
            .map(|(op, _)| *op)
    }

    pub fn as_str(&self) -> &'static str {
        Self::SYMBOLS
            .iter()
            .find(|(op, _)| op == self)
            .map(|(_, symbol)| *symbol)
            .unwrap_or("?")
    }

    /// 只比较相等性的运算符
    fn is_equality(self) -> bool {
        matches!(self, CompareOp::Equal | CompareOp::NotEqual)
    }

    /// 按排序结果判定；`contains` 不是排序运算
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Equal => ordering == Ordering::Equal,
            CompareOp::NotEqual => ordering != Ordering::Equal,
            CompareOp::Greater => ordering == Ordering::Greater,
            CompareOp::Less => ordering == Ordering::Less,
            CompareOp::GreaterOrEqual => ordering != Ordering::Less,
            CompareOp::LessOrEqual => ordering != Ordering::Greater,
            CompareOp::Contains => false,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 条件右侧的字面量，或求值时再从上下文读取的 `{{name}}`
#[derive(Debug, Clone, PartialEq)]
pub enum AssertValue {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Variable(String),
}

impl fmt::Display for AssertValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertValue::Number(n) => write!(f, "{}", n),
            AssertValue::String(s) => write!(f, "\"{}\"", s),
            AssertValue::Bool(b) => write!(f, "{}", b),
            AssertValue::Null => f.write_str("null"),
            AssertValue::Variable(name) => write!(f, "{{{{{}}}}}", name),
        }
    }
}

impl AssertValue {
    /// 上下文里的值都是字符串，按字面量还原类型
    pub fn from_context_str(raw: &str) -> Self {
        match raw {
            "true" => AssertValue::Bool(true),
            "false" => AssertValue::Bool(false),
            "null" => AssertValue::Null,
            _ => raw
                .parse::<f64>()
                .map(AssertValue::Number)
                .unwrap_or_else(|_| AssertValue::String(raw.to_string())),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AssertValue::Number(_) => "number",
            AssertValue::String(_) => "string",
            AssertValue::Bool(_) => "bool",
            AssertValue::Null => "null",
            AssertValue::Variable(_) => "variable",
        }
    }

    /// `self <op> other`
    ///
    /// 数字支持全部排序运算，字符串支持相等和 `contains`，
    /// 布尔和 null 只支持相等；null 与任何非 null 值都不相等。
    pub fn compare(&self, op: CompareOp, other: &AssertValue) -> Result<bool, AssertError> {
        use AssertValue::*;

        let mismatch = || AssertError::TypeMismatch {
            op,
            left: self.kind(),
            right: other.kind(),
        };

        match (self, other) {
            (Variable(name), _) | (_, Variable(name)) => Err(AssertError::InvalidValue(format!(
                "Unresolved variable {{{{{}}}}}",
                name
            ))),
            (String(a), String(b)) if op == CompareOp::Contains => Ok(a.contains(b.as_str())),
            _ if op == CompareOp::Contains => Err(mismatch()),
            (Number(a), Number(b)) => {
                let ordering = if (a - b).abs() < f64::EPSILON {
                    Ordering::Equal
                } else {
                    a.partial_cmp(b).ok_or_else(mismatch)?
                };
                Ok(op.holds(ordering))
            }
            _ if !op.is_equality() => Err(mismatch()),
            (String(a), String(b)) => Ok(op.holds(a.cmp(b))),
            (Bool(a), Bool(b)) => Ok(op.holds(a.cmp(b))),
            (Null, Null) => Ok(op.holds(Ordering::Equal)),
            (Null, _) | (_, Null) => Ok(op.holds(Ordering::Less)),
            _ => Err(mismatch()),
        }
    }
}

/// 一次检查的求值结果
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// 条件文本
    pub raw: String,
    pub passed: bool,
    /// 取到的实际值；取值失败时为 None
    pub actual: Option<String>,
    /// 期望描述，例如 `>= 100`
    pub expected: String,
    pub message: Option<String>,
}

impl AssertionResult {
    pub fn pass(raw: String, actual: String, expected: String) -> Self {
        Self {
            raw,
            passed: true,
            actual: Some(actual),
            expected,
            message: None,
        }
    }

    pub fn fail(raw: String, actual: String, expected: String, message: String) -> Self {
        Self {
            passed: false,
            message: Some(message),
            ..Self::pass(raw, actual, expected)
        }
    }

    /// 取值或比较本身出错，算作未通过
    pub fn error(raw: String, error: AssertError) -> Self {
        Self {
            raw,
            passed: false,
            actual: None,
            expected: String::new(),
            message: Some(error.to_string()),
        }
    }
}
