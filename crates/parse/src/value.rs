use indexmap::IndexMap;

/// 解析出的字面值
///
/// 比 `ct_core::StyleValue` 宽一层：对象/数组还没有按配置结构归类，
/// 静态解析器也用它作为求值结果类型。
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Str(String),
    Num(f64),
    /// `cv("--name", fallback?)` 产生的变量引用
    Var {
        name: String,
        fallback: Option<Box<ParsedValue>>,
    },
    Object(IndexMap<String, ParsedValue>),
    Array(Vec<ParsedValue>),
}

impl ParsedValue {
    pub fn str(value: impl Into<String>) -> Self {
        ParsedValue::Str(value.into())
    }

    pub fn num(value: f64) -> Self {
        ParsedValue::Num(value)
    }
}

/// 非字面子表达式的回退钩子
///
/// 解析器遇到文法之外的表达式（标识符、成员访问、函数调用、运算……）时，
/// 把整个平衡的表达式文本交给回调；返回 None 则整个配置解析失败
/// （调用点原样保留，绝不中断构建）。
pub trait ExpressionResolver {
    fn resolve_expression(&mut self, expression: &str) -> Option<ParsedValue>;
}

/// 永远解析失败的占位实现：纯字面解析就是用它
pub struct NoResolver;

impl ExpressionResolver for NoResolver {
    fn resolve_expression(&mut self, _expression: &str) -> Option<ParsedValue> {
        None
    }
}
