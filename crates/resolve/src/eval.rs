//! 受限的常量折叠求值器
//!
//! 不是通用求值：只支持字面量、四则运算/取余、字符串拼接、
//! 带插值的模板字符串、成员访问，以及一个安全全局白名单
//! （Math / Number / String / parseFloat / parseInt / JSON.stringify）。
//! 标识符和用户函数调用通过 `EvalScope` 回调解析，没有 I/O，
//! 也摸不到任何环境全局。任何解析不了的节点都让整个求值失败。

use ct_parse::scanner::skip_trivia;
use ct_parse::ParsedValue;

/// 求值作用域：标识符查找和用户函数调用由上层（解析器）提供
pub trait EvalScope {
    fn lookup(&mut self, path: &str) -> Option<ParsedValue>;
    fn call(&mut self, name: &str, args: Vec<ParsedValue>) -> Option<ParsedValue>;
}

/// 在给定作用域里求一个表达式的值；解析不了返回 None
pub fn eval_expression(text: &str, scope: &mut dyn EvalScope) -> Option<ParsedValue> {
    let mut eval = Eval { src: text, scope };
    let (value, next) = eval.additive(0)?;
    if skip_trivia(text, next) != text.len() {
        return None;
    }
    Some(value)
}

struct Eval<'a> {
    src: &'a str,
    scope: &'a mut dyn EvalScope,
}

impl Eval<'_> {
    /// `+` `-`
    fn additive(&mut self, at: usize) -> Option<(ParsedValue, usize)> {
        let (mut left, mut cursor) = self.multiplicative(at)?;
        loop {
            let op_at = skip_trivia(self.src, cursor);
            match self.src.as_bytes().get(op_at) {
                Some(b'+') => {
                    let (right, next) = self.multiplicative(op_at + 1)?;
                    left = add(left, right)?;
                    cursor = next;
                }
                Some(b'-') => {
                    let (right, next) = self.multiplicative(op_at + 1)?;
                    left = numeric(left, right, |a, b| a - b)?;
                    cursor = next;
                }
                _ => return Some((left, cursor)),
            }
        }
    }

    /// `*` `/` `%`
    fn multiplicative(&mut self, at: usize) -> Option<(ParsedValue, usize)> {
        let (mut left, mut cursor) = self.unary(at)?;
        loop {
            let op_at = skip_trivia(self.src, cursor);
            match self.src.as_bytes().get(op_at) {
                Some(b'*') => {
                    let (right, next) = self.unary(op_at + 1)?;
                    left = numeric(left, right, |a, b| a * b)?;
                    cursor = next;
                }
                Some(b'/') => {
                    let (right, next) = self.unary(op_at + 1)?;
                    left = numeric(left, right, |a, b| a / b)?;
                    cursor = next;
                }
                Some(b'%') => {
                    let (right, next) = self.unary(op_at + 1)?;
                    left = numeric(left, right, |a, b| a % b)?;
                    cursor = next;
                }
                _ => return Some((left, cursor)),
            }
        }
    }

    fn unary(&mut self, at: usize) -> Option<(ParsedValue, usize)> {
        let at = skip_trivia(self.src, at);
        if self.src.as_bytes().get(at) == Some(&b'-') {
            let (value, next) = self.unary(at + 1)?;
            let ParsedValue::Num(number) = value else {
                return None;
            };
            return Some((ParsedValue::Num(-number), next));
        }
        self.primary(at)
    }

    fn primary(&mut self, at: usize) -> Option<(ParsedValue, usize)> {
        let at = skip_trivia(self.src, at);
        let bytes = self.src.as_bytes();
        match bytes.get(at)? {
            b'(' => {
                let (value, next) = self.additive(at + 1)?;
                let close = skip_trivia(self.src, next);
                if bytes.get(close) != Some(&b')') {
                    return None;
                }
                Some((value, close + 1))
            }
            b'`' => self.template(at),
            b'"' | b'\'' | b'0'..=b'9' | b'.' => self.literal(at),
            byte if byte.is_ascii_alphabetic() || *byte == b'_' || *byte == b'$' => {
                self.path_or_call(at)
            }
            _ => None,
        }
    }

    /// 字面量直接复用解析器的纯函数产生式
    fn literal(&mut self, at: usize) -> Option<(ParsedValue, usize)> {
        ct_parse::Parser::new(&self.src[..]).value(at).ok()
    }

    /// 带插值的模板字符串：各段求值后拼接
    fn template(&mut self, at: usize) -> Option<(ParsedValue, usize)> {
        let bytes = self.src.as_bytes();
        let mut cursor = at + 1;
        let mut out = String::new();
        while cursor < bytes.len() {
            match bytes[cursor] {
                b'\\' => {
                    out.push(*bytes.get(cursor + 1)? as char);
                    cursor += 2;
                }
                b'$' if bytes.get(cursor + 1) == Some(&b'{') => {
                    let (value, next) = self.additive(cursor + 2)?;
                    let close = skip_trivia(self.src, next);
                    if bytes.get(close) != Some(&b'}') {
                        return None;
                    }
                    out.push_str(&to_js_string(&value)?);
                    cursor = close + 1;
                }
                b'`' => return Some((ParsedValue::Str(out), cursor + 1)),
                _ => {
                    let ch = self.src[cursor..].chars().next()?;
                    out.push(ch);
                    cursor += ch.len_utf8();
                }
            }
        }
        None
    }

    /// 点分路径，或路径后跟调用
    fn path_or_call(&mut self, at: usize) -> Option<(ParsedValue, usize)> {
        let bytes = self.src.as_bytes();
        let mut end = at;
        while end < bytes.len()
            && (bytes[end].is_ascii_alphanumeric()
                || bytes[end] == b'_'
                || bytes[end] == b'$'
                || bytes[end] == b'.')
        {
            end += 1;
        }
        let path = &self.src[at..end];
        let after = skip_trivia(self.src, end);

        if bytes.get(after) == Some(&b'(') {
            let (args, next) = self.arguments(after)?;
            let value = self
                .builtin_call(path, &args)
                .or_else(|| self.scope.call(path, args))?;
            return Some((value, next));
        }

        let value = builtin_constant(path).or_else(|| self.scope.lookup(path))?;
        Some((value, end))
    }

    fn arguments(&mut self, open: usize) -> Option<(Vec<ParsedValue>, usize)> {
        let bytes = self.src.as_bytes();
        let mut cursor = open + 1;
        let mut args = Vec::new();
        loop {
            cursor = skip_trivia(self.src, cursor);
            if bytes.get(cursor) == Some(&b')') {
                return Some((args, cursor + 1));
            }
            let (value, next) = self.additive(cursor)?;
            args.push(value);
            cursor = skip_trivia(self.src, next);
            match bytes.get(cursor) {
                Some(b',') => cursor += 1,
                Some(b')') => return Some((args, cursor + 1)),
                _ => return None,
            }
        }
    }

    /// 安全全局白名单里的函数
    fn builtin_call(&mut self, path: &str, args: &[ParsedValue]) -> Option<ParsedValue> {
        let num = |index: usize| -> Option<f64> {
            match args.get(index)? {
                ParsedValue::Num(number) => Some(*number),
                _ => None,
            }
        };
        match path {
            "Math.min" => {
                let mut best = f64::INFINITY;
                for index in 0..args.len() {
                    best = best.min(num(index)?);
                }
                Some(ParsedValue::Num(best))
            }
            "Math.max" => {
                let mut best = f64::NEG_INFINITY;
                for index in 0..args.len() {
                    best = best.max(num(index)?);
                }
                Some(ParsedValue::Num(best))
            }
            "Math.floor" => Some(ParsedValue::Num(num(0)?.floor())),
            "Math.ceil" => Some(ParsedValue::Num(num(0)?.ceil())),
            "Math.round" => Some(ParsedValue::Num(num(0)?.round())),
            "Math.abs" => Some(ParsedValue::Num(num(0)?.abs())),
            "Math.sqrt" => Some(ParsedValue::Num(num(0)?.sqrt())),
            "Math.pow" => Some(ParsedValue::Num(num(0)?.powf(num(1)?))),
            "Number" => match args.first()? {
                ParsedValue::Num(number) => Some(ParsedValue::Num(*number)),
                ParsedValue::Str(text) => text.trim().parse().ok().map(ParsedValue::Num),
                _ => None,
            },
            "String" => Some(ParsedValue::Str(to_js_string(args.first()?)?)),
            "parseFloat" => match args.first()? {
                ParsedValue::Str(text) => parse_leading_number(text).map(ParsedValue::Num),
                ParsedValue::Num(number) => Some(ParsedValue::Num(*number)),
                _ => None,
            },
            "parseInt" => match args.first()? {
                ParsedValue::Str(text) => {
                    parse_leading_number(text).map(|number| ParsedValue::Num(number.trunc()))
                }
                ParsedValue::Num(number) => Some(ParsedValue::Num(number.trunc())),
                _ => None,
            },
            "JSON.stringify" => Some(ParsedValue::Str(json_text(args.first()?))),
            _ => None,
        }
    }
}

fn builtin_constant(path: &str) -> Option<ParsedValue> {
    match path {
        "Math.PI" => Some(ParsedValue::Num(std::f64::consts::PI)),
        _ => None,
    }
}

/// JS 风格的 `+`：任一侧是字符串就拼接，否则数字相加
fn add(left: ParsedValue, right: ParsedValue) -> Option<ParsedValue> {
    match (&left, &right) {
        (ParsedValue::Num(a), ParsedValue::Num(b)) => Some(ParsedValue::Num(a + b)),
        _ => {
            let a = to_js_string(&left)?;
            let b = to_js_string(&right)?;
            Some(ParsedValue::Str(format!("{}{}", a, b)))
        }
    }
}

fn numeric(
    left: ParsedValue,
    right: ParsedValue,
    op: impl Fn(f64, f64) -> f64,
) -> Option<ParsedValue> {
    match (left, right) {
        (ParsedValue::Num(a), ParsedValue::Num(b)) => Some(ParsedValue::Num(op(a, b))),
        _ => None,
    }
}

/// JS 的数字转字符串：整数不带小数部分
pub fn to_js_string(value: &ParsedValue) -> Option<String> {
    match value {
        ParsedValue::Str(text) => Some(text.clone()),
        ParsedValue::Num(number) => Some(if number.fract() == 0.0 {
            format!("{}", *number as i64)
        } else {
            format!("{}", number)
        }),
        _ => None,
    }
}

/// `parseFloat` 语义：取前缀里能解析的数字
fn parse_leading_number(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-') | Some(b'+')) {
        end += 1;
    }
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    trimmed[..end].parse().ok()
}

fn json_text(value: &ParsedValue) -> String {
    match value {
        ParsedValue::Str(text) => format!("{:?}", text),
        ParsedValue::Num(number) => to_js_string(value).unwrap_or_else(|| number.to_string()),
        ParsedValue::Var { .. } => "null".to_string(),
        ParsedValue::Object(entries) => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(key, value)| format!("{:?}:{}", key, json_text(value)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        ParsedValue::Array(items) => {
            let parts: Vec<String> = items.iter().map(json_text).collect();
            format!("[{}]", parts.join(","))
        }
    }
}
