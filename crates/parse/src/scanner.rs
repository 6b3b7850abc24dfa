use indexmap::IndexMap;

use crate::value::{ExpressionResolver, ParsedValue};

/// 解析错误
///
/// 对外永远不抛出：任何错误都让 `parse_configuration` 返回 None，
/// 让调用方把该调用点当作不可识别而跳过。
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedEnd,
    UnexpectedChar { at: usize },
    UnsupportedSyntax { at: usize },
    Unresolvable { at: usize },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnexpectedEnd => write!(f, "Unexpected end of input"),
            ParseError::UnexpectedChar { at } => write!(f, "Unexpected character at {}", at),
            ParseError::UnsupportedSyntax { at } => write!(f, "Unsupported syntax at {}", at),
            ParseError::Unresolvable { at } => {
                write!(f, "Unresolvable expression at {}", at)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// `(值, 下一个下标)`：每个文法产生式都是输入串+下标上的纯函数
pub type PResult<T> = Result<(T, usize), ParseError>;

/// 跳过空白和注释（`//`、`/* */`）
pub fn skip_trivia(src: &str, mut at: usize) -> usize {
    let bytes = src.as_bytes();
    while at < bytes.len() {
        match bytes[at] {
            b' ' | b'\t' | b'\r' | b'\n' => at += 1,
            b'/' if bytes.get(at + 1) == Some(&b'/') => {
                while at < bytes.len() && bytes[at] != b'\n' {
                    at += 1;
                }
            }
            b'/' if bytes.get(at + 1) == Some(&b'*') => {
                at += 2;
                while at + 1 < bytes.len() && !(bytes[at] == b'*' && bytes[at + 1] == b'/') {
                    at += 1;
                }
                at = (at + 2).min(bytes.len());
            }
            _ => break,
        }
    }
    at
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$'
}

fn is_ident_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

/// 样式字面量解析器
///
/// 支持的文法（受限的 JS 对象字面量子集）：
/// - 对象：未加引号的标识符键或单/双引号字符串键，允许尾随逗号
/// - 字符串、数字（负数/小数）、不含插值的模板字符串
/// - 数组（值列表或声明合并列表）
/// - 单层白名单调用 `cv("--name", fallback?)`
/// - 任意深度嵌套；`//`、`/* */` 注释视作空白
///
/// 文法之外的构造交给 resolver 回退；没有 resolver 就地失败。
pub struct Parser<'a> {
    src: &'a str,
    resolver: Option<&'a mut dyn ExpressionResolver>,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            resolver: None,
        }
    }

    pub fn with_resolver(src: &'a str, resolver: &'a mut dyn ExpressionResolver) -> Self {
        Self {
            src,
            resolver: Some(resolver),
        }
    }

    /// 解析一个值，返回 `(值, 下一个下标)`
    pub fn value(&mut self, at: usize) -> PResult<ParsedValue> {
        let at = skip_trivia(self.src, at);
        let bytes = self.src.as_bytes();
        let Some(&byte) = bytes.get(at) else {
            return Err(ParseError::UnexpectedEnd);
        };
        match byte {
            b'{' => self.object(at),
            b'[' => self.array(at),
            b'"' | b'\'' => self.string(at),
            b'`' => self.template(at),
            b'0'..=b'9' | b'.' => self.number(at),
            b'-' if matches!(bytes.get(at + 1), Some(b'0'..=b'9') | Some(b'.')) => {
                self.number(at)
            }
            _ if is_ident_start(byte) => self.ident_or_call(at),
            _ => Err(ParseError::UnexpectedChar { at }),
        }
    }

    /// 对象字面量
    pub fn object(&mut self, at: usize) -> PResult<ParsedValue> {
        let mut cursor = at + 1; // '{' 之后
        let mut entries = IndexMap::new();
        loop {
            cursor = skip_trivia(self.src, cursor);
            match self.src.as_bytes().get(cursor) {
                Some(b'}') => return Ok((ParsedValue::Object(entries), cursor + 1)),
                Some(_) => {}
                None => return Err(ParseError::UnexpectedEnd),
            }

            let (key, after_key) = self.object_key(cursor)?;
            cursor = skip_trivia(self.src, after_key);
            if self.src.as_bytes().get(cursor) != Some(&b':') {
                return Err(ParseError::UnexpectedChar { at: cursor });
            }
            let (value, after_value) = self.value(cursor + 1)?;
            entries.insert(key, value);

            cursor = skip_trivia(self.src, after_value);
            match self.src.as_bytes().get(cursor) {
                Some(b',') => cursor += 1,
                Some(b'}') => return Ok((ParsedValue::Object(entries), cursor + 1)),
                Some(_) => return Err(ParseError::UnexpectedChar { at: cursor }),
                None => return Err(ParseError::UnexpectedEnd),
            }
        }
    }

    fn object_key(&mut self, at: usize) -> PResult<String> {
        let bytes = self.src.as_bytes();
        match bytes[at] {
            b'"' | b'\'' => {
                let (value, next) = self.string(at)?;
                match value {
                    ParsedValue::Str(key) => Ok((key, next)),
                    _ => Err(ParseError::UnexpectedChar { at }),
                }
            }
            byte if is_ident_start(byte) => {
                let mut end = at;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                Ok((self.src[at..end].to_string(), end))
            }
            _ => Err(ParseError::UnexpectedChar { at }),
        }
    }

    fn array(&mut self, at: usize) -> PResult<ParsedValue> {
        let mut cursor = at + 1; // '[' 之后
        let mut items = Vec::new();
        loop {
            cursor = skip_trivia(self.src, cursor);
            match self.src.as_bytes().get(cursor) {
                Some(b']') => return Ok((ParsedValue::Array(items), cursor + 1)),
                Some(_) => {}
                None => return Err(ParseError::UnexpectedEnd),
            }

            let (value, after_value) = self.value(cursor)?;
            items.push(value);

            cursor = skip_trivia(self.src, after_value);
            match self.src.as_bytes().get(cursor) {
                Some(b',') => cursor += 1,
                Some(b']') => return Ok((ParsedValue::Array(items), cursor + 1)),
                Some(_) => return Err(ParseError::UnexpectedChar { at: cursor }),
                None => return Err(ParseError::UnexpectedEnd),
            }
        }
    }

    /// 单/双引号字符串，处理转义
    fn string(&mut self, at: usize) -> PResult<ParsedValue> {
        let bytes = self.src.as_bytes();
        let quote = bytes[at];
        let mut cursor = at + 1;
        let mut out = String::new();
        while cursor < bytes.len() {
            match bytes[cursor] {
                b'\\' => {
                    let Some(&escaped) = bytes.get(cursor + 1) else {
                        return Err(ParseError::UnexpectedEnd);
                    };
                    match escaped {
                        b'n' => out.push('\n'),
                        b't' => out.push('\t'),
                        b'r' => out.push('\r'),
                        _ => out.push(escaped as char),
                    }
                    cursor += 2;
                }
                byte if byte == quote => return Ok((ParsedValue::Str(out), cursor + 1)),
                _ => {
                    // 按字符推进，保留多字节内容
                    let ch = self.src[cursor..].chars().next().unwrap_or('\u{fffd}');
                    out.push(ch);
                    cursor += ch.len_utf8();
                }
            }
        }
        Err(ParseError::UnexpectedEnd)
    }

    /// 模板字符串：只接受不含 `${}` 插值的形式
    fn template(&mut self, at: usize) -> PResult<ParsedValue> {
        let bytes = self.src.as_bytes();
        let mut cursor = at + 1;
        let mut out = String::new();
        while cursor < bytes.len() {
            match bytes[cursor] {
                b'\\' => {
                    let Some(&escaped) = bytes.get(cursor + 1) else {
                        return Err(ParseError::UnexpectedEnd);
                    };
                    out.push(escaped as char);
                    cursor += 2;
                }
                b'$' if bytes.get(cursor + 1) == Some(&b'{') => {
                    return Err(ParseError::UnsupportedSyntax { at: cursor });
                }
                b'`' => return Ok((ParsedValue::Str(out), cursor + 1)),
                _ => {
                    let ch = self.src[cursor..].chars().next().unwrap_or('\u{fffd}');
                    out.push(ch);
                    cursor += ch.len_utf8();
                }
            }
        }
        Err(ParseError::UnexpectedEnd)
    }

    fn number(&mut self, at: usize) -> PResult<ParsedValue> {
        let bytes = self.src.as_bytes();
        let mut cursor = at;
        if bytes.get(cursor) == Some(&b'-') {
            cursor += 1;
        }
        let digits_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if bytes.get(cursor) == Some(&b'.') {
            cursor += 1;
            while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
                cursor += 1;
            }
        }
        if cursor == digits_start {
            return Err(ParseError::UnexpectedChar { at });
        }
        let number: f64 = self.src[at..cursor]
            .parse()
            .map_err(|_| ParseError::UnexpectedChar { at })?;
        Ok((ParsedValue::Num(number), cursor))
    }

    /// 标识符开头的表达式：`cv(...)` 白名单调用直接解析，
    /// 其余整段交给 resolver 回退
    fn ident_or_call(&mut self, at: usize) -> PResult<ParsedValue> {
        let bytes = self.src.as_bytes();
        let mut end = at;
        while end < bytes.len() && is_ident_char(bytes[end]) {
            end += 1;
        }
        let ident = &self.src[at..end];
        let after = skip_trivia(self.src, end);
        if ident == "cv" && bytes.get(after) == Some(&b'(') {
            return self.cv_call(after);
        }
        self.expression_fallback(at)
    }

    /// `cv("--name")` / `cv("--name", fallback)`
    fn cv_call(&mut self, open: usize) -> PResult<ParsedValue> {
        let (name_value, after_name) = self.value(open + 1)?;
        let ParsedValue::Str(name) = name_value else {
            return Err(ParseError::UnsupportedSyntax { at: open });
        };

        let mut cursor = skip_trivia(self.src, after_name);
        let mut fallback = None;
        if self.src.as_bytes().get(cursor) == Some(&b',') {
            let (fallback_value, after_fallback) = self.value(cursor + 1)?;
            match fallback_value {
                ParsedValue::Str(_) | ParsedValue::Num(_) => {
                    fallback = Some(Box::new(fallback_value));
                }
                // 回退值只允许原始值
                _ => return Err(ParseError::UnsupportedSyntax { at: cursor }),
            }
            cursor = skip_trivia(self.src, after_fallback);
        }
        if self.src.as_bytes().get(cursor) != Some(&b')') {
            return Err(ParseError::UnexpectedChar { at: cursor });
        }
        Ok((ParsedValue::Var { name, fallback }, cursor + 1))
    }

    /// 把平衡的表达式文本整段交给 resolver
    fn expression_fallback(&mut self, at: usize) -> PResult<ParsedValue> {
        let end = expression_end(self.src, at);
        let expression = self.src[at..end].trim();
        if expression.is_empty() {
            return Err(ParseError::UnexpectedChar { at });
        }
        match self.resolver.as_deref_mut() {
            Some(resolver) => match resolver.resolve_expression(expression) {
                Some(value) => Ok((value, end)),
                None => Err(ParseError::Unresolvable { at }),
            },
            None => Err(ParseError::UnsupportedSyntax { at }),
        }
    }
}

/// 扫描到表达式结束：深度为 0 的 `,` `}` `]` `)`
///
/// 跳过字符串/模板字面量内容（包括转义引号和 `${}` 嵌套）
/// 和注释，花括号/引号出现在字符串值里不会让扫描错位。
pub fn expression_end(src: &str, at: usize) -> usize {
    let bytes = src.as_bytes();
    let mut cursor = at;
    let mut depth: i32 = 0;
    while cursor < bytes.len() {
        match bytes[cursor] {
            b'"' | b'\'' | b'`' => cursor = skip_string(src, cursor),
            b'/' if matches!(bytes.get(cursor + 1), Some(b'/') | Some(b'*')) => {
                cursor = skip_trivia(src, cursor);
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                cursor += 1;
            }
            b')' | b']' | b'}' => {
                if depth == 0 {
                    return cursor;
                }
                depth -= 1;
                cursor += 1;
            }
            b',' if depth == 0 => return cursor,
            _ => cursor += 1,
        }
    }
    cursor
}

/// 跳过一个完整的字符串/模板字面量，返回结束引号之后的下标
pub fn skip_string(src: &str, at: usize) -> usize {
    let bytes = src.as_bytes();
    let quote = bytes[at];
    let mut cursor = at + 1;
    while cursor < bytes.len() {
        match bytes[cursor] {
            b'\\' => cursor += 2,
            b'$' if quote == b'`' && bytes.get(cursor + 1) == Some(&b'{') => {
                // 模板插值里可以再嵌套字符串和花括号
                cursor += 2;
                let mut depth = 1;
                while cursor < bytes.len() && depth > 0 {
                    match bytes[cursor] {
                        b'"' | b'\'' | b'`' => cursor = skip_string(src, cursor),
                        b'{' => {
                            depth += 1;
                            cursor += 1;
                        }
                        b'}' => {
                            depth -= 1;
                            cursor += 1;
                        }
                        _ => cursor += 1,
                    }
                }
            }
            byte if byte == quote => return cursor + 1,
            _ => cursor += 1,
        }
    }
    // 残串（末尾转义可能越过结尾）
    cursor.min(bytes.len())
}
