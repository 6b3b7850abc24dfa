use ct_parse::scanner::{skip_string, skip_trivia};

/// 一段源码里的精确字符范围 [start, end)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// 构建器声明后的一条赋值：`x.base = {...}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderAssignment {
    /// base / global / variant / defaults
    pub section: String,
    /// 赋的值表达式
    pub value: Span,
}

/// 定位到的样式声明点
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationSite {
    /// 直接调用 `ct({...})`
    Call {
        /// 整个调用表达式
        span: Span,
        /// 各顶层实参；长度 >= 2 说明已经拼过编译产物
        arguments: Vec<Span>,
    },
    /// 命令式写法 `const x = new Ct(); x.base = {...}; ...`
    Builder {
        binding: String,
        /// `new Ct(...)` 表达式
        span: Span,
        /// 构造实参；非空说明已经编译过
        arguments: Vec<Span>,
        assignments: Vec<BuilderAssignment>,
    },
}

/// 扫描整份源码，找出所有可识别的样式声明点
///
/// 平衡括号扫描会跳过字符串/模板字面量内容（含转义引号和
/// `${}` 嵌套）和注释，字符串值里的花括号/圆括号不会让扫描错位。
/// 前面紧跟 `.` 或标识符字符的匹配被排除（`foo.ct(...)` 不算）。
pub fn locate_declaration_sites(
    source: &str,
    fn_name: &str,
    builder_name: &str,
) -> Vec<DeclarationSite> {
    let bytes = source.as_bytes();
    let mut sites = Vec::new();
    let mut builders: Vec<(String, Span, Vec<Span>)> = Vec::new();
    let mut cursor = 0;

    while cursor < bytes.len() {
        match bytes[cursor] {
            b'"' | b'\'' | b'`' => cursor = skip_string(source, cursor),
            b'/' if matches!(bytes.get(cursor + 1), Some(b'/') | Some(b'*')) => {
                cursor = skip_trivia(source, cursor);
            }
            byte if is_ident_start(byte) => {
                let start = cursor;
                let mut end = cursor;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                let ident = &source[start..end];
                cursor = end;

                if excluded_by_prefix(source, start) {
                    continue;
                }

                if ident == fn_name {
                    if let Some((arguments, after)) = scan_call_arguments(source, end) {
                        // 只认首个实参是对象字面量的调用
                        let object_first = arguments
                            .first()
                            .is_some_and(|arg| source[arg.start..arg.end].starts_with('{'));
                        if object_first {
                            sites.push(DeclarationSite::Call {
                                span: Span { start, end: after },
                                arguments,
                            });
                            cursor = after;
                        }
                    }
                } else if ident == "new" {
                    let name_at = skip_trivia(source, end);
                    if let Some((name, name_end)) = read_ident(source, name_at) {
                        if name == builder_name {
                            if let Some((arguments, after)) =
                                scan_call_arguments(source, name_end)
                            {
                                if let Some(binding) = binding_before(source, start) {
                                    builders.push((
                                        binding,
                                        Span { start, end: after },
                                        arguments,
                                    ));
                                    cursor = after;
                                }
                            }
                        }
                    }
                }
            }
            _ => cursor += 1,
        }
    }

    // 第二遍：收集每个构建器绑定后续的段赋值
    for (binding, span, arguments) in builders {
        let assignments = scan_assignments(source, span.end, &binding);
        sites.push(DeclarationSite::Builder {
            binding,
            span,
            arguments,
            assignments,
        });
    }

    sites.sort_by_key(|site| match site {
        DeclarationSite::Call { span, .. } | DeclarationSite::Builder { span, .. } => span.start,
    });
    sites
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$'
}

fn is_ident_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

/// 前缀排除：紧邻标识符字符，或（跳过空白后）成员访问点号
fn excluded_by_prefix(source: &str, at: usize) -> bool {
    let bytes = source.as_bytes();
    if at == 0 {
        return false;
    }
    if is_ident_char(bytes[at - 1]) {
        return true;
    }
    let mut back = at;
    while back > 0 && bytes[back - 1].is_ascii_whitespace() {
        back -= 1;
    }
    back > 0 && bytes[back - 1] == b'.'
}

fn read_ident(source: &str, at: usize) -> Option<(&str, usize)> {
    let bytes = source.as_bytes();
    if at >= bytes.len() || !is_ident_start(bytes[at]) {
        return None;
    }
    let mut end = at;
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    Some((&source[at..end], end))
}

/// 扫描 `(...)`，按深度为 0 的逗号切出顶层实参
///
/// 返回 (实参范围列表, `)` 之后的下标)
fn scan_call_arguments(source: &str, after_name: usize) -> Option<(Vec<Span>, usize)> {
    let bytes = source.as_bytes();
    let open = skip_trivia(source, after_name);
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut arguments = Vec::new();
    let mut cursor = open + 1;
    let mut arg_start = cursor;
    let mut depth = 0i32;
    while cursor < bytes.len() {
        match bytes[cursor] {
            b'"' | b'\'' | b'`' => cursor = skip_string(source, cursor),
            b'/' if matches!(bytes.get(cursor + 1), Some(b'/') | Some(b'*')) => {
                cursor = skip_trivia(source, cursor);
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                cursor += 1;
            }
            b')' if depth == 0 => {
                if let Some(span) = trim_span(source, arg_start, cursor) {
                    arguments.push(span);
                }
                return Some((arguments, cursor + 1));
            }
            b')' | b']' | b'}' => {
                depth -= 1;
                cursor += 1;
            }
            b',' if depth == 0 => {
                if let Some(span) = trim_span(source, arg_start, cursor) {
                    arguments.push(span);
                }
                cursor += 1;
                arg_start = cursor;
            }
            _ => cursor += 1,
        }
    }
    None
}

/// 去掉两端空白/注释后的范围；空实参返回 None
fn trim_span(source: &str, start: usize, end: usize) -> Option<Span> {
    let start = skip_trivia(source, start).min(end);
    let mut trimmed_end = end;
    while trimmed_end > start
        && source.as_bytes()[trimmed_end - 1].is_ascii_whitespace()
    {
        trimmed_end -= 1;
    }
    if start >= trimmed_end {
        None
    } else {
        Some(Span {
            start,
            end: trimmed_end,
        })
    }
}

/// 从 `new Ct()` 往回找 `const NAME =` 形式的绑定名
fn binding_before(source: &str, new_at: usize) -> Option<String> {
    let bytes = source.as_bytes();
    let mut back = new_at;
    while back > 0 && bytes[back - 1].is_ascii_whitespace() {
        back -= 1;
    }
    if back == 0 || bytes[back - 1] != b'=' {
        return None;
    }
    back -= 1;
    while back > 0 && bytes[back - 1].is_ascii_whitespace() {
        back -= 1;
    }
    let name_end = back;
    while back > 0 && is_ident_char(bytes[back - 1]) {
        back -= 1;
    }
    if back == name_end {
        return None;
    }
    Some(source[back..name_end].to_string())
}

/// 收集 `binding.section = <expr>` 简单赋值语句
fn scan_assignments(source: &str, from: usize, binding: &str) -> Vec<BuilderAssignment> {
    const SECTIONS: &[&str] = &["base", "global", "variant", "defaults"];
    let bytes = source.as_bytes();
    let mut assignments = Vec::new();
    let mut cursor = from;

    while cursor < bytes.len() {
        match bytes[cursor] {
            b'"' | b'\'' | b'`' => cursor = skip_string(source, cursor),
            b'/' if matches!(bytes.get(cursor + 1), Some(b'/') | Some(b'*')) => {
                cursor = skip_trivia(source, cursor);
            }
            byte if is_ident_start(byte) => {
                let Some((ident, ident_end)) = read_ident(source, cursor) else {
                    cursor += 1;
                    continue;
                };
                if ident != binding || excluded_by_prefix(source, cursor) {
                    cursor = ident_end;
                    continue;
                }
                let dot = skip_trivia(source, ident_end);
                if bytes.get(dot) != Some(&b'.') {
                    cursor = ident_end;
                    continue;
                }
                let Some((section, section_end)) = read_ident(source, skip_trivia(source, dot + 1))
                else {
                    cursor = ident_end;
                    continue;
                };
                if !SECTIONS.contains(&section) {
                    cursor = section_end;
                    continue;
                }
                let eq = skip_trivia(source, section_end);
                // 只认简单赋值（排除 ==、=>）
                if bytes.get(eq) != Some(&b'=')
                    || matches!(bytes.get(eq + 1), Some(b'=') | Some(b'>'))
                {
                    cursor = section_end;
                    continue;
                }
                let value_start = skip_trivia(source, eq + 1);
                let value_end = assignment_end(source, value_start);
                if let Some(value) = trim_span(source, value_start, value_end) {
                    assignments.push(BuilderAssignment {
                        section: section.to_string(),
                        value,
                    });
                }
                cursor = value_end;
            }
            _ => cursor += 1,
        }
    }
    assignments
}

/// 赋值表达式的边界：深度为 0 的 `;` 或表达式已平衡的换行
fn assignment_end(source: &str, at: usize) -> usize {
    let bytes = source.as_bytes();
    let mut cursor = at;
    let mut depth = 0i32;
    while cursor < bytes.len() {
        match bytes[cursor] {
            b'"' | b'\'' | b'`' => cursor = skip_string(source, cursor),
            b'/' if matches!(bytes.get(cursor + 1), Some(b'/') | Some(b'*')) => {
                cursor = skip_trivia(source, cursor);
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                cursor += 1;
            }
            b')' | b']' | b'}' => {
                depth -= 1;
                cursor += 1;
            }
            b';' if depth == 0 => return cursor,
            b'\n' if depth == 0 => return cursor,
            _ => cursor += 1,
        }
    }
    cursor
}
