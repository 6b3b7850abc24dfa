//! 模块静态表面扫描
//!
//! 不做完整的 JS/TS 解析，只扫出静态解析需要的四类信息：
//! import 绑定、顶层 const 初始化表达式、顶层函数、re-export 列表。
//! 初始化表达式的边界用括号/字符串/模板感知的扫描确定，
//! 跨多行、带泛型和类型注解的声明都能正确截取。

use indexmap::IndexMap;
use std::collections::HashSet;

use ct_parse::scanner::{skip_string, skip_trivia};

/// import 绑定形式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    Named { imported: String },
    Default,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local: String,
    pub kind: ImportKind,
    pub source: String,
}

/// 顶层函数（`function` 声明或 const 绑定的箭头函数）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub params: Vec<String>,
    pub body: String,
    /// 表达式体箭头函数（`x => x * 2`）为 true
    pub expression: bool,
}

/// re-export：`export { a, b as c } from './x'` / `export * from './x'`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReExport {
    /// (导出名, 源模块里的名字)
    pub entries: Vec<(String, String)>,
    pub source: String,
    pub wildcard: bool,
}

/// 一个模块的静态表面
#[derive(Debug, Clone, Default)]
pub struct ModuleStaticInfo {
    pub imports: Vec<ImportBinding>,
    /// const 名 → 初始化表达式文本
    pub consts: IndexMap<String, String>,
    pub functions: IndexMap<String, FunctionDef>,
    pub reexports: Vec<ReExport>,
    /// 本模块导出的名字（export const / export { a }）
    pub exports: HashSet<String>,
}

impl ModuleStaticInfo {
    pub fn scan(source: &str) -> Self {
        let mut info = ModuleStaticInfo::default();
        let mut cursor = 0;
        while cursor < source.len() {
            cursor = skip_trivia(source, cursor);
            if cursor >= source.len() {
                break;
            }
            let entered = cursor;
            let mut exported = false;
            let mut at = cursor;
            if let Some(next) = keyword(source, at, "export") {
                exported = true;
                at = skip_trivia(source, next);
                // export default <expr>
                if let Some(next) = keyword(source, at, "default") {
                    let end = statement_end(source, next);
                    let init = source[next..end].trim();
                    if !init.is_empty() {
                        info.consts.insert("default".to_string(), init.to_string());
                        info.exports.insert("default".to_string());
                    }
                    cursor = after_statement(source, end);
                    continue;
                }
                // export { ... } [from '...'] / export * from '...'
                if source.as_bytes().get(at) == Some(&b'{')
                    || source.as_bytes().get(at) == Some(&b'*')
                {
                    cursor = scan_export_list(source, at, &mut info);
                    continue;
                }
                // export type ... → 纯类型导出，跳过
                if keyword(source, at, "type").is_some() {
                    cursor = after_statement(source, statement_end(source, at));
                    continue;
                }
            }
            if let Some(next) = keyword(source, at, "import") {
                cursor = scan_import(source, next, &mut info);
                continue;
            }
            if let Some(next) = keyword(source, at, "const") {
                cursor = scan_const(source, next, exported, &mut info);
                continue;
            }
            if let Some(next) = keyword(source, at, "function") {
                cursor = scan_function(source, next, exported, &mut info);
                continue;
            }
            // 其他语句整体跳过；无论如何都要前进
            cursor = after_statement(source, statement_end(source, cursor));
            if cursor <= entered {
                cursor = entered + 1;
            }
        }
        info
    }

    pub fn import(&self, local: &str) -> Option<&ImportBinding> {
        self.imports.iter().find(|binding| binding.local == local)
    }
}

fn is_ident_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

/// 匹配一个完整的关键字（后面不能紧跟标识符字符），返回其后的位置
fn keyword(source: &str, at: usize, word: &str) -> Option<usize> {
    let end = at + word.len();
    if source.get(at..end)? != word {
        return None;
    }
    match source.as_bytes().get(end) {
        Some(&byte) if is_ident_char(byte) => None,
        _ => Some(end),
    }
}

fn read_ident(source: &str, at: usize) -> Option<(String, usize)> {
    let bytes = source.as_bytes();
    let start = at;
    let mut end = at;
    if end >= bytes.len() || !(bytes[end].is_ascii_alphabetic() || bytes[end] == b'_' || bytes[end] == b'$')
    {
        return None;
    }
    while end < bytes.len() && is_ident_char(bytes[end]) {
        end += 1;
    }
    Some((source[start..end].to_string(), end))
}

fn read_string_literal(source: &str, at: usize) -> Option<(String, usize)> {
    let bytes = source.as_bytes();
    match bytes.get(at) {
        Some(b'"') | Some(b'\'') => {
            let end = skip_string(source, at);
            // 没有收尾引号的残串不算字面量
            if end < at + 2 || bytes.get(end - 1) != Some(&bytes[at]) {
                return None;
            }
            Some((source[at + 1..end - 1].to_string(), end))
        }
        _ => None,
    }
}

/// `import ...` 语句
fn scan_import(source: &str, at: usize, info: &mut ModuleStaticInfo) -> usize {
    let mut cursor = skip_trivia(source, at);
    let bytes = source.as_bytes();

    // import './side-effect'
    if let Some((_, end)) = read_string_literal(source, cursor) {
        return after_statement(source, end);
    }
    // import type { ... } → 纯类型导入，跳过
    if let Some(next) = keyword(source, cursor, "type") {
        if skip_trivia(source, next) != next {
            return after_statement(source, statement_end(source, cursor));
        }
    }

    let mut locals: Vec<(String, ImportKind)> = Vec::new();
    loop {
        cursor = skip_trivia(source, cursor);
        match bytes.get(cursor) {
            // import * as ns from '...'
            Some(b'*') => {
                cursor = skip_trivia(source, cursor + 1);
                let Some(next) = keyword(source, cursor, "as") else {
                    return after_statement(source, statement_end(source, cursor));
                };
                cursor = skip_trivia(source, next);
                let Some((name, end)) = read_ident(source, cursor) else {
                    return after_statement(source, statement_end(source, cursor));
                };
                locals.push((name, ImportKind::Namespace));
                cursor = end;
            }
            // import { a, b as c } from '...'
            Some(b'{') => {
                cursor += 1;
                loop {
                    cursor = skip_trivia(source, cursor);
                    if bytes.get(cursor) == Some(&b'}') {
                        cursor += 1;
                        break;
                    }
                    let Some((imported, end)) = read_ident(source, cursor) else {
                        return after_statement(source, statement_end(source, cursor));
                    };
                    cursor = skip_trivia(source, end);
                    let mut local = imported.clone();
                    if let Some(next) = keyword(source, cursor, "as") {
                        cursor = skip_trivia(source, next);
                        if let Some((alias, end)) = read_ident(source, cursor) {
                            local = alias;
                            cursor = end;
                        }
                    }
                    locals.push((local, ImportKind::Named { imported }));
                    cursor = skip_trivia(source, cursor);
                    if bytes.get(cursor) == Some(&b',') {
                        cursor += 1;
                    }
                }
            }
            // import Default from '...'
            _ => {
                let Some((name, end)) = read_ident(source, cursor) else {
                    return after_statement(source, statement_end(source, cursor));
                };
                locals.push((name, ImportKind::Default));
                cursor = end;
            }
        }

        cursor = skip_trivia(source, cursor);
        if bytes.get(cursor) == Some(&b',') {
            cursor += 1;
            continue;
        }
        break;
    }

    cursor = skip_trivia(source, cursor);
    let Some(next) = keyword(source, cursor, "from") else {
        return after_statement(source, statement_end(source, cursor));
    };
    cursor = skip_trivia(source, next);
    let Some((specifier, end)) = read_string_literal(source, cursor) else {
        return after_statement(source, statement_end(source, cursor));
    };

    for (local, kind) in locals {
        info.imports.push(ImportBinding {
            local,
            kind,
            source: specifier.clone(),
        });
    }
    after_statement(source, end)
}

/// `export { a, b as c } [from '...']` / `export * from '...'`
fn scan_export_list(source: &str, at: usize, info: &mut ModuleStaticInfo) -> usize {
    let bytes = source.as_bytes();
    let mut cursor = at;
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut wildcard = false;

    if bytes.get(cursor) == Some(&b'*') {
        wildcard = true;
        cursor += 1;
    } else {
        cursor += 1; // '{'
        loop {
            cursor = skip_trivia(source, cursor);
            if bytes.get(cursor) == Some(&b'}') {
                cursor += 1;
                break;
            }
            let Some((name, end)) = read_ident(source, cursor) else {
                return after_statement(source, statement_end(source, cursor));
            };
            cursor = skip_trivia(source, end);
            let mut exported = name.clone();
            if let Some(next) = keyword(source, cursor, "as") {
                cursor = skip_trivia(source, next);
                if let Some((alias, end)) = read_ident(source, cursor) {
                    exported = alias;
                    cursor = end;
                }
            }
            entries.push((exported, name));
            cursor = skip_trivia(source, cursor);
            if bytes.get(cursor) == Some(&b',') {
                cursor += 1;
            }
        }
    }

    cursor = skip_trivia(source, cursor);
    if let Some(next) = keyword(source, cursor, "from") {
        cursor = skip_trivia(source, next);
        if let Some((specifier, end)) = read_string_literal(source, cursor) {
            info.reexports.push(ReExport {
                entries,
                source: specifier,
                wildcard,
            });
            return after_statement(source, end);
        }
        return after_statement(source, statement_end(source, cursor));
    }

    // 没有 from：导出本地名字
    for (exported, _) in entries {
        info.exports.insert(exported);
    }
    after_statement(source, cursor)
}

/// `const name[: Type] = <init>`
fn scan_const(source: &str, at: usize, exported: bool, info: &mut ModuleStaticInfo) -> usize {
    let mut cursor = skip_trivia(source, at);
    let Some((name, end)) = read_ident(source, cursor) else {
        // 解构绑定等：跳过整条语句
        return after_statement(source, statement_end(source, cursor));
    };
    cursor = end;

    // 找到深度为 0 的 `=`（跳过类型注解；`=>`、`==`、`<=` 不算）
    let Some(assign) = find_assignment(source, cursor) else {
        return after_statement(source, statement_end(source, cursor));
    };
    let init_start = assign + 1;
    let init_end = statement_end(source, init_start);
    let init = source[init_start..init_end].trim();
    if !init.is_empty() {
        info.consts.insert(name.clone(), init.to_string());
        if exported {
            info.exports.insert(name);
        }
    }
    after_statement(source, init_end)
}

/// `function name(params) { body }`
fn scan_function(source: &str, at: usize, exported: bool, info: &mut ModuleStaticInfo) -> usize {
    let mut cursor = skip_trivia(source, at);
    let Some((name, end)) = read_ident(source, cursor) else {
        return after_statement(source, statement_end(source, cursor));
    };
    cursor = skip_trivia(source, end);

    let bytes = source.as_bytes();
    // 可选的泛型参数表
    if bytes.get(cursor) == Some(&b'<') {
        cursor = skip_balanced(source, cursor, b'<', b'>');
        cursor = skip_trivia(source, cursor);
    }
    if bytes.get(cursor) != Some(&b'(') {
        return after_statement(source, statement_end(source, cursor));
    }
    let params_end = skip_balanced(source, cursor, b'(', b')');
    let params = split_params(&source[cursor + 1..params_end - 1]);

    cursor = skip_trivia(source, params_end);
    // 可选的返回类型注解
    if bytes.get(cursor) == Some(&b':') {
        let mut scan = cursor + 1;
        loop {
            scan = skip_trivia(source, scan);
            match bytes.get(scan) {
                Some(b'{') => break,
                Some(b'(') => scan = skip_balanced(source, scan, b'(', b')'),
                Some(b'<') => scan = skip_balanced(source, scan, b'<', b'>'),
                Some(_) => scan += 1,
                None => return source.len(),
            }
        }
        cursor = scan;
    }
    if bytes.get(cursor) != Some(&b'{') {
        return after_statement(source, statement_end(source, cursor));
    }
    let body_end = skip_balanced(source, cursor, b'{', b'}');
    let body = source[cursor + 1..body_end - 1].trim().to_string();

    info.functions.insert(
        name.clone(),
        FunctionDef {
            params,
            body,
            expression: false,
        },
    );
    if exported {
        info.exports.insert(name);
    }
    after_statement(source, body_end)
}

/// 参数表按深度为 0 的逗号切分，剥掉类型注解和默认值
pub fn split_params(text: &str) -> Vec<String> {
    let mut params = Vec::new();
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut start = 0;
    let mut cursor = 0;
    while cursor <= bytes.len() {
        let at_end = cursor == bytes.len();
        if at_end || (bytes[cursor] == b',' && depth == 0) {
            let raw = text[start..cursor].trim();
            if !raw.is_empty() {
                let name = raw
                    .split(|ch| ch == ':' || ch == '=')
                    .next()
                    .unwrap_or(raw)
                    .trim();
                params.push(name.to_string());
            }
            start = cursor + 1;
            cursor += 1;
            continue;
        }
        match bytes[cursor] {
            b'"' | b'\'' | b'`' => cursor = skip_string(text, cursor),
            b'(' | b'[' | b'{' | b'<' => {
                depth += 1;
                cursor += 1;
            }
            b')' | b']' | b'}' | b'>' => {
                depth -= 1;
                cursor += 1;
            }
            _ => cursor += 1,
        }
    }
    params
}

/// 找到声明里深度为 0 的赋值 `=`，跳过类型注解里的 `=>` 等
fn find_assignment(source: &str, at: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut cursor = at;
    let mut depth = 0i32;
    while cursor < bytes.len() {
        match bytes[cursor] {
            b'"' | b'\'' | b'`' => cursor = skip_string(source, cursor),
            b'(' | b'[' | b'{' | b'<' => {
                depth += 1;
                cursor += 1;
            }
            b')' | b']' | b'}' | b'>' => {
                depth -= 1;
                cursor += 1;
            }
            b'=' if depth == 0 => {
                let next = bytes.get(cursor + 1);
                let prev = if cursor > at { bytes.get(cursor - 1) } else { None };
                if next == Some(&b'>') || next == Some(&b'=') {
                    // `=>` / `==`：连同第二个字符一起跳过，
                    // 免得 `>` 被当成尖括号收尾
                    cursor += 2;
                } else if matches!(prev, Some(b'!') | Some(b'<') | Some(b'>') | Some(b'=')) {
                    cursor += 1;
                } else {
                    return Some(cursor);
                }
            }
            b';' | b'\n' if depth == 0 => return None,
            _ => cursor += 1,
        }
    }
    None
}

/// 跳过配对的括号，返回收尾括号之后的下标
fn skip_balanced(source: &str, at: usize, open: u8, close: u8) -> usize {
    let bytes = source.as_bytes();
    let mut cursor = at + 1;
    let mut depth = 1i32;
    while cursor < bytes.len() && depth > 0 {
        match bytes[cursor] {
            b'"' | b'\'' | b'`' => cursor = skip_string(source, cursor),
            b'/' if matches!(bytes.get(cursor + 1), Some(b'/') | Some(b'*')) => {
                cursor = skip_trivia(source, cursor);
            }
            byte if byte == open => {
                depth += 1;
                cursor += 1;
            }
            byte if byte == close => {
                depth -= 1;
                cursor += 1;
            }
            _ => cursor += 1,
        }
    }
    cursor
}

/// 语句/初始化表达式的边界：
/// 深度为 0 的 `;`，或表达式已平衡且不在续行中的换行
fn statement_end(source: &str, at: usize) -> usize {
    let bytes = source.as_bytes();
    let mut cursor = skip_trivia(source, at);
    let mut depth = 0i32;
    let mut last_significant: Option<u8> = None;
    while cursor < bytes.len() {
        match bytes[cursor] {
            b'"' | b'\'' | b'`' => {
                cursor = skip_string(source, cursor);
                last_significant = Some(b'"');
            }
            // 注释整个跳过，但行注释不吞掉作为语句边界的换行
            b'/' if bytes.get(cursor + 1) == Some(&b'/') => {
                while cursor < bytes.len() && bytes[cursor] != b'\n' {
                    cursor += 1;
                }
            }
            b'/' if bytes.get(cursor + 1) == Some(&b'*') => {
                cursor += 2;
                while cursor + 1 < bytes.len()
                    && !(bytes[cursor] == b'*' && bytes[cursor + 1] == b'/')
                {
                    cursor += 1;
                }
                cursor = (cursor + 2).min(bytes.len());
            }
            b'(' | b'[' | b'{' => {
                depth += 1;
                last_significant = Some(bytes[cursor]);
                cursor += 1;
            }
            b')' | b']' | b'}' => {
                depth -= 1;
                last_significant = Some(bytes[cursor]);
                cursor += 1;
                // 顶层块（函数体等）结束也视为语句结束
                if depth < 0 {
                    return cursor - 1;
                }
            }
            b';' if depth == 0 => return cursor,
            b'\n' if depth == 0 => {
                if expression_complete(source, cursor, last_significant) {
                    return cursor;
                }
                cursor += 1;
            }
            byte => {
                if !byte.is_ascii_whitespace() {
                    last_significant = Some(byte);
                }
                cursor += 1;
            }
        }
    }
    cursor
}

/// 换行处表达式是否已经完整（不是续行）
fn expression_complete(source: &str, at: usize, last_significant: Option<u8>) -> bool {
    // 行尾是运算符/逗号/点号 → 续行
    if matches!(
        last_significant,
        Some(b'+') | Some(b'-') | Some(b'*') | Some(b'/') | Some(b'%') | Some(b',')
            | Some(b'.') | Some(b'=') | Some(b'&') | Some(b'|') | Some(b'?') | Some(b':')
            | Some(b'<') | Some(b'>') | None
    ) {
        return false;
    }
    // 下一行以运算符/点号开头 → 续行
    let next = skip_trivia(source, at);
    matches!(
        source.as_bytes().get(next),
        None | Some(b'}') | Some(b')') | Some(b']')
    ) || !matches!(
        source.as_bytes().get(next),
        Some(b'.') | Some(b'+') | Some(b'*') | Some(b'/') | Some(b'%') | Some(b'?')
            | Some(b'&') | Some(b'|') | Some(b':') | Some(b'=')
    )
}

fn after_statement(source: &str, end: usize) -> usize {
    match source.as_bytes().get(end) {
        Some(b';') | Some(b'\n') => end + 1,
        _ => end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_imports() {
        let info = ModuleStaticInfo::scan(
            r#"
import tokens from './tokens';
import { space, color as textColor } from '@/theme';
import * as scale from '~/scale';
import './side-effect.css';
import type { Config } from './types';
"#,
        );

        assert_eq!(info.imports.len(), 4);
        assert_eq!(
            info.import("tokens"),
            Some(&ImportBinding {
                local: "tokens".to_string(),
                kind: ImportKind::Default,
                source: "./tokens".to_string(),
            })
        );
        assert_eq!(
            info.import("textColor"),
            Some(&ImportBinding {
                local: "textColor".to_string(),
                kind: ImportKind::Named {
                    imported: "color".to_string()
                },
                source: "@/theme".to_string(),
            })
        );
        assert_eq!(
            info.import("scale").map(|binding| &binding.kind),
            Some(&ImportKind::Namespace)
        );
        assert_eq!(info.import("Config"), None);
    }

    #[test]
    fn test_scan_consts_with_annotations() {
        let info = ModuleStaticInfo::scan(
            r#"
const space = 8;
export const wide: Record<string, number> = {
    lg: 64,
    xl: 80,
};
const label: string = "a = b";
"#,
        );

        assert_eq!(info.consts.get("space").map(String::as_str), Some("8"));
        let wide = info.consts.get("wide").unwrap();
        assert!(wide.starts_with('{') && wide.ends_with('}'));
        assert!(info.exports.contains("wide"));
        // 字符串里的 = 不会被当成赋值
        assert_eq!(
            info.consts.get("label").map(String::as_str),
            Some("\"a = b\"")
        );
    }

    #[test]
    fn test_scan_multiline_initializer() {
        let info = ModuleStaticInfo::scan(
            "const total = 8 +\n    4 +\n    2;\nconst next = 1\n",
        );
        assert_eq!(
            info.consts.get("total").map(String::as_str),
            Some("8 +\n    4 +\n    2")
        );
        assert_eq!(info.consts.get("next").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_scan_functions() {
        let info = ModuleStaticInfo::scan(
            r#"
export function double(value: number): number {
    return value * 2;
}
const half = (value: number) => value / 2;
"#,
        );

        let double = info.functions.get("double").unwrap();
        assert_eq!(double.params, vec!["value".to_string()]);
        assert_eq!(double.body, "return value * 2;");
        assert!(info.exports.contains("double"));
        // 箭头函数以 const 初始化表达式的形式保留
        assert_eq!(
            info.consts.get("half").map(String::as_str),
            Some("(value: number) => value / 2")
        );
    }

    #[test]
    fn test_scan_reexports() {
        let info = ModuleStaticInfo::scan(
            r#"
export { space, color as themeColor } from './tokens';
export * from './scale';
export { localOnly };
"#,
        );

        assert_eq!(info.reexports.len(), 2);
        assert_eq!(
            info.reexports[0].entries,
            vec![
                ("space".to_string(), "space".to_string()),
                ("themeColor".to_string(), "color".to_string()),
            ]
        );
        assert!(info.reexports[1].wildcard);
        assert!(info.exports.contains("localOnly"));
    }

    #[test]
    fn test_split_params() {
        assert_eq!(
            split_params("a: number, b = 4, c: Record<string, string>"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(split_params(""), Vec::<String>::new());
    }
}
