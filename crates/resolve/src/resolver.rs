//! 跨模块静态解析：给定标识符路径和它所在的模块，
//! 求出运行时会得到的字面值
//!
//! 这是模块边界上的常量折叠，不是通用求值。整体是一次
//! 按 `(模块路径, 标识符路径)` 记忆化的深度优先图遍历，
//! 环用显式的 in-flight 集合挡住（解析成"不可解析"而不是死循环）。
//! 所有缓存都只活在一次 transform 调用里。

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ct_parse::scanner::{skip_string, skip_trivia};
use ct_parse::{ExpressionResolver, ParsedValue, Parser};

use crate::alias::{load_tsconfig_paths, AliasTable};
use crate::eval::{eval_expression, EvalScope};
use crate::module_info::{split_params, FunctionDef, ImportKind, ModuleStaticInfo};

const EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

pub struct StaticResolver {
    root: PathBuf,
    /// 构建层配置的别名表（优先于 tsconfig）
    aliases: AliasTable,
    /// tsconfig `paths` 推出的别名表
    tsconfig: AliasTable,
    /// 模块静态表面缓存；读不到的文件缓存 None
    modules: HashMap<PathBuf, Option<Rc<ModuleStaticInfo>>>,
    /// (模块, 标识符路径) → 解析结果
    values: HashMap<(PathBuf, String), Option<ParsedValue>>,
    /// 环检测
    in_flight: HashSet<(PathBuf, String)>,
}

impl StaticResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let tsconfig = load_tsconfig_paths(&root);
        Self {
            root,
            aliases: AliasTable::new(),
            tsconfig,
            modules: HashMap::new(),
            values: HashMap::new(),
            in_flight: HashSet::new(),
        }
    }

    /// 附加构建层配置的别名表
    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    /// 解析 `module` 里的标识符路径（如 `tokens.space.lg`）
    pub fn resolve(&mut self, module: &Path, path: &str) -> Option<ParsedValue> {
        let module = self.canonical(module);
        self.resolve_in(&module, path)
    }

    /// 在 `module` 的作用域里求任意表达式的值
    pub fn eval_in_module(&mut self, module: &Path, expression: &str) -> Option<ParsedValue> {
        let module = self.canonical(module);
        if is_ident_path(expression) {
            return self.resolve_in(&module, expression);
        }
        let mut scope = ModuleEval {
            resolver: self,
            module,
        };
        eval_expression(expression, &mut scope)
    }

    fn canonical(&self, module: &Path) -> PathBuf {
        std::fs::canonicalize(module).unwrap_or_else(|_| module.to_path_buf())
    }

    fn resolve_in(&mut self, module: &PathBuf, path: &str) -> Option<ParsedValue> {
        let key = (module.clone(), path.to_string());
        if let Some(cached) = self.values.get(&key) {
            return cached.clone();
        }
        // 环：自引用/互相 re-export 解析为不可解析，绝不死循环
        if !self.in_flight.insert(key.clone()) {
            return None;
        }
        let result = self.resolve_uncached(module, path);
        self.in_flight.remove(&key);
        self.values.insert(key, result.clone());
        result
    }

    fn resolve_uncached(&mut self, module: &PathBuf, path: &str) -> Option<ParsedValue> {
        let info = self.module_info(module)?;
        let (head, rest) = split_head(path);

        // 本地 const
        if let Some(init) = info.consts.get(head) {
            if parse_arrow(init).is_some() {
                // 函数本身不是字面值，只在调用处求值
                return None;
            }
            let value = self.eval_initializer(module, init)?;
            return walk_members(value, rest);
        }

        // import 绑定：沿说明符进目标模块
        if let Some(binding) = info.import(head).cloned() {
            let target = self.resolve_specifier(&binding.source, module)?;
            return match binding.kind {
                ImportKind::Named { imported } => {
                    self.resolve_in(&target, &join_path(&imported, rest))
                }
                ImportKind::Default => self.resolve_in(&target, &join_path("default", rest)),
                ImportKind::Namespace => {
                    // 命名空间导入的成员访问查目标模块的导出表
                    if rest.is_empty() {
                        None
                    } else {
                        self.resolve_in(&target, rest)
                    }
                }
            };
        }

        if info.functions.contains_key(head) {
            return None;
        }

        // re-export 透传
        for reexport in &info.reexports {
            if reexport.wildcard {
                if let Some(target) = self.resolve_specifier(&reexport.source, module) {
                    if let Some(value) = self.resolve_in(&target, path) {
                        return Some(value);
                    }
                }
            } else if let Some((_, local)) = reexport
                .entries
                .iter()
                .find(|(exported, _)| exported == head)
            {
                let target = self.resolve_specifier(&reexport.source, module)?;
                return self.resolve_in(&target, &join_path(local, rest));
            }
        }

        None
    }

    /// const 初始化表达式：先试纯字面量解析
    /// （内部的非字面子表达式回退到本模块作用域），
    /// 失败再进沙盒求值
    fn eval_initializer(&mut self, module: &PathBuf, init: &str) -> Option<ParsedValue> {
        let literal_shaped = matches!(
            init.as_bytes().first(),
            Some(b'{') | Some(b'[') | Some(b'"') | Some(b'\'') | Some(b'`')
                | Some(b'0'..=b'9') | Some(b'-') | Some(b'.')
        ) || init.starts_with("cv");
        if literal_shaped {
            let mut scope = ModuleScope {
                resolver: self,
                module: module.clone(),
            };
            if let Ok((value, next)) = Parser::with_resolver(init, &mut scope).value(0) {
                if skip_trivia(init, next) == init.len() {
                    return Some(value);
                }
            }
        }
        let mut scope = ModuleEval {
            resolver: self,
            module: module.clone(),
        };
        eval_expression(init, &mut scope)
    }

    /// 调用一个静态可见的函数（本地声明、箭头 const、或导入的函数）
    fn call_function(
        &mut self,
        module: &PathBuf,
        name: &str,
        args: Vec<ParsedValue>,
    ) -> Option<ParsedValue> {
        let info = self.module_info(module)?;
        let (head, rest) = split_head(name);

        if rest.is_empty() {
            if let Some(def) = info.functions.get(head) {
                return self.invoke(module, def, args);
            }
            if let Some(init) = info.consts.get(head) {
                let def = parse_arrow(init)?;
                return self.invoke(module, &def, args);
            }
        }

        if let Some(binding) = info.import(head).cloned() {
            let target = self.resolve_specifier(&binding.source, module)?;
            return match binding.kind {
                ImportKind::Named { imported } if rest.is_empty() => {
                    self.call_function(&target, &imported, args)
                }
                ImportKind::Default if rest.is_empty() => {
                    self.call_function(&target, "default", args)
                }
                ImportKind::Namespace if !rest.is_empty() => {
                    self.call_function(&target, rest, args)
                }
                _ => None,
            };
        }

        if rest.is_empty() {
            for reexport in &info.reexports {
                if reexport.wildcard {
                    if let Some(target) = self.resolve_specifier(&reexport.source, module) {
                        if let Some(value) =
                            self.call_function(&target, head, args.clone())
                        {
                            return Some(value);
                        }
                    }
                } else if let Some((_, local)) = reexport
                    .entries
                    .iter()
                    .find(|(exported, _)| exported == head)
                {
                    let target = self.resolve_specifier(&reexport.source, module)?;
                    return self.call_function(&target, local, args);
                }
            }
        }

        None
    }

    /// 形参绑定实参后在沙盒里求函数体的值；
    /// 解析不了的实参在上游就已经让整个调用失败
    fn invoke(
        &mut self,
        module: &PathBuf,
        def: &FunctionDef,
        args: Vec<ParsedValue>,
    ) -> Option<ParsedValue> {
        let expression = if def.expression {
            def.body.clone()
        } else {
            extract_return(&def.body)?
        };
        let bindings: HashMap<String, ParsedValue> = def
            .params
            .iter()
            .cloned()
            .zip(args.into_iter())
            .collect();
        let mut scope = FnScope {
            resolver: self,
            module: module.clone(),
            params: def.params.clone(),
            bindings,
        };
        eval_expression(&expression, &mut scope)
    }

    fn module_info(&mut self, module: &PathBuf) -> Option<Rc<ModuleStaticInfo>> {
        if let Some(cached) = self.modules.get(module) {
            return cached.clone();
        }
        let info = std::fs::read_to_string(module)
            .ok()
            .map(|source| Rc::new(ModuleStaticInfo::scan(&source)));
        self.modules.insert(module.clone(), info.clone());
        info
    }

    /// 模块说明符 → 具体文件，依次尝试：
    /// 相对路径、根相对路径、配置别名表、`~/` 根目录简写、tsconfig paths
    fn resolve_specifier(&mut self, specifier: &str, module: &Path) -> Option<PathBuf> {
        let from_dir = module.parent().unwrap_or_else(|| Path::new("."));

        if specifier.starts_with("./") || specifier.starts_with("../") {
            return probe_module(&from_dir.join(specifier)).map(|hit| self.canonical(&hit));
        }
        if let Some(rest) = specifier.strip_prefix('/') {
            return probe_module(&self.root.join(rest)).map(|hit| self.canonical(&hit));
        }
        for candidate in self.aliases.resolve(specifier) {
            if let Some(hit) = self.probe_rooted(&candidate) {
                return Some(hit);
            }
        }
        if let Some(rest) = specifier.strip_prefix("~/") {
            for base in [self.root.join("src").join(rest), self.root.join(rest)] {
                if let Some(hit) = probe_module(&base) {
                    return Some(self.canonical(&hit));
                }
            }
        }
        for candidate in self.tsconfig.resolve(specifier) {
            if let Some(hit) = self.probe_rooted(&candidate) {
                return Some(hit);
            }
        }
        None
    }

    fn probe_rooted(&self, candidate: &str) -> Option<PathBuf> {
        let path = Path::new(candidate);
        let base = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        probe_module(&base).map(|hit| self.canonical(&hit))
    }
}

/// `ExpressionResolver` 适配器：把解析器绑定到一个具体模块，
/// 让 `parse_configuration_with_resolver` 的回退落到静态解析上
pub struct ModuleScope<'a> {
    pub resolver: &'a mut StaticResolver,
    pub module: PathBuf,
}

impl<'a> ModuleScope<'a> {
    pub fn new(resolver: &'a mut StaticResolver, module: impl Into<PathBuf>) -> Self {
        Self {
            resolver,
            module: module.into(),
        }
    }
}

impl ExpressionResolver for ModuleScope<'_> {
    fn resolve_expression(&mut self, expression: &str) -> Option<ParsedValue> {
        self.resolver.eval_in_module(&self.module, expression)
    }
}

/// 模块级求值作用域
struct ModuleEval<'a> {
    resolver: &'a mut StaticResolver,
    module: PathBuf,
}

impl EvalScope for ModuleEval<'_> {
    fn lookup(&mut self, path: &str) -> Option<ParsedValue> {
        self.resolver.resolve_in(&self.module, path)
    }

    fn call(&mut self, name: &str, args: Vec<ParsedValue>) -> Option<ParsedValue> {
        self.resolver.call_function(&self.module, name, args)
    }
}

/// 函数体求值作用域：形参优先，其余回落到模块作用域
struct FnScope<'a> {
    resolver: &'a mut StaticResolver,
    module: PathBuf,
    params: Vec<String>,
    bindings: HashMap<String, ParsedValue>,
}

impl EvalScope for FnScope<'_> {
    fn lookup(&mut self, path: &str) -> Option<ParsedValue> {
        let (head, rest) = split_head(path);
        if let Some(value) = self.bindings.get(head) {
            return walk_members(value.clone(), rest);
        }
        if self.params.iter().any(|param| param == head) {
            // 形参没有对应实参：视为不可解析
            return None;
        }
        self.resolver.resolve_in(&self.module, path)
    }

    fn call(&mut self, name: &str, args: Vec<ParsedValue>) -> Option<ParsedValue> {
        self.resolver.call_function(&self.module, name, args)
    }
}

// ── 小工具 ───────────────────────────────────────────────────

fn split_head(path: &str) -> (&str, &str) {
    match path.split_once('.') {
        Some((head, rest)) => (head, rest),
        None => (path, ""),
    }
}

fn join_path(head: &str, rest: &str) -> String {
    if rest.is_empty() {
        head.to_string()
    } else {
        format!("{}.{}", head, rest)
    }
}

/// 沿剩余的点分段走成员访问
fn walk_members(value: ParsedValue, rest: &str) -> Option<ParsedValue> {
    if rest.is_empty() {
        return Some(value);
    }
    let mut current = value;
    for segment in rest.split('.') {
        current = match current {
            ParsedValue::Object(entries) => entries.get(segment)?.clone(),
            ParsedValue::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?.clone()
            }
            _ => return None,
        };
    }
    Some(current)
}

fn is_ident_path(expression: &str) -> bool {
    let mut first = true;
    for ch in expression.chars() {
        let ok = if first {
            ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
        } else {
            ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' || ch == '.'
        };
        if !ok {
            return false;
        }
        first = false;
    }
    !expression.is_empty()
}

/// 扩展名探测：原样 → 补 .ts/.tsx/.js/.jsx/.mjs/.cjs → 目录的 index.*
fn probe_module(base: &Path) -> Option<PathBuf> {
    if base.is_file() {
        return Some(base.to_path_buf());
    }
    for extension in EXTENSIONS {
        let mut os = base.as_os_str().to_owned();
        os.push(format!(".{}", extension));
        let candidate = PathBuf::from(os);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    if base.is_dir() {
        for extension in EXTENSIONS {
            let candidate = base.join(format!("index.{}", extension));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// 识别箭头函数初始化表达式：`(a, b) => ...` / `x => ...`
pub fn parse_arrow(init: &str) -> Option<FunctionDef> {
    let arrow = find_arrow(init)?;
    let head = init[..arrow].trim();
    let body = init[arrow + 2..].trim();

    // 泛型参数表直接剥掉
    let head = match head.strip_prefix('<') {
        Some(_) => {
            let close = head.find('>')?;
            head[close + 1..].trim()
        }
        None => head,
    };

    let params = if let Some(inner) = head.strip_prefix('(') {
        let inner = inner.strip_suffix(')')?;
        split_params(inner)
    } else if is_ident_path(head) && !head.contains('.') {
        vec![head.to_string()]
    } else {
        return None;
    };

    if let Some(inner) = body.strip_prefix('{') {
        let inner = inner.strip_suffix('}')?;
        Some(FunctionDef {
            params,
            body: inner.trim().to_string(),
            expression: false,
        })
    } else {
        Some(FunctionDef {
            params,
            body: body.to_string(),
            expression: true,
        })
    }
}

/// 深度为 0、字符串之外的 `=>`
fn find_arrow(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut cursor = 0;
    let mut depth = 0i32;
    while cursor < bytes.len() {
        match bytes[cursor] {
            b'"' | b'\'' | b'`' => cursor = skip_string(text, cursor),
            b'(' | b'[' | b'{' => {
                depth += 1;
                cursor += 1;
            }
            b')' | b']' | b'}' => {
                depth -= 1;
                cursor += 1;
            }
            b'=' if depth == 0 && bytes.get(cursor + 1) == Some(&b'>') => return Some(cursor),
            _ => cursor += 1,
        }
    }
    None
}

/// 只支持单条 `return <expr>;` 的函数体
fn extract_return(body: &str) -> Option<String> {
    let trimmed = body.trim();
    let rest = trimmed.strip_prefix("return")?;
    if !rest.starts_with(|ch: char| ch.is_whitespace() || ch == '(') {
        return None;
    }
    let expression = rest.trim().trim_end_matches(';').trim();
    if expression.is_empty() {
        None
    } else {
        Some(expression.to_string())
    }
}
