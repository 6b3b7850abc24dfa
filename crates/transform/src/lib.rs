pub mod locator;

use ct_core::{CompiledConfig, ConfigError};
use ct_css::EmitOptions;
use ct_parse::{parse_configuration, parse_configuration_with_resolver, ExpressionResolver};
use ct_runtime::compile_config;
use indexmap::IndexSet;

pub use locator::{locate_declaration_sites, BuilderAssignment, DeclarationSite, Span};

/// 转换选项
pub struct TransformOptions {
    /// 样式定义函数名（默认 "ct"）
    pub fn_name: String,
    /// 命令式构建器类名（默认 "Ct"）
    pub builder_name: String,
    /// 断点/容器/工具表，由构建层提供
    pub emit: EmitOptions,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            fn_name: "ct".to_string(),
            builder_name: "Ct".to_string(),
            emit: EmitOptions::default(),
        }
    }
}

/// 一个完成编译的声明点
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSite {
    pub span: Span,
    pub config: CompiledConfig,
}

/// 转换结果
#[derive(Debug)]
pub struct TransformResult {
    /// 转换后的源码（编译产物已拼接回调用点）
    pub code: String,
    /// 本模块产出的 CSS（规则按首次出现顺序去重）
    pub css: String,
    /// 完成编译的声明点
    pub sites: Vec<CompiledSite>,
}

/// 转换一份源码
///
/// 定位 → 解析（可带静态解析回退）→ 编译（salt = 模块 id）→
/// 把编译产物作为第二个实参拼回 `ct(...)` 调用
/// （构建器则拼进 `new Ct(...)` 的构造实参）。
///
/// 解析不了/解析器解不开的调用点保持逐字节原样——
/// 一个写坏的样式块绝不拖垮同文件里其他代码。
/// 书写约定错误（非法变量名、defaults 引用未声明的组）大声报错。
/// 对自身输出再跑一遍是恒等变换（不会二次编译）。
pub fn transform_source(
    source: &str,
    module_id: &str,
    options: &TransformOptions,
    mut resolver: Option<&mut dyn ExpressionResolver>,
) -> Result<TransformResult, ConfigError> {
    let located = locate_declaration_sites(source, &options.fn_name, &options.builder_name);

    let mut rules: IndexSet<String> = IndexSet::new();
    let mut edits: Vec<(usize, String)> = Vec::new();
    let mut sites = Vec::new();

    for site in &located {
        match site {
            DeclarationSite::Call { span, arguments } => {
                // 已有第二实参 → 已编译，跳过（幂等）
                if arguments.len() != 1 {
                    continue;
                }
                let argument = arguments[0];
                let text = &source[argument.start..argument.end];
                let config = match resolver.as_deref_mut() {
                    Some(resolver) => parse_configuration_with_resolver(text, resolver),
                    None => parse_configuration(text),
                };
                let Some(config) = config else {
                    // 不可解析：调用点原样保留
                    continue;
                };
                let output = compile_config(&config, module_id, &options.emit)?;
                let Ok(literal) = serde_json::to_string(&output.config) else {
                    continue;
                };
                rules.extend(output.rules);
                edits.push((argument.end, format!(", {}", literal)));
                sites.push(CompiledSite {
                    span: *span,
                    config: output.config,
                });
            }
            DeclarationSite::Builder {
                span,
                arguments,
                assignments,
                ..
            } => {
                // 构造器已有实参 → 已编译
                if !arguments.is_empty() || assignments.is_empty() {
                    continue;
                }
                // 把各段赋值拼成一份配置文本再走同一条解析路径；
                // 同一段赋两次时后者覆盖前者（对象重复键语义）
                let sections: Vec<String> = assignments
                    .iter()
                    .map(|assignment| {
                        format!(
                            "{}: {}",
                            assignment.section,
                            &source[assignment.value.start..assignment.value.end]
                        )
                    })
                    .collect();
                let text = format!("{{{}}}", sections.join(", "));
                let config = match resolver.as_deref_mut() {
                    Some(resolver) => parse_configuration_with_resolver(&text, resolver),
                    None => parse_configuration(&text),
                };
                let Some(config) = config else {
                    continue;
                };
                let output = compile_config(&config, module_id, &options.emit)?;
                let Ok(literal) = serde_json::to_string(&output.config) else {
                    continue;
                };
                rules.extend(output.rules);
                // 拼进构造器的空参表：new Ct() → new Ct({...})
                edits.push((span.end - 1, literal));
                sites.push(CompiledSite {
                    span: *span,
                    config: output.config,
                });
            }
        }
    }

    // 从后往前拼接，前面的偏移保持有效
    edits.sort_by(|a, b| b.0.cmp(&a.0));
    let mut code = source.to_string();
    for (at, text) in edits {
        code.insert_str(at, &text);
    }

    Ok(TransformResult {
        code,
        css: rules.iter().cloned().collect::<Vec<String>>().join("\n"),
        sites,
    })
}
