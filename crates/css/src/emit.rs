use ct_core::merge::{flatten_entry, merge_into};
use ct_core::types::{StyleDeclaration, StyleEntry, StyleSheet, StyleValue};
use indexmap::IndexMap;

use crate::atrule::{is_at_rule_key, resolve_at_rule, ContainerAlias};
use crate::format::{format_declaration, format_list_declaration};
use crate::pseudo::pseudo_selector;

/// 外部构建/运行时层提供的发射配置
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    /// 断点别名 → CSS 长度（`@sm` 简写）
    pub breakpoints: IndexMap<String, String>,
    /// 容器别名 → 容器查询规则
    pub containers: IndexMap<String, ContainerAlias>,
    /// `@apply` 按名字引用的工具样式表
    pub utilities: StyleSheet,
}

/// 将一条声明展开为一组扁平 CSS 规则
///
/// 顺序保证：
/// - 类自身的基础规则先于嵌套选择器/伪类规则
/// - 非条件规则严格先于 at 规则包裹的条件规则
///   （基础值无条件生效，响应式值在各自的媒体范围内覆盖）
pub fn emit_rules(
    class_name: &str,
    declaration: &StyleDeclaration,
    options: &EmitOptions,
) -> Vec<String> {
    emit_for_selector(&format!(".{}", class_name), declaration, options)
}

/// 发射全局样式表：键就是原始 CSS 选择器
pub fn emit_global_rules(sheet: &StyleSheet, options: &EmitOptions) -> Vec<String> {
    let mut rules = Vec::new();
    for (selector, declaration) in sheet {
        rules.extend(emit_for_selector(selector, declaration, options));
    }
    rules
}

fn emit_for_selector(
    selector: &str,
    declaration: &StyleDeclaration,
    options: &EmitOptions,
) -> Vec<String> {
    let mut plain = Vec::new();
    let mut conditional = Vec::new();
    emit_into(selector, declaration, options, &mut plain, &mut conditional);
    plain.extend(conditional);
    plain
}

fn emit_into(
    selector: &str,
    declaration: &StyleDeclaration,
    options: &EmitOptions,
    plain: &mut Vec<String>,
    conditional: &mut Vec<String>,
) {
    let prepared = prepare_declaration(declaration, options);

    // 先收集本层的直接声明
    let mut props: Vec<String> = Vec::new();
    for (key, entry) in &prepared {
        match entry {
            StyleEntry::Value(value) => props.push(format_declaration(key, value)),
            StyleEntry::List(values) => props.push(format_list_declaration(key, values)),
            StyleEntry::Nested(_) | StyleEntry::Merge(_) => {}
        }
    }
    if !props.is_empty() {
        plain.push(format!("{}{{{}}}", selector, props.join(";")));
    }

    // 再按书写顺序处理嵌套块
    for (key, entry) in &prepared {
        let StyleEntry::Nested(nested) = entry else {
            continue;
        };
        if is_at_rule_key(key) {
            let Some(at_rule) =
                resolve_at_rule(key, &options.breakpoints, &options.containers)
            else {
                // 简写引用了未配置的别名：丢弃整块，不输出坏 CSS
                continue;
            };
            // at 规则保持当前选择器路径继续递归，内部规则整体包裹
            let mut inner_plain = Vec::new();
            let mut inner_conditional = Vec::new();
            emit_into(selector, nested, options, &mut inner_plain, &mut inner_conditional);
            inner_plain.extend(inner_conditional);
            if !inner_plain.is_empty() {
                conditional.push(format!("{}{{{}}}", at_rule, inner_plain.concat()));
            }
        } else if let Some(pseudo) = pseudo_selector(key) {
            // 伪类/伪元素直接追加到选择器，不加后代空格
            let extended = format!("{}{}", selector, pseudo);
            emit_into(&extended, nested, options, plain, conditional);
        } else {
            // 普通键视为后代组合器
            let extended = format!("{} {}", selector, key);
            emit_into(&extended, nested, options, plain, conditional);
        }
    }
}

/// 发射前的预处理：
/// - 折叠合并列表（后者覆盖前者）
/// - 解析 `@apply` 引用的工具声明，先合并进来，
///   让 `@apply` 之后的直接键覆盖工具里的同名属性
fn prepare_declaration(
    declaration: &StyleDeclaration,
    options: &EmitOptions,
) -> StyleDeclaration {
    let mut prepared = StyleDeclaration::new();
    if let Some(apply) = declaration.get("@apply") {
        for name in apply_names(apply) {
            if let Some(utility) = options.utilities.get(&name) {
                merge_into(&mut prepared, utility);
            }
        }
    }
    let mut direct = StyleDeclaration::new();
    for (key, entry) in declaration {
        if key == "@apply" {
            continue;
        }
        direct.insert(key.clone(), flatten_entry(entry));
    }
    merge_into(&mut prepared, &direct);
    prepared
}

/// `@apply` 的值：空格分隔的名字字符串，或名字数组
fn apply_names(entry: &StyleEntry) -> Vec<String> {
    match entry {
        StyleEntry::Value(StyleValue::Str(text)) => text
            .split_whitespace()
            .map(|name| name.to_string())
            .collect(),
        StyleEntry::List(values) => values
            .iter()
            .filter_map(|value| match value {
                StyleValue::Str(text) => Some(text.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
