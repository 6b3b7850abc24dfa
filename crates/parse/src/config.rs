use ct_core::merge::merge_declarations;
use ct_core::types::{
    CtConfig, StyleDeclaration, StyleEntry, StyleSheet, StyleValue, VarFallback,
    VariantSelection, VariantSheet,
};

use crate::scanner::{skip_trivia, Parser};
use crate::value::{ExpressionResolver, ParsedValue};

/// 把调用点的原始参数文本解析为结构化配置
///
/// 任何解析失败（不支持的语法、结构不合法、未知顶层键）都返回 None，
/// 调用方必须把该调用点当作不透明文本原样保留。
pub fn parse_configuration(text: &str) -> Option<CtConfig> {
    let (value, next) = Parser::new(text).value(0).ok()?;
    finish(text, value, next)
}

/// 同上，但非字面子表达式交给 resolver 回退
pub fn parse_configuration_with_resolver(
    text: &str,
    resolver: &mut dyn ExpressionResolver,
) -> Option<CtConfig> {
    let (value, next) = Parser::with_resolver(text, resolver).value(0).ok()?;
    finish(text, value, next)
}

fn finish(text: &str, value: ParsedValue, next: usize) -> Option<CtConfig> {
    // 值之后只允许空白/注释
    if skip_trivia(text, next) != text.len() {
        return None;
    }
    config_from_value(value)
}

/// 结构校验：顶层键白名单 + 各区块形状
fn config_from_value(value: ParsedValue) -> Option<CtConfig> {
    let ParsedValue::Object(entries) = value else {
        return None;
    };

    let mut config = CtConfig::default();
    for (key, value) in entries {
        match key.as_str() {
            "global" => config.global = Some(sheet_from_value(value)?),
            "base" => config.base = Some(sheet_from_value(value)?),
            "variant" => config.variant = Some(variant_from_value(value)?),
            "defaults" => config.defaults = Some(defaults_from_value(value)?),
            // 未知顶层键：整个配置不可解析（fail closed）
            _ => return None,
        }
    }

    // defaults 只能引用已声明的变体组
    if let Some(defaults) = &config.defaults {
        for group in defaults.keys() {
            if !config
                .variant
                .as_ref()
                .is_some_and(|variant| variant.contains_key(group))
            {
                return None;
            }
        }
    }

    Some(config)
}

fn sheet_from_value(value: ParsedValue) -> Option<StyleSheet> {
    let ParsedValue::Object(entries) = value else {
        return None;
    };
    let mut sheet = StyleSheet::new();
    for (key, value) in entries {
        sheet.insert(key, sheet_declaration_from_value(value)?);
    }
    Some(sheet)
}

/// 表里每个类键对应一条声明；数组形式（样式组合）在这里预合并
fn sheet_declaration_from_value(value: ParsedValue) -> Option<StyleDeclaration> {
    match value {
        ParsedValue::Object(_) => declaration_from_value(value),
        ParsedValue::Array(items) => {
            let mut declarations = Vec::with_capacity(items.len());
            for item in items {
                declarations.push(declaration_from_value(item)?);
            }
            Some(merge_declarations(&declarations))
        }
        _ => None,
    }
}

fn declaration_from_value(value: ParsedValue) -> Option<StyleDeclaration> {
    let ParsedValue::Object(entries) = value else {
        return None;
    };
    let mut declaration = StyleDeclaration::new();
    for (key, value) in entries {
        declaration.insert(key, entry_from_value(value)?);
    }
    Some(declaration)
}

fn entry_from_value(value: ParsedValue) -> Option<StyleEntry> {
    match value {
        ParsedValue::Str(_) | ParsedValue::Num(_) | ParsedValue::Var { .. } => {
            Some(StyleEntry::Value(style_value(value)?))
        }
        ParsedValue::Object(_) => Some(StyleEntry::Nested(declaration_from_value(value)?)),
        ParsedValue::Array(items) => {
            if items.is_empty() {
                return Some(StyleEntry::List(Vec::new()));
            }
            if items.iter().all(|item| matches!(item, ParsedValue::Object(_))) {
                let mut declarations = Vec::with_capacity(items.len());
                for item in items {
                    declarations.push(declaration_from_value(item)?);
                }
                return Some(StyleEntry::Merge(declarations));
            }
            // 值列表：全部是原始值/变量引用，混合则不可解析
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(style_value(item)?);
            }
            Some(StyleEntry::List(values))
        }
    }
}

fn style_value(value: ParsedValue) -> Option<StyleValue> {
    match value {
        ParsedValue::Str(text) => Some(StyleValue::Str(text)),
        ParsedValue::Num(number) => Some(StyleValue::Num(number)),
        ParsedValue::Var { name, fallback } => {
            let fallback = match fallback {
                None => None,
                Some(boxed) => match *boxed {
                    ParsedValue::Str(text) => Some(VarFallback::Str(text)),
                    ParsedValue::Num(number) => Some(VarFallback::Num(number)),
                    _ => return None,
                },
            };
            Some(StyleValue::Var { name, fallback })
        }
        _ => None,
    }
}

fn variant_from_value(value: ParsedValue) -> Option<VariantSheet> {
    let ParsedValue::Object(groups) = value else {
        return None;
    };
    let mut variant = VariantSheet::new();
    for (group, value) in groups {
        let ParsedValue::Object(variants) = value else {
            return None;
        };
        let mut sheet_map = indexmap::IndexMap::new();
        for (name, value) in variants {
            sheet_map.insert(name, sheet_from_value(value)?);
        }
        variant.insert(group, sheet_map);
    }
    Some(variant)
}

fn defaults_from_value(value: ParsedValue) -> Option<VariantSelection> {
    let ParsedValue::Object(entries) = value else {
        return None;
    };
    let mut defaults = VariantSelection::new();
    for (group, value) in entries {
        let ParsedValue::Str(name) = value else {
            return None;
        };
        defaults.insert(group, name);
    }
    Some(defaults)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_configuration() {
        let config = parse_configuration(
            r#"{
                base: {
                    card: {
                        fontSize: "1.25rem",
                        padding: 8,
                        hover: { opacity: 0.5 },
                    },
                },
            }"#,
        )
        .unwrap();

        let base = config.base.unwrap();
        let card = base.get("card").unwrap();
        assert_eq!(
            card.get("fontSize"),
            Some(&StyleEntry::Value(StyleValue::str("1.25rem")))
        );
        assert_eq!(
            card.get("padding"),
            Some(&StyleEntry::Value(StyleValue::num(8.0)))
        );
        assert!(matches!(card.get("hover"), Some(StyleEntry::Nested(_))));
    }

    #[test]
    fn test_rejects_unknown_top_level_keys() {
        assert_eq!(parse_configuration("{foo: {}}"), None);
        assert_eq!(parse_configuration("{base: {}, extra: {}}"), None);
    }

    #[test]
    fn test_rejects_trailing_garbage() {
        assert_eq!(parse_configuration("{base: {}} extra"), None);
        // 尾随注释没问题
        assert!(parse_configuration("{base: {}} // done").is_some());
    }

    #[test]
    fn test_rejects_non_object() {
        assert_eq!(parse_configuration("\"base\""), None);
        assert_eq!(parse_configuration("[1, 2]"), None);
    }

    #[test]
    fn test_defaults_must_reference_declared_group() {
        let src = r#"{
            variant: { size: { small: { card: { padding: 4 } } } },
            defaults: { size: "small" },
        }"#;
        assert!(parse_configuration(src).is_some());

        let src = r#"{
            variant: { size: { small: { card: { padding: 4 } } } },
            defaults: { tone: "dark" },
        }"#;
        assert_eq!(parse_configuration(src), None);
    }

    #[test]
    fn test_merge_list_at_sheet_level_is_pre_merged() {
        let config = parse_configuration(
            r#"{
                base: {
                    card: [
                        { fontSize: "1.25rem", padding: "1rem" },
                        { background: "black", color: "white", padding: "0.5rem" },
                    ],
                },
            }"#,
        )
        .unwrap();

        let base = config.base.unwrap();
        let card = base.get("card").unwrap();
        assert_eq!(card.len(), 4);
        assert_eq!(
            card.get("padding"),
            Some(&StyleEntry::Value(StyleValue::str("0.5rem")))
        );
    }

    #[test]
    fn test_value_list_and_merge_list_entries() {
        let config = parse_configuration(
            r#"{
                base: {
                    card: {
                        margin: [0, "auto"],
                        inner: [{ padding: 4 }, { padding: 8 }],
                    },
                },
            }"#,
        )
        .unwrap();

        let base = config.base.unwrap();
        let card = base.get("card").unwrap();
        assert_eq!(
            card.get("margin"),
            Some(&StyleEntry::List(vec![
                StyleValue::num(0.0),
                StyleValue::str("auto"),
            ]))
        );
        assert!(matches!(card.get("inner"), Some(StyleEntry::Merge(_))));
    }

    #[test]
    fn test_mixed_array_is_rejected() {
        assert_eq!(
            parse_configuration(r#"{base: {card: {margin: [0, {padding: 4}]}}}"#),
            None
        );
    }

    #[test]
    fn test_variable_references() {
        let config = parse_configuration(
            r##"{base: {card: {background: cv("--background", "#111")}}}"##,
        )
        .unwrap();

        let base = config.base.unwrap();
        let card = base.get("card").unwrap();
        assert_eq!(
            card.get("background"),
            Some(&StyleEntry::Value(StyleValue::var_with(
                "--background",
                VarFallback::Str("#111".to_string()),
            )))
        );
    }

    #[test]
    fn test_unsupported_syntax_degrades_to_none() {
        // 三元表达式不在文法内
        assert_eq!(
            parse_configuration(r#"{base: {card: {padding: dark ? 4 : 8}}}"#),
            None
        );
    }

    #[test]
    fn test_resolver_failure_degrades_to_none() {
        use crate::value::NoResolver;
        let mut resolver = NoResolver;
        assert_eq!(
            parse_configuration_with_resolver(
                r#"{base: {card: {padding: tokens.space}}}"#,
                &mut resolver,
            ),
            None
        );
    }
}
