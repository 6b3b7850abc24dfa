use ct_core::{fingerprint_class_name, CompiledConfig, ConfigError, CtConfig};
use ct_css::{emit_global_rules, emit_rules, EmitOptions};
use indexmap::{IndexMap, IndexSet};

/// 编译产物：类名映射 + 有序去重后的 CSS 规则
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledOutput {
    pub config: CompiledConfig,
    pub rules: Vec<String>,
}

/// 把一份作者配置编译为类名映射和 CSS 规则
///
/// 纯函数：同样的 (配置, salt, 选项) 永远得到同样的输出。
/// 先校验（书写错误立刻报），再按 global → base → variant 的顺序
/// 逐键取指纹、发射规则；重复的规则文本只保留首次出现。
pub fn compile_config(
    config: &CtConfig,
    salt: &str,
    options: &EmitOptions,
) -> Result<CompiledOutput, ConfigError> {
    config.validate()?;

    let mut rules: IndexSet<String> = IndexSet::new();
    let mut compiled = CompiledConfig::default();

    if let Some(global) = &config.global {
        compiled.global = true;
        for rule in emit_global_rules(global, options) {
            rules.insert(rule);
        }
    }

    if let Some(base) = &config.base {
        let mut map = IndexMap::new();
        for (key, declaration) in base {
            let class = fingerprint_class_name(key, declaration, salt);
            for rule in emit_rules(&class, declaration, options) {
                rules.insert(rule);
            }
            map.insert(key.clone(), class);
        }
        compiled.base = Some(map);
    }

    if let Some(variant) = &config.variant {
        let mut groups = IndexMap::new();
        for (group, variants) in variant {
            let mut by_variant = IndexMap::new();
            for (name, sheet) in variants {
                let mut by_key = IndexMap::new();
                for (key, declaration) in sheet {
                    let class = fingerprint_class_name(key, declaration, salt);
                    for rule in emit_rules(&class, declaration, options) {
                        rules.insert(rule);
                    }
                    by_key.insert(key.clone(), class);
                }
                by_variant.insert(name.clone(), by_key);
            }
            groups.insert(group.clone(), by_variant);
        }
        compiled.variant = Some(groups);
    }

    Ok(CompiledOutput {
        config: compiled,
        rules: rules.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_core::types::{StyleDeclaration, StyleEntry, StyleSheet, StyleValue};

    fn decl(entries: &[(&str, StyleValue)]) -> StyleDeclaration {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), StyleEntry::Value(v.clone())))
            .collect()
    }

    fn base_config() -> CtConfig {
        let mut base = StyleSheet::new();
        base.insert(
            "card".to_string(),
            decl(&[
                ("fontSize", StyleValue::str("1.25rem")),
                ("padding", StyleValue::num(8.0)),
            ]),
        );
        CtConfig {
            base: Some(base),
            ..Default::default()
        }
    }

    #[test]
    fn test_compile_is_deterministic() {
        let config = base_config();
        let options = EmitOptions::default();

        let first = compile_config(&config, "src/App.tsx", &options).unwrap();
        let second = compile_config(&config, "src/App.tsx", &options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_compile_base_produces_class_map_and_rules() {
        let output = compile_config(&base_config(), "mod", &EmitOptions::default()).unwrap();

        let base = output.config.base.unwrap();
        let class = base.get("card").unwrap();
        assert!(class.starts_with("ct_"));
        assert_eq!(
            output.rules,
            vec![format!(".{}{{font-size:1.25rem;padding:8px}}", class)]
        );
    }

    #[test]
    fn test_variant_only_keys_compile() {
        // 变体可以引用 base 里不存在的键
        let mut small = StyleSheet::new();
        small.insert("label".to_string(), decl(&[("fontSize", StyleValue::str("0.75rem"))]));
        let mut variants = IndexMap::new();
        variants.insert("small".to_string(), small);
        let mut variant = IndexMap::new();
        variant.insert("size".to_string(), variants);

        let config = CtConfig {
            variant: Some(variant),
            ..Default::default()
        };
        let output = compile_config(&config, "mod", &EmitOptions::default()).unwrap();

        let groups = output.config.variant.unwrap();
        let class = groups["size"]["small"].get("label").unwrap();
        assert!(class.starts_with("ct_"));
        assert_eq!(output.rules.len(), 1);
    }

    #[test]
    fn test_identical_declarations_share_rules() {
        let shared = decl(&[("padding", StyleValue::num(8.0))]);
        let mut base = StyleSheet::new();
        base.insert("a".to_string(), shared.clone());
        base.insert("b".to_string(), shared);
        let config = CtConfig {
            base: Some(base),
            ..Default::default()
        };

        let output = compile_config(&config, "mod", &EmitOptions::default()).unwrap();
        let map = output.config.base.unwrap();
        // 键参与指纹，类名不同，规则也不同
        assert_ne!(map.get("a"), map.get("b"));
        assert_eq!(output.rules.len(), 2);
    }

    #[test]
    fn test_authoring_error_is_loud() {
        let mut base = StyleSheet::new();
        base.insert(
            "card".to_string(),
            decl(&[("color", StyleValue::var("accent"))]),
        );
        let config = CtConfig {
            base: Some(base),
            ..Default::default()
        };

        let err = compile_config(&config, "mod", &EmitOptions::default()).unwrap_err();
        assert!(err.to_string().contains("accent"));
    }
}
