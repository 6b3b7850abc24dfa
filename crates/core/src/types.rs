use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// CSS 变量引用的回退值，只允许原始值（字符串或数字）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarFallback {
    Str(String),
    Num(f64),
}

/// 样式值：原始值（字符串/数字）或 CSS 变量引用
///
/// 序列化形状与运行时 `cv()` 产生的对象一致，
/// 保证两侧的指纹输入完全相同。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Str(String),
    Num(f64),
    Var {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        fallback: Option<VarFallback>,
    },
}

impl StyleValue {
    pub fn str(value: impl Into<String>) -> Self {
        StyleValue::Str(value.into())
    }

    pub fn num(value: f64) -> Self {
        StyleValue::Num(value)
    }

    /// CSS 变量引用，如 `cv("--background")`
    pub fn var(name: impl Into<String>) -> Self {
        StyleValue::Var {
            name: name.into(),
            fallback: None,
        }
    }

    /// 带回退值的 CSS 变量引用，如 `cv("--space", 8)`
    pub fn var_with(name: impl Into<String>, fallback: VarFallback) -> Self {
        StyleValue::Var {
            name: name.into(),
            fallback: Some(fallback),
        }
    }
}

/// 一条声明里的一项：
/// 直接值、空格连接的值列表、嵌套块（伪类/选择器/at 规则）、
/// 或按 §合并规则 从左到右合并的声明列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleEntry {
    Value(StyleValue),
    List(Vec<StyleValue>),
    Nested(StyleDeclaration),
    Merge(Vec<StyleDeclaration>),
}

/// 有序的 属性/选择器 → 项 映射（IndexMap 保证输出顺序稳定）
pub type StyleDeclaration = IndexMap<String, StyleEntry>;

/// 类键 → 声明。`global` 表中键是原始 CSS 选择器
pub type StyleSheet = IndexMap<String, StyleDeclaration>;

/// 变体组名 → 变体名 → 部分样式表
pub type VariantSheet = IndexMap<String, IndexMap<String, StyleSheet>>;

/// 变体组名 → 默认选中的变体名
pub type VariantSelection = IndexMap<String, String>;

/// 作者书写的顶层配置单元
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CtConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<StyleSheet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<StyleSheet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSheet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<VariantSelection>,
}

impl CtConfig {
    /// 校验作者约定（变量名必须以 `--` 开头、defaults 引用的组必须存在）。
    ///
    /// 违反约定属于书写错误，必须立刻报错而不是静默产出坏 CSS。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(sheet) = &self.global {
            validate_sheet(sheet)?;
        }
        if let Some(sheet) = &self.base {
            validate_sheet(sheet)?;
        }
        if let Some(variant) = &self.variant {
            for variants in variant.values() {
                for sheet in variants.values() {
                    validate_sheet(sheet)?;
                }
            }
        }
        if let Some(defaults) = &self.defaults {
            for group in defaults.keys() {
                let declared = self
                    .variant
                    .as_ref()
                    .is_some_and(|v| v.contains_key(group));
                if !declared {
                    return Err(ConfigError::UnknownVariantGroup {
                        group: group.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// 校验一张表里的全部声明
pub fn validate_sheet(sheet: &StyleSheet) -> Result<(), ConfigError> {
    for (key, decl) in sheet {
        validate_declaration(key, decl)?;
    }
    Ok(())
}

/// 校验一条声明（运行时构造入口也用它立刻拦下书写错误）
pub fn validate_declaration(key: &str, decl: &StyleDeclaration) -> Result<(), ConfigError> {
    for (prop, entry) in decl {
        match entry {
            StyleEntry::Value(value) => validate_value(prop, value)?,
            StyleEntry::List(values) => {
                for value in values {
                    validate_value(prop, value)?;
                }
            }
            StyleEntry::Nested(nested) => validate_declaration(key, nested)?,
            StyleEntry::Merge(decls) => {
                for nested in decls {
                    validate_declaration(key, nested)?;
                }
            }
        }
    }
    Ok(())
}

fn validate_value(prop: &str, value: &StyleValue) -> Result<(), ConfigError> {
    if let StyleValue::Var { name, .. } = value {
        if !name.starts_with("--") {
            return Err(ConfigError::InvalidVariableName {
                key: prop.to_string(),
                name: name.clone(),
            });
        }
    }
    Ok(())
}

/// 编译产物：与运行时之间的交换契约，
/// 作为第二个参数拼接回 `ct(...)` 调用处
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledConfig {
    #[serde(default, skip_serializing_if = "is_false")]
    pub global: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<IndexMap<String, IndexMap<String, IndexMap<String, String>>>>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(entries: &[(&str, StyleValue)]) -> StyleDeclaration {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), StyleEntry::Value(v.clone())))
            .collect()
    }

    #[test]
    fn test_validate_ok() {
        let mut base = StyleSheet::new();
        base.insert(
            "card".to_string(),
            decl(&[("background", StyleValue::var("--background"))]),
        );
        let config = CtConfig {
            base: Some(base),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_variable_name() {
        let mut base = StyleSheet::new();
        base.insert(
            "card".to_string(),
            decl(&[("background", StyleValue::var("background"))]),
        );
        let config = CtConfig {
            base: Some(base),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidVariableName {
                key: "background".to_string(),
                name: "background".to_string(),
            }
        );
    }

    #[test]
    fn test_validate_rejects_unknown_defaults_group() {
        let mut defaults = VariantSelection::new();
        defaults.insert("size".to_string(), "small".to_string());
        let config = CtConfig {
            defaults: Some(defaults),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownVariantGroup {
                group: "size".to_string(),
            }
        );
    }

    #[test]
    fn test_compiled_config_round_trip() {
        let mut base = IndexMap::new();
        base.insert("card".to_string(), "ct_0abc1234".to_string());
        let compiled = CompiledConfig {
            global: true,
            base: Some(base),
            variant: None,
        };

        let json = serde_json::to_string(&compiled).unwrap();
        assert_eq!(json, r#"{"global":true,"base":{"card":"ct_0abc1234"}}"#);

        // 交换契约必须无损往返
        let back: CompiledConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, compiled);
    }

    #[test]
    fn test_style_value_serialization_shape() {
        let json = serde_json::to_string(&StyleValue::var("--background")).unwrap();
        assert_eq!(json, r#"{"name":"--background"}"#);

        let json = serde_json::to_string(&StyleValue::var_with(
            "--space",
            VarFallback::Num(8.0),
        ))
        .unwrap();
        assert_eq!(json, r#"{"name":"--space","fallback":8.0}"#);
    }
}
