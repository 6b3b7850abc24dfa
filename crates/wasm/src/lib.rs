use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use ct_core::types::{StyleDeclaration, StyleSheet, StyleValue};
use ct_core::CompiledConfig;
use ct_css::{format_declaration, ContainerAlias, EmitOptions};
use ct_transform::{transform_source as rs_transform_source, TransformOptions};

// ── JS 侧 serde 镜像类型 ──────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsTransformOptions {
    #[serde(default = "default_fn_name")]
    fn_name: String,
    #[serde(default = "default_builder_name")]
    builder_name: String,
    #[serde(default)]
    breakpoints: IndexMap<String, String>,
    #[serde(default)]
    containers: IndexMap<String, JsContainerAlias>,
    #[serde(default)]
    utilities: StyleSheet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsContainerAlias {
    #[serde(default)]
    name: Option<String>,
    rule: String,
}

fn default_fn_name() -> String {
    "ct".to_string()
}

fn default_builder_name() -> String {
    "Ct".to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsTransformResult {
    code: String,
    css: String,
    /// 每个完成编译的调用点的类名映射（按出现顺序）
    sites: Vec<CompiledConfig>,
}

// ── 类型转换 ──────────────────────────────────────────────────

impl From<JsContainerAlias> for ContainerAlias {
    fn from(alias: JsContainerAlias) -> Self {
        ContainerAlias {
            name: alias.name,
            rule: alias.rule,
        }
    }
}

impl From<JsTransformOptions> for TransformOptions {
    fn from(options: JsTransformOptions) -> Self {
        TransformOptions {
            fn_name: options.fn_name,
            builder_name: options.builder_name,
            emit: EmitOptions {
                breakpoints: options.breakpoints,
                containers: options
                    .containers
                    .into_iter()
                    .map(|(alias, container)| (alias, container.into()))
                    .collect(),
                utilities: options.utilities,
            },
        }
    }
}

fn parse_options(options: JsValue) -> Result<JsTransformOptions, JsError> {
    if options.is_undefined() || options.is_null() {
        Ok(JsTransformOptions {
            fn_name: default_fn_name(),
            builder_name: default_builder_name(),
            breakpoints: IndexMap::new(),
            containers: IndexMap::new(),
            utilities: StyleSheet::new(),
        })
    } else {
        serde_wasm_bindgen::from_value(options)
            .map_err(|e| JsError::new(&format!("Invalid options: {}", e)))
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    value
        .serialize(&serializer)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

// ── WASM 导出函数 ─────────────────────────────────────────────

/// 初始化 panic hook（自动调用）
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// 转换一份源码
///
/// wasm 侧没有文件系统，跨模块静态解析不可用：
/// 含非字面表达式的调用点按"不可识别"原样保留。
///
/// @param source   - 源码字符串
/// @param moduleId - 模块 id，作为类名指纹的 salt
/// @param options  - 转换选项（断点/容器/工具表），可选
/// @returns `{ code, css, sites }`
#[wasm_bindgen(js_name = "transformSource")]
pub fn transform_source(
    source: &str,
    module_id: &str,
    options: JsValue,
) -> Result<JsValue, JsError> {
    let options: TransformOptions = parse_options(options)?.into();
    let result = rs_transform_source(source, module_id, &options, None)
        .map_err(|e| JsError::new(&e.to_string()))?;
    to_js(&JsTransformResult {
        code: result.code,
        css: result.css,
        sites: result.sites.into_iter().map(|site| site.config).collect(),
    })
}

/// 把一段调用实参文本解析为结构化配置；解析不了返回 null
#[wasm_bindgen(js_name = "parseConfiguration")]
pub fn parse_configuration(text: &str) -> Result<JsValue, JsError> {
    match ct_parse::parse_configuration(text) {
        Some(config) => to_js(&config),
        None => Ok(JsValue::NULL),
    }
}

/// 运行时侧的规则发射：`emitRules("ct_xxx", {...}, options)`
#[wasm_bindgen(js_name = "emitRules")]
pub fn emit_rules(
    class_name: &str,
    declaration: JsValue,
    options: JsValue,
) -> Result<Vec<String>, JsError> {
    let declaration: StyleDeclaration = serde_wasm_bindgen::from_value(declaration)
        .map_err(|e| JsError::new(&format!("Invalid declaration: {}", e)))?;
    let options: TransformOptions = parse_options(options)?.into();
    Ok(ct_css::emit_rules(class_name, &declaration, &options.emit))
}

/// 类名指纹：与编译产物里的类名同源同值
#[wasm_bindgen(js_name = "fingerprintClassName")]
pub fn fingerprint_class_name(
    key: &str,
    declaration: JsValue,
    salt: &str,
) -> Result<String, JsError> {
    let declaration: StyleDeclaration = serde_wasm_bindgen::from_value(declaration)
        .map_err(|e| JsError::new(&format!("Invalid declaration: {}", e)))?;
    Ok(ct_core::fingerprint_class_name(key, &declaration, salt))
}

/// 单条声明格式化（内联 style 属性用）
#[wasm_bindgen(js_name = "formatDeclaration")]
pub fn format_declaration_js(property: &str, value: JsValue) -> Result<String, JsError> {
    let value: StyleValue = serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsError::new(&format!("Invalid value: {}", e)))?;
    Ok(format_declaration(property, &value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_mirror_into_transform_options() {
        let json = serde_json::json!({
            "fnName": "css",
            "breakpoints": { "sm": "25rem" },
            "containers": { "card": { "name": "card", "rule": "width >= 20rem" } },
        });
        let options: JsTransformOptions = serde_json::from_value(json).unwrap();
        let options: TransformOptions = options.into();

        assert_eq!(options.fn_name, "css");
        assert_eq!(options.builder_name, "Ct");
        assert_eq!(options.emit.breakpoints["sm"], "25rem");
        assert_eq!(
            options.emit.containers["card"].rule,
            "width >= 20rem"
        );
    }
}
