use ct_core::types::{StyleValue, VarFallback};
use phf::phf_set;

/// 数字值不追加 `px` 的属性集合
static UNITLESS: phf::Set<&'static str> = phf_set! {
    "line-height",
    "font-weight",
    "opacity",
    "z-index",
    "flex",
    "flex-grow",
    "flex-shrink",
    "order",
    "grid-row",
    "grid-column",
};

/// camelCase → kebab-case
///
/// 小写字母/数字与大写字母之间插入连字符，然后整体小写。
/// `backgroundColor` → `background-color`，`WebkitTransform` → `webkit-transform`
pub fn camel_to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// 格式化单个样式值（已知 kebab-case 属性名）
///
/// - 数字：属性不在 UNITLESS 集合中时追加 `px`
/// - 字符串：原样输出
/// - 变量引用：`var(name)` / `var(name, fallback)`，
///   fallback 走同一套属性感知的单位规则
fn format_value_kebab(property: &str, value: &StyleValue) -> String {
    match value {
        StyleValue::Str(text) => text.clone(),
        StyleValue::Num(number) => number_text(*number, UNITLESS.contains(property)),
        StyleValue::Var { name, fallback } => match fallback {
            None => format!("var({})", name),
            Some(fallback) => {
                // 单位规则在变量回退格式化之前按属性名判定：
                // 无单位属性的数字回退不会得到 px
                let text = match fallback {
                    VarFallback::Str(text) => text.clone(),
                    VarFallback::Num(number) => {
                        number_text(*number, UNITLESS.contains(property))
                    }
                };
                format!("var({}, {})", name, text)
            }
        },
    }
}

/// 格式化单个样式值（属性名可以是 camelCase）
pub fn format_value(property: &str, value: &StyleValue) -> String {
    format_value_kebab(&camel_to_kebab(property), value)
}

/// 格式化一条完整声明：`padding:8px`
///
/// 也用于内联 style 属性的单条输出。
pub fn format_declaration(property: &str, value: &StyleValue) -> String {
    let kebab = camel_to_kebab(property);
    let text = format_value_kebab(&kebab, value);
    format!("{}:{}", kebab, text)
}

/// 空格连接的值列表：`margin: [0, "auto"]` → `margin:0px auto`
pub fn format_list_declaration(property: &str, values: &[StyleValue]) -> String {
    let kebab = camel_to_kebab(property);
    let parts: Vec<String> = values
        .iter()
        .map(|value| format_value_kebab(&kebab, value))
        .collect();
    format!("{}:{}", kebab, parts.join(" "))
}

/// 整数不输出小数部分（`8` → `8px` 而不是 `8.0px`）
fn number_text(number: f64, unitless: bool) -> String {
    let text = if number.fract() == 0.0 {
        format!("{}", number as i64)
    } else {
        format!("{}", number)
    };
    if unitless {
        text
    } else {
        format!("{}px", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_core::types::StyleValue;

    #[test]
    fn test_camel_to_kebab() {
        assert_eq!(camel_to_kebab("backgroundColor"), "background-color");
        assert_eq!(camel_to_kebab("fontSize"), "font-size");
        assert_eq!(camel_to_kebab("padding"), "padding");
        assert_eq!(camel_to_kebab("WebkitTransform"), "webkit-transform");
        assert_eq!(camel_to_kebab("gridColumn"), "grid-column");
    }

    #[test]
    fn test_unit_coercion() {
        assert_eq!(
            format_declaration("padding", &StyleValue::num(8.0)),
            "padding:8px"
        );
        assert_eq!(
            format_declaration("opacity", &StyleValue::num(0.8)),
            "opacity:0.8"
        );
        assert_eq!(
            format_declaration("fontWeight", &StyleValue::num(600.0)),
            "font-weight:600"
        );
        assert_eq!(
            format_declaration("zIndex", &StyleValue::num(10.0)),
            "z-index:10"
        );
        assert_eq!(
            format_declaration("margin", &StyleValue::num(-4.0)),
            "margin:-4px"
        );
    }

    #[test]
    fn test_string_values_verbatim() {
        assert_eq!(
            format_declaration("fontSize", &StyleValue::str("1.25rem")),
            "font-size:1.25rem"
        );
    }

    #[test]
    fn test_variable_formatting() {
        assert_eq!(
            format_declaration("backgroundColor", &StyleValue::var("--background")),
            "background-color:var(--background)"
        );
        assert_eq!(
            format_declaration(
                "backgroundColor",
                &StyleValue::var_with("--background", ct_core::VarFallback::Str("#111".into())),
            ),
            "background-color:var(--background, #111)"
        );
        assert_eq!(
            format_value(
                "padding",
                &StyleValue::var_with("--space", ct_core::VarFallback::Num(8.0)),
            ),
            "var(--space, 8px)"
        );
    }

    #[test]
    fn test_unitless_variable_fallback_gets_no_px() {
        // 无单位属性的数字回退不追加 px
        assert_eq!(
            format_value(
                "lineHeight",
                &StyleValue::var_with("--leading", ct_core::VarFallback::Num(1.5)),
            ),
            "var(--leading, 1.5)"
        );
        assert_eq!(
            format_value(
                "opacity",
                &StyleValue::var_with("--alpha", ct_core::VarFallback::Num(1.0)),
            ),
            "var(--alpha, 1)"
        );
    }

    #[test]
    fn test_list_declaration() {
        assert_eq!(
            format_list_declaration(
                "margin",
                &[StyleValue::num(0.0), StyleValue::str("auto")],
            ),
            "margin:0px auto"
        );
    }
}
