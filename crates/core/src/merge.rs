use crate::types::{StyleDeclaration, StyleEntry};

/// 合并多条样式声明
///
/// 规则：
/// - 从左到右合并，后者的键覆盖前者（每一层都是递归浅合并）
/// - 两侧都是嵌套块时递归合并，否则整体替换
/// - 已存在的键保持首次插入时的位置（IndexMap）
pub fn merge_declarations(decls: &[StyleDeclaration]) -> StyleDeclaration {
    let mut merged = StyleDeclaration::new();
    for decl in decls {
        merge_into(&mut merged, decl);
    }
    merged
}

/// 将 `patch` 合并进 `target`
pub fn merge_into(target: &mut StyleDeclaration, patch: &StyleDeclaration) {
    for (key, entry) in patch {
        let incoming = flatten_entry(entry);
        match (target.get_mut(key), incoming) {
            (Some(StyleEntry::Nested(existing)), StyleEntry::Nested(nested)) => {
                merge_into(existing, &nested);
            }
            (_, incoming) => {
                target.insert(key.clone(), incoming);
            }
        }
    }
}

/// 合并列表（`key: [a, b]` 形式的样式组合）先折叠成单条嵌套声明，
/// 再参与上层合并
pub fn flatten_entry(entry: &StyleEntry) -> StyleEntry {
    match entry {
        StyleEntry::Merge(decls) => StyleEntry::Nested(merge_declarations(decls)),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StyleValue;

    fn decl(entries: &[(&str, &str)]) -> StyleDeclaration {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), StyleEntry::Value(StyleValue::str(*v))))
            .collect()
    }

    #[test]
    fn test_merge_later_wins() {
        let merged = merge_declarations(&[
            decl(&[("font-size", "1.25rem"), ("padding", "1rem")]),
            decl(&[
                ("background", "black"),
                ("color", "white"),
                ("padding", "0.5rem"),
            ]),
        ]);

        assert_eq!(merged.len(), 4);
        assert_eq!(
            merged.get("padding"),
            Some(&StyleEntry::Value(StyleValue::str("0.5rem")))
        );
        // 覆盖的键保持首次插入的位置
        let keys: Vec<&str> = merged.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["font-size", "padding", "background", "color"]);
    }

    #[test]
    fn test_merge_recurses_into_nested() {
        let mut left = StyleDeclaration::new();
        left.insert(
            "hover".to_string(),
            StyleEntry::Nested(decl(&[("color", "red"), ("opacity", "0.5")])),
        );
        let mut right = StyleDeclaration::new();
        right.insert(
            "hover".to_string(),
            StyleEntry::Nested(decl(&[("color", "blue")])),
        );

        let merged = merge_declarations(&[left, right]);
        match merged.get("hover") {
            Some(StyleEntry::Nested(nested)) => {
                assert_eq!(
                    nested.get("color"),
                    Some(&StyleEntry::Value(StyleValue::str("blue")))
                );
                assert_eq!(
                    nested.get("opacity"),
                    Some(&StyleEntry::Value(StyleValue::str("0.5")))
                );
            }
            other => panic!("expected nested entry, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_replaces_on_type_mismatch() {
        let mut left = StyleDeclaration::new();
        left.insert(
            "color".to_string(),
            StyleEntry::Value(StyleValue::str("red")),
        );
        let mut right = StyleDeclaration::new();
        right.insert(
            "color".to_string(),
            StyleEntry::Nested(decl(&[("hover", "blue")])),
        );

        let merged = merge_declarations(&[left, right]);
        assert!(matches!(merged.get("color"), Some(StyleEntry::Nested(_))));
    }

    #[test]
    fn test_flatten_merge_list_before_merging() {
        let mut left = StyleDeclaration::new();
        left.insert(
            "card".to_string(),
            StyleEntry::Nested(decl(&[("padding", "1rem")])),
        );
        let mut right = StyleDeclaration::new();
        right.insert(
            "card".to_string(),
            StyleEntry::Merge(vec![
                decl(&[("margin", "0")]),
                decl(&[("padding", "2rem")]),
            ]),
        );

        let merged = merge_declarations(&[left, right]);
        match merged.get("card") {
            Some(StyleEntry::Nested(nested)) => {
                assert_eq!(
                    nested.get("padding"),
                    Some(&StyleEntry::Value(StyleValue::str("2rem")))
                );
                assert_eq!(
                    nested.get("margin"),
                    Some(&StyleEntry::Value(StyleValue::str("0")))
                );
            }
            other => panic!("expected nested entry, got {:?}", other),
        }
    }
}
