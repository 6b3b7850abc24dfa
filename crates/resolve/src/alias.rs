//! 路径别名表与 tsconfig `paths` 加载
//!
//! 别名来自两处：构建层直接配置的表，和项目 `tsconfig.json` 的
//! `compilerOptions.paths`（沿 `extends` 链合并，子级覆盖父级）。
//! tsconfig 允许注释和尾随逗号，先剥掉再交给 serde_json。
//! 清单缺失/不可读一律降级为空表，绝不报错。

use std::path::{Path, PathBuf};

/// 一条别名规则：模式里至多一个 `*` 通配
#[derive(Debug, Clone, PartialEq, Eq)]
struct AliasPattern {
    pattern: String,
    targets: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    patterns: Vec<AliasPattern>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn add(&mut self, pattern: impl Into<String>, target: impl Into<String>) {
        self.patterns.push(AliasPattern {
            pattern: pattern.into(),
            targets: vec![target.into()],
        });
    }

    pub fn add_targets(&mut self, pattern: impl Into<String>, targets: Vec<String>) {
        self.patterns.push(AliasPattern {
            pattern: pattern.into(),
            targets,
        });
    }

    /// 解析一个模块说明符，返回按优先级排好的候选目标路径
    ///
    /// 精确匹配优先；通配模式按"最长模式优先"，
    /// `*` 捕获的部分替换进目标里的 `*`。
    pub fn resolve(&self, specifier: &str) -> Vec<String> {
        let mut candidates = Vec::new();

        // 精确匹配
        for alias in &self.patterns {
            if !alias.pattern.contains('*') && alias.pattern == specifier {
                candidates.extend(alias.targets.iter().cloned());
            }
        }

        // 通配匹配，最长模式优先
        let mut wildcards: Vec<&AliasPattern> = self
            .patterns
            .iter()
            .filter(|alias| alias.pattern.contains('*'))
            .collect();
        wildcards.sort_by_key(|alias| std::cmp::Reverse(alias.pattern.len()));

        for alias in wildcards {
            let Some((prefix, suffix)) = alias.pattern.split_once('*') else {
                continue;
            };
            if specifier.len() < prefix.len() + suffix.len()
                || !specifier.starts_with(prefix)
                || !specifier.ends_with(suffix)
            {
                continue;
            }
            let captured = &specifier[prefix.len()..specifier.len() - suffix.len()];
            for target in &alias.targets {
                candidates.push(target.replacen('*', captured, 1));
            }
        }

        candidates
    }
}

/// 从项目清单加载 `paths` 表（支持 `extends` 链）
pub fn load_tsconfig_paths(project_root: &Path) -> AliasTable {
    let mut table = AliasTable::new();
    let mut chain = Vec::new();
    collect_tsconfig_chain(&project_root.join("tsconfig.json"), &mut chain, 0);

    // 父级在前、子级在后：后加的同名模式排在后面，
    // resolve 时精确匹配全部收集，子级候选自然靠后——
    // 这里反过来，让子级覆盖父级
    for config in chain.iter().rev() {
        let Some(options) = config.get("compilerOptions") else {
            continue;
        };
        let base_url = options
            .get("baseUrl")
            .and_then(|value| value.as_str())
            .unwrap_or(".");
        let Some(paths) = options.get("paths").and_then(|value| value.as_object()) else {
            continue;
        };
        for (pattern, targets) in paths {
            let Some(targets) = targets.as_array() else {
                continue;
            };
            let resolved: Vec<String> = targets
                .iter()
                .filter_map(|target| target.as_str())
                .map(|target| join_base(base_url, target))
                .collect();
            if !resolved.is_empty() {
                table.add_targets(pattern.clone(), resolved);
            }
        }
    }
    table
}

fn join_base(base_url: &str, target: &str) -> String {
    if base_url == "." || base_url.is_empty() {
        target.to_string()
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), target)
    }
}

fn collect_tsconfig_chain(path: &Path, chain: &mut Vec<serde_json::Value>, hops: usize) {
    // extends 链防环
    if hops > 8 {
        return;
    }
    let Ok(text) = std::fs::read_to_string(path) else {
        return;
    };
    let Ok(config) = serde_json::from_str::<serde_json::Value>(&strip_json_comments(&text))
    else {
        return;
    };
    if let Some(parent) = config.get("extends").and_then(|value| value.as_str()) {
        let mut parent_path = path
            .parent()
            .map(|dir| dir.join(parent))
            .unwrap_or_else(|| PathBuf::from(parent));
        if parent_path.extension().is_none() {
            parent_path.set_extension("json");
        }
        collect_tsconfig_chain(&parent_path, chain, hops + 1);
    }
    chain.push(config);
}

/// 剥掉 JSONC 的注释和尾随逗号
pub fn strip_json_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut cursor = 0;
    while cursor < bytes.len() {
        match bytes[cursor] {
            b'"' => {
                let start = cursor;
                cursor += 1;
                while cursor < bytes.len() {
                    match bytes[cursor] {
                        b'\\' => cursor += 2,
                        b'"' => {
                            cursor += 1;
                            break;
                        }
                        _ => cursor += 1,
                    }
                }
                out.extend_from_slice(&bytes[start..cursor.min(bytes.len())]);
            }
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
            b',' => {
                // 尾随逗号：后面只有空白/注释就到收尾括号的，丢掉
                let mut ahead = cursor + 1;
                loop {
                    match bytes.get(ahead) {
                        Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => ahead += 1,
                        Some(b'/') if bytes.get(ahead + 1) == Some(&b'/') => {
                            while ahead < bytes.len() && bytes[ahead] != b'\n' {
                                ahead += 1;
                            }
                        }
                        Some(b'/') if bytes.get(ahead + 1) == Some(&b'*') => {
                            ahead += 2;
                            while ahead + 1 < bytes.len()
                                && !(bytes[ahead] == b'*' && bytes[ahead + 1] == b'/')
                            {
                                ahead += 1;
                            }
                            ahead = (ahead + 2).min(bytes.len());
                        }
                        _ => break,
                    }
                }
                if matches!(bytes.get(ahead), Some(b'}') | Some(b']')) {
                    cursor += 1; // 丢掉逗号本身
                } else {
                    out.push(b',');
                    cursor += 1;
                }
            }
            byte => {
                out.push(byte);
                cursor += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_alias() {
        let mut table = AliasTable::new();
        table.add("theme", "src/theme/index.ts");
        assert_eq!(table.resolve("theme"), vec!["src/theme/index.ts"]);
        assert!(table.resolve("theme/colors").is_empty());
    }

    #[test]
    fn test_wildcard_longest_pattern_first() {
        let mut table = AliasTable::new();
        table.add("@/*", "src/*");
        table.add("@/components/*", "src/ui/components/*");

        let candidates = table.resolve("@/components/Button");
        assert_eq!(
            candidates,
            vec![
                "src/ui/components/Button".to_string(),
                "src/components/Button".to_string(),
            ]
        );
    }

    #[test]
    fn test_suffix_wildcard() {
        let mut table = AliasTable::new();
        table.add("*.tokens", "design/*.tokens.ts");
        assert_eq!(table.resolve("app.tokens"), vec!["design/app.tokens.ts"]);
    }

    #[test]
    fn test_strip_json_comments() {
        let jsonc = r#"{
            // 行注释
            "compilerOptions": {
                /* 块注释 */
                "baseUrl": ".",
                "paths": {
                    "@/*": ["src/*"],
                },
            },
        }"#;
        let value: serde_json::Value =
            serde_json::from_str(&strip_json_comments(jsonc)).unwrap();
        assert_eq!(
            value["compilerOptions"]["paths"]["@/*"][0],
            serde_json::json!("src/*")
        );
    }

    #[test]
    fn test_comment_chars_inside_strings_survive() {
        let jsonc = r#"{"url": "https://example.com", "glob": "a/*"}"#;
        let stripped = strip_json_comments(jsonc);
        assert_eq!(stripped, jsonc);
    }

    #[test]
    fn test_missing_tsconfig_degrades_to_empty() {
        let table = load_tsconfig_paths(Path::new("/definitely/not/a/project"));
        assert!(table.is_empty());
    }
}
