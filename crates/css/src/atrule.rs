//! At-rule keys and breakpoint/container shorthand resolution.
//!
//! Shorthand forms over the configured `breakpoints` table:
//! - `@sm`      → `@media (width >= 25rem)`
//! - `!@sm`     → `@media (width <= 25rem)`
//! - `@(sm,lg)` → `@media (25rem < width < 64rem)`
//!
//! Container aliases resolve over their configured `rule` text instead of a
//! length, with the optional container name after `@container`; two container
//! rules referenced in the range form combine with `and`.

use indexmap::IndexMap;

/// 容器别名：可选的容器名 + 查询规则文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerAlias {
    pub name: Option<String>,
    pub rule: String,
}

/// Keys starting with `@` (or the negated `!@` shorthand) open an at-rule
/// block instead of a nested selector.
pub fn is_at_rule_key(key: &str) -> bool {
    key.starts_with('@') || key.starts_with("!@")
}

/// Resolves an at-rule key to the at-rule text the emitted block is wrapped
/// in. Full at-rules pass through; shorthand aliases resolve against the
/// configured tables. Returns `None` for a shorthand that references no
/// configured alias (the block is dropped rather than emitting broken CSS).
pub fn resolve_at_rule(
    key: &str,
    breakpoints: &IndexMap<String, String>,
    containers: &IndexMap<String, ContainerAlias>,
) -> Option<String> {
    // Written-out at-rules pass through untouched.
    for prefix in ["@media", "@container", "@supports", "@layer"] {
        if key.starts_with(prefix) {
            return Some(key.to_string());
        }
    }

    // !@name → upper-bounded query
    if let Some(alias) = key.strip_prefix("!@") {
        if let Some(value) = breakpoints.get(alias) {
            return Some(format!("@media (width <= {})", value));
        }
        if let Some(container) = containers.get(alias) {
            return Some(match &container.name {
                Some(name) => format!("@container {} not ({})", name, container.rule),
                None => format!("@container not ({})", container.rule),
            });
        }
        return None;
    }

    // @(a,b) → range query
    if let Some(inner) = key.strip_prefix("@(").and_then(|rest| rest.strip_suffix(')')) {
        let mut parts = inner.splitn(2, ',');
        let low = parts.next()?.trim();
        let high = parts.next()?.trim();
        if let (Some(low), Some(high)) = (breakpoints.get(low), breakpoints.get(high)) {
            return Some(format!("@media ({} < width < {})", low, high));
        }
        if let (Some(low), Some(high)) = (containers.get(low), containers.get(high)) {
            let prefix = match &low.name {
                Some(name) => format!("@container {} ", name),
                None => "@container ".to_string(),
            };
            return Some(format!("{}({}) and ({})", prefix, low.rule, high.rule));
        }
        return None;
    }

    // @name → lower-bounded query
    if let Some(alias) = key.strip_prefix('@') {
        if let Some(value) = breakpoints.get(alias) {
            return Some(format!("@media (width >= {})", value));
        }
        if let Some(container) = containers.get(alias) {
            return Some(match &container.name {
                Some(name) => format!("@container {} ({})", name, container.rule),
                None => format!("@container ({})", container.rule),
            });
        }
        // Not an alias: keep the authored at-rule as written (`@page`, …).
        return Some(key.to_string());
    }

    None
}
