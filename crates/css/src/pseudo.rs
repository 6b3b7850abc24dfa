//! Pseudo-class / pseudo-element key recognition.
//!
//! Declaration keys may name a pseudo directly (`hover`, `focusWithin`,
//! `before`) or carry an explicit `:` / `::` prefix. This module is the
//! single source of truth for which names are recognized and which prefix
//! they get.

use phf::phf_set;

use crate::format::camel_to_kebab;

/// Pseudo-elements get the `::` prefix.
static PSEUDO_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "after",
    "backdrop",
    "before",
    "cue",
    "file-selector-button",
    "first-letter",
    "first-line",
    "marker",
    "placeholder",
    "selection",
};

/// Pseudo-classes get the `:` prefix.
static PSEUDO_CLASSES: phf::Set<&'static str> = phf_set! {
    "active",
    "checked",
    "default",
    "disabled",
    "empty",
    "enabled",
    "first-child",
    "first-of-type",
    "focus",
    "focus-visible",
    "focus-within",
    "hover",
    "in-range",
    "indeterminate",
    "invalid",
    "last-child",
    "last-of-type",
    "link",
    "only-child",
    "only-of-type",
    "optional",
    "out-of-range",
    "read-only",
    "read-write",
    "required",
    "root",
    "target",
    "valid",
    "visited",
};

/// Resolves a declaration key to a selector suffix, or `None` when the key
/// is not a pseudo (and should be treated as a plain nested selector).
///
/// # Examples
/// - `"hover"` → `":hover"`
/// - `"focusWithin"` → `":focus-within"`
/// - `"before"` → `"::before"`
/// - `":not(:last-child)"` → unchanged (already prefixed)
/// - `"ul"` → `None`
pub fn pseudo_selector(key: &str) -> Option<String> {
    if key.starts_with(':') {
        return Some(key.to_string());
    }
    let kebab = camel_to_kebab(key);
    if PSEUDO_ELEMENTS.contains(kebab.as_str()) {
        return Some(format!("::{}", kebab));
    }
    if PSEUDO_CLASSES.contains(kebab.as_str()) {
        return Some(format!(":{}", kebab));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pseudo_class() {
        assert_eq!(pseudo_selector("hover").as_deref(), Some(":hover"));
        assert_eq!(
            pseudo_selector("focusWithin").as_deref(),
            Some(":focus-within")
        );
        assert_eq!(
            pseudo_selector("first-child").as_deref(),
            Some(":first-child")
        );
    }

    #[test]
    fn test_pseudo_element() {
        assert_eq!(pseudo_selector("before").as_deref(), Some("::before"));
        assert_eq!(
            pseudo_selector("firstLetter").as_deref(),
            Some("::first-letter")
        );
        assert_eq!(pseudo_selector("selection").as_deref(), Some("::selection"));
    }

    #[test]
    fn test_already_prefixed_passthrough() {
        assert_eq!(
            pseudo_selector(":nth-child(2n)").as_deref(),
            Some(":nth-child(2n)")
        );
        assert_eq!(pseudo_selector("::after").as_deref(), Some("::after"));
    }

    #[test]
    fn test_plain_selectors_are_not_pseudo() {
        assert_eq!(pseudo_selector("ul"), None);
        assert_eq!(pseudo_selector("span.icon"), None);
    }
}
