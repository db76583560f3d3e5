//! Name derivation for attributes and nested elements
//!
//! Registration uses camel-case property names ("classPath"); the exposed
//! XML forms are derived from them: elements become lowercase hyphenated
//! ("class-path"), attributes become lowercase with hyphens dropped
//! ("classpath"). Lookups normalize the other way so that derivation and
//! lookup invert each other exactly, case-insensitively.

/// Convert a camel-case property name to its hyphenated element form.
///
/// `classPath` -> `class-path`, `pathelement` -> `pathelement`.
pub fn hyphenate(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// The index key for an attribute: lowercase, hyphen-free.
///
/// Both registration names (`fooBar`) and document spellings (`foo-bar`,
/// `FooBar`) collapse to the same key (`foobar`).
pub fn attribute_key(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// The index key a registered element name is stored under.
pub fn element_key(name: &str) -> String {
    hyphenate(name)
}

/// The key a document tag is looked up under (case-insensitive match
/// against the derived hyphenated form).
pub fn element_lookup_key(tag: &str) -> String {
    tag.to_ascii_lowercase()
}

const ELEMENT_PREFIXES: &[&str] = &["create", "add", "set"];

/// Derive the exposed element name from a factory/adder/setter style method
/// name, e.g. `createClassPath` -> `class-path`. Returns `None` when the
/// name does not follow the prefix convention.
pub fn derive_element_name(method: &str) -> Option<String> {
    for prefix in ELEMENT_PREFIXES {
        if let Some(rest) = method.strip_prefix(prefix) {
            if rest.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                return Some(hyphenate(rest));
            }
        }
    }
    None
}

/// Derive the exposed attribute name from a setter style method name,
/// e.g. `setFooBar` -> `foobar`.
pub fn derive_attribute_name(method: &str) -> Option<String> {
    let rest = method.strip_prefix("set")?;
    if rest.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        Some(attribute_key(rest))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenates_camel_case() {
        assert_eq!(hyphenate("classPath"), "class-path");
        assert_eq!(hyphenate("ClassPath"), "class-path");
        assert_eq!(hyphenate("message"), "message");
        assert_eq!(hyphenate("pathElement"), "path-element");
    }

    #[test]
    fn attribute_keys_drop_hyphens() {
        assert_eq!(attribute_key("fooBar"), "foobar");
        assert_eq!(attribute_key("foo-bar"), "foobar");
        assert_eq!(attribute_key("FOOBAR"), "foobar");
    }

    #[test]
    fn derivation_round_trips_through_lookup() {
        // The derived form must be exactly what a document tag normalizes to.
        let derived = derive_element_name("createClassPath").unwrap();
        assert_eq!(derived, "class-path");
        assert_eq!(element_lookup_key("Class-Path"), derived);
        assert_eq!(element_lookup_key("class-path"), derived);

        let attr = derive_attribute_name("setFooBar").unwrap();
        assert_eq!(attr, "foobar");
        assert_eq!(attribute_key("FooBar"), attr);
    }

    #[test]
    fn derivation_requires_prefix_convention() {
        assert_eq!(derive_element_name("execute"), None);
        assert_eq!(derive_element_name("settle"), None);
        assert_eq!(derive_element_name("addendum"), None);
        assert_eq!(derive_element_name("addText"), Some("text".to_string()));
    }

    #[test]
    fn derived_names_are_stable_per_method() {
        // Two distinct conventional methods never collapse to one key unless
        // their property parts match.
        let a = derive_element_name("createFileSet").unwrap();
        let b = derive_element_name("addFileSet").unwrap();
        assert_eq!(a, b);
        let c = derive_element_name("createFileList").unwrap();
        assert_ne!(a, c);
    }
}
