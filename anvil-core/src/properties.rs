//! Property reference resolution
//!
//! Raw attribute strings may contain `${name}` references that are resolved
//! against a [`PropertyContext`] before type coercion. A raw string that is
//! exactly one reference yields the resolved value with its native type
//! intact (so object-valued properties can be injected by reference);
//! anything else concatenates to text. `$$` escapes a literal dollar sign,
//! `$x` stays as-is, and an unterminated `${` is a syntax error.

use crate::error::ConfigError;
use crate::value::Value;

/// Resolves property names to values. The engine only ever reads.
pub trait PropertyContext {
    fn resolve(&self, name: &str) -> Option<Value>;
}

impl PropertyContext for std::collections::HashMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl PropertyContext for std::collections::HashMap<String, String> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).map(|s| Value::Text(s.clone()))
    }
}

/// What to do when a referenced property is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndefinedPolicy {
    /// Substitute the empty string.
    #[default]
    Empty,
    /// Fail with an undefined-property error.
    Error,
}

enum Fragment<'a> {
    Text(&'a str),
    Reference(&'a str),
}

fn parse_fragments(raw: &str) -> Result<Vec<Fragment<'_>>, ConfigError> {
    let mut fragments = Vec::new();
    let mut prev = 0;

    while let Some(found) = raw[prev..].find('$') {
        let pos = prev + found;
        if pos > prev {
            fragments.push(Fragment::Text(&raw[prev..pos]));
        }
        let mut rest = raw[pos + 1..].chars();
        match rest.next() {
            // trailing dollar sign
            None => {
                fragments.push(Fragment::Text("$"));
                prev = pos + 1;
            }
            // "$$" collapses to one literal dollar
            Some('$') => {
                fragments.push(Fragment::Text("$"));
                prev = pos + 2;
            }
            Some('{') => {
                let Some(end) = raw[pos..].find('}') else {
                    return Err(ConfigError::malformed_property(raw));
                };
                fragments.push(Fragment::Reference(&raw[pos + 2..pos + end]));
                prev = pos + end + 1;
            }
            // "$x" stays literal
            Some(c) => {
                let end = pos + 1 + c.len_utf8();
                fragments.push(Fragment::Text(&raw[pos..end]));
                prev = end;
            }
        }
    }
    if prev < raw.len() {
        fragments.push(Fragment::Text(&raw[prev..]));
    }
    Ok(fragments)
}

/// Resolve all property references in `raw`.
pub fn expand(
    raw: &str,
    context: &dyn PropertyContext,
    policy: UndefinedPolicy,
) -> Result<Value, ConfigError> {
    let fragments = parse_fragments(raw)?;

    // A lone reference keeps the resolved value's native type.
    if let [Fragment::Reference(name)] = fragments.as_slice() {
        return match context.resolve(name) {
            Some(value) => Ok(value),
            None => match policy {
                UndefinedPolicy::Empty => Ok(Value::Text(String::new())),
                UndefinedPolicy::Error => Err(ConfigError::undefined_property(*name)),
            },
        };
    }

    let mut out = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Text(s) => out.push_str(s),
            Fragment::Reference(name) => match context.resolve(name) {
                Some(value) => out.push_str(&value.to_text()),
                None => match policy {
                    UndefinedPolicy::Empty => {}
                    UndefinedPolicy::Error => {
                        return Err(ConfigError::undefined_property(name));
                    }
                },
            },
        }
    }
    Ok(Value::Text(out))
}

/// Resolve property references in `raw` and coerce the result into `V`:
/// the full attribute conversion pipeline.
pub fn convert<V: crate::value::FromValue>(
    raw: &str,
    context: &dyn PropertyContext,
    policy: UndefinedPolicy,
) -> Result<V, ConfigError> {
    V::from_value(expand(raw, context, policy)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn ctx(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn literal_text_is_a_passthrough() {
        let c = ctx(&[]);
        assert_eq!(
            expand("plain", &c, UndefinedPolicy::Empty).unwrap(),
            Value::Text("plain".into())
        );
        assert_eq!(
            expand("", &c, UndefinedPolicy::Empty).unwrap(),
            Value::Text(String::new())
        );
    }

    #[test]
    fn substitutes_in_the_middle() {
        let c = ctx(&[("x", "1")]);
        assert_eq!(
            expand("a${x}b", &c, UndefinedPolicy::Empty).unwrap(),
            Value::Text("a1b".into())
        );
    }

    #[test]
    fn lone_reference_keeps_native_type() {
        let mut c: HashMap<String, Value> = HashMap::new();
        c.insert("p".into(), Value::Path("/tmp/dir".into()));
        assert_eq!(
            expand("${p}", &c, UndefinedPolicy::Empty).unwrap(),
            Value::Path("/tmp/dir".into())
        );
        // Embedded in text, the same value is stringified.
        assert_eq!(
            expand("pre${p}post", &c, UndefinedPolicy::Empty).unwrap(),
            Value::Text("pre/tmp/dirpost".into())
        );
    }

    #[test]
    fn dollar_escaping() {
        let c = ctx(&[("x", "1")]);
        assert_eq!(
            expand("$$${x}", &c, UndefinedPolicy::Empty).unwrap(),
            Value::Text("$1".into())
        );
        assert_eq!(
            expand("cost: $5", &c, UndefinedPolicy::Empty).unwrap(),
            Value::Text("cost: $5".into())
        );
        assert_eq!(
            expand("end$", &c, UndefinedPolicy::Empty).unwrap(),
            Value::Text("end$".into())
        );
    }

    #[test]
    fn unterminated_reference_is_malformed() {
        let c = ctx(&[]);
        let err = expand("a${oops", &c, UndefinedPolicy::Empty).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::MalformedPropertyReference { .. }
        ));
    }

    #[test]
    fn convert_is_a_passthrough_for_plain_text() {
        let c = ctx(&[("n", "7")]);
        assert_eq!(convert::<i32>("42", &c, UndefinedPolicy::Empty).unwrap(), 42);
        assert_eq!(convert::<i32>("${n}", &c, UndefinedPolicy::Empty).unwrap(), 7);
        assert!(convert::<bool>("true", &c, UndefinedPolicy::Empty).unwrap());
        assert!(convert::<bool>("treu", &c, UndefinedPolicy::Empty).is_err());
    }

    #[test]
    fn undefined_policy_selects_behavior() {
        let c = ctx(&[]);
        assert_eq!(
            expand("a${gone}b", &c, UndefinedPolicy::Empty).unwrap(),
            Value::Text("ab".into())
        );
        let err = expand("a${gone}b", &c, UndefinedPolicy::Error).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UndefinedProperty { .. }));
        let err = expand("${gone}", &c, UndefinedPolicy::Error).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UndefinedProperty { .. }));
    }
}
