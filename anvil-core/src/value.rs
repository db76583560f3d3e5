//! Dynamic attribute values and typed coercion
//!
//! Property resolution produces a [`Value`]; attribute setters declare their
//! parameter type through [`FromValue`], which performs the textual
//! coercion. A text form that fails to parse is a conversion error; a value
//! that has no sensible route into the target type at all (an object handle
//! meeting `bool`, text meeting a component reference) is a missing
//! converter.

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::component::ComponentRef;
use crate::error::ConfigError;

/// A dynamically typed value, as produced by property resolution.
#[derive(Clone)]
pub enum Value {
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Path(PathBuf),
    Object(ComponentRef),
}

impl Value {
    /// Render the value as text, the form used when concatenating property
    /// fragments.
    pub fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Path(p) => p.display().to_string(),
            Value::Object(o) => format!("<{}>", o.borrow().type_label()),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Path(_) => "path",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Object(o) => write!(f, "Object(<{}>)", o.borrow().type_label()),
            other => write!(f, "{}({:?})", other.label(), other.to_text()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

/// A by-name handle to a registered object, the `refid`-style indirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: String,
}

impl Reference {
    pub fn new(id: impl Into<String>) -> Self {
        Reference { id: id.into() }
    }
}

/// Conversion from a resolved [`Value`] into a setter's parameter type.
pub trait FromValue: Sized {
    /// Human-readable target type name for diagnostics.
    fn type_label() -> &'static str;

    fn from_value(value: Value) -> Result<Self, ConfigError>;
}

fn conversion_error(value: &Value, target: &'static str) -> ConfigError {
    ConfigError::conversion(format!(
        "cannot convert \"{}\" to {}",
        value.to_text(),
        target
    ))
}

fn no_converter(value: &Value, target: &'static str) -> ConfigError {
    ConfigError::no_converter(value.to_text(), target)
}

impl FromValue for Value {
    fn type_label() -> &'static str {
        "value"
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        Ok(value)
    }
}

impl FromValue for String {
    fn type_label() -> &'static str {
        "string"
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(_) => Err(no_converter(&value, Self::type_label())),
            other => Ok(other.to_text()),
        }
    }
}

impl FromValue for bool {
    fn type_label() -> &'static str {
        "bool"
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        match &value {
            Value::Bool(b) => Ok(*b),
            Value::Text(s) => {
                if s.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(conversion_error(&value, Self::type_label()))
                }
            }
            Value::Object(_) => Err(no_converter(&value, Self::type_label())),
            _ => Err(conversion_error(&value, Self::type_label())),
        }
    }
}

macro_rules! int_from_value {
    ($ty:ty, $label:expr) => {
        impl FromValue for $ty {
            fn type_label() -> &'static str {
                $label
            }

            fn from_value(value: Value) -> Result<Self, ConfigError> {
                match &value {
                    Value::Int(i) => <$ty>::try_from(*i)
                        .map_err(|_| conversion_error(&value, Self::type_label())),
                    Value::Text(s) => s
                        .trim()
                        .parse::<$ty>()
                        .map_err(|_| conversion_error(&value, Self::type_label())),
                    Value::Object(_) => Err(no_converter(&value, Self::type_label())),
                    _ => Err(conversion_error(&value, Self::type_label())),
                }
            }
        }
    };
}

int_from_value!(i32, "int");
int_from_value!(i64, "long");
int_from_value!(u32, "unsigned int");
int_from_value!(u64, "unsigned long");

macro_rules! float_from_value {
    ($ty:ty, $label:expr) => {
        impl FromValue for $ty {
            fn type_label() -> &'static str {
                $label
            }

            fn from_value(value: Value) -> Result<Self, ConfigError> {
                match &value {
                    Value::Float(f) => Ok(*f as $ty),
                    Value::Int(i) => Ok(*i as $ty),
                    Value::Text(s) => s
                        .trim()
                        .parse::<$ty>()
                        .map_err(|_| conversion_error(&value, Self::type_label())),
                    Value::Object(_) => Err(no_converter(&value, Self::type_label())),
                    _ => Err(conversion_error(&value, Self::type_label())),
                }
            }
        }
    };
}

float_from_value!(f32, "float");
float_from_value!(f64, "double");

impl FromValue for char {
    fn type_label() -> &'static str {
        "char"
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        match &value {
            Value::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(conversion_error(&value, Self::type_label())),
                }
            }
            Value::Object(_) => Err(no_converter(&value, Self::type_label())),
            _ => Err(conversion_error(&value, Self::type_label())),
        }
    }
}

impl FromValue for PathBuf {
    fn type_label() -> &'static str {
        "path"
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Path(p) => Ok(p),
            Value::Text(s) => Ok(PathBuf::from(s)),
            other => Err(no_converter(&other, Self::type_label())),
        }
    }
}

impl FromValue for Reference {
    fn type_label() -> &'static str {
        "reference"
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Text(s) if !s.is_empty() => Ok(Reference::new(s)),
            other => Err(conversion_error(&other, Self::type_label())),
        }
    }
}

impl FromValue for ComponentRef {
    fn type_label() -> &'static str {
        "object"
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(o) => Ok(o),
            other => Err(no_converter(&other, Self::type_label())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through_primitive_parsers() {
        assert_eq!(i32::from_value(Value::from("42")).unwrap(), 42);
        assert_eq!(i64::from_value(Value::from(" -7 ")).unwrap(), -7);
        assert!(bool::from_value(Value::from("true")).unwrap());
        assert!(!bool::from_value(Value::from("FALSE")).unwrap());
        assert_eq!(f64::from_value(Value::from("1.5")).unwrap(), 1.5);
    }

    #[test]
    fn bool_rejects_anything_else() {
        assert!(bool::from_value(Value::from("maybe")).is_err());
        assert!(bool::from_value(Value::from("yes")).is_err());
        assert!(bool::from_value(Value::from("1")).is_err());
        assert!(bool::from_value(Value::from("")).is_err());
    }

    #[test]
    fn int_parse_failure_is_conversion_error() {
        let err = i32::from_value(Value::from("forty-two")).unwrap_err();
        assert!(matches!(
            err.kind(),
            crate::error::ErrorKind::Conversion { .. }
        ));
    }

    #[test]
    fn object_into_primitive_is_no_converter() {
        use crate::error::ErrorKind;

        struct Dummy;
        impl crate::component::Introspectable for Dummy {
            fn class_name() -> &'static str {
                "dummy"
            }
            fn describe(_: &mut crate::schema::ClassSpec<Self>) {}
        }

        let obj = Value::Object(crate::component::new_component(Dummy));
        let err = bool::from_value(obj).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NoConverter { .. }));
    }

    #[test]
    fn native_values_preserved() {
        let p = PathBuf::from_value(Value::Path(PathBuf::from("/tmp/x"))).unwrap();
        assert_eq!(p, PathBuf::from("/tmp/x"));
        assert_eq!(i64::from_value(Value::Int(9)).unwrap(), 9);
    }

    #[test]
    fn reference_requires_nonempty_id() {
        assert_eq!(
            Reference::from_value(Value::from("base.path")).unwrap(),
            Reference::new("base.path")
        );
        assert!(Reference::from_value(Value::from("")).is_err());
    }
}
