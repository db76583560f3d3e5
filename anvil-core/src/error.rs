//! Configuration error taxonomy and source locations
//!
//! Every failure in the parse/configure pipeline is a `ConfigError`: a kind
//! from the fixed taxonomy plus an optional source location. Locations are
//! attached where they become known; an error that already carries one keeps
//! it while unwinding through enclosing elements.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A position in a build file (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub file: Option<PathBuf>,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: Option<PathBuf>, line: u32, column: u32) -> Self {
        Location { file, line, column }
    }

    /// An unknown location (no file, 0:0).
    pub fn unknown() -> Self {
        Location::default()
    }

    pub fn is_known(&self) -> bool {
        self.file.is_some() || self.line > 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(path) => write!(f, "{}:{}:{}", path.display(), self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// The kinds of configuration failure.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("unexpected element <{tag}>")]
    UnexpectedElement { tag: String },

    #[error("<{tag}> doesn't support nested text (\"{text}\")")]
    UnexpectedContent { tag: String, text: String },

    #[error("<{tag}> doesn't support the \"{attribute}\" attribute")]
    NoSuchAttribute { tag: String, attribute: String },

    #[error("<{parent}> doesn't support the nested <{tag}> element")]
    NoSuchElement { parent: String, tag: String },

    #[error("<{tag}> element appears without a \"{attribute}\" attribute")]
    MissingAttribute { tag: String, attribute: String },

    #[error("{message}")]
    MultipleDefinition { message: String },

    #[error("incompatible types for <{element}>: creator produces {found}, adder expects {expected}")]
    IncompatibleTypes {
        element: String,
        expected: String,
        found: String,
    },

    #[error("{message}")]
    Conversion { message: String },

    #[error("syntax error in property expression \"{value}\"")]
    MalformedPropertyReference { value: String },

    #[error("property \"{name}\" has not been set")]
    UndefinedProperty { name: String },

    #[error("no converter from \"{value}\" to {target}")]
    NoConverter { value: String, target: String },

    #[error("error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed build file: {message}")]
    Xml { message: String },
}

/// A configuration error: taxonomy kind plus the source location, when known.
#[derive(Debug)]
pub struct ConfigError {
    kind: ErrorKind,
    location: Option<Location>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {}", self.kind, location),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        // The kind's text is already part of Display; chain only what it
        // wraps (e.g. the underlying I/O error).
        std::error::Error::source(&self.kind)
    }
}

impl ConfigError {
    pub fn new(kind: ErrorKind) -> Self {
        ConfigError {
            kind,
            location: None,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Attaches `location` unless a more specific one is already present.
    pub fn with_location(mut self, location: Location) -> Self {
        if self.location.is_none() && location.is_known() {
            self.location = Some(location);
        }
        self
    }

    pub fn unexpected_element(tag: impl Into<String>) -> Self {
        ConfigError::new(ErrorKind::UnexpectedElement { tag: tag.into() })
    }

    pub fn unexpected_content(tag: impl Into<String>, text: impl Into<String>) -> Self {
        ConfigError::new(ErrorKind::UnexpectedContent {
            tag: tag.into(),
            text: text.into(),
        })
    }

    pub fn no_such_attribute(tag: impl Into<String>, attribute: impl Into<String>) -> Self {
        ConfigError::new(ErrorKind::NoSuchAttribute {
            tag: tag.into(),
            attribute: attribute.into(),
        })
    }

    pub fn no_such_element(parent: impl Into<String>, tag: impl Into<String>) -> Self {
        ConfigError::new(ErrorKind::NoSuchElement {
            parent: parent.into(),
            tag: tag.into(),
        })
    }

    pub fn missing_attribute(tag: impl Into<String>, attribute: impl Into<String>) -> Self {
        ConfigError::new(ErrorKind::MissingAttribute {
            tag: tag.into(),
            attribute: attribute.into(),
        })
    }

    pub fn multiple_definition(message: impl Into<String>) -> Self {
        ConfigError::new(ErrorKind::MultipleDefinition {
            message: message.into(),
        })
    }

    pub fn incompatible_types(
        element: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        ConfigError::new(ErrorKind::IncompatibleTypes {
            element: element.into(),
            expected: expected.into(),
            found: found.into(),
        })
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        ConfigError::new(ErrorKind::Conversion {
            message: message.into(),
        })
    }

    pub fn malformed_property(value: impl Into<String>) -> Self {
        ConfigError::new(ErrorKind::MalformedPropertyReference {
            value: value.into(),
        })
    }

    pub fn undefined_property(name: impl Into<String>) -> Self {
        ConfigError::new(ErrorKind::UndefinedProperty { name: name.into() })
    }

    pub fn no_converter(value: impl Into<String>, target: impl Into<String>) -> Self {
        ConfigError::new(ErrorKind::NoConverter {
            value: value.into(),
            target: target.into(),
        })
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        ConfigError::new(ErrorKind::Io {
            path: path.into(),
            source,
        })
    }

    pub fn xml(message: impl Into<String>) -> Self {
        ConfigError::new(ErrorKind::Xml {
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display() {
        let loc = Location::new(Some(PathBuf::from("build.xml")), 3, 12);
        assert_eq!(loc.to_string(), "build.xml:3:12");
    }

    #[test]
    fn error_renders_location() {
        let err = ConfigError::no_such_attribute("echo", "foo")
            .with_location(Location::new(Some(PathBuf::from("build.xml")), 2, 5));
        let msg = err.to_string();
        assert!(msg.contains("\"foo\""));
        assert!(msg.contains("build.xml:2:5"));
    }

    #[test]
    fn first_location_wins() {
        let inner = Location::new(Some(PathBuf::from("a.xml")), 1, 1);
        let outer = Location::new(Some(PathBuf::from("b.xml")), 9, 9);
        let err = ConfigError::unexpected_element("zap")
            .with_location(inner.clone())
            .with_location(outer);
        assert_eq!(err.location(), Some(&inner));
    }
}
