//! anvil-core: declarative XML build-script interpretation
//!
//! This library provides:
//! - Streaming build-file parsing into a live target/task object graph
//! - A registration-based configuration engine (attributes, nested
//!   elements, text content) with `${...}` property resolution
//! - Per-type configuration schemas, cached process-wide
//! - A minimal build model (projects, targets, references)

pub mod component;
pub mod configure;
pub mod error;
pub mod model;
pub mod names;
pub mod parse;
pub mod properties;
pub mod schema;
pub mod uri;
pub mod value;
pub mod wrapper;

pub use component::{new_component, Component, ComponentRef, Introspectable};
pub use configure::Configurer;
pub use error::{ConfigError, ErrorKind, Location};
pub use model::{BuildModel, LogLevel, Project, Target, TargetRef};
pub use parse::{
    BuildParser, EntityResolver, EntitySource, FileEntityResolver, NullEntityResolver,
    ParseSession,
};
pub use properties::{convert, expand, PropertyContext, UndefinedPolicy};
pub use schema::{schema_for, ClassSchema, ClassSpec};
pub use value::{FromValue, Reference, Value};
pub use wrapper::{ElementProxy, ElementWrapper};
