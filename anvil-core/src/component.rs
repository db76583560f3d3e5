//! Configurable component objects
//!
//! Anything the engine can configure is a `Component`: a plain struct that
//! describes its attributes, nested elements and capabilities once, through
//! [`Introspectable::describe`]. Components carry no required base state;
//! the blanket impl wires every `Introspectable` type into the dynamic
//! object model.
//!
//! Instances travel as [`ComponentRef`] (shared, interiorly mutable) so that
//! a parent can retain a handle to a child it created while the engine is
//! still configuring that child.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::schema::{schema_for, ClassSchema, ClassSpec};

/// A shared handle to a live component instance.
pub type ComponentRef = Rc<RefCell<Box<dyn Component>>>;

/// Dynamic view of a configurable object.
pub trait Component: Any {
    /// Short name used in diagnostics (usually the element name).
    fn type_label(&self) -> &'static str;

    /// The configuration schema of this instance's concrete type.
    fn schema(&self) -> Result<Arc<ClassSchema>, ConfigError>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A type that declares its configuration surface.
///
/// `describe` is called at most once per type per process; the resulting
/// schema is cached by `TypeId` (see [`crate::schema::schema_for`]).
pub trait Introspectable: Sized + 'static {
    /// The element-style name of this type, e.g. `"echo"`.
    fn class_name() -> &'static str;

    /// Register attribute setters, element creators/adders, the content
    /// setter and capabilities.
    fn describe(spec: &mut ClassSpec<Self>);
}

impl<T: Introspectable> Component for T {
    fn type_label(&self) -> &'static str {
        T::class_name()
    }

    fn schema(&self) -> Result<Arc<ClassSchema>, ConfigError> {
        schema_for::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Wrap a value into a shared component handle.
pub fn new_component<T: Introspectable>(value: T) -> ComponentRef {
    Rc::new(RefCell::new(Box::new(value) as Box<dyn Component>))
}

/// Borrow the concrete type behind a component handle, panicking never:
/// returns `None` on type mismatch.
pub fn with_component<T: Introspectable, R>(
    component: &ComponentRef,
    f: impl FnOnce(&T) -> R,
) -> Option<R> {
    let guard = component.borrow();
    guard.as_any().downcast_ref::<T>().map(f)
}
