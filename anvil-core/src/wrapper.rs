//! Per-element configuration wrappers
//!
//! An `ElementWrapper` is the bookkeeping record for one XML element: tag,
//! raw attributes in document order, accumulated text, child wrappers, and
//! the proxy object the element will configure. Wrappers outlive the parse
//! so configuration can be deferred; a wrapper whose instance has been
//! adopted by a parent adder is consumed and cannot be configured again.

use crate::component::ComponentRef;
use crate::error::{ConfigError, Location};

/// The object backing an element, in one of three states.
pub enum ElementProxy {
    /// A live instance, created during parsing or by a creator.
    Instance(ComponentRef),
    /// A component name whose lookup is deferred until materialization.
    Unresolved(String),
    /// The instance was handed to a parent adder; nothing remains here.
    Consumed,
}

pub struct ElementWrapper {
    tag: String,
    proxy: ElementProxy,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<ElementWrapper>,
    location: Location,
    configured: bool,
}

impl ElementWrapper {
    /// A wrapper whose backing object is looked up later by tag name.
    pub fn new(tag: impl Into<String>, location: Location) -> Self {
        let tag = tag.into();
        let proxy = ElementProxy::Unresolved(tag.clone());
        ElementWrapper {
            tag,
            proxy,
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            location,
            configured: false,
        }
    }

    /// A wrapper around an already-created instance.
    pub fn with_instance(
        tag: impl Into<String>,
        instance: ComponentRef,
        location: Location,
    ) -> Self {
        ElementWrapper {
            tag: tag.into(),
            proxy: ElementProxy::Instance(instance),
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            location,
            configured: false,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Record a raw attribute. Attributes keep document order; a repeated
    /// name is an error, not an override.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if self.attributes.iter().any(|(n, _)| *n == name) {
            return Err(ConfigError::multiple_definition(format!(
                "attribute \"{}\" appears twice on <{}>",
                name, self.tag
            ))
            .with_location(self.location.clone()));
        }
        self.attributes.push((name, value.into()));
        Ok(())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Look up a raw attribute by document spelling.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Append a run of character data.
    pub fn add_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn add_child(&mut self, child: ElementWrapper) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[ElementWrapper] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [ElementWrapper] {
        &mut self.children
    }

    pub fn proxy(&self) -> &ElementProxy {
        &self.proxy
    }

    /// The live instance, if one exists.
    pub fn instance(&self) -> Option<ComponentRef> {
        match &self.proxy {
            ElementProxy::Instance(r) => Some(r.clone()),
            _ => None,
        }
    }

    pub fn unresolved_name(&self) -> Option<&str> {
        match &self.proxy {
            ElementProxy::Unresolved(name) => Some(name),
            _ => None,
        }
    }

    /// Bind a freshly created/looked-up instance to this wrapper.
    pub fn resolve(&mut self, instance: ComponentRef) {
        self.proxy = ElementProxy::Instance(instance);
    }

    /// Remove and return the instance, leaving the wrapper consumed. Used
    /// when a parent adder takes ownership of the configured child.
    pub fn take_instance(&mut self) -> Option<ComponentRef> {
        match std::mem::replace(&mut self.proxy, ElementProxy::Consumed) {
            ElementProxy::Instance(r) => Some(r),
            other => {
                self.proxy = other;
                None
            }
        }
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self.proxy, ElementProxy::Consumed)
    }

    pub(crate) fn mark_configured(&mut self) {
        self.configured = true;
    }

    pub(crate) fn is_configured(&self) -> bool {
        self.configured
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn attributes_keep_document_order() {
        let mut w = ElementWrapper::new("echo", Location::unknown());
        w.set_attribute("b", "2").unwrap();
        w.set_attribute("a", "1").unwrap();
        let names: Vec<&str> = w.attributes().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn duplicate_attribute_is_an_error() {
        let mut w = ElementWrapper::new("echo", Location::unknown());
        w.set_attribute("message", "one").unwrap();
        let err = w.set_attribute("message", "two").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MultipleDefinition { .. }));
        assert_eq!(w.attribute("message"), Some("one"));
    }

    #[test]
    fn text_accumulates_across_chunks() {
        let mut w = ElementWrapper::new("echo", Location::unknown());
        w.add_text("hello ");
        w.add_text("world");
        assert_eq!(w.text(), "hello world");
    }

    #[test]
    fn take_instance_consumes_the_wrapper() {
        struct Probe;
        impl crate::component::Introspectable for Probe {
            fn class_name() -> &'static str {
                "probe"
            }
            fn describe(_: &mut crate::schema::ClassSpec<Self>) {}
        }

        let mut w = ElementWrapper::with_instance(
            "probe",
            crate::component::new_component(Probe),
            Location::unknown(),
        );
        assert!(w.take_instance().is_some());
        assert!(w.is_consumed());
        assert!(w.take_instance().is_none());
    }
}
