//! Reference build-model implementation
//!
//! `Project` is the in-memory model used by the CLI and the tests: ordered
//! target registry, reference table, task/data-type factories, a property
//! store (it doubles as the property context), and a captured log that also
//! fans out to `tracing`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::component::{new_component, ComponentRef, Introspectable};
use crate::model::{BuildModel, LogLevel, TargetRef};
use crate::properties::PropertyContext;
use crate::value::Value;

/// Creates a fresh component instance per element occurrence.
pub type ComponentFactory = Box<dyn Fn() -> ComponentRef>;

#[derive(Default)]
pub struct Project {
    name: RefCell<Option<String>>,
    default_target: RefCell<Option<String>>,
    basedir: RefCell<Option<PathBuf>>,
    targets: RefCell<Vec<(String, TargetRef)>>,
    references: RefCell<HashMap<String, ComponentRef>>,
    task_factories: RefCell<HashMap<String, ComponentFactory>>,
    type_factories: RefCell<HashMap<String, ComponentFactory>>,
    properties: RefCell<HashMap<String, Value>>,
    messages: RefCell<Vec<(LogLevel, String)>>,
}

impl Project {
    pub fn new() -> Self {
        Project::default()
    }

    /// Register a task type under `name`, instantiated via `Default`.
    pub fn register_task<T: Introspectable + Default>(&self, name: &str) {
        self.register_task_factory(name, || new_component(T::default()));
    }

    pub fn register_task_factory(
        &self,
        name: &str,
        factory: impl Fn() -> ComponentRef + 'static,
    ) {
        self.task_factories
            .borrow_mut()
            .insert(name.to_ascii_lowercase(), Box::new(factory));
    }

    /// Register a data type under `name`, instantiated via `Default`.
    pub fn register_data_type<T: Introspectable + Default>(&self, name: &str) {
        self.register_data_type_factory(name, || new_component(T::default()));
    }

    pub fn register_data_type_factory(
        &self,
        name: &str,
        factory: impl Fn() -> ComponentRef + 'static,
    ) {
        self.type_factories
            .borrow_mut()
            .insert(name.to_ascii_lowercase(), Box::new(factory));
    }

    pub fn set_property(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.borrow_mut().insert(name.into(), value.into());
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        self.properties.borrow().get(name).cloned()
    }

    /// Every message logged through the model, oldest first.
    pub fn messages(&self) -> Vec<(LogLevel, String)> {
        self.messages.borrow().clone()
    }
}

impl BuildModel for Project {
    fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = Some(name.to_string());
    }

    fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    fn set_default_target(&self, name: &str) {
        *self.default_target.borrow_mut() = Some(name.to_string());
    }

    fn default_target(&self) -> Option<String> {
        self.default_target.borrow().clone()
    }

    fn set_basedir(&self, dir: &Path) {
        *self.basedir.borrow_mut() = Some(dir.to_path_buf());
    }

    fn basedir(&self) -> Option<PathBuf> {
        self.basedir.borrow().clone()
    }

    fn register_target(&self, name: &str, target: TargetRef) {
        let mut targets = self.targets.borrow_mut();
        if let Some(slot) = targets.iter_mut().find(|(n, _)| n == name) {
            slot.1 = target;
        } else {
            targets.push((name.to_string(), target));
        }
    }

    fn get_target(&self, name: &str) -> Option<TargetRef> {
        self.targets
            .borrow()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.clone())
    }

    fn target_names(&self) -> Vec<String> {
        self.targets.borrow().iter().map(|(n, _)| n.clone()).collect()
    }

    fn add_reference(&self, id: &str, value: ComponentRef) {
        self.references.borrow_mut().insert(id.to_string(), value);
    }

    fn get_reference(&self, id: &str) -> Option<ComponentRef> {
        self.references.borrow().get(id).cloned()
    }

    fn create_task_instance(&self, name: &str) -> Option<ComponentRef> {
        self.task_factories
            .borrow()
            .get(&name.to_ascii_lowercase())
            .map(|factory| factory())
    }

    fn create_data_type_instance(&self, name: &str) -> Option<ComponentRef> {
        self.type_factories
            .borrow()
            .get(&name.to_ascii_lowercase())
            .map(|factory| factory())
    }

    fn registered_data_type_names(&self) -> Vec<String> {
        self.type_factories.borrow().keys().cloned().collect()
    }

    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => tracing::error!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Verbose | LogLevel::Debug => tracing::debug!("{message}"),
        }
        self.messages.borrow_mut().push((level, message.to_string()));
    }
}

impl PropertyContext for Project {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.property(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Location;
    use crate::model::Target;

    #[test]
    fn target_registry_keeps_order() {
        let p = Project::new();
        p.register_target("b", Target::shared("b", Location::unknown()));
        p.register_target("a", Target::shared("a", Location::unknown()));
        assert_eq!(p.target_names(), ["b", "a"]);
        assert!(p.get_target("a").is_some());
        assert!(p.get_target("c").is_none());
    }

    #[test]
    fn properties_resolve_through_context() {
        let p = Project::new();
        p.set_property("user", "world");
        assert_eq!(p.resolve("user"), Some(Value::Text("world".into())));
        assert_eq!(p.resolve("missing"), None);
    }

    #[test]
    fn task_lookup_is_case_insensitive() {
        #[derive(Default)]
        struct Nop;
        impl Introspectable for Nop {
            fn class_name() -> &'static str {
                "nop"
            }
            fn describe(_: &mut crate::schema::ClassSpec<Self>) {}
        }

        let p = Project::new();
        p.register_task::<Nop>("nop");
        assert!(p.create_task_instance("Nop").is_some());
        assert!(p.create_task_instance("missing").is_none());
    }
}
