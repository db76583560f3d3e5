//! Per-type configuration schemas
//!
//! The registration-based stand-in for runtime method discovery: each
//! configurable type declares, once, which attributes, nested elements,
//! content and capabilities it supports. The result is a [`ClassSchema`] of
//! type-erased closures keyed by derived names, cached process-wide by
//! `TypeId`.
//!
//! Schemas are pure functions of the type: concurrent lookups may race to
//! build the same schema, and the second result harmlessly overwrites the
//! first.

use std::any::TypeId;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::component::{new_component, Component, ComponentRef, Introspectable};
use crate::configure::Configurer;
use crate::error::ConfigError;
use crate::names;
use crate::value::{FromValue, Value};
use crate::wrapper::ElementWrapper;

pub(crate) type SetterFn =
    Box<dyn Fn(&mut dyn Component, Value) -> Result<(), ConfigError> + Send + Sync>;
pub(crate) type CreatorFn =
    Box<dyn Fn(&mut dyn Component) -> Result<ComponentRef, ConfigError> + Send + Sync>;
pub(crate) type AdderFn =
    Box<dyn Fn(&mut dyn Component, ComponentRef) -> Result<(), ConfigError> + Send + Sync>;
pub(crate) type ContentFn =
    Box<dyn Fn(&mut dyn Component, &str) -> Result<(), ConfigError> + Send + Sync>;
pub(crate) type ContainerFn =
    Box<dyn Fn(&mut dyn Component, ComponentRef) -> Result<(), ConfigError> + Send + Sync>;
pub(crate) type RawConfigFn = Box<
    dyn for<'a> Fn(
            &mut dyn Component,
            &ElementWrapper,
            &Configurer<'a>,
        ) -> Result<(), ConfigError>
        + Send
        + Sync,
>;
pub(crate) type ExecuteFn = Box<
    dyn for<'a> Fn(&mut dyn Component, &Configurer<'a>) -> Result<(), ConfigError> + Send + Sync,
>;

type SchemaAccessor = fn() -> Result<Arc<ClassSchema>, ConfigError>;

/// An attribute setter entry: declared parameter type plus the erased
/// apply closure.
pub struct AttributeSetter {
    param_label: &'static str,
    pub(crate) set: SetterFn,
}

impl AttributeSetter {
    pub fn param_label(&self) -> &'static str {
        self.param_label
    }
}

/// A nested element factory entry.
pub struct ElementCreator {
    product: TypeId,
    product_label: &'static str,
    retained: bool,
    schema: SchemaAccessor,
    pub(crate) create: CreatorFn,
}

impl ElementCreator {
    pub fn product_label(&self) -> &'static str {
        self.product_label
    }

    /// Schema of the created child type, without instantiating one.
    pub fn product_schema(&self) -> Result<Arc<ClassSchema>, ConfigError> {
        (self.schema)()
    }
}

/// A nested element adder entry; consumes a fully configured child.
pub struct ElementAdder {
    param: TypeId,
    param_label: &'static str,
    schema: SchemaAccessor,
    pub(crate) add: AdderFn,
}

impl ElementAdder {
    pub fn param_label(&self) -> &'static str {
        self.param_label
    }

    pub fn param_schema(&self) -> Result<Arc<ClassSchema>, ConfigError> {
        (self.schema)()
    }
}

/// The complete configuration surface of one concrete type.
pub struct ClassSchema {
    class_name: &'static str,
    attribute_setters: HashMap<String, AttributeSetter>,
    element_creators: HashMap<String, ElementCreator>,
    element_adders: HashMap<String, ElementAdder>,
    content_setter: Option<ContentFn>,
    self_configuring: Option<RawConfigFn>,
    task_container: Option<ContainerFn>,
    execute: Option<ExecuteFn>,
}

impl std::fmt::Debug for ClassSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassSchema")
            .field("class_name", &self.class_name)
            .finish_non_exhaustive()
    }
}

impl ClassSchema {
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn attribute_setter(&self, key: &str) -> Option<&AttributeSetter> {
        self.attribute_setters.get(key)
    }

    pub fn element_creator(&self, key: &str) -> Option<&ElementCreator> {
        self.element_creators.get(key)
    }

    pub fn element_adder(&self, key: &str) -> Option<&ElementAdder> {
        self.element_adders.get(key)
    }

    /// Whether a nested element of this (lookup-normalized) name is known.
    pub fn supports_element(&self, key: &str) -> bool {
        self.element_creators.contains_key(key) || self.element_adders.contains_key(key)
    }

    pub(crate) fn content_setter(&self) -> Option<&ContentFn> {
        self.content_setter.as_ref()
    }

    pub fn supports_content(&self) -> bool {
        self.content_setter.is_some()
    }

    pub(crate) fn raw_config(&self) -> Option<&RawConfigFn> {
        self.self_configuring.as_ref()
    }

    pub(crate) fn container_hook(&self) -> Option<&ContainerFn> {
        self.task_container.as_ref()
    }

    /// Whether instances accept arbitrary nested task elements.
    pub fn is_task_container(&self) -> bool {
        self.task_container.is_some()
    }

    pub(crate) fn execute_hook(&self) -> Option<&ExecuteFn> {
        self.execute.as_ref()
    }

    pub fn is_executable(&self) -> bool {
        self.execute.is_some()
    }
}

/// Builder through which a type declares its schema.
///
/// Names are given in camel-case property form; the exposed attribute and
/// element spellings are derived from them (see [`crate::names`]).
pub struct ClassSpec<T: Introspectable> {
    attribute_setters: HashMap<String, AttributeSetter>,
    element_creators: HashMap<String, ElementCreator>,
    element_adders: HashMap<String, ElementAdder>,
    content_setter: Option<ContentFn>,
    self_configuring: Option<RawConfigFn>,
    task_container: Option<ContainerFn>,
    execute: Option<ExecuteFn>,
    errors: Vec<ConfigError>,
    _marker: std::marker::PhantomData<fn(T)>,
}

fn downcast<T: Introspectable>(obj: &mut dyn Component) -> &mut T {
    // Schemas are cached by TypeId; a mismatch here is an engine bug.
    obj.as_any_mut()
        .downcast_mut::<T>()
        .expect("schema applied to an instance of a different type")
}

impl<T: Introspectable> ClassSpec<T> {
    fn new() -> Self {
        ClassSpec {
            attribute_setters: HashMap::new(),
            element_creators: HashMap::new(),
            element_adders: HashMap::new(),
            content_setter: None,
            self_configuring: None,
            task_container: None,
            execute: None,
            errors: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Register an attribute setter under the derived key of `name`.
    pub fn attribute<V, F>(&mut self, name: &str, set: F) -> &mut Self
    where
        V: FromValue,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let key = names::attribute_key(name);
        let entry = AttributeSetter {
            param_label: V::type_label(),
            set: Box::new(move |obj, value| {
                set(downcast::<T>(obj), V::from_value(value)?);
                Ok(())
            }),
        };
        if self.attribute_setters.insert(key.clone(), entry).is_some() {
            self.errors.push(ConfigError::multiple_definition(format!(
                "attribute \"{}\" defined more than once on <{}>",
                key,
                T::class_name()
            )));
        }
        self
    }

    /// Register an element creator: the engine calls `make` to obtain a
    /// fresh, detached child, configures it, and hands it to the adder
    /// registered under the same name (if any).
    pub fn creator<C, F>(&mut self, name: &str, make: F) -> &mut Self
    where
        C: Introspectable,
        F: Fn(&mut T) -> C + Send + Sync + 'static,
    {
        self.insert_creator(
            name,
            false,
            Box::new(move |obj| Ok(new_component(make(downcast::<T>(obj))))),
            TypeId::of::<C>(),
            C::class_name(),
            schema_for::<C>,
        )
    }

    /// Register a retained element creator: `make` stores a clone of the
    /// returned handle inside the parent, so no adder runs afterwards and
    /// mutations made while configuring the child stay visible.
    pub fn creator_shared<C, F>(&mut self, name: &str, make: F) -> &mut Self
    where
        C: Introspectable,
        F: Fn(&mut T) -> ComponentRef + Send + Sync + 'static,
    {
        let key = names::element_key(name);
        let check_key = key.clone();
        self.insert_creator(
            name,
            true,
            Box::new(move |obj| {
                let child = make(downcast::<T>(obj));
                let ok = child.borrow().as_any().is::<C>();
                if !ok {
                    let found = child.borrow().type_label();
                    return Err(ConfigError::incompatible_types(
                        check_key.clone(),
                        C::class_name(),
                        found,
                    ));
                }
                Ok(child)
            }),
            TypeId::of::<C>(),
            C::class_name(),
            schema_for::<C>,
        )
    }

    fn insert_creator(
        &mut self,
        name: &str,
        retained: bool,
        create: CreatorFn,
        product: TypeId,
        product_label: &'static str,
        schema: SchemaAccessor,
    ) -> &mut Self {
        let key = names::element_key(name);
        let entry = ElementCreator {
            product,
            product_label,
            retained,
            schema,
            create,
        };
        if self.element_creators.insert(key.clone(), entry).is_some() {
            self.errors.push(ConfigError::multiple_definition(format!(
                "element <{}> has more than one creator on <{}>",
                key,
                T::class_name()
            )));
        }
        self
    }

    /// Register an element adder. The child must be constructed first,
    /// either by the creator registered under the same name or by the
    /// enclosing context; the adder takes ownership once configuration
    /// completes.
    pub fn adder<C, F>(&mut self, name: &str, add: F) -> &mut Self
    where
        C: Introspectable,
        F: Fn(&mut T, C) + Send + Sync + 'static,
    {
        let key = names::element_key(name);
        let err_key = key.clone();
        let entry = ElementAdder {
            param: TypeId::of::<C>(),
            param_label: C::class_name(),
            schema: schema_for::<C>,
            add: Box::new(move |obj, child| {
                let cell = Rc::try_unwrap(child).map_err(|_| {
                    ConfigError::multiple_definition(format!(
                        "nested <{}> element is still referenced elsewhere and cannot be added",
                        err_key
                    ))
                })?;
                let boxed = cell.into_inner();
                let found = boxed.type_label();
                let typed = boxed.into_any().downcast::<C>().map_err(|_| {
                    ConfigError::incompatible_types(err_key.clone(), C::class_name(), found)
                })?;
                add(downcast::<T>(obj), *typed);
                Ok(())
            }),
        };
        if self.element_adders.insert(key.clone(), entry).is_some() {
            self.errors.push(ConfigError::multiple_definition(format!(
                "element <{}> has more than one adder on <{}>",
                key,
                T::class_name()
            )));
        }
        self
    }

    /// Register the content setter, receiving the element's trimmed text.
    pub fn content<F>(&mut self, set: F) -> &mut Self
    where
        F: Fn(&mut T, &str) + Send + Sync + 'static,
    {
        if self.content_setter.is_some() {
            self.errors.push(ConfigError::multiple_definition(format!(
                "<{}> declares more than one content setter",
                T::class_name()
            )));
            return self;
        }
        self.content_setter = Some(Box::new(move |obj, text| {
            set(downcast::<T>(obj), text);
            Ok(())
        }));
        self
    }

    /// Opt out of reflective configuration: the hook receives the raw
    /// element and performs all interpretation itself.
    pub fn self_configuring<F>(&mut self, configure: F) -> &mut Self
    where
        F: for<'a> Fn(&mut T, &ElementWrapper, &Configurer<'a>) -> Result<(), ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.self_configuring = Some(Box::new(move |obj, element, ctx| {
            configure(downcast::<T>(obj), element, ctx)
        }));
        self
    }

    /// Declare that instances accept arbitrary nested task elements,
    /// attached through `add` once each child is configured.
    pub fn task_container<F>(&mut self, add: F) -> &mut Self
    where
        F: Fn(&mut T, ComponentRef) + Send + Sync + 'static,
    {
        self.task_container = Some(Box::new(move |obj, task| {
            add(downcast::<T>(obj), task);
            Ok(())
        }));
        self
    }

    /// Declare the execution lifecycle hook.
    pub fn executes<F>(&mut self, execute: F) -> &mut Self
    where
        F: for<'a> Fn(&mut T, &Configurer<'a>) -> Result<(), ConfigError> + Send + Sync + 'static,
    {
        self.execute = Some(Box::new(move |obj, ctx| execute(downcast::<T>(obj), ctx)));
        self
    }

    fn finish(mut self) -> Result<ClassSchema, ConfigError> {
        // Creator/adder pairs must agree on the child type, and a retained
        // creator leaves nothing for an adder to adopt.
        for (key, creator) in &self.element_creators {
            if let Some(adder) = self.element_adders.get(key) {
                if creator.retained {
                    self.errors.push(ConfigError::multiple_definition(format!(
                        "element <{}> on <{}> declares both a retained creator and an adder",
                        key,
                        T::class_name()
                    )));
                } else if creator.product != adder.param {
                    self.errors.push(ConfigError::incompatible_types(
                        key.clone(),
                        adder.param_label,
                        creator.product_label,
                    ));
                }
            }
        }
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }
        Ok(ClassSchema {
            class_name: T::class_name(),
            attribute_setters: self.attribute_setters,
            element_creators: self.element_creators,
            element_adders: self.element_adders,
            content_setter: self.content_setter,
            self_configuring: self.self_configuring,
            task_container: self.task_container,
            execute: self.execute,
        })
    }
}

static SCHEMA_CACHE: Lazy<RwLock<HashMap<TypeId, Arc<ClassSchema>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Look up (building and caching on first use) the schema for `T`.
///
/// Conflicting registrations surface here as errors and are never cached.
pub fn schema_for<T: Introspectable>() -> Result<Arc<ClassSchema>, ConfigError> {
    let id = TypeId::of::<T>();
    if let Some(schema) = SCHEMA_CACHE
        .read()
        .expect("schema cache poisoned")
        .get(&id)
    {
        return Ok(schema.clone());
    }
    let mut spec = ClassSpec::<T>::new();
    T::describe(&mut spec);
    let schema = Arc::new(spec.finish()?);
    tracing::debug!(class = T::class_name(), "built class schema");
    SCHEMA_CACHE
        .write()
        .expect("schema cache poisoned")
        .insert(id, schema.clone());
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[derive(Default)]
    struct Inner {
        depth: i32,
    }

    impl Introspectable for Inner {
        fn class_name() -> &'static str {
            "inner"
        }
        fn describe(spec: &mut ClassSpec<Self>) {
            spec.attribute("depth", |i: &mut Inner, v: i32| i.depth = v);
        }
    }

    #[derive(Default)]
    struct Other;

    impl Introspectable for Other {
        fn class_name() -> &'static str {
            "other"
        }
        fn describe(_: &mut ClassSpec<Self>) {}
    }

    struct DupAttr;

    impl Introspectable for DupAttr {
        fn class_name() -> &'static str {
            "dup-attr"
        }
        fn describe(spec: &mut ClassSpec<Self>) {
            spec.attribute("value", |_: &mut DupAttr, _: String| {});
            // same derived key, different spelling
            spec.attribute("Value", |_: &mut DupAttr, _: String| {});
        }
    }

    struct MismatchedPair;

    impl Introspectable for MismatchedPair {
        fn class_name() -> &'static str {
            "mismatched"
        }
        fn describe(spec: &mut ClassSpec<Self>) {
            spec.creator("inner", |_: &mut MismatchedPair| Inner::default());
            spec.adder("inner", |_: &mut MismatchedPair, _: Other| {});
        }
    }

    struct TwoContents;

    impl Introspectable for TwoContents {
        fn class_name() -> &'static str {
            "two-contents"
        }
        fn describe(spec: &mut ClassSpec<Self>) {
            spec.content(|_: &mut TwoContents, _| {});
            spec.content(|_: &mut TwoContents, _| {});
        }
    }

    #[test]
    fn schemas_are_cached_per_type() {
        let a = schema_for::<Inner>().unwrap();
        let b = schema_for::<Inner>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.class_name(), "inner");
    }

    #[test]
    fn duplicate_attribute_is_rejected() {
        let err = schema_for::<DupAttr>().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MultipleDefinition { .. }));
    }

    #[test]
    fn mismatched_creator_adder_is_rejected() {
        let err = schema_for::<MismatchedPair>().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IncompatibleTypes { .. }));
    }

    #[test]
    fn second_content_setter_is_rejected() {
        let err = schema_for::<TwoContents>().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MultipleDefinition { .. }));
    }

    #[test]
    fn build_errors_are_not_cached() {
        let first = schema_for::<DupAttr>();
        let second = schema_for::<DupAttr>();
        assert!(first.is_err());
        assert!(second.is_err());
    }
}
