//! The object configurer
//!
//! Applies one parsed element to its backing instance: attributes first (in
//! document order), then text content, then nested children, recursing
//! depth-first. Creators run against a parent whose attributes are already
//! applied; adders and container attachment run in document order after
//! each child is fully configured.
//!
//! Failures abort the current element immediately and unwind with the
//! nearest known source location attached. Attributes already applied are
//! not rolled back.

use crate::component::ComponentRef;
use crate::error::ConfigError;
use crate::model::{BuildModel, LogLevel, TargetRef};
use crate::names;
use crate::properties::{self, PropertyContext, UndefinedPolicy};
use crate::schema::ClassSchema;
use crate::wrapper::ElementWrapper;

/// Drives configuration and execution of parsed elements against the build
/// model and property context collaborators.
pub struct Configurer<'a> {
    pub model: &'a dyn BuildModel,
    pub properties: &'a dyn PropertyContext,
    undefined: UndefinedPolicy,
}

impl<'a> Configurer<'a> {
    pub fn new(model: &'a dyn BuildModel, properties: &'a dyn PropertyContext) -> Self {
        Configurer {
            model,
            properties,
            undefined: UndefinedPolicy::default(),
        }
    }

    pub fn with_undefined_policy(mut self, policy: UndefinedPolicy) -> Self {
        self.undefined = policy;
        self
    }

    pub fn undefined_policy(&self) -> UndefinedPolicy {
        self.undefined
    }

    /// Configure `target` from `element`. Safe to call again on the same
    /// pair; the second call is a no-op.
    pub fn configure(
        &self,
        target: &ComponentRef,
        element: &mut ElementWrapper,
    ) -> Result<(), ConfigError> {
        if element.is_configured() {
            return Ok(());
        }
        let schema = target.borrow().schema()?;

        // Self-configuring components interpret the raw element themselves.
        if let Some(raw) = schema.raw_config() {
            {
                let mut obj = target.borrow_mut();
                raw(&mut **obj, element, self)
                    .map_err(|e| e.with_location(element.location().clone()))?;
            }
            element.mark_configured();
            return Ok(());
        }

        let mut pending_id: Option<String> = None;
        for (name, raw_value) in element.attributes() {
            if name.eq_ignore_ascii_case("id") {
                pending_id = Some(raw_value.clone());
                continue;
            }
            let key = names::attribute_key(name);
            let setter = schema.attribute_setter(&key).ok_or_else(|| {
                ConfigError::no_such_attribute(element.tag(), name.as_str())
                    .with_location(element.location().clone())
            })?;
            let value = properties::expand(raw_value, self.properties, self.undefined)
                .map_err(|e| e.with_location(element.location().clone()))?;
            let mut obj = target.borrow_mut();
            (setter.set)(&mut **obj, value)
                .map_err(|e| e.with_location(element.location().clone()))?;
        }

        let text = element.text().trim().to_string();
        if !text.is_empty() {
            match schema.content_setter() {
                Some(setter) => {
                    // Plain text: property resolution only, no coercion.
                    let resolved = properties::expand(&text, self.properties, self.undefined)
                        .map_err(|e| e.with_location(element.location().clone()))?
                        .to_text();
                    let mut obj = target.borrow_mut();
                    setter(&mut **obj, &resolved)
                        .map_err(|e| e.with_location(element.location().clone()))?;
                }
                None => {
                    return Err(ConfigError::unexpected_content(element.tag(), text)
                        .with_location(element.location().clone()));
                }
            }
        }

        for child in element.children_mut() {
            self.configure_child(target, &schema, child)?;
        }

        if let Some(id) = pending_id {
            self.model.add_reference(&id, target.clone());
        }
        element.mark_configured();
        Ok(())
    }

    fn configure_child(
        &self,
        parent: &ComponentRef,
        schema: &ClassSchema,
        child: &mut ElementWrapper,
    ) -> Result<(), ConfigError> {
        let key = names::element_lookup_key(child.tag());

        // The enclosing context already constructed the child instance
        // (registry lookup or manual seeding): configure, then attach.
        if let Some(instance) = child.instance() {
            self.configure(&instance, child)?;
            if let Some(adder) = schema.element_adder(&key) {
                drop(instance);
                let Some(owned) = child.take_instance() else {
                    return Ok(());
                };
                let mut obj = parent.borrow_mut();
                (adder.add)(&mut **obj, owned)
                    .map_err(|e| e.with_location(child.location().clone()))?;
            } else if let Some(container) = schema.container_hook() {
                let mut obj = parent.borrow_mut();
                container(&mut **obj, instance)
                    .map_err(|e| e.with_location(child.location().clone()))?;
            }
            // No adder and no container: the instance was attached at
            // creation time (retained creator or explicit wiring).
            return Ok(());
        }

        let Some(component_name) = child.unresolved_name().map(str::to_string) else {
            // Already consumed by an earlier pass.
            return Ok(());
        };

        if let Some(creator) = schema.element_creator(&key) {
            let instance = {
                let mut obj = parent.borrow_mut();
                (creator.create)(&mut **obj)
                    .map_err(|e| e.with_location(child.location().clone()))?
            };
            child.resolve(instance.clone());
            self.configure(&instance, child)?;
            if let Some(adder) = schema.element_adder(&key) {
                drop(instance);
                let Some(owned) = child.take_instance() else {
                    return Ok(());
                };
                let mut obj = parent.borrow_mut();
                (adder.add)(&mut **obj, owned)
                    .map_err(|e| e.with_location(child.location().clone()))?;
            }
            Ok(())
        } else if schema.element_adder(&key).is_some() {
            // Adder without creator: the instance must come from outside.
            Err(
                ConfigError::no_such_element(schema.class_name(), child.tag())
                    .with_location(child.location().clone()),
            )
        } else if let Some(container) = schema.container_hook() {
            // Arbitrary nested task; name lookup was deferred to this point.
            let instance = self.lookup_component(&component_name).ok_or_else(|| {
                ConfigError::unexpected_element(child.tag())
                    .with_location(child.location().clone())
            })?;
            child.resolve(instance.clone());
            self.configure(&instance, child)?;
            let mut obj = parent.borrow_mut();
            container(&mut **obj, instance)
                .map_err(|e| e.with_location(child.location().clone()))?;
            Ok(())
        } else {
            Err(
                ConfigError::no_such_element(schema.class_name(), child.tag())
                    .with_location(child.location().clone()),
            )
        }
    }

    fn lookup_component(&self, name: &str) -> Option<ComponentRef> {
        self.model
            .create_task_instance(name)
            .or_else(|| self.model.create_data_type_instance(name))
    }

    /// Obtain the live instance for a step wrapper, performing the deferred
    /// component lookup for placeholders. Unknown names fail here, not at
    /// parse time.
    pub fn materialize(&self, step: &mut ElementWrapper) -> Result<ComponentRef, ConfigError> {
        if let Some(instance) = step.instance() {
            return Ok(instance);
        }
        match step.unresolved_name().map(str::to_string) {
            Some(name) => {
                let instance = self.lookup_component(&name).ok_or_else(|| {
                    ConfigError::unexpected_element(step.tag())
                        .with_location(step.location().clone())
                })?;
                step.resolve(instance.clone());
                Ok(instance)
            }
            None => Err(ConfigError::unexpected_element(step.tag())
                .with_location(step.location().clone())),
        }
    }

    /// Materialize, configure and execute one target step.
    pub fn run_step(&self, step: &mut ElementWrapper) -> Result<(), ConfigError> {
        let instance = self.materialize(step)?;
        self.configure(&instance, step)?;
        let location = step.location().clone();
        self.execute_component(&instance)
            .map_err(|e| e.with_location(location))
    }

    /// Invoke the component's execution hook, if it declares one.
    pub fn execute_component(&self, component: &ComponentRef) -> Result<(), ConfigError> {
        let schema = component.borrow().schema()?;
        if let Some(hook) = schema.execute_hook() {
            let mut obj = component.borrow_mut();
            hook(&mut **obj, self)?;
        }
        Ok(())
    }

    /// Run every step of `target` in document order, honoring the if/unless
    /// guard conditions. Dependency resolution is not performed here.
    pub fn run_target(&self, target: &TargetRef) -> Result<(), ConfigError> {
        {
            let t = target.borrow();
            if let Some(property) = t.if_condition() {
                if self.properties.resolve(property).is_none() {
                    self.model.log(
                        LogLevel::Verbose,
                        &format!(
                            "skipping target \"{}\": property \"{}\" is not set",
                            t.name(),
                            property
                        ),
                    );
                    return Ok(());
                }
            }
            if let Some(property) = t.unless_condition() {
                if self.properties.resolve(property).is_some() {
                    self.model.log(
                        LogLevel::Verbose,
                        &format!(
                            "skipping target \"{}\": property \"{}\" is set",
                            t.name(),
                            property
                        ),
                    );
                    return Ok(());
                }
            }
        }
        let mut t = target.borrow_mut();
        for step in t.steps_mut() {
            self.run_step(step)?;
        }
        Ok(())
    }
}
