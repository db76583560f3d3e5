//! Element handlers
//!
//! One function set per handler kind, all stateless: the active handler for
//! the top frame decides how a child tag, a text run or an end tag is
//! interpreted, mutating only the threaded [`ParseContext`].

use crate::component::ComponentRef;
use crate::error::ConfigError;
use crate::model::LogLevel;
use crate::names;
use crate::parse::context::{Frame, HandlerKind, ParseContext};
use crate::wrapper::ElementWrapper;

pub(crate) fn handle_start(
    ctx: &mut ParseContext<'_>,
    tag: &str,
    attrs: Vec<(String, String)>,
) -> Result<(), ConfigError> {
    let frame = match ctx.top_handler() {
        HandlerKind::Root => {
            if tag == "project" {
                project_start(ctx, attrs)?;
                Frame::bare(HandlerKind::Project)
            } else {
                return Err(ConfigError::unexpected_element(tag).with_location(ctx.location()));
            }
        }
        HandlerKind::Project => {
            if tag == "target" {
                target_start(ctx, attrs)?;
                Frame::bare(HandlerKind::Target)
            } else {
                element_start(ctx, tag, attrs)?
            }
        }
        HandlerKind::Target => element_start(ctx, tag, attrs)?,
        HandlerKind::Element | HandlerKind::NestedElement => {
            let container = ctx
                .top_schema()
                .map(|s| s.is_task_container())
                .unwrap_or(false);
            if container {
                element_start(ctx, tag, attrs)?
            } else {
                nested_start(ctx, tag, attrs)?
            }
        }
    };
    ctx.push_frame(frame);
    Ok(())
}

pub(crate) fn handle_text(ctx: &mut ParseContext<'_>, text: &str) -> Result<(), ConfigError> {
    match ctx.top_handler() {
        HandlerKind::Element | HandlerKind::NestedElement => {
            if let Some(wrapper) = ctx.top_wrapper_mut() {
                wrapper.add_text(text);
            }
            Ok(())
        }
        handler => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(());
            }
            let tag = match handler {
                HandlerKind::Root => "document",
                HandlerKind::Project => "project",
                _ => "target",
            };
            Err(ConfigError::unexpected_content(tag, trimmed).with_location(ctx.location()))
        }
    }
}

pub(crate) fn handle_end(ctx: &mut ParseContext<'_>) -> Result<(), ConfigError> {
    let Some(frame) = ctx.pop_frame() else {
        return Ok(());
    };
    match frame.handler {
        HandlerKind::Target => {
            let implicit = ctx.implicit_target();
            ctx.set_current_target(implicit);
        }
        HandlerKind::Element | HandlerKind::NestedElement => {
            if let Some(wrapper) = frame.wrapper {
                let target = ctx.current_target();
                match ctx.top_wrapper_mut() {
                    Some(parent) => parent.add_child(wrapper),
                    None => target.borrow_mut().push_step(wrapper),
                }
            }
        }
        HandlerKind::Root | HandlerKind::Project => {}
    }
    Ok(())
}

/// `<project>` start: apply name/default/basedir against the model (unless
/// this is an imported file), register the implicit target.
fn project_start(
    ctx: &mut ParseContext<'_>,
    attrs: Vec<(String, String)>,
) -> Result<(), ConfigError> {
    let location = ctx.location();
    let mut basedir_attr: Option<String> = None;

    for (name, value) in attrs {
        match name.as_str() {
            "name" => {
                ctx.session.set_project_name(value.clone());
                if !ctx.ignore_project_tag && !value.is_empty() {
                    ctx.model.set_name(&value);
                }
            }
            "default" => {
                if !ctx.ignore_project_tag && !value.is_empty() {
                    ctx.model.set_default_target(&value);
                }
            }
            "basedir" => {
                if !ctx.ignore_project_tag {
                    basedir_attr = Some(value);
                }
            }
            other => {
                return Err(
                    ConfigError::no_such_attribute("project", other).with_location(location)
                );
            }
        }
    }

    if ctx.ignore_project_tag {
        return Ok(());
    }

    match basedir_attr {
        Some(dir) => {
            let resolved =
                super::entity::resolve_path(ctx.build_file_parent(), std::path::Path::new(&dir));
            let resolved = std::fs::canonicalize(&resolved).unwrap_or(resolved);
            ctx.model.set_basedir(&resolved);
        }
        None => {
            if let Some(parent) = ctx.build_file_parent() {
                ctx.model.set_basedir(parent);
            }
        }
    }

    ctx.model.register_target("", ctx.implicit_target());
    let implicit = ctx.implicit_target();
    ctx.set_current_target(implicit);
    Ok(())
}

/// `<target>` start: read metadata attributes, apply the duplicate-name
/// policy, register, and make it current.
fn target_start(
    ctx: &mut ParseContext<'_>,
    attrs: Vec<(String, String)>,
) -> Result<(), ConfigError> {
    let location = ctx.location();
    let target = crate::model::Target::shared("", location.clone());
    let mut name: Option<String> = None;
    let mut depends = String::new();

    {
        let mut t = target.borrow_mut();
        for (key, value) in attrs {
            match key.as_str() {
                "name" => {
                    if value.is_empty() {
                        return Err(ConfigError::missing_attribute("target", "name")
                            .with_location(location));
                    }
                    name = Some(value);
                }
                "depends" => depends = value,
                "if" => t.set_if(value),
                "unless" => t.set_unless(value),
                "description" => t.set_description(value),
                other => {
                    return Err(ConfigError::no_such_attribute("target", other)
                        .with_location(location));
                }
            }
        }
    }

    let Some(name) = name else {
        return Err(ConfigError::missing_attribute("target", "name").with_location(location));
    };
    {
        let mut t = target.borrow_mut();
        t.set_name(&name);
        t.set_depends(&depends)
            .map_err(|e| e.with_location(location.clone()))?;
    }

    if ctx.model.get_target(&name).is_some() {
        // Collision: with a known project name the newcomer is renamed;
        // without one the later definition is dropped with a log entry.
        match ctx.session.project_name() {
            Some(project) if !project.is_empty() => {
                let renamed = format!("{project}.{name}");
                target.borrow_mut().set_name(&renamed);
                ctx.model.log(
                    LogLevel::Verbose,
                    &format!("target \"{name}\" already exists; registering as \"{renamed}\""),
                );
                ctx.model.register_target(&renamed, target.clone());
            }
            _ => {
                ctx.model.log(
                    LogLevel::Warn,
                    &format!("target \"{name}\" already exists; ignoring the later definition"),
                );
            }
        }
    } else {
        ctx.model.register_target(&name, target.clone());
    }

    ctx.set_current_target(target);
    Ok(())
}

/// Task/data-type element start: data-type names win, then task lookup,
/// then an unresolved placeholder whose error is deferred to execution.
fn element_start(
    ctx: &mut ParseContext<'_>,
    tag: &str,
    attrs: Vec<(String, String)>,
) -> Result<Frame, ConfigError> {
    let location = ctx.location();
    let instance: Option<ComponentRef> = if ctx
        .model
        .registered_data_type_names()
        .iter()
        .any(|n| n.eq_ignore_ascii_case(tag))
    {
        let instance = ctx.model.create_data_type_instance(tag).ok_or_else(|| {
            ConfigError::unexpected_element(tag).with_location(location.clone())
        })?;
        Some(instance)
    } else if let Some(instance) = ctx.model.create_task_instance(tag) {
        Some(instance)
    } else {
        tracing::debug!(tag, "no registered component, deferring lookup");
        None
    };

    let schema = match &instance {
        Some(instance) => Some(instance.borrow().schema()?),
        None => None,
    };
    let mut wrapper = match instance {
        Some(instance) => ElementWrapper::with_instance(tag, instance, location),
        None => ElementWrapper::new(tag, location),
    };
    apply_attributes(&mut wrapper, attrs)?;
    Ok(Frame {
        handler: HandlerKind::Element,
        wrapper: Some(wrapper),
        schema,
    })
}

/// Nested element start: resolved strictly against the parent's schema. A
/// parent whose schema is unknown (placeholder) defers all validation.
fn nested_start(
    ctx: &mut ParseContext<'_>,
    tag: &str,
    attrs: Vec<(String, String)>,
) -> Result<Frame, ConfigError> {
    let location = ctx.location();
    let schema = match ctx.top_schema() {
        Some(parent) => {
            let key = names::element_lookup_key(tag);
            if let Some(creator) = parent.element_creator(&key) {
                Some(creator.product_schema()?)
            } else if let Some(adder) = parent.element_adder(&key) {
                Some(adder.param_schema()?)
            } else {
                return Err(ConfigError::unexpected_element(tag).with_location(location));
            }
        }
        None => None,
    };
    let mut wrapper = ElementWrapper::new(tag, location);
    apply_attributes(&mut wrapper, attrs)?;
    Ok(Frame {
        handler: HandlerKind::NestedElement,
        wrapper: Some(wrapper),
        schema,
    })
}

fn apply_attributes(
    wrapper: &mut ElementWrapper,
    attrs: Vec<(String, String)>,
) -> Result<(), ConfigError> {
    for (name, value) in attrs {
        wrapper.set_attribute(name, value)?;
    }
    Ok(())
}
