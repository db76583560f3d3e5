//! Built-in tasks
//!
//! A small set of components exercising the lifecycle contract. Everything
//! here is an ordinary introspectable struct; the engine knows nothing
//! about any of them.

use std::time::Duration;

use anvil_core::{ClassSpec, ComponentRef, Introspectable, LogLevel, Project};

/// Writes a message to the build log and standard output.
#[derive(Default)]
pub struct Echo {
    message: String,
}

impl Introspectable for Echo {
    fn class_name() -> &'static str {
        "echo"
    }

    fn describe(spec: &mut ClassSpec<Self>) {
        spec.attribute("message", |e: &mut Echo, v: String| e.message = v);
        spec.content(|e: &mut Echo, text| e.message.push_str(text));
        spec.executes(|e, ctx| {
            println!("     [echo] {}", e.message);
            ctx.model.log(LogLevel::Info, &e.message);
            Ok(())
        });
    }
}

/// Pauses the build.
#[derive(Default)]
pub struct Sleep {
    seconds: f64,
    milliseconds: u64,
}

impl Introspectable for Sleep {
    fn class_name() -> &'static str {
        "sleep"
    }

    fn describe(spec: &mut ClassSpec<Self>) {
        spec.attribute("seconds", |s: &mut Sleep, v: f64| s.seconds = v);
        spec.attribute("milliseconds", |s: &mut Sleep, v: u64| s.milliseconds = v);
        spec.executes(|s, _ctx| {
            let total = Duration::from_secs_f64(s.seconds.max(0.0))
                + Duration::from_millis(s.milliseconds);
            tracing::debug!(?total, "sleeping");
            std::thread::sleep(total);
            Ok(())
        });
    }
}

/// Runs its nested tasks in document order.
#[derive(Default)]
pub struct Sequential {
    tasks: Vec<ComponentRef>,
}

impl Introspectable for Sequential {
    fn class_name() -> &'static str {
        "sequential"
    }

    fn describe(spec: &mut ClassSpec<Self>) {
        spec.task_container(|s: &mut Sequential, task| s.tasks.push(task));
        spec.executes(|s, ctx| {
            for task in &s.tasks {
                ctx.execute_component(task)?;
            }
            Ok(())
        });
    }
}

/// Register every built-in task on `project`.
pub fn register_builtin_tasks(project: &Project) {
    project.register_task::<Echo>("echo");
    project.register_task::<Sleep>("sleep");
    project.register_task::<Sequential>("sequential");
}
