//! anvil: interpret a declarative XML build file

mod cli;
mod tasks;
mod types;

use anyhow::{anyhow, Context};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use anvil_core::{
    BuildModel, BuildParser, Configurer, ParseSession, Project, UndefinedPolicy,
};

use cli::Args;

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

#[derive(Serialize)]
struct TargetInfo {
    name: String,
    description: Option<String>,
    depends: Vec<String>,
}

fn run(args: Args) -> anyhow::Result<()> {
    let project = Project::new();
    tasks::register_builtin_tasks(&project);
    types::register_builtin_types(&project);

    for define in &args.define {
        let (key, value) = cli::parse_define(define)
            .ok_or_else(|| anyhow!("invalid property definition \"{define}\", expected KEY=VALUE"))?;
        project.set_property(key, value);
    }

    let policy = if args.strict_properties {
        UndefinedPolicy::Error
    } else {
        UndefinedPolicy::Empty
    };
    let parser = BuildParser::new()
        .with_undefined_policy(policy)
        .run_implicit_target(!args.list);
    let mut session = ParseSession::new();
    parser.parse_file(&project, &project, &mut session, &args.build_file)?;

    if args.list {
        return list_targets(&project, &args.output);
    }

    let requested = if args.targets.is_empty() {
        match project.default_target() {
            Some(name) => vec![name],
            None => Vec::new(),
        }
    } else {
        args.targets.clone()
    };

    let configurer = Configurer::new(&project, &project).with_undefined_policy(policy);
    for name in &requested {
        let target = project
            .get_target(name)
            .ok_or_else(|| anyhow!("target \"{name}\" does not exist in the project"))?;
        println!("{name}:");
        configurer
            .run_target(&target)
            .with_context(|| format!("target \"{name}\" failed"))?;
    }
    Ok(())
}

fn list_targets(project: &Project, output: &str) -> anyhow::Result<()> {
    let infos: Vec<TargetInfo> = project
        .target_names()
        .into_iter()
        .filter(|name| !name.is_empty())
        .filter_map(|name| project.get_target(&name))
        .map(|target| {
            let t = target.borrow();
            TargetInfo {
                name: t.name().to_string(),
                description: t.description().map(str::to_string),
                depends: t.depends().to_vec(),
            }
        })
        .collect();

    match output {
        "json" => println!("{}", serde_json::to_string_pretty(&infos)?),
        "text" => {
            let default = project.default_target();
            for info in &infos {
                let marker = if default.as_deref() == Some(info.name.as_str()) {
                    "*"
                } else {
                    " "
                };
                match &info.description {
                    Some(description) => println!("{marker} {:<20} {description}", info.name),
                    None => println!("{marker} {}", info.name),
                }
            }
        }
        other => return Err(anyhow!("unknown output format: {other}")),
    }
    Ok(())
}
