//! End-to-end parse/configure/run tests against the reference build model.

use std::io::Write;
use std::path::PathBuf;

use anvil_core::{
    BuildModel, BuildParser, ClassSpec, ComponentRef, Configurer, ErrorKind, Introspectable,
    LogLevel, ParseSession, Project,
};

#[derive(Default)]
struct Echo {
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
            ctx.model.log(LogLevel::Info, &e.message);
            Ok(())
        });
    }
}

#[derive(Default)]
struct Sequence {
    tasks: Vec<ComponentRef>,
}

impl Introspectable for Sequence {
    fn class_name() -> &'static str {
        "sequence"
    }

    fn describe(spec: &mut ClassSpec<Self>) {
        spec.task_container(|s: &mut Sequence, task| s.tasks.push(task));
        spec.executes(|s, ctx| {
            for task in &s.tasks {
                ctx.execute_component(task)?;
            }
            Ok(())
        });
    }
}

#[derive(Default)]
struct PathElement {
    location: Option<String>,
}

impl Introspectable for PathElement {
    fn class_name() -> &'static str {
        "pathelement"
    }

    fn describe(spec: &mut ClassSpec<Self>) {
        spec.attribute("location", |p: &mut PathElement, v: String| {
            p.location = Some(v)
        });
    }
}

#[derive(Default)]
struct PathSet {
    entries: Vec<String>,
}

impl Introspectable for PathSet {
    fn class_name() -> &'static str {
        "path"
    }

    fn describe(spec: &mut ClassSpec<Self>) {
        spec.creator("pathelement", |_: &mut PathSet| PathElement::default());
        spec.adder("pathelement", |p: &mut PathSet, e: PathElement| {
            p.entries.extend(e.location)
        });
    }
}

fn fixture_project() -> Project {
    let project = Project::new();
    project.register_task::<Echo>("echo");
    project.register_task::<Sequence>("sequence");
    project.register_data_type::<PathSet>("path");
    project
}

fn parse(project: &Project, source: &str) -> Result<(), anvil_core::ConfigError> {
    let mut session = ParseSession::new();
    BuildParser::new().parse_str(project, project, &mut session, source, "build.xml")
}

fn info_messages(project: &Project) -> Vec<String> {
    project
        .messages()
        .into_iter()
        .filter(|(level, _)| *level == LogLevel::Info)
        .map(|(_, message)| message)
        .collect()
}

#[test]
fn end_to_end_echo_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let build_file = dir.path().join("build.xml");
    let mut file = std::fs::File::create(&build_file).unwrap();
    write!(
        file,
        r#"<project name="demo" default="main" basedir=".">
  <target name="main">
    <echo message="hello ${{user}}"/>
  </target>
</project>"#
    )
    .unwrap();

    let project = fixture_project();
    project.set_property("user", "world");

    let mut session = ParseSession::new();
    BuildParser::new()
        .parse_file(&project, &project, &mut session, &build_file)
        .unwrap();

    assert_eq!(project.name(), Some("demo".to_string()));
    assert_eq!(project.default_target(), Some("main".to_string()));
    let basedir = project.basedir().expect("basedir set");
    assert_eq!(
        std::fs::canonicalize(&basedir).unwrap(),
        std::fs::canonicalize(dir.path()).unwrap()
    );

    let main = project.get_target("main").expect("main registered");
    assert_eq!(main.borrow().steps().len(), 1);

    Configurer::new(&project, &project).run_target(&main).unwrap();
    assert_eq!(info_messages(&project), ["hello world"]);

    // The configured instance holds the substituted attribute value.
    let target = main.borrow();
    let step = &target.steps()[0];
    let instance = step.instance().expect("materialized");
    let guard = instance.borrow();
    let echo = guard.as_any().downcast_ref::<Echo>().unwrap();
    assert_eq!(echo.message, "hello world");
}

#[test]
fn target_without_name_fails_with_location() {
    let project = fixture_project();
    let err = parse(
        &project,
        "<project name=\"demo\">\n  <target>\n    <echo message=\"x\"/>\n  </target>\n</project>",
    )
    .unwrap_err();

    assert!(matches!(err.kind(), ErrorKind::MissingAttribute { .. }));
    let location = err.location().expect("location attached");
    assert_eq!(location.file, Some(PathBuf::from("build.xml")));
    assert_eq!(location.line, 2);
    // Nothing was configured or executed before the failure.
    assert!(info_messages(&project).is_empty());
}

#[test]
fn unexpected_root_element_is_fatal() {
    let project = fixture_project();
    let err = parse(&project, "<job name=\"demo\"/>").unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::UnexpectedElement { tag } if tag == "job"
    ));
}

#[test]
fn stray_text_in_target_is_rejected() {
    let project = fixture_project();
    let err = parse(
        &project,
        "<project><target name=\"t\">stray words</target></project>",
    )
    .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnexpectedContent { .. }));
}

#[test]
fn duplicate_target_renamed_under_project_name() {
    let project = fixture_project();
    parse(
        &project,
        r#"<project name="p">
  <target name="a" description="first"/>
  <target name="a" description="second"/>
</project>"#,
    )
    .unwrap();

    let first = project.get_target("a").expect("original name kept");
    let renamed = project.get_target("p.a").expect("collision renamed");
    assert_eq!(first.borrow().description(), Some("first"));
    assert_eq!(renamed.borrow().description(), Some("second"));
    assert_eq!(renamed.borrow().name(), "p.a");
}

#[test]
fn duplicate_target_dropped_without_project_name() {
    let project = fixture_project();
    parse(
        &project,
        r#"<project>
  <target name="a" description="first"/>
  <target name="a" description="second"/>
</project>"#,
    )
    .unwrap();

    let survivor = project.get_target("a").expect("first definition survives");
    assert_eq!(survivor.borrow().description(), Some("first"));
    assert!(project.get_target(".a").is_none());
    assert!(project
        .messages()
        .iter()
        .any(|(level, message)| *level == LogLevel::Warn && message.contains("\"a\"")));
}

#[test]
fn unknown_task_error_is_deferred_to_execution() {
    let project = fixture_project();
    parse(
        &project,
        "<project><target name=\"t\"><frobnicate speed=\"11\"/></target></project>",
    )
    .expect("unknown task names parse cleanly");

    let target = project.get_target("t").unwrap();
    let err = Configurer::new(&project, &project)
        .run_target(&target)
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::UnexpectedElement { tag } if tag == "frobnicate"
    ));
    assert!(err.location().is_some());
}

#[test]
fn unknown_nested_element_fails_at_parse_time() {
    let project = fixture_project();
    let err = parse(
        &project,
        "<project><target name=\"t\"><echo><bogus/></echo></target></project>",
    )
    .unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::UnexpectedElement { tag } if tag == "bogus"
    ));
    assert!(err.location().is_some());
}

#[test]
fn task_container_collects_and_runs_children_in_order() {
    let project = fixture_project();
    parse(
        &project,
        r#"<project>
  <target name="t">
    <sequence>
      <echo message="one"/>
      <echo message="two"/>
    </sequence>
  </target>
</project>"#,
    )
    .unwrap();

    let target = project.get_target("t").unwrap();
    Configurer::new(&project, &project).run_target(&target).unwrap();
    assert_eq!(info_messages(&project), ["one", "two"]);
}

#[test]
fn top_level_tasks_run_with_the_implicit_target() {
    let project = fixture_project();
    parse(
        &project,
        "<project><echo message=\"setup\"/><target name=\"t\"/></project>",
    )
    .unwrap();
    assert_eq!(info_messages(&project), ["setup"]);
    // The implicit target is registered under the empty name.
    assert!(project.get_target("").is_some());
}

#[test]
fn nested_text_content_is_resolved() {
    let project = fixture_project();
    project.set_property("user", "world");
    parse(&project, "<project><echo>hi ${user}</echo></project>").unwrap();
    assert_eq!(info_messages(&project), ["hi world"]);
}

#[test]
fn data_type_with_id_registers_a_reference() {
    let project = fixture_project();
    parse(
        &project,
        r#"<project>
  <target name="libs">
    <path id="lib.path">
      <pathelement location="a.jar"/>
      <pathelement location="b.jar"/>
    </path>
  </target>
</project>"#,
    )
    .unwrap();

    let target = project.get_target("libs").unwrap();
    Configurer::new(&project, &project).run_target(&target).unwrap();

    let reference = project.get_reference("lib.path").expect("id registered");
    let guard = reference.borrow();
    let path = guard.as_any().downcast_ref::<PathSet>().unwrap();
    assert_eq!(path.entries, ["a.jar", "b.jar"]);
}

#[test]
fn unknown_element_under_data_type_fails_at_parse_time() {
    let project = fixture_project();
    let err = parse(
        &project,
        "<project><target name=\"t\"><path><bogus/></path></target></project>",
    )
    .unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::UnexpectedElement { tag } if tag == "bogus"
    ));
}

#[test]
fn guard_conditions_skip_targets() {
    let project = fixture_project();
    parse(
        &project,
        r#"<project>
  <target name="guarded" if="flag"><echo message="ran"/></target>
  <target name="blocked" unless="present"><echo message="blocked"/></target>
</project>"#,
    )
    .unwrap();
    project.set_property("present", "1");

    let configurer = Configurer::new(&project, &project);
    configurer
        .run_target(&project.get_target("guarded").unwrap())
        .unwrap();
    configurer
        .run_target(&project.get_target("blocked").unwrap())
        .unwrap();
    assert!(info_messages(&project).is_empty());

    project.set_property("flag", "1");
    configurer
        .run_target(&project.get_target("guarded").unwrap())
        .unwrap();
    assert_eq!(info_messages(&project), ["ran"]);
}

#[test]
fn imported_files_share_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("build.xml");
    let extra = dir.path().join("extra.xml");
    std::fs::write(
        &main,
        "<project name=\"p\" default=\"a\"><target name=\"a\" description=\"main\"/></project>",
    )
    .unwrap();
    std::fs::write(
        &extra,
        "<project name=\"q\" default=\"z\"><target name=\"a\" description=\"imported\"/></project>",
    )
    .unwrap();

    let project = fixture_project();
    let parser = BuildParser::new();
    let mut session = ParseSession::new();
    parser
        .parse_file(&project, &project, &mut session, &main)
        .unwrap();
    parser
        .parse_file(&project, &project, &mut session, &extra)
        .unwrap();

    // The imported project tag is ignored; the colliding target is renamed
    // under the imported project's name.
    assert_eq!(project.name(), Some("p".to_string()));
    assert_eq!(project.default_target(), Some("a".to_string()));
    assert_eq!(
        project.get_target("a").unwrap().borrow().description(),
        Some("main")
    );
    assert_eq!(
        project.get_target("q.a").unwrap().borrow().description(),
        Some("imported")
    );

    // Re-importing the same file is suppressed, not an error.
    parser
        .parse_file(&project, &project, &mut session, &main)
        .unwrap();
    assert!(project
        .messages()
        .iter()
        .any(|(_, message)| message.contains("already-imported")));
}

#[test]
fn attribute_order_is_document_order() {
    let project = fixture_project();
    parse(
        &project,
        "<project><target name=\"t\"><echo message=\"kept\"/></target></project>",
    )
    .unwrap();
    let target = project.get_target("t").unwrap();
    let t = target.borrow();
    let attrs = t.steps()[0].attributes();
    assert_eq!(attrs, [("message".to_string(), "kept".to_string())]);
}
