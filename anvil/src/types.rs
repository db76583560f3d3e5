//! Built-in data types
//!
//! Non-executable aggregates referenced by tasks: path collections and file
//! sets. These demonstrate the creator/adder nesting patterns.

use std::path::PathBuf;

use anvil_core::{ClassSpec, Introspectable, Project};

/// One entry of a path: either a single location or a pre-joined string.
#[derive(Default)]
pub struct PathElement {
    location: Option<PathBuf>,
    path: Option<String>,
}

impl PathElement {
    fn parts(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if let Some(location) = &self.location {
            out.push(location.clone());
        }
        if let Some(path) = &self.path {
            out.extend(path.split(':').filter(|p| !p.is_empty()).map(PathBuf::from));
        }
        out
    }
}

impl Introspectable for PathElement {
    fn class_name() -> &'static str {
        "pathelement"
    }

    fn describe(spec: &mut ClassSpec<Self>) {
        spec.attribute("location", |p: &mut PathElement, v: PathBuf| {
            p.location = Some(v)
        });
        spec.attribute("path", |p: &mut PathElement, v: String| p.path = Some(v));
    }
}

/// An ordered collection of filesystem locations.
#[derive(Default)]
pub struct PathSet {
    entries: Vec<PathBuf>,
}

impl PathSet {
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }
}

impl Introspectable for PathSet {
    fn class_name() -> &'static str {
        "path"
    }

    fn describe(spec: &mut ClassSpec<Self>) {
        spec.attribute("location", |p: &mut PathSet, v: PathBuf| {
            p.entries.push(v)
        });
        spec.creator("pathelement", |_: &mut PathSet| PathElement::default());
        spec.adder("pathelement", |p: &mut PathSet, element: PathElement| {
            p.entries.extend(element.parts())
        });
    }
}

/// An include/exclude pattern inside a fileset.
#[derive(Default)]
pub struct PatternElement {
    name: Option<String>,
}

impl Introspectable for PatternElement {
    fn class_name() -> &'static str {
        "patternelement"
    }

    fn describe(spec: &mut ClassSpec<Self>) {
        spec.attribute("name", |p: &mut PatternElement, v: String| {
            p.name = Some(v)
        });
    }
}

/// A rooted group of files selected by patterns. Selection itself happens
/// in whatever task consumes the set.
#[derive(Default)]
pub struct FileSet {
    dir: Option<PathBuf>,
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl FileSet {
    pub fn dir(&self) -> Option<&PathBuf> {
        self.dir.as_ref()
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }
}

impl Introspectable for FileSet {
    fn class_name() -> &'static str {
        "fileset"
    }

    fn describe(spec: &mut ClassSpec<Self>) {
        spec.attribute("dir", |f: &mut FileSet, v: PathBuf| f.dir = Some(v));
        spec.creator("include", |_: &mut FileSet| PatternElement::default());
        spec.adder("include", |f: &mut FileSet, p: PatternElement| {
            f.includes.extend(p.name)
        });
        spec.creator("exclude", |_: &mut FileSet| PatternElement::default());
        spec.adder("exclude", |f: &mut FileSet, p: PatternElement| {
            f.excludes.extend(p.name)
        });
    }
}

/// Register every built-in data type on `project`.
pub fn register_builtin_types(project: &Project) {
    project.register_data_type::<PathSet>("path");
    project.register_data_type::<FileSet>("fileset");
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::{new_component, Configurer, ElementWrapper, Location};

    fn configure(instance: &anvil_core::ComponentRef, element: &mut ElementWrapper) {
        let project = Project::new();
        Configurer::new(&project, &project)
            .configure(instance, element)
            .unwrap();
    }

    #[test]
    fn path_collects_locations_and_elements() {
        let instance = new_component(PathSet::default());
        let mut element =
            ElementWrapper::with_instance("path", instance.clone(), Location::unknown());
        element.set_attribute("location", "lib").unwrap();
        let mut nested = ElementWrapper::new("pathelement", Location::unknown());
        nested.set_attribute("path", "a.jar:b.jar").unwrap();
        element.add_child(nested);

        configure(&instance, &mut element);
        let guard = instance.borrow();
        let path = guard.as_any().downcast_ref::<PathSet>().unwrap();
        assert_eq!(
            path.entries(),
            [
                PathBuf::from("lib"),
                PathBuf::from("a.jar"),
                PathBuf::from("b.jar")
            ]
        );
    }

    #[test]
    fn fileset_gathers_patterns() {
        let instance = new_component(FileSet::default());
        let mut element =
            ElementWrapper::with_instance("fileset", instance.clone(), Location::unknown());
        element.set_attribute("dir", "src").unwrap();
        let mut include = ElementWrapper::new("include", Location::unknown());
        include.set_attribute("name", "**/*.rs").unwrap();
        element.add_child(include);
        let mut exclude = ElementWrapper::new("exclude", Location::unknown());
        exclude.set_attribute("name", "target/**").unwrap();
        element.add_child(exclude);

        configure(&instance, &mut element);
        let guard = instance.borrow();
        let fileset = guard.as_any().downcast_ref::<FileSet>().unwrap();
        assert_eq!(fileset.dir(), Some(&PathBuf::from("src")));
        assert_eq!(fileset.includes(), ["**/*.rs"]);
        assert_eq!(fileset.excludes(), ["target/**"]);
    }
}
