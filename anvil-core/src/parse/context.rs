//! Per-parse state
//!
//! Handlers are stateless values; everything mutable during a parse lives
//! here and is threaded through every handler call. The frame stack pairs
//! each open element's handler with its wrapper-under-construction, so the
//! old "handler depth equals wrapper depth" invariant holds by construction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Location;
use crate::model::{BuildModel, Target, TargetRef};
use crate::schema::ClassSchema;
use crate::wrapper::ElementWrapper;

/// State that outlives a single `parse_file` call: the table of already
/// imported build files and the current project name, shared by every file
/// parsed into the same model.
#[derive(Default)]
pub struct ParseSession {
    imported: HashSet<PathBuf>,
    project_name: Option<String>,
    parsed_top_level: bool,
}

impl ParseSession {
    pub fn new() -> Self {
        ParseSession::default()
    }

    /// Record `path` as imported; returns false when it was already known
    /// (cycle or duplicate import).
    pub(crate) fn mark_imported(&mut self, path: &Path) -> bool {
        self.imported.insert(path.to_path_buf())
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub(crate) fn set_project_name(&mut self, name: impl Into<String>) {
        self.project_name = Some(name.into());
    }

    pub(crate) fn parsed_top_level(&self) -> bool {
        self.parsed_top_level
    }

    pub(crate) fn mark_parsed_top_level(&mut self) {
        self.parsed_top_level = true;
    }
}

/// Which element kind the active handler interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandlerKind {
    Root,
    Project,
    Target,
    Element,
    NestedElement,
}

/// One open element: its handler plus the wrapper being built and, when
/// statically known, the schema children are validated against.
pub(crate) struct Frame {
    pub handler: HandlerKind,
    pub wrapper: Option<ElementWrapper>,
    pub schema: Option<Arc<ClassSchema>>,
}

impl Frame {
    pub fn bare(handler: HandlerKind) -> Self {
        Frame {
            handler,
            wrapper: None,
            schema: None,
        }
    }
}

pub(crate) struct ParseContext<'a> {
    pub model: &'a dyn BuildModel,
    pub session: &'a mut ParseSession,
    frames: Vec<Frame>,
    location: Location,
    build_file: Option<PathBuf>,
    build_file_parent: Option<PathBuf>,
    implicit_target: TargetRef,
    current_target: TargetRef,
    pub ignore_project_tag: bool,
}

impl<'a> ParseContext<'a> {
    pub fn new(
        model: &'a dyn BuildModel,
        session: &'a mut ParseSession,
        build_file: Option<PathBuf>,
        ignore_project_tag: bool,
    ) -> Self {
        let build_file_parent = build_file
            .as_ref()
            .and_then(|p| p.parent().map(Path::to_path_buf));
        let implicit_target = Target::shared("", Location::unknown());
        let current_target = implicit_target.clone();
        ParseContext {
            model,
            session,
            frames: vec![Frame::bare(HandlerKind::Root)],
            location: Location::unknown(),
            build_file,
            build_file_parent,
            implicit_target,
            current_target,
            ignore_project_tag,
        }
    }

    pub fn location(&self) -> Location {
        self.location.clone()
    }

    pub fn set_position(&mut self, line: u32, column: u32) {
        self.location = Location::new(self.build_file.clone(), line, column);
    }

    pub fn build_file_parent(&self) -> Option<&Path> {
        self.build_file_parent.as_deref()
    }

    pub fn implicit_target(&self) -> TargetRef {
        self.implicit_target.clone()
    }

    pub fn current_target(&self) -> TargetRef {
        self.current_target.clone()
    }

    pub fn set_current_target(&mut self, target: TargetRef) {
        self.current_target = target;
    }

    pub fn top_handler(&self) -> HandlerKind {
        self.frames.last().map(|f| f.handler).unwrap_or(HandlerKind::Root)
    }

    pub fn top_schema(&self) -> Option<Arc<ClassSchema>> {
        self.frames.last().and_then(|f| f.schema.clone())
    }

    pub fn top_wrapper_mut(&mut self) -> Option<&mut ElementWrapper> {
        self.frames.last_mut().and_then(|f| f.wrapper.as_mut())
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pop the frame for a closing element. The root frame is never popped
    /// because start/end events are balanced by the XML parser.
    pub fn pop_frame(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }
}
