//! Build-file parsing
//!
//! A streaming quick-xml event loop drives the handler stack: each start
//! tag pushes a (handler, wrapper) frame, text accumulates into the open
//! wrapper, and each end tag pops and attaches. After the document closes,
//! the implicit target's top-level steps are configured and executed.
//!
//! Repeated `parse_file` calls against the same [`ParseSession`] behave as
//! imports: already-seen files are skipped, the `<project>` tag of later
//! files is ignored, and colliding target names go through the duplicate
//! policy.

pub mod entity;

mod context;
mod handler;

pub use context::ParseSession;
pub use entity::{EntityResolver, EntitySource, FileEntityResolver, NullEntityResolver};

use std::path::{Path, PathBuf};

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::configure::Configurer;
use crate::error::{ConfigError, Location};
use crate::model::{BuildModel, LogLevel};
use crate::properties::{PropertyContext, UndefinedPolicy};
use crate::uri;

use context::ParseContext;

/// Maps byte offsets to 1-based line/column pairs.
struct LineMap {
    line_starts: Vec<usize>,
}

impl LineMap {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        LineMap { line_starts }
    }

    fn locate(&self, offset: usize) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        ((line + 1) as u32, (offset - self.line_starts[line] + 1) as u32)
    }
}

/// Parses build files into a [`BuildModel`].
pub struct BuildParser {
    resolver: Box<dyn EntityResolver>,
    undefined: UndefinedPolicy,
    run_implicit: bool,
}

impl Default for BuildParser {
    fn default() -> Self {
        BuildParser::new()
    }
}

impl BuildParser {
    pub fn new() -> Self {
        BuildParser {
            resolver: Box::new(FileEntityResolver::new()),
            undefined: UndefinedPolicy::default(),
            run_implicit: true,
        }
    }

    /// Replace the entity resolution collaborator.
    pub fn with_resolver(mut self, resolver: impl EntityResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Select how undefined `${...}` references behave during
    /// configuration.
    pub fn with_undefined_policy(mut self, policy: UndefinedPolicy) -> Self {
        self.undefined = policy;
        self
    }

    /// Whether top-level steps (the implicit target) run right after the
    /// parse. Defaults to true.
    pub fn run_implicit_target(mut self, run: bool) -> Self {
        self.run_implicit = run;
        self
    }

    /// Parse a build file from disk. Re-parsing a file already seen by
    /// `session` is suppressed with a log entry, not an error.
    pub fn parse_file(
        &self,
        model: &dyn BuildModel,
        properties: &dyn PropertyContext,
        session: &mut ParseSession,
        path: &Path,
    ) -> Result<(), ConfigError> {
        let path = std::fs::canonicalize(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        if !session.mark_imported(&path) {
            model.log(
                LogLevel::Verbose,
                &format!("skipping already-imported file {}", path.display()),
            );
            return Ok(());
        }

        let system_id = uri::to_file_uri(&path);
        model.log(
            LogLevel::Verbose,
            &format!("parsing build file {} with URI {}", path.display(), system_id),
        );
        let source = match self.resolver.resolve(None, &system_id) {
            Some(EntitySource::Content(content)) => content,
            Some(EntitySource::File(substitute)) => std::fs::read_to_string(&substitute)
                .map_err(|e| ConfigError::io(substitute.display().to_string(), e))?,
            None => std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::io(path.display().to_string(), e))?,
        };
        self.parse_source(model, properties, session, &source, Some(path))
    }

    /// Parse build-file content directly; `system_id` labels locations in
    /// diagnostics.
    pub fn parse_str(
        &self,
        model: &dyn BuildModel,
        properties: &dyn PropertyContext,
        session: &mut ParseSession,
        source: &str,
        system_id: &str,
    ) -> Result<(), ConfigError> {
        self.parse_source(model, properties, session, source, Some(PathBuf::from(system_id)))
    }

    fn parse_source(
        &self,
        model: &dyn BuildModel,
        properties: &dyn PropertyContext,
        session: &mut ParseSession,
        source: &str,
        file: Option<PathBuf>,
    ) -> Result<(), ConfigError> {
        let ignore_project_tag = session.parsed_top_level();
        let lines = LineMap::new(source);
        let implicit;
        {
            let mut ctx = ParseContext::new(model, session, file, ignore_project_tag);
            let mut reader = Reader::from_str(source);
            loop {
                let (line, column) = lines.locate(reader.buffer_position() as usize);
                ctx.set_position(line, column);
                match reader.read_event() {
                    Ok(Event::Start(e)) => {
                        let (tag, attrs) = decode_start(&e, &ctx.location())?;
                        handler::handle_start(&mut ctx, &tag, attrs)?;
                    }
                    Ok(Event::Empty(e)) => {
                        let (tag, attrs) = decode_start(&e, &ctx.location())?;
                        handler::handle_start(&mut ctx, &tag, attrs)?;
                        handler::handle_end(&mut ctx)?;
                    }
                    Ok(Event::Text(e)) => {
                        let text = e
                            .unescape()
                            .map_err(|err| ConfigError::xml(err.to_string())
                                .with_location(ctx.location()))?;
                        handler::handle_text(&mut ctx, &text)?;
                    }
                    Ok(Event::CData(e)) => {
                        let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                        handler::handle_text(&mut ctx, &text)?;
                    }
                    Ok(Event::End(_)) => {
                        handler::handle_end(&mut ctx)?;
                    }
                    Ok(Event::Eof) => break,
                    Ok(_) => {}
                    Err(err) => {
                        return Err(ConfigError::xml(err.to_string())
                            .with_location(ctx.location()));
                    }
                }
            }
            implicit = ctx.implicit_target();
        }
        session.mark_parsed_top_level();

        if self.run_implicit {
            Configurer::new(model, properties)
                .with_undefined_policy(self.undefined)
                .run_target(&implicit)?;
        }
        Ok(())
    }
}

fn decode_start(
    e: &BytesStart<'_>,
    location: &Location,
) -> Result<(String, Vec<(String, String)>), ConfigError> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| match err {
            AttrError::Duplicated(..) => ConfigError::multiple_definition(format!(
                "attribute appears twice on <{tag}>"
            ))
            .with_location(location.clone()),
            other => ConfigError::xml(other.to_string()).with_location(location.clone()),
        })?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| ConfigError::xml(err.to_string()).with_location(location.clone()))?
            .to_string();
        attrs.push((name, value));
    }
    Ok((tag, attrs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_map_locates_offsets() {
        let map = LineMap::new("ab\ncd\n\nef");
        assert_eq!(map.locate(0), (1, 1));
        assert_eq!(map.locate(1), (1, 2));
        assert_eq!(map.locate(3), (2, 1));
        assert_eq!(map.locate(6), (3, 1));
        assert_eq!(map.locate(7), (4, 1));
    }

    #[test]
    fn line_map_single_line() {
        let map = LineMap::new("<project/>");
        assert_eq!(map.locate(5), (1, 6));
    }
}
