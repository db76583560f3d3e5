//! Entity resolution collaborator
//!
//! Before a system identifier is read, the resolver may substitute a local
//! input. Failure to resolve is never fatal: the parser falls back to
//! reading the identifier directly.

use std::path::{Path, PathBuf};

use crate::uri;

/// A substitute input produced by an entity resolver.
pub enum EntitySource {
    /// Literal document content.
    Content(String),
    /// A local file to read instead of the original identifier.
    File(PathBuf),
}

/// Maps public/system identifiers to substitute inputs.
pub trait EntityResolver {
    /// Return a substitute for the identifier, or `None` to use the
    /// parser's default resolution.
    fn resolve(&self, public_id: Option<&str>, system_id: &str) -> Option<EntitySource>;
}

/// Default resolver: turns `file:` system identifiers into local paths,
/// resolving relative ones against a base directory.
#[derive(Default)]
pub struct FileEntityResolver {
    base_dir: Option<PathBuf>,
}

impl FileEntityResolver {
    pub fn new() -> Self {
        FileEntityResolver::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        FileEntityResolver {
            base_dir: Some(base_dir.into()),
        }
    }
}

impl EntityResolver for FileEntityResolver {
    fn resolve(&self, _public_id: Option<&str>, system_id: &str) -> Option<EntitySource> {
        let path = uri::from_file_uri(system_id)?;
        let path = if path.is_absolute() {
            path
        } else {
            match &self.base_dir {
                Some(base) => base.join(path),
                None => path,
            }
        };
        if path.is_file() {
            tracing::debug!(path = %path.display(), "resolved system id locally");
            Some(EntitySource::File(path))
        } else {
            tracing::debug!(%system_id, "could not resolve system id");
            None
        }
    }
}

/// Resolver that never substitutes anything.
pub struct NullEntityResolver;

impl EntityResolver for NullEntityResolver {
    fn resolve(&self, _public_id: Option<&str>, _system_id: &str) -> Option<EntitySource> {
        None
    }
}

/// Resolve `relative` against `base`, leaving absolute paths alone.
pub fn resolve_path(base: Option<&Path>, relative: &Path) -> PathBuf {
    if relative.is_absolute() {
        relative.to_path_buf()
    } else {
        match base {
            Some(base) => base.join(relative),
            None => relative.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolves_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("common.xml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "<project/>").unwrap();

        let resolver = FileEntityResolver::with_base_dir(dir.path());
        let resolved = resolver.resolve(None, &uri::to_file_uri(&path));
        assert!(matches!(resolved, Some(EntitySource::File(p)) if p == path));

        let relative = resolver.resolve(None, "file:common.xml");
        assert!(matches!(relative, Some(EntitySource::File(p)) if p == path));
    }

    #[test]
    fn missing_files_fall_back() {
        let resolver = FileEntityResolver::new();
        assert!(resolver.resolve(None, "file:///no/such/file.xml").is_none());
        assert!(resolver.resolve(None, "urn:whatever").is_none());
    }
}
