//! File resolution for segment filenames.
//!
//! A segment references media by bare filename. Resolution probes an ordered
//! list of directories and returns the first existing match; the normalizer
//! and renderer receive the resolver explicitly instead of looking up
//! process-wide paths.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Maps a referenced filename to a concrete path, if it exists.
pub trait FileResolver: Send + Sync {
    fn resolve(&self, filename: &str) -> Option<PathBuf>;
}

impl<T: FileResolver + ?Sized> FileResolver for &T {
    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        (**self).resolve(filename)
    }
}

impl<T: FileResolver + ?Sized> FileResolver for Arc<T> {
    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        (**self).resolve(filename)
    }
}

/// Probes directories in order, returning the first regular file found.
#[derive(Debug, Clone, Default)]
pub struct SearchPathResolver {
    dirs: Vec<PathBuf>,
}

impl SearchPathResolver {
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Directories in probe order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }
}

impl FileResolver for SearchPathResolver {
    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let relative = safe_relative(filename)?;
        self.dirs
            .iter()
            .map(|dir| dir.join(relative))
            .find(|candidate| candidate.is_file())
    }
}

/// In-memory resolver over a fixed set of filenames.
///
/// Resolves each known name to `root/name`. Useful wherever the set of
/// available files is already known, and in tests.
#[derive(Debug, Clone, Default)]
pub struct KnownFiles {
    root: PathBuf,
    files: HashMap<String, PathBuf>,
}

impl KnownFiles {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_root(PathBuf::new(), names)
    }

    pub fn with_root<I, S>(root: impl Into<PathBuf>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let root = root.into();
        let files = names
            .into_iter()
            .map(Into::into)
            .map(|name| {
                let path = root.join(&name);
                (name, path)
            })
            .collect();
        Self { root, files }
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        let name = name.into();
        let path = self.root.join(&name);
        self.files.insert(name, path);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileResolver for KnownFiles {
    fn resolve(&self, filename: &str) -> Option<PathBuf> {
        self.files.get(filename.trim()).cloned()
    }
}

/// Accept only non-empty relative paths that stay inside the probed directory.
fn safe_relative(filename: &str) -> Option<&Path> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return None;
    }

    let path = Path::new(trimmed);
    let contained = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

    contained.then_some(path)
}
