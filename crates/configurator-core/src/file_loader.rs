//! File-based configuration loader
//!
//! Files are registered up front, individually, per directory or through
//! glob patterns, and indexed by their logical name (the file name without
//! its extension). A target resolves in this order:
//!
//! 1. A registered logical name equal to the target. When several files share
//!    the name, the most recently registered one wins.
//! 2. A target with an extension (`"app.json"`) picks the file with that exact
//!    extension under the stripped name (`"app"`).
//! 3. Otherwise the loader declines and the chain moves on.
//!
//! A file that has disappeared since registration is skipped. Any other
//! read failure aborts resolution.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::item::{FileItem, Item};
use crate::loader::Loader;

/// Options for the file loader
#[derive(Debug, Clone, Default)]
pub struct FileLoaderOptions {
    /// Base path for relative files, directories and patterns
    pub base_path: Option<PathBuf>,
    /// Extension filter used by directory and pattern registration when the
    /// call does not provide its own. Empty means every file.
    pub extensions: Vec<String>,
}

/// One indexed file
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedFile {
    extension: String,
    base: String,
    path: PathBuf,
}

impl IndexedFile {
    fn from_path(path: PathBuf) -> (String, Self) {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        (
            name,
            Self {
                extension,
                base,
                path,
            },
        )
    }
}

/// Loader that serves registered files by logical name
#[derive(Debug, Default)]
pub struct FileLoader {
    options: FileLoaderOptions,
    /// Logical name to files, in registration order
    files: RwLock<HashMap<String, Vec<IndexedFile>>>,
}

impl FileLoader {
    /// Create an empty file loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty file loader with custom options
    pub fn with_options(options: FileLoaderOptions) -> Self {
        Self {
            options,
            files: RwLock::default(),
        }
    }

    pub fn options(&self) -> &FileLoaderOptions {
        &self.options
    }

    /// Register a single file, or every regular file matching a glob pattern.
    ///
    /// Arguments containing `*`, `?` or `[` are treated as patterns. A pattern
    /// that matches nothing registers nothing. A concrete path must exist and
    /// be a regular file.
    pub fn add_file(&self, pattern: impl AsRef<Path>) -> Result<()> {
        let pattern = pattern.as_ref();

        match pattern.to_str() {
            Some(p) if is_pattern(p) => {
                let filter = self.extension_filter(&[]);
                let paths = self.expand(p, &filter)?;
                self.register(pattern, paths)
            }
            _ => {
                let path = self.absolute(pattern)?;
                let metadata =
                    std::fs::metadata(&path).map_err(|e| Error::io(e).with_path(&path))?;
                if !metadata.is_file() {
                    return Err(Error::not_regular_file(&path));
                }
                self.register(pattern, vec![path])
            }
        }
    }

    /// Register every regular file directly inside `directory`.
    ///
    /// `extensions` limits the files taken (with or without leading dot);
    /// an empty slice falls back to [`FileLoaderOptions::extensions`].
    pub fn add_dir(&self, directory: impl AsRef<Path>, extensions: &[&str]) -> Result<()> {
        let directory = directory.as_ref();
        let dir = self.absolute(directory)?;
        let filter = self.extension_filter(extensions);

        let entries = std::fs::read_dir(&dir).map_err(|e| Error::io(e).with_path(&dir))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::io(e).with_path(&dir))?.path();
            if is_regular_file(&path)? && matches_filter(&path, &filter) {
                paths.push(path);
            }
        }
        paths.sort();

        self.register(directory, paths)
    }

    /// Builder form of [`add_file`](Self::add_file)
    pub fn with_file(self, pattern: impl AsRef<Path>) -> Result<Self> {
        self.add_file(pattern)?;
        Ok(self)
    }

    /// Builder form of [`add_dir`](Self::add_dir)
    pub fn with_dir(self, directory: impl AsRef<Path>, extensions: &[&str]) -> Result<Self> {
        self.add_dir(directory, extensions)?;
        Ok(self)
    }

    /// Number of indexed files
    pub fn len(&self) -> usize {
        self.read_index().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a logical name is indexed
    pub fn contains(&self, name: &str) -> bool {
        self.read_index().contains_key(name)
    }

    /// Paths of all indexed files, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .read_index()
            .values()
            .flatten()
            .map(|f| f.path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Resolve a target to the file it names, keeping the file metadata.
    pub fn load_file(&self, target: &str) -> Result<Option<FileItem>> {
        let files = self.read_index();

        if let Some(candidates) = files.get(target) {
            for candidate in candidates.iter().rev() {
                if let Some(item) = read_candidate(target, candidate)? {
                    return Ok(Some(item));
                }
            }
        }

        if let Some((name, extension)) = split_extension(target) {
            let candidate = files
                .get(name)
                .and_then(|c| c.iter().rev().find(|f| f.extension == extension));
            if let Some(candidate) = candidate {
                return read_candidate(target, candidate);
            }
        }

        log::trace!("file loader: no file registered for '{}'", target);
        Ok(None)
    }

    /// Validate a batch against itself and the index, then commit it whole.
    fn register(&self, origin: &Path, paths: Vec<PathBuf>) -> Result<()> {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        let mut batch: Vec<(String, IndexedFile)> = Vec::with_capacity(paths.len());
        let mut skipped = 0;

        for path in paths {
            let (name, file) = IndexedFile::from_path(path);

            let existing = files
                .get(&name)
                .and_then(|c| c.iter().find(|f| f.extension == file.extension))
                .or_else(|| {
                    batch
                        .iter()
                        .find(|(n, f)| *n == name && f.extension == file.extension)
                        .map(|(_, f)| f)
                })
                .map(|f| f.path.clone());

            match existing {
                Some(existing) if existing == file.path => skipped += 1,
                Some(existing) => {
                    return Err(Error::registration_conflict(
                        name,
                        file.extension,
                        existing,
                        file.path,
                    ));
                }
                None => batch.push((name, file)),
            }
        }

        log::debug!(
            "file loader: registered {} file(s) from '{}' ({} already known)",
            batch.len(),
            origin.display(),
            skipped
        );

        for (name, file) in batch {
            files.entry(name).or_default().push(file);
        }
        Ok(())
    }

    fn expand(&self, pattern: &str, filter: &[String]) -> Result<Vec<PathBuf>> {
        // The glob results are absolute whenever the base is, so it is never
        // applied twice. Metacharacters in the base are taken literally.
        let pattern = match &self.options.base_path {
            Some(base) if Path::new(pattern).is_relative() => {
                let base =
                    std::path::absolute(base).map_err(|e| Error::io(e).with_path(base))?;
                let base = glob::Pattern::escape(&base.to_string_lossy());
                Path::new(&base).join(pattern).to_string_lossy().into_owned()
            }
            _ => pattern.to_string(),
        };

        let entries = glob::glob(&pattern).map_err(|e| Error::invalid_pattern(&pattern, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| {
                let path = e.path().to_path_buf();
                Error::io(e.into_error()).with_path(path)
            })?;
            if is_regular_file(&path)? && matches_filter(&path, filter) {
                let path =
                    std::path::absolute(&path).map_err(|e| Error::io(e).with_path(&path))?;
                paths.push(path);
            }
        }

        if paths.is_empty() {
            log::debug!("file loader: pattern '{}' matched no files", pattern);
        }
        Ok(paths)
    }

    fn absolute(&self, path: &Path) -> Result<PathBuf> {
        let joined = match &self.options.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        std::path::absolute(&joined).map_err(|e| Error::io(e).with_path(path))
    }

    fn extension_filter(&self, extensions: &[&str]) -> Vec<String> {
        if extensions.is_empty() {
            self.options
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect()
        } else {
            extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect()
        }
    }

    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<IndexedFile>>> {
        self.files.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Loader for FileLoader {
    fn load(&self, target: &str) -> Result<Option<Item>> {
        Ok(self.load_file(target)?.map(FileItem::into_item))
    }

    fn name(&self) -> &str {
        "file"
    }
}

fn read_candidate(target: &str, file: &IndexedFile) -> Result<Option<FileItem>> {
    match FileItem::read(file.path.clone()) {
        Ok(item) => {
            log::trace!(
                "file loader: '{}' resolved to {}",
                target,
                file.path.display()
            );
            Ok(Some(item))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!(
                "file loader: '{}' was registered but no longer exists at {}",
                file.base,
                file.path.display()
            );
            Ok(None)
        }
        Err(e) => Err(Error::io(e).with_path(&file.path).with_target(target)),
    }
}

fn is_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

fn is_regular_file(path: &Path) -> Result<bool> {
    match std::fs::metadata(path) {
        Ok(metadata) => Ok(metadata.is_file()),
        // Dangling symlinks are not files
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(e).with_path(path)),
    }
}

fn matches_filter(path: &Path, filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy())
        .unwrap_or_default();
    filter.iter().any(|f| *f == extension)
}

fn split_extension(target: &str) -> Option<(&str, &str)> {
    match target.rsplit_once('.') {
        Some((name, extension)) if !name.is_empty() && !extension.is_empty() => {
            Some((name, extension))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn load_string(loader: &FileLoader, target: &str) -> Option<String> {
        loader.load(target).unwrap().map(|item| item.to_string())
    }

    #[test]
    fn test_add_file_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "test.txt", "test");

        let loader = FileLoader::new();
        loader.add_file(&path).unwrap();

        assert_eq!(load_string(&loader, "test"), Some("test".into()));
        assert_eq!(load_string(&loader, "test.txt"), Some("test".into()));
        assert_eq!(load_string(&loader, "unknown"), None);
        assert!(loader.contains("test"));
        assert_eq!(loader.len(), 1);
    }

    #[test]
    fn test_load_file_keeps_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "app.json", r#"{"name":"app"}"#);

        let loader = FileLoader::new().with_file(&path).unwrap();
        let item = loader.load_file("app").unwrap().unwrap();

        assert_eq!(item.path(), path.as_path());
        assert_eq!(item.base(), "app.json");
        assert_eq!(item.name(), "app");
    }

    #[test]
    fn test_same_name_different_path_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(dir.path(), "foo.txt", "a");
        let second = write(dir.path(), "bar/foo.txt", "b");

        let loader = FileLoader::new();
        loader.add_file(&first).unwrap();
        let err = loader.add_file(&second).unwrap_err();

        assert_eq!(
            err.kind,
            ErrorKind::RegistrationConflict {
                name: "foo".into(),
                extension: "txt".into(),
                existing: first.clone(),
                incoming: second,
            }
        );
        assert_eq!(load_string(&loader, "foo"), Some("a".into()));
    }

    #[test]
    fn test_same_path_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "foo.txt", "a");

        let loader = FileLoader::new();
        loader.add_file(&path).unwrap();
        loader.add_file(&path).unwrap();
        loader.add_dir(dir.path(), &[]).unwrap();

        assert_eq!(loader.len(), 1);
    }

    #[test]
    fn test_extension_disambiguates() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "json");
        write(dir.path(), "a.toml", "toml");

        let loader = FileLoader::new();
        loader.add_dir(dir.path(), &[]).unwrap();

        assert_eq!(load_string(&loader, "a.json"), Some("json".into()));
        assert_eq!(load_string(&loader, "a.toml"), Some("toml".into()));
        assert_eq!(load_string(&loader, "a.xyz"), None);
        // Directory entries are registered in name order, so a.toml is newest
        assert_eq!(load_string(&loader, "a"), Some("toml".into()));
    }

    #[test]
    fn test_bare_name_prefers_latest_registration() {
        let dir = tempfile::tempdir().unwrap();
        let toml = write(dir.path(), "a.toml", "toml");
        let json = write(dir.path(), "a.json", "json");

        let loader = FileLoader::new();
        loader.add_file(&toml).unwrap();
        loader.add_file(&json).unwrap();

        assert_eq!(load_string(&loader, "a"), Some("json".into()));
    }

    #[test]
    fn test_conflicting_batch_commits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let taken = write(dir.path(), "other/shared.json", "{}");
        write(dir.path(), "conf/fresh.json", "{}");
        write(dir.path(), "conf/shared.json", "{}");

        let loader = FileLoader::new();
        loader.add_file(&taken).unwrap();

        let err = loader.add_dir(dir.path().join("conf"), &[]).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::RegistrationConflict { .. }));
        assert!(!loader.contains("fresh"));
        assert_eq!(loader.len(), 1);
    }

    #[test]
    fn test_glob_conflict_within_batch() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x/app.json", "{}");
        write(dir.path(), "y/app.json", "{}");

        let loader = FileLoader::new();
        let pattern = dir.path().join("*/app.json");
        let err = loader.add_file(&pattern).unwrap_err();

        assert!(matches!(err.kind, ErrorKind::RegistrationConflict { .. }));
        assert!(loader.is_empty());
    }

    #[test]
    fn test_add_dir_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "{}");
        write(dir.path(), "b.yaml", "b: 1");
        write(dir.path(), "c.txt", "c");
        std::fs::create_dir(dir.path().join("nested.json")).unwrap();

        let loader = FileLoader::new();
        loader.add_dir(dir.path(), &["json", ".yaml"]).unwrap();

        assert!(loader.contains("a"));
        assert!(loader.contains("b"));
        assert!(!loader.contains("c"));
        assert!(!loader.contains("nested"));
    }

    #[test]
    fn test_add_dir_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileLoader::new()
            .add_dir(dir.path().join("missing"), &[])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
    }

    #[test]
    fn test_glob_pattern_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "test.txt", "test");
        write(dir.path(), "test.json", r#"{"name":"test"}"#);
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let loader = FileLoader::new();
        loader.add_file(dir.path().join("*")).unwrap();

        assert_eq!(loader.len(), 2);
        assert!(!loader.contains("sub"));
        assert_eq!(load_string(&loader, "test.txt"), Some("test".into()));
    }

    #[test]
    fn test_glob_pattern_without_matches() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileLoader::new();
        loader.add_file(dir.path().join("*.yaml")).unwrap();
        assert!(loader.is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = FileLoader::new().add_file("[").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPattern);
    }

    #[test]
    fn test_add_file_rejects_directory_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileLoader::new();

        let err = loader.add_file(dir.path()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotRegularFile);

        let err = loader.add_file(dir.path().join("missing.txt")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
        assert!(loader.is_empty());
    }

    #[test]
    fn test_vanished_file_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "json");
        let toml = write(dir.path(), "a.toml", "toml");

        let loader = FileLoader::new().with_dir(dir.path(), &[]).unwrap();
        std::fs::remove_file(&toml).unwrap();

        assert_eq!(load_string(&loader, "a"), Some("json".into()));
        assert_eq!(load_string(&loader, "a.toml"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_other_read_failures_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.json", "json");

        let loader = FileLoader::new().with_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = loader.load("a").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
        assert_eq!(err.path, Some(path));
        assert_eq!(err.target.as_deref(), Some("a"));
    }

    #[test]
    fn test_base_path_option() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "conf/app.yaml", "name: app");

        let loader = FileLoader::with_options(FileLoaderOptions {
            base_path: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        loader.add_file("conf/app.yaml").unwrap();
        loader.add_file("conf/*.yaml").unwrap();
        loader.add_dir("conf", &[]).unwrap();

        assert_eq!(loader.paths(), vec![dir.path().join("conf/app.yaml")]);
    }

    #[test]
    fn test_relative_base_path_with_pattern() {
        let dir = tempfile::tempdir_in(".").unwrap();
        let path = write(dir.path(), "app.yaml", "name: app");
        let base = dir.path().strip_prefix(".").unwrap_or(dir.path());
        assert!(base.is_relative());

        let loader = FileLoader::with_options(FileLoaderOptions {
            base_path: Some(base.to_path_buf()),
            ..Default::default()
        });
        loader.add_file("*.yaml").unwrap();

        assert_eq!(loader.paths(), vec![std::path::absolute(&path).unwrap()]);
        assert_eq!(load_string(&loader, "app"), Some("name: app".into()));
    }

    #[test]
    fn test_base_path_with_pattern_characters() {
        let dir = tempfile::Builder::new().prefix("conf[1]").tempdir().unwrap();
        let path = write(dir.path(), "app.yaml", "name: app");

        let loader = FileLoader::with_options(FileLoaderOptions {
            base_path: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        loader.add_file("*.yaml").unwrap();

        assert_eq!(loader.paths(), vec![path]);
        assert_eq!(load_string(&loader, "app"), Some("name: app".into()));
    }

    #[test]
    fn test_default_extensions_option() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.toml", "a = 1");
        write(dir.path(), "b.json", "{}");

        let loader = FileLoader::with_options(FileLoaderOptions {
            extensions: vec![".toml".into()],
            ..Default::default()
        });
        loader.add_dir(dir.path(), &[]).unwrap();
        assert!(loader.contains("a"));
        assert!(!loader.contains("b"));

        // An explicit filter replaces the default one
        loader.add_dir(dir.path(), &["json"]).unwrap();
        assert!(loader.contains("b"));
    }

    #[test]
    fn test_file_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "Makefile", "all:");

        let loader = FileLoader::new().with_file(&path).unwrap();

        assert_eq!(load_string(&loader, "Makefile"), Some("all:".into()));
        assert_eq!(load_string(&loader, ""), None);
    }

    #[test]
    fn test_concurrent_loads() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "a");
        write(dir.path(), "b.json", "b");

        let loader = Arc::new(FileLoader::new().with_dir(dir.path(), &[]).unwrap());

        std::thread::scope(|s| {
            for _ in 0..4 {
                let loader = Arc::clone(&loader);
                s.spawn(move || {
                    for _ in 0..50 {
                        assert_eq!(load_string(&loader, "a"), Some("a".into()));
                        assert_eq!(load_string(&loader, "b.json"), Some("b".into()));
                    }
                });
            }
        });
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.json"), Some(("a", "json")));
        assert_eq!(split_extension("a.b.json"), Some(("a.b", "json")));
        assert_eq!(split_extension("a"), None);
        assert_eq!(split_extension(".env"), None);
        assert_eq!(split_extension("a."), None);
    }
}
