//! The loader chain
//!
//! A [`Configurator`] owns an ordered list of loaders. The list always starts
//! with a built-in [`FileLoader`]; every loader added with
//! [`Configurator::use_loader`] goes after it. Resolution walks the list from
//! the most recently added loader back to the built-in one, so later loaders
//! take priority and registered files are the last resort.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::file_loader::{FileLoader, FileLoaderOptions};
use crate::item::{Bind, Format, Item};
use crate::loader::Loader;

/// Resolves configuration targets through a chain of loaders
pub struct Configurator {
    files: Arc<FileLoader>,
    loaders: RwLock<Vec<Arc<dyn Loader>>>,
}

impl Default for Configurator {
    fn default() -> Self {
        Self::new()
    }
}

impl Configurator {
    /// Create a configurator holding only the built-in file loader
    pub fn new() -> Self {
        Self::with_options(FileLoaderOptions::default())
    }

    /// Create a configurator whose built-in file loader uses `options`
    pub fn with_options(options: FileLoaderOptions) -> Self {
        let files = Arc::new(FileLoader::with_options(options));
        let builtin: Arc<dyn Loader> = files.clone();
        Self {
            files,
            loaders: RwLock::new(vec![builtin]),
        }
    }

    /// Add a loader with higher priority than every loader added before it
    pub fn use_loader<L: Loader + 'static>(&self, loader: L) -> &Self {
        let mut loaders = self.loaders.write().unwrap_or_else(PoisonError::into_inner);
        log::debug!(
            "configurator: using '{}' loader at priority {}",
            loader.name(),
            loaders.len()
        );
        loaders.push(Arc::new(loader));
        self
    }

    /// Builder form of [`use_loader`](Self::use_loader)
    pub fn with_loader<L: Loader + 'static>(self, loader: L) -> Self {
        self.use_loader(loader);
        self
    }

    /// The built-in file loader
    pub fn file_loader(&self) -> &FileLoader {
        &self.files
    }

    /// Register files with the built-in file loader, see [`FileLoader::add_file`]
    pub fn add_file(&self, pattern: impl AsRef<Path>) -> Result<()> {
        self.files.add_file(pattern)
    }

    /// Register a directory with the built-in file loader, see [`FileLoader::add_dir`]
    pub fn add_dir(&self, directory: impl AsRef<Path>, extensions: &[&str]) -> Result<()> {
        self.files.add_dir(directory, extensions)
    }

    /// Names of the loaders, highest priority first
    pub fn loader_names(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .rev()
            .map(|l| l.name().to_string())
            .collect()
    }

    /// Resolve a target to its content
    ///
    /// The first loader that returns content wins. A loader that declines, or
    /// reports not-found, hands over to the next one. Any other error stops
    /// the walk and is returned as is. If no loader answers the result is
    /// [`ErrorKind::NotFound`](crate::ErrorKind::NotFound).
    pub fn load(&self, target: &str) -> Result<Item> {
        for loader in self.snapshot().iter().rev() {
            match loader.load(target) {
                Ok(Some(item)) => {
                    log::trace!("configurator: '{}' loaded by '{}'", target, loader.name());
                    return Ok(item);
                }
                Ok(None) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
            log::trace!("configurator: '{}' passed on '{}'", loader.name(), target);
        }
        Err(Error::not_found(target))
    }

    /// Resolve a target to its raw bytes
    pub fn load_bytes(&self, target: &str) -> Result<Vec<u8>> {
        self.load(target).map(Item::into_bytes)
    }

    /// Resolve a target and decode it in the given format
    pub fn load_as<T: DeserializeOwned>(&self, target: &str, format: Format) -> Result<T> {
        self.load(target)?.decode(format)
    }

    /// Resolve a target and decode it as JSON
    pub fn load_json<T: DeserializeOwned>(&self, target: &str) -> Result<T> {
        self.load(target)?.json()
    }

    /// Resolve a target and decode it as XML
    pub fn load_xml<T: DeserializeOwned>(&self, target: &str) -> Result<T> {
        self.load(target)?.xml()
    }

    /// Resolve a target and decode it as TOML
    pub fn load_toml<T: DeserializeOwned>(&self, target: &str) -> Result<T> {
        self.load(target)?.toml()
    }

    /// Resolve a target and decode it as YAML
    pub fn load_yaml<T: DeserializeOwned>(&self, target: &str) -> Result<T> {
        self.load(target)?.yaml()
    }

    /// Resolve a target and hand it to a caller-provided binding
    pub fn load_and_bind<B: Bind + ?Sized>(&self, target: &str, object: &mut B) -> Result<()> {
        self.load(target)?.bind(object)
    }

    // Loaders run without the lock held, so a loader may extend the chain.
    fn snapshot(&self) -> Vec<Arc<dyn Loader>> {
        self.loaders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for Configurator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configurator")
            .field("loaders", &self.loader_names())
            .field("files", &self.files)
            .finish()
    }
}
