//! configurator-core: Resolve configuration targets through pluggable loaders
//!
//! A [`Configurator`] turns a logical target name such as `"app"` into raw
//! content by asking an ordered chain of [`Loader`]s, then optionally decodes
//! the content as JSON, XML, TOML or YAML.
//!
//! Loaders added later take priority over loaders added earlier. The built-in
//! [`FileLoader`] is always consulted last.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use configurator_core::{Configurator, MemoryLoader};
//!
//! #[derive(serde::Deserialize)]
//! struct Database {
//!     host: String,
//! }
//!
//! let memory = Arc::new(MemoryLoader::new());
//! memory.add("database", br#"{"host":"localhost"}"#);
//!
//! let configurator = Configurator::new().with_loader(memory);
//! let db: Database = configurator.load_json("database").unwrap();
//! assert_eq!(db.host, "localhost");
//! ```

pub mod configurator;
pub mod error;
pub mod file_loader;
pub mod item;
pub mod loader;
pub mod memory_loader;

pub use configurator::Configurator;
pub use error::{Error, ErrorKind, Result};
pub use file_loader::{FileLoader, FileLoaderOptions};
pub use item::{Bind, FileItem, Format, Item};
pub use loader::{FnLoader, Loader};
pub use memory_loader::MemoryLoader;
