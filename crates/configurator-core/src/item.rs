//! Resolved configuration payloads
//!
//! An [`Item`] is an immutable byte buffer returned by the loader chain.
//! It exposes raw views and typed decoders for JSON, XML, TOML and YAML.
//! A [`FileItem`] is an item read from disk that remembers where it came from.

use std::borrow::Cow;
use std::fmt;
use std::io::Read;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Supported content formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Xml,
    Toml,
    Yaml,
}

impl Format {
    /// Guess the format from a file extension (with or without leading dot)
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.');
        if ext.eq_ignore_ascii_case("json") {
            Some(Format::Json)
        } else if ext.eq_ignore_ascii_case("xml") {
            Some(Format::Xml)
        } else if ext.eq_ignore_ascii_case("toml") {
            Some(Format::Toml)
        } else if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") {
            Some(Format::Yaml)
        } else {
            None
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Json => "JSON",
            Format::Xml => "XML",
            Format::Toml => "TOML",
            Format::Yaml => "YAML",
        };
        f.write_str(name)
    }
}

/// A type that knows how to populate itself from raw configuration bytes
///
/// Use this when the content is not one of the built-in formats, or when
/// the type needs custom validation while binding.
pub trait Bind {
    /// Populate `self` from the given content
    fn bind_from(&mut self, data: &[u8]) -> Result<()>;
}

/// Immutable configuration content
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Item {
    data: Vec<u8>,
}

impl Item {
    /// Create an item from raw bytes
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    /// Create an item from a string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::new(s.into().into_bytes())
    }

    /// Create an item by draining a reader
    pub fn from_reader(mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).map_err(Error::io)?;
        Ok(Self::new(data))
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Content as text, replacing invalid UTF-8 sequences
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// A fresh reader over the content
    pub fn reader(&self) -> impl Read + '_ {
        self.data.as_slice()
    }

    /// Decode the content as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        self.decode(Format::Json)
    }

    /// Decode the content as XML
    pub fn xml<T: DeserializeOwned>(&self) -> Result<T> {
        self.decode(Format::Xml)
    }

    /// Decode the content as TOML
    pub fn toml<T: DeserializeOwned>(&self) -> Result<T> {
        self.decode(Format::Toml)
    }

    /// Decode the content as YAML
    pub fn yaml<T: DeserializeOwned>(&self) -> Result<T> {
        self.decode(Format::Yaml)
    }

    /// Decode the content in the given format
    ///
    /// An empty item fails with [`ErrorKind::EmptyItem`](crate::ErrorKind::EmptyItem)
    /// before any decoder runs. Decoder failures are returned as
    /// [`ErrorKind::Decode`](crate::ErrorKind::Decode) with the decoder's own
    /// error as the source.
    pub fn decode<T: DeserializeOwned>(&self, format: Format) -> Result<T> {
        if self.is_empty() {
            return Err(Error::empty_item());
        }

        match format {
            Format::Json => {
                serde_json::from_slice(&self.data).map_err(|e| Error::decode(format, e))
            }
            Format::Xml => {
                quick_xml::de::from_reader(self.data.as_slice()).map_err(|e| Error::decode(format, e))
            }
            Format::Toml => {
                let text = std::str::from_utf8(&self.data).map_err(|e| Error::decode(format, e))?;
                toml::from_str(text).map_err(|e| Error::decode(format, e))
            }
            Format::Yaml => {
                serde_yaml::from_slice(&self.data).map_err(|e| Error::decode(format, e))
            }
        }
    }

    /// Hand the content to a caller-provided binding
    pub fn bind<B: Bind + ?Sized>(&self, target: &mut B) -> Result<()> {
        if self.is_empty() {
            return Err(Error::empty_item());
        }
        target.bind_from(&self.data)
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item").field("len", &self.data.len()).finish()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl AsRef<[u8]> for Item {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl From<Vec<u8>> for Item {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for Item {
    fn from(data: &[u8]) -> Self {
        Self::new(data)
    }
}

impl From<String> for Item {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

/// Configuration content read from a file
///
/// The file is read exactly once, when the item is created. Later changes
/// to the file are not observed.
#[derive(Debug, Clone)]
pub struct FileItem {
    path: PathBuf,
    base: String,
    name: String,
    item: Item,
}

impl FileItem {
    /// Read the given file into an item
    ///
    /// Relative paths are made absolute against the working directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let absolute = std::path::absolute(path).map_err(|e| Error::io(e).with_path(path))?;
        Self::read(absolute.clone()).map_err(|e| Error::io(e).with_path(absolute))
    }

    /// Read an already absolute path, keeping the raw I/O error so callers
    /// can tell a vanished file from other failures.
    pub(crate) fn read(path: PathBuf) -> std::io::Result<Self> {
        let data = std::fs::read(&path)?;
        let base = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path,
            base,
            name,
            item: Item::new(data),
        })
    }

    /// Absolute path of the file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension
    pub fn base(&self) -> &str {
        &self.base
    }

    /// File name without extension
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format implied by the file extension, if recognised
    pub fn format(&self) -> Option<Format> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Format::from_extension)
    }

    pub fn into_item(self) -> Item {
        self.item
    }
}

impl Deref for FileItem {
    type Target = Item;

    fn deref(&self) -> &Item {
        &self.item
    }
}

impl AsRef<Item> for FileItem {
    fn as_ref(&self) -> &Item {
        &self.item
    }
}

impl From<FileItem> for Item {
    fn from(item: FileItem) -> Self {
        item.item
    }
}
