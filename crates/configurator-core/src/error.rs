//! Error types for configurator
//!
//! Every failure is an [`Error`] carrying a closed [`ErrorKind`]. Callers
//! match on the kind; the remaining fields are context for humans.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::item::Format;

/// Result type alias for configurator operations
pub type Result<T> = std::result::Result<T, Error>;

type Source = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for configurator operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Configuration target being resolved when the error occurred
    pub target: Option<String>,
    /// Filesystem path involved, if any
    pub path: Option<PathBuf>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause, rendered verbatim
    pub cause: Option<String>,
    source: Option<Source>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// No loader in the chain produced content for the target
    NotFound,
    /// A typed decode was attempted on an item with no content
    EmptyItem,
    /// Two different files claim the same logical name and extension
    RegistrationConflict {
        name: String,
        extension: String,
        existing: PathBuf,
        incoming: PathBuf,
    },
    /// The format decoder rejected the content
    Decode { format: Format },
    /// A caller-provided binding rejected the content
    Bind,
    /// Filesystem failure while registering files, or a failure other than
    /// "does not exist" while reading a registered file
    Io,
    /// A path given to the file loader is not a regular file
    NotRegularFile,
    /// A glob pattern could not be parsed
    InvalidPattern,
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            target: None,
            path: None,
            help: None,
            cause: None,
            source: None,
        }
    }

    /// Create the canonical not-found error for a target
    pub fn not_found(target: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorKind::NotFound);
        err.target = Some(target.into());
        err
    }

    /// Create an empty item error
    pub fn empty_item() -> Self {
        Self::new(ErrorKind::EmptyItem)
    }

    /// Create a registration conflict between two files
    pub fn registration_conflict(
        name: impl Into<String>,
        extension: impl Into<String>,
        existing: impl Into<PathBuf>,
        incoming: impl Into<PathBuf>,
    ) -> Self {
        let existing = existing.into();
        let incoming = incoming.into();
        let mut err = Self::new(ErrorKind::RegistrationConflict {
            name: name.into(),
            extension: extension.into(),
            existing: existing.clone(),
            incoming: incoming.clone(),
        });
        err.help = Some(format!(
            "Register only one of '{}' and '{}', or use separate file loaders",
            existing.display(),
            incoming.display()
        ));
        err
    }

    /// Wrap a decoder failure
    pub fn decode<E>(format: Format, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut err = Self::new(ErrorKind::Decode { format });
        err.cause = Some(source.to_string());
        err.source = Some(Arc::new(source));
        err
    }

    /// Wrap a failure reported by a [`Bind`](crate::item::Bind) implementation
    pub fn bind(message: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorKind::Bind);
        err.cause = Some(message.into());
        err
    }

    /// Wrap an I/O failure
    pub fn io(source: std::io::Error) -> Self {
        let mut err = Self::new(ErrorKind::Io);
        err.cause = Some(source.to_string());
        err.source = Some(Arc::new(source));
        err
    }

    /// Create a not-a-regular-file error
    pub fn not_regular_file(path: impl AsRef<Path>) -> Self {
        let mut err = Self::new(ErrorKind::NotRegularFile);
        err.path = Some(path.as_ref().to_path_buf());
        err.help = Some("Use add_dir() to register the files of a directory".into());
        err
    }

    /// Create an invalid glob pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, source: glob::PatternError) -> Self {
        let mut err = Self::new(ErrorKind::InvalidPattern);
        err.path = Some(PathBuf::from(pattern.into()));
        err.cause = Some(source.to_string());
        err.source = Some(Arc::new(source));
        err
    }

    /// Add target context to the error
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Whether this error lets the loader chain continue
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Whether this error is the empty item condition
    pub fn is_empty_item(&self) -> bool {
        self.kind == ErrorKind::EmptyItem
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::NotFound => write!(f, "Configuration not found")?,
            ErrorKind::EmptyItem => write!(f, "Configuration item is empty")?,
            ErrorKind::RegistrationConflict {
                name,
                extension,
                existing,
                incoming,
            } => {
                write!(f, "Duplicate configuration file '{}", name)?;
                if !extension.is_empty() {
                    write!(f, ".{}", extension)?;
                }
                write!(
                    f,
                    "': {} and {}",
                    existing.display(),
                    incoming.display()
                )?
            }
            ErrorKind::Decode { format } => write!(f, "Failed to decode {}", format)?,
            ErrorKind::Bind => write!(f, "Failed to bind configuration")?,
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::NotRegularFile => write!(f, "Not a regular file")?,
            ErrorKind::InvalidPattern => write!(f, "Invalid glob pattern")?,
        }

        if let Some(target) = &self.target {
            write!(f, "\n  Target: {}", target)?;
        }

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path.display())?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}
