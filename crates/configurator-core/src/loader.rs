//! The pluggable unit of the resolution chain
//!
//! A [`Loader`] either answers for a target or lets the
//! [`Configurator`](crate::Configurator) move on to the next loader.

use std::sync::Arc;

use crate::error::Result;
use crate::item::Item;

/// Trait for configuration sources
///
/// The return value of [`Loader::load`] drives the chain:
/// * `Ok(Some(item))` - the target was found, resolution stops here
/// * `Ok(None)` - not handled by this loader, the next one is consulted
/// * `Err(e)` where `e.is_not_found()` - same as `Ok(None)`
/// * any other `Err(e)` - resolution is aborted and `e` is returned
pub trait Loader: Send + Sync {
    /// Load the content of the given configuration target
    fn load(&self, target: &str) -> Result<Option<Item>>;

    /// Get the name of this loader
    fn name(&self) -> &str;
}

impl<L: Loader + ?Sized> Loader for Arc<L> {
    fn load(&self, target: &str) -> Result<Option<Item>> {
        (**self).load(target)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<L: Loader + ?Sized> Loader for Box<L> {
    fn load(&self, target: &str) -> Result<Option<Item>> {
        (**self).load(target)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A simple function-based loader
pub struct FnLoader<F>
where
    F: Fn(&str) -> Result<Option<Item>> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnLoader<F>
where
    F: Fn(&str) -> Result<Option<Item>> + Send + Sync,
{
    /// Create a new function-based loader
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Loader for FnLoader<F>
where
    F: Fn(&str) -> Result<Option<Item>> + Send + Sync,
{
    fn load(&self, target: &str) -> Result<Option<Item>> {
        (self.func)(target)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
