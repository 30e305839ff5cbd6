//! Scope context: the settings and store every holder binds through.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::BoxError;
use crate::holder::{dispose_with, Dispose};
use crate::store::ContextStore;
use crate::{Error, ScopeSettings, ScopedResource};

static GLOBAL: OnceCell<ScopeContext> = OnceCell::new();

/// Settings plus the [`ContextStore`] selected for them.
///
/// The store is chosen once, when the context is built. Holders opened
/// through a context bind into that store under its namespace.
///
/// ## Example
///
/// ```no_run
/// use scope_fnd::{ScopeContext, ScopeSettings};
///
/// struct Session;
///
/// let ctx = ScopeContext::builder()
///     .with_settings(
///         ScopeSettings::loader()
///             .with_file("config/default.toml", true)
///             .with_env("APP", "__")
///             .load()?,
///     )
///     .build()?;
///
/// let session = ctx.acquire::<Session, _, _>("db", || Session)?;
/// # Ok::<(), scope_fnd::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScopeContext {
    settings: ScopeSettings,
    store: Arc<dyn ContextStore>,
}

impl Default for ScopeContext {
    fn default() -> Self {
        let settings = ScopeSettings::default();
        let store = settings.store.select();
        Self { settings, store }
    }
}

impl ScopeContext {
    /// Creates a new builder for constructing a `ScopeContext`.
    pub fn builder() -> ScopeContextBuilder {
        ScopeContextBuilder::default()
    }

    /// The process-wide context used by [`ScopedResource::new`].
    ///
    /// Falls back to default settings if none was installed.
    pub fn global() -> &'static ScopeContext {
        GLOBAL.get_or_init(ScopeContext::default)
    }

    /// Makes this the process-wide context.
    ///
    /// Fails once a global context exists, including the default one
    /// created by an earlier call to [`global`](Self::global).
    pub fn install_global(self) -> Result<&'static ScopeContext, Error> {
        GLOBAL
            .set(self)
            .map_err(|_| Error::GlobalAlreadyInstalled)?;
        Ok(Self::global())
    }

    pub fn settings(&self) -> &ScopeSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    /// Opens a holder for `key`, running `factory` only if the slot is empty.
    pub fn acquire<T, F, O>(&self, key: &str, factory: F) -> Result<ScopedResource<T>, Error>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> O,
        O: Into<Option<T>>,
    {
        ScopedResource::open(self, key, None, || Ok(factory().into()))
    }

    /// Like [`acquire`](Self::acquire); the root disposes the resource on release.
    pub fn acquire_disposable<T, F, O>(
        &self,
        key: &str,
        factory: F,
    ) -> Result<ScopedResource<T>, Error>
    where
        T: Dispose + Send + Sync + 'static,
        F: FnOnce() -> O,
        O: Into<Option<T>>,
    {
        ScopedResource::open(self, key, Some(dispose_with::<T>), || {
            Ok(factory().into())
        })
    }

    /// Opens a holder with a fallible factory.
    ///
    /// A factory error surfaces as [`Error::Factory`] and leaves the slot empty.
    pub fn try_acquire<T, F, O, E>(
        &self,
        key: &str,
        factory: F,
    ) -> Result<ScopedResource<T>, Error>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<O, E>,
        O: Into<Option<T>>,
        E: Into<BoxError>,
    {
        ScopedResource::open(self, key, None, || {
            factory().map(Into::into).map_err(Into::into)
        })
    }

    /// Fallible counterpart of [`acquire_disposable`](Self::acquire_disposable).
    pub fn try_acquire_disposable<T, F, O, E>(
        &self,
        key: &str,
        factory: F,
    ) -> Result<ScopedResource<T>, Error>
    where
        T: Dispose + Send + Sync + 'static,
        F: FnOnce() -> Result<O, E>,
        O: Into<Option<T>>,
        E: Into<BoxError>,
    {
        ScopedResource::open(self, key, Some(dispose_with::<T>), || {
            factory().map(Into::into).map_err(Into::into)
        })
    }
}

/// Builder for constructing a [`ScopeContext`].
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ScopeContextBuilder {
    settings: Option<ScopeSettings>,
    store: Option<Arc<dyn ContextStore>>,
}

impl ScopeContextBuilder {
    /// Uses `settings` instead of the defaults.
    pub fn with_settings(mut self, settings: ScopeSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Binds into `store` instead of the one named by the settings.
    pub fn with_store(mut self, store: Arc<dyn ContextStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the `ScopeContext`.
    ///
    /// Returns an error if the settings are invalid.
    pub fn build(self) -> Result<ScopeContext, Error> {
        let settings = self.settings.unwrap_or_default();
        settings.validate()?;
        let store = self.store.unwrap_or_else(|| settings.store.select());
        Ok(ScopeContext { settings, store })
    }
}
