//! Application binding and per-namespace scoping
//!
//! A [`Session`] starts unbound. Once the presentation layer knows which
//! application it is showing it calls [`Session::bind`], which resolves the
//! three namespaces of that application. Stores are opened lazily on first
//! use. Until a binding exists every registry write fails with
//! `NotInitialized`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, OnceCell};

use crate::config::{ConfigError, StoreConfig};
use crate::error::{Result, StoreError};
use crate::model::{FavoriteRecord, HistoryEntry, TabRecord};
use crate::namespace::{slugify, Namespace, RegistryKind};
use crate::persistence::{Record, RecordRepository, SqliteRepository, StoreHandle};
use crate::registry::{FavoritesRegistry, HistoryLog, TabRegistry};

/// Repository of one namespace plus the gate that serializes its writers.
pub struct Scope<R: Record> {
    namespace: Namespace,
    config: StoreConfig,
    repository: OnceCell<Arc<dyn RecordRepository<R>>>,
    writer: Arc<Mutex<()>>,
}

impl<R: Record> Scope<R> {
    fn lazy(namespace: Namespace, config: StoreConfig) -> Self {
        Self {
            namespace,
            config,
            repository: OnceCell::new(),
            writer: Arc::new(Mutex::new(())),
        }
    }

    fn with_repository(
        namespace: Namespace,
        config: StoreConfig,
        repository: Arc<dyn RecordRepository<R>>,
    ) -> Self {
        Self {
            namespace,
            config,
            repository: OnceCell::new_with(Some(repository)),
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The namespace's repository, opening its store on first use.
    ///
    /// A failed open is not cached; the next call tries again.
    pub async fn repository(&self) -> Result<Arc<dyn RecordRepository<R>>> {
        self.repository
            .get_or_try_init(|| async {
                let namespace = self.namespace.clone();
                let config = self.config.clone();
                tokio::task::spawn_blocking(move || -> Result<Arc<dyn RecordRepository<R>>> {
                    let handle = StoreHandle::open(&namespace, &config)?;
                    let repository: Arc<dyn RecordRepository<R>> =
                        Arc::new(SqliteRepository::<R>::new(Arc::new(handle))?);
                    Ok(repository)
                })
                .await?
            })
            .await
            .cloned()
    }

    /// Run `f` against the repository on the blocking pool.
    pub async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn RecordRepository<R>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let repository = self.repository().await?;
        tokio::task::spawn_blocking(move || f(repository.as_ref())).await?
    }

    /// Run `f` as the namespace's only writer.
    ///
    /// The gate travels into the blocking task, so it stays held until `f`
    /// finishes even if the calling future is dropped part way.
    pub async fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn RecordRepository<R>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let repository = self.repository().await?;
        let gate = Arc::clone(&self.writer).lock_owned().await;
        tokio::task::spawn_blocking(move || {
            let _gate = gate;
            f(repository.as_ref())
        })
        .await?
    }
}

/// The three scopes of one bound application
pub struct Binding {
    application: String,
    pub(crate) tabs: Scope<TabRecord>,
    pub(crate) history: Scope<HistoryEntry>,
    pub(crate) favorites: Scope<FavoriteRecord>,
}

impl Binding {
    fn resolve(application: &str, config: &StoreConfig) -> Result<Self> {
        Ok(Self {
            application: application.to_string(),
            tabs: Scope::lazy(Namespace::resolve(application, RegistryKind::Tabs)?, config.clone()),
            history: Scope::lazy(
                Namespace::resolve(application, RegistryKind::History)?,
                config.clone(),
            ),
            favorites: Scope::lazy(
                Namespace::resolve(application, RegistryKind::Favorites)?,
                config.clone(),
            ),
        })
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn namespace(&self, kind: RegistryKind) -> &Namespace {
        match kind {
            RegistryKind::Tabs => self.tabs.namespace(),
            RegistryKind::History => self.history.namespace(),
            RegistryKind::Favorites => self.favorites.namespace(),
        }
    }
}

/// Caller-supplied repositories for [`Session::bind_with`]
pub struct Repositories {
    pub tabs: Arc<dyn RecordRepository<TabRecord>>,
    pub history: Arc<dyn RecordRepository<HistoryEntry>>,
    pub favorites: Arc<dyn RecordRepository<FavoriteRecord>>,
}

struct SessionInner {
    config: StoreConfig,
    current: RwLock<Option<Arc<Binding>>>,
    // One binding per application slug, so each namespace keeps exactly one
    // store (and one writer gate) for the life of the session.
    bindings: std::sync::Mutex<HashMap<String, Arc<Binding>>>,
}

/// Entry point for the presentation layer
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Session over `config`, which must pass [`StoreConfig::validate`].
    pub fn new(config: StoreConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                current: RwLock::new(None),
                bindings: std::sync::Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Session whose stores live only in memory
    pub fn in_memory() -> Self {
        Self::with_config(StoreConfig::in_memory())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Bind the session to an application.
    ///
    /// Rebinding to an application seen before reuses its stores.
    pub fn bind(&self, application_name: &str) -> Result<()> {
        let slug = slugify(application_name);
        let binding = {
            let mut bindings = self.lock_bindings()?;
            match bindings.get(&slug) {
                Some(existing) => Arc::clone(existing),
                None => {
                    let binding = Arc::new(Binding::resolve(application_name, &self.inner.config)?);
                    bindings.insert(slug, Arc::clone(&binding));
                    binding
                }
            }
        };
        tracing::info!(
            application = application_name,
            tabs = %binding.tabs.namespace(),
            history = %binding.history.namespace(),
            favorites = %binding.favorites.namespace(),
            "Bound application"
        );
        self.set_current(Some(binding))
    }

    /// Bind to an application backed by the given repositories
    pub fn bind_with(&self, application_name: &str, repositories: Repositories) -> Result<()> {
        let config = &self.inner.config;
        let binding = Arc::new(Binding {
            application: application_name.to_string(),
            tabs: Scope::with_repository(
                Namespace::resolve(application_name, RegistryKind::Tabs)?,
                config.clone(),
                repositories.tabs,
            ),
            history: Scope::with_repository(
                Namespace::resolve(application_name, RegistryKind::History)?,
                config.clone(),
                repositories.history,
            ),
            favorites: Scope::with_repository(
                Namespace::resolve(application_name, RegistryKind::Favorites)?,
                config.clone(),
                repositories.favorites,
            ),
        });
        self.lock_bindings()?
            .insert(slugify(application_name), Arc::clone(&binding));
        self.set_current(Some(binding))
    }

    /// Drop the current binding. Stores stay cached for a later rebind.
    pub fn unbind(&self) -> Result<()> {
        self.set_current(None)
    }

    pub fn is_bound(&self) -> bool {
        self.inner
            .current
            .read()
            .map(|current| current.is_some())
            .unwrap_or(false)
    }

    /// Name of the bound application
    pub fn application(&self) -> Option<String> {
        self.binding().ok().map(|b| b.application().to_string())
    }

    /// The bound application's namespaces, or `NotInitialized`
    pub fn binding(&self) -> Result<Arc<Binding>> {
        let current = self
            .inner
            .current
            .read()
            .map_err(|e| StoreError::StorageUnavailable(format!("session lock poisoned: {}", e)))?;
        current.as_ref().map(Arc::clone).ok_or(StoreError::NotInitialized)
    }

    pub fn tabs(&self) -> TabRegistry {
        TabRegistry::new(self.clone())
    }

    pub fn history(&self) -> HistoryLog {
        HistoryLog::new(self.clone())
    }

    pub fn favorites(&self) -> FavoritesRegistry {
        FavoritesRegistry::new(self.clone())
    }

    fn set_current(&self, binding: Option<Arc<Binding>>) -> Result<()> {
        let mut current = self
            .inner
            .current
            .write()
            .map_err(|e| StoreError::StorageUnavailable(format!("session lock poisoned: {}", e)))?;
        *current = binding;
        Ok(())
    }

    fn lock_bindings(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Arc<Binding>>>> {
        self.inner
            .bindings
            .lock()
            .map_err(|e| StoreError::StorageUnavailable(format!("session lock poisoned: {}", e)))
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.inner.config)
            .field("application", &self.application())
            .finish()
    }
}
