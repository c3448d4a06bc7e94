//! Command execution

use std::path::Path;

use apiary_core::{ConfigError, Namespace, RegistryKind, Session, StoreConfig, StoreError};
use serde::Serialize;

use crate::cli::{Action, Cli, Command};

/// CLI error
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("--app is required for the {0} command")]
    MissingApp(RegistryKind),
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Configuration from `path`, or the defaults
pub fn load_config(path: Option<&Path>) -> Result<StoreConfig, CliError> {
    let config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading config");
            StoreConfig::load(path)?
        }
        None => StoreConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

#[derive(Debug, Serialize)]
struct NamespaceInfo {
    kind: RegistryKind,
    namespace: String,
    file: String,
}

/// Run a parsed command and return what to print
pub async fn run(cli: Cli) -> Result<String, CliError> {
    let config = load_config(cli.config.as_deref())?;

    let (kind, action) = match cli.command {
        Command::Namespace { application } => return namespaces(&application, &config),
        Command::Tabs { action } => (RegistryKind::Tabs, action),
        Command::History { action } => (RegistryKind::History, action),
        Command::Favorites { action } => (RegistryKind::Favorites, action),
    };

    let app = cli.app.ok_or(CliError::MissingApp(kind))?;
    let session = Session::new(config)?;
    session.bind(&app)?;
    run_registry(&session, kind, action).await
}

fn namespaces(app: &str, config: &StoreConfig) -> Result<String, CliError> {
    let data_dir = config.resolved_data_dir()?;
    let rows = RegistryKind::ALL
        .iter()
        .map(|kind| {
            let namespace = Namespace::resolve(app, *kind)?;
            Ok(NamespaceInfo {
                kind: *kind,
                file: data_dir.join(namespace.file_name()).display().to_string(),
                namespace: namespace.as_str().to_string(),
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    Ok(serde_json::to_string_pretty(&rows)?)
}

async fn run_registry(
    session: &Session,
    kind: RegistryKind,
    action: Action,
) -> Result<String, CliError> {
    match action {
        Action::List => {
            // try_* reads so a broken store is reported instead of printed as empty
            let json = match kind {
                RegistryKind::Tabs => {
                    serde_json::to_string_pretty(&session.tabs().try_list().await?)?
                }
                RegistryKind::History => {
                    serde_json::to_string_pretty(&session.history().try_get_all().await?)?
                }
                RegistryKind::Favorites => {
                    serde_json::to_string_pretty(&session.favorites().try_list().await?)?
                }
            };
            Ok(json)
        }
        Action::Clear => {
            match kind {
                RegistryKind::Tabs => session.tabs().clear().await?,
                RegistryKind::History => session.history().clear_all().await?,
                RegistryKind::Favorites => session.favorites().clear().await?,
            }
            tracing::info!(%kind, application = ?session.application(), "Cleared");
            Ok(format!("cleared {}", kind))
        }
    }
}
